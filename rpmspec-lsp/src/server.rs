//! Main language server implementation

use std::sync::Arc;

use crate::documents::{DocumentEntry, DocumentStore};
use crate::features::completion::{completion as collect_completions, CompletionQuery};
use crate::features::definition::goto_definition;
use crate::features::document_symbols::{collect_document_symbols, SpecDocumentSymbol};
use crate::features::hover::{hover as compute_hover, HoverResult};
use rpmspec_analysis::{
    CompletionCandidate, DefinitionLocation, DefinitionTarget, LineRange, MacroExpander,
    MacroResolver, Resolution,
};
use rpmspec_config::CompletionConfig;
use rpmspec_parser::{Position as SpecPosition, Range as SpecRange};
use tokio::sync::RwLock;
use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionOptions, CompletionParams, CompletionResponse, DocumentSymbol,
    DocumentSymbolParams, DocumentSymbolResponse, GotoDefinitionParams, GotoDefinitionResponse,
    Hover, HoverContents, HoverParams, HoverProviderCapability, InitializeParams,
    InitializeResult, InitializedParams, Location, MarkupContent, MarkupKind, OneOf, Position,
    Range, SaveOptions, ServerCapabilities, ServerInfo, TextDocumentItem,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, Url,
};
use tower_lsp::Client;

pub trait LspClient: Send + Sync + Clone + 'static {}
impl LspClient for Client {}

pub trait FeatureProvider: Send + Sync + 'static {
    fn document_symbols(&self, entry: &DocumentEntry) -> Vec<SpecDocumentSymbol>;
    fn definition(&self, entry: &DocumentEntry, position: SpecPosition) -> Resolution;
    fn hover(&self, entry: &DocumentEntry, position: SpecPosition) -> Option<HoverResult>;
    fn completion(&self, entry: &DocumentEntry, query: CompletionQuery)
        -> Vec<CompletionCandidate>;
}

/// Features backed by a macro resolver and an expander.
pub struct DefaultFeatureProvider {
    resolver: MacroResolver,
    expander: Box<dyn MacroExpander>,
}

impl DefaultFeatureProvider {
    pub fn new(resolver: MacroResolver, expander: impl MacroExpander + 'static) -> Self {
        Self {
            resolver,
            expander: Box::new(expander),
        }
    }
}

impl FeatureProvider for DefaultFeatureProvider {
    fn document_symbols(&self, entry: &DocumentEntry) -> Vec<SpecDocumentSymbol> {
        collect_document_symbols(&entry.sections)
    }

    fn definition(&self, entry: &DocumentEntry, position: SpecPosition) -> Resolution {
        goto_definition(entry, position, &self.resolver)
    }

    fn hover(&self, entry: &DocumentEntry, position: SpecPosition) -> Option<HoverResult> {
        compute_hover(entry, position, &self.resolver, self.expander.as_ref())
    }

    fn completion(
        &self,
        entry: &DocumentEntry,
        query: CompletionQuery,
    ) -> Vec<CompletionCandidate> {
        collect_completions(entry, query, self.resolver.session())
    }
}

pub struct RpmSpecLanguageServer<C = Client, P = DefaultFeatureProvider> {
    _client: C,
    documents: DocumentStore,
    features: Arc<P>,
    completion: CompletionConfig,
    client_name: RwLock<Option<String>>,
}

impl<C, P> RpmSpecLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    pub fn with_features(client: C, features: Arc<P>) -> Self {
        Self {
            _client: client,
            documents: DocumentStore::new(),
            features,
            completion: CompletionConfig::default(),
            client_name: RwLock::new(None),
        }
    }

    pub fn with_completion_config(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    async fn document_entry(&self, uri: &Url) -> Option<DocumentEntry> {
        self.documents.get_or_parse(uri).await
    }

    /// Run a provider call on the blocking pool; the rpm-backed provider spawns processes.
    async fn blocking<T, F>(&self, entry: DocumentEntry, call: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&P, &DocumentEntry) -> T + Send + 'static,
    {
        let features = Arc::clone(&self.features);
        match tokio::task::spawn_blocking(move || call(features.as_ref(), &entry)).await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(%err, "feature task failed");
                None
            }
        }
    }

    async fn keeps_trigger(&self) -> bool {
        self.client_name
            .read()
            .await
            .as_deref()
            .is_some_and(|name| self.completion.keeps_trigger(name))
    }
}

fn to_lsp_position(position: &SpecPosition) -> Position {
    Position::new(position.line as u32, position.column as u32)
}

fn to_lsp_range(range: &SpecRange) -> Range {
    Range {
        start: to_lsp_position(&range.start),
        end: to_lsp_position(&range.end),
    }
}

fn from_lsp_position(position: Position) -> SpecPosition {
    SpecPosition::new(position.line as usize, position.character as usize)
}

fn line_range_to_lsp(lines: &LineRange) -> Range {
    Range {
        start: Position::new(lines.start as u32, 0),
        end: Position::new(lines.end as u32, 0),
    }
}

#[allow(deprecated)]
fn to_document_symbol(symbol: &SpecDocumentSymbol) -> DocumentSymbol {
    DocumentSymbol {
        name: symbol.name.clone(),
        detail: symbol.detail.clone(),
        kind: symbol.kind,
        deprecated: None,
        range: line_range_to_lsp(&symbol.range),
        selection_range: line_range_to_lsp(&symbol.selection_range),
        children: None,
        tags: None,
    }
}

fn to_lsp_location(document: &Url, location: &DefinitionLocation) -> Option<Location> {
    let uri = match &location.target {
        DefinitionTarget::Document => document.clone(),
        DefinitionTarget::File(path) => match Url::from_file_path(path) {
            Ok(uri) => uri,
            Err(()) => {
                tracing::warn!(path = %path.display(), "macro file path is not absolute");
                return None;
            }
        },
    };
    Some(Location::new(uri, to_lsp_range(&location.range)))
}

fn to_completion_item(candidate: CompletionCandidate) -> CompletionItem {
    CompletionItem {
        label: candidate.label,
        kind: Some(candidate.kind),
        detail: candidate.detail,
        insert_text: candidate.insert_text,
        ..CompletionItem::default()
    }
}

#[async_trait]
impl<C, P> tower_lsp::LanguageServer for RpmSpecLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(info) = params.client_info {
            tracing::info!(client = %info.name, version = ?info.version, "initializing");
            *self.client_name.write().await = Some(info.name);
        }

        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(true),
                    })),
                    ..TextDocumentSyncOptions::default()
                },
            )),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            document_symbol_provider: Some(OneOf::Left(true)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec!["%".to_string()]),
                ..CompletionOptions::default()
            }),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "rpmspec-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {}

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: lsp_types::DidOpenTextDocumentParams) {
        let TextDocumentItem { uri, text, .. } = params.text_document;
        self.documents.open(uri, text).await;
    }

    async fn did_change(&self, params: lsp_types::DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .change(params.text_document.uri, change.text)
                .await;
        }
    }

    async fn did_save(&self, params: lsp_types::DidSaveTextDocumentParams) {
        self.documents
            .save(params.text_document.uri, params.text)
            .await;
    }

    async fn did_close(&self, params: lsp_types::DidCloseTextDocumentParams) {
        self.documents.close(&params.text_document.uri).await;
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        if let Some(entry) = self.document_entry(&params.text_document.uri).await {
            let symbols = self.features.document_symbols(&entry);
            let converted: Vec<DocumentSymbol> = symbols.iter().map(to_document_symbol).collect();
            Ok(Some(DocumentSymbolResponse::Nested(converted)))
        } else {
            Ok(None)
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let Some(entry) = self.document_entry(&uri).await else {
            return Ok(None);
        };
        let position = from_lsp_position(params.text_document_position_params.position);
        let resolution = self
            .blocking(entry, move |features, entry| {
                features.definition(entry, position)
            })
            .await;

        match resolution {
            Some(Resolution::Found(locations)) => {
                let locations: Vec<Location> = locations
                    .iter()
                    .filter_map(|location| to_lsp_location(&uri, location))
                    .collect();
                Ok((!locations.is_empty()).then_some(GotoDefinitionResponse::Array(locations)))
            }
            _ => Ok(None),
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let Some(entry) = self
            .document_entry(&params.text_document_position_params.text_document.uri)
            .await
        else {
            return Ok(None);
        };
        let position = from_lsp_position(params.text_document_position_params.position);
        let result = self
            .blocking(entry, move |features, entry| features.hover(entry, position))
            .await
            .flatten();

        Ok(result.map(|result| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: result.contents,
            }),
            range: None,
        }))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let Some(entry) = self
            .document_entry(&params.text_document_position.text_document.uri)
            .await
        else {
            return Ok(None);
        };
        let query = CompletionQuery {
            position: from_lsp_position(params.text_document_position.position),
            trigger: params
                .context
                .and_then(|context| context.trigger_character)
                .and_then(|trigger| trigger.chars().next()),
            keeps_trigger: self.keeps_trigger().await,
        };

        let items: Vec<CompletionItem> = self
            .features
            .completion(&entry, query)
            .into_iter()
            .map(to_completion_item)
            .collect();
        Ok(Some(CompletionResponse::List(lsp_types::CompletionList {
            is_incomplete: false,
            items,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::{sample_provider, HELLO_SPEC};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower_lsp::lsp_types::{
        ClientInfo, CompletionContext, CompletionItemKind, CompletionTriggerKind,
        DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
        SymbolKind, TextDocumentContentChangeEvent, TextDocumentIdentifier,
        TextDocumentPositionParams, VersionedTextDocumentIdentifier,
    };
    use tower_lsp::LanguageServer;

    #[derive(Clone, Default)]
    struct NoopClient;
    impl LspClient for NoopClient {}

    #[derive(Default)]
    struct MockFeatureProvider {
        document_symbols_called: AtomicUsize,
        definition_called: AtomicUsize,
        hover_called: AtomicUsize,
        last_hover_position: Mutex<Option<SpecPosition>>,
        last_query: Mutex<Option<CompletionQuery>>,
    }

    impl FeatureProvider for MockFeatureProvider {
        fn document_symbols(&self, _: &DocumentEntry) -> Vec<SpecDocumentSymbol> {
            self.document_symbols_called.fetch_add(1, Ordering::SeqCst);
            vec![SpecDocumentSymbol {
                name: "package".into(),
                detail: None,
                kind: SymbolKind::NAMESPACE,
                range: LineRange::new(0, 6),
                selection_range: LineRange::new(0, 1),
            }]
        }

        fn definition(&self, _: &DocumentEntry, _: SpecPosition) -> Resolution {
            self.definition_called.fetch_add(1, Ordering::SeqCst);
            Resolution::Builtin
        }

        fn hover(&self, _: &DocumentEntry, position: SpecPosition) -> Option<HoverResult> {
            self.hover_called.fetch_add(1, Ordering::SeqCst);
            *self.last_hover_position.lock().unwrap() = Some(position);
            Some(HoverResult {
                contents: "hover".into(),
            })
        }

        fn completion(&self, _: &DocumentEntry, query: CompletionQuery) -> Vec<CompletionCandidate> {
            *self.last_query.lock().unwrap() = Some(query);
            vec![CompletionCandidate::new("%prep", CompletionItemKind::KEYWORD)]
        }
    }

    fn sample_uri() -> Url {
        Url::parse("file:///hello-world.spec").unwrap()
    }

    fn position_params(line: u32, character: u32) -> TextDocumentPositionParams {
        TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: sample_uri() },
            position: Position::new(line, character),
        }
    }

    fn symbol_params() -> DocumentSymbolParams {
        DocumentSymbolParams {
            text_document: TextDocumentIdentifier { uri: sample_uri() },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        }
    }

    fn completion_params(trigger: Option<&str>) -> CompletionParams {
        CompletionParams {
            text_document_position: position_params(0, 0),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: Some(CompletionContext {
                trigger_kind: if trigger.is_some() {
                    CompletionTriggerKind::TRIGGER_CHARACTER
                } else {
                    CompletionTriggerKind::INVOKED
                },
                trigger_character: trigger.map(str::to_string),
            }),
        }
    }

    async fn open_sample_document<P: FeatureProvider>(server: &RpmSpecLanguageServer<NoopClient, P>) {
        server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: sample_uri(),
                    language_id: "rpmspec".into(),
                    version: 1,
                    text: HELLO_SPEC.to_string(),
                },
            })
            .await;
    }

    fn mock_server() -> (
        RpmSpecLanguageServer<NoopClient, MockFeatureProvider>,
        Arc<MockFeatureProvider>,
    ) {
        let provider = Arc::new(MockFeatureProvider::default());
        let server = RpmSpecLanguageServer::with_features(NoopClient, provider.clone());
        (server, provider)
    }

    #[tokio::test]
    async fn advertises_the_supported_features() {
        let (server, _) = mock_server();
        let result = server.initialize(InitializeParams::default()).await.unwrap();
        let capabilities = result.capabilities;
        assert!(capabilities.hover_provider.is_some());
        assert_eq!(capabilities.definition_provider, Some(OneOf::Left(true)));
        assert_eq!(capabilities.document_symbol_provider, Some(OneOf::Left(true)));
        assert_eq!(
            capabilities.completion_provider.unwrap().trigger_characters,
            Some(vec!["%".to_string()])
        );
        match capabilities.text_document_sync {
            Some(TextDocumentSyncCapability::Options(options)) => {
                assert_eq!(options.change, Some(TextDocumentSyncKind::FULL));
                assert_eq!(options.open_close, Some(true));
            }
            other => panic!("unexpected sync capability: {other:?}"),
        }
    }

    #[tokio::test]
    async fn document_symbols_call_feature_layer_without_reparsing() {
        let (server, provider) = mock_server();
        open_sample_document(&server).await;

        for _ in 0..3 {
            let response = server.document_symbol(symbol_params()).await.unwrap().unwrap();
            match response {
                DocumentSymbolResponse::Nested(symbols) => {
                    assert_eq!(symbols[0].range.end, Position::new(6, 0));
                }
                _ => panic!("unexpected symbol response"),
            }
        }
        assert_eq!(provider.document_symbols_called.load(Ordering::SeqCst), 3);
        assert_eq!(server.documents().parse_count(), 1);
    }

    #[tokio::test]
    async fn edits_reparse_once_per_change() {
        let (server, _) = mock_server();
        open_sample_document(&server).await;
        server
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: sample_uri(),
                    version: 2,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: format!("%global answer 42\n{HELLO_SPEC}"),
                }],
            })
            .await;
        server.document_symbol(symbol_params()).await.unwrap();
        server.document_symbol(symbol_params()).await.unwrap();
        assert_eq!(server.documents().parse_count(), 2);
    }

    #[tokio::test]
    async fn closed_documents_have_no_symbols() {
        let (server, provider) = mock_server();
        open_sample_document(&server).await;
        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier {
                    uri: Url::parse("untitled:Untitled-1").unwrap(),
                },
            })
            .await;
        assert!(server.document_symbol(symbol_params()).await.unwrap().is_some());

        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
            })
            .await;
        // the sample URI does not exist on disk either
        assert!(server.document_symbol(symbol_params()).await.unwrap().is_none());
        assert_eq!(provider.document_symbols_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hover_uses_feature_provider_position() {
        let (server, provider) = mock_server();
        open_sample_document(&server).await;

        let hover = server
            .hover(HoverParams {
                text_document_position_params: position_params(17, 34),
                work_done_progress_params: Default::default(),
            })
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(hover.contents, HoverContents::Markup(_)));
        assert_eq!(provider.hover_called.load(Ordering::SeqCst), 1);
        let stored = provider.last_hover_position.lock().unwrap().unwrap();
        assert_eq!(stored, SpecPosition::new(17, 34));
    }

    #[tokio::test]
    async fn builtin_definitions_have_no_location() {
        let (server, provider) = mock_server();
        open_sample_document(&server).await;
        let response = server
            .goto_definition(GotoDefinitionParams {
                text_document_position_params: position_params(17, 34),
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .await
            .unwrap();
        assert!(response.is_none());
        assert_eq!(provider.definition_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completion_reports_trigger_and_client_style() {
        let (server, provider) = mock_server();
        let mut params = InitializeParams::default();
        params.client_info = Some(ClientInfo {
            name: "Visual Studio Code".into(),
            version: None,
        });
        server.initialize(params).await.unwrap();
        open_sample_document(&server).await;

        let response = server.completion(completion_params(Some("%"))).await.unwrap();
        match response {
            Some(CompletionResponse::List(list)) => {
                assert!(!list.is_incomplete);
                assert_eq!(list.items[0].label, "%prep");
            }
            other => panic!("unexpected completion response: {other:?}"),
        }
        let query = provider.last_query.lock().unwrap().unwrap();
        assert_eq!(query.trigger, Some('%'));
        assert!(query.keeps_trigger);
    }

    #[tokio::test]
    async fn requests_without_document_return_none() {
        let (server, provider) = mock_server();
        let hover = server
            .hover(HoverParams {
                text_document_position_params: position_params(0, 0),
                work_done_progress_params: Default::default(),
            })
            .await
            .unwrap();
        assert!(hover.is_none());
        assert!(server.completion(completion_params(None)).await.unwrap().is_none());
        assert_eq!(provider.hover_called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn default_provider_resolves_document_defines() {
        let server = RpmSpecLanguageServer::with_features(NoopClient, Arc::new(sample_provider()));
        open_sample_document(&server).await;

        let response = server
            .goto_definition(GotoDefinitionParams {
                text_document_position_params: position_params(22, 46),
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .await
            .unwrap();
        match response {
            Some(GotoDefinitionResponse::Array(locations)) => {
                assert_eq!(locations.len(), 1);
                assert_eq!(locations[0].uri, sample_uri());
                assert_eq!(
                    locations[0].range,
                    Range::new(Position::new(10, 0), Position::new(10, 12))
                );
            }
            other => panic!("unexpected definition response: {other:?}"),
        }

        let hover = server
            .hover(HoverParams {
                text_document_position_params: position_params(22, 46),
                work_done_progress_params: Default::default(),
            })
            .await
            .unwrap()
            .unwrap();
        match hover.contents {
            HoverContents::Markup(markup) => {
                assert_eq!(markup.value, "```bash\n/usr/bin/hello-world.sh\n```");
            }
            other => panic!("unexpected hover contents: {other:?}"),
        }
    }
}
