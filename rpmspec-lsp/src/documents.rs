//! Per-document cache
//!
//!     Every URI maps to the text the editor last sent (the buffer) and, when that text
//!     parses, the derived entry: parsed document, section index and document-local macro
//!     table. Updates replace the entry wholesale under the write lock, so a reader never
//!     sees a half-updated document.
//!
//!     A text that fails to parse evicts the previous entry; requests against it come back
//!     empty until the next edit fixes it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rpmspec_analysis::{MacroTable, SectionIndex};
use rpmspec_parser::{parse_document, ParseError, SpecDocument};
use tokio::sync::RwLock;
use tower_lsp::lsp_types::Url;

/// A successfully parsed document and everything derived from it.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub document: Arc<SpecDocument>,
    pub sections: Arc<SectionIndex>,
    pub locals: Arc<MacroTable>,
    pub text: Arc<String>,
}

impl DocumentEntry {
    pub fn parse(text: Arc<String>) -> Result<Self, ParseError> {
        let document = parse_document(&text)?;
        Ok(Self {
            sections: Arc::new(SectionIndex::from_document(&document)),
            locals: Arc::new(MacroTable::from_document(&document)),
            document: Arc::new(document),
            text,
        })
    }
}

#[derive(Default)]
struct StoreState {
    buffers: HashMap<Url, Arc<String>>,
    entries: HashMap<Url, DocumentEntry>,
}

#[derive(Default)]
pub struct DocumentStore {
    state: RwLock<StoreState>,
    parses: AtomicUsize,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened document.
    pub async fn open(&self, uri: Url, text: String) -> Option<DocumentEntry> {
        self.replace(uri, text).await
    }

    /// Replace the tracked buffer with the full new text.
    pub async fn change(&self, uri: Url, text: String) -> Option<DocumentEntry> {
        self.replace(uri, text).await
    }

    /// Re-parse on save, from the saved text when the editor sent it.
    pub async fn save(&self, uri: Url, text: Option<String>) -> Option<DocumentEntry> {
        let mut state = self.state.write().await;
        let text = match text {
            Some(text) => {
                let text = Arc::new(text);
                state.buffers.insert(uri.clone(), Arc::clone(&text));
                text
            }
            None => match state.buffers.get(&uri) {
                Some(text) => Arc::clone(text),
                None => read_from_disk(&uri).await?,
            },
        };
        self.store(&mut state, uri, text)
    }

    /// Forget the buffer and entry of a closed document.
    pub async fn close(&self, uri: &Url) {
        let mut state = self.state.write().await;
        state.buffers.remove(uri);
        state.entries.remove(uri);
    }

    /// The cached entry, parsing the tracked buffer or the file on disk when there is none.
    pub async fn get_or_parse(&self, uri: &Url) -> Option<DocumentEntry> {
        if let Some(entry) = self.state.read().await.entries.get(uri) {
            return Some(entry.clone());
        }

        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.get(uri) {
            return Some(entry.clone());
        }
        let text = match state.buffers.get(uri) {
            Some(text) => Arc::clone(text),
            None => read_from_disk(uri).await?,
        };
        self.store(&mut state, uri.clone(), text)
    }

    /// Number of parses run so far.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    async fn replace(&self, uri: Url, text: String) -> Option<DocumentEntry> {
        let text = Arc::new(text);
        let mut state = self.state.write().await;
        state.buffers.insert(uri.clone(), Arc::clone(&text));
        self.store(&mut state, uri, text)
    }

    fn store(&self, state: &mut StoreState, uri: Url, text: Arc<String>) -> Option<DocumentEntry> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        match DocumentEntry::parse(text) {
            Ok(entry) => {
                state.entries.insert(uri, entry.clone());
                Some(entry)
            }
            Err(err) => {
                tracing::debug!(uri = %uri, %err, "document does not parse");
                state.entries.remove(&uri);
                None
            }
        }
    }
}

async fn read_from_disk(uri: &Url) -> Option<Arc<String>> {
    if uri.scheme() != "file" {
        return None;
    }
    let path = uri.to_file_path().ok()?;
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Some(Arc::new(text)),
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "cannot read unopened document");
            None
        }
    }
}
