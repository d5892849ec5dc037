use crate::macros::{MacroDescriptor, MacroLevel, MacroTable};
use crate::sections::SpecSection;
use lsp_types::CompletionItemKind;
use rpmspec_parser::keywords::{DEPENDENCY_TAGS, PREAMBLE_TAGS, SECTION_NAMES};
use std::collections::BTreeMap;

const DETAIL_WIDTH: usize = 60;

/// Describes a semantic completion candidate that can be translated into protocol specific items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub label: String,
    pub detail: Option<String>,
    pub kind: CompletionItemKind,
    pub insert_text: Option<String>,
}

impl CompletionCandidate {
    pub fn new(label: impl Into<String>, kind: CompletionItemKind) -> Self {
        Self {
            label: label.into(),
            detail: None,
            kind,
            insert_text: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_insert_text(mut self, text: impl Into<String>) -> Self {
        self.insert_text = Some(text.into());
        self
    }
}

/// Everything completion needs to know about the cursor.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// Text of the cursor's line.
    pub line: &'a str,
    /// Cursor column as a char index into `line`.
    pub column: usize,
    /// Character that triggered the request, if the editor sent one.
    pub trigger: Option<char>,
    /// Section containing the cursor.
    pub section: Option<&'a SpecSection>,
    /// The editor keeps the typed `%`, so labels must not repeat it.
    pub keeps_trigger: bool,
}

/// High level context for completion suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionContext {
    /// Right after a `%`.
    MacroName,
    /// A tag is being typed at the start of a preamble line.
    PreambleTag,
    /// Inside a package preamble with nothing typed yet.
    Preamble,
    Body,
}

/// Produce completion candidates for the cursor described by `request`.
pub fn completion_items(
    request: &CompletionRequest<'_>,
    session: &MacroTable,
    locals: &MacroTable,
) -> Vec<CompletionCandidate> {
    let context = detect_context(request);
    let prefix = if context == CompletionContext::MacroName && request.keeps_trigger {
        ""
    } else {
        "%"
    };

    let mut items = Vec::new();
    match context {
        CompletionContext::PreambleTag => items.extend(tag_completions()),
        CompletionContext::Preamble => {
            items.extend(tag_completions());
            items.extend(macro_completions(session, locals, prefix));
            items.extend(section_completions(prefix));
        }
        CompletionContext::MacroName | CompletionContext::Body => {
            items.extend(macro_completions(session, locals, prefix));
            items.extend(section_completions(prefix));
        }
    }
    items
}

fn detect_context(request: &CompletionRequest<'_>) -> CompletionContext {
    if request.trigger == Some('%') || follows_percent(request.line, request.column) {
        return CompletionContext::MacroName;
    }
    if request.trigger.is_some_and(|ch| ch.is_ascii_uppercase()) {
        return CompletionContext::PreambleTag;
    }
    match request.section {
        Some(section) if !section.holds_preamble() => CompletionContext::Body,
        _ => CompletionContext::Preamble,
    }
}

/// True when the text before the cursor ends in an unescaped `%` or `%{`.
fn follows_percent(line: &str, column: usize) -> bool {
    let before: Vec<char> = line.chars().take(column).collect();
    let trimmed = match before.as_slice() {
        [rest @ .., '{'] => rest,
        all => all,
    };
    match trimmed {
        [.., '%', '%'] => false,
        [.., '%'] => true,
        _ => false,
    }
}

fn macro_completions<'a>(
    session: &'a MacroTable,
    locals: &'a MacroTable,
    prefix: &'a str,
) -> impl Iterator<Item = CompletionCandidate> + 'a {
    let mut visible: BTreeMap<&str, &MacroDescriptor> = BTreeMap::new();
    for descriptor in session.iter().chain(locals.iter()) {
        visible.insert(descriptor.name.as_str(), descriptor);
    }
    visible.into_values().map(move |descriptor| {
        let kind = match descriptor.level {
            MacroLevel::Builtin => CompletionItemKind::FUNCTION,
            MacroLevel::MacroFile => CompletionItemKind::CONSTANT,
            MacroLevel::InDocument | MacroLevel::Preamble => CompletionItemKind::VARIABLE,
        };
        let candidate = CompletionCandidate::new(format!("{prefix}{}", descriptor.name), kind);
        match summarize_body(&descriptor.body) {
            Some(detail) => candidate.with_detail(detail),
            None => candidate,
        }
    })
}

fn section_completions(prefix: &str) -> impl Iterator<Item = CompletionCandidate> + '_ {
    SECTION_NAMES.iter().map(move |name| {
        CompletionCandidate::new(format!("{prefix}{name}"), CompletionItemKind::KEYWORD)
            .with_detail("section")
    })
}

fn tag_completions() -> impl Iterator<Item = CompletionCandidate> {
    let preamble = PREAMBLE_TAGS.iter().map(|tag| (tag, "preamble tag"));
    let dependency = DEPENDENCY_TAGS.iter().map(|tag| (tag, "dependency tag"));
    preamble.chain(dependency).map(|(tag, detail)| {
        CompletionCandidate::new(*tag, CompletionItemKind::PROPERTY)
            .with_detail(detail)
            .with_insert_text(format!("{tag}: "))
    })
}

/// First line of a macro body, shortened for the detail column.
fn summarize_body(body: &str) -> Option<String> {
    let first = body.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    if first.chars().count() <= DETAIL_WIDTH {
        return Some(first.to_string());
    }
    let mut summary: String = first.chars().take(DETAIL_WIDTH).collect();
    summary.push('…');
    Some(summary)
}
