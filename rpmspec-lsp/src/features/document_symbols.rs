use rpmspec_analysis::{LineRange, SectionIndex, SpecSection};
use lsp_types::SymbolKind;

#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocumentSymbol {
    pub name: String,
    pub detail: Option<String>,
    pub kind: SymbolKind,
    pub range: LineRange,
    pub selection_range: LineRange,
}

/// One flat symbol per section, in document order.
pub fn collect_document_symbols(index: &SectionIndex) -> Vec<SpecDocumentSymbol> {
    index.sections().iter().map(section_symbol).collect()
}

fn section_symbol(section: &SpecSection) -> SpecDocumentSymbol {
    let options = section.raw().options.trim();
    SpecDocumentSymbol {
        name: section.name.clone(),
        detail: (!options.is_empty()).then(|| options.to_string()),
        kind: SymbolKind::NAMESPACE,
        range: section.lines,
        selection_range: section.selection_range(),
    }
}
