use rpmspec_analysis::utils::{char_index_from_utf16, line_at};
use rpmspec_analysis::{completion_items, CompletionCandidate, CompletionRequest, MacroTable};
use rpmspec_parser::Position;

use crate::documents::DocumentEntry;

/// Cursor and client details of a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionQuery {
    pub position: Position,
    pub trigger: Option<char>,
    /// The client keeps the typed `%` in front of the inserted label.
    pub keeps_trigger: bool,
}

pub fn completion(
    entry: &DocumentEntry,
    query: CompletionQuery,
    session: &MacroTable,
) -> Vec<CompletionCandidate> {
    let line = line_at(&entry.text, query.position.line).unwrap_or("");
    let request = CompletionRequest {
        line,
        column: char_index_from_utf16(line, query.position.column),
        trigger: query.trigger,
        section: entry.sections.section_under_cursor(query.position.line),
        keeps_trigger: query.keeps_trigger,
    };
    completion_items(&request, session, &entry.locals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::{sample_entry, sample_session};

    fn labels(query: CompletionQuery) -> Vec<String> {
        completion(&sample_entry(), query, &sample_session())
            .into_iter()
            .map(|item| item.label)
            .collect()
    }

    fn query(line: usize, column: usize, trigger: Option<char>, keeps: bool) -> CompletionQuery {
        CompletionQuery {
            position: Position::new(line, column),
            trigger,
            keeps_trigger: keeps,
        }
    }

    #[test]
    fn blank_build_line_offers_only_macros() {
        let labels = labels(query(19, 0, None, false));
        assert!(labels.iter().all(|label| label.starts_with('%')));
        assert!(labels.iter().any(|label| label == "%script"));
    }

    #[test]
    fn uppercase_trigger_offers_preamble_items() {
        let labels = labels(query(0, 0, Some('B'), false));
        assert!(labels
            .iter()
            .all(|label| label.starts_with(|c: char| c.is_ascii_uppercase())));
    }

    #[test]
    fn preamble_without_trigger_offers_everything() {
        let labels = labels(query(0, 0, None, false));
        assert!(labels.iter().any(|label| label == "BuildRequires"));
        assert!(labels.iter().any(|label| label == "%prep"));
    }

    #[test]
    fn trigger_label_style_depends_on_the_client() {
        let bare = labels(query(0, 0, Some('%'), true));
        assert!(bare.iter().all(|label| !label.starts_with('%')));
        assert!(bare.iter().any(|label| label == "prep"));
        assert!(!bare.iter().any(|label| label == "BuildRequires"));

        let prefixed = labels(query(0, 0, Some('%'), false));
        assert!(prefixed.iter().all(|label| label.starts_with('%')));
        assert!(prefixed.iter().any(|label| label == "%prep"));
    }

    #[test]
    fn positions_past_the_document_still_complete() {
        assert!(!labels(query(400, 0, None, false)).is_empty());
    }
}
