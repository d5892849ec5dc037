use rpmspec_analysis::{macro_at, MacroExpander, MacroLevel, MacroLookup, MacroResolver};
use rpmspec_parser::Position;

use crate::documents::DocumentEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverResult {
    pub contents: String,
}

/// The expansion of the macro under `position`, rendered as a bash block.
///
/// Builtins are skipped: expanding them out of context says nothing about the macro.
pub fn hover(
    entry: &DocumentEntry,
    position: Position,
    resolver: &MacroResolver,
    expander: &dyn MacroExpander,
) -> Option<HoverResult> {
    let name = macro_at(&entry.text, position)?;
    let descriptor = match resolver.classify(&name, &entry.locals) {
        MacroLookup::Resolved(descriptor) => descriptor,
        MacroLookup::Unresolved(name) => {
            tracing::debug!(name = %name, "no hover for undefined macro");
            return None;
        }
    };
    if descriptor.level == MacroLevel::Builtin {
        tracing::debug!(name = %descriptor.name, "no hover for builtin macro");
        return None;
    }

    match expander.expand(&format!("%{{{}}}", descriptor.name), &entry.locals) {
        Ok(expansion) => Some(HoverResult {
            contents: format!("```bash\n{expansion}\n```"),
        }),
        Err(err) => {
            tracing::debug!(name = %descriptor.name, %err, "macro does not expand");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::{sample_entry, sample_resolver, sample_session};
    use rpmspec_analysis::{ExpandError, LocalExpander, MacroTable};
    use rstest::rstest;
    use std::sync::Arc;

    /// Expands anything to a fixed text.
    struct Always;

    impl MacroExpander for Always {
        fn expand(&self, _: &str, _: &MacroTable) -> Result<String, ExpandError> {
            Ok("expanded".to_string())
        }
    }

    #[rstest]
    #[case(Position::new(17, 34), "hello-world")]
    #[case(Position::new(17, 44), "1")]
    #[case(Position::new(22, 46), "/usr/bin/hello-world.sh")]
    #[case(Position::new(15, 9), "hello-world.sh")]
    #[case(Position::new(21, 27), "/usr/bin")]
    fn renders_the_expansion(#[case] position: Position, #[case] expansion: &str) {
        let expander = LocalExpander::new(sample_session());
        let result = hover(&sample_entry(), position, &sample_resolver(), &expander).unwrap();
        assert_eq!(result.contents, format!("```bash\n{expansion}\n```"));
    }

    #[test]
    fn nothing_for_undefined_macros_or_plain_text() {
        let expander = LocalExpander::new(sample_session());
        let entry = sample_entry();
        let resolver = sample_resolver();
        assert_eq!(hover(&entry, Position::new(24, 10), &resolver, &expander), None);
        assert_eq!(hover(&entry, Position::new(7, 3), &resolver, &expander), None);
    }

    #[test]
    fn nothing_for_builtins_even_when_they_expand() {
        let entry = DocumentEntry::parse(Arc::new(
            "Name: foo\n%global base %{dirname /a/b}\n".to_string(),
        ))
        .unwrap();
        let resolver = sample_resolver();
        assert_eq!(hover(&entry, Position::new(1, 17), &resolver, &Always), None);
        // the same expander does answer for macro file macros
        let bindir = DocumentEntry::parse(Arc::new("Name: foo\n%{_bindir}\n".to_string())).unwrap();
        assert_eq!(
            hover(&bindir, Position::new(1, 4), &resolver, &Always),
            Some(HoverResult {
                contents: "```bash\nexpanded\n```".to_string()
            })
        );
    }
}
