//! Macro expansion
//!
//!     Hover shows what a macro expands to. Hosts with rpm installed ask rpm itself (see the
//!     `RpmCli` expander of the server crate); [`LocalExpander`] is the in-process fallback.
//!     It understands the forms that make up nearly all spec macros:
//!
//!         %name  %{name}  %{?name}  %{!?name}  %{?name:text}  %{!?name:text}  %%
//!
//!     Lookups consult the document-local table first, then the session table. Builtins
//!     (`%{basename:...}`, `%{lua:...}`) need the real engine and are reported as such.

use std::sync::Arc;

use thiserror::Error;

use crate::macros::{MacroDescriptor, MacroLevel, MacroTable};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("macro `{0}` is not defined")]
    Undefined(String),
    #[error("macro `{0}` is built into rpm and cannot be expanded here")]
    Builtin(String),
    #[error("expansion of `{0}` recurses too deeply")]
    TooDeep(String),
    #[error("macro engine failed: {0}")]
    Engine(String),
}

/// Expands macro expressions with a document's own definitions in scope.
pub trait MacroExpander: Send + Sync {
    /// Expand `expression` (typically `%{name}`) with `locals` defined.
    fn expand(&self, expression: &str, locals: &MacroTable) -> Result<String, ExpandError>;
}

/// In-process expander over the session and document-local tables.
#[derive(Debug, Clone, Default)]
pub struct LocalExpander {
    session: Arc<MacroTable>,
}

impl LocalExpander {
    pub fn new(session: Arc<MacroTable>) -> Self {
        Self { session }
    }
}

impl MacroExpander for LocalExpander {
    fn expand(&self, expression: &str, locals: &MacroTable) -> Result<String, ExpandError> {
        Expansion {
            locals,
            session: &self.session,
        }
        .text(expression, 0)
    }
}

/// Expand `value` with only `locals` in scope, keeping the text as written when anything in
/// it cannot be expanded.
pub fn expand_or_keep(value: &str, locals: &MacroTable) -> String {
    let session = MacroTable::new();
    Expansion {
        locals,
        session: &session,
    }
    .text(value, 0)
    .unwrap_or_else(|_| value.to_string())
}

struct Expansion<'a> {
    locals: &'a MacroTable,
    session: &'a MacroTable,
}

impl Expansion<'_> {
    fn lookup(&self, name: &str) -> Option<&MacroDescriptor> {
        self.locals.get(name).or_else(|| self.session.get(name))
    }

    fn text(&self, text: &str, depth: usize) -> Result<String, ExpandError> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut index = 0;

        while index < chars.len() {
            if chars[index] != '%' {
                out.push(chars[index]);
                index += 1;
                continue;
            }
            match chars.get(index + 1) {
                Some('%') => {
                    out.push('%');
                    index += 2;
                }
                Some('{') => match matching_brace(&chars, index + 1) {
                    Some(close) => {
                        let inner: String = chars[index + 2..close].iter().collect();
                        out.push_str(&self.braced(&inner, depth)?);
                        index = close + 1;
                    }
                    None => {
                        out.extend(&chars[index..]);
                        index = chars.len();
                    }
                },
                Some(&ch) if is_name_char(ch) => {
                    let end = (index + 1..chars.len())
                        .find(|&at| !is_name_char(chars[at]))
                        .unwrap_or(chars.len());
                    let name: String = chars[index + 1..end].iter().collect();
                    out.push_str(&self.named(&name, depth)?);
                    index = end;
                }
                _ => {
                    out.push('%');
                    index += 1;
                }
            }
        }

        Ok(out)
    }

    fn braced(&self, inner: &str, depth: usize) -> Result<String, ExpandError> {
        let flags = inner
            .find(|ch: char| ch != '?' && ch != '!')
            .unwrap_or(inner.len());
        let conditional = inner[..flags].contains('?');
        let negated = inner[..flags].contains('!');
        let (name, alternative) = match inner[flags..].split_once(':') {
            Some((name, alternative)) => (name, Some(alternative)),
            None => (&inner[flags..], None),
        };

        if !conditional {
            return match alternative {
                Some(argument) if name == "expand" => self.text(argument, depth + 1),
                Some(_) => Err(ExpandError::Builtin(name.to_string())),
                None => self.named(name, depth),
            };
        }

        let defined = self.lookup(name).is_some();
        match (negated, alternative) {
            (false, _) if !defined => Ok(String::new()),
            (false, Some(text)) => self.text(text, depth + 1),
            (false, None) => self.named(name, depth),
            (true, Some(text)) if !defined => self.text(text, depth + 1),
            (true, _) => Ok(String::new()),
        }
    }

    fn named(&self, name: &str, depth: usize) -> Result<String, ExpandError> {
        if depth >= MAX_DEPTH {
            return Err(ExpandError::TooDeep(name.to_string()));
        }
        match self.lookup(name) {
            Some(descriptor) if descriptor.level == MacroLevel::Builtin => {
                Err(ExpandError::Builtin(name.to_string()))
            }
            Some(descriptor) => self.text(&descriptor.body, depth + 1),
            None => Err(ExpandError::Undefined(name.to_string())),
        }
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Index of the `}` closing the `{` at `open`, honoring nesting.
fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in chars.iter().enumerate().skip(open) {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn session() -> Arc<MacroTable> {
        Arc::new(MacroTable::from_descriptors([
            MacroDescriptor::new("_prefix", MacroLevel::MacroFile, "/usr"),
            MacroDescriptor::new("_exec_prefix", MacroLevel::MacroFile, "%{_prefix}"),
            MacroDescriptor::new("_bindir", MacroLevel::MacroFile, "%{_exec_prefix}/bin"),
            MacroDescriptor::new("basename", MacroLevel::Builtin, "<builtin>"),
            MacroDescriptor::new("loop", MacroLevel::MacroFile, "%{loop}"),
        ]))
    }

    fn locals() -> MacroTable {
        MacroTable::from_descriptors([
            MacroDescriptor::new("name", MacroLevel::Preamble, "hello-world"),
            MacroDescriptor::new("script", MacroLevel::InDocument, "hello-world.sh"),
            MacroDescriptor::new("dest", MacroLevel::InDocument, "%{_bindir}/%script"),
        ])
    }

    #[rstest]
    #[case("%{name}", "hello-world")]
    #[case("%name-1", "hello-world-1")]
    #[case("%{dest}", "/usr/bin/hello-world.sh")]
    #[case("%{_bindir}", "/usr/bin")]
    #[case("100%%", "100%")]
    #[case("%{?name}", "hello-world")]
    #[case("%{?missing}", "")]
    #[case("%{?name:yes}", "yes")]
    #[case("%{!?missing:fallback %name}", "fallback hello-world")]
    #[case("%{!?name:fallback}", "")]
    #[case("%{expand:%%{name}}", "%{name}")]
    #[case("50% off", "50% off")]
    fn expands_local_forms(#[case] expression: &str, #[case] expected: &str) {
        let expander = LocalExpander::new(session());
        assert_eq!(expander.expand(expression, &locals()).unwrap(), expected);
    }

    #[test]
    fn reports_what_cannot_be_expanded() {
        let expander = LocalExpander::new(session());
        assert_eq!(
            expander.expand("%{undefined_macro}", &locals()),
            Err(ExpandError::Undefined("undefined_macro".into()))
        );
        assert_eq!(
            expander.expand("%{basename}", &locals()),
            Err(ExpandError::Builtin("basename".into()))
        );
        assert_eq!(
            expander.expand("%{lua: print(1)}", &locals()),
            Err(ExpandError::Builtin("lua".into()))
        );
        assert_eq!(
            expander.expand("%{loop}", &locals()),
            Err(ExpandError::TooDeep("loop".into()))
        );
    }

    #[test]
    fn locals_shadow_the_session() {
        let expander = LocalExpander::new(session());
        let locals = MacroTable::from_descriptors([MacroDescriptor::new(
            "_prefix",
            MacroLevel::InDocument,
            "/opt",
        )]);
        assert_eq!(expander.expand("%{_bindir}", &locals).unwrap(), "/opt/bin");
    }

    #[test]
    fn keep_falls_back_to_the_written_text() {
        assert_eq!(expand_or_keep("%{name}-devel", &locals()), "hello-world-devel");
        assert_eq!(expand_or_keep("%{srcname}", &locals()), "%{srcname}");
    }
}
