use rpmspec_analysis::{macro_at, MacroResolver, Resolution};
use rpmspec_parser::Position;

use crate::documents::DocumentEntry;

/// Where the macro under `position` is defined.
pub fn goto_definition(
    entry: &DocumentEntry,
    position: Position,
    resolver: &MacroResolver,
) -> Resolution {
    let Some(name) = macro_at(&entry.text, position) else {
        return Resolution::NotFound;
    };
    let lookup = resolver.classify(&name, &entry.locals);
    tracing::debug!(?lookup, "resolving macro definition");
    resolver.resolve(&lookup, &entry.text)
}
