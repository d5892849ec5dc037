//! Vocabulary of the spec format: section markers, preamble tags and conditionals.

/// Section markers (without the leading `%`). A line starting with one of these opens a
/// new section.
pub const SECTION_NAMES: &[&str] = &[
    "package",
    "description",
    "prep",
    "generate_buildrequires",
    "conf",
    "build",
    "install",
    "check",
    "clean",
    "files",
    "changelog",
    "pre",
    "post",
    "preun",
    "postun",
    "pretrans",
    "posttrans",
    "preuntrans",
    "postuntrans",
    "verifyscript",
    "triggerprein",
    "triggerin",
    "triggerun",
    "triggerpostun",
    "filetriggerin",
    "filetriggerun",
    "filetriggerpostun",
    "transfiletriggerin",
    "transfiletriggerun",
    "transfiletriggerpostun",
    "patchlist",
    "sourcelist",
];

/// Tags describing the package itself.
pub const PREAMBLE_TAGS: &[&str] = &[
    "Name",
    "Version",
    "Release",
    "Epoch",
    "Summary",
    "License",
    "SourceLicense",
    "URL",
    "BugURL",
    "Group",
    "Vendor",
    "Packager",
    "Distribution",
    "DistTag",
    "ModularityLabel",
    "Source",
    "Patch",
    "NoSource",
    "NoPatch",
    "BuildArch",
    "BuildArchitectures",
    "ExclusiveArch",
    "ExcludeArch",
    "ExclusiveOS",
    "ExcludeOS",
    "BuildRoot",
    "Icon",
    "Prefix",
    "Prefixes",
    "DocDir",
    "AutoReq",
    "AutoProv",
    "AutoReqProv",
    "BuildSystem",
    "BuildOption",
    "VCS",
    "Translations",
];

/// Tags declaring relationships to other packages.
pub const DEPENDENCY_TAGS: &[&str] = &[
    "Requires",
    "Provides",
    "Conflicts",
    "Obsoletes",
    "Recommends",
    "Suggests",
    "Supplements",
    "Enhances",
    "OrderWithRequires",
    "BuildRequires",
    "BuildConflicts",
    "BuildPrereq",
    "Prereq",
];

/// Preamble tags whose value rpm also publishes as a macro of the lowercased tag name.
pub const MACRO_PUBLISHING_TAGS: &[&str] =
    &["Name", "Version", "Release", "Epoch", "Summary", "License", "URL"];

/// Directives opening a conditional block.
pub const CONDITIONAL_OPENERS: &[&str] = &["%if", "%ifarch", "%ifnarch", "%ifos", "%ifnos"];

/// Directives continuing a conditional block.
pub const CONDITIONAL_BRANCHES: &[&str] = &["%elif", "%elifarch", "%elifos", "%else"];

pub const CONDITIONAL_CLOSER: &str = "%endif";

/// Returns the canonical spelling when `tag` is a known preamble or dependency tag,
/// including numbered `SourceN`/`PatchN` forms.
pub fn canonical_tag(tag: &str) -> Option<&'static str> {
    let known = PREAMBLE_TAGS
        .iter()
        .chain(DEPENDENCY_TAGS.iter())
        .find(|known| known.eq_ignore_ascii_case(tag));
    if known.is_some() {
        return known.copied();
    }
    ["Source", "Patch"].into_iter().find(|prefix| {
        tag.len() > prefix.len()
            && tag[..prefix.len()].eq_ignore_ascii_case(prefix)
            && tag[prefix.len()..].bytes().all(|b| b.is_ascii_digit())
    })
}

/// Returns true when `name` (without `%`) opens a section.
pub fn is_section_name(name: &str) -> bool {
    SECTION_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_tags_case_insensitively() {
        assert_eq!(canonical_tag("name"), Some("Name"));
        assert_eq!(canonical_tag("BUILDREQUIRES"), Some("BuildRequires"));
        assert_eq!(canonical_tag("Source12"), Some("Source"));
        assert_eq!(canonical_tag("patch3"), Some("Patch"));
        assert_eq!(canonical_tag("Sourcex"), None);
        assert_eq!(canonical_tag("Description"), None);
    }

    #[test]
    fn recognizes_section_names() {
        assert!(is_section_name("prep"));
        assert!(is_section_name("filetriggerin"));
        assert!(!is_section_name("global"));
    }
}
