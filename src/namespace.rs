//! Canonical namespace table
//!
//! Namespaces are addressed by integer index. Serialization always uses the
//! canonical (English) names listed here, so canonical query strings and
//! content hashes do not depend on the wiki's content language.

pub const MAIN: i32 = 0;
pub const TALK: i32 = 1;
pub const USER: i32 = 2;
pub const PROJECT: i32 = 4;
pub const FILE: i32 = 6;
pub const MEDIAWIKI: i32 = 8;
pub const TEMPLATE: i32 = 10;
pub const HELP: i32 = 12;
pub const CATEGORY: i32 = 14;
pub const PROPERTY: i32 = 102;
pub const CONCEPT: i32 = 108;

const CANONICAL: &[(i32, &str)] = &[
    (MAIN, ""),
    (TALK, "Talk"),
    (USER, "User"),
    (3, "User talk"),
    (PROJECT, "Project"),
    (5, "Project talk"),
    (FILE, "File"),
    (7, "File talk"),
    (MEDIAWIKI, "MediaWiki"),
    (9, "MediaWiki talk"),
    (TEMPLATE, "Template"),
    (11, "Template talk"),
    (HELP, "Help"),
    (13, "Help talk"),
    (CATEGORY, "Category"),
    (15, "Category talk"),
    (PROPERTY, "Property"),
    (103, "Property talk"),
    (CONCEPT, "Concept"),
    (109, "Concept talk"),
];

/// Canonical name of a namespace (`""` for the main namespace)
pub fn canonical_name(index: i32) -> Option<&'static str> {
    CANONICAL
        .iter()
        .find(|(idx, _)| *idx == index)
        .map(|(_, name)| *name)
}

/// Look up a canonical namespace name. Matching ignores case and treats
/// underscores as spaces, like title normalization does.
pub fn canonical_index(name: &str) -> Option<i32> {
    let wanted = normalize_name(name);
    CANONICAL
        .iter()
        .find(|(_, candidate)| candidate.to_lowercase() == wanted)
        .map(|(idx, _)| *idx)
}

/// Text used for a namespace in serialized queries. Unknown indices fall
/// back to their number.
pub fn display_name(index: i32) -> String {
    canonical_name(index)
        .map(str::to_string)
        .unwrap_or_else(|| index.to_string())
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().replace('_', " ").to_lowercase()
}
