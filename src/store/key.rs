//! Helpers for hierarchical, path-like object keys

/// Separator used by object keys.
pub const SEPARATOR: char = '/';

/// Whether a key names a folder placeholder.
pub fn is_directory_key(key: &str) -> bool {
    key.ends_with(SEPARATOR)
}

/// Last path component of a key. Folder keys keep their trailing separator.
///
/// `"a/b/c.txt"` → `"c.txt"`, `"a/folder/"` → `"folder/"`.
pub fn object_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches(SEPARATOR);
    let start = trimmed.rfind(SEPARATOR).map(|i| i + 1).unwrap_or(0);
    &key[start..]
}

/// Normalize a destination prefix: empty stays empty (container root),
/// anything else ends with exactly one separator and has no leading one.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}{}", trimmed, SEPARATOR)
    }
}

/// Key of `source` once placed under `prefix`.
pub fn rebase(source: &str, prefix: &str) -> String {
    format!("{}{}", normalize_prefix(prefix), object_name(source))
}
