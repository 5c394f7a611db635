//! Name tokenization shared by every stitching rule.

/// Lowercase, split on `[_\-./]`, drop fragments shorter than 2 characters.
pub fn tokenize(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c| matches!(c, '_' | '-' | '.' | '/'))
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_string())
        .collect()
}

/// Lowercase, strip the same separators entirely (used for exact-alias
/// comparisons, not overlap scoring).
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | '/'))
        .collect()
}
