//! Shared name validation, grounded on
//! `examples/original_source/src/jnkn/parsing/python/validation.py`'s
//! `is_valid_env_var_name` (filtered from the retrieval pack; its contract
//! is inferred from every extractor's call site: reject empty names and
//! anything that isn't a reasonable identifier).

pub fn is_valid_env_var_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 256 {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
