//! Per-language source parsers. Every module here runs regex/line-scan
//! heuristics over the decoded text view — no syntax tree is built (see
//! `DESIGN.md` for why `tree-sitter` was dropped from the dependency
//! stack).

pub mod go;
pub mod java;
pub mod javascript;
pub mod python;

/// A named, prioritized regex-based sub-extractor for environment
/// variable reads, run within a language `Parser`'s own `parse`. Grounded
/// on `examples/original_source/src/jnkn/parsing/python/extractors/*.py`'s
/// `BaseExtractor` (`name`, `priority`, `can_extract`, `extract`); higher
/// priority runs first and claims the variable name in
/// `ExtractionContext::mark_seen`, so a lower-priority extractor never
/// double-reports it.
pub trait EnvVarExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;
    fn can_extract(&self, text: &str) -> bool;
    fn extract(&self, ctx: &mut crate::context::ExtractionContext) -> Vec<crate::parser::ParseItem>;
}

/// Run every extractor whose `can_extract` matches, highest priority
/// first, accumulating their output.
pub fn run_env_var_extractors(
    extractors: &[Box<dyn EnvVarExtractor>],
    ctx: &mut crate::context::ExtractionContext,
) -> Vec<crate::parser::ParseItem> {
    let mut ordered: Vec<&Box<dyn EnvVarExtractor>> = extractors.iter().collect();
    ordered.sort_by(|a, b| b.priority().cmp(&a.priority()));

    let mut items = Vec::new();
    for extractor in ordered {
        if !extractor.can_extract(ctx.text) {
            continue;
        }
        items.extend(extractor.extract(ctx));
    }
    items
}
