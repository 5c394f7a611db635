//! JavaScript/TypeScript source parser: ESM/CJS/dynamic import scan plus a
//! single `process.env.X` env-var extractor, grounded on
//! `examples/original_source/packages/jnkn-core/src/jnkn/parsing/javascript/
//! extractors/imports.py`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use jnkn_core::{Node, NodeType};

use crate::context::ExtractionContext;
use crate::languages::{run_env_var_extractors, EnvVarExtractor};
use crate::parser::{ParseItem, Parser};
use crate::validation::is_valid_env_var_name;

struct ProcessEnvExtractor;

static PROCESS_ENV_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"process\.env\.([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static PROCESS_ENV_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"process\.env\s*\[\s*["']([^"']+)["']\s*\]"#).unwrap());
static IMPORT_META_ENV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"import\.meta\.env\.([A-Za-z_][A-Za-z0-9_]*)").unwrap());

impl EnvVarExtractor for ProcessEnvExtractor {
    fn name(&self) -> &'static str {
        "process_env"
    }
    fn priority(&self) -> i32 {
        100
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("process.env") || text.contains("import.meta.env")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for pattern in [&*PROCESS_ENV_DOT, &*IMPORT_META_ENV] {
            for caps in pattern.captures_iter(ctx.text) {
                let m = caps.get(1).unwrap();
                push_env_var(&mut items, ctx, m.as_str(), m.start());
            }
        }
        for caps in PROCESS_ENV_BRACKET.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            push_env_var(&mut items, ctx, m.as_str(), m.start());
        }
        items
    }
}

fn push_env_var(items: &mut Vec<ParseItem>, ctx: &mut ExtractionContext, var_name: &str, offset: usize) {
    if !is_valid_env_var_name(var_name) || !ctx.mark_seen(var_name) {
        return;
    }
    let line = ctx.line_number(offset);
    items.push(ParseItem::node(ctx.create_env_var_node(var_name, line, "process_env")));
    items.push(ParseItem::edge(ctx.create_reads_edge(&format!("env:{var_name}"), line, "process_env")));
}

// ESM static: `import ... from "mod"`. ESM dynamic: `import("mod")`.
// CJS: `require("mod")`.
static STATIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s+(?:[^'"]+?\s+from\s+)?["']([^"']+)["']"#).unwrap());
static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"import\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap());
static REQUIRE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap());

static FUNCTION_DECL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*(?:export\s+)?(?:async\s+)?function\s+(\w+)\s*\(").unwrap());
static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*(?:export\s+)?class\s+(\w+)").unwrap());
static ARROW_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:export\s+)?const\s+(\w+)\s*=\s*(?:async\s*)?\([^)]*\)\s*=>").unwrap());

/// JS/TS source parser: imports, `process.env`/`import.meta.env` reads, and
/// a shallow function/class scan (no real AST — see module docs).
pub struct JavaScriptParser;

impl Parser for JavaScriptParser {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        has_extension(ctx.path, &["js", "jsx", "ts", "tsx", "mjs", "cjs"])
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let extractors: Vec<Box<dyn EnvVarExtractor>> = vec![Box::new(ProcessEnvExtractor)];
        let mut items = run_env_var_extractors(&extractors, ctx);

        for pattern in [&*STATIC_IMPORT, &*DYNAMIC_IMPORT, &*REQUIRE_CALL] {
            for caps in pattern.captures_iter(ctx.text) {
                let whole = caps.get(0).unwrap();
                let module = caps.get(1).unwrap().as_str();
                if !module.starts_with('.') {
                    // package import, not a repo-local file dependency
                    continue;
                }
                let line = ctx.line_number(whole.start());
                let target_id = format!("file://{}", resolve_relative(ctx, module));
                items.push(ParseItem::node(
                    Node::new(target_id.clone(), module, NodeType::CodeFile).with_metadata(Node::VIRTUAL, true),
                ));
                items.push(ParseItem::edge(ctx.create_imports_edge(&target_id, line, "import")));
            }
        }

        for caps in CLASS_DECL.captures_iter(ctx.text) {
            push_entity(&mut items, ctx, &caps, "class");
        }
        for caps in FUNCTION_DECL.captures_iter(ctx.text) {
            push_entity(&mut items, ctx, &caps, "function");
        }
        for caps in ARROW_CONST.captures_iter(ctx.text) {
            push_entity(&mut items, ctx, &caps, "function");
        }

        items
    }
}

fn push_entity(items: &mut Vec<ParseItem>, ctx: &ExtractionContext, caps: &regex::Captures, kind: &str) {
    let whole = caps.get(0).unwrap();
    let name = caps.get(1).unwrap().as_str();
    let line = ctx.line_number(whole.start());
    let id = format!("{}::{}", ctx.path_str(), name);
    items.push(ParseItem::node(
        Node::new(id, name, NodeType::CodeEntity)
            .with_path(ctx.path_str())
            .with_metadata(Node::LINE, line)
            .with_metadata("entity_kind", kind),
    ));
}

/// Best-effort relative-path resolution: join the importer's directory with
/// the specifier, without touching the filesystem (the target file may not
/// exist yet in a partial scan).
fn resolve_relative(ctx: &ExtractionContext, module: &str) -> String {
    let base_dir = Path::new(&ctx.path_str())
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut parts: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    for segment in module.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<ParseItem> {
        let path = Path::new("src/app.ts");
        let mut ctx = ExtractionContext::new(path, text, "file://src/app.ts");
        JavaScriptParser.parse(&mut ctx)
    }

    fn env_var_ids(items: &[ParseItem]) -> Vec<String> {
        items
            .iter()
            .filter_map(|i| match i {
                ParseItem::Node(n) if n.node_type == NodeType::EnvVar => Some(n.id.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn process_env_dot_access_is_detected() {
        let items = run("const host = process.env.DATABASE_HOST;\n");
        assert!(env_var_ids(&items).contains(&"env:DATABASE_HOST".to_string()));
    }

    #[test]
    fn process_env_bracket_access_is_detected() {
        let items = run("const key = process.env['API_KEY'];\n");
        assert!(env_var_ids(&items).contains(&"env:API_KEY".to_string()));
    }

    #[test]
    fn relative_imports_resolve_against_importer_directory() {
        let items = run("import { helper } from \"../lib/helper\";\n");
        let has_edge = items.iter().any(|i| matches!(i, ParseItem::Edge(e) if e.target_id == "file://src/../lib/helper" || e.target_id.ends_with("lib/helper")));
        assert!(has_edge);
    }

    #[test]
    fn package_imports_are_ignored() {
        let items = run("import React from \"react\";\n");
        assert!(!items.iter().any(|i| matches!(i, ParseItem::Edge(e) if e.target_id.contains("react"))));
    }

    #[test]
    fn functions_and_classes_are_extracted() {
        let items = run("export class Foo {}\nexport function bar() {}\nconst baz = () => {};\n");
        let names: Vec<&str> = items
            .iter()
            .filter_map(|i| match i {
                ParseItem::Node(n) if n.node_type == NodeType::CodeEntity => Some(n.name.as_str()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"Foo"));
        assert!(names.contains(&"bar"));
        assert!(names.contains(&"baz"));
    }
}
