//! Go source parser: env-var reads plus a shallow function/import scan,
//! grounded on `examples/original_source/{src,packages/jnkn-core/src}/jnkn/
//! parsing/go/extractors/env_vars.py`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use jnkn_core::{Node, NodeType};

use crate::context::ExtractionContext;
use crate::languages::{run_env_var_extractors, EnvVarExtractor};
use crate::parser::{ParseItem, Parser};
use crate::validation::is_valid_env_var_name;

struct StdEnvExtractor;
struct ViperExtractor;

static STD_ENV_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"os\.Getenv\s*\(\s*"([^"]+)"\s*\)"#).unwrap(),
        Regex::new(r#"syscall\.Getenv\s*\(\s*"([^"]+)"\s*\)"#).unwrap(),
        Regex::new(r#"os\.LookupEnv\s*\(\s*"([^"]+)"\s*\)"#).unwrap(),
    ]
});

impl EnvVarExtractor for StdEnvExtractor {
    fn name(&self) -> &'static str {
        "go_stdlib"
    }
    fn priority(&self) -> i32 {
        100
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("Getenv") || text.contains("LookupEnv")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for pattern in STD_ENV_PATTERNS.iter() {
            for caps in pattern.captures_iter(ctx.text) {
                let m = caps.get(1).unwrap();
                push_env_var(&mut items, ctx, m.as_str(), m.start(), "os.Getenv");
            }
        }
        items
    }
}

static VIPER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"viper\.Get(?:String|Int|Bool|Float64|StringSlice|Duration)?\s*\(\s*"([^"]+)"\s*\)"#).unwrap()
});

impl EnvVarExtractor for ViperExtractor {
    fn name(&self) -> &'static str {
        "viper"
    }
    fn priority(&self) -> i32 {
        60
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("viper")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in VIPER_PATTERN.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            let key = m.as_str().to_uppercase().replace('.', "_").replace('-', "_");
            push_env_var(&mut items, ctx, &key, m.start(), "viper");
        }
        items
    }
}

fn push_env_var(items: &mut Vec<ParseItem>, ctx: &mut ExtractionContext, var_name: &str, offset: usize, source: &str) {
    if !is_valid_env_var_name(var_name) || !ctx.mark_seen(var_name) {
        return;
    }
    let line = ctx.line_number(offset);
    items.push(ParseItem::node(ctx.create_env_var_node(var_name, line, source)));
    items.push(ParseItem::edge(ctx.create_reads_edge(&format!("env:{var_name}"), line, source)));
}

static IMPORT_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?s)import\s*\(\s*(.*?)\s*\)"#).unwrap());
static IMPORT_SINGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)^import\s+"([^"]+)""#).unwrap());
static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static FUNC_DECL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^func\s+(?:\([^)]*\)\s*)?(\w+)\s*\(").unwrap());

/// Go source parser: stdlib/Viper env-var reads, import scan, and a
/// shallow function scan (no real AST — see module docs).
pub struct GoParser;

impl Parser for GoParser {
    fn name(&self) -> &'static str {
        "go"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        ctx.path.extension().and_then(|e| e.to_str()) == Some("go")
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let extractors: Vec<Box<dyn EnvVarExtractor>> = vec![Box::new(StdEnvExtractor), Box::new(ViperExtractor)];
        let mut items = run_env_var_extractors(&extractors, ctx);

        if let Some(block) = IMPORT_BLOCK.captures(ctx.text) {
            let body = block.get(1).unwrap().as_str();
            for caps in IMPORT_LINE.captures_iter(body) {
                let module = caps.get(1).unwrap().as_str();
                push_import(&mut items, ctx, module);
            }
        }
        for caps in IMPORT_SINGLE.captures_iter(ctx.text) {
            let module = caps.get(1).unwrap().as_str();
            push_import(&mut items, ctx, module);
        }

        for caps in FUNC_DECL.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            let id = format!("{}::{}", ctx.path_str(), name);
            items.push(ParseItem::node(
                Node::new(id, name, NodeType::CodeEntity)
                    .with_path(ctx.path_str())
                    .with_metadata(Node::LINE, line)
                    .with_metadata("entity_kind", "function"),
            ));
        }

        items
    }
}

fn push_import(items: &mut Vec<ParseItem>, ctx: &ExtractionContext, module: &str) {
    if !module.contains('/') || module.starts_with("golang.org") {
        return;
    }
    let line = ctx.line_number(0);
    let target_id = format!("file://{module}");
    items.push(ParseItem::node(
        Node::new(target_id.clone(), module, NodeType::CodeFile).with_metadata(Node::VIRTUAL, true),
    ));
    items.push(ParseItem::edge(ctx.create_imports_edge(&target_id, line, "import")));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<ParseItem> {
        let path = Path::new("main.go");
        let mut ctx = ExtractionContext::new(path, text, "file://main.go");
        GoParser.parse(&mut ctx)
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
    fn os_getenv_is_detected() {
        let items = run("host := os.Getenv(\"DATABASE_HOST\")\n");
        assert!(env_var_ids(&items).contains(&"env:DATABASE_HOST".to_string()));
    }

    #[test]
    fn viper_key_is_uppercased_into_an_env_name() {
        let items = run("port := viper.GetInt(\"server.port\")\n");
        assert!(env_var_ids(&items).contains(&"env:SERVER_PORT".to_string()));
    }

    #[test]
    fn functions_are_extracted() {
        let items = run("func Handler(w http.ResponseWriter, r *http.Request) {\n}\n");
        let names: Vec<&str> = items
            .iter()
            .filter_map(|i| match i {
                ParseItem::Node(n) if n.node_type == NodeType::CodeEntity => Some(n.name.as_str()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"Handler"));
    }
}
