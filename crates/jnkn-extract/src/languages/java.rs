//! Java source parser: env-var reads plus a shallow class/method scan,
//! grounded on `examples/original_source/{src,packages/jnkn-core/src}/jnkn/
//! parsing/java/extractors/env_vars.py`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use jnkn_core::{Node, NodeType};

use crate::context::ExtractionContext;
use crate::languages::{run_env_var_extractors, EnvVarExtractor};
use crate::parser::{ParseItem, Parser};
use crate::validation::is_valid_env_var_name;

struct SystemEnvExtractor;
struct SpringValueExtractor;
struct SpringEnvironmentExtractor;

static SYSTEM_GETENV: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"System\.getenv\s*\(\s*"([^"]+)"\s*\)"#).unwrap());
static SYSTEM_GETPROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"System\.getProperty\s*\(\s*"([^"]+)"\s*(?:,[^)]*)?\)"#).unwrap());

impl EnvVarExtractor for SystemEnvExtractor {
    fn name(&self) -> &'static str {
        "system_env"
    }
    fn priority(&self) -> i32 {
        100
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("System.getenv") || text.contains("System.getProperty")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in SYSTEM_GETENV.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            push_env_var(&mut items, ctx, m.as_str(), m.start(), "System.getenv");
        }
        for caps in SYSTEM_GETPROPERTY.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            let key = normalize_property_key(m.as_str());
            push_env_var(&mut items, ctx, &key, m.start(), "System.getProperty");
        }
        items
    }
}

static SPRING_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"@Value\s*\(\s*"\$\{([^}:]+)(?::[^}]*)?\}"\s*\)"#).unwrap());

impl EnvVarExtractor for SpringValueExtractor {
    fn name(&self) -> &'static str {
        "spring_value"
    }
    fn priority(&self) -> i32 {
        90
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("@Value")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in SPRING_VALUE.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            let key = normalize_property_key(m.as_str());
            push_env_var(&mut items, ctx, &key, m.start(), "spring_value");
        }
        items
    }
}

static SPRING_ENVIRONMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:environment|env)\.getProperty\s*\(\s*"([^"]+)"\s*(?:,[^)]*)?\)"#).unwrap());

impl EnvVarExtractor for SpringEnvironmentExtractor {
    fn name(&self) -> &'static str {
        "spring_environment"
    }
    fn priority(&self) -> i32 {
        80
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("Environment") && text.contains("getProperty")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in SPRING_ENVIRONMENT.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            let key = normalize_property_key(m.as_str());
            push_env_var(&mut items, ctx, &key, m.start(), "spring_environment");
        }
        items
    }
}

fn normalize_property_key(key: &str) -> String {
    key.to_uppercase().replace(['.', '-'], "_")
}

fn push_env_var(items: &mut Vec<ParseItem>, ctx: &mut ExtractionContext, var_name: &str, offset: usize, source: &str) {
    if !is_valid_env_var_name(var_name) || !ctx.mark_seen(var_name) {
        return;
    }
    let line = ctx.line_number(offset);
    items.push(ParseItem::node(ctx.create_env_var_node(var_name, line, source)));
    items.push(ParseItem::edge(ctx.create_reads_edge(&format!("env:{var_name}"), line, source)));
}

static IMPORT_STMT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^import\s+(?:static\s+)?([\w.]+)\s*;").unwrap());
static CLASS_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:public\s+|private\s+|protected\s+)?(?:final\s+|abstract\s+)?class\s+(\w+)").unwrap());
static METHOD_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:public|private|protected)\s+(?:static\s+)?(?:final\s+)?[\w<>\[\],\s]+?\s+(\w+)\s*\([^;{]*\)\s*\{").unwrap()
});

/// Java source parser: env-var reads (`System`, Spring `@Value`/
/// `Environment`), an import scan, and a shallow class/method scan (no real
/// AST — see module docs).
pub struct JavaParser;

impl Parser for JavaParser {
    fn name(&self) -> &'static str {
        "java"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        ctx.path.extension().and_then(|e| e.to_str()) == Some("java")
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let extractors: Vec<Box<dyn EnvVarExtractor>> = vec![
            Box::new(SystemEnvExtractor),
            Box::new(SpringValueExtractor),
            Box::new(SpringEnvironmentExtractor),
        ];
        let mut items = run_env_var_extractors(&extractors, ctx);

        for caps in IMPORT_STMT.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let package = caps.get(1).unwrap().as_str();
            if package.starts_with("java.") || package.starts_with("javax.") {
                continue;
            }
            let line = ctx.line_number(whole.start());
            let target_path = package.replace('.', "/");
            let target_id = format!("file://{target_path}.java");
            items.push(ParseItem::node(
                Node::new(target_id.clone(), package, NodeType::CodeFile).with_metadata(Node::VIRTUAL, true),
            ));
            items.push(ParseItem::edge(ctx.create_imports_edge(&target_id, line, "import")));
        }

        for caps in CLASS_DECL.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            let id = format!("{}::{}", ctx.path_str(), name);
            items.push(ParseItem::node(
                Node::new(id, name, NodeType::CodeEntity)
                    .with_path(ctx.path_str())
                    .with_metadata(Node::LINE, line)
                    .with_metadata("entity_kind", "class"),
            ));
        }

        for caps in METHOD_DECL.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str();
            if name == "if" || name == "for" || name == "while" || name == "switch" {
                continue;
            }
            let line = ctx.line_number(whole.start());
            let id = format!("{}::{}", ctx.path_str(), name);
            items.push(ParseItem::node(
                Node::new(id, name, NodeType::CodeEntity)
                    .with_path(ctx.path_str())
                    .with_metadata(Node::LINE, line)
                    .with_metadata("entity_kind", "method"),
            ));
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<ParseItem> {
        let path = Path::new("App.java");
        let mut ctx = ExtractionContext::new(path, text, "file://App.java");
        JavaParser.parse(&mut ctx)
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
    fn system_getenv_is_detected() {
        let items = run("String host = System.getenv(\"DATABASE_HOST\");\n");
        assert!(env_var_ids(&items).contains(&"env:DATABASE_HOST".to_string()));
    }

    #[test]
    fn spring_value_annotation_is_normalized() {
        let items = run("@Value(\"${database.url}\")\nprivate String databaseUrl;\n");
        assert!(env_var_ids(&items).contains(&"env:DATABASE_URL".to_string()));
    }

    #[test]
    fn classes_are_extracted() {
        let items = run("public class OrderService {\n}\n");
        let names: Vec<&str> = items
            .iter()
            .filter_map(|i| match i {
                ParseItem::Node(n) if n.node_type == NodeType::CodeEntity => Some(n.name.as_str()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"OrderService"));
    }
}
