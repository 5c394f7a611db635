//! Python source parser: env-var sub-extractors (grounded on
//! `examples/original_source/src/jnkn/parsing/python/extractors/*.py`)
//! plus a lightweight function/class/import scan.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use jnkn_core::{Node, NodeType};

use crate::context::ExtractionContext;
use crate::languages::{run_env_var_extractors, EnvVarExtractor};
use crate::parser::{ParseItem, Parser};
use crate::validation::is_valid_env_var_name;

struct StdlibExtractor;
struct DotenvExtractor;
struct EnvironsExtractor;
struct DjangoExtractor;
struct PydanticExtractor;
struct ClickTyperExtractor;
struct AirflowExtractor;
struct HeuristicExtractor;

static STDLIB_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r#"os\.getenv\s*\(\s*["']([^"']+)["']"#).unwrap(), "os.getenv"),
        (Regex::new(r#"os\.environ\.get\s*\(\s*["']([^"']+)["']"#).unwrap(), "os.environ.get"),
        (Regex::new(r#"os\.environ\s*\[\s*["']([^"']+)["']"#).unwrap(), "os.environ[]"),
        (Regex::new(r#"(?:^|[^.])environ\.get\s*\(\s*["']([^"']+)["']"#).unwrap(), "environ.get"),
        (Regex::new(r#"(?:^|[^.])environ\s*\[\s*["']([^"']+)["']"#).unwrap(), "environ[]"),
        (Regex::new(r#"(?:^|[^.])getenv\s*\(\s*["']([^"']+)["']"#).unwrap(), "getenv"),
    ]
});

impl EnvVarExtractor for StdlibExtractor {
    fn name(&self) -> &'static str {
        "stdlib"
    }
    fn priority(&self) -> i32 {
        100
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("os.") || text.contains("environ") || text.contains("getenv")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for (pattern, source) in STDLIB_PATTERNS.iter() {
            for caps in pattern.captures_iter(ctx.text) {
                let m = caps.get(1).unwrap();
                push_env_var(&mut items, ctx, m.as_str(), m.start(), source);
            }
        }
        items
    }
}

static DOTENV_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"dotenv_values\s*\([^)]*\)\s*\[\s*["']([^"']+)["']"#).unwrap());
static DOTENV_ASSIGN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)\s*=\s*dotenv_values\s*\(").unwrap());

impl EnvVarExtractor for DotenvExtractor {
    fn name(&self) -> &'static str {
        "dotenv"
    }
    fn priority(&self) -> i32 {
        70
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("dotenv")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in DOTENV_INLINE.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            push_env_var(&mut items, ctx, m.as_str(), m.start(), "dotenv_values");
        }

        let config_vars: Vec<String> = DOTENV_ASSIGN
            .captures_iter(ctx.text)
            .map(|c| c.get(1).unwrap().as_str().to_string())
            .collect();
        if config_vars.is_empty() {
            return items;
        }
        let alt = config_vars.iter().map(|v| regex::escape(v)).collect::<Vec<_>>().join("|");
        if let Ok(dict_access) = Regex::new(&format!(r#"(?:{alt})\s*\[\s*["']([^"']+)["']"#)) {
            for caps in dict_access.captures_iter(ctx.text) {
                let m = caps.get(1).unwrap();
                push_env_var(&mut items, ctx, m.as_str(), m.start(), "dotenv_values");
            }
        }
        if let Ok(get_access) = Regex::new(&format!(r#"(?:{alt})\.get\s*\(\s*["']([^"']+)["']"#)) {
            for caps in get_access.captures_iter(ctx.text) {
                let m = caps.get(1).unwrap();
                push_env_var(&mut items, ctx, m.as_str(), m.start(), "dotenv_values");
            }
        }
        items
    }
}

static ENVIRONS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"env\.(?:str|int|bool|float|list|dict|json|url|path|db|cache|email_url|search_url)\s*\(\s*["']([^"']+)["']"#).unwrap()
});

impl EnvVarExtractor for EnvironsExtractor {
    fn name(&self) -> &'static str {
        "environs"
    }
    fn priority(&self) -> i32 {
        40
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("env")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in ENVIRONS_PATTERN.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            push_env_var(&mut items, ctx, m.as_str(), m.start(), "environs");
        }
        items
    }
}

static DJANGO_ENVIRON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"env(?:\.[a-zA-Z_]+)?\s*\(\s*["']([^"']+)["']"#).unwrap());

impl EnvVarExtractor for DjangoExtractor {
    fn name(&self) -> &'static str {
        "django"
    }
    fn priority(&self) -> i32 {
        60
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("environ") || text.contains("Env")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in DJANGO_ENVIRON.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            push_env_var(&mut items, ctx, m.as_str(), m.start(), "django_environ");
        }
        items
    }
}

static PYDANTIC_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)Field\s*\([^)]*env\s*=\s*["']([^"']+)["']"#).unwrap());
static PYDANTIC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)class\s+(\w+)\s*\([^)]*BaseSettings[^)]*\)\s*:\s*\n(.*?)(?=\nclass\s+\w+\s*[\(:]|\z)").unwrap()
});
static PYDANTIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class\s+Config\s*:.*?env_prefix\s*=\s*["']([^"']*)["']"#).unwrap()
});
static PYDANTIC_FIELD_DEF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]{4}(\w+)\s*:\s*\w+.*$").unwrap());

impl EnvVarExtractor for PydanticExtractor {
    fn name(&self) -> &'static str {
        "pydantic"
    }
    fn priority(&self) -> i32 {
        90
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("BaseSettings") || text.contains("Field")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();

        for caps in PYDANTIC_FIELD.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            push_env_var(&mut items, ctx, m.as_str(), m.start(), "pydantic_field");
        }

        for class_caps in PYDANTIC_CLASS.captures_iter(ctx.text) {
            let class_body = class_caps.get(2).unwrap().as_str();
            let class_start = class_caps.get(0).unwrap().start();

            let prefix = PYDANTIC_PREFIX
                .captures(class_body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();

            for field_match in PYDANTIC_FIELD_DEF.captures_iter(class_body) {
                let whole = field_match.get(0).unwrap().as_str();
                let field_name = field_match.get(1).unwrap().as_str();
                if field_name.starts_with('_') || field_name == "Config" {
                    continue;
                }
                if whole.contains("Field") && whole.contains("env=") {
                    continue;
                }
                let env_var_name = format!("{prefix}{}", field_name.to_uppercase());
                if !ctx.mark_seen(&env_var_name) {
                    continue;
                }
                let offset = class_start + field_match.get(0).unwrap().start();
                let line = ctx.line_number(offset);
                items.push(ParseItem::node(
                    ctx.create_env_var_node(&env_var_name, line, "pydantic_settings")
                        .with_metadata(Node::INFERRED, true),
                ));
                items.push(ParseItem::edge(ctx.create_reads_edge(
                    &format!("env:{env_var_name}"),
                    line,
                    "pydantic_settings",
                )));
            }
        }

        items
    }
}

static CLICK_TYPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:@click\.option|typer\.Option)\s*\([^)]*envvar\s*=\s*(\[[^\]]+\]|["'][^"']+["'])"#).unwrap()
});
static QUOTED_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).unwrap());

impl EnvVarExtractor for ClickTyperExtractor {
    fn name(&self) -> &'static str {
        "click_typer"
    }
    fn priority(&self) -> i32 {
        80
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("click") || text.contains("typer")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in CLICK_TYPER.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let envvar_val = caps.get(1).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            for value in QUOTED_VALUE.captures_iter(envvar_val) {
                let var_name = value.get(1).unwrap().as_str();
                if !is_valid_env_var_name(var_name) || !ctx.mark_seen(var_name) {
                    continue;
                }
                items.push(ParseItem::node(ctx.create_env_var_node(var_name, line, "click_typer")));
                items.push(ParseItem::edge(ctx.create_reads_edge(
                    &format!("env:{var_name}"),
                    line,
                    "click_typer",
                )));
            }
        }
        items
    }
}

static AIRFLOW_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Variable\.get\s*\(\s*["']([^"']+)["']"#).unwrap());

impl EnvVarExtractor for AirflowExtractor {
    fn name(&self) -> &'static str {
        "airflow"
    }
    fn priority(&self) -> i32 {
        50
    }
    fn can_extract(&self, text: &str) -> bool {
        text.contains("Variable") && text.contains("airflow")
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in AIRFLOW_VARIABLE.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            push_env_var(&mut items, ctx, m.as_str(), m.start(), "airflow_variable");
        }
        items
    }
}

static HEURISTIC_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^([A-Z][A-Z0-9_]*(?:_URL|_HOST|_PORT|_KEY|_SECRET|_TOKEN|_PASSWORD|_USER|_PATH|_DIR|_ENDPOINT|_URI|_DSN|_CONN))\s*=",
    )
    .unwrap()
});
const ENV_INDICATORS: &[&str] = &[
    "os.getenv", "os.environ", "getenv", "environ", "config", "settings", "env", "ENV",
];

impl EnvVarExtractor for HeuristicExtractor {
    fn name(&self) -> &'static str {
        "heuristic"
    }
    fn priority(&self) -> i32 {
        10
    }
    fn can_extract(&self, _text: &str) -> bool {
        true
    }
    fn extract(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for caps in HEURISTIC_ASSIGNMENT.captures_iter(ctx.text) {
            let m = caps.get(1).unwrap();
            let var_name = m.as_str();
            if !ctx.mark_seen(var_name) {
                continue;
            }
            let line_start = ctx.text[..m.start()].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let line_end = ctx.text[m.start()..].find('\n').map(|i| m.start() + i).unwrap_or(ctx.text.len());
            let line_content = &ctx.text[line_start..line_end];
            if !ENV_INDICATORS.iter().any(|ind| line_content.contains(ind)) {
                continue;
            }
            let line = ctx.line_number(m.start());
            items.push(ParseItem::node(
                ctx.create_env_var_node(var_name, line, "heuristic")
                    .with_metadata(Node::CONFIDENCE, 0.7),
            ));
            items.push(ParseItem::edge(ctx.create_reads_edge(
                &format!("env:{var_name}"),
                line,
                "heuristic",
            )));
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

fn env_var_extractors() -> Vec<Box<dyn EnvVarExtractor>> {
    vec![
        Box::new(StdlibExtractor),
        Box::new(DotenvExtractor),
        Box::new(EnvironsExtractor),
        Box::new(DjangoExtractor),
        Box::new(PydanticExtractor),
        Box::new(ClickTyperExtractor),
        Box::new(AirflowExtractor),
        Box::new(HeuristicExtractor),
    ]
}

static DEF_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(\s*)def\s+(\w+)\s*\(").unwrap());
static CLASS_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^class\s+(\w+)\s*[:\(]").unwrap());
static IMPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*import\s+([\w.]+)").unwrap());
static FROM_IMPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*from\s+([\w.]+)\s+import").unwrap());

/// Python source parser: env-var sub-extractors plus a shallow
/// function/class/import scan (no real AST — see module docs).
pub struct PythonParser;

impl Parser for PythonParser {
    fn name(&self) -> &'static str {
        "python"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        has_extension(ctx.path, &["py", "pyi"])
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = run_env_var_extractors(&env_var_extractors(), ctx);

        for caps in CLASS_PATTERN.captures_iter(ctx.text) {
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

        for caps in DEF_PATTERN.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(2).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            let id = format!("{}::{}", ctx.path_str(), name);
            items.push(ParseItem::node(
                Node::new(id, name, NodeType::CodeEntity)
                    .with_path(ctx.path_str())
                    .with_metadata(Node::LINE, line)
                    .with_metadata("entity_kind", "function"),
            ));
        }

        for pattern in [&*IMPORT_PATTERN, &*FROM_IMPORT_PATTERN] {
            for caps in pattern.captures_iter(ctx.text) {
                let whole = caps.get(0).unwrap();
                let module = caps.get(1).unwrap().as_str();
                let line = ctx.line_number(whole.start());
                let target_path = module.replace('.', "/");
                let target_id = format!("file://{target_path}.py");
                items.push(ParseItem::node(
                    Node::new(target_id.clone(), module, NodeType::CodeFile)
                        .with_path(target_path)
                        .with_metadata(Node::VIRTUAL, true),
                ));
                items.push(ParseItem::edge(ctx.create_imports_edge(&target_id, line, "import")));
            }
        }

        items
    }
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
        let path = Path::new("app.py");
        let mut ctx = ExtractionContext::new(path, text, "file://app.py");
        PythonParser.parse(&mut ctx)
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
    fn stdlib_getenv_is_detected() {
        let items = run("host = os.getenv(\"DATABASE_HOST\")\n");
        assert!(env_var_ids(&items).contains(&"env:DATABASE_HOST".to_string()));
    }

    #[test]
    fn higher_priority_extractor_wins_over_heuristic() {
        let items = run("DATABASE_URL = os.getenv(\"DATABASE_URL\")\n");
        let hits = env_var_ids(&items);
        assert_eq!(hits.iter().filter(|id| *id == "env:DATABASE_URL").count(), 1);
    }

    #[test]
    fn pydantic_basesettings_fields_are_inferred() {
        let text = "class Settings(BaseSettings):\n    database_url: str\n\n    class Config:\n        env_prefix = \"APP_\"\n";
        let items = run(text);
        assert!(env_var_ids(&items).contains(&"env:APP_DATABASE_URL".to_string()));
    }

    #[test]
    fn functions_and_classes_are_extracted() {
        let text = "class Foo:\n    def bar(self):\n        pass\n\ndef baz():\n    pass\n";
        let items = run(text);
        let entity_names: Vec<&str> = items
            .iter()
            .filter_map(|i| match i {
                ParseItem::Node(n) if n.node_type == NodeType::CodeEntity => Some(n.name.as_str()),
                _ => None,
            })
            .collect();
        assert!(entity_names.contains(&"Foo"));
        assert!(entity_names.contains(&"bar"));
        assert!(entity_names.contains(&"baz"));
    }
}
