//! dbt parsers: `manifest.json` (compiled node/source graph) and `*.sql`
//! model files. The SQL side is grounded on
//! `examples/original_source/src/jnkn/parsing/dbt/extractors/sql_files.py`'s
//! `SQLFileExtractor` (`{{ ref(...) }}`/`{{ source(...) }}`/`{{ config(...) }}`
//! regexes, `data:model:<name>` / `data:source:<ns>.<table>` ids). The
//! manifest side has no surviving original-source file — grounded directly
//! on dbt's own `manifest.json` schema (`nodes`/`sources` maps keyed by
//! `unique_id`, each node's `depends_on.nodes` list).

use std::sync::LazyLock;

use regex::Regex;

use jnkn_core::{Edge, EdgeType};

use crate::context::ExtractionContext;
use crate::parser::{ParseItem, Parser};

static REF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\{\s*ref\s*\(\s*['"]([^'"]+)['"]\s*\)\s*\}\}"#).unwrap());
static SOURCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*source\s*\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]\s*\)\s*\}\}"#).unwrap()
});
static CONFIG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{\s*config\s*\(([^)]+)\)\s*\}\}").unwrap());

/// `*.sql` dbt model parser: `ref()`/`source()`/`config()` Jinja calls.
pub struct DbtSqlParser;

impl Parser for DbtSqlParser {
    fn name(&self) -> &'static str {
        "dbt_sql"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        ctx.path.extension().and_then(|e| e.to_str()) == Some("sql") && ctx.text.contains("{{")
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let model_name = ctx
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        let model_id = format!("data:model:{model_name}");

        let materialized = CONFIG_PATTERN
            .captures(ctx.text)
            .map(|c| c.get(1).unwrap().as_str())
            .filter(|config_str| config_str.contains("materialized"))
            .map(|_| "derived");

        let mut model_node = ctx.create_data_asset_node(&model_id, &model_name, "model");
        model_node = model_node.with_metadata("resource_type", "model").with_metadata("from_sql", true);
        if let Some(materialized) = materialized {
            model_node = model_node.with_metadata("materialized", materialized);
        }

        let mut items = vec![ParseItem::node(model_node), ParseItem::edge(ctx.create_contains_edge(&model_id))];

        for caps in REF_PATTERN.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let ref_name = caps.get(1).unwrap().as_str();
            let ref_id = format!("data:model:{ref_name}");
            let line = ctx.line_number(whole.start());
            items.push(ParseItem::edge(
                Edge::observed(model_id.clone(), ref_id, EdgeType::DependsOn)
                    .with_metadata(Edge::LINE, line)
                    .with_metadata(Edge::VIA, "ref"),
            ));
        }

        for caps in SOURCE_PATTERN.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let (source_name, table_name) = (caps.get(1).unwrap().as_str(), caps.get(2).unwrap().as_str());
            let source_id = format!("data:source:{source_name}.{table_name}");
            let line = ctx.line_number(whole.start());
            items.push(ParseItem::edge(
                Edge::observed(model_id.clone(), source_id, EdgeType::Reads)
                    .with_metadata(Edge::LINE, line)
                    .with_metadata(Edge::VIA, "source"),
            ));
        }

        items
    }
}

/// `manifest.json` parser: the compiled dbt project graph. Sniffs content
/// rather than the filename so renamed manifests (`target/manifest.json`
/// under any artifacts directory) still match.
pub struct DbtManifestParser;

impl Parser for DbtManifestParser {
    fn name(&self) -> &'static str {
        "dbt_manifest"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        ctx.path.extension().and_then(|e| e.to_str()) == Some("json")
            && ctx.text.contains("\"nodes\"")
            && ctx.text.contains("\"resource_type\"")
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let Ok(manifest) = serde_json::from_str::<serde_json::Value>(ctx.text) else {
            return Vec::new();
        };
        let mut items = Vec::new();

        if let Some(nodes) = manifest.get("nodes").and_then(|v| v.as_object()) {
            for node in nodes.values() {
                let Some(resource_type) = node.get("resource_type").and_then(|v| v.as_str()) else { continue };
                if resource_type != "model" {
                    continue;
                }
                let Some(name) = node.get("name").and_then(|v| v.as_str()) else { continue };
                let model_id = format!("data:model:{name}");
                if !ctx.mark_seen(&model_id) {
                    continue;
                }
                items.push(ParseItem::node(
                    ctx.create_data_asset_node(&model_id, name, "model")
                        .with_metadata("resource_type", "model")
                        .with_metadata("schema", node.get("schema").and_then(|v| v.as_str()).unwrap_or_default()),
                ));

                if let Some(deps) = node.get("depends_on").and_then(|d| d.get("nodes")).and_then(|v| v.as_array()) {
                    for dep in deps.iter().filter_map(|v| v.as_str()) {
                        if let Some(dep_name) = dep.strip_prefix("model.").and_then(|s| s.split('.').last()) {
                            items.push(ParseItem::edge(Edge::observed(
                                model_id.clone(),
                                format!("data:model:{dep_name}"),
                                EdgeType::DependsOn,
                            )));
                        }
                    }
                }
            }
        }

        if let Some(sources) = manifest.get("sources").and_then(|v| v.as_object()) {
            for source in sources.values() {
                let (Some(source_name), Some(name)) = (
                    source.get("source_name").and_then(|v| v.as_str()),
                    source.get("name").and_then(|v| v.as_str()),
                ) else {
                    continue;
                };
                let source_id = format!("data:source:{source_name}.{name}");
                if !ctx.mark_seen(&source_id) {
                    continue;
                }
                items.push(ParseItem::node(
                    ctx.create_data_asset_node(&source_id, name, "source")
                        .with_metadata("source_name", source_name),
                ));
            }
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn sql_model_links_ref_and_source() {
        let path = Path::new("models/orders.sql");
        let text = "select * from {{ ref('stg_orders') }} join {{ source('raw', 'customers') }} {{ config(materialized='table') }}";
        let mut ctx = ExtractionContext::new(path, text, "file://models/orders.sql");
        let items = DbtSqlParser.parse(&mut ctx);

        assert!(items.iter().any(|i| matches!(i, ParseItem::Node(n) if n.id == "data:model:orders")));
        assert!(items.iter().any(|i| {
            matches!(i, ParseItem::Edge(e) if e.target_id == "data:model:stg_orders" && e.edge_type == EdgeType::DependsOn)
        }));
        assert!(items.iter().any(|i| {
            matches!(i, ParseItem::Edge(e) if e.target_id == "data:source:raw.customers" && e.edge_type == EdgeType::Reads)
        }));
    }

    #[test]
    fn manifest_model_depends_on_edges_are_extracted() {
        let manifest = r#"{
            "nodes": {
                "model.proj.orders": {
                    "resource_type": "model",
                    "name": "orders",
                    "schema": "analytics",
                    "depends_on": { "nodes": ["model.proj.stg_orders"] }
                },
                "model.proj.stg_orders": {
                    "resource_type": "model",
                    "name": "stg_orders",
                    "schema": "staging",
                    "depends_on": { "nodes": [] }
                }
            },
            "sources": {}
        }"#;
        let path = Path::new("target/manifest.json");
        let mut ctx = ExtractionContext::new(path, manifest, "file://target/manifest.json");
        let items = DbtManifestParser.parse(&mut ctx);

        assert!(items.iter().any(|i| matches!(i, ParseItem::Node(n) if n.id == "data:model:orders")));
        assert!(items.iter().any(|i| {
            matches!(i, ParseItem::Edge(e) if e.source_id == "data:model:orders" && e.target_id == "data:model:stg_orders")
        }));
    }
}
