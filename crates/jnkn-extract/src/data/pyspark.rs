//! PySpark parser: Spark config reads and Delta Lake table references,
//! grounded on `examples/original_source/{src,packages/jnkn-core/src}/jnkn/
//! parsing/pyspark/extractors/{spark_config,delta}.py`.

use std::sync::LazyLock;

use regex::Regex;

use jnkn_core::{Edge, EdgeType};

use crate::context::ExtractionContext;
use crate::parser::{ParseItem, Parser};

static CONF_GET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"spark\.conf\.get\s*\(\s*["']([^"']+)["']"#).unwrap());
static DELTA_FOR_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"DeltaTable\.forPath\s*\([^,]+,\s*["']([^"']+)["']"#).unwrap());
static DELTA_FOR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"DeltaTable\.forName\s*\([^,]+,\s*["']([^"']+)["']"#).unwrap());

/// PySpark source parser (`.py` files that also match `python.rs`'s
/// `PythonParser` — both run and their output is merged by the
/// dispatcher): `spark.conf.get` reads and Delta Lake table references.
pub struct PySparkParser;

impl Parser for PySparkParser {
    fn name(&self) -> &'static str {
        "pyspark"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        if ctx.path.extension().and_then(|e| e.to_str()) != Some("py") {
            return false;
        }
        let lower = ctx.text.to_lowercase();
        (lower.contains("spark") && lower.contains("conf")) || lower.contains("delta") || ctx.text.contains("DeltaTable")
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();

        for caps in CONF_GET.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let key = caps.get(1).unwrap().as_str();
            if !ctx.mark_seen(&format!("spark_conf:{key}")) {
                continue;
            }
            let line = ctx.line_number(whole.start());
            let config_id = format!("config:spark:{key}");
            items.push(ParseItem::node(ctx.create_config_node(&config_id, key, line, "spark")));
            items.push(ParseItem::edge(ctx.create_reads_edge(&config_id, line, "spark.conf.get")));
        }

        for (pattern, source) in [(&*DELTA_FOR_PATH, "DeltaTable.forPath"), (&*DELTA_FOR_NAME, "DeltaTable.forName")] {
            for caps in pattern.captures_iter(ctx.text) {
                let whole = caps.get(0).unwrap();
                let table_ref = caps.get(1).unwrap().as_str();
                if !ctx.mark_seen(&format!("delta:{table_ref}")) {
                    continue;
                }
                let line = ctx.line_number(whole.start());
                let table_id = format!("data:delta:{table_ref}");
                items.push(ParseItem::node(
                    ctx.create_data_asset_node(&table_id, table_ref, "delta")
                        .with_metadata("format", "delta"),
                ));
                items.push(ParseItem::edge(
                    Edge::observed(ctx.file_id.clone(), table_id, EdgeType::Reads)
                        .with_metadata(Edge::LINE, line)
                        .with_metadata(Edge::SOURCE, source),
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

    fn run(text: &str) -> Vec<ParseItem> {
        let path = Path::new("job.py");
        let mut ctx = ExtractionContext::new(path, text, "file://job.py");
        PySparkParser.parse(&mut ctx)
    }

    #[test]
    fn spark_conf_get_is_extracted() {
        let items = run("threads = spark.conf.get(\"spark.sql.shuffle.partitions\")\n");
        assert!(items
            .iter()
            .any(|i| matches!(i, ParseItem::Node(n) if n.id == "config:spark:spark.sql.shuffle.partitions")));
    }

    #[test]
    fn delta_table_for_path_is_extracted() {
        let items = run("table = DeltaTable.forPath(spark, \"/mnt/silver/orders\")\n");
        assert!(items
            .iter()
            .any(|i| matches!(i, ParseItem::Node(n) if n.id == "data:delta:/mnt/silver/orders")));
    }
}
