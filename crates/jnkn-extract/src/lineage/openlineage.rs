//! OpenLineage event parser: a single object or array of run events,
//! grounded on
//! `examples/original_source/{src,packages/jnkn-core/src}/jnkn/parsing/
//! openlineage/extractors/{jobs,datasets}.py`'s `JobExtractor`/
//! `DatasetExtractor` (`job:<namespace>/<name>` / `data:<namespace>/<name>`
//! ids, `Contains`/`Reads`/`Writes` edges, only `COMPLETE`/`RUNNING` events
//! considered).

use jnkn_core::{Edge, EdgeType, Node, NodeType};

use crate::context::ExtractionContext;
use crate::parser::{ParseItem, Parser};

const ACCEPTED_EVENT_TYPES: &[&str] = &["COMPLETE", "RUNNING"];

/// OpenLineage run-event parser. `can_parse` sniffs content shape, not the
/// filename, since events commonly arrive as arbitrarily-named `.json`.
pub struct OpenLineageParser;

impl Parser for OpenLineageParser {
    fn name(&self) -> &'static str {
        "openlineage"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        ctx.path.extension().and_then(|e| e.to_str()) == Some("json")
            && ctx.text.contains("\"job\"")
            && ctx.text.contains("\"namespace\"")
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(ctx.text) else {
            return Vec::new();
        };
        let events: Vec<serde_json::Value> = match value {
            serde_json::Value::Array(events) => events,
            serde_json::Value::Object(_) => vec![value],
            _ => Vec::new(),
        };

        let mut items = Vec::new();
        for event in events {
            let Some(event_type) = event.get("eventType").and_then(|v| v.as_str()) else { continue };
            if !ACCEPTED_EVENT_TYPES.contains(&event_type) {
                continue;
            }

            let job = event.get("job").cloned().unwrap_or_default();
            let job_namespace = job.get("namespace").and_then(|v| v.as_str()).unwrap_or("default");
            let Some(job_name) = job.get("name").and_then(|v| v.as_str()) else { continue };
            let job_id = format!("job:{job_namespace}/{job_name}");

            if ctx.mark_seen(&job_id) {
                let tokens = jnkn_stitch::tokenize(job_name);
                let mut job_node = Node::new(job_id.clone(), job_name, NodeType::Job)
                    .with_path(ctx.path_str())
                    .with_metadata(Node::NAMESPACE, job_namespace)
                    .with_metadata(Node::SOURCE, "openlineage");
                job_node.tokens = tokens;
                if let Some(run_id) = event.get("run").and_then(|r| r.get("runId")) {
                    job_node = job_node.with_metadata("run_id", run_id.clone());
                }
                items.push(ParseItem::node(job_node));
                items.push(ParseItem::edge(ctx.create_contains_edge(&job_id)));
            }

            for input in event.get("inputs").and_then(|v| v.as_array()).into_iter().flatten() {
                process_dataset(ctx, &mut items, input, &job_id, EdgeType::Reads);
            }
            for output in event.get("outputs").and_then(|v| v.as_array()).into_iter().flatten() {
                process_dataset(ctx, &mut items, output, &job_id, EdgeType::Writes);
            }
        }

        items
    }
}

fn process_dataset(
    ctx: &mut ExtractionContext,
    items: &mut Vec<ParseItem>,
    dataset: &serde_json::Value,
    job_id: &str,
    edge_type: EdgeType,
) {
    let namespace = dataset.get("namespace").and_then(|v| v.as_str()).unwrap_or("default");
    let Some(name) = dataset.get("name").and_then(|v| v.as_str()) else { return };
    let dataset_id = format!("data:{namespace}/{name}");

    if ctx.mark_seen(&dataset_id) {
        let schema_fields: Vec<String> = dataset
            .get("facets")
            .and_then(|f| f.get("schema"))
            .and_then(|s| s.get("fields"))
            .and_then(|f| f.as_array())
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.get("name").and_then(|n| n.as_str()).map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        items.push(ParseItem::node(
            ctx.create_data_asset_node(&dataset_id, name, "dataset")
                .with_metadata(Node::NAMESPACE, namespace)
                .with_metadata(Node::SOURCE, "openlineage")
                .with_metadata("schema_fields", schema_fields),
        ));
    }

    items.push(ParseItem::edge(
        Edge::observed(job_id, dataset_id, edge_type).with_metadata(Edge::SOURCE, "openlineage"),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const EVENT: &str = r#"{
        "eventType": "COMPLETE",
        "job": { "namespace": "analytics", "name": "build_orders" },
        "run": { "runId": "abc-123" },
        "inputs": [{ "namespace": "raw", "name": "orders" }],
        "outputs": [{ "namespace": "analytics", "name": "fct_orders" }]
    }"#;

    fn run(text: &str) -> Vec<ParseItem> {
        let path = Path::new("events/run.json");
        let mut ctx = ExtractionContext::new(path, text, "file://events/run.json");
        OpenLineageParser.parse(&mut ctx)
    }

    #[test]
    fn job_node_and_dataset_edges_are_extracted() {
        let items = run(EVENT);
        assert!(items.iter().any(|i| matches!(i, ParseItem::Node(n) if n.id == "job:analytics/build_orders")));
        assert!(items.iter().any(|i| {
            matches!(i, ParseItem::Edge(e) if e.source_id == "job:analytics/build_orders" && e.target_id == "data:raw/orders" && e.edge_type == EdgeType::Reads)
        }));
        assert!(items.iter().any(|i| {
            matches!(i, ParseItem::Edge(e) if e.target_id == "data:analytics/fct_orders" && e.edge_type == EdgeType::Writes)
        }));
    }

    #[test]
    fn non_complete_or_running_events_are_skipped() {
        let text = EVENT.replace("COMPLETE", "START");
        let items = run(&text);
        assert!(items.is_empty());
    }
}
