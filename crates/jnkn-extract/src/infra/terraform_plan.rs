//! Terraform plan JSON (`terraform show -json`) parser. No original-source
//! counterpart survived the retrieval filter — grounded directly on the
//! `resource_changes` shape every `terraform show -json` plan emits, and
//! on `openlineage.rs`'s "`can_parse` sniffs content, not filename"
//! convention for JSON-shaped inputs.

use jnkn_core::Node;

use crate::context::ExtractionContext;
use crate::parser::{ParseItem, Parser};

/// Recognizes any `.json` file whose top level has a `resource_changes`
/// array, regardless of filename (`tfplan.json`, `plan.json`, ...).
pub struct TerraformPlanParser;

impl Parser for TerraformPlanParser {
    fn name(&self) -> &'static str {
        "terraform_plan"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        is_json(ctx.path) && ctx.text.contains("\"resource_changes\"")
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let Ok(plan) = serde_json::from_str::<serde_json::Value>(ctx.text) else {
            return Vec::new();
        };
        let Some(changes) = plan.get("resource_changes").and_then(|v| v.as_array()) else {
            return Vec::new();
        };

        let mut items = Vec::new();
        for change in changes {
            let Some(res_type) = change.get("type").and_then(|v| v.as_str()) else { continue };
            let Some(res_name) = change.get("name").and_then(|v| v.as_str()) else { continue };
            let address = change.get("address").and_then(|v| v.as_str()).unwrap_or(res_name);

            let node_id = format!("infra:{res_type}.{res_name}");
            if !ctx.mark_seen(&node_id) {
                continue;
            }

            let change_type = change
                .get("change")
                .and_then(|c| c.get("actions"))
                .and_then(|a| a.as_array())
                .map(|actions| {
                    actions
                        .iter()
                        .filter_map(|a| a.as_str())
                        .collect::<Vec<_>>()
                        .join("_")
                })
                .unwrap_or_else(|| "no-op".to_string());

            let node = ctx
                .create_infra_node(&node_id, res_name, 0, res_type)
                .with_metadata(Node::SOURCE, "terraform_plan")
                .with_metadata(Node::CHANGE_TYPE, change_type)
                .with_metadata("address", address);
            items.push(ParseItem::node(node));
            items.push(ParseItem::edge(ctx.create_provisions_edge(&node_id)));
        }
        items
    }
}

fn is_json(path: &std::path::Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const PLAN: &str = r#"{
        "resource_changes": [
            {
                "address": "aws_instance.web",
                "type": "aws_instance",
                "name": "web",
                "change": { "actions": ["create"] }
            },
            {
                "address": "aws_s3_bucket.assets",
                "type": "aws_s3_bucket",
                "name": "assets",
                "change": { "actions": ["no-op"] }
            }
        ]
    }"#;

    #[test]
    fn each_resource_change_yields_an_infra_node_with_change_type() {
        let path = Path::new("tfplan.json");
        let mut ctx = ExtractionContext::new(path, PLAN, "file://tfplan.json");
        let items = TerraformPlanParser.parse(&mut ctx);

        let created = items.iter().find(|i| matches!(i, ParseItem::Node(n) if n.id == "infra:aws_instance.web"));
        assert!(created.is_some());
        if let Some(ParseItem::Node(n)) = created {
            assert_eq!(n.metadata.get(Node::CHANGE_TYPE).unwrap(), "create");
        }
    }

    #[test]
    fn non_plan_json_is_not_claimed() {
        let path = Path::new("config.json");
        let ctx = ExtractionContext::new(path, "{\"foo\": 1}", "file://config.json");
        assert!(!TerraformPlanParser.can_parse(&ctx));
    }
}
