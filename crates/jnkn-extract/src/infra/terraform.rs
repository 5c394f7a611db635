//! Static `.tf` parser, grounded on
//! `examples/original_source/src/jnkn/parsing/terraform/extractors/
//! resources.py`'s `ResourceExtractor` (`resource "type" "name" {}` →
//! `infra:type.name` plus a `Provisions` edge from the file), extended to
//! the other HCL block kinds the original's own `parser.py` stub names:
//! `data`, `locals`, `output`, `module`, and `var.X`/`module.X.output`
//! references.

use std::sync::LazyLock;

use regex::Regex;

use jnkn_core::{Edge, EdgeType};

use crate::context::ExtractionContext;
use crate::parser::{ParseItem, Parser};

static RESOURCE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"resource\s+"([^"]+)"\s+"([^"]+)"\s*\{"#).unwrap());
static DATA_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"data\s+"([^"]+)"\s+"([^"]+)"\s*\{"#).unwrap());
static MODULE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"module\s+"([^"]+)"\s*\{"#).unwrap());
static OUTPUT_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"output\s+"([^"]+)"\s*\{"#).unwrap());
static LOCALS_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)locals\s*\{(.*?)\}").unwrap());
static LOCAL_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*([\w-]+)\s*=").unwrap());
static VAR_REFERENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bvar\.([\w-]+)").unwrap());
static MODULE_OUTPUT_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmodule\.([\w-]+)\.([\w-]+)").unwrap());

/// Terraform `.tf`/`.tf.json` HCL parser: resource/data/module/output/
/// locals blocks plus `var.X` and `module.X.output` references.
pub struct TerraformParser;

impl Parser for TerraformParser {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        ctx.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "tf" || e == "tfvars")
            .unwrap_or(false)
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();

        for caps in RESOURCE_BLOCK.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let (res_type, res_name) = (caps.get(1).unwrap().as_str(), caps.get(2).unwrap().as_str());
            let line = ctx.line_number(whole.start());
            let node_id = format!("infra:{res_type}.{res_name}");
            items.push(ParseItem::node(ctx.create_infra_node(&node_id, res_name, line, res_type)));
            items.push(ParseItem::edge(ctx.create_provisions_edge(&node_id)));
        }

        for caps in DATA_BLOCK.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let (data_type, data_name) = (caps.get(1).unwrap().as_str(), caps.get(2).unwrap().as_str());
            let line = ctx.line_number(whole.start());
            let node_id = format!("infra:data.{data_type}.{data_name}");
            items.push(ParseItem::node(ctx.create_infra_node(
                &node_id,
                data_name,
                line,
                &format!("data.{data_type}"),
            )));
            items.push(ParseItem::edge(Edge::observed(ctx.file_id.clone(), node_id, EdgeType::Reads)));
        }

        for caps in MODULE_BLOCK.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            let node_id = format!("infra:module.{name}");
            items.push(ParseItem::node(ctx.create_infra_node(&node_id, name, line, "module")));
            items.push(ParseItem::edge(ctx.create_provisions_edge(&node_id)));
        }

        for caps in OUTPUT_BLOCK.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            let node_id = format!("config:terraform.output.{name}");
            items.push(ParseItem::node(ctx.create_config_node(&node_id, name, line, "terraform_output")));
            items.push(ParseItem::edge(ctx.create_contains_edge(&node_id)));
        }

        if let Some(locals_match) = LOCALS_BLOCK.captures(ctx.text) {
            let block = locals_match.get(1).unwrap();
            let block_start = block.start();
            for caps in LOCAL_ASSIGNMENT.captures_iter(block.as_str()) {
                let name_match = caps.get(1).unwrap();
                let line = ctx.line_number(block_start + name_match.start());
                let node_id = format!("config:terraform.local.{}", name_match.as_str());
                items.push(ParseItem::node(ctx.create_config_node(
                    &node_id,
                    name_match.as_str(),
                    line,
                    "terraform_local",
                )));
                items.push(ParseItem::edge(ctx.create_contains_edge(&node_id)));
            }
        }

        for caps in VAR_REFERENCE.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            let node_id = format!("config:terraform.var.{name}");
            items.push(ParseItem::node(ctx.create_config_node(&node_id, name, line, "terraform_var")));
            items.push(ParseItem::edge(ctx.create_reads_edge(&node_id, line, "var_reference")));
        }

        for caps in MODULE_OUTPUT_REFERENCE.captures_iter(ctx.text) {
            let whole = caps.get(0).unwrap();
            let module_name = caps.get(1).unwrap().as_str();
            let line = ctx.line_number(whole.start());
            let target_id = format!("infra:module.{module_name}");
            items.push(ParseItem::edge(Edge::observed(
                ctx.file_id.clone(),
                target_id,
                EdgeType::DependsOn,
            ).with_metadata(Edge::LINE, line).with_metadata(Edge::VIA, "module_output_reference")));
        }

        items
    }
}
