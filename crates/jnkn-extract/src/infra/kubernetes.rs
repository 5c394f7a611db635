//! Kubernetes Deployment/Pod manifest parser. No original-source
//! counterpart survived the retrieval filter — grounded on the manifest's
//! own well-known shape (`spec.template.spec.containers[].env`) and on
//! `dbt.rs`'s "parse the structured format with `serde`, don't regex a
//! YAML/JSON document" convention, since a manifest is a config document,
//! not source code.

use serde::Deserialize;
use serde_yaml::Value;

use jnkn_core::Node;

use crate::context::ExtractionContext;
use crate::parser::{ParseItem, Parser};

const RECOGNIZED_KINDS: &[&str] = &["Deployment", "Pod", "StatefulSet", "DaemonSet", "Job", "CronJob"];

/// Kubernetes manifest parser: container `env`/`envFrom` entries become
/// `EnvVar`/`ConfigKey` reads off of a synthetic per-manifest file id.
pub struct KubernetesParser;

impl Parser for KubernetesParser {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn can_parse(&self, ctx: &ExtractionContext) -> bool {
        let is_manifest_ext = ctx
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false);
        is_manifest_ext && RECOGNIZED_KINDS.iter().any(|k| ctx.text.contains(&format!("kind: {k}")))
    }

    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem> {
        let mut items = Vec::new();
        for document in serde_yaml::Deserializer::from_str(ctx.text) {
            let Ok(doc) = Value::deserialize(document) else { continue };
            let Some(kind) = doc.get("kind").and_then(Value::as_str) else { continue };
            if !RECOGNIZED_KINDS.contains(&kind) {
                continue;
            }
            extract_containers(&doc, ctx, &mut items);
        }
        items
    }
}

fn extract_containers(doc: &Value, ctx: &mut ExtractionContext, items: &mut Vec<ParseItem>) {
    let pod_spec = doc
        .get("spec")
        .and_then(|s| s.get("template"))
        .and_then(|t| t.get("spec"))
        .or_else(|| doc.get("spec"));
    let Some(pod_spec) = pod_spec else { return };
    let Some(containers) = pod_spec.get("containers").and_then(Value::as_sequence) else { return };

    for container in containers {
        if let Some(env_list) = container.get("env").and_then(Value::as_sequence) {
            for entry in env_list {
                let Some(name) = entry.get("name").and_then(Value::as_str) else { continue };
                if !ctx.mark_seen(name) {
                    continue;
                }
                let line = 0;
                if let Some(value_from) = entry.get("valueFrom") {
                    if let Some(cm_ref) = value_from.get("configMapKeyRef") {
                        push_config_ref(ctx, items, name, cm_ref, "configmap");
                        continue;
                    }
                    if let Some(secret_ref) = value_from.get("secretKeyRef") {
                        push_config_ref(ctx, items, name, secret_ref, "secret");
                        continue;
                    }
                }
                items.push(ParseItem::node(ctx.create_env_var_node(name, line, "kubernetes_container_env")));
                items.push(ParseItem::edge(ctx.create_reads_edge(
                    &format!("env:{name}"),
                    line,
                    "kubernetes_container_env",
                )));
            }
        }

        if let Some(env_from) = container.get("envFrom").and_then(Value::as_sequence) {
            for entry in env_from {
                if let Some(cm_ref) = entry.get("configMapRef") {
                    if let Some(name) = cm_ref.get("name").and_then(Value::as_str) {
                        push_source_reference(ctx, items, name, "configmap");
                    }
                }
                if let Some(secret_ref) = entry.get("secretRef") {
                    if let Some(name) = secret_ref.get("name").and_then(Value::as_str) {
                        push_source_reference(ctx, items, name, "secret");
                    }
                }
            }
        }
    }
}

fn push_config_ref(ctx: &mut ExtractionContext, items: &mut Vec<ParseItem>, env_name: &str, key_ref: &Value, kind: &str) {
    let ref_name = key_ref.get("name").and_then(Value::as_str).unwrap_or("unknown");
    let key = key_ref.get("key").and_then(Value::as_str).unwrap_or(env_name);
    let config_id = format!("config:{kind}.{ref_name}.{key}");
    items.push(ParseItem::node(ctx.create_config_node(&config_id, key, 0, kind)));
    items.push(ParseItem::edge(ctx.create_reads_edge(&config_id, 0, "env_value_from")));
}

fn push_source_reference(ctx: &mut ExtractionContext, items: &mut Vec<ParseItem>, ref_name: &str, kind: &str) {
    let config_id = format!("config:{kind}.{ref_name}");
    items.push(ParseItem::node(
        ctx.create_config_node(&config_id, ref_name, 0, kind).with_metadata(Node::SOURCE, "envFrom"),
    ));
    items.push(ParseItem::edge(ctx.create_reads_edge(&config_id, 0, "env_from")));
}
