//! Infrastructure-as-code parsers: Terraform (HCL + plan JSON) and
//! Kubernetes manifests.

pub mod kubernetes;
pub mod terraform;
pub mod terraform_plan;
