//! Synthesized deployment template.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use stackgraph_core::{ResourceDeclaration, SynthesisId};

use crate::graph::Stack;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Identity of one synthesis run, stamped into the template metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisContext {
    synthesis_id: SynthesisId,
    synthesized_at: DateTime<Utc>,
}

impl SynthesisContext {
    pub fn new() -> Self {
        Self::fixed(SynthesisId::new(), Utc::now())
    }

    /// A context with caller-chosen id and time, for reproducible output.
    pub fn fixed(synthesis_id: SynthesisId, synthesized_at: DateTime<Utc>) -> Self {
        Self {
            synthesis_id,
            synthesized_at,
        }
    }

    pub fn synthesis_id(&self) -> SynthesisId {
        self.synthesis_id
    }

    pub fn synthesized_at(&self) -> DateTime<Utc> {
        self.synthesized_at
    }
}

impl Default for SynthesisContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "Metadata")]
    metadata: Value,
    #[serde(rename = "Resources")]
    resources: BTreeMap<String, ResourceDeclaration>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, Value>,
}

impl Template {
    pub(crate) fn render(stack: &Stack, context: &SynthesisContext) -> Self {
        let resources = stack
            .resources()
            .iter()
            .map(|decl| (decl.logical_id.as_str().to_string(), decl.clone()))
            .collect();
        let outputs = stack
            .outputs()
            .map(|o| (o.name().as_str().to_string(), o.to_json()))
            .collect();
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: stack.description().map(str::to_string),
            metadata: json!({
                "stackgraph": {
                    "stackName": stack.name(),
                    "synthesisId": context.synthesis_id.to_string(),
                    "synthesizedAt": context
                        .synthesized_at
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                }
            }),
            resources,
            outputs,
        }
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDeclaration> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> &BTreeMap<String, ResourceDeclaration> {
        &self.resources
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    pub fn outputs(&self) -> &BTreeMap<String, Value> {
        &self.outputs
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn to_string_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
