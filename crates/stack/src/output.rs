use serde_json::{Map, Value, json};

use stackgraph_core::{Expr, GraphError, GraphResult, LogicalId};

/// A named value exposed to operators after deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    name: LogicalId,
    value: Expr,
    description: Option<String>,
    export_name: Option<String>,
}

impl Output {
    pub fn new(name: &str, value: Expr) -> GraphResult<Self> {
        Ok(Self {
            name: LogicalId::new(name)?,
            value,
            description: None,
            export_name: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Make the value importable by other stacks under `name`.
    pub fn with_export_name(mut self, name: impl Into<String>) -> GraphResult<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= 255
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == ':' || c == '-');
        if !valid {
            return Err(GraphError::validation(format!("invalid export name '{name}'")));
        }
        self.export_name = Some(name);
        Ok(self)
    }

    pub fn name(&self) -> &LogicalId {
        &self.name
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("Value".to_string(), self.value.to_json());
        if let Some(description) = &self.description {
            out.insert("Description".to_string(), json!(description));
        }
        if let Some(export) = &self.export_name {
            out.insert("Export".to_string(), json!({ "Name": export }));
        }
        Value::Object(out)
    }
}
