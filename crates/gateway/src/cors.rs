use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stackgraph_core::{Duration, GraphError, GraphResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CorsMethod {
    #[serde(rename = "*")]
    Any,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Delete,
}

impl CorsMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CorsMethod::Any => "*",
            CorsMethod::Get => "GET",
            CorsMethod::Head => "HEAD",
            CorsMethod::Options => "OPTIONS",
            CorsMethod::Patch => "PATCH",
            CorsMethod::Post => "POST",
            CorsMethod::Put => "PUT",
            CorsMethod::Delete => "DELETE",
        }
    }
}

/// Cross-origin preflight policy of an HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPreflight {
    pub allow_headers: Vec<String>,
    pub allow_methods: Vec<CorsMethod>,
    pub allow_origins: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: Option<Duration>,
}

impl CorsPreflight {
    /// All headers, all methods, all origins.
    pub fn permissive(max_age: Duration) -> Self {
        Self {
            allow_headers: vec!["*".to_string()],
            allow_methods: vec![CorsMethod::Any],
            allow_origins: vec!["*".to_string()],
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: Some(max_age),
        }
    }

    pub fn validate(&self) -> GraphResult<()> {
        if let Some(age) = self.max_age {
            if age.is_negative() {
                return Err(GraphError::validation("CORS max age cannot be negative"));
            }
            age.to_seconds()?;
        }
        if self.allow_credentials && self.allow_origins.iter().any(|o| o == "*") {
            return Err(GraphError::validation(
                "CORS credentials cannot be allowed for the '*' origin",
            ));
        }
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut out = Map::new();
        if !self.allow_headers.is_empty() {
            out.insert("AllowHeaders".to_string(), json!(self.allow_headers));
        }
        if !self.allow_methods.is_empty() {
            let methods: Vec<&str> = self.allow_methods.iter().map(|m| m.as_str()).collect();
            out.insert("AllowMethods".to_string(), json!(methods));
        }
        if !self.allow_origins.is_empty() {
            out.insert("AllowOrigins".to_string(), json!(self.allow_origins));
        }
        if !self.expose_headers.is_empty() {
            out.insert("ExposeHeaders".to_string(), json!(self.expose_headers));
        }
        if self.allow_credentials {
            out.insert("AllowCredentials".to_string(), json!(true));
        }
        if let Some(age) = self.max_age {
            // Validated as whole seconds before the api accepts the policy.
            out.insert("MaxAge".to_string(), json!(age.as_chrono().num_seconds()));
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_policy_renders_wildcards() {
        let cors = CorsPreflight::permissive(Duration::days(10));
        cors.validate().unwrap();
        assert_eq!(
            cors.to_json(),
            json!({
                "AllowHeaders": ["*"],
                "AllowMethods": ["*"],
                "AllowOrigins": ["*"],
                "MaxAge": 864000,
            })
        );
    }

    #[test]
    fn credentials_with_any_origin_are_rejected() {
        let mut cors = CorsPreflight::permissive(Duration::days(1));
        cors.allow_credentials = true;
        assert!(matches!(cors.validate(), Err(GraphError::Validation(_))));

        cors.allow_origins = vec!["https://app.example.com".to_string()];
        assert!(cors.validate().is_ok());
    }

    #[test]
    fn negative_max_age_is_rejected() {
        let cors = CorsPreflight::permissive(Duration::seconds(-5));
        assert!(cors.validate().is_err());
    }
}
