//! Backend configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `STACKGRAPH__`-prefixed environment variables (`__` separates
//! nesting levels, e.g. `STACKGRAPH__TABLE__TABLE_NAME`). A `.env` file is
//! loaded first when present.

use std::path::Path;

use config::{Config as Cfg, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stackgraph_compute::Runtime;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stackgraph.toml";

const ENV_PREFIX: &str = "STACKGRAPH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: String,
    pub sort_key: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: "items".to_string(),
            partition_key: "PK".to_string(),
            sort_key: "SK".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    pub function_name: String,
    pub runtime: Runtime,
    pub handler: String,
    /// Source directory the external bundler packages.
    pub code_path: String,
    pub asset_bucket: String,
    pub asset_key: String,
    pub timeout_seconds: i64,
    pub memory_mb: u32,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            function_name: "items-handler".to_string(),
            runtime: Runtime::Python39,
            handler: "app.lambda_handler".to_string(),
            code_path: "hello_world".to_string(),
            asset_bucket: "stackgraph-assets".to_string(),
            asset_key: "items-handler.zip".to_string(),
            timeout_seconds: 10,
            memory_mb: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionRoleConfig {
    /// Actions granted on `*` for managing the identity subsystem.
    pub identity_admin_actions: Vec<String>,
}

impl Default for ExecutionRoleConfig {
    fn default() -> Self {
        Self {
            identity_admin_actions: vec!["cognito-idp:*".to_string(), "cognito-identity:*".to_string()],
        }
    }
}

/// One permission statement given as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConfig {
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl GrantConfig {
    pub fn is_wildcard(&self) -> bool {
        self.actions.iter().any(|a| a == "*") || self.resources.iter().any(|r| r == "*")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub user_pool_name: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub ses_region: String,
    pub callback_urls: Vec<String>,
    pub logout_urls: Vec<String>,
    pub access_token_minutes: i64,
    pub id_token_minutes: i64,
    pub refresh_token_days: i64,
    pub identity_pool_name: String,
    /// Statements attached to the role of authenticated identities.
    pub authenticated_grants: Vec<GrantConfig>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_pool_name: "items-users".to_string(),
            sender_email: "no-reply@example.com".to_string(),
            sender_name: None,
            ses_region: "us-east-1".to_string(),
            callback_urls: vec!["https://example.com/callback".to_string()],
            logout_urls: Vec::new(),
            access_token_minutes: 60,
            id_token_minutes: 60,
            refresh_token_days: 30,
            identity_pool_name: "ItemsIdentityPool".to_string(),
            authenticated_grants: vec![GrantConfig {
                actions: vec!["*".to_string()],
                resources: vec!["*".to_string()],
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub api_name: String,
    pub cors_max_age_days: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_name: "ItemsHttpApi".to_string(),
            cors_max_age_days: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub stack_name: String,
    pub description: String,
    /// Region handed to the function as `REGION`.
    pub region: String,
    pub table: TableConfig,
    pub function: FunctionConfig,
    pub execution_role: ExecutionRoleConfig,
    pub identity: IdentityConfig,
    pub api: ApiConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            stack_name: "items-backend".to_string(),
            description: "Serverless items API with a user directory and federated identities"
                .to_string(),
            region: "us-east-1".to_string(),
            table: TableConfig::default(),
            function: FunctionConfig::default(),
            execution_role: ExecutionRoleConfig::default(),
            identity: IdentityConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl BackendConfig {
    /// Load defaults, then `path` (or [`DEFAULT_CONFIG_FILE`] if present),
    /// then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let cfg = Cfg::builder()
            .add_source(Cfg::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("execution_role.identity_admin_actions")
                    .with_list_parse_key("identity.callback_urls")
                    .with_list_parse_key("identity.logout_urls"),
            )
            .build()?;

        Self::finish(cfg)
    }

    /// Defaults overlaid with an inline TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let cfg = Cfg::builder()
            .add_source(Cfg::try_from(&Self::default())?)
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Self::finish(cfg)
    }

    fn finish(cfg: Cfg) -> Result<Self, ConfigError> {
        let config: Self = cfg.try_deserialize()?;
        config.validate()?;
        tracing::debug!(stack = %config.stack_name, region = %config.region, "configuration loaded");
        Ok(config)
    }

    /// Semantic checks the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("stack_name", &self.stack_name),
            ("region", &self.region),
            ("table.table_name", &self.table.table_name),
            ("function.function_name", &self.function.function_name),
            ("identity.user_pool_name", &self.identity.user_pool_name),
            ("identity.identity_pool_name", &self.identity.identity_pool_name),
            ("identity.ses_region", &self.identity.ses_region),
            ("api.api_name", &self.api.api_name),
        ];
        if let Some((key, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::invalid(format!("{key} cannot be empty")));
        }
        if self.identity.callback_urls.is_empty() {
            return Err(ConfigError::invalid(
                "identity.callback_urls needs at least one URL for the authorization-code grant",
            ));
        }
        if self.execution_role.identity_admin_actions.is_empty() {
            return Err(ConfigError::invalid(
                "execution_role.identity_admin_actions cannot be empty",
            ));
        }
        if self.identity.authenticated_grants.is_empty() {
            return Err(ConfigError::invalid(
                "identity.authenticated_grants needs at least one statement",
            ));
        }
        for (i, grant) in self.identity.authenticated_grants.iter().enumerate() {
            if grant.actions.is_empty() || grant.resources.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "identity.authenticated_grants[{i}] needs actions and resources"
                )));
            }
        }
        if self.api.cors_max_age_days < 0 {
            return Err(ConfigError::invalid("api.cors_max_age_days cannot be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_items_backend() {
        let config = BackendConfig::default();
        config.validate().unwrap();
        assert_eq!(config.table.partition_key, "PK");
        assert_eq!(config.function.timeout_seconds, 10);
        assert_eq!(config.function.handler, "app.lambda_handler");
        assert_eq!(config.api.cors_max_age_days, 10);
        assert!(config.identity.authenticated_grants[0].is_wildcard());
    }

    #[test]
    fn toml_overrides_only_what_it_names() {
        let config = BackendConfig::from_toml(
            r#"
            region = "eu-west-1"

            [identity]
            callback_urls = ["https://app.example.org/auth"]

            [[identity.authenticated_grants]]
            actions = ["s3:GetObject"]
            resources = ["arn:aws:s3:::uploads/*"]
            "#,
        )
        .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.identity.callback_urls, vec!["https://app.example.org/auth"]);
        assert_eq!(config.identity.authenticated_grants.len(), 1);
        assert!(!config.identity.authenticated_grants[0].is_wildcard());
        assert_eq!(config.table.table_name, "items");
        assert_eq!(config.identity.refresh_token_days, 30);
    }

    #[test]
    fn runtime_parses_from_its_wire_name() {
        let config = BackendConfig::from_toml(
            r#"
            [function]
            runtime = "python3.12"
            "#,
        )
        .unwrap();
        assert_eq!(config.function.runtime, Runtime::Python312);
    }

    #[test]
    fn semantic_errors_are_reported() {
        let err = BackendConfig::from_toml(
            r#"
            [api]
            api_name = "   "
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let mut config = BackendConfig::default();
        config.table.table_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_load_error() {
        let err = BackendConfig::from_toml("region = ").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
