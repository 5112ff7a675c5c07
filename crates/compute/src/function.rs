use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stackgraph_core::{Duration, Expr, GraphError, GraphResult, LogicalId, Resource};
use stackgraph_iam::Role;

const MAX_FUNCTION_NAME_LEN: usize = 64;
const MAX_TIMEOUT_SECS: i64 = 900;
const MIN_MEMORY_MB: u32 = 128;
const MAX_MEMORY_MB: u32 = 10_240;

/// Environment variables the runtime sets itself; user values would be ignored
/// or rejected at deploy time.
const RESERVED_ENV_KEYS: &[&str] = &[
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
    "AWS_EXECUTION_ENV",
    "AWS_ACCESS_KEY",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "LAMBDA_TASK_ROOT",
    "LAMBDA_RUNTIME_DIR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Runtime {
    #[serde(rename = "python3.9")]
    Python39,
    #[serde(rename = "python3.12")]
    Python312,
    #[serde(rename = "nodejs20.x")]
    Nodejs20x,
    #[serde(rename = "provided.al2023")]
    ProvidedAl2023,
}

impl Runtime {
    pub fn name(self) -> &'static str {
        match self {
            Runtime::Python39 => "python3.9",
            Runtime::Python312 => "python3.12",
            Runtime::Nodejs20x => "nodejs20.x",
            Runtime::ProvidedAl2023 => "provided.al2023",
        }
    }

    /// Image the external bundler uses to build code for this runtime.
    pub fn bundling_image(self) -> String {
        format!("public.ecr.aws/sam/build-{}", self.name())
    }

    /// Custom runtimes take an opaque handler; managed ones use `module.function`.
    fn requires_dotted_handler(self) -> bool {
        !matches!(self, Runtime::ProvidedAl2023)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    X86_64,
    Arm64,
}

impl Architecture {
    pub fn name(self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm64",
        }
    }
}

/// Entry point reference, e.g. `app.lambda_handler`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handler(String);

impl Handler {
    pub fn new(handler: impl Into<String>) -> GraphResult<Self> {
        let handler = handler.into();
        if handler.is_empty() || handler.chars().any(char::is_whitespace) {
            return Err(GraphError::validation(format!("invalid handler '{handler}'")));
        }
        Ok(Self(handler))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_dotted(&self) -> bool {
        matches!(self.0.rsplit_once('.'), Some((module, func)) if !module.is_empty() && !func.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProps {
    pub function_name: String,
    pub runtime: Runtime,
    pub code: crate::Code,
    pub handler: Handler,
    pub timeout: Duration,
    pub architecture: Architecture,
    pub memory_size: u32,
    pub environment: BTreeMap<String, Expr>,
}

/// A stateless function bound to one role.
///
/// The environment is the only attribute that changes after construction, and
/// it does so by value: [`Function::with_environment`] consumes the function
/// and returns the updated one.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    logical_id: LogicalId,
    props: FunctionProps,
    role_id: LogicalId,
    role_arn: Expr,
}

impl Function {
    pub fn new(logical_id: LogicalId, props: FunctionProps, role: &Role) -> GraphResult<Self> {
        validate_function_name(&props.function_name)?;

        let timeout_secs = props.timeout.to_seconds()?;
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(GraphError::validation(format!(
                "timeout {} must be between 1s and {MAX_TIMEOUT_SECS}s",
                props.timeout
            )));
        }
        if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&props.memory_size) {
            return Err(GraphError::validation(format!(
                "memory size {} MB must be between {MIN_MEMORY_MB} and {MAX_MEMORY_MB}",
                props.memory_size
            )));
        }
        if props.runtime.requires_dotted_handler() && !props.handler.is_dotted() {
            return Err(GraphError::validation(format!(
                "handler '{}' must look like <module>.<function> for {}",
                props.handler.as_str(),
                props.runtime.name()
            )));
        }
        for key in props.environment.keys() {
            validate_env_key(key)?;
        }

        Ok(Self {
            logical_id,
            props,
            role_id: role.logical_id().clone(),
            role_arn: role.arn(),
        })
    }

    /// Return this function with one more environment entry.
    ///
    /// Re-adding an existing key replaces its value.
    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<Expr>) -> GraphResult<Self> {
        let key = key.into();
        validate_env_key(&key)?;
        let value = value.into();
        tracing::debug!(function = %self.logical_id, key = %key, value = %value, "environment entry set");
        self.props.environment.insert(key, value);
        Ok(self)
    }

    pub fn function_name(&self) -> &str {
        &self.props.function_name
    }

    pub fn runtime(&self) -> Runtime {
        self.props.runtime
    }

    pub fn handler(&self) -> &Handler {
        &self.props.handler
    }

    pub fn timeout(&self) -> Duration {
        self.props.timeout
    }

    pub fn architecture(&self) -> Architecture {
        self.props.architecture
    }

    pub fn code(&self) -> &crate::Code {
        &self.props.code
    }

    pub fn environment(&self) -> &BTreeMap<String, Expr> {
        &self.props.environment
    }

    /// Logical id of the bound role.
    pub fn role_id(&self) -> &LogicalId {
        &self.role_id
    }

    pub fn role_arn(&self) -> &Expr {
        &self.role_arn
    }

    pub fn arn(&self) -> Expr {
        self.attribute("Arn")
    }
}

fn validate_function_name(name: &str) -> GraphResult<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if name.is_empty() || name.len() > MAX_FUNCTION_NAME_LEN || !valid_chars {
        return Err(GraphError::validation(format!(
            "invalid function name '{name}' (1-64 chars of [a-zA-Z0-9_-])"
        )));
    }
    Ok(())
}

fn validate_env_key(key: &str) -> GraphResult<()> {
    let mut chars = key.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(GraphError::validation(format!(
            "invalid environment variable name '{key}'"
        )));
    }
    if RESERVED_ENV_KEYS.contains(&key) || key.starts_with("AWS_LAMBDA_") {
        return Err(GraphError::validation(format!(
            "environment variable '{key}' is reserved by the runtime"
        )));
    }
    Ok(())
}

impl Resource for Function {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Lambda::Function"
    }

    fn properties(&self) -> Value {
        let mut props = Map::new();
        props.insert("FunctionName".to_string(), json!(self.props.function_name));
        props.insert("Runtime".to_string(), json!(self.props.runtime.name()));
        props.insert("Handler".to_string(), json!(self.props.handler.as_str()));
        props.insert("Role".to_string(), self.role_arn.to_json());
        props.insert("Code".to_string(), self.props.code.properties());
        // Whole seconds were checked in `new`.
        props.insert(
            "Timeout".to_string(),
            json!(self.props.timeout.as_chrono().num_seconds()),
        );
        props.insert("MemorySize".to_string(), json!(self.props.memory_size));
        props.insert(
            "Architectures".to_string(),
            json!([self.props.architecture.name()]),
        );
        if !self.props.environment.is_empty() {
            let variables: Map<String, Value> = self
                .props
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            props.insert("Environment".to_string(), json!({ "Variables": variables }));
        }
        Value::Object(props)
    }

    fn depends_on(&self) -> Vec<LogicalId> {
        vec![self.role_id.clone()]
    }

    fn metadata(&self) -> Option<Value> {
        self.props.code.metadata()
    }
}
