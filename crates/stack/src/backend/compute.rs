use std::collections::BTreeMap;

use stackgraph_compute::{Architecture, Bundling, Code, Function, FunctionProps, Handler};
use stackgraph_core::{Duration, Expr, GraphResult, LogicalId, Resource};
use stackgraph_iam::Role;

use crate::config::FunctionConfig;

/// Build the items function with its initial environment.
///
/// Identifiers of resources built later are injected by the link pass.
pub fn build(id: LogicalId, config: &FunctionConfig, role: &Role, region: &str) -> GraphResult<Function> {
    let code = Code::asset(&config.code_path, &config.asset_bucket, &config.asset_key)?
        .with_bundling(Bundling::pip_install(config.runtime.bundling_image()));

    let props = FunctionProps {
        function_name: config.function_name.clone(),
        runtime: config.runtime,
        code,
        handler: Handler::new(&config.handler)?,
        timeout: Duration::try_seconds(config.timeout_seconds)?,
        architecture: Architecture::X86_64,
        memory_size: config.memory_mb,
        environment: BTreeMap::from([("REGION".to_string(), Expr::literal(region))]),
    };
    let function = Function::new(id, props, role)?;
    tracing::info!(function = %function.logical_id(), runtime = function.runtime().name(), "function built");
    Ok(function)
}

#[cfg(test)]
mod tests {
    use stackgraph_iam::Principal;

    use super::*;

    fn role() -> Role {
        Role::new(
            LogicalId::new("ExecutionRole").unwrap(),
            Principal::service("lambda.amazonaws.com"),
        )
    }

    #[test]
    fn initial_environment_holds_only_the_region() {
        let f = build(
            LogicalId::new("ItemsFunction").unwrap(),
            &FunctionConfig::default(),
            &role(),
            "us-east-1",
        )
        .unwrap();
        assert_eq!(f.environment().len(), 1);
        assert_eq!(f.environment()["REGION"], Expr::literal("us-east-1"));
        assert_eq!(f.timeout(), Duration::seconds(10));
        assert_eq!(f.architecture(), Architecture::X86_64);
        assert_eq!(f.role_id().as_str(), "ExecutionRole");
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let config = FunctionConfig {
            timeout_seconds: 901,
            ..FunctionConfig::default()
        };
        assert!(build(LogicalId::new("ItemsFunction").unwrap(), &config, &role(), "us-east-1").is_err());
    }
}
