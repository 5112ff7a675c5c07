//! The assembled items backend.
//!
//! Builders run leaves first: table, execution role, function, identity
//! subsystem, API. The function is built before the pools whose ids it needs,
//! so a final link pass rebuilds it with those ids and re-points the API
//! integration at the linked value. Only linked entities enter the stack.

pub mod api;
pub mod compute;
pub mod execution_role;
pub mod identity;
pub mod outputs;

use stackgraph_compute::Function;
use stackgraph_core::{Expr, GraphError, GraphResult, LogicalId, Resource};
use stackgraph_gateway::{AuthorizerHandle, HttpApi, IntegrationHandle, Route};
use stackgraph_iam::Role;
use stackgraph_storage::{KeyAttribute, Table};

use crate::config::BackendConfig;
use crate::graph::Stack;
use crate::output::Output;
use crate::template::{SynthesisContext, Template};

pub use api::ROUTE_TABLE;
pub use identity::IdentitySubsystem;

pub const USER_POOL_ID_ENV: &str = "USER_POOL_ID";
pub const IDENTITY_POOL_ID_ENV: &str = "IDENTITY_POOL_ID";

#[derive(Debug, Clone)]
pub struct Backend {
    table: Table,
    execution_role: Role,
    function: Function,
    identity: IdentitySubsystem,
    api: HttpApi,
    integration: IntegrationHandle,
    authorizer: AuthorizerHandle,
    outputs: Vec<Output>,
    stack: Stack,
}

impl Backend {
    pub fn assemble(config: &BackendConfig) -> GraphResult<Self> {
        tracing::info!(stack = %config.stack_name, "assembling backend");

        let table = Table::new(
            LogicalId::new("ItemsTable")?,
            &config.table.table_name,
            KeyAttribute::string(&config.table.partition_key),
            Some(KeyAttribute::string(&config.table.sort_key)),
        )?;
        let execution_role = execution_role::build(
            LogicalId::new("FunctionExecutionRole")?,
            &table,
            &config.execution_role,
        )?;
        let function = compute::build(
            LogicalId::new("ItemsFunction")?,
            &config.function,
            &execution_role,
            &config.region,
        )?;
        let identity = identity::build(&config.identity)?;
        let api::ApiSurface {
            mut api,
            integration,
            authorizer,
        } = api::build(&config.api, &function, &identity.authorizer)?;

        let function = link(function, &identity, &mut api, &integration)?;
        let outputs = outputs::project(&api, &function, &execution_role, &identity)?;

        let mut stack = Stack::new(&config.stack_name).with_description(&config.description);
        stack.add(&table)?;
        stack.add(&execution_role)?;
        stack.add(&function)?;
        stack.add_all(identity.resources())?;
        stack.add_all(api.resources())?;
        for output in &outputs {
            stack.add_output(output.clone())?;
        }
        stack.validate()?;

        tracing::info!(
            stack = %config.stack_name,
            resources = stack.resources().len(),
            routes = api.routes().len(),
            "backend assembled"
        );
        Ok(Self {
            table,
            execution_role,
            function,
            identity,
            api,
            integration,
            authorizer,
            outputs,
            stack,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn execution_role(&self) -> &Role {
        &self.execution_role
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn identity(&self) -> &IdentitySubsystem {
        &self.identity
    }

    pub fn api(&self) -> &HttpApi {
        &self.api
    }

    pub fn routes(&self) -> &[Route] {
        self.api.routes()
    }

    pub fn integration(&self) -> &IntegrationHandle {
        &self.integration
    }

    pub fn authorizer(&self) -> &AuthorizerHandle {
        &self.authorizer
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Roles declared by the backend, execution role first.
    pub fn roles(&self) -> [&Role; 2] {
        [&self.execution_role, &self.identity.authenticated_role]
    }

    pub fn role(&self, id: &str) -> GraphResult<&Role> {
        self.roles()
            .into_iter()
            .find(|r| r.logical_id().as_str() == id)
            .ok_or_else(|| GraphError::not_found(format!("role {id}")))
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn synthesize(&self, context: &SynthesisContext) -> GraphResult<Template> {
        self.stack.synthesize(context)
    }
}

/// Inject the pool ids into the function environment and re-point the
/// integration at the resulting value.
fn link(
    function: Function,
    identity: &IdentitySubsystem,
    api: &mut HttpApi,
    integration: &IntegrationHandle,
) -> GraphResult<Function> {
    let linked = function
        .with_environment(USER_POOL_ID_ENV, identity.user_pool.user_pool_id())?
        .with_environment(IDENTITY_POOL_ID_ENV, identity.identity_pool.identity_pool_id())?;
    api.rebind_integration(integration, &linked)?;

    let unresolved: Vec<&str> = [USER_POOL_ID_ENV, IDENTITY_POOL_ID_ENV]
        .into_iter()
        .filter(|key| matches!(linked.environment().get(*key), None | Some(Expr::Literal(_))))
        .collect();
    if !unresolved.is_empty() {
        return Err(GraphError::invariant(format!(
            "link pass left {unresolved:?} unresolved"
        )));
    }
    tracing::debug!(function = %linked.logical_id(), "function linked");
    Ok(linked)
}
