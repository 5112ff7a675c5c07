use stackgraph_compute::Function;
use stackgraph_core::GraphResult;
use stackgraph_gateway::HttpApi;
use stackgraph_iam::Role;

use crate::backend::IdentitySubsystem;
use crate::output::Output;

/// Operator-facing values, read from already built entities.
pub fn project(
    api: &HttpApi,
    function: &Function,
    execution_role: &Role,
    identity: &IdentitySubsystem,
) -> GraphResult<Vec<Output>> {
    Ok(vec![
        Output::new("ApiEndpoint", api.api_endpoint())?
            .with_description("HTTP API endpoint URL for the items function"),
        Output::new("FunctionArn", function.arn())?.with_description("Items function ARN"),
        Output::new("FunctionRoleArn", execution_role.arn())?
            .with_description("Execution role of the items function"),
        Output::new("IdentityPoolId", identity.identity_pool.identity_pool_id())?
            .with_description("Identity Pool ID"),
        Output::new("UserPoolId", identity.user_pool.user_pool_id())?
            .with_description("User Pool ID"),
        Output::new("UserPoolClientId", identity.client.client_id())?
            .with_description("User Pool Client ID"),
    ])
}
