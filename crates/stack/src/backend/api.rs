use stackgraph_compute::Function;
use stackgraph_core::{Duration, GraphResult, LogicalId, Resource};
use stackgraph_gateway::{
    AuthorizerHandle, CorsPreflight, HttpApi, HttpMethod, IntegrationHandle, RouteAuthorizer,
};

use crate::config::ApiConfig;

/// The items API surface. Every route is authorized.
pub const ROUTE_TABLE: [(HttpMethod, &str); 8] = [
    (HttpMethod::Post, "/items"),
    (HttpMethod::Get, "/items"),
    (HttpMethod::Get, "/items/{listID}"),
    (HttpMethod::Patch, "/items/{listID}"),
    (HttpMethod::Patch, "/items/{listID}/status"),
    (HttpMethod::Patch, "/items/{listID}/{taskID}/status"),
    (HttpMethod::Delete, "/items/{listID}"),
    (HttpMethod::Delete, "/items/{listID}/{taskID}"),
];

pub struct ApiSurface {
    pub api: HttpApi,
    pub integration: IntegrationHandle,
    pub authorizer: AuthorizerHandle,
}

/// One API, one shared integration, one shared authorizer, every route of
/// [`ROUTE_TABLE`].
pub fn build(
    config: &ApiConfig,
    function: &Function,
    authorizer: &dyn RouteAuthorizer,
) -> GraphResult<ApiSurface> {
    let mut api = HttpApi::new(LogicalId::new("HttpApi")?, &config.api_name)?
        .with_cors(CorsPreflight::permissive(Duration::try_days(config.cors_max_age_days)?))?;

    let integration = api.add_lambda_integration(function)?;
    let authorizer = api.bind_authorizer(authorizer)?;
    for (method, path) in ROUTE_TABLE {
        api.add_route(method, path, &integration, Some(&authorizer))?;
    }

    tracing::info!(api = %api.logical_id(), routes = api.routes().len(), "api surface built");
    Ok(ApiSurface {
        api,
        integration,
        authorizer,
    })
}
