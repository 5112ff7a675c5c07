use serde_json::{Map, Value, json};

use stackgraph_compute::Function;
use stackgraph_core::{Expr, GraphError, GraphResult, LogicalId, Resource};

use crate::authorizer::{AuthorizerHandle, BoundAuthorizer, RouteAuthorizer};
use crate::cors::CorsPreflight;
use crate::integration::{IntegrationHandle, InvokePermission, LambdaIntegration};
use crate::route::{HttpMethod, Route, RouteKey};

/// The `$default` stage; every change deploys automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    logical_id: LogicalId,
    api_id: LogicalId,
}

impl Stage {
    pub const DEFAULT_NAME: &'static str = "$default";
}

impl Resource for Stage {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Stage"
    }

    fn properties(&self) -> Value {
        json!({
            "ApiId": Expr::reference(&self.api_id),
            "StageName": Self::DEFAULT_NAME,
            "AutoDeploy": true,
        })
    }
}

/// An HTTP API: CORS policy, one stage, integrations, authorizers and the
/// routing table.
///
/// Routes are kept in registration order. Integrations and authorizers are
/// shared between routes through their handles.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpApi {
    logical_id: LogicalId,
    name: String,
    description: Option<String>,
    cors: Option<CorsPreflight>,
    stage: Stage,
    integrations: Vec<(LambdaIntegration, InvokePermission)>,
    authorizers: Vec<BoundAuthorizer>,
    routes: Vec<Route>,
}

impl HttpApi {
    pub fn new(logical_id: LogicalId, name: impl Into<String>) -> GraphResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GraphError::validation("API name cannot be empty"));
        }
        let stage = Stage {
            logical_id: logical_id.child("DefaultStage")?,
            api_id: logical_id.clone(),
        };
        Ok(Self {
            logical_id,
            name,
            description: None,
            cors: None,
            stage,
            integrations: Vec::new(),
            authorizers: Vec::new(),
            routes: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cors(mut self, cors: CorsPreflight) -> GraphResult<Self> {
        cors.validate()?;
        self.cors = Some(cors);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cors(&self) -> Option<&CorsPreflight> {
        self.cors.as_ref()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Proxy `function` behind this API.
    ///
    /// Integrating the same function twice returns the existing handle.
    pub fn add_lambda_integration(&mut self, function: &Function) -> GraphResult<IntegrationHandle> {
        let id = self
            .logical_id
            .child(&format!("{}Integration", function.logical_id()))?;
        if self.integrations.iter().any(|(i, _)| i.logical_id == id) {
            return Ok(IntegrationHandle(id));
        }

        let permission = InvokePermission {
            logical_id: self
                .logical_id
                .child(&format!("{}InvokePermission", function.logical_id()))?,
            api_id: self.logical_id.clone(),
            function_arn: function.arn(),
        };
        let integration = LambdaIntegration::new(id.clone(), self.logical_id.clone(), function);
        tracing::debug!(api = %self.logical_id, integration = %id, function = %function.logical_id(), "lambda integration added");
        self.integrations.push((integration, permission));
        Ok(IntegrationHandle(id))
    }

    /// Point an existing integration (and its invoke permission) at a rebuilt
    /// function value.
    pub fn rebind_integration(
        &mut self,
        handle: &IntegrationHandle,
        function: &Function,
    ) -> GraphResult<()> {
        let (integration, permission) = self
            .integrations
            .iter_mut()
            .find(|(i, _)| i.logical_id == handle.0)
            .ok_or_else(|| GraphError::not_found(format!("integration {}", handle.0)))?;
        *integration = LambdaIntegration::new(handle.0.clone(), self.logical_id.clone(), function);
        permission.function_arn = function.arn();
        tracing::debug!(integration = %handle.0, function = %function.logical_id(), "integration rebound");
        Ok(())
    }

    /// Bind a token authorizer.
    ///
    /// Binding the same name with the same JWT configuration again returns the
    /// existing handle; a different configuration under that name conflicts.
    pub fn bind_authorizer(&mut self, authorizer: &dyn RouteAuthorizer) -> GraphResult<AuthorizerHandle> {
        let name = authorizer.name().to_string();
        let jwt = authorizer.jwt_configuration()?;
        if let Some(existing) = self.authorizers.iter().find(|a| a.name == name) {
            if existing.jwt != jwt {
                return Err(GraphError::conflict(format!(
                    "authorizer '{name}' is already bound to {} with a different issuer or audience",
                    self.logical_id
                )));
            }
            return Ok(AuthorizerHandle(existing.logical_id.clone()));
        }

        if jwt.audience.is_empty() {
            return Err(GraphError::validation(format!(
                "authorizer '{name}' has an empty audience"
            )));
        }
        if jwt.identity_source.is_empty() {
            return Err(GraphError::validation(format!(
                "authorizer '{name}' has no identity source"
            )));
        }

        let id = self.logical_id.child(&name)?;
        tracing::debug!(api = %self.logical_id, authorizer = %id, "authorizer bound");
        self.authorizers.push(BoundAuthorizer {
            logical_id: id.clone(),
            api_id: self.logical_id.clone(),
            name,
            jwt,
        });
        Ok(AuthorizerHandle(id))
    }

    /// Register `method path` against an integration, optionally gated by an
    /// authorizer.
    pub fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        integration: &IntegrationHandle,
        authorizer: Option<&AuthorizerHandle>,
    ) -> GraphResult<&Route> {
        let key = RouteKey::new(method, path)?;
        if self.routes.iter().any(|r| r.key == key) {
            return Err(GraphError::conflict(format!("route '{key}' is already registered")));
        }
        if !self.integrations.iter().any(|(i, _)| i.logical_id == integration.0) {
            return Err(GraphError::not_found(format!("integration {}", integration.0)));
        }
        if let Some(handle) = authorizer {
            if !self.authorizers.iter().any(|a| a.logical_id == handle.0) {
                return Err(GraphError::not_found(format!("authorizer {}", handle.0)));
            }
        }

        let logical_id = self.logical_id.child(&format!(
            "Route{}{}",
            pascal_method(method),
            key.path.id_fragment()
        ))?;
        if self.routes.iter().any(|r| r.logical_id == logical_id) {
            return Err(GraphError::conflict(format!(
                "route '{key}' derives logical id {logical_id} which is already taken"
            )));
        }

        tracing::debug!(api = %self.logical_id, route = %key, id = %logical_id, "route registered");
        self.routes.push(Route {
            logical_id,
            api_id: self.logical_id.clone(),
            key,
            integration: integration.0.clone(),
            authorizer: authorizer.map(|h| h.0.clone()),
        });
        let last = self.routes.len() - 1;
        Ok(&self.routes[last])
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, method: HttpMethod, path: &str) -> Option<&Route> {
        let key = RouteKey::new(method, path).ok()?;
        self.routes.iter().find(|r| r.key == key)
    }

    pub fn integrations(&self) -> impl Iterator<Item = &LambdaIntegration> {
        self.integrations.iter().map(|(i, _)| i)
    }

    pub fn invoke_permissions(&self) -> impl Iterator<Item = &InvokePermission> {
        self.integrations.iter().map(|(_, p)| p)
    }

    pub fn authorizers(&self) -> &[BoundAuthorizer] {
        &self.authorizers
    }

    /// Base URL of the default stage.
    pub fn api_endpoint(&self) -> Expr {
        self.attribute("ApiEndpoint")
    }

    /// Every resource this API declares, the API itself first.
    pub fn resources(&self) -> Vec<&dyn Resource> {
        let mut out: Vec<&dyn Resource> = vec![self, &self.stage];
        for (integration, permission) in &self.integrations {
            out.push(integration);
            out.push(permission);
        }
        out.extend(self.authorizers.iter().map(|a| a as &dyn Resource));
        out.extend(self.routes.iter().map(|r| r as &dyn Resource));
        out
    }
}

fn pascal_method(method: HttpMethod) -> String {
    let upper = method.as_str();
    let mut out = upper[..1].to_string();
    out.push_str(&upper[1..].to_ascii_lowercase());
    out
}

impl Resource for HttpApi {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Api"
    }

    fn properties(&self) -> Value {
        let mut props = Map::new();
        props.insert("Name".to_string(), json!(self.name));
        props.insert("ProtocolType".to_string(), json!("HTTP"));
        if let Some(description) = &self.description {
            props.insert("Description".to_string(), json!(description));
        }
        if let Some(cors) = &self.cors {
            props.insert("CorsConfiguration".to_string(), cors.to_json());
        }
        Value::Object(props)
    }
}
