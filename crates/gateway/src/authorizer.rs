use serde_json::{Value, json};

use stackgraph_core::{Expr, GraphResult, LogicalId, Resource};

/// Header the router reads bearer tokens from.
pub const AUTHORIZATION_HEADER_SOURCE: &str = "$request.header.Authorization";

/// Token validation settings of a JWT authorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtConfiguration {
    pub issuer: Expr,
    /// Accepted `aud`/`client_id` values.
    pub audience: Vec<Expr>,
    pub identity_source: Vec<String>,
}

/// Something that can gate routes by validating bearer tokens.
///
/// Implemented by identity providers; the API binds an authorizer once and
/// shares the resulting handle between routes.
pub trait RouteAuthorizer {
    /// Authorizer name, unique within one API.
    fn name(&self) -> &str;

    fn jwt_configuration(&self) -> GraphResult<JwtConfiguration>;
}

/// Handle to an authorizer bound to an API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizerHandle(pub(crate) LogicalId);

impl AuthorizerHandle {
    pub fn id(&self) -> &LogicalId {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundAuthorizer {
    pub(crate) logical_id: LogicalId,
    pub(crate) api_id: LogicalId,
    pub(crate) name: String,
    pub(crate) jwt: JwtConfiguration,
}

impl BoundAuthorizer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn jwt(&self) -> &JwtConfiguration {
        &self.jwt
    }
}

impl Resource for BoundAuthorizer {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Authorizer"
    }

    fn properties(&self) -> Value {
        json!({
            "ApiId": Expr::reference(&self.api_id),
            "AuthorizerType": "JWT",
            "Name": self.name,
            "IdentitySource": self.jwt.identity_source,
            "JwtConfiguration": {
                "Audience": self.jwt.audience,
                "Issuer": self.jwt.issuer,
            },
        })
    }
}
