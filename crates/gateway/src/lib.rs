//! HTTP API surface: routes, CORS, integrations and authorizer bindings.
//!
//! Route matching, token validation and request dispatch belong to the managed
//! router; this crate only declares the routing table it consumes.

pub mod api;
pub mod authorizer;
pub mod cors;
pub mod integration;
pub mod route;

pub use api::{HttpApi, Stage};
pub use authorizer::{AUTHORIZATION_HEADER_SOURCE, AuthorizerHandle, BoundAuthorizer, JwtConfiguration, RouteAuthorizer};
pub use cors::{CorsMethod, CorsPreflight};
pub use integration::{IntegrationHandle, InvokePermission, LambdaIntegration};
pub use route::{HttpMethod, Route, RouteKey, RoutePath, Segment};
