use stackgraph_core::{Expr, GraphError, GraphResult, LogicalId, Resource};
use stackgraph_gateway::{AUTHORIZATION_HEADER_SOURCE, JwtConfiguration, RouteAuthorizer};

use crate::{UserPool, UserPoolClient};

/// Validates bearer tokens issued by one user pool to a fixed set of clients.
///
/// The audience is exactly the clients passed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoolAuthorizer {
    name: String,
    issuer: Expr,
    clients: Vec<LogicalId>,
}

impl UserPoolAuthorizer {
    pub fn new(
        name: impl Into<String>,
        user_pool: &UserPool,
        clients: &[&UserPoolClient],
    ) -> GraphResult<Self> {
        let name = name.into();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GraphError::validation(format!(
                "authorizer name '{name}' must be alphanumeric"
            )));
        }
        if clients.is_empty() {
            return Err(GraphError::validation(format!(
                "authorizer '{name}' needs at least one client"
            )));
        }
        let pool_id = user_pool.logical_id();
        if let Some(foreign) = clients.iter().find(|c| c.user_pool_id() != pool_id) {
            return Err(GraphError::invariant(format!(
                "client {} is registered with {}, not {pool_id}",
                foreign.logical_id(),
                foreign.user_pool_id()
            )));
        }

        Ok(Self {
            name,
            issuer: user_pool.issuer(),
            clients: clients
                .iter()
                .map(|c| c.logical_id().clone())
                .collect(),
        })
    }

    /// Logical ids of the accepted clients.
    pub fn clients(&self) -> &[LogicalId] {
        &self.clients
    }
}

impl RouteAuthorizer for UserPoolAuthorizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn jwt_configuration(&self) -> GraphResult<JwtConfiguration> {
        Ok(JwtConfiguration {
            issuer: self.issuer.clone(),
            audience: self
                .clients
                .iter()
                .map(Expr::reference)
                .collect(),
            identity_source: vec![AUTHORIZATION_HEADER_SOURCE.to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::user_pool::tests::{pool, pool_props};
    use crate::{AuthFlows, UserPoolClientProps};

    fn client_of(pool: &UserPool, id: &str) -> UserPoolClient {
        let props = UserPoolClientProps {
            auth_flows: AuthFlows::all(),
            ..UserPoolClientProps::default()
        };
        UserPoolClient::new(LogicalId::new(id).unwrap(), pool, props).unwrap()
    }

    #[test]
    fn audience_is_exactly_the_given_clients() {
        let pool = pool();
        let web = client_of(&pool, "WebClient");
        let mobile = client_of(&pool, "MobileClient");
        let auth = UserPoolAuthorizer::new("UserPoolAuthorizer", &pool, &[&web, &mobile]).unwrap();

        let jwt = auth.jwt_configuration().unwrap();
        assert_eq!(jwt.audience, vec![web.client_id(), mobile.client_id()]);
        assert_eq!(jwt.identity_source, vec!["$request.header.Authorization".to_string()]);
        assert_eq!(jwt.issuer, pool.issuer());
        assert_eq!(
            Expr::reference(pool.logical_id()).to_json(),
            json!({ "Ref": "UserPool" })
        );
    }

    #[test]
    fn clients_of_another_pool_are_rejected() {
        let pool = pool();
        let other = UserPool::new(LogicalId::new("OtherPool").unwrap(), pool_props()).unwrap();
        let foreign = client_of(&other, "ForeignClient");
        let err = UserPoolAuthorizer::new("UserPoolAuthorizer", &pool, &[&foreign]).unwrap_err();
        assert!(matches!(err, GraphError::InvariantViolation(_)));
    }

    #[test]
    fn needs_a_client() {
        assert!(UserPoolAuthorizer::new("UserPoolAuthorizer", &pool(), &[]).is_err());
    }
}
