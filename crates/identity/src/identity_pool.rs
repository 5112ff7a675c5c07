use serde_json::{Value, json};

use stackgraph_core::{Expr, GraphError, GraphResult, LogicalId, Resource};
use stackgraph_iam::{ASSUME_ROLE_WITH_WEB_IDENTITY, Principal, Role};

use crate::{UserPool, UserPoolClient};

/// Federated principal exchanging identity-pool tokens for role credentials.
pub const COGNITO_IDENTITY_SERVICE: &str = "cognito-identity.amazonaws.com";

const AUD_KEY: &str = "cognito-identity.amazonaws.com:aud";
const AMR_KEY: &str = "cognito-identity.amazonaws.com:amr";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProviderEntry {
    client_id: Expr,
    provider_name: Expr,
}

/// Exchanges directory tokens for temporary cloud credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPool {
    logical_id: LogicalId,
    name: String,
    allow_unauthenticated: bool,
    providers: Vec<ProviderEntry>,
}

impl IdentityPool {
    pub fn new(logical_id: LogicalId, name: impl Into<String>) -> GraphResult<Self> {
        let name = name.into();
        let valid_chars = name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == ' ' || "+=,.@-".contains(c));
        if name.trim().is_empty() || name.len() > 128 || !valid_chars {
            return Err(GraphError::validation(format!("invalid identity pool name '{name}'")));
        }
        Ok(Self {
            logical_id,
            name,
            allow_unauthenticated: false,
            providers: Vec::new(),
        })
    }

    pub fn allow_unauthenticated(mut self, allow: bool) -> Self {
        self.allow_unauthenticated = allow;
        self
    }

    /// Trust tokens issued by `pool` to `client`.
    pub fn with_user_pool_client(mut self, pool: &UserPool, client: &UserPoolClient) -> GraphResult<Self> {
        if client.user_pool_id() != pool.logical_id() {
            return Err(GraphError::invariant(format!(
                "client {} does not belong to user pool {}",
                client.logical_id(),
                pool.logical_id()
            )));
        }
        let entry = ProviderEntry {
            client_id: client.client_id(),
            provider_name: pool.provider_name(),
        };
        if !self.providers.contains(&entry) {
            self.providers.push(entry);
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allows_unauthenticated(&self) -> bool {
        self.allow_unauthenticated
    }

    pub fn identity_pool_id(&self) -> Expr {
        self.reference()
    }
}

impl Resource for IdentityPool {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::IdentityPool"
    }

    fn properties(&self) -> Value {
        let providers: Vec<Value> = self
            .providers
            .iter()
            .map(|p| json!({ "ClientId": p.client_id, "ProviderName": p.provider_name }))
            .collect();
        json!({
            "IdentityPoolName": self.name,
            "AllowUnauthenticatedIdentities": self.allow_unauthenticated,
            "CognitoIdentityProviders": providers,
        })
    }
}

/// Trust principal for identities the pool has authenticated.
///
/// The audience condition pins the trust to this pool.
pub fn authenticated_principal(pool: &IdentityPool) -> Principal {
    Principal::federated(COGNITO_IDENTITY_SERVICE, ASSUME_ROLE_WITH_WEB_IDENTITY)
        .with_condition("StringEquals", AUD_KEY, pool.identity_pool_id())
        .with_condition("ForAnyValue:StringLike", AMR_KEY, "authenticated")
}

fn trusts_authenticated_identities_of(role: &Role, pool: &IdentityPool) -> bool {
    let principal = role.assumed_by();
    principal.is_federated()
        && principal.assume_action() == ASSUME_ROLE_WITH_WEB_IDENTITY
        && principal.condition("StringEquals", AUD_KEY) == Some(&pool.identity_pool_id())
        && principal.condition("ForAnyValue:StringLike", AMR_KEY)
            == Some(&Expr::literal("authenticated"))
}

/// Maps the authenticated identities of one pool to one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPoolRoleAttachment {
    logical_id: LogicalId,
    identity_pool: LogicalId,
    authenticated_role: LogicalId,
    authenticated_role_arn: Expr,
}

impl IdentityPoolRoleAttachment {
    /// Fails unless `role` trusts exactly the authenticated identities of
    /// `pool`.
    pub fn new(logical_id: LogicalId, pool: &IdentityPool, role: &Role) -> GraphResult<Self> {
        if !trusts_authenticated_identities_of(role, pool) {
            return Err(GraphError::invariant(format!(
                "role {} does not trust authenticated identities of {}",
                role.logical_id(),
                pool.logical_id()
            )));
        }
        Ok(Self {
            logical_id,
            identity_pool: pool.logical_id().clone(),
            authenticated_role: role.logical_id().clone(),
            authenticated_role_arn: role.arn(),
        })
    }

    pub fn authenticated_role(&self) -> &LogicalId {
        &self.authenticated_role
    }
}

impl Resource for IdentityPoolRoleAttachment {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::IdentityPoolRoleAttachment"
    }

    fn properties(&self) -> Value {
        json!({
            "IdentityPoolId": Expr::reference(&self.identity_pool),
            "Roles": { "authenticated": self.authenticated_role_arn },
        })
    }
}
