use stackgraph_core::{Duration, Expr, GraphResult, LogicalId, Resource};
use stackgraph_iam::{PolicyStatement, Role};
use stackgraph_identity::{
    AccountRecovery, AuthFlows, IdentityPool, IdentityPoolRoleAttachment, Mfa, OAuthFlows,
    OAuthScope, OAuthSettings, PasswordPolicy, SignInAliases, TokenValidity, UserPool,
    UserPoolAuthorizer, UserPoolClient, UserPoolClientProps, UserPoolEmail, UserPoolProps,
    authenticated_principal,
};

use crate::config::IdentityConfig;

pub const AUTHORIZER_NAME: &str = "UserPoolAuthorizer";

/// Everything the identity builder produces, in construction order.
#[derive(Debug, Clone)]
pub struct IdentitySubsystem {
    pub user_pool: UserPool,
    pub client: UserPoolClient,
    pub authorizer: UserPoolAuthorizer,
    pub identity_pool: IdentityPool,
    pub authenticated_role: Role,
    pub role_attachment: IdentityPoolRoleAttachment,
}

impl IdentitySubsystem {
    pub fn resources(&self) -> Vec<&dyn Resource> {
        vec![
            &self.user_pool,
            &self.client,
            &self.identity_pool,
            &self.authenticated_role,
            &self.role_attachment,
        ]
    }
}

pub fn build(config: &IdentityConfig) -> GraphResult<IdentitySubsystem> {
    let user_pool = UserPool::new(
        LogicalId::new("UserPool")?,
        UserPoolProps {
            user_pool_name: config.user_pool_name.clone(),
            self_sign_up_enabled: true,
            sign_in_aliases: SignInAliases::email_only(),
            password_policy: PasswordPolicy::default(),
            account_recovery: AccountRecovery::EmailOnly,
            mfa: Mfa::Off,
            email: UserPoolEmail::Ses {
                from_email: config.sender_email.clone(),
                from_name: config.sender_name.clone(),
                ses_region: config.ses_region.clone(),
            },
        },
    )?;

    let client = UserPoolClient::new(
        LogicalId::new("UserPoolClient")?,
        &user_pool,
        UserPoolClientProps {
            client_name: None,
            auth_flows: AuthFlows::all(),
            token_validity: TokenValidity {
                access: Duration::try_minutes(config.access_token_minutes)?,
                id: Duration::try_minutes(config.id_token_minutes)?,
                refresh: Duration::try_days(config.refresh_token_days)?,
            },
            oauth: Some(OAuthSettings {
                flows: OAuthFlows {
                    authorization_code_grant: true,
                    ..OAuthFlows::default()
                },
                scopes: vec![OAuthScope::OpenId, OAuthScope::Email, OAuthScope::Profile],
                callback_urls: config.callback_urls.clone(),
                logout_urls: config.logout_urls.clone(),
            }),
            generate_secret: false,
        },
    )?;

    let authorizer = UserPoolAuthorizer::new(AUTHORIZER_NAME, &user_pool, &[&client])?;

    let identity_pool = IdentityPool::new(LogicalId::new("IdentityPool")?, &config.identity_pool_name)?
        .allow_unauthenticated(false)
        .with_user_pool_client(&user_pool, &client)?;

    let mut authenticated_role = Role::new(
        LogicalId::new("AuthenticatedRole")?,
        authenticated_principal(&identity_pool),
    )
    .with_description("Role assumed by authenticated identities");
    for grant in &config.authenticated_grants {
        if grant.is_wildcard() {
            tracing::warn!(
                actions = ?grant.actions,
                resources = ?grant.resources,
                "authenticated identities receive a wildcard grant"
            );
        }
        authenticated_role.add_to_policy(
            PolicyStatement::allow()
                .with_actions(grant.actions.iter().cloned())
                .with_resources(grant.resources.iter().map(Expr::literal)),
        )?;
    }

    let role_attachment = IdentityPoolRoleAttachment::new(
        LogicalId::new("IdentityPoolRoleAttachment")?,
        &identity_pool,
        &authenticated_role,
    )?;

    tracing::info!(
        user_pool = %user_pool.logical_id(),
        identity_pool = %identity_pool.logical_id(),
        "identity subsystem built"
    );
    Ok(IdentitySubsystem {
        user_pool,
        client,
        authorizer,
        identity_pool,
        authenticated_role,
        role_attachment,
    })
}

#[cfg(test)]
mod tests {
    use stackgraph_gateway::RouteAuthorizer;

    use super::*;

    #[test]
    fn authorizer_audience_is_the_built_client() {
        let identity = build(&IdentityConfig::default()).unwrap();
        let jwt = identity.authorizer.jwt_configuration().unwrap();
        assert_eq!(jwt.audience, vec![identity.client.client_id()]);
        assert_eq!(identity.authorizer.clients(), &[identity.client.logical_id().clone()]);
    }

    #[test]
    fn authenticated_role_trusts_the_built_pool() {
        let identity = build(&IdentityConfig::default()).unwrap();
        let trust = identity.authenticated_role.assumed_by();
        assert_eq!(
            trust.condition("StringEquals", "cognito-identity.amazonaws.com:aud"),
            Some(&identity.identity_pool.identity_pool_id())
        );
        assert!(!identity.identity_pool.allows_unauthenticated());
        assert_eq!(
            identity.role_attachment.authenticated_role(),
            identity.authenticated_role.logical_id()
        );
    }

    #[test]
    fn token_lifetimes_come_from_config() {
        let config = IdentityConfig {
            refresh_token_days: 0,
            ..IdentityConfig::default()
        };
        assert!(build(&config).is_err());
    }
}
