//! Identity subsystem: user directory, client registration, token authorizer,
//! federated identity pool and the role handed to authenticated identities.

pub mod authorizer;
pub mod client;
pub mod identity_pool;
pub mod user_pool;

pub use authorizer::UserPoolAuthorizer;
pub use client::{AuthFlows, OAuthFlows, OAuthScope, OAuthSettings, TokenValidity, UserPoolClient, UserPoolClientProps};
pub use identity_pool::{
    COGNITO_IDENTITY_SERVICE, IdentityPool, IdentityPoolRoleAttachment, authenticated_principal,
};
pub use user_pool::{
    AccountRecovery, Mfa, PasswordPolicy, SignInAliases, UserPool, UserPoolEmail, UserPoolProps,
};
