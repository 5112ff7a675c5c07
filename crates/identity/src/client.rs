use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stackgraph_core::{Duration, Expr, GraphError, GraphResult, LogicalId, Resource};

use crate::UserPool;

/// Direct (non-browser) authentication flows the client may use.
///
/// Refreshing tokens is always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthFlows {
    pub admin_user_password: bool,
    pub custom: bool,
    pub user_password: bool,
    pub user_srp: bool,
}

impl AuthFlows {
    pub fn all() -> Self {
        Self {
            admin_user_password: true,
            custom: true,
            user_password: true,
            user_srp: true,
        }
    }

    pub fn explicit_flows(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.admin_user_password {
            out.push("ALLOW_ADMIN_USER_PASSWORD_AUTH");
        }
        if self.custom {
            out.push("ALLOW_CUSTOM_AUTH");
        }
        if self.user_password {
            out.push("ALLOW_USER_PASSWORD_AUTH");
        }
        if self.user_srp {
            out.push("ALLOW_USER_SRP_AUTH");
        }
        out.push("ALLOW_REFRESH_TOKEN_AUTH");
        out
    }
}

/// Lifetimes of the tokens issued to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenValidity {
    pub access: Duration,
    pub id: Duration,
    pub refresh: Duration,
}

impl Default for TokenValidity {
    fn default() -> Self {
        Self {
            access: Duration::minutes(60),
            id: Duration::minutes(60),
            refresh: Duration::days(30),
        }
    }
}

impl TokenValidity {
    pub fn validate(&self) -> GraphResult<()> {
        let short_min = Duration::minutes(5);
        let short_max = Duration::days(1);
        for (label, value) in [("access", self.access), ("id", self.id)] {
            if value < short_min || value > short_max {
                return Err(GraphError::validation(format!(
                    "{label} token validity {value} must be between 5m and 1d"
                )));
            }
            value.to_minutes()?;
        }

        if self.refresh < Duration::minutes(60) || self.refresh > Duration::days(3650) {
            return Err(GraphError::validation(format!(
                "refresh token validity {} must be between 60m and 3650d",
                self.refresh
            )));
        }
        self.refresh.to_minutes()?;

        if self.refresh <= self.access || self.refresh <= self.id {
            return Err(GraphError::validation(
                "refresh token validity must exceed access and id token validity",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthFlows {
    pub authorization_code_grant: bool,
    pub implicit_code_grant: bool,
    pub client_credentials: bool,
}

impl OAuthFlows {
    fn uses_browser(self) -> bool {
        self.authorization_code_grant || self.implicit_code_grant
    }

    fn codes(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.authorization_code_grant {
            out.push("code");
        }
        if self.implicit_code_grant {
            out.push("implicit");
        }
        if self.client_credentials {
            out.push("client_credentials");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthScope {
    #[serde(rename = "openid")]
    OpenId,
    Email,
    Phone,
    Profile,
    /// `aws.cognito.signin.user.admin`
    CognitoAdmin,
    /// A resource-server scope such as `items/read`.
    Custom(String),
}

impl OAuthScope {
    pub fn as_str(&self) -> &str {
        match self {
            OAuthScope::OpenId => "openid",
            OAuthScope::Email => "email",
            OAuthScope::Phone => "phone",
            OAuthScope::Profile => "profile",
            OAuthScope::CognitoAdmin => "aws.cognito.signin.user.admin",
            OAuthScope::Custom(scope) => scope,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OAuthSettings {
    pub flows: OAuthFlows,
    pub scopes: Vec<OAuthScope>,
    pub callback_urls: Vec<String>,
    pub logout_urls: Vec<String>,
}

impl OAuthSettings {
    fn validate(&self) -> GraphResult<()> {
        if self.flows.client_credentials && self.flows.uses_browser() {
            return Err(GraphError::validation(
                "client credentials cannot be combined with browser grants",
            ));
        }
        if self.flows.uses_browser() && self.callback_urls.is_empty() {
            return Err(GraphError::validation(
                "browser grants require at least one callback URL",
            ));
        }
        for url in self.callback_urls.iter().chain(&self.logout_urls) {
            if !is_redirect_url(url) {
                return Err(GraphError::validation(format!(
                    "redirect URL '{url}' must use https (http only for localhost)"
                )));
            }
        }
        if let Some(OAuthScope::Custom(scope)) = self
            .scopes
            .iter()
            .find(|s| matches!(s, OAuthScope::Custom(v) if v.trim().is_empty() || v.contains(' ')))
        {
            return Err(GraphError::validation(format!("invalid OAuth scope '{scope}'")));
        }
        Ok(())
    }
}

fn is_redirect_url(url: &str) -> bool {
    let host_follows = |rest: &str| !rest.is_empty() && !rest.starts_with('/');
    match (url.strip_prefix("https://"), url.strip_prefix("http://localhost")) {
        (Some(rest), _) => host_follows(rest),
        (None, Some(rest)) => rest.is_empty() || rest.starts_with(':') || rest.starts_with('/'),
        (None, None) => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPoolClientProps {
    pub client_name: Option<String>,
    pub auth_flows: AuthFlows,
    pub token_validity: TokenValidity,
    /// `None` disables the hosted OAuth endpoints for this client.
    pub oauth: Option<OAuthSettings>,
    pub generate_secret: bool,
}

/// An application registered against one user pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoolClient {
    logical_id: LogicalId,
    user_pool: LogicalId,
    props: UserPoolClientProps,
}

impl UserPoolClient {
    pub fn new(logical_id: LogicalId, user_pool: &UserPool, props: UserPoolClientProps) -> GraphResult<Self> {
        props.token_validity.validate()?;
        if let Some(oauth) = &props.oauth {
            oauth.validate()?;
        }
        Ok(Self {
            logical_id,
            user_pool: user_pool.logical_id().clone(),
            props,
        })
    }

    pub fn client_id(&self) -> Expr {
        self.reference()
    }

    /// Logical id of the pool this client is registered with.
    pub fn user_pool_id(&self) -> &LogicalId {
        &self.user_pool
    }

    pub fn props(&self) -> &UserPoolClientProps {
        &self.props
    }
}

impl Resource for UserPoolClient {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::UserPoolClient"
    }

    fn properties(&self) -> Value {
        let p = &self.props;
        let mut props = Map::new();
        props.insert("UserPoolId".to_string(), Expr::reference(&self.user_pool).to_json());
        if let Some(name) = &p.client_name {
            props.insert("ClientName".to_string(), json!(name));
        }
        props.insert("GenerateSecret".to_string(), json!(p.generate_secret));
        props.insert("ExplicitAuthFlows".to_string(), json!(p.auth_flows.explicit_flows()));

        let tv = p.token_validity;
        // Validated as whole minutes in `new`.
        let minutes = |d: Duration| d.to_minutes().unwrap_or_default();
        props.insert("AccessTokenValidity".to_string(), json!(minutes(tv.access)));
        props.insert("IdTokenValidity".to_string(), json!(minutes(tv.id)));
        props.insert("RefreshTokenValidity".to_string(), json!(minutes(tv.refresh)));
        props.insert(
            "TokenValidityUnits".to_string(),
            json!({ "AccessToken": "minutes", "IdToken": "minutes", "RefreshToken": "minutes" }),
        );

        if let Some(oauth) = &p.oauth {
            let scopes: Vec<&str> = oauth.scopes.iter().map(OAuthScope::as_str).collect();
            props.insert("AllowedOAuthFlowsUserPoolClient".to_string(), json!(true));
            props.insert("AllowedOAuthFlows".to_string(), json!(oauth.flows.codes()));
            props.insert("AllowedOAuthScopes".to_string(), json!(scopes));
            if !oauth.callback_urls.is_empty() {
                props.insert("CallbackURLs".to_string(), json!(oauth.callback_urls));
            }
            if !oauth.logout_urls.is_empty() {
                props.insert("LogoutURLs".to_string(), json!(oauth.logout_urls));
            }
            props.insert("SupportedIdentityProviders".to_string(), json!(["COGNITO"]));
        }
        Value::Object(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_pool::tests::pool;

    fn oauth() -> OAuthSettings {
        OAuthSettings {
            flows: OAuthFlows {
                authorization_code_grant: true,
                ..OAuthFlows::default()
            },
            scopes: vec![OAuthScope::OpenId, OAuthScope::Email, OAuthScope::Profile],
            callback_urls: vec!["https://example.com/callback".to_string()],
            logout_urls: Vec::new(),
        }
    }

    fn props() -> UserPoolClientProps {
        UserPoolClientProps {
            auth_flows: AuthFlows::all(),
            oauth: Some(oauth()),
            ..UserPoolClientProps::default()
        }
    }

    fn client(props: UserPoolClientProps) -> GraphResult<UserPoolClient> {
        UserPoolClient::new(LogicalId::new("UserPoolClient").unwrap(), &pool(), props)
    }

    #[test]
    fn renders_flows_tokens_and_oauth() {
        let rendered = client(props()).unwrap().properties();
        assert_eq!(rendered["UserPoolId"], json!({ "Ref": "UserPool" }));
        assert_eq!(
            rendered["ExplicitAuthFlows"],
            json!([
                "ALLOW_ADMIN_USER_PASSWORD_AUTH",
                "ALLOW_CUSTOM_AUTH",
                "ALLOW_USER_PASSWORD_AUTH",
                "ALLOW_USER_SRP_AUTH",
                "ALLOW_REFRESH_TOKEN_AUTH",
            ])
        );
        assert_eq!(rendered["AccessTokenValidity"], json!(60));
        assert_eq!(rendered["RefreshTokenValidity"], json!(43_200));
        assert_eq!(rendered["AllowedOAuthFlows"], json!(["code"]));
        assert_eq!(rendered["AllowedOAuthScopes"], json!(["openid", "email", "profile"]));
        assert_eq!(rendered["CallbackURLs"], json!(["https://example.com/callback"]));
    }

    #[test]
    fn refresh_flow_is_always_allowed() {
        assert_eq!(AuthFlows::default().explicit_flows(), vec!["ALLOW_REFRESH_TOKEN_AUTH"]);
    }

    #[test]
    fn token_validity_limits() {
        let ok = TokenValidity::default();
        assert!(ok.validate().is_ok());

        let too_short = TokenValidity { access: Duration::minutes(4), ..ok };
        assert!(too_short.validate().is_err());

        let too_long = TokenValidity { id: Duration::hours(25), ..ok };
        assert!(too_long.validate().is_err());

        let refresh_too_long = TokenValidity { refresh: Duration::days(3651), ..ok };
        assert!(refresh_too_long.validate().is_err());

        let refresh_not_longer = TokenValidity {
            access: Duration::hours(2),
            refresh: Duration::hours(2),
            ..ok
        };
        assert!(refresh_not_longer.validate().is_err());

        let fractional = TokenValidity { access: Duration::seconds(330), ..ok };
        assert!(fractional.validate().is_err());
    }

    #[test]
    fn browser_grants_need_callbacks() {
        let mut settings = oauth();
        settings.callback_urls.clear();
        let props = UserPoolClientProps { oauth: Some(settings), ..props() };
        assert!(client(props).is_err());
    }

    #[test]
    fn redirect_urls_must_be_secure() {
        assert!(is_redirect_url("https://example.com/callback"));
        assert!(is_redirect_url("http://localhost:4200/callback"));
        assert!(!is_redirect_url("http://example.com/callback"));
        assert!(!is_redirect_url("https:///callback"));
    }

    #[test]
    fn client_credentials_exclude_browser_grants() {
        let mut settings = oauth();
        settings.flows.client_credentials = true;
        let props = UserPoolClientProps { oauth: Some(settings), ..props() };
        assert!(client(props).is_err());
    }
}
