use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stackgraph_core::{
    DeletionPolicy, Duration, Expr, GraphError, GraphResult, LogicalId, Pseudo, Resource,
};

const MAX_POOL_NAME_LEN: usize = 128;

/// Which attributes a user may sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignInAliases {
    pub email: bool,
    pub username: bool,
    pub phone: bool,
}

impl SignInAliases {
    pub fn email_only() -> Self {
        Self {
            email: true,
            ..Self::default()
        }
    }

    fn attributes(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.email {
            out.push("email");
        }
        if self.phone {
            out.push("phone_number");
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: u8,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digits: bool,
    pub require_symbols: bool,
    /// How long an administrator-issued temporary password stays usable.
    pub temp_password_validity: Duration,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_digits: true,
            require_symbols: true,
            temp_password_validity: Duration::days(7),
        }
    }
}

impl PasswordPolicy {
    fn validate(&self) -> GraphResult<()> {
        if !(6..=99).contains(&self.min_length) {
            return Err(GraphError::validation(format!(
                "password minimum length {} must be between 6 and 99",
                self.min_length
            )));
        }
        let days = self.temp_password_validity.to_days()?;
        if !(1..=365).contains(&days) {
            return Err(GraphError::validation(format!(
                "temporary password validity {} must be between 1 and 365 days",
                self.temp_password_validity
            )));
        }
        Ok(())
    }

    fn to_json(&self) -> GraphResult<Value> {
        Ok(json!({
            "MinimumLength": self.min_length,
            "RequireLowercase": self.require_lowercase,
            "RequireUppercase": self.require_uppercase,
            "RequireNumbers": self.require_digits,
            "RequireSymbols": self.require_symbols,
            "TemporaryPasswordValidityDays": self.temp_password_validity.to_days()?,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRecovery {
    EmailOnly,
    PhoneOnly,
    EmailThenPhone,
    PhoneThenEmail,
    /// Only an administrator can reset the password.
    None,
}

impl AccountRecovery {
    fn mechanisms(self) -> Value {
        let names: &[&str] = match self {
            AccountRecovery::EmailOnly => &["verified_email"],
            AccountRecovery::PhoneOnly => &["verified_phone_number"],
            AccountRecovery::EmailThenPhone => &["verified_email", "verified_phone_number"],
            AccountRecovery::PhoneThenEmail => &["verified_phone_number", "verified_email"],
            AccountRecovery::None => &["admin_only"],
        };
        let list: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({ "Name": name, "Priority": i + 1 }))
            .collect();
        json!({ "RecoveryMechanisms": list })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mfa {
    Off,
    Optional,
    Required,
}

impl Mfa {
    fn code(self) -> &'static str {
        match self {
            Mfa::Off => "OFF",
            Mfa::Optional => "OPTIONAL",
            Mfa::Required => "ON",
        }
    }
}

/// Outbound email for verification and recovery messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPoolEmail {
    /// The identity provider's built-in sender.
    ProviderDefault,
    /// Delegated to the mail service with a verified sender identity.
    Ses {
        from_email: String,
        from_name: Option<String>,
        ses_region: String,
    },
}

impl UserPoolEmail {
    fn validate(&self) -> GraphResult<()> {
        if let UserPoolEmail::Ses {
            from_email,
            ses_region,
            ..
        } = self
        {
            let well_formed = matches!(
                from_email.split_once('@'),
                Some((local, domain)) if !local.is_empty() && domain.contains('.')
            );
            if !well_formed {
                return Err(GraphError::validation(format!(
                    "sender address '{from_email}' is not an email address"
                )));
            }
            if ses_region.trim().is_empty() {
                return Err(GraphError::validation("mail service region cannot be empty"));
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        match self {
            UserPoolEmail::ProviderDefault => json!({ "EmailSendingAccount": "COGNITO_DEFAULT" }),
            UserPoolEmail::Ses {
                from_email,
                from_name,
                ses_region,
            } => {
                let from = match from_name {
                    Some(name) => format!("{name} <{from_email}>"),
                    None => from_email.clone(),
                };
                let source_arn = Expr::join(
                    "",
                    vec![
                        Expr::literal("arn:"),
                        Expr::Pseudo(Pseudo::Partition),
                        Expr::literal(format!(":ses:{ses_region}:")),
                        Expr::Pseudo(Pseudo::AccountId),
                        Expr::literal(format!(":identity/{from_email}")),
                    ],
                );
                json!({
                    "EmailSendingAccount": "DEVELOPER",
                    "From": from,
                    "SourceArn": source_arn,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoolProps {
    pub user_pool_name: String,
    pub self_sign_up_enabled: bool,
    pub sign_in_aliases: SignInAliases,
    pub password_policy: PasswordPolicy,
    pub account_recovery: AccountRecovery,
    pub mfa: Mfa,
    pub email: UserPoolEmail,
}

/// A user directory.
///
/// Retained on removal: deleting the pool would delete every account in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPool {
    logical_id: LogicalId,
    props: UserPoolProps,
}

impl UserPool {
    pub fn new(logical_id: LogicalId, props: UserPoolProps) -> GraphResult<Self> {
        let name = &props.user_pool_name;
        if name.trim().is_empty() || name.len() > MAX_POOL_NAME_LEN {
            return Err(GraphError::validation(format!(
                "user pool name '{name}' must be 1-{MAX_POOL_NAME_LEN} characters"
            )));
        }
        let aliases = props.sign_in_aliases;
        if !(aliases.email || aliases.username || aliases.phone) {
            return Err(GraphError::validation("user pool needs at least one sign-in alias"));
        }
        props.password_policy.validate()?;
        props.email.validate()?;
        if props.account_recovery == AccountRecovery::EmailOnly && !aliases.email {
            tracing::warn!(pool = %logical_id, "email recovery configured without email sign-in");
        }
        Ok(Self { logical_id, props })
    }

    pub fn props(&self) -> &UserPoolProps {
        &self.props
    }

    pub fn user_pool_id(&self) -> Expr {
        self.reference()
    }

    pub fn arn(&self) -> Expr {
        self.attribute("Arn")
    }

    /// `cognito-idp.<region>.amazonaws.com/<pool id>`, the name identity
    /// pools use to trust this directory.
    pub fn provider_name(&self) -> Expr {
        self.attribute("ProviderName")
    }

    /// Token issuer URL of this directory.
    pub fn issuer(&self) -> Expr {
        Expr::join(
            "",
            vec![
                Expr::literal("https://cognito-idp."),
                Expr::Pseudo(Pseudo::Region),
                Expr::literal(".amazonaws.com/"),
                self.user_pool_id(),
            ],
        )
    }
}

impl Resource for UserPool {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Cognito::UserPool"
    }

    fn properties(&self) -> Value {
        let p = &self.props;
        let mut props = Map::new();
        props.insert("UserPoolName".to_string(), json!(p.user_pool_name));
        props.insert(
            "AdminCreateUserConfig".to_string(),
            json!({ "AllowAdminCreateUserOnly": !p.self_sign_up_enabled }),
        );

        let attributes = p.sign_in_aliases.attributes();
        if p.sign_in_aliases.username {
            if !attributes.is_empty() {
                props.insert("AliasAttributes".to_string(), json!(attributes));
            }
        } else {
            props.insert("UsernameAttributes".to_string(), json!(attributes));
        }
        if !attributes.is_empty() {
            props.insert("AutoVerifiedAttributes".to_string(), json!(attributes));
        }

        // Validated in `new`, so the conversion cannot fail here.
        if let Ok(policy) = p.password_policy.to_json() {
            props.insert("Policies".to_string(), json!({ "PasswordPolicy": policy }));
        }
        props.insert(
            "AccountRecoverySetting".to_string(),
            p.account_recovery.mechanisms(),
        );
        props.insert("MfaConfiguration".to_string(), json!(p.mfa.code()));
        props.insert("EmailConfiguration".to_string(), p.email.to_json());
        Value::Object(props)
    }

    fn deletion_policy(&self) -> Option<DeletionPolicy> {
        Some(DeletionPolicy::Retain)
    }
}
