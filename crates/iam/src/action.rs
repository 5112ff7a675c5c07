use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// IAM action identifier, `service:Operation`.
///
/// Actions are opaque strings at this layer; syntax is only checked by the
/// provisioning engine at deploy time. Patterns may contain `*` and `?`
/// wildcards, and the bare `"*"` grants every action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Cow<'static, str>);

impl Action {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Service prefix (`dynamodb` in `dynamodb:GetItem`).
    pub fn service(&self) -> Option<&str> {
        self.as_str().split_once(':').map(|(service, _)| service)
    }

    /// Whether this action pattern covers `action` (case-insensitive).
    pub fn matches(&self, action: &str) -> bool {
        wildcard_match(&self.as_str().to_ascii_lowercase(), &action.to_ascii_lowercase())
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Action {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Glob match with `*` (any run, including empty) and `?` (exactly one char).
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            resume = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            resume += 1;
            ti = resume;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn service_wildcards_cover_their_namespace_only() {
        let idp = Action::new("cognito-idp:*");
        assert!(idp.matches("cognito-idp:AdminGetUser"));
        assert!(!idp.matches("cognito-identity:GetId"));
        assert_eq!(idp.service(), Some("cognito-idp"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(Action::new("dynamodb:GetItem").matches("DynamoDB:getitem"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(wildcard_match("logs:Put?ogEvents", "logs:PutLogEvents"));
        assert!(!wildcard_match("logs:Put?", "logs:Put"));
    }

    #[test]
    fn bare_star_is_wildcard() {
        assert!(Action::new("*").is_wildcard());
        assert!(Action::new("*").matches("s3:GetObject"));
        assert!(Action::new("*").service().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a pattern without wildcards only matches itself.
        #[test]
        fn literal_patterns_match_exactly(a in "[a-z]{1,8}:[A-Za-z]{1,12}", b in "[a-z]{1,8}:[A-Za-z]{1,12}") {
            prop_assert_eq!(wildcard_match(&a, &b), a == b);
        }

        /// Property: `<service>:*` covers every operation of that service.
        #[test]
        fn service_star_covers_operations(service in "[a-z]{1,10}", op in "[A-Za-z]{0,16}") {
            let pattern = Action::new(format!("{service}:*"));
            let action = format!("{service}:{op}");
            prop_assert!(pattern.matches(&action));
        }

        /// Property: replacing any suffix of a string with `*` still matches it.
        #[test]
        fn star_suffix_matches_prefix(text in "[a-zA-Z:/-]{0,24}", cut in 0usize..24) {
            let cut = cut.min(text.len());
            let pattern = format!("{}*", &text[..cut]);
            prop_assert!(wildcard_match(&pattern, &text));
        }
    }
}
