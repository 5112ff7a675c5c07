//! Intrinsic expressions: values the provisioning engine resolves at deploy time.
//!
//! During assembly, resources hand out expressions (stable handles) instead of
//! final values. A table's ARN, for example, is `Fn::GetAtt [Table, Arn]` until
//! the engine creates the table.

use std::collections::BTreeSet;

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use crate::LogicalId;

/// Pseudo parameters available in every template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
    UrlSuffix,
    StackName,
}

impl Pseudo {
    pub fn name(self) -> &'static str {
        match self {
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Region => "AWS::Region",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
            Pseudo::StackName => "AWS::StackName",
        }
    }
}

/// A property value: either a literal or a deferred reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(String),
    /// `{"Ref": id}`, the primary identifier of a resource.
    Ref(LogicalId),
    /// `{"Fn::GetAtt": [id, attribute]}`.
    GetAtt {
        resource: LogicalId,
        attribute: String,
    },
    Pseudo(Pseudo),
    /// `{"Fn::Join": [separator, [parts...]]}`.
    Join {
        separator: String,
        parts: Vec<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// The `*` literal (all actions / all resources).
    pub fn wildcard() -> Self {
        Self::Literal("*".to_string())
    }

    pub fn reference(id: &LogicalId) -> Self {
        Self::Ref(id.clone())
    }

    pub fn get_att(id: &LogicalId, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            resource: id.clone(),
            attribute: attribute.into(),
        }
    }

    /// Join parts; collapses to a literal when every part is a literal.
    pub fn join(separator: impl Into<String>, parts: Vec<Expr>) -> Self {
        let separator = separator.into();
        let literals: Option<Vec<&str>> = parts.iter().map(Expr::as_literal).collect();
        match literals {
            Some(values) => Self::Literal(values.join(&separator)),
            None => Self::Join { separator, parts },
        }
    }

    /// `arn:<partition>:<service>:<region>:<account>:<resource...>`.
    pub fn arn(service: &str, resource: Vec<Expr>) -> Self {
        let mut parts = vec![
            Expr::literal("arn:"),
            Expr::Pseudo(Pseudo::Partition),
            Expr::literal(format!(":{service}:")),
            Expr::Pseudo(Pseudo::Region),
            Expr::literal(":"),
            Expr::Pseudo(Pseudo::AccountId),
            Expr::literal(":"),
        ];
        parts.extend(resource);
        Self::join("", parts)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Expr::Literal(v) if v == "*")
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Logical ids this expression depends on.
    pub fn referenced_ids(&self) -> Vec<&LogicalId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a LogicalId>) {
        match self {
            Expr::Ref(id) => out.push(id),
            Expr::GetAtt { resource, .. } => out.push(resource),
            Expr::Join { parts, .. } => parts.iter().for_each(|p| p.collect_ids(out)),
            Expr::Literal(_) | Expr::Pseudo(_) => {}
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Expr::Literal(v) => Value::String(v.clone()),
            Expr::Ref(id) => json!({ "Ref": id.as_str() }),
            Expr::GetAtt {
                resource,
                attribute,
            } => json!({ "Fn::GetAtt": [resource.as_str(), attribute] }),
            Expr::Pseudo(p) => json!({ "Ref": p.name() }),
            Expr::Join { separator, parts } => {
                let parts: Vec<Value> = parts.iter().map(Expr::to_json).collect();
                json!({ "Fn::Join": [separator, parts] })
            }
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl core::fmt::Display for Expr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Expr::Literal(v) => f.write_str(v),
            Expr::Ref(id) => write!(f, "${{{id}}}"),
            Expr::GetAtt {
                resource,
                attribute,
            } => write!(f, "${{{resource}.{attribute}}}"),
            Expr::Pseudo(p) => write!(f, "${{{}}}", p.name()),
            Expr::Join { separator, parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    core::fmt::Display::fmt(part, f)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

/// Collect every logical id referenced by `Ref` or `Fn::GetAtt` inside a
/// rendered JSON value. Pseudo parameters (`AWS::*`) are skipped.
pub fn references_in(value: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    walk(value, &mut out);
    out
}

fn walk(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !target.starts_with("AWS::") {
                        out.insert(target.clone());
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = args.first() {
                        out.insert(target.clone());
                    }
                    return;
                }
            }
            map.values().for_each(|v| walk(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    #[test]
    fn renders_intrinsics() {
        assert_eq!(Expr::literal("x").to_json(), json!("x"));
        assert_eq!(Expr::reference(&id("Pool")).to_json(), json!({ "Ref": "Pool" }));
        assert_eq!(
            Expr::get_att(&id("Table"), "Arn").to_json(),
            json!({ "Fn::GetAtt": ["Table", "Arn"] })
        );
        assert_eq!(
            Expr::Pseudo(Pseudo::Region).to_json(),
            json!({ "Ref": "AWS::Region" })
        );
    }

    #[test]
    fn join_of_literals_collapses() {
        let joined = Expr::join("/", vec!["a".into(), "b".into()]);
        assert_eq!(joined, Expr::literal("a/b"));
    }

    #[test]
    fn arn_keeps_pseudo_parameters() {
        let arn = Expr::arn("logs", vec!["log-group:/aws/lambda/*".into()]);
        assert_eq!(
            arn.to_json(),
            json!({ "Fn::Join": ["", [
                "arn:", { "Ref": "AWS::Partition" }, ":logs:",
                { "Ref": "AWS::Region" }, ":", { "Ref": "AWS::AccountId" }, ":",
                "log-group:/aws/lambda/*"
            ]] })
        );
        assert_eq!(
            arn.to_string(),
            "arn:${AWS::Partition}:logs:${AWS::Region}:${AWS::AccountId}:log-group:/aws/lambda/*"
        );
    }

    #[test]
    fn referenced_ids_walks_joins() {
        let e = Expr::join(
            "",
            vec![Expr::reference(&id("A")), "-".into(), Expr::get_att(&id("B"), "Arn")],
        );
        let ids: Vec<&str> = e.referenced_ids().into_iter().map(LogicalId::as_str).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn references_in_skips_pseudo_parameters() {
        let value = json!({
            "Role": { "Fn::GetAtt": ["Role", "Arn"] },
            "Env": { "Variables": { "POOL": { "Ref": "Pool" }, "REGION": { "Ref": "AWS::Region" } } },
        });
        let refs: Vec<String> = references_in(&value).into_iter().collect();
        assert_eq!(refs, vec!["Pool".to_string(), "Role".to_string()]);
    }

    proptest::proptest! {
        #[test]
        fn literal_joins_match_string_join(
            parts in proptest::collection::vec("[a-z:/*-]{0,8}", 0..6),
            sep in "[,/:]?",
        ) {
            let joined = Expr::join(sep.clone(), parts.iter().map(|p| Expr::literal(p.as_str())).collect());
            proptest::prop_assert_eq!(joined, Expr::literal(parts.join(&sep)));
        }
    }
}
