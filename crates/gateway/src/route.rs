use core::str::FromStr;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stackgraph_core::{Expr, GraphError, GraphResult, LogicalId, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Any,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Any => "ANY",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl core::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ANY" => Ok(HttpMethod::Any),
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(GraphError::validation(format!("unknown HTTP method '{other}'"))),
        }
    }
}

/// One segment of a route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Literal(String),
    /// `{name}`
    Param(String),
    /// `{name+}`, only allowed last.
    Greedy(String),
}

/// A validated path pattern such as `/items/{listID}/{taskID}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutePath {
    segments: Vec<Segment>,
}

impl RoutePath {
    pub fn parse(raw: &str) -> GraphResult<Self> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(GraphError::validation(format!("route path '{raw}' must start with '/'")));
        };
        if rest.is_empty() {
            return Ok(Self { segments: Vec::new() });
        }

        let parts: Vec<&str> = rest.split('/').collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: HashSet<&str> = HashSet::new();

        for (i, part) in parts.iter().enumerate() {
            let is_last = i + 1 == parts.len();
            if part.is_empty() {
                return Err(GraphError::validation(format!(
                    "route path '{raw}' contains an empty segment"
                )));
            }

            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) => {
                    let (name, greedy) = match inner.strip_suffix('+') {
                        Some(name) => (name, true),
                        None => (inner, false),
                    };
                    if !is_param_name(name) {
                        return Err(GraphError::validation(format!(
                            "invalid path parameter '{part}' in '{raw}'"
                        )));
                    }
                    if !names.insert(name) {
                        return Err(GraphError::validation(format!(
                            "path parameter '{name}' appears twice in '{raw}'"
                        )));
                    }
                    if greedy && !is_last {
                        return Err(GraphError::validation(format!(
                            "greedy parameter '{part}' must be the last segment of '{raw}'"
                        )));
                    }
                    if greedy {
                        Segment::Greedy(name.to_string())
                    } else {
                        Segment::Param(name.to_string())
                    }
                }
                None => {
                    if part.chars().any(|c| matches!(c, '{' | '}' | '?' | '#') || c.is_whitespace()) {
                        return Err(GraphError::validation(format!(
                            "invalid literal segment '{part}' in '{raw}'"
                        )));
                    }
                    Segment::Literal(part.to_string())
                }
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the `{...}` parameters, in order.
    pub fn parameters(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) | Segment::Greedy(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Alphanumeric rendering used to derive logical ids.
    pub(crate) fn id_fragment(&self) -> String {
        if self.segments.is_empty() {
            return "Root".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            let (prefix, text) = match segment {
                Segment::Literal(text) => ("", text),
                Segment::Param(name) => ("Param", name),
                Segment::Greedy(name) => ("Proxy", name),
            };
            out.push_str(prefix);
            out.push_str(&pascal_alnum(text));
        }
        out
    }
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn pascal_alnum(text: &str) -> String {
    let mut chars = text.chars().filter(char::is_ascii_alphanumeric);
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.collect::<String>(),
        None => String::new(),
    }
}

impl core::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "/{text}")?,
                Segment::Param(name) => write!(f, "/{{{name}}}")?,
                Segment::Greedy(name) => write!(f, "/{{{name}+}}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for RoutePath {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `(method, path)`, unique within one API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub method: HttpMethod,
    pub path: RoutePath,
}

impl RouteKey {
    pub fn new(method: HttpMethod, path: &str) -> GraphResult<Self> {
        Ok(Self {
            method,
            path: RoutePath::parse(path)?,
        })
    }
}

impl core::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub(crate) logical_id: LogicalId,
    pub(crate) api_id: LogicalId,
    pub(crate) key: RouteKey,
    pub(crate) integration: LogicalId,
    pub(crate) authorizer: Option<LogicalId>,
}

impl Route {
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    pub fn integration_id(&self) -> &LogicalId {
        &self.integration
    }

    pub fn authorizer_id(&self) -> Option<&LogicalId> {
        self.authorizer.as_ref()
    }
}

impl Resource for Route {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Route"
    }

    fn properties(&self) -> Value {
        let mut props = Map::new();
        props.insert("ApiId".to_string(), Expr::reference(&self.api_id).to_json());
        props.insert("RouteKey".to_string(), json!(self.key.to_string()));
        props.insert(
            "Target".to_string(),
            Expr::join("", vec!["integrations/".into(), Expr::reference(&self.integration)])
                .to_json(),
        );
        match &self.authorizer {
            Some(authorizer) => {
                props.insert("AuthorizationType".to_string(), json!("JWT"));
                props.insert("AuthorizerId".to_string(), Expr::reference(authorizer).to_json());
            }
            None => {
                props.insert("AuthorizationType".to_string(), json!("NONE"));
            }
        }
        Value::Object(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_and_parameters() {
        let path = RoutePath::parse("/items/{listID}/{taskID}/status").unwrap();
        assert_eq!(path.parameters(), vec!["listID", "taskID"]);
        assert_eq!(path.to_string(), "/items/{listID}/{taskID}/status");
        assert_eq!(path.id_fragment(), "ItemsParamListIDParamTaskIDStatus");
    }

    #[test]
    fn root_and_greedy_paths() {
        assert_eq!(RoutePath::parse("/").unwrap().to_string(), "/");
        assert_eq!(RoutePath::parse("/").unwrap().id_fragment(), "Root");
        let proxy = RoutePath::parse("/files/{path+}").unwrap();
        assert_eq!(proxy.segments().last(), Some(&Segment::Greedy("path".to_string())));
        assert!(RoutePath::parse("/files/{path+}/meta").is_err());
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["items", "/items/", "/items//x", "/items/{}", "/items/{a}/{a}", "/it ems", "/a?b"] {
            assert!(RoutePath::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn shared_prefix_paths_are_distinct_keys() {
        let shallow = RouteKey::new(HttpMethod::Delete, "/items/{listID}").unwrap();
        let deep = RouteKey::new(HttpMethod::Delete, "/items/{listID}/{taskID}").unwrap();
        assert_ne!(shallow, deep);
        assert_eq!(deep.to_string(), "DELETE /items/{listID}/{taskID}");
    }

    #[test]
    fn methods_parse_case_insensitively() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }
}
