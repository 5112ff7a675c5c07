//! Rendering helpers behind the subcommands.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use stackgraph_core::{Expr, LogicalId};
use stackgraph_iam::{AccessExplanation, explain_access};
use stackgraph_stack::Backend;

/// Parse the `--resource` argument of `explain`.
///
/// `ref:<Id>` and `arn:<Id>` name a resource of the graph; `*` and anything
/// else are taken literally.
pub fn parse_resource(raw: &str) -> Result<Expr> {
    let raw = raw.trim();
    if raw == "*" {
        return Ok(Expr::wildcard());
    }
    if let Some(id) = raw.strip_prefix("ref:") {
        let id = LogicalId::new(id).with_context(|| format!("invalid logical id in '{raw}'"))?;
        return Ok(Expr::reference(&id));
    }
    // Real ARNs carry a partition after the prefix, so `arn:aws:...` has a
    // colon left and stays literal.
    if let Some(id) = raw.strip_prefix("arn:").filter(|rest| !rest.contains(':')) {
        let id = LogicalId::new(id).with_context(|| format!("invalid logical id in '{raw}'"))?;
        return Ok(Expr::get_att(&id, "Arn"));
    }
    Ok(Expr::literal(raw))
}

pub fn explain(backend: &Backend, role: &str, action: &str, resource: &str) -> Result<AccessExplanation> {
    let role = backend.role(role)?;
    let resource = parse_resource(resource)?;
    Ok(explain_access(role, action, &resource))
}

/// One line per output: name, then its value as JSON.
pub fn render_outputs(backend: &Backend) -> String {
    let mut out = String::new();
    let mut outputs: Vec<_> = backend.outputs().iter().collect();
    outputs.sort_by(|a, b| a.name().cmp(b.name()));
    for output in outputs {
        let _ = writeln!(out, "{}\t{}", output.name(), output.value().to_json());
    }
    out
}

/// One line per route in registration order: key, integration, authorizer.
pub fn render_routes(backend: &Backend) -> String {
    let mut out = String::new();
    for route in backend.routes() {
        let authorizer = route.authorizer_id().map_or("NONE", LogicalId::as_str);
        let _ = writeln!(
            out,
            "{:<32}{}\t{}",
            route.key().to_string(),
            route.integration_id(),
            authorizer
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackgraph_iam::Decision;
    use stackgraph_stack::BackendConfig;

    use super::*;

    fn backend() -> Backend {
        Backend::assemble(&BackendConfig::default()).unwrap()
    }

    #[test]
    fn resource_argument_forms() {
        assert!(parse_resource("*").unwrap().is_wildcard());
        assert_eq!(parse_resource("ref:ItemsTable").unwrap().to_json(), json!({ "Ref": "ItemsTable" }));
        assert_eq!(
            parse_resource("arn:ItemsTable").unwrap().to_json(),
            json!({ "Fn::GetAtt": ["ItemsTable", "Arn"] })
        );
        assert_eq!(
            parse_resource("arn:aws:s3:::bucket").unwrap(),
            Expr::literal("arn:aws:s3:::bucket")
        );
        assert!(parse_resource("ref:not valid").is_err());
    }

    #[test]
    fn explains_table_access_of_the_execution_role() {
        let backend = backend();
        let explanation = explain(&backend, "FunctionExecutionRole", "dynamodb:PutItem", "arn:ItemsTable").unwrap();
        assert_eq!(explanation.decision, Decision::Allow);

        let denied = explain(&backend, "FunctionExecutionRole", "s3:GetObject", "arn:ItemsTable").unwrap();
        assert_eq!(denied.decision, Decision::ImplicitDeny);

        assert!(explain(&backend, "Missing", "s3:GetObject", "*").is_err());
    }

    #[test]
    fn lists_eight_routes_and_six_outputs() {
        let backend = backend();
        let routes = render_routes(&backend);
        assert_eq!(routes.lines().count(), 8);
        assert!(routes.lines().all(|l| l.ends_with("UserPoolAuthorizer")));
        assert!(routes.starts_with("POST /items"));

        let outputs = render_outputs(&backend);
        assert_eq!(outputs.lines().count(), 6);
        assert!(outputs.starts_with("ApiEndpoint\t"));
    }
}
