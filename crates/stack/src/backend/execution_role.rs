use stackgraph_core::{Expr, GraphResult, LogicalId, Resource};
use stackgraph_iam::{PolicyStatement, Principal, Role};
use stackgraph_storage::{TABLE_DATA_ACTIONS, Table};

use crate::config::ExecutionRoleConfig;

pub const LAMBDA_SERVICE: &str = "lambda.amazonaws.com";

pub const LOG_ACTIONS: [&str; 3] = [
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

/// `arn:<partition>:logs:<region>:<account>:log-group:/aws/lambda/*`
pub fn function_log_groups() -> Expr {
    Expr::arn("logs", vec![Expr::literal("log-group:/aws/lambda/*")])
}

/// Role assumed by the function: table data access, identity administration
/// and log delivery.
pub fn build(id: LogicalId, table: &Table, config: &ExecutionRoleConfig) -> GraphResult<Role> {
    let mut role = Role::new(id, Principal::service(LAMBDA_SERVICE))
        .with_description("Execution role of the items function");

    role.add_to_policy(
        PolicyStatement::allow()
            .with_actions(TABLE_DATA_ACTIONS)
            .with_resource(table.arn()),
    )?;

    if config.identity_admin_actions.iter().any(|a| a.ends_with('*')) {
        tracing::warn!(
            actions = ?config.identity_admin_actions,
            "execution role receives wildcard identity actions on all resources"
        );
    }
    role.add_to_policy(
        PolicyStatement::allow()
            .with_actions(config.identity_admin_actions.iter().cloned())
            .with_resource(Expr::wildcard()),
    )?;

    role.add_to_policy(
        PolicyStatement::allow()
            .with_actions(LOG_ACTIONS)
            .with_resource(function_log_groups()),
    )?;

    tracing::info!(role = %role.logical_id(), statements = role.statements().len(), "execution role built");
    Ok(role)
}

#[cfg(test)]
mod tests {
    use stackgraph_iam::{Decision, evaluate};
    use stackgraph_storage::KeyAttribute;

    use super::*;

    fn table() -> Table {
        Table::new(
            LogicalId::new("ItemsTable").unwrap(),
            "items",
            KeyAttribute::string("PK"),
            Some(KeyAttribute::string("SK")),
        )
        .unwrap()
    }

    #[test]
    fn grants_table_identity_and_log_access() {
        let table = table();
        let role = build(
            LogicalId::new("ExecutionRole").unwrap(),
            &table,
            &ExecutionRoleConfig::default(),
        )
        .unwrap();

        let statements = role.statements();
        assert_eq!(statements.len(), 3);
        assert!(role.is_allow_only());

        for action in TABLE_DATA_ACTIONS {
            assert_eq!(evaluate(statements, action, &table.arn()), Decision::Allow);
        }
        assert_eq!(
            evaluate(statements, "dynamodb:DeleteTable", &table.arn()),
            Decision::ImplicitDeny
        );
        assert_eq!(
            evaluate(statements, "cognito-idp:AdminGetUser", &Expr::literal("arn:aws:cognito-idp:us-east-1:1:userpool/x")),
            Decision::Allow
        );
        assert_eq!(
            evaluate(statements, "logs:PutLogEvents", &function_log_groups()),
            Decision::Allow
        );
        assert_eq!(
            evaluate(
                statements,
                "logs:PutLogEvents",
                &Expr::literal("arn:aws:logs:us-east-1:123456789012:log-group:/aws/lambda/items-handler:*")
            ),
            Decision::Allow
        );
    }

    #[test]
    fn identity_actions_are_configurable() {
        let config = ExecutionRoleConfig {
            identity_admin_actions: vec!["cognito-idp:AdminGetUser".to_string()],
        };
        let role = build(LogicalId::new("ExecutionRole").unwrap(), &table(), &config).unwrap();
        let any = Expr::literal("arn:aws:cognito-idp:us-east-1:1:userpool/x");
        assert!(evaluate(role.statements(), "cognito-idp:AdminGetUser", &any).is_allowed());
        assert!(!evaluate(role.statements(), "cognito-idp:DeleteUserPool", &any).is_allowed());
    }
}
