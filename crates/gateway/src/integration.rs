use serde_json::{Value, json};

use stackgraph_compute::Function;
use stackgraph_core::{Expr, LogicalId, Resource};

/// Handle to an integration registered on an API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntegrationHandle(pub(crate) LogicalId);

impl IntegrationHandle {
    pub fn id(&self) -> &LogicalId {
        &self.0
    }
}

/// Proxy integration forwarding every matched request to a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaIntegration {
    pub(crate) logical_id: LogicalId,
    pub(crate) api_id: LogicalId,
    pub(crate) function_id: LogicalId,
    pub(crate) function_arn: Expr,
}

impl LambdaIntegration {
    pub(crate) fn new(logical_id: LogicalId, api_id: LogicalId, function: &Function) -> Self {
        Self {
            logical_id,
            api_id,
            function_id: function.logical_id().clone(),
            function_arn: function.arn(),
        }
    }

    pub fn function_id(&self) -> &LogicalId {
        &self.function_id
    }

    pub fn function_arn(&self) -> &Expr {
        &self.function_arn
    }
}

impl Resource for LambdaIntegration {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Integration"
    }

    fn properties(&self) -> Value {
        json!({
            "ApiId": Expr::reference(&self.api_id),
            "IntegrationType": "AWS_PROXY",
            "IntegrationUri": self.function_arn,
            "PayloadFormatVersion": "2.0",
        })
    }
}

/// Resource policy entry letting the API invoke the integrated function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokePermission {
    pub(crate) logical_id: LogicalId,
    pub(crate) api_id: LogicalId,
    pub(crate) function_arn: Expr,
}

impl InvokePermission {
    /// `arn:<partition>:execute-api:<region>:<account>:<api id>/*/*`
    pub fn source_arn(&self) -> Expr {
        Expr::arn(
            "execute-api",
            vec![Expr::reference(&self.api_id), Expr::literal("/*/*")],
        )
    }
}

impl Resource for InvokePermission {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Lambda::Permission"
    }

    fn properties(&self) -> Value {
        json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": self.function_arn,
            "Principal": "apigateway.amazonaws.com",
            "SourceArn": self.source_arn(),
        })
    }
}
