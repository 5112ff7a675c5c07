//! Resource trait: identity plus a rendering into a template entry.

use serde::Serialize;
use serde_json::Value;

use crate::{Expr, LogicalId};

/// What the provisioning engine does with a resource's physical state when it
/// is removed from the graph or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

/// A declared resource.
///
/// Implementations are plain configuration records; rendering must not fail
/// because validation happens when the record is constructed.
pub trait Resource {
    /// Logical id of the resource within the template.
    fn logical_id(&self) -> &LogicalId;

    /// Provider type name, e.g. `AWS::DynamoDB::Table`.
    fn resource_type(&self) -> &'static str;

    /// Rendered `Properties` object.
    fn properties(&self) -> Value;

    /// Explicit ordering edges beyond those implied by references.
    fn depends_on(&self) -> Vec<LogicalId> {
        Vec::new()
    }

    fn metadata(&self) -> Option<Value> {
        None
    }

    fn deletion_policy(&self) -> Option<DeletionPolicy> {
        None
    }

    /// `Ref` handle to this resource.
    fn reference(&self) -> Expr {
        Expr::reference(self.logical_id())
    }

    /// `Fn::GetAtt` handle to one of this resource's attributes.
    fn attribute(&self, name: &str) -> Expr {
        Expr::get_att(self.logical_id(), name)
    }

    fn declare(&self) -> ResourceDeclaration {
        let deletion_policy = self.deletion_policy();
        ResourceDeclaration {
            logical_id: self.logical_id().clone(),
            resource_type: self.resource_type().to_string(),
            properties: self.properties(),
            depends_on: self.depends_on(),
            metadata: self.metadata(),
            deletion_policy,
            update_replace_policy: deletion_policy,
        }
    }
}

/// A resource rendered into its template shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceDeclaration {
    #[serde(skip)]
    pub logical_id: LogicalId,
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl ResourceDeclaration {
    /// Logical ids this declaration needs to exist: references found in the
    /// rendered properties plus explicit `DependsOn` edges.
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = crate::expr::references_in(&self.properties);
        deps.extend(self.depends_on.iter().map(|id| id.as_str().to_string()));
        deps.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Bucket {
        id: LogicalId,
        key: LogicalId,
    }

    impl Resource for Bucket {
        fn logical_id(&self) -> &LogicalId {
            &self.id
        }

        fn resource_type(&self) -> &'static str {
            "AWS::S3::Bucket"
        }

        fn properties(&self) -> Value {
            json!({ "KmsKey": Expr::get_att(&self.key, "Arn") })
        }

        fn deletion_policy(&self) -> Option<DeletionPolicy> {
            Some(DeletionPolicy::Retain)
        }
    }

    #[test]
    fn declaration_renders_template_entry() {
        let bucket = Bucket {
            id: LogicalId::new("Assets").unwrap(),
            key: LogicalId::new("Key").unwrap(),
        };
        let decl = bucket.declare();
        assert_eq!(decl.dependencies(), vec!["Key".to_string()]);
        assert_eq!(
            serde_json::to_value(&decl).unwrap(),
            json!({
                "Type": "AWS::S3::Bucket",
                "Properties": { "KmsKey": { "Fn::GetAtt": ["Key", "Arn"] } },
                "DeletionPolicy": "Retain",
                "UpdateReplacePolicy": "Retain",
            })
        );
        assert_eq!(bucket.reference(), Expr::Ref(LogicalId::new("Assets").unwrap()));
    }
}
