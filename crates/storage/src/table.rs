use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stackgraph_core::{DeletionPolicy, Expr, GraphError, GraphResult, LogicalId, Resource};

/// Item-level and batch actions a table's data plane grants.
pub const TABLE_DATA_ACTIONS: [&str; 7] = [
    "dynamodb:GetItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:Scan",
    "dynamodb:Query",
    "dynamodb:BatchWriteItem",
];

const MIN_TABLE_NAME_LEN: usize = 3;
const MAX_TABLE_NAME_LEN: usize = 255;

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

impl AttributeType {
    fn code(self) -> &'static str {
        match self {
            AttributeType::String => "S",
            AttributeType::Number => "N",
            AttributeType::Binary => "B",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::String)
    }
}

/// Partition key plus optional sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySchema {
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum BillingMode {
    /// On-demand; no capacity to manage.
    PayPerRequest,
    Provisioned { read_capacity: u32, write_capacity: u32 },
}

/// Key-value table declaration.
///
/// # Invariants
/// - The key schema is immutable once created: changing it (or the table
///   name) means replacing the table, see [`Table::requires_replacement`].
/// - Partition and sort key names are distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    logical_id: LogicalId,
    table_name: String,
    key_schema: KeySchema,
    billing_mode: BillingMode,
    deletion_policy: DeletionPolicy,
}

impl Table {
    pub fn new(
        logical_id: LogicalId,
        table_name: impl Into<String>,
        partition_key: KeyAttribute,
        sort_key: Option<KeyAttribute>,
    ) -> GraphResult<Self> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;

        if partition_key.name.trim().is_empty() {
            return Err(GraphError::validation("partition key name cannot be empty"));
        }
        if let Some(sort) = &sort_key {
            if sort.name.trim().is_empty() {
                return Err(GraphError::validation("sort key name cannot be empty"));
            }
            if sort.name == partition_key.name {
                return Err(GraphError::invariant(format!(
                    "partition and sort key share the name '{}'",
                    sort.name
                )));
            }
        }

        Ok(Self {
            logical_id,
            table_name,
            key_schema: KeySchema {
                partition_key,
                sort_key,
            },
            billing_mode: BillingMode::PayPerRequest,
            deletion_policy: DeletionPolicy::Retain,
        })
    }

    pub fn with_billing_mode(mut self, billing_mode: BillingMode) -> GraphResult<Self> {
        if let BillingMode::Provisioned {
            read_capacity,
            write_capacity,
        } = billing_mode
        {
            if read_capacity == 0 || write_capacity == 0 {
                return Err(GraphError::validation(
                    "provisioned capacity must be at least 1",
                ));
            }
        }
        self.billing_mode = billing_mode;
        Ok(self)
    }

    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = policy;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    pub fn billing_mode(&self) -> BillingMode {
        self.billing_mode
    }

    pub fn arn(&self) -> Expr {
        self.attribute("Arn")
    }

    /// Whether moving from `previous` to `self` forces the engine to create a
    /// new table instead of updating the existing one.
    pub fn requires_replacement(&self, previous: &Table) -> bool {
        self.key_schema != previous.key_schema || self.table_name != previous.table_name
    }

    fn key_attributes(&self) -> impl Iterator<Item = (&KeyAttribute, &'static str)> {
        std::iter::once((&self.key_schema.partition_key, "HASH"))
            .chain(self.key_schema.sort_key.iter().map(|k| (k, "RANGE")))
    }
}

fn validate_table_name(name: &str) -> GraphResult<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if name.len() < MIN_TABLE_NAME_LEN || name.len() > MAX_TABLE_NAME_LEN || !valid_chars {
        return Err(GraphError::validation(format!(
            "invalid table name '{name}' (3-255 chars of [a-zA-Z0-9_.-])"
        )));
    }
    Ok(())
}

impl Resource for Table {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::DynamoDB::Table"
    }

    fn properties(&self) -> Value {
        let key_schema: Vec<Value> = self
            .key_attributes()
            .map(|(attr, key_type)| json!({ "AttributeName": attr.name, "KeyType": key_type }))
            .collect();
        let definitions: Vec<Value> = self
            .key_attributes()
            .map(|(attr, _)| json!({ "AttributeName": attr.name, "AttributeType": attr.kind.code() }))
            .collect();

        let mut props = Map::new();
        props.insert("TableName".to_string(), json!(self.table_name));
        props.insert("KeySchema".to_string(), Value::Array(key_schema));
        props.insert("AttributeDefinitions".to_string(), Value::Array(definitions));
        match self.billing_mode {
            BillingMode::PayPerRequest => {
                props.insert("BillingMode".to_string(), json!("PAY_PER_REQUEST"));
            }
            BillingMode::Provisioned {
                read_capacity,
                write_capacity,
            } => {
                props.insert("BillingMode".to_string(), json!("PROVISIONED"));
                props.insert(
                    "ProvisionedThroughput".to_string(),
                    json!({
                        "ReadCapacityUnits": read_capacity,
                        "WriteCapacityUnits": write_capacity,
                    }),
                );
            }
        }
        Value::Object(props)
    }

    fn deletion_policy(&self) -> Option<DeletionPolicy> {
        Some(self.deletion_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items_table() -> Table {
        Table::new(
            LogicalId::new("ItemsTable").unwrap(),
            "items",
            KeyAttribute::string("PK"),
            Some(KeyAttribute::string("SK")),
        )
        .unwrap()
    }

    #[test]
    fn renders_two_part_key_on_demand() {
        let decl = items_table().declare();
        assert_eq!(decl.resource_type, "AWS::DynamoDB::Table");
        assert_eq!(
            decl.properties,
            json!({
                "TableName": "items",
                "KeySchema": [
                    { "AttributeName": "PK", "KeyType": "HASH" },
                    { "AttributeName": "SK", "KeyType": "RANGE" },
                ],
                "AttributeDefinitions": [
                    { "AttributeName": "PK", "AttributeType": "S" },
                    { "AttributeName": "SK", "AttributeType": "S" },
                ],
                "BillingMode": "PAY_PER_REQUEST",
            })
        );
        assert_eq!(decl.deletion_policy, Some(DeletionPolicy::Retain));
    }

    #[test]
    fn key_schema_change_requires_replacement() {
        let before = items_table();
        let renamed_sort = Table::new(
            LogicalId::new("ItemsTable").unwrap(),
            "items",
            KeyAttribute::string("PK"),
            Some(KeyAttribute::new("SK", AttributeType::Number)),
        )
        .unwrap();
        assert!(renamed_sort.requires_replacement(&before));

        let rebilled = items_table()
            .with_billing_mode(BillingMode::Provisioned {
                read_capacity: 5,
                write_capacity: 5,
            })
            .unwrap();
        assert!(!rebilled.requires_replacement(&before));
    }

    #[test]
    fn rejects_invalid_names_and_keys() {
        let id = LogicalId::new("T").unwrap();
        assert!(Table::new(id.clone(), "ab", KeyAttribute::string("PK"), None).is_err());
        assert!(Table::new(id.clone(), "items table", KeyAttribute::string("PK"), None).is_err());
        assert!(matches!(
            Table::new(
                id,
                "items",
                KeyAttribute::string("PK"),
                Some(KeyAttribute::string("PK"))
            ),
            Err(GraphError::InvariantViolation(_))
        ));
    }

    #[test]
    fn provisioned_capacity_must_be_positive() {
        let err = items_table()
            .with_billing_mode(BillingMode::Provisioned {
                read_capacity: 0,
                write_capacity: 1,
            })
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[test]
    fn data_actions_are_item_and_batch_level() {
        assert_eq!(TABLE_DATA_ACTIONS.len(), 7);
        assert!(TABLE_DATA_ACTIONS.iter().all(|a| a.starts_with("dynamodb:")));
    }
}
