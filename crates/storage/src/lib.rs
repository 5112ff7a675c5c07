//! Storage resources.
//!
//! A schemaless key-value table with a two-part primary key. The storage
//! engine itself is a managed service; this crate only declares it.

pub mod table;

pub use table::{AttributeType, BillingMode, KeyAttribute, KeySchema, TABLE_DATA_ACTIONS, Table};
