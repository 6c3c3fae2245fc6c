//! Column (field) metadata.

use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// Target of a foreign-key column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Name of the referenced table in the catalog
    pub to_table: String,
    /// Column on the referenced table the key points at
    pub to_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Field name used in expression paths
    pub name: String,
    /// Column name in the store
    pub column: String,
    pub data_type: DataType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub relation: Option<Relation>,
}

impl ColumnInfo {
    /// A plain column whose store name equals the field name
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            data_type,
            nullable: false,
            relation: None,
        }
    }

    /// A foreign key named `name` stored as `<name>_id`
    pub fn foreign_key(
        name: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            column: format!("{}_id", name),
            name,
            data_type: DataType::Integer,
            nullable: false,
            relation: Some(Relation {
                to_table: to_table.into(),
                to_column: to_column.into(),
            }),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }
}
