//! Table information and metadata structures.

use crate::catalog::column_info::ColumnInfo;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Name used to look the table up in the catalog
    pub table_name: String,
    /// Table name in the store
    pub db_table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self {
            db_table: table_name.clone(),
            table_name,
            columns: Vec::new(),
        }
    }

    /// Add a column, rejecting duplicate field names
    pub fn with_column(mut self, column: ColumnInfo) -> Result<Self> {
        if self.column(&column.name).is_some() {
            bail!(
                "Column '{}' already exists in table '{}'",
                column.name,
                self.table_name
            );
        }
        self.columns.push(column);
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
