//! Schema catalog consulted while resolving field paths.

pub mod column_info;
pub mod table_info;

pub use column_info::{ColumnInfo, Relation};
pub use table_info::TableInfo;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    tables: HashMap<String, TableInfo>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Relations are checked separately by [`Catalog::validate`]
    /// since their targets may be registered later.
    pub fn add_table(&mut self, table: TableInfo) -> Result<()> {
        if self.tables.contains_key(&table.table_name) {
            bail!("Table '{}' already exists", table.table_name);
        }
        self.tables.insert(table.table_name.clone(), table);
        Ok(())
    }

    /// Get table information by name
    pub fn get_table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }

    pub fn list_tables(&self) -> Vec<&TableInfo> {
        let mut tables: Vec<_> = self.tables.values().collect();
        tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        tables
    }

    /// Check that every relation targets a registered table and column
    pub fn validate(&self) -> Result<()> {
        for table in self.list_tables() {
            for column in &table.columns {
                let Some(relation) = &column.relation else {
                    continue;
                };
                let Some(target) = self.get_table(&relation.to_table) else {
                    bail!(
                        "Relation '{}.{}' points at unknown table '{}'",
                        table.table_name,
                        column.name,
                        relation.to_table
                    );
                };
                if !target.columns.iter().any(|c| c.column == relation.to_column) {
                    bail!(
                        "Relation '{}.{}' points at unknown column '{}.{}'",
                        table.table_name,
                        column.name,
                        relation.to_table,
                        relation.to_column
                    );
                }
            }
        }
        Ok(())
    }
}
