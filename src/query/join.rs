//! Joins created while resolving field paths that cross relations.

use crate::compiler::SqlCompiler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
        }
    }
}

/// One joined table: `parent_alias.parent_column = table_alias.target_column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Catalog name of the joined table, used to resolve further segments
    pub table_name: String,
    /// Table name in the store
    pub db_table: String,
    pub table_alias: String,
    pub parent_alias: String,
    pub parent_column: String,
    pub target_column: String,
    pub join_type: JoinType,
}

impl Join {
    /// Same relation from the same parent; alias and join type are ignored
    pub fn is_equivalent(&self, other: &Join) -> bool {
        self.table_name == other.table_name
            && self.parent_alias == other.parent_alias
            && self.parent_column == other.parent_column
            && self.target_column == other.target_column
    }

    pub fn nullable(&self) -> bool {
        self.join_type == JoinType::LeftOuter
    }

    pub fn to_sql(&self, compiler: &SqlCompiler) -> String {
        let table = if self.table_alias == self.db_table {
            compiler.quote_name(&self.db_table)
        } else {
            format!(
                "{} {}",
                compiler.quote_name(&self.db_table),
                compiler.quote_name(&self.table_alias)
            )
        };
        format!(
            "{} {} ON ({}.{} = {}.{})",
            self.join_type.as_str(),
            table,
            compiler.quote_name(&self.parent_alias),
            compiler.quote_name(&self.parent_column),
            compiler.quote_name(&self.table_alias),
            compiler.quote_name(&self.target_column)
        )
    }
}
