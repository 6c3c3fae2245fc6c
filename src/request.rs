//! JSON query descriptions, as read by the command-line tool.

use crate::catalog::Catalog;
use crate::expression::Expression;
use crate::query::Query;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Expression bound to an output name
#[derive(Debug, Deserialize)]
pub struct Named {
    pub alias: String,
    pub expr: Expression,
}

/// Query description; steps apply in field order
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub table: String,
    #[serde(default)]
    pub values: Vec<Expression>,
    #[serde(default)]
    pub annotate: Vec<Named>,
    #[serde(default)]
    pub filter: Vec<Expression>,
    #[serde(default)]
    pub exclude: Vec<Expression>,
    #[serde(default)]
    pub order_by: Vec<Expression>,
    #[serde(default)]
    pub aggregate: Vec<Named>,
}

impl QueryRequest {
    /// Apply every step to a fresh query over `catalog`
    pub fn build(self, catalog: &Catalog) -> Result<Query<'_>> {
        let mut query = Query::new(catalog, &self.table)?;

        if !self.values.is_empty() {
            query.values(self.values)?;
        }
        for named in self.annotate {
            query
                .annotate(named.alias.clone(), named.expr)
                .with_context(|| format!("Failed to annotate '{}'", named.alias))?;
        }
        for predicate in self.filter {
            query.filter(predicate).context("Failed to add filter")?;
        }
        for predicate in self.exclude {
            query.exclude(predicate).context("Failed to add exclude")?;
        }
        query.order_by(self.order_by)?;
        for named in self.aggregate {
            query
                .aggregate(named.alias.clone(), named.expr)
                .with_context(|| format!("Failed to aggregate '{}'", named.alias))?;
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnInfo, TableInfo};
    use crate::types::DataType;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .add_table(
                TableInfo::new("company")
                    .with_column(ColumnInfo::new("id", DataType::Integer))
                    .and_then(|t| t.with_column(ColumnInfo::new("name", DataType::Text)))
                    .unwrap(),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_missing_steps_default_to_empty() {
        let request: QueryRequest = serde_json::from_str(r#"{"table": "company"}"#).unwrap();
        assert!(request.values.is_empty());
        assert!(request.aggregate.is_empty());

        let catalog = catalog();
        let query = request.build(&catalog).unwrap();
        assert!(query.where_clause().is_empty());
        assert!(query.group_by().is_none());
    }

    #[test]
    fn test_failed_step_names_the_alias() {
        let request: QueryRequest = serde_json::from_str(
            r#"{"table": "company", "annotate": [{"alias": "label", "expr": {"field": {"name": "missing"}}}]}"#,
        )
        .unwrap();
        let catalog = catalog();
        let err = request.build(&catalog).unwrap_err();
        assert_eq!(err.to_string(), "Failed to annotate 'label'");
        assert!(format!("{:#}", err).contains("Cannot resolve keyword 'missing' into field"));
    }

    #[test]
    fn test_unknown_table() {
        let request: QueryRequest = serde_json::from_str(r#"{"table": "nope"}"#).unwrap();
        assert!(request.build(&catalog()).is_err());
    }
}
