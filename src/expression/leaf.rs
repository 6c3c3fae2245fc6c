//! Leaf nodes: field references, resolved columns, annotation references,
//! literals and `*`.

use crate::expression::Expression;
use crate::types::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator between the segments of a field path
pub const PATH_SEP: char = '.';

/// Unresolved reference to a field by dotted path, e.g. `"manager.name"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub name: String,
}

impl FieldRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn parts(&self) -> Vec<&str> {
        self.name.split(PATH_SEP).collect()
    }
}

/// Column bound to a table alias in a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Col {
    pub alias: String,
    pub column: String,
    pub output_field: Option<DataType>,
}

impl Col {
    pub fn new(
        alias: impl Into<String>,
        column: impl Into<String>,
        output_field: Option<DataType>,
    ) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
            output_field,
        }
    }

    pub fn relabeled_clone(&self, change_map: &HashMap<String, String>) -> Self {
        let alias = change_map
            .get(&self.alias)
            .cloned()
            .unwrap_or_else(|| self.alias.clone());
        Self {
            alias,
            column: self.column.clone(),
            output_field: self.output_field,
        }
    }
}

/// Reference to an annotation already present on the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    pub alias: String,
    pub source: Box<Expression>,
}

impl Ref {
    pub fn new(alias: impl Into<String>, source: Expression) -> Self {
        Self {
            alias: alias.into(),
            source: Box::new(source),
        }
    }
}

/// Constant value, always bound as a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: Value,
    pub output_field: Option<DataType>,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            output_field: None,
        }
    }

    /// Literal with a declared type overriding the one inferred from the value
    pub fn typed(value: Value, output_field: DataType) -> Self {
        Self {
            value,
            output_field: Some(output_field),
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn bool(val: bool) -> Self {
        Self::new(Value::Boolean(val))
    }

    pub fn int(val: i64) -> Self {
        Self::new(Value::Integer(val))
    }

    pub fn float(val: f64) -> Self {
        Self::new(Value::Float(val))
    }

    pub fn string(val: impl Into<String>) -> Self {
        Self::new(Value::String(val.into()))
    }

    pub fn output_field(&self) -> Option<DataType> {
        self.output_field.or_else(|| self.value.data_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ref_parts() {
        assert_eq!(FieldRef::new("name").parts(), vec!["name"]);
        assert_eq!(
            FieldRef::new("ceo.manager.name").parts(),
            vec!["ceo", "manager", "name"]
        );
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(Literal::int(5).output_field(), Some(DataType::Integer));
        assert_eq!(Literal::float(1.5).output_field(), Some(DataType::Float));
        assert_eq!(Literal::string("x").output_field(), Some(DataType::Text));
        assert_eq!(Literal::null().output_field(), None);
        assert_eq!(
            Literal::typed(Value::Integer(3), DataType::Decimal).output_field(),
            Some(DataType::Decimal)
        );
        assert_eq!(
            Literal::typed(Value::Null, DataType::Date).output_field(),
            Some(DataType::Date)
        );
    }

    #[test]
    fn test_col_relabel() {
        let col = Col::new("company", "name", Some(DataType::Text));
        let map = HashMap::from([("company".to_string(), "U0".to_string())]);

        let relabeled = col.relabeled_clone(&map);
        assert_eq!(relabeled.alias, "U0");
        assert_eq!(relabeled.column, "name");
        assert_eq!(col.alias, "company");

        let untouched = Col::new("employee", "id", None).relabeled_clone(&map);
        assert_eq!(untouched.alias, "employee");
    }
}
