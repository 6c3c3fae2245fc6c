//! Semantic field types and bound parameter values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type tags attached to expressions as their output field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Boolean,
    Integer,
    BigInteger,
    Float,
    Decimal,
    Text,
    Date,
    DateTime,
    Duration,
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Integer | DataType::BigInteger)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, DataType::Float | DataType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::DateTime)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::BigInteger => "big_integer",
            DataType::Float => "float",
            DataType::Decimal => "decimal",
            DataType::Text => "text",
            DataType::Date => "date",
            DataType::DateTime => "date_time",
            DataType::Duration => "duration",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(DataType::Boolean),
            "integer" => Ok(DataType::Integer),
            "big_integer" => Ok(DataType::BigInteger),
            "float" => Ok(DataType::Float),
            "decimal" => Ok(DataType::Decimal),
            "text" => Ok(DataType::Text),
            "date" => Ok(DataType::Date),
            "date_time" => Ok(DataType::DateTime),
            "duration" => Ok(DataType::Duration),
            other => Err(format!("Unknown data type: {}", other)),
        }
    }
}

/// Values carried out-of-band as bound parameters, or returned from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// Decimal kept in its textual form so no precision is lost
    Decimal(String),
    String(String),
}

impl Value {
    /// Get the data type inferred from this value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Float(_) => Some(DataType::Float),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::String(_) => Some(DataType::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_data_type() {
        assert_eq!(Value::Null.data_type(), None);
        assert_eq!(Value::Boolean(true).data_type(), Some(DataType::Boolean));
        assert_eq!(Value::Integer(5).data_type(), Some(DataType::Integer));
        assert_eq!(Value::Float(1.5).data_type(), Some(DataType::Float));
        assert_eq!(
            Value::Decimal("1.10".to_string()).data_type(),
            Some(DataType::Decimal)
        );
        assert_eq!(
            Value::String("acme".to_string()).data_type(),
            Some(DataType::Text)
        );
    }

    #[test]
    fn test_data_type_parse() {
        assert_eq!("big_integer".parse::<DataType>(), Ok(DataType::BigInteger));
        assert_eq!("date_time".parse::<DataType>(), Ok(DataType::DateTime));
        assert!("varchar".parse::<DataType>().is_err());
        assert_eq!(DataType::Duration.to_string(), "duration");
    }

    #[test]
    fn test_type_families() {
        assert!(DataType::BigInteger.is_integer());
        assert!(DataType::Decimal.is_numeric());
        assert!(!DataType::Text.is_numeric());
        assert!(DataType::DateTime.is_temporal());
        assert!(!DataType::Duration.is_temporal());
    }
}
