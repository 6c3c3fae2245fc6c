//! Backend identifiers and dialect details that do not depend on a node kind.

use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target store dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Postgres,
    Sqlite,
    Mysql,
}

impl Backend {
    /// Vendor identifier used in logs and errors
    pub fn vendor(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgresql",
            Backend::Sqlite => "sqlite",
            Backend::Mysql => "mysql",
        }
    }

    /// Quote a table alias or column name
    pub fn quote_name(&self, name: &str) -> String {
        match self {
            Backend::Mysql => format!("`{}`", name.replace('`', "``")),
            Backend::Postgres | Backend::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Whether booleans come back from the store as booleans rather than 0/1
    pub fn has_native_boolean(&self) -> bool {
        matches!(self, Backend::Postgres)
    }

    /// Type name used in `CAST(... AS <type>)`
    pub fn cast_type(&self, data_type: DataType) -> &'static str {
        match self {
            Backend::Postgres => match data_type {
                DataType::Boolean => "boolean",
                DataType::Integer => "integer",
                DataType::BigInteger => "bigint",
                DataType::Float => "double precision",
                DataType::Decimal => "numeric",
                DataType::Text => "text",
                DataType::Date => "date",
                DataType::DateTime => "timestamp with time zone",
                DataType::Duration => "interval",
            },
            Backend::Sqlite => match data_type {
                DataType::Boolean => "bool",
                DataType::Integer => "integer",
                DataType::BigInteger | DataType::Duration => "bigint",
                DataType::Float => "real",
                DataType::Decimal => "decimal",
                DataType::Text => "text",
                DataType::Date => "date",
                DataType::DateTime => "datetime",
            },
            Backend::Mysql => match data_type {
                DataType::Boolean
                | DataType::Integer
                | DataType::BigInteger
                | DataType::Duration => "signed integer",
                DataType::Float => "double",
                DataType::Decimal => "decimal",
                DataType::Text => "char",
                DataType::Date => "date",
                DataType::DateTime => "datetime(6)",
            },
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.vendor())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" => Ok(Backend::Sqlite),
            "mysql" => Ok(Backend::Mysql),
            other => Err(format!("Unknown backend: {}", other)),
        }
    }
}
