//! Operator definitions for expressions.

use crate::expression::{ExpressionError, ExpressionResult};
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// Arithmetic connectors joining the two sides of a combined expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithmeticOperator {
    /// Get the output type of this operator given input types.
    ///
    /// An untyped side (a bare NULL) takes the type of the other side; two
    /// untyped sides stay untyped.
    pub fn output_type(
        &self,
        left: Option<DataType>,
        right: Option<DataType>,
    ) -> ExpressionResult<Option<DataType>> {
        let (left, right) = match (left, right) {
            (Some(l), Some(r)) => (l, r),
            (Some(t), None) | (None, Some(t)) => return Ok(Some(t)),
            (None, None) => return Ok(None),
        };

        let numeric = match (left, right) {
            (l, r) if l.is_integer() && r.is_integer() => {
                if l == DataType::BigInteger || r == DataType::BigInteger {
                    Some(DataType::BigInteger)
                } else {
                    Some(DataType::Integer)
                }
            }
            (l, DataType::Float) | (DataType::Float, l) if l.is_integer() => Some(DataType::Float),
            (l, DataType::Decimal) | (DataType::Decimal, l) if l.is_integer() => {
                Some(DataType::Decimal)
            }
            (DataType::Float, DataType::Float) => Some(DataType::Float),
            (DataType::Decimal, DataType::Decimal) => Some(DataType::Decimal),
            _ => None,
        };
        if let Some(t) = numeric {
            return Ok(Some(t));
        }

        let temporal = match (self, left, right) {
            (ArithmeticOperator::Sub, DataType::Date, DataType::Date)
            | (ArithmeticOperator::Sub, DataType::DateTime, DataType::DateTime) => {
                Some(DataType::Duration)
            }
            (ArithmeticOperator::Add | ArithmeticOperator::Sub, t, DataType::Duration)
                if t.is_temporal() =>
            {
                Some(DataType::DateTime)
            }
            (ArithmeticOperator::Add, DataType::Duration, t) if t.is_temporal() => {
                Some(DataType::DateTime)
            }
            (
                ArithmeticOperator::Add | ArithmeticOperator::Sub,
                DataType::Duration,
                DataType::Duration,
            ) => Some(DataType::Duration),
            _ => None,
        };

        temporal
            .map(Some)
            .ok_or_else(|| ExpressionError::AmbiguousOutputType {
                reason: format!(
                    "Cannot infer type of '{}' expression involving these types: {}, {}",
                    self.as_str(),
                    left,
                    right
                ),
            })
    }

    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Sub => "-",
            ArithmeticOperator::Mul => "*",
            ArithmeticOperator::Div => "/",
            ArithmeticOperator::Mod => "%",
            ArithmeticOperator::Pow => "^",
        }
    }
}

/// Comparison operators producing a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "<>",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
        }
    }
}

/// Connectors for boolean predicate trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}
