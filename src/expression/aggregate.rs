//! Aggregate functions: a [`Func`] over exactly one expression that forces
//! a grouping requirement on the query.

use crate::expression::func::Func;
use crate::expression::{Expression, ExpressionError, ExpressionResult};
use crate::types::{DataType, Value};
use serde::{Deserialize, Serialize};

pub const AGGREGATE_TEMPLATE: &str = "%(function)s(%(distinct)s%(expressions)s)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    StdDev,
    Variance,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "Count",
            AggregateKind::Sum => "Sum",
            AggregateKind::Avg => "Avg",
            AggregateKind::Min => "Min",
            AggregateKind::Max => "Max",
            AggregateKind::StdDev => "StdDev",
            AggregateKind::Variance => "Variance",
        }
    }

    pub fn function(&self) -> &'static str {
        match self {
            AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Avg => "AVG",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
            AggregateKind::StdDev => "STDDEV_POP",
            AggregateKind::Variance => "VAR_POP",
        }
    }

    pub fn allows_distinct(&self) -> bool {
        matches!(
            self,
            AggregateKind::Count | AggregateKind::Sum | AggregateKind::Avg
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub func: Func,
    pub distinct: bool,
    /// Set when resolved for a terminal aggregate query
    pub is_summary: bool,
}

impl Aggregate {
    pub fn new(kind: AggregateKind, expr: impl Into<Expression>) -> Self {
        let func = Func {
            arity: Some(1),
            ..Func::new(kind.function(), vec![expr.into()])
                .with_name(kind.name())
                .with_template(AGGREGATE_TEMPLATE)
                .with_extra("distinct", "")
        };
        Self {
            kind,
            func,
            distinct: false,
            is_summary: false,
        }
    }

    pub fn count(expr: impl Into<Expression>) -> Self {
        Self::new(AggregateKind::Count, expr)
    }

    /// `COUNT(*)`
    pub fn count_all() -> Self {
        Self::new(AggregateKind::Count, Expression::Star)
    }

    pub fn sum(expr: impl Into<Expression>) -> Self {
        Self::new(AggregateKind::Sum, expr)
    }

    pub fn avg(expr: impl Into<Expression>) -> Self {
        Self::new(AggregateKind::Avg, expr)
    }

    pub fn min(expr: impl Into<Expression>) -> Self {
        Self::new(AggregateKind::Min, expr)
    }

    pub fn max(expr: impl Into<Expression>) -> Self {
        Self::new(AggregateKind::Max, expr)
    }

    pub fn std_dev(expr: impl Into<Expression>) -> Self {
        Self::new(AggregateKind::StdDev, expr)
    }

    pub fn variance(expr: impl Into<Expression>) -> Self {
        Self::new(AggregateKind::Variance, expr)
    }

    /// Aggregate over distinct values; the keyword is part of the SQL text,
    /// never a bound parameter.
    pub fn distinct(mut self) -> ExpressionResult<Self> {
        if !self.kind.allows_distinct() {
            return Err(ExpressionError::construction(format!(
                "{} does not allow distinct.",
                self.kind.name()
            )));
        }
        if matches!(self.source()?, Expression::Star) {
            return Err(ExpressionError::construction(
                "Star cannot be used with distinct.",
            ));
        }
        self.distinct = true;
        self.func = self.func.with_extra("distinct", "DISTINCT ");
        Ok(self)
    }

    pub fn with_output_field(mut self, output_field: DataType) -> Self {
        self.func.output_field = Some(output_field);
        self
    }

    /// The single aggregated expression; a node decoded with any other
    /// argument count is an arity error.
    pub fn source(&self) -> ExpressionResult<&Expression> {
        match self.func.args.as_slice() {
            [source] => Ok(source),
            args => Err(ExpressionError::Arity {
                node: self.kind.name().to_string(),
                expected: 1,
                actual: args.len(),
            }),
        }
    }

    pub fn output_field(&self) -> ExpressionResult<Option<DataType>> {
        if let Some(declared) = self.func.output_field {
            return Ok(Some(declared));
        }
        match self.kind {
            AggregateKind::Count => Ok(Some(DataType::BigInteger)),
            AggregateKind::StdDev | AggregateKind::Variance => Ok(Some(DataType::Float)),
            AggregateKind::Avg => match self.source()?.output_field()? {
                Some(DataType::Decimal) => Ok(Some(DataType::Decimal)),
                _ => Ok(Some(DataType::Float)),
            },
            AggregateKind::Sum | AggregateKind::Min | AggregateKind::Max => {
                self.source()?.output_field()
            }
        }
    }

    /// Coerce a fetched value: an empty COUNT is 0, float aggregates widen
    /// integers returned by the store.
    pub fn convert_value(&self, value: Value) -> Value {
        match (self.kind, value) {
            (AggregateKind::Count, Value::Null) => Value::Integer(0),
            (_, Value::Integer(i)) if matches!(self.output_field(), Ok(Some(DataType::Float))) => {
                Value::Float(i as f64)
            }
            (_, value) => value,
        }
    }
}
