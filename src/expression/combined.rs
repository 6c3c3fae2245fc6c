//! Binary arithmetic between two expressions.

use crate::expression::operator::ArithmeticOperator;
use crate::expression::{Expression, ExpressionResult};
use crate::types::DataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedExpression {
    pub lhs: Box<Expression>,
    pub op: ArithmeticOperator,
    pub rhs: Box<Expression>,
    /// Declared output type; inferred from the operands when absent
    pub output_field: Option<DataType>,
}

impl CombinedExpression {
    pub fn new(lhs: Expression, op: ArithmeticOperator, rhs: Expression) -> Self {
        Self {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            output_field: None,
        }
    }

    pub fn with_output_field(mut self, output_field: DataType) -> Self {
        self.output_field = Some(output_field);
        self
    }

    pub fn output_field(&self) -> ExpressionResult<Option<DataType>> {
        if let Some(declared) = self.output_field {
            return Ok(Some(declared));
        }
        let lhs = self.lhs.output_field()?;
        let rhs = self.rhs.output_field()?;
        self.op.output_type(lhs, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Col, Literal};

    fn col(name: &str, t: DataType) -> Expression {
        Expression::Col(Col::new("t", name, Some(t)))
    }

    #[test]
    fn test_inferred_output_field() {
        let expr = CombinedExpression::new(
            col("num", DataType::Integer),
            ArithmeticOperator::Add,
            Expression::Literal(Literal::float(0.5)),
        );
        assert_eq!(expr.output_field(), Ok(Some(DataType::Float)));
    }

    #[test]
    fn test_nested_inference() {
        let inner = CombinedExpression::new(
            col("a", DataType::Integer),
            ArithmeticOperator::Mul,
            col("b", DataType::Integer),
        );
        let outer = CombinedExpression::new(
            Expression::Combined(inner),
            ArithmeticOperator::Sub,
            col("c", DataType::Decimal),
        );
        assert_eq!(outer.output_field(), Ok(Some(DataType::Decimal)));
    }

    #[test]
    fn test_declared_output_field_wins() {
        let expr = CombinedExpression::new(
            col("price", DataType::Float),
            ArithmeticOperator::Add,
            col("fee", DataType::Decimal),
        );
        assert!(expr.output_field().is_err());

        let expr = expr.with_output_field(DataType::Decimal);
        assert_eq!(expr.output_field(), Ok(Some(DataType::Decimal)));
    }
}
