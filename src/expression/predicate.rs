//! Boolean predicates used in WHERE and HAVING clauses.

use crate::expression::operator::{ComparisonOperator, LogicalOperator};
use crate::expression::Expression;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub lhs: Box<Expression>,
    pub op: ComparisonOperator,
    pub rhs: Box<Expression>,
}

impl Comparison {
    pub fn new(lhs: Expression, op: ComparisonOperator, rhs: Expression) -> Self {
        Self {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }
}

/// AND/OR over child predicates, optionally negated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereNode {
    pub connector: LogicalOperator,
    pub children: Vec<Expression>,
    pub negated: bool,
}

impl WhereNode {
    pub fn new(connector: LogicalOperator, children: Vec<Expression>) -> Self {
        Self {
            connector,
            children,
            negated: false,
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Split a non-negated AND into its conjuncts; anything else is a single one
    pub fn into_conjuncts(self) -> Vec<Expression> {
        if self.connector == LogicalOperator::And && !self.negated {
            self.children
                .into_iter()
                .flat_map(|child| match child {
                    Expression::Where(node) => node.into_conjuncts(),
                    other => vec![other],
                })
                .collect()
        } else {
            vec![Expression::Where(self)]
        }
    }
}
