//! Sort-direction wrapper used in ORDER BY clauses.

use crate::expression::Expression;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// Where NULLs sort; `Default` leaves it to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullsOrder {
    #[default]
    Default,
    First,
    Last,
}

impl NullsOrder {
    pub fn reversed(self) -> Self {
        match self {
            NullsOrder::Default => NullsOrder::Default,
            NullsOrder::First => NullsOrder::Last,
            NullsOrder::Last => NullsOrder::First,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expr: Box<Expression>,
    pub direction: Direction,
    pub nulls: NullsOrder,
}

impl OrderBy {
    pub fn new(expr: Expression, direction: Direction) -> Self {
        Self {
            expr: Box::new(expr),
            direction,
            nulls: NullsOrder::Default,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullsOrder::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullsOrder::Last;
        self
    }

    pub fn is_descending(&self) -> bool {
        self.direction == Direction::Descending
    }

    /// Flip the direction. Explicit null placement flips with it; default
    /// placement stays default because it is backend-defined.
    pub fn reverse_ordering(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            direction: self.direction.reversed(),
            nulls: self.nulls.reversed(),
        }
    }
}
