//! Composable expression trees.
//!
//! This module provides:
//! - The expression node hierarchy (fields, literals, functions, aggregates)
//! - Output type inference for mixed arithmetic
//! - Resolution of field paths against a query context
//! - Structural helpers: relabeling, group-by columns, aggregate references

pub mod aggregate;
pub mod combined;
pub mod error;
pub mod expr;
pub mod func;
pub mod leaf;
pub mod operator;
pub mod ordering;
pub mod predicate;
pub mod resolve;

pub use aggregate::{Aggregate, AggregateKind};
pub use combined::CombinedExpression;
pub use error::{ExpressionError, ExpressionResult};
pub use expr::{AggregateRef, Expression, ExpressionWrapper};
pub use func::Func;
pub use leaf::{Col, FieldRef, Literal, Ref};
pub use operator::{ArithmeticOperator, ComparisonOperator, LogicalOperator};
pub use ordering::{Direction, NullsOrder, OrderBy};
pub use predicate::{Comparison, WhereNode};
pub use resolve::ResolveContext;
