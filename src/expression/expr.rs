//! Expression tree definition and the operations shared by every node.

use crate::compiler::Backend;
use crate::expression::aggregate::Aggregate;
use crate::expression::combined::CombinedExpression;
use crate::expression::func::Func;
use crate::expression::leaf::{Col, FieldRef, Literal, Ref};
use crate::expression::operator::{ArithmeticOperator, ComparisonOperator, LogicalOperator};
use crate::expression::ordering::{Direction, OrderBy};
use crate::expression::predicate::{Comparison, WhereNode};
use crate::expression::{ExpressionError, ExpressionResult};
use crate::types::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::fmt;
use std::ops;

/// Subtree with an explicitly declared output type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionWrapper {
    pub expr: Box<Expression>,
    pub output_field: DataType,
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Unresolved field path
    Field(FieldRef),

    /// Column bound to a table alias
    Col(Col),

    /// Reference to a query annotation
    Ref(Ref),

    /// Constant bound as a parameter
    Literal(Literal),

    /// `*`, only meaningful inside COUNT
    Star,

    /// Binary arithmetic
    Combined(CombinedExpression),

    /// Function call
    Func(Func),

    /// Aggregate function call
    Aggregate(Aggregate),

    /// Sort-direction wrapper
    Ordering(OrderBy),

    /// Comparison predicate
    Compare(Comparison),

    /// AND/OR predicate tree
    Where(WhereNode),

    /// Subtree with a declared output type
    Wrapper(ExpressionWrapper),
}

/// Location of a reference to an existing aggregate inside a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRef {
    /// Alias of the referenced aggregate annotation
    pub alias: String,
    /// Child indexes leading from the root to the referencing node
    pub path: Vec<usize>,
}

impl Expression {
    /// Create a field reference expression
    pub fn field(name: impl Into<String>) -> Self {
        Expression::Field(FieldRef::new(name))
    }

    /// Create a literal expression
    pub fn value(value: impl Into<Value>) -> Self {
        Expression::Literal(Literal::new(value.into()))
    }

    /// Create an arithmetic expression
    pub fn combine(
        left: impl Into<Expression>,
        op: ArithmeticOperator,
        right: impl Into<Expression>,
    ) -> Self {
        Expression::Combined(CombinedExpression::new(left.into(), op, right.into()))
    }

    /// Create an addition expression
    pub fn add_expr(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::combine(left, ArithmeticOperator::Add, right)
    }

    /// Create a subtraction expression
    pub fn sub_expr(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::combine(left, ArithmeticOperator::Sub, right)
    }

    /// Create a multiplication expression
    pub fn mul_expr(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::combine(left, ArithmeticOperator::Mul, right)
    }

    /// Create a division expression
    pub fn div_expr(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::combine(left, ArithmeticOperator::Div, right)
    }

    /// Create a modulo expression
    pub fn mod_expr(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::combine(left, ArithmeticOperator::Mod, right)
    }

    /// Create a power expression
    pub fn pow_expr(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::combine(left, ArithmeticOperator::Pow, right)
    }

    fn compare(
        left: impl Into<Expression>,
        op: ComparisonOperator,
        right: impl Into<Expression>,
    ) -> Self {
        Expression::Compare(Comparison::new(left.into(), op, right.into()))
    }

    /// Create an equality expression
    pub fn eq(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::compare(left, ComparisonOperator::Eq, right)
    }

    /// Create a not-equal expression
    pub fn ne(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::compare(left, ComparisonOperator::Ne, right)
    }

    /// Create a less-than expression
    pub fn lt(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::compare(left, ComparisonOperator::Lt, right)
    }

    /// Create a less-than-or-equal expression
    pub fn le(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::compare(left, ComparisonOperator::Le, right)
    }

    /// Create a greater-than expression
    pub fn gt(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::compare(left, ComparisonOperator::Gt, right)
    }

    /// Create a greater-than-or-equal expression
    pub fn ge(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::compare(left, ComparisonOperator::Ge, right)
    }

    /// Create an AND expression
    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::Where(WhereNode::new(LogicalOperator::And, vec![left, right]))
    }

    /// Create an OR expression
    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Where(WhereNode::new(LogicalOperator::Or, vec![left, right]))
    }

    /// Create a NOT expression
    pub fn not_expr(operand: Expression) -> Self {
        match operand {
            Expression::Where(node) => Expression::Where(node.negate()),
            other => Expression::Where(WhereNode::new(LogicalOperator::And, vec![other]).negate()),
        }
    }

    /// Declare the output type of this expression
    pub fn with_output_field(self, output_field: DataType) -> Self {
        match self {
            Expression::Combined(c) => Expression::Combined(c.with_output_field(output_field)),
            Expression::Func(f) => Expression::Func(f.with_output_field(output_field)),
            Expression::Aggregate(a) => Expression::Aggregate(a.with_output_field(output_field)),
            Expression::Literal(l) => Expression::Literal(Literal::typed(l.value, output_field)),
            other => Expression::Wrapper(ExpressionWrapper {
                expr: Box::new(other),
                output_field,
            }),
        }
    }

    /// Sort ascending
    pub fn asc(self) -> Self {
        self.ordered(Direction::Ascending)
    }

    /// Sort descending
    pub fn desc(self) -> Self {
        self.ordered(Direction::Descending)
    }

    /// An existing ordering keeps its null placement and takes the new direction
    fn ordered(self, direction: Direction) -> Self {
        match self {
            Expression::Ordering(mut ordering) => {
                ordering.direction = direction;
                Expression::Ordering(ordering)
            }
            other => Expression::Ordering(OrderBy::new(other, direction)),
        }
    }

    /// Reverse an ordering; any other node is returned unchanged
    pub fn reverse_ordering(&self) -> Self {
        match self {
            Expression::Ordering(ordering) => Expression::Ordering(ordering.reverse_ordering()),
            other => other.clone(),
        }
    }

    /// Node kind, used for vendor dispatch and error messages
    pub fn kind_name(&self) -> &str {
        match self {
            Expression::Field(_) => "FieldRef",
            Expression::Col(_) => "Col",
            Expression::Ref(_) => "Ref",
            Expression::Literal(_) => "Literal",
            Expression::Star => "Star",
            Expression::Combined(_) => "CombinedExpression",
            Expression::Func(f) => &f.name,
            Expression::Aggregate(a) => a.kind.name(),
            Expression::Ordering(_) => "OrderBy",
            Expression::Compare(_) => "Comparison",
            Expression::Where(_) => "WhereNode",
            Expression::Wrapper(_) => "ExpressionWrapper",
        }
    }

    /// Get the output type of this expression.
    ///
    /// `Ok(None)` means the type is unknown but not contradictory (bare NULL,
    /// unresolved field); an error means the operands cannot be combined
    /// without a declared type.
    pub fn output_field(&self) -> ExpressionResult<Option<DataType>> {
        match self {
            Expression::Field(_) | Expression::Star | Expression::Ordering(_) => Ok(None),
            Expression::Col(col) => Ok(col.output_field),
            Expression::Ref(r) => r.source.output_field(),
            Expression::Literal(lit) => Ok(lit.output_field()),
            Expression::Combined(c) => c.output_field(),
            Expression::Func(f) => f.output_field(),
            Expression::Aggregate(a) => a.output_field(),
            Expression::Compare(_) | Expression::Where(_) => Ok(Some(DataType::Boolean)),
            Expression::Wrapper(w) => Ok(Some(w.output_field)),
        }
    }

    /// True if this node is an aggregate or any descendant is
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate(_) => true,
            other => other
                .source_expressions()
                .into_iter()
                .any(Expression::contains_aggregate),
        }
    }

    /// Ordered children of this node
    pub fn source_expressions(&self) -> Vec<&Expression> {
        match self {
            Expression::Field(_)
            | Expression::Col(_)
            | Expression::Literal(_)
            | Expression::Star => Vec::new(),
            Expression::Ref(r) => vec![&*r.source],
            Expression::Combined(c) => vec![&*c.lhs, &*c.rhs],
            Expression::Func(f) => f.args.iter().collect(),
            Expression::Aggregate(a) => a.func.args.iter().collect(),
            Expression::Ordering(o) => vec![&*o.expr],
            Expression::Compare(c) => vec![&*c.lhs, &*c.rhs],
            Expression::Where(w) => w.children.iter().collect(),
            Expression::Wrapper(w) => vec![&*w.expr],
        }
    }

    /// Number of children this node must have
    pub fn arity(&self) -> usize {
        match self {
            Expression::Func(f) => f.expected_arity(),
            Expression::Aggregate(_) => 1,
            other => other.source_expressions().len(),
        }
    }

    /// Reject a node whose children do not match its arity, such as an
    /// aggregate decoded from JSON with an empty argument list
    pub fn check_arity(&self) -> ExpressionResult<()> {
        let expected = self.arity();
        let actual = self.source_expressions().len();
        if actual != expected {
            return Err(ExpressionError::Arity {
                node: self.kind_name().to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Replace the children, returning the new node
    pub fn with_source_expressions(self, exprs: Vec<Expression>) -> ExpressionResult<Expression> {
        let expected = self.arity();
        if exprs.len() != expected {
            return Err(ExpressionError::Arity {
                node: self.kind_name().to_string(),
                expected,
                actual: exprs.len(),
            });
        }

        let mut exprs = exprs.into_iter();

        Ok(match self {
            Expression::Field(_)
            | Expression::Col(_)
            | Expression::Literal(_)
            | Expression::Star => self,
            Expression::Ref(r) => Expression::Ref(Ref {
                alias: r.alias,
                source: take_boxed(&mut exprs)?,
            }),
            Expression::Combined(c) => Expression::Combined(CombinedExpression {
                lhs: take_boxed(&mut exprs)?,
                rhs: take_boxed(&mut exprs)?,
                ..c
            }),
            Expression::Func(f) => Expression::Func(Func {
                args: exprs.collect(),
                ..f
            }),
            Expression::Aggregate(a) => Expression::Aggregate(Aggregate {
                func: Func {
                    args: exprs.collect(),
                    ..a.func
                },
                ..a
            }),
            Expression::Ordering(o) => Expression::Ordering(OrderBy {
                expr: take_boxed(&mut exprs)?,
                ..o
            }),
            Expression::Compare(c) => Expression::Compare(Comparison {
                lhs: take_boxed(&mut exprs)?,
                rhs: take_boxed(&mut exprs)?,
                ..c
            }),
            Expression::Where(w) => Expression::Where(WhereNode {
                children: exprs.collect(),
                ..w
            }),
            Expression::Wrapper(w) => Expression::Wrapper(ExpressionWrapper {
                expr: take_boxed(&mut exprs)?,
                ..w
            }),
        })
    }

    /// Build a new node whose children are `f` applied to each child, in order
    pub fn try_map_sources<E, F>(&self, mut f: F) -> Result<Expression, E>
    where
        F: FnMut(&Expression) -> Result<Expression, E>,
    {
        Ok(match self {
            Expression::Field(_)
            | Expression::Col(_)
            | Expression::Literal(_)
            | Expression::Star => self.clone(),
            Expression::Ref(r) => Expression::Ref(Ref {
                alias: r.alias.clone(),
                source: f(&r.source).map(Box::new)?,
            }),
            Expression::Combined(c) => Expression::Combined(CombinedExpression {
                lhs: f(&c.lhs).map(Box::new)?,
                op: c.op,
                rhs: f(&c.rhs).map(Box::new)?,
                output_field: c.output_field,
            }),
            Expression::Func(func) => Expression::Func(map_func(func, &mut f)?),
            Expression::Aggregate(a) => Expression::Aggregate(Aggregate {
                kind: a.kind,
                func: map_func(&a.func, &mut f)?,
                distinct: a.distinct,
                is_summary: a.is_summary,
            }),
            Expression::Ordering(o) => Expression::Ordering(OrderBy {
                expr: f(&o.expr).map(Box::new)?,
                direction: o.direction,
                nulls: o.nulls,
            }),
            Expression::Compare(c) => Expression::Compare(Comparison {
                lhs: f(&c.lhs).map(Box::new)?,
                op: c.op,
                rhs: f(&c.rhs).map(Box::new)?,
            }),
            Expression::Where(w) => Expression::Where(WhereNode {
                connector: w.connector,
                children: w.children.iter().map(&mut f).collect::<Result<_, E>>()?,
                negated: w.negated,
            }),
            Expression::Wrapper(w) => Expression::Wrapper(ExpressionWrapper {
                expr: f(&w.expr).map(Box::new)?,
                output_field: w.output_field,
            }),
        })
    }

    /// Copy of the tree with column aliases rewritten through `change_map`
    pub fn relabeled_clone(&self, change_map: &HashMap<String, String>) -> Expression {
        match self {
            Expression::Col(col) => Expression::Col(col.relabeled_clone(change_map)),
            other => {
                let mapped = other.try_map_sources(|child| {
                    Ok::<_, Infallible>(child.relabeled_clone(change_map))
                });
                match mapped {
                    Ok(expr) => expr,
                    Err(never) => match never {},
                }
            }
        }
    }

    /// Coerce a value fetched for this expression
    pub fn convert_value(&self, value: Value, backend: Backend) -> Value {
        match (self, value) {
            (Expression::Aggregate(a), value) => a.convert_value(value),
            (Expression::Ref(r), value) => r.source.convert_value(value, backend),
            (Expression::Wrapper(w), value) => w.expr.convert_value(value, backend),
            (Expression::Col(col), Value::Integer(i))
                if col.output_field == Some(DataType::Boolean) && !backend.has_native_boolean() =>
            {
                Value::Boolean(i != 0)
            }
            (_, value) => value,
        }
    }

    /// Find the first reference (depth-first, leftmost first) to an aggregate
    /// in `existing`, keyed by annotation alias.
    pub fn refs_aggregate(&self, existing: &BTreeMap<String, Expression>) -> Option<AggregateRef> {
        let mut path = Vec::new();
        self.refs_aggregate_at(existing, &mut path)
    }

    fn refs_aggregate_at(
        &self,
        existing: &BTreeMap<String, Expression>,
        path: &mut Vec<usize>,
    ) -> Option<AggregateRef> {
        let found = match self {
            Expression::Ref(r) if r.source.contains_aggregate() && existing.contains_key(&r.alias) => {
                Some(r.alias.clone())
            }
            Expression::Aggregate(_) => existing
                .iter()
                .find(|(_, aggregate)| *aggregate == self)
                .map(|(alias, _)| alias.clone()),
            _ => None,
        };
        if let Some(alias) = found {
            return Some(AggregateRef {
                alias,
                path: path.clone(),
            });
        }

        for (index, child) in self.source_expressions().into_iter().enumerate() {
            path.push(index);
            if let Some(found) = child.refs_aggregate_at(existing, path) {
                return Some(found);
            }
            path.pop();
        }
        None
    }

    /// Column references this subtree adds to a GROUP BY clause.
    ///
    /// Aggregates are opaque: they contribute nothing, even when their
    /// argument is a plain column.
    pub fn group_by_cols(&self) -> Vec<Expression> {
        match self {
            Expression::Col(_) | Expression::Field(_) => vec![self.clone()],
            Expression::Literal(_) | Expression::Star | Expression::Aggregate(_) => Vec::new(),
            other => other
                .source_expressions()
                .into_iter()
                .flat_map(Expression::group_by_cols)
                .collect(),
        }
    }
}

fn take_boxed(
    exprs: &mut std::vec::IntoIter<Expression>,
) -> ExpressionResult<Box<Expression>> {
    exprs.next().map(Box::new).ok_or_else(|| ExpressionError::Arity {
        node: "Expression".to_string(),
        expected: 1,
        actual: 0,
    })
}

fn map_func<E, F>(func: &Func, f: &mut F) -> Result<Func, E>
where
    F: FnMut(&Expression) -> Result<Expression, E>,
{
    Ok(Func {
        name: func.name.clone(),
        function: func.function.clone(),
        template: func.template.clone(),
        arg_joiner: func.arg_joiner.clone(),
        extra: func.extra.clone(),
        arity: func.arity,
        output_field: func.output_field,
        args: func.args.iter().map(f).collect::<Result<_, E>>()?,
    })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |exprs: &[Expression], sep: &str| {
            exprs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(sep)
        };
        match self {
            Expression::Field(field) => write!(f, "{}", field.name),
            Expression::Col(col) => write!(f, "{}.{}", col.alias, col.column),
            Expression::Ref(r) => write!(f, "{}", r.alias),
            Expression::Literal(lit) => write!(f, "{}", lit.value),
            Expression::Star => write!(f, "*"),
            Expression::Combined(c) => write!(f, "{} {} {}", c.lhs, c.op.as_str(), c.rhs),
            Expression::Func(func) => write!(f, "{}({})", func.name, join(&func.args, ", ")),
            Expression::Aggregate(a) => write!(
                f,
                "{}({}{})",
                a.kind.name(),
                if a.distinct { "DISTINCT " } else { "" },
                join(&a.func.args, ", ")
            ),
            Expression::Ordering(o) => write!(f, "{} {}", o.expr, o.direction.as_str()),
            Expression::Compare(c) => write!(f, "{} {} {}", c.lhs, c.op.as_str(), c.rhs),
            Expression::Where(w) => {
                let sep = format!(" {} ", w.connector.as_str());
                if w.negated {
                    write!(f, "NOT ({})", join(&w.children, &sep))
                } else {
                    write!(f, "({})", join(&w.children, &sep))
                }
            }
            Expression::Wrapper(w) => write!(f, "{}", w.expr),
        }
    }
}

impl From<&str> for Expression {
    fn from(name: &str) -> Self {
        Expression::field(name)
    }
}

impl From<String> for Expression {
    fn from(name: String) -> Self {
        Expression::field(name)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(Literal::new(value))
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::value(value)
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Self {
        Expression::value(value)
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::value(value)
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::value(value)
    }
}

macro_rules! impl_from_node {
    ($($node:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$node> for Expression {
                fn from(node: $node) -> Self {
                    Expression::$variant(node)
                }
            }
        )*
    };
}

impl_from_node! {
    FieldRef => Field,
    Col => Col,
    Ref => Ref,
    Literal => Literal,
    CombinedExpression => Combined,
    Func => Func,
    Aggregate => Aggregate,
    OrderBy => Ordering,
    Comparison => Compare,
    WhereNode => Where,
    ExpressionWrapper => Wrapper,
}

macro_rules! impl_arithmetic_op {
    ($($trait:ident, $method:ident => $op:ident;)*) => {
        $(
            impl<T: Into<Expression>> ops::$trait<T> for Expression {
                type Output = Expression;

                fn $method(self, rhs: T) -> Expression {
                    Expression::combine(self, ArithmeticOperator::$op, rhs)
                }
            }
        )*
    };
}

impl_arithmetic_op! {
    Add, add => Add;
    Sub, sub => Sub;
    Mul, mul => Mul;
    Div, div => Div;
    Rem, rem => Mod;
}
