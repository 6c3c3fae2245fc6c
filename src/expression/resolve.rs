//! Binding pass: turns a caller-built tree into a resolved copy against a
//! query context.

use crate::expression::leaf::FieldRef;
use crate::expression::{Expression, ExpressionError, ExpressionResult};
use log::trace;
use std::collections::HashSet;

/// Query side of resolution: maps field paths onto columns, joins and
/// annotations.
pub trait ResolveContext {
    /// Resolve a dotted path to a [`Col`](crate::expression::Col) or an
    /// annotation [`Ref`](crate::expression::Ref).
    ///
    /// `reuse` limits which existing joins may be shared: `None` allows any
    /// equivalent join, `Some(set)` only the aliases in `set`.
    fn resolve_ref(
        &mut self,
        field: &FieldRef,
        allow_joins: bool,
        reuse: Option<&HashSet<String>>,
        summarize: bool,
    ) -> ExpressionResult<Expression>;
}

impl Expression {
    /// Resolve this tree against `ctx`, returning a new bound tree.
    ///
    /// Children resolve before their parents. With `summarize` set the tree is
    /// the value of a terminal aggregate query and must itself aggregate.
    pub fn resolve_expression<C: ResolveContext + ?Sized>(
        &self,
        ctx: &mut C,
        allow_joins: bool,
        reuse: Option<&HashSet<String>>,
        summarize: bool,
    ) -> ExpressionResult<Expression> {
        let resolved = self.resolve_node(ctx, allow_joins, reuse, summarize)?;
        if summarize && !resolved.contains_aggregate() {
            return Err(ExpressionError::NotAnAggregate {
                expression: self.to_string(),
            });
        }
        Ok(resolved)
    }

    fn resolve_node<C: ResolveContext + ?Sized>(
        &self,
        ctx: &mut C,
        allow_joins: bool,
        reuse: Option<&HashSet<String>>,
        summarize: bool,
    ) -> ExpressionResult<Expression> {
        self.check_arity()?;
        match self {
            Expression::Field(field) => {
                let resolved = ctx.resolve_ref(field, allow_joins, reuse, summarize)?;
                trace!("resolved field '{}' to {}", field.name, resolved);
                Ok(resolved)
            }
            Expression::Col(_) | Expression::Ref(_) | Expression::Literal(_) | Expression::Star => {
                Ok(self.clone())
            }
            Expression::Aggregate(original) => {
                let resolved = self.try_map_sources(|child| {
                    child.resolve_node(ctx, allow_joins, reuse, summarize)
                })?;
                match resolved {
                    Expression::Aggregate(aggregate)
                        if aggregate.func.args.iter().any(Expression::contains_aggregate) =>
                    {
                        Err(ExpressionError::NestedAggregate {
                            function: aggregate.kind.name().to_string(),
                            name: original.source()?.to_string(),
                        })
                    }
                    Expression::Aggregate(mut aggregate) => {
                        aggregate.is_summary = summarize;
                        Ok(Expression::Aggregate(aggregate))
                    }
                    other => Ok(other),
                }
            }
            _ => self.try_map_sources(|child| child.resolve_node(ctx, allow_joins, reuse, summarize)),
        }
    }
}
