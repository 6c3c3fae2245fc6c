//! Routing of predicates between the pre-grouping and post-grouping clauses.

use crate::expression::Expression;
use log::trace;
use std::collections::BTreeMap;

/// Clause a filter conjunct belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterClause {
    /// `WHERE`
    PreGrouping,
    /// `HAVING`
    PostGrouping,
}

/// Classify a resolved predicate against the aggregates already annotated on
/// the query, keyed by alias.
pub fn classify_predicate(
    predicate: &Expression,
    existing: &BTreeMap<String, Expression>,
) -> FilterClause {
    if let Some(found) = predicate.refs_aggregate(existing) {
        trace!(
            "'{}' references aggregate '{}' at {:?}",
            predicate,
            found.alias,
            found.path
        );
        return FilterClause::PostGrouping;
    }
    if predicate.contains_aggregate() {
        FilterClause::PostGrouping
    } else {
        FilterClause::PreGrouping
    }
}
