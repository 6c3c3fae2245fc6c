//! Query context: resolves field paths against the catalog, owns the joins
//! those paths create, and assembles the final `SELECT` statement.

pub mod join;
pub mod router;

pub use join::{Join, JoinType};
pub use router::{classify_predicate, FilterClause};

use crate::catalog::{Catalog, ColumnInfo, Relation, TableInfo};
use crate::compiler::{SqlCompiler, SqlFragment};
use crate::expression::{
    Col, Expression, ExpressionError, ExpressionResult, FieldRef, Ref, ResolveContext,
};
use log::debug;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug)]
pub struct Query<'a> {
    catalog: &'a Catalog,
    table: &'a TableInfo,
    base_alias: String,
    joins: Vec<Join>,
    /// Resolved annotations in insertion order
    annotations: Vec<(String, Expression)>,
    /// Explicit select list; empty selects every base column
    select: Vec<Expression>,
    where_: Vec<Expression>,
    having: Vec<Expression>,
    order_by: Vec<Expression>,
    /// Terminal aggregates; when present the query returns one summary row
    summary: Vec<(String, Expression)>,
}

impl<'a> Query<'a> {
    pub fn new(catalog: &'a Catalog, table_name: &str) -> ExpressionResult<Self> {
        let table = catalog
            .get_table(table_name)
            .ok_or_else(|| ExpressionError::UnknownTable {
                name: table_name.to_string(),
            })?;
        Ok(Self {
            catalog,
            table,
            base_alias: table.db_table.clone(),
            joins: Vec::new(),
            annotations: Vec::new(),
            select: Vec::new(),
            where_: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            summary: Vec::new(),
        })
    }

    pub fn base_alias(&self) -> &str {
        &self.base_alias
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn where_clause(&self) -> &[Expression] {
        &self.where_
    }

    pub fn having_clause(&self) -> &[Expression] {
        &self.having
    }

    /// Add a named computed value to the select list
    pub fn annotate(
        &mut self,
        alias: impl Into<String>,
        expr: impl Into<Expression>,
    ) -> ExpressionResult<()> {
        let alias = alias.into();
        if self.table.column(&alias).is_some() {
            return Err(ExpressionError::construction(format!(
                "The annotation '{}' conflicts with a field on the model.",
                alias
            )));
        }
        if self.annotations.iter().any(|(existing, _)| *existing == alias) {
            return Err(ExpressionError::construction(format!(
                "The annotation '{}' is already defined.",
                alias
            )));
        }

        let resolved = expr.into().resolve_expression(self, true, None, false)?;
        debug!("annotate {} = {}", alias, resolved);
        self.annotations.push((alias, resolved));
        Ok(())
    }

    /// Annotations whose value aggregates, keyed by alias
    pub fn existing_aggregates(&self) -> BTreeMap<String, Expression> {
        self.annotations
            .iter()
            .filter(|(_, expr)| expr.contains_aggregate())
            .map(|(alias, expr)| (alias.clone(), expr.clone()))
            .collect()
    }

    /// Add a predicate, routing each top-level conjunct to WHERE or HAVING.
    ///
    /// Only annotations added before this call are visible to the predicate.
    pub fn filter(&mut self, predicate: impl Into<Expression>) -> ExpressionResult<Vec<FilterClause>> {
        let resolved = predicate.into().resolve_expression(self, true, None, false)?;
        let conjuncts = match resolved {
            Expression::Where(node) => node.into_conjuncts(),
            other => vec![other],
        };
        Ok(self.route(conjuncts))
    }

    /// Add a negated predicate; the negation is routed as a whole
    pub fn exclude(&mut self, predicate: impl Into<Expression>) -> ExpressionResult<FilterClause> {
        let resolved = predicate.into().resolve_expression(self, true, None, false)?;
        let clauses = self.route(vec![Expression::not_expr(resolved)]);
        Ok(clauses.first().copied().unwrap_or(FilterClause::PreGrouping))
    }

    fn route(&mut self, conjuncts: Vec<Expression>) -> Vec<FilterClause> {
        let existing = self.existing_aggregates();
        conjuncts
            .into_iter()
            .map(|conjunct| {
                let clause = classify_predicate(&conjunct, &existing);
                debug!("{:?}: {}", clause, conjunct);
                match clause {
                    FilterClause::PreGrouping => self.where_.push(conjunct),
                    FilterClause::PostGrouping => self.having.push(conjunct),
                }
                clause
            })
            .collect()
    }

    /// Restrict the select list; grouping follows these expressions
    pub fn values(&mut self, fields: Vec<Expression>) -> ExpressionResult<()> {
        let mut select = Vec::with_capacity(fields.len());
        for field in fields {
            select.push(field.resolve_expression(self, true, None, false)?);
        }
        self.select = select;
        Ok(())
    }

    /// Append sort keys; bare expressions sort ascending
    pub fn order_by(&mut self, exprs: Vec<Expression>) -> ExpressionResult<()> {
        for expr in exprs {
            let resolved = match expr.resolve_expression(self, true, None, false)? {
                ordering @ Expression::Ordering(_) => ordering,
                other => other.asc(),
            };
            self.order_by.push(resolved);
        }
        Ok(())
    }

    /// Add a terminal aggregate; the query then returns a single summary row
    pub fn aggregate(
        &mut self,
        alias: impl Into<String>,
        expr: impl Into<Expression>,
    ) -> ExpressionResult<()> {
        let alias = alias.into();
        let resolved = expr.into().resolve_expression(self, true, None, true)?;
        debug!("aggregate {} = {}", alias, resolved);
        self.summary.push((alias, resolved));
        Ok(())
    }

    fn base_columns(&self) -> Vec<Expression> {
        self.table
            .columns
            .iter()
            .map(|column| {
                Expression::Col(Col::new(
                    self.base_alias.clone(),
                    column.column.clone(),
                    Some(column.data_type),
                ))
            })
            .collect()
    }

    /// GROUP BY columns, or `None` when nothing aggregates
    pub fn group_by(&self) -> Option<Vec<Expression>> {
        let aggregates = self.annotations.iter().any(|(_, e)| e.contains_aggregate())
            || !self.having.is_empty();
        if !aggregates || !self.summary.is_empty() {
            return None;
        }

        let select = if self.select.is_empty() {
            self.base_columns()
        } else {
            self.select.clone()
        };

        let mut columns: Vec<Expression> = Vec::new();
        let candidates = select
            .iter()
            .chain(self.annotations.iter().map(|(_, e)| e))
            .chain(self.having.iter())
            .chain(self.order_by.iter())
            .flat_map(Expression::group_by_cols);
        for column in candidates {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        Some(columns)
    }

    /// Render the statement with `?` markers and its ordered parameters
    pub fn compile(&self, compiler: &SqlCompiler) -> ExpressionResult<SqlFragment> {
        let mut sql = String::from("SELECT ");
        let mut params = Vec::new();

        let mut columns = Vec::new();
        if self.summary.is_empty() {
            let select = if self.select.is_empty() {
                self.base_columns()
            } else {
                self.select.clone()
            };
            for expr in &select {
                let fragment = compiler.compile(expr)?;
                columns.push(fragment.sql);
                params.extend(fragment.params);
            }
        }
        let named = if self.summary.is_empty() {
            &self.annotations
        } else {
            &self.summary
        };
        for (alias, expr) in named {
            let fragment = compiler.compile(expr)?;
            columns.push(format!("{} AS {}", fragment.sql, compiler.quote_name(alias)));
            params.extend(fragment.params);
        }
        sql.push_str(&columns.join(", "));

        sql.push_str(" FROM ");
        sql.push_str(&compiler.quote_name(&self.table.db_table));
        if self.base_alias != self.table.db_table {
            sql.push(' ');
            sql.push_str(&compiler.quote_name(&self.base_alias));
        }
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql(compiler));
        }

        let mut clause = |keyword: &str, exprs: &[Expression], sep: &str| -> ExpressionResult<()> {
            if exprs.is_empty() {
                return Ok(());
            }
            let fragment = compiler.compile_list(exprs, sep)?;
            sql.push_str(keyword);
            sql.push_str(&fragment.sql);
            params.extend(fragment.params);
            Ok(())
        };

        clause(" WHERE ", &self.where_, " AND ")?;
        if let Some(group_by) = self.group_by() {
            clause(" GROUP BY ", &group_by, ", ")?;
        }
        clause(" HAVING ", &self.having, " AND ")?;
        if self.summary.is_empty() {
            clause(" ORDER BY ", &self.order_by, ", ")?;
        }

        Ok(SqlFragment::new(sql, params))
    }

    fn field_error(&self, field: &FieldRef, table: &TableInfo, at_base: bool) -> ExpressionError {
        let mut choices: Vec<String> = table.column_names().into_iter().map(String::from).collect();
        if at_base {
            choices.extend(self.annotations.iter().map(|(alias, _)| alias.clone()));
        }
        choices.sort();
        ExpressionError::FieldResolution {
            name: field.name.clone(),
            choices,
        }
    }

    fn next_alias(&self, db_table: &str) -> String {
        let taken = |alias: &str| {
            alias == self.base_alias || self.joins.iter().any(|j| j.table_alias == alias)
        };
        if !taken(db_table) {
            return db_table.to_string();
        }
        let mut n = self.joins.len() + 2;
        loop {
            let alias = format!("T{}", n);
            if !taken(&alias) {
                return alias;
            }
            n += 1;
        }
    }

    /// Join `target` from `parent_alias` through `column`, reusing an
    /// equivalent join when `reuse` allows it. Returns the joined alias.
    fn setup_join(
        &mut self,
        parent_alias: &str,
        column: &ColumnInfo,
        relation: &Relation,
        target: &TableInfo,
        nullable: bool,
        reuse: Option<&HashSet<String>>,
    ) -> String {
        let mut join = Join {
            table_name: target.table_name.clone(),
            db_table: target.db_table.clone(),
            table_alias: String::new(),
            parent_alias: parent_alias.to_string(),
            parent_column: column.column.clone(),
            target_column: relation.to_column.clone(),
            join_type: if nullable {
                JoinType::LeftOuter
            } else {
                JoinType::Inner
            },
        };

        let reusable = self.joins.iter().find(|existing| {
            existing.is_equivalent(&join)
                && reuse.map_or(true, |aliases| aliases.contains(&existing.table_alias))
        });
        if let Some(existing) = reusable {
            debug!("reusing join {} for {}", existing.table_alias, column.name);
            return existing.table_alias.clone();
        }

        join.table_alias = self.next_alias(&target.db_table);
        debug!(
            "{} {} as {} for {}",
            join.join_type.as_str(),
            join.db_table,
            join.table_alias,
            column.name
        );
        let alias = join.table_alias.clone();
        self.joins.push(join);
        alias
    }
}

impl ResolveContext for Query<'_> {
    fn resolve_ref(
        &mut self,
        field: &FieldRef,
        allow_joins: bool,
        reuse: Option<&HashSet<String>>,
        _summarize: bool,
    ) -> ExpressionResult<Expression> {
        let parts = field.parts();
        let Some((last, path)) = parts.split_last() else {
            return Err(self.field_error(field, self.table, true));
        };

        if let Some((alias, annotation)) = self.annotations.iter().find(|(a, _)| a == parts[0]) {
            if !path.is_empty() {
                return Err(self.field_error(field, self.table, true));
            }
            return Ok(Expression::Ref(Ref::new(alias.clone(), annotation.clone())));
        }

        let catalog = self.catalog;
        let mut table = self.table;
        let mut alias = self.base_alias.clone();
        let mut nullable = false;

        for (depth, part) in path.iter().enumerate() {
            let Some(column) = table.column(part) else {
                return Err(self.field_error(field, table, depth == 0));
            };
            let Some(relation) = &column.relation else {
                return Err(ExpressionError::FieldResolution {
                    name: field.name.clone(),
                    choices: vec![format!("'{}' is not a relation", part)],
                });
            };
            if !allow_joins {
                return Err(ExpressionError::JoinNotAllowed {
                    path: field.name.clone(),
                });
            }
            let target = catalog
                .get_table(&relation.to_table)
                .ok_or_else(|| ExpressionError::UnknownTable {
                    name: relation.to_table.clone(),
                })?;
            nullable |= column.nullable;
            alias = self.setup_join(&alias, column, relation, target, nullable, reuse);
            table = target;
        }

        let Some(column) = table.column(last) else {
            return Err(self.field_error(field, table, path.is_empty()));
        };
        Ok(Expression::Col(Col::new(
            alias,
            column.column.clone(),
            Some(column.data_type),
        )))
    }
}
