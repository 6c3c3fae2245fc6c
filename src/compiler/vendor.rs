//! Per-backend compilation overrides keyed by node kind.

use crate::compiler::{Backend, SqlCompiler, SqlFragment};
use crate::expression::{ArithmeticOperator, Expression, ExpressionResult, NullsOrder};
use std::collections::HashMap;

/// Compile function used in place of the generic path
pub type CompileFn = fn(&SqlCompiler, &Expression) -> ExpressionResult<SqlFragment>;

/// What a backend does differently for one node kind
#[derive(Debug, Clone)]
pub enum VendorOverride {
    /// Swap template pieces of a function node, then compile generically
    Template {
        function: Option<String>,
        template: Option<String>,
        arg_joiner: Option<String>,
    },
    /// Compile with a dedicated function
    Custom(CompileFn),
    /// The node kind has no rendering on this backend
    Unsupported,
}

impl VendorOverride {
    /// Rename the SQL function only
    pub fn function(function: impl Into<String>) -> Self {
        VendorOverride::Template {
            function: Some(function.into()),
            template: None,
            arg_joiner: None,
        }
    }

    /// Replace the template only
    pub fn template(template: impl Into<String>) -> Self {
        VendorOverride::Template {
            function: None,
            template: Some(template.into()),
            arg_joiner: None,
        }
    }
}

/// Dispatch table: backend, then node kind name
#[derive(Debug, Clone, Default)]
pub struct VendorOverrides {
    table: HashMap<Backend, HashMap<String, VendorOverride>>,
}

impl VendorOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides every backend ships with
    pub fn defaults() -> Self {
        let mut overrides = Self::new();

        overrides.insert(Backend::Sqlite, "Greatest", VendorOverride::function("MAX"));
        overrides.insert(Backend::Sqlite, "Least", VendorOverride::function("MIN"));
        overrides.insert(
            Backend::Sqlite,
            "Concat",
            VendorOverride::Template {
                function: None,
                template: Some("%(expressions)s".to_string()),
                arg_joiner: Some(" || ".to_string()),
            },
        );
        overrides.insert(
            Backend::Sqlite,
            "CombinedExpression",
            VendorOverride::Custom(power_as_function),
        );
        overrides.insert(Backend::Sqlite, "StdDev", VendorOverride::Unsupported);
        overrides.insert(Backend::Sqlite, "Variance", VendorOverride::Unsupported);

        overrides.insert(Backend::Mysql, "Length", VendorOverride::function("CHAR_LENGTH"));
        overrides.insert(
            Backend::Mysql,
            "CombinedExpression",
            VendorOverride::Custom(power_as_function),
        );
        overrides.insert(Backend::Mysql, "OrderBy", VendorOverride::Custom(emulated_nulls_order));

        overrides.insert(
            Backend::Postgres,
            "Now",
            VendorOverride::template("STATEMENT_TIMESTAMP()"),
        );

        overrides
    }

    pub fn insert(&mut self, backend: Backend, kind: impl Into<String>, value: VendorOverride) {
        self.table
            .entry(backend)
            .or_default()
            .insert(kind.into(), value);
    }

    pub fn get(&self, backend: Backend, kind: &str) -> Option<&VendorOverride> {
        self.table.get(&backend).and_then(|kinds| kinds.get(kind))
    }
}

/// `POWER(a, b)` for backends without a `^` operator
fn power_as_function(compiler: &SqlCompiler, expr: &Expression) -> ExpressionResult<SqlFragment> {
    match expr {
        Expression::Combined(c) if c.op == ArithmeticOperator::Pow => {
            c.output_field()?;
            let lhs = compiler.compile(&c.lhs)?;
            let rhs = compiler.compile(&c.rhs)?;
            let mut params = lhs.params;
            params.extend(rhs.params);
            Ok(SqlFragment::new(
                format!("POWER({}, {})", lhs.sql, rhs.sql),
                params,
            ))
        }
        other => compiler.compile_generic(other),
    }
}

/// MySQL has no `NULLS FIRST/LAST`; sort on a null test first
fn emulated_nulls_order(
    compiler: &SqlCompiler,
    expr: &Expression,
) -> ExpressionResult<SqlFragment> {
    let Expression::Ordering(ordering) = expr else {
        return compiler.compile_generic(expr);
    };
    let inner = compiler.compile(&ordering.expr)?;
    let direction = ordering.direction.as_str();

    let null_test = match ordering.nulls {
        NullsOrder::Default => {
            return Ok(SqlFragment::new(
                format!("{} {}", inner.sql, direction),
                inner.params,
            ))
        }
        NullsOrder::Last => "IS NULL",
        NullsOrder::First => "IS NOT NULL",
    };

    let mut params = inner.params.clone();
    params.extend(inner.params);
    Ok(SqlFragment::new(
        format!("{} {}, {} {}", inner.sql, null_test, inner.sql, direction),
        params,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let overrides = VendorOverrides::defaults();
        assert!(matches!(
            overrides.get(Backend::Sqlite, "Greatest"),
            Some(VendorOverride::Template { function: Some(f), .. }) if f == "MAX"
        ));
        assert!(matches!(
            overrides.get(Backend::Sqlite, "StdDev"),
            Some(VendorOverride::Unsupported)
        ));
        assert!(overrides.get(Backend::Postgres, "Greatest").is_none());
        assert!(overrides.get(Backend::Mysql, "Lower").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut overrides = VendorOverrides::new();
        overrides.insert(Backend::Postgres, "Lower", VendorOverride::Unsupported);
        overrides.insert(Backend::Postgres, "Lower", VendorOverride::function("lower"));
        assert!(matches!(
            overrides.get(Backend::Postgres, "Lower"),
            Some(VendorOverride::Template { .. })
        ));
    }
}
