//! Compilation of resolved expression trees into SQL text plus bound
//! parameters.
//!
//! [`SqlCompiler::compile`] looks up a [`VendorOverride`] for the node kind on
//! the compiler's backend and falls back to [`SqlCompiler::compile_generic`].
//! Literals always compile to a `?` marker with the value pushed onto the
//! parameter list; [`SqlFragment::numbered`] rewrites the markers for
//! backends with positional placeholders.

pub mod backend;
pub mod vendor;

pub use backend::Backend;
pub use vendor::{CompileFn, VendorOverride, VendorOverrides};

use crate::expression::func::render_template;
use crate::expression::{
    Expression, ExpressionError, ExpressionResult, Func, LogicalOperator, NullsOrder,
};
use crate::types::Value;
use log::trace;
use std::collections::BTreeMap;

/// Generated SQL text and the parameters bound to its `?` markers, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Fragment without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Rewrite `?` markers as `$1, $2, ...` on PostgreSQL.
    ///
    /// Markers inside quoted identifiers or string constants are left alone.
    pub fn numbered(&self, backend: Backend) -> SqlFragment {
        if backend != Backend::Postgres {
            return self.clone();
        }

        let mut sql = String::with_capacity(self.sql.len() + self.params.len());
        let mut quote: Option<char> = None;
        let mut index = 0;

        for ch in self.sql.chars() {
            match (quote, ch) {
                (None, '"' | '\'') => {
                    quote = Some(ch);
                    sql.push(ch);
                }
                (Some(open), c) if c == open => {
                    quote = None;
                    sql.push(ch);
                }
                (None, '?') => {
                    index += 1;
                    sql.push_str(&format!("${}", index));
                }
                _ => sql.push(ch),
            }
        }

        SqlFragment::new(sql, self.params.clone())
    }
}

/// Compiles expressions for one backend
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    backend: Backend,
    overrides: VendorOverrides,
}

impl SqlCompiler {
    /// Compiler with the default vendor overrides
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            overrides: VendorOverrides::defaults(),
        }
    }

    /// Compiler with an explicit override table
    pub fn with_overrides(backend: Backend, overrides: VendorOverrides) -> Self {
        Self { backend, overrides }
    }

    /// Register an override for `kind` on this compiler's backend
    pub fn with_override(mut self, kind: impl Into<String>, value: VendorOverride) -> Self {
        self.overrides.insert(self.backend, kind, value);
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn quote_name(&self, name: &str) -> String {
        self.backend.quote_name(name)
    }

    /// Compile a resolved expression, honouring vendor overrides
    pub fn compile(&self, expr: &Expression) -> ExpressionResult<SqlFragment> {
        let kind = expr.kind_name();
        match self.overrides.get(self.backend, kind) {
            None => self.compile_generic(expr),
            Some(VendorOverride::Unsupported) => Err(ExpressionError::NotSupported {
                feature: kind.to_string(),
                backend: self.backend.vendor().to_string(),
            }),
            Some(VendorOverride::Custom(compile)) => {
                trace!("{} override for {}", self.backend, kind);
                compile(self, expr)
            }
            Some(VendorOverride::Template {
                function,
                template,
                arg_joiner,
            }) => {
                let func = match expr {
                    Expression::Func(func) => func,
                    Expression::Aggregate(aggregate) => &aggregate.func,
                    other => return self.compile_generic(other),
                };
                trace!("{} template override for {}", self.backend, kind);
                self.compile_func(
                    func,
                    function.as_deref().or(func.function.as_deref()),
                    template.as_deref().unwrap_or(&func.template),
                    arg_joiner.as_deref().unwrap_or(&func.arg_joiner),
                )
            }
        }
    }

    /// Backend-agnostic rendering of a node
    pub fn compile_generic(&self, expr: &Expression) -> ExpressionResult<SqlFragment> {
        match expr {
            Expression::Field(field) => Err(ExpressionError::Unresolved {
                name: field.name.clone(),
            }),
            Expression::Col(col) => Ok(SqlFragment::raw(format!(
                "{}.{}",
                self.quote_name(&col.alias),
                self.quote_name(&col.column)
            ))),
            Expression::Ref(r) => self.compile(&r.source),
            Expression::Literal(lit) => Ok(SqlFragment::new("?", vec![lit.value.clone()])),
            Expression::Star => Ok(SqlFragment::raw("*")),
            Expression::Combined(c) => {
                c.output_field()?;
                let lhs = self.compile_operand(&c.lhs)?;
                let rhs = self.compile_operand(&c.rhs)?;
                Ok(join_binary(lhs, c.op.as_str(), rhs))
            }
            Expression::Func(func) => self.compile_func(
                func,
                func.function.as_deref(),
                &func.template,
                &func.arg_joiner,
            ),
            Expression::Aggregate(aggregate) => {
                let func = &aggregate.func;
                self.compile_func(func, func.function.as_deref(), &func.template, &func.arg_joiner)
            }
            Expression::Ordering(ordering) => {
                let mut fragment = self.compile(&ordering.expr)?;
                fragment.sql.push(' ');
                fragment.sql.push_str(ordering.direction.as_str());
                match ordering.nulls {
                    NullsOrder::Default => {}
                    NullsOrder::First => fragment.sql.push_str(" NULLS FIRST"),
                    NullsOrder::Last => fragment.sql.push_str(" NULLS LAST"),
                }
                Ok(fragment)
            }
            Expression::Compare(c) => {
                let lhs = self.compile(&c.lhs)?;
                let rhs = self.compile(&c.rhs)?;
                Ok(join_binary(lhs, c.op.as_str(), rhs))
            }
            Expression::Where(node) => {
                if node.children.is_empty() {
                    let empty = match node.connector {
                        LogicalOperator::And => "1 = 1",
                        LogicalOperator::Or => "1 = 0",
                    };
                    return Ok(if node.negated {
                        SqlFragment::raw(format!("NOT ({})", empty))
                    } else {
                        SqlFragment::raw(empty)
                    });
                }

                let separator = format!(" {} ", node.connector.as_str());
                let mut fragment = self.compile_list(&node.children, &separator)?;
                if node.negated {
                    fragment.sql = format!("NOT ({})", fragment.sql);
                } else if node.children.len() > 1 {
                    fragment.sql = format!("({})", fragment.sql);
                }
                Ok(fragment)
            }
            Expression::Wrapper(wrapper) => self.compile(&wrapper.expr),
        }
    }

    /// Render a function node with the given template pieces.
    ///
    /// Arguments compile in order and are joined with `arg_joiner`; their
    /// parameters are concatenated in the same order.
    pub fn compile_func(
        &self,
        func: &Func,
        function: Option<&str>,
        template: &str,
        arg_joiner: &str,
    ) -> ExpressionResult<SqlFragment> {
        let args = self.compile_list(&func.args, arg_joiner)?;

        let mut context: BTreeMap<&str, &str> = func
            .extra
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        if let Some(function) = function {
            context.insert("function", function);
        }
        context.insert("expressions", &args.sql);
        if let Some(output_field) = func.output_field {
            context.insert("db_type", self.backend.cast_type(output_field));
        }

        let sql = render_template(template, &context)?;
        Ok(SqlFragment::new(sql, args.params))
    }

    /// Compile each expression and join the texts with `separator`
    pub fn compile_list(
        &self,
        exprs: &[Expression],
        separator: &str,
    ) -> ExpressionResult<SqlFragment> {
        let mut parts = Vec::with_capacity(exprs.len());
        let mut params = Vec::new();
        for expr in exprs {
            let fragment = self.compile(expr)?;
            parts.push(fragment.sql);
            params.extend(fragment.params);
        }
        Ok(SqlFragment::new(parts.join(separator), params))
    }

    /// Arithmetic operand, parenthesized when it is itself arithmetic.
    ///
    /// References and wrappers compile inline, so the check looks through
    /// them to the node that is actually rendered.
    fn compile_operand(&self, expr: &Expression) -> ExpressionResult<SqlFragment> {
        let mut fragment = self.compile(expr)?;
        let mut rendered = expr;
        loop {
            rendered = match rendered {
                Expression::Ref(r) => &*r.source,
                Expression::Wrapper(w) => &*w.expr,
                _ => break,
            };
        }
        if matches!(rendered, Expression::Combined(_)) {
            fragment.sql = format!("({})", fragment.sql);
        }
        Ok(fragment)
    }
}

fn join_binary(lhs: SqlFragment, op: &str, rhs: SqlFragment) -> SqlFragment {
    let mut params = lhs.params;
    params.extend(rhs.params);
    SqlFragment::new(format!("{} {} {}", lhs.sql, op, rhs.sql), params)
}
