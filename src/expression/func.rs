//! Generic SQL function calls rendered from a text template.
//!
//! A [`Func`] carries its SQL text as immutable configuration: a `template`
//! such as `%(function)s(%(expressions)s)`, the `function` name, an
//! `arg_joiner` and an ordered map of `extra` substitutions. Per-backend
//! variations are not stored on the node; the compiler swaps template,
//! function or joiner through its vendor override table keyed by [`Func::name`].

use crate::expression::{Expression, ExpressionError, ExpressionResult};
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TEMPLATE: &str = "%(function)s(%(expressions)s)";
pub const DEFAULT_ARG_JOINER: &str = ", ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Func {
    /// Node kind used for vendor dispatch, e.g. `Lower`
    pub name: String,
    pub function: Option<String>,
    pub template: String,
    pub arg_joiner: String,
    pub extra: BTreeMap<String, String>,
    /// Fixed argument count; `None` means the count given at construction
    pub arity: Option<usize>,
    pub output_field: Option<DataType>,
    pub args: Vec<Expression>,
}

impl Func {
    pub fn new(function: impl Into<String>, args: Vec<Expression>) -> Self {
        let function = function.into();
        Self {
            name: function.clone(),
            function: Some(function),
            template: DEFAULT_TEMPLATE.to_string(),
            arg_joiner: DEFAULT_ARG_JOINER.to_string(),
            extra: BTreeMap::new(),
            arity: None,
            output_field: None,
            args,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn without_function(mut self) -> Self {
        self.function = None;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_arg_joiner(mut self, arg_joiner: impl Into<String>) -> Self {
        self.arg_joiner = arg_joiner.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_output_field(mut self, output_field: DataType) -> Self {
        self.output_field = Some(output_field);
        self
    }

    /// Fix the argument count, rejecting a node built with a different one
    pub fn with_arity(mut self, arity: usize) -> ExpressionResult<Self> {
        if self.args.len() != arity {
            return Err(ExpressionError::construction(format!(
                "'{}' takes exactly {} argument{} ({} given)",
                self.name,
                arity,
                if arity == 1 { "" } else { "s" },
                self.args.len()
            )));
        }
        self.arity = Some(arity);
        Ok(self)
    }

    pub fn expected_arity(&self) -> usize {
        self.arity.unwrap_or(self.args.len())
    }

    /// Declared type, else the single type shared by all typed arguments
    pub fn output_field(&self) -> ExpressionResult<Option<DataType>> {
        if let Some(declared) = self.output_field {
            return Ok(Some(declared));
        }
        let mut resolved: Option<DataType> = None;
        for arg in &self.args {
            let Some(t) = arg.output_field()? else {
                continue;
            };
            match resolved {
                None => resolved = Some(t),
                Some(existing) if existing == t => {}
                Some(existing) => {
                    return Err(ExpressionError::AmbiguousOutputType {
                        reason: format!("Expression contains mixed types: {}, {}", existing, t),
                    })
                }
            }
        }
        Ok(resolved)
    }
}

/// Substitute `%(key)s` placeholders in `template` from `context`.
///
/// `%%` renders a single `%`; any other `%` is copied through unchanged.
pub fn render_template(template: &str, context: &BTreeMap<&str, &str>) -> ExpressionResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("%%") {
            out.push('%');
            rest = &tail[2..];
        } else if let Some(body) = tail.strip_prefix("%(") {
            let Some(end) = body.find(")s") else {
                return Err(ExpressionError::Template {
                    template: template.to_string(),
                    key: body.to_string(),
                });
            };
            let key = &body[..end];
            let value = context.get(key).ok_or_else(|| ExpressionError::Template {
                template: template.to_string(),
                key: key.to_string(),
            })?;
            out.push_str(value);
            rest = &body[end + 2..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn at_least(name: &str, min: usize, args: &[Expression]) -> ExpressionResult<()> {
    if args.len() < min {
        return Err(ExpressionError::construction(format!(
            "{} must take at least {} expressions",
            name, min
        )));
    }
    Ok(())
}

fn unary(name: &str, function: &str, arg: Expression) -> Func {
    Func {
        arity: Some(1),
        ..Func::new(function, vec![arg]).with_name(name)
    }
}

pub fn lower(arg: impl Into<Expression>) -> Expression {
    Expression::Func(unary("Lower", "LOWER", arg.into()).with_output_field(DataType::Text))
}

pub fn upper(arg: impl Into<Expression>) -> Expression {
    Expression::Func(unary("Upper", "UPPER", arg.into()).with_output_field(DataType::Text))
}

pub fn length(arg: impl Into<Expression>) -> Expression {
    Expression::Func(unary("Length", "LENGTH", arg.into()).with_output_field(DataType::Integer))
}

pub fn abs(arg: impl Into<Expression>) -> Expression {
    Expression::Func(unary("Abs", "ABS", arg.into()))
}

/// `CAST(expr AS <db type>)`; the type name comes from the backend
pub fn cast(arg: impl Into<Expression>, output_field: DataType) -> Expression {
    Expression::Func(
        unary("Cast", "CAST", arg.into())
            .with_template("%(function)s(%(expressions)s AS %(db_type)s)")
            .with_output_field(output_field),
    )
}

pub fn coalesce(args: Vec<Expression>) -> ExpressionResult<Expression> {
    at_least("Coalesce", 2, &args)?;
    Ok(Expression::Func(
        Func::new("COALESCE", args).with_name("Coalesce"),
    ))
}

pub fn concat(args: Vec<Expression>) -> ExpressionResult<Expression> {
    at_least("Concat", 2, &args)?;
    Ok(Expression::Func(
        Func::new("CONCAT", args)
            .with_name("Concat")
            .with_output_field(DataType::Text),
    ))
}

pub fn greatest(args: Vec<Expression>) -> ExpressionResult<Expression> {
    at_least("Greatest", 2, &args)?;
    Ok(Expression::Func(
        Func::new("GREATEST", args).with_name("Greatest"),
    ))
}

pub fn least(args: Vec<Expression>) -> ExpressionResult<Expression> {
    at_least("Least", 2, &args)?;
    Ok(Expression::Func(Func::new("LEAST", args).with_name("Least")))
}

pub fn now() -> Expression {
    Expression::Func(Func {
        arity: Some(0),
        ..Func::new("CURRENT_TIMESTAMP", Vec::new())
            .with_name("Now")
            .with_template("CURRENT_TIMESTAMP")
            .with_output_field(DataType::DateTime)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Col, FieldRef, Literal};

    fn ctx<'a>(pairs: &[(&'a str, &'a str)]) -> BTreeMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_render_template() {
        let rendered = render_template(
            DEFAULT_TEMPLATE,
            &ctx(&[("function", "LOWER"), ("expressions", "\"t\".\"name\"")]),
        )
        .unwrap();
        assert_eq!(rendered, "LOWER(\"t\".\"name\")");

        let rendered = render_template(
            "%(function)s(%(distinct)s%(expressions)s)",
            &ctx(&[("function", "COUNT"), ("distinct", ""), ("expressions", "*")]),
        )
        .unwrap();
        assert_eq!(rendered, "COUNT(*)");
    }

    #[test]
    fn test_render_template_escapes() {
        let rendered = render_template("100%% of %(x)s % y", &ctx(&[("x", "a")])).unwrap();
        assert_eq!(rendered, "100% of a % y");
    }

    #[test]
    fn test_render_template_unknown_key() {
        let err = render_template("%(function)s(%(missing)s)", &ctx(&[("function", "F")]))
            .unwrap_err();
        assert_eq!(
            err,
            ExpressionError::Template {
                template: "%(function)s(%(missing)s)".to_string(),
                key: "missing".to_string(),
            }
        );
        assert!(render_template("%(oops", &ctx(&[])).is_err());
    }

    #[test]
    fn test_constructors_coerce_arguments() {
        let Expression::Func(f) = lower("name") else {
            panic!("expected Func");
        };
        assert_eq!(f.name, "Lower");
        assert_eq!(f.function.as_deref(), Some("LOWER"));
        assert_eq!(f.args, vec![Expression::Field(FieldRef::new("name"))]);
        assert_eq!(f.expected_arity(), 1);

        let Expression::Func(f) = abs(-3) else {
            panic!("expected Func");
        };
        assert_eq!(f.args, vec![Expression::Literal(Literal::int(-3))]);
    }

    #[test]
    fn test_minimum_arguments() {
        let err = coalesce(vec![Expression::from("a")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Coalesce must take at least 2 expressions"
        );
        assert!(greatest(vec![]).is_err());
        assert!(concat(vec!["first".into(), "last".into()]).is_ok());
    }

    #[test]
    fn test_with_arity() {
        let func = Func::new("ROUND", vec!["price".into()]);
        assert!(func.clone().with_arity(2).is_err());
        assert_eq!(func.with_arity(1).unwrap().expected_arity(), 1);
    }

    #[test]
    fn test_output_field_inference() {
        let typed = |t| Expression::Col(Col::new("t", "c", Some(t)));

        let f = Func::new("COALESCE", vec![typed(DataType::Integer), Literal::int(0).into()]);
        assert_eq!(f.output_field(), Ok(Some(DataType::Integer)));

        let f = Func::new("COALESCE", vec![typed(DataType::Integer), Literal::null().into()]);
        assert_eq!(f.output_field(), Ok(Some(DataType::Integer)));

        let f = Func::new("COALESCE", vec![typed(DataType::Integer), typed(DataType::Text)]);
        assert!(matches!(
            f.output_field(),
            Err(ExpressionError::AmbiguousOutputType { .. })
        ));

        let f = f.with_output_field(DataType::Text);
        assert_eq!(f.output_field(), Ok(Some(DataType::Text)));
    }
}
