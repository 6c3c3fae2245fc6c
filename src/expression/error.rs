//! Error types for building, resolving and compiling expressions.

use thiserror::Error;

/// Errors that can occur while building, resolving or compiling an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Wrong number of source expressions for a node
    #[error("{node} expects {expected} source expressions, got {actual}")]
    Arity {
        node: String,
        expected: usize,
        actual: usize,
    },

    /// Field path could not be resolved against the query
    #[error("Cannot resolve keyword '{name}' into field. Choices are: {}", choices.join(", "))]
    FieldResolution { name: String, choices: Vec<String> },

    /// A relation was traversed where joins are not allowed
    #[error("Joined field references are not permitted in this query: '{path}'")]
    JoinNotAllowed { path: String },

    /// Output type could not be inferred and none was declared
    #[error("{reason}. You must set output_field.")]
    AmbiguousOutputType { reason: String },

    /// Node constructed with invalid arguments
    #[error("{message}")]
    Construction { message: String },

    /// Aggregate over an expression that already aggregates
    #[error("Cannot compute {function}('{name}'): '{name}' is an aggregate")]
    NestedAggregate { function: String, name: String },

    /// Terminal aggregate query given a non-aggregate expression
    #[error("'{expression}' is not an aggregate expression")]
    NotAnAggregate { expression: String },

    /// Template references a key with no substitution
    #[error("Template '{template}' references unknown key '{key}'")]
    Template { template: String, key: String },

    /// Node has no rendering on the selected backend
    #[error("{feature} is not supported on {backend}")]
    NotSupported { feature: String, backend: String },

    /// Field reference compiled before being resolved against a query
    #[error("Field reference '{name}' must be resolved before compiling")]
    Unresolved { name: String },

    /// Query built on a table missing from the catalog
    #[error("Unknown table: {name}")]
    UnknownTable { name: String },
}

impl ExpressionError {
    pub fn construction(message: impl Into<String>) -> Self {
        ExpressionError::Construction {
            message: message.into(),
        }
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExpressionError::Arity {
            node: "CombinedExpression".to_string(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "CombinedExpression expects 2 source expressions, got 3"
        );

        let err = ExpressionError::FieldResolution {
            name: "nme".to_string(),
            choices: vec!["id".to_string(), "name".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve keyword 'nme' into field. Choices are: id, name"
        );

        let err = ExpressionError::NestedAggregate {
            function: "Sum".to_string(),
            name: "num_employees".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot compute Sum('num_employees'): 'num_employees' is an aggregate"
        );

        let err = ExpressionError::AmbiguousOutputType {
            reason: "Cannot infer type of '+' expression involving these types: float, decimal"
                .to_string(),
        };
        assert!(err.to_string().ends_with("You must set output_field."));

        let err = ExpressionError::NotSupported {
            feature: "StdDev".to_string(),
            backend: "sqlite".to_string(),
        };
        assert_eq!(err.to_string(), "StdDev is not supported on sqlite");
    }
}
