use std::sync::Arc;

pub mod analyzer;
pub mod ast;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod form;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod runtime;
pub mod types;
pub mod workflow;

pub use analyzer::{Analyzer, ArgumentExtractor, SubjectExtractor, TransformCall, ValidatingAnalyzer};
pub use ast::Expr;
pub use config::Config;
pub use engine::Jexl;
pub use error::Error;
pub use form::{AnswerLookup, FormJexl};
pub use registry::{Registry, SubjectRule};
pub use types::{Context, Value};
pub use workflow::{extract_groups, extract_tasks, FlowJexl, GroupJexl, WorkflowInfo};

// Shared engine with the standard registry
lazy_static::lazy_static! {
    static ref STANDARD: Jexl = Jexl::standard();
}

/// Parse an expression with the standard operator table.
pub fn parse(input: &str) -> Result<Arc<Expr>, Error> {
    STANDARD.parse(input)
}

/// Evaluate an expression that needs no context.
pub fn evaluate(input: &str) -> Result<Value, Error> {
    STANDARD.evaluate(input, &Context::new())
}

/// Evaluate with the given variables, standard transforms only.
pub fn evaluate_with(input: &str, context: &Context) -> Result<Value, Error> {
    STANDARD.evaluate(input, context)
}

/// Evaluate with variables provided as a JSON object string, e.g.
/// `{"age": 36, "tags": ["a"]}`.
pub fn evaluate_with_json(input: &str, json_vars: &str) -> Result<Value, Error> {
    let json: serde_json::Value =
        serde_json::from_str(json_vars).map_err(|e| Error::evaluation(format!("Invalid JSON: {}", e)))?;
    let context = engine::json_context(&json)?;
    STANDARD.evaluate(input, &context)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approxv(v: Value, b: f64) -> bool {
        matches!(v, Value::Number(a) if (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_basic_arithmetic() {
        assert!(approxv(evaluate("2 + 3 * 4").unwrap(), 14.0));
        assert!(approxv(evaluate("(2 + 3) * 4").unwrap(), 20.0));
        assert!(approxv(evaluate("7 // 2 + 7 % 2").unwrap(), 4.0));
        assert!(approxv(evaluate("-3 + 1").unwrap(), -2.0));
        assert!(approxv(evaluate("[1.25, 2]|sum|round(1)").unwrap(), 3.3));
    }

    #[test]
    fn test_json_variables() {
        let v = evaluate_with_json("tags|count > 1 && 'a' in tags", r#"{"tags": ["a", "b"]}"#).unwrap();
        assert_eq!(v, Value::Boolean(true));
        assert!(evaluate_with_json("1", "not json").is_err());
    }
}
