pub mod arithmetic;
pub mod builtin_transforms;
pub mod evaluation;
pub mod logical;
pub mod utils;

use crate::ast::Expr;
use crate::error::Error;
use crate::registry::Registry;
use crate::types::{Context, Value};

// Re-export the main public pieces
pub use evaluation::Evaluator;
pub use utils::{index_array, member};

/// Evaluate `expr` with the given depth limit.
pub fn eval(expr: &Expr, context: &Context, registry: &Registry, max_depth: usize) -> Result<Value, Error> {
    Evaluator::new(registry, context, max_depth).eval(expr)
}
