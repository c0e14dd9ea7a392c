use crate::ast::{Expr, UnaryOp};
use crate::error::Error;
use crate::registry::{OperatorKind, Registry};
use crate::runtime::utils::{member, property_ref};
use crate::types::{Context, Value};

/// Walks an AST against a context and a registry.
///
/// The evaluator holds no state besides the recursion depth, so one cached
/// AST can be evaluated by many evaluators at once.
pub struct Evaluator<'a> {
    registry: &'a Registry,
    context: &'a Context,
    max_depth: usize,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a Registry, context: &'a Context, max_depth: usize) -> Self {
        Self { registry, context, max_depth, depth: 0 }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, Error> {
        if self.depth >= self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.eval_node(expr);
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<Value, Error> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Identifier(name) => self
                .context
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UndefinedIdentifier(name.clone())),
            Expr::Member { target, property } => {
                if let Some(v) = self.borrow_path(expr) {
                    return Ok(v.clone());
                }
                let target = self.eval(target)?;
                let property = self.eval(property)?;
                member(target, &property)
            }
            Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Boolean(!self.eval(operand)?.is_truthy())),
            Expr::Unary(UnaryOp::Minus, operand) => match self.eval(operand)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(Error::type_mismatch(format!("Cannot negate {}", other.type_name()))),
            },
            Expr::Binary { op, left, right } => {
                let registry = self.registry;
                let operator = registry.operator(op).ok_or_else(|| Error::UnknownOperator(op.clone()))?;
                match operator.kind() {
                    OperatorKind::And => {
                        let l = self.eval(left)?;
                        if l.is_truthy() {
                            self.eval(right)
                        } else {
                            Ok(l)
                        }
                    }
                    OperatorKind::Or => {
                        let l = self.eval(left)?;
                        if l.is_truthy() {
                            Ok(l)
                        } else {
                            self.eval(right)
                        }
                    }
                    OperatorKind::Function(f) => {
                        let l = self.eval(left)?;
                        let r = self.eval(right)?;
                        f(&l, &r)
                    }
                }
            }
            Expr::Conditional { test, consequent, alternate } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Transform(t) => {
                let registry = self.registry;
                let def = registry
                    .transform(&t.name)
                    .ok_or_else(|| Error::UnknownTransform(t.name.clone()))?;
                let subject = self.eval(&t.subject)?;
                let args = t.args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                log::trace!("applying transform '{}' to {}", t.name, subject);
                def.call(&subject, &args)
            }
            Expr::Array(items) => items.iter().map(|e| self.eval(e)).collect::<Result<Vec<_>, _>>().map(Value::Array),
            Expr::Object(entries) => {
                let mut map = crate::types::Map::new();
                for (key, value) in entries {
                    let v = self.eval(value)?;
                    map.insert(key.clone(), v);
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Resolves identifier/member chains with literal properties straight
    /// out of the context, without cloning the intermediate containers.
    fn borrow_path(&self, expr: &Expr) -> Option<&'a Value> {
        match expr {
            Expr::Identifier(name) => self.context.get(name),
            Expr::Member { target, property } => match property.as_ref() {
                Expr::Literal(p) => property_ref(self.borrow_path(target)?, p),
                _ => None,
            },
            _ => None,
        }
    }
}
