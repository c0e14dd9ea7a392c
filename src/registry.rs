use crate::ast::Transform;
use crate::error::Error;
use crate::runtime::{arithmetic, builtin_transforms, logical};
use crate::types::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub type TransformFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, Error> + Send + Sync>;
pub type OperatorFn = Arc<dyn Fn(&Value, &Value) -> Result<Value, Error> + Send + Sync>;

/// Characters a symbolic binary operator may be built from.
const OPERATOR_CHARS: &str = "=!<>&|+-*/%^~@#";

/// Shape constraint a transform places on a literal subject. Checked by the
/// validating analyzer only; evaluation relies on the transform itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectRule {
    StringLiteral,
    StringArrayLiteral,
}

impl SubjectRule {
    /// Returns a finding when the transform's subject violates the rule.
    pub fn check(&self, transform: &Transform) -> Option<String> {
        let literal = transform.subject.literal_value();
        let is_string = matches!(literal, Some(Value::String(_)));
        let is_string_array = literal
            .as_ref()
            .map(|v| v.as_string_array().is_some())
            .unwrap_or(false);

        let (ok, expected) = match self {
            SubjectRule::StringLiteral => (is_string, "a string literal"),
            SubjectRule::StringArrayLiteral => (is_string_array, "an array of string literals"),
        };
        if ok {
            None
        } else {
            Some(format!(
                "Transform '{}' can only be used with {} as subject, got {}",
                transform.name, expected, transform.subject
            ))
        }
    }
}

#[derive(Clone)]
pub struct TransformDef {
    func: TransformFn,
    rule: Option<SubjectRule>,
}

impl TransformDef {
    pub fn call(&self, subject: &Value, args: &[Value]) -> Result<Value, Error> {
        (self.func)(subject, args)
    }

    pub fn rule(&self) -> Option<SubjectRule> {
        self.rule
    }
}

#[derive(Clone)]
pub enum OperatorKind {
    /// Both operands are evaluated, then handed to the function.
    Function(OperatorFn),
    /// Short-circuit `&&`: yields the left operand when it is falsy.
    And,
    /// Short-circuit `||`: yields the left operand when it is truthy.
    Or,
}

#[derive(Clone)]
pub struct BinaryOperator {
    precedence: u8,
    kind: OperatorKind,
}

impl BinaryOperator {
    pub fn precedence(&self) -> u8 {
        self.precedence
    }

    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }
}

/// Operator tokens and their precedence: everything the parser needs to know
/// about a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    precedence: BTreeMap<String, u8>,
    symbols: Vec<String>,
}

impl Grammar {
    pub fn precedence(&self, op: &str) -> Option<u8> {
        self.precedence.get(op).copied()
    }

    /// Symbolic operators, longest first so the lexer can match greedily.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Stable text identifying the operator set, used to key the AST cache.
    pub fn signature(&self) -> String {
        self.precedence
            .iter()
            .map(|(op, prec)| format!("{}{}", op, prec))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn insert(&mut self, op: &str, precedence: u8) {
        self.precedence.insert(op.to_string(), precedence);
        if !is_identifier(op) && !self.symbols.iter().any(|s| s == op) {
            self.symbols.push(op.to_string());
            self.symbols.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        }
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
}

/// Transforms and binary operators available to expressions.
///
/// A registry is filled once and then handed to a [`crate::Jexl`], which
/// keeps it behind an `Arc` and never mutates it again.
#[derive(Clone, Default)]
pub struct Registry {
    transforms: HashMap<String, TransformDef>,
    operators: HashMap<String, BinaryOperator>,
    grammar: Grammar,
}

impl Registry {
    /// No operators and no transforms.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard JEXL operator table without any transforms.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert_operator("||", 10, OperatorKind::Or);
        registry.insert_operator("&&", 10, OperatorKind::And);

        let functions: [(&str, u8, fn(&Value, &Value) -> Result<Value, Error>); 13] = [
            ("==", 20, logical::equal),
            ("!=", 20, logical::not_equal),
            ("<", 20, logical::less),
            ("<=", 20, logical::less_equal),
            (">", 20, logical::greater),
            (">=", 20, logical::greater_equal),
            ("in", 20, logical::contains),
            ("+", 30, arithmetic::add),
            ("-", 30, arithmetic::subtract),
            ("*", 40, arithmetic::multiply),
            ("/", 40, arithmetic::divide),
            ("//", 40, arithmetic::floor_divide),
            ("%", 40, arithmetic::modulo),
        ];
        for (op, precedence, f) in functions {
            registry.insert_operator(op, precedence, OperatorKind::Function(Arc::new(f)));
        }
        registry.insert_operator("^", 50, OperatorKind::Function(Arc::new(arithmetic::power)));
        registry
    }

    /// Standard operators plus the core transforms (`debug`, `min`, `max`,
    /// `sum`, `round`, `ceil`, `floor`, `count`, `stringify`).
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (name, f) in builtin_transforms::all() {
            registry.insert_transform(name, Arc::new(f), None);
        }
        registry
    }

    /// Register a transform usable as `subject|name(args)`.
    pub fn register_transform<F>(&mut self, name: &str, f: F) -> Result<(), Error>
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        validate_transform_name(name)?;
        self.insert_transform(name, Arc::new(f), None);
        Ok(())
    }

    /// Register a transform whose literal subject the validating analyzer
    /// checks against `rule`.
    pub fn register_validated_transform<F>(&mut self, name: &str, rule: SubjectRule, f: F) -> Result<(), Error>
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        validate_transform_name(name)?;
        self.insert_transform(name, Arc::new(f), Some(rule));
        Ok(())
    }

    /// Register (or replace) a binary operator. Word operators such as
    /// `intersects` are allowed alongside symbolic ones.
    pub fn register_binary_operator<F>(&mut self, op: &str, precedence: u8, f: F) -> Result<(), Error>
    where
        F: Fn(&Value, &Value) -> Result<Value, Error> + Send + Sync + 'static,
    {
        validate_operator_token(op)?;
        if precedence == 0 {
            return Err(Error::config(format!("Operator '{}' needs a precedence above 0", op)));
        }
        self.insert_operator(op, precedence, OperatorKind::Function(Arc::new(f)));
        Ok(())
    }

    pub fn transform(&self, name: &str) -> Option<&TransformDef> {
        self.transforms.get(name)
    }

    pub fn operator(&self, op: &str) -> Option<&BinaryOperator> {
        self.operators.get(op)
    }

    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    pub fn has_operator(&self, op: &str) -> bool {
        self.operators.contains_key(op)
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Registered transform names, sorted.
    pub fn transform_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transforms.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Registered operator tokens, sorted.
    pub fn operator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn insert_transform(&mut self, name: &str, func: TransformFn, rule: Option<SubjectRule>) {
        self.transforms.insert(name.to_string(), TransformDef { func, rule });
    }

    fn insert_operator(&mut self, op: &str, precedence: u8, kind: OperatorKind) {
        self.grammar.insert(op, precedence);
        self.operators.insert(op.to_string(), BinaryOperator { precedence, kind });
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("transforms", &self.transform_names())
            .field("operators", &self.operator_names())
            .finish()
    }
}

fn validate_transform_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::config("Transform name cannot be empty"));
    }
    if !is_identifier(name) {
        return Err(Error::config(format!("Transform name '{}' is not a valid identifier", name)));
    }
    Ok(())
}

fn validate_operator_token(op: &str) -> Result<(), Error> {
    if op.is_empty() {
        return Err(Error::config("Operator token cannot be empty"));
    }
    if is_identifier(op) {
        return Ok(());
    }
    // `!` and `|` alone are the unary not and the transform pipe; a longer
    // token starting with `!` would swallow a negation like `!!x`
    let shadows_not = op.starts_with('!') && op != "!=";
    if shadows_not || op == "|" || !op.chars().all(|c| OPERATOR_CHARS.contains(c)) {
        return Err(Error::config(format!("'{}' cannot be used as a binary operator", op)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn transform(name: &str, subject: Expr) -> Transform {
        Transform { name: name.into(), subject: Box::new(subject), args: vec![] }
    }

    #[test]
    fn standard_operator_table() {
        let registry = Registry::new();
        assert_eq!(registry.grammar().precedence("&&"), Some(10));
        assert_eq!(registry.grammar().precedence("in"), Some(20));
        assert_eq!(registry.grammar().precedence("^"), Some(50));
        assert_eq!(registry.grammar().symbols().first().map(String::len), Some(2));
        assert!(!registry.grammar().symbols().iter().any(|s| s == "in"));
        assert!(registry.transform_names().is_empty());
    }

    #[test]
    fn registration_validates_names() {
        let mut registry = Registry::new();
        assert!(registry.register_transform("", |v, _| Ok(v.clone())).is_err());
        assert!(registry.register_transform("with space", |v, _| Ok(v.clone())).is_err());
        assert!(registry.register_transform("mapby", |v, _| Ok(v.clone())).is_ok());

        assert!(registry.register_binary_operator("|", 10, |_, _| Ok(Value::Null)).is_err());
        assert!(registry.register_binary_operator("?", 10, |_, _| Ok(Value::Null)).is_err());
        assert!(registry.register_binary_operator("=~", 0, |_, _| Ok(Value::Null)).is_err());
        assert!(registry.register_binary_operator("!!", 20, |_, _| Ok(Value::Null)).is_err());
        assert!(registry.register_binary_operator("!~", 20, |_, _| Ok(Value::Null)).is_err());
        assert!(registry.register_binary_operator("!=", 20, logical::not_equal).is_ok());
        assert!(registry.register_binary_operator("=~", 20, |_, _| Ok(Value::Null)).is_ok());
        assert!(registry.register_binary_operator("intersects", 20, |_, _| Ok(Value::Null)).is_ok());

        assert!(registry.grammar().symbols().iter().any(|s| s == "=~"));
        assert_eq!(registry.grammar().precedence("intersects"), Some(20));
    }

    #[test]
    fn signature_tracks_operator_set() {
        let base = Registry::new();
        let mut extended = Registry::new();
        extended.register_binary_operator("intersects", 20, |_, _| Ok(Value::Null)).unwrap();
        assert_ne!(base.grammar().signature(), extended.grammar().signature());
        assert_eq!(base.grammar().signature(), Registry::standard().grammar().signature());
    }

    #[test]
    fn subject_rules() {
        let string = transform("answer", Expr::Literal("q".into()));
        let number = transform("answer", Expr::Literal(Value::Number(100.0)));
        let strings = transform("tasks", Expr::Array(vec![Expr::Literal("a".into())]));

        assert_eq!(SubjectRule::StringLiteral.check(&string), None);
        let finding = SubjectRule::StringLiteral.check(&number).unwrap();
        assert!(finding.contains("100"), "{}", finding);
        assert!(SubjectRule::StringLiteral.check(&strings).is_some());
        assert_eq!(SubjectRule::StringArrayLiteral.check(&strings), None);
        assert!(SubjectRule::StringArrayLiteral.check(&string).is_some());
    }
}
