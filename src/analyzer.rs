use crate::ast::{Expr, Transform};
use crate::error::Error;
use crate::registry::Registry;
use crate::types::Value;
use std::collections::BTreeSet;

/// Static pass over an AST. Nothing is evaluated.
///
/// [`walk`] calls the hooks in pre-order, left to right; every hook has an
/// empty default so an analyzer only implements the nodes it cares about.
pub trait Analyzer {
    type Output;

    /// Called for each transform before its subject and arguments are walked.
    fn visit_transform(&mut self, _transform: &Transform, _registry: &Registry) {}

    fn visit_binary(&mut self, _op: &str, _registry: &Registry) {}

    fn visit_identifier(&mut self, _name: &str) {}

    fn finish(self) -> Self::Output;
}

/// Drives `analyzer` over `expr`. Fails only when nesting exceeds `max_depth`.
pub fn walk<A: Analyzer>(
    expr: &Expr,
    analyzer: &mut A,
    registry: &Registry,
    max_depth: usize,
) -> Result<(), Error> {
    walk_at(expr, analyzer, registry, max_depth, 0)
}

fn walk_at<A: Analyzer>(
    expr: &Expr,
    analyzer: &mut A,
    registry: &Registry,
    max_depth: usize,
    depth: usize,
) -> Result<(), Error> {
    if depth >= max_depth {
        return Err(Error::DepthExceeded(max_depth));
    }
    let next = depth + 1;
    match expr {
        Expr::Literal(_) => {}
        Expr::Identifier(name) => analyzer.visit_identifier(name),
        Expr::Member { target, property } => {
            walk_at(target, analyzer, registry, max_depth, next)?;
            walk_at(property, analyzer, registry, max_depth, next)?;
        }
        Expr::Unary(_, operand) => walk_at(operand, analyzer, registry, max_depth, next)?,
        Expr::Binary { op, left, right } => {
            analyzer.visit_binary(op, registry);
            walk_at(left, analyzer, registry, max_depth, next)?;
            walk_at(right, analyzer, registry, max_depth, next)?;
        }
        Expr::Conditional { test, consequent, alternate } => {
            walk_at(test, analyzer, registry, max_depth, next)?;
            walk_at(consequent, analyzer, registry, max_depth, next)?;
            walk_at(alternate, analyzer, registry, max_depth, next)?;
        }
        Expr::Transform(t) => {
            analyzer.visit_transform(t, registry);
            walk_at(&t.subject, analyzer, registry, max_depth, next)?;
            for arg in &t.args {
                walk_at(arg, analyzer, registry, max_depth, next)?;
            }
        }
        Expr::Array(items) => {
            for item in items {
                walk_at(item, analyzer, registry, max_depth, next)?;
            }
        }
        Expr::Object(entries) => {
            for (_, value) in entries {
                walk_at(value, analyzer, registry, max_depth, next)?;
            }
        }
    }
    Ok(())
}

/// Collects one message per unknown transform, disallowed operator and
/// subject-rule violation.
#[derive(Debug, Default, Clone)]
pub struct ValidatingAnalyzer {
    allowed_transforms: Option<BTreeSet<String>>,
    allowed_operators: Option<BTreeSet<String>>,
    findings: Vec<String>,
}

impl ValidatingAnalyzer {
    /// Accepts whatever the registry knows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict transforms further than the registry does.
    pub fn allow_transforms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_transforms = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn allow_operators<I, S>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_operators = Some(ops.into_iter().map(Into::into).collect());
        self
    }
}

impl Analyzer for ValidatingAnalyzer {
    type Output = Vec<String>;

    fn visit_transform(&mut self, transform: &Transform, registry: &Registry) {
        let allowed = self
            .allowed_transforms
            .as_ref()
            .map_or(true, |names| names.contains(&transform.name));
        let def = match registry.transform(&transform.name) {
            Some(def) if allowed => def,
            _ => {
                self.findings.push(format!("Transform '{}' is not defined", transform.name));
                return;
            }
        };
        if let Some(finding) = def.rule().and_then(|rule| rule.check(transform)) {
            self.findings.push(finding);
        }
    }

    fn visit_binary(&mut self, op: &str, registry: &Registry) {
        let allowed = match &self.allowed_operators {
            Some(ops) => ops.contains(op),
            None => registry.has_operator(op),
        };
        if !allowed {
            self.findings.push(format!("Binary operator '{}' is not allowed", op));
        }
    }

    fn finish(self) -> Vec<String> {
        self.findings
    }
}

fn matches_filter(filter: &BTreeSet<String>, name: &str) -> bool {
    filter.is_empty() || filter.contains(name)
}

/// Yields the literal subject of every transform whose name passes the
/// filter. An empty filter passes every transform.
#[derive(Debug, Default, Clone)]
pub struct SubjectExtractor {
    filter: BTreeSet<String>,
    subjects: Vec<Value>,
}

impl SubjectExtractor {
    pub fn new<I, S>(transforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { filter: transforms.into_iter().map(Into::into).collect(), subjects: Vec::new() }
    }
}

impl Analyzer for SubjectExtractor {
    type Output = Vec<Value>;

    fn visit_transform(&mut self, transform: &Transform, _registry: &Registry) {
        if !matches_filter(&self.filter, &transform.name) {
            return;
        }
        if let Some(subject) = transform.subject.literal_value() {
            self.subjects.push(subject);
        }
    }

    fn finish(self) -> Vec<Value> {
        self.subjects
    }
}

/// Literal subject with the literal arguments passed alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformCall {
    pub name: String,
    pub subject: Value,
    pub args: Vec<Value>,
}

/// Like [`SubjectExtractor`] but keeps the arguments too, for calls whose
/// subject and arguments are all literals. Finds the defaults handed to
/// `answer`, for instance.
#[derive(Debug, Default, Clone)]
pub struct ArgumentExtractor {
    filter: BTreeSet<String>,
    calls: Vec<TransformCall>,
}

impl ArgumentExtractor {
    pub fn new<I, S>(transforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { filter: transforms.into_iter().map(Into::into).collect(), calls: Vec::new() }
    }
}

impl Analyzer for ArgumentExtractor {
    type Output = Vec<TransformCall>;

    fn visit_transform(&mut self, transform: &Transform, _registry: &Registry) {
        if !matches_filter(&self.filter, &transform.name) {
            return;
        }
        let Some(subject) = transform.subject.literal_value() else {
            return;
        };
        let Some(args) = transform.args.iter().map(Expr::literal_value).collect::<Option<Vec<_>>>() else {
            return;
        };
        self.calls.push(TransformCall { name: transform.name.clone(), subject, args });
    }

    fn finish(self) -> Vec<TransformCall> {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_with;
    use crate::registry::SubjectRule;

    fn registry() -> Registry {
        let mut registry = Registry::standard();
        registry
            .register_validated_transform("answer", SubjectRule::StringLiteral, |v, _| Ok(v.clone()))
            .unwrap();
        registry
            .register_validated_transform("tasks", SubjectRule::StringArrayLiteral, |v, _| Ok(v.clone()))
            .unwrap();
        registry
    }

    fn run<A: Analyzer>(src: &str, mut analyzer: A) -> A::Output {
        let registry = registry();
        let expr = parse_with(src, registry.grammar(), 64).unwrap();
        walk(&expr, &mut analyzer, &registry, 64).unwrap();
        analyzer.finish()
    }

    #[test]
    fn validation_reports_each_problem() {
        assert!(run("'q'|answer == 1", ValidatingAnalyzer::new()).is_empty());

        let findings = run("100|answer", ValidatingAnalyzer::new());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].contains("100"));

        let findings = run("['test']|answer || 1.0|answer", ValidatingAnalyzer::new());
        assert_eq!(findings.len(), 2);

        let findings = run("1|nope(2|also_nope)", ValidatingAnalyzer::new());
        assert_eq!(
            findings,
            vec!["Transform 'nope' is not defined".to_string(), "Transform 'also_nope' is not defined".to_string()]
        );
    }

    #[test]
    fn validation_respects_allow_lists() {
        let analyzer = ValidatingAnalyzer::new().allow_transforms(["tasks"]).allow_operators(["&&", "=="]);
        let findings = run("'q'|answer == 1 || ['a']|tasks", analyzer);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().any(|f| f.contains("'||'")));
        assert!(findings.iter().any(|f| f.contains("'answer'")));
    }

    #[test]
    fn subject_extraction_covers_every_branch() {
        let src = "'a'|answer > 1 ? ['x', 'y']|tasks : ('b'|answer)|debug('c'|answer)";
        let subjects = run(src, SubjectExtractor::new(["answer"]));
        assert_eq!(subjects, vec![Value::from("a"), Value::from("b"), Value::from("c")]);

        let all = run(src, SubjectExtractor::new(Vec::<String>::new()));
        assert!(all.contains(&Value::from(vec!["x", "y"])));
        // the debug transform's subject is itself a transform, not a literal
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn subjects_that_need_context_are_skipped() {
        let subjects = run("slug|answer + ('s' + 'q')|answer", SubjectExtractor::new(["answer"]));
        assert!(subjects.is_empty());
    }

    #[test]
    fn argument_extraction_needs_literal_arguments() {
        let calls = run("'a'|answer('none') + 'b'|answer(x) + 'c'|answer", ArgumentExtractor::new(["answer"]));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].subject, Value::from("a"));
        assert_eq!(calls[0].args, vec![Value::from("none")]);
        assert!(calls[1].args.is_empty());
    }

    #[test]
    fn walking_is_depth_capped() {
        let registry = registry();
        let expr = parse_with("[[[[1]]]]", registry.grammar(), 64).unwrap();
        let mut analyzer = ValidatingAnalyzer::new();
        assert_eq!(walk(&expr, &mut analyzer, &registry, 3), Err(Error::DepthExceeded(3)));
        assert!(walk(&expr, &mut analyzer, &registry, 8).is_ok());
    }
}
