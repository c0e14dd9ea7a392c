use crate::analyzer::{walk, Analyzer, SubjectExtractor, ValidatingAnalyzer};
use crate::ast::Expr;
use crate::cache;
use crate::config::Config;
use crate::error::Error;
use crate::parser::parse_with;
use crate::registry::Registry;
use crate::runtime;
use crate::types::{Context, Value};
use std::sync::Arc;

/// A registry and a configuration bundled together.
///
/// `Jexl` is immutable and cheap to clone; the registry sits behind an `Arc`
/// and parsed expressions go through the process-wide AST cache unless the
/// configuration turns it off.
#[derive(Debug, Clone)]
pub struct Jexl {
    registry: Arc<Registry>,
    config: Config,
}

impl Default for Jexl {
    fn default() -> Self {
        Self::standard()
    }
}

impl Jexl {
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, Config::default())
    }

    pub fn with_config(registry: Registry, config: Config) -> Self {
        Self { registry: Arc::new(registry), config }
    }

    /// Standard operators and core transforms.
    pub fn standard() -> Self {
        Self::new(Registry::standard())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn parse(&self, expression: &str) -> Result<Arc<Expr>, Error> {
        if self.config.cache {
            cache::get_or_parse(expression, self.registry.grammar(), self.config.max_depth)
        } else {
            parse_with(expression, self.registry.grammar(), self.config.max_depth).map(Arc::new)
        }
    }

    pub fn evaluate(&self, expression: &str, context: &Context) -> Result<Value, Error> {
        let ast = self.parse(expression)?;
        self.evaluate_ast(&ast, context)
    }

    /// Evaluate an already parsed expression.
    pub fn evaluate_ast(&self, ast: &Expr, context: &Context) -> Result<Value, Error> {
        log::trace!("evaluating {}", ast);
        runtime::eval(ast, context, &self.registry, self.config.max_depth)
    }

    /// JSON in, JSON out. The context must be a JSON object (or null).
    pub fn evaluate_json(&self, expression: &str, context: &serde_json::Value) -> Result<serde_json::Value, Error> {
        let context = json_context(context)?;
        self.evaluate(expression, &context).map(|v| v.to_json())
    }

    /// Run any analyzer over the parsed expression.
    pub fn analyze<A: Analyzer>(&self, expression: &str, mut analyzer: A) -> Result<A::Output, Error> {
        let ast = self.parse(expression)?;
        walk(&ast, &mut analyzer, &self.registry, self.config.max_depth)?;
        Ok(analyzer.finish())
    }

    /// Findings of the default validating analyzer. Never fails: a parse
    /// error comes back as a single finding.
    pub fn validate(&self, expression: &str) -> Vec<String> {
        self.validate_with(expression, ValidatingAnalyzer::new())
    }

    pub fn validate_with(&self, expression: &str, analyzer: ValidatingAnalyzer) -> Vec<String> {
        let findings = match self.analyze(expression, analyzer) {
            Ok(findings) => findings,
            Err(err) => vec![err.to_string()],
        };
        if !findings.is_empty() {
            log::warn!("expression '{}' has {} validation finding(s)", expression, findings.len());
        }
        findings
    }

    /// Literal subjects of the named transforms, every transform when
    /// `transforms` is empty.
    pub fn extract_subjects(&self, expression: &str, transforms: &[&str]) -> Result<Vec<Value>, Error> {
        self.analyze(expression, SubjectExtractor::new(transforms.iter().copied()))
    }
}

/// Turns a JSON object into an evaluation context.
pub fn json_context(json: &serde_json::Value) -> Result<Context, Error> {
    match json {
        serde_json::Value::Null => Ok(Context::new()),
        serde_json::Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), Value::from(v.clone()))).collect()),
        other => Err(Error::evaluation(format!("Context must be a JSON object, got {}", other))),
    }
}
