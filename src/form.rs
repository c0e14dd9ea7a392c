//! Expressions attached to form questions: `answer` lookups with cross-form
//! traversal, `mapby` and the `intersects` operator.

use crate::analyzer::SubjectExtractor;
use crate::config::Config;
use crate::engine::Jexl;
use crate::error::Error;
use crate::registry::{Registry, SubjectRule};
use crate::types::{Context, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Answers of one document, precomputed before any expression runs.
///
/// A document has a main form and may hold answers of other forms
/// (sub-forms or sibling forms) keyed by form slug. A table row points at the
/// document owning the table through `parent`, and at the top of the chain
/// through `root`.
#[derive(Debug, Clone, Default)]
pub struct AnswerLookup {
    form: String,
    form_meta: Value,
    forms: BTreeMap<String, Map>,
    parent: Option<Arc<AnswerLookup>>,
    root: Option<Arc<AnswerLookup>>,
}

const PARENT: &str = "parent";
const ROOT: &str = "root";

impl AnswerLookup {
    pub fn new(form: impl Into<String>) -> Self {
        let form = form.into();
        let mut forms = BTreeMap::new();
        forms.insert(form.clone(), Map::new());
        Self { form, form_meta: Value::Object(Map::new()), forms, parent: None, root: None }
    }

    /// Answer to a question of the main form.
    pub fn with_answer(mut self, question: impl Into<String>, value: impl Into<Value>) -> Self {
        self.forms.entry(self.form.clone()).or_default().insert(question.into(), value.into());
        self
    }

    /// Answers of the main form or of another form in the same document.
    pub fn with_form_answers(mut self, form: impl Into<String>, answers: Map) -> Self {
        self.forms.entry(form.into()).or_default().extend(answers);
        self
    }

    pub fn with_form_meta(mut self, meta: Value) -> Self {
        self.form_meta = meta;
        self
    }

    pub fn with_parent(mut self, parent: Arc<AnswerLookup>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_root(mut self, root: Arc<AnswerLookup>) -> Self {
        self.root = Some(root);
        self
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn parent(&self) -> Option<&AnswerLookup> {
        self.parent.as_deref()
    }

    /// The explicit root, else the parent's root, else this document.
    pub fn root(&self) -> &AnswerLookup {
        match (&self.root, &self.parent) {
            (Some(root), _) => root.as_ref(),
            (None, Some(parent)) => parent.root(),
            (None, None) => self,
        }
    }

    /// Resolves a dot separated slug path.
    ///
    /// Accepted shapes are `q`, `form.q`, and either of those behind a single
    /// `parent` or `root` hop. A second hop, or a `parent` hop from a
    /// document without a parent, is an invalid traversal.
    pub fn resolve(&self, slug: &str) -> Result<&Value, Error> {
        let segments: Vec<&str> = slug.split('.').collect();
        let (scope, rest) = match segments.split_first() {
            Some((&PARENT, rest)) => {
                let parent = self
                    .parent()
                    .ok_or_else(|| Error::InvalidTraversal(format!("{} (document has no parent)", slug)))?;
                (parent, rest)
            }
            Some((&ROOT, rest)) => (self.root(), rest),
            _ => (self, segments.as_slice()),
        };

        if matches!(rest.first(), Some(&PARENT) | Some(&ROOT)) {
            return Err(Error::InvalidTraversal(slug.to_string()));
        }

        let found = match rest {
            [question] => scope.find_question(question),
            [form, question] => scope.forms.get(*form).and_then(|answers| answers.get(*question)),
            _ => None,
        };
        found.ok_or_else(|| Error::QuestionNotFound(slug.to_string()))
    }

    /// Main form first, then the other forms in slug order.
    fn find_question(&self, question: &str) -> Option<&Value> {
        if question.is_empty() {
            return None;
        }
        self.forms
            .get(&self.form)
            .and_then(|answers| answers.get(question))
            .or_else(|| {
                self.forms
                    .iter()
                    .filter(|(form, _)| **form != self.form)
                    .find_map(|(_, answers)| answers.get(question))
            })
    }

    fn form_info(&self) -> Value {
        let mut map = Map::new();
        map.insert("form".into(), Value::String(self.form.clone()));
        map.insert("formMeta".into(), self.form_meta.clone());
        Value::Object(map)
    }

    /// `info` context: `form`, `formMeta` and the same pair for `parent`
    /// (null when the document is not nested) and `root`.
    pub fn info(&self) -> Value {
        let mut map = match self.form_info() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert("parent".into(), self.parent().map(AnswerLookup::form_info).unwrap_or(Value::Null));
        map.insert("root".into(), self.root().form_info());
        Value::Object(map)
    }

    /// Context every form expression sees.
    pub fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("form".into(), Value::String(self.form.clone()));
        context.insert("info".into(), self.info());
        context
    }
}

/// `[1, 2] intersects [2, 3]`. A null side counts as empty.
pub fn intersects(left: &Value, right: &Value) -> Result<Value, Error> {
    fn items<'v>(side: &'v Value) -> Result<&'v [Value], Error> {
        match side {
            Value::Null => Ok(&[]),
            Value::Array(items) => Ok(items),
            other => Err(Error::type_mismatch(format!(
                "Operator 'intersects' expects arrays, got {}",
                other.type_name()
            ))),
        }
    }
    let (left, right) = (items(left)?, items(right)?);
    Ok(Value::Boolean(left.iter().any(|item| right.contains(item))))
}

/// `rows|mapby('key')` picks one field out of every object; several keys
/// give one array per row.
pub fn mapby(subject: &Value, args: &[Value]) -> Result<Value, Error> {
    let rows = match subject {
        Value::Null => return Ok(Value::Array(Vec::new())),
        Value::Array(rows) => rows,
        other => {
            return Err(Error::type_mismatch(format!(
                "Transform 'mapby' expects an array, got {}",
                other.type_name()
            )))
        }
    };
    let keys = args
        .iter()
        .map(|k| {
            k.as_str()
                .ok_or_else(|| Error::type_mismatch(format!("Transform 'mapby' expects string keys, got {}", k)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let pick = |row: &Value, key: &str| row.as_object().and_then(|m| m.get(key)).cloned().unwrap_or(Value::Null);
    let mapped: Vec<Value> = match keys.as_slice() {
        [] => return Err(Error::evaluation("Transform 'mapby' needs at least one key")),
        [key] => rows.iter().map(|row| pick(row, key)).collect(),
        keys => rows
            .iter()
            .map(|row| Value::Array(keys.iter().map(|key| pick(row, key)).collect()))
            .collect(),
    };
    Ok(Value::Array(mapped))
}

/// Standard registry plus `answer` bound to `lookup`, `mapby` and
/// `intersects`.
pub fn form_registry(lookup: Arc<AnswerLookup>) -> Result<Registry, Error> {
    let mut registry = Registry::standard();
    let answer = move |subject: &Value, args: &[Value]| -> Result<Value, Error> {
        let slug = subject.as_str().ok_or_else(|| {
            Error::type_mismatch(format!("Transform 'answer' expects a question slug, got {}", subject))
        })?;
        match (lookup.resolve(slug)?, args.first()) {
            (Value::Null, Some(default)) => Ok(default.clone()),
            (value, _) => Ok(value.clone()),
        }
    };
    registry.register_validated_transform("answer", SubjectRule::StringLiteral, answer)?;
    registry.register_transform("mapby", mapby)?;
    registry.register_binary_operator("intersects", 20, intersects)?;
    Ok(registry)
}

/// Evaluates question expressions of one document.
#[derive(Debug, Clone)]
pub struct FormJexl {
    jexl: Jexl,
    lookup: Arc<AnswerLookup>,
}

impl FormJexl {
    pub fn new(lookup: AnswerLookup) -> Result<Self, Error> {
        Self::with_config(Arc::new(lookup), Config::default())
    }

    pub fn with_config(lookup: Arc<AnswerLookup>, config: Config) -> Result<Self, Error> {
        let jexl = Jexl::with_config(form_registry(Arc::clone(&lookup))?, config);
        Ok(Self { jexl, lookup })
    }

    pub fn lookup(&self) -> &AnswerLookup {
        &self.lookup
    }

    pub fn jexl(&self) -> &Jexl {
        &self.jexl
    }

    pub fn evaluate(&self, expression: &str) -> Result<Value, Error> {
        self.jexl.evaluate(expression, &self.lookup.context())
    }

    /// Evaluate with extra variables layered over `form` and `info`.
    pub fn evaluate_with(&self, expression: &str, extra: &Context) -> Result<Value, Error> {
        let mut context = self.lookup.context();
        context.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.jexl.evaluate(expression, &context)
    }

    pub fn validate(&self, expression: &str) -> Vec<String> {
        self.jexl.validate(expression)
    }

    pub fn extract_answer_slugs(&self, expression: &str) -> Result<Vec<String>, Error> {
        answer_slugs(&self.jexl, expression)
    }
}

fn answer_slugs(jexl: &Jexl, expression: &str) -> Result<Vec<String>, Error> {
    let subjects = jexl.analyze(expression, SubjectExtractor::new(["answer"]))?;
    Ok(subjects
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

lazy_static::lazy_static! {
    static ref STATIC_FORM: Result<Jexl, Error> = form_registry(Arc::new(AnswerLookup::default())).map(Jexl::new);
}

fn static_form() -> Result<&'static Jexl, Error> {
    STATIC_FORM.as_ref().map_err(Clone::clone)
}

/// Validate a question expression without any document at hand.
pub fn validate(expression: &str) -> Vec<String> {
    match static_form() {
        Ok(jexl) => jexl.validate(expression),
        Err(err) => vec![err.to_string()],
    }
}

/// Slugs an expression passes to `answer`, in source order.
pub fn extract_answer_slugs(expression: &str) -> Result<Vec<String>, Error> {
    answer_slugs(static_form()?, expression)
}
