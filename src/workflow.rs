//! Flow routing (`task`, `tasks`) and group assignment (`groups`).

use crate::analyzer::SubjectExtractor;
use crate::config::Config;
use crate::engine::Jexl;
use crate::error::Error;
use crate::registry::{Registry, SubjectRule};
use crate::types::{Context, Map, Value};
use std::collections::BTreeSet;

fn task(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    match subject {
        Value::String(_) => Ok(subject.clone()),
        other => Err(Error::type_mismatch(format!("Transform 'task' expects a task slug, got {}", other))),
    }
}

fn string_array(name: &str, subject: &Value) -> Result<Value, Error> {
    if subject.as_string_array().is_some() {
        Ok(subject.clone())
    } else {
        Err(Error::type_mismatch(format!("Transform '{}' expects an array of slugs, got {}", name, subject)))
    }
}

fn tasks(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    string_array("tasks", subject)
}

fn groups(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    string_array("groups", subject)
}

/// Standard registry plus `task` and `tasks`.
pub fn flow_registry() -> Result<Registry, Error> {
    let mut registry = Registry::standard();
    registry.register_validated_transform("task", SubjectRule::StringLiteral, task)?;
    registry.register_validated_transform("tasks", SubjectRule::StringArrayLiteral, tasks)?;
    Ok(registry)
}

/// Standard registry plus `groups`.
pub fn group_registry() -> Result<Registry, Error> {
    let mut registry = Registry::standard();
    registry.register_validated_transform("groups", SubjectRule::StringArrayLiteral, groups)?;
    Ok(registry)
}

/// What a flow or group expression knows about the case at hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowInfo {
    pub case_form: Option<String>,
    pub case_workflow: Option<String>,
    pub prev_task: Option<String>,
}

impl WorkflowInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(mut self, form: impl Into<String>, workflow: impl Into<String>) -> Self {
        self.case_form = Some(form.into());
        self.case_workflow = Some(workflow.into());
        self
    }

    pub fn with_prev_task(mut self, task: impl Into<String>) -> Self {
        self.prev_task = Some(task.into());
        self
    }

    /// `info.case.{form, workflow}` and `info.prev_work_item.task`.
    pub fn to_value(&self) -> Value {
        let slug = |s: &Option<String>| s.clone().map(Value::String).unwrap_or(Value::Null);

        let mut case = Map::new();
        case.insert("form".into(), slug(&self.case_form));
        case.insert("workflow".into(), slug(&self.case_workflow));

        let mut prev = Map::new();
        prev.insert("task".into(), slug(&self.prev_task));

        let mut info = Map::new();
        info.insert("case".into(), Value::Object(case));
        info.insert("prev_work_item".into(), Value::Object(prev));
        Value::Object(info)
    }

    pub fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("info".into(), self.to_value());
        context
    }
}

fn string_subjects(jexl: &Jexl, expression: &str, transforms: &[&str]) -> Result<BTreeSet<String>, Error> {
    let subjects = jexl.analyze(expression, SubjectExtractor::new(transforms.iter().copied()))?;
    let mut slugs = BTreeSet::new();
    for subject in subjects {
        match subject {
            Value::String(s) => {
                slugs.insert(s);
            }
            Value::Array(items) => slugs.extend(items.into_iter().filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })),
            _ => {}
        }
    }
    Ok(slugs)
}

/// Evaluates flow expressions that pick the next task(s).
#[derive(Debug, Clone)]
pub struct FlowJexl {
    jexl: Jexl,
}

impl FlowJexl {
    pub fn new() -> Result<Self, Error> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, Error> {
        Ok(Self { jexl: Jexl::with_config(flow_registry()?, config) })
    }

    pub fn jexl(&self) -> &Jexl {
        &self.jexl
    }

    pub fn evaluate(&self, expression: &str, info: &WorkflowInfo) -> Result<Value, Error> {
        self.jexl.evaluate(expression, &info.context())
    }

    pub fn validate(&self, expression: &str) -> Vec<String> {
        self.jexl.validate(expression)
    }

    pub fn extract_tasks(&self, expression: &str) -> Result<BTreeSet<String>, Error> {
        string_subjects(&self.jexl, expression, &["task", "tasks"])
    }
}

/// Evaluates group expressions that assign work items to groups.
#[derive(Debug, Clone)]
pub struct GroupJexl {
    jexl: Jexl,
}

impl GroupJexl {
    pub fn new() -> Result<Self, Error> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, Error> {
        Ok(Self { jexl: Jexl::with_config(group_registry()?, config) })
    }

    pub fn jexl(&self) -> &Jexl {
        &self.jexl
    }

    pub fn evaluate(&self, expression: &str, info: &WorkflowInfo) -> Result<Value, Error> {
        self.jexl.evaluate(expression, &info.context())
    }

    pub fn validate(&self, expression: &str) -> Vec<String> {
        self.jexl.validate(expression)
    }

    pub fn extract_groups(&self, expression: &str) -> Result<BTreeSet<String>, Error> {
        string_subjects(&self.jexl, expression, &["groups"])
    }
}

lazy_static::lazy_static! {
    static ref FLOW: Result<FlowJexl, Error> = FlowJexl::new();
    static ref GROUPS: Result<GroupJexl, Error> = GroupJexl::new();
}

/// Every task slug a flow expression can route to, across all branches.
pub fn extract_tasks(expression: &str) -> Result<BTreeSet<String>, Error> {
    FLOW.as_ref().map_err(Clone::clone)?.extract_tasks(expression)
}

pub fn extract_groups(expression: &str) -> Result<BTreeSet<String>, Error> {
    GROUPS.as_ref().map_err(Clone::clone)?.extract_groups(expression)
}
