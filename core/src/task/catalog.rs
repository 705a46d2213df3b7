use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::TaskSpec;

/// Fully resolved command line for one launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

/// Looks up `name` and appends the caller's arguments after the fixed ones.
pub fn resolve_task(
    tasks: &BTreeMap<String, TaskSpec>,
    name: &str,
    user_args: &[String],
) -> Option<TaskDescriptor> {
    let spec = tasks.get(name)?;
    let mut args = spec.args.clone();
    args.extend(user_args.iter().cloned());
    Some(TaskDescriptor {
        name: name.to_string(),
        program: spec.program.clone(),
        args,
    })
}

/// Splits a free-form argument string on whitespace.
pub fn split_arguments(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
