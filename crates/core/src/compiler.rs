//! Plan compiler: turns an intent or an oracle-produced step list into an
//! ordered, validated plan. Pure transformation, nothing is invoked here.

use crate::registry::CapabilityRegistry;
use crate::reply::strip_code_fences;
use crate::types::*;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Malformed plan: {0}")]
    Malformed(String),
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Unknown task: {0}")]
    UnknownTask(String),
    #[error("No tasks requested")]
    EmptyIntent,
    #[error("Plan is empty")]
    EmptyPlan,
}

/// What the compiler is asked to turn into a plan.
#[derive(Debug, Clone)]
pub enum PlanSource {
    /// Deterministic expansion of the requested task kinds.
    Intent(Intent),
    /// Raw reply of the planning oracle, scoped by the intent it was asked about.
    Oracle { intent: Intent, reply: String },
}

/// Parse the interpretation oracle's comma-separated reply into an intent.
pub fn parse_intent(reply: &str) -> Result<Intent, CompileError> {
    let cleaned = strip_code_fences(reply);
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
        return Err(CompileError::EmptyIntent);
    }

    let mut tasks = Vec::new();
    for token in cleaned.split(',') {
        let token = token.trim().trim_matches(|c| c == '\'' || c == '"');
        if token.is_empty() {
            continue;
        }
        let kind = TaskKind::parse(token).ok_or_else(|| CompileError::UnknownTask(token.to_string()))?;
        tasks.push(kind);
    }

    let intent = Intent::new(tasks);
    if intent.is_empty() {
        return Err(CompileError::EmptyIntent);
    }
    Ok(intent)
}

pub fn interpretation_prompt(user_input: &str) -> String {
    format!(
        "Interpret the following user input and identify which tasks they want to perform.\n\
         Valid tasks are: 'organize' (organizing files), 'compress' (compressing files), and 'todo' (running todo tasks).\n\
         Return only the task names in order, separated by commas. If no valid tasks are found, return 'none'.\n\
         Also try to find close matches for the tasks if the input is unclear. If it says run all then return all tasks.\n\
         User input: {}",
        user_input
    )
}

pub fn planning_prompt(intent: &Intent, folder: &str, catalogue: &str) -> String {
    let tasks: Vec<&str> = intent.tasks().iter().map(|t| t.as_str()).collect();
    format!(
        "Given these tasks: {:?}\n\
         And folder path: {}\n\n\
         Available functions and their parameters:\n{}\n\n\
         Plan the sequence of function calls needed to execute these tasks.\n\
         Compression functions already check whether files are organized, so a compression task only needs the compression functions.\n\
         If the user selects only todo then return only the process_tasks function.\n\
         If the user selects all tasks then include every needed function and put process_tasks last.\n\
         Do not include args or kwargs. Return one JSON array of objects in execution order like:\n\
         [{{\"step\": 1, \"function\": \"function_name\"}}]",
        tasks, folder, catalogue
    )
}

pub struct PlanCompiler<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> PlanCompiler<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, source: &PlanSource) -> Result<Vec<PlanStep>, CompileError> {
        let (intent, operations) = match source {
            PlanSource::Intent(intent) => (intent, expand_intent(intent)),
            PlanSource::Oracle { intent, reply } => (intent, parse_oracle_plan(reply)?),
        };

        if intent.is_empty() {
            return Err(CompileError::EmptyIntent);
        }

        let mut selected = Vec::with_capacity(operations.len());
        for operation in operations {
            if !self.registry.contains(&operation) {
                return Err(CompileError::UnknownOperation(operation));
            }
            // Registered but unclassified operations are kept: the intent has no say over them.
            let permitted = OperationClass::of(&operation)
                .map(|class| intent.permits(class))
                .unwrap_or(true);
            if permitted {
                selected.push(operation);
            } else {
                warn!("Pruning {} from plan: not requested by intent", operation);
            }
        }

        // The todo dispatcher always runs last; everything else keeps oracle order.
        let (todo, mut ordered): (Vec<String>, Vec<String>) = selected
            .into_iter()
            .partition(|operation| operation == PROCESS_TASKS);
        ordered.extend(todo);

        if ordered.is_empty() {
            return Err(CompileError::EmptyPlan);
        }

        let steps: Vec<PlanStep> = ordered
            .into_iter()
            .enumerate()
            .map(|(i, operation)| PlanStep::new(i as u32 + 1, operation))
            .collect();
        debug!("Compiled plan with {} steps", steps.len());
        Ok(steps)
    }
}

fn expand_intent(intent: &Intent) -> Vec<String> {
    intent
        .tasks()
        .iter()
        .flat_map(|task| match task {
            TaskKind::Organize => vec![CREATE_CATEGORY_DIRS, ORGANIZE_FILES],
            TaskKind::Compress => vec![COMPRESS_PDF, COMPRESS_IMAGE],
            TaskKind::Todo => vec![PROCESS_TASKS],
        })
        .map(str::to_string)
        .collect()
}

fn parse_oracle_plan(reply: &str) -> Result<Vec<String>, CompileError> {
    let cleaned = strip_code_fences(reply);
    if cleaned.is_empty() {
        return Err(CompileError::EmptyPlan);
    }

    let parsed: Value =
        serde_json::from_str(&cleaned).map_err(|e| CompileError::Malformed(e.to_string()))?;

    let entries = match parsed {
        Value::Array(entries) => entries,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(CompileError::Malformed(format!(
                "expected a JSON array of steps, got {}",
                other
            )))
        }
    };

    let mut operations = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if let Some(step) = entry.get("step") {
            if parse_ordinal(step).is_none() {
                return Err(CompileError::Malformed(format!(
                    "step {} has an invalid ordinal: {}",
                    i + 1,
                    step
                )));
            }
        }
        let operation = entry
            .get("function")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                CompileError::Malformed(format!("step {} has no function name", i + 1))
            })?;
        operations.push(operation.to_string());
    }
    Ok(operations)
}

fn parse_ordinal(step: &Value) -> Option<u32> {
    match step {
        Value::Number(n) => n.as_u64().filter(|n| *n >= 1).map(|n| n as u32),
        Value::String(s) => s.trim().parse::<u32>().ok().filter(|n| *n >= 1),
        _ => None,
    }
}
