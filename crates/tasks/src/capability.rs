use crate::dispatcher::{DispatchError, TaskDispatcher};
use async_trait::async_trait;
use deskpilot_core::{Capability, CapabilityError, CapabilityOutput, PROCESS_TASKS};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// `process_tasks`: reads the to-do file and hands its text to the dispatcher.
pub struct ProcessTasksCapability {
    dispatcher: Arc<TaskDispatcher>,
}

impl ProcessTasksCapability {
    pub fn new(dispatcher: Arc<TaskDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Capability for ProcessTasksCapability {
    fn name(&self) -> &str {
        PROCESS_TASKS
    }

    fn description(&self) -> &str {
        "Read the to-do file and carry out each task in it"
    }

    fn parameters(&self) -> &[&'static str] {
        &["todo_file"]
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError> {
        let path = args["todo_file"]
            .as_str()
            .map(PathBuf::from)
            .ok_or_else(|| CapabilityError::Validation("Missing 'todo_file' field".to_string()))?;

        let text = tokio::fs::read_to_string(&path).await?;
        info!("Processing to-do file {}", path.display());

        let report = self.dispatcher.process(&text).await.map_err(|e| match e {
            DispatchError::Parse(msg) => CapabilityError::Execution(format!("unreadable task list: {}", msg)),
            other => CapabilityError::Execution(other.to_string()),
        })?;

        let output = serde_json::to_value(&report)
            .map_err(|e| CapabilityError::Execution(e.to_string()))?;
        Ok(CapabilityOutput::ok(output))
    }
}
