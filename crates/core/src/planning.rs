use crate::types::{OperationClass, PlanStep};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum RunState {
    Pending,
    Running,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub ordinal: u32,
    pub operation: String,
    pub status: StepStatus,
    pub detail: Option<String>,
}

/// Outcome of one execution run, one record per compiled step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
    pub state: RunState,
}

impl RunReport {
    pub fn new(plan: &[PlanStep]) -> Self {
        Self {
            steps: plan
                .iter()
                .map(|step| StepRecord {
                    ordinal: step.ordinal,
                    operation: step.operation.clone(),
                    status: StepStatus::Pending,
                    detail: None,
                })
                .collect(),
            state: RunState::Pending,
        }
    }

    pub fn complete_step(&mut self, index: usize, detail: Option<String>) {
        self.mark(index, StepStatus::Completed, detail);
    }

    pub fn fail_step(&mut self, index: usize, error: String) {
        self.mark(index, StepStatus::Failed, Some(error));
    }

    pub fn skip_step(&mut self, index: usize, reason: &str) {
        self.mark(index, StepStatus::Skipped, Some(reason.to_string()));
    }

    /// Mark every step from `index` on as skipped (early exit).
    pub fn skip_remaining(&mut self, index: usize, reason: &str) {
        for i in index..self.steps.len() {
            if self.steps[i].status == StepStatus::Pending {
                self.skip_step(i, reason);
            }
        }
    }

    pub fn status_of(&self, operation: &str) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|s| s.operation == operation)
            .map(|s| &s.status)
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    fn mark(&mut self, index: usize, status: StepStatus, detail: Option<String>) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = status;
            step.detail = detail;
        }
    }
}

/// True when a compression or todo step appears after `index`.
pub fn has_follow_up_work(plan: &[PlanStep], index: usize) -> bool {
    plan.iter().skip(index + 1).any(|step| {
        matches!(
            step.class(),
            Some(OperationClass::Compress) | Some(OperationClass::Todo)
        )
    })
}
