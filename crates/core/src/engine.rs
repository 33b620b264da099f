use crate::planning::{has_follow_up_work, RunReport, RunState};
use crate::registry::{Capability, CapabilityRegistry, ParamContext};
use crate::types::*;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use walkdir::WalkDir;

pub const FILES_DIR: &str = "Files";
pub const TODO_FILE: &str = "todo.txt";

#[derive(Debug, Error)]
pub enum EngineError {
    /// The run stopped at `operation`; `report` holds the steps that already ran.
    #[error("Unknown capability: {operation}")]
    UnknownCapability {
        operation: String,
        report: Box<RunReport>,
    },
}

fn abort(mut report: RunReport, operation: &str) -> EngineError {
    error!("Aborting run: no capability registered for {}", operation);
    report.state = RunState::Aborted;
    EngineError::UnknownCapability {
        operation: operation.to_string(),
        report: Box::new(report),
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Classification failed: {0}")]
    Classification(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Answers whether a workspace is already organized into category folders.
#[async_trait]
pub trait WorkspaceProbe: Send + Sync {
    async fn is_organized(&self, root: &Path) -> Result<bool, ProbeError>;
}

/// Run-local, write-once memo of the workspace state.
#[derive(Debug, Default)]
pub struct StateMemo {
    state: WorkspaceState,
}

impl StateMemo {
    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Probe on first use, answer from the memo afterwards. A failing probe counts as unorganized.
    pub async fn resolve(&mut self, probe: &dyn WorkspaceProbe, root: &Path) -> WorkspaceState {
        if self.state == WorkspaceState::Unknown {
            self.state = match probe.is_organized(root).await {
                Ok(organized) => WorkspaceState::from_organized(organized),
                Err(e) => {
                    warn!("Workspace probe failed, treating as unorganized: {}", e);
                    WorkspaceState::Unorganized
                }
            };
            info!("Workspace state: {:?}", self.state);
        }
        self.state
    }

    pub fn mark_organized(&mut self) {
        self.state = WorkspaceState::Organized;
    }

    /// Store a state computed outside the memo, e.g. by an `is_organized` step.
    pub fn record(&mut self, state: WorkspaceState) {
        self.state = state;
    }
}

/// Workspace root plus the global parameter context handed to capabilities.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub workspace: PathBuf,
    pub params: ParamContext,
}

impl RunContext {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        let todo_file = workspace.join(FILES_DIR).join(TODO_FILE);
        let params = ParamContext::new()
            .with("folder_path", workspace.to_string_lossy().to_string())
            .with("todo_file", todo_file.to_string_lossy().to_string());
        Self { workspace, params }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }
}

pub struct ExecutionEngine {
    registry: Arc<CapabilityRegistry>,
    probe: Arc<dyn WorkspaceProbe>,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<CapabilityRegistry>, probe: Arc<dyn WorkspaceProbe>) -> Self {
        Self { registry, probe }
    }

    pub async fn execute(
        &self,
        plan: &[PlanStep],
        context: &RunContext,
    ) -> Result<RunReport, EngineError> {
        let mut report = RunReport::new(plan);
        let mut memo = StateMemo::default();
        report.state = RunState::Running;

        for (index, step) in plan.iter().enumerate() {
            let Some(capability) = self.registry.get(&step.operation) else {
                return Err(abort(report, &step.operation));
            };

            info!("Executing step {}: {}", step.ordinal, step.operation);

            match step.class() {
                Some(OperationClass::Probe) if step.operation == IS_ORGANIZED => {
                    if memo.state() == WorkspaceState::Unknown {
                        let args = context.params.filter(capability.parameters());
                        let organized = match capability.invoke(args).await {
                            Ok(result) => result.output["organized"].as_bool().unwrap_or(false),
                            Err(e) => {
                                warn!("{} failed, treating as unorganized: {}", IS_ORGANIZED, e);
                                false
                            }
                        };
                        memo.record(WorkspaceState::from_organized(organized));
                        info!("Workspace state: {:?}", memo.state());
                    }
                    report.complete_step(index, Some(format!("{:?}", memo.state())));
                }
                Some(OperationClass::Organize) => {
                    let state = memo.resolve(self.probe.as_ref(), &context.workspace).await;
                    if state == WorkspaceState::Organized {
                        if !has_follow_up_work(plan, index) {
                            info!("Files are already organized, nothing left to do");
                            report.skip_remaining(index, "workspace already organized");
                            break;
                        }
                        info!("Skipping {} as files are already organized", step.operation);
                        report.skip_step(index, "workspace already organized");
                        continue;
                    }
                    if self.invoke(&capability, context, index, &mut report).await
                        && step.operation == ORGANIZE_FILES
                    {
                        memo.mark_organized();
                    }
                }
                Some(OperationClass::Compress) => {
                    if let Err(missing) = self.ensure_organized(&mut memo, context).await {
                        return Err(abort(report, &missing));
                    }
                    self.compress_all(&capability, &step.operation, context, index, &mut report)
                        .await;
                }
                _ => {
                    self.invoke(&capability, context, index, &mut report).await;
                }
            }
        }

        report.state = RunState::Done;
        Ok(report)
    }

    /// Invoke with filtered arguments; returns whether the step succeeded.
    async fn invoke(
        &self,
        capability: &Arc<dyn Capability>,
        context: &RunContext,
        index: usize,
        report: &mut RunReport,
    ) -> bool {
        let args = context.params.filter(capability.parameters());
        match capability.invoke(args).await {
            Ok(result) if result.success => {
                report.complete_step(index, Some(result.output.to_string()));
                true
            }
            Ok(result) => {
                warn!("{} finished without a result", capability.name());
                report.fail_step(index, format!("no result: {}", result.output));
                false
            }
            Err(e) => {
                error!("{} failed: {}", capability.name(), e);
                report.fail_step(index, e.to_string());
                false
            }
        }
    }

    /// Organize the workspace before compressing if the memo says it is not organized.
    /// Errs with the name of a prerequisite capability that is not registered.
    async fn ensure_organized(
        &self,
        memo: &mut StateMemo,
        context: &RunContext,
    ) -> Result<(), String> {
        info!("Checking if files are organized before compression");
        if memo.resolve(self.probe.as_ref(), &context.workspace).await == WorkspaceState::Organized
        {
            return Ok(());
        }

        info!("Organizing files before compression");
        for operation in [CREATE_CATEGORY_DIRS, ORGANIZE_FILES] {
            let capability = self
                .registry
                .get(operation)
                .ok_or_else(|| operation.to_string())?;
            let args = context.params.filter(capability.parameters());
            if let Err(e) = capability.invoke(args).await {
                error!("{} failed during compression prerequisite: {}", operation, e);
            }
        }
        memo.mark_organized();
        Ok(())
    }

    async fn compress_all(
        &self,
        capability: &Arc<dyn Capability>,
        operation: &str,
        context: &RunContext,
        index: usize,
        report: &mut RunReport,
    ) {
        let (category, extensions): (Category, &[&str]) = if operation == COMPRESS_PDF {
            (Category::Documents, &["pdf"])
        } else {
            (Category::Images, &["jpg", "jpeg", "png"])
        };

        let folder = context.workspace.join(category.dir_name());
        let files = match matching_files(&folder, extensions) {
            Ok(files) => files,
            Err(e) => {
                error!("Cannot scan {}: {}", folder.display(), e);
                report.fail_step(index, e.to_string());
                return;
            }
        };

        let (mut compressed, mut declined, mut failed) = (0usize, 0usize, 0usize);
        for file in &files {
            let args = json!({ "file_path": file.to_string_lossy() });
            match capability.invoke(args).await {
                Ok(result) if result.success => compressed += 1,
                Ok(_) => declined += 1,
                Err(e) => {
                    failed += 1;
                    error!("Failed to compress {}: {}", file.display(), e);
                }
            }
        }

        info!(
            "{}: {} compressed, {} skipped, {} failed",
            operation, compressed, declined, failed
        );
        report.complete_step(
            index,
            Some(format!(
                "{} of {} files compressed, {} skipped, {} failed",
                compressed,
                files.len(),
                declined,
                failed
            )),
        );
    }
}

/// Files under `folder` (recursively) whose extension matches, case-insensitively.
pub fn matching_files(folder: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, std::io::Error> {
    if !folder.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", folder.display()),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        organized: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WorkspaceProbe for CountingProbe {
        async fn is_organized(&self, _root: &Path) -> Result<bool, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.organized)
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl WorkspaceProbe for FailingProbe {
        async fn is_organized(&self, _root: &Path) -> Result<bool, ProbeError> {
            Err(ProbeError::Classification("oracle down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_memo_probes_once() {
        let probe = CountingProbe {
            organized: true,
            calls: AtomicUsize::new(0),
        };
        let mut memo = StateMemo::default();
        let root = Path::new("/nonexistent");

        assert_eq!(memo.resolve(&probe, root).await, WorkspaceState::Organized);
        assert_eq!(memo.resolve(&probe, root).await, WorkspaceState::Organized);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_probe_is_unorganized() {
        let mut memo = StateMemo::default();
        let state = memo.resolve(&FailingProbe, Path::new("/nonexistent")).await;
        assert_eq!(state, WorkspaceState::Unorganized);
    }

    #[test]
    fn test_matching_files_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"text").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("C.PDF"), b"%PDF").unwrap();

        let files = matching_files(dir.path(), &["pdf"]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "C.PDF"]);
    }

    #[test]
    fn test_run_context_seeds_params() {
        let context = RunContext::new("/work");
        assert_eq!(context.params.get("folder_path").unwrap(), "/work");
        assert_eq!(
            context.params.get("todo_file").unwrap(),
            "/work/Files/todo.txt"
        );
    }
}
