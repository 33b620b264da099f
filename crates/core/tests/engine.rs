use async_trait::async_trait;
use deskpilot_core::*;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

struct Recorder {
    name: &'static str,
    params: &'static [&'static str],
    log: CallLog,
    fail: bool,
}

#[async_trait]
impl Capability for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "records invocations"
    }

    fn parameters(&self) -> &[&'static str] {
        self.params
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError> {
        self.log
            .lock()
            .unwrap()
            .push((self.name.to_string(), args.clone()));
        if self.fail {
            return Err(CapabilityError::Execution("boom".to_string()));
        }
        if self.name == IS_ORGANIZED {
            return Ok(CapabilityOutput::ok(json!({ "organized": true })));
        }
        Ok(CapabilityOutput::ok(json!({ "ok": true })))
    }
}

struct StaticProbe {
    organized: bool,
    calls: AtomicUsize,
}

impl StaticProbe {
    fn new(organized: bool) -> Arc<Self> {
        Arc::new(Self {
            organized,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl WorkspaceProbe for StaticProbe {
    async fn is_organized(&self, _root: &Path) -> Result<bool, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.organized)
    }
}

fn registry(log: &CallLog, failing: &[&str]) -> Arc<CapabilityRegistry> {
    let specs: [(&'static str, &'static [&'static str]); 7] = [
        (VALIDATE_FOLDER, &["folder_path"]),
        (IS_ORGANIZED, &["folder_path"]),
        (CREATE_CATEGORY_DIRS, &["folder_path"]),
        (ORGANIZE_FILES, &["folder_path"]),
        (COMPRESS_PDF, &["file_path"]),
        (COMPRESS_IMAGE, &["file_path"]),
        (PROCESS_TASKS, &["todo_file"]),
    ];
    let mut registry = CapabilityRegistry::new();
    for (name, params) in specs {
        registry.register(Arc::new(Recorder {
            name,
            params,
            log: log.clone(),
            fail: failing.contains(&name),
        }));
    }
    Arc::new(registry)
}

fn plan(operations: &[&str]) -> Vec<PlanStep> {
    operations
        .iter()
        .enumerate()
        .map(|(i, op)| PlanStep::new(i as u32 + 1, *op))
        .collect()
}

fn called(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
}

fn workspace_with_documents(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for category in Category::ALL {
        std::fs::create_dir_all(dir.path().join(category.dir_name())).unwrap();
    }
    for file in files {
        std::fs::write(dir.path().join("Documents").join(file), b"data").unwrap();
    }
    dir
}

#[tokio::test]
async fn test_organized_workspace_skips_organize_but_compresses() {
    let log: CallLog = Arc::default();
    let probe = StaticProbe::new(true);
    let engine = ExecutionEngine::new(registry(&log, &[]), probe.clone());
    let dir = workspace_with_documents(&["a.pdf"]);

    let report = engine
        .execute(
            &plan(&[CREATE_CATEGORY_DIRS, ORGANIZE_FILES, COMPRESS_PDF]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(called(&log), vec![COMPRESS_PDF]);
    assert_eq!(report.status_of(CREATE_CATEGORY_DIRS), Some(&StepStatus::Skipped));
    assert_eq!(report.status_of(ORGANIZE_FILES), Some(&StepStatus::Skipped));
    assert_eq!(report.status_of(COMPRESS_PDF), Some(&StepStatus::Completed));
    assert_eq!(report.state, RunState::Done);
}

#[tokio::test]
async fn test_organized_workspace_exits_early_without_follow_up() {
    let log: CallLog = Arc::default();
    let probe = StaticProbe::new(true);
    let engine = ExecutionEngine::new(registry(&log, &[]), probe.clone());
    let dir = workspace_with_documents(&[]);

    let report = engine
        .execute(
            &plan(&[CREATE_CATEGORY_DIRS, ORGANIZE_FILES]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert!(called(&log).is_empty());
    assert_eq!(report.count(StepStatus::Skipped), 2);
    assert_eq!(report.state, RunState::Done);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_probe_runs_once_per_run() {
    let log: CallLog = Arc::default();
    let probe = StaticProbe::new(true);
    let engine = ExecutionEngine::new(registry(&log, &[]), probe.clone());
    let dir = workspace_with_documents(&["a.pdf"]);
    let steps = plan(&[
        CREATE_CATEGORY_DIRS,
        ORGANIZE_FILES,
        COMPRESS_PDF,
        COMPRESS_IMAGE,
    ]);

    engine.execute(&steps, &RunContext::new(dir.path())).await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    engine.execute(&steps, &RunContext::new(dir.path())).await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

    assert!(!called(&log).iter().any(|op| op == CREATE_CATEGORY_DIRS));
}

#[tokio::test]
async fn test_unorganized_workspace_is_organized_before_compression() {
    let log: CallLog = Arc::default();
    let probe = StaticProbe::new(false);
    let engine = ExecutionEngine::new(registry(&log, &[]), probe.clone());
    let dir = workspace_with_documents(&["a.pdf"]);

    engine
        .execute(&plan(&[COMPRESS_PDF]), &RunContext::new(dir.path()))
        .await
        .unwrap();

    assert_eq!(
        called(&log),
        vec![CREATE_CATEGORY_DIRS, ORGANIZE_FILES, COMPRESS_PDF]
    );
}

#[tokio::test]
async fn test_organize_steps_run_once_when_unorganized() {
    let log: CallLog = Arc::default();
    let probe = StaticProbe::new(false);
    let engine = ExecutionEngine::new(registry(&log, &[]), probe.clone());
    let dir = workspace_with_documents(&["a.pdf"]);

    engine
        .execute(
            &plan(&[CREATE_CATEGORY_DIRS, ORGANIZE_FILES, COMPRESS_PDF]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(
        called(&log),
        vec![CREATE_CATEGORY_DIRS, ORGANIZE_FILES, COMPRESS_PDF]
    );
}

#[tokio::test]
async fn test_only_matching_files_reach_pdf_handler() {
    let log: CallLog = Arc::default();
    let engine = ExecutionEngine::new(registry(&log, &[]), StaticProbe::new(true));
    let dir = workspace_with_documents(&["a.pdf", "b.txt"]);

    engine
        .execute(&plan(&[COMPRESS_PDF]), &RunContext::new(dir.path()))
        .await
        .unwrap();

    let calls = log.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let path = calls[0].1["file_path"].as_str().unwrap().to_string();
    assert!(path.ends_with("a.pdf"));
}

#[tokio::test]
async fn test_handler_failure_does_not_stop_run() {
    let log: CallLog = Arc::default();
    let engine = ExecutionEngine::new(
        registry(&log, &[VALIDATE_FOLDER]),
        StaticProbe::new(true),
    );
    let dir = workspace_with_documents(&[]);

    let report = engine
        .execute(
            &plan(&[VALIDATE_FOLDER, PROCESS_TASKS]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(called(&log), vec![VALIDATE_FOLDER, PROCESS_TASKS]);
    assert_eq!(report.status_of(VALIDATE_FOLDER), Some(&StepStatus::Failed));
    assert_eq!(report.status_of(PROCESS_TASKS), Some(&StepStatus::Completed));
}

#[tokio::test]
async fn test_todo_is_never_skipped_by_organized_state() {
    let log: CallLog = Arc::default();
    let engine = ExecutionEngine::new(registry(&log, &[]), StaticProbe::new(true));
    let dir = workspace_with_documents(&[]);

    engine
        .execute(
            &plan(&[CREATE_CATEGORY_DIRS, ORGANIZE_FILES, PROCESS_TASKS]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(called(&log), vec![PROCESS_TASKS]);
}

#[tokio::test]
async fn test_arguments_are_filtered_to_declared_parameters() {
    let log: CallLog = Arc::default();
    let engine = ExecutionEngine::new(registry(&log, &[]), StaticProbe::new(true));
    let dir = workspace_with_documents(&[]);
    let context = RunContext::new(dir.path()).with_param("unrelated", 42);

    engine
        .execute(&plan(&[PROCESS_TASKS]), &context)
        .await
        .unwrap();

    let calls = log.lock().unwrap();
    let args = calls[0].1.as_object().unwrap();
    assert_eq!(args.len(), 1);
    assert!(args["todo_file"].as_str().unwrap().ends_with("todo.txt"));
}

#[tokio::test]
async fn test_unknown_capability_aborts_run() {
    let log: CallLog = Arc::default();
    let engine = ExecutionEngine::new(registry(&log, &[]), StaticProbe::new(true));
    let dir = workspace_with_documents(&[]);

    let result = engine
        .execute(
            &plan(&[VALIDATE_FOLDER, "shred_files", PROCESS_TASKS]),
            &RunContext::new(dir.path()),
        )
        .await;

    match result {
        Err(EngineError::UnknownCapability { operation, report }) => {
            assert_eq!(operation, "shred_files");
            assert_eq!(report.state, RunState::Aborted);
            assert_eq!(report.status_of(VALIDATE_FOLDER), Some(&StepStatus::Completed));
            assert_eq!(report.status_of(PROCESS_TASKS), Some(&StepStatus::Pending));
        }
        other => panic!("expected an aborted run, got {:?}", other),
    }
    assert_eq!(called(&log), vec![VALIDATE_FOLDER]);
}

#[tokio::test]
async fn test_is_organized_step_sets_state_for_later_steps() {
    let log: CallLog = Arc::default();
    let probe = StaticProbe::new(false);
    let engine = ExecutionEngine::new(registry(&log, &[]), probe.clone());
    let dir = workspace_with_documents(&["a.pdf"]);

    let report = engine
        .execute(
            &plan(&[IS_ORGANIZED, CREATE_CATEGORY_DIRS, ORGANIZE_FILES, COMPRESS_PDF]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(called(&log), vec![IS_ORGANIZED, COMPRESS_PDF]);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.status_of(ORGANIZE_FILES), Some(&StepStatus::Skipped));
}

#[tokio::test]
async fn test_is_organized_step_reuses_known_state() {
    let log: CallLog = Arc::default();
    let probe = StaticProbe::new(false);
    let engine = ExecutionEngine::new(registry(&log, &[]), probe.clone());
    let dir = workspace_with_documents(&[]);

    let report = engine
        .execute(
            &plan(&[CREATE_CATEGORY_DIRS, IS_ORGANIZED]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(called(&log), vec![CREATE_CATEGORY_DIRS]);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.status_of(IS_ORGANIZED), Some(&StepStatus::Completed));
}
