use async_trait::async_trait;
use deskpilot_core::*;
use deskpilot_tools::classifier::{ClassifyError, ExtensionClassifier};
use deskpilot_tools::compression::{CompressionError, Compressor};
use deskpilot_tools::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct CountingClassifier {
    calls: AtomicUsize,
}

#[async_trait]
impl FileClassifier for CountingClassifier {
    async fn classify(&self, files: &[FileDescriptor]) -> Result<ClassificationMap, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ExtensionClassifier.classify(files).await
    }
}

#[derive(Default)]
struct CopyCompressor {
    seen: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Compressor for CopyCompressor {
    fn name(&self) -> &str {
        "copy"
    }

    async fn compress_to(&self, source: &Path, target: &Path) -> Result<(), CompressionError> {
        self.seen.lock().unwrap().push(source.to_path_buf());
        tokio::fs::copy(source, target).await?;
        Ok(())
    }
}

struct Harness {
    engine: ExecutionEngine,
    classifier: Arc<CountingClassifier>,
    compressor: Arc<CopyCompressor>,
}

fn harness() -> Harness {
    let classifier = Arc::new(CountingClassifier {
        calls: AtomicUsize::new(0),
    });
    let compressor = Arc::new(CopyCompressor::default());
    let probe: Arc<dyn WorkspaceProbe> = Arc::new(OrganizationProbe::new(classifier.clone()));

    let mut registry = CapabilityRegistry::new();
    registry
        .register(Arc::new(ValidateFolderCapability))
        .register(Arc::new(IsOrganizedCapability::new(probe.clone())))
        .register(Arc::new(CreateCategoryDirsCapability))
        .register(Arc::new(OrganizeFilesCapability::new(classifier.clone())))
        .register(Arc::new(CompressCapability::pdf(compressor.clone())))
        .register(Arc::new(CompressCapability::image(compressor.clone())));

    Harness {
        engine: ExecutionEngine::new(Arc::new(registry), probe),
        classifier,
        compressor,
    }
}

fn inbox(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("Files")).unwrap();
    for file in files {
        std::fs::write(dir.path().join("Files").join(file), b"content").unwrap();
    }
    dir
}

fn plan(operations: &[&str]) -> Vec<PlanStep> {
    operations
        .iter()
        .enumerate()
        .map(|(i, op)| PlanStep::new(i as u32 + 1, *op))
        .collect()
}

#[tokio::test]
async fn test_compress_organizes_first_then_compresses_matching_files() {
    let h = harness();
    let dir = inbox(&["a.pdf", "b.txt", "c.png", "d.rs"]);

    let report = h
        .engine
        .execute(
            &plan(&[COMPRESS_PDF, COMPRESS_IMAGE]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(report.count(StepStatus::Completed), 2);
    assert!(dir.path().join("Documents/a_compressed.pdf").exists());
    assert!(dir.path().join("Images/c_compressed.png").exists());
    assert!(dir.path().join("Code/d.rs").exists());

    let seen = h.compressor.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(!seen.iter().any(|p| p.ends_with("b.txt")));
}

#[tokio::test]
async fn test_second_run_is_pruned_and_probes_once() {
    let h = harness();
    let dir = inbox(&["a.pdf", "b.png"]);
    let steps = plan(&[CREATE_CATEGORY_DIRS, ORGANIZE_FILES]);

    // First run: no category folders, so the probe answers without classifying.
    h.engine
        .execute(&steps, &RunContext::new(dir.path()))
        .await
        .unwrap();
    let after_first = h.classifier.calls.load(Ordering::SeqCst);
    assert_eq!(after_first, 1, "only organize_files classifies on the first run");

    let marker = dir.path().join("Documents").join("keep.me");
    std::fs::write(&marker, b"x").unwrap();

    let report = h
        .engine
        .execute(&steps, &RunContext::new(dir.path()))
        .await
        .unwrap();

    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), after_first + 1);
    assert_eq!(report.count(StepStatus::Skipped), 2);
    assert!(marker.exists());
}

#[tokio::test]
async fn test_is_organized_step_feeds_the_memo() {
    let h = harness();
    let dir = inbox(&["a.pdf"]);
    for category in Category::ALL {
        std::fs::create_dir(dir.path().join(category.dir_name())).unwrap();
    }
    std::fs::write(dir.path().join("Documents/a.pdf"), b"content").unwrap();

    let report = h
        .engine
        .execute(
            &plan(&[IS_ORGANIZED, CREATE_CATEGORY_DIRS, ORGANIZE_FILES, COMPRESS_PDF]),
            &RunContext::new(dir.path()),
        )
        .await
        .unwrap();

    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.status_of(ORGANIZE_FILES), Some(&StepStatus::Skipped));
    assert_eq!(h.compressor.seen.lock().unwrap().len(), 1);
}
