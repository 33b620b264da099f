use crate::classifier::{FileClassifier, FileDescriptor};
use crate::layout::{create_category_dirs, scan_directory, validate_folder, Workspace};
use async_trait::async_trait;
use deskpilot_core::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, Serialize)]
pub struct OrganizeSummary {
    pub copied: usize,
    pub failed: usize,
}

/// Copy every inbox file into the folder of its predicted category. The inbox is
/// left untouched; an existing copy at the destination is replaced.
pub async fn organize_files(
    workspace: &Workspace,
    classifier: &dyn FileClassifier,
) -> Result<OrganizeSummary, CapabilityError> {
    let files = scan_directory(&workspace.inbox());
    let descriptors: Vec<FileDescriptor> =
        files.iter().map(|f| FileDescriptor::from_path(f)).collect();

    let classifications = classifier
        .classify(&descriptors)
        .await
        .map_err(|e| CapabilityError::Execution(e.to_string()))?;

    let mut summary = OrganizeSummary::default();
    for (file, descriptor) in files.iter().zip(&descriptors) {
        if !file.exists() {
            warn!("Source file does not exist: {}", file.display());
            continue;
        }

        let category = classifications
            .get(&descriptor.name)
            .copied()
            .unwrap_or(Category::Others);
        let dest_dir = workspace.category_dir(category);
        let dest = dest_dir.join(&descriptor.name);

        let copied = async {
            tokio::fs::create_dir_all(&dest_dir).await?;
            if tokio::fs::try_exists(&dest).await? {
                tokio::fs::remove_file(&dest).await?;
            }
            tokio::fs::copy(file, &dest).await
        }
        .await;

        match copied {
            Ok(_) => {
                info!("Copied {} to {} directory", descriptor.name, category);
                summary.copied += 1;
            }
            Err(e) => {
                error!("Error copying {}: {}", file.display(), e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

pub(crate) fn folder_arg(args: &Value) -> Result<PathBuf, CapabilityError> {
    args["folder_path"]
        .as_str()
        .map(PathBuf::from)
        .ok_or_else(|| CapabilityError::Validation("Missing 'folder_path' field".to_string()))
}

pub struct ValidateFolderCapability;

#[async_trait]
impl Capability for ValidateFolderCapability {
    fn name(&self) -> &str {
        VALIDATE_FOLDER
    }

    fn description(&self) -> &str {
        "Validate that the folder exists and is writable"
    }

    fn parameters(&self) -> &[&'static str] {
        &["folder_path"]
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError> {
        let folder = folder_arg(&args)?;
        let path = validate_folder(&folder).map_err(|e| CapabilityError::Validation(e.to_string()))?;
        Ok(CapabilityOutput::ok(json!({ "path": path })))
    }
}

pub struct IsOrganizedCapability {
    probe: Arc<dyn WorkspaceProbe>,
}

impl IsOrganizedCapability {
    pub fn new(probe: Arc<dyn WorkspaceProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl Capability for IsOrganizedCapability {
    fn name(&self) -> &str {
        IS_ORGANIZED
    }

    fn description(&self) -> &str {
        "Check whether files are already sorted into Documents, Images, Code and Others"
    }

    fn parameters(&self) -> &[&'static str] {
        &["folder_path"]
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError> {
        let folder = folder_arg(&args)?;
        let organized = self
            .probe
            .is_organized(&folder)
            .await
            .map_err(|e| CapabilityError::Execution(e.to_string()))?;
        Ok(CapabilityOutput::ok(json!({ "organized": organized })))
    }
}

pub struct CreateCategoryDirsCapability;

#[async_trait]
impl Capability for CreateCategoryDirsCapability {
    fn name(&self) -> &str {
        CREATE_CATEGORY_DIRS
    }

    fn description(&self) -> &str {
        "Create the Documents, Images, Code and Others folders"
    }

    fn parameters(&self) -> &[&'static str] {
        &["folder_path"]
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError> {
        let workspace = Workspace::new(folder_arg(&args)?);
        let dirs = create_category_dirs(&workspace)
            .map_err(|e| CapabilityError::Execution(e.to_string()))?;
        let created: serde_json::Map<String, Value> = dirs
            .into_iter()
            .map(|(category, path)| (category.label().to_string(), json!(path)))
            .collect();
        Ok(CapabilityOutput::ok(Value::Object(created)))
    }
}

pub struct OrganizeFilesCapability {
    classifier: Arc<dyn FileClassifier>,
}

impl OrganizeFilesCapability {
    pub fn new(classifier: Arc<dyn FileClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Capability for OrganizeFilesCapability {
    fn name(&self) -> &str {
        ORGANIZE_FILES
    }

    fn description(&self) -> &str {
        "Classify the files in Files and copy each into its category folder"
    }

    fn parameters(&self) -> &[&'static str] {
        &["folder_path"]
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError> {
        let workspace = Workspace::new(folder_arg(&args)?);
        let summary = organize_files(&workspace, self.classifier.as_ref()).await?;
        Ok(CapabilityOutput::ok(json!(summary)))
    }
}
