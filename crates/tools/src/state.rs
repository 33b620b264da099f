//! Workspace state oracle: is the inbox already sorted into category folders
//! the way the classifier would sort it?

use crate::classifier::{FileClassifier, FileDescriptor};
use crate::layout::{scan_directory, Workspace};
use async_trait::async_trait;
use deskpilot_core::{Category, ProbeError, WorkspaceProbe};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct OrganizationProbe {
    classifier: Arc<dyn FileClassifier>,
}

impl OrganizationProbe {
    pub fn new(classifier: Arc<dyn FileClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl WorkspaceProbe for OrganizationProbe {
    async fn is_organized(&self, root: &Path) -> Result<bool, ProbeError> {
        let workspace = Workspace::new(root);

        if !workspace.has_all_category_dirs() {
            info!("Not all category folders exist");
            return Ok(false);
        }

        let inbox = scan_directory(&workspace.inbox());
        if inbox.is_empty() {
            return Ok(true);
        }

        let mut placement: HashMap<String, Category> = HashMap::new();
        for category in Category::ALL {
            for file in scan_directory(&workspace.category_dir(category)) {
                if let Some(name) = file.file_name() {
                    placement.insert(name.to_string_lossy().to_string(), category);
                }
            }
        }

        let descriptors: Vec<FileDescriptor> =
            inbox.iter().map(|f| FileDescriptor::from_path(f)).collect();
        let predicted = self
            .classifier
            .classify(&descriptors)
            .await
            .map_err(|e| ProbeError::Classification(e.to_string()))?;

        for descriptor in &descriptors {
            let expected = predicted
                .get(&descriptor.name)
                .copied()
                .unwrap_or(Category::Others);
            let actual = placement.get(&descriptor.name).copied();
            if actual != Some(expected) {
                warn!(
                    "Mismatch for {}: predicted {}, but found in {}",
                    descriptor.name,
                    expected,
                    actual.map(|c| c.label()).unwrap_or("no category folder")
                );
                return Ok(false);
            }
        }

        Ok(true)
    }
}
