use async_trait::async_trait;
use deskpilot_core::reply::strip_code_fences;
use deskpilot_core::{Category, ClassificationMap};
use deskpilot_providers::LLMProvider;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Oracle error: {0}")]
    Oracle(String),
    #[error("Unparseable classification: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub extension: String,
}

impl FileDescriptor {
    pub fn from_path(path: &Path) -> Self {
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            extension: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
        }
    }
}

/// Batch classification oracle: one call for the whole file list.
#[async_trait]
pub trait FileClassifier: Send + Sync {
    async fn classify(&self, files: &[FileDescriptor]) -> Result<ClassificationMap, ClassifyError>;
}

/// Classifies through the text oracle.
pub struct LlmClassifier {
    provider: Arc<dyn LLMProvider>,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

pub fn classification_prompt(files: &[FileDescriptor]) -> String {
    let listing: Vec<String> = files
        .iter()
        .map(|f| format!("Filename: {} Extension: {}", f.name, f.extension))
        .collect();
    format!(
        "Classify this file list based on the file name and extension into one of the four categories \
         'documents', 'images', 'code', 'others'. Return a JSON object with the format \
         {{\"file_name.extension\": \"category\"}}. File List: {:?} \
         Do not give code and only return the object, without backticks.",
        listing
    )
}

/// Parse an oracle reply into a classification map. Single-quoted pseudo-JSON is
/// normalised before giving up.
pub fn parse_classification(reply: &str) -> Result<ClassificationMap, ClassifyError> {
    let cleaned = strip_code_fences(reply);
    let object: Map<String, Value> = match serde_json::from_str(&cleaned) {
        Ok(object) => object,
        Err(_) => serde_json::from_str(&cleaned.replace('\'', "\""))
            .map_err(|e| ClassifyError::Parse(format!("{}: {}", e, cleaned)))?,
    };

    Ok(object
        .into_iter()
        .map(|(name, label)| {
            let category = label.as_str().map(Category::from_label).unwrap_or(Category::Others);
            (name, category)
        })
        .collect())
}

#[async_trait]
impl FileClassifier for LlmClassifier {
    async fn classify(&self, files: &[FileDescriptor]) -> Result<ClassificationMap, ClassifyError> {
        if files.is_empty() {
            return Ok(ClassificationMap::new());
        }

        debug!("Classifying {} files via {}", files.len(), self.provider.name());
        let reply = self
            .provider
            .complete(&classification_prompt(files))
            .await
            .map_err(|e| ClassifyError::Oracle(e.to_string()))?;
        parse_classification(&reply)
    }
}

/// Offline classifier keyed on the file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionClassifier;

impl ExtensionClassifier {
    pub fn category_for(extension: &str) -> Category {
        let ext = extension.trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            // Documents
            "txt" | "md" | "rst" | "adoc" => Category::Documents,
            "pdf" | "doc" | "docx" | "odt" | "rtf" => Category::Documents,
            "xls" | "xlsx" | "ods" | "csv" | "ppt" | "pptx" | "odp" => Category::Documents,

            // Images
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" | "bmp" | "ico" | "tiff" | "heic" => {
                Category::Images
            }

            // Source and scripts
            "rs" | "c" | "h" | "cpp" | "cc" | "cxx" | "hpp" | "go" | "java" | "js" | "mjs"
            | "ts" | "py" | "rb" | "pl" | "lua" | "sh" | "bash" | "zsh" | "fish" | "html"
            | "css" | "json" | "toml" | "yaml" | "yml" | "ipynb" => Category::Code,

            _ => Category::Others,
        }
    }
}

#[async_trait]
impl FileClassifier for ExtensionClassifier {
    async fn classify(&self, files: &[FileDescriptor]) -> Result<ClassificationMap, ClassifyError> {
        Ok(files
            .iter()
            .map(|f| (f.name.clone(), Self::category_for(&f.extension)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_providers::ProviderError;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct CannedProvider {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMProvider for CannedProvider {
        async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_descriptor_from_path() {
        let descriptor = FileDescriptor::from_path(&PathBuf::from("/tmp/Files/photo.JPG"));
        assert_eq!(descriptor.name, "photo.JPG");
        assert_eq!(descriptor.extension, ".JPG");
    }

    #[test]
    fn test_parse_single_quoted_reply() {
        let map = parse_classification("{'a.pdf': 'documents', 'b.png': 'Images', 'c': 'music'}")
            .unwrap();
        assert_eq!(map["a.pdf"], Category::Documents);
        assert_eq!(map["b.png"], Category::Images);
        assert_eq!(map["c"], Category::Others);
    }

    #[test]
    fn test_parse_keeps_apostrophes_in_valid_json() {
        let map = parse_classification("```json\n{\"bob's notes.txt\": \"documents\"}\n```").unwrap();
        assert_eq!(map["bob's notes.txt"], Category::Documents);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(matches!(
            parse_classification("I think these are documents"),
            Err(ClassifyError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_llm_classifier_batches_one_call() {
        let provider = Arc::new(CannedProvider {
            reply: "{\"a.pdf\": \"documents\", \"main.rs\": \"code\"}".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let classifier = LlmClassifier::new(provider.clone());
        let files = vec![
            FileDescriptor::from_path(Path::new("a.pdf")),
            FileDescriptor::from_path(Path::new("main.rs")),
        ];

        let map = classifier.classify(&files).await.unwrap();
        assert_eq!(map["main.rs"], Category::Code);

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Filename: a.pdf Extension: .pdf"));
    }

    #[tokio::test]
    async fn test_llm_classifier_skips_oracle_for_empty_list() {
        let provider = Arc::new(CannedProvider {
            reply: String::new(),
            prompts: Mutex::new(Vec::new()),
        });
        let classifier = LlmClassifier::new(provider.clone());
        assert!(classifier.classify(&[]).await.unwrap().is_empty());
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extension_classifier() {
        let files = vec![
            FileDescriptor::from_path(Path::new("scan.PDF")),
            FileDescriptor::from_path(Path::new("logo.svg")),
            FileDescriptor::from_path(Path::new("build.sh")),
            FileDescriptor::from_path(Path::new("archive.zip")),
        ];
        let map = ExtensionClassifier.classify(&files).await.unwrap();
        assert_eq!(map["scan.PDF"], Category::Documents);
        assert_eq!(map["logo.svg"], Category::Images);
        assert_eq!(map["build.sh"], Category::Code);
        assert_eq!(map["archive.zip"], Category::Others);
    }
}
