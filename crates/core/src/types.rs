use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const VALIDATE_FOLDER: &str = "validate_folder";
pub const IS_ORGANIZED: &str = "is_organized";
pub const CREATE_CATEGORY_DIRS: &str = "create_category_dirs";
pub const ORGANIZE_FILES: &str = "organize_files";
pub const COMPRESS_PDF: &str = "compress_pdf";
pub const COMPRESS_IMAGE: &str = "compress_image";
pub const PROCESS_TASKS: &str = "process_tasks";

/// A task category the user can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Organize,
    Compress,
    Todo,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Organize, TaskKind::Compress, TaskKind::Todo];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "organize" => Some(TaskKind::Organize),
            "compress" => Some(TaskKind::Compress),
            "todo" => Some(TaskKind::Todo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Organize => "organize",
            TaskKind::Compress => "compress",
            TaskKind::Todo => "todo",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            TaskKind::Organize => "Organize your files into categories",
            TaskKind::Compress => "Compress PDFs and images",
            TaskKind::Todo => "Process tasks from your todo list",
        }
    }

    /// Operation class this task unlocks in a compiled plan.
    pub fn class(&self) -> OperationClass {
        match self {
            TaskKind::Organize => OperationClass::Organize,
            TaskKind::Compress => OperationClass::Compress,
            TaskKind::Todo => OperationClass::Todo,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique task kinds, always kept in canonical `organize < compress < todo` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    tasks: Vec<TaskKind>,
}

impl Intent {
    pub fn new<I: IntoIterator<Item = TaskKind>>(tasks: I) -> Self {
        let mut tasks: Vec<TaskKind> = tasks.into_iter().collect();
        tasks.sort();
        tasks.dedup();
        Self { tasks }
    }

    pub fn tasks(&self) -> &[TaskKind] {
        &self.tasks
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.tasks.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether a step of `class` belongs to this intent.
    pub fn permits(&self, class: OperationClass) -> bool {
        class == OperationClass::Probe || self.tasks.iter().any(|t| t.class() == class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationClass {
    Probe,
    Organize,
    Compress,
    Todo,
}

impl OperationClass {
    pub fn of(operation: &str) -> Option<Self> {
        match operation {
            VALIDATE_FOLDER | IS_ORGANIZED => Some(OperationClass::Probe),
            CREATE_CATEGORY_DIRS | ORGANIZE_FILES => Some(OperationClass::Organize),
            COMPRESS_PDF | COMPRESS_IMAGE => Some(OperationClass::Compress),
            PROCESS_TASKS => Some(OperationClass::Todo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub ordinal: u32,
    pub operation: String,
}

impl PlanStep {
    pub fn new(ordinal: u32, operation: impl Into<String>) -> Self {
        Self {
            ordinal,
            operation: operation.into(),
        }
    }

    pub fn class(&self) -> Option<OperationClass> {
        OperationClass::of(&self.operation)
    }
}

/// Target folder categories of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Documents,
    Images,
    Code,
    Others,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Documents,
        Category::Images,
        Category::Code,
        Category::Others,
    ];

    /// Lenient label parsing; anything unrecognised lands in `Others`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "documents" | "document" => Category::Documents,
            "images" | "image" => Category::Images,
            "code" => Category::Code,
            _ => Category::Others,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Documents => "documents",
            Category::Images => "images",
            Category::Code => "code",
            Category::Others => "others",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Documents => "Documents",
            Category::Images => "Images",
            Category::Code => "Code",
            Category::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub type ClassificationMap = HashMap<String, Category>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkspaceState {
    #[default]
    Unknown,
    Organized,
    Unorganized,
}

impl WorkspaceState {
    pub fn from_organized(organized: bool) -> Self {
        if organized {
            WorkspaceState::Organized
        } else {
            WorkspaceState::Unorganized
        }
    }
}
