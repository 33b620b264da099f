pub mod classifier;
pub mod compression;
pub mod layout;
pub mod organizer;
pub mod state;

pub use classifier::{ExtensionClassifier, FileClassifier, FileDescriptor, LlmClassifier};
pub use compression::{CompressCapability, Compressor, IlovePdfCompressor, TinifyCompressor};
pub use layout::Workspace;
pub use organizer::{
    CreateCategoryDirsCapability, IsOrganizedCapability, OrganizeFilesCapability,
    ValidateFolderCapability,
};
pub use state::OrganizationProbe;
