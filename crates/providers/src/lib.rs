pub mod gemini;
pub mod openai_compatible;
pub mod traits;

pub use gemini::GeminiProvider;
pub use openai_compatible::OpenAICompatibleProvider;
pub use traits::{LLMProvider, Message, ProviderError};
