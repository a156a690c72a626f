pub mod api;
pub mod commands;
pub mod config;
pub mod document;
pub mod llm;
pub mod pipeline;
pub mod providers;
pub mod session;

// Re-export commonly used items
pub use pipeline::{CorpusPipeline, UploadedFile};
pub use session::Session;
