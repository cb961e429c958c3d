pub mod db;
pub mod export;
pub mod gemini;

pub use db::DbAdapter;
pub use export::OfficeExporter;
pub use gemini::{GeminiAdapter, GeminiSettings};
