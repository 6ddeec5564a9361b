pub mod config;
pub mod dtos;
pub mod models;
pub mod panel;
pub mod services;
pub mod startup;
pub mod store;

pub use models::{DocumentRecord, DownloadedFile, FileUpload};
pub use panel::DocumentsPanel;
pub use store::{format_file_size, DocumentError, DocumentStore};
