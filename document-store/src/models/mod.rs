pub mod document;
pub mod file;

pub use document::{DocumentRecord, NewDocumentRow};
pub use file::{DownloadedFile, FileUpload};
