//! Headless view-model for the documents grid.
//!
//! The panel turns the store's snapshot into grid rows and routes row
//! actions and dialog submissions back to the store. It keeps no document
//! state of its own.

pub mod dialogs;
pub mod rows;

pub use dialogs::{DeleteDialog, UploadDialog};
pub use rows::{is_previewable, DocumentRow, RowAction};

use crate::models::{DocumentRecord, DownloadedFile, FileUpload};
use crate::store::{DocumentError, DocumentStore, StoreSnapshot};
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

pub struct DocumentsPanel {
    store: Arc<DocumentStore>,
    scope_key: String,
    owner_id: String,
    upload: UploadDialog,
    delete: DeleteDialog,
}

impl DocumentsPanel {
    pub fn new(
        store: Arc<DocumentStore>,
        scope_key: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            scope_key: scope_key.into(),
            owner_id: owner_id.into(),
            upload: UploadDialog::default(),
            delete: DeleteDialog::default(),
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn scope_key(&self) -> &str {
        &self.scope_key
    }

    /// Initial load; hosts call this once when the panel is shown.
    pub async fn mount(&self) {
        self.refresh().await;
    }

    pub async fn refresh(&self) {
        self.store
            .fetch(&self.scope_key, Some(&self.owner_id))
            .await;
    }

    pub fn watch(&self) -> watch::Receiver<StoreSnapshot> {
        self.store.subscribe()
    }

    pub fn rows(&self) -> Vec<DocumentRow> {
        rows_for(&self.store.snapshot())
    }

    /// Bytes for inline display, or `None` when the type is not previewable
    /// or the download failed.
    pub async fn view(&self, id: &str) -> Option<DownloadedFile> {
        let record = self.store.find(id)?;
        if !is_previewable(&record.mime_type) {
            tracing::debug!(document_id = %id, mime_type = %record.mime_type, "Preview not supported");
            return None;
        }
        self.store.download(&record).await
    }

    /// Save the document under `dir`. `Ok(None)` means the download itself
    /// failed and the reason is in the store's `last_error`.
    pub async fn download_to(&self, id: &str, dir: &Path) -> Result<Option<PathBuf>, AppError> {
        let Some(record) = self.store.find(id) else {
            return Err(AppError::NotFound(anyhow::anyhow!("Unknown document {}", id)));
        };
        let Some(file) = self.store.download(&record).await else {
            return Ok(None);
        };

        let name = Path::new(&file.file_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "download".into());
        let target = dir.join(name);
        tokio::fs::write(&target, &file.bytes).await?;

        tracing::info!(document_id = %id, path = %target.display(), "Document saved");
        Ok(Some(target))
    }

    pub fn upload_dialog(&self) -> &UploadDialog {
        &self.upload
    }

    pub fn open_upload(&mut self) {
        self.upload.reset();
        self.upload.open = true;
    }

    pub fn select_file(&mut self, file: FileUpload) {
        self.upload.file = Some(file);
        self.upload.error = None;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.upload.description = description.into();
    }

    pub fn cancel_upload(&mut self) {
        self.upload.reset();
    }

    /// Submit the upload form. The dialog closes on success and stays open
    /// with the error message on failure.
    pub async fn submit_upload(&mut self) -> Option<DocumentRecord> {
        if !self.upload.can_submit() {
            return None;
        }
        let file = self.upload.file.clone()?;
        let description = self.upload.description.clone();

        self.upload.submitting = true;
        let result = self
            .store
            .upload(file, &self.scope_key, &self.owner_id, Some(&description))
            .await;
        self.upload.submitting = false;

        match result {
            Ok(record) => {
                self.upload.reset();
                Some(record)
            }
            Err(e) => {
                self.upload.error = Some(e.to_string());
                None
            }
        }
    }

    pub fn delete_dialog(&self) -> &DeleteDialog {
        &self.delete
    }

    /// Ask for confirmation before deleting `id`. Ids not in the grid are
    /// refused.
    pub fn request_delete(&mut self, id: impl Into<String>) -> Result<(), AppError> {
        let id = id.into();
        if self.store.find(&id).is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Unknown document {}", id)));
        }
        self.delete.pending_id = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.delete.pending_id = None;
    }

    /// Delete the document awaiting confirmation, if any.
    pub async fn confirm_delete(&mut self) -> Result<(), DocumentError> {
        let Some(id) = self.delete.pending_id.take() else {
            return Ok(());
        };
        let Some(record) = self.store.find(&id) else {
            tracing::debug!(document_id = %id, "Document already gone");
            return Ok(());
        };
        self.store.delete(&record).await
    }
}

pub fn rows_for(snapshot: &StoreSnapshot) -> Vec<DocumentRow> {
    snapshot.documents.iter().map(DocumentRow::from).collect()
}
