//! Client-side view of one instrument's documents.
//!
//! `DocumentStore` keeps a local list of metadata rows for a scope and
//! drives the two remote systems (metadata table and blob store) for every
//! mutation. The list is a cache: it reflects the last successful fetch plus
//! any uploads and deletes completed since.
//!
//! Observers subscribe to a `watch` channel and receive a fresh
//! [`StoreSnapshot`] after every change.

pub mod error;
pub mod format;
pub mod paths;
pub mod state;

pub use error::{DeletePhase, DocumentError};
pub use format::format_file_size;
pub use paths::{sanitize_file_name, StoragePath};
pub use state::{ConsistencyPolicy, OperationState, StoreOptions, StoreSnapshot};

use crate::dtos::DocumentQuery;
use crate::models::{DocumentRecord, DownloadedFile, FileUpload, NewDocumentRow};
use crate::services::metrics::record_result;
use crate::services::{BlobStore, MetadataTable};
use chrono::Utc;
use service_core::error::AppError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};
use validator::{Validate, ValidationError};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Validate)]
struct UploadRequest {
    #[validate(length(min = 1), custom(function = "validate_path_segment"))]
    scope_key: String,
    #[validate(length(min = 1), custom(function = "validate_path_segment"))]
    owner_id: String,
    #[validate(length(min = 1))]
    file_name: String,
}

fn validate_path_segment(value: &str) -> Result<(), ValidationError> {
    if value.contains('/') || value.trim() != value {
        return Err(ValidationError::new("path_segment"));
    }
    Ok(())
}

/// Marks one operation as finished when dropped, including when the
/// operation's future is dropped before completion. `is_loading` stays set
/// until the last in-flight operation lets go.
struct LoadingGuard<'a> {
    snapshot: &'a watch::Sender<StoreSnapshot>,
    in_flight: &'a AtomicUsize,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.snapshot.send_modify(|s| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            s.state.is_loading = remaining > 0;
        });
    }
}

pub struct DocumentStore {
    table: Arc<dyn MetadataTable>,
    blobs: Arc<dyn BlobStore>,
    options: StoreOptions,
    snapshot: watch::Sender<StoreSnapshot>,
    in_flight: AtomicUsize,
    op_gate: Mutex<()>,
}

impl DocumentStore {
    pub fn new(table: Arc<dyn MetadataTable>, blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_options(table, blobs, StoreOptions::default())
    }

    pub fn with_options(
        table: Arc<dyn MetadataTable>,
        blobs: Arc<dyn BlobStore>,
        options: StoreOptions,
    ) -> Self {
        let (snapshot, _) = watch::channel(StoreSnapshot::default());
        Self {
            table,
            blobs,
            options,
            snapshot,
            in_flight: AtomicUsize::new(0),
            op_gate: Mutex::new(()),
        }
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.snapshot.borrow().documents.clone()
    }

    pub fn state(&self) -> OperationState {
        self.snapshot.borrow().state.clone()
    }

    pub fn find(&self, id: &str) -> Option<DocumentRecord> {
        self.snapshot
            .borrow()
            .documents
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    /// Replace the local list with the scope's documents, newest first.
    ///
    /// Failures are recorded in `last_error` and leave the list untouched.
    pub async fn fetch(&self, scope_key: &str, owner_id: Option<&str>) {
        let _permit = self.acquire().await;
        let _loading = self.begin();

        let result = self.load(scope_key, owner_id).await;
        record_result("fetch", &result);

        match result {
            Ok(documents) => {
                tracing::info!(
                    scope_key = %scope_key,
                    owner_id = ?owner_id,
                    count = documents.len(),
                    "Documents fetched"
                );
                self.snapshot.send_modify(|s| s.documents = documents);
            }
            Err(e) => {
                tracing::error!(scope_key = %scope_key, error = %e, "Failed to fetch documents");
                self.record_error(&e);
            }
        }
    }

    /// Store the file, insert its metadata row and prepend the new record.
    pub async fn upload(
        &self,
        file: FileUpload,
        scope_key: &str,
        owner_id: &str,
        description: Option<&str>,
    ) -> Result<DocumentRecord, DocumentError> {
        let _permit = self.acquire().await;
        let _loading = self.begin();
        self.set_progress(0);

        let result = self
            .store_document(file, scope_key, owner_id, description)
            .await;
        record_result("upload", &result);

        match &result {
            Ok(record) => {
                tracing::info!(
                    document_id = %record.id,
                    storage_path = %record.storage_path,
                    size = record.file_size_bytes,
                    "Document upload completed successfully"
                );
                self.snapshot.send_modify(|s| {
                    s.state.upload_progress_percent = 100;
                    s.documents.insert(0, record.clone());
                });
            }
            Err(e) => {
                tracing::error!(scope_key = %scope_key, owner_id = %owner_id, error = %e, "Document upload failed");
                self.record_error(e);
            }
        }

        result
    }

    /// Fetch the file's bytes. Failures are recorded in `last_error` only.
    pub async fn download(&self, record: &DocumentRecord) -> Option<DownloadedFile> {
        let result = self
            .blobs
            .download(&record.storage_path)
            .await
            .map_err(DocumentError::Download);
        record_result("download", &result);

        match result {
            Ok(bytes) => {
                tracing::debug!(document_id = %record.id, size = bytes.len(), "Document downloaded");
                Some(DownloadedFile {
                    file_name: record.file_name.clone(),
                    mime_type: record.mime_type.clone(),
                    bytes,
                })
            }
            Err(e) => {
                tracing::error!(
                    document_id = %record.id,
                    storage_path = %record.storage_path,
                    error = %e,
                    "Failed to download document"
                );
                self.record_error(&e);
                None
            }
        }
    }

    /// Remove the blob, then the metadata row, then the local entry.
    pub async fn delete(&self, record: &DocumentRecord) -> Result<(), DocumentError> {
        let _permit = self.acquire().await;
        let _loading = self.begin();

        let result = self.remove_document(record).await;
        record_result("delete", &result);

        match &result {
            Ok(()) => {
                tracing::info!(document_id = %record.id, "Document deleted");
                self.snapshot.send_modify(|s| s.documents.retain(|d| d.id != record.id));
            }
            Err(e) => {
                tracing::error!(document_id = %record.id, error = %e, "Failed to delete document");
                self.record_error(e);
            }
        }

        result
    }

    async fn load(
        &self,
        scope_key: &str,
        owner_id: Option<&str>,
    ) -> Result<Vec<DocumentRecord>, DocumentError> {
        if scope_key.trim().is_empty() {
            return Err(DocumentError::Validation(AppError::BadRequest(
                anyhow::anyhow!("scope key must not be empty"),
            )));
        }
        let segments =
            std::iter::once(("scope key", scope_key)).chain(owner_id.map(|o| ("owner id", o)));
        for (field, value) in segments {
            if validate_path_segment(value).is_err() {
                return Err(DocumentError::Validation(AppError::BadRequest(
                    anyhow::anyhow!("{} {:?} is not a valid path segment", field, value),
                )));
            }
        }

        let query = DocumentQuery::new(scope_key, owner_id.map(str::to_string));
        self.table.select(&query).await.map_err(DocumentError::Fetch)
    }

    async fn store_document(
        &self,
        file: FileUpload,
        scope_key: &str,
        owner_id: &str,
        description: Option<&str>,
    ) -> Result<DocumentRecord, DocumentError> {
        UploadRequest {
            scope_key: scope_key.to_string(),
            owner_id: owner_id.to_string(),
            file_name: file.name.clone(),
        }
        .validate()?;

        let storage_path =
            StoragePath::new(scope_key, owner_id, Utc::now().timestamp_millis(), &file.name)
                .to_string();
        let file_size_bytes = file.size();
        let mime_type = if file.mime_type.is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            file.mime_type.clone()
        };

        tracing::info!(
            storage_path = %storage_path,
            filename = %file.name,
            size = file_size_bytes,
            "Document upload started"
        );

        self.blobs
            .upload(&storage_path, file.bytes, &mime_type)
            .await
            .map_err(DocumentError::Upload)?;
        self.set_progress(50);

        let row = NewDocumentRow {
            owner_id: owner_id.to_string(),
            scope_key: scope_key.to_string(),
            file_name: file.name,
            file_size_bytes,
            mime_type,
            storage_path: storage_path.clone(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        };

        match self.table.insert(row).await {
            Ok(record) => Ok(record),
            Err(source) => {
                tracing::warn!(
                    storage_path = %storage_path,
                    error = %source,
                    "Metadata insert failed after the file was stored"
                );
                if self.options.consistency == ConsistencyPolicy::Compensate {
                    self.remove_orphan_blob(&storage_path).await;
                }
                Err(DocumentError::Insert {
                    orphan_path: storage_path,
                    source,
                })
            }
        }
    }

    async fn remove_orphan_blob(&self, storage_path: &str) {
        match self.blobs.delete(&[storage_path.to_string()]).await {
            Ok(()) => tracing::info!(storage_path = %storage_path, "Removed orphaned file"),
            Err(e) => tracing::warn!(
                storage_path = %storage_path,
                error = %e,
                "Could not remove orphaned file"
            ),
        }
    }

    async fn remove_document(&self, record: &DocumentRecord) -> Result<(), DocumentError> {
        self.blobs
            .delete(&[record.storage_path.clone()])
            .await
            .map_err(|source| DocumentError::Delete {
                phase: DeletePhase::Blob,
                source,
            })?;

        self.table.delete(&record.id).await.map_err(|source| {
            tracing::warn!(
                document_id = %record.id,
                storage_path = %record.storage_path,
                "File removed but metadata row remains"
            );
            DocumentError::Delete {
                phase: DeletePhase::Metadata,
                source,
            }
        })
    }

    async fn acquire(&self) -> Option<MutexGuard<'_, ()>> {
        if self.options.serialize_operations {
            Some(self.op_gate.lock().await)
        } else {
            None
        }
    }

    fn begin(&self) -> LoadingGuard<'_> {
        self.snapshot.send_modify(|s| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            s.state.is_loading = true;
            s.state.last_error = None;
        });
        LoadingGuard {
            snapshot: &self.snapshot,
            in_flight: &self.in_flight,
        }
    }

    fn set_progress(&self, percent: u8) {
        self.snapshot.send_modify(|s| s.state.upload_progress_percent = percent);
    }

    fn record_error(&self, error: &DocumentError) {
        let message = error.to_string();
        self.snapshot.send_modify(|s| s.state.last_error = Some(message));
    }
}
