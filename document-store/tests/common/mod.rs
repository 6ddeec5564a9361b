#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use document_store::dtos::DocumentQuery;
use document_store::models::{DocumentRecord, FileUpload, NewDocumentRow};
use document_store::services::{BlobStore, MetadataTable};
use document_store::store::{DocumentStore, StoreOptions};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const TEST_SCOPE: &str = "AAPL";
pub const TEST_OWNER: &str = "user1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCall {
    Select(DocumentQuery),
    Insert(String),
    Delete(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobCall {
    Upload(String),
    Download(String),
    Delete(Vec<String>),
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap()
}

/// Metadata table kept in memory. Inserted rows get increasing timestamps
/// so "newest first" is deterministic.
#[derive(Default)]
pub struct MemoryTable {
    rows: Mutex<Vec<DocumentRecord>>,
    calls: Mutex<Vec<TableCall>>,
    next_id: AtomicI64,
    pub fail_select: AtomicBool,
    pub fail_insert: AtomicBool,
    pub fail_delete: AtomicBool,
    select_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryTable {
    pub fn seed(&self, record: DocumentRecord) {
        self.rows.lock().unwrap().push(record);
    }

    pub fn rows(&self) -> Vec<DocumentRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<TableCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TableCall::Insert(_)))
            .count()
    }

    /// The next `select` computes its result, then waits for the returned
    /// handle to be notified before answering.
    pub fn hold_next_select(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.select_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl MetadataTable for MemoryTable {
    async fn select(&self, query: &DocumentQuery) -> Result<Vec<DocumentRecord>, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(TableCall::Select(query.clone()));
        let gate = self.select_gate.lock().unwrap().take();

        let result = if self.fail_select.load(Ordering::SeqCst) {
            Err(AppError::ServiceUnavailable)
        } else {
            let mut rows: Vec<_> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| query.matches(r))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
            Ok(rows)
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }

    async fn insert(&self, row: NewDocumentRow) -> Result<DocumentRecord, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(TableCall::Insert(row.storage_path.clone()));
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::BadGateway("insert rejected".to_string()));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = row.into_record(format!("doc-{}", n), base_time() + Duration::days(30 + n));
        self.rows.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(TableCall::Delete(id.to_string()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable);
        }
        self.rows.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobs {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<BlobCall>>,
    pub fail_upload: AtomicBool,
    pub fail_download: AtomicBool,
    pub fail_delete: AtomicBool,
    upload_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryBlobs {
    pub fn put(&self, path: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn calls(&self) -> Vec<BlobCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The next `upload` stores its object, then waits for the returned
    /// handle to be notified before answering.
    pub fn hold_next_upload(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.upload_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(&self, path: &str, data: Vec<u8>, _content_type: &str) -> Result<(), AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(BlobCall::Upload(path.to_string()));
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(AppError::BadGateway("storage unreachable".to_string()));
        }

        {
            let mut objects = self.objects.lock().unwrap();
            if objects.contains_key(path) {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "The resource already exists"
                )));
            }
            objects.insert(path.to_string(), data);
        }

        let gate = self.upload_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(BlobCall::Download(path.to_string()));
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable);
        }
        self.get(path)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Object not found")))
    }

    async fn delete(&self, paths: &[String]) -> Result<(), AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(BlobCall::Delete(paths.to_vec()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Forbidden(anyhow::anyhow!("delete not allowed")));
        }
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

pub struct TestStore {
    pub store: Arc<DocumentStore>,
    pub table: Arc<MemoryTable>,
    pub blobs: Arc<MemoryBlobs>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        let table = Arc::new(MemoryTable::default());
        let blobs = Arc::new(MemoryBlobs::default());
        let store = Arc::new(DocumentStore::with_options(
            table.clone(),
            blobs.clone(),
            options,
        ));
        Self {
            store,
            table,
            blobs,
        }
    }

    /// Put a record and its blob on the "server".
    pub fn seed(&self, record: &DocumentRecord) {
        self.table.seed(record.clone());
        self.blobs.put(&record.storage_path, b"seeded contents");
    }
}

pub fn record(id: &str, scope: &str, owner: &str, file_name: &str, minutes: i64) -> DocumentRecord {
    record_with_type(id, scope, owner, file_name, "application/pdf", minutes)
}

pub fn record_with_type(
    id: &str,
    scope: &str,
    owner: &str,
    file_name: &str,
    mime_type: &str,
    minutes: i64,
) -> DocumentRecord {
    let uploaded_at = base_time() + Duration::minutes(minutes);
    DocumentRecord {
        id: id.to_string(),
        owner_id: owner.to_string(),
        scope_key: scope.to_string(),
        file_name: file_name.to_string(),
        file_size_bytes: 15,
        mime_type: mime_type.to_string(),
        storage_path: format!(
            "{}/{}/{}_{}",
            scope,
            owner,
            uploaded_at.timestamp_millis(),
            file_name
        ),
        uploaded_at,
        description: None,
    }
}

pub fn pdf(name: &str) -> FileUpload {
    FileUpload::new(name, "application/pdf", b"%PDF-1.7 test".to_vec())
}

/// Check `path` against `{scope}/{owner}/<digits>_{file_name}`.
pub fn assert_storage_path(path: &str, scope: &str, owner: &str, file_name: &str) {
    let prefix = format!("{}/{}/", scope, owner);
    let rest = path
        .strip_prefix(&prefix)
        .unwrap_or_else(|| panic!("{path} does not start with {prefix}"));
    let (millis, name) = rest
        .split_once('_')
        .unwrap_or_else(|| panic!("{path} has no timestamp separator"));
    assert!(
        !millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()),
        "{path} has a non-numeric timestamp"
    );
    assert_eq!(name, file_name);
}
