use crate::dtos::DocumentQuery;
use crate::models::{DocumentRecord, NewDocumentRow};
use crate::services::gateway::GatewayClient;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use service_core::error::AppError;
use service_core::http::ensure_success;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Relational table holding one metadata row per document.
#[async_trait]
pub trait MetadataTable: Send + Sync {
    /// Rows matching the query, ordered by `uploaded_at` descending.
    async fn select(&self, query: &DocumentQuery) -> Result<Vec<DocumentRecord>, AppError>;
    /// Insert one row and return it as stored.
    async fn insert(&self, row: NewDocumentRow) -> Result<DocumentRecord, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

/// Table reached through the gateway's REST interface.
#[derive(Clone)]
pub struct RestMetadataTable {
    gateway: GatewayClient,
    table: String,
}

impl RestMetadataTable {
    pub fn new(gateway: GatewayClient, table: impl Into<String>) -> Self {
        Self {
            gateway,
            table: table.into(),
        }
    }

    fn table_url(&self) -> Result<reqwest::Url, AppError> {
        self.gateway.url(["rest", "v1", self.table.as_str()])
    }
}

#[async_trait]
impl MetadataTable for RestMetadataTable {
    async fn select(&self, query: &DocumentQuery) -> Result<Vec<DocumentRecord>, AppError> {
        let response = self
            .gateway
            .request(Method::GET, self.table_url()?)
            .query(&query.to_query_pairs())
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn insert(&self, row: NewDocumentRow) -> Result<DocumentRecord, AppError> {
        let response = self
            .gateway
            .request(Method::POST, self.table_url()?)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;

        let mut inserted: Vec<DocumentRecord> = serde_json::from_str(&body)?;
        if inserted.is_empty() {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Insert into {} returned no row",
                self.table
            )));
        }
        Ok(inserted.remove(0))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let response = self
            .gateway
            .request(Method::DELETE, self.table_url()?)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Table kept in a single JSON file, for running without a remote backend.
pub struct JsonFileMetadataTable {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileMetadataTable {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    async fn load(&self) -> Result<Vec<DocumentRecord>, AppError> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save(&self, rows: &[DocumentRecord]) -> Result<(), AppError> {
        let data = serde_json::to_vec_pretty(rows)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataTable for JsonFileMetadataTable {
    async fn select(&self, query: &DocumentQuery) -> Result<Vec<DocumentRecord>, AppError> {
        let _guard = self.lock.lock().await;
        let mut rows: Vec<DocumentRecord> = self
            .load()
            .await?
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(rows)
    }

    async fn insert(&self, row: NewDocumentRow) -> Result<DocumentRecord, AppError> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load().await?;

        if rows.iter().any(|r| r.storage_path == row.storage_path) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "duplicate storage_path {}",
                row.storage_path
            )));
        }

        let record = row.into_record(Uuid::new_v4().to_string(), Utc::now());
        rows.push(record.clone());
        self.save(&rows).await?;
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load().await?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() != before {
            self.save(&rows).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(scope: &str, owner: &str, path: &str) -> NewDocumentRow {
        NewDocumentRow {
            owner_id: owner.to_string(),
            scope_key: scope.to_string(),
            file_name: "a.pdf".to_string(),
            file_size_bytes: 10,
            mime_type: "application/pdf".to_string(),
            storage_path: path.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn json_table_reads_a_missing_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metadata.json");
        let table = JsonFileMetadataTable::new(&path).await.unwrap();

        let rows = table.select(&DocumentQuery::new("AAPL", None)).await.unwrap();

        assert!(rows.is_empty());
        assert!(fs::try_exists(dir.path().join("nested")).await.unwrap());
        assert!(!fs::try_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn json_table_filters_and_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonFileMetadataTable::new(dir.path().join("metadata.json"))
            .await
            .unwrap();

        let first = table.insert(row("AAPL", "u1", "AAPL/u1/1_a.pdf")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = table.insert(row("AAPL", "u2", "AAPL/u2/2_a.pdf")).await.unwrap();
        table.insert(row("MSFT", "u1", "MSFT/u1/3_a.pdf")).await.unwrap();

        let all = table.select(&DocumentQuery::new("AAPL", None)).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

        let mine = table
            .select(&DocumentQuery::new("AAPL", Some("u1".to_string())))
            .await
            .unwrap();
        assert_eq!(mine, vec![first]);
    }

    #[tokio::test]
    async fn json_table_rejects_duplicate_paths_and_deletes_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonFileMetadataTable::new(dir.path().join("nested/metadata.json"))
            .await
            .unwrap();

        let record = table.insert(row("TSLA", "u1", "TSLA/u1/1_a.pdf")).await.unwrap();
        let err = table
            .insert(row("TSLA", "u1", "TSLA/u1/1_a.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        table.delete(&record.id).await.unwrap();
        table.delete(&record.id).await.unwrap();
        let rows = table.select(&DocumentQuery::new("TSLA", None)).await.unwrap();
        assert!(rows.is_empty());
    }
}
