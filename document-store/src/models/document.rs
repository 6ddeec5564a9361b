use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata row describing one uploaded attachment.
///
/// Field names follow the remote table's columns on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    #[serde(rename = "symbol_root")]
    pub scope_key: String,
    pub file_name: String,
    #[serde(rename = "file_size")]
    pub file_size_bytes: u64,
    #[serde(rename = "file_type")]
    pub mime_type: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Insert payload; `id` and `uploaded_at` are assigned by the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDocumentRow {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    #[serde(rename = "symbol_root")]
    pub scope_key: String,
    pub file_name: String,
    #[serde(rename = "file_size")]
    pub file_size_bytes: u64,
    #[serde(rename = "file_type")]
    pub mime_type: String,
    pub storage_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewDocumentRow {
    /// Materialize the row the way the table would after insertion.
    pub fn into_record(self, id: String, uploaded_at: DateTime<Utc>) -> DocumentRecord {
        DocumentRecord {
            id,
            owner_id: self.owner_id,
            scope_key: self.scope_key,
            file_name: self.file_name,
            file_size_bytes: self.file_size_bytes,
            mime_type: self.mime_type,
            storage_path: self.storage_path,
            uploaded_at,
            description: self.description,
        }
    }
}
