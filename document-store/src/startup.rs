use crate::config::{DocumentConfig, StorageBackend};
use crate::panel::DocumentsPanel;
use crate::services::{
    BlobStore, GatewayClient, HttpBlobStore, JsonFileMetadataTable, LocalBlobStore,
    MetadataTable, RestMetadataTable,
};
use crate::store::{ConsistencyPolicy, DocumentStore, StoreOptions};
use service_core::error::AppError;
use std::path::Path;
use std::sync::Arc;

const LOCAL_METADATA_FILE: &str = "metadata.json";

pub struct Application {
    config: DocumentConfig,
    store: Arc<DocumentStore>,
}

impl Application {
    pub async fn build(config: DocumentConfig) -> Result<Self, AppError> {
        let (table, blobs): (Arc<dyn MetadataTable>, Arc<dyn BlobStore>) =
            match config.storage.backend {
                StorageBackend::Local => {
                    let root = Path::new(&config.storage.local_path);
                    let blobs = LocalBlobStore::new(root.join("objects"))
                        .await
                        .map_err(|e| {
                            tracing::error!(
                                "Failed to initialize local storage at {}: {}",
                                config.storage.local_path,
                                e
                            );
                            e
                        })?;
                    let table = JsonFileMetadataTable::new(root.join(LOCAL_METADATA_FILE)).await?;
                    tracing::info!(path = %config.storage.local_path, "Using local document storage");
                    (Arc::new(table), Arc::new(blobs))
                }
                StorageBackend::Http => {
                    let gateway = GatewayClient::new(&config.backend).map_err(|e| {
                        tracing::error!("Failed to create gateway client: {}", e);
                        e
                    })?;
                    tracing::info!(
                        base_url = %config.backend.base_url,
                        table = %config.backend.table,
                        bucket = %config.backend.bucket,
                        "Using remote document storage"
                    );
                    (
                        Arc::new(RestMetadataTable::new(
                            gateway.clone(),
                            config.backend.table.clone(),
                        )),
                        Arc::new(HttpBlobStore::new(gateway, config.backend.bucket.clone())),
                    )
                }
            };

        let options = StoreOptions {
            serialize_operations: config.store.serialize_operations,
            consistency: if config.store.compensate_orphans {
                ConsistencyPolicy::Compensate
            } else {
                ConsistencyPolicy::LeaveOrphans
            },
        };

        Ok(Self {
            config,
            store: Arc::new(DocumentStore::with_options(table, blobs, options)),
        })
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<DocumentStore> {
        self.store.clone()
    }

    pub fn panel(&self, scope_key: &str, owner_id: &str) -> DocumentsPanel {
        DocumentsPanel::new(self.store.clone(), scope_key, owner_id)
    }
}
