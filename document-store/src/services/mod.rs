pub mod database;
pub mod gateway;
pub mod metrics;
pub mod storage;

pub use database::{JsonFileMetadataTable, MetadataTable, RestMetadataTable};
pub use gateway::GatewayClient;
pub use storage::{BlobStore, HttpBlobStore, LocalBlobStore};
