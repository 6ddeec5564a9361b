use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub store: StoreConfig,
}

/// Remote gateway serving both the metadata table and the object storage.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub table: String,
    pub bucket: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub serialize_operations: bool,
    pub compensate_orphans: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Http,
}

impl DocumentConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = common_config.is_prod();

        let backend: StorageBackend = get_env("STORAGE_BACKEND", Some("local"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        // The gateway settings only matter when talking to the remote backend.
        let remote_required = is_prod || backend == StorageBackend::Http;

        Ok(DocumentConfig {
            common: common_config,
            backend: BackendConfig {
                base_url: get_env("DOCUMENTS_API_URL", Some("http://localhost:54321"), is_prod)?,
                api_key: Secret::new(get_env(
                    "DOCUMENTS_API_KEY",
                    if remote_required { None } else { Some("") },
                    is_prod,
                )?),
                table: get_env("DOCUMENTS_TABLE", Some("stock_documents"), is_prod)?,
                bucket: get_env("DOCUMENTS_BUCKET", Some("stock-documents"), is_prod)?,
                request_timeout_secs: parse_env("DOCUMENTS_REQUEST_TIMEOUT_SECS", 30)?,
            },
            storage: StorageConfig {
                backend,
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage"), is_prod)?,
            },
            store: StoreConfig {
                serialize_operations: parse_env("DOCUMENTS_SERIALIZE_OPERATIONS", false)?,
                compensate_orphans: parse_env("DOCUMENTS_COMPENSATE_ORPHANS", false)?,
            },
        })
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "http" | "remote" => Ok(StorageBackend::Http),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}
