// lib/src/config/config_structs.rs
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use models::{Role, DEFAULT_USER_ID};
use serde::{Deserialize, Serialize};

use crate::config::config_constants::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageEngineType {
    #[default]
    InMemory,
    Http,
}

impl FromStr for StorageEngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in-memory" | "inmemory" | "memory" => Ok(StorageEngineType::InMemory),
            "http" | "remote" => Ok(StorageEngineType::Http),
            other => Err(format!("unknown storage engine '{}'", other)),
        }
    }
}

impl fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngineType::InMemory => write!(f, "in-memory"),
            StorageEngineType::Http => write!(f, "http"),
        }
    }
}

/// Which backend holds the canonical copy of a single patient record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordBackendKind {
    #[default]
    ObjectStorage,
    DocumentDatabase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheEngineType {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub engine: StorageEngineType,
    pub url: String,
    pub anon_key: String,
    pub bucket: String,
    pub list_limit: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            engine: StorageEngineType::default(),
            url: String::new(),
            anon_key: String::new(),
            bucket: DEFAULT_BUCKET.to_string(),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSettings {
    pub backend: RecordBackendKind,
    pub table: String,
}

impl Default for RecordSettings {
    fn default() -> Self {
        RecordSettings {
            backend: RecordBackendKind::default(),
            table: DEFAULT_RECORDS_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub engine: CacheEngineType,
    pub path: PathBuf,
    pub capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            engine: CacheEngineType::default(),
            path: PathBuf::from(DEFAULT_CACHE_PATH_RELATIVE),
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    /// Cap on concurrently processed record blobs. Unbounded when unset.
    pub max_in_flight: Option<usize>,
    pub default_scope: String,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        AggregationSettings {
            max_in_flight: None,
            default_scope: DEFAULT_USER_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub credentials: BTreeMap<Role, Credential>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let demo = |email: &str| Credential {
            email: email.to_string(),
            password: "password123".to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
        };
        let mut credentials = BTreeMap::new();
        credentials.insert(Role::User, demo("user@example.com"));
        credentials.insert(Role::Doctor, demo("doctor@example.com"));
        credentials.insert(Role::Admin, demo("admin@example.com"));
        AuthSettings { credentials }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedWalletConfig {
    pub storage: StorageSettings,
    pub records: RecordSettings,
    pub cache: CacheSettings,
    pub aggregation: AggregationSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedWalletConfigWrapper {
    #[serde(default)]
    pub medwallet: MedWalletConfig,
}
