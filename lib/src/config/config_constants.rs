// lib/src/config/config_constants.rs
pub const DEFAULT_CONFIG_PATH_RELATIVE: &str = "./config/medwallet.yaml";
pub const DEFAULT_CACHE_PATH_RELATIVE: &str = "./data/local_cache";
pub const DEFAULT_BUCKET: &str = "new";
pub const DEFAULT_RECORDS_TABLE: &str = "patients";
pub const DEFAULT_CACHE_CAPACITY: u64 = 1_024;
pub const DEFAULT_LIST_LIMIT: usize = 100;

pub const ENV_STORAGE_URL: &str = "MEDWALLET_STORAGE_URL";
pub const ENV_ANON_KEY: &str = "MEDWALLET_ANON_KEY";
pub const ENV_BUCKET: &str = "MEDWALLET_BUCKET";
