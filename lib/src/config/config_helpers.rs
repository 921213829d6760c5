// lib/src/config/config_helpers.rs
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use serde_json::Value;
use serde_yaml2 as serde_yaml;

use crate::config::config_constants::*;
use crate::config::config_structs::*;

pub fn load_config(config_file_path: Option<&str>) -> Result<MedWalletConfig> {
    let path_to_use = config_file_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH_RELATIVE));

    info!("Attempting to load MedWallet config from {:?}", path_to_use);

    let mut config = if path_to_use.exists() {
        let config_content = fs::read_to_string(&path_to_use)
            .context(format!("Failed to read config file: {}", path_to_use.display()))?;
        debug!("Config content: {}", config_content);
        parse_config(&config_content).map_err(|e| {
            error!("YAML parsing error at {:?}: {:?}", path_to_use, e);
            anyhow!("Failed to parse config YAML: {}", path_to_use.display())
        })?
    } else {
        warn!("Config file not found at {}. Using default config.", path_to_use.display());
        MedWalletConfig::default()
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<MedWalletConfig> {
    match serde_yaml::from_str::<MedWalletConfigWrapper>(content) {
        Ok(wrapper) => Ok(wrapper.medwallet),
        Err(e) => {
            if let Ok(partial) = serde_yaml::from_str::<Value>(content) {
                error!("Partial YAML parse: {:?}", partial);
            }
            Err(anyhow!("{:?}", e))
        }
    }
}

/// Connection details may come from the environment instead of the file.
pub fn apply_env_overrides<F>(config: &mut MedWalletConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_STORAGE_URL).filter(|v| !v.is_empty()) {
        config.storage.url = url;
        config.storage.engine = StorageEngineType::Http;
    }
    if let Some(key) = lookup(ENV_ANON_KEY).filter(|v| !v.is_empty()) {
        config.storage.anon_key = key;
    }
    if let Some(bucket) = lookup(ENV_BUCKET).filter(|v| !v.is_empty()) {
        config.storage.bucket = bucket;
    }
}

pub fn save_config(config: &MedWalletConfig, config_file_path: Option<&str>) -> Result<()> {
    let config_path = config_file_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH_RELATIVE));

    let wrapper = MedWalletConfigWrapper {
        medwallet: config.clone(),
    };
    let yaml_string = serde_yaml::to_string(&wrapper)
        .map_err(|e| anyhow!("Failed to serialize MedWalletConfig to YAML: {:?}", e))?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .context(format!("Failed to create parent directories for {}", config_path.display()))?;
    }
    fs::write(&config_path, yaml_string)
        .context(format!("Failed to write config to file: {}", config_path.display()))?;

    info!("Saved config to {}", config_path.display());
    Ok(())
}
