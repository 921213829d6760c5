// lib/src/database.rs
use std::sync::Arc;

use caching::{CacheMirror, LocalStore, MemoryLocalStore, SledLocalStore};
use log::info;
use models::errors::RecordResult;
use models::RecordScope;

use crate::aggregation::PatientAggregator;
use crate::config::{CacheEngineType, CacheSettings, MedWalletConfig, RecordBackendKind};
use crate::medication::MedicationTimetable;
use crate::patient_sync::PatientSync;
use crate::record_store::RecordStore;
use crate::storage_engine::{build_document_storage, build_object_storage};

pub fn build_local_store(settings: &CacheSettings) -> RecordResult<Arc<dyn LocalStore>> {
    Ok(match settings.engine {
        CacheEngineType::Sled => {
            if let Some(parent) = settings.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SledLocalStore::open(&settings.path)?)
        }
        CacheEngineType::Memory => Arc::new(MemoryLocalStore::new(settings.capacity)),
    })
}

/// Every service of the wallet wired from one configuration.
#[derive(Clone)]
pub struct MedWallet {
    pub config: MedWalletConfig,
    pub store: Arc<RecordStore>,
    pub cache: CacheMirror,
    pub aggregator: PatientAggregator,
    pub sync: PatientSync,
    pub medications: MedicationTimetable,
}

impl MedWallet {
    pub fn new(config: MedWalletConfig) -> RecordResult<Self> {
        let local = build_local_store(&config.cache)?;
        Self::with_local_store(config, local)
    }

    pub fn with_local_store(config: MedWalletConfig, local: Arc<dyn LocalStore>) -> RecordResult<Self> {
        let objects = build_object_storage(&config.storage)?;
        let documents = match config.records.backend {
            RecordBackendKind::DocumentDatabase => Some(build_document_storage(&config.storage)?),
            RecordBackendKind::ObjectStorage => None,
        };
        let store = Arc::new(RecordStore::new(objects.clone(), documents, config.records.clone())?);
        let cache = CacheMirror::new(local);
        let max_in_flight = config.aggregation.max_in_flight;
        info!(
            "MedWallet ready: {} objects, {:?} records, {} cache",
            objects.get_type(),
            config.records.backend,
            match config.cache.engine {
                CacheEngineType::Sled => "sled",
                CacheEngineType::Memory => "memory",
            }
        );
        Ok(MedWallet {
            aggregator: PatientAggregator::new(store.clone(), max_in_flight),
            sync: PatientSync::new(store.clone(), cache.clone()),
            medications: MedicationTimetable::new(objects, max_in_flight),
            store,
            cache,
            config,
        })
    }

    /// `requested` when given, otherwise the configured default scope.
    pub fn scope(&self, requested: Option<&str>) -> RecordResult<RecordScope> {
        let name = requested.unwrap_or(&self.config.aggregation.default_scope);
        Ok(RecordScope::new(name)?)
    }
}
