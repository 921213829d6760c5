// lib/src/storage_engine/mod.rs
pub mod http_storage;
pub mod inmemory_storage;
pub mod storage_engine;

pub use http_storage::{HttpDocumentStorage, HttpObjectStorage};
pub use inmemory_storage::{InMemoryDocumentStorage, InMemoryObjectStorage};
pub use storage_engine::{
    build_document_storage, build_object_storage, DocumentStorage, ObjectEntry, ObjectStorage,
    UploadOptions,
};
