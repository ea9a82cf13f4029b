//! Infrastructure layer: storage backends, application service, configuration.

pub mod config;
pub mod seed;
pub mod service;
pub mod store;

pub use config::{AppConfig, ConfigError, StorageBackend};
pub use service::{InventoryService, InventorySummary, ServiceError};
pub use store::{InventoryStore, StoreError, StoreResult};
