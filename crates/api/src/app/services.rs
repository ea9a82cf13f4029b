use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use gatepass_infra::store::{InMemoryInventoryStore, JsonFileStore, PostgresInventoryStore};
use gatepass_infra::{AppConfig, InventoryService, InventoryStore, StorageBackend};

/// Type-erased store so one router serves every backend.
pub type DynStore = Arc<dyn InventoryStore>;

pub type AppServices = InventoryService<DynStore>;

/// Open the configured backend and wrap it in the inventory service.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: DynStore = match config.storage {
        StorageBackend::Memory => {
            if config.seed_default_products {
                let now = chrono::Utc::now();
                Arc::new(InMemoryInventoryStore::with_products(
                    gatepass_infra::seed::default_products(now),
                ))
            } else {
                Arc::new(InMemoryInventoryStore::new())
            }
        }
        StorageBackend::File => Arc::new(
            JsonFileStore::open(&config.data_dir, config.seed_default_products)
                .await
                .with_context(|| format!("failed to open data dir {}", config.data_dir.display()))?,
        ),
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORAGE_BACKEND=postgres")?;
            Arc::new(
                PostgresInventoryStore::connect(url)
                    .await
                    .context("failed to connect to Postgres")?,
            )
        }
    };

    info!(backend = store.backend(), mode = ?config.reconciliation_mode, "inventory store ready");
    Ok(InventoryService::new(store, config.reconciliation_mode))
}

/// In-memory services for tests and local experiments.
pub fn in_memory_services(mode: gatepass_inventory::ReconciliationMode) -> AppServices {
    let store: DynStore = Arc::new(InMemoryInventoryStore::new());
    InventoryService::new(store, mode)
}
