//! Inventory storage abstraction and its backends.
//!
//! Every backend commits each mutation atomically and serializes mutations, so
//! two concurrent gate passes touching one product cannot lose an update:
//!
//! - `InMemoryInventoryStore`: one lock around the state (tests/dev).
//! - `JsonFileStore`: in-memory mirror, written through to two JSON files.
//! - `PostgresInventoryStore`: one SQL transaction per mutation, row locks on products.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use gatepass_core::{DomainError, GatePassNumber, ProductId};
use gatepass_inventory::{GatePass, NewProduct, Product, ReconciliationMode, ReconciliationPlan};

pub mod file;
pub mod memory;
pub mod postgres;
pub mod state;

pub use file::JsonFileStore;
pub use memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use state::InventoryState;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Business rule rejected the operation (validation, not found, strict reconciliation).
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("product id already in use: {0}")]
    DuplicateProductId(ProductId),

    #[error("gate pass number already in use: {0}")]
    DuplicateGatePassNumber(GatePassNumber),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("lock poisoned")]
    LockPoisoned,
}

/// Result of a product intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeOutcome {
    pub product: Product,
    /// `true` when a new product record was created, `false` when stock was replenished.
    pub created: bool,
}

/// Result of committing a gate pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedGatePass {
    pub gate_pass: GatePass,
    pub plan: ReconciliationPlan,
}

/// Product + gate pass repository.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Short backend label (reported by the health endpoint).
    fn backend(&self) -> &'static str;

    /// All products, newest first.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Option<Product>>;

    /// Replenish the product matching `intake` (name case-insensitive, type, origin),
    /// or create it under `candidate_id`.
    ///
    /// Fails with `DuplicateProductId` if a new product is needed and `candidate_id`
    /// is taken; the caller retries with a fresh id.
    async fn receive_stock(
        &self,
        intake: NewProduct,
        candidate_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<IntakeOutcome>;

    async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Product>;

    async fn delete_product(&self, product_id: &ProductId) -> StoreResult<()>;

    /// All gate passes, newest first.
    async fn list_gate_passes(&self) -> StoreResult<Vec<GatePass>>;

    /// Reconcile stock against the gate pass manifest and append the gate pass,
    /// as one atomic unit.
    async fn issue_gate_pass(
        &self,
        gate_pass: GatePass,
        mode: ReconciliationMode,
    ) -> StoreResult<IssuedGatePass>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        (**self).list_products().await
    }

    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Option<Product>> {
        (**self).get_product(product_id).await
    }

    async fn receive_stock(
        &self,
        intake: NewProduct,
        candidate_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<IntakeOutcome> {
        (**self).receive_stock(intake, candidate_id, now).await
    }

    async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        (**self).set_quantity(product_id, quantity, now).await
    }

    async fn delete_product(&self, product_id: &ProductId) -> StoreResult<()> {
        (**self).delete_product(product_id).await
    }

    async fn list_gate_passes(&self) -> StoreResult<Vec<GatePass>> {
        (**self).list_gate_passes().await
    }

    async fn issue_gate_pass(
        &self,
        gate_pass: GatePass,
        mode: ReconciliationMode,
    ) -> StoreResult<IssuedGatePass> {
        (**self).issue_gate_pass(gate_pass, mode).await
    }
}
