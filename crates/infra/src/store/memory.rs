use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gatepass_core::ProductId;
use gatepass_inventory::{GatePass, NewProduct, Product, ReconciliationMode};

use super::{InventoryState, InventoryStore, IntakeOutcome, IssuedGatePass, StoreError, StoreResult};

/// In-memory inventory store.
///
/// Intended for tests/dev. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<InventoryState>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            state: RwLock::new(InventoryState::new(products, Vec::new())),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&InventoryState) -> T) -> StoreResult<T> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut InventoryState) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut state)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    fn backend(&self) -> &'static str {
        "In-memory"
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.read(InventoryState::products_newest_first)
    }

    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Option<Product>> {
        self.read(|s| s.product(product_id).cloned())
    }

    async fn receive_stock(
        &self,
        intake: NewProduct,
        candidate_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<IntakeOutcome> {
        self.write(|s| s.receive_stock(intake, candidate_id, now))
    }

    async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        self.write(|s| s.set_quantity(product_id, quantity, now))
    }

    async fn delete_product(&self, product_id: &ProductId) -> StoreResult<()> {
        self.write(|s| s.delete_product(product_id))
    }

    async fn list_gate_passes(&self) -> StoreResult<Vec<GatePass>> {
        self.read(InventoryState::gate_passes_newest_first)
    }

    async fn issue_gate_pass(
        &self,
        gate_pass: GatePass,
        mode: ReconciliationMode,
    ) -> StoreResult<IssuedGatePass> {
        self.write(|s| {
            let plan = s.issue_gate_pass(gate_pass.clone(), mode)?;
            Ok(IssuedGatePass { gate_pass, plan })
        })
    }
}
