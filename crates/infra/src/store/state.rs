//! Whole-inventory state shared by the in-memory and JSON file stores.
//!
//! All operations either fully apply or leave the state untouched.

use chrono::{DateTime, Utc};

use gatepass_core::{DomainError, Entity, ProductId};
use gatepass_inventory::{GatePass, NewProduct, Product, ReconciliationMode, ReconciliationPlan, reconcile};

use super::{IntakeOutcome, StoreError, StoreResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryState {
    products: Vec<Product>,
    gate_passes: Vec<GatePass>,
}

impl InventoryState {
    pub fn new(products: Vec<Product>, gate_passes: Vec<GatePass>) -> Self {
        Self {
            products,
            gate_passes,
        }
    }

    /// Products in storage order (oldest insert first).
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Gate passes in storage order (oldest issue first).
    pub fn gate_passes(&self) -> &[GatePass] {
        &self.gate_passes
    }

    pub fn product(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id() == product_id)
    }

    /// Newest `createdAt` first; ties keep the later insert first.
    pub fn products_newest_first(&self) -> Vec<Product> {
        let mut out: Vec<Product> = self.products.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Newest `generatedAt` first; ties keep the later insert first.
    pub fn gate_passes_newest_first(&self) -> Vec<GatePass> {
        let mut out: Vec<GatePass> = self.gate_passes.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.generated_at().cmp(&a.generated_at()));
        out
    }

    pub fn receive_stock(
        &mut self,
        intake: NewProduct,
        candidate_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<IntakeOutcome> {
        intake.validate()?;

        if let Some(existing) = self.products.iter_mut().find(|p| intake.matches(p)) {
            existing.receive(intake.quantity, now)?;
            return Ok(IntakeOutcome {
                product: existing.clone(),
                created: false,
            });
        }

        if self.product(&candidate_id).is_some() {
            return Err(StoreError::DuplicateProductId(candidate_id));
        }

        let product = intake.into_product(candidate_id, now);
        self.products.push(product.clone());
        Ok(IntakeOutcome {
            product,
            created: true,
        })
    }

    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let product = self
            .products
            .iter_mut()
            .find(|p| &p.product_id == product_id)
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;
        product.override_quantity(quantity, now)?;
        Ok(product.clone())
    }

    pub fn delete_product(&mut self, product_id: &ProductId) -> StoreResult<()> {
        let before = self.products.len();
        self.products.retain(|p| &p.product_id != product_id);
        if self.products.len() == before {
            return Err(DomainError::not_found(format!("product {product_id}")).into());
        }
        Ok(())
    }

    pub fn issue_gate_pass(
        &mut self,
        gate_pass: GatePass,
        mode: ReconciliationMode,
    ) -> StoreResult<ReconciliationPlan> {
        if self.gate_passes.iter().any(|g| g.id() == gate_pass.id()) {
            return Err(StoreError::DuplicateGatePassNumber(gate_pass.id().clone()));
        }

        let plan = reconcile(mode, gate_pass.products(), |id| {
            self.product(id).map(|p| p.quantity)
        })?;

        plan.apply(&mut self.products, gate_pass.generated_at());
        self.gate_passes.push(gate_pass);
        Ok(plan)
    }
}
