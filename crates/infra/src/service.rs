//! Application service: intake, quantity overrides and gate pass issuance.
//!
//! Composes an `InventoryStore` with the identifier generators and the configured
//! reconciliation mode. Stores do the atomic work; this layer validates input,
//! allocates identifiers (retrying on collisions) and maps failures into
//! `ServiceError`.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use gatepass_core::{DomainError, GatePassNumberGenerator, ProductId};
use gatepass_inventory::{GatePass, GatePassDraft, NewProduct, Product, ReconciliationMode};

use crate::store::{IntakeOutcome, InventoryStore, StoreError};

/// How many fresh identifiers to try before giving up on a collision.
const MAX_ID_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Store(String),
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound(msg) => ServiceError::NotFound(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(e) => e.into(),
            StoreError::DuplicateProductId(_) | StoreError::DuplicateGatePassNumber(_) => {
                ServiceError::Conflict(err.to_string())
            }
            other => ServiceError::Store(other.to_string()),
        }
    }
}

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySummary {
    pub products: usize,
    pub gate_passes: usize,
    pub backend: &'static str,
}

#[derive(Debug)]
pub struct InventoryService<S> {
    store: S,
    mode: ReconciliationMode,
    numbers: GatePassNumberGenerator,
}

impl<S> InventoryService<S>
where
    S: InventoryStore,
{
    pub fn new(store: S, mode: ReconciliationMode) -> Self {
        Self {
            store,
            mode,
            numbers: GatePassNumberGenerator::new(),
        }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products().await?)
    }

    pub async fn product(&self, product_id: &ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {product_id}")))
    }

    /// Product intake: replenish the matching product or create a new one.
    #[instrument(skip(self, intake), fields(name = %intake.name, quantity = intake.quantity), err)]
    pub async fn receive(&self, intake: NewProduct) -> Result<IntakeOutcome, ServiceError> {
        intake.validate()?;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let now = Utc::now();
            let candidate = ProductId::generate(now);
            match self.store.receive_stock(intake.clone(), candidate, now).await {
                Ok(outcome) => {
                    info!(
                        product_id = %outcome.product.product_id,
                        quantity = outcome.product.quantity,
                        created = outcome.created,
                        "product intake recorded"
                    );
                    return Ok(outcome);
                }
                Err(StoreError::DuplicateProductId(id)) => {
                    warn!(%id, attempt, "generated product id already in use; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict(
            "could not allocate a unique product id".to_string(),
        ))
    }

    #[instrument(skip(self), err)]
    pub async fn override_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Product, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::Validation("quantity cannot be negative".to_string()));
        }
        let product = self.store.set_quantity(product_id, quantity, Utc::now()).await?;
        info!(%product_id, quantity, "product quantity overridden");
        Ok(product)
    }

    #[instrument(skip(self), err)]
    pub async fn remove_product(&self, product_id: &ProductId) -> Result<(), ServiceError> {
        self.store.delete_product(product_id).await?;
        info!(%product_id, "product removed");
        Ok(())
    }

    pub async fn list_gate_passes(&self) -> Result<Vec<GatePass>, ServiceError> {
        Ok(self.store.list_gate_passes().await?)
    }

    /// Gate pass issuance: number the pass, reconcile stock and persist both atomically.
    #[instrument(skip(self, draft), fields(lines = draft.products.len(), mode = ?self.mode), err)]
    pub async fn issue(&self, draft: GatePassDraft) -> Result<GatePass, ServiceError> {
        draft.validate()?;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let now = Utc::now();
            let gate_pass = draft.clone().issue(self.numbers.next(now), now)?;
            match self.store.issue_gate_pass(gate_pass, self.mode).await {
                Ok(issued) => {
                    if !issued.plan.skipped().is_empty() {
                        warn!(
                            number = %issued.gate_pass.gate_pass_number(),
                            skipped = ?issued.plan.skipped(),
                            "gate pass references unknown products; stock left untouched for them"
                        );
                    }
                    info!(
                        number = %issued.gate_pass.gate_pass_number(),
                        units = issued.gate_pass.total_units(),
                        stock_changes = issued.plan.changes().len(),
                        "gate pass issued"
                    );
                    return Ok(issued.gate_pass);
                }
                Err(StoreError::DuplicateGatePassNumber(number)) => {
                    warn!(%number, attempt, "gate pass number already in use; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict(
            "could not allocate a unique gate pass number".to_string(),
        ))
    }

    pub async fn summary(&self) -> Result<InventorySummary, ServiceError> {
        Ok(InventorySummary {
            products: self.store.list_products().await?.len(),
            gate_passes: self.store.list_gate_passes().await?.len(),
            backend: self.store.backend(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryInventoryStore;
    use gatepass_inventory::{
        DEFAULT_DESTINATION, DEFAULT_GATE_PASS_ORIGIN, ProductType, ShipmentLineItem, TransportMode,
    };
    use std::sync::Arc;

    fn service(mode: ReconciliationMode) -> InventoryService<Arc<InMemoryInventoryStore>> {
        InventoryService::new(Arc::new(InMemoryInventoryStore::new()), mode)
    }

    fn intake(name: &str, product_type: ProductType, origin: &str, quantity: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            transport: TransportMode::Road,
            description: None,
            quantity,
            origin: origin.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            product_type,
            remarks: None,
        }
    }

    fn draft(lines: &[(&ProductId, i64)]) -> GatePassDraft {
        GatePassDraft {
            date: "2025-05-05".to_string(),
            origin: DEFAULT_GATE_PASS_ORIGIN.to_string(),
            destination: "Eluru".to_string(),
            products: lines
                .iter()
                .map(|(id, qty)| ShipmentLineItem {
                    product_id: (*id).clone(),
                    name: "Widget".to_string(),
                    transport: Some(TransportMode::Road),
                    description: None,
                    selected_quantity: *qty,
                    product_type: Some(ProductType::Industrial),
                    remarks: Some("urgent".to_string()),
                })
                .collect(),
            prepared_by: "Clerk".to_string(),
            checked_by: None,
            authorized_by: None,
        }
    }

    #[tokio::test]
    async fn intake_twice_for_same_identity_merges() {
        let svc = service(ReconciliationMode::Lenient);
        let first = svc.receive(intake("Widget", ProductType::Industrial, "X", 5)).await.unwrap();
        let second = svc.receive(intake("Widget", ProductType::Industrial, "X", 5)).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        let products = svc.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].quantity, 10);
        assert!(products[0].product_id.as_str().starts_with("PRD-"));
    }

    #[tokio::test]
    async fn different_origin_creates_separate_product() {
        let svc = service(ReconciliationMode::Lenient);
        svc.receive(intake("Widget", ProductType::Industrial, "X", 5)).await.unwrap();
        svc.receive(intake("Widget", ProductType::Industrial, "Y", 5)).await.unwrap();
        assert_eq!(svc.list_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn full_shipment_deletes_product_and_keeps_line_item() {
        let svc = service(ReconciliationMode::Lenient);
        let product = svc
            .receive(intake("Wireless Headphones", ProductType::Electronics, "Mumbai GIS", 150))
            .await
            .unwrap()
            .product;

        let pass = svc.issue(draft(&[(&product.product_id, 150)])).await.unwrap();

        assert!(svc.list_products().await.unwrap().is_empty());
        assert_eq!(pass.products()[0].product_id, product.product_id);
        assert_eq!(pass.products()[0].selected_quantity, 150);
        assert!(pass.gate_pass_number().as_str().starts_with("GP-"));
    }

    #[tokio::test]
    async fn partial_shipment_decrements_stock() {
        let svc = service(ReconciliationMode::Lenient);
        let product = svc
            .receive(intake("Wireless Headphones", ProductType::Electronics, "Mumbai GIS", 150))
            .await
            .unwrap()
            .product;

        svc.issue(draft(&[(&product.product_id, 50)])).await.unwrap();

        let products = svc.list_products().await.unwrap();
        assert_eq!(products[0].quantity, 100);
    }

    #[tokio::test]
    async fn lenient_issue_with_unknown_product_succeeds_without_mutation() {
        let svc = service(ReconciliationMode::Lenient);
        let product = svc
            .receive(intake("Widget", ProductType::Industrial, "X", 10))
            .await
            .unwrap()
            .product;
        let ghost: ProductId = "PRD-ZZZ-000000".parse().unwrap();

        svc.issue(draft(&[(&ghost, 3)])).await.unwrap();

        let products = svc.list_products().await.unwrap();
        assert_eq!(products, vec![product]);
        assert_eq!(svc.list_gate_passes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn strict_issue_with_unknown_product_persists_nothing() {
        let svc = service(ReconciliationMode::Strict);
        let ghost: ProductId = "PRD-ZZZ-000000".parse().unwrap();

        let err = svc.issue(draft(&[(&ghost, 3)])).await.unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(svc.list_gate_passes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gate_pass_is_unaffected_by_later_product_changes() {
        let svc = service(ReconciliationMode::Lenient);
        let product = svc
            .receive(intake("Widget", ProductType::Industrial, "X", 100))
            .await
            .unwrap()
            .product;
        let issued = svc.issue(draft(&[(&product.product_id, 10)])).await.unwrap();
        let before = serde_json::to_vec(&issued).unwrap();

        svc.override_quantity(&product.product_id, 3).await.unwrap();
        svc.receive(intake("Widget", ProductType::Industrial, "X", 7)).await.unwrap();
        svc.remove_product(&product.product_id).await.unwrap();

        let after = svc.list_gate_passes().await.unwrap();
        assert_eq!(serde_json::to_vec(&after[0]).unwrap(), before);
    }

    #[tokio::test]
    async fn rapid_issuance_never_reuses_numbers() {
        let svc = service(ReconciliationMode::Lenient);
        let product = svc
            .receive(intake("Widget", ProductType::Industrial, "X", 1_000))
            .await
            .unwrap()
            .product;

        for _ in 0..20 {
            svc.issue(draft(&[(&product.product_id, 1)])).await.unwrap();
        }

        let mut numbers: Vec<_> = svc
            .list_gate_passes()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.gate_pass_number().clone())
            .collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 20);
        assert_eq!(svc.list_products().await.unwrap()[0].quantity, 980);
    }

    #[tokio::test]
    async fn concurrent_issuances_do_not_lose_updates() {
        let svc = Arc::new(service(ReconciliationMode::Lenient));
        let product = svc
            .receive(intake("Widget", ProductType::Industrial, "X", 100))
            .await
            .unwrap()
            .product;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let svc = svc.clone();
            let id = product.product_id.clone();
            handles.push(tokio::spawn(async move {
                svc.issue(draft(&[(&id, 5)])).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(svc.list_products().await.unwrap()[0].quantity, 50);
    }

    #[tokio::test]
    async fn override_and_remove_validate_input() {
        let svc = service(ReconciliationMode::Lenient);
        let ghost: ProductId = "PRD-ZZZ-000000".parse().unwrap();

        assert!(matches!(
            svc.override_quantity(&ghost, -1).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.override_quantity(&ghost, 1).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(svc.remove_product(&ghost).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.product(&ghost).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn summary_reports_counts_and_backend() {
        let svc = service(ReconciliationMode::Lenient);
        svc.receive(intake("Widget", ProductType::Industrial, "X", 1)).await.unwrap();

        let summary = svc.summary().await.unwrap();
        assert_eq!(summary.products, 1);
        assert_eq!(summary.gate_passes, 0);
        assert_eq!(summary.backend, "In-memory");
    }
}
