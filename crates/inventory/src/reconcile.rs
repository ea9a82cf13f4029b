//! Stock reconciliation: how issuing a gate pass changes product stock.
//!
//! `reconcile` is pure. It walks the manifest in order against a stock lookup
//! and returns a `ReconciliationPlan`; stores commit the plan together with the
//! gate pass in one atomic step.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use gatepass_core::{DomainError, DomainResult, ProductId};

use crate::gate_pass::ShipmentLineItem;
use crate::product::Product;

/// What to do with a line item that cannot be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconciliationMode {
    /// Unknown products are skipped; selections may exceed stock (the product is removed).
    #[default]
    Lenient,
    /// Unknown products and selections above stock fail the whole issuance.
    Strict,
}

impl core::str::FromStr for ReconciliationMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(DomainError::validation(format!(
                "reconciliation mode must be lenient or strict (got {other:?})"
            ))),
        }
    }
}

/// One stock mutation produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockChange {
    /// Keep the product with `remaining` units (always > 0).
    Decrement { product_id: ProductId, remaining: i64 },
    /// Stock reached zero or below; drop the product.
    Remove { product_id: ProductId },
}

/// Ordered stock changes for one gate pass, plus the line items that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    changes: Vec<StockChange>,
    skipped: Vec<ProductId>,
}

impl ReconciliationPlan {
    pub fn changes(&self) -> &[StockChange] {
        &self.changes
    }

    pub fn skipped(&self) -> &[ProductId] {
        &self.skipped
    }

    /// Apply the plan to an in-memory product list.
    pub fn apply(&self, products: &mut Vec<Product>, now: DateTime<Utc>) {
        for change in &self.changes {
            match change {
                StockChange::Decrement { product_id, remaining } => {
                    if let Some(product) = products.iter_mut().find(|p| &p.product_id == product_id) {
                        product.ship(*remaining, now);
                    }
                }
                StockChange::Remove { product_id } => {
                    products.retain(|p| &p.product_id != product_id);
                }
            }
        }
    }
}

/// Compute the stock changes for a manifest.
///
/// `stock_of` returns the stored quantity of a product, or `None` when it does
/// not exist. Line items are applied cumulatively: repeated references to one
/// product see the quantity left by earlier lines, and a product removed by an
/// earlier line counts as missing afterwards.
pub fn reconcile<F>(
    mode: ReconciliationMode,
    items: &[ShipmentLineItem],
    mut stock_of: F,
) -> DomainResult<ReconciliationPlan>
where
    F: FnMut(&ProductId) -> Option<i64>,
{
    let mut working: HashMap<ProductId, Option<i64>> = HashMap::new();
    let mut plan = ReconciliationPlan::default();

    for (idx, item) in items.iter().enumerate() {
        if item.selected_quantity <= 0 {
            return Err(DomainError::validation(format!(
                "products[{idx}].selectedQuantity must be positive"
            )));
        }

        let current = match working.get(&item.product_id) {
            Some(state) => *state,
            None => stock_of(&item.product_id),
        };

        let Some(available) = current else {
            match mode {
                ReconciliationMode::Lenient => {
                    plan.skipped.push(item.product_id.clone());
                    continue;
                }
                ReconciliationMode::Strict => {
                    return Err(DomainError::not_found(format!(
                        "product {} does not exist",
                        item.product_id
                    )));
                }
            }
        };

        if mode == ReconciliationMode::Strict && item.selected_quantity > available {
            return Err(DomainError::invariant(format!(
                "product {} has {available} units, {} requested",
                item.product_id, item.selected_quantity
            )));
        }

        let remaining = available.saturating_sub(item.selected_quantity);
        if remaining <= 0 {
            working.insert(item.product_id.clone(), None);
            plan.changes.push(StockChange::Remove {
                product_id: item.product_id.clone(),
            });
        } else {
            working.insert(item.product_id.clone(), Some(remaining));
            plan.changes.push(StockChange::Decrement {
                product_id: item.product_id.clone(),
                remaining,
            });
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{DEFAULT_DESTINATION, NewProduct, ProductType, TransportMode};
    use proptest::prelude::*;

    fn id(s: &str) -> ProductId {
        s.parse().unwrap()
    }

    fn line(product: &str, qty: i64) -> ShipmentLineItem {
        ShipmentLineItem {
            product_id: id(product),
            name: "Wireless Headphones".to_string(),
            transport: Some(TransportMode::Air),
            description: None,
            selected_quantity: qty,
            product_type: Some(ProductType::Electronics),
            remarks: None,
        }
    }

    fn stocked(product: &str, quantity: i64) -> Product {
        NewProduct {
            name: "Wireless Headphones".to_string(),
            transport: TransportMode::Air,
            description: None,
            quantity,
            origin: "Mumbai GIS".to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            product_type: ProductType::Electronics,
            remarks: None,
        }
        .into_product(id(product), Utc::now())
    }

    fn lookup(products: &[Product]) -> impl FnMut(&ProductId) -> Option<i64> + '_ {
        move |pid| products.iter().find(|p| &p.product_id == pid).map(|p| p.quantity)
    }

    #[test]
    fn shipping_everything_removes_the_product() {
        let mut products = vec![stocked("PRD-001", 150)];
        let plan = reconcile(ReconciliationMode::Lenient, &[line("PRD-001", 150)], lookup(&products)).unwrap();

        assert_eq!(plan.changes(), &[StockChange::Remove { product_id: id("PRD-001") }]);
        plan.apply(&mut products, Utc::now());
        assert!(products.is_empty());
    }

    #[test]
    fn partial_shipment_decrements() {
        let mut products = vec![stocked("PRD-001", 150)];
        let plan = reconcile(ReconciliationMode::Lenient, &[line("PRD-001", 50)], lookup(&products)).unwrap();

        plan.apply(&mut products, Utc::now());
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].quantity, 100);
    }

    #[test]
    fn lenient_mode_skips_unknown_products() {
        let products = vec![stocked("PRD-001", 10)];
        let plan = reconcile(
            ReconciliationMode::Lenient,
            &[line("PRD-404", 3), line("PRD-001", 4)],
            lookup(&products),
        )
        .unwrap();

        assert_eq!(plan.skipped(), &[id("PRD-404")]);
        assert_eq!(
            plan.changes(),
            &[StockChange::Decrement { product_id: id("PRD-001"), remaining: 6 }]
        );
    }

    #[test]
    fn lenient_mode_allows_overselling_into_removal() {
        let products = vec![stocked("PRD-001", 10)];
        let plan = reconcile(ReconciliationMode::Lenient, &[line("PRD-001", 25)], lookup(&products)).unwrap();
        assert_eq!(plan.changes(), &[StockChange::Remove { product_id: id("PRD-001") }]);
    }

    #[test]
    fn strict_mode_rejects_unknown_products() {
        let products = vec![stocked("PRD-001", 10)];
        let err = reconcile(ReconciliationMode::Strict, &[line("PRD-404", 1)], lookup(&products)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn strict_mode_rejects_overselling() {
        let products = vec![stocked("PRD-001", 10)];
        let err = reconcile(ReconciliationMode::Strict, &[line("PRD-001", 11)], lookup(&products)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn repeated_lines_apply_cumulatively() {
        let mut products = vec![stocked("PRD-001", 10)];
        let plan = reconcile(
            ReconciliationMode::Lenient,
            &[line("PRD-001", 4), line("PRD-001", 4)],
            lookup(&products),
        )
        .unwrap();

        assert_eq!(plan.changes().len(), 2);
        plan.apply(&mut products, Utc::now());
        assert_eq!(products[0].quantity, 2);
    }

    #[test]
    fn product_removed_earlier_in_manifest_counts_as_missing() {
        let products = vec![stocked("PRD-001", 5)];
        let plan = reconcile(
            ReconciliationMode::Lenient,
            &[line("PRD-001", 5), line("PRD-001", 1)],
            lookup(&products),
        )
        .unwrap();

        assert_eq!(plan.changes().len(), 1);
        assert_eq!(plan.skipped(), &[id("PRD-001")]);

        let strict = reconcile(
            ReconciliationMode::Strict,
            &[line("PRD-001", 5), line("PRD-001", 1)],
            lookup(&products),
        );
        assert!(matches!(strict, Err(DomainError::NotFound(_))));
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("STRICT".parse::<ReconciliationMode>().unwrap(), ReconciliationMode::Strict);
        assert_eq!(" lenient ".parse::<ReconciliationMode>().unwrap(), ReconciliationMode::Lenient);
        assert!("loose".parse::<ReconciliationMode>().is_err());
    }

    proptest! {
        #[test]
        fn shipment_within_stock_leaves_difference_or_removes(q in 1i64..10_000, s_frac in 0.0f64..=1.0) {
            let s = ((q as f64 * s_frac).round() as i64).clamp(1, q);
            let mut products = vec![stocked("PRD-001", q)];
            let plan = reconcile(ReconciliationMode::Strict, &[line("PRD-001", s)], lookup(&products)).unwrap();
            plan.apply(&mut products, Utc::now());

            if q - s > 0 {
                prop_assert_eq!(products.len(), 1);
                prop_assert_eq!(products[0].quantity, q - s);
            } else {
                prop_assert!(products.is_empty());
            }
        }
    }
}
