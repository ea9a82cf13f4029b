//! Inventory domain module.
//!
//! Business rules for product stock and gate passes, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod gate_pass;
pub mod product;
pub mod reconcile;

pub use gate_pass::{DEFAULT_GATE_PASS_ORIGIN, GatePass, GatePassDraft, ShipmentLineItem};
pub use product::{DEFAULT_DESTINATION, NewProduct, Product, ProductType, TransportMode};
pub use reconcile::{ReconciliationMode, ReconciliationPlan, StockChange, reconcile};
