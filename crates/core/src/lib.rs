//! `gatepass-core`: shared domain building blocks.
//!
//! Pure primitives only (no infrastructure concerns): the domain error model,
//! the entity trait and the business identifiers used by inventory records.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{GatePassNumber, GatePassNumberGenerator, ProductId};
