//! `shopdesk-core`: shared domain building blocks.
//!
//! Typed identifiers, the domain error model and small numeric helpers. No IO.

pub mod entity;
pub mod error;
pub mod id;
pub mod numeric;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{InventoryId, ProductId, SaleId};
pub use numeric::{percent_change, round_to};
