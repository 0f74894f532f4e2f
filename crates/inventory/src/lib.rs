//! Inventory domain module.
//!
//! Stock levels per product, low-stock detection and the change history kept
//! for every stock update. Pure domain logic (no IO).

pub mod record;

pub use record::{
    InventoryChange, InventoryPatch, InventoryRecord, NewInventory, StockStatus,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
