use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{DomainError, DomainResult, Entity, InventoryId, ProductId};

/// Threshold applied when a record is created without one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Stock record for a single product (at most one per product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub low_stock_threshold: i64,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for InventoryRecord {
    type Id = InventoryId;

    fn id(&self) -> InventoryId {
        self.id
    }
}

impl InventoryRecord {
    /// A record is low on stock once its quantity has fallen to or below the threshold.
    pub fn is_low_stock(&self) -> bool {
        is_low_stock(self.quantity, self.low_stock_threshold)
    }

    /// History entry describing the record's current level.
    pub fn change(&self) -> InventoryChange {
        InventoryChange {
            product_id: self.product_id,
            quantity: self.quantity,
            recorded_at: self.last_updated,
        }
    }
}

pub(crate) fn is_low_stock(quantity: i64, threshold: i64) -> bool {
    quantity <= threshold
}

/// Coarse stock health used by the stock-management insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    Low,
    Good,
}

impl StockStatus {
    pub fn classify(quantity: i64, threshold: i64) -> Self {
        if is_low_stock(quantity, threshold) {
            StockStatus::Low
        } else {
            StockStatus::Good
        }
    }
}

/// Input for creating the inventory record of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventory {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default = "default_threshold")]
    pub low_stock_threshold: i64,
}

fn default_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl NewInventory {
    pub fn validate(&self) -> DomainResult<()> {
        validate_quantity(self.quantity)?;
        validate_threshold(self.low_stock_threshold)
    }

    pub fn into_record(self, id: InventoryId, now: DateTime<Utc>) -> InventoryRecord {
        InventoryRecord {
            id,
            product_id: self.product_id,
            quantity: self.quantity,
            low_stock_threshold: self.low_stock_threshold,
            last_updated: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial stock update for a product's record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPatch {
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

impl InventoryPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(threshold) = self.low_stock_threshold {
            validate_threshold(threshold)?;
        }
        Ok(())
    }

    /// Apply the patch and stamp `last_updated`/`updated_at`, even when no field changes.
    pub fn apply(&self, record: &mut InventoryRecord, now: DateTime<Utc>) -> DomainResult<()> {
        self.validate()?;
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(threshold) = self.low_stock_threshold {
            record.low_stock_threshold = threshold;
        }
        record.last_updated = now;
        record.updated_at = now;
        Ok(())
    }
}

/// One entry of a product's stock history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryChange {
    pub product_id: ProductId,
    pub quantity: i64,
    pub recorded_at: DateTime<Utc>,
}

fn validate_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::validation("inventory quantity must not be negative"));
    }
    Ok(())
}

fn validate_threshold(threshold: i64) -> DomainResult<()> {
    if threshold < 0 {
        return Err(DomainError::validation("low_stock_threshold must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantity: i64, threshold: i64) -> InventoryRecord {
        NewInventory {
            product_id: ProductId::new(1),
            quantity,
            low_stock_threshold: threshold,
        }
        .into_record(InventoryId::new(1), Utc::now())
    }

    #[test]
    fn low_stock_includes_equal_threshold() {
        assert!(record(5, 10).is_low_stock());
        assert!(record(10, 10).is_low_stock());
        assert!(!record(11, 10).is_low_stock());
        assert_eq!(StockStatus::classify(10, 10), StockStatus::Low);
        let good = serde_json::to_string(&StockStatus::classify(50, 10)).unwrap();
        assert_eq!(good, r#""Good""#);
    }

    #[test]
    fn rejects_negative_quantity_and_threshold() {
        let input = NewInventory {
            product_id: ProductId::new(1),
            quantity: -1,
            low_stock_threshold: 10,
        };
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));

        let input = NewInventory {
            product_id: ProductId::new(1),
            quantity: 0,
            low_stock_threshold: -1,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn threshold_defaults_when_omitted() {
        let input: NewInventory =
            serde_json::from_str(r#"{"product_id": 3, "quantity": 7}"#).unwrap();
        assert_eq!(input.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[test]
    fn patch_stamps_last_updated_and_records_change() {
        let mut rec = record(20, 10);
        let later = rec.last_updated + chrono::Duration::minutes(3);

        InventoryPatch { quantity: Some(4), low_stock_threshold: None }
            .apply(&mut rec, later)
            .unwrap();

        assert_eq!(rec.quantity, 4);
        assert_eq!(rec.low_stock_threshold, 10);
        assert_eq!(rec.last_updated, later);
        assert!(rec.is_low_stock());

        let change = rec.change();
        assert_eq!(change.quantity, 4);
        assert_eq!(change.recorded_at, later);
    }

    #[test]
    fn invalid_patch_is_rejected_without_mutation() {
        let mut rec = record(20, 10);
        let before = rec.clone();
        let patch = InventoryPatch { quantity: Some(-3), low_stock_threshold: Some(1) };
        assert!(patch.apply(&mut rec, Utc::now()).is_err());
        assert_eq!(rec, before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: low stock is exactly `quantity <= threshold`.
            #[test]
            fn low_stock_matches_threshold_rule(
                quantity in 0i64..10_000,
                threshold in 0i64..10_000,
            ) {
                let rec = record(quantity, threshold);
                prop_assert_eq!(rec.is_low_stock(), quantity <= threshold);
                let low = StockStatus::classify(quantity, threshold) == StockStatus::Low;
                prop_assert_eq!(low, quantity <= threshold);
            }
        }
    }
}
