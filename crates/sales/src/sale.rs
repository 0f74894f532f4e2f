use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{round_to, DomainError, DomainResult, Entity, ProductId, SaleId};

/// A recorded sale of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub product_id: ProductId,
    /// Units sold; always strictly positive.
    pub quantity: i64,
    /// Monetary total of the sale.
    pub total_amount: f64,
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> SaleId {
        self.id
    }
}

/// Input for recording a sale.
///
/// `total_amount` may be omitted, in which case it is derived from the product's
/// unit price at creation time. `sale_date` defaults to the time of recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub sale_date: Option<DateTime<Utc>>,
}

impl NewSale {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("sale quantity must be greater than zero"));
        }
        if let Some(total) = self.total_amount {
            if !total.is_finite() || total < 0.0 {
                return Err(DomainError::validation(
                    "sale total_amount must be a non-negative amount",
                ));
            }
        }
        Ok(())
    }

    /// Total to record: the explicit amount, or `quantity × unit_price` rounded to cents.
    pub fn resolve_total(&self, unit_price: f64) -> f64 {
        match self.total_amount {
            Some(total) => total,
            None => round_to(self.quantity as f64 * unit_price, 2),
        }
    }

    /// Build the stored representation once the store has assigned an id.
    pub fn into_sale(self, id: SaleId, unit_price: f64, now: DateTime<Utc>) -> Sale {
        let total_amount = self.resolve_total(unit_price);
        Sale {
            id,
            product_id: self.product_id,
            quantity: self.quantity,
            total_amount,
            sale_date: self.sale_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}
