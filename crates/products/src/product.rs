use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{DomainError, DomainResult, Entity, ProductId};

/// Longest accepted product name (matches the `products.name` column).
pub const MAX_NAME_LEN: usize = 255;

/// Longest accepted category label (matches the `products.category` column).
pub const MAX_CATEGORY_LEN: usize = 100;

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    /// Unit price; always strictly positive.
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
}

impl NewProduct {
    /// Check field-level rules before the product reaches the store.
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        validate_category(&self.category)?;
        validate_price(self.price)
    }

    /// Build the stored representation once the store has assigned an id.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            category: self.category.trim().to_string(),
            price: self.price,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; only the fields that are present are changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Apply the patch in place and stamp `updated_at`.
    ///
    /// Callers validate first; applying an invalid patch is a programming error
    /// but is still rejected here so a product can never hold invalid state.
    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<()> {
        self.validate()?;
        if let Some(name) = &self.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(category) = &self.category {
            product.category = category.trim().to_string();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        product.updated_at = now;
        Ok(())
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("product name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "product name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> DomainResult<()> {
    let category = category.trim();
    if category.is_empty() {
        return Err(DomainError::validation("product category must not be empty"));
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(DomainError::validation(format!(
            "product category must be at most {MAX_CATEGORY_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DomainError::validation("product price must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            description: Some("A small widget".to_string()),
            category: "Gadgets".to_string(),
            price: 10.0,
        }
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn valid_product_passes_validation() {
        assert!(widget().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_or_non_finite_price() {
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let input = NewProduct { price, ..widget() };
            assert!(
                matches!(input.validate(), Err(DomainError::Validation(_))),
                "price {price} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_blank_name_and_category() {
        let input = NewProduct { name: "   ".to_string(), ..widget() };
        assert!(input.validate().is_err());

        let input = NewProduct { category: String::new(), ..widget() };
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_overlong_name() {
        let input = NewProduct { name: "x".repeat(MAX_NAME_LEN + 1), ..widget() };
        assert!(input.validate().is_err());
    }

    #[test]
    fn into_product_trims_and_stamps_times() {
        let now = test_time();
        let input = NewProduct { name: "  Widget ".to_string(), ..widget() };
        let product = input.into_product(ProductId::new(1), now);
        assert_eq!(product.name, "Widget");
        assert_eq!(product.created_at, now);
        assert_eq!(product.updated_at, now);
        assert_eq!(product.id(), ProductId::new(1));
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let created = test_time();
        let mut product = widget().into_product(ProductId::new(1), created);
        let later = created + chrono::Duration::seconds(5);

        let patch = ProductPatch { price: Some(12.5), ..ProductPatch::default() };
        patch.apply(&mut product, later).unwrap();

        assert_eq!(product.price, 12.5);
        assert_eq!(product.name, "Widget");
        assert_eq!(product.category, "Gadgets");
        assert_eq!(product.updated_at, later);
        assert_eq!(product.created_at, created);
    }

    #[test]
    fn invalid_patch_leaves_product_untouched() {
        let mut product = widget().into_product(ProductId::new(1), test_time());
        let before = product.clone();

        let patch = ProductPatch {
            name: Some("ok".to_string()),
            price: Some(-5.0),
            ..ProductPatch::default()
        };
        assert!(patch.apply(&mut product, test_time()).is_err());
        assert_eq!(product, before);
    }

    #[test]
    fn empty_patch_only_stamps_updated_at() {
        let mut product = widget().into_product(ProductId::new(1), test_time());
        let before = product.clone();
        let later = test_time() + chrono::Duration::minutes(5);

        ProductPatch::default().apply(&mut product, later).unwrap();

        assert_eq!(product.updated_at, later);
        assert_eq!(Product { updated_at: before.updated_at, ..product }, before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any strictly positive finite price with a sane name/category is accepted.
            #[test]
            fn positive_prices_are_accepted(
                price in 0.01f64..1.0e7,
                name in "[A-Za-z][A-Za-z0-9 ]{0,50}",
                category in "[A-Za-z]{1,20}"
            ) {
                let input = NewProduct { name, description: None, category, price };
                prop_assert!(input.validate().is_ok());
            }

            /// Property: non-positive prices are always rejected.
            #[test]
            fn non_positive_prices_are_rejected(price in -1.0e7f64..=0.0) {
                let input = NewProduct { price, ..widget() };
                prop_assert!(input.validate().is_err());
            }
        }
    }
}
