use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use shopdesk_analytics::{
    rank_top_sellers, CategorySalesRow, DailySalesRow, DataAccessError, InsightsStore,
    LowStockRow, MetricsStore, SalesTotals, StockVelocityRow, TopSellerRow,
};
use shopdesk_core::{Entity, InventoryId, ProductId, SaleId};
use shopdesk_inventory::{InventoryChange, InventoryPatch, InventoryRecord, NewInventory};
use shopdesk_products::{NewProduct, Product, ProductPatch};
use shopdesk_sales::{NewSale, Sale};

use super::{
    InventoryHistoryEntry, InventoryRepository, Page, ProductRepository, SaleRepository,
    StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    sales: BTreeMap<SaleId, Sale>,
    inventory: BTreeMap<InventoryId, InventoryRecord>,
    changes: Vec<InventoryChange>,
    last_product_id: i64,
    last_sale_id: i64,
    last_inventory_id: i64,
}

impl Tables {
    fn next_product_id(&mut self) -> ProductId {
        self.last_product_id += 1;
        ProductId::new(self.last_product_id)
    }

    fn next_sale_id(&mut self) -> SaleId {
        self.last_sale_id += 1;
        SaleId::new(self.last_sale_id)
    }

    fn next_inventory_id(&mut self) -> InventoryId {
        self.last_inventory_id += 1;
        InventoryId::new(self.last_inventory_id)
    }

    fn inventory_for(&self, product_id: ProductId) -> Option<&InventoryRecord> {
        self.inventory.values().find(|r| r.product_id == product_id)
    }

    fn inventory_for_mut(&mut self, product_id: ProductId) -> Option<&mut InventoryRecord> {
        self.inventory.values_mut().find(|r| r.product_id == product_id)
    }

    fn product_name(&self, product_id: ProductId) -> String {
        self.products
            .get(&product_id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

/// In-memory store keyed by id (iteration in ascending id order).
///
/// Intended for tests/dev. Reads can be switched off with [`InMemoryStore::set_available`]
/// to exercise the data-access failure paths.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DataAccessError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DataAccessError::unavailable("in-memory store is offline"));
        }
        self.tables
            .read()
            .map_err(|_| DataAccessError::unavailable("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, DataAccessError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DataAccessError::unavailable("in-memory store is offline"));
        }
        self.tables
            .write()
            .map_err(|_| DataAccessError::unavailable("lock poisoned"))
    }
}

/// Rows are keyed by their own id.
fn insert<E: Entity>(table: &mut BTreeMap<E::Id, E>, row: E) {
    table.insert(row.id(), row);
}

fn page_of<T: Clone>(rows: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    let (skip, limit) = page.bounds();
    rows.skip(skip).take(limit).collect()
}

fn within(at: DateTime<Utc>, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    start.is_none_or(|s| at >= s) && end.is_none_or(|e| at <= e)
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn create_product(&self, input: NewProduct) -> StoreResult<Product> {
        input.validate()?;
        let mut tables = self.write()?;
        let id = tables.next_product_id();
        let product = input.into_product(id, Utc::now());
        insert(&mut tables.products, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.read()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    async fn list_products(&self, page: Page) -> StoreResult<Vec<Product>> {
        Ok(page_of(self.read()?.products.values().cloned(), page))
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        patch.validate()?;
        let mut tables = self.write()?;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        patch.apply(product, Utc::now())?;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.products.contains_key(&id) {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        let referenced = tables.sales.values().any(|s| s.product_id == id)
            || tables.inventory_for(id).is_some()
            || tables.changes.iter().any(|c| c.product_id == id);
        if referenced {
            return Err(StoreError::Conflict(format!(
                "product {id} is referenced by sales or inventory"
            )));
        }
        tables.products.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl SaleRepository for InMemoryStore {
    async fn create_sale(&self, input: NewSale) -> StoreResult<Sale> {
        input.validate()?;
        let mut tables = self.write()?;
        let unit_price = tables
            .products
            .get(&input.product_id)
            .map(|p| p.price)
            .ok_or_else(|| StoreError::UnknownReference(format!("product {}", input.product_id)))?;
        let id = tables.next_sale_id();
        let sale = input.into_sale(id, unit_price, Utc::now());
        insert(&mut tables.sales, sale.clone());
        Ok(sale)
    }

    async fn get_sale(&self, id: SaleId) -> StoreResult<Sale> {
        self.read()?
            .sales
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("sale {id}")))
    }

    async fn list_sales(&self, page: Page) -> StoreResult<Vec<Sale>> {
        Ok(page_of(self.read()?.sales.values().cloned(), page))
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn create_inventory(&self, input: NewInventory) -> StoreResult<InventoryRecord> {
        input.validate()?;
        let mut tables = self.write()?;
        if !tables.products.contains_key(&input.product_id) {
            return Err(StoreError::UnknownReference(format!("product {}", input.product_id)));
        }
        if tables.inventory_for(input.product_id).is_some() {
            return Err(StoreError::Conflict(format!(
                "inventory for product {} already exists",
                input.product_id
            )));
        }
        let id = tables.next_inventory_id();
        let record = input.into_record(id, Utc::now());
        tables.changes.push(record.change());
        insert(&mut tables.inventory, record.clone());
        Ok(record)
    }

    async fn list_inventory(&self, page: Page) -> StoreResult<Vec<InventoryRecord>> {
        Ok(page_of(self.read()?.inventory.values().cloned(), page))
    }

    async fn get_inventory_by_product(
        &self,
        product_id: ProductId,
    ) -> StoreResult<InventoryRecord> {
        self.read()?
            .inventory_for(product_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("inventory for product {product_id}")))
    }

    async fn update_inventory(
        &self,
        product_id: ProductId,
        patch: InventoryPatch,
    ) -> StoreResult<InventoryRecord> {
        patch.validate()?;
        let mut tables = self.write()?;
        let record = tables
            .inventory_for_mut(product_id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory for product {product_id}")))?;
        patch.apply(record, Utc::now())?;
        let updated = record.clone();
        tables.changes.push(updated.change());
        Ok(updated)
    }

    async fn list_inventory_changes(
        &self,
        product_id: ProductId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<InventoryHistoryEntry>> {
        let tables = self.read()?;
        if tables.inventory_for(product_id).is_none() {
            return Err(StoreError::NotFound(format!("inventory for product {product_id}")));
        }
        let product_name = tables.product_name(product_id);
        // Appended in time order; newest first means reverse insertion order.
        Ok(tables
            .changes
            .iter()
            .rev()
            .filter(|c| c.product_id == product_id && within(c.recorded_at, start, end))
            .map(|c| InventoryHistoryEntry {
                product_name: product_name.clone(),
                quantity: c.quantity,
                recorded_at: c.recorded_at,
            })
            .collect())
    }
}

#[async_trait]
impl MetricsStore for InMemoryStore {
    async fn sum_sale_amounts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DataAccessError> {
        Ok(self
            .read()?
            .sales
            .values()
            .filter(|s| s.sale_date >= start && s.sale_date < end)
            .map(|s| s.total_amount)
            .sum())
    }

    async fn list_low_stock_inventory(&self) -> Result<Vec<LowStockRow>, DataAccessError> {
        let tables = self.read()?;
        Ok(tables
            .inventory
            .values()
            .filter(|r| r.is_low_stock())
            .filter_map(|r| {
                tables.products.get(&r.product_id).map(|p| LowStockRow {
                    product_id: p.id,
                    product_name: p.name.clone(),
                    quantity: r.quantity,
                    threshold: r.low_stock_threshold,
                })
            })
            .collect())
    }

    async fn top_selling_products_since(
        &self,
        start: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TopSellerRow>, DataAccessError> {
        let tables = self.read()?;
        let mut grouped: BTreeMap<ProductId, TopSellerRow> = BTreeMap::new();
        for sale in tables.sales.values().filter(|s| s.sale_date >= start) {
            let Some(product) = tables.products.get(&sale.product_id) else {
                continue;
            };
            let row = grouped.entry(product.id).or_insert_with(|| TopSellerRow {
                product_id: product.id,
                product_name: product.name.clone(),
                units_sold: 0,
                revenue: 0.0,
            });
            row.units_sold += sale.quantity;
            row.revenue += sale.total_amount;
        }
        Ok(rank_top_sellers(grouped.into_values(), limit))
    }
}

#[async_trait]
impl InsightsStore for InMemoryStore {
    async fn daily_sales_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<DailySalesRow>, DataAccessError> {
        let tables = self.read()?;
        let mut days: BTreeMap<NaiveDate, DailySalesRow> = BTreeMap::new();
        for sale in tables.sales.values().filter(|s| s.sale_date >= start) {
            let date = sale.sale_date.date_naive();
            let row = days.entry(date).or_insert_with(|| DailySalesRow {
                date,
                sales: 0.0,
                orders: 0,
            });
            row.sales += sale.total_amount;
            row.orders += 1;
        }
        Ok(days.into_values().collect())
    }

    async fn category_sales(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CategorySalesRow>, DataAccessError> {
        let tables = self.read()?;
        let mut categories: BTreeMap<String, CategorySalesRow> = BTreeMap::new();
        for sale in tables.sales.values().filter(|s| within(s.sale_date, start, end)) {
            let Some(product) = tables.products.get(&sale.product_id) else {
                continue;
            };
            let row = categories
                .entry(product.category.clone())
                .or_insert_with(|| CategorySalesRow {
                    category: product.category.clone(),
                    orders: 0,
                    revenue: 0.0,
                });
            row.orders += 1;
            row.revenue += sale.total_amount;
        }
        Ok(categories.into_values().collect())
    }

    async fn sales_totals(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<SalesTotals, DataAccessError> {
        let tables = self.read()?;
        Ok(tables
            .sales
            .values()
            .filter(|s| within(s.sale_date, start, end))
            .fold(SalesTotals::default(), |acc, s| SalesTotals {
                revenue: acc.revenue + s.total_amount,
                count: acc.count + 1,
            }))
    }

    async fn stock_velocity_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<StockVelocityRow>, DataAccessError> {
        let tables = self.read()?;
        Ok(tables
            .inventory
            .values()
            .filter_map(|r| {
                let product = tables.products.get(&r.product_id)?;
                let sales_count = tables
                    .sales
                    .values()
                    .filter(|s| s.product_id == r.product_id && s.sale_date >= start)
                    .count() as i64;
                Some(StockVelocityRow {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    category: product.category.clone(),
                    quantity: r.quantity,
                    threshold: r.low_stock_threshold,
                    sales_count,
                })
            })
            .collect())
    }
}
