//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | StoreError |
//! |------------|------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `UnknownReference` (`Conflict` on delete) |
//! | Database (check violation) | `23514` | `Validation` |
//! | Pool closed / timed out, IO | N/A | `DataAccess(Unavailable)` |
//! | Anything else | N/A | `DataAccess(Query)` |

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use shopdesk_analytics::{
    CategorySalesRow, DailySalesRow, DataAccessError, InsightsStore, LowStockRow, MetricsStore,
    SalesTotals, StockVelocityRow, TopSellerRow,
};
use shopdesk_core::{DomainError, InventoryId, ProductId, SaleId};
use shopdesk_inventory::{InventoryPatch, InventoryRecord, NewInventory};
use shopdesk_products::{NewProduct, Product, ProductPatch};
use shopdesk_sales::{NewSale, Sale};

use super::{
    InventoryHistoryEntry, InventoryRepository, Page, ProductRepository, SaleRepository,
    StoreError, StoreResult,
};

const PRODUCT_COLUMNS: &str = "id, name, description, category, price, created_at, updated_at";
const SALE_COLUMNS: &str =
    "id, product_id, quantity, total_amount, sale_date, created_at, updated_at";
const INVENTORY_COLUMNS: &str =
    "id, product_id, quantity, low_stock_threshold, last_updated, created_at, updated_at";

/// Store over a shared sqlx pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn product_price(&self, id: ProductId) -> StoreResult<f64> {
        let row = sqlx::query("SELECT price FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_price", e))?;
        match row {
            Some(row) => row
                .try_get::<f64, _>("price")
                .map_err(|e| map_sqlx_error("product_price", e)),
            None => Err(StoreError::UnknownReference(format!("product {id}"))),
        }
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn sale_from_row(row: &PgRow) -> Result<Sale, sqlx::Error> {
    Ok(Sale {
        id: SaleId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        total_amount: row.try_get("total_amount")?,
        sale_date: row.try_get("sale_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn inventory_from_row(row: &PgRow) -> Result<InventoryRecord, sqlx::Error> {
    Ok(InventoryRecord {
        id: InventoryId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        low_stock_threshold: row.try_get("low_stock_threshold")?,
        last_updated: row.try_get("last_updated")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn collect_rows<T>(
    operation: &str,
    rows: Vec<PgRow>,
    decode: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, DataAccessError> {
    rows.iter()
        .map(|row| decode(row).map_err(|e| map_read_error(operation, e)))
        .collect()
}

#[async_trait]
impl ProductRepository for PostgresStore {
    #[instrument(skip(self, input), err)]
    async fn create_product(&self, input: NewProduct) -> StoreResult<Product> {
        input.validate()?;
        let product = input.into_product(ProductId::new(0), Utc::now());
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, description, category, price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;
        product_from_row(&row).map_err(|e| map_sqlx_error("create_product", e))
    }

    #[instrument(skip(self), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        product_from_row(&row).map_err(|e| map_sqlx_error("get_product", e))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self, page: Page) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        Ok(collect_rows("list_products", rows, product_from_row)?)
    }

    #[instrument(skip(self, patch), err)]
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        patch.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?
        .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        let mut product = product_from_row(&row).map_err(|e| map_sqlx_error("update_product", e))?;
        patch.apply(&mut product, Utc::now())?;

        let row = sqlx::query(&format!(
            "UPDATE products SET name = $2, description = $3, category = $4, price = $5, \
             updated_at = $6 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.get())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        product_from_row(&row).map_err(|e| map_sqlx_error("update_product", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error("delete_product", e) {
                StoreError::UnknownReference(_) => StoreError::Conflict(format!(
                    "product {id} is referenced by sales or inventory"
                )),
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl SaleRepository for PostgresStore {
    #[instrument(skip(self, input), fields(product_id = %input.product_id), err)]
    async fn create_sale(&self, input: NewSale) -> StoreResult<Sale> {
        input.validate()?;
        let unit_price = self.product_price(input.product_id).await?;
        let sale = input.into_sale(SaleId::new(0), unit_price, Utc::now());
        let row = sqlx::query(&format!(
            "INSERT INTO sales \
             (product_id, quantity, total_amount, sale_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {SALE_COLUMNS}"
        ))
        .bind(sale.product_id.get())
        .bind(sale.quantity)
        .bind(sale.total_amount)
        .bind(sale.sale_date)
        .bind(sale.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_sale", e))?;
        sale_from_row(&row).map_err(|e| map_sqlx_error("create_sale", e))
    }

    #[instrument(skip(self), err)]
    async fn get_sale(&self, id: SaleId) -> StoreResult<Sale> {
        let row = sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sale", e))?
            .ok_or_else(|| StoreError::NotFound(format!("sale {id}")))?;
        sale_from_row(&row).map_err(|e| map_sqlx_error("get_sale", e))
    }

    #[instrument(skip(self), err)]
    async fn list_sales(&self, page: Page) -> StoreResult<Vec<Sale>> {
        let rows = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sales", e))?;
        Ok(collect_rows("list_sales", rows, sale_from_row)?)
    }
}

#[async_trait]
impl InventoryRepository for PostgresStore {
    #[instrument(skip(self, input), fields(product_id = %input.product_id), err)]
    async fn create_inventory(&self, input: NewInventory) -> StoreResult<InventoryRecord> {
        input.validate()?;
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_inventory", e))?;

        let row = sqlx::query(&format!(
            "INSERT INTO inventory \
             (product_id, quantity, low_stock_threshold, last_updated, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4, $4) RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(input.product_id.get())
        .bind(input.quantity)
        .bind(input.low_stock_threshold)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_inventory", e))?;
        let record =
            inventory_from_row(&row).map_err(|e| map_sqlx_error("create_inventory", e))?;

        record_change(&mut tx, &record, "create_inventory").await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_inventory", e))?;
        Ok(record)
    }

    #[instrument(skip(self), err)]
    async fn list_inventory(&self, page: Page) -> StoreResult<Vec<InventoryRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory", e))?;
        Ok(collect_rows("list_inventory", rows, inventory_from_row)?)
    }

    #[instrument(skip(self), err)]
    async fn get_inventory_by_product(
        &self,
        product_id: ProductId,
    ) -> StoreResult<InventoryRecord> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE product_id = $1"
        ))
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_inventory_by_product", e))?
        .ok_or_else(|| StoreError::NotFound(format!("inventory for product {product_id}")))?;
        inventory_from_row(&row).map_err(|e| map_sqlx_error("get_inventory_by_product", e))
    }

    #[instrument(skip(self, patch), err)]
    async fn update_inventory(
        &self,
        product_id: ProductId,
        patch: InventoryPatch,
    ) -> StoreResult<InventoryRecord> {
        patch.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_inventory", e))?;

        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE product_id = $1 FOR UPDATE"
        ))
        .bind(product_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_inventory", e))?
        .ok_or_else(|| StoreError::NotFound(format!("inventory for product {product_id}")))?;
        let mut record =
            inventory_from_row(&row).map_err(|e| map_sqlx_error("update_inventory", e))?;
        patch.apply(&mut record, Utc::now())?;

        sqlx::query(
            "UPDATE inventory SET quantity = $2, low_stock_threshold = $3, last_updated = $4, \
             updated_at = $4 WHERE id = $1",
        )
        .bind(record.id.get())
        .bind(record.quantity)
        .bind(record.low_stock_threshold)
        .bind(record.last_updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_inventory", e))?;

        record_change(&mut tx, &record, "update_inventory").await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_inventory", e))?;
        Ok(record)
    }

    #[instrument(skip(self), err)]
    async fn list_inventory_changes(
        &self,
        product_id: ProductId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<InventoryHistoryEntry>> {
        self.get_inventory_by_product(product_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT p.name AS product_name, c.quantity, c.recorded_at
            FROM inventory_changes c
            JOIN products p ON p.id = c.product_id
            WHERE c.product_id = $1
              AND ($2::timestamptz IS NULL OR c.recorded_at >= $2)
              AND ($3::timestamptz IS NULL OR c.recorded_at <= $3)
            ORDER BY c.recorded_at DESC, c.id DESC
            "#,
        )
        .bind(product_id.get())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory_changes", e))?;

        Ok(collect_rows("list_inventory_changes", rows, |row| {
            Ok(InventoryHistoryEntry {
                product_name: row.try_get("product_name")?,
                quantity: row.try_get("quantity")?,
                recorded_at: row.try_get("recorded_at")?,
            })
        })?)
    }
}

async fn record_change(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    record: &InventoryRecord,
    operation: &str,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO inventory_changes (product_id, quantity, recorded_at) VALUES ($1, $2, $3)",
    )
    .bind(record.product_id.get())
    .bind(record.quantity)
    .bind(record.last_updated)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error(operation, e))?;
    Ok(())
}

#[async_trait]
impl MetricsStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn sum_sale_amounts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DataAccessError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(total_amount), 0)::DOUBLE PRECISION AS total \
             FROM sales WHERE sale_date >= $1 AND sale_date < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_read_error("sum_sale_amounts", e))?;
        row.try_get("total")
            .map_err(|e| map_read_error("sum_sale_amounts", e))
    }

    #[instrument(skip(self), err)]
    async fn list_low_stock_inventory(&self) -> Result<Vec<LowStockRow>, DataAccessError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS product_id, p.name AS product_name, i.quantity, i.low_stock_threshold
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            WHERE i.quantity <= i.low_stock_threshold
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error("list_low_stock_inventory", e))?;

        collect_rows("list_low_stock_inventory", rows, |row| {
            Ok(LowStockRow {
                product_id: ProductId::new(row.try_get("product_id")?),
                product_name: row.try_get("product_name")?,
                quantity: row.try_get("quantity")?,
                threshold: row.try_get("low_stock_threshold")?,
            })
        })
    }

    #[instrument(skip(self), err)]
    async fn top_selling_products_since(
        &self,
        start: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TopSellerRow>, DataAccessError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS product_id,
                   p.name AS product_name,
                   SUM(s.quantity)::BIGINT AS units_sold,
                   SUM(s.total_amount)::DOUBLE PRECISION AS revenue
            FROM sales s
            JOIN products p ON p.id = s.product_id
            WHERE s.sale_date >= $1
            GROUP BY p.id, p.name
            ORDER BY revenue DESC, p.id ASC
            LIMIT $2
            "#,
        )
        .bind(start)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error("top_selling_products_since", e))?;

        collect_rows("top_selling_products_since", rows, |row| {
            Ok(TopSellerRow {
                product_id: ProductId::new(row.try_get("product_id")?),
                product_name: row.try_get("product_name")?,
                units_sold: row.try_get("units_sold")?,
                revenue: row.try_get("revenue")?,
            })
        })
    }
}

#[async_trait]
impl InsightsStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn daily_sales_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<DailySalesRow>, DataAccessError> {
        let rows = sqlx::query(
            r#"
            SELECT (sale_date AT TIME ZONE 'UTC')::DATE AS day,
                   SUM(total_amount)::DOUBLE PRECISION AS sales,
                   COUNT(*)::BIGINT AS orders
            FROM sales
            WHERE sale_date >= $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error("daily_sales_since", e))?;

        collect_rows("daily_sales_since", rows, |row| {
            Ok(DailySalesRow {
                date: row.try_get::<NaiveDate, _>("day")?,
                sales: row.try_get("sales")?,
                orders: row.try_get("orders")?,
            })
        })
    }

    #[instrument(skip(self), err)]
    async fn category_sales(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CategorySalesRow>, DataAccessError> {
        let rows = sqlx::query(
            r#"
            SELECT p.category,
                   COUNT(s.id)::BIGINT AS orders,
                   COALESCE(SUM(s.total_amount), 0)::DOUBLE PRECISION AS revenue
            FROM sales s
            JOIN products p ON p.id = s.product_id
            WHERE ($1::timestamptz IS NULL OR s.sale_date >= $1)
              AND ($2::timestamptz IS NULL OR s.sale_date <= $2)
            GROUP BY p.category
            ORDER BY p.category
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error("category_sales", e))?;

        collect_rows("category_sales", rows, |row| {
            Ok(CategorySalesRow {
                category: row.try_get("category")?,
                orders: row.try_get("orders")?,
                revenue: row.try_get("revenue")?,
            })
        })
    }

    #[instrument(skip(self), err)]
    async fn sales_totals(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<SalesTotals, DataAccessError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_amount), 0)::DOUBLE PRECISION AS revenue,
                   COUNT(*)::BIGINT AS count
            FROM sales
            WHERE ($1::timestamptz IS NULL OR sale_date >= $1)
              AND ($2::timestamptz IS NULL OR sale_date <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_read_error("sales_totals", e))?;

        Ok(SalesTotals {
            revenue: row
                .try_get("revenue")
                .map_err(|e| map_read_error("sales_totals", e))?,
            count: row
                .try_get("count")
                .map_err(|e| map_read_error("sales_totals", e))?,
        })
    }

    #[instrument(skip(self), err)]
    async fn stock_velocity_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<StockVelocityRow>, DataAccessError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS product_id,
                   p.name AS product_name,
                   p.category,
                   i.quantity,
                   i.low_stock_threshold,
                   COUNT(s.id)::BIGINT AS sales_count
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            LEFT JOIN sales s ON s.product_id = p.id AND s.sale_date >= $1
            GROUP BY i.id, p.id, p.name, p.category, i.quantity, i.low_stock_threshold
            ORDER BY i.id
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error("stock_velocity_since", e))?;

        collect_rows("stock_velocity_since", rows, |row| {
            Ok(StockVelocityRow {
                product_id: ProductId::new(row.try_get("product_id")?),
                product_name: row.try_get("product_name")?,
                category: row.try_get("category")?,
                quantity: row.try_get("quantity")?,
                threshold: row.try_get("low_stock_threshold")?,
                sales_count: row.try_get("sales_count")?,
            })
        })
    }
}

/// Map sqlx errors on the write/CRUD path to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = format!("database error in {}: {}", operation, db_err.message());
        if let Some(code) = db_err.code() {
            match code.as_ref() {
                "23505" => return StoreError::Conflict(msg),
                "23503" => return StoreError::UnknownReference(msg),
                "23514" => return StoreError::Validation(DomainError::validation(msg)),
                _ => {}
            }
        }
    }
    StoreError::DataAccess(map_read_error(operation, err))
}

/// Map sqlx errors on the read path to `DataAccessError`.
fn map_read_error(operation: &str, err: sqlx::Error) -> DataAccessError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            DataAccessError::unavailable(format!("{operation}: {err}"))
        }
        sqlx::Error::Database(db_err) => DataAccessError::query(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        other => DataAccessError::query(format!("sqlx error in {operation}: {other}")),
    }
}
