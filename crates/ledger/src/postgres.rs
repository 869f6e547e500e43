use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Candidate, InventoryRecord, LedgerError, Money, Order, OrderId, OrderStatus, PriceChange,
    Product, ProductId, Reservation, ReservedOrder, Result, StockChange, Vendor, VendorId,
    VendorProduct,
    store::{Ledger, validate_price, validate_stock},
};

const RECORD_COLUMNS: &str = "vendor_id, product_id, price_cents, stock, version, updated_at";

const ORDER_COLUMNS: &str = "id, product_id, quantity, allocated_vendor_id, status, \
     unit_price_cents, vendor_name, created_at";

/// PostgreSQL-backed ledger implementation.
///
/// Stock is only ever taken through a conditional `UPDATE ... WHERE stock >= $n`,
/// which locks the row and re-evaluates the guard against the committed
/// value. Vendor edits lock the same row with `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: &PgRow) -> Result<InventoryRecord> {
        Ok(InventoryRecord {
            vendor_id: VendorId::new(row.try_get("vendor_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: to_count(row.try_get("stock")?)?,
            version: row.try_get("version")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status_text: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_text).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown order status: {status_text}").into())
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: to_count(row.try_get("quantity")?)?,
            allocated_vendor_id: VendorId::new(row.try_get("allocated_vendor_id")?),
            status,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            vendor_name: row.try_get("vendor_name")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Guarded decrement on an open connection or transaction.
    ///
    /// Returns the remaining stock and the row's price at the moment of the
    /// decrement.
    async fn take_stock(
        conn: &mut PgConnection,
        reservation: &Reservation,
    ) -> Result<(u32, Money)> {
        let updated: Option<(i32, i64)> = sqlx::query_as(
            r#"
            UPDATE vendor_products
            SET stock = stock - $3, version = version + 1, updated_at = NOW()
            WHERE vendor_id = $1 AND product_id = $2 AND stock >= $3
            RETURNING stock, price_cents
            "#,
        )
        .bind(reservation.vendor_id.as_i64())
        .bind(reservation.product_id.as_i64())
        .bind(i64::from(reservation.quantity))
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;

        if let Some((stock, price_cents)) = updated {
            return Ok((to_count(stock)?, Money::from_cents(price_cents)));
        }

        // The guard rejected the update; find out why.
        let available: Option<i32> = sqlx::query_scalar(
            "SELECT stock FROM vendor_products WHERE vendor_id = $1 AND product_id = $2",
        )
        .bind(reservation.vendor_id.as_i64())
        .bind(reservation.product_id.as_i64())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;

        Err(match available {
            Some(stock) => LedgerError::InsufficientStock {
                vendor_id: reservation.vendor_id,
                product_id: reservation.product_id,
                available: to_count(stock)?,
                requested: reservation.quantity,
            },
            None => LedgerError::RecordNotFound {
                vendor_id: reservation.vendor_id,
                product_id: reservation.product_id,
            },
        })
    }

    /// Locks a row for a vendor edit.
    async fn lock_record(
        conn: &mut PgConnection,
        vendor_id: VendorId,
        product_id: ProductId,
    ) -> Result<InventoryRecord> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM vendor_products \
             WHERE vendor_id = $1 AND product_id = $2 FOR UPDATE"
        ))
        .bind(vendor_id.as_i64())
        .bind(product_id.as_i64())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;

        match row {
            Some(row) => Self::row_to_record(&row),
            None => Err(LedgerError::RecordNotFound {
                vendor_id,
                product_id,
            }),
        }
    }
}

/// Stock and quantity columns are constrained non-negative; a negative value
/// is a decode error, never a silent zero.
fn to_count(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        sqlx::Error::Decode(format!("negative count in ledger row: {value}").into()).into()
    })
}

/// Maps serialization failures and deadlocks to a retryable conflict.
fn map_db_error(e: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(ref db_err) = e
        && matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
    {
        metrics::counter!("ledger_transaction_conflicts_total").increment(1);
        return LedgerError::Conflict(db_err.message().to_string());
    }
    LedgerError::Database(e)
}

#[async_trait]
impl Ledger for PostgresLedger {
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query("SELECT id, code, name FROM products WHERE id = $1")
            .bind(product_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Product {
                id: ProductId::new(row.try_get("id")?),
                code: row.try_get("code")?,
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM vendors WHERE id = $1")
            .bind(vendor_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(name.map(|name| Vendor::new(vendor_id, name)))
    }

    async fn list_eligible_candidates(&self, product_id: ProductId) -> Result<Vec<Candidate>> {
        let rows: Vec<(i64, i64, i32)> = sqlx::query_as(
            r#"
            SELECT vendor_id, price_cents, stock
            FROM vendor_products
            WHERE product_id = $1 AND stock > 0
            ORDER BY price_cents ASC, vendor_id ASC
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(vendor_id, price_cents, stock)| {
                Ok(Candidate::new(
                    VendorId::new(vendor_id),
                    Money::from_cents(price_cents),
                    to_count(stock)?,
                ))
            })
            .collect()
    }

    async fn get_record(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
    ) -> Result<Option<InventoryRecord>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM vendor_products WHERE vendor_id = $1 AND product_id = $2"
        ))
        .bind(vendor_id.as_i64())
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn list_vendor_records(&self, vendor_id: VendorId) -> Result<Vec<VendorProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT vp.vendor_id, vp.product_id, vp.price_cents, vp.stock, vp.version,
                   vp.updated_at, p.code, p.name
            FROM vendor_products vp
            JOIN products p ON p.id = vp.product_id
            WHERE vp.vendor_id = $1
            ORDER BY vp.product_id ASC
            "#,
        )
        .bind(vendor_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<VendorProduct> {
                let record = Self::row_to_record(row)?;
                let product = Product {
                    id: record.product_id,
                    code: row.try_get("code")?,
                    name: row.try_get("name")?,
                };
                Ok(VendorProduct { record, product })
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn decrement(&self, reservation: &Reservation) -> Result<u32> {
        let mut tx = self.pool.begin().await?;
        let (remaining, _) = Self::take_stock(&mut tx, reservation).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(remaining)
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_and_record(
        &self,
        reservation: &Reservation,
        order_id: OrderId,
    ) -> Result<ReservedOrder> {
        // Dropping the transaction on any early return rolls back the decrement.
        let mut tx = self.pool.begin().await?;

        let (remaining_stock, unit_price) = Self::take_stock(&mut tx, reservation).await?;

        let vendor_name = sqlx::query_scalar::<_, String>("SELECT name FROM vendors WHERE id = $1")
            .bind(reservation.vendor_id.as_i64())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .ok_or(LedgerError::VendorNotFound(reservation.vendor_id))?;

        let order = Order {
            id: order_id,
            product_id: reservation.product_id,
            quantity: reservation.quantity,
            allocated_vendor_id: reservation.vendor_id,
            status: OrderStatus::Allocated,
            unit_price,
            vendor_name,
            created_at: Utc::now(),
        };

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(order.id.as_uuid())
        .bind(order.product_id.as_i64())
        .bind(i64::from(order.quantity))
        .bind(order.allocated_vendor_id.as_i64())
        .bind(order.status.as_str())
        .bind(order.unit_price.cents())
        .bind(&order.vendor_name)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(ReservedOrder {
            order,
            remaining_stock,
        })
    }

    async fn enroll(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        price: Money,
        stock: u32,
    ) -> Result<InventoryRecord> {
        validate_price(price)?;
        validate_stock(stock)?;
        let mut tx = self.pool.begin().await?;

        let vendor_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vendors WHERE id = $1)")
                .bind(vendor_id.as_i64())
                .fetch_one(&mut *tx)
                .await?;
        if !vendor_exists {
            return Err(LedgerError::VendorNotFound(vendor_id));
        }

        let product_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id.as_i64())
                .fetch_one(&mut *tx)
                .await?;
        if !product_exists {
            return Err(LedgerError::ProductNotFound(product_id));
        }

        let row = sqlx::query(&format!(
            "INSERT INTO vendor_products (vendor_id, product_id, price_cents, stock) \
             VALUES ($1, $2, $3, $4) RETURNING {RECORD_COLUMNS}"
        ))
        .bind(vendor_id.as_i64())
        .bind(product_id.as_i64())
        .bind(price.cents())
        .bind(i64::from(stock))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("vendor_products_pkey")
            {
                return LedgerError::AlreadyEnrolled {
                    vendor_id,
                    product_id,
                };
            }
            LedgerError::Database(e)
        })?;

        let record = Self::row_to_record(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    async fn update_price(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        price: Money,
    ) -> Result<PriceChange> {
        validate_price(price)?;
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_record(&mut tx, vendor_id, product_id).await?;

        let row = sqlx::query(&format!(
            "UPDATE vendor_products SET price_cents = $3, version = version + 1, updated_at = NOW() \
             WHERE vendor_id = $1 AND product_id = $2 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(vendor_id.as_i64())
        .bind(product_id.as_i64())
        .bind(price.cents())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let record = Self::row_to_record(&row)?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(PriceChange {
            old_price: current.price,
            record,
        })
    }

    async fn update_stock(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        stock: u32,
    ) -> Result<StockChange> {
        validate_stock(stock)?;
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_record(&mut tx, vendor_id, product_id).await?;

        let row = sqlx::query(&format!(
            "UPDATE vendor_products SET stock = $3, version = version + 1, updated_at = NOW() \
             WHERE vendor_id = $1 AND product_id = $2 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(vendor_id.as_i64())
        .bind(product_id.as_i64())
        .bind(i64::from(stock))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let record = Self::row_to_record(&row)?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(StockChange {
            old_stock: current.stock,
            record,
        })
    }

    async fn unenroll(&self, vendor_id: VendorId, product_id: ProductId) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM vendor_products WHERE vendor_id = $1 AND product_id = $2")
                .bind(vendor_id.as_i64())
                .bind(product_id.as_i64())
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::RecordNotFound {
                vendor_id,
                product_id,
            });
        }
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn list_orders_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE allocated_vendor_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(vendor_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_order).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_counts_are_decode_errors() {
        assert_eq!(to_count(0).unwrap(), 0);
        assert_eq!(to_count(i32::MAX).unwrap(), 2_147_483_647);
        assert!(matches!(
            to_count(-1),
            Err(LedgerError::Database(sqlx::Error::Decode(_)))
        ));
    }
}
