//! Postgres-backed inventory store.
//!
//! One table per entity with unique keys on `product_id` and `gate_pass_number`.
//! Every mutation runs in a single transaction:
//!
//! - intake locks the `products` table against concurrent inserts so two intakes
//!   of the same (name, type, origin) cannot both create a record;
//! - issuance locks the referenced product rows (`FOR UPDATE`), reconciles, applies
//!   the changes and inserts the gate pass before committing.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |----------------------|------------|----------|
//! | `23505` | `DuplicateProductId` / `DuplicateGatePassNumber` | unique key already taken |
//! | `23514` | `Domain(Validation)` | check constraint (e.g. negative quantity) |
//! | other | `Database` | connection failures, other database errors |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

use gatepass_core::{DomainError, GatePassNumber, ProductId};
use gatepass_inventory::{
    GatePass, GatePassDraft, NewProduct, Product, ReconciliationMode, ShipmentLineItem, StockChange,
    reconcile,
};

use super::{InventoryStore, IntakeOutcome, IssuedGatePass, StoreError, StoreResult};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS products (
        product_id   TEXT PRIMARY KEY,
        name         TEXT NOT NULL,
        transport    TEXT NOT NULL,
        description  TEXT,
        quantity     BIGINT NOT NULL CHECK (quantity >= 0),
        origin       TEXT NOT NULL,
        destination  TEXT NOT NULL,
        product_type TEXT NOT NULL,
        remarks      TEXT,
        created_at   TIMESTAMPTZ NOT NULL,
        updated_at   TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS products_identity_idx
        ON products (lower(name), product_type, origin)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS gate_passes (
        gate_pass_number TEXT PRIMARY KEY,
        date             TEXT NOT NULL,
        origin           TEXT NOT NULL,
        destination      TEXT NOT NULL,
        products         JSONB NOT NULL,
        prepared_by      TEXT NOT NULL,
        checked_by       TEXT,
        authorized_by    TEXT,
        generated_at     TIMESTAMPTZ NOT NULL
    )
    "#,
];

const PRODUCT_COLUMNS: &str = "product_id, name, transport, description, quantity, origin, \
     destination, product_type, remarks, created_at, updated_at";

const GATE_PASS_COLUMNS: &str = "gate_pass_number, date, origin, destination, products, \
     prepared_by, checked_by, authorized_by, generated_at";

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        info!("inventory schema ready");
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23514") => StoreError::Domain(DomainError::validation(msg)),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn corrupt(field: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{field}: {err}"))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let get_err = |e: sqlx::Error| map_sqlx_error("decode_product", e);
    let product_id: String = row.try_get("product_id").map_err(get_err)?;
    let transport: String = row.try_get("transport").map_err(get_err)?;
    let product_type: String = row.try_get("product_type").map_err(get_err)?;

    Ok(Product {
        product_id: product_id.parse().map_err(|e| corrupt("product_id", e))?,
        name: row.try_get("name").map_err(get_err)?,
        transport: transport.parse().map_err(|e| corrupt("transport", e))?,
        description: row.try_get("description").map_err(get_err)?,
        quantity: row.try_get("quantity").map_err(get_err)?,
        origin: row.try_get("origin").map_err(get_err)?,
        destination: row.try_get("destination").map_err(get_err)?,
        product_type: product_type.parse().map_err(|e| corrupt("product_type", e))?,
        remarks: row.try_get("remarks").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

fn gate_pass_from_row(row: &PgRow) -> StoreResult<GatePass> {
    let get_err = |e: sqlx::Error| map_sqlx_error("decode_gate_pass", e);
    let number: String = row.try_get("gate_pass_number").map_err(get_err)?;
    let products: sqlx::types::Json<Vec<ShipmentLineItem>> = row.try_get("products").map_err(get_err)?;

    let draft = GatePassDraft {
        date: row.try_get("date").map_err(get_err)?,
        origin: row.try_get("origin").map_err(get_err)?,
        destination: row.try_get("destination").map_err(get_err)?,
        products: products.0,
        prepared_by: row.try_get("prepared_by").map_err(get_err)?,
        checked_by: row.try_get("checked_by").map_err(get_err)?,
        authorized_by: row.try_get("authorized_by").map_err(get_err)?,
    };
    let number: GatePassNumber = number.parse().map_err(|e| corrupt("gate_pass_number", e))?;
    Ok(GatePass::rehydrate(number, draft, row.try_get("generated_at").map_err(get_err)?))
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    fn backend(&self) -> &'static str {
        "PostgreSQL"
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1");
        let row = sqlx::query(&sql)
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, intake), fields(name = %intake.name), err)]
    async fn receive_stock(
        &self,
        intake: NewProduct,
        candidate_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<IntakeOutcome> {
        intake.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        sqlx::query("LOCK TABLE products IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_products", e))?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE lower(name) = lower($1) AND product_type = $2 AND origin = $3 \
             ORDER BY created_at ASC LIMIT 1"
        );
        let existing = sqlx::query(&sql)
            .bind(&intake.name)
            .bind(intake.product_type.as_str())
            .bind(&intake.origin)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;

        let outcome = if let Some(row) = existing {
            let mut product = product_from_row(&row)?;
            product.receive(intake.quantity, now)?;
            sqlx::query("UPDATE products SET quantity = $1, updated_at = $2 WHERE product_id = $3")
                .bind(product.quantity)
                .bind(product.updated_at)
                .bind(product.product_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("replenish_product", e))?;
            IntakeOutcome {
                product,
                created: false,
            }
        } else {
            let product = intake.into_product(candidate_id, now);
            let sql = format!(
                "INSERT INTO products ({PRODUCT_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
            );
            sqlx::query(&sql)
                .bind(product.product_id.as_str())
                .bind(&product.name)
                .bind(product.transport.as_str())
                .bind(&product.description)
                .bind(product.quantity)
                .bind(&product.origin)
                .bind(&product.destination)
                .bind(product.product_type.as_str())
                .bind(&product.remarks)
                .bind(product.created_at)
                .bind(product.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::DuplicateProductId(product.product_id.clone())
                    } else {
                        map_sqlx_error("insert_product", e)
                    }
                })?;
            IntakeOutcome {
                product,
                created: true,
            }
        };

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(outcome)
    }

    #[instrument(skip(self), err)]
    async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(product_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;

        let mut product = product_from_row(&row)?;
        product.override_quantity(quantity, now)?;

        sqlx::query("UPDATE products SET quantity = $1, updated_at = $2 WHERE product_id = $3")
            .bind(product.quantity)
            .bind(product.updated_at)
            .bind(product.product_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_quantity", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(product)
    }

    #[instrument(skip(self), err)]
    async fn delete_product(&self, product_id: &ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("product {product_id}")).into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_gate_passes(&self) -> StoreResult<Vec<GatePass>> {
        let sql = format!("SELECT {GATE_PASS_COLUMNS} FROM gate_passes ORDER BY generated_at DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_gate_passes", e))?;
        rows.iter().map(gate_pass_from_row).collect()
    }

    #[instrument(skip(self, gate_pass), fields(number = %gate_pass.gate_pass_number()), err)]
    async fn issue_gate_pass(
        &self,
        gate_pass: GatePass,
        mode: ReconciliationMode,
    ) -> StoreResult<IssuedGatePass> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let ids: Vec<String> = gate_pass
            .products()
            .iter()
            .map(|item| item.product_id.to_string())
            .collect();

        // Lock in a stable order so concurrent issuances cannot deadlock.
        let rows = sqlx::query(
            "SELECT product_id, quantity FROM products \
             WHERE product_id = ANY($1) ORDER BY product_id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock", e))?;

        let mut stock: HashMap<String, i64> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("product_id").map_err(|e| map_sqlx_error("lock_stock", e))?;
            let quantity: i64 = row.try_get("quantity").map_err(|e| map_sqlx_error("lock_stock", e))?;
            stock.insert(id, quantity);
        }

        let plan = reconcile(mode, gate_pass.products(), |id| stock.get(id.as_str()).copied())?;
        let now = gate_pass.generated_at();

        for change in plan.changes() {
            match change {
                StockChange::Decrement {
                    product_id,
                    remaining,
                } => {
                    sqlx::query("UPDATE products SET quantity = $1, updated_at = $2 WHERE product_id = $3")
                        .bind(*remaining)
                        .bind(now)
                        .bind(product_id.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("decrement_stock", e))?;
                }
                StockChange::Remove { product_id } => {
                    sqlx::query("DELETE FROM products WHERE product_id = $1")
                        .bind(product_id.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("remove_stock", e))?;
                }
            }
        }

        let sql = format!(
            "INSERT INTO gate_passes ({GATE_PASS_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
        sqlx::query(&sql)
            .bind(gate_pass.gate_pass_number().as_str())
            .bind(gate_pass.date())
            .bind(gate_pass.origin())
            .bind(gate_pass.destination())
            .bind(sqlx::types::Json(gate_pass.products()))
            .bind(gate_pass.prepared_by())
            .bind(gate_pass.checked_by())
            .bind(gate_pass.authorized_by())
            .bind(gate_pass.generated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateGatePassNumber(gate_pass.gate_pass_number().clone())
                } else {
                    map_sqlx_error("insert_gate_pass", e)
                }
            })?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(IssuedGatePass { gate_pass, plan })
    }
}

#[cfg(test)]
mod tests {
    //! Runs against a real database only when `DATABASE_URL` is set.

    use super::*;
    use gatepass_inventory::{DEFAULT_DESTINATION, DEFAULT_GATE_PASS_ORIGIN, ProductType, TransportMode};

    async fn store() -> Option<PostgresInventoryStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let store = PostgresInventoryStore::connect(&url).await.ok()?;
        Some(store)
    }

    fn unique_name(prefix: &str) -> String {
        format!("{prefix}-{}", ProductId::generate(Utc::now()))
    }

    fn intake(name: &str, quantity: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            transport: TransportMode::Sea,
            description: None,
            quantity,
            origin: "Chennai GIS".to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            product_type: ProductType::Furniture,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn intake_and_issue_round_trip() {
        let Some(store) = store().await else {
            return;
        };

        let name = unique_name("Chair");
        let first = store
            .receive_stock(intake(&name, 30), ProductId::generate(Utc::now()), Utc::now())
            .await
            .unwrap();
        let second = store
            .receive_stock(intake(&name.to_uppercase(), 20), ProductId::generate(Utc::now()), Utc::now())
            .await
            .unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.product.quantity, 50);

        let product_id = first.product.product_id.clone();
        let number: GatePassNumber = unique_name("GP-TEST").parse().unwrap();
        let gate_pass = GatePassDraft {
            date: "2025-04-01".to_string(),
            origin: DEFAULT_GATE_PASS_ORIGIN.to_string(),
            destination: "Guntur".to_string(),
            products: vec![ShipmentLineItem {
                product_id: product_id.clone(),
                name: name.clone(),
                transport: Some(TransportMode::Sea),
                description: None,
                selected_quantity: 50,
                product_type: Some(ProductType::Furniture),
                remarks: None,
            }],
            prepared_by: "Clerk".to_string(),
            checked_by: None,
            authorized_by: None,
        }
        .issue(number, Utc::now())
        .unwrap();

        store
            .issue_gate_pass(gate_pass.clone(), ReconciliationMode::Strict)
            .await
            .unwrap();

        assert!(store.get_product(&product_id).await.unwrap().is_none());
        let passes = store.list_gate_passes().await.unwrap();
        let stored = passes
            .iter()
            .find(|g| g.gate_pass_number() == gate_pass.gate_pass_number())
            .unwrap();
        assert_eq!(stored.products(), gate_pass.products());
    }
}
