// src/db/inventory_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    models::inventory::{InventoryItem, ItemFilter, NewInventoryItem, StockUpdate},
};

/// Row storage for stock items. Every call is its own auto-committing unit of work.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<InventoryItem>, AppError>;

    async fn barcode_exists(&self, barcode_number: &str) -> Result<bool, AppError>;

    /// Inserts the row. If the name was taken in the meantime the existing row gets the new
    /// quantity, expiry and category and keeps its barcode.
    async fn insert(&self, item: NewInventoryItem) -> Result<InventoryItem, AppError>;

    /// Overwrites quantity, expiry and category of the named item.
    /// `None` when no item has that name.
    async fn update_stock(
        &self,
        name: &str,
        update: &StockUpdate,
    ) -> Result<Option<InventoryItem>, AppError>;

    async fn query(&self, filter: &ItemFilter) -> Result<Vec<InventoryItem>, AppError>;

    /// Whether any item name contains `fragment`, ignoring case.
    async fn any_name_contains(&self, fragment: &str) -> Result<bool, AppError>;

    /// `true` when a row was removed.
    async fn delete_by_name(&self, name: &str) -> Result<bool, AppError>;

    /// Clears the store and writes `rows`, all or nothing.
    async fn replace_all(&self, rows: Vec<NewInventoryItem>) -> Result<u64, AppError>;
}

// LIKE pattern matching `fragment` anywhere, with its own wildcards escaped.
pub(crate) fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Clone)]
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_barcode_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation()
            && db_err.constraint() == Some("inventory_barcode_number_key")
        {
            return AppError::BarcodeGeneration("barcode number already in use".to_string());
        }
    }
    e.into()
}

#[async_trait]
impl InventoryStore for PgInventoryRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<InventoryItem>, AppError> {
        let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn barcode_exists(&self, barcode_number: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory WHERE barcode_number = $1)",
        )
        .bind(barcode_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, item: NewInventoryItem) -> Result<InventoryItem, AppError> {
        sqlx::query_as::<_, InventoryItem>(
            r#"
            INSERT INTO inventory (name, quantity, expiry_date, barcode_image, barcode_number, category)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name)
            DO UPDATE SET
                quantity = EXCLUDED.quantity,
                expiry_date = EXCLUDED.expiry_date,
                category = EXCLUDED.category,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.expiry_date)
        .bind(&item.barcode_image)
        .bind(&item.barcode_number)
        .bind(&item.category)
        .fetch_one(&self.pool)
        .await
        .map_err(map_barcode_conflict)
    }

    async fn update_stock(
        &self,
        name: &str,
        update: &StockUpdate,
    ) -> Result<Option<InventoryItem>, AppError> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            UPDATE inventory
            SET quantity = $1, expiry_date = $2, category = $3, updated_at = NOW()
            WHERE name = $4
            RETURNING *
            "#,
        )
        .bind(update.quantity)
        .bind(update.expiry_date)
        .bind(&update.category)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn query(&self, filter: &ItemFilter) -> Result<Vec<InventoryItem>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM inventory WHERE TRUE");

        if let Some(search) = &filter.search {
            let pattern = contains_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR barcode_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(cutoff) = filter.expires_on_or_before {
            qb.push(" AND expiry_date <= ").push_bind(cutoff);
        }
        if let Some(max) = filter.max_quantity {
            qb.push(" AND quantity <= ").push_bind(max);
        }
        qb.push(" ORDER BY created_at ASC, name ASC");

        let items = qb
            .build_query_as::<InventoryItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn any_name_contains(&self, fragment: &str) -> Result<bool, AppError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory WHERE name ILIKE $1)",
        )
        .bind(contains_pattern(fragment))
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM inventory WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_all(&self, rows: Vec<NewInventoryItem>) -> Result<u64, AppError> {
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM inventory").execute(&mut *tx).await?;

        let mut inserted = 0;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO inventory (name, quantity, expiry_date, barcode_image, barcode_number, category)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&row.name)
            .bind(row.quantity)
            .bind(row.expiry_date)
            .bind(&row.barcode_image)
            .bind(&row.barcode_number)
            .bind(&row.category)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
