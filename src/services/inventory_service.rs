// src/services/inventory_service.rs

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, validation::required},
    db::InventoryStore,
    models::inventory::{
        InventoryItem, InventoryListing, ItemFilter, NewInventoryItem, StockUpdate,
    },
    services::{
        barcode::{allocate, barcode_rng, BarcodeRenderer},
        expiry::expiry_alerts,
    },
};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    barcodes: Arc<dyn BarcodeRenderer>,
    alert_threshold_days: i64,
}

impl InventoryService {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        barcodes: Arc<dyn BarcodeRenderer>,
        alert_threshold_days: i64,
    ) -> Self {
        Self { store, barcodes, alert_threshold_days }
    }

    pub fn barcodes(&self) -> &dyn BarcodeRenderer {
        self.barcodes.as_ref()
    }

    // --- UPSERT ---
    // Known name: quantity, expiry and category are overwritten, the barcode stays.
    // New name: a barcode is allocated and rendered before the row is inserted.
    pub async fn upsert(
        &self,
        name: &str,
        quantity: Decimal,
        expiry_date: NaiveDate,
        category: &str,
    ) -> Result<InventoryItem, AppError> {
        let name = required("name", name)?;
        let update = StockUpdate {
            quantity,
            expiry_date,
            category: required("category", category)?,
        };

        if let Some(item) = self.store.update_stock(&name, &update).await? {
            tracing::info!("Updated stock for '{}'", name);
            return Ok(item);
        }

        let barcode_number = self.allocate_barcode().await?;
        let barcode_image = self.barcodes.render(&name, &barcode_number).await?;

        let item = self
            .store
            .insert(NewInventoryItem {
                name,
                quantity,
                expiry_date,
                barcode_image: Some(barcode_image),
                barcode_number: Some(barcode_number),
                category: update.category,
            })
            .await?;

        tracing::info!("Added '{}' with barcode {:?}", item.name, item.barcode_number);
        Ok(item)
    }

    /// Edits an existing item; unknown names are an error rather than an insert.
    pub async fn edit(
        &self,
        name: &str,
        quantity: Decimal,
        expiry_date: NaiveDate,
        category: &str,
    ) -> Result<InventoryItem, AppError> {
        let update = StockUpdate {
            quantity,
            expiry_date,
            category: required("category", category)?,
        };
        self.store
            .update_stock(name, &update)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(name.to_string()))
    }

    pub async fn get(&self, name: &str) -> Result<InventoryItem, AppError> {
        self.store
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(name.to_string()))
    }

    pub async fn query(&self, filter: &ItemFilter) -> Result<Vec<InventoryItem>, AppError> {
        self.store.query(filter).await
    }

    /// Filtered items plus the expiry alerts among them.
    pub async fn list(
        &self,
        filter: &ItemFilter,
        today: NaiveDate,
    ) -> Result<InventoryListing, AppError> {
        let items = self.store.query(filter).await?;
        let alerts = expiry_alerts(&items, today, self.alert_threshold_days);
        Ok(InventoryListing { items, alerts })
    }

    /// `true` if an item was removed.
    pub async fn delete(&self, name: &str) -> Result<bool, AppError> {
        let deleted = self.store.delete_by_name(name).await?;
        if deleted {
            tracing::info!("Deleted '{}'", name);
        } else {
            tracing::info!("Delete of '{}' matched nothing", name);
        }
        Ok(deleted)
    }

    pub async fn replace_all(&self, rows: Vec<NewInventoryItem>) -> Result<u64, AppError> {
        let count = self.store.replace_all(rows).await?;
        tracing::info!("Inventory replaced with {} imported rows", count);
        Ok(count)
    }

    async fn allocate_barcode(&self) -> Result<String, AppError> {
        let store = &self.store;
        allocate(&mut barcode_rng(), move |candidate| async move {
            store.barcode_exists(&candidate).await
        })
        .await
    }
}

/// Builds the listing filter from raw query values. Blank values mean "no filter",
/// and the category sentinels disable the category filter.
pub fn build_filter(
    search: Option<&str>,
    category: Option<&str>,
    expiry_days: Option<&str>,
    quantity_filter: Option<&str>,
    today: NaiveDate,
) -> Result<ItemFilter, AppError> {
    fn present(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    let category = present(category)
        .filter(|c| !crate::models::inventory::ALL_CATEGORIES.contains(c))
        .map(str::to_string);

    let expires_on_or_before = present(expiry_days)
        .map(|days| {
            days.parse::<i64>()
                .ok()
                .and_then(|d| today.checked_add_signed(Duration::try_days(d)?))
                .ok_or_else(|| AppError::InvalidFilter("expiry_days".to_string()))
        })
        .transpose()?;

    let max_quantity = present(quantity_filter)
        .map(|q| {
            q.parse::<Decimal>()
                .map_err(|_| AppError::InvalidFilter("quantity_filter".to_string()))
        })
        .transpose()?;

    Ok(ItemFilter {
        search: present(search).map(str::to_string),
        category,
        expires_on_or_before,
        max_quantity,
    })
}
