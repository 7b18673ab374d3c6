// src/db/memory.rs

//! Process-local stores, used when no DATABASE_URL is configured and by the tests.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DishRegistry, InventoryStore},
    models::{
        dish::Dish,
        inventory::{InventoryItem, ItemFilter, NewInventoryItem, StockUpdate},
    },
};

#[derive(Default)]
pub struct MemoryInventoryStore {
    items: RwLock<Vec<InventoryItem>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn materialize(row: NewInventoryItem) -> InventoryItem {
    let now = Utc::now();
    InventoryItem {
        id: Uuid::new_v4(),
        name: row.name,
        quantity: row.quantity,
        expiry_date: row.expiry_date,
        barcode_image: row.barcode_image,
        barcode_number: row.barcode_number,
        category: row.category,
        created_at: now,
        updated_at: now,
    }
}

fn apply(item: &mut InventoryItem, update: &StockUpdate) {
    item.quantity = update.quantity;
    item.expiry_date = update.expiry_date;
    item.category = update.category.clone();
    item.updated_at = Utc::now();
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<InventoryItem>, AppError> {
        let items = self.items.read().await;
        Ok(items.iter().find(|item| item.name == name).cloned())
    }

    async fn barcode_exists(&self, barcode_number: &str) -> Result<bool, AppError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .any(|item| item.barcode_number.as_deref() == Some(barcode_number)))
    }

    async fn insert(&self, row: NewInventoryItem) -> Result<InventoryItem, AppError> {
        let mut items = self.items.write().await;

        if let Some(existing) = items.iter_mut().find(|item| item.name == row.name) {
            let update = StockUpdate {
                quantity: row.quantity,
                expiry_date: row.expiry_date,
                category: row.category,
            };
            apply(existing, &update);
            return Ok(existing.clone());
        }

        if let Some(code) = row.barcode_number.as_deref() {
            if items.iter().any(|item| item.barcode_number.as_deref() == Some(code)) {
                return Err(AppError::BarcodeGeneration(
                    "barcode number already in use".to_string(),
                ));
            }
        }

        let item = materialize(row);
        items.push(item.clone());
        Ok(item)
    }

    async fn update_stock(
        &self,
        name: &str,
        update: &StockUpdate,
    ) -> Result<Option<InventoryItem>, AppError> {
        let mut items = self.items.write().await;
        Ok(items.iter_mut().find(|item| item.name == name).map(|item| {
            apply(item, update);
            item.clone()
        }))
    }

    async fn query(&self, filter: &ItemFilter) -> Result<Vec<InventoryItem>, AppError> {
        let items = self.items.read().await;
        Ok(items.iter().filter(|item| filter.matches(item)).cloned().collect())
    }

    async fn any_name_contains(&self, fragment: &str) -> Result<bool, AppError> {
        let needle = fragment.to_lowercase();
        let items = self.items.read().await;
        Ok(items.iter().any(|item| item.name.to_lowercase().contains(&needle)))
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, AppError> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|item| item.name != name);
        Ok(items.len() < before)
    }

    async fn replace_all(&self, rows: Vec<NewInventoryItem>) -> Result<u64, AppError> {
        let fresh: Vec<InventoryItem> = rows.into_iter().map(materialize).collect();
        let count = fresh.len() as u64;
        *self.items.write().await = fresh;
        Ok(count)
    }
}

#[derive(Default)]
pub struct MemoryDishRegistry {
    dishes: RwLock<Vec<Dish>>,
}

impl MemoryDishRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DishRegistry for MemoryDishRegistry {
    async fn add(&self, dish_name: &str, ingredients: &str) -> Result<Dish, AppError> {
        let mut dishes = self.dishes.write().await;
        if dishes.iter().any(|dish| dish.dish_name == dish_name) {
            return Err(AppError::DishAlreadyExists(dish_name.to_string()));
        }
        let dish = Dish {
            id: Uuid::new_v4(),
            dish_name: dish_name.to_string(),
            ingredients: ingredients.to_string(),
            created_at: Utc::now(),
        };
        dishes.push(dish.clone());
        Ok(dish)
    }

    async fn update_ingredients(
        &self,
        dish_name: &str,
        ingredients: &str,
    ) -> Result<Option<Dish>, AppError> {
        let mut dishes = self.dishes.write().await;
        Ok(dishes
            .iter_mut()
            .find(|dish| dish.dish_name == dish_name)
            .map(|dish| {
                dish.ingredients = ingredients.to_string();
                dish.clone()
            }))
    }

    async fn get(&self, dish_name: &str) -> Result<Option<Dish>, AppError> {
        let dishes = self.dishes.read().await;
        Ok(dishes.iter().find(|dish| dish.dish_name == dish_name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Dish>, AppError> {
        let mut dishes = self.dishes.read().await.clone();
        dishes.sort_by(|a, b| a.dish_name.cmp(&b.dish_name));
        Ok(dishes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn row(name: &str, barcode: Option<&str>) -> NewInventoryItem {
        NewInventoryItem {
            name: name.to_string(),
            quantity: Decimal::from(3),
            expiry_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            barcode_image: None,
            barcode_number: barcode.map(str::to_string),
            category: "Dry".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_on_taken_name_keeps_the_first_barcode() {
        let store = MemoryInventoryStore::new();
        store.insert(row("Rice", Some("111111111111"))).await.unwrap();
        let again = store.insert(row("Rice", Some("222222222222"))).await.unwrap();

        assert_eq!(again.barcode_number.as_deref(), Some("111111111111"));
        assert_eq!(store.query(&ItemFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn name_containment_ignores_case() {
        let store = MemoryInventoryStore::new();
        store.insert(row("Fresh Tomato", None)).await.unwrap();

        assert!(store.any_name_contains("tomato").await.unwrap());
        assert!(store.any_name_contains("TOM").await.unwrap());
        assert!(!store.any_name_contains("lettuce").await.unwrap());
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_matched() {
        let store = MemoryInventoryStore::new();
        store.insert(row("Rice", None)).await.unwrap();

        assert!(store.delete_by_name("Rice").await.unwrap());
        assert!(!store.delete_by_name("Rice").await.unwrap());
    }

    #[tokio::test]
    async fn dish_names_are_unique() {
        let registry = MemoryDishRegistry::new();
        registry.add("Salad", "tomato, lettuce").await.unwrap();

        let err = registry.add("Salad", "cucumber").await.unwrap_err();
        assert!(matches!(err, AppError::DishAlreadyExists(name) if name == "Salad"));
    }
}
