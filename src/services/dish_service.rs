// src/services/dish_service.rs

use std::sync::Arc;

use crate::{
    common::{error::AppError, validation::required},
    db::{DishRegistry, InventoryStore},
    models::dish::{Availability, Dish},
};

/// Separator between ingredient names in a dish's ingredient list.
pub const INGREDIENT_SEPARATOR: &str = ", ";

/// Single `missing` entry reported when the dish itself is unknown.
pub const DISH_NOT_FOUND: &str = "dish not found";

/// Ingredient names in their listed order. Blank entries are skipped.
pub fn split_ingredients(ingredients: &str) -> Vec<&str> {
    ingredients
        .split(INGREDIENT_SEPARATOR)
        .filter(|ingredient| !ingredient.trim().is_empty())
        .collect()
}

// A dish lists at least one non-blank ingredient.
fn ingredient_list(ingredients: &str) -> Result<String, AppError> {
    let ingredients = required("ingredients", ingredients)?;
    if split_ingredients(&ingredients).is_empty() {
        return Err(AppError::BlankField("ingredients"));
    }
    Ok(ingredients)
}

#[derive(Clone)]
pub struct DishService {
    dishes: Arc<dyn DishRegistry>,
    inventory: Arc<dyn InventoryStore>,
}

impl DishService {
    pub fn new(dishes: Arc<dyn DishRegistry>, inventory: Arc<dyn InventoryStore>) -> Self {
        Self { dishes, inventory }
    }

    pub async fn add(&self, dish_name: &str, ingredients: &str) -> Result<Dish, AppError> {
        let dish_name = required("dishName", dish_name)?;
        let ingredients = ingredient_list(ingredients)?;
        let dish = self.dishes.add(&dish_name, &ingredients).await?;
        tracing::info!("Dish '{}' added", dish.dish_name);
        Ok(dish)
    }

    pub async fn update_ingredients(
        &self,
        dish_name: &str,
        ingredients: &str,
    ) -> Result<Dish, AppError> {
        let ingredients = ingredient_list(ingredients)?;
        let dish = self
            .dishes
            .update_ingredients(dish_name, &ingredients)
            .await?
            .ok_or_else(|| AppError::DishNotFound(dish_name.to_string()))?;
        tracing::info!("Dish '{}' updated", dish.dish_name);
        Ok(dish)
    }

    pub async fn get(&self, dish_name: &str) -> Result<Dish, AppError> {
        self.dishes
            .get(dish_name)
            .await?
            .ok_or_else(|| AppError::DishNotFound(dish_name.to_string()))
    }

    pub async fn list_all(&self) -> Result<Vec<Dish>, AppError> {
        self.dishes.list_all().await
    }

    /// Whether every ingredient of the dish is in stock. An unknown dish is reported as
    /// unavailable with the `DISH_NOT_FOUND` entry.
    pub async fn check(&self, dish_name: &str) -> Result<Availability, AppError> {
        match self.dishes.get(dish_name).await? {
            Some(dish) => self.check_dish(&dish).await,
            None => Ok(Availability {
                dish_name: dish_name.to_string(),
                fully_available: false,
                missing: vec![DISH_NOT_FOUND.to_string()],
            }),
        }
    }

    /// Availability of every registered dish.
    pub async fn suggest(&self) -> Result<Vec<Availability>, AppError> {
        let dishes = self.dishes.list_all().await?;
        let mut suggestions = Vec::with_capacity(dishes.len());
        for dish in &dishes {
            suggestions.push(self.check_dish(dish).await?);
        }
        Ok(suggestions)
    }

    // An ingredient counts as stocked when any item name contains it, so "tomato" is
    // satisfied by "Fresh Tomato".
    async fn check_dish(&self, dish: &Dish) -> Result<Availability, AppError> {
        let mut missing = Vec::new();
        for ingredient in split_ingredients(&dish.ingredients) {
            if !self.inventory.any_name_contains(ingredient).await? {
                missing.push(ingredient.to_string());
            }
        }

        Ok(Availability {
            dish_name: dish.dish_name.clone(),
            fully_available: missing.is_empty(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryDishRegistry, MemoryInventoryStore};
    use crate::models::inventory::NewInventoryItem;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn stock(name: &str) -> NewInventoryItem {
        NewInventoryItem {
            name: name.to_string(),
            quantity: Decimal::from(5),
            expiry_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            barcode_image: None,
            barcode_number: None,
            category: "Produce".to_string(),
        }
    }

    async fn service_with(items: &[&str]) -> DishService {
        let inventory = Arc::new(MemoryInventoryStore::new());
        for name in items {
            inventory.insert(stock(name)).await.unwrap();
        }
        DishService::new(Arc::new(MemoryDishRegistry::new()), inventory)
    }

    #[tokio::test]
    async fn salad_is_missing_lettuce() {
        let svc = service_with(&["Fresh Tomato"]).await;
        svc.add("Salad", "tomato, lettuce").await.unwrap();

        let availability = svc.check("Salad").await.unwrap();

        assert!(!availability.fully_available);
        assert_eq!(availability.missing, ["lettuce"]);
    }

    #[tokio::test]
    async fn fully_stocked_dish_is_available() {
        let svc = service_with(&["Fresh Tomato", "Iceberg Lettuce"]).await;
        svc.add("Salad", "tomato, lettuce").await.unwrap();

        let availability = svc.check("Salad").await.unwrap();

        assert!(availability.fully_available);
        assert!(availability.missing.is_empty());
    }

    #[tokio::test]
    async fn unknown_dish_reports_the_sentinel() {
        let svc = service_with(&["Rice"]).await;

        let availability = svc.check("Paella").await.unwrap();

        assert!(!availability.fully_available);
        assert_eq!(availability.missing, [DISH_NOT_FOUND]);
        assert!(matches!(svc.get("Paella").await, Err(AppError::DishNotFound(_))));
    }

    #[tokio::test]
    async fn missing_ingredients_keep_their_order() {
        let svc = service_with(&["Basmati Rice"]).await;
        svc.add("Biryani", "saffron, rice, chicken, yoghurt").await.unwrap();

        let availability = svc.check("Biryani").await.unwrap();

        assert_eq!(availability.missing, ["saffron", "chicken", "yoghurt"]);
    }

    #[tokio::test]
    async fn updated_ingredients_are_used_by_the_next_check() {
        let svc = service_with(&["Fresh Tomato"]).await;
        svc.add("Salad", "tomato, lettuce").await.unwrap();
        svc.update_ingredients("Salad", "tomato").await.unwrap();

        assert!(svc.check("Salad").await.unwrap().fully_available);
        assert!(matches!(
            svc.update_ingredients("Soup", "water").await,
            Err(AppError::DishNotFound(_))
        ));
    }

    #[tokio::test]
    async fn suggestions_cover_every_dish() {
        let svc = service_with(&["Rice", "Egg"]).await;
        svc.add("Fried Rice", "Rice, Egg").await.unwrap();
        svc.add("Omelette", "Egg, Cheese").await.unwrap();

        let suggestions = svc.suggest().await.unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].dish_name, "Fried Rice");
        assert!(suggestions[0].fully_available);
        assert_eq!(suggestions[1].missing, ["Cheese"]);
    }

    #[tokio::test]
    async fn blank_dish_names_and_ingredient_lists_are_rejected() {
        let svc = service_with(&[]).await;

        assert!(matches!(svc.add("  ", "tomato").await, Err(AppError::BlankField("dishName"))));
        assert!(matches!(svc.add("Salad", "   ").await, Err(AppError::BlankField("ingredients"))));
        assert!(svc.list_all().await.unwrap().is_empty());

        svc.add(" Salad ", "tomato").await.unwrap();
        assert_eq!(svc.get("Salad").await.unwrap().dish_name, "Salad");
        assert!(matches!(
            svc.update_ingredients("Salad", "  ").await,
            Err(AppError::BlankField("ingredients"))
        ));
    }

    #[tokio::test]
    async fn blank_segments_between_ingredients_are_ignored() {
        let svc = service_with(&[]).await;
        svc.add("Salad", "tomato, , lettuce").await.unwrap();

        let availability = svc.check("Salad").await.unwrap();

        assert_eq!(availability.missing, ["tomato", "lettuce"]);
    }

    #[test]
    fn splits_on_comma_space_only() {
        assert_eq!(split_ingredients("a, b, c"), ["a", "b", "c"]);
        assert_eq!(split_ingredients("salt,pepper"), ["salt,pepper"]);
        assert!(split_ingredients("").is_empty());
    }

    proptest! {
        #[test]
        fn missing_is_the_unmatched_subset(
            ingredients in prop::collection::vec("[a-z]{1,6}", 1..6),
            stocked in prop::collection::vec("[a-z ]{1,10}", 0..6),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let joined = ingredients.join(INGREDIENT_SEPARATOR);

            let availability = rt.block_on(async {
                let svc = service_with(&stocked.iter().map(String::as_str).collect::<Vec<_>>()).await;
                svc.add("Dish", &joined).await.unwrap();
                svc.check("Dish").await.unwrap()
            });

            for name in &availability.missing {
                prop_assert!(ingredients.contains(name));
            }
            for ingredient in &ingredients {
                let stocked_somewhere = stocked.iter().any(|s| s.contains(ingredient.as_str()));
                prop_assert_eq!(stocked_somewhere, !availability.missing.contains(ingredient));
            }
            prop_assert_eq!(availability.fully_available, availability.missing.is_empty());
        }
    }
}
