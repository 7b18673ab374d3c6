// src/db/dish_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{common::error::AppError, models::dish::Dish};

/// Dish name → ingredient list. Ingredients are kept as the delimited string the caller sent.
#[async_trait]
pub trait DishRegistry: Send + Sync {
    /// Fails with `DishAlreadyExists` when the name is taken.
    async fn add(&self, dish_name: &str, ingredients: &str) -> Result<Dish, AppError>;

    async fn update_ingredients(
        &self,
        dish_name: &str,
        ingredients: &str,
    ) -> Result<Option<Dish>, AppError>;

    async fn get(&self, dish_name: &str) -> Result<Option<Dish>, AppError>;

    async fn list_all(&self) -> Result<Vec<Dish>, AppError>;
}

#[derive(Clone)]
pub struct PgDishRepository {
    pool: PgPool,
}

impl PgDishRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DishRegistry for PgDishRepository {
    async fn add(&self, dish_name: &str, ingredients: &str) -> Result<Dish, AppError> {
        sqlx::query_as::<_, Dish>(
            "INSERT INTO dishes (dish_name, ingredients) VALUES ($1, $2) RETURNING *",
        )
        .bind(dish_name)
        .bind(ingredients)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DishAlreadyExists(dish_name.to_string());
                }
            }
            e.into()
        })
    }

    async fn update_ingredients(
        &self,
        dish_name: &str,
        ingredients: &str,
    ) -> Result<Option<Dish>, AppError> {
        let dish = sqlx::query_as::<_, Dish>(
            "UPDATE dishes SET ingredients = $1 WHERE dish_name = $2 RETURNING *",
        )
        .bind(ingredients)
        .bind(dish_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dish)
    }

    async fn get(&self, dish_name: &str) -> Result<Option<Dish>, AppError> {
        let dish = sqlx::query_as::<_, Dish>("SELECT * FROM dishes WHERE dish_name = $1")
            .bind(dish_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dish)
    }

    async fn list_all(&self) -> Result<Vec<Dish>, AppError> {
        let dishes = sqlx::query_as::<_, Dish>("SELECT * FROM dishes ORDER BY dish_name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(dishes)
    }
}
