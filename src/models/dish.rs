// src/models/dish.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: Uuid,

    #[schema(example = "Salad")]
    pub dish_name: String,

    /// Ingredient names joined by ", ".
    #[schema(example = "tomato, lettuce")]
    pub ingredients: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    #[schema(example = "Salad")]
    pub dish_name: String,
    pub fully_available: bool,
    #[schema(example = json!(["lettuce"]))]
    pub missing: Vec<String>,
}
