// src/handlers/dishes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::validate_not_blank,
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::dish::{Availability, Dish},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddDishPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Salad")]
    pub dish_name: String,

    /// Ingredient names separated by ", "
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "tomato, lettuce")]
    pub ingredients: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateIngredientsPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "tomato, lettuce, cucumber")]
    pub ingredients: String,
}

#[utoipa::path(
    get,
    path = "/api/dishes",
    tag = "Dishes",
    responses((status = 200, description = "Every dish, by name", body = [Dish])),
    security(("api_jwt" = []))
)]
pub async fn list_dishes(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Dish>>, ApiError> {
    let dishes = app_state
        .dish_service
        .list_all()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(dishes))
}

#[utoipa::path(
    post,
    path = "/api/dishes",
    tag = "Dishes",
    request_body = AddDishPayload,
    responses(
        (status = 201, description = "Dish registered", body = Dish),
        (status = 409, description = "A dish with that name exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_dish(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Json(payload): Json<AddDishPayload>,
) -> Result<(StatusCode, Json<Dish>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let dish = app_state
        .dish_service
        .add(&payload.dish_name, &payload.ingredients)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(dish)))
}

#[utoipa::path(
    get,
    path = "/api/dishes/{name}",
    tag = "Dishes",
    params(("name" = String, Path, description = "Dish name")),
    responses(
        (status = 200, description = "The dish", body = Dish),
        (status = 404, description = "No dish with that name")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dish(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<Json<Dish>, ApiError> {
    let dish = app_state
        .dish_service
        .get(&name)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(dish))
}

#[utoipa::path(
    put,
    path = "/api/dishes/{name}",
    tag = "Dishes",
    request_body = UpdateIngredientsPayload,
    params(("name" = String, Path, description = "Dish name")),
    responses(
        (status = 200, description = "Ingredients replaced", body = Dish),
        (status = 404, description = "No dish with that name")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_ingredients(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<UpdateIngredientsPayload>,
) -> Result<Json<Dish>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let dish = app_state
        .dish_service
        .update_ingredients(&name, &payload.ingredients)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(dish))
}

#[utoipa::path(
    get,
    path = "/api/dishes/{name}/availability",
    tag = "Dishes",
    params(("name" = String, Path, description = "Dish name")),
    responses(
        (status = 200, description = "Whether the dish can be cooked from current stock", body = Availability)
    ),
    security(("api_jwt" = []))
)]
pub async fn check_availability(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<Json<Availability>, ApiError> {
    let availability = app_state
        .dish_service
        .check(&name)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(availability))
}

#[utoipa::path(
    get,
    path = "/api/dishes/suggestions",
    tag = "Dishes",
    responses(
        (status = 200, description = "Availability of every dish", body = [Availability])
    ),
    security(("api_jwt" = []))
)]
pub async fn suggestions(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Availability>>, ApiError> {
    let suggestions = app_state
        .dish_service
        .suggest()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(suggestions))
}
