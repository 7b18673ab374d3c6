// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_not_blank, validate_not_negative},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::inventory::{InventoryItem, InventoryListing},
    services::inventory_service::build_filter,
};

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertItemPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Fresh Tomato")]
    pub name: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = 5.5)]
    pub quantity: Decimal,

    #[schema(example = "2025-01-01")]
    pub expiry_date: NaiveDate,

    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Vegetables")]
    pub category: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditItemPayload {
    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Decimal,

    pub expiry_date: NaiveDate,

    #[validate(custom(function = "validate_not_blank"))]
    pub category: String,
}

/// Listing filters. Blank values are ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryQuery {
    /// Substring of the item name or barcode number
    pub search: Option<String>,
    /// Exact category; "all" or "الكل" disables the filter
    pub category: Option<String>,
    /// Items expiring within this many days
    pub expiry_days: Option<String>,
    /// Items with at most this quantity
    pub quantity_filter: Option<String>,
}

// ---
// Handlers
// ---
#[utoipa::path(
    get,
    path = "/api/inventory/items",
    tag = "Inventory",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Filtered stock and its expiry alerts", body = InventoryListing),
        (status = 400, description = "A filter value could not be parsed")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(params): Query<InventoryQuery>,
) -> Result<Json<InventoryListing>, ApiError> {
    let today = today();
    let filter = build_filter(
        params.search.as_deref(),
        params.category.as_deref(),
        params.expiry_days.as_deref(),
        params.quantity_filter.as_deref(),
        today,
    )
    .map_err(|e| e.to_api_error(&locale))?;

    let listing = app_state
        .inventory_service
        .list(&filter, today)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(listing))
}

#[utoipa::path(
    post,
    path = "/api/inventory/items",
    tag = "Inventory",
    request_body = UpsertItemPayload,
    responses(
        (status = 200, description = "Item added, or its stock overwritten", body = InventoryItem),
        (status = 400, description = "Invalid payload")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Json(payload): Json<UpsertItemPayload>,
) -> Result<Json<InventoryItem>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let item = app_state
        .inventory_service
        .upsert(
            &payload.name,
            payload.quantity,
            payload.expiry_date,
            &payload.category,
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(item))
}

#[utoipa::path(
    get,
    path = "/api/inventory/items/{name}",
    tag = "Inventory",
    params(("name" = String, Path, description = "Item name")),
    responses(
        (status = 200, description = "The item", body = InventoryItem),
        (status = 404, description = "No item with that name")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<Json<InventoryItem>, ApiError> {
    let item = app_state
        .inventory_service
        .get(&name)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(item))
}

#[utoipa::path(
    put,
    path = "/api/inventory/items/{name}",
    tag = "Inventory",
    request_body = EditItemPayload,
    params(("name" = String, Path, description = "Item name")),
    responses(
        (status = 200, description = "Item updated", body = InventoryItem),
        (status = 404, description = "No item with that name")
    ),
    security(("api_jwt" = []))
)]
pub async fn edit_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<EditItemPayload>,
) -> Result<Json<InventoryItem>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let item = app_state
        .inventory_service
        .edit(&name, payload.quantity, payload.expiry_date, &payload.category)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/items/{name}",
    tag = "Inventory",
    params(("name" = String, Path, description = "Item name")),
    responses(
        (status = 204, description = "Item removed (or there was nothing to remove)")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .inventory_service
        .delete(&name)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/inventory/items/{name}/barcode",
    tag = "Inventory",
    params(("name" = String, Path, description = "Item name")),
    responses(
        (status = 200, description = "EAN-13 barcode image", content_type = "image/png"),
        (status = 404, description = "Unknown item, or the item has no barcode image")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_barcode(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let inventory = &app_state.inventory_service;
    let item = inventory.get(&name).await.map_err(|e| e.to_api_error(&locale))?;

    let not_found = || AppError::ItemNotFound(name.clone()).to_api_error(&locale);

    // Imported rows carry a number but no rendered image
    let path = item
        .barcode_image
        .as_deref()
        .and_then(|image| inventory.barcodes().locate(image))
        .ok_or_else(&not_found)?;

    let png = tokio::fs::read(&path).await.map_err(|e| {
        tracing::warn!("Barcode image {} unreadable: {}", path.display(), e);
        not_found()
    })?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
