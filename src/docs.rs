// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Inventory ---
        handlers::inventory::list_items,
        handlers::inventory::upsert_item,
        handlers::inventory::get_item,
        handlers::inventory::edit_item,
        handlers::inventory::delete_item,
        handlers::inventory::get_barcode,

        // --- Documents ---
        handlers::documents::import_inventory,
        handlers::documents::export_inventory,
        handlers::documents::inventory_report,

        // --- Dishes ---
        handlers::dishes::list_dishes,
        handlers::dishes::add_dish,
        handlers::dishes::get_dish,
        handlers::dishes::update_ingredients,
        handlers::dishes::check_availability,
        handlers::dishes::suggestions,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::SessionUser,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Inventory ---
            models::inventory::InventoryItem,
            models::inventory::ExpiryAlert,
            models::inventory::InventoryListing,
            models::inventory::ImportSummary,

            // --- Dishes ---
            models::dish::Dish,
            models::dish::Availability,

            // --- Payloads ---
            handlers::inventory::UpsertItemPayload,
            handlers::inventory::EditItemPayload,
            handlers::dishes::AddDishPayload,
            handlers::dishes::UpdateIngredientsPayload,
            handlers::documents::ImportUpload,
        )
    ),
    tags(
        (name = "Auth", description = "Kitchen staff login"),
        (name = "Inventory", description = "Stock items, expiry alerts and barcodes"),
        (name = "Documents", description = "Spreadsheet import/export and the PDF report"),
        (name = "Dishes", description = "Recipes and ingredient availability")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
