// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_app(app_state: AppState) -> Router {
    // Public
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    // Everything below needs a bearer token
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let inventory_routes = Router::new()
        .route("/items"
               ,get(handlers::inventory::list_items)
               .post(handlers::inventory::upsert_item)
        )
        .route("/items/{name}"
               ,get(handlers::inventory::get_item)
               .put(handlers::inventory::edit_item)
               .delete(handlers::inventory::delete_item)
        )
        .route("/items/{name}/barcode"
               ,get(handlers::inventory::get_barcode)
        )
        .route("/import", post(handlers::documents::import_inventory))
        .route("/export", get(handlers::documents::export_inventory))
        .route("/report", get(handlers::documents::inventory_report))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let dish_routes = Router::new()
        .route("/"
               ,get(handlers::dishes::list_dishes)
               .post(handlers::dishes::add_dish)
        )
        .route("/suggestions", get(handlers::dishes::suggestions))
        .route("/{name}"
               ,get(handlers::dishes::get_dish)
               .put(handlers::dishes::update_ingredients)
        )
        .route("/{name}/availability"
               ,get(handlers::dishes::check_availability)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes.merge(user_routes))
        .nest("/api/inventory", inventory_routes)
        .nest("/api/dishes", dish_routes)
        .with_state(app_state)
}
