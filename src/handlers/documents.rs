// src/handlers/documents.rs

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError, ImportError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::inventory::ImportSummary,
};

const UPLOAD_FIELD: &str = "file";
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Multipart form for the bulk import.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImportUpload {
    /// The `.xlsx` workbook
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/inventory/import",
    tag = "Documents",
    request_body(content = ImportUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Inventory replaced by the workbook rows", body = ImportSummary),
        (status = 400, description = "Import rejected, inventory left untouched")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_inventory(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportSummary>, ApiError> {
    let (file_name, bytes) = read_upload(multipart)
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let imported = app_state
        .spreadsheet_service
        .import(&file_name, &bytes)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(ImportSummary { imported }))
}

// Finds the `file` field and returns its client-side name and contents.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(String, Vec<u8>), ImportError> {
    let mut multipart = multipart.map_err(|_| ImportError::NoFile)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::Unreadable(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ImportError::Unreadable(e.to_string()))?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(ImportError::NoFile)
}

#[utoipa::path(
    get,
    path = "/api/inventory/export",
    tag = "Documents",
    responses(
        (status = 200, description = "The whole inventory as a workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_inventory(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let workbook = app_state
        .spreadsheet_service
        .export()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"inventory.xlsx\""),
    ];

    Ok((headers, workbook).into_response())
}

#[utoipa::path(
    get,
    path = "/api/inventory/report",
    tag = "Documents",
    responses(
        (status = 200, description = "Printable inventory report", content_type = "application/pdf")
    ),
    security(("api_jwt" = []))
)]
pub async fn inventory_report(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .inventory_report_pdf()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"inventory_report.pdf\""),
    ];

    Ok((headers, pdf_bytes).into_response())
}
