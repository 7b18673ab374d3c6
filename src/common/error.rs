// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

/// Why a spreadsheet import was refused. Always raised before the store is touched.
#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("No file was uploaded")]
    NoFile,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("The uploaded file is empty")]
    EmptyFile,

    #[error("The file could not be read: {0}")]
    Unreadable(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Row {row}, column '{column}': {reason}")]
    InvalidCell {
        row: usize,
        column: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("'{0}' cannot be blank")]
    BlankField(&'static str),

    #[error("Invalid filter '{0}'")]
    InvalidFilter(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Dish not found: {0}")]
    DishNotFound(String),

    #[error("Dish already exists: {0}")]
    DishAlreadyExists(String),

    #[error("Import rejected: {0}")]
    ImportRejected(#[from] ImportError),

    #[error("Barcode generation failed: {0}")]
    BarcodeGeneration(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Report rendering failed: {0}")]
    ReportError(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// The error a handler actually sends back: a status and a message in the caller's language.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BlankField(_)
            | AppError::InvalidFilter(_)
            | AppError::ImportRejected(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::ItemNotFound(_) | AppError::DishNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DishAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(e) if is_connectivity_error(e) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error for the caller's locale. Internal faults are logged here and
    /// replaced by a generic message.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let arabic = locale.is_arabic();
        let status = self.status();

        let message = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let message = if arabic {
                    "حقل واحد أو أكثر غير صالح."
                } else {
                    "One or more fields are invalid."
                };
                return ApiError {
                    status,
                    message: message.to_string(),
                    details: Some(json!(details)),
                };
            }
            AppError::BlankField(field) if arabic => format!("الحقل {field} لا يمكن أن يكون فارغًا."),
            AppError::BlankField(field) => format!("The field '{field}' cannot be blank."),
            AppError::InvalidFilter(field) if arabic => format!("قيمة التصفية غير صالحة: {field}"),
            AppError::InvalidFilter(field) => format!("Invalid value for filter '{field}'."),
            AppError::InvalidCredentials if arabic => {
                "اسم المستخدم أو كلمة المرور غير صحيحة.".to_string()
            }
            AppError::InvalidCredentials => "Invalid username or password.".to_string(),
            AppError::InvalidToken if arabic => "رمز المصادقة غير صالح أو مفقود.".to_string(),
            AppError::InvalidToken => "Missing or invalid authentication token.".to_string(),
            AppError::ItemNotFound(_) if arabic => "العنصر غير موجود!".to_string(),
            AppError::ItemNotFound(name) => format!("Item '{name}' not found."),
            AppError::DishNotFound(_) if arabic => "الطبق غير موجود!".to_string(),
            AppError::DishNotFound(name) => format!("Dish '{name}' not found."),
            AppError::DishAlreadyExists(name) if arabic => format!("الطبق {name} موجود بالفعل."),
            AppError::DishAlreadyExists(name) => format!("Dish '{name}' already exists."),
            AppError::ImportRejected(reason) => import_message(reason, arabic),
            AppError::BarcodeGeneration(_) => {
                tracing::error!("Barcode generation failed: {}", self);
                if arabic {
                    "خطأ في توليد الباركود.".to_string()
                } else {
                    "The barcode could not be generated.".to_string()
                }
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                if arabic {
                    "قاعدة البيانات غير متاحة حاليًا.".to_string()
                } else {
                    "The inventory store is unavailable.".to_string()
                }
            }
            e => {
                tracing::error!("Internal server error: {}", e);
                if arabic {
                    "حدث خطأ غير متوقع.".to_string()
                } else {
                    "An unexpected error occurred.".to_string()
                }
            }
        };

        ApiError {
            status,
            message,
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

fn is_connectivity_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
    )
}

fn import_message(reason: &ImportError, arabic: bool) -> String {
    if !arabic {
        return match reason {
            ImportError::MissingColumns(columns) => format!(
                "The file does not contain the required columns. Missing columns: {}",
                columns.join(", ")
            ),
            ImportError::UnsupportedFileType(_) => "The file must be an Excel workbook (.xlsx).".to_string(),
            other => other.to_string(),
        };
    }
    match reason {
        ImportError::NoFile => "لم يتم تحديد أي ملف!".to_string(),
        ImportError::UnsupportedFileType(_) => "يجب أن يكون الملف من نوع Excel (.xlsx)".to_string(),
        ImportError::EmptyFile => "لم يتم اختيار أي ملف!".to_string(),
        ImportError::Unreadable(e) => format!("حدث خطأ أثناء قراءة الملف: {e}"),
        ImportError::MissingColumns(columns) => format!(
            "الملف لا يحتوي على الأعمدة المطلوبة! الأعمدة المفقودة: {}",
            columns.join(", ")
        ),
        ImportError::InvalidCell { row, column, reason } => {
            format!("قيمة غير صالحة في الصف {row}، العمود '{column}': {reason}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_conditions_map_to_404() {
        assert_eq!(AppError::ItemNotFound("Rice".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::DishNotFound("Salad".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_columns_message_names_each_column() {
        let err = AppError::from(ImportError::MissingColumns(vec![
            "barcode number".into(),
            "category".into(),
        ]));
        let api = err.to_api_error(&Locale::default());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.message.contains("barcode number, category"));

        let api = err.to_api_error(&Locale("ar".into()));
        assert!(api.message.contains("الأعمدة المفقودة"));
        assert!(api.message.contains("category"));
    }

    #[test]
    fn store_outage_is_reported_without_driver_details() {
        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut).to_api_error(&Locale::default());
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.message, "The inventory store is unavailable.");
    }

    #[test]
    fn barcode_failure_is_distinct_from_generic_faults() {
        let api = AppError::BarcodeGeneration("bad digits".into()).to_api_error(&Locale::default());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.message.contains("barcode"));
    }
}
