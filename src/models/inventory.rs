// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Stock item ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,

    #[schema(example = "Fresh Tomato")]
    pub name: String,

    #[schema(example = 5.5)]
    pub quantity: Decimal,

    #[schema(example = "2025-01-01")]
    pub expiry_date: NaiveDate,

    /// File name of the rendered barcode PNG. Rows created by a bulk import have none.
    #[schema(example = "Fresh Tomato-012345678905.png")]
    pub barcode_image: Option<String>,

    #[schema(example = "012345678905")]
    pub barcode_number: Option<String>,

    #[schema(example = "Vegetables")]
    pub category: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row about to be written, either from the add form or from a spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInventoryItem {
    pub name: String,
    pub quantity: Decimal,
    pub expiry_date: NaiveDate,
    pub barcode_image: Option<String>,
    pub barcode_number: Option<String>,
    pub category: String,
}

/// The fields an upsert or an edit overwrites. The barcode is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct StockUpdate {
    pub quantity: Decimal,
    pub expiry_date: NaiveDate,
    pub category: String,
}

// --- Filters ---

/// Category values that mean "do not filter by category".
pub const ALL_CATEGORIES: [&str; 2] = ["all", "الكل"];

/// Optional predicates for the stock listing, combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// Case-insensitive substring of the name or of the barcode number.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Items expiring on or before this date.
    pub expires_on_or_before: Option<NaiveDate>,
    /// Items with at most this quantity.
    pub max_quantity: Option<Decimal>,
}

impl ItemFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.category.is_none()
            && self.expires_on_or_before.is_none()
            && self.max_quantity.is_none()
    }

    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = item.name.to_lowercase().contains(&needle);
            let in_barcode = item
                .barcode_number
                .as_deref()
                .is_some_and(|code| code.to_lowercase().contains(&needle));
            if !in_name && !in_barcode {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }
        if let Some(cutoff) = self.expires_on_or_before {
            if item.expiry_date > cutoff {
                return false;
            }
        }
        if let Some(max) = self.max_quantity {
            if item.quantity > max {
                return false;
            }
        }
        true
    }
}

// --- Expiry alerts ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryAlert {
    #[schema(example = "Milk")]
    pub name: String,
    /// Negative once the item has expired.
    #[schema(example = 2)]
    pub days_left: i64,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryListing {
    pub items: Vec<InventoryItem>,
    pub alerts: Vec<ExpiryAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    #[schema(example = 42)]
    pub imported: u64,
}
