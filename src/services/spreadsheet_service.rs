// src/services/spreadsheet_service.rs

use std::collections::HashSet;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook};

use crate::{
    common::error::{AppError, ImportError},
    models::inventory::{InventoryItem, ItemFilter, NewInventoryItem},
    services::{
        barcode::{allocate, barcode_rng, BARCODE_DIGITS},
        inventory_service::InventoryService,
    },
};

pub const COL_NAME: &str = "name";
pub const COL_QUANTITY: &str = "quantity";
pub const COL_EXPIRY_DATE: &str = "expiry date";
pub const COL_BARCODE_NUMBER: &str = "barcode number";
pub const COL_CATEGORY: &str = "category";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_NAME,
    COL_QUANTITY,
    COL_EXPIRY_DATE,
    COL_BARCODE_NUMBER,
    COL_CATEGORY,
];

static EMPTY_CELL: Cell = Cell::Empty;

const EXPORT_HEADERS: [&str; 5] = ["Name", "Quantity", "Expiry Date", "Barcode Number", "Category"];

/// A spreadsheet cell, independent of the workbook library.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(value) => Cell::Date(value.date()),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

/// First sheet of a workbook: the header row and the data rows below it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Reads the first worksheet of an .xlsx file.
pub fn read_xlsx(bytes: &[u8]) -> Result<Sheet, ImportError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| ImportError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::EmptyFile)?
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| match Cell::from(cell) {
                Cell::Text(s) => s,
                Cell::Number(n) => n.to_string(),
                Cell::Date(d) => d.to_string(),
                Cell::Empty => String::new(),
            })
            .collect(),
        None => return Err(ImportError::EmptyFile),
    };

    Ok(Sheet {
        headers,
        rows: rows.map(|row| row.iter().map(Cell::from).collect()).collect(),
    })
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Required columns absent from `headers`, in canonical order.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    let present: HashSet<String> = headers.iter().map(|h| normalize_header(h)).collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(**column))
        .map(|column| column.to_string())
        .collect()
}

/// Validates the header and converts every data row. Nothing is written here.
/// Fully blank rows are skipped; blank barcode cells stay `None`.
pub fn parse_rows(sheet: &Sheet) -> Result<Vec<NewInventoryItem>, ImportError> {
    let missing = missing_columns(&sheet.headers);
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let position = |column: &str| {
        sheet
            .headers
            .iter()
            .position(|h| normalize_header(h) == column)
            .unwrap_or_default()
    };
    let (name_at, quantity_at, expiry_at, barcode_at, category_at) = (
        position(COL_NAME),
        position(COL_QUANTITY),
        position(COL_EXPIRY_DATE),
        position(COL_BARCODE_NUMBER),
        position(COL_CATEGORY),
    );

    let mut seen_names = HashSet::new();
    let mut seen_barcodes = HashSet::new();
    let mut items = Vec::with_capacity(sheet.rows.len());

    for (index, row) in sheet.rows.iter().enumerate() {
        if row.iter().all(|cell| *cell == Cell::Empty) {
            continue;
        }
        // Spreadsheet row number, counting the header as row 1.
        let line = index + 2;
        let cell = |at: usize| row.get(at).unwrap_or(&EMPTY_CELL);
        let invalid = |column: &str, reason: &str| ImportError::InvalidCell {
            row: line,
            column: column.to_string(),
            reason: reason.to_string(),
        };

        let name = parse_text(cell(name_at))
            .ok_or_else(|| invalid(COL_NAME, "a name is required"))?;
        if !seen_names.insert(name.clone()) {
            return Err(invalid(COL_NAME, "duplicate item name"));
        }

        let quantity = parse_quantity(cell(quantity_at))
            .ok_or_else(|| invalid(COL_QUANTITY, "expected a non-negative number"))?;

        let expiry_date = parse_date(cell(expiry_at))
            .ok_or_else(|| invalid(COL_EXPIRY_DATE, "expected a date (YYYY-MM-DD)"))?;

        let barcode_number = match cell(barcode_at) {
            Cell::Empty => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            other => Some(parse_barcode(other).ok_or_else(|| {
                invalid(COL_BARCODE_NUMBER, "expected at most 12 digits")
            })?),
        };
        if let Some(code) = &barcode_number {
            if !seen_barcodes.insert(code.clone()) {
                return Err(invalid(COL_BARCODE_NUMBER, "duplicate barcode number"));
            }
        }

        let category = parse_text(cell(category_at))
            .ok_or_else(|| invalid(COL_CATEGORY, "a category is required"))?;

        items.push(NewInventoryItem {
            name,
            quantity,
            expiry_date,
            barcode_image: None,
            barcode_number,
            category,
        });
    }

    Ok(items)
}

fn parse_text(cell: &Cell) -> Option<String> {
    let value = match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => n.to_string(),
        Cell::Date(d) => d.to_string(),
        Cell::Empty => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn parse_quantity(cell: &Cell) -> Option<Decimal> {
    let value = match cell {
        Cell::Number(n) => Decimal::from_f64(*n)?,
        Cell::Text(s) => s.trim().parse::<Decimal>().ok()?,
        _ => return None,
    };
    (!value.is_sign_negative()).then_some(value.normalize())
}

fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => {
            let s = s.trim();
            // Also accepts "YYYY-MM-DD HH:MM:SS" text.
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
                s.get(..10)
                    .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            })
        }
        _ => None,
    }
}

// Numeric cells lose leading zeros, so every barcode is padded back to the full width.
// Codes longer than the width are rejected.
fn parse_barcode(cell: &Cell) -> Option<String> {
    let digits = match cell {
        Cell::Number(n) if n.fract() == 0.0 && *n >= 0.0 => (*n as u64).to_string(),
        Cell::Text(s) => s.trim().to_string(),
        _ => return None,
    };
    let valid = !digits.is_empty()
        && digits.len() <= BARCODE_DIGITS
        && digits.chars().all(|c| c.is_ascii_digit());
    valid.then(|| format!("{digits:0>width$}", width = BARCODE_DIGITS))
}

/// Fills blank barcode cells with numbers unique within the batch.
pub async fn assign_missing_barcodes(rows: &mut [NewInventoryItem]) -> Result<(), AppError> {
    let mut taken: HashSet<String> = rows.iter().filter_map(|r| r.barcode_number.clone()).collect();
    let mut rng = barcode_rng();
    for row in rows.iter_mut().filter(|r| r.barcode_number.is_none()) {
        let number = allocate(&mut rng, |candidate| {
            let collides = taken.contains(&candidate);
            async move { Ok(collides) }
        })
        .await?;
        taken.insert(number.clone());
        row.barcode_number = Some(number);
    }
    Ok(())
}

/// Writes items with the same column layout the importer expects.
pub fn write_xlsx(items: &[InventoryItem]) -> Result<Vec<u8>, AppError> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| AppError::ReportError(e.to_string());

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &bold)
            .map_err(xlsx_err)?;
    }

    for (i, item) in items.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &item.name).map_err(xlsx_err)?;
        sheet
            .write_number(row, 1, item.quantity.to_f64().unwrap_or_default())
            .map_err(xlsx_err)?;
        sheet
            .write_string(row, 2, item.expiry_date.format("%Y-%m-%d").to_string())
            .map_err(xlsx_err)?;
        sheet
            .write_string(row, 3, item.barcode_number.as_deref().unwrap_or_default())
            .map_err(xlsx_err)?;
        sheet.write_string(row, 4, &item.category).map_err(xlsx_err)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

#[derive(Clone)]
pub struct SpreadsheetService {
    inventory: InventoryService,
}

impl SpreadsheetService {
    pub fn new(inventory: InventoryService) -> Self {
        Self { inventory }
    }

    /// Replaces the whole inventory with the workbook's rows. Every check runs before
    /// the store is touched.
    pub async fn import(&self, file_name: &str, bytes: &[u8]) -> Result<u64, AppError> {
        if file_name.trim().is_empty() {
            return Err(ImportError::NoFile.into());
        }
        if !file_name.to_lowercase().ends_with(".xlsx") {
            tracing::warn!("Import rejected, unsupported file '{}'", file_name);
            return Err(ImportError::UnsupportedFileType(file_name.to_string()).into());
        }
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile.into());
        }

        let sheet = read_xlsx(bytes)?;
        let mut rows = parse_rows(&sheet).inspect_err(|e| {
            tracing::warn!("Import of '{}' rejected: {}", file_name, e);
        })?;
        assign_missing_barcodes(&mut rows).await?;

        self.inventory.replace_all(rows).await
    }

    pub async fn export(&self) -> Result<Vec<u8>, AppError> {
        let items = self.inventory.query(&ItemFilter::default()).await?;
        write_xlsx(&items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryInventoryStore;
    use crate::services::inventory_service::tests::RecordingRenderer;
    use std::sync::Arc;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn full_sheet() -> Sheet {
        Sheet {
            headers: headers(&[" Name", "QUANTITY ", "Expiry Date", "Barcode Number", "category"]),
            rows: vec![
                vec![t("Rice"), Cell::Number(10.0), t("2025-01-01"), Cell::Number(1234.0), t("Grain")],
                vec![t("Milk"), t("2.5"), Cell::Date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()), Cell::Empty, t("Dairy")],
                vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
            ],
        }
    }

    fn inventory() -> InventoryService {
        InventoryService::new(
            Arc::new(MemoryInventoryStore::new()),
            Arc::new(RecordingRenderer::default()),
            5,
        )
    }

    #[test]
    fn headers_are_trimmed_and_case_insensitive() {
        let rows = parse_rows(&full_sheet()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Rice");
        assert_eq!(rows[0].quantity, Decimal::from(10));
        assert_eq!(rows[0].barcode_number.as_deref(), Some("000000001234"));
        assert_eq!(rows[1].quantity, Decimal::new(25, 1));
        assert_eq!(rows[1].expiry_date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(rows[1].barcode_number, None);
    }

    #[test]
    fn missing_category_column_is_named() {
        let sheet = Sheet {
            headers: headers(&["name", "quantity", "expiry date", "barcode number"]),
            rows: vec![],
        };
        assert_eq!(
            parse_rows(&sheet),
            Err(ImportError::MissingColumns(vec!["category".to_string()]))
        );
    }

    #[test]
    fn bad_cells_point_at_row_and_column() {
        let mut sheet = full_sheet();
        sheet.rows[1][1] = t("-3");

        assert_eq!(
            parse_rows(&sheet),
            Err(ImportError::InvalidCell {
                row: 3,
                column: COL_QUANTITY.to_string(),
                reason: "expected a non-negative number".to_string(),
            })
        );
    }

    #[test]
    fn text_and_numeric_barcodes_are_padded_alike() {
        let mut sheet = full_sheet();
        sheet.rows[0][3] = t("123");
        sheet.rows[1][3] = t(" 000000000456 ");
        let rows = parse_rows(&sheet).unwrap();
        assert_eq!(rows[0].barcode_number.as_deref(), Some("000000000123"));
        assert_eq!(rows[1].barcode_number.as_deref(), Some("000000000456"));

        // The same code written once as text and once as a number is a duplicate
        sheet.rows[1][3] = Cell::Number(123.0);
        assert!(matches!(
            parse_rows(&sheet),
            Err(ImportError::InvalidCell { row: 3, column, .. }) if column == COL_BARCODE_NUMBER
        ));
    }

    #[test]
    fn barcodes_longer_than_twelve_digits_are_rejected() {
        for too_long in [t("12345678901234567890"), Cell::Number(1234567890123.0)] {
            let mut sheet = full_sheet();
            sheet.rows[0][3] = too_long;
            assert!(matches!(
                parse_rows(&sheet),
                Err(ImportError::InvalidCell { row: 2, column, .. }) if column == COL_BARCODE_NUMBER
            ));
        }

        let mut sheet = full_sheet();
        sheet.rows[0][3] = t("12a4");
        assert!(parse_rows(&sheet).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut sheet = full_sheet();
        sheet.rows[1][0] = t("Rice");
        assert!(matches!(
            parse_rows(&sheet),
            Err(ImportError::InvalidCell { column, .. }) if column == COL_NAME
        ));
    }

    #[tokio::test]
    async fn blank_barcodes_get_unique_numbers() {
        let mut rows = parse_rows(&full_sheet()).unwrap();
        assign_missing_barcodes(&mut rows).await.unwrap();

        let generated = rows[1].barcode_number.as_deref().unwrap();
        assert_eq!(generated.len(), BARCODE_DIGITS);
        assert_ne!(Some(generated), rows[0].barcode_number.as_deref());
    }

    #[tokio::test]
    async fn rejected_import_leaves_the_store_untouched() {
        let inventory = inventory();
        let exp = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        inventory.upsert("Salt", Decimal::ONE, exp, "Dry").await.unwrap();

        let sheet_without_category = {
            let mut workbook = Workbook::new();
            let ws = workbook.add_worksheet();
            for (col, h) in ["Name", "Quantity", "Expiry Date", "Barcode Number"].iter().enumerate() {
                ws.write_string(0, col as u16, *h).unwrap();
            }
            ws.write_string(1, 0, "Pepper").unwrap();
            workbook.save_to_buffer().unwrap()
        };

        let service = SpreadsheetService::new(inventory.clone());
        let err = service.import("stock.xlsx", &sheet_without_category).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::ImportRejected(ImportError::MissingColumns(ref cols)) if cols == &["category"]
        ));
        let remaining = inventory.query(&ItemFilter::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Salt");
    }

    #[tokio::test]
    async fn wrong_type_and_empty_uploads_are_rejected() {
        let service = SpreadsheetService::new(inventory());

        assert!(matches!(
            service.import("stock.csv", b"name,quantity").await,
            Err(AppError::ImportRejected(ImportError::UnsupportedFileType(_)))
        ));
        assert!(matches!(
            service.import("stock.xlsx", b"").await,
            Err(AppError::ImportRejected(ImportError::EmptyFile))
        ));
        assert!(matches!(
            service.import("stock.xlsx", b"not a zip archive").await,
            Err(AppError::ImportRejected(ImportError::Unreadable(_)))
        ));
    }

    #[tokio::test]
    async fn exported_workbook_imports_back() {
        let source = inventory();
        let exp = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        source.upsert("Rice", Decimal::from(10), exp, "Grain").await.unwrap();
        source.upsert("Milk", Decimal::new(15, 1), exp, "Dairy").await.unwrap();
        let bytes = SpreadsheetService::new(source.clone()).export().await.unwrap();

        let target = inventory();
        let imported = SpreadsheetService::new(target.clone())
            .import("inventory_export.xlsx", &bytes)
            .await
            .unwrap();

        assert_eq!(imported, 2);
        let original = source.get("Milk").await.unwrap();
        let copy = target.get("Milk").await.unwrap();
        assert_eq!(copy.quantity, Decimal::new(15, 1));
        assert_eq!(copy.expiry_date, exp);
        assert_eq!(copy.barcode_number, original.barcode_number);
        assert_eq!(copy.barcode_image, None);
    }
}
