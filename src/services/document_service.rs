// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Alignment, Element, PaperSize};

use crate::{
    common::error::AppError,
    models::inventory::{InventoryItem, ItemFilter},
    services::inventory_service::InventoryService,
};

pub const REPORT_TITLE: &str = "Inventory Report";
pub const REPORT_HEADERS: [&str; 3] = ["Item name", "Quantity", "Expiry date"];

// Column weights: name, quantity, expiry date
const COLUMN_WEIGHTS: [usize; 3] = [3, 1, 2];
const PAGE_MARGIN_MM: i32 = 15;

/// The three text fields printed for each item.
pub fn report_row(item: &InventoryItem) -> [String; 3] {
    [
        item.name.clone(),
        item.quantity.normalize().to_string(),
        item.expiry_date.format("%Y-%m-%d").to_string(),
    ]
}

#[derive(Clone)]
pub struct DocumentService {
    inventory: InventoryService,
    font_dir: PathBuf,
    font_family: String,
}

impl DocumentService {
    pub fn new(inventory: InventoryService, font_dir: PathBuf, font_family: String) -> Self {
        Self { inventory, font_dir, font_family }
    }

    pub async fn inventory_report_pdf(&self) -> Result<Vec<u8>, AppError> {
        let items = self.inventory.query(&ItemFilter::default()).await?;
        let font_dir = self.font_dir.clone();
        let font_family = self.font_family.clone();

        tokio::task::spawn_blocking(move || render_report(&items, &font_dir, &font_family))
            .await
            .map_err(|e| anyhow::anyhow!("report rendering task failed: {}", e))?
    }
}

// Rows flow top to bottom; genpdf starts a new page whenever the next row would cross
// the bottom margin.
fn render_report(
    items: &[InventoryItem],
    font_dir: &std::path::Path,
    font_family: &str,
) -> Result<Vec<u8>, AppError> {
    let font = genpdf::fonts::from_files(font_dir, font_family, None).map_err(|e| {
        AppError::FontNotFound(format!("{font_family} in {}: {e}", font_dir.display()))
    })?;

    let mut doc = genpdf::Document::new(font);
    doc.set_title(REPORT_TITLE);
    doc.set_paper_size(PaperSize::A4);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(PAGE_MARGIN_MM);
    doc.set_page_decorator(decorator);

    let mut title = elements::Paragraph::new(REPORT_TITLE);
    title.set_alignment(Alignment::Right);
    doc.push(title.styled(style::Style::new().bold().with_font_size(16)));
    doc.push(elements::Break::new(1.5));

    let mut table = elements::TableLayout::new(COLUMN_WEIGHTS.to_vec());
    table.set_cell_decorator(elements::FrameCellDecorator::new(false, false, false));

    let header_style = style::Style::new().bold().with_font_size(12);
    let mut header = table.row();
    for text in REPORT_HEADERS {
        header = header.element(right_aligned(text.to_string()).styled(header_style));
    }
    header
        .push()
        .map_err(|e| AppError::ReportError(e.to_string()))?;

    let body_style = style::Style::new().with_font_size(10);
    for item in items {
        let mut row = table.row();
        for text in report_row(item) {
            row = row.element(right_aligned(text).styled(body_style));
        }
        row.push().map_err(|e| AppError::ReportError(e.to_string()))?;
    }

    doc.push(table);

    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| AppError::ReportError(e.to_string()))?;

    tracing::info!("Inventory report rendered with {} rows", items.len());
    Ok(buffer)
}

fn right_aligned(text: String) -> elements::Paragraph {
    let mut paragraph = elements::Paragraph::new(text);
    paragraph.set_alignment(Alignment::Right);
    paragraph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryInventoryStore;
    use crate::services::inventory_service::tests::RecordingRenderer;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn rows_print_name_quantity_and_expiry() {
        let item = InventoryItem {
            id: Uuid::new_v4(),
            name: "Basmati Rice".into(),
            quantity: Decimal::new(1250, 2),
            expiry_date: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
            barcode_image: None,
            barcode_number: Some("000000000001".into()),
            category: "Grain".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(report_row(&item), ["Basmati Rice", "12.5", "2025-09-30"]);
    }

    #[tokio::test]
    async fn missing_font_is_reported() {
        let inventory = InventoryService::new(
            Arc::new(MemoryInventoryStore::new()),
            Arc::new(RecordingRenderer::default()),
            5,
        );
        let dir = tempfile::tempdir().unwrap();
        let service = DocumentService::new(inventory, dir.path().to_path_buf(), "Nope".into());

        let err = service.inventory_report_pdf().await.unwrap_err();
        assert!(matches!(err, AppError::FontNotFound(_)));
    }
}
