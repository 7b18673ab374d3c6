pub mod auth;
pub mod barcode;
pub mod dish_service;
pub mod document_service;
pub mod expiry;
pub mod inventory_service;
pub mod spreadsheet_service;
