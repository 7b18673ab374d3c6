//! Restaurant kitchen stock tracker: inventory with expiry alerts and barcodes, dish
//! recipes checked against what is on the shelves, spreadsheet import/export and a
//! printable PDF report, served as a JWT-protected JSON API.

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
