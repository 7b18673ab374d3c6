pub mod auth;
pub mod dish;
pub mod inventory;
