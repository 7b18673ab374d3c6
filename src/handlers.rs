pub mod auth;
pub mod dishes;
pub mod documents;
pub mod inventory;
