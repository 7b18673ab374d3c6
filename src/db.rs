pub mod inventory_repo;
pub use inventory_repo::{InventoryStore, PgInventoryRepository};
pub mod dish_repo;
pub use dish_repo::{DishRegistry, PgDishRepository};
pub mod memory;
pub use memory::{MemoryDishRegistry, MemoryInventoryStore};
