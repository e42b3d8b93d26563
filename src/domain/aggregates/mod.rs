//! Aggregates module
pub mod inventory;

pub use inventory::{ColorStock, Inventory, InventoryError, SizeColorStock, StockLevel, VariantSelection};
