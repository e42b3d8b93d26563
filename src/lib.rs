//! OpenSASE Catalog
//!
//! Back-office product listing for the e-commerce platform.
//!
//! ## Features
//! - Validated, composable product filters built from loosely-typed input
//! - Dynamic sorting, including derived values (category, brand, stock)
//! - Stock aggregation across plain, per-color and per-size-per-color ledgers
//! - Admin listing state: pagination, column visibility, sort toggling

pub mod config;
pub mod domain;
pub mod filters;
pub mod listing;
pub mod repository;
pub mod sales;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::InventoryError;
use crate::domain::value_objects::VariantShape;

pub use filters::{FilterInput, ProductFilter, ProductQuery};

// =============================================================================
// Catalog Rows
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subcategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub has_color: bool,
    pub has_size: bool,
}

impl Subcategory {
    pub fn shape(&self) -> VariantShape { VariantShape::from_flags(self.has_color, self.has_size) }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Color {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),

    #[error("Invalid sort direction: {0}")]
    InvalidSortDirection(String),

    #[error("Invalid listing state: {0}")]
    InvalidListing(String),

    #[error("Filter `{key}` cannot be applied to a {found} value")]
    FilterWiring { key: &'static str, found: &'static str },

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Storage error: {0}")]
    StorageError(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
