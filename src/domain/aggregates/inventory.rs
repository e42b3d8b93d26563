//! Inventory Aggregate
//!
//! A product's stock lives in exactly one of three ledgers, picked by the
//! shape of its subcategory. `Inventory` holds whatever rows were loaded for
//! a product and only ever reads the authoritative one.

use serde::Serialize;
use crate::domain::value_objects::{Quantity, VariantShape};

/// `color_product` pivot row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorStock { pub color_id: i64, pub quantity: Quantity }

/// `color_size` pivot row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizeColorStock { pub size_id: i64, pub color_id: i64, pub quantity: Quantity }

/// Authoritative stock, tagged with the ledger it came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", content = "total", rename_all = "snake_case")]
pub enum StockLevel {
    Plain(Quantity),
    Color(Quantity),
    Size(Quantity),
}

impl StockLevel {
    pub fn total(&self) -> Quantity {
        match self { Self::Plain(q) | Self::Color(q) | Self::Size(q) => *q }
    }
    pub fn shape(&self) -> VariantShape {
        match self { Self::Plain(_) => VariantShape::Plain, Self::Color(_) => VariantShape::Color, Self::Size(_) => VariantShape::Size }
    }
}

/// A concrete variant a shopper can pick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantSelection {
    Plain,
    Color { color_id: i64 },
    SizeColor { size_id: i64, color_id: i64 },
}

impl VariantSelection {
    /// No ids picks the plain stock; a size needs a color.
    pub fn from_ids(size_id: Option<i64>, color_id: Option<i64>) -> Result<Self, InventoryError> {
        match (size_id, color_id) {
            (None, None) => Ok(Self::Plain),
            (None, Some(color_id)) => Ok(Self::Color { color_id }),
            (Some(size_id), Some(color_id)) => Ok(Self::SizeColor { size_id, color_id }),
            (Some(_), None) => Err(InventoryError::UnknownVariant),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Inventory {
    product_id: i64,
    shape: VariantShape,
    quantity: Option<Quantity>,
    colors: Vec<ColorStock>,
    sizes: Vec<SizeColorStock>,
}

impl Inventory {
    pub fn new(product_id: i64, shape: VariantShape, quantity: Option<Quantity>) -> Self {
        Self { product_id, shape, quantity, colors: vec![], sizes: vec![] }
    }

    pub fn with_colors(mut self, colors: impl IntoIterator<Item = ColorStock>) -> Self {
        self.colors.extend(colors);
        self
    }

    pub fn with_sizes(mut self, sizes: impl IntoIterator<Item = SizeColorStock>) -> Self {
        self.sizes.extend(sizes);
        self
    }

    pub fn product_id(&self) -> i64 { self.product_id }
    pub fn shape(&self) -> VariantShape { self.shape }

    /// Rows from ledgers the shape does not use are ignored.
    pub fn stock_level(&self) -> StockLevel {
        match self.shape {
            VariantShape::Plain => StockLevel::Plain(self.quantity.unwrap_or_default()),
            VariantShape::Color => StockLevel::Color(self.colors.iter().map(|c| c.quantity).sum()),
            VariantShape::Size => StockLevel::Size(self.sizes.iter().map(|s| s.quantity).sum()),
        }
    }

    pub fn total(&self) -> Quantity { self.stock_level().total() }

    pub fn available(&self, selection: VariantSelection) -> Result<Quantity, InventoryError> {
        match (self.shape, selection) {
            (VariantShape::Plain, VariantSelection::Plain) => Ok(self.quantity.unwrap_or_default()),
            (VariantShape::Color, VariantSelection::Color { color_id }) => self.colors.iter()
                .find(|c| c.color_id == color_id)
                .map(|c| c.quantity)
                .ok_or(InventoryError::UnknownVariant),
            (VariantShape::Size, VariantSelection::SizeColor { size_id, color_id }) => self.sizes.iter()
                .find(|s| s.size_id == size_id && s.color_id == color_id)
                .map(|s| s.quantity)
                .ok_or(InventoryError::UnknownVariant),
            (shape, _) => Err(InventoryError::ShapeMismatch(shape)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum InventoryError { ShapeMismatch(VariantShape), UnknownVariant }
impl std::error::Error for InventoryError {}
impl std::fmt::Display for InventoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeMismatch(shape) => write!(f, "Selection does not match {:?} stock", shape),
            Self::UnknownVariant => write!(f, "Unknown variant"),
        }
    }
}
