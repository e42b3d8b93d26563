//! Value Objects for the catalog

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication status of a product, stored as its integer code
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ProductStatus {
    #[default]
    Draft,
    Published,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 2] = [ProductStatus::Draft, ProductStatus::Published];
    pub fn code(self) -> i64 { match self { Self::Draft => 1, Self::Published => 2 } }
    pub fn from_code(code: i64) -> Option<Self> {
        match code { 1 => Some(Self::Draft), 2 => Some(Self::Published), _ => None }
    }
}

impl From<ProductStatus> for i64 { fn from(s: ProductStatus) -> i64 { s.code() } }

impl TryFrom<i64> for ProductStatus {
    type Error = StatusError;
    fn try_from(code: i64) -> Result<Self, Self::Error> { Self::from_code(code).ok_or(StatusError(code)) }
}

#[derive(Debug, Clone)] pub struct StatusError(pub i64);
impl std::error::Error for StatusError {}
impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown product status {}", self.0) }
}

/// Which stock ledger is authoritative for the products of a subcategory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantShape {
    /// `products.quantity`
    #[default]
    Plain,
    /// `color_product.quantity` per color
    Color,
    /// `color_size.quantity` per size and color
    Size,
}

impl VariantShape {
    /// Resolves the subcategory flags. A size flag always wins: sizes carry
    /// their own colors, so `has_color` adds nothing once `has_size` is set.
    pub fn from_flags(has_color: bool, has_size: bool) -> Self {
        match (has_color, has_size) {
            (_, true) => Self::Size,
            (true, false) => Self::Color,
            (false, false) => Self::Plain,
        }
    }
}

/// Stock count, never negative
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl From<i32> for Quantity { fn from(v: i32) -> Self { Self(v.max(0) as u32) } }

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self { iter.fold(Quantity::default(), |acc, q| acc.add(q)) }
}

/// Inclusive price bounds accepted by the `price` filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PriceRange { low: Decimal, high: Decimal }

impl PriceRange {
    pub const MIN: Decimal = Decimal::ONE;
    pub const MAX: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

    pub fn new(low: Decimal, high: Decimal) -> Result<Self, PriceRangeError> {
        if low < Self::MIN || high > Self::MAX { return Err(PriceRangeError::OutOfBounds); }
        if low > high { return Err(PriceRangeError::Inverted); }
        Ok(Self { low, high })
    }
    pub fn low(&self) -> Decimal { self.low }
    pub fn high(&self) -> Decimal { self.high }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PriceRangeError { OutOfBounds, Inverted }
impl std::error::Error for PriceRangeError {}
impl fmt::Display for PriceRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "Price bounds must lie within {}..={}", PriceRange::MIN, PriceRange::MAX),
            Self::Inverted => write!(f, "Lower price bound exceeds upper bound"),
        }
    }
}

/// Ordering direction; NULLs always sort as the smallest value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[serde(alias = "asc")]
    Asc,
    #[default]
    #[serde(alias = "desc")]
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self { match self { Self::Asc => Self::Desc, Self::Desc => Self::Asc } }
    pub fn as_sql(self) -> &'static str {
        match self { Self::Asc => "ASC NULLS FIRST", Self::Desc => "DESC NULLS LAST" }
    }
}

impl FromStr for SortDirection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::Asc => "ASC", Self::Desc => "DESC" })
    }
}
