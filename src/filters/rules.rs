//! Filter Rule Set
//!
//! Declares which filter keys the product listing understands and what a
//! value must look like to be accepted. Narrowing keeps every field that
//! passes and drops the rest one by one, so a bad `status` never takes a
//! good `search` down with it.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::domain::value_objects::{PriceRange, ProductStatus};

/// Raw filter input as it arrives from the listing form.
pub type FilterInput = BTreeMap<String, Value>;

pub const STATUS_ANY: &str = "any";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Search,
    CategoryId,
    SubcategoryId,
    BrandId,
    Status,
    Colors,
    Sizes,
    Stock,
    From,
    To,
    Price,
}

impl FilterKey {
    pub const ALL: [FilterKey; 11] = [
        Self::Search, Self::CategoryId, Self::SubcategoryId, Self::BrandId, Self::Status,
        Self::Colors, Self::Sizes, Self::Stock, Self::From, Self::To, Self::Price,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::CategoryId => "category_id",
            Self::SubcategoryId => "subcategory_id",
            Self::BrandId => "brand_id",
            Self::Status => "status",
            Self::Colors => "colors",
            Self::Sizes => "sizes",
            Self::Stock => "stock",
            Self::From => "from",
            Self::To => "to",
            Self::Price => "price",
        }
    }

    pub fn parse(name: &str) -> Option<Self> { Self::ALL.into_iter().find(|k| k.as_str() == name) }

    /// Human-readable acceptance constraint.
    pub fn constraint(self) -> &'static str {
        match self {
            Self::Search => "non-empty string",
            Self::CategoryId => "id of an existing category",
            Self::SubcategoryId => "id of an existing subcategory",
            Self::BrandId => "id of an existing brand",
            Self::Status => "`any`, 1 or 2",
            Self::Colors => "ids of existing colors",
            Self::Sizes => "names of existing sizes",
            Self::Stock => "integer between 1 and 9999",
            Self::From | Self::To => "date formatted YYYY-MM-DD",
            Self::Price => "two prices between 1 and 200",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusFilter {
    Any,
    Only(ProductStatus),
}

/// A value that passed its rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Id(i64),
    Status(StatusFilter),
    ColorIds(BTreeSet<i64>),
    SizeNames(BTreeSet<String>),
    Threshold(i64),
    Date(NaiveDate),
    Price(PriceRange),
}

impl FilterValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Id(_) => "id",
            Self::Status(_) => "status",
            Self::ColorIds(_) => "color id set",
            Self::SizeNames(_) => "size name set",
            Self::Threshold(_) => "threshold",
            Self::Date(_) => "date",
            Self::Price(_) => "price range",
        }
    }
}

/// Existence checks for filters that reference catalog rows.
pub trait ReferenceLookup {
    fn category_exists(&self, id: i64) -> bool;
    fn subcategory_exists(&self, id: i64) -> bool;
    fn brand_exists(&self, id: i64) -> bool;
    fn color_exists(&self, id: i64) -> bool;
    fn size_name_exists(&self, name: &str) -> bool;
}

/// Ids and size names present in the catalog when a request started.
#[derive(Clone, Debug, Default)]
pub struct CatalogSnapshot {
    pub(crate) categories: HashSet<i64>,
    pub(crate) subcategories: HashSet<i64>,
    pub(crate) brands: HashSet<i64>,
    pub(crate) colors: HashSet<i64>,
    pub(crate) size_names: HashSet<String>,
}

impl CatalogSnapshot {
    pub fn with_categories(mut self, ids: impl IntoIterator<Item = i64>) -> Self { self.categories.extend(ids); self }
    pub fn with_subcategories(mut self, ids: impl IntoIterator<Item = i64>) -> Self { self.subcategories.extend(ids); self }
    pub fn with_brands(mut self, ids: impl IntoIterator<Item = i64>) -> Self { self.brands.extend(ids); self }
    pub fn with_colors(mut self, ids: impl IntoIterator<Item = i64>) -> Self { self.colors.extend(ids); self }
    pub fn with_size_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.size_names.extend(names.into_iter().map(Into::into));
        self
    }
}

impl ReferenceLookup for CatalogSnapshot {
    fn category_exists(&self, id: i64) -> bool { self.categories.contains(&id) }
    fn subcategory_exists(&self, id: i64) -> bool { self.subcategories.contains(&id) }
    fn brand_exists(&self, id: i64) -> bool { self.brands.contains(&id) }
    fn color_exists(&self, id: i64) -> bool { self.colors.contains(&id) }
    fn size_name_exists(&self, name: &str) -> bool { self.size_names.contains(name) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Value has the wrong shape for its field (text where a number belongs).
    Type,
    /// Value has the right shape but breaks the field's constraint.
    Constraint,
    /// Value references a row that does not exist.
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub field: FilterKey,
    pub reason: RejectReason,
}

/// Outcome of narrowing raw input against a rule set.
#[derive(Clone, Debug, Default)]
pub struct ValidatedFilters {
    pub accepted: BTreeMap<FilterKey, FilterValue>,
    pub rejected: Vec<Rejection>,
    /// Keys the rule set does not declare; never constraint-checked.
    pub undeclared: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterRuleSet {
    declared: BTreeSet<FilterKey>,
}

impl Default for FilterRuleSet {
    fn default() -> Self { Self::product() }
}

impl FilterRuleSet {
    /// Every key of the admin product listing.
    pub fn product() -> Self { Self { declared: FilterKey::ALL.into_iter().collect() } }

    pub fn without(mut self, key: FilterKey) -> Self {
        self.declared.remove(&key);
        self
    }

    pub fn declares(&self, key: FilterKey) -> bool { self.declared.contains(&key) }


    pub fn narrow(&self, raw: &FilterInput, lookup: &dyn ReferenceLookup) -> ValidatedFilters {
        let mut narrowed = ValidatedFilters::default();
        let mut params = FilterParams::default();

        for (name, value) in raw {
            let Some(key) = FilterKey::parse(name).filter(|k| self.declares(*k)) else {
                narrowed.undeclared.insert(name.clone(), value.clone());
                continue;
            };
            if is_blank(value) {
                continue;
            }
            if !params.assign(key, value) {
                reject(&mut narrowed, key, RejectReason::Type);
            }
        }

        if let Err(errors) = params.validate() {
            for field in errors.field_errors().keys() {
                if let Some(key) = FilterKey::parse(field) {
                    params.clear(key);
                    reject(&mut narrowed, key, RejectReason::Constraint);
                }
            }
        }

        for key in FilterKey::ALL {
            let Some(value) = params.take(key) else { continue };
            if references_exist(&value, key, lookup) {
                narrowed.accepted.insert(key, value);
            } else {
                reject(&mut narrowed, key, RejectReason::Missing);
            }
        }

        narrowed
    }
}

fn reject(narrowed: &mut ValidatedFilters, key: FilterKey, reason: RejectReason) {
    tracing::debug!(field = key.as_str(), ?reason, constraint = key.constraint(), "dropping filter value");
    narrowed.rejected.push(Rejection { field: key, reason });
}

fn references_exist(value: &FilterValue, key: FilterKey, lookup: &dyn ReferenceLookup) -> bool {
    match (key, value) {
        (FilterKey::CategoryId, FilterValue::Id(id)) => lookup.category_exists(*id),
        (FilterKey::SubcategoryId, FilterValue::Id(id)) => lookup.subcategory_exists(*id),
        (FilterKey::BrandId, FilterValue::Id(id)) => lookup.brand_exists(*id),
        (FilterKey::Colors, FilterValue::ColorIds(ids)) => ids.iter().all(|id| lookup.color_exists(*id)),
        (FilterKey::Sizes, FilterValue::SizeNames(names)) => names.iter().all(|n| lookup.size_name_exists(n)),
        _ => true,
    }
}

/// Unset form fields arrive as null, empty strings or empty arrays.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

// =============================================================================
// Typed candidates
// =============================================================================

#[derive(Debug, Default, Validate)]
struct FilterParams {
    #[validate(length(min = 1))]
    search: Option<String>,
    #[validate(range(min = 1))]
    category_id: Option<i64>,
    #[validate(range(min = 1))]
    subcategory_id: Option<i64>,
    #[validate(range(min = 1))]
    brand_id: Option<i64>,
    #[validate(custom = "validate_status")]
    status: Option<String>,
    #[validate(custom = "validate_ids")]
    colors: Option<Vec<i64>>,
    #[validate(custom = "validate_names")]
    sizes: Option<Vec<String>>,
    #[validate(range(min = 1, max = 9999))]
    stock: Option<i64>,
    #[validate(custom = "validate_date")]
    from: Option<String>,
    #[validate(custom = "validate_date")]
    to: Option<String>,
    #[validate(custom = "validate_price")]
    price: Option<Vec<Decimal>>,
}

impl FilterParams {
    /// Returns false when the raw value has the wrong shape.
    fn assign(&mut self, key: FilterKey, value: &Value) -> bool {
        match key {
            FilterKey::Search => set(&mut self.search, as_text(value)),
            FilterKey::CategoryId => set(&mut self.category_id, as_integer(value)),
            FilterKey::SubcategoryId => set(&mut self.subcategory_id, as_integer(value)),
            FilterKey::BrandId => set(&mut self.brand_id, as_integer(value)),
            FilterKey::Status => set(&mut self.status, as_text(value)),
            FilterKey::Colors => set(&mut self.colors, as_list(value, as_integer)),
            FilterKey::Sizes => set(&mut self.sizes, as_list(value, as_text)),
            FilterKey::Stock => set(&mut self.stock, as_integer(value)),
            FilterKey::From => set(&mut self.from, as_text(value)),
            FilterKey::To => set(&mut self.to, as_text(value)),
            FilterKey::Price => set(&mut self.price, as_list(value, as_decimal)),
        }
    }

    fn clear(&mut self, key: FilterKey) {
        match key {
            FilterKey::Search => self.search = None,
            FilterKey::CategoryId => self.category_id = None,
            FilterKey::SubcategoryId => self.subcategory_id = None,
            FilterKey::BrandId => self.brand_id = None,
            FilterKey::Status => self.status = None,
            FilterKey::Colors => self.colors = None,
            FilterKey::Sizes => self.sizes = None,
            FilterKey::Stock => self.stock = None,
            FilterKey::From => self.from = None,
            FilterKey::To => self.to = None,
            FilterKey::Price => self.price = None,
        }
    }

    fn take(&mut self, key: FilterKey) -> Option<FilterValue> {
        match key {
            FilterKey::Search => self.search.take().map(FilterValue::Text),
            FilterKey::CategoryId => self.category_id.take().map(FilterValue::Id),
            FilterKey::SubcategoryId => self.subcategory_id.take().map(FilterValue::Id),
            FilterKey::BrandId => self.brand_id.take().map(FilterValue::Id),
            FilterKey::Status => self.status.take().as_deref().and_then(parse_status).map(FilterValue::Status),
            FilterKey::Colors => self.colors.take().map(|ids| FilterValue::ColorIds(ids.into_iter().collect())),
            FilterKey::Sizes => self.sizes.take().map(|names| FilterValue::SizeNames(names.into_iter().collect())),
            FilterKey::Stock => self.stock.take().map(FilterValue::Threshold),
            FilterKey::From => self.from.take().as_deref().and_then(parse_date).map(FilterValue::Date),
            FilterKey::To => self.to.take().as_deref().and_then(parse_date).map(FilterValue::Date),
            FilterKey::Price => self.price.take().as_deref().and_then(parse_price).map(FilterValue::Price),
        }
    }
}

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    let assigned = value.is_some();
    *slot = value;
    assigned
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_list<T>(value: &Value, item: fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(item).collect()
}

fn parse_status(token: &str) -> Option<StatusFilter> {
    if token == STATUS_ANY {
        return Some(StatusFilter::Any);
    }
    token.parse().ok().and_then(ProductStatus::from_code).map(StatusFilter::Only)
}

/// Strict: chrono alone would accept `2024-1-5`.
fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

fn parse_price(bounds: &[Decimal]) -> Option<PriceRange> {
    match bounds {
        [low, high] => PriceRange::new(*low, *high).ok(),
        _ => None,
    }
}

fn validate_status(token: &str) -> Result<(), ValidationError> {
    parse_status(token).map(|_| ()).ok_or_else(|| ValidationError::new("status"))
}

fn validate_ids(ids: &[i64]) -> Result<(), ValidationError> {
    if ids.iter().all(|id| *id > 0) { Ok(()) } else { Err(ValidationError::new("positive")) }
}

fn validate_names(names: &[String]) -> Result<(), ValidationError> {
    if names.iter().all(|n| !n.is_empty()) { Ok(()) } else { Err(ValidationError::new("filled")) }
}

fn validate_date(s: &str) -> Result<(), ValidationError> {
    parse_date(s).map(|_| ()).ok_or_else(|| ValidationError::new("date_format"))
}

fn validate_price(bounds: &[Decimal]) -> Result<(), ValidationError> {
    parse_price(bounds).map(|_| ()).ok_or_else(|| ValidationError::new("price_range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> FilterInput {
        serde_json::from_value(value).unwrap()
    }

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot::default()
            .with_categories([1])
            .with_subcategories([1, 2])
            .with_brands([1])
            .with_colors([1, 2, 3])
            .with_size_names(["S", "M"])
    }

    #[test]
    fn test_accepts_every_valid_key() {
        let narrowed = FilterRuleSet::product().narrow(&input(json!({
            "search": " shirt ", "category_id": "1", "subcategory_id": 2, "brand_id": 1,
            "status": "any", "colors": [1, "2"], "sizes": ["S"], "stock": "5",
            "from": "2024-01-01", "to": "2024-12-31", "price": [10, "20.5"]
        })), &catalog());
        assert!(narrowed.rejected.is_empty(), "{:?}", narrowed.rejected);
        assert_eq!(narrowed.accepted.len(), 11);
        assert_eq!(narrowed.accepted[&FilterKey::Search], FilterValue::Text("shirt".into()));
        assert_eq!(narrowed.accepted[&FilterKey::CategoryId], FilterValue::Id(1));
        assert_eq!(narrowed.accepted[&FilterKey::Status], FilterValue::Status(StatusFilter::Any));
        assert_eq!(narrowed.accepted[&FilterKey::Colors], FilterValue::ColorIds([1, 2].into()));
        assert_eq!(narrowed.accepted[&FilterKey::Stock], FilterValue::Threshold(5));
    }

    #[test]
    fn test_bad_field_does_not_affect_others() {
        let narrowed = FilterRuleSet::product().narrow(&input(json!({
            "status": "bogus", "search": "shirt"
        })), &catalog());
        assert_eq!(narrowed.rejected, vec![Rejection { field: FilterKey::Status, reason: RejectReason::Constraint }]);
        assert_eq!(narrowed.accepted.len(), 1);
        assert!(narrowed.accepted.contains_key(&FilterKey::Search));
    }

    #[test]
    fn test_status_codes() {
        let rules = FilterRuleSet::product();
        let narrowed = rules.narrow(&input(json!({ "status": 2 })), &catalog());
        assert_eq!(narrowed.accepted[&FilterKey::Status], FilterValue::Status(StatusFilter::Only(ProductStatus::Published)));
        let narrowed = rules.narrow(&input(json!({ "status": "3" })), &catalog());
        assert!(narrowed.accepted.is_empty());
    }

    #[test]
    fn test_stock_bounds() {
        let rules = FilterRuleSet::product();
        for bad in [json!(0), json!(10000), json!("lots"), json!(2.5)] {
            let narrowed = rules.narrow(&input(json!({ "stock": bad })), &catalog());
            assert!(narrowed.accepted.is_empty());
            assert_eq!(narrowed.rejected.len(), 1);
        }
        let narrowed = rules.narrow(&input(json!({ "stock": 9999 })), &catalog());
        assert_eq!(narrowed.accepted[&FilterKey::Stock], FilterValue::Threshold(9999));
    }

    #[test]
    fn test_dates_are_strict() {
        let rules = FilterRuleSet::product();
        let narrowed = rules.narrow(&input(json!({ "from": "2024-1-5", "to": "05/01/2024" })), &catalog());
        assert!(narrowed.accepted.is_empty());
        assert_eq!(narrowed.rejected.len(), 2);
        let narrowed = rules.narrow(&input(json!({ "from": "2024-02-30" })), &catalog());
        assert!(narrowed.accepted.is_empty());
    }

    #[test]
    fn test_price_range_rules() {
        let rules = FilterRuleSet::product();
        for bad in [json!([0, 20]), json!([10, 201]), json!([30, 20]), json!([10]), json!([1, 2, 3]), json!(15)] {
            let narrowed = rules.narrow(&input(json!({ "price": bad })), &catalog());
            assert!(narrowed.accepted.is_empty(), "accepted {:?}", narrowed.accepted);
        }
        let narrowed = rules.narrow(&input(json!({ "price": [1, 200] })), &catalog());
        assert!(narrowed.accepted.contains_key(&FilterKey::Price));
    }

    #[test]
    fn test_missing_references_are_dropped() {
        let narrowed = FilterRuleSet::product().narrow(&input(json!({
            "category_id": 9, "brand_id": 1, "colors": [1, 42], "sizes": ["S", "XXL"]
        })), &catalog());
        assert_eq!(narrowed.accepted.len(), 1);
        assert!(narrowed.accepted.contains_key(&FilterKey::BrandId));
        assert!(narrowed.rejected.iter().all(|r| r.reason == RejectReason::Missing));
        assert_eq!(narrowed.rejected.len(), 3);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let narrowed = FilterRuleSet::product().narrow(&input(json!({
            "search": "  ", "category_id": "", "colors": [], "from": null
        })), &catalog());
        assert!(narrowed.accepted.is_empty());
        assert!(narrowed.rejected.is_empty());
    }

    #[test]
    fn test_undeclared_keys_skip_validation() {
        let rules = FilterRuleSet::product().without(FilterKey::Status);
        assert!(!rules.declares(FilterKey::Status));
        let narrowed = rules.narrow(&input(json!({ "status": "bogus", "slug": "red-shirt" })), &catalog());
        assert!(narrowed.accepted.is_empty());
        assert!(narrowed.rejected.is_empty());
        assert_eq!(narrowed.undeclared.len(), 2);
    }
}
