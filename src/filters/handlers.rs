//! Named filter handlers and sort resolvers.
//!
//! Each table maps a key to the function that overrides the default
//! behavior for it. Keys missing from a table take the engine's default
//! branch (column equality, column ordering).

use super::query::{OrderExpr, Predicate, ProductQuery};
use super::rules::{FilterKey, FilterValue, StatusFilter};
use super::stock;
use crate::domain::value_objects::{ProductStatus, SortDirection};
use crate::{CatalogError, Result};

pub type FilterHandler = fn(&mut ProductQuery, FilterValue) -> Result<()>;
pub type SortResolver = fn(&mut ProductQuery, SortDirection);

const FILTER_HANDLERS: &[(FilterKey, FilterHandler)] = &[
    (FilterKey::Search, filter_by_search as FilterHandler),
    (FilterKey::CategoryId, filter_by_category as FilterHandler),
    (FilterKey::Status, filter_by_status as FilterHandler),
    (FilterKey::Colors, filter_by_colors as FilterHandler),
    (FilterKey::Sizes, filter_by_sizes as FilterHandler),
    (FilterKey::Stock, filter_by_stock as FilterHandler),
    (FilterKey::From, filter_by_from as FilterHandler),
    (FilterKey::To, filter_by_to as FilterHandler),
    (FilterKey::Price, filter_by_price as FilterHandler),
];

const SORT_RESOLVERS: &[(&str, SortResolver)] = &[
    ("category", order_by_category as SortResolver),
    ("subcategory", order_by_subcategory as SortResolver),
    ("brand", order_by_brand as SortResolver),
    ("sizes", order_by_sizes as SortResolver),
    ("colors", order_by_colors as SortResolver),
    ("stock", order_by_stock as SortResolver),
    ("sold", order_by_sold as SortResolver),
];

pub fn filter_handler(key: FilterKey) -> Option<FilterHandler> {
    FILTER_HANDLERS.iter().find(|(k, _)| *k == key).map(|(_, handler)| *handler)
}

pub fn sort_resolver(field: &str) -> Option<SortResolver> {
    SORT_RESOLVERS.iter().find(|(name, _)| *name == field).map(|(_, resolver)| *resolver)
}

pub fn sort_fields() -> impl Iterator<Item = &'static str> {
    SORT_RESOLVERS.iter().map(|(name, _)| *name)
}

fn mismatch(key: FilterKey, value: &FilterValue) -> CatalogError {
    CatalogError::FilterWiring { key: key.as_str(), found: value.kind() }
}

// =============================================================================
// Filters
// =============================================================================

fn filter_by_search(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::Text(term) => { query.filter(Predicate::NameContains(term)); Ok(()) }
        other => Err(mismatch(FilterKey::Search, &other)),
    }
}

fn filter_by_category(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::Id(id) => { query.filter(Predicate::InCategory(id)); Ok(()) }
        other => Err(mismatch(FilterKey::CategoryId, &other)),
    }
}

fn filter_by_status(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    let statuses = match value {
        FilterValue::Status(StatusFilter::Any) => ProductStatus::ALL.into(),
        FilterValue::Status(StatusFilter::Only(status)) => [status].into(),
        other => return Err(mismatch(FilterKey::Status, &other)),
    };
    query.filter(Predicate::StatusIn(statuses));
    Ok(())
}

fn filter_by_colors(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::ColorIds(ids) if ids.is_empty() => Ok(()),
        FilterValue::ColorIds(ids) => { query.filter(Predicate::AnyColor(ids)); Ok(()) }
        other => Err(mismatch(FilterKey::Colors, &other)),
    }
}

fn filter_by_sizes(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::SizeNames(names) if names.is_empty() => Ok(()),
        FilterValue::SizeNames(names) => { query.filter(Predicate::AllSizes(names)); Ok(()) }
        other => Err(mismatch(FilterKey::Sizes, &other)),
    }
}

fn filter_by_stock(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::Threshold(min) => { query.filter(Predicate::StockAtLeast(min)); Ok(()) }
        other => Err(mismatch(FilterKey::Stock, &other)),
    }
}

fn filter_by_from(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::Date(date) => { query.filter(Predicate::CreatedFrom(date)); Ok(()) }
        other => Err(mismatch(FilterKey::From, &other)),
    }
}

fn filter_by_to(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::Date(date) => { query.filter(Predicate::CreatedTo(date)); Ok(()) }
        other => Err(mismatch(FilterKey::To, &other)),
    }
}

fn filter_by_price(query: &mut ProductQuery, value: FilterValue) -> Result<()> {
    match value {
        FilterValue::Price(range) => { query.filter(Predicate::PriceBetween(range)); Ok(()) }
        other => Err(mismatch(FilterKey::Price, &other)),
    }
}

// =============================================================================
// Sorts
// =============================================================================

fn order_by_category(query: &mut ProductQuery, direction: SortDirection) {
    query.order_by(OrderExpr::CategoryName, direction);
}

fn order_by_subcategory(query: &mut ProductQuery, direction: SortDirection) {
    query.order_by(OrderExpr::SubcategoryName, direction);
}

fn order_by_brand(query: &mut ProductQuery, direction: SortDirection) {
    query.order_by(OrderExpr::BrandName, direction);
}

fn order_by_sizes(query: &mut ProductQuery, direction: SortDirection) {
    query.order_by(OrderExpr::SizedSubcategoryName, direction);
}

fn order_by_colors(query: &mut ProductQuery, direction: SortDirection) {
    query.order_by(OrderExpr::ColoredSubcategoryName, direction);
}

fn order_by_stock(query: &mut ProductQuery, direction: SortDirection) {
    for shape in stock::SORT_PRIORITY {
        query.order_by(OrderExpr::Stock(shape), direction);
    }
}

// TODO: confirm with the catalog owners whether `sold` should order by units
// sold before giving it an ordering; until then it leaves the query untouched.
fn order_by_sold(_query: &mut ProductQuery, _direction: SortDirection) {}
