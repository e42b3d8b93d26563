//! Admin product listing state.
//!
//! Holds what the back-office table shows: which page, how many rows,
//! which columns, which sort and which raw filters. Every request rebuilds
//! the product query from this state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::domain::value_objects::SortDirection;
use crate::filters::{FilterInput, FilterKey, OrderExpr, ProductColumn, ProductFilter, ProductQuery, ReferenceLookup, Rejection};
use crate::{CatalogError, Result};

pub const ROWS_PER_PAGE_OPTIONS: [u32; 3] = [10, 25, 50];

pub const COLUMNS: [&str; 11] = [
    "name", "sold", "category", "subcategory", "brand", "sizes", "colors", "stock", "status", "price", "created_at",
];

const DEFAULT_COLUMNS: [&str; 9] = [
    "name", "sold", "category", "subcategory", "brand", "sizes", "colors", "stock", "status",
];

/// Columns whose first click sorts descending.
const DESCENDING_FIRST: [&str; 2] = ["sizes", "colors"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ListingState {
    pub rows_per_page: u32,
    #[validate(range(min = 1))]
    pub page: u32,
    pub field_to_order: Option<String>,
    pub sort_direction: SortDirection,
    pub selected_columns: Vec<String>,
    pub filters: FilterInput,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            rows_per_page: ROWS_PER_PAGE_OPTIONS[0],
            page: 1,
            field_to_order: None,
            sort_direction: SortDirection::Desc,
            selected_columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            filters: FilterInput::new(),
        }
    }
}

impl ListingState {
    /// Checks state that came from outside (an HTTP body).
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| CatalogError::InvalidListing(e.to_string()))?;
        if !ROWS_PER_PAGE_OPTIONS.contains(&self.rows_per_page) {
            return Err(CatalogError::InvalidListing(format!("rows per page must be one of {:?}", ROWS_PER_PAGE_OPTIONS)));
        }
        if let Some(column) = self.selected_columns.iter().find(|c| !COLUMNS.contains(&c.as_str())) {
            return Err(CatalogError::InvalidListing(format!("unknown column {column}")));
        }
        Ok(())
    }

    /// Clicking the current sort column flips the direction; a new column
    /// starts ascending, except `sizes` and `colors` which start descending.
    pub fn order_by(&mut self, column: &str) {
        if self.field_to_order.as_deref() == Some(column) {
            self.sort_direction = self.sort_direction.reversed();
        } else if DESCENDING_FIRST.contains(&column) {
            self.sort_direction = SortDirection::Desc;
        } else {
            self.sort_direction = SortDirection::Asc;
        }
        self.field_to_order = Some(column.to_string());
    }

    pub fn update_filter(&mut self, key: &str, value: Value) {
        if key == FilterKey::CategoryId.as_str() {
            self.filters.remove(FilterKey::SubcategoryId.as_str());
        }
        self.filters.insert(key.to_string(), value);
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page = 1;
    }

    pub fn show_column(&self, column: &str) -> bool { self.selected_columns.iter().any(|c| c == column) }

    pub fn toggle_column(&mut self, column: &str) -> Result<()> {
        if !COLUMNS.contains(&column) {
            return Err(CatalogError::InvalidListing(format!("unknown column {column}")));
        }
        if self.show_column(column) {
            self.selected_columns.retain(|c| c != column);
        } else {
            self.selected_columns.push(column.to_string());
        }
        Ok(())
    }

    pub fn set_rows_per_page(&mut self, rows: u32) -> Result<()> {
        if !ROWS_PER_PAGE_OPTIONS.contains(&rows) {
            return Err(CatalogError::InvalidListing(format!("rows per page must be one of {:?}", ROWS_PER_PAGE_OPTIONS)));
        }
        self.rows_per_page = rows;
        self.page = 1;
        Ok(())
    }

    pub fn set_page(&mut self, page: u32) { self.page = page.max(1); }

    pub fn limit(&self) -> i64 { i64::from(self.rows_per_page) }
    pub fn offset(&self) -> i64 { i64::from(self.page.max(1) - 1) * self.limit() }

    /// Filtered, sorted and paginated query, plus the filter values that were dropped.
    pub fn build_query(&self, filter: &ProductFilter, lookup: &dyn ReferenceLookup) -> Result<(ProductQuery, Vec<Rejection>)> {
        let narrowed = filter.narrow(&self.filters, lookup);
        let rejected = narrowed.rejected.clone();
        let mut query = filter.apply_validated(ProductQuery::new(), narrowed)?;
        if let Some(field) = &self.field_to_order {
            query = filter.apply_sort(query, field, self.sort_direction)?;
        }
        // Ties on the sort key must not move rows between pages.
        query.order_by(OrderExpr::Column(ProductColumn::Id), SortDirection::Asc);
        query.paginate(self.limit(), self.offset());
        Ok((query, rejected))
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
    pub columns: Vec<String>,
    pub rejected: Vec<Rejection>,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, state: &ListingState, rejected: Vec<Rejection>) -> Self {
        let per_page = state.rows_per_page.max(1);
        let last_page = u32::try_from((total.max(0) as u64).div_ceil(u64::from(per_page))).unwrap_or(u32::MAX).max(1);
        Self { data, total, page: state.page, per_page, last_page, columns: state.selected_columns.clone(), rejected }
    }
}
