//! Product filter engine
//!
//! Turns loosely-typed listing input into a [`ProductQuery`]:
//!
//! 1. the [`FilterRuleSet`] narrows the input to the values that pass their rule;
//! 2. each accepted value goes to its named handler, or to column equality
//!    when the key has none;
//! 3. undeclared keys are matched against the product column allow-list and
//!    applied as equality, or ignored.
//!
//! Sorting follows the same pattern: named resolvers for derived values,
//! column ordering for allow-listed columns, an error for anything else.

pub mod handlers;
pub mod query;
pub mod rules;
pub mod stock;

use serde_json::Value;

pub use query::{ColumnValue, OrderExpr, Predicate, ProductColumn, ProductQuery};
pub use rules::{
    CatalogSnapshot, FilterInput, FilterKey, FilterRuleSet, FilterValue, ReferenceLookup, Rejection,
    ValidatedFilters,
};

use crate::domain::value_objects::SortDirection;
use crate::{CatalogError, Result};

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    rules: FilterRuleSet,
}

impl ProductFilter {
    pub fn new() -> Self { Self::default() }
    pub fn with_rules(rules: FilterRuleSet) -> Self { Self { rules } }

    pub fn narrow(&self, raw: &FilterInput, lookup: &dyn ReferenceLookup) -> ValidatedFilters {
        self.rules.narrow(raw, lookup)
    }

    pub fn apply_filters(&self, query: ProductQuery, raw: &FilterInput, lookup: &dyn ReferenceLookup) -> Result<ProductQuery> {
        self.apply_validated(query, self.narrow(raw, lookup))
    }

    pub fn apply_validated(&self, mut query: ProductQuery, filters: ValidatedFilters) -> Result<ProductQuery> {
        for (key, value) in filters.accepted {
            match handlers::filter_handler(key) {
                Some(handler) => handler(&mut query, value)?,
                None => apply_column_equality(&mut query, key, value)?,
            }
        }
        for (name, value) in &filters.undeclared {
            apply_undeclared(&mut query, name, value);
        }
        Ok(query)
    }

    pub fn apply_sort(&self, mut query: ProductQuery, field: &str, direction: SortDirection) -> Result<ProductQuery> {
        match handlers::sort_resolver(field) {
            Some(resolver) => resolver(&mut query, direction),
            None => {
                let column = ProductColumn::parse(field)
                    .ok_or_else(|| CatalogError::UnknownSortField(field.to_string()))?;
                query.order_by(OrderExpr::Column(column), direction);
            }
        }
        Ok(query)
    }

    /// `apply_sort` with the direction still in its raw form.
    pub fn apply_sort_str(&self, query: ProductQuery, field: &str, direction: &str) -> Result<ProductQuery> {
        let direction = direction.parse::<SortDirection>().map_err(CatalogError::InvalidSortDirection)?;
        self.apply_sort(query, field, direction)
    }

    /// Fields `apply_sort` accepts.
    pub fn sort_fields(&self) -> impl Iterator<Item = &'static str> {
        handlers::sort_fields().chain(ProductColumn::ALL.into_iter().map(ProductColumn::as_str))
    }
}

fn apply_column_equality(query: &mut ProductQuery, key: FilterKey, value: FilterValue) -> Result<()> {
    let wiring = |value: &FilterValue| CatalogError::FilterWiring { key: key.as_str(), found: value.kind() };
    let Some(column) = ProductColumn::parse(key.as_str()) else {
        return Err(wiring(&value));
    };
    let value = match value {
        FilterValue::Id(id) => ColumnValue::Integer(id),
        FilterValue::Text(text) => ColumnValue::Text(text),
        other => return Err(wiring(&other)),
    };
    query.filter(Predicate::Equals { column, value });
    Ok(())
}

fn apply_undeclared(query: &mut ProductQuery, name: &str, raw: &Value) {
    let matched = ProductColumn::parse(name)
        .filter(|column| column.accepts_equality())
        .and_then(|column| column.coerce(raw).map(|value| (column, value)));
    match matched {
        Some((column, value)) => {
            query.filter(Predicate::Equals { column, value });
        }
        None => tracing::debug!(field = name, "ignoring filter outside the product column allow-list"),
    }
}
