//! Product query model.
//!
//! Filters and sorts build a `ProductQuery` value; rendering into a
//! `sqlx::QueryBuilder` happens once, at the end. Predicates live in an
//! ordered set: the order filters were applied in never shows up in the
//! rendered SQL.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Database, Encode, QueryBuilder, Type};

use super::stock;
use crate::domain::value_objects::{PriceRange, ProductStatus, SortDirection, VariantShape};

/// Columns of `products` that may be named directly by a filter or sort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductColumn {
    Id,
    Name,
    Slug,
    Description,
    Price,
    Status,
    Quantity,
    SubcategoryId,
    BrandId,
    CreatedAt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Decimal,
    Timestamp,
}

impl ProductColumn {
    pub const ALL: [ProductColumn; 10] = [
        Self::Id, Self::Name, Self::Slug, Self::Description, Self::Price,
        Self::Status, Self::Quantity, Self::SubcategoryId, Self::BrandId, Self::CreatedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Slug => "slug",
            Self::Description => "description",
            Self::Price => "price",
            Self::Status => "status",
            Self::Quantity => "quantity",
            Self::SubcategoryId => "subcategory_id",
            Self::BrandId => "brand_id",
            Self::CreatedAt => "created_at",
        }
    }

    pub fn parse(name: &str) -> Option<Self> { Self::ALL.into_iter().find(|c| c.as_str() == name) }

    pub fn kind(self) -> ColumnKind {
        match self {
            Self::Id | Self::Status | Self::Quantity | Self::SubcategoryId | Self::BrandId => ColumnKind::Integer,
            Self::Name | Self::Slug | Self::Description => ColumnKind::Text,
            Self::Price => ColumnKind::Decimal,
            Self::CreatedAt => ColumnKind::Timestamp,
        }
    }

    /// Long text and timestamps make no sense as exact-match filters.
    pub fn accepts_equality(self) -> bool {
        !matches!(self, Self::Description | Self::CreatedAt)
    }

    /// Converts a scalar raw value to this column's type.
    pub fn coerce(self, value: &Value) -> Option<ColumnValue> {
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        match self.kind() {
            ColumnKind::Integer => text.parse().ok().map(ColumnValue::Integer),
            ColumnKind::Text if !text.is_empty() => Some(ColumnValue::Text(text)),
            ColumnKind::Decimal => text.parse().ok().map(ColumnValue::Decimal),
            ColumnKind::Text | ColumnKind::Timestamp => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnValue {
    Integer(i64),
    Text(String),
    Decimal(Decimal),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    Equals { column: ProductColumn, value: ColumnValue },
    NameContains(String),
    InCategory(i64),
    StatusIn(BTreeSet<ProductStatus>),
    /// Any of the colors, directly on the product or on one of its sizes.
    /// Like `AllSizes`, an empty set leaves the product list unconstrained.
    AnyColor(BTreeSet<i64>),
    /// Every one of the size names.
    AllSizes(BTreeSet<String>),
    StockAtLeast(i64),
    CreatedFrom(NaiveDate),
    CreatedTo(NaiveDate),
    PriceBetween(PriceRange),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderExpr {
    Column(ProductColumn),
    CategoryName,
    SubcategoryName,
    BrandName,
    /// Subcategory name for size-shaped products, NULL otherwise.
    SizedSubcategoryName,
    /// Subcategory name for color-carrying products, NULL otherwise.
    ColoredSubcategoryName,
    Stock(VariantShape),
}

impl OrderExpr {
    /// Scalar sub-queries keep the result at one row per product.
    pub fn to_sql(self) -> String {
        match self {
            Self::Column(column) => format!("p.{}", column.as_str()),
            Self::CategoryName => "(SELECT c.name FROM categories c JOIN subcategories sc ON sc.category_id = c.id \
                 WHERE sc.id = p.subcategory_id)".to_string(),
            Self::SubcategoryName => "(SELECT sc.name FROM subcategories sc WHERE sc.id = p.subcategory_id)".to_string(),
            Self::BrandName => "(SELECT b.name FROM brands b WHERE b.id = p.brand_id)".to_string(),
            Self::SizedSubcategoryName => "(SELECT sc.name FROM subcategories sc \
                 WHERE sc.id = p.subcategory_id AND sc.has_size)".to_string(),
            Self::ColoredSubcategoryName => "(SELECT sc.name FROM subcategories sc \
                 WHERE sc.id = p.subcategory_id AND sc.has_color)".to_string(),
            Self::Stock(shape) => stock::gated(shape),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderTerm {
    pub expr: OrderExpr,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductQuery {
    predicates: BTreeSet<Predicate>,
    order: Vec<OrderTerm>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl ProductQuery {
    pub fn new() -> Self { Self::default() }

    pub fn filter(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.insert(predicate);
        self
    }

    pub fn order_by(&mut self, expr: OrderExpr, direction: SortDirection) -> &mut Self {
        self.order.push(OrderTerm { expr, direction });
        self
    }

    pub fn paginate(&mut self, limit: i64, offset: i64) -> &mut Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> { self.predicates.iter() }
    pub fn order(&self) -> &[OrderTerm] { &self.order }
    pub fn is_unfiltered(&self) -> bool { self.predicates.is_empty() }

    pub fn push_where<'args, DB>(&self, qb: &mut QueryBuilder<'args, DB>)
    where
        DB: Database,
        i64: Encode<'args, DB> + Type<DB>,
        String: Encode<'args, DB> + Type<DB>,
        NaiveDate: Encode<'args, DB> + Type<DB>,
    {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            push_predicate(qb, predicate);
        }
    }

    pub fn push_order_by<DB: Database>(&self, qb: &mut QueryBuilder<'_, DB>) {
        for (i, term) in self.order.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " });
            qb.push(term.expr.to_sql()).push(" ").push(term.direction.as_sql());
        }
    }

    pub fn push_limit<'args, DB>(&self, qb: &mut QueryBuilder<'args, DB>)
    where
        DB: Database,
        i64: Encode<'args, DB> + Type<DB>,
    {
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
            qb.push(" OFFSET ").push_bind(self.offset.unwrap_or(0));
        }
    }

    /// `SELECT p.id ...` with filters, ordering and pagination.
    pub fn push_select_ids<'args, DB>(&self, qb: &mut QueryBuilder<'args, DB>)
    where
        DB: Database,
        i64: Encode<'args, DB> + Type<DB>,
        String: Encode<'args, DB> + Type<DB>,
        NaiveDate: Encode<'args, DB> + Type<DB>,
    {
        qb.push("SELECT p.id FROM products p");
        self.push_where(qb);
        self.push_order_by(qb);
        self.push_limit(qb);
    }

    /// One listing row per product: its columns, related names and resolved stock.
    pub fn push_select_listing<'args, DB>(&self, qb: &mut QueryBuilder<'args, DB>)
    where
        DB: Database,
        i64: Encode<'args, DB> + Type<DB>,
        String: Encode<'args, DB> + Type<DB>,
        NaiveDate: Encode<'args, DB> + Type<DB>,
    {
        qb.push("SELECT p.id, p.name, p.slug, p.price, p.status, p.quantity, p.created_at, ");
        qb.push(OrderExpr::CategoryName.to_sql()).push(" AS category, ");
        qb.push(OrderExpr::SubcategoryName.to_sql()).push(" AS subcategory, ");
        qb.push(OrderExpr::BrandName.to_sql()).push(" AS brand, ");
        qb.push(format!("COALESCE({}, 0) AS stock FROM products p", stock::resolved()));
        self.push_where(qb);
        self.push_order_by(qb);
        self.push_limit(qb);
    }

    /// `SELECT COUNT(*) ...` over the filtered set; ordering and pagination ignored.
    pub fn push_count<'args, DB>(&self, qb: &mut QueryBuilder<'args, DB>)
    where
        DB: Database,
        i64: Encode<'args, DB> + Type<DB>,
        String: Encode<'args, DB> + Type<DB>,
        NaiveDate: Encode<'args, DB> + Type<DB>,
    {
        qb.push("SELECT COUNT(*) FROM products p");
        self.push_where(qb);
    }
}

fn push_predicate<'args, DB>(qb: &mut QueryBuilder<'args, DB>, predicate: &Predicate)
where
    DB: Database,
    i64: Encode<'args, DB> + Type<DB>,
    String: Encode<'args, DB> + Type<DB>,
    NaiveDate: Encode<'args, DB> + Type<DB>,
{
    match predicate {
        Predicate::Equals { column, value } => {
            qb.push(format!("p.{} = ", column.as_str()));
            match value {
                ColumnValue::Integer(v) => qb.push_bind(*v),
                ColumnValue::Text(v) => qb.push_bind(v.clone()),
                ColumnValue::Decimal(v) => qb.push(v),
            };
        }
        Predicate::NameContains(term) => {
            qb.push("LOWER(p.name) LIKE LOWER(").push_bind(format!("%{}%", escape_like(term))).push(") ESCAPE '\\'");
        }
        Predicate::InCategory(id) => {
            qb.push("EXISTS (SELECT 1 FROM subcategories sc WHERE sc.id = p.subcategory_id AND sc.category_id = ")
                .push_bind(*id)
                .push(")");
        }
        Predicate::StatusIn(statuses) => match statuses.len() {
            0 => { qb.push("1 = 0"); }
            1 => {
                let status = statuses.iter().next().map(|s| s.code()).unwrap_or_default();
                qb.push("p.status = ").push_bind(status);
            }
            _ => {
                qb.push("p.status IN (");
                push_bind_list(qb, statuses.iter().map(|s| s.code()));
                qb.push(")");
            }
        },
        Predicate::AnyColor(ids) if ids.is_empty() => { qb.push("1 = 1"); }
        Predicate::AnyColor(ids) => {
            qb.push("(EXISTS (SELECT 1 FROM color_product cp WHERE cp.product_id = p.id AND cp.color_id IN (");
            push_bind_list(qb, ids.iter().copied());
            qb.push(")) OR EXISTS (SELECT 1 FROM color_size cs JOIN sizes sz ON sz.id = cs.size_id \
                     WHERE sz.product_id = p.id AND cs.color_id IN (");
            push_bind_list(qb, ids.iter().copied());
            qb.push(")))");
        }
        Predicate::AllSizes(names) if names.is_empty() => { qb.push("1 = 1"); }
        Predicate::AllSizes(names) => {
            qb.push("(");
            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                qb.push("EXISTS (SELECT 1 FROM sizes sz WHERE sz.product_id = p.id AND sz.name = ")
                    .push_bind(name.clone())
                    .push(")");
            }
            qb.push(")");
        }
        Predicate::StockAtLeast(threshold) => {
            qb.push(stock::resolved()).push(" >= ").push_bind(*threshold);
        }
        Predicate::CreatedFrom(date) => {
            qb.push("DATE(p.created_at) >= ").push_bind(*date);
        }
        Predicate::CreatedTo(date) => {
            qb.push("DATE(p.created_at) <= ").push_bind(*date);
        }
        // Bounds are validated decimals, safe to inline.
        Predicate::PriceBetween(range) => {
            qb.push(format!("p.price BETWEEN {} AND {}", range.low(), range.high()));
        }
    }
}

fn push_bind_list<'args, DB>(qb: &mut QueryBuilder<'args, DB>, values: impl Iterator<Item = i64>)
where
    DB: Database,
    i64: Encode<'args, DB> + Type<DB>,
{
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
