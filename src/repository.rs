//! PostgreSQL reads backing the admin listing

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::aggregates::{ColorStock, Inventory, SizeColorStock};
use crate::domain::value_objects::{Quantity, VariantShape};
use crate::filters::{CatalogSnapshot, ProductQuery};
use crate::sales::SalesLedger;
use crate::{Brand, CatalogError, Category, Color, Result, Subcategory};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductListRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub status: i32,
    pub quantity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub stock: i64,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub brands: Vec<Brand>,
    pub colors: Vec<Color>,
    pub sizes: Vec<String>,
}

impl CatalogSnapshot {
    pub async fn load(pool: &PgPool) -> Result<Self> {
        let categories: Vec<i64> = sqlx::query_scalar("SELECT id FROM categories").fetch_all(pool).await?;
        let subcategories: Vec<i64> = sqlx::query_scalar("SELECT id FROM subcategories").fetch_all(pool).await?;
        let brands: Vec<i64> = sqlx::query_scalar("SELECT id FROM brands").fetch_all(pool).await?;
        let colors: Vec<i64> = sqlx::query_scalar("SELECT id FROM colors").fetch_all(pool).await?;
        let sizes: Vec<String> = sqlx::query_scalar("SELECT DISTINCT name FROM sizes").fetch_all(pool).await?;
        Ok(Self::default()
            .with_categories(categories)
            .with_subcategories(subcategories)
            .with_brands(brands)
            .with_colors(colors)
            .with_size_names(sizes))
    }
}

pub async fn fetch_page(pool: &PgPool, query: &ProductQuery) -> Result<Vec<ProductListRow>> {
    let mut qb = QueryBuilder::<Postgres>::new("");
    query.push_select_listing(&mut qb);
    Ok(qb.build_query_as::<ProductListRow>().fetch_all(pool).await?)
}

pub async fn count(pool: &PgPool, query: &ProductQuery) -> Result<i64> {
    let mut qb = QueryBuilder::<Postgres>::new("");
    query.push_count(&mut qb);
    Ok(qb.build_query_scalar::<i64>().fetch_one(pool).await?)
}

/// Subcategories are only listed once a category is picked.
pub async fn filter_options(pool: &PgPool, category_id: Option<i64>) -> Result<FilterOptions> {
    let categories = sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories ORDER BY name")
        .fetch_all(pool).await?;
    let subcategories = match category_id {
        Some(id) => sqlx::query_as::<_, Subcategory>(
            "SELECT id, category_id, name, has_color, has_size FROM subcategories WHERE category_id = $1 ORDER BY name")
            .bind(id).fetch_all(pool).await?,
        None => vec![],
    };
    let brands = sqlx::query_as::<_, Brand>("SELECT id, name FROM brands ORDER BY name").fetch_all(pool).await?;
    let colors = sqlx::query_as::<_, Color>("SELECT id, name FROM colors ORDER BY name").fetch_all(pool).await?;
    let sizes: Vec<String> = sqlx::query_scalar("SELECT DISTINCT name FROM sizes ORDER BY name").fetch_all(pool).await?;
    Ok(FilterOptions { categories, subcategories, brands, colors, sizes })
}

pub async fn order_contents(pool: &PgPool) -> Result<Vec<String>> {
    Ok(sqlx::query_scalar("SELECT content FROM orders WHERE content IS NOT NULL").fetch_all(pool).await?)
}

pub async fn sales_ledger(pool: &PgPool) -> Result<SalesLedger> {
    let contents = order_contents(pool).await?;
    Ok(SalesLedger::from_contents(contents.iter().map(String::as_str)))
}

/// A product without a subcategory is treated as plain.
pub async fn load_inventory(pool: &PgPool, product_id: i64) -> Result<Inventory> {
    let (quantity, has_color, has_size): (Option<i32>, Option<bool>, Option<bool>) = sqlx::query_as(
        "SELECT p.quantity, sc.has_color, sc.has_size FROM products p \
         LEFT JOIN subcategories sc ON sc.id = p.subcategory_id WHERE p.id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CatalogError::ProductNotFound)?;
    let shape = VariantShape::from_flags(has_color.unwrap_or(false), has_size.unwrap_or(false));

    let colors: Vec<(i64, i32)> = sqlx::query_as("SELECT color_id, quantity FROM color_product WHERE product_id = $1")
        .bind(product_id).fetch_all(pool).await?;
    let sizes: Vec<(i64, i64, i32)> = sqlx::query_as(
        "SELECT cs.size_id, cs.color_id, cs.quantity FROM color_size cs \
         JOIN sizes sz ON sz.id = cs.size_id WHERE sz.product_id = $1")
        .bind(product_id).fetch_all(pool).await?;

    tracing::debug!(product_id, ?shape, colors = colors.len(), sizes = sizes.len(), "loaded inventory");
    Ok(Inventory::new(product_id, shape, quantity.map(Quantity::from))
        .with_colors(colors.into_iter().map(|(color_id, q)| ColorStock { color_id, quantity: q.into() }))
        .with_sizes(sizes.into_iter().map(|(size_id, color_id, q)| SizeColorStock { size_id, color_id, quantity: q.into() })))
}
