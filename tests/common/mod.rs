#![allow(dead_code)]

use opensase_catalog::filters::CatalogSnapshot;
use opensase_catalog::ProductQuery;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, QueryBuilder, Sqlite};

pub const PLAIN_CABLE: i64 = 1;
pub const COLOR_HAT: i64 = 2;
pub const SIZE_SHIRT: i64 = 3;
pub const CHEAP_CABLE: i64 = 4;
pub const PRICEY_CABLE: i64 = 5;
pub const LARGE_SHIRT: i64 = 6;

pub const RED: i64 = 1;
pub const BLUE: i64 = 2;
pub const GREEN: i64 = 3;

const SCHEMA: &str = r#"
CREATE TABLE categories (id INTEGER PRIMARY KEY, name TEXT NOT NULL, slug TEXT NOT NULL);
CREATE TABLE subcategories (
    id INTEGER PRIMARY KEY, category_id INTEGER NOT NULL, name TEXT NOT NULL,
    has_color BOOLEAN NOT NULL, has_size BOOLEAN NOT NULL
);
CREATE TABLE brands (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE colors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE products (
    id INTEGER PRIMARY KEY, name TEXT NOT NULL, slug TEXT NOT NULL, description TEXT NOT NULL DEFAULT '',
    price NUMERIC NOT NULL, status INTEGER NOT NULL, quantity INTEGER,
    subcategory_id INTEGER NOT NULL, brand_id INTEGER NOT NULL, created_at TEXT NOT NULL
);
CREATE TABLE sizes (id INTEGER PRIMARY KEY, name TEXT NOT NULL, product_id INTEGER NOT NULL);
CREATE TABLE color_product (id INTEGER PRIMARY KEY, color_id INTEGER NOT NULL, product_id INTEGER NOT NULL, quantity INTEGER NOT NULL);
CREATE TABLE color_size (id INTEGER PRIMARY KEY, color_id INTEGER NOT NULL, size_id INTEGER NOT NULL, quantity INTEGER NOT NULL);
"#;

// Shirts use sizes, hats use colors, cables are plain. The hat's stale
// `quantity` and the cable's stale color row must never count.
const SEED: &str = r#"
INSERT INTO categories VALUES (1, 'Clothes', 'clothes'), (2, 'Gadgets', 'gadgets');
INSERT INTO subcategories VALUES (1, 1, 'Shirts', 1, 1), (2, 1, 'Hats', 1, 0), (3, 2, 'Cables', 0, 0);
INSERT INTO brands VALUES (1, 'Acme'), (2, 'Zenith');
INSERT INTO colors VALUES (1, 'Red'), (2, 'Blue'), (3, 'Green');
INSERT INTO products (id, name, slug, price, status, quantity, subcategory_id, brand_id, created_at) VALUES
    (1, 'Plain Cable', 'plain-cable', 10, 2, 5, 3, 1, '2024-01-01 00:00:00'),
    (2, 'Color Hat', 'color-hat', 20, 2, 100, 2, 2, '2024-03-15 12:00:00'),
    (3, 'Size Shirt', 'size-shirt', 15, 1, NULL, 1, 1, '2024-03-15 12:00:00'),
    (4, 'Cheap Cable', 'cheap-cable', 9.99, 2, 1, 3, 2, '2024-03-15 12:00:00'),
    (5, 'Pricey Cable', 'pricey-cable', 20.01, 2, 1, 3, 2, '2024-03-15 12:00:00'),
    (6, 'Large Shirt', 'large-shirt', 50, 2, NULL, 1, 2, '2024-03-15 12:00:00');
INSERT INTO color_product (color_id, product_id, quantity) VALUES (1, 2, 3), (3, 2, 4), (3, 1, 40);
INSERT INTO sizes VALUES (1, 'S', 3), (2, 'M', 3), (3, 'L', 6);
INSERT INTO color_size (color_id, size_id, quantity) VALUES (2, 1, 4), (2, 2, 6), (1, 3, 2);
"#;

pub async fn seeded_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    pool.execute(SCHEMA).await.unwrap();
    pool.execute(SEED).await.unwrap();
    pool
}

pub fn snapshot() -> CatalogSnapshot {
    CatalogSnapshot::default()
        .with_categories([1, 2])
        .with_subcategories([1, 2, 3])
        .with_brands([1, 2])
        .with_colors([RED, BLUE, GREEN])
        .with_size_names(["S", "M", "L"])
}

pub fn render(query: &ProductQuery) -> String {
    let mut qb = QueryBuilder::<Sqlite>::new("");
    query.push_select_ids(&mut qb);
    qb.sql().to_string()
}

pub async fn ids(pool: &SqlitePool, query: &ProductQuery) -> Vec<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new("");
    query.push_select_ids(&mut qb);
    qb.build_query_scalar::<i64>().fetch_all(pool).await.unwrap()
}

pub async fn sorted_ids(pool: &SqlitePool, query: &ProductQuery) -> Vec<i64> {
    let mut found = ids(pool, query).await;
    found.sort_unstable();
    found
}

pub async fn count(pool: &SqlitePool, query: &ProductQuery) -> i64 {
    let mut qb = QueryBuilder::<Sqlite>::new("");
    query.push_count(&mut qb);
    qb.build_query_scalar::<i64>().fetch_one(pool).await.unwrap()
}
