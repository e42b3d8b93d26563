mod common;

use common::*;
use opensase_catalog::domain::value_objects::SortDirection;
use opensase_catalog::filters::FilterRuleSet;
use opensase_catalog::listing::ListingState;
use opensase_catalog::{FilterInput, ProductFilter, ProductQuery};
use serde_json::{json, Value};
use sqlx::{QueryBuilder, Row, Sqlite};

fn input(value: Value) -> FilterInput {
    serde_json::from_value(value).unwrap()
}

fn filtered(raw: Value) -> ProductQuery {
    ProductFilter::new().apply_filters(ProductQuery::new(), &input(raw), &snapshot()).unwrap()
}

#[tokio::test]
async fn test_unfiltered_lists_everything() {
    let pool = seeded_pool().await;
    assert_eq!(count(&pool, &ProductQuery::new()).await, 6);
}

#[tokio::test]
async fn test_filter_permutations_agree() {
    let pool = seeded_pool().await;
    let filter = ProductFilter::new();
    let narrowed = filter.narrow(
        &input(json!({ "search": "shirt", "category_id": 1, "colors": [2], "stock": 1, "from": "2024-01-01" })),
        &snapshot(),
    );
    let accepted: Vec<_> = narrowed.accepted.into_iter().collect();

    let mut renders = vec![];
    let mut results = vec![];
    for shift in 0..accepted.len() {
        let mut order = accepted.clone();
        order.rotate_left(shift);
        if shift % 2 == 1 {
            order.reverse();
        }
        let query = order.into_iter().fold(ProductQuery::new(), |query, (key, value)| {
            let single = opensase_catalog::filters::ValidatedFilters { accepted: [(key, value)].into(), ..Default::default() };
            filter.apply_validated(query, single).unwrap()
        });
        renders.push(render(&query));
        results.push(sorted_ids(&pool, &query).await);
    }
    assert!(renders.windows(2).all(|w| w[0] == w[1]));
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(results[0], vec![SIZE_SHIRT]);
}

#[tokio::test]
async fn test_invalid_status_is_dropped() {
    let pool = seeded_pool().await;
    assert_eq!(count(&pool, &filtered(json!({ "status": "bogus" }))).await, 6);
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "status": 1 }))).await, vec![SIZE_SHIRT]);
    assert_eq!(count(&pool, &filtered(json!({ "status": "any" }))).await, 6);
}

#[tokio::test]
async fn test_colors_match_either_ledger() {
    let pool = seeded_pool().await;
    let found = sorted_ids(&pool, &filtered(json!({ "colors": [RED, BLUE] }))).await;
    assert_eq!(found, vec![COLOR_HAT, SIZE_SHIRT, LARGE_SHIRT]);
    assert!(!found.contains(&PLAIN_CABLE));
}

#[tokio::test]
async fn test_sizes_must_all_be_present() {
    let pool = seeded_pool().await;
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "sizes": ["S"] }))).await, vec![SIZE_SHIRT]);
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "sizes": ["S", "M"] }))).await, vec![SIZE_SHIRT]);
    assert!(ids(&pool, &filtered(json!({ "sizes": ["S", "L"] }))).await.is_empty());
}

#[tokio::test]
async fn test_stock_reads_only_the_shape_ledger() {
    let pool = seeded_pool().await;
    let at_least = |n: i64| filtered(json!({ "stock": n }));

    assert!(ids(&pool, &at_least(5)).await.contains(&PLAIN_CABLE));
    assert!(!ids(&pool, &at_least(6)).await.contains(&PLAIN_CABLE));

    assert!(ids(&pool, &at_least(7)).await.contains(&COLOR_HAT));
    assert!(!ids(&pool, &at_least(8)).await.contains(&COLOR_HAT));

    assert!(ids(&pool, &at_least(10)).await.contains(&SIZE_SHIRT));
    assert!(!ids(&pool, &at_least(11)).await.contains(&SIZE_SHIRT));
    assert!(ids(&pool, &at_least(11)).await.is_empty());
}

#[tokio::test]
async fn test_price_bounds_are_inclusive() {
    let pool = seeded_pool().await;
    let found = sorted_ids(&pool, &filtered(json!({ "price": [10, 20] }))).await;
    assert_eq!(found, vec![PLAIN_CABLE, COLOR_HAT, SIZE_SHIRT]);
    assert_eq!(count(&pool, &filtered(json!({ "price": [20, 10] }))).await, 6);
}

#[tokio::test]
async fn test_dates_are_inclusive() {
    let pool = seeded_pool().await;
    assert!(ids(&pool, &filtered(json!({ "from": "2024-01-01" }))).await.contains(&PLAIN_CABLE));
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "to": "2024-01-01" }))).await, vec![PLAIN_CABLE]);
    assert!(!ids(&pool, &filtered(json!({ "from": "2024-01-02" }))).await.contains(&PLAIN_CABLE));
    assert_eq!(count(&pool, &filtered(json!({ "from": "2024-1-2" }))).await, 6);
}

#[tokio::test]
async fn test_category_and_equality_filters() {
    let pool = seeded_pool().await;
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "category_id": 2 }))).await, vec![PLAIN_CABLE, CHEAP_CABLE, PRICEY_CABLE]);
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "brand_id": 1 }))).await, vec![PLAIN_CABLE, SIZE_SHIRT]);
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "slug": "color-hat" }))).await, vec![COLOR_HAT]);
    assert_eq!(count(&pool, &filtered(json!({ "category_id": 42 }))).await, 6);
}

#[tokio::test]
async fn test_search_ignores_case() {
    let pool = seeded_pool().await;
    for term in ["shirt", "SHIRT", "sIzE sHiRt"] {
        assert!(ids(&pool, &filtered(json!({ "search": term }))).await.contains(&SIZE_SHIRT), "{term}");
    }
    assert!(render(&filtered(json!({ "search": "shirt" }))).contains("LOWER(p.name) LIKE LOWER(?)"));
}

#[tokio::test]
async fn test_search_escapes_wildcards() {
    let pool = seeded_pool().await;
    assert_eq!(sorted_ids(&pool, &filtered(json!({ "search": "Cable" }))).await, vec![PLAIN_CABLE, CHEAP_CABLE, PRICEY_CABLE]);
    assert!(ids(&pool, &filtered(json!({ "search": "%" }))).await.is_empty());
}

#[tokio::test]
async fn test_stock_sort_follows_shape_priority() {
    let pool = seeded_pool().await;
    let query = ProductFilter::new().apply_sort(ProductQuery::new(), "stock", SortDirection::Desc).unwrap();
    let order = ids(&pool, &query).await;
    assert_eq!(&order[..4], &[SIZE_SHIRT, LARGE_SHIRT, COLOR_HAT, PLAIN_CABLE]);
}

#[tokio::test]
async fn test_named_sorts() {
    let pool = seeded_pool().await;
    let filter = ProductFilter::new();

    let by_brand = filter.apply_sort(ProductQuery::new(), "brand", SortDirection::Asc).unwrap();
    let by_brand = filter.apply_sort(by_brand, "id", SortDirection::Asc).unwrap();
    assert_eq!(ids(&pool, &by_brand).await, vec![1, 3, 2, 4, 5, 6]);

    let by_category = filter.apply_sort(ProductQuery::new(), "category", SortDirection::Desc).unwrap();
    let by_category = filter.apply_sort(by_category, "id", SortDirection::Asc).unwrap();
    assert_eq!(ids(&pool, &by_category).await, vec![1, 4, 5, 2, 3, 6]);

    // Products outside sized subcategories sort as NULL: first ascending.
    let by_sizes = filter.apply_sort(ProductQuery::new(), "sizes", SortDirection::Asc).unwrap();
    let by_sizes = filter.apply_sort(by_sizes, "id", SortDirection::Asc).unwrap();
    assert_eq!(ids(&pool, &by_sizes).await, vec![1, 2, 4, 5, 3, 6]);

    let sold = filter.apply_sort(ProductQuery::new(), "sold", SortDirection::Asc).unwrap();
    assert!(sold.order().is_empty());
}

#[tokio::test]
async fn test_narrowed_rule_set_on_storage() {
    let pool = seeded_pool().await;
    let filter = ProductFilter::with_rules(FilterRuleSet::product().without(opensase_catalog::filters::FilterKey::Status));
    let query = filter.apply_filters(ProductQuery::new(), &input(json!({ "status": 1 })), &snapshot()).unwrap();
    assert_eq!(sorted_ids(&pool, &query).await, vec![SIZE_SHIRT]);
}

#[tokio::test]
async fn test_listing_page() {
    let pool = seeded_pool().await;
    let mut listing = ListingState::default();
    listing.update_filter("category_id", json!(1));
    listing.order_by("name");
    let (query, rejected) = listing.build_query(&ProductFilter::new(), &snapshot()).unwrap();
    assert!(rejected.is_empty());

    let mut qb = QueryBuilder::<Sqlite>::new("");
    query.push_select_listing(&mut qb);
    let rows = qb.build().fetch_all(&pool).await.unwrap();
    let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
    let stock: Vec<i64> = rows.iter().map(|r| r.get("stock")).collect();
    let brands: Vec<String> = rows.iter().map(|r| r.get("brand")).collect();
    assert_eq!(names, vec!["Color Hat", "Large Shirt", "Size Shirt"]);
    assert_eq!(stock, vec![7, 2, 10]);
    assert_eq!(brands, vec!["Zenith", "Zenith", "Acme"]);
    assert_eq!(count(&pool, &query).await, 3);
}

#[tokio::test]
async fn test_listing_pagination() {
    let pool = seeded_pool().await;
    let mut listing = ListingState::default();
    listing.order_by("price");
    listing.set_page(1);
    let (query, _) = listing.build_query(&ProductFilter::new(), &snapshot()).unwrap();
    assert_eq!(ids(&pool, &query).await, vec![4, 1, 3, 2, 5, 6]);
    assert_eq!(count(&pool, &query).await, 6);

    listing.set_page(2);
    let (query, _) = listing.build_query(&ProductFilter::new(), &snapshot()).unwrap();
    assert!(ids(&pool, &query).await.is_empty());
}

#[tokio::test]
async fn test_listing_ties_break_on_id() {
    let pool = seeded_pool().await;
    let mut listing = ListingState::default();
    listing.order_by("brand");
    let (query, _) = listing.build_query(&ProductFilter::new(), &snapshot()).unwrap();
    assert_eq!(ids(&pool, &query).await, vec![1, 3, 2, 4, 5, 6]);
}
