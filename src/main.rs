//! OpenSASE Catalog - admin product listing service

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_catalog::config::AppConfig;
use opensase_catalog::domain::aggregates::{StockLevel, VariantSelection};
use opensase_catalog::domain::value_objects::{Quantity, VariantShape};
use opensase_catalog::filters::CatalogSnapshot;
use opensase_catalog::listing::{ListingState, PaginatedResponse};
use opensase_catalog::repository::{self, FilterOptions, ProductListRow};
use opensase_catalog::{CatalogError, ProductFilter};

#[derive(Clone)] pub struct AppState { pub db: sqlx::PgPool, pub filter: ProductFilter }

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let state = AppState { db, filter: ProductFilter::new() };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-catalog"})) }))
        .route("/api/v1/admin/products/search", post(search_products))
        .route("/api/v1/admin/products/options", get(filter_options))
        .route("/api/v1/admin/products/:id/stock", get(product_stock))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    tracing::info!("OpenSASE Catalog listening on {}", config.listen_addr());
    axum::serve(tokio::net::TcpListener::bind(config.listen_addr()).await?, app).await?;
    Ok(())
}

fn error_response(e: CatalogError) -> (StatusCode, String) {
    let status = match &e {
        CatalogError::ProductNotFound => StatusCode::NOT_FOUND,
        CatalogError::UnknownSortField(_) | CatalogError::InvalidSortDirection(_) | CatalogError::InvalidListing(_) => StatusCode::BAD_REQUEST,
        CatalogError::Inventory(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::FilterWiring { .. } | CatalogError::StorageError(_) => {
            tracing::error!(error = %e, "catalog request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

async fn search_products(State(s): State<AppState>, Json(listing): Json<ListingState>) -> Result<Json<PaginatedResponse<ProductListRow>>, (StatusCode, String)> {
    listing.check().map_err(error_response)?;
    let lookup = CatalogSnapshot::load(&s.db).await.map_err(error_response)?;
    let (query, rejected) = listing.build_query(&s.filter, &lookup).map_err(error_response)?;
    let mut rows = repository::fetch_page(&s.db, &query).await.map_err(error_response)?;
    let total = repository::count(&s.db, &query).await.map_err(error_response)?;
    if listing.show_column("sold") {
        let ledger = repository::sales_ledger(&s.db).await.map_err(error_response)?;
        for row in &mut rows { row.sold = Some(ledger.units_sold(row.id)); }
    }
    tracing::debug!(total, rejected = rejected.len(), "product search");
    Ok(Json(PaginatedResponse::new(rows, total, &listing, rejected)))
}

#[derive(Debug, Deserialize)] pub struct OptionsParams { pub category_id: Option<i64> }

async fn filter_options(State(s): State<AppState>, Query(p): Query<OptionsParams>) -> Result<Json<FilterOptions>, (StatusCode, String)> {
    repository::filter_options(&s.db, p.category_id).await.map(Json).map_err(error_response)
}

#[derive(Debug, Deserialize)] pub struct StockParams { pub color_id: Option<i64>, pub size_id: Option<i64> }
#[derive(Debug, Serialize)] pub struct StockResponse { pub product_id: i64, pub level: StockLevel, pub available: Option<Quantity> }

async fn product_stock(State(s): State<AppState>, Path(id): Path<i64>, Query(p): Query<StockParams>) -> Result<Json<StockResponse>, (StatusCode, String)> {
    let inventory = repository::load_inventory(&s.db, id).await.map_err(error_response)?;
    let available = match (p.size_id, p.color_id) {
        (None, None) if inventory.shape() != VariantShape::Plain => None,
        (size_id, color_id) => Some(VariantSelection::from_ids(size_id, color_id)
            .and_then(|sel| inventory.available(sel))
            .map_err(|e| error_response(e.into()))?),
    };
    Ok(Json(StockResponse { product_id: inventory.product_id(), level: inventory.stock_level(), available }))
}
