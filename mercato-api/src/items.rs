use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use mercato_catalog::Item;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

const PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<Item>,
    pub page: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items))
        .route("/{slug}", get(get_item))
}

/// GET /v1/items?page=
async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ItemListResponse>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * PAGE_SIZE;

    let items = state.items.list_items(PAGE_SIZE, offset).await.map_err(AppError::from_boxed)?;
    Ok(Json(ItemListResponse { items, page }))
}

/// GET /v1/items/{slug}
async fn get_item(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Item>, AppError> {
    let item = state
        .items
        .get_item_by_slug(&slug)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("Item not found".to_string()))?;
    Ok(Json(item))
}
