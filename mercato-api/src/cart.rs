use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use mercato_core::repository::AddItemOutcome;
use mercato_order::{Coupon, Order, OrderItem};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LineResponse {
    pub item_id: Uuid,
    pub title: String,
    pub slug: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_price: Option<Decimal>,
    pub line_total: Decimal,
    pub amount_saved: Decimal,
}

impl From<&OrderItem> for LineResponse {
    fn from(line: &OrderItem) -> Self {
        Self {
            item_id: line.item.id,
            title: line.item.title.clone(),
            slug: line.item.slug.clone(),
            quantity: line.quantity,
            unit_price: line.item.price,
            discount_price: line.item.discount_price,
            line_total: line.final_price(),
            amount_saved: line.amount_saved(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderSummaryResponse {
    pub id: Uuid,
    pub items: Vec<LineResponse>,
    pub coupon: Option<Coupon>,
    pub total: Decimal,
}

impl From<&Order> for OrderSummaryResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            items: order.items.iter().map(LineResponse::from).collect(),
            coupon: order.coupon.clone(),
            total: order.total(),
        }
    }
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(order_summary))
        .route("/items/{slug}", post(add_to_cart).delete(remove_from_cart))
        .route("/items/{slug}/decrement", post(decrement_item))
}

/// POST /v1/cart/items/{slug}
///
/// Adds one unit of the item to the caller's cart, creating the cart when
/// none exists. Repeated adds accumulate quantity.
async fn add_to_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = claims.user_id()?;

    let item = state
        .items
        .get_item_by_slug(&slug)
        .await
        .map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("Item not found".to_string()))?;

    let order = match state.orders.active_order(user_id).await.map_err(AppError::from_boxed)? {
        Some(order) => order,
        None => state.orders.create_active_order(user_id).await.map_err(AppError::from_boxed)?,
    };

    let outcome = state.orders.add_item(order.id, user_id, item.id).await.map_err(AppError::from_boxed)?;
    let text = match outcome {
        AddItemOutcome::Incremented => "Item quantity was updated.",
        AddItemOutcome::Added => "This item was added to your cart.",
    };
    tracing::debug!(%user_id, %slug, ?outcome, "cart add");
    Ok(message(text))
}

/// DELETE /v1/cart/items/{slug}
///
/// Detaches the item's line entirely. A missing cart or a line the cart never
/// held are informational outcomes, not errors.
async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = claims.user_id()?;

    let item = state
        .items
        .get_item_by_slug(&slug)
        .await
        .map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("Item not found".to_string()))?;

    let Some(order) = state.orders.active_order(user_id).await.map_err(AppError::from_boxed)? else {
        return Ok(message("You do not have an active order"));
    };
    let Some(line) = order.item_for(item.id) else {
        return Ok(message("This item was not in your cart"));
    };

    state.orders.remove_item(order.id, line.id).await.map_err(AppError::from_boxed)?;
    Ok(message("This item was removed from your cart."))
}

/// POST /v1/cart/items/{slug}/decrement
///
/// Lowers the line quantity by one, detaching the line at quantity one.
async fn decrement_item(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = claims.user_id()?;

    let item = state
        .items
        .get_item_by_slug(&slug)
        .await
        .map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("Item not found".to_string()))?;

    let Some(order) = state.orders.active_order(user_id).await.map_err(AppError::from_boxed)? else {
        return Ok(message("You do not have an active order"));
    };
    let Some(line) = order.item_for(item.id) else {
        return Ok(message("This item was not in your cart"));
    };

    if line.quantity > 1 {
        state
            .orders
            .set_item_quantity(line.id, line.quantity - 1)
            .await.map_err(AppError::from_boxed)?;
    } else {
        state.orders.remove_item(order.id, line.id).await.map_err(AppError::from_boxed)?;
    }
    Ok(message("This item quantity was updated."))
}

/// GET /v1/cart
async fn order_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<OrderSummaryResponse>, AppError> {
    let user_id = claims.user_id()?;

    let order = state
        .orders
        .active_order(user_id)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("You do not have an active order".to_string()))?;
    Ok(Json(OrderSummaryResponse::from(&order)))
}
