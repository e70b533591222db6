use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use mercato_order::{Address, AddressKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::OrderSummaryResponse;
use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddressForm {
    pub street_address: String,
    #[serde(default)]
    pub apartment_address: Option<String>,
    pub country: String,
    pub zip: String,
}

impl AddressForm {
    fn is_valid(&self) -> bool {
        !self.street_address.trim().is_empty()
            && !self.country.trim().is_empty()
            && !self.zip.trim().is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ShippingChoice {
    #[serde(default)]
    pub use_default: bool,
    pub address: Option<AddressForm>,
    #[serde(default)]
    pub set_default: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BillingChoice {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default)]
    pub same_as_shipping: bool,
    pub address: Option<AddressForm>,
    #[serde(default)]
    pub set_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping: ShippingChoice,
    pub billing: BillingChoice,
    pub payment_option: String,
}

#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutPrefillResponse {
    pub order: OrderSummaryResponse,
    pub default_shipping: Option<Address>,
    pub default_billing: Option<Address>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub payment_url: String,
}

#[derive(Debug, Serialize)]
pub struct CouponResponse {
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout_prefill).post(submit_checkout))
        .route("/coupon", post(add_coupon))
}

/// GET /v1/checkout
///
/// The active order summary plus the caller's saved default addresses, for
/// form prefill.
async fn checkout_prefill(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<CheckoutPrefillResponse>, AppError> {
    let user_id = claims.user_id()?;

    let order = state
        .orders
        .active_order(user_id)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("You do not have an active order".to_string()))?;

    let default_shipping = state
        .addresses
        .default_address(user_id, AddressKind::Shipping)
        .await.map_err(AppError::from_boxed)?;
    let default_billing = state
        .addresses
        .default_address(user_id, AddressKind::Billing)
        .await.map_err(AppError::from_boxed)?;

    Ok(Json(CheckoutPrefillResponse {
        order: OrderSummaryResponse::from(&order),
        default_shipping,
        default_billing,
    }))
}

/// POST /v1/checkout
///
/// Resolves the shipping address, then the billing address, attaches both to
/// the active order, and dispatches on the chosen payment option.
async fn submit_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let user_id = claims.user_id()?;

    let order = state
        .orders
        .active_order(user_id)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("You do not have an active order".to_string()))?;

    // 1. Shipping address
    let shipping = resolve_shipping(&state, user_id, &request.shipping).await?;

    // 2. Billing address
    let billing = resolve_billing(&state, user_id, &shipping, &request.billing).await?;

    // 3. Attach both to the order
    state
        .orders
        .set_addresses(order.id, shipping.id, billing.id)
        .await.map_err(AppError::from_boxed)?;

    // 4. Dispatch on the payment option
    let payment_url = match request.payment_option.as_str() {
        "stripe" => "/v1/payments/stripe".to_string(),
        "paypal" => "/v1/payments/paypal".to_string(),
        _ => {
            return Err(AppError::ValidationError(
                "Invalid payment option selected".to_string(),
            ))
        }
    };

    Ok(Json(CheckoutResponse {
        message: "Checkout successful".to_string(),
        payment_url,
    }))
}

async fn resolve_shipping(
    state: &AppState,
    user_id: Uuid,
    choice: &ShippingChoice,
) -> Result<Address, AppError> {
    if choice.use_default {
        return state
            .addresses
            .default_address(user_id, AddressKind::Shipping)
            .await.map_err(AppError::from_boxed)?
            .ok_or_else(|| {
                AppError::ValidationError("No default shipping address available".to_string())
            });
    }

    let form = choice.address.as_ref().filter(|f| f.is_valid()).ok_or_else(|| {
        AppError::ValidationError(
            "Please fill in the required shipping address fields".to_string(),
        )
    })?;

    let address = Address::new(
        user_id,
        form.street_address.clone(),
        form.apartment_address.clone(),
        form.country.clone(),
        form.zip.clone(),
        AddressKind::Shipping,
        choice.set_default,
    );
    state.addresses.create_address(&address).await.map_err(AppError::from_boxed)?;
    Ok(address)
}

async fn resolve_billing(
    state: &AppState,
    user_id: Uuid,
    shipping: &Address,
    choice: &BillingChoice,
) -> Result<Address, AppError> {
    if choice.same_as_shipping {
        // A separate record; later edits to one must not leak into the other
        let billing = shipping.retagged(AddressKind::Billing);
        state.addresses.create_address(&billing).await.map_err(AppError::from_boxed)?;
        return Ok(billing);
    }

    if choice.use_default {
        return state
            .addresses
            .default_address(user_id, AddressKind::Billing)
            .await.map_err(AppError::from_boxed)?
            .ok_or_else(|| {
                AppError::ValidationError("No default billing address available".to_string())
            });
    }

    let form = choice.address.as_ref().filter(|f| f.is_valid()).ok_or_else(|| {
        AppError::ValidationError(
            "Please fill in the required billing address fields".to_string(),
        )
    })?;

    let address = Address::new(
        user_id,
        form.street_address.clone(),
        form.apartment_address.clone(),
        form.country.clone(),
        form.zip.clone(),
        AddressKind::Billing,
        choice.set_default,
    );
    state.addresses.create_address(&address).await.map_err(AppError::from_boxed)?;
    Ok(address)
}

/// POST /v1/checkout/coupon
async fn add_coupon(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(request): Json<CouponRequest>,
) -> Result<Json<CouponResponse>, AppError> {
    let user_id = claims.user_id()?;

    let order = state
        .orders
        .active_order(user_id)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("You do not have an active order".to_string()))?;

    let coupon = state
        .coupons
        .get_coupon_by_code(&request.code)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("This coupon does not exist".to_string()))?;

    state.orders.attach_coupon(order.id, coupon.id).await.map_err(AppError::from_boxed)?;
    Ok(Json(CouponResponse {
        message: "Successfully added coupon".to_string(),
    }))
}
