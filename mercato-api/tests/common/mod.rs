#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use mercato_api::middleware::CustomerClaims;
use mercato_api::state::{AppState, AuthConfig};
use mercato_catalog::{Category, Item};
use mercato_core::payment::{MockGateway, MOCK_SIGNATURE};
use mercato_core::repository::ItemRepository;
use mercato_store::MemoryStore;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
}

/// Router over the in-memory store and the deterministic gateway. No Redis,
/// so the rate limiter stays out of the stack.
pub fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway::new());

    let state = AppState {
        items: store.clone(),
        orders: store.clone(),
        addresses: store.clone(),
        coupons: store.clone(),
        payments: store.clone(),
        refunds: store.clone(),
        gateway: gateway.clone(),
        redis: None,
        auth: AuthConfig {
            secret: JWT_SECRET.to_string(),
            expiration: 3600,
        },
        publishable_key: "pk_test_integration".to_string(),
    };

    TestApp {
        router: mercato_api::app(state),
        store,
        gateway,
    }
}

pub fn token_for(user_id: Uuid) -> String {
    let claims = CustomerClaims {
        sub: user_id.to_string(),
        role: "CUSTOMER".to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn request(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Raw webhook delivery with an arbitrary body and signature header
pub async fn deliver_webhook(
    router: &Router,
    body: Vec<u8>,
    signature: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/webhooks/stripe")
        .header("Stripe-Signature", signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub fn completed_session_payload(
    session_id: &str,
    payment_intent: &str,
    amount_total_minor: i64,
    user_id: Uuid,
    order_id: Uuid,
) -> Vec<u8> {
    json!({
        "id": "evt_test",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "payment_intent": payment_intent,
                "amount_total": amount_total_minor,
                "metadata": {
                    "user_id": user_id.to_string(),
                    "order_id": order_id.to_string(),
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

pub fn mock_signature() -> &'static str {
    MOCK_SIGNATURE
}

/// A 20.00 shirt under the slug "tshirt"
pub async fn seed_tshirt(store: &MemoryStore) -> Item {
    let item = Item::new(
        "Basic T-Shirt".to_string(),
        Decimal::new(2000, 2),
        None,
        Category::Shirt,
        None,
        "tshirt".to_string(),
        "A plain cotton t-shirt".to_string(),
    );
    store
        .create_item(&item)
        .await
        .expect("failed to seed item");
    item
}

pub fn new_address_body(payment_option: &str) -> Value {
    json!({
        "shipping": {
            "address": {
                "street_address": "1 Main St",
                "apartment_address": "Apt 2",
                "country": "US",
                "zip": "94110"
            },
            "set_default": true
        },
        "billing": { "same_as_shipping": true },
        "payment_option": payment_option
    })
}
