mod common;

use axum::http::{Method, StatusCode};
use common::{new_address_body, request, seed_tshirt, spawn_app, token_for};
use mercato_core::repository::{AddressRepository, CouponRepository, OrderRepository};
use mercato_order::{AddressKind, Coupon};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_checkout_attaches_addresses_and_dispatches() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/v1/checkout",
        Some(&token),
        Some(new_address_body("stripe")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_url"], "/v1/payments/stripe");

    let order = app.store.active_order(user_id).await.unwrap().unwrap();
    let shipping = order.shipping_address.expect("shipping address attached");
    let billing = order.billing_address.expect("billing address attached");
    assert_eq!(shipping.street_address, "1 Main St");
    assert_eq!(billing.street_address, "1 Main St");
    assert_ne!(shipping.id, billing.id);
    assert_eq!(billing.address_type, AddressKind::Billing);

    // set_default saved the shipping address for later checkouts
    let saved = app
        .store
        .default_address(user_id, AddressKind::Shipping)
        .await
        .unwrap()
        .expect("default shipping saved");
    assert_eq!(saved.id, shipping.id);
}

#[tokio::test]
async fn test_checkout_with_default_addresses() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    // First checkout saves both addresses as defaults
    let body = json!({
        "shipping": {
            "address": {
                "street_address": "1 Main St",
                "country": "US",
                "zip": "94110"
            },
            "set_default": true
        },
        "billing": {
            "address": {
                "street_address": "2 Elm St",
                "country": "US",
                "zip": "94111"
            },
            "set_default": true
        },
        "payment_option": "paypal"
    });
    let (status, response) = request(
        &app.router,
        Method::POST,
        "/v1/checkout",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["payment_url"], "/v1/payments/paypal");

    // Second checkout reuses them via use_default
    let body = json!({
        "shipping": { "use_default": true },
        "billing": { "use_default": true },
        "payment_option": "stripe"
    });
    let (status, _) = request(
        &app.router,
        Method::POST,
        "/v1/checkout",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let order = app.store.active_order(user_id).await.unwrap().unwrap();
    assert_eq!(
        order.shipping_address.unwrap().street_address,
        "1 Main St"
    );
    assert_eq!(order.billing_address.unwrap().street_address, "2 Elm St");
}

#[tokio::test]
async fn test_checkout_use_default_without_saved_address_fails() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let token = token_for(Uuid::new_v4());

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    let body = json!({
        "shipping": { "use_default": true },
        "billing": { "same_as_shipping": true },
        "payment_option": "stripe"
    });
    let (status, response) = request(
        &app.router,
        Method::POST,
        "/v1/checkout",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "No default shipping address available");
}

#[tokio::test]
async fn test_checkout_rejects_blank_address_fields() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let token = token_for(Uuid::new_v4());

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    let body = json!({
        "shipping": {
            "address": {
                "street_address": "   ",
                "country": "US",
                "zip": "94110"
            }
        },
        "billing": { "same_as_shipping": true },
        "payment_option": "stripe"
    });
    let (status, response) = request(
        &app.router,
        Method::POST,
        "/v1/checkout",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"],
        "Please fill in the required shipping address fields"
    );
}

#[tokio::test]
async fn test_checkout_rejects_unknown_payment_option() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let token = token_for(Uuid::new_v4());

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    let (status, response) = request(
        &app.router,
        Method::POST,
        "/v1/checkout",
        Some(&token),
        Some(new_address_body("wire-transfer")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Invalid payment option selected");
}

#[tokio::test]
async fn test_unknown_coupon_is_not_found() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let token = token_for(Uuid::new_v4());

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/v1/checkout/coupon",
        Some(&token),
        Some(json!({ "code": "NOPE" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "This coupon does not exist");
}

#[tokio::test]
async fn test_coupon_lowers_total() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let token = token_for(Uuid::new_v4());

    let coupon = Coupon {
        id: Uuid::new_v4(),
        code: "SAVE5".to_string(),
        amount: Decimal::new(500, 2),
    };
    app.store.create_coupon(&coupon).await.unwrap();

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/v1/checkout/coupon",
        Some(&token),
        Some(json!({ "code": "SAVE5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully added coupon");

    let (_, body) = request(&app.router, Method::GET, "/v1/cart", Some(&token), None).await;
    assert_eq!(body["total"], "15.00");
    assert_eq!(body["coupon"]["code"], "SAVE5");
}

#[tokio::test]
async fn test_checkout_prefill_returns_defaults() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);

    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;

    let address = mercato_order::Address::new(
        user_id,
        "1 Main St".to_string(),
        None,
        "US".to_string(),
        "94110".to_string(),
        AddressKind::Shipping,
        true,
    );
    app.store.create_address(&address).await.unwrap();

    let (status, body) =
        request(&app.router, Method::GET, "/v1/checkout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default_shipping"]["street_address"], "1 Main St");
    assert!(body["default_billing"].is_null());
    assert_eq!(body["order"]["items"].as_array().unwrap().len(), 1);
}
