mod common;

use axum::http::{Method, StatusCode};
use common::{request, seed_tshirt, spawn_app, token_for};
use uuid::Uuid;

#[tokio::test]
async fn test_add_twice_accumulates_quantity() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "This item was added to your cart.");

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item quantity was updated.");

    let (status, body) = request(&app.router, Method::GET, "/v1/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["quantity"], 2);
    assert_eq!(body["total"], "40.00");
}

#[tokio::test]
async fn test_concurrent_adds_share_one_order() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);

    let add = || request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    );
    let (a, b, c, d, e) = tokio::join!(add(), add(), add(), add(), add());
    for (status, _) in [a, b, c, d, e] {
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.store.active_order_count(user_id).await, 1);

    let (_, body) = request(&app.router, Method::GET, "/v1/cart", Some(&token), None).await;
    assert_eq!(body["items"][0]["quantity"], 5);
}

#[tokio::test]
async fn test_decrement_lowers_quantity_then_detaches() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let token = token_for(Uuid::new_v4());

    for _ in 0..2 {
        request(
            &app.router,
            Method::POST,
            "/v1/cart/items/tshirt",
            Some(&token),
            None,
        )
        .await;
    }

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt/decrement",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "This item quantity was updated.");

    let (_, body) = request(&app.router, Method::GET, "/v1/cart", Some(&token), None).await;
    assert_eq!(body["items"][0]["quantity"], 1);

    // At quantity one the decrement detaches the line
    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt/decrement",
        Some(&token),
        None,
    )
    .await;

    let (_, body) = request(&app.router, Method::GET, "/v1/cart", Some(&token), None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], "0");
}

#[tokio::test]
async fn test_remove_detaches_line() {
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
        Method::DELETE,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "This item was removed from your cart.");

    let (_, body) = request(&app.router, Method::GET, "/v1/cart", Some(&token), None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_remove_without_active_order_is_informational() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);

    let (status, body) = request(
        &app.router,
        Method::DELETE,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You do not have an active order");
    assert_eq!(app.store.active_order_count(user_id).await, 0);
}

#[tokio::test]
async fn test_remove_item_not_in_cart_is_informational() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;
    let token = token_for(Uuid::new_v4());

    // An active order without the item
    let other = mercato_catalog::Item::new(
        "Vintage Jacket".to_string(),
        rust_decimal::Decimal::new(9000, 2),
        None,
        mercato_catalog::Category::Outerwear,
        None,
        "jacket".to_string(),
        "A vintage jacket".to_string(),
    );
    use mercato_core::repository::ItemRepository;
    app.store.create_item(&other).await.unwrap();
    request(
        &app.router,
        Method::POST,
        "/v1/cart/items/jacket",
        Some(&token),
        None,
    )
    .await;

    let (status, body) = request(
        &app.router,
        Method::DELETE,
        "/v1/cart/items/tshirt",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "This item was not in your cart");
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let app = spawn_app();
    let token = token_for(Uuid::new_v4());

    let (status, body) = request(
        &app.router,
        Method::POST,
        "/v1/cart/items/no-such-item",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Item not found");
}

#[tokio::test]
async fn test_cart_requires_token() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;

    let (status, _) = request(&app.router, Method::GET, "/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app.router,
        Method::POST,
        "/v1/cart/items/tshirt",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_is_public() {
    let app = spawn_app();
    seed_tshirt(&app.store).await;

    let (status, body) = request(&app.router, Method::GET, "/v1/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, body) =
        request(&app.router, Method::GET, "/v1/items/tshirt", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "tshirt");

    let (status, _) =
        request(&app.router, Method::GET, "/v1/items/no-such-item", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
