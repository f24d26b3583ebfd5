//! End-to-end checkout tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use bazaar_integration_tests::{STORE_NAME, StubGateway, TestContext};

#[tokio::test]
async fn test_checkout_worked_example() {
    let ctx = TestContext::new();
    let token = ctx.shopper("ana@shop.test").await;
    let a = ctx.product("A", "10.00", 5).await;
    let b = ctx.product("B", "5.00", 5).await;
    ctx.add_to_cart(&token, &a, 2).await;
    ctx.add_to_cart(&token, &b, 1).await;

    let (status, order) = ctx.post("/checkout", Some(&token), json!({})).await;

    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["total_amount"], "25.00");
    assert_eq!(order["status"], "completed");
    assert_eq!(order["invoice_id"], StubGateway::INVOICE_ID);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][0]["price"], "10.00");
    assert_eq!(order["items"][0]["quantity"], 2);

    assert_eq!(ctx.stock(&a).await, 3);
    assert_eq!(ctx.stock(&b).await, 4);

    let (_, cart) = ctx.get("/cart", Some(&token)).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let requests = ctx.gateway.requests();
    assert_eq!(requests.len(), 1);
    let invoice = serde_json::to_value(&requests[0]).unwrap();
    assert_eq!(invoice["Invoice"]["contact_email"], "ana@shop.test");
    assert_eq!(
        invoice["Invoice"]["notes"],
        format!("Order #{} from {STORE_NAME}", order["id"])
    );
    assert_eq!(invoice["Invoice"]["lines"][0]["item_id"], "ITEM-A");
    assert_eq!(invoice["Invoice"]["lines"][0]["unit"], "pcs");
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let ctx = TestContext::new();
    let token = ctx.shopper("ana@shop.test").await;

    let (status, body) = ctx.post("/checkout", Some(&token), json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cart is empty");
    let (_, orders) = ctx.get("/orders", Some(&token)).await;
    assert!(orders.as_array().unwrap().is_empty());
    assert!(ctx.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_shortfall_changes_nothing() {
    let ctx = TestContext::new();
    let admin = ctx.admin("ops@shop.test").await;
    let token = ctx.shopper("ana@shop.test").await;
    let plenty = ctx.product("A", "3.00", 10).await;
    let scarce = ctx.product("B", "7.00", 2).await;
    ctx.add_to_cart(&token, &plenty, 4).await;
    ctx.add_to_cart(&token, &scarce, 2).await;

    // Stock drops after the item went into the cart
    let (status, _) = ctx
        .put(
            &format!("/products/{}", scarce.id),
            Some(&admin),
            json!({ "stock": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.post("/checkout", Some(&token), json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient stock for Product B");
    assert_eq!(ctx.stock(&plenty).await, 10);
    assert_eq!(ctx.stock(&scarce).await, 1);
    let (_, cart) = ctx.get("/cart", Some(&token)).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    let (_, orders) = ctx.get("/orders", Some(&token)).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_gateway_failure_still_completes_order() {
    let ctx = TestContext::new();
    ctx.gateway.fail();
    let token = ctx.shopper("ana@shop.test").await;
    let lamp = ctx.product("LAMP", "40.00", 3).await;
    ctx.add_to_cart(&token, &lamp, 1).await;

    let (status, order) = ctx.post("/checkout", Some(&token), json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "completed");
    assert!(order["invoice_id"].is_null());
    assert_eq!(ctx.stock(&lamp).await, 2);
    assert_eq!(ctx.gateway.requests().len(), 1);

    let (_, stored) = ctx
        .get(&format!("/orders/{}", order["id"]), Some(&token))
        .await;
    assert_eq!(stored["status"], "completed");
    assert!(stored["invoice_id"].is_null());
}

#[tokio::test]
async fn test_total_survives_price_change() {
    let ctx = TestContext::new();
    let admin = ctx.admin("ops@shop.test").await;
    let token = ctx.shopper("ana@shop.test").await;
    let kettle = ctx.product("KETTLE", "30.00", 5).await;
    ctx.add_to_cart(&token, &kettle, 2).await;
    let (_, order) = ctx.post("/checkout", Some(&token), json!({})).await;

    ctx.put(
        &format!("/products/{}", kettle.id),
        Some(&admin),
        json!({ "price": "99.99" }),
    )
    .await;

    let (_, stored) = ctx
        .get(&format!("/orders/{}", order["id"]), Some(&token))
        .await;
    assert_eq!(stored["total_amount"], "60.00");
    assert_eq!(stored["items"][0]["price"], "30.00");
    assert_eq!(stored["items"][0]["product"]["price"], "99.99");
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let ctx = TestContext::new();
    let last_one = ctx.product("LAST", "5.00", 1).await;
    let ana = ctx.shopper("ana@shop.test").await;
    let ben = ctx.shopper("ben@shop.test").await;
    ctx.add_to_cart(&ana, &last_one, 1).await;
    ctx.add_to_cart(&ben, &last_one, 1).await;

    let (first, second) = tokio::join!(
        ctx.post("/checkout", Some(&ana), json!({})),
        ctx.post("/checkout", Some(&ben), json!({})),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
    assert_eq!(ctx.stock(&last_one).await, 0);
}

#[tokio::test]
async fn test_checkout_requires_auth() {
    let ctx = TestContext::new();
    let (status, _) = ctx.post("/checkout", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
