//! End-to-end catalog and health tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use bazaar_integration_tests::{STORE_NAME, TestContext};

#[tokio::test]
async fn test_banner_and_health() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("{STORE_NAME} API is running"));

    let (status, body) = ctx.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = ctx.get("/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_listing_filters_and_pagination() {
    let ctx = TestContext::new();
    let mugs = ctx.category("Mugs").await;
    ctx.product_in("M1", "5.00", 1, Some(mugs)).await;
    ctx.product_in("M2", "5.00", 1, Some(mugs)).await;
    ctx.product("T1", "5.00", 1).await;

    let (_, all) = ctx.get("/products", None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, in_category) = ctx
        .get(&format!("/products?category_id={mugs}"), None)
        .await;
    assert_eq!(in_category.as_array().unwrap().len(), 2);

    let (_, searched) = ctx.get("/products?search=product%20t", None).await;
    assert_eq!(searched.as_array().unwrap().len(), 1);
    assert_eq!(searched[0]["sku"], "T1");

    let (_, page) = ctx.get("/products?skip=1&limit=1", None).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["sku"], "M2");
}

#[tokio::test]
async fn test_product_details_and_related() {
    let ctx = TestContext::new();
    let mugs = ctx.category("Mugs").await;
    let first = ctx.product_in("M0", "5.00", 1, Some(mugs)).await;
    for i in 1..=5 {
        ctx.product_in(&format!("M{i}"), "5.00", 1, Some(mugs)).await;
    }
    let loner = ctx.product("SOLO", "5.00", 1).await;

    let (status, detail) = ctx
        .get(&format!("/productdetails/{}", first.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["price"], "5.00");

    let (_, related) = ctx
        .get(&format!("/productdetails/{}/related", first.id), None)
        .await;
    let related = related.as_array().unwrap();
    assert_eq!(related.len(), 4);
    assert!(related.iter().all(|p| p["id"] != json!(first.id)));

    let (_, none) = ctx
        .get(&format!("/productdetails/{}/related", loner.id), None)
        .await;
    assert!(none.as_array().unwrap().is_empty());

    let (status, _) = ctx.get("/productdetails/9999/related", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_management_is_admin_only() {
    let ctx = TestContext::new();
    let shopper = ctx.shopper("ana@shop.test").await;
    let admin = ctx.admin("ops@shop.test").await;
    let product = json!({ "title": "Teapot", "price": "20.00", "stock": 3, "sku": "TEA" });

    let (status, _) = ctx.post("/products", None, product.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = ctx.post("/products", Some(&shopper), product.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = ctx.post("/products", Some(&admin), product.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["stock"], 3);

    let (status, _) = ctx.post("/products", Some(&admin), product).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, category) = ctx
        .post("/categories", Some(&admin), json!({ "name": "Tea" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = ctx
        .post("/categories", Some(&admin), json!({ "name": "Tea" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, fetched) = ctx
        .get(&format!("/categories/{}", category["id"]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Tea");
    let (_, categories) = ctx.get("/categories", None).await;
    assert_eq!(categories.as_array().unwrap().len(), 1);

    let (status, _) = ctx
        .put(
            &format!("/products/{}", created["id"]),
            Some(&admin),
            json!({ "category_id": category["id"], "stock": -1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_prices_must_fit_the_price_column() {
    let ctx = TestContext::new();
    let admin = ctx.admin("ops@shop.test").await;

    for price in ["79228162514264337593543950335", "10000000000.00", "1.999"] {
        let (status, body) = ctx
            .post(
                "/products",
                Some(&admin),
                json!({ "title": "Bar", "price": price, "stock": 1, "sku": "BAR" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{price}: {body}");
    }

    let existing = ctx.product("KEEP", "4.00", 1).await;
    let (status, _) = ctx
        .put(
            &format!("/products/{}", existing.id),
            Some(&admin),
            json!({ "price": "79228162514264337593543950335" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = ctx
        .post(
            "/products",
            Some(&admin),
            json!({ "title": "Bar", "price": "9999999999.99", "stock": 1, "sku": "BAR" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["price"], "9999999999.99");
}
