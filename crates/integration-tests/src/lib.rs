//! Integration test harness for the Bazaar storefront.
//!
//! [`TestContext`] builds the full router (all routes plus the shared
//! middleware stack) over a [`MemoryStore`] and a [`StubGateway`], and drives
//! it in-process with `tower::ServiceExt::oneshot`. No database or network is
//! needed.
//!
//! ```rust,ignore
//! let ctx = TestContext::new();
//! let token = ctx.shopper("ana@shop.test").await;
//! let (status, body) = ctx.get("/cart", Some(&token)).await;
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use bazaar_core::{CategoryId, Money, UserRole};
use bazaar_storefront::config::{AuthConfig, InvoicingConfig, SentryConfig, StorefrontConfig};
use bazaar_storefront::db::{CatalogStore, MemoryStore, UserStore};
use bazaar_storefront::invoicing::{InvoiceError, InvoiceRef, InvoiceRequest, InvoicingGateway};
use bazaar_storefront::models::{NewCategory, NewProduct, Product};
use bazaar_storefront::routes;
use bazaar_storefront::services::auth::new_account;
use bazaar_storefront::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "correct horse battery";

/// Store name configured for tests.
pub const STORE_NAME: &str = "Test Bazaar";

/// Invoicing gateway double.
///
/// Answers with a fixed invoice id until [`StubGateway::fail`] is called, and
/// records every request it receives.
#[derive(Debug, Default)]
pub struct StubGateway {
    failing: Mutex<bool>,
    requests: Mutex<Vec<InvoiceRequest>>,
}

impl StubGateway {
    /// Invoice id returned on success.
    pub const INVOICE_ID: &'static str = "INV-1001";

    /// Make every following call fail with a 503.
    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<InvoiceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoicingGateway for StubGateway {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<InvoiceRef, InvoiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if *self.failing.lock().unwrap() {
            return Err(InvoiceError::Status {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        InvoiceRef::from_response(&serde_json::json!({ "id": Self::INVOICE_ID }))
            .ok_or(InvoiceError::MissingIdentifier)
    }
}

/// A router over in-memory state.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<StubGateway>,
    router: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(StubGateway::default());
        let state = AppState::new(test_config(), store.clone(), gateway.clone());
        let router = bazaar_storefront::app(routes::routes(), state);

        Self {
            store,
            gateway,
            router,
        }
    }

    /// Send a request and return the status and JSON body (`Null` if empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Unauthenticated GET returning the raw response, for header checks.
    pub async fn raw_get(&self, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Log in and return the bearer token.
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/login",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Register a shopper through the API and return a bearer token.
    pub async fn shopper(&self, email: &str) -> String {
        let name = email.split('@').next().unwrap_or(email);
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                serde_json::json!({ "email": email, "name": name, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        self.login(email).await
    }

    /// Create an admin directly in the store and return a bearer token.
    pub async fn admin(&self, email: &str) -> String {
        let account = new_account(email, "Admin", PASSWORD, UserRole::Admin).unwrap();
        self.store.create_user(account).await.unwrap();
        self.login(email).await
    }

    /// Insert a product directly.
    pub async fn product(&self, sku: &str, price: &str, stock: i32) -> Product {
        self.product_in(sku, price, stock, None).await
    }

    /// Insert a product in a category directly.
    pub async fn product_in(
        &self,
        sku: &str,
        price: &str,
        stock: i32,
        category_id: Option<CategoryId>,
    ) -> Product {
        self.store
            .create_product(NewProduct {
                title: format!("Product {sku}"),
                description: None,
                price: Money::parse(price).unwrap(),
                stock,
                sku: sku.to_string(),
                images: Vec::new(),
                category_id,
                invoice_item_ref: Some(format!("ITEM-{sku}")),
            })
            .await
            .unwrap()
    }

    /// Insert a category directly.
    pub async fn category(&self, name: &str) -> CategoryId {
        self.store
            .create_category(NewCategory {
                name: name.to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id
    }

    /// Current stock of a product.
    pub async fn stock(&self, product: &Product) -> i64 {
        let (_, body) = self.get(&format!("/products/{}", product.id), None).await;
        body["stock"].as_i64().unwrap()
    }

    /// Add a product to the caller's cart, asserting success.
    pub async fn add_to_cart(&self, token: &str, product: &Product, quantity: i32) -> Value {
        let (status, body) = self
            .post(
                "/cart/items",
                Some(token),
                serde_json::json!({ "product_id": product.id, "quantity": quantity }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add to cart failed: {body}");
        body
    }
}

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        auth: AuthConfig {
            jwt_secret: SecretString::from("Zq8#mV2!pL9$wX4&rT7^nB1*kD6%hF3@"),
            token_ttl: Duration::from_secs(30 * 60),
        },
        store_name: STORE_NAME.to_string(),
        invoicing: InvoicingConfig {
            base_url: url::Url::parse("http://127.0.0.1:9/api2").unwrap(),
            token: None,
        },
        sentry: SentryConfig::default(),
    }
}
