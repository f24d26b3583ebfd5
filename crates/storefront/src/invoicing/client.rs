//! HTTP client for the invoicing API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use super::{InvoiceError, InvoiceRef, InvoiceRequest, InvoicingGateway};
use crate::config::InvoicingConfig;

/// Hard limit for one invoice creation round trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body excerpt kept in errors.
const MAX_ERROR_BODY: usize = 512;

/// Invoicing API client.
#[derive(Clone)]
pub struct HttpInvoicingClient {
    client: Client,
    endpoint: String,
    token: Option<SecretString>,
}

impl std::fmt::Debug for HttpInvoicingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInvoicingClient")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpInvoicingClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &InvoicingConfig) -> Result<Self, InvoiceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let endpoint = format!(
            "{}/invoices",
            config.base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
        })
    }

    /// The URL invoices are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InvoicingGateway for HttpInvoicingClient {
    #[instrument(skip(self, request), fields(lines = request.invoice.lines.len()))]
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<InvoiceRef, InvoiceError> {
        let token = self.token.as_ref().ok_or(InvoiceError::NotConfigured)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvoiceError::Status {
                status: status.as_u16(),
                body: excerpt(body),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InvoiceError::Decode(e.to_string()))?;
        let reference = InvoiceRef::from_response(&body).ok_or(InvoiceError::MissingIdentifier)?;

        debug!(invoice_id = %reference, "Invoice created");
        Ok(reference)
    }
}

fn excerpt(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use bazaar_core::{Email, UserId, UserRole};
    use chrono::Utc;
    use serde_json::{Value, json};

    use super::*;
    use crate::models::{Order, User};

    #[derive(Default)]
    struct Captured {
        authorization: Option<String>,
        body: Option<Value>,
    }

    /// Serve `POST /api/invoices` on an ephemeral port, replying with `reply`.
    async fn fake_api(
        status: StatusCode,
        reply: Value,
    ) -> (InvoicingConfig, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let sink = Arc::clone(&captured);
        let app = Router::new().route(
            "/api/invoices",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                let reply = reply.clone();
                async move {
                    let mut captured = sink.lock().unwrap();
                    captured.authorization = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    captured.body = Some(body);
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let config = InvoicingConfig {
            base_url: format!("http://{addr}/api/").parse().unwrap(),
            token: Some(SecretString::from("test-token")),
        };
        (config, captured)
    }

    fn request() -> InvoiceRequest {
        let order = Order {
            id: bazaar_core::OrderId::new(5),
            user_id: UserId::new(1),
            total_amount: bazaar_core::Money::ZERO,
            status: bazaar_core::OrderStatus::Pending,
            invoice_id: None,
            created_at: Utc::now(),
            items: Vec::new(),
        };
        let user = User {
            id: UserId::new(1),
            email: Email::parse("ana@shop.test").unwrap(),
            name: "Ana".to_string(),
            role: UserRole::User,
            is_active: true,
            created_at: Utc::now(),
        };
        InvoiceRequest::from_order(&order, &user, "Bazaar")
    }

    #[tokio::test]
    async fn test_posts_invoice_with_bearer_token() {
        let (config, captured) = fake_api(StatusCode::OK, json!({"id": 4410})).await;
        let client = HttpInvoicingClient::new(&config).unwrap();

        let reference = client.create_invoice(&request()).await.unwrap();

        assert_eq!(reference.as_str(), "4410");
        let captured = captured.lock().unwrap();
        assert_eq!(captured.authorization.as_deref(), Some("Bearer test-token"));
        let body = captured.body.as_ref().unwrap();
        assert_eq!(body["Invoice"]["notes"], "Order #5 from Bazaar");
        assert_eq!(body["Invoice"]["contact_email"], "ana@shop.test");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (config, _) = fake_api(StatusCode::UNPROCESSABLE_ENTITY, json!({"error": "bad"})).await;
        let client = HttpInvoicingClient::new(&config).unwrap();

        let err = client.create_invoice(&request()).await.unwrap_err();

        assert!(matches!(err, InvoiceError::Status { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_success_without_identifier_is_an_error() {
        let (config, _) = fake_api(StatusCode::CREATED, json!({"result": "ok"})).await;
        let client = HttpInvoicingClient::new(&config).unwrap();

        let err = client.create_invoice(&request()).await.unwrap_err();

        assert!(matches!(err, InvoiceError::MissingIdentifier));
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_any_request() {
        let (mut config, captured) = fake_api(StatusCode::OK, json!({"id": 1})).await;
        config.token = None;
        let client = HttpInvoicingClient::new(&config).unwrap();

        let err = client.create_invoice(&request()).await.unwrap_err();

        assert!(matches!(err, InvoiceError::NotConfigured));
        assert!(captured.lock().unwrap().body.is_none());
    }

    #[test]
    fn test_endpoint_joins_base_path() {
        let config = InvoicingConfig {
            base_url: "https://app.daftra.com/api2".parse().unwrap(),
            token: None,
        };
        let client = HttpInvoicingClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "https://app.daftra.com/api2/invoices");
        assert!(!format!("{client:?}").contains("test-token"));
    }
}
