//! Invoice payload and response types.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use bazaar_core::{Email, Money, Quantity};

use crate::models::{Order, User};

/// Unit of measure sent with every invoice line.
pub const LINE_UNIT: &str = "pcs";

/// Request body for `POST /invoices`.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRequest {
    #[serde(rename = "Invoice")]
    pub invoice: Invoice,
}

/// The invoice document.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    /// Always `null`: invoices are addressed by name and email.
    pub contact_id: Option<i64>,
    pub contact_name: String,
    pub contact_email: Email,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub lines: Vec<InvoiceLine>,
    pub notes: String,
}

/// One invoice line.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLine {
    /// Item reference in the invoicing system, if the product has one.
    pub item_id: Option<String>,
    pub quantity: Quantity,
    /// Unit price snapshot from the order.
    pub price: Money,
    /// Product title.
    pub description: String,
    pub unit: &'static str,
}

impl InvoiceRequest {
    /// Build an invoice for a placed order, dated today (UTC).
    #[must_use]
    pub fn from_order(order: &Order, user: &User, store_name: &str) -> Self {
        Self::dated(order, user, store_name, chrono::Utc::now().date_naive())
    }

    /// Build an invoice for a placed order with an explicit issue date.
    ///
    /// The due date equals the issue date.
    #[must_use]
    pub fn dated(order: &Order, user: &User, store_name: &str, date: NaiveDate) -> Self {
        let lines = order
            .items
            .iter()
            .map(|item| InvoiceLine {
                item_id: item.product.invoice_item_ref.clone(),
                quantity: item.quantity,
                price: item.price,
                description: item.product.title.clone(),
                unit: LINE_UNIT,
            })
            .collect();

        Self {
            invoice: Invoice {
                contact_id: None,
                contact_name: user.name.clone(),
                contact_email: user.email.clone(),
                date,
                due_date: date,
                lines,
                notes: format!("Order #{} from {store_name}", order.id),
            },
        }
    }
}

/// Identifier of an invoice created in the external system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRef(String);

impl InvoiceRef {
    /// Extract the identifier from a creation response.
    ///
    /// Looks at `id`, then `invoice_id`. Either may be a string or a number.
    #[must_use]
    pub fn from_response(body: &Value) -> Option<Self> {
        ["id", "invoice_id"]
            .iter()
            .filter_map(|key| body.get(key))
            .find_map(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_owned())),
                Value::Number(n) => Some(Self(n.to_string())),
                _ => None,
            })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for InvoiceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId, UserRole};
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::models::{OrderItem, Product};

    fn order() -> (Order, User) {
        let product = Product {
            id: ProductId::new(3),
            title: "Espresso cup".to_string(),
            description: None,
            price: Money::parse("10.00").unwrap(),
            stock: 4,
            sku: "CUP-1".to_string(),
            images: Vec::new(),
            category_id: None,
            invoice_item_ref: Some("ITEM-77".to_string()),
        };
        let order = Order {
            id: OrderId::new(12),
            user_id: UserId::new(1),
            total_amount: Money::parse("20.00").unwrap(),
            status: OrderStatus::Pending,
            invoice_id: None,
            created_at: Utc::now(),
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                product_id: product.id,
                quantity: Quantity::new(2).unwrap(),
                price: Money::parse("10.00").unwrap(),
                product,
            }],
        };
        let user = User {
            id: UserId::new(1),
            email: Email::parse("ana@shop.test").unwrap(),
            name: "Ana".to_string(),
            role: UserRole::User,
            is_active: true,
            created_at: Utc::now(),
        };
        (order, user)
    }

    #[test]
    fn test_payload_shape() {
        let (order, user) = order();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let body = serde_json::to_value(InvoiceRequest::dated(&order, &user, "Bazaar", date)).unwrap();

        assert_eq!(
            body,
            json!({
                "Invoice": {
                    "contact_id": null,
                    "contact_name": "Ana",
                    "contact_email": "ana@shop.test",
                    "date": "2024-03-09",
                    "due_date": "2024-03-09",
                    "lines": [{
                        "item_id": "ITEM-77",
                        "quantity": 2,
                        "price": "10.00",
                        "description": "Espresso cup",
                        "unit": "pcs"
                    }],
                    "notes": "Order #12 from Bazaar"
                }
            })
        );
    }

    #[test]
    fn test_reference_from_id_or_invoice_id() {
        assert_eq!(
            InvoiceRef::from_response(&json!({"id": 981})).map(InvoiceRef::into_inner),
            Some("981".to_string())
        );
        assert_eq!(
            InvoiceRef::from_response(&json!({"invoice_id": "INV-5"})).map(InvoiceRef::into_inner),
            Some("INV-5".to_string())
        );
        assert_eq!(
            InvoiceRef::from_response(&json!({"id": "", "invoice_id": 7}))
                .map(InvoiceRef::into_inner),
            Some("7".to_string())
        );
    }

    #[test]
    fn test_reference_missing() {
        assert!(InvoiceRef::from_response(&json!({"status": "ok"})).is_none());
        assert!(InvoiceRef::from_response(&json!({"id": null})).is_none());
        assert!(InvoiceRef::from_response(&json!([1, 2])).is_none());
    }
}
