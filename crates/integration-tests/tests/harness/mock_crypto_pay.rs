//! Crypto Pay API mock backed by wiremock

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct MockCryptoPay {
    server: MockServer,
}

impl MockCryptoPay {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Accept `createInvoice`, echoing the payload back under `invoice_id`
    pub async fn accept_create(&self, invoice_id: i64, amount: &str, payload: &str) {
        Mock::given(method("POST"))
            .and(path("/api/createInvoice"))
            .and(header("Crypto-Pay-API-Token", "123:test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": invoice(invoice_id, "active", amount, Some(payload)),
            })))
            .mount(&self.server)
            .await;
    }

    /// Replace what `getInvoices` reports for an invoice
    pub async fn report(&self, invoice_id: i64, status: &str, payload: Option<&str>) {
        self.server.reset().await;

        Mock::given(method("GET"))
            .and(path("/api/getInvoices"))
            .and(query_param("invoice_ids", invoice_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "items": [invoice(invoice_id, status, "1.1", payload)] },
            })))
            .mount(&self.server)
            .await;
    }

    /// Make every call fail with an API error
    pub async fn fail(&self) {
        self.server.reset().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "error": { "code": 500, "name": "INTERNAL_ERROR" },
            })))
            .mount(&self.server)
            .await;
    }

    /// Number of `getInvoices` calls received
    pub async fn check_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api/getInvoices")
            .count()
    }
}

fn invoice(invoice_id: i64, status: &str, amount: &str, payload: Option<&str>) -> Value {
    let mut invoice = json!({
        "invoice_id": invoice_id,
        "hash": format!("IV{invoice_id}"),
        "currency_type": "crypto",
        "asset": "USDT",
        "amount": amount,
        "bot_invoice_url": format!("https://t.me/CryptoTestnetBot?start=IV{invoice_id}"),
        "status": status,
        "created_at": "2025-05-01T10:00:00.000Z",
    });
    if let Some(payload) = payload {
        invoice["payload"] = json!(payload);
    }
    if status == "paid" {
        invoice["paid_at"] = json!("2025-05-01T10:05:00.000Z");
    }
    invoice
}
