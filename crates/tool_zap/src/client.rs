//! Minimal client for the ZAP JSON API

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::ZapError;

pub const DEFAULT_ZAP_API: &str = "http://localhost:8080";

const SPIDER_SCAN: &str = "/JSON/spider/action/scan/";
const SPIDER_STATUS: &str = "/JSON/spider/view/status/";
const SPIDER_RESULTS: &str = "/JSON/spider/view/results/";
const ASCAN_SCAN: &str = "/JSON/ascan/action/scan/";
const ASCAN_STATUS: &str = "/JSON/ascan/view/status/";
const CORE_ALERTS: &str = "/JSON/core/view/alerts/";

/// Children the spider may follow per node.
const SPIDER_MAX_CHILDREN: &str = "10";

/// Cheap to clone; the underlying reqwest pool is shared.
#[derive(Debug, Clone)]
pub struct ZapClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ZapClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ZapError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Send `apikey` with every request (ZAP instances with the API key enabled).
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, ZapError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self.http.get(&url).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("ZAP API error: {} - {}", status, body);
            return Err(ZapError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn spider_scan(&self, target: &str) -> Result<String, ZapError> {
        let body = self
            .get_json(SPIDER_SCAN, &[("url", target), ("maxChildren", SPIDER_MAX_CHILDREN)])
            .await?;
        scalar(&body, "scan")
    }

    pub async fn spider_status(&self, scan_id: &str) -> Result<u8, ZapError> {
        let body = self.get_json(SPIDER_STATUS, &[("scanId", scan_id)]).await?;
        percent(&body)
    }

    pub async fn spider_results(&self, scan_id: &str) -> Result<Vec<Value>, ZapError> {
        let body = self.get_json(SPIDER_RESULTS, &[("scanId", scan_id)]).await?;
        Ok(list(body, "results"))
    }

    pub async fn active_scan(&self, target: &str) -> Result<String, ZapError> {
        let body = self.get_json(ASCAN_SCAN, &[("url", target)]).await?;
        scalar(&body, "scan")
    }

    pub async fn active_status(&self, scan_id: &str) -> Result<u8, ZapError> {
        let body = self.get_json(ASCAN_STATUS, &[("scanId", scan_id)]).await?;
        percent(&body)
    }

    /// Alerts recorded for everything under `base_url`.
    pub async fn alerts(&self, base_url: &str) -> Result<Vec<Value>, ZapError> {
        let body = self.get_json(CORE_ALERTS, &[("baseurl", base_url)]).await?;
        Ok(list(body, "alerts"))
    }
}

/// ZAP encodes ids and percentages as strings; accept numbers too.
fn scalar(body: &Value, key: &str) -> Result<String, ZapError> {
    match body.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ZapError::Malformed(format!("missing `{}` in {}", key, body))),
    }
}

fn percent(body: &Value) -> Result<u8, ZapError> {
    let raw = scalar(body, "status")?;
    raw.trim()
        .parse::<u16>()
        .map(|p| p.min(100) as u8)
        .map_err(|_| ZapError::Malformed(format!("status is not a percentage: {}", raw)))
}

fn list(body: Value, key: &str) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn scalar_accepts_strings_and_numbers() {
        assert_eq!(scalar(&json!({"scan": "3"}), "scan").unwrap(), "3");
        assert_eq!(scalar(&json!({"scan": 3}), "scan").unwrap(), "3");
        assert!(scalar(&json!({}), "scan").is_err());
        assert_eq!(percent(&json!({"status": "100"})).unwrap(), 100);
        assert!(percent(&json!({"status": "done"})).is_err());
    }

    #[test]
    fn missing_lists_are_empty() {
        assert!(list(json!({}), "results").is_empty());
        assert!(list(json!({"results": null}), "results").is_empty());
        assert_eq!(list(json!({"results": ["a", "b"]}), "results").len(), 2);
    }

    #[tokio::test]
    async fn spider_start_sends_target_and_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SPIDER_SCAN))
            .and(query_param("url", "https://example.com"))
            .and(query_param("maxChildren", "10"))
            .and(query_param("apikey", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scan": "7"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ZapClient::new(server.uri()).unwrap().with_api_key("secret");
        assert_eq!(client.spider_scan("https://example.com").await.unwrap(), "7");
    }

    #[tokio::test]
    async fn api_errors_carry_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ASCAN_STATUS))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad scan id"))
            .mount(&server)
            .await;

        let client = ZapClient::new(format!("{}/", server.uri())).unwrap();
        match client.active_status("99").await {
            Err(ZapError::Api { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad scan id");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn alerts_use_baseurl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CORE_ALERTS))
            .and(query_param("baseurl", "https://example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "alerts": [{"alert": "Missing Anti-clickjacking Header", "risk": "Medium"}]
            })))
            .mount(&server)
            .await;

        let client = ZapClient::new(server.uri()).unwrap();
        let alerts = client.alerts("https://example.com").await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["risk"], "Medium");
    }
}
