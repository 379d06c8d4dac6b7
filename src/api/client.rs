use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::Duration;

use crate::error::{BotError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 30;

type HmacSha256 = Hmac<Sha256>;

/// HTTP client that signs every exchange request.
///
/// The canonical string is `METHOD + path + sorted query + body`; a fresh
/// millisecond timestamp is appended to the query before sorting. The
/// HMAC-SHA256 signature and the API key travel as headers.
///
/// This layer never retries: blanket retry of order-mutating POSTs is not
/// safe, so retry policy lives with the order executor.
#[derive(Clone)]
pub struct SignedClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl SignedClient {
    pub fn new(base_url: String, api_key: String, api_secret: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            api_secret,
        })
    }

    /// Execute a signed request and decode the JSON response.
    ///
    /// Transport errors map to [`BotError::Transport`]; any non-2xx status
    /// maps to [`BotError::Rejection`] carrying the response body.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        query.push((
            "timestamp".to_string(),
            Utc::now().timestamp_millis().to_string(),
        ));

        let body_text = body.map(|b| b.to_string());
        let payload = canonical_payload(&method, path, &query, body_text.as_deref());
        let signature = sign(&self.api_secret, &payload);

        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, &url)
            .query(&query)
            .header("X-API-KEY", &self.api_key)
            .header("X-API-SIGN", signature);

        if let Some(text) = body_text {
            request = request.header(CONTENT_TYPE, "application/json").body(text);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "no response body".to_string());
            return Err(BotError::Rejection {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Build the string covered by the signature
fn canonical_payload(
    method: &Method,
    path: &str,
    query: &[(String, String)],
    body: Option<&str>,
) -> String {
    let mut sorted: Vec<&(String, String)> = query.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let query_text = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}{}{}{}", method.as_str(), path, query_text, body.unwrap_or(""))
}

/// HMAC-SHA256 over the canonical payload, hex-encoded
fn sign(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
