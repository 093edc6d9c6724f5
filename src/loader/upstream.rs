use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT};
use serde_json::Value;

use super::error::{FetchFailure, LoaderError};
use crate::constants::USER_AGENT;

/// Thin GET-JSON client for the bundle API.
#[derive(Clone)]
pub struct BundleClient {
    client: reqwest::Client,
    request_timeout: Option<Duration>,
}

impl BundleClient {
    pub fn new(request_timeout_seconds: u64) -> Result<Self, LoaderError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            // Avoid hanging forever on broken TCP handshakes.
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LoaderError::Configuration(format!("http client: {e}")))?;
        let request_timeout =
            (request_timeout_seconds > 0).then(|| Duration::from_secs(request_timeout_seconds));
        Ok(Self {
            client,
            request_timeout,
        })
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, FetchFailure> {
        let mut req = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(t) = self.request_timeout {
            req = req.timeout(t);
        }
        let r = req.send().await?;

        let status = r.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }
        let bytes = r.bytes().await?;
        serde_json::from_slice::<Value>(&bytes).map_err(|e| FetchFailure::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn decodes_json_bodies() {
        let base = serve(Router::new().route(
            "/ok",
            get(|| async { axum::Json(serde_json::json!({ "rumBundles": [] })) }),
        ))
        .await;
        let client = BundleClient::new(5).unwrap();
        let v = client.get_json(&format!("{base}/ok")).await.unwrap();
        assert!(v["rumBundles"].is_array());
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let base = serve(Router::new().route(
            "/missing",
            get(|| async { (axum::http::StatusCode::FORBIDDEN, "nope") }),
        ))
        .await;
        let client = BundleClient::new(0).unwrap();
        let err = client
            .get_json(&format!("{base}/missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchFailure::Status(403)), "{err}");
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_failure() {
        let base = serve(Router::new().route("/html", get(|| async { "<html>" }))).await;
        let client = BundleClient::new(0).unwrap();
        let err = client.get_json(&format!("{base}/html")).await.unwrap_err();
        assert!(matches!(err, FetchFailure::Decode(_)), "{err}");
    }
}
