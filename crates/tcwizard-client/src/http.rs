//! reqwest-backed implementation of the backend contract

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tcwizard_core::{StatusReport, StatusUpdate};
use tracing::{debug, trace};

use crate::backend::{is_success_status, BackendApi, TransportError};

const STATUS_PATH: &str = "/status";
const FIRMWARE_PROXY_PATH: &str = "/firmware/proxy";

/// HTTP client for the conversion backend
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url` (e.g. "http://10.42.42.1")
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(TransportError::InvalidUrl(base_url.to_string()).into());
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !is_success_status(status) {
            return Err(TransportError::Status(status));
        }
        Ok(response)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn get_status(&self) -> Result<Option<StatusReport>, TransportError> {
        let response = self.send(self.client.get(self.endpoint(STATUS_PATH))).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        // Undecodable bodies degrade to null instead of failing the request
        let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let report = serde_json::from_value::<StatusReport>(value).ok();
        if report.is_none() {
            debug!(len = body.len(), "Status body is not a status report");
        }
        trace!(report = ?report, "Fetched status");
        Ok(report)
    }

    async fn patch_status(&self, update: &StatusUpdate) -> Result<(), TransportError> {
        debug!(state = %update.state, "Requesting backend state");
        self.send(self.client.patch(self.endpoint(STATUS_PATH)).json(update))
            .await?;
        Ok(())
    }

    async fn download_firmware(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        debug!(url = %url, "Downloading firmware through backend proxy");
        let request = self
            .client
            .get(self.endpoint(FIRMWARE_PROXY_PATH))
            .query(&[("url", url)]);
        let response = self.send(request).await?;

        let data = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tcwizard_core::StateParams;

    #[derive(Clone, Default)]
    struct FakeServer {
        status_body: Arc<Mutex<String>>,
        patch_status: Arc<Mutex<u16>>,
        patches: Arc<Mutex<Vec<Value>>>,
    }

    async fn get_status(State(server): State<FakeServer>) -> String {
        server.status_body.lock().unwrap().clone()
    }

    async fn patch_status(State(server): State<FakeServer>, Json(body): Json<Value>) -> StatusCode {
        server.patches.lock().unwrap().push(body);
        StatusCode::from_u16(*server.patch_status.lock().unwrap()).unwrap()
    }

    async fn proxy(Query(query): Query<HashMap<String, String>>) -> (StatusCode, Vec<u8>) {
        match query.get("url") {
            Some(url) if url.contains("missing") => (StatusCode::NOT_FOUND, Vec::new()),
            Some(url) => (StatusCode::OK, url.as_bytes().to_vec()),
            None => (StatusCode::BAD_REQUEST, Vec::new()),
        }
    }

    async fn spawn_server(server: FakeServer) -> HttpBackend {
        *server.patch_status.lock().unwrap() = 200;
        let app = Router::new()
            .route("/status", get(get_status).patch(patch_status))
            .route("/firmware/proxy", get(proxy))
            .with_state(server);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HttpBackend::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(HttpBackend::new("10.42.42.1", Duration::from_secs(1)).is_err());
        let backend = HttpBackend::new("http://10.42.42.1/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url(), "http://10.42.42.1");
        assert_eq!(backend.endpoint("/status"), "http://10.42.42.1/status");
    }

    #[tokio::test]
    async fn test_get_status_decodes_report() {
        let server = FakeServer::default();
        *server.status_body.lock().unwrap() =
            json!({"state": "converted", "params": {"flash_mode": "QIO"}}).to_string();
        let backend = spawn_server(server).await;

        let report = backend.get_status().await.unwrap().unwrap();
        assert_eq!(report.state, "converted");
        assert_eq!(report.params, StateParams::new().with("flash_mode", "QIO"));
    }

    #[tokio::test]
    async fn test_get_status_degrades_bad_body_to_none() {
        let server = FakeServer::default();
        *server.status_body.lock().unwrap() = "<html>oops</html>".to_string();
        let backend = spawn_server(server).await;

        assert_eq!(backend.get_status().await, Ok(None));
    }

    #[tokio::test]
    async fn test_patch_status_sends_body_and_checks_status() {
        let server = FakeServer::default();
        let backend = spawn_server(server.clone()).await;

        let update = StatusUpdate::new("converting", StateParams::new());
        backend.patch_status(&update).await.unwrap();
        assert_eq!(
            server.patches.lock().unwrap().as_slice(),
            &[json!({"state": "converting", "params": {}})]
        );

        *server.patch_status.lock().unwrap() = 500;
        assert_eq!(
            backend.patch_status(&update).await,
            Err(TransportError::Status(500))
        );
    }

    #[tokio::test]
    async fn test_download_firmware_encodes_target_url() {
        let backend = spawn_server(FakeServer::default()).await;

        let target = "http://example.com/fw.bin?channel=stable&arch=esp8266";
        let data = backend.download_firmware(target).await.unwrap();
        assert_eq!(data, target.as_bytes());

        assert_eq!(
            backend.download_firmware("http://example.com/missing.bin").await,
            Err(TransportError::Status(404))
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend =
            HttpBackend::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            backend.get_status().await,
            Err(TransportError::Request(_))
        ));
    }
}
