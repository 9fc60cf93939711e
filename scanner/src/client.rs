//! Reqwest-backed client for the gate server's scan endpoints.

use async_trait::async_trait;
use gatepass_core::{OfflineExport, ScanOutcome, SyncRequest, SyncResponse, ValidateRequest};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ScannerConfig;
use crate::error::{Result, ScannerError};

const ACTOR_HEADER: &str = "x-actor-id";

/// The server calls a scanning session depends on.
#[async_trait]
pub trait GateApi: Send + Sync {
    async fn validate(&self, request: &ValidateRequest) -> Result<ScanOutcome>;

    async fn offline_data(&self, event_id: i64) -> Result<OfflineExport>;

    async fn sync(&self, event_id: i64, request: &SyncRequest) -> Result<SyncResponse>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct HttpGateClient {
    client: Client,
    base_url: Url,
    actor_id: i64,
}

impl HttpGateClient {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScannerError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            actor_id: config.actor_id,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ScannerError::Config(format!("cannot build URL for '{path}': {e}")))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .header(ACTOR_HEADER, self.actor_id.to_string())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        decode(status, &body)
    }
}

#[async_trait]
impl GateApi for HttpGateClient {
    async fn validate(&self, request: &ValidateRequest) -> Result<ScanOutcome> {
        let url = self.url("scan/validate")?;
        self.send(self.client.post(url).json(request)).await
    }

    async fn offline_data(&self, event_id: i64) -> Result<OfflineExport> {
        let url = self.url(&format!("scan/{event_id}/offline-data"))?;
        self.send(self.client.get(url)).await
    }

    async fn sync(&self, event_id: i64, request: &SyncRequest) -> Result<SyncResponse> {
        let url = self.url(&format!("scan/{event_id}/sync"))?;
        self.send(self.client.post(url).json(request)).await
    }
}

fn map_transport_error(error: reqwest::Error) -> ScannerError {
    if error.is_timeout() {
        ScannerError::NetworkUnavailable(format!("request timed out: {error}"))
    } else if error.is_connect() || error.is_request() {
        ScannerError::NetworkUnavailable(error.to_string())
    } else {
        ScannerError::Decode(error.to_string())
    }
}

/// Unwraps the server's `{success, data}` envelope.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    // A proxy in front of an unreachable server answers with these.
    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        return Err(ScannerError::NetworkUnavailable(format!(
            "status {}",
            status.as_u16()
        )));
    }

    let envelope: Envelope<T> = serde_json::from_slice(body).map_err(|e| {
        if status.is_success() {
            ScannerError::Decode(e.to_string())
        } else {
            ScannerError::Server {
                status: status.as_u16(),
                message: String::from_utf8_lossy(body).chars().take(160).collect(),
            }
        }
    })?;

    if !status.is_success() || !envelope.success {
        return Err(ScannerError::Server {
            status: status.as_u16(),
            message: envelope
                .error
                .map(|error| error.message)
                .unwrap_or_else(|| "request failed".to_string()),
        });
    }

    envelope
        .data
        .ok_or_else(|| ScannerError::Decode("response carried no data".to_string()))
}
