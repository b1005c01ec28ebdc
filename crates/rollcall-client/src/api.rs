//! JSON-over-HTTP access to the recognition server.

use rollcall_core::{
    HistoryResponse, RecognitionResult, RecognizeRequest, StudentsResponse, TodayResponse,
    TrainResponse,
};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url}: server returned HTTP {code}")]
    Status { url: String, code: u16 },
    #[error("{url}: invalid response: {reason}")]
    Decode { url: String, reason: String },
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("request worker exited")]
    WorkerGone,
}

/// The server endpoints the kiosk talks to.
///
/// Every call is a single request/response; nothing is retried.
pub trait AttendanceApi {
    /// `POST /recognize` with a data-URL encoded still.
    fn recognize(
        &self,
        image_data_url: String,
    ) -> impl Future<Output = Result<RecognitionResult, ApiError>>;

    /// `POST /train`, no body.
    fn train(&self) -> impl Future<Output = Result<TrainResponse, ApiError>>;

    /// `GET /students`.
    fn students(&self) -> impl Future<Output = Result<StudentsResponse, ApiError>>;

    /// `GET /attendance/today`.
    fn attendance_today(&self) -> impl Future<Output = Result<TodayResponse, ApiError>>;

    /// `GET /attendance/all`.
    fn attendance_all(&self) -> impl Future<Output = Result<HistoryResponse, ApiError>>;
}

/// Clone-safe blocking HTTP client whose calls run on tokio's blocking pool.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    base_url: Arc<str>,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue one request off the async thread and decode the JSON body.
    async fn exchange<T>(&self, method: &'static str, path: &str, body: Option<String>) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(path);

        tokio::task::spawn_blocking(move || {
            let started = std::time::Instant::now();
            let request = agent.request(method, &url);
            let result = match body {
                Some(body) => request
                    .set("Content-Type", "application/json")
                    .send_string(&body),
                None => request.call(),
            };

            let response = result.map_err(|e| match e {
                ureq::Error::Status(code, _) => ApiError::Status {
                    url: url.clone(),
                    code,
                },
                ureq::Error::Transport(t) => ApiError::Transport {
                    url: url.clone(),
                    reason: t.to_string(),
                },
            })?;

            let text = response.into_string().map_err(|e| ApiError::Transport {
                url: url.clone(),
                reason: format!("failed to read body: {e}"),
            })?;

            tracing::debug!(
                method,
                url = %url,
                bytes = text.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "server responded"
            );

            serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                url,
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|_| ApiError::WorkerGone)?
    }
}

impl AttendanceApi for HttpClient {
    async fn recognize(&self, image_data_url: String) -> Result<RecognitionResult, ApiError> {
        let body = serde_json::to_string(&RecognizeRequest {
            image: image_data_url,
        })?;
        tracing::info!(payload_bytes = body.len(), "submitting still for recognition");
        self.exchange("POST", "/recognize", Some(body)).await
    }

    async fn train(&self) -> Result<TrainResponse, ApiError> {
        tracing::info!("requesting model retrain");
        self.exchange("POST", "/train", None).await
    }

    async fn students(&self) -> Result<StudentsResponse, ApiError> {
        self.exchange("GET", "/students", None).await
    }

    async fn attendance_today(&self) -> Result<TodayResponse, ApiError> {
        self.exchange("GET", "/attendance/today", None).await
    }

    async fn attendance_all(&self) -> Result<HistoryResponse, ApiError> {
        self.exchange("GET", "/attendance/all", None).await
    }
}
