//! HTTP client for the reclassification API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, field, instrument, Span};
use uuid::Uuid;

use medcal_core::{
    defaults, logging, ClassifyEventRequest, ClassifyEventResponse, Error, Job, JobStatusResponse,
    JobStatusSource, ReclassifyFilter, Result, SubmitJobResponse,
};

/// Error body returned by the API: `{"error": message}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client with built-in retry and timeout support.
///
/// Connect errors, timeouts, and 5xx responses are retried with exponential
/// backoff (`base * 2^(retry - 1)`) up to `max_attempts` total attempts.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    base_url: String,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a client for the API at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Execute the provided request builder with retry semantics.
    #[instrument(skip_all, fields(subsystem = "poller", component = "http_client", attempt = field::Empty))]
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            Span::current().record(logging::ATTEMPT, attempt + 1);
            let request = builder
                .try_clone()
                .ok_or_else(|| Error::Internal("request body cannot be cloned".into()))?
                .build()?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(%method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(%method, %url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    debug!(%method, %url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }

        Err(Error::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1u32 << shift)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// `POST /api/calendar/reclassify`
    pub async fn submit_reclassify_job(
        &self,
        filter: &ReclassifyFilter,
    ) -> Result<SubmitJobResponse> {
        let builder = self
            .request(Method::POST, "/api/calendar/reclassify")
            .json(filter);
        decode(self.send(builder).await?).await
    }

    /// `GET /api/calendar/reclassify/jobs/{jobId}`
    pub async fn job_status(&self, job_id: Uuid) -> Result<Job> {
        let path = format!("/api/calendar/reclassify/jobs/{job_id}");
        let response = self.send(self.request(Method::GET, &path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::JobNotFound(job_id));
        }
        let body: JobStatusResponse = decode(response).await?;
        Ok(body.job)
    }

    /// `POST /api/calendar/classify`
    pub async fn classify_single_event(
        &self,
        request: &ClassifyEventRequest,
    ) -> Result<ClassifyEventResponse> {
        let builder = self
            .request(Method::POST, "/api/calendar/classify")
            .json(request);
        let response = self.send(builder).await?;
        if response.status() == StatusCode::NOT_FOUND {
            let message = error_message(response).await;
            return Err(Error::EventNotFound(message));
        }
        decode(response).await
    }
}

#[async_trait]
impl JobStatusSource for HttpClient {
    async fn job_status(&self, job_id: Uuid) -> Result<Job> {
        HttpClient::job_status(self, job_id).await
    }
}

/// Decode a success body, or map an error status to the matching error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let message = error_message(response).await;
    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(message),
        _ => Error::Request(format!("{status}: {message}")),
    })
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) => serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text),
        Err(_) => status.to_string(),
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_connect()
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    base_url: String,
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl HttpClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(defaults::HTTP_TIMEOUT_SECS),
            max_attempts: defaults::HTTP_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(defaults::HTTP_BASE_BACKOFF_MS),
            user_agent: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        Ok(HttpClient {
            client: builder.build()?,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use medcal_core::{JobStatus, JobType, OverrideEntry};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> HttpClient {
        HttpClient::builder(server.uri())
            .base_backoff(Duration::from_millis(10))
            .max_attempts(3)
            .build()
            .expect("http client")
    }

    fn job_json(job_id: Uuid, status: &str) -> serde_json::Value {
        json!({
            "job": {
                "id": job_id,
                "type": "reclassify",
                "status": status,
                "progress": 1,
                "total": 4,
                "result": {"reclassified": 1, "fieldCounts": {"category": 1}},
                "createdAt": "2026-10-01T12:00:00Z"
            }
        })
    }

    #[tokio::test]
    async fn test_fetches_job_status() {
        let server = MockServer::start().await;
        let job_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path(format!("/api/calendar/reclassify/jobs/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json(job_id, "running")))
            .expect(1)
            .mount(&server)
            .await;

        let job = client(&server).job_status(job_id).await.expect("job");
        assert_eq!(job.id, job_id);
        assert_eq!(job.job_type, JobType::Reclassify);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress_percent(), 25);
    }

    #[tokio::test]
    async fn test_retries_server_errors_until_success() {
        let server = MockServer::start().await;
        let job_id = Uuid::new_v4();
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        let body = job_json(job_id, "completed");
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(body.clone())
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let job = client(&server).job_status(job_id).await.expect("job");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).job_status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Request(msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_retried() {
        let server = MockServer::start().await;
        let job_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).job_status(job_id).await.unwrap_err();
        assert!(matches!(err, Error::JobNotFound(id) if id == job_id));
    }

    #[tokio::test]
    async fn test_submits_filter() {
        let server = MockServer::start().await;
        let job_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/api/calendar/reclassify"))
            .and(body_partial_json(json!({"missingDosage": true, "filterMode": "AND"})))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(json!({"jobId": job_id, "totalEvents": 7})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let filter = ReclassifyFilter {
            missing_dosage: true,
            filter_mode: medcal_core::FilterMode::And,
            ..Default::default()
        };
        let submitted = client(&server).submit_reclassify_job(&filter).await.unwrap();
        assert_eq!(submitted.job_id, job_id);
        assert_eq!(submitted.total_events, 7);
    }

    #[tokio::test]
    async fn test_classify_maps_validation_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/calendar/classify"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": "Validation error: category exceeds 200 characters"})),
            )
            .mount(&server)
            .await;

        let request = ClassifyEventRequest {
            calendar_id: "clinic".into(),
            event_id: "evt".into(),
            entry: OverrideEntry::default(),
        };
        let err = client(&server).classify_single_event(&request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("category")));
    }

    #[tokio::test]
    async fn test_retries_on_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED

        let client = HttpClient::builder(format!("http://{addr}"))
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("http client");

        let err = client.job_status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Request(_)));
    }
}
