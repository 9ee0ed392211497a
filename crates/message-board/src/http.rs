use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use message_tree::{Message, MessageId, MessageService, NewMessage, ServiceError, ServiceResult};
use reqwest::header::ACCEPT;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{map_reqwest_error, map_status, ClientError, ClientResult};
use crate::session::{Authenticator, LoginCredentials, RegisterRequest, User};

const HEALTH_ENDPOINT: &str = "/health";
const MESSAGES_ENDPOINT: &str = "/messages";
const LOGIN_ENDPOINT: &str = "/users/login";
const REGISTER_ENDPOINT: &str = "/users/register";

/// Message service backed by the board's REST API
pub struct HttpMessageService {
    config: ClientConfig,
    http_client: HttpClient,
}

impl HttpMessageService {
    /// Create a service for `config`, which must validate
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn backoff(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.config.retry_initial_interval_ms);
        ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..ExponentialBackoff::default()
        }
    }

    /// Send a JSON request and decode the JSON answer.
    ///
    /// Connect failures are retried for every method. Timeouts and 5xx
    /// answers are only retried for GET, since the server may already have
    /// acted on anything else. 4xx answers are never retried.
    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ServiceResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let idempotent = method == Method::GET;
        let max_retries = self.config.max_retry_attempts;
        let attempts = AtomicU32::new(0);

        debug!(%method, %url, "Sending request");

        retry(self.backoff(), || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);

            let mut request = self
                .http_client
                .request(method.clone(), &url)
                .header(ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let outcome = match request.send().await {
                Err(e) => {
                    let transient = e.is_connect() || (idempotent && e.is_timeout());
                    Err((map_reqwest_error(e), transient))
                }
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        response
                            .json::<T>()
                            .await
                            .map_err(|e| (ServiceError::InvalidResponse(e.to_string()), false))
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        Err((map_status(status, text), idempotent && status.is_server_error()))
                    }
                }
            };

            match outcome {
                Ok(value) => Ok(value),
                Err((error, true)) if attempt < max_retries => {
                    warn!(
                        %method,
                        %url,
                        attempt = attempt + 1,
                        error = %error,
                        "Request failed, retrying"
                    );
                    Err(backoff::Error::transient(error))
                }
                Err((error, _)) => Err(backoff::Error::permanent(error)),
            }
        })
        .await
    }

    async fn authenticate<B: Serialize + Sync>(&self, path: &str, body: &B) -> ClientResult<User> {
        match self.send_json::<B, User>(Method::POST, path, Some(body)).await {
            Ok(user) => Ok(user),
            Err(ServiceError::Rejected(detail))
                if detail.starts_with(StatusCode::UNAUTHORIZED.as_str()) =>
            {
                Err(ClientError::Auth("Invalid username/email or password.".to_string()))
            }
            Err(ServiceError::Rejected(detail)) | Err(ServiceError::NotFound(detail)) => {
                Err(ClientError::Auth(detail))
            }
            Err(e) => Err(ClientError::Service(e)),
        }
    }
}

#[async_trait]
impl MessageService for HttpMessageService {
    async fn list_roots(&self) -> ServiceResult<Vec<Message>> {
        let messages: Vec<Message> = self
            .send_json::<(), _>(Method::GET, MESSAGES_ENDPOINT, None)
            .await?;
        debug!(count = messages.len(), "Fetched root messages");
        Ok(messages)
    }

    async fn fetch_replies(&self, id: MessageId) -> ServiceResult<Vec<Message>> {
        let path = format!("{}/{}/replies", MESSAGES_ENDPOINT, id);
        let replies: Vec<Message> = self.send_json::<(), _>(Method::GET, &path, None).await?;
        debug!(%id, count = replies.len(), "Fetched replies");
        Ok(replies)
    }

    async fn create_message(&self, message: &NewMessage) -> ServiceResult<Message> {
        self.send_json(Method::POST, MESSAGES_ENDPOINT, Some(message)).await
    }

    async fn health_check(&self) -> bool {
        let url = self.config.endpoint(HEALTH_ENDPOINT);
        match self.http_client.get(&url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "Health check answered");
                response.status().is_success()
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl Authenticator for HttpMessageService {
    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<User> {
        if !self.health_check().await {
            warn!("Board API may not be running or reachable");
        }
        self.authenticate(LOGIN_ENDPOINT, credentials).await
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<User> {
        self.authenticate(REGISTER_ENDPOINT, request).await
    }
}
