use crate::config::ClientConfig;
use crate::http::HttpMessageService;
use mockito::ServerGuard;

mod http_service_tests;

pub(crate) const ROOTS_BODY: &str = r#"[
    {"id": 2, "content": "second topic", "username": "bob",
     "createdAt": "2025-05-01T10:05:00Z", "lastModifiedAt": "2025-05-01T10:05:00Z",
     "repliedToId": null, "replies": null, "replyCount": 0},
    {"id": 1, "content": "first topic", "username": "alice",
     "createdAt": "2025-05-01T10:00:00Z", "lastModifiedAt": "2025-05-01T10:00:00Z",
     "repliedToId": null, "replyCount": 1,
     "replies": [
        {"id": 3, "content": "welcome!", "username": "bob",
         "createdAt": "2025-05-01T10:01:00Z", "lastModifiedAt": "2025-05-01T10:01:00Z",
         "repliedToId": 1, "replies": null}
     ]}
]"#;

pub(crate) const USER_BODY: &str =
    r#"{"id": 12, "username": "alice", "email": "alice@example.org"}"#;

// Helper to create a service pointed at a mockito server with fast retries
pub(crate) fn create_test_service(
    server: &ServerGuard,
    max_retry_attempts: u32,
) -> HttpMessageService {
    let config = ClientConfig {
        api_base_url: format!("{}/api/v1", server.url()),
        request_timeout_seconds: 5,
        max_retry_attempts,
        retry_initial_interval_ms: 1,
    };
    HttpMessageService::new(config).unwrap()
}
