use std::sync::Arc;

use super::{create_test_service, ROOTS_BODY, USER_BODY};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::HttpMessageService;
use crate::session::{LoginCredentials, Session};
use message_tree::{MessageId, MessageService, NewMessage, ServiceError, ToggleOutcome};
use mockito::{Matcher, Server};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_list_roots_decodes_wire_format() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/messages")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ROOTS_BODY)
        .create_async()
        .await;

    let service = create_test_service(&server, 0);
    let roots = assert_ok!(service.list_roots().await);

    mock.assert_async().await;
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].id, MessageId(2));
    assert_eq!(roots[0].author, "bob");
    assert_eq!(roots[1].reply_count, Some(1));
    let embedded = roots[1].replies.as_ref().unwrap();
    assert_eq!(embedded[0].parent_id, Some(MessageId(1)));
}

#[tokio::test]
async fn test_replies_of_deleted_message_are_not_found() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/messages/9/replies")
        .with_status(404)
        .with_body("Message not found")
        .expect(1)
        .create_async()
        .await;

    let service = create_test_service(&server, 3);
    let err = assert_err!(service.fetch_replies(MessageId(9)).await);

    mock.assert_async().await;
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_server_errors_are_retried_for_reads() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/messages")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let service = create_test_service(&server, 2);
    let err = assert_err!(service.list_roots().await);

    mock.assert_async().await;
    assert!(matches!(err, ServiceError::Connectivity(_)));
}

#[tokio::test]
async fn test_create_sends_parent_id_as_string() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/messages")
        .match_body(Matcher::Json(json!({"content": "nice post", "parentId": "7"})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id": 8, "content": "nice post", "username": "alice",
                "createdAt": "2025-05-01T11:00:00Z", "lastModifiedAt": "2025-05-01T11:00:00Z",
                "repliedToId": 7, "replies": null}"#,
        )
        .create_async()
        .await;

    let service = create_test_service(&server, 0);
    let created = assert_ok!(
        service
            .create_message(&NewMessage::reply(MessageId(7), "nice post"))
            .await
    );

    mock.assert_async().await;
    assert_eq!(created.id, MessageId(8));
    assert_eq!(created.parent_id, Some(MessageId(7)));
}

#[tokio::test]
async fn test_create_rejections_and_server_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("POST", "/api/v1/messages")
        .match_body(Matcher::PartialJson(json!({"content": "no"})))
        .with_status(400)
        .with_body("Content must be between 3 and 200 characters")
        .expect(1)
        .create_async()
        .await;
    let failing = server
        .mock("POST", "/api/v1/messages")
        .match_body(Matcher::PartialJson(json!({"content": "valid content"})))
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let service = create_test_service(&server, 3);

    let err = assert_err!(service.create_message(&NewMessage::root("no")).await);
    assert!(matches!(
        err,
        ServiceError::Rejected(ref reason) if reason.contains("between 3 and 200")
    ));

    let err = assert_err!(service.create_message(&NewMessage::root("valid content")).await);
    assert!(matches!(err, ServiceError::Connectivity(_)));

    rejected.assert_async().await;
    failing.assert_async().await;
}

#[tokio::test]
async fn test_undecodable_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"messages": "not a list"}"#)
        .expect(1)
        .create_async()
        .await;

    let service = create_test_service(&server, 3);
    let err = assert_err!(service.list_roots().await);

    mock.assert_async().await;
    assert!(matches!(err, ServiceError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_health_check() {
    let mut server = Server::new_async().await;
    let healthy = server
        .mock("GET", "/api/v1/health")
        .with_status(200)
        .with_body(r#"{"status":"UP"}"#)
        .create_async()
        .await;

    let service = create_test_service(&server, 0);
    assert!(service.health_check().await);
    healthy.assert_async().await;

    let mut broken = Server::new_async().await;
    let _failing = broken
        .mock("GET", "/api/v1/health")
        .with_status(500)
        .create_async()
        .await;
    let service = create_test_service(&broken, 3);
    assert!(!service.health_check().await);
}

#[tokio::test]
async fn test_unreachable_server() {
    // Nothing listens on port 1
    let config = ClientConfig {
        api_base_url: "http://127.0.0.1:1/api/v1".to_string(),
        request_timeout_seconds: 2,
        max_retry_attempts: 0,
        retry_initial_interval_ms: 1,
    };
    let service = HttpMessageService::new(config).unwrap();

    assert!(!service.health_check().await);
    let err = assert_err!(service.list_roots().await);
    assert!(matches!(err, ServiceError::Connectivity(_)));
}

#[tokio::test]
async fn test_login_failure_is_auth_error() {
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/api/v1/users/login")
        .with_status(401)
        .with_body("Bad credentials")
        .create_async()
        .await;

    let service = Arc::new(create_test_service(&server, 0));
    let result = Session::login(service, &LoginCredentials::new("alice", "wrong")).await;

    match result {
        Err(ClientError::Auth(reason)) => assert_eq!(reason, "Invalid username/email or password."),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("login should fail"),
    }
}

#[tokio::test]
async fn test_session_over_http() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/api/v1/users/login")
        .match_body(Matcher::Json(json!({
            "usernameOrEmail": "alice",
            "password": "Secret#123",
            "rememberMe": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(USER_BODY)
        .create_async()
        .await;
    let _roots = server
        .mock("GET", "/api/v1/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ROOTS_BODY)
        .create_async()
        .await;
    let replies = server
        .mock("GET", "/api/v1/messages/2/replies")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let service = Arc::new(create_test_service(&server, 0));
    let session = assert_ok!(
        Session::login(service, &LoginCredentials::new("alice", "Secret#123")).await
    );
    login.assert_async().await;
    assert_eq!(session.user().id, "12");

    let controller = session.controller();
    assert_eq!(assert_ok!(controller.load_root_messages().await), 2);

    // Embedded replies are already resident: expanding needs no request
    assert!(controller.has_children(MessageId(1)).await);
    assert_eq!(
        assert_ok!(controller.toggle_replies(MessageId(1)).await),
        ToggleOutcome::Expanded
    );
    assert_eq!(controller.child_ids(MessageId(1)).await, Some(vec![MessageId(3)]));

    assert_eq!(
        assert_ok!(controller.toggle_replies(MessageId(2)).await),
        ToggleOutcome::Expanded
    );
    assert_eq!(controller.derived_reply_count(MessageId(2)).await, 0);
    replies.assert_async().await;
}
