//! HTTP surface of the synchronization daemon.
//!
//! Provides:
//! - `GET /` - human-readable tracked-repository count
//! - `POST /{token}` - synchronization notification endpoint
//!
//! The notification body is form/URL-encoded with a `payload` field
//! holding a JSON document `{"repository": {"url": "..."}}`. The token is
//! taken from the path segment. Success is an empty 204; every classified
//! failure renders as its status code with the public-safe message body.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::debug;

use rws_common::errors::SyncError;

use crate::handler::{self, AppState};

/// Create the HTTP router for the synchronization daemon.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/{token}", post(sync_handler))
        .with_state(Arc::new(state))
}

/// Form body of a notification: one `payload` field holding JSON.
#[derive(Debug, Deserialize)]
struct NotificationForm {
    #[serde(default)]
    payload: Option<String>,
}

/// Handler for `GET /` - tracked-repository count.
async fn status_handler(State(state): State<Arc<AppState>>) -> String {
    match state.registry.len() {
        1 => "Tracking 1 repository.".to_string(),
        n => format!("Tracking {} repositories.", n),
    }
}

/// Handler for `POST /{token}` - one synchronization notification.
async fn sync_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    form: Result<Form<NotificationForm>, FormRejection>,
) -> Response {
    let result = async {
        let url = extract_repository_url(form)?;
        handler::synchronize(&state, &url, &token).await
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

/// Pull `repository.url` out of the notification body.
///
/// A missing or unparseable `payload` is a [`SyncError::BadPayload`];
/// JSON that parses but does not carry `repository.url` as a string is a
/// [`SyncError::MissingField`].
fn extract_repository_url(
    form: Result<Form<NotificationForm>, FormRejection>,
) -> Result<String, SyncError> {
    let Form(form) = form.map_err(|_| SyncError::BadPayload)?;
    let payload = form.payload.ok_or(SyncError::BadPayload)?;
    let data: serde_json::Value =
        serde_json::from_str(&payload).map_err(|_| SyncError::BadPayload)?;

    data.get("repository")
        .and_then(|repository| repository.get("url"))
        .and_then(|url| url.as_str())
        .map(str::to_string)
        .ok_or(SyncError::MissingField)
}

/// Render a classified failure as its status and public message.
fn error_response(err: &SyncError) -> Response {
    debug!(status = err.status(), error = %err, "synchronization request failed");
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.public_message()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path as StdPath;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use rws_common::types::{Registry, RepoEntry, RepoUrl};

    use crate::executor::SyncExecutor;
    use crate::locks::DirLocks;

    const REPO: &str = "https://example.com/r.git";

    fn make_state(directory: &StdPath, token: Option<&str>, script: &str) -> AppState {
        let registry = Registry::from_entries(vec![RepoEntry {
            url: RepoUrl::new(REPO),
            directory: directory.to_path_buf(),
            token: token.map(str::to_string),
        }])
        .expect("no duplicates");

        AppState {
            registry,
            default_token: "d".to_string(),
            executor: SyncExecutor::new(
                "sh",
                vec!["-c".to_string(), script.to_string()],
                Duration::from_secs(5),
            ),
            locks: DirLocks::new(),
        }
    }

    fn urlencode(s: &str) -> String {
        let mut out = String::new();
        for b in s.bytes() {
            match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    out.push(b as char)
                }
                _ => out.push_str(&format!("%{:02X}", b)),
            }
        }
        out
    }

    fn notification(token: &str, payload: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/{token}"))
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Body::from(format!("payload={}", urlencode(payload))))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn status_is_pluralized() {
        let registry = Registry::from_entries(Vec::new()).unwrap();
        let state = AppState {
            registry,
            default_token: "d".to_string(),
            executor: SyncExecutor::new("true", Vec::new(), Duration::from_secs(5)),
            locks: DirLocks::new(),
        };
        let router = create_router(state);

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Tracking 0 repositories.");
    }

    #[tokio::test]
    async fn status_uses_singular_for_one_repository() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), None, "true"));

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_text(response).await, "Tracking 1 repository.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_sync_is_an_empty_204() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), Some("t1"), "touch marker"));

        let response = router
            .oneshot(notification(
                "t1",
                r#"{"repository":{"url":"https://example.com/r.git"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_text(response).await.is_empty());
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn malformed_json_payload_is_a_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), None, "touch marker"));

        let response = router.oneshot(notification("d", "not-json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "The JSON data cannot be parsed");
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn missing_payload_field_is_a_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), None, "touch marker"));

        let request = Request::builder()
            .method("POST")
            .uri("/d")
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Body::from("unrelated=1"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "The JSON data cannot be parsed");
    }

    #[tokio::test]
    async fn non_form_body_is_a_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), None, "touch marker"));

        let request = Request::builder()
            .method("POST")
            .uri("/d")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"repository":{"url":"x"}}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "The JSON data cannot be parsed");
    }

    #[tokio::test]
    async fn payload_without_repository_url_is_a_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), None, "touch marker"));

        let response = router
            .oneshot(notification("d", r#"{"repository":{"name":"r"}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "The JSON data does not contain the required information"
        );
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn unregistered_repository_is_a_400_naming_it() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), None, "touch marker"));

        let response = router
            .oneshot(notification(
                "d",
                r#"{"repository":{"url":"https://example.com/unknown.git"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "The repository https://example.com/unknown.git has not been registered"
        );
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn wrong_token_is_a_401_and_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(dir.path(), Some("t1"), "touch marker"));

        let response = router
            .oneshot(notification(
                "wrong",
                r#"{"repository":{"url":"https://example.com/r.git"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_text(response).await;
        assert_eq!(body, "Wrong token presented");
        // The presented value must not be echoed back.
        assert!(!body.contains("wrong"));
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn missing_directory_is_a_generic_500() {
        let state = make_state(
            StdPath::new("/nonexistent/sync/target"),
            None,
            "touch marker",
        );
        let router = create_router(state);

        let response = router
            .oneshot(notification(
                "d",
                r#"{"repository":{"url":"https://example.com/r.git"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert_eq!(body, "Internal error");
        assert!(!body.contains("/nonexistent"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn config_file_to_router_end_to_end() {
        use std::io::Write;

        use rws_common::Config;

        let repo_dir = tempfile::tempdir().unwrap();
        let mut config_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            config_file,
            r#"
            [auth]
            default_token = "d"

            [sync]
            command = ["sh", "-c", "touch marker"]

            [[repositories]]
            url = "https://example.com/r.git"
            directory = "{}"
            token = "t1"
            "#,
            repo_dir.path().display()
        )
        .unwrap();

        let config = Config::load(Some(config_file.path())).unwrap();
        let state = AppState {
            registry: config.registry().unwrap(),
            default_token: config.auth.default_token.clone(),
            executor: SyncExecutor::from_config(&config.sync).unwrap(),
            locks: DirLocks::new(),
        };
        let router = create_router(state);

        // Wrong token first: rejected, nothing runs.
        let response = router
            .clone()
            .oneshot(notification(
                "wrong",
                r#"{"repository":{"url":"https://example.com/r.git"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!repo_dir.path().join("marker").exists());

        // Registered token: the update command runs in the sync target.
        let response = router
            .oneshot(notification(
                "t1",
                r#"{"repository":{"url":"https://example.com/r.git"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(repo_dir.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_command_is_a_500_without_stderr_leakage() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(make_state(
            dir.path(),
            None,
            "echo fatal: not a git repository 1>&2; exit 128",
        ));

        let response = router
            .oneshot(notification(
                "d",
                r#"{"repository":{"url":"https://example.com/r.git"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert_eq!(body, "Internal error");
        assert!(!body.contains("not a git repository"));
    }
}
