use super::*;
use crate::batch::test_helpers::{FakeBehavior, FakeEncoder};
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;


const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

/// One part of a hand-built multipart body
enum Part<'a> {
    File {
        field: &'a str,
        filename: Option<&'a str>,
        bytes: &'a [u8],
    },
    Text {
        field: &'a str,
        value: &'a str,
    },
}

fn image<'a>(filename: &'a str, bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        field: "image",
        filename: Some(filename),
        bytes,
    }
}

fn text<'a>(field: &'a str, value: &'a str) -> Part<'a> {
    Part::Text { field, value }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                field,
                filename,
                bytes,
            } => {
                let disposition = match filename {
                    Some(filename) => format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
                    ),
                    None => format!("Content-Disposition: form-data; name=\"{field}\"\r\n"),
                };
                body.extend_from_slice(disposition.as_bytes());
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn convert_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Router over a fake encoder, with its work dir inside `root`
fn test_router(
    root: &Path,
    behavior: FakeBehavior,
    configure: impl FnOnce(&mut Config),
) -> (Router, Arc<FakeEncoder>) {
    let mut config = Config::default();
    config.batch.work_dir = root.join("uploads");
    configure(&mut config);
    let config = Arc::new(config);

    let encoder = Arc::new(FakeEncoder::new(behavior));
    let orchestrator = Arc::new(BatchOrchestrator::from_config(encoder.clone(), &config));
    (create_router(orchestrator, config), encoder)
}

/// Poll until the work dir holds no workspace (cleanup runs after the body ends)
async fn assert_work_dir_empties(root: &Path) {
    let work_dir = root.join("uploads");
    for _ in 0..100 {
        let empty = match std::fs::read_dir(&work_dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        };
        if empty {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let left: Vec<_> = walkdir::WalkDir::new(&work_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().display().to_string())
        .collect();
    panic!("work dir still holds artifacts: {left:?}");
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let root = tempdir().unwrap();
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    config.batch.work_dir = root.path().join("uploads");
    std::fs::create_dir_all(config.batch.work_dir.join("batch-stale")).unwrap();
    let config = Arc::new(config);

    let orchestrator = Arc::new(BatchOrchestrator::from_config(
        Arc::new(FakeEncoder::new(FakeBehavior::Succeed)),
        &config,
    ));

    let api_handle = tokio::spawn({
        let config = config.clone();
        async move { start_api_server(orchestrator, config).await }
    });

    // Give it a moment to start and sweep
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should keep running");
    assert!(!root.path().join("uploads").join("batch-stale").exists());

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let root = tempdir().unwrap();
    let (app, _) = test_router(root.path(), FakeBehavior::Succeed, |c| {
        c.server.cors_enabled = true;
        c.server.cors_origins = vec!["*".to_string()];
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let root = tempdir().unwrap();
    let (app, _) = test_router(root.path(), FakeBehavior::Succeed, |c| {
        c.server.cors_origins = vec!["https://images.example.com".to_string()];
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://images.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://images.example.com"
    );

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_cors_disabled() {
    let root = tempdir().unwrap();
    let (app, _) = test_router(root.path(), FakeBehavior::Succeed, |c| {
        c.server.cors_enabled = false;
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_static_dir_is_served_as_fallback() {
    let root = tempdir().unwrap();
    let public = root.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<h1>upload</h1>").unwrap();

    let (app, _) = test_router(root.path(), FakeBehavior::Succeed, |c| {
        c.server.static_dir = Some(public.clone());
    });

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"<h1>upload</h1>");
}

#[tokio::test]
async fn test_unknown_path_without_static_dir_is_not_found() {
    let root = tempdir().unwrap();
    let (app, _) = test_router(root.path(), FakeBehavior::Succeed, |_| {});

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
