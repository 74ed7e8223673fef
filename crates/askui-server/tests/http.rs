//! End-to-end tests over a real loopback listener.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use askui_server::{http::create_router, AppState, ImageStore, ImageStoreOptions};

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

struct TestServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _image_dir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        let image_dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(ImageStoreOptions {
            dir: Some(image_dir.path().to_path_buf()),
            max_upload_bytes: Some(1 << 20),
        })
        .unwrap();

        let state = AppState::new(Some(images));
        let router = create_router(state.clone(), 1 << 20);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            state,
            _image_dir: image_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn create_confirm(server: &TestServer, client: &reqwest::Client) -> Value {
    let resp = client
        .post(server.url("/api/requests"))
        .json(&json!({
            "type": "confirm",
            "input": {"title": "Deploy?"},
            "timeout": 60,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_request_lifecycle() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_confirm(&server, &client).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "pending");

    // Fetchable by id.
    let resp = client
        .get(server.url(&format!("/api/requests/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // A bounded poll on a pending request expires with 408.
    let resp = client
        .get(server.url(&format!("/api/requests/{id}/wait?timeout=1")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::REQUEST_TIMEOUT);

    // Park a waiter, then complete.
    let wait_url = server.url(&format!("/api/requests/{id}/wait?timeout=10"));
    let waiter_client = client.clone();
    let waiter = tokio::spawn(async move { waiter_client.get(wait_url).send().await.unwrap() });

    let resp = client
        .post(server.url(&format!("/api/requests/{id}/response")))
        .json(&json!({"output": {"approved": true}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = waiter.await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let completed: Value = resp.json().await.unwrap();
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["output"]["approved"], true);

    // Second completion is rejected.
    let resp = client
        .post(server.url(&format!("/api/requests/{id}/response")))
        .json(&json!({"output": {"approved": false}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);

    // Unknown ids are 404 on every item route.
    for path in ["/api/requests/nope", "/api/requests/nope/wait?timeout=1"] {
        let resp = client.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn test_create_validation() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Null input.
    let resp = client
        .post(server.url("/api/requests"))
        .json(&json!({"type": "confirm", "input": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    // Unknown widget type.
    let resp = client
        .post(server.url("/api/requests"))
        .json(&json!({"type": "dance", "input": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    // Malformed body.
    let resp = client
        .post(server.url("/api/requests"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    // A timeout whose expiry is not representable must be rejected, not
    // bring down the handler.
    let resp = client
        .post(server.url("/api/requests"))
        .json(&json!({
            "type": "confirm",
            "input": {"title": "Deploy?"},
            "timeout": i64::MAX,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_and_get_image() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .text("ttlSeconds", "5")
        .part(
            "file",
            reqwest::multipart::Part::bytes(PNG_HEADER.to_vec()).file_name("test.png"),
        );
    let resp = client
        .post(server.url("/api/images"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let uploaded: Value = resp.json().await.unwrap();
    assert_eq!(uploaded["mimeType"], "image/png");
    let url = uploaded["url"].as_str().unwrap().to_string();

    let resp = client.get(server.url(&url)).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers()[reqwest::header::CONTENT_TYPE],
        "image/png"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), PNG_HEADER);
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"hello".to_vec()).file_name("test.txt"),
    );
    let resp = client
        .post(server.url("/api/images"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_oversized_payload() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // One byte over the configured limit.
    let mut payload = PNG_HEADER.to_vec();
    payload.resize((1 << 20) + 1, 0);
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(payload).file_name("big.png"),
    );
    let resp = client
        .post(server.url("/api/images"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_upload_rejects_out_of_range_ttl() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .text("ttlSeconds", i64::MAX.to_string())
        .part(
            "file",
            reqwest::multipart::Part::bytes(PNG_HEADER.to_vec()).file_name("test.png"),
        );
    let resp = client
        .post(server.url("/api/images"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_image_is_lazily_deleted() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Store an already-expired blob directly, bypassing the upload ttl.
    let images = server.state.images.as_ref().unwrap();
    let img = images
        .put(
            PNG_HEADER,
            "image/png",
            chrono::Utc::now() - chrono::Duration::seconds(1),
        )
        .await
        .unwrap();
    assert!(img.path.exists());

    let resp = client
        .get(server.url(&format!("/api/images/{}", img.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    // The lazy delete removed both the index entry and the backing file.
    assert!(!img.path.exists());
    assert!(images.get(&img.id).await.is_none());
}

#[tokio::test]
async fn test_get_unknown_image() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url("/api/images/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_resync_and_completion_events() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let a = create_confirm(&server, &client).await;
    let b = create_confirm(&server, &client).await;

    let (mut socket, _) = connect_async(format!("ws://{}/ws", server.addr))
        .await
        .unwrap();

    // The late joiner is replayed exactly the two pending requests.
    let mut replayed = std::collections::HashSet::new();
    for _ in 0..2 {
        let msg = socket.next().await.unwrap().unwrap();
        let Message::Text(text) = msg else {
            panic!("expected text frame, got {msg:?}");
        };
        let event: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(event["type"], "new_request");
        replayed.insert(event["request"]["id"].as_str().unwrap().to_string());
    }
    let expected: std::collections::HashSet<String> = [&a, &b]
        .iter()
        .map(|req| req["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(replayed, expected);

    // Completing one request pushes a completion event.
    let id = a["id"].as_str().unwrap();
    let resp = client
        .post(server.url(&format!("/api/requests/{id}/response")))
        .json(&json!({"output": {"approved": true}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let msg = socket.next().await.unwrap().unwrap();
    let Message::Text(text) = msg else {
        panic!("expected text frame, got {msg:?}");
    };
    let event: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(event["type"], "request_completed");
    assert_eq!(event["request"]["id"], id);
    assert_eq!(event["request"]["status"], "completed");

    assert_eq!(server.state.broadcaster.subscriber_count().await, 1);
}
