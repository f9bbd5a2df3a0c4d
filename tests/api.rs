//! End-to-end tests: a real server on a loopback port, driven with reqwest.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use libris::{BookService, Config, MAX_BODY_BYTES, Server, Store, routes};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestApp {
    base: String,
    client: reqwest::Client,
    db_path: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), libris::Error>>>,
    _dir: TempDir,
}

impl TestApp {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("db.json");
        Self::spawn_on(dir, db_path).await
    }

    async fn spawn_on(dir: TempDir, db_path: PathBuf) -> Self {
        let store = Store::load_all(&db_path).unwrap();
        let config = Config { host: "127.0.0.1".into(), port: 0, db_path: db_path.clone() };
        let app = routes::app(Arc::new(BookService::new(store)), &config);

        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(app, async move {
            let _ = rx.await;
        }));

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            db_path,
            shutdown: Some(tx),
            handle: Some(handle),
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn create(&self, body: Value) -> Value {
        let resp = self.client.post(self.url("/books")).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap()
    }

    /// Stops the server and hands back the datastore directory. The client,
    /// and any idle connection it pools, stays alive until the server is down.
    async fn stop(mut self) -> (TempDir, PathBuf) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
        (self._dir, self.db_path)
    }
}

#[tokio::test]
async fn create_returns_book_with_generated_id() {
    let app = TestApp::spawn().await;

    let book = app.create(json!({ "title": "T", "author": "A" })).await;
    let id = book["id"].as_str().unwrap();
    assert_eq!(id.len(), 8);
    assert_eq!(book["title"], "T");
    assert_eq!(book["author"], "A");

    let fetched: Value = app.client.get(app.url(&format!("/books/{id}"))).send().await.unwrap()
        .json().await.unwrap();
    assert_eq!(fetched, book);

    app.stop().await;
}

#[tokio::test]
async fn books_survive_a_restart() {
    let app = TestApp::spawn().await;
    let book = app.create(json!({ "title": "T", "author": "A", "year": 1993 })).await;
    let (dir, db_path) = app.stop().await;

    let app = TestApp::spawn_on(dir, db_path).await;
    let id = book["id"].as_str().unwrap();
    let fetched: Value = app.client.get(app.url(&format!("/books/{id}"))).send().await.unwrap()
        .json().await.unwrap();
    assert_eq!(fetched, book);

    app.stop().await;
}

#[tokio::test]
async fn unknown_id_is_404() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/books/nope")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.client.put(app.url("/books/nope")).json(&json!({ "author": "B" })).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    app.stop().await;
}

#[tokio::test]
async fn update_merges_only_patched_fields() {
    let app = TestApp::spawn().await;
    let book = app.create(json!({ "title": "T", "author": "A" })).await;
    let id = book["id"].as_str().unwrap();

    let resp = app.client.put(app.url(&format!("/books/{id}")))
        .json(&json!({ "author": "B" }))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated, json!({ "id": id, "title": "T", "author": "B" }));

    app.stop().await;
}

#[tokio::test]
async fn delete_removes_exactly_one_and_is_repeatable() {
    let app = TestApp::spawn().await;
    let keep = app.create(json!({ "title": "Keep", "author": "A" })).await;
    let gone = app.create(json!({ "title": "Gone", "author": "A" })).await;
    let url = app.url(&format!("/books/{}", gone["id"].as_str().unwrap()));

    for _ in 0..2 {
        let resp = app.client.delete(&url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.bytes().await.unwrap().is_empty());
    }

    let listed: Value = app.client.get(app.url("/books")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed, json!([keep]));

    app.stop().await;
}

#[tokio::test]
async fn list_returns_books_in_creation_order() {
    let app = TestApp::spawn().await;
    let mut created = Vec::new();
    for n in 0..4 {
        created.push(app.create(json!({ "title": format!("Volume {n}"), "author": "A" })).await);
    }

    let listed: Value = app.client.get(app.url("/books")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed, Value::Array(created));

    app.stop().await;
}

#[tokio::test]
async fn missing_author_is_400() {
    let app = TestApp::spawn().await;

    let resp = app.client.post(app.url("/books")).json(&json!({ "title": "T" })).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid book: `author` is required");

    let resp = app.client.post(app.url("/books"))
        .header("content-type", "application/json")
        .body("{ nope")
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    app.stop().await;
}

#[tokio::test]
async fn datastore_file_holds_books_document() {
    let app = TestApp::spawn().await;
    let book = app.create(json!({ "title": "T", "author": "A" })).await;
    let (_dir, db_path) = app.stop().await;

    let doc: Value = serde_json::from_slice(&std::fs::read(db_path).unwrap()).unwrap();
    assert_eq!(doc, json!({ "books": [book] }));
}

#[tokio::test]
async fn responses_allow_any_origin() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/books")).send().await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");

    let resp = app.client.request(reqwest::Method::OPTIONS, app.url("/books/abc"))
        .header("access-control-request-method", "PUT")
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.headers()["access-control-allow-methods"].to_str().unwrap().contains("PUT"));

    app.stop().await;
}

#[tokio::test]
async fn wrong_method_is_405() {
    let app = TestApp::spawn().await;

    let resp = app.client.patch(app.url("/books")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET, POST");

    app.stop().await;
}

#[tokio::test]
async fn docs_and_health_checks_are_served() {
    let app = TestApp::spawn().await;

    let doc: Value = app.client.get(app.url("/api-docs/openapi.json")).send().await.unwrap()
        .json().await.unwrap();
    assert_eq!(doc["info"]["title"], "Library API");

    let ui = app.client.get(app.url("/api-docs")).send().await.unwrap().text().await.unwrap();
    assert!(ui.contains("swagger-ui"));

    let live = app.client.get(app.url("/healthz")).send().await.unwrap().text().await.unwrap();
    assert_eq!(live, "ok");

    app.stop().await;
}

#[tokio::test]
async fn shutdown_closes_idle_keep_alive_connections() {
    let mut app = TestApp::spawn().await;
    let resp = app.client.get(app.url("/books")).send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "[]");

    // The pooled connection is still open when the signal arrives.
    let _ = app.shutdown.take().unwrap().send(());
    let handle = app.handle.take().unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(stopped.is_ok(), "server still running 5s after shutdown");
    stopped.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn oversized_body_is_413_and_not_stored() {
    let app = TestApp::spawn().await;

    let blob = "x".repeat(MAX_BODY_BYTES);
    let resp = app.client.post(app.url("/books"))
        .json(&json!({ "title": "T", "author": "A", "blob": blob }))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], format!("request body exceeds {MAX_BODY_BYTES} bytes"));

    let listed: Value = app.client.get(app.url("/books")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed, json!([]));

    // Just under the limit is fine.
    let blob = "x".repeat(MAX_BODY_BYTES - 100);
    app.create(json!({ "title": "T", "author": "A", "blob": blob })).await;

    app.stop().await;
}

#[tokio::test]
async fn concurrent_creates_are_all_persisted() {
    const CLIENTS: usize = 16;

    let app = TestApp::spawn().await;
    let mut requests = tokio::task::JoinSet::new();
    for n in 0..CLIENTS {
        let client = app.client.clone();
        let url = app.url("/books");
        requests.spawn(async move {
            client.post(url).json(&json!({ "title": format!("T{n}"), "author": "A" }))
                .send().await.unwrap().status()
        });
    }
    while let Some(status) = requests.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let listed: Vec<Value> = app.client.get(app.url("/books")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed.len(), CLIENTS);
    let (dir, db_path) = app.stop().await;

    let app = TestApp::spawn_on(dir, db_path).await;
    let reloaded: Vec<Value> = app.client.get(app.url("/books")).send().await.unwrap().json().await.unwrap();
    assert_eq!(reloaded, listed);

    app.stop().await;
}
