use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use server::{app, config::Config, state::AppState};

fn test_app() -> Router {
    let config = Config::from_source(|_| None).unwrap();

    app(AppState::new(config).unwrap()).unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    (status, value)
}

async fn post(app: &Router, path: &str, body: Value) -> Value {
    let (status, value) = send(app, Method::POST, &format!("/api/abacus{path}"), Some(body)).await;
    assert_eq!(status, StatusCode::OK, "POST {path} failed: {value}");
    value
}

async fn current(app: &Router) -> Value {
    let (status, value) = send(app, Method::GET, "/api/abacus/state", None).await;
    assert_eq!(status, StatusCode::OK);
    value
}

#[tokio::test]
async fn test_initial_state() {
    let app = test_app();

    assert_eq!(
        current(&app).await,
        json!({ "width": 4, "divider": 4, "rows": [] })
    );
}

#[tokio::test]
async fn test_health() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_defaults_without_body() {
    let app = test_app();

    let (_, state) = send(&app, Method::POST, "/api/abacus/add", None).await;
    assert_eq!(state["rows"], json!([[0, 1]]));

    let (_, state) = send(&app, Method::POST, "/api/abacus/mul2", None).await;
    assert_eq!(state["rows"], json!([[0, 2]]));

    let (_, state) = send(&app, Method::POST, "/api/abacus/div2", None).await;
    assert_eq!(state["divider"], json!(2));

    let (_, state) = send(&app, Method::POST, "/api/abacus/sub", None).await;
    assert_eq!(state["rows"], json!([[0, 1]]));
    assert_eq!(state["divider"], json!(4));

    let (_, state) = send(&app, Method::POST, "/api/abacus/init", None).await;
    assert_eq!(state, json!({ "width": 4, "divider": 4, "rows": [] }));
}

#[tokio::test]
async fn test_carry_and_doubling() {
    let app = test_app();

    post(&app, "/add", json!({ "y": 0, "k": 4 })).await;
    let state = post(&app, "/mul2", json!({ "steps": 1 })).await;
    assert_eq!(state["rows"], json!([[1, 4]]));

    post(&app, "/add", json!({ "y": 0, "k": 1 })).await;
    let state = post(&app, "/mul2", json!({ "steps": 1 })).await;
    assert_eq!(state["rows"], json!([[0, 2], [1, 4]]));
}

#[tokio::test]
async fn test_halving_sequence() {
    let app = test_app();

    post(&app, "/add", json!({ "y": 0, "k": 2 })).await;

    let state = post(&app, "/div2", json!({ "steps": 1 })).await;
    assert_eq!(state, json!({ "width": 4, "divider": 2, "rows": [[0, 2]] }));

    let state = post(&app, "/div2", json!({ "steps": 1 })).await;
    assert_eq!(state, json!({ "width": 4, "divider": 1, "rows": [[0, 1]] }));

    let state = post(&app, "/div2", json!({ "steps": 3 })).await;
    assert_eq!(state, json!({ "width": 4, "divider": 1, "rows": [[0, 1]] }));
}

#[tokio::test]
async fn test_init_and_convert() {
    let app = test_app();

    let state = post(&app, "/init", json!({ "base": 10 })).await;
    assert_eq!(state, json!({ "width": 9, "divider": 9, "rows": [] }));

    post(&app, "/add", json!({ "y": 2, "k": 7 })).await;
    post(&app, "/add", json!({ "y": 0, "k": 1 })).await;

    let state = post(&app, "/convert", json!({ "base": 4 })).await;
    assert_eq!(
        state,
        json!({ "width": 3, "divider": 3, "rows": [[0, 1], [2, 3]] })
    );
}

#[tokio::test]
async fn test_invalid_base_rejected() {
    let app = test_app();
    post(&app, "/add", json!({ "y": 1, "k": 3 })).await;
    let before = current(&app).await;

    for path in ["/api/abacus/init", "/api/abacus/convert"] {
        let (status, body) = send(&app, Method::POST, path, Some(json!({ "base": 1 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!("Invalid base 1, must be at least 2"));
    }

    assert_eq!(current(&app).await, before);
}

#[tokio::test]
async fn test_lenient_and_malformed_fields() {
    let app = test_app();

    let state = post(&app, "/add", json!({ "y": "3", "k": 2.7 })).await;
    assert_eq!(state["rows"], json!([[3, 2]]));

    let state = post(&app, "/sub", json!({ "y": 3, "k": -5 })).await;
    assert_eq!(state["rows"], json!([[3, 2]]));

    let state = post(&app, "/add", json!({ "y": 3, "k": true })).await;
    assert_eq!(state["rows"], json!([[3, 3]]));

    let state = post(&app, "/sub", json!({ "y": 3, "k": true })).await;
    assert_eq!(state["rows"], json!([[3, 2]]));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/abacus/add",
        Some(json!({ "y": "three" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/abacus/mul2",
        Some(json!({ "steps": null })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(current(&app).await["rows"], json!([[3, 2]]));
}

#[tokio::test]
async fn test_carry_past_i64_keeps_every_row() {
    let app = test_app();

    post(&app, "/add", json!({ "y": "9223372036854775806", "k": 4 })).await;
    let state = post(&app, "/add", json!({ "y": "9223372036854775807", "k": 4 })).await;
    assert_eq!(state["rows"].as_array().unwrap().len(), 2);

    let state = post(&app, "/mul2", json!({ "steps": 1 })).await;
    assert_eq!(state["rows"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rows_sorted() {
    let app = test_app();

    for y in [5, -2, 9, 0, 3] {
        post(&app, "/add", json!({ "y": y, "k": 1 })).await;
    }

    assert_eq!(
        current(&app).await["rows"],
        json!([[-2, 1], [0, 1], [3, 1], [5, 1], [9, 1]])
    );
}

#[tokio::test]
async fn test_interpret() {
    let app = test_app();

    post(&app, "/add", json!({ "y": 0, "k": 1 })).await;
    post(&app, "/add", json!({ "y": 2, "k": 3 })).await;

    let (status, reading) = send(
        &app,
        Method::POST,
        "/api/abacus/interpret",
        Some(json!({ "legend": ["_", "A", "B", "C", "D"], "visible_rows": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reading, json!({ "text": "C_A", "sum": 4 }));

    let (_, reading) = send(
        &app,
        Method::POST,
        "/api/abacus/interpret",
        Some(json!({
            "legend": ["_", "A", "B", "C", "D"],
            "visible_rows": "3",
            "direction": "ltr",
            "joiner": " ",
        })),
    )
    .await;
    assert_eq!(reading, json!({ "text": "A _ C", "sum": 4 }));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/abacus/interpret",
        Some(json!({ "direction": "up" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = test_app();

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/abacus/add")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(preflight("http://localhost:5173"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let response = app
        .oneshot(preflight("https://elsewhere.example.com"))
        .await
        .unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_serialized() {
    let app = test_app();
    post(&app, "/init", json!({ "base": 1000 })).await;

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { post(&app, "/add", json!({ "y": 0, "k": 1 })).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(current(&app).await["rows"], json!([[0, 64]]));
}
