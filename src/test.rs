use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{
    error::RATE_LIMIT_MESSAGE,
    rate_limit::{RateLimiter, RateLimiterConfig},
    server::{self, ServerConfig},
    state::ApiState,
    store::{BookRecord, BookStore},
};

const CLIENT: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 40000);
const OTHER_CLIENT: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)), 40000);

/// In-memory state with the author and genre from the happy path already
/// present.
async fn seeded_state() -> ApiState {
    let store = BookStore::open_in_memory().expect("Failed to open in-memory store");
    store
        .add_author("Tolkien", "J.R.R.")
        .await
        .expect("Failed to add author");
    store
        .add_genre("Fantasy")
        .await
        .expect("Failed to add genre");

    ApiState::new(store, RateLimiter::new(RateLimiterConfig::default()))
}

fn app(state: ApiState) -> Router {
    server::router(state)
}

fn hobbit_payload() -> Value {
    json!({
        "familyName": "Tolkien",
        "firstName": "J.R.R.",
        "genreName": "Fantasy",
        "bookTitle": "The Hobbit",
    })
}

fn json_request_from(client: SocketAddr, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/newbook")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(client))
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn json_request(body: Value) -> Request<Body> {
    json_request_from(CLIENT, body)
}

async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();

    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

#[tokio::test]
async fn example_config_is_valid() {
    ServerConfig::from_config_file("config.example.yaml")
        .await
        .expect("Example config is not parsable");
}

#[tokio::test]
async fn creates_book_for_existing_author_and_genre() {
    let state = seeded_state().await;
    let app = app(state.clone());

    let response = app
        .oneshot(json_request(hobbit_payload()))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);

    let record: BookRecord = serde_json::from_str(&body_string(response).await)
        .expect("Response body is not a book record");
    assert_eq!(record.book_title, "The Hobbit");
    assert_eq!(record.family_name, "Tolkien");
    assert_eq!(record.first_name, "J.R.R.");
    assert_eq!(record.genre_name, "Fantasy");
    assert!(record.id > 0);

    assert_eq!(state.store().count_books(), 1);
}

#[tokio::test]
async fn form_encoded_body_is_accepted() {
    let state = seeded_state().await;
    let app = app(state.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/newbook")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .extension(ConnectInfo(CLIENT))
        .body(Body::from(
            "familyName=Tolkien&firstName=J.R.R.&genreName=Fantasy&bookTitle=The+Hobbit",
        ))
        .expect("Failed to build request");

    let response = app.oneshot(request).await.expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);

    let body: Value =
        serde_json::from_str(&body_string(response).await).expect("Response body is not JSON");
    assert_eq!(body["bookTitle"], "The Hobbit");

    assert_eq!(state.store().count_books(), 1);
}

#[tokio::test]
async fn missing_field_is_rejected_without_touching_the_store() {
    let state = seeded_state().await;
    let app = app(state.clone());

    let response = app
        .oneshot(json_request(json!({
            "familyName": "Tolkien",
            "firstName": "J.R.R.",
            "genreName": "Fantasy",
        })))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.store().count_books(), 0);
}

#[tokio::test]
async fn blank_field_is_rejected_without_touching_the_store() {
    let state = seeded_state().await;
    let app = app(state.clone());

    let mut payload = hobbit_payload();
    payload["bookTitle"] = json!("   ");

    let response = app
        .oneshot(json_request(payload))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.store().count_books(), 0);
}

#[tokio::test]
async fn unsupported_content_type_is_rejected() {
    let state = seeded_state().await;
    let app = app(state.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/newbook")
        .header(header::CONTENT_TYPE, "text/plain")
        .extension(ConnectInfo(CLIENT))
        .body(Body::from(hobbit_payload().to_string()))
        .expect("Failed to build request");

    let response = app.oneshot(request).await.expect("Request failed");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.store().count_books(), 0);
}

#[tokio::test]
async fn unknown_genre_fails_book_creation() {
    let state = seeded_state().await;
    let app = app(state.clone());

    let mut payload = hobbit_payload();
    payload["genreName"] = json!("Chemistry");

    let response = app
        .oneshot(json_request(payload))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_string(response).await;
    assert!(body.starts_with("Error creating book: "), "body: {body}");
    assert_eq!(state.store().count_books(), 0);
}

#[tokio::test]
async fn error_message_angle_brackets_are_escaped() {
    let state = seeded_state().await;
    let app = app(state.clone());

    let mut payload = hobbit_payload();
    payload["familyName"] = json!("<script>alert(1)</script>");

    let response = app
        .oneshot(json_request(payload))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_string(response).await;
    assert!(body.contains("&lt;script&gt;"), "body: {body}");
    assert!(!body.contains("<script>"), "body: {body}");
}

#[tokio::test]
async fn rate_limit_rejects_after_threshold() {
    let state = seeded_state().await;
    let app = app(state.clone());

    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(json_request(hobbit_payload()))
            .await
            .expect("Request failed");

        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(json_request(hobbit_payload()))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_string(response).await, RATE_LIMIT_MESSAGE);

    // The rejected request never reached the store.
    assert_eq!(state.store().count_books(), 100);

    // Another client is unaffected.
    let response = app
        .oneshot(json_request_from(OTHER_CLIENT, hobbit_payload()))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let state = seeded_state().await;
    let app = app(state);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/newbook")
        .extension(ConnectInfo(CLIENT))
        .body(Body::empty())
        .expect("Failed to build request");

    let response = app.oneshot(request).await.expect("Request failed");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let state = seeded_state().await;
    let app = app(state);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/newauthor")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(CLIENT))
        .body(Body::from(hobbit_payload().to_string()))
        .expect("Failed to build request");

    let response = app.oneshot(request).await.expect("Request failed");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
