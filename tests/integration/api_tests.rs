//! API integration tests, driving the router in process over an in-memory store

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_catalog::{
    api,
    config::{AppConfig, StoreBackend},
    repository::Repository,
    AppState,
};

async fn app() -> Router {
    let mut config = AppConfig::default();
    config.catalog.store = StoreBackend::Memory;
    config.catalog.max_page_size = 20;

    let state = AppState::new(config, Repository::in_memory());
    state
        .services
        .auth
        .ensure_account("admin", "admin")
        .await
        .expect("Failed to provision account");
    api::create_router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Failed to send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// Helper to get a bearer token for the provisioned account
async fn get_auth_token(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/accounts/login",
        None,
        Some(json!({ "login": "admin", "password": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("No token in response").to_string()
}

async fn create_author(app: &Router, token: &str, first: &str, last: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/authors",
        Some(token),
        Some(json!({
            "firstName": first,
            "lastName": last,
            "birthDate": "1802-02-26"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().expect("No id in response").to_string()
}

async fn create_book(
    app: &Router,
    token: &str,
    title: &str,
    author_id: &str,
    genre_ids: Vec<&str>,
) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/books",
        Some(token),
        Some(json!({
            "title": title,
            "authorId": author_id,
            "genreIds": genre_ids,
            "publicationDate": "1862-04-03",
            "coverImageUrl": "https://example.com/cover.jpg",
            "synopsis": "A synopsis"
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_login() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/accounts/login",
        None,
        Some(json!({ "login": "ADMIN", "password": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["login"], "admin");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/accounts/login",
        None,
        Some(json!({ "login": "admin", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_login_without_credentials() {
    let app = app().await;

    for credentials in [
        json!({ "login": "", "password": "admin" }),
        json!({ "login": "admin", "password": "" }),
    ] {
        let (status, body) = send(&app, Method::POST, "/accounts/login", None, Some(credentials)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadValue");
        assert!(body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("Login or password is not provided"));
    }
}

#[tokio::test]
async fn test_anonymous_writes_are_refused() {
    let app = app().await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/genres",
        None,
        Some(json!({ "name": "Drama" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A forged token counts as no token
    let (status, _) = send(
        &app,
        Method::POST,
        "/genres",
        Some("not-a-jwt"),
        Some(json!({ "name": "Drama" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay open
    let (status, body) = send(&app, Method::GET, "/genres", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_author_lifecycle() {
    let app = app().await;
    let token = get_auth_token(&app).await;

    let id = create_author(&app, &token, "Victor", "Hugo").await;

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Victor");
    assert_eq!(body["birthDate"], "1802-02-26");

    // Same identity, other case
    let (status, body) = send(
        &app,
        Method::POST,
        "/authors",
        Some(&token),
        Some(json!({ "firstName": "victor", "lastName": "HUGO", "birthDate": "1802-02-26" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/authors/{}", id),
        Some(&token),
        Some(json!({
            "firstName": "Victor",
            "lastName": "Hugo",
            "biography": "Poet and novelist",
            "birthDate": "1802-02-26"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["biography"], "Poet and novelist");

    let (status, _) = send(&app, Method::DELETE, &format!("/authors/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchAuthor");
}

#[tokio::test]
async fn test_invalid_author_is_rejected() {
    let app = app().await;
    let token = get_auth_token(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/authors",
        Some(&token),
        Some(json!({ "firstName": "   ", "lastName": "Hugo", "birthDate": "2999-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_restricted_author_delete() {
    let app = app().await;
    let token = get_auth_token(&app).await;

    let author = create_author(&app, &token, "Victor", "Hugo").await;
    let (status, _) = create_book(&app, &token, "Les Misérables", &author, vec![]).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::DELETE, &format!("/authors/{}", author), Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_genre_lifecycle() {
    let app = app().await;
    let token = get_auth_token(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/genres",
        Some(&token),
        Some(json!({ "name": "Poetry", "description": "Verse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/genres",
        Some(&token),
        Some(json!({ "name": "POETRY" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/genres/poetry",
        Some(&token),
        Some(json!({ "name": "Lyric Poetry" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Lyric Poetry");

    let (status, _) = send(&app, Method::DELETE, "/genres/Lyric%20Poetry", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::DELETE, "/genres/Poetry", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchGenre");
}

#[tokio::test]
async fn test_book_lifecycle() {
    let app = app().await;
    let token = get_auth_token(&app).await;

    let author = create_author(&app, &token, "Victor", "Hugo").await;
    let (_, genre) = send(
        &app,
        Method::POST,
        "/genres",
        Some(&token),
        Some(json!({ "name": "Drama" })),
    )
    .await;
    let genre_id = genre["id"].as_str().expect("No id in response");

    let (status, created) = create_book(&app, &token, "Les Misérables", &author, vec![genre_id]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["author"], "Victor Hugo");
    assert_eq!(created["genres"], json!(["Drama"]));

    let (status, _) = create_book(&app, &token, "les misérables", &author, vec![]).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, found) = send(&app, Method::GET, "/books/LES%20MIS%C3%89RABLES", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], created["id"]);

    let (status, page) = send(&app, Method::GET, "/books/genre/drama", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, page) = send(&app, Method::GET, "/books/author/hugo", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"][0]["title"], "Les Misérables");

    let (status, _) = send(&app, Method::GET, "/books/author/Tolstoy", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = created["id"].as_str().expect("No id in response");
    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/books/{}", id),
        Some(&token),
        Some(json!({
            "title": "Les Misérables",
            "authorId": author,
            "publicationDate": "1862-04-03",
            "synopsis": "Jean Valjean"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["genres"], json!([]));
    assert_eq!(updated["synopsis"], "Jean Valjean");

    let (status, _) = send(&app, Method::DELETE, &format!("/books/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/books/Les%20Mis%C3%A9rables", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchBook");
}

#[tokio::test]
async fn test_book_with_unknown_author() {
    let app = app().await;
    let token = get_auth_token(&app).await;

    let (status, body) = create_book(
        &app,
        &token,
        "Ghost",
        "00000000-0000-0000-0000-000000000000",
        vec![],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchAuthor");
}

#[tokio::test]
async fn test_book_pagination_and_search() {
    let app = app().await;
    let token = get_auth_token(&app).await;

    let author = create_author(&app, &token, "Victor", "Hugo").await;
    for title in ["Hernani", "Cromwell", "Ruy Blas", "Les Burgraves", "Marion Delorme", "Le roi s'amuse"] {
        let (status, _) = create_book(&app, &token, title, &author, vec![]).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = send(&app, Method::GET, "/books?page=1&size=4", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 6);
    assert_eq!(page["page"], 1);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(2));

    // Search defaults to pages of five
    let (status, page) = send(&app, Method::GET, "/books/search", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["size"], 5);
    assert_eq!(page["items"][0]["title"], "Cromwell");

    let (_, page) = send(&app, Method::GET, "/books/search?query=BLAS", None, None).await;
    assert_eq!(page["items"][0]["title"], "Ruy Blas");
    assert_eq!(page["total"], 1);

    let (status, _) = send(&app, Method::GET, "/books?size=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/books?size=21", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
