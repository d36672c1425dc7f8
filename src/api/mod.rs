//! API handlers for the library catalog REST endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod genres;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
    RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    models::{pagination::PageRequest, user::Principal},
    AppState,
};

/// Resolves the caller from an `Authorization: Bearer` header.
///
/// Never rejects: a missing or unusable token yields [`Principal::Anonymous`],
/// and the services decide whether that is enough.
#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Ok(TypedHeader(Authorization(bearer))) =
            parts.extract::<TypedHeader<Authorization<Bearer>>>().await
        else {
            return Ok(Principal::Anonymous);
        };

        match state.services.auth.verify_token(bearer.token()) {
            Ok(claims) => Ok(Principal::Authenticated(claims)),
            Err(e) => {
                tracing::debug!("Ignoring bearer token: {}", e);
                Ok(Principal::Anonymous)
            }
        }
    }
}

/// Zero-based paging parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page index, starting at 0
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
}

impl PageParams {
    /// Applies `default_size` when absent and bounds the size by the configured maximum
    pub fn to_request(&self, state: &AppState, default_size: u32) -> AppResult<PageRequest> {
        let size = self.size.unwrap_or(default_size);
        let max = state.config.catalog.max_page_size;
        if size > max {
            return Err(AppError::InvalidArgument(format!(
                "Page size must not be greater than {}",
                max
            )));
        }
        PageRequest::new(self.page.unwrap_or(0), size)
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Accounts
        .route("/accounts/login", post(auth::login))
        // Authors
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        // Genres
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/:name",
            put(genres::update_genre).delete(genres::delete_genre),
        )
        // Books; GET on the single segment is a title lookup, PUT/DELETE take an id
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/search", get(books::search_books))
        .route("/books/genre/:genre", get(books::books_by_genre))
        .route("/books/author/:name", get(books::books_by_author))
        .route(
            "/books/:key",
            get(books::get_book_by_title)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
