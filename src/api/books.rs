//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{BookRequest, BookResponse},
        pagination::Page,
        user::Principal,
    },
    AppState,
};

use super::PageParams;

/// One page of books
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub items: Vec<BookResponse>,
    /// Number of books across all pages
    pub total: u64,
    /// Zero-based page index
    pub page: u32,
    pub size: u32,
    pub total_pages: u64,
}

impl From<Page<BookResponse>> for BookPage {
    fn from(page: Page<BookResponse>) -> Self {
        let total_pages = page.total_pages();
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            size: page.size,
            total_pages,
        }
    }
}

/// Title search parameters
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Part of the title; absent or empty matches every book
    pub query: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// List books, ordered by title
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(PageParams),
    responses(
        (status = 200, description = "One page of books", body = BookPage),
        (status = 400, description = "Invalid paging", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<BookPage>> {
    let page = params.to_request(&state, state.config.catalog.default_page_size)?;
    let books = state.services.books.find_all(page).await?;
    Ok(Json(books.into()))
}

/// Get a book by exact title, ignoring case
#[utoipa::path(
    get,
    path = "/books/{key}",
    tag = "books",
    params(
        ("key" = String, Path, description = "Book title, case-insensitive")
    ),
    responses(
        (status = 200, description = "Book details", body = BookResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book_by_title(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> AppResult<Json<BookResponse>> {
    let book = state.services.books.find_by_title(&title).await?;
    Ok(Json(book))
}

/// Books carrying a genre
#[utoipa::path(
    get,
    path = "/books/genre/{genre}",
    tag = "books",
    params(
        ("genre" = String, Path, description = "Genre name, case-insensitive"),
        PageParams
    ),
    responses(
        (status = 200, description = "One page of books", body = BookPage),
        (status = 400, description = "Invalid paging", body = crate::error::ErrorResponse)
    )
)]
pub async fn books_by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<BookPage>> {
    let page = params.to_request(&state, state.config.catalog.default_page_size)?;
    let books = state.services.books.find_by_genre(&genre, page).await?;
    Ok(Json(books.into()))
}

/// Books by every author whose full name contains `name`
#[utoipa::path(
    get,
    path = "/books/author/{name}",
    tag = "books",
    params(
        ("name" = String, Path, description = "Part of the author's full name"),
        PageParams
    ),
    responses(
        (status = 200, description = "One page of books", body = BookPage),
        (status = 400, description = "Blank name or invalid paging", body = crate::error::ErrorResponse),
        (status = 404, description = "No matching author", body = crate::error::ErrorResponse)
    )
)]
pub async fn books_by_author(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<BookPage>> {
    let page = params.to_request(&state, state.config.catalog.default_page_size)?;
    let books = state.services.books.find_by_author(&name, page).await?;
    Ok(Json(books.into()))
}

/// Search books by partial title
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    params(SearchParams),
    responses(
        (status = 200, description = "One page of matching books", body = BookPage),
        (status = 400, description = "Invalid paging", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<BookPage>> {
    let paging = PageParams {
        page: params.page,
        size: params.size,
    };
    let page = paging.to_request(&state, state.config.catalog.search_page_size)?;
    let query = params.query.as_deref().unwrap_or("");
    let books = state.services.books.search_by_title(query, page).await?;
    Ok(Json(books.into()))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Author already has a book with this title", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    principal: Principal,
    Json(data): Json<BookRequest>,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    principal.require_authenticated()?;
    data.validate()?;

    let created = state.services.books.create(&principal, &data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace an existing book
#[utoipa::path(
    put,
    path = "/books/{key}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("key" = Uuid, Path, description = "Book ID")
    ),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Author already has a book with this title", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(data): Json<BookRequest>,
) -> AppResult<Json<BookResponse>> {
    principal.require_authenticated()?;
    data.validate()?;

    let updated = state.services.books.update(&principal, id, &data).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{key}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("key" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.books.delete_by_id(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
