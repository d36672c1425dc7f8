//! Genre endpoints; single genres are addressed by name

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        genre::{Genre, GenreRequest},
        user::Principal,
    },
    AppState,
};

/// List every genre
#[utoipa::path(
    get,
    path = "/genres",
    tag = "genres",
    responses(
        (status = 200, description = "All genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.services.genres.list().await?;
    Ok(Json(genres))
}

/// Create a new genre
#[utoipa::path(
    post,
    path = "/genres",
    tag = "genres",
    security(("bearer_auth" = [])),
    request_body = GenreRequest,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 409, description = "Genre already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    principal: Principal,
    Json(data): Json<GenreRequest>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    principal.require_authenticated()?;
    data.validate()?;

    let created = state.services.genres.create(&principal, &data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Rename or redescribe a genre
#[utoipa::path(
    put,
    path = "/genres/{name}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(
        ("name" = String, Path, description = "Current genre name, case-insensitive")
    ),
    request_body = GenreRequest,
    responses(
        (status = 200, description = "Genre updated", body = Genre),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Genre not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_genre(
    State(state): State<AppState>,
    principal: Principal,
    Path(name): Path<String>,
    Json(data): Json<GenreRequest>,
) -> AppResult<Json<Genre>> {
    principal.require_authenticated()?;
    data.validate()?;

    let updated = state.services.genres.update(&principal, &name, &data).await?;
    Ok(Json(updated))
}

/// Delete a genre
#[utoipa::path(
    delete,
    path = "/genres/{name}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(
        ("name" = String, Path, description = "Genre name, case-insensitive")
    ),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Genre not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Genre still carried by books", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    principal: Principal,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.services.genres.delete(&principal, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
