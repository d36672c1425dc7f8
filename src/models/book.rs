//! Book model, request and presentation types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{author::Author, genre::Genre, not_blank, not_in_the_future};

/// Book record as stored. Author and genres are held by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author_id: Uuid,
    pub genre_ids: Vec<Uuid>,
    pub publication_date: NaiveDate,
    pub cover_image_url: Option<String>,
    pub synopsis: Option<String>,
}

impl Book {
    pub fn has_title(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.to_lowercase()
    }

    /// True when `title`/`author_id` would land on a different uniqueness key
    pub fn key_changes(&self, title: &str, author_id: Uuid) -> bool {
        !self.has_title(title) || self.author_id != author_id
    }
}

/// Create / update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub title: String,
    pub author_id: Uuid,
    /// Ids that do not match an existing genre are ignored
    #[serde(default)]
    pub genre_ids: Vec<Uuid>,
    #[validate(custom(function = "not_in_the_future"))]
    pub publication_date: NaiveDate,
    #[validate(url)]
    pub cover_image_url: Option<String>,
    #[validate(length(max = 5000))]
    pub synopsis: Option<String>,
}

impl BookRequest {
    /// Uniqueness key as reported in conflicts
    pub fn title_key(&self) -> String {
        format!("title: \"{}\" and author id: {}", self.title, self.author_id)
    }
}

/// Book as presented to clients: author and genres collapsed to names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    /// "firstName lastName"
    pub author: String,
    pub genres: Vec<String>,
    pub publication_date: NaiveDate,
    pub cover_image_url: Option<String>,
    pub synopsis: Option<String>,
}

impl BookResponse {
    /// Builds the presentation from a book and its resolved references.
    ///
    /// Genre names follow the book's genre order; ids absent from `genres`
    /// are skipped.
    pub fn from_parts(book: Book, author: &Author, genres: &[Genre]) -> Self {
        let genre_names = book
            .genre_ids
            .iter()
            .filter_map(|id| genres.iter().find(|g| g.id == *id))
            .map(|g| g.name.clone())
            .collect();

        Self {
            id: book.id,
            title: book.title,
            author: author.full_name(),
            genres: genre_names,
            publication_date: book.publication_date,
            cover_image_url: book.cover_image_url,
            synopsis: book.synopsis,
        }
    }
}
