//! Repository layer: entity store contracts and their backends
//!
//! Catalog services only see the store traits below. Two backends implement
//! them: [`PgStore`] on PostgreSQL and [`memory::MemoryStore`] in process.
//! Both enforce the catalog uniqueness rules themselves, so a write that
//! slips past a service-level existence check still fails with a conflict.

pub mod authors;
pub mod books;
pub mod genres;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Resource},
    models::{
        author::{Author, AuthorRequest},
        book::{Book, BookRequest},
        genre::{Genre, GenreRequest},
        pagination::{Page, PageRequest},
        user::User,
    },
};

/// Selection applied to paged book listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookFilter {
    All,
    /// Books carrying a genre with this name, ignoring case
    GenreName(String),
    /// Books written by any of these authors
    AuthorIds(Vec<Uuid>),
    /// Books whose title contains this text, ignoring case
    TitleContains(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Author>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Author>>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Author>>;
    /// Author with these names (ignoring case) and this exact birth date
    async fn find_by_identity(
        &self,
        first_name: &str,
        last_name: &str,
        birth_date: NaiveDate,
    ) -> AppResult<Option<Author>>;
    async fn search_by_full_name(&self, query: &str) -> AppResult<Vec<Author>>;
    async fn insert(&self, data: &AuthorRequest) -> AppResult<Author>;
    /// Returns `None` when no author has this id
    async fn update(&self, id: Uuid, data: &AuthorRequest) -> AppResult<Option<Author>>;
    /// Returns whether a row was removed. Refused with a conflict while books reference the author.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    /// Removes the author and all of its books as one unit.
    /// Returns the number of books removed, or `None` when no author has this id.
    async fn delete_cascading(&self, id: Uuid) -> AppResult<Option<u64>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenreStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Genre>>;
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Genre>>;
    /// Genres among `ids` that exist; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Genre>>;
    async fn insert(&self, data: &GenreRequest) -> AppResult<Genre>;
    async fn update(&self, id: Uuid, data: &GenreRequest) -> AppResult<Option<Genre>>;
    /// Refused with a conflict while books carry the genre
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    /// Drops the genre from every book's genre set and removes it, as one unit.
    /// Returns the number of books touched, or `None` when no genre has this id.
    async fn delete_detaching(&self, id: Uuid) -> AppResult<Option<u64>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>>;
    /// First book, in listing order, whose title equals `title` ignoring case
    async fn find_by_title(&self, title: &str) -> AppResult<Option<Book>>;
    async fn exists_by_title_and_author(&self, title: &str, author_id: Uuid) -> AppResult<bool>;
    /// Ordered by title (ignoring case) then id
    async fn find_page(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>>;
    /// Genre ids that no longer match a genre are dropped, not rejected
    async fn insert(&self, data: &BookRequest) -> AppResult<Book>;
    async fn update(&self, id: Uuid, data: &BookRequest) -> AppResult<Option<Book>>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    async fn count_by_author(&self, author_id: Uuid) -> AppResult<u64>;
    async fn count_by_genre(&self, genre_id: Uuid) -> AppResult<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Lookup ignores case
    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>>;
    async fn insert(&self, login: &str, password_hash: &str, roles: &[String]) -> AppResult<User>;
}

/// PostgreSQL-backed store; the trait impls live in the per-entity modules
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Turns constraint violations on writes into catalog conflicts.
///
/// Unique indexes back the duplicate rules; foreign keys back the delete
/// policies. Anything else stays an opaque database failure.
pub(crate) fn map_write_error(err: sqlx::Error, resource: Resource, key: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return AppError::conflict(resource, key());
        }
        if db.is_foreign_key_violation() {
            return AppError::conflict(resource, format!("{} still referenced or referencing a missing record", key()));
        }
    }
    AppError::Database(err)
}

/// Main repository: one handle per entity store
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorStore>,
    pub genres: Arc<dyn GenreStore>,
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
    pool: Option<Pool<Postgres>>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self {
            authors: store.clone(),
            genres: store.clone(),
            books: store.clone(),
            users: store,
            pool: Some(pool),
        }
    }

    /// Repository over a fresh, empty in-process store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            authors: store.clone(),
            genres: store.clone(),
            books: store.clone(),
            users: store,
            pool: None,
        }
    }

    /// Repository over arbitrary store implementations
    pub fn from_stores(
        authors: Arc<dyn AuthorStore>,
        genres: Arc<dyn GenreStore>,
        books: Arc<dyn BookStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            authors,
            genres,
            books,
            users,
            pool: None,
        }
    }

    /// Name of the backing store, for readiness reporting
    pub fn backend(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    /// Checks that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
