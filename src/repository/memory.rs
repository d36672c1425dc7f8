//! In-memory entity store.
//!
//! All entities live in one arena behind a single [`RwLock`], so every
//! uniqueness check runs under the same write lock as the write it guards.
//! `IndexMap` keeps insertion order, which gives listings a stable
//! enumeration order. State is lost when the process exits.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use uuid::Uuid;

use super::{AuthorStore, BookFilter, BookStore, GenreStore, UserStore};
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

#[derive(Debug, Default)]
struct Arena {
    authors: IndexMap<Uuid, Author>,
    genres: IndexMap<Uuid, Genre>,
    books: IndexMap<Uuid, Book>,
    users: IndexMap<Uuid, User>,
}

impl Arena {
    fn author_taken(&self, data: &AuthorRequest, except: Option<Uuid>) -> bool {
        self.authors.values().any(|a| {
            Some(a.id) != except && a.has_identity(&data.first_name, &data.last_name, data.birth_date)
        })
    }

    fn genre_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.genres
            .values()
            .any(|g| Some(g.id) != except && g.has_name(name))
    }

    fn book_taken(&self, data: &BookRequest, except: Option<Uuid>) -> bool {
        self.books.values().any(|b| {
            Some(b.id) != except && b.author_id == data.author_id && b.has_title(&data.title)
        })
    }

    /// Author foreign-key check a relational backend would apply to a book row
    fn check_book_author(&self, data: &BookRequest) -> AppResult<()> {
        if !self.authors.contains_key(&data.author_id) {
            return Err(AppError::not_found(Resource::Author, data.author_id));
        }
        Ok(())
    }

    /// Builds the stored book, keeping only genre ids that still exist, deduplicated in order
    fn book_from_request(&self, id: Uuid, data: &BookRequest) -> Book {
        let mut genre_ids: Vec<Uuid> = Vec::with_capacity(data.genre_ids.len());
        for genre_id in &data.genre_ids {
            if self.genres.contains_key(genre_id) && !genre_ids.contains(genre_id) {
                genre_ids.push(*genre_id);
            }
        }
        Book {
            id,
            title: data.title.clone(),
            author_id: data.author_id,
            genre_ids,
            publication_date: data.publication_date,
            cover_image_url: data.cover_image_url.clone(),
            synopsis: data.synopsis.clone(),
        }
    }

    fn matches(&self, book: &Book, filter: &BookFilter) -> bool {
        match filter {
            BookFilter::All => true,
            BookFilter::GenreName(name) => book.genre_ids.iter().any(|id| {
                self.genres
                    .get(id)
                    .map(|g| g.has_name(name))
                    .unwrap_or(false)
            }),
            BookFilter::AuthorIds(ids) => ids.contains(&book.author_id),
            BookFilter::TitleContains(part) => {
                book.title.to_lowercase().contains(&part.to_lowercase())
            }
        }
    }

    /// Same ordering as the relational backend: title ignoring case, then id
    fn sorted_books<'a>(&'a self, filter: &BookFilter) -> Vec<&'a Book> {
        let mut books: Vec<&Book> = self
            .books
            .values()
            .filter(|b| self.matches(b, filter))
            .collect();
        books.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        books
    }
}

/// Converts a lock poison error to a store failure.
fn poison_err<T>(_: PoisonError<T>) -> AppError {
    AppError::Store("in-memory store lock poisoned".to_string())
}

/// Thread-safe in-process store implementing every entity store trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    arena: RwLock<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Author>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena.authors.values().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Author>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena.authors.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Author>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(ids.iter().filter_map(|id| arena.authors.get(id).cloned()).collect())
    }

    async fn find_by_identity(
        &self,
        first_name: &str,
        last_name: &str,
        birth_date: NaiveDate,
    ) -> AppResult<Option<Author>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena
            .authors
            .values()
            .find(|a| a.has_identity(first_name, last_name, birth_date))
            .cloned())
    }

    async fn search_by_full_name(&self, query: &str) -> AppResult<Vec<Author>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena
            .authors
            .values()
            .filter(|a| a.matches_full_name(query))
            .cloned()
            .collect())
    }

    async fn insert(&self, data: &AuthorRequest) -> AppResult<Author> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if arena.author_taken(data, None) {
            return Err(AppError::conflict(Resource::Author, data.identity_key()));
        }
        let author = Author {
            id: Uuid::new_v4(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            biography: data.biography.clone(),
            birth_date: data.birth_date,
        };
        arena.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update(&self, id: Uuid, data: &AuthorRequest) -> AppResult<Option<Author>> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if !arena.authors.contains_key(&id) {
            return Ok(None);
        }
        if arena.author_taken(data, Some(id)) {
            return Err(AppError::conflict(Resource::Author, data.identity_key()));
        }
        let Some(author) = arena.authors.get_mut(&id) else {
            return Ok(None);
        };
        author.first_name = data.first_name.clone();
        author.last_name = data.last_name.clone();
        author.biography = data.biography.clone();
        author.birth_date = data.birth_date;
        Ok(Some(author.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if arena.books.values().any(|b| b.author_id == id) {
            return Err(AppError::conflict(
                Resource::Author,
                format!("id {} still referenced by books", id),
            ));
        }
        Ok(arena.authors.shift_remove(&id).is_some())
    }

    async fn delete_cascading(&self, id: Uuid) -> AppResult<Option<u64>> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if arena.authors.shift_remove(&id).is_none() {
            return Ok(None);
        }
        let before = arena.books.len();
        arena.books.retain(|_, b| b.author_id != id);
        Ok(Some((before - arena.books.len()) as u64))
    }
}

#[async_trait]
impl GenreStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Genre>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena.genres.values().cloned().collect())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena.genres.values().find(|g| g.has_name(name)).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Genre>> {
        let arena = self.arena.read().map_err(poison_err)?;
        let mut found: Vec<Genre> = Vec::new();
        for id in ids {
            if let Some(genre) = arena.genres.get(id) {
                if !found.iter().any(|g| g.id == genre.id) {
                    found.push(genre.clone());
                }
            }
        }
        Ok(found)
    }

    async fn insert(&self, data: &GenreRequest) -> AppResult<Genre> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if arena.genre_taken(&data.name, None) {
            return Err(AppError::conflict(Resource::Genre, data.name_key()));
        }
        let genre = Genre {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            description: data.description.clone(),
        };
        arena.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn update(&self, id: Uuid, data: &GenreRequest) -> AppResult<Option<Genre>> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if !arena.genres.contains_key(&id) {
            return Ok(None);
        }
        if arena.genre_taken(&data.name, Some(id)) {
            return Err(AppError::conflict(Resource::Genre, data.name_key()));
        }
        let Some(genre) = arena.genres.get_mut(&id) else {
            return Ok(None);
        };
        genre.name = data.name.clone();
        genre.description = data.description.clone();
        Ok(Some(genre.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if arena.books.values().any(|b| b.genre_ids.contains(&id)) {
            return Err(AppError::conflict(
                Resource::Genre,
                format!("id {} still referenced by books", id),
            ));
        }
        Ok(arena.genres.shift_remove(&id).is_some())
    }

    async fn delete_detaching(&self, id: Uuid) -> AppResult<Option<u64>> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if arena.genres.shift_remove(&id).is_none() {
            return Ok(None);
        }
        let mut touched = 0;
        for book in arena.books.values_mut() {
            let before = book.genre_ids.len();
            book.genre_ids.retain(|genre_id| *genre_id != id);
            if book.genre_ids.len() != before {
                touched += 1;
            }
        }
        Ok(Some(touched))
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena.books.get(&id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena
            .sorted_books(&BookFilter::All)
            .into_iter()
            .find(|b| b.has_title(title))
            .cloned())
    }

    async fn exists_by_title_and_author(&self, title: &str, author_id: Uuid) -> AppResult<bool> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena
            .books
            .values()
            .any(|b| b.author_id == author_id && b.has_title(title)))
    }

    async fn find_page(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        let arena = self.arena.read().map_err(poison_err)?;
        let books: Vec<Book> = arena.sorted_books(filter).into_iter().cloned().collect();
        Ok(page.slice(&books))
    }

    async fn insert(&self, data: &BookRequest) -> AppResult<Book> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        arena.check_book_author(data)?;
        if arena.book_taken(data, None) {
            return Err(AppError::conflict(Resource::Book, data.title_key()));
        }
        let book = arena.book_from_request(Uuid::new_v4(), data);
        arena.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: Uuid, data: &BookRequest) -> AppResult<Option<Book>> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        if !arena.books.contains_key(&id) {
            return Ok(None);
        }
        arena.check_book_author(data)?;
        if arena.book_taken(data, Some(id)) {
            return Err(AppError::conflict(Resource::Book, data.title_key()));
        }
        let book = arena.book_from_request(id, data);
        arena.books.insert(id, book.clone());
        Ok(Some(book))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        Ok(arena.books.shift_remove(&id).is_some())
    }

    async fn count_by_author(&self, author_id: Uuid) -> AppResult<u64> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena.books.values().filter(|b| b.author_id == author_id).count() as u64)
    }

    async fn count_by_genre(&self, genre_id: Uuid) -> AppResult<u64> {
        let arena = self.arena.read().map_err(poison_err)?;
        Ok(arena
            .books
            .values()
            .filter(|b| b.genre_ids.contains(&genre_id))
            .count() as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let arena = self.arena.read().map_err(poison_err)?;
        let login = login.to_lowercase();
        Ok(arena
            .users
            .values()
            .find(|u| u.login.to_lowercase() == login)
            .cloned())
    }

    async fn insert(&self, login: &str, password_hash: &str, roles: &[String]) -> AppResult<User> {
        let mut arena = self.arena.write().map_err(poison_err)?;
        let lowered = login.to_lowercase();
        if arena.users.values().any(|u| u.login.to_lowercase() == lowered) {
            return Err(AppError::conflict(Resource::User, format!("login: {}", login)));
        }
        let user = User {
            id: Uuid::new_v4(),
            login: login.to_string(),
            password: password_hash.to_string(),
            roles: roles.to_vec(),
        };
        arena.users.insert(user.id, user.clone());
        Ok(user)
    }
}
