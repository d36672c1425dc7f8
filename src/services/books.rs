//! Book catalog service: conflict detection, reference resolution and the
//! paged title / genre / author lookups.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Resource},
    models::{
        author::Author,
        book::{Book, BookRequest, BookResponse},
        genre::Genre,
        pagination::{Page, PageRequest},
        user::Principal,
    },
    repository::{BookFilter, Repository},
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn resolve_author(&self, author_id: Uuid) -> AppResult<Author> {
        self.repository
            .authors
            .get(author_id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Author, author_id))
    }

    /// Best-effort: ids that match no genre are dropped, not reported
    async fn resolve_genres(&self, genre_ids: &[Uuid]) -> AppResult<Vec<Genre>> {
        let found = self.repository.genres.find_by_ids(genre_ids).await?;
        if found.len() < genre_ids.len() {
            let dropped: Vec<&Uuid> = genre_ids
                .iter()
                .filter(|id| !found.iter().any(|g| g.id == **id))
                .collect();
            if !dropped.is_empty() {
                tracing::warn!("Ignoring unknown genre ids: {:?}", dropped);
            }
        }
        Ok(found)
    }

    /// The request as it will be stored: genre ids limited to the resolved ones,
    /// in submitted order
    fn resolved_request(data: &BookRequest, genres: &[Genre]) -> BookRequest {
        let genre_ids = data
            .genre_ids
            .iter()
            .copied()
            .filter(|id| genres.iter().any(|g| g.id == *id))
            .collect();
        BookRequest {
            genre_ids,
            ..data.clone()
        }
    }

    async fn ensure_unique(&self, data: &BookRequest) -> AppResult<()> {
        if self
            .repository
            .books
            .exists_by_title_and_author(&data.title, data.author_id)
            .await?
        {
            return Err(AppError::conflict(Resource::Book, data.title_key()));
        }
        Ok(())
    }

    fn present(book: Book, author: &Author, genres: &[Genre]) -> BookResponse {
        BookResponse::from_parts(book, author, genres)
    }

    /// Resolves the references of a whole page with one lookup per entity type
    async fn present_page(&self, page: Page<Book>) -> AppResult<Page<BookResponse>> {
        let author_ids: Vec<Uuid> = page
            .items
            .iter()
            .map(|b| b.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let genre_ids: Vec<Uuid> = page
            .items
            .iter()
            .flat_map(|b| b.genre_ids.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors = self.repository.authors.find_by_ids(&author_ids).await?;
        let genres = self.repository.genres.find_by_ids(&genre_ids).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for book in page.items {
            let author = authors
                .iter()
                .find(|a| a.id == book.author_id)
                .ok_or_else(|| {
                    AppError::Internal(format!("Book {} references missing author {}", book.id, book.author_id))
                })?;
            items.push(Self::present(book, author, &genres));
        }

        Ok(Page {
            items,
            total: page.total,
            page: page.page,
            size: page.size,
        })
    }

    async fn present_one(&self, book: Book) -> AppResult<BookResponse> {
        let author = self.resolve_author(book.author_id).await?;
        let genres = self.repository.genres.find_by_ids(&book.genre_ids).await?;
        Ok(Self::present(book, &author, &genres))
    }

    pub async fn create(&self, principal: &Principal, data: &BookRequest) -> AppResult<BookResponse> {
        let claims = principal.require_authenticated()?;

        let author = self.resolve_author(data.author_id).await?;
        let genres = self.resolve_genres(&data.genre_ids).await?;
        self.ensure_unique(data).await?;

        let book = self
            .repository
            .books
            .insert(&Self::resolved_request(data, &genres))
            .await?;
        tracing::info!("Book {} '{}' created by {}", book.id, book.title, claims.sub);
        Ok(Self::present(book, &author, &genres))
    }

    /// Replace every field of a book, genre set included.
    ///
    /// The title/author conflict lookup only runs when that pair changes.
    pub async fn update(&self, principal: &Principal, id: Uuid, data: &BookRequest) -> AppResult<BookResponse> {
        let claims = principal.require_authenticated()?;

        let current = self
            .repository
            .books
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Book, id))?;
        let author = self.resolve_author(data.author_id).await?;
        let genres = self.resolve_genres(&data.genre_ids).await?;

        if current.key_changes(&data.title, data.author_id) {
            self.ensure_unique(data).await?;
        }

        let book = self
            .repository
            .books
            .update(id, &Self::resolved_request(data, &genres))
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Book, id))?;
        tracing::info!("Book {} updated by {}", id, claims.sub);
        Ok(Self::present(book, &author, &genres))
    }

    pub async fn delete_by_id(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        let claims = principal.require_authenticated()?;

        if !self.repository.books.delete(id).await? {
            return Err(AppError::not_found(Resource::Book, id));
        }
        tracing::info!("Book {} deleted by {}", id, claims.sub);
        Ok(())
    }

    /// Exact title match, ignoring case
    pub async fn find_by_title(&self, title: &str) -> AppResult<BookResponse> {
        let book = self
            .repository
            .books
            .find_by_title(title)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Book, title))?;
        self.present_one(book).await
    }

    pub async fn find_all(&self, page: PageRequest) -> AppResult<Page<BookResponse>> {
        let books = self.repository.books.find_page(&BookFilter::All, page).await?;
        self.present_page(books).await
    }

    /// Books carrying a genre named `genre_name`, ignoring case. No match is an empty page.
    pub async fn find_by_genre(&self, genre_name: &str, page: PageRequest) -> AppResult<Page<BookResponse>> {
        let books = self
            .repository
            .books
            .find_page(&BookFilter::GenreName(genre_name.to_string()), page)
            .await?;
        self.present_page(books).await
    }

    /// Books by every author whose full name contains `author_name`
    pub async fn find_by_author(&self, author_name: &str, page: PageRequest) -> AppResult<Page<BookResponse>> {
        if author_name.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "authorName must not be empty".to_string(),
            ));
        }

        let authors = self.repository.authors.search_by_full_name(author_name).await?;
        if authors.is_empty() {
            return Err(AppError::not_found(Resource::Author, format!("\"{}\"", author_name)));
        }

        let author_ids = authors.iter().map(|a| a.id).collect();
        let books = self
            .repository
            .books
            .find_page(&BookFilter::AuthorIds(author_ids), page)
            .await?;
        self.present_page(books).await
    }

    /// Books whose title contains `partial_title`, ignoring case. An empty
    /// string matches every book.
    pub async fn search_by_title(&self, partial_title: &str, page: PageRequest) -> AppResult<Page<BookResponse>> {
        let books = self
            .repository
            .books
            .find_page(&BookFilter::TitleContains(partial_title.to_string()), page)
            .await?;
        self.present_page(books).await
    }
}
