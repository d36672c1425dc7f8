//! Book store on PostgreSQL.
//!
//! Genre membership lives in `book_genres`; `position` keeps each book's
//! genre order as submitted.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{map_write_error, BookFilter, BookStore, PgStore};
use crate::{
    error::{AppResult, Resource},
    models::{
        book::{Book, BookRequest},
        pagination::{Page, PageRequest},
    },
};

const BOOK_COLUMNS: &str =
    "b.id, b.title, b.author_id, b.publication_date, b.cover_image_url, b.synopsis";

/// Book row without its genre set
#[derive(FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    author_id: Uuid,
    publication_date: NaiveDate,
    cover_image_url: Option<String>,
    synopsis: Option<String>,
}

impl BookRow {
    fn into_book(self, genre_ids: Vec<Uuid>) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author_id: self.author_id,
            genre_ids,
            publication_date: self.publication_date,
            cover_image_url: self.cover_image_url,
            synopsis: self.synopsis,
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    match filter {
        BookFilter::All => {}
        BookFilter::GenreName(name) => {
            builder.push(
                " WHERE EXISTS (SELECT 1 FROM book_genres bg JOIN genres g ON g.id = bg.genre_id \
                 WHERE bg.book_id = b.id AND LOWER(g.name) = LOWER(",
            );
            builder.push_bind(name.clone());
            builder.push("))");
        }
        BookFilter::AuthorIds(ids) => {
            builder.push(" WHERE b.author_id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        BookFilter::TitleContains(part) => {
            builder.push(" WHERE POSITION(LOWER(");
            builder.push_bind(part.clone());
            builder.push(") IN LOWER(b.title)) > 0");
        }
    }
}

impl PgStore {
    /// Attaches genre sets to a batch of book rows in one query
    async fn with_genres(&self, rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let links: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT book_id, genre_id FROM book_genres WHERE book_id = ANY($1) ORDER BY book_id, position",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_book: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (book_id, genre_id) in links {
            by_book.entry(book_id).or_default().push(genre_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let genres = by_book.remove(&row.id).unwrap_or_default();
                row.into_book(genres)
            })
            .collect())
    }

    /// Replaces the book's genre links, skipping ids with no genre row.
    /// Returns the ids actually linked, in order.
    async fn write_genres(
        tx: &mut Transaction<'_, Postgres>,
        book_id: Uuid,
        genre_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut **tx)
            .await?;
        let mut written: Vec<Uuid> = Vec::with_capacity(genre_ids.len());
        for genre_id in genre_ids {
            if written.contains(genre_id) {
                continue;
            }
            let result = sqlx::query(
                r#"
                INSERT INTO book_genres (book_id, genre_id, position)
                SELECT $1, id, $3 FROM genres WHERE id = $2
                "#,
            )
            .bind(book_id)
            .bind(genre_id)
            .bind(written.len() as i16)
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() > 0 {
                written.push(*genre_id);
            }
        }
        Ok(written)
    }

    async fn save_book(&self, id: Uuid, data: &BookRequest, is_new: bool) -> Result<Option<Book>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = if is_new {
            sqlx::query_as::<_, BookRow>(
                r#"
                INSERT INTO books (id, title, author_id, publication_date, cover_image_url, synopsis)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, title, author_id, publication_date, cover_image_url, synopsis
                "#,
            )
        } else {
            sqlx::query_as::<_, BookRow>(
                r#"
                UPDATE books
                SET title = $2, author_id = $3, publication_date = $4,
                    cover_image_url = $5, synopsis = $6
                WHERE id = $1
                RETURNING id, title, author_id, publication_date, cover_image_url, synopsis
                "#,
            )
        }
        .bind(id)
        .bind(&data.title)
        .bind(data.author_id)
        .bind(data.publication_date)
        .bind(&data.cover_image_url)
        .bind(&data.synopsis)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let genre_ids = Self::write_genres(&mut tx, id, &data.genre_ids).await?;
        tx.commit().await?;

        Ok(Some(row.into_book(genre_ids)))
    }
}

#[async_trait]
impl BookStore for PgStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books b WHERE b.id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(self.with_genres(row.into_iter().collect()).await?.pop())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books b WHERE LOWER(b.title) = LOWER($1) ORDER BY b.id LIMIT 1",
            BOOK_COLUMNS
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(self.with_genres(row.into_iter().collect()).await?.pop())
    }

    async fn exists_by_title_and_author(&self, title: &str, author_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM books WHERE LOWER(title) = LOWER($1) AND author_id = $2)",
        )
        .bind(title)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_page(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM books b", BOOK_COLUMNS));
        push_filter(&mut select, filter);
        select.push(" ORDER BY LOWER(b.title), b.id LIMIT ");
        select.push_bind(page.size as i64);
        select.push(" OFFSET ");
        select.push_bind(page.offset() as i64);
        let rows: Vec<BookRow> = select.build_query_as::<BookRow>().fetch_all(&self.pool).await?;

        Ok(Page {
            items: self.with_genres(rows).await?,
            total: total as u64,
            page: page.page,
            size: page.size,
        })
    }

    async fn insert(&self, data: &BookRequest) -> AppResult<Book> {
        let book = self
            .save_book(Uuid::new_v4(), data, true)
            .await
            .map_err(|e| map_write_error(e, Resource::Book, || data.title_key()))?;
        book.ok_or_else(|| crate::error::AppError::Internal("Book insert returned no row".to_string()))
    }

    async fn update(&self, id: Uuid, data: &BookRequest) -> AppResult<Option<Book>> {
        self.save_book(id, data, false)
            .await
            .map_err(|e| map_write_error(e, Resource::Book, || data.title_key()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_author(&self, author_id: Uuid) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_by_genre(&self, genre_id: Uuid) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_genres WHERE genre_id = $1")
            .bind(genre_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
