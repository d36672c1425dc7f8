//! Author store on PostgreSQL

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::{map_write_error, AuthorStore, PgStore};
use crate::{
    error::{AppResult, Resource},
    models::author::{Author, AuthorRequest},
};

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, biography, birth_date";

#[async_trait]
impl AuthorStore for PgStore {
    async fn list(&self) -> AppResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, Author>(&format!(
            "SELECT {} FROM authors ORDER BY LOWER(last_name), LOWER(first_name), id",
            AUTHOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, Author>(&format!(
            "SELECT {} FROM authors WHERE id = $1",
            AUTHOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Author>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, Author>(&format!(
            "SELECT {} FROM authors WHERE id = ANY($1)",
            AUTHOR_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_identity(
        &self,
        first_name: &str,
        last_name: &str,
        birth_date: NaiveDate,
    ) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, Author>(&format!(
            r#"
            SELECT {} FROM authors
            WHERE LOWER(first_name) = LOWER($1)
              AND LOWER(last_name) = LOWER($2)
              AND birth_date = $3
            "#,
            AUTHOR_COLUMNS
        ))
        .bind(first_name)
        .bind(last_name)
        .bind(birth_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn search_by_full_name(&self, query: &str) -> AppResult<Vec<Author>> {
        // POSITION rather than LIKE so '%' and '_' in the query match literally
        let rows = sqlx::query_as::<_, Author>(&format!(
            r#"
            SELECT {} FROM authors
            WHERE POSITION(LOWER($1) IN LOWER(first_name || ' ' || last_name)) > 0
               OR POSITION(LOWER($1) IN LOWER(last_name || ' ' || first_name)) > 0
            ORDER BY LOWER(last_name), LOWER(first_name), id
            "#,
            AUTHOR_COLUMNS
        ))
        .bind(query)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, data: &AuthorRequest) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(&format!(
            r#"
            INSERT INTO authors (id, first_name, last_name, biography, birth_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.biography)
        .bind(data.birth_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Resource::Author, || data.identity_key()))
    }

    async fn update(&self, id: Uuid, data: &AuthorRequest) -> AppResult<Option<Author>> {
        sqlx::query_as::<_, Author>(&format!(
            r#"
            UPDATE authors
            SET first_name = $2, last_name = $3, biography = $4, birth_date = $5
            WHERE id = $1
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        ))
        .bind(id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.biography)
        .bind(data.birth_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Resource::Author, || data.identity_key()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, Resource::Author, || format!("id {}", id)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cascading(&self, id: Uuid) -> AppResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        // Row lock blocks concurrent book inserts, whose FK check needs a key-share lock
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM authors WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let books = sqlx::query("DELETE FROM books WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, Resource::Author, || format!("id {}", id)))?;

        tx.commit().await?;
        Ok(Some(books.rows_affected()))
    }
}
