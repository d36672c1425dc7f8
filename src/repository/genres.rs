//! Genre store on PostgreSQL

use async_trait::async_trait;
use uuid::Uuid;

use super::{map_write_error, GenreStore, PgStore};
use crate::{
    error::{AppResult, Resource},
    models::genre::{Genre, GenreRequest},
};

#[async_trait]
impl GenreStore for PgStore {
    async fn list(&self) -> AppResult<Vec<Genre>> {
        let rows = sqlx::query_as::<_, Genre>(
            "SELECT id, name, description FROM genres ORDER BY LOWER(name)",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let row = sqlx::query_as::<_, Genre>(
            "SELECT id, name, description FROM genres WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Genre>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, Genre>(
            "SELECT id, name, description FROM genres WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, data: &GenreRequest) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>(
            r#"
            INSERT INTO genres (id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, description
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Resource::Genre, || data.name_key()))
    }

    async fn update(&self, id: Uuid, data: &GenreRequest) -> AppResult<Option<Genre>> {
        sqlx::query_as::<_, Genre>(
            r#"
            UPDATE genres SET name = $2, description = $3
            WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Resource::Genre, || data.name_key()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, Resource::Genre, || format!("id {}", id)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_detaching(&self, id: Uuid) -> AppResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM genres WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let links = sqlx::query("DELETE FROM book_genres WHERE genre_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, Resource::Genre, || format!("id {}", id)))?;

        tx.commit().await?;
        Ok(Some(links.rows_affected()))
    }
}
