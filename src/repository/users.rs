//! User accounts on PostgreSQL

use async_trait::async_trait;
use uuid::Uuid;

use super::{map_write_error, PgStore, UserStore};
use crate::{
    error::{AppResult, Resource},
    models::user::User,
};

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, login, password, roles FROM users WHERE LOWER(login) = LOWER($1)",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, login: &str, password_hash: &str, roles: &[String]) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, login, password, roles)
            VALUES ($1, $2, $3, $4)
            RETURNING id, login, password, roles
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(login)
        .bind(password_hash)
        .bind(roles.to_vec())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Resource::User, || format!("login: {}", login)))
    }
}
