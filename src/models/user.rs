//! User accounts, JWT claims and the caller principal

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// Account allowed to log in and perform catalog writes
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    /// Argon2 PHC string
    pub password: String,
    pub roles: Vec<String>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: Uuid,
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// Identity of the caller, passed explicitly to every mutating catalog call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Authenticated(UserClaims),
}

impl Principal {
    /// Access gate for catalog writes: only an authenticated caller gets through.
    pub fn require_authenticated(&self) -> Result<&UserClaims, AppError> {
        match self {
            Principal::Authenticated(claims) => Ok(claims),
            Principal::Anonymous => {
                tracing::warn!("Refused catalog write from an anonymous caller");
                Err(AppError::Unauthorized(
                    "Authentication is required to modify the catalog".to_string(),
                ))
            }
        }
    }
}
