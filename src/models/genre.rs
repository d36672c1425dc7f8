//! Genre model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::not_blank;

/// Genre record, unique by name ignoring case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl Genre {
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Create / update genre request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenreRequest {
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

impl GenreRequest {
    /// Uniqueness key as reported in conflicts
    pub fn name_key(&self) -> String {
        format!("name: {}", self.name)
    }
}
