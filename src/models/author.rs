//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{in_the_past, not_blank};

/// Author record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub biography: Option<String>,
    pub birth_date: NaiveDate,
}

impl Author {
    /// Display name, "first last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether `query` occurs, ignoring case, in "first last" or in "last first".
    ///
    /// The query is matched as one substring: "hugo jules" does not match
    /// "Jules Verne" even though both words occur in some author name.
    pub fn matches_full_name(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let first = self.first_name.to_lowercase();
        let last = self.last_name.to_lowercase();
        format!("{} {}", first, last).contains(&query)
            || format!("{} {}", last, first).contains(&query)
    }

    /// Identity used for duplicate detection: names ignore case, birth date is exact
    pub fn has_identity(&self, first_name: &str, last_name: &str, birth_date: NaiveDate) -> bool {
        self.birth_date == birth_date
            && self.first_name.to_lowercase() == first_name.to_lowercase()
            && self.last_name.to_lowercase() == last_name.to_lowercase()
    }
}

/// Create / update author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRequest {
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub first_name: String,
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub last_name: String,
    #[validate(length(max = 2000))]
    pub biography: Option<String>,
    /// Must be strictly in the past
    #[validate(custom(function = "in_the_past"))]
    pub birth_date: NaiveDate,
}

impl AuthorRequest {
    /// Uniqueness key as reported in conflicts
    pub fn identity_key(&self) -> String {
        format!(
            "name: {} {} and birth date: {}",
            self.first_name, self.last_name, self.birth_date
        )
    }
}
