//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod genre;
pub mod pagination;
pub mod user;

use chrono::{NaiveDate, Utc};
use validator::ValidationError;

// Re-export commonly used types
pub use author::{Author, AuthorRequest};
pub use book::{Book, BookRequest, BookResponse};
pub use genre::{Genre, GenreRequest};
pub use pagination::{Page, PageRequest};
pub use user::{Principal, User, UserClaims};

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Rejects strings made only of whitespace
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must not be blank"));
    }
    Ok(())
}

/// Date must be strictly before today
pub(crate) fn in_the_past(value: &NaiveDate) -> Result<(), ValidationError> {
    if *value >= Utc::now().date_naive() {
        return Err(invalid("past", "must be a date in the past"));
    }
    Ok(())
}

/// Date must be today or earlier
pub(crate) fn not_in_the_future(value: &NaiveDate) -> Result<(), ValidationError> {
    if *value > Utc::now().date_naive() {
        return Err(invalid("past_or_present", "must be a date in the past or in the present"));
    }
    Ok(())
}
