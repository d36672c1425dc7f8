//! Genre catalog service. Genres are addressed by name, ignoring case.

use crate::{
    config::ReferencePolicy,
    error::{AppError, AppResult, Resource},
    models::{
        genre::{Genre, GenreRequest},
        user::Principal,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct GenresService {
    repository: Repository,
    delete_policy: ReferencePolicy,
}

impl GenresService {
    pub fn new(repository: Repository, delete_policy: ReferencePolicy) -> Self {
        Self {
            repository,
            delete_policy,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Genre> {
        self.repository
            .genres
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Genre, name))
    }

    pub async fn create(&self, principal: &Principal, data: &GenreRequest) -> AppResult<Genre> {
        let claims = principal.require_authenticated()?;

        if self.repository.genres.find_by_name(&data.name).await?.is_some() {
            return Err(AppError::conflict(Resource::Genre, data.name_key()));
        }

        let genre = self.repository.genres.insert(data).await?;
        tracing::info!("Genre '{}' created by {}", genre.name, claims.sub);
        Ok(genre)
    }

    /// Rename and/or redescribe the genre currently called `name`.
    /// The new name is not checked against other genres here.
    pub async fn update(&self, principal: &Principal, name: &str, data: &GenreRequest) -> AppResult<Genre> {
        let claims = principal.require_authenticated()?;

        let current = self.get_by_name(name).await?;
        let genre = self
            .repository
            .genres
            .update(current.id, data)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Genre, name))?;
        tracing::info!("Genre '{}' updated to '{}' by {}", name, genre.name, claims.sub);
        Ok(genre)
    }

    /// Delete a genre, applying the configured policy to books that carry it
    pub async fn delete(&self, principal: &Principal, name: &str) -> AppResult<()> {
        let claims = principal.require_authenticated()?;

        let genre = self.get_by_name(name).await?;

        match self.delete_policy {
            ReferencePolicy::Restrict => {
                let books = self.repository.books.count_by_genre(genre.id).await?;
                if books > 0 {
                    return Err(AppError::conflict(
                        Resource::Genre,
                        format!("name {} referenced by {} book(s)", genre.name, books),
                    ));
                }
                if !self.repository.genres.delete(genre.id).await? {
                    return Err(AppError::not_found(Resource::Genre, name));
                }
            }
            ReferencePolicy::Cascade => {
                let detached = self
                    .repository
                    .genres
                    .delete_detaching(genre.id)
                    .await?
                    .ok_or_else(|| AppError::not_found(Resource::Genre, name))?;
                tracing::info!("Genre '{}' removed from {} book(s)", genre.name, detached);
            }
        }
        tracing::info!("Genre '{}' deleted by {}", genre.name, claims.sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        models::{author::AuthorRequest, book::BookRequest},
        services::testing::librarian,
    };

    fn genre(name: &str) -> GenreRequest {
        GenreRequest {
            name: name.into(),
            description: Some(format!("{} books", name)),
        }
    }

    fn service(policy: ReferencePolicy) -> GenresService {
        GenresService::new(Repository::in_memory(), policy)
    }

    /// Stores a book carrying `genre`, returning the book id
    async fn tag_book(service: &GenresService, genre: &Genre) -> uuid::Uuid {
        let author = service
            .repository
            .authors
            .insert(&AuthorRequest {
                first_name: "Victor".into(),
                last_name: "Hugo".into(),
                biography: None,
                birth_date: NaiveDate::from_ymd_opt(1802, 2, 26).unwrap(),
            })
            .await
            .unwrap();
        service
            .repository
            .books
            .insert(&BookRequest {
                title: "Hernani".into(),
                author_id: author.id,
                genre_ids: vec![genre.id],
                publication_date: NaiveDate::from_ymd_opt(1830, 2, 25).unwrap(),
                cover_image_url: None,
                synopsis: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_ignoring_case() {
        let service = service(ReferencePolicy::Cascade);
        service.create(&librarian(), &genre("Science Fiction")).await.unwrap();

        let err = service
            .create(&librarian(), &genre("science FICTION"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_by_name_ignoring_case() {
        let service = service(ReferencePolicy::Cascade);
        let created = service.create(&librarian(), &genre("Poetry")).await.unwrap();

        let updated = service
            .update(&librarian(), "POETRY", &genre("Verse"))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Verse");
        assert_eq!(updated.description.as_deref(), Some("Verse books"));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_name() {
        let service = service(ReferencePolicy::Cascade);
        assert!(service
            .update(&librarian(), "Nope", &genre("Nope"))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(service
            .delete(&librarian(), "Nope")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_anonymous_cannot_create() {
        let service = service(ReferencePolicy::Cascade);
        let err = service
            .create(&Principal::Anonymous, &genre("Poetry"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_cascade_drops_genre_from_books() {
        let service = service(ReferencePolicy::Cascade);
        let drama = service.create(&librarian(), &genre("Drama")).await.unwrap();
        let book_id = tag_book(&service, &drama).await;

        service.delete(&librarian(), "drama").await.unwrap();

        assert!(service.list().await.unwrap().is_empty());
        let book = service.repository.books.get(book_id).await.unwrap().unwrap();
        assert!(book.genre_ids.is_empty());
    }

    #[tokio::test]
    async fn test_restrict_keeps_referenced_genre() {
        let service = service(ReferencePolicy::Restrict);
        let drama = service.create(&librarian(), &genre("Drama")).await.unwrap();
        tag_book(&service, &drama).await;

        let err = service.delete(&librarian(), "Drama").await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(service.list().await.unwrap().len(), 1);
    }
}
