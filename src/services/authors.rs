//! Author catalog service

use uuid::Uuid;

use crate::{
    config::ReferencePolicy,
    error::{AppError, AppResult, Resource},
    models::{
        author::{Author, AuthorRequest},
        user::Principal,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
    delete_policy: ReferencePolicy,
}

impl AuthorsService {
    pub fn new(repository: Repository, delete_policy: ReferencePolicy) -> Self {
        Self {
            repository,
            delete_policy,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Author> {
        self.repository
            .authors
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Author, id))
    }

    /// Create an author unless one with the same names (ignoring case) and
    /// birth date exists
    pub async fn create(&self, principal: &Principal, data: &AuthorRequest) -> AppResult<Author> {
        let claims = principal.require_authenticated()?;

        if self
            .repository
            .authors
            .find_by_identity(&data.first_name, &data.last_name, data.birth_date)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(Resource::Author, data.identity_key()));
        }

        let author = self.repository.authors.insert(data).await?;
        tracing::info!("Author {} created by {}", author.id, claims.sub);
        Ok(author)
    }

    /// Replace every field of an author.
    ///
    /// No duplicate lookup runs here; only the store's own uniqueness rule
    /// can refuse the write.
    pub async fn update(&self, principal: &Principal, id: Uuid, data: &AuthorRequest) -> AppResult<Author> {
        let claims = principal.require_authenticated()?;

        let author = self
            .repository
            .authors
            .update(id, data)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Author, id))?;
        tracing::info!("Author {} updated by {}", id, claims.sub);
        Ok(author)
    }

    /// Delete an author, applying the configured policy to its books
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        let claims = principal.require_authenticated()?;

        self.get_by_id(id).await?;

        match self.delete_policy {
            ReferencePolicy::Restrict => {
                let books = self.repository.books.count_by_author(id).await?;
                if books > 0 {
                    return Err(AppError::conflict(
                        Resource::Author,
                        format!("id {} referenced by {} book(s)", id, books),
                    ));
                }
                if !self.repository.authors.delete(id).await? {
                    return Err(AppError::not_found(Resource::Author, id));
                }
            }
            ReferencePolicy::Cascade => {
                let removed = self
                    .repository
                    .authors
                    .delete_cascading(id)
                    .await?
                    .ok_or_else(|| AppError::not_found(Resource::Author, id))?;
                tracing::info!("Deleted {} book(s) of author {}", removed, id);
            }
        }
        tracing::info!("Author {} deleted by {}", id, claims.sub);
        Ok(())
    }

    /// Authors whose "first last" or "last first" contains `query`, ignoring case.
    /// An empty result is not an error.
    pub async fn search_by_full_name(&self, query: &str) -> AppResult<Vec<Author>> {
        tracing::debug!("Author full-name search: {}", query);
        self.repository.authors.search_by_full_name(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::{
        models::book::BookRequest,
        repository::{memory::MemoryStore, AuthorStore, BookStore, MockAuthorStore},
        services::testing::librarian,
    };

    fn request(first: &str, last: &str, born: (i32, u32, u32)) -> AuthorRequest {
        AuthorRequest {
            first_name: first.into(),
            last_name: last.into(),
            biography: None,
            birth_date: NaiveDate::from_ymd_opt(born.0, born.1, born.2).unwrap(),
        }
    }

    fn verne() -> AuthorRequest {
        request("Jules", "Verne", (1828, 2, 8))
    }

    fn hugo() -> AuthorRequest {
        request("Victor", "Hugo", (1802, 2, 26))
    }

    fn service(policy: ReferencePolicy) -> AuthorsService {
        AuthorsService::new(Repository::in_memory(), policy)
    }

    async fn add_book(service: &AuthorsService, author_id: Uuid) {
        service
            .repository
            .books
            .insert(&BookRequest {
                title: "Les Misérables".into(),
                author_id,
                genre_ids: vec![],
                publication_date: NaiveDate::from_ymd_opt(1862, 4, 3).unwrap(),
                cover_image_url: None,
                synopsis: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let service = service(ReferencePolicy::Restrict);
        let created = service.create(&librarian(), &verne()).await.unwrap();
        assert_eq!(service.get_by_id(created.id).await.unwrap(), created);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_empty_catalog() {
        assert!(service(ReferencePolicy::Restrict).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_identity_conflicts_ignoring_case() {
        let service = service(ReferencePolicy::Restrict);
        service.create(&librarian(), &verne()).await.unwrap();

        let shouting = request("JULES", "verne", (1828, 2, 8));
        let err = service.create(&librarian(), &shouting).await.unwrap_err();
        assert!(err.is_conflict());

        // Same names, other birth date: a different author
        let namesake = request("Jules", "Verne", (1900, 1, 1));
        assert!(service.create(&librarian(), &namesake).await.is_ok());
    }

    #[tokio::test]
    async fn test_anonymous_writes_are_refused() {
        let service = service(ReferencePolicy::Restrict);
        let err = service.create(&Principal::Anonymous, &verne()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(service.list().await.unwrap().is_empty());

        let err = service
            .delete(&Principal::Anonymous, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_all_fields() {
        let service = service(ReferencePolicy::Restrict);
        let created = service.create(&librarian(), &verne()).await.unwrap();

        let mut changed = verne();
        changed.biography = Some("Voyages extraordinaires".into());
        changed.first_name = "Gabriel".into();
        let updated = service.update(&librarian(), created.id, &changed).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.first_name, "Gabriel");
        assert_eq!(updated.biography.as_deref(), Some("Voyages extraordinaires"));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_author() {
        let service = service(ReferencePolicy::Restrict);
        let missing = Uuid::new_v4();
        assert!(service.get_by_id(missing).await.unwrap_err().is_not_found());
        assert!(service
            .update(&librarian(), missing, &verne())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(service
            .delete(&librarian(), missing)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_full_name_search() {
        let service = service(ReferencePolicy::Restrict);
        service.create(&librarian(), &verne()).await.unwrap();
        service.create(&librarian(), &hugo()).await.unwrap();

        let found = service.search_by_full_name("verne").await.unwrap();
        let names: Vec<String> = found.iter().map(Author::full_name).collect();
        assert_eq!(names, vec!["Jules Verne"]);

        assert_eq!(service.search_by_full_name("hugo victor").await.unwrap().len(), 1);
        assert!(service.search_by_full_name("hugo jules").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restrict_policy_blocks_referenced_author() {
        let service = service(ReferencePolicy::Restrict);
        let author = service.create(&librarian(), &hugo()).await.unwrap();
        add_book(&service, author.id).await;

        let err = service.delete(&librarian(), author.id).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(service.get_by_id(author.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_cascade_policy_removes_books() {
        let service = service(ReferencePolicy::Cascade);
        let author = service.create(&librarian(), &hugo()).await.unwrap();
        add_book(&service, author.id).await;

        service.delete(&librarian(), author.id).await.unwrap();
        assert!(service.get_by_id(author.id).await.unwrap_err().is_not_found());
        assert_eq!(service.repository.books.count_by_author(author.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut authors = MockAuthorStore::new();
        authors
            .expect_list()
            .returning(|| Err(AppError::Store("connection reset".into())));

        let memory = Arc::new(MemoryStore::new());
        let repository =
            Repository::from_stores(Arc::new(authors), memory.clone(), memory.clone(), memory);
        let service = AuthorsService::new(repository, ReferencePolicy::Restrict);

        assert!(matches!(service.list().await, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_failed_cascade_keeps_books() {
        let memory = Arc::new(MemoryStore::new());
        let author = AuthorStore::insert(memory.as_ref(), &hugo()).await.unwrap();
        let direct = Repository::from_stores(memory.clone(), memory.clone(), memory.clone(), memory.clone());
        let seeded = AuthorsService::new(direct, ReferencePolicy::Cascade);
        add_book(&seeded, author.id).await;

        let mut authors = MockAuthorStore::new();
        let found = author.clone();
        authors.expect_get().returning(move |_| Ok(Some(found.clone())));
        authors
            .expect_delete_cascading()
            .returning(|_| Err(AppError::Store("connection reset".into())));
        authors.expect_delete().never();

        let repository =
            Repository::from_stores(Arc::new(authors), memory.clone(), memory.clone(), memory.clone());
        let service = AuthorsService::new(repository, ReferencePolicy::Cascade);

        let err = service.delete(&librarian(), author.id).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(BookStore::count_by_author(memory.as_ref(), author.id).await.unwrap(), 1);
    }
}
