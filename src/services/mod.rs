//! Business logic services

pub mod auth;
pub mod authors;
pub mod books;
pub mod genres;

use crate::{
    config::{AuthConfig, CatalogConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub authors: authors::AuthorsService,
    pub genres: genres::GenresService,
    pub books: books::BooksService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, catalog_config: &CatalogConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            authors: authors::AuthorsService::new(
                repository.clone(),
                catalog_config.author_delete_policy,
            ),
            genres: genres::GenresService::new(
                repository.clone(),
                catalog_config.genre_delete_policy,
            ),
            books: books::BooksService::new(repository.clone()),
            repository,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}
