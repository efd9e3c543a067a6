//! Business logic services

pub mod auth;
pub mod catalog;
pub mod rentals;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::LibraryStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn LibraryStore>,
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub rentals: rentals::RentalsService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn LibraryStore>, auth_config: AuthConfig) -> Self {
        Self {
            auth: auth::AuthService::new(store.clone(), auth_config),
            catalog: catalog::CatalogService::new(store.clone()),
            rentals: rentals::RentalsService::new(store.clone()),
            store,
        }
    }
}
