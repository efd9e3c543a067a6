//! Book catalog service

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Account, Book, NewBook},
    repository::LibraryStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LibraryStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Register a book; staff only
    pub async fn register_book(&self, caller: &Account, book: NewBook) -> AppResult<Book> {
        caller.require_staff()?;

        let created = self.store.books_create(&book).await?;
        tracing::info!(
            "Book {} \"{}\" registered by account {} with {} copies",
            created.id,
            created.title,
            caller.id,
            created.total_copies
        );
        Ok(created)
    }

    /// All books, ordered by title
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.store.books_list().await
    }
}
