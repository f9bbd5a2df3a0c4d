//! Book operations: validation and id assignment on top of the [`Store`].

use std::fmt;

use serde_json::{Map, Value};
use tracing::info;

use crate::book::{Book, BookPatch, NewBook, ValidationError, generate_id};
use crate::store::{Store, StoreError};

pub struct BookService {
    store: Store,
}

impl BookService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn list_books(&self) -> Vec<Book> {
        self.store.get_all()
    }

    pub fn get_book(&self, id: &str) -> Result<Book, ServiceError> {
        self.store
            .find_by_id(id)
            .ok_or_else(|| ServiceError::NotFound(id.to_owned()))
    }

    /// Creates a book from raw request fields. `title` and `author` are
    /// required; every other field except `id` is stored as sent.
    pub fn create_book(&self, fields: Map<String, Value>) -> Result<Book, ServiceError> {
        let book = NewBook::from_fields(fields)?.with_id(generate_id());
        self.store.append(book.clone())?;
        info!(id = %book.id, title = %book.title, author = %book.author, "book created");
        Ok(book)
    }

    pub fn update_book(&self, id: &str, fields: Map<String, Value>) -> Result<Book, ServiceError> {
        let patch = BookPatch::from_fields(fields)?;
        let book = self
            .store
            .update_by_id(id, patch)?
            .ok_or_else(|| ServiceError::NotFound(id.to_owned()))?;
        info!(id = %book.id, "book updated");
        Ok(book)
    }

    /// Returns whether a book was removed.
    pub fn delete_book(&self, id: &str) -> Result<bool, ServiceError> {
        let removed = self.store.remove_by_id(id)?;
        info!(%id, removed, "book delete");
        Ok(removed)
    }
}

#[derive(Debug)]
pub enum ServiceError {
    NotFound(String),
    Validation(ValidationError),
    Store(StoreError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "book `{id}` not found"),
            Self::Validation(e) => write!(f, "invalid book: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Validation(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
