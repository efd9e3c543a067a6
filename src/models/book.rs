//! Book model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Book from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub publisher: String,
    pub publication_year: i32,
    pub total_copies: i32,
    /// Copies on the shelf, never above `total_copies`
    pub available_copies: i32,
}

impl Book {
    /// Take one copy off the shelf
    pub fn take_copy(&mut self) -> AppResult<()> {
        if self.available_copies <= 0 {
            return Err(AppError::NoCopiesAvailable(self.id));
        }
        self.available_copies -= 1;
        Ok(())
    }

    /// Put a returned copy back on the shelf
    pub fn restore_copy(&mut self) -> AppResult<()> {
        if self.available_copies >= self.total_copies {
            return Err(AppError::Internal(format!(
                "Book {} already has all {} copies on the shelf",
                self.id, self.total_copies
            )));
        }
        self.available_copies += 1;
        Ok(())
    }

    /// Copies currently out with students
    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

/// New book; every copy starts on the shelf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub publisher: String,
    pub publication_year: i32,
    pub total_copies: i32,
}
