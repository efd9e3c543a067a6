//! Book catalog endpoints

use axum::{extract::State, response::Redirect, Form, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, NewBook},
    AppState,
};

use super::{notice, parse_field, CurrentAccount, FormError};

/// Book registration form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterBookForm {
    #[serde(default, rename = "tituloLivro")]
    #[validate(length(min = 1, message = "is required"))]
    pub title: String,
    #[serde(default, rename = "editora")]
    #[validate(length(min = 1, message = "is required"))]
    pub publisher: String,
    /// Publication year
    #[serde(default, rename = "anoLivro")]
    #[validate(length(min = 1, message = "is required"))]
    pub year: String,
    /// Number of copies owned
    #[serde(default, rename = "quantidade")]
    #[validate(length(min = 1, message = "is required"))]
    pub copies: String,
}

impl RegisterBookForm {
    pub fn into_new_book(self) -> AppResult<NewBook> {
        self.validate()?;

        let publication_year = parse_field("anoLivro", &self.year)?;
        let total_copies: i32 = parse_field("quantidade", &self.copies)?;
        if total_copies < 1 {
            return Err(AppError::Validation("quantidade: must be at least 1".to_string()));
        }

        Ok(NewBook {
            title: self.title.trim().to_string(),
            publisher: self.publisher.trim().to_string(),
            publication_year,
            total_copies,
        })
    }
}

/// Book as listed in the catalog
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookListing {
    #[serde(flatten)]
    pub book: Book,
    /// Copies currently out with students
    pub copies_on_loan: i32,
}

impl From<Book> for BookListing {
    fn from(book: Book) -> Self {
        Self {
            copies_on_loan: book.copies_on_loan(),
            book,
        }
    }
}

/// List every book with its availability
#[utoipa::path(
    get,
    path = "/livros",
    tag = "books",
    responses(
        (status = 200, description = "All books ordered by title", body = Vec<BookListing>),
        (status = 303, description = "Not signed in, redirect to /")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    CurrentAccount(_account): CurrentAccount,
) -> AppResult<Json<Vec<BookListing>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(Json(books.into_iter().map(BookListing::from).collect()))
}

/// Register a book (staff only)
#[utoipa::path(
    post,
    path = "/cadastrar_livro",
    tag = "books",
    request_body(content = RegisterBookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered, redirect to /livros with ?notice=book_registered; or back with ?error=")
    )
)]
pub async fn register_book(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Form(form): Form<RegisterBookForm>,
) -> Result<Redirect, FormError> {
    let back = FormError::back_to("/cadastrar_livro");
    account.require_staff().map_err(&back)?;
    let book = form.into_new_book().map_err(&back)?;

    state
        .services
        .catalog
        .register_book(&account, book)
        .await
        .map_err(&back)?;

    Ok(notice("/livros", "book_registered"))
}
