//! Repository layer for database operations

pub mod accounts;
pub mod books;
pub mod memory;
pub mod rentals;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        Account, Book, NewAccount, NewBook, NewStaff, NewStudent, Rental, RentalDetails,
        RentalFilter, Student, StudentSummary,
    },
};

pub use memory::MemoryRepository;

/// Storage operations the services rely on.
///
/// Checkout, return and both registrations are single transactions: an
/// implementation either applies every write of the operation or none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Round-trip to the backing store
    async fn ping(&self) -> AppResult<()>;

    async fn accounts_get_by_id(&self, id: i32) -> AppResult<Account>;
    async fn accounts_get_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn accounts_email_exists(&self, email: &str) -> AppResult<bool>;
    /// Create an account together with its student profile
    async fn accounts_create_student(&self, account: &NewAccount, student: &NewStudent) -> AppResult<Account>;
    /// Create an account together with its staff profile
    async fn accounts_create_staff(&self, account: &NewAccount, staff: &NewStaff) -> AppResult<Account>;

    async fn students_get_by_id(&self, id: i32) -> AppResult<Student>;
    async fn students_list(&self) -> AppResult<Vec<StudentSummary>>;

    async fn books_create(&self, book: &NewBook) -> AppResult<Book>;
    async fn books_get_by_id(&self, id: i32) -> AppResult<Book>;
    async fn books_list(&self) -> AppResult<Vec<Book>>;

    /// Open a rental: insert the record, take a copy, bump the student's count
    async fn rentals_checkout(&self, book_id: i32, student_id: i32, today: NaiveDate) -> AppResult<Rental>;
    /// Close a rental: set its return date, restore the copy, drop the student's count
    async fn rentals_return(&self, rental_id: i32, today: NaiveDate) -> AppResult<Rental>;
    async fn rentals_list(&self, filter: RentalFilter) -> AppResult<Vec<RentalDetails>>;
}

/// Postgres-backed store holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub accounts: accounts::AccountsRepository,
    pub books: books::BooksRepository,
    pub rentals: rentals::RentalsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            accounts: accounts::AccountsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            rentals: rentals::RentalsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl LibraryStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn accounts_get_by_id(&self, id: i32) -> AppResult<Account> {
        self.accounts.get_by_id(id).await
    }

    async fn accounts_get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        self.accounts.get_by_email(email).await
    }

    async fn accounts_email_exists(&self, email: &str) -> AppResult<bool> {
        self.accounts.email_exists(email).await
    }

    async fn accounts_create_student(&self, account: &NewAccount, student: &NewStudent) -> AppResult<Account> {
        self.accounts.create_student(account, student).await
    }

    async fn accounts_create_staff(&self, account: &NewAccount, staff: &NewStaff) -> AppResult<Account> {
        self.accounts.create_staff(account, staff).await
    }

    async fn students_get_by_id(&self, id: i32) -> AppResult<Student> {
        self.accounts.get_student(id).await
    }

    async fn students_list(&self) -> AppResult<Vec<StudentSummary>> {
        self.accounts.list_students().await
    }

    async fn books_create(&self, book: &NewBook) -> AppResult<Book> {
        self.books.create(book).await
    }

    async fn books_get_by_id(&self, id: i32) -> AppResult<Book> {
        self.books.get_by_id(id).await
    }

    async fn books_list(&self) -> AppResult<Vec<Book>> {
        self.books.list().await
    }

    async fn rentals_checkout(&self, book_id: i32, student_id: i32, today: NaiveDate) -> AppResult<Rental> {
        self.rentals.checkout(book_id, student_id, today).await
    }

    async fn rentals_return(&self, rental_id: i32, today: NaiveDate) -> AppResult<Rental> {
        self.rentals.return_rental(rental_id, today).await
    }

    async fn rentals_list(&self, filter: RentalFilter) -> AppResult<Vec<RentalDetails>> {
        self.rentals.list(filter).await
    }
}

/// Turn a unique-constraint violation into a conflict, keep anything else as a database error
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
