//! Process-local store used for demos and router tests.
//!
//! All tables sit behind one async mutex. Each write operation holds the lock
//! for its whole duration and edits copies of the rows it touches; the copies
//! are written back only after every step succeeded.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        rental, Account, Book, NewAccount, NewBook, NewStaff, NewStudent, Rental, RentalDetails,
        RentalFilter, Staff, Student, StudentSummary,
    },
};

use super::LibraryStore;

/// Email equality as enforced by the `LOWER(email)` unique index
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Clone)]
struct AccountRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<i32, AccountRow>,
    students: BTreeMap<i32, Student>,
    staff: BTreeMap<i32, Staff>,
    books: BTreeMap<i32, Book>,
    rentals: BTreeMap<i32, Rental>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &str) -> bool {
        self.accounts
            .values()
            .any(|a| same_email(&a.email, email))
    }

    fn account(&self, row: &AccountRow) -> Account {
        Account {
            id: row.id,
            name: row.name.clone(),
            email: row.email.clone(),
            password_hash: row.password_hash.clone(),
            student_id: self
                .students
                .values()
                .find(|s| s.account_id == row.id)
                .map(|s| s.id),
            staff_id: self
                .staff
                .values()
                .find(|s| s.account_id == row.id)
                .map(|s| s.id),
        }
    }

    fn insert_account(&mut self, account: &NewAccount) -> AppResult<i32> {
        if self.email_taken(&account.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        let id = self.next_id();
        self.accounts.insert(
            id,
            AccountRow {
                id,
                name: account.name.clone(),
                email: account.email.clone(),
                password_hash: account.password_hash.clone(),
            },
        );
        Ok(id)
    }

    fn account_by_id(&self, id: i32) -> AppResult<Account> {
        self.accounts
            .get(&id)
            .map(|row| self.account(row))
            .ok_or_else(|| AppError::NotFound(format!("Account with id {} not found", id)))
    }

    fn student_name(&self, student: &Student) -> String {
        self.accounts
            .get(&student.account_id)
            .map(|a| a.name.clone())
            .unwrap_or_default()
    }
}

/// In-memory implementation of [`LibraryStore`]
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for MemoryRepository {
    async fn ping(&self) -> AppResult<()> {
        let _tables = self.tables.lock().await;
        Ok(())
    }

    async fn accounts_get_by_id(&self, id: i32) -> AppResult<Account> {
        self.tables.lock().await.account_by_id(id)
    }

    async fn accounts_get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| same_email(&a.email, email))
            .map(|row| tables.account(row)))
    }

    async fn accounts_email_exists(&self, email: &str) -> AppResult<bool> {
        Ok(self.tables.lock().await.email_taken(email))
    }

    async fn accounts_create_student(&self, account: &NewAccount, student: &NewStudent) -> AppResult<Account> {
        let mut tables = self.tables.lock().await;
        let account_id = tables.insert_account(account)?;
        let id = tables.next_id();
        tables.students.insert(
            id,
            Student {
                id,
                account_id,
                address: student.address.clone(),
                phone: student.phone.clone(),
                student_number: student.student_number,
                active_rentals: 0,
                has_outstanding_fees: false,
            },
        );
        tables.account_by_id(account_id)
    }

    async fn accounts_create_staff(&self, account: &NewAccount, staff: &NewStaff) -> AppResult<Account> {
        let mut tables = self.tables.lock().await;
        let account_id = tables.insert_account(account)?;
        let id = tables.next_id();
        tables.staff.insert(
            id,
            Staff {
                id,
                account_id,
                staff_number: staff.staff_number,
                name: account.name.clone(),
                email: account.email.clone(),
            },
        );
        tables.account_by_id(account_id)
    }

    async fn students_get_by_id(&self, id: i32) -> AppResult<Student> {
        self.tables
            .lock()
            .await
            .students
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    async fn students_list(&self) -> AppResult<Vec<StudentSummary>> {
        let tables = self.tables.lock().await;
        let mut students: Vec<StudentSummary> = tables
            .students
            .values()
            .map(|s| {
                let email = tables
                    .accounts
                    .get(&s.account_id)
                    .map(|a| a.email.clone())
                    .unwrap_or_default();
                StudentSummary {
                    id: s.id,
                    name: tables.student_name(s),
                    email,
                    student_number: s.student_number,
                    active_rentals: s.active_rentals,
                    has_outstanding_fees: s.has_outstanding_fees,
                }
            })
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(students)
    }

    async fn books_create(&self, book: &NewBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let created = Book {
            id,
            title: book.title.clone(),
            publisher: book.publisher.clone(),
            publication_year: book.publication_year,
            total_copies: book.total_copies,
            available_copies: book.total_copies,
        };
        tables.books.insert(id, created.clone());
        Ok(created)
    }

    async fn books_get_by_id(&self, id: i32) -> AppResult<Book> {
        self.tables
            .lock()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn books_list(&self) -> AppResult<Vec<Book>> {
        let tables = self.tables.lock().await;
        let mut books: Vec<Book> = tables.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn rentals_checkout(&self, book_id: i32, student_id: i32, today: NaiveDate) -> AppResult<Rental> {
        let mut tables = self.tables.lock().await;

        let mut book = tables
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        let mut student = tables
            .students
            .get(&student_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", student_id)))?;

        let new_rental = rental::check_out(&mut book, &mut student, today)?;

        let id = tables.next_id();
        let created = Rental {
            id,
            student_id: new_rental.student_id,
            book_id: new_rental.book_id,
            rental_date: new_rental.rental_date,
            due_date: new_rental.due_date,
            return_date: None,
        };
        tables.books.insert(book.id, book);
        tables.students.insert(student.id, student);
        tables.rentals.insert(id, created.clone());

        Ok(created)
    }

    async fn rentals_return(&self, rental_id: i32, today: NaiveDate) -> AppResult<Rental> {
        let mut tables = self.tables.lock().await;

        let mut rental = tables
            .rentals
            .get(&rental_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", rental_id)))?;
        if !rental.is_active() {
            return Err(AppError::AlreadyReturned(rental.id));
        }

        let mut book = tables.books.get(&rental.book_id).cloned().ok_or_else(|| {
            AppError::Internal(format!("Rental {} points at a missing book", rental.id))
        })?;
        let mut student = tables.students.get(&rental.student_id).cloned().ok_or_else(|| {
            AppError::Internal(format!("Rental {} points at a missing student", rental.id))
        })?;

        rental::check_in(&mut rental, &mut book, &mut student, today)?;

        tables.books.insert(book.id, book);
        tables.students.insert(student.id, student);
        tables.rentals.insert(rental.id, rental.clone());

        Ok(rental)
    }

    async fn rentals_list(&self, filter: RentalFilter) -> AppResult<Vec<RentalDetails>> {
        let tables = self.tables.lock().await;

        let mut rentals: Vec<RentalDetails> = tables
            .rentals
            .values()
            .filter(|r| filter.matches(r))
            .filter_map(|r| {
                let book = tables.books.get(&r.book_id)?;
                let student = tables.students.get(&r.student_id)?;
                Some(RentalDetails {
                    id: r.id,
                    book_id: book.id,
                    book_title: book.title.clone(),
                    book_publisher: book.publisher.clone(),
                    student_id: student.id,
                    student_name: tables.student_name(student),
                    student_number: student.student_number,
                    rental_date: r.rental_date,
                    due_date: r.due_date,
                    return_date: r.return_date,
                    is_overdue: false,
                })
            })
            .collect();

        rentals.sort_by(|a, b| b.rental_date.cmp(&a.rental_date).then(b.id.cmp(&a.id)));
        Ok(rentals)
    }
}
