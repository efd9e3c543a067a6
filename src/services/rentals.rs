//! Rental (checkout/return) service

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{Account, Book, Rental, RentalDetails, RentalFilter, Role, StudentSummary},
    repository::LibraryStore,
};

#[derive(Clone)]
pub struct RentalsService {
    store: Arc<dyn LibraryStore>,
}

impl RentalsService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Lend a book to a student; staff only
    pub async fn checkout(&self, caller: &Account, book_id: i32, student_id: i32) -> AppResult<Rental> {
        caller.require_staff()?;

        let rental = self.store.rentals_checkout(book_id, student_id, today()).await?;
        tracing::info!(
            "Rental {} opened: book {} to student {}, due {}",
            rental.id,
            rental.book_id,
            rental.student_id,
            rental.due_date
        );
        Ok(rental)
    }

    /// Take a book back; staff only
    pub async fn return_rental(&self, caller: &Account, rental_id: i32) -> AppResult<Rental> {
        caller.require_staff()?;

        let rental = self.store.rentals_return(rental_id, today()).await?;
        tracing::info!(
            "Rental {} closed: book {} back from student {}",
            rental.id,
            rental.book_id,
            rental.student_id
        );
        Ok(rental)
    }

    /// Books and students to choose from when lending; staff only
    pub async fn checkout_options(&self, caller: &Account) -> AppResult<(Vec<Book>, Vec<StudentSummary>)> {
        caller.require_staff()?;

        let books = self.store.books_list().await?;
        let students = self.store.students_list().await?;
        Ok((books, students))
    }

    /// Open rentals of one student
    pub async fn list_active_for_student(&self, student_id: i32) -> AppResult<Vec<RentalDetails>> {
        self.store.students_get_by_id(student_id).await?;
        self.list(RentalFilter::active_for_student(student_id)).await
    }

    /// Every open rental, for the return form; staff only
    pub async fn list_active(&self, caller: &Account) -> AppResult<Vec<RentalDetails>> {
        caller.require_staff()?;
        self.list(RentalFilter {
            student_id: None,
            active_only: true,
        })
        .await
    }

    /// Full rental history; staff only
    pub async fn list_all(&self, caller: &Account) -> AppResult<Vec<RentalDetails>> {
        caller.require_staff()?;
        self.list(RentalFilter::all()).await
    }

    /// Rentals the caller may see: a student gets their own open rentals,
    /// staff get everything or one student's open rentals.
    pub async fn visible_to(&self, caller: &Account, student_id: Option<i32>) -> AppResult<Vec<RentalDetails>> {
        match caller.role() {
            Role::Student => {
                let own = caller.student_id.ok_or_else(|| {
                    AppError::Internal(format!("Account {} has no student profile", caller.id))
                })?;
                if student_id.is_some_and(|id| id != own) {
                    return Err(AppError::Unauthorized(
                        "Students may only list their own rentals".to_string(),
                    ));
                }
                self.list_active_for_student(own).await
            }
            Role::Staff => match student_id {
                Some(id) => self.list_active_for_student(id).await,
                None => self.list_all(caller).await,
            },
        }
    }

    async fn list(&self, filter: RentalFilter) -> AppResult<Vec<RentalDetails>> {
        let today = today();
        let mut rentals = self.store.rentals_list(filter).await?;
        for rental in &mut rentals {
            rental.flag_overdue(today);
        }
        Ok(rentals)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
