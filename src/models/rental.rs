//! Rental records and the checkout/return transitions

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

use super::{account::Student, book::Book, LOAN_PERIOD_DAYS};

/// Rental record from database. Open while `return_date` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Rental {
    pub id: i32,
    pub student_id: i32,
    pub book_id: i32,
    pub rental_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl Rental {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    /// Close the record; a record closes exactly once
    pub fn mark_returned(&mut self, today: NaiveDate) -> AppResult<()> {
        if !self.is_active() {
            return Err(AppError::AlreadyReturned(self.id));
        }
        self.return_date = Some(today);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRental {
    pub student_id: i32,
    pub book_id: i32,
    pub rental_date: NaiveDate,
    pub due_date: NaiveDate,
}

pub fn due_date_for(rental_date: NaiveDate) -> NaiveDate {
    rental_date + Duration::days(LOAN_PERIOD_DAYS)
}

/// Checkout transition. Checks the shelf first, then the student's limit;
/// on error neither `book` nor `student` is modified.
pub fn check_out(book: &mut Book, student: &mut Student, today: NaiveDate) -> AppResult<NewRental> {
    if book.available_copies <= 0 {
        return Err(AppError::NoCopiesAvailable(book.id));
    }
    student.begin_rental()?;
    book.take_copy()?;

    Ok(NewRental {
        student_id: student.id,
        book_id: book.id,
        rental_date: today,
        due_date: due_date_for(today),
    })
}

/// Return transition. Callers persist all three records or none.
pub fn check_in(
    rental: &mut Rental,
    book: &mut Book,
    student: &mut Student,
    today: NaiveDate,
) -> AppResult<()> {
    if rental.book_id != book.id || rental.student_id != student.id {
        return Err(AppError::Internal(format!(
            "Rental {} does not link book {} and student {}",
            rental.id, book.id, student.id
        )));
    }
    rental.mark_returned(today)?;
    book.restore_copy()?;
    student.end_rental()?;
    Ok(())
}

/// Rental joined with its book and student for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RentalDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_publisher: String,
    pub student_id: i32,
    pub student_name: String,
    pub student_number: i32,
    pub rental_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    #[sqlx(default)]
    pub is_overdue: bool,
}

impl RentalDetails {
    pub fn flag_overdue(&mut self, today: NaiveDate) {
        self.is_overdue = self.return_date.is_none() && self.due_date < today;
    }
}

/// Which rentals a listing returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RentalFilter {
    pub student_id: Option<i32>,
    pub active_only: bool,
}

impl RentalFilter {
    pub fn active_for_student(student_id: i32) -> Self {
        Self {
            student_id: Some(student_id),
            active_only: true,
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, rental: &Rental) -> bool {
        self.student_id.map_or(true, |id| rental.student_id == id)
            && (!self.active_only || rental.is_active())
    }
}
