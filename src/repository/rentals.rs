//! Rentals repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        rental::{self, Rental, RentalDetails, RentalFilter},
        Book, Student,
    },
};

#[derive(Clone)]
pub struct RentalsRepository {
    pool: Pool<Postgres>,
}

impl RentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a rental. Book and student rows stay locked until commit, so two
    /// checkouts of the last copy cannot both pass the shelf check.
    pub async fn checkout(&self, book_id: i32, student_id: i32, today: NaiveDate) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let mut student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1 FOR UPDATE")
            .bind(student_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", student_id)))?;

        let new_rental = rental::check_out(&mut book, &mut student, today)?;

        sqlx::query("UPDATE books SET available_copies = $1 WHERE id = $2")
            .bind(book.available_copies)
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE students SET active_rentals = $1 WHERE id = $2")
            .bind(student.active_rentals)
            .bind(student.id)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (student_id, book_id, rental_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_rental.student_id)
        .bind(new_rental.book_id)
        .bind(new_rental.rental_date)
        .bind(new_rental.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Close a rental, keeping the record as history
    pub async fn return_rental(&self, rental_id: i32, today: NaiveDate) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        let mut rental = sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE id = $1 FOR UPDATE")
            .bind(rental_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", rental_id)))?;

        if !rental.is_active() {
            return Err(AppError::AlreadyReturned(rental.id));
        }

        let mut book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(rental.book_id)
            .fetch_one(&mut *tx)
            .await?;

        let mut student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1 FOR UPDATE")
            .bind(rental.student_id)
            .fetch_one(&mut *tx)
            .await?;

        rental::check_in(&mut rental, &mut book, &mut student, today)?;

        sqlx::query("UPDATE rentals SET return_date = $1 WHERE id = $2")
            .bind(rental.return_date)
            .bind(rental.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE books SET available_copies = $1 WHERE id = $2")
            .bind(book.available_copies)
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE students SET active_rentals = $1 WHERE id = $2")
            .bind(student.active_rentals)
            .bind(student.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(rental)
    }

    /// Rentals joined with book and student, newest first
    pub async fn list(&self, filter: RentalFilter) -> AppResult<Vec<RentalDetails>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT r.id, r.book_id, b.title AS book_title, b.publisher AS book_publisher,
                   r.student_id, a.name AS student_name, s.student_number,
                   r.rental_date, r.due_date, r.return_date
            FROM rentals r
            JOIN books b ON b.id = r.book_id
            JOIN students s ON s.id = r.student_id
            JOIN accounts a ON a.id = s.account_id
            WHERE TRUE
            "#,
        );

        if let Some(student_id) = filter.student_id {
            builder.push(" AND r.student_id = ").push_bind(student_id);
        }
        if filter.active_only {
            builder.push(" AND r.return_date IS NULL");
        }
        builder.push(" ORDER BY r.rental_date DESC, r.id DESC");

        let rentals = builder
            .build_query_as::<RentalDetails>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rentals)
    }
}
