//! Accounts repository: accounts with their student and staff profiles

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Account, NewAccount, NewStaff, NewStudent, Student, StudentSummary},
};

use super::conflict_on_unique;

const ACCOUNT_SELECT: &str = r#"
    SELECT a.id, a.name, a.email, a.password_hash,
           s.id AS student_id, f.id AS staff_id
    FROM accounts a
    LEFT JOIN students s ON s.account_id = a.id
    LEFT JOIN staff f ON f.account_id = a.id
"#;

#[derive(Clone)]
pub struct AccountsRepository {
    pool: Pool<Postgres>,
}

impl AccountsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get account by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(&format!("{} WHERE a.id = $1", ACCOUNT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account with id {} not found", id)))
    }

    /// Get account by email (case-insensitive)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "{} WHERE LOWER(a.email) = LOWER($1)",
            ACCOUNT_SELECT
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create an account and its student profile in one transaction
    pub async fn create_student(&self, account: &NewAccount, student: &NewStudent) -> AppResult<Account> {
        let mut tx = self.pool.begin().await?;

        let account_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO accounts (name, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already registered"))?;

        sqlx::query(
            r#"
            INSERT INTO students (account_id, address, phone, student_number, active_rentals, has_outstanding_fees)
            VALUES ($1, $2, $3, $4, 0, FALSE)
            "#,
        )
        .bind(account_id)
        .bind(&student.address)
        .bind(&student.phone)
        .bind(student.student_number)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(account_id).await
    }

    /// Create an account and its staff profile in one transaction
    pub async fn create_staff(&self, account: &NewAccount, staff: &NewStaff) -> AppResult<Account> {
        let mut tx = self.pool.begin().await?;

        let account_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO accounts (name, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already registered"))?;

        sqlx::query(
            "INSERT INTO staff (account_id, staff_number, name, email) VALUES ($1, $2, $3, $4)",
        )
        .bind(account_id)
        .bind(staff.staff_number)
        .bind(&account.name)
        .bind(&account.email)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(account_id).await
    }

    /// Get student profile by ID
    pub async fn get_student(&self, id: i32) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    /// All students with their account name, for pick lists
    pub async fn list_students(&self) -> AppResult<Vec<StudentSummary>> {
        let students = sqlx::query_as::<_, StudentSummary>(
            r#"
            SELECT s.id, a.name, a.email, s.student_number,
                   s.active_rentals, s.has_outstanding_fees
            FROM students s
            JOIN accounts a ON a.id = s.account_id
            ORDER BY a.name, s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }
}
