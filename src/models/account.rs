//! Accounts, their student/staff profiles and session claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

use super::MAX_ACTIVE_RENTALS;

/// Role an account acts under, derived from the profile it owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account with the ids of the profiles it owns
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub student_id: Option<i32>,
    pub staff_id: Option<i32>,
}

impl Account {
    pub fn role(&self) -> Role {
        if self.staff_id.is_some() {
            Role::Staff
        } else {
            Role::Student
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role() == Role::Staff
    }

    /// Require the account to own a staff profile
    pub fn require_staff(&self) -> AppResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "Account {} is not a staff member",
                self.id
            )))
        }
    }
}

/// Fields shared by both registration variants, password already hashed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Student {
    pub id: i32,
    pub account_id: i32,
    pub address: String,
    pub phone: String,
    pub student_number: i32,
    pub active_rentals: i32,
    pub has_outstanding_fees: bool,
}

impl Student {
    /// Count one more open rental, refusing past the limit
    pub fn begin_rental(&mut self) -> AppResult<()> {
        if self.active_rentals >= MAX_ACTIVE_RENTALS {
            return Err(AppError::RentalLimitExceeded {
                student_id: self.id,
                limit: MAX_ACTIVE_RENTALS,
            });
        }
        self.active_rentals += 1;
        Ok(())
    }

    pub fn end_rental(&mut self) -> AppResult<()> {
        if self.active_rentals <= 0 {
            return Err(AppError::Internal(format!(
                "Student {} has no active rental to close",
                self.id
            )));
        }
        self.active_rentals -= 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub address: String,
    pub phone: String,
    pub student_number: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Staff {
    pub id: i32,
    pub account_id: i32,
    pub staff_number: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStaff {
    pub staff_number: i32,
}

/// Student with the owning account's name, for pick lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub student_number: i32,
    pub active_rentals: i32,
    pub has_outstanding_fees: bool,
}

/// Claims carried by the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub account_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}
