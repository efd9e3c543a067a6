//! Authentication, sessions and account registration

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult, AuthFailure},
    models::{Account, NewAccount, NewStaff, NewStudent, SessionClaims, Student},
    repository::LibraryStore,
};

/// Account fields submitted by either registration form, password in clear
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn LibraryStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn LibraryStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Check a credential pair and return the matching account
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<Account> {
        let account = self
            .store
            .accounts_get_by_email(email)
            .await?
            .ok_or(AppError::Authentication(AuthFailure::NotFound))?;

        if !verify_password(&account.password_hash, password)? {
            return Err(AppError::Authentication(AuthFailure::BadCredential));
        }

        tracing::info!("Account {} signed in as {}", account.id, account.role());
        Ok(account)
    }

    /// Create the signed session token for an authenticated account
    pub fn create_session_token(&self, account: &Account) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.session_hours as i64 * 3600);

        let claims = SessionClaims {
            sub: account.email.clone(),
            account_id: account.id,
            role: account.role(),
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Resolve a session token back to its account
    pub async fn resolve_session(&self, token: &str) -> AppResult<Account> {
        let claims = SessionClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

        match self.store.accounts_get_by_id(claims.account_id).await {
            Ok(account) => Ok(account),
            Err(AppError::NotFound(_)) => Err(AppError::Unauthenticated(format!(
                "Session account {} no longer exists",
                claims.account_id
            ))),
            Err(e) => Err(e),
        }
    }

    /// Register a student: account and student profile together
    pub async fn register_student(&self, registration: Registration, student: NewStudent) -> AppResult<Account> {
        let account = self.prepare_account(registration).await?;
        let created = self.store.accounts_create_student(&account, &student).await?;
        tracing::info!("Registered student account {}", created.id);
        Ok(created)
    }

    /// Register a staff member: account and staff profile together
    pub async fn register_staff(&self, registration: Registration, staff: NewStaff) -> AppResult<Account> {
        let account = self.prepare_account(registration).await?;
        let created = self.store.accounts_create_staff(&account, &staff).await?;
        tracing::info!("Registered staff account {}", created.id);
        Ok(created)
    }

    /// Student profile of the account, if it has one
    pub async fn student_profile(&self, account: &Account) -> AppResult<Option<Student>> {
        match account.student_id {
            Some(id) => Ok(Some(self.store.students_get_by_id(id).await?)),
            None => Ok(None),
        }
    }

    async fn prepare_account(&self, registration: Registration) -> AppResult<NewAccount> {
        if self.store.accounts_email_exists(&registration.email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        Ok(NewAccount {
            name: registration.name,
            email: registration.email,
            password_hash: hash_password(&registration.password)?,
        })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
