//! Data models for Biblioteca

pub mod account;
pub mod book;
pub mod rental;

/// Open rentals a student may hold at once
pub const MAX_ACTIVE_RENTALS: i32 = 3;

/// Days between rental and due date
pub const LOAN_PERIOD_DAYS: i64 = 30;

// Re-export commonly used types
pub use account::{Account, NewAccount, NewStaff, NewStudent, Role, SessionClaims, Staff, Student, StudentSummary};
pub use book::{Book, NewBook};
pub use rental::{NewRental, Rental, RentalDetails, RentalFilter};
