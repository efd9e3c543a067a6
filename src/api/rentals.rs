//! Checkout, return and rental listing endpoints

use axum::{
    extract::{Query, State},
    response::Redirect,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{Book, RentalDetails, StudentSummary},
    AppState,
};

use super::{notice, parse_field, CurrentAccount, FormError};

/// Checkout form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutForm {
    #[serde(default, rename = "livro_id")]
    #[validate(length(min = 1, message = "select a book"))]
    pub book_id: String,
    #[serde(default, rename = "aluno_id")]
    #[validate(length(min = 1, message = "select a student"))]
    pub student_id: String,
}

/// Return form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnForm {
    #[serde(default, rename = "aluguel_id")]
    #[validate(length(min = 1, message = "select a rental"))]
    pub rental_id: String,
}

/// What the checkout form offers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutOptions {
    pub books: Vec<Book>,
    pub students: Vec<StudentSummary>,
}

/// Rental listing filter
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RentalsQuery {
    /// Student whose open rentals to list (staff only)
    pub aluno_id: Option<i32>,
}

/// Books and students to lend between (staff only)
#[utoipa::path(
    get,
    path = "/alugar",
    tag = "rentals",
    responses(
        (status = 200, description = "Checkout choices", body = CheckoutOptions),
        (status = 303, description = "Not signed in or not staff, redirect to /")
    )
)]
pub async fn checkout_form(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> AppResult<Json<CheckoutOptions>> {
    let (books, students) = state.services.rentals.checkout_options(&account).await?;
    Ok(Json(CheckoutOptions { books, students }))
}

/// Lend a book to a student (staff only)
#[utoipa::path(
    post,
    path = "/alugar",
    tag = "rentals",
    request_body(content = CheckoutForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Rented, redirect to /livros with ?notice=book_rented; or back with ?error=")
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect, FormError> {
    let back = FormError::back_to("/alugar");
    account.require_staff().map_err(&back)?;
    form.validate().map_err(|e| back(e.into()))?;
    let book_id = parse_field("livro_id", &form.book_id).map_err(&back)?;
    let student_id = parse_field("aluno_id", &form.student_id).map_err(&back)?;

    state
        .services
        .rentals
        .checkout(&account, book_id, student_id)
        .await
        .map_err(&back)?;

    Ok(notice("/livros", "book_rented"))
}

/// Open rentals to choose from when taking a book back (staff only)
#[utoipa::path(
    get,
    path = "/devolver",
    tag = "rentals",
    responses(
        (status = 200, description = "Open rentals", body = Vec<RentalDetails>),
        (status = 303, description = "Not signed in or not staff, redirect to /")
    )
)]
pub async fn return_form(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = state.services.rentals.list_active(&account).await?;
    Ok(Json(rentals))
}

/// Take a book back (staff only)
#[utoipa::path(
    post,
    path = "/devolver",
    tag = "rentals",
    request_body(content = ReturnForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Returned, redirect to /devolver with ?notice=book_returned; or back with ?error=")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Form(form): Form<ReturnForm>,
) -> Result<Redirect, FormError> {
    let back = FormError::back_to("/devolver");
    account.require_staff().map_err(&back)?;
    form.validate().map_err(|e| back(e.into()))?;
    let rental_id = parse_field("aluguel_id", &form.rental_id).map_err(&back)?;

    state
        .services
        .rentals
        .return_rental(&account, rental_id)
        .await
        .map_err(&back)?;

    Ok(notice("/devolver", "book_returned"))
}

/// Rentals visible to the caller
///
/// Students see their own open rentals. Staff see the full history, or the
/// open rentals of one student with `aluno_id`.
#[utoipa::path(
    get,
    path = "/livros_alugados",
    tag = "rentals",
    params(RentalsQuery),
    responses(
        (status = 200, description = "Rentals, newest first", body = Vec<RentalDetails>),
        (status = 303, description = "Not signed in, redirect to /")
    )
)]
pub async fn list_rentals(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Query(query): Query<RentalsQuery>,
) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = state
        .services
        .rentals
        .visible_to(&account, query.aluno_id)
        .await?;
    Ok(Json(rentals))
}
