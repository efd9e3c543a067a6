//! HTTP handlers for the Biblioteca site
//!
//! Form endpoints answer with `303 See Other`: forward with `?notice=<code>`
//! on success, back to the form with `?error=<code>` on failure. Read
//! endpoints return JSON for the presentation layer.

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod rentals;

use std::str::FromStr;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::Account,
    AppState,
};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Account resolved from the request's session
pub struct CurrentAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(SESSION_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            })
            .ok_or_else(|| AppError::Unauthenticated("No session".to_string()))?;

        let account = state.services.auth.resolve_session(&token).await?;

        Ok(CurrentAccount(account))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Error raised while handling a form; sends the user back to `back`
#[derive(Debug)]
pub struct FormError {
    pub error: AppError,
    pub back: &'static str,
}

impl FormError {
    /// `map_err` adapter binding the form's own path
    pub fn back_to(back: &'static str) -> impl Fn(AppError) -> FormError {
        move |error| FormError { error, back }
    }
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        if self.error.is_fatal() || self.error.is_session_error() {
            return self.error.into_response();
        }

        tracing::info!("Form at {} rejected: {}", self.back, self.error);
        Redirect::to(&format!("{}?error={}", self.back, self.error.code())).into_response()
    }
}

/// Redirect after a successful form post
pub fn notice(path: &str, code: &str) -> Redirect {
    Redirect::to(&format!("{}?notice={}", path, code))
}

/// Parse a numeric form field, naming the field on failure
pub fn parse_field<T: FromStr>(field: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("{}: must be a number", field)))
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let site = Router::new()
        // Session
        .route("/", get(auth::session_status).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/painel", get(auth::dashboard))
        // Registration
        .route("/registroaluno", post(auth::register_student))
        .route("/registro_funcionario", post(auth::register_staff))
        // Catalog
        .route("/livros", get(books::list_books))
        .route("/cadastrar_livro", post(books::register_book))
        // Rentals
        .route("/alugar", get(rentals::checkout_form).post(rentals::checkout))
        .route("/devolver", get(rentals::return_form).post(rentals::return_book))
        .route("/livros_alugados", get(rentals::list_rentals))
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .with_state(state);

    Router::new()
        .merge(site)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
