//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, rentals};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblioteca API",
        version = "0.1.0",
        description = "School library site: accounts, book catalog and rentals"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Session and registration
        auth::session_status,
        auth::login,
        auth::logout,
        auth::dashboard,
        auth::register_student,
        auth::register_staff,
        // Books
        books::list_books,
        books::register_book,
        // Rentals
        rentals::checkout_form,
        rentals::checkout,
        rentals::return_form,
        rentals::return_book,
        rentals::list_rentals,
    ),
    components(
        schemas(
            // Session and registration
            auth::LoginForm,
            auth::StudentRegistrationForm,
            auth::StaffRegistrationForm,
            auth::Profile,
            auth::SessionStatus,
            crate::models::Role,
            // Books
            books::RegisterBookForm,
            books::BookListing,
            crate::models::Book,
            // Rentals
            rentals::CheckoutForm,
            rentals::ReturnForm,
            rentals::CheckoutOptions,
            crate::models::StudentSummary,
            crate::models::Rental,
            crate::models::RentalDetails,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Sessions and account registration"),
        (name = "books", description = "Book catalog"),
        (name = "rentals", description = "Checkout and return")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
