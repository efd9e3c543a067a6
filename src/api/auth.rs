//! Login, logout, dashboard and registration endpoints

use axum::{extract::State, response::Redirect, Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{Account, NewStaff, NewStudent, Role},
    services::auth::Registration,
    AppState,
};

use super::{notice, parse_field, CurrentAccount, FormError, SESSION_COOKIE};

/// Login form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[serde(default, rename = "senha")]
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Student registration form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StudentRegistrationForm {
    #[serde(default, rename = "nome")]
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[serde(default, rename = "inputEmail4")]
    #[validate(length(min = 1, message = "is required"), email(message = "must be a valid email"))]
    pub email: String,
    #[serde(default, rename = "inputPassword4")]
    #[validate(length(min = 4, message = "must be at least 4 characters"))]
    pub password: String,
    #[serde(default, rename = "endereco")]
    #[validate(length(min = 1, message = "is required"))]
    pub address: String,
    #[serde(default, rename = "telefone")]
    #[validate(length(min = 1, message = "is required"))]
    pub phone: String,
    /// Student number
    #[serde(default, rename = "numero")]
    #[validate(length(min = 1, message = "is required"))]
    pub number: String,
}

impl StudentRegistrationForm {
    pub fn into_command(mut self) -> AppResult<(Registration, NewStudent)> {
        normalize(&mut self.name, &mut self.email);
        self.address = self.address.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.validate()?;

        let student = NewStudent {
            address: self.address,
            phone: self.phone,
            student_number: parse_field("numero", &self.number)?,
        };
        let registration = Registration {
            name: self.name,
            email: self.email,
            password: self.password,
        };
        Ok((registration, student))
    }
}

/// Staff registration form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StaffRegistrationForm {
    #[serde(default, rename = "nome")]
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[serde(default, rename = "inputEmail4")]
    #[validate(length(min = 1, message = "is required"), email(message = "must be a valid email"))]
    pub email: String,
    #[serde(default, rename = "inputPassword4")]
    #[validate(length(min = 4, message = "must be at least 4 characters"))]
    pub password: String,
    /// Staff number
    #[serde(default, rename = "numero")]
    #[validate(length(min = 1, message = "is required"))]
    pub number: String,
}

impl StaffRegistrationForm {
    pub fn into_command(mut self) -> AppResult<(Registration, NewStaff)> {
        normalize(&mut self.name, &mut self.email);
        self.validate()?;

        let staff = NewStaff {
            staff_number: parse_field("numero", &self.number)?,
        };
        let registration = Registration {
            name: self.name,
            email: self.email,
            password: self.password,
        };
        Ok((registration, staff))
    }
}

/// Trim the name; trim and lowercase the email so it validates and compares as stored
fn normalize(name: &mut String, email: &mut String) {
    *name = name.trim().to_string();
    *email = email.trim().to_lowercase();
}

/// Account as shown on the dashboard
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Open rentals, students only
    pub active_rentals: Option<i32>,
    /// Outstanding fees flag, students only
    pub has_outstanding_fees: Option<bool>,
}

impl Profile {
    fn from_account(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role(),
            active_rentals: None,
            has_outstanding_fees: None,
        }
    }
}

/// Session state for the login page
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub account: Option<Profile>,
}

/// Current session, if any
#[utoipa::path(
    get,
    path = "/",
    tag = "auth",
    responses(
        (status = 200, description = "Who is signed in", body = SessionStatus)
    )
)]
pub async fn session_status(current: Option<CurrentAccount>) -> Json<SessionStatus> {
    let account = current.map(|CurrentAccount(account)| Profile::from_account(&account));
    Json(SessionStatus {
        authenticated: account.is_some(),
        account,
    })
}

/// Sign in and start a session
#[utoipa::path(
    post,
    path = "/",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, redirect to /painel; or back to / with ?error=")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), FormError> {
    let back = FormError::back_to("/");
    form.validate().map_err(|e| back(e.into()))?;

    let email = form.email.trim().to_lowercase();
    let account = state
        .services
        .auth
        .authenticate(&email, &form.password)
        .await
        .map_err(&back)?;
    let token = state
        .services
        .auth
        .create_session_token(&account)
        .map_err(&back)?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.secure_cookie);

    Ok((jar.add(cookie), Redirect::to("/painel")))
}

/// End the session
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 303, description = "Session cookie cleared, redirect to /")
    )
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, notice("/", "logged_out"))
}

/// Dashboard of the signed-in account
#[utoipa::path(
    get,
    path = "/painel",
    tag = "auth",
    responses(
        (status = 200, description = "Signed-in account", body = Profile),
        (status = 303, description = "Not signed in, redirect to /")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> AppResult<Json<Profile>> {
    let mut profile = Profile::from_account(&account);
    if let Some(student) = state.services.auth.student_profile(&account).await? {
        profile.active_rentals = Some(student.active_rentals);
        profile.has_outstanding_fees = Some(student.has_outstanding_fees);
    }
    Ok(Json(profile))
}

/// Register a student account
#[utoipa::path(
    post,
    path = "/registroaluno",
    tag = "auth",
    request_body(content = StudentRegistrationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered, redirect to / with ?notice=registered; or back with ?error=")
    )
)]
pub async fn register_student(
    State(state): State<AppState>,
    Form(form): Form<StudentRegistrationForm>,
) -> Result<Redirect, FormError> {
    let back = FormError::back_to("/registroaluno");
    let (registration, student) = form.into_command().map_err(&back)?;

    state
        .services
        .auth
        .register_student(registration, student)
        .await
        .map_err(&back)?;

    Ok(notice("/", "registered"))
}

/// Register a staff account
#[utoipa::path(
    post,
    path = "/registro_funcionario",
    tag = "auth",
    request_body(content = StaffRegistrationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered, redirect to / with ?notice=registered; or back with ?error=")
    )
)]
pub async fn register_staff(
    State(state): State<AppState>,
    Form(form): Form<StaffRegistrationForm>,
) -> Result<Redirect, FormError> {
    let back = FormError::back_to("/registro_funcionario");
    let (registration, staff) = form.into_command().map_err(&back)?;

    state
        .services
        .auth
        .register_staff(registration, staff)
        .await
        .map_err(&back)?;

    Ok(notice("/", "registered"))
}
