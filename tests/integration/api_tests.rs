//! API integration tests
//!
//! Drive the full router over the in-memory store, the way a browser posts
//! the site's forms.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tokio_test::assert_ok;
use tower::ServiceExt;

use biblioteca_server::{api, config::AppConfig, repository::MemoryRepository, AppState};

fn app() -> Router {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    api::create_router(AppState::new(config, Arc::new(MemoryRepository::new())))
}

async fn post_form(app: &Router, uri: &str, body: &str, session: Option<&str>) -> Response {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = session {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, session: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = session {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn get_json(app: &Router, uri: &str, session: &str) -> Value {
    let response = get(app, uri, Some(session)).await;
    assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_ok!(serde_json::from_slice(&bytes))
}

fn location(response: &Response) -> &str {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Log in and return the `session=<token>` cookie pair
async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = post_form(app, "/", &format!("email={}&senha={}", email, password), None).await;
    assert_eq!(location(&response), "/painel");

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

async fn register_staff(app: &Router, name: &str, email: &str) {
    let body = format!(
        "nome={}&inputEmail4={}&inputPassword4=segredo&numero=10",
        name, email
    );
    let response = post_form(app, "/registro_funcionario", &body, None).await;
    assert_eq!(location(&response), "/?notice=registered");
}

async fn register_student(app: &Router, name: &str, email: &str, number: i32) {
    let body = format!(
        "nome={}&inputEmail4={}&inputPassword4=segredo&endereco=Rua+A&telefone=555-0100&numero={}",
        name, email, number
    );
    let response = post_form(app, "/registroaluno", &body, None).await;
    assert_eq!(location(&response), "/?notice=registered");
}

async fn register_book(app: &Router, session: &str, title: &str, copies: i32) -> i64 {
    let body = format!(
        "tituloLivro={}&editora=Garnier&anoLivro=1899&quantidade={}",
        title, copies
    );
    let response = post_form(app, "/cadastrar_livro", &body, Some(session)).await;
    assert_eq!(location(&response), "/livros?notice=book_registered");

    let books = get_json(app, "/livros", session).await;
    let expected = title.replace('+', " ");
    books
        .as_array()
        .unwrap()
        .iter()
        .find(|book| book["title"] == expected.as_str())
        .and_then(|book| book["id"].as_i64())
        .unwrap()
}

async fn student_id(app: &Router, staff_session: &str, email: &str) -> i64 {
    let options = get_json(app, "/alugar", staff_session).await;
    options["students"]
        .as_array()
        .unwrap()
        .iter()
        .find(|student| student["email"] == email)
        .and_then(|student| student["id"].as_i64())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = app();

    let response = get(&app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_login_and_dashboard() {
    let app = app();
    register_student(&app, "Bruno", "bruno@escola.br", 2024001).await;

    let session = login(&app, "bruno@escola.br", "segredo").await;
    let profile = get_json(&app, "/painel", &session).await;
    assert_eq!(profile["name"], "Bruno");
    assert_eq!(profile["role"], "student");
    assert_eq!(profile["active_rentals"], 0);

    let status = get_json(&app, "/", &session).await;
    assert_eq!(status["authenticated"], true);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = app();
    register_student(&app, "Bruno", "bruno@escola.br", 2024001).await;

    let response = post_form(&app, "/", "email=bruno@escola.br&senha=errada", None).await;
    assert_eq!(location(&response), "/?error=invalid_credentials");
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = post_form(&app, "/", "email=ninguem@escola.br&senha=segredo", None).await;
    assert_eq!(location(&response), "/?error=invalid_credentials");
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = app();
    register_staff(&app, "Ana", "ana@escola.br").await;
    let session = login(&app, "ana@escola.br", "segredo").await;
    let token = session.trim_start_matches("session=");

    let request = Request::builder()
        .uri("/painel")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_pages_redirect_without_session() {
    let app = app();

    for uri in ["/painel", "/livros", "/alugar", "/devolver", "/livros_alugados"] {
        let response = get(&app, uri, None).await;
        assert_eq!(location(&response), "/?error=not_authenticated", "GET {}", uri);
    }

    let response = get(&app, "/painel", Some("session=not-a-token")).await;
    assert_eq!(location(&response), "/?error=not_authenticated");

    let status = get(&app, "/", None).await;
    assert_eq!(status.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = app();
    let response = get(&app, "/logout", Some("session=abc.def.ghi")).await;
    assert_eq!(location(&response), "/?notice=logged_out");

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_registration_rejects_duplicate_email() {
    let app = app();
    register_student(&app, "Bruno", "bruno@escola.br", 2024001).await;

    let body = "nome=Outro&inputEmail4=BRUNO@escola.br&inputPassword4=segredo&endereco=Rua+B&telefone=555&numero=7";
    let response = post_form(&app, "/registroaluno", body, None).await;
    assert_eq!(location(&response), "/registroaluno?error=duplicate");

    let body = "nome=Outro&inputEmail4=bruno@escola.br&inputPassword4=segredo&numero=7";
    let response = post_form(&app, "/registro_funcionario", body, None).await;
    assert_eq!(location(&response), "/registro_funcionario?error=duplicate");
}

#[tokio::test]
async fn test_registration_rejects_missing_fields() {
    let app = app();

    let response = post_form(&app, "/registroaluno", "nome=Bruno&inputEmail4=bruno@escola.br", None).await;
    assert_eq!(location(&response), "/registroaluno?error=bad_value");

    let body = "nome=Ana&inputEmail4=ana@escola.br&inputPassword4=segredo&numero=dez";
    let response = post_form(&app, "/registro_funcionario", body, None).await;
    assert_eq!(location(&response), "/registro_funcionario?error=bad_value");
}

#[tokio::test]
async fn test_students_cannot_use_staff_forms() {
    let app = app();
    register_student(&app, "Bruno", "bruno@escola.br", 2024001).await;
    let session = login(&app, "bruno@escola.br", "segredo").await;

    let body = "tituloLivro=Iracema&editora=Garnier&anoLivro=1865&quantidade=2";
    let response = post_form(&app, "/cadastrar_livro", body, Some(&session)).await;
    assert_eq!(location(&response), "/?error=not_authorized");

    let response = get(&app, "/alugar", Some(&session)).await;
    assert_eq!(location(&response), "/?error=not_authorized");

    let response = post_form(&app, "/devolver", "aluguel_id=1", Some(&session)).await;
    assert_eq!(location(&response), "/?error=not_authorized");
}

#[tokio::test]
async fn test_book_registration_validates_copies() {
    let app = app();
    register_staff(&app, "Ana", "ana@escola.br").await;
    let session = login(&app, "ana@escola.br", "segredo").await;

    let body = "tituloLivro=Iracema&editora=Garnier&anoLivro=1865&quantidade=0";
    let response = post_form(&app, "/cadastrar_livro", body, Some(&session)).await;
    assert_eq!(location(&response), "/cadastrar_livro?error=bad_value");

    let books = get_json(&app, "/livros", &session).await;
    assert!(books.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_and_return_cycle() {
    let app = app();
    register_staff(&app, "Ana", "ana@escola.br").await;
    register_student(&app, "Bruno", "bruno@escola.br", 2024001).await;
    let staff = login(&app, "ana@escola.br", "segredo").await;
    let student = login(&app, "bruno@escola.br", "segredo").await;

    let book_id = register_book(&app, &staff, "Dom+Casmurro", 1).await;
    let bruno = student_id(&app, &staff, "bruno@escola.br").await;

    // Lend the only copy
    let body = format!("livro_id={}&aluno_id={}", book_id, bruno);
    let response = post_form(&app, "/alugar", &body, Some(&staff)).await;
    assert_eq!(location(&response), "/livros?notice=book_rented");

    let books = get_json(&app, "/livros", &staff).await;
    assert_eq!(books[0]["available_copies"], 0);

    // Shelf is empty now
    let response = post_form(&app, "/alugar", &body, Some(&staff)).await;
    assert_eq!(location(&response), "/alugar?error=no_copies_available");

    // The student sees their rental, due thirty days later
    let rentals = get_json(&app, "/livros_alugados", &student).await;
    let rentals = rentals.as_array().unwrap();
    assert_eq!(rentals.len(), 1);
    assert_eq!(rentals[0]["book_title"], "Dom Casmurro");
    assert_eq!(rentals[0]["is_overdue"], false);
    let rental_date = chrono::NaiveDate::parse_from_str(rentals[0]["rental_date"].as_str().unwrap(), "%Y-%m-%d").unwrap();
    let due_date = chrono::NaiveDate::parse_from_str(rentals[0]["due_date"].as_str().unwrap(), "%Y-%m-%d").unwrap();
    assert_eq!((due_date - rental_date).num_days(), 30);

    let profile = get_json(&app, "/painel", &student).await;
    assert_eq!(profile["active_rentals"], 1);

    // Take it back
    let open = get_json(&app, "/devolver", &staff).await;
    let rental_id = open[0]["id"].as_i64().unwrap();
    let body = format!("aluguel_id={}", rental_id);
    let response = post_form(&app, "/devolver", &body, Some(&staff)).await;
    assert_eq!(location(&response), "/devolver?notice=book_returned");

    let response = post_form(&app, "/devolver", &body, Some(&staff)).await;
    assert_eq!(location(&response), "/devolver?error=already_returned");

    let books = get_json(&app, "/livros", &staff).await;
    assert_eq!(books[0]["available_copies"], 1);

    let open = get_json(&app, "/devolver", &staff).await;
    assert!(open.as_array().unwrap().is_empty());

    // History keeps the returned record
    let history = get_json(&app, "/livros_alugados", &staff).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert!(history[0]["return_date"].is_string());

    let profile = get_json(&app, "/painel", &student).await;
    assert_eq!(profile["active_rentals"], 0);
}

#[tokio::test]
async fn test_rental_limit_is_three_books() {
    let app = app();
    register_staff(&app, "Ana", "ana@escola.br").await;
    register_student(&app, "Carla", "carla@escola.br", 2024002).await;
    let staff = login(&app, "ana@escola.br", "segredo").await;

    let book_id = register_book(&app, &staff, "Iracema", 5).await;
    let carla = student_id(&app, &staff, "carla@escola.br").await;
    let body = format!("livro_id={}&aluno_id={}", book_id, carla);

    for _ in 0..3 {
        let response = post_form(&app, "/alugar", &body, Some(&staff)).await;
        assert_eq!(location(&response), "/livros?notice=book_rented");
    }

    let response = post_form(&app, "/alugar", &body, Some(&staff)).await;
    assert_eq!(location(&response), "/alugar?error=rental_limit_exceeded");

    let books = get_json(&app, "/livros", &staff).await;
    assert_eq!(books[0]["available_copies"], 2);

    let open = get_json(&app, &format!("/livros_alugados?aluno_id={}", carla), &staff).await;
    assert_eq!(open.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_checkout_form_requires_both_choices() {
    let app = app();
    register_staff(&app, "Ana", "ana@escola.br").await;
    let staff = login(&app, "ana@escola.br", "segredo").await;

    let response = post_form(&app, "/alugar", "livro_id=1", Some(&staff)).await;
    assert_eq!(location(&response), "/alugar?error=bad_value");

    let response = post_form(&app, "/alugar", "livro_id=999&aluno_id=999", Some(&staff)).await;
    assert_eq!(location(&response), "/alugar?error=not_found");
}

#[tokio::test]
async fn test_student_cannot_list_other_students_rentals() {
    let app = app();
    register_student(&app, "Bruno", "bruno@escola.br", 2024001).await;
    register_student(&app, "Carla", "carla@escola.br", 2024002).await;
    register_staff(&app, "Ana", "ana@escola.br").await;
    let staff = login(&app, "ana@escola.br", "segredo").await;
    let bruno = login(&app, "bruno@escola.br", "segredo").await;
    let carla = student_id(&app, &staff, "carla@escola.br").await;

    let response = get(&app, &format!("/livros_alugados?aluno_id={}", carla), Some(&bruno)).await;
    assert_eq!(location(&response), "/?error=not_authorized");

    let response = get(&app, "/livros_alugados?aluno_id=abc", Some(&staff)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_students_are_turned_away_before_form_checks() {
    let app = app();
    register_student(&app, "Bruno", "bruno@escola.br", 2024001).await;
    let session = login(&app, "bruno@escola.br", "segredo").await;

    for (uri, body) in [
        ("/alugar", "livro_id="),
        ("/alugar", ""),
        ("/cadastrar_livro", "quantidade=0"),
        ("/cadastrar_livro", ""),
        ("/devolver", "aluguel_id=abc"),
        ("/devolver", ""),
    ] {
        let response = post_form(&app, uri, body, Some(&session)).await;
        assert_eq!(location(&response), "/?error=not_authorized", "POST {} {:?}", uri, body);
    }
}

#[tokio::test]
async fn test_registration_trims_padded_email() {
    let app = app();

    let body = "nome=Gabi&inputEmail4=+Gabi%40Example.com+&inputPassword4=segredo&endereco=Rua+F&telefone=555-0105&numero=2024007";
    let response = post_form(&app, "/registroaluno", body, None).await;
    assert_eq!(location(&response), "/?notice=registered");

    let session = login(&app, "gabi@example.com", "segredo").await;
    let profile = get_json(&app, "/painel", &session).await;
    assert_eq!(profile["email"], "gabi@example.com");
}

#[tokio::test]
async fn test_book_listing_reports_copies_on_loan() {
    let app = app();
    register_staff(&app, "Ana", "ana@escola.br").await;
    register_student(&app, "Carla", "carla@escola.br", 2024002).await;
    let staff = login(&app, "ana@escola.br", "segredo").await;

    let book_id = register_book(&app, &staff, "Senhora", 3).await;
    let carla = student_id(&app, &staff, "carla@escola.br").await;
    let body = format!("livro_id={}&aluno_id={}", book_id, carla);
    let response = post_form(&app, "/alugar", &body, Some(&staff)).await;
    assert_eq!(location(&response), "/livros?notice=book_rented");

    let books = get_json(&app, "/livros", &staff).await;
    assert_eq!(books[0]["available_copies"], 2);
    assert_eq!(books[0]["copies_on_loan"], 1);
}
