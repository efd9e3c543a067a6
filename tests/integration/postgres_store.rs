//! Postgres store tests
//!
//! Need a scratch database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgPoolOptions;
use tokio_test::{assert_err, assert_ok};

use biblioteca_server::{
    error::AppError,
    models::{NewAccount, NewBook, NewStudent, RentalFilter},
    repository::{LibraryStore, Repository},
};

async fn repository() -> Repository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Repository::new(pool)
}

fn unique_email(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}@escola.br", prefix, nanos)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_checkout_and_return_update_counters() {
    let repo = repository().await;
    assert_ok!(repo.ping().await);

    let account = NewAccount {
        name: "Bruno".to_string(),
        email: unique_email("bruno"),
        password_hash: "x".to_string(),
    };
    let student = NewStudent {
        address: "Rua A".to_string(),
        phone: "555-0100".to_string(),
        student_number: 2024001,
    };
    let created = assert_ok!(repo.accounts_create_student(&account, &student).await);
    let student_id = created.student_id.unwrap();

    let book = assert_ok!(
        repo.books_create(&NewBook {
            title: "Dom Casmurro".to_string(),
            publisher: "Garnier".to_string(),
            publication_year: 1899,
            total_copies: 1,
        })
        .await
    );
    assert_eq!(book.available_copies, 1);

    let today = day(2024, 3, 1);
    let rental = assert_ok!(repo.rentals_checkout(book.id, student_id, today).await);
    assert_eq!(rental.due_date, today + Duration::days(30));

    let err = assert_err!(repo.rentals_checkout(book.id, student_id, today).await);
    assert!(matches!(err, AppError::NoCopiesAvailable(_)));

    let stored = assert_ok!(repo.students_get_by_id(student_id).await);
    assert_eq!(stored.active_rentals, 1);

    let returned = assert_ok!(repo.rentals_return(rental.id, day(2024, 3, 10)).await);
    assert_eq!(returned.return_date, Some(day(2024, 3, 10)));
    let err = assert_err!(repo.rentals_return(rental.id, day(2024, 3, 11)).await);
    assert!(matches!(err, AppError::AlreadyReturned(_)));

    let book = assert_ok!(repo.books_get_by_id(book.id).await);
    assert_eq!(book.available_copies, 1);
    let stored = assert_ok!(repo.students_get_by_id(student_id).await);
    assert_eq!(stored.active_rentals, 0);

    let open = assert_ok!(repo.rentals_list(RentalFilter::active_for_student(student_id)).await);
    assert!(open.is_empty());
    let history = assert_ok!(repo.rentals_list(RentalFilter::all()).await);
    assert!(history.iter().any(|r| r.id == rental.id && r.return_date.is_some()));
}

#[tokio::test]
#[ignore]
async fn test_email_is_unique_ignoring_case() {
    let repo = repository().await;

    let email = unique_email("carla");
    let account = NewAccount {
        name: "Carla".to_string(),
        email: email.clone(),
        password_hash: "x".to_string(),
    };
    let student = NewStudent {
        address: "Rua B".to_string(),
        phone: "555-0101".to_string(),
        student_number: 2024002,
    };
    assert_ok!(repo.accounts_create_student(&account, &student).await);
    assert!(assert_ok!(repo.accounts_email_exists(&email.to_uppercase()).await));

    let duplicate = NewAccount {
        email: email.to_uppercase(),
        ..account
    };
    let err = assert_err!(repo.accounts_create_student(&duplicate, &student).await);
    assert!(matches!(err, AppError::Conflict(_)));
}

async fn create_student(repo: &Repository, prefix: &str, number: i32) -> i32 {
    let account = NewAccount {
        name: prefix.to_string(),
        email: unique_email(prefix),
        password_hash: "x".to_string(),
    };
    let student = NewStudent {
        address: "Rua C".to_string(),
        phone: "555-0102".to_string(),
        student_number: number,
    };
    let created = assert_ok!(repo.accounts_create_student(&account, &student).await);
    created.student_id.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore]
async fn test_concurrent_checkouts_of_last_copy() {
    let repo = repository().await;
    let first_student = create_student(&repo, "davi", 2024003).await;
    let second_student = create_student(&repo, "elisa", 2024004).await;
    let book = assert_ok!(
        repo.books_create(&NewBook {
            title: "Quincas Borba".to_string(),
            publisher: "Laemmert".to_string(),
            publication_year: 1891,
            total_copies: 1,
        })
        .await
    );
    let book_id = book.id;
    let today = day(2024, 4, 1);

    // Each task runs its transaction on its own pool connection
    let first = tokio::spawn({
        let repo = repo.clone();
        async move { repo.rentals_checkout(book_id, first_student, today).await }
    });
    let second = tokio::spawn({
        let repo = repo.clone();
        async move { repo.rentals_checkout(book_id, second_student, today).await }
    });
    let (first, second) = tokio::join!(first, second);
    let results = [first.unwrap(), second.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::NoCopiesAvailable(id)) if *id == book_id)));

    let book = assert_ok!(repo.books_get_by_id(book_id).await);
    assert_eq!(book.available_copies, 0);
    let history = assert_ok!(repo.rentals_list(RentalFilter::all()).await);
    assert_eq!(history.iter().filter(|r| r.book_id == book_id).count(), 1);
}
