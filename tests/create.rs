mod common;

use common::*;
use lsys::{Book, CopyStatus, Fine, LoanStatus, NewLoan};

#[tokio::test]
async fn create_author() {
	let (_dir, lib) = library().await;
	let author = lib.create_author(1, "Benjamin Reichwald").await.unwrap().unwrap();
	assert_eq!(author.author_id, 1);
	assert_eq!(author.name, "Benjamin Reichwald");
}

#[tokio::test]
async fn duplicate_author_id_is_not_created() {
	let (_dir, lib) = library().await;
	assert!(lib.create_author(1, "Benjamin Reichwald").await.unwrap().is_some());
	assert!(lib.create_author(1, "Zak Arogundade").await.unwrap().is_none());

	let name: String = sqlx::query_scalar("SELECT name FROM authors WHERE author_id = 1")
		.fetch_one(lib.pool())
		.await
		.unwrap();
	assert_eq!(name, "Benjamin Reichwald");
	assert_eq!(count(&lib, "authors").await, 1);
}

#[tokio::test]
async fn empty_author_name_is_not_created() {
	let (_dir, lib) = library().await;
	assert!(lib.create_author(1, "").await.unwrap().is_none());
	assert_eq!(count(&lib, "authors").await, 0);
}

#[tokio::test]
async fn create_book_with_every_field() {
	let (_dir, lib) = library().await;
	let wanted = Book {
		book_id: 1,
		title: "Introduction to Software Engineering".into(),
		isbn: Some("978-3-16-148410-0".into()),
		published_year: Some(2024),
		genre: Some("Education".into()),
	};
	let book = lib.create_book(&wanted).await.unwrap().unwrap();
	assert_eq!(book, wanted);
}

#[tokio::test]
async fn duplicate_isbn_is_not_created() {
	let (_dir, lib) = library().await;
	let first = Book::titled(1, "First").with_isbn("978-0-00-000000-1");
	let second = Book::titled(2, "Second").with_isbn("978-0-00-000000-1");
	assert!(lib.create_book(&first).await.unwrap().is_some());
	assert!(lib.create_book(&second).await.unwrap().is_none());
	assert_eq!(count(&lib, "books").await, 1);

	// books without an isbn never collide with each other
	assert!(lib.create_book(&Book::titled(3, "Third")).await.unwrap().is_some());
	assert!(lib.create_book(&Book::titled(4, "Fourth")).await.unwrap().is_some());
}

#[tokio::test]
async fn book_author_needs_both_sides() {
	let (_dir, lib) = library().await;
	lib.create_author(1, "Benjamin Reichwald").await.unwrap().unwrap();
	book(&lib, 1, "Introduction to Software Engineering").await;

	let link = lib.create_book_author(1, 1).await.unwrap().unwrap();
	assert_eq!((link.book_id, link.author_id), (1, 1));

	assert!(lib.create_book_author(1, 1).await.unwrap().is_none());
	assert!(lib.create_book_author(1, 99).await.unwrap().is_none());
	assert!(lib.create_book_author(99, 1).await.unwrap().is_none());
	assert_eq!(count(&lib, "book_authors").await, 1);
}

#[tokio::test]
async fn duplicate_email_is_not_created() {
	let (_dir, lib) = library().await;
	let member = lib
		.create_member(1, "Tatiana Schwaninger", "tati@nbb.com", lsys::now())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(member.email, "tati@nbb.com");
	assert!(lib.create_member(2, "Someone Else", "tati@nbb.com", lsys::now()).await.unwrap().is_none());
	assert_eq!(count(&lib, "members").await, 1);
}

#[tokio::test]
async fn copy_needs_existing_book() {
	let (_dir, lib) = library().await;
	assert!(lib.create_copy(1, 1, CopyStatus::Available).await.unwrap().is_none());

	book(&lib, 1, "Test Book").await;
	let copy = lib.create_copy(1, 1, CopyStatus::Available).await.unwrap().unwrap();
	assert_eq!(copy.status, CopyStatus::Available);
	assert_eq!(copy.book_id, 1);
}

#[tokio::test]
async fn create_loan_keeps_given_fields() {
	let (_dir, lib) = library().await;
	one_of_each(&lib).await;
	let now = lsys::now();

	let loan = lib
		.create_loan(&NewLoan::active(1, 1, now).with_id(1).due(now))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(loan.loan_id, 1);
	assert_eq!(loan.copy_id, 1);
	assert_eq!(loan.member_id, 1);
	assert_eq!(loan.loan_date, now);
	assert_eq!(loan.due_date, now);
	assert_eq!(loan.return_date, None);
	assert_eq!(loan.status, LoanStatus::Active);
}

#[tokio::test]
async fn create_loan_assigns_id_when_missing() {
	let (_dir, lib) = library().await;
	one_of_each(&lib).await;
	copy(&lib, 2, 1, CopyStatus::Available).await;
	let now = lsys::now();

	let first = lib.create_loan(&NewLoan::active(1, 1, now).with_id(10)).await.unwrap().unwrap();
	let second = lib.create_loan(&NewLoan::active(2, 1, now)).await.unwrap().unwrap();
	assert_eq!(first.loan_id, 10);
	assert!(second.loan_id > first.loan_id);
}

#[tokio::test]
async fn second_open_loan_on_a_copy_is_not_created() {
	let (_dir, lib) = library().await;
	one_of_each(&lib).await;
	let now = lsys::now();

	assert!(lib.create_loan(&NewLoan::active(1, 1, now)).await.unwrap().is_some());
	assert!(lib.create_loan(&NewLoan::active(1, 1, now)).await.unwrap().is_none());
	// history is not limited
	assert!(lib.create_loan(&NewLoan::active(1, 1, now).returned(now)).await.unwrap().is_some());
	assert_eq!(lib.open_loans_for_copy(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn overdue_is_not_a_storable_status() {
	let (_dir, lib) = library().await;
	one_of_each(&lib).await;
	let mut loan = NewLoan::active(1, 1, lsys::now());
	loan.status = LoanStatus::Overdue;
	assert!(lib.create_loan(&loan).await.unwrap().is_none());
	assert_eq!(count(&lib, "loans").await, 0);
}

#[tokio::test]
async fn create_fine() {
	let (_dir, lib) = library().await;
	one_of_each(&lib).await;
	let now = lsys::now();
	let loan = lib.create_loan(&NewLoan::active(1, 1, now).with_id(1)).await.unwrap().unwrap();

	let fine = lib
		.create_fine(&Fine::unpaid(1, 1, Some(loan.loan_id), 10.0, now))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(fine.fine_id, 1);
	assert_eq!(fine.member_id, 1);
	assert_eq!(fine.loan_id, Some(1));
	assert_eq!(fine.amount, 10.0);
	assert_eq!(fine.assessed_at, now);
	assert!(!fine.paid);
	assert_eq!(fine.paid_at, None);
}

#[tokio::test]
async fn invalid_fines_are_not_created() {
	let (_dir, lib) = library().await;
	one_of_each(&lib).await;
	let now = lsys::now();

	// negative amount
	assert!(lib.create_fine(&Fine::unpaid(1, 1, None, -1.0, now)).await.unwrap().is_none());
	// paid without a payment time
	let mut fine = Fine::unpaid(2, 1, None, 1.0, now);
	fine.paid = true;
	assert!(lib.create_fine(&fine).await.unwrap().is_none());
	// unknown member
	assert!(lib.create_fine(&Fine::unpaid(3, 42, None, 1.0, now)).await.unwrap().is_none());

	assert!(lib.create_fine(&Fine::unpaid(4, 1, None, 0.0, now)).await.unwrap().is_some());
	assert_eq!(count(&lib, "fines").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_create_member_has_one_winner() {
	let (_dir, lib) = library().await;

	let mut tasks = Vec::new();
	for _ in 0..5 {
		let lib = lib.clone();
		tasks.push(tokio::spawn(async move {
			lib.create_member(1, "Concurrent User", "email@gmail.com", lsys::now()).await
		}));
	}
	let mut created = 0;
	for task in tasks {
		if task.await.unwrap().unwrap().is_some() {
			created += 1;
		}
	}
	assert_eq!(created, 1);
	assert_eq!(count(&lib, "members").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_create_book_has_one_winner() {
	let (_dir, lib) = library().await;
	let book = Book::titled(1, "Concurrent Book").with_isbn("123-4-56-789012-3").with_genre("Fiction");

	let mut tasks = Vec::new();
	for _ in 0..5 {
		let lib = lib.clone();
		let book = book.clone();
		tasks.push(tokio::spawn(async move { lib.create_book(&book).await }));
	}
	let mut created = 0;
	for task in tasks {
		if task.await.unwrap().unwrap().is_some() {
			created += 1;
		}
	}
	assert_eq!(created, 1);
}

#[tokio::test]
async fn ensure_schema_is_idempotent() {
	let (_dir, lib) = library().await;
	one_of_each(&lib).await;
	lib.ensure_schema().await.unwrap();
	lib.ensure_schema().await.unwrap();
	assert_eq!(count(&lib, "books").await, 1);
}

#[tokio::test]
async fn in_memory_library_shares_one_database() {
	let lib = lsys::Library::connect(&lsys::Config::new("sqlite::memory:")).await.unwrap();
	lib.ensure_schema().await.unwrap();
	book(&lib, 1, "Memory Book").await;
	assert_eq!(count(&lib, "books").await, 1);
}

#[tokio::test]
async fn create_under_held_write_lock_is_an_error() {
	let (dir, lib) = library().await;
	let other = sqlx::SqlitePool::connect(&url(&dir)).await.unwrap();
	let mut holder = other.acquire().await.unwrap();
	sqlx::query("BEGIN IMMEDIATE").execute(&mut *holder).await.unwrap();

	// the id is fresh, so this must not look like a collision
	let err = lib.create_author(77, "Fresh Author").await.unwrap_err();
	assert!(matches!(err, lsys::Error::Sql(_)));

	sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
	drop(holder);
	other.close().await;

	assert_eq!(count(&lib, "authors").await, 0);
	let author = lib.create_author(77, "Fresh Author").await.unwrap().unwrap();
	assert_eq!(author.author_id, 77);
}
