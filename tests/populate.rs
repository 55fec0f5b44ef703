mod common;

use common::*;
use lsys::populate::{populate, PopulateOptions};
use lsys::CopyStatus;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn small() -> PopulateOptions {
	PopulateOptions {
		num_authors: 20,
		num_books: 30,
		num_members: 25,
		copies_per_book: 2,
		num_loans: 60,
		fine_probability: 0.5,
	}
}

#[tokio::test]
async fn summary_matches_tables() {
	let (_dir, lib) = library().await;
	let mut rng = StdRng::seed_from_u64(7);
	let summary = populate(&lib, &small(), &mut rng).await.unwrap();

	assert_eq!(summary.authors as i64, count(&lib, "authors").await);
	assert_eq!(summary.books as i64, count(&lib, "books").await);
	assert_eq!(summary.book_authors as i64, count(&lib, "book_authors").await);
	assert_eq!(summary.members as i64, count(&lib, "members").await);
	assert_eq!(summary.copies as i64, count(&lib, "copies").await);
	assert_eq!(summary.loans as i64, count(&lib, "loans").await);
	assert_eq!(summary.fines as i64, count(&lib, "fines").await);

	assert_eq!(summary.authors, 20);
	assert_eq!(summary.books, 30);
	assert!(summary.members > 0);
	assert!(summary.copies >= summary.books);
	assert!(summary.loans > 0);
}

#[tokio::test]
async fn open_loans_sit_on_loaned_copies() {
	let (_dir, lib) = library().await;
	let mut rng = StdRng::seed_from_u64(11);
	populate(&lib, &small(), &mut rng).await.unwrap();

	let open: Vec<i64> = sqlx::query_scalar("SELECT copy_id FROM loans WHERE status = 'active'")
		.fetch_all(lib.pool())
		.await
		.unwrap();
	for copy_id in open {
		assert_eq!(lib.copy(copy_id).await.unwrap().unwrap().status, CopyStatus::OnLoan);
		assert_eq!(lib.open_loans_for_copy(copy_id).await.unwrap().len(), 1);
	}

	let bad_fines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fines WHERE amount < 0 OR paid != (paid_at IS NOT NULL)")
		.fetch_one(lib.pool())
		.await
		.unwrap();
	assert_eq!(bad_fines, 0);
}

#[tokio::test]
async fn populated_data_feeds_reports() {
	let (_dir, lib) = library().await;
	let mut rng = StdRng::seed_from_u64(3);
	populate(&lib, &small(), &mut rng).await.unwrap();

	let top = lib.top_books(5).await.unwrap();
	assert!(!top.is_empty());
	assert!(top.windows(2).all(|w| w[0].loan_count >= w[1].loan_count));
	let util = lib.copies_on_loan(5).await.unwrap();
	assert!(util.iter().all(|r| (0.0..=100.0).contains(&r.utilization)));
}

#[tokio::test]
async fn second_run_skips_collisions() {
	let (_dir, lib) = library().await;
	let mut rng = StdRng::seed_from_u64(5);
	populate(&lib, &small(), &mut rng).await.unwrap();
	let books = count(&lib, "books").await;

	let again = populate(&lib, &small(), &mut rng).await.unwrap();
	assert_eq!(again.books, 0);
	assert_eq!(count(&lib, "books").await, books);
}
