#![allow(dead_code)]

use chrono::NaiveDateTime;
use lsys::{Book, Config, CopyStatus, Library};
use tempfile::TempDir;

/// Fresh file-backed library; keep the `TempDir` alive for the test's duration.
pub async fn library() -> (TempDir, Library) {
	let dir = tempfile::tempdir().unwrap();
	let mut cfg = Config::new(url(&dir));
	cfg.pool_size = 8;
	cfg.max_overflow = 0;
	let lib = Library::connect(&cfg).await.unwrap();
	lib.ensure_schema().await.unwrap();
	(dir, lib)
}

/// Url of the database file kept in `dir`.
pub fn url(dir: &TempDir) -> String {
	format!("sqlite://{}", dir.path().join("lsys.db").display())
}

pub async fn member(lib: &Library, member_id: i64, name: &str, email: &str) {
	lib.create_member(member_id, name, email, lsys::now()).await.unwrap().unwrap();
}

pub async fn book(lib: &Library, book_id: i64, title: &str) {
	lib.create_book(&Book::titled(book_id, title)).await.unwrap().unwrap();
}

pub async fn copy(lib: &Library, copy_id: i64, book_id: i64, status: CopyStatus) {
	lib.create_copy(copy_id, book_id, status).await.unwrap().unwrap();
}

/// One book with one available copy and one member, all with id 1.
pub async fn one_of_each(lib: &Library) {
	book(lib, 1, "Test Book").await;
	copy(lib, 1, 1, CopyStatus::Available).await;
	member(lib, 1, "Test Member", "test@example.com").await;
}

pub async fn count(lib: &Library, table: &str) -> i64 {
	sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
		.fetch_one(lib.pool())
		.await
		.unwrap()
}

pub fn at(s: &str) -> NaiveDateTime {
	NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}
