use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;

/// Table definitions, applied in order by [`Library::ensure_schema`].
///
/// Statuses are stored as snake_case text. `overdue` is not a storable loan
/// status, it is derived from `due_date`. The partial unique index keeps a
/// copy from having two active loans while letting it be loaned again after
/// a return.
pub const TABLE_SCHEMA: &[&str] = &[
	r#"
CREATE TABLE IF NOT EXISTS authors (
	author_id INTEGER NOT NULL PRIMARY KEY,
	name TEXT NOT NULL CHECK (length(name) > 0)
)"#,
	r#"
CREATE TABLE IF NOT EXISTS books (
	book_id INTEGER NOT NULL PRIMARY KEY,
	title TEXT NOT NULL,
	isbn TEXT UNIQUE,
	published_year INTEGER,
	genre TEXT
)"#,
	r#"
CREATE TABLE IF NOT EXISTS book_authors (
	book_id INTEGER NOT NULL REFERENCES books(book_id),
	author_id INTEGER NOT NULL REFERENCES authors(author_id),
	PRIMARY KEY (book_id, author_id)
)"#,
	r#"
CREATE TABLE IF NOT EXISTS members (
	member_id INTEGER NOT NULL PRIMARY KEY,
	name TEXT NOT NULL,
	email TEXT NOT NULL UNIQUE,
	joined_at DATETIME NOT NULL
)"#,
	r#"
CREATE TABLE IF NOT EXISTS copies (
	copy_id INTEGER NOT NULL PRIMARY KEY,
	book_id INTEGER NOT NULL REFERENCES books(book_id),
	status TEXT NOT NULL CHECK (status IN ('available', 'on_loan', 'lost'))
)"#,
	r#"
CREATE TABLE IF NOT EXISTS loans (
	loan_id INTEGER PRIMARY KEY AUTOINCREMENT,
	copy_id INTEGER NOT NULL REFERENCES copies(copy_id),
	member_id INTEGER NOT NULL REFERENCES members(member_id),
	loan_date DATETIME NOT NULL,
	due_date DATETIME NOT NULL,
	return_date DATETIME,
	status TEXT NOT NULL CHECK (status IN ('active', 'returned')),
	CHECK ((status = 'returned') = (return_date IS NOT NULL))
)"#,
	r#"
CREATE UNIQUE INDEX IF NOT EXISTS uq_loans_open_copy
	ON loans (copy_id) WHERE status = 'active'"#,
	r#"
CREATE TABLE IF NOT EXISTS fines (
	fine_id INTEGER NOT NULL PRIMARY KEY,
	member_id INTEGER NOT NULL REFERENCES members(member_id),
	loan_id INTEGER REFERENCES loans(loan_id),
	amount REAL NOT NULL CHECK (amount >= 0),
	assessed_at DATETIME NOT NULL,
	paid BOOLEAN NOT NULL DEFAULT FALSE,
	paid_at DATETIME,
	CHECK (paid = (paid_at IS NOT NULL))
)"#,
];

/// Handle on the library database. Cheap to clone, clones share one pool.
#[derive(Debug, Clone)]
pub struct Library {
	db: Pool<Sqlite>,
}

impl Library {
	pub async fn connect(cfg: &Config) -> Result<Self> {
		let opts = SqliteConnectOptions::from_str(&cfg.database_url)?
			.create_if_missing(true)
			.foreign_keys(true);

		let mut pool = SqlitePoolOptions::new()
			.acquire_timeout(cfg.acquire_timeout)
			.test_before_acquire(cfg.pre_ping);

		let opts = if cfg.is_memory() {
			// every connection to :memory: is a separate database, so keep exactly one alive
			debug!("in-memory database, pinning pool to a single connection");
			pool = pool
				.max_connections(1)
				.min_connections(1)
				.idle_timeout(None)
				.max_lifetime(None);
			opts
		} else {
			pool = pool.max_connections(cfg.max_connections());
			opts.journal_mode(SqliteJournalMode::Wal)
		};

		let db = pool.connect_with(opts).await?;
		info!(url = %cfg.database_url, max_connections = cfg.max_connections(), "connected");
		Ok(Library { db })
	}

	/// Wraps an existing pool. Foreign keys must be enabled on its connections.
	pub fn from_pool(db: Pool<Sqlite>) -> Self {
		Library { db }
	}

	pub fn pool(&self) -> &Pool<Sqlite> {
		&self.db
	}

	/// Creates every table and index that is missing. Safe to call repeatedly.
	pub async fn ensure_schema(&self) -> Result<()> {
		let mut tx = self.db.begin().await?;
		for stmt in TABLE_SCHEMA {
			sqlx::query(stmt).execute(&mut *tx).await?;
		}
		tx.commit().await?;
		debug!(statements = TABLE_SCHEMA.len(), "schema ensured");
		Ok(())
	}

	pub async fn close(&self) {
		self.db.close().await
	}
}
