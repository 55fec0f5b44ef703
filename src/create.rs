//! Insert-only constructors for every entity.
//!
//! A constraint violation (duplicate id, isbn or email, dangling foreign key,
//! failed check) is an expected outcome and comes back as `Ok(None)`, so bulk
//! loaders can keep going after a collision. Anything else, lock contention
//! included, is an error.

use sqlx::query::QueryAs;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite};
use tracing::debug;

use crate::error::{rejection, Rejection, Result};
use crate::sql::Library;
use crate::types::*;

type Insert<'q, O> = QueryAs<'q, Sqlite, O, SqliteArguments<'q>>;

/// Something that can be inserted as a single row.
pub trait Record: Send + Sync {
	/// Row read back after the insert.
	type Created: for<'r> FromRow<'r, SqliteRow> + Send + Unpin;

	const TABLE: &'static str;

	/// `INSERT … RETURNING *` with one placeholder per bound field.
	const INSERT: &'static str;

	fn bind<'q>(&'q self, query: Insert<'q, Self::Created>) -> Insert<'q, Self::Created>;
}

impl Record for Author {
	type Created = Author;
	const TABLE: &'static str = "authors";
	const INSERT: &'static str = "INSERT INTO authors (author_id, name) VALUES (?, ?) RETURNING *";

	fn bind<'q>(&'q self, query: Insert<'q, Author>) -> Insert<'q, Author> {
		query.bind(self.author_id).bind(self.name.as_str())
	}
}

impl Record for Book {
	type Created = Book;
	const TABLE: &'static str = "books";
	const INSERT: &'static str = r#"
INSERT INTO books
	(book_id, title, isbn, published_year, genre)
VALUES
	(?, ?, ?, ?, ?)
RETURNING *"#;

	fn bind<'q>(&'q self, query: Insert<'q, Book>) -> Insert<'q, Book> {
		query
			.bind(self.book_id)
			.bind(self.title.as_str())
			.bind(self.isbn.as_deref())
			.bind(self.published_year)
			.bind(self.genre.as_deref())
	}
}

impl Record for BookAuthor {
	type Created = BookAuthor;
	const TABLE: &'static str = "book_authors";
	const INSERT: &'static str = "INSERT INTO book_authors (book_id, author_id) VALUES (?, ?) RETURNING *";

	fn bind<'q>(&'q self, query: Insert<'q, BookAuthor>) -> Insert<'q, BookAuthor> {
		query.bind(self.book_id).bind(self.author_id)
	}
}

impl Record for Member {
	type Created = Member;
	const TABLE: &'static str = "members";
	const INSERT: &'static str = r#"
INSERT INTO members
	(member_id, name, email, joined_at)
VALUES
	(?, ?, ?, ?)
RETURNING *"#;

	fn bind<'q>(&'q self, query: Insert<'q, Member>) -> Insert<'q, Member> {
		query
			.bind(self.member_id)
			.bind(self.name.as_str())
			.bind(self.email.as_str())
			.bind(self.joined_at)
	}
}

impl Record for BookCopy {
	type Created = BookCopy;
	const TABLE: &'static str = "copies";
	const INSERT: &'static str = "INSERT INTO copies (copy_id, book_id, status) VALUES (?, ?, ?) RETURNING *";

	fn bind<'q>(&'q self, query: Insert<'q, BookCopy>) -> Insert<'q, BookCopy> {
		query.bind(self.copy_id).bind(self.book_id).bind(self.status)
	}
}

impl Record for NewLoan {
	type Created = Loan;
	const TABLE: &'static str = "loans";
	// a NULL loan_id lets sqlite assign the next rowid
	const INSERT: &'static str = r#"
INSERT INTO loans
	(loan_id, copy_id, member_id, loan_date, due_date, return_date, status)
VALUES
	(?, ?, ?, ?, ?, ?, ?)
RETURNING *"#;

	fn bind<'q>(&'q self, query: Insert<'q, Loan>) -> Insert<'q, Loan> {
		query
			.bind(self.loan_id)
			.bind(self.copy_id)
			.bind(self.member_id)
			.bind(self.loan_date)
			.bind(self.due_date)
			.bind(self.return_date)
			.bind(self.status)
	}
}

impl Record for Fine {
	type Created = Fine;
	const TABLE: &'static str = "fines";
	const INSERT: &'static str = r#"
INSERT INTO fines
	(fine_id, member_id, loan_id, amount, assessed_at, paid, paid_at)
VALUES
	(?, ?, ?, ?, ?, ?, ?)
RETURNING *"#;

	fn bind<'q>(&'q self, query: Insert<'q, Fine>) -> Insert<'q, Fine> {
		query
			.bind(self.fine_id)
			.bind(self.member_id)
			.bind(self.loan_id)
			.bind(self.amount)
			.bind(self.assessed_at)
			.bind(self.paid)
			.bind(self.paid_at)
	}
}

impl Library {
	/// Inserts `record`, returning the stored row or `None` if a constraint refused it.
	pub async fn create<R: Record>(&self, record: &R) -> Result<Option<R::Created>> {
		let query = record.bind(sqlx::query_as::<Sqlite, R::Created>(R::INSERT));
		match query.fetch_one(self.pool()).await {
			Ok(row) => Ok(Some(row)),
			// a held write lock says nothing about the row, so only constraints mean "not created"
			Err(err) if rejection(&err) == Some(Rejection::Constraint) => {
				debug!(table = R::TABLE, error = %err, "not created");
				Ok(None)
			},
			Err(err) => Err(err.into()),
		}
	}

	pub async fn create_author(&self, author_id: Aid, name: impl Into<String>) -> Result<Option<Author>> {
		self.create(&Author { author_id, name: name.into() }).await
	}

	pub async fn create_book(&self, book: &Book) -> Result<Option<Book>> {
		self.create(book).await
	}

	pub async fn create_book_author(&self, book_id: Bid, author_id: Aid) -> Result<Option<BookAuthor>> {
		self.create(&BookAuthor { book_id, author_id }).await
	}

	pub async fn create_member(
		&self,
		member_id: Mid,
		name: impl Into<String>,
		email: impl Into<String>,
		joined_at: chrono::NaiveDateTime,
	) -> Result<Option<Member>> {
		self.create(&Member {
			member_id,
			name: name.into(),
			email: email.into(),
			joined_at,
		})
		.await
	}

	pub async fn create_copy(&self, copy_id: Cid, book_id: Bid, status: CopyStatus) -> Result<Option<BookCopy>> {
		self.create(&BookCopy { copy_id, book_id, status }).await
	}

	/// Records a loan as given. Unlike `request_loan` it does not touch the copy's status.
	pub async fn create_loan(&self, loan: &NewLoan) -> Result<Option<Loan>> {
		self.create(loan).await
	}

	pub async fn create_fine(&self, fine: &Fine) -> Result<Option<Fine>> {
		self.create(fine).await
	}
}
