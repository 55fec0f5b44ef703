//! Read-only aggregate reports.
//!
//! Row order is part of each report's contract; every query carries an
//! explicit tie-break.

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::sql::Library;
use crate::types::*;

/// Rows returned by `member_history` when no limit is given.
pub const HISTORY_LIMIT: i64 = 50;

pub(crate) const TOP_BOOKS: &str = r#"
SELECT
	b.book_id,
	b.title,
	COUNT(*) AS loan_count
FROM books b
JOIN copies c ON c.book_id = b.book_id
JOIN loans l ON l.copy_id = c.copy_id
GROUP BY b.book_id, b.title
ORDER BY loan_count DESC, b.title ASC
LIMIT ?"#;

// overdue is the active + unreturned + past-due predicate, never a stored status
pub(crate) const OVERDUE_MEMBERS: &str = r#"
SELECT
	m.member_id,
	m.name,
	m.email,
	COUNT(*) AS overdue_loans,
	MIN(l.due_date) AS earliest_due
FROM members m
JOIN loans l ON l.member_id = m.member_id
WHERE l.status = 'active'
	AND l.return_date IS NULL
	AND l.due_date < ?
GROUP BY m.member_id, m.name, m.email
ORDER BY overdue_loans DESC, earliest_due ASC"#;

pub(crate) const UNPAID_FINES: &str = r#"
SELECT
	m.member_id,
	m.name,
	m.email,
	TOTAL(f.amount) AS total_unpaid,
	COUNT(*) AS unpaid_count
FROM members m
JOIN fines f ON f.member_id = m.member_id
WHERE f.paid = FALSE
GROUP BY m.member_id, m.name, m.email
HAVING ? <= 0 OR TOTAL(f.amount) >= ?
ORDER BY total_unpaid DESC, unpaid_count DESC"#;

pub(crate) const COPIES_ON_LOAN: &str = r#"
SELECT
	b.book_id,
	b.title,
	COUNT(c.copy_id) AS total_copies,
	COUNT(CASE WHEN c.status = 'on_loan' THEN 1 END) AS on_loan,
	CASE
		WHEN COUNT(c.copy_id) = 0 THEN 0.0
		ELSE COUNT(CASE WHEN c.status = 'on_loan' THEN 1 END) * 100.0 / COUNT(c.copy_id)
	END AS utilization
FROM books b
LEFT JOIN copies c ON c.book_id = b.book_id
GROUP BY b.book_id, b.title
ORDER BY utilization DESC, total_copies DESC
LIMIT ?"#;

pub(crate) const GENRE_FINES: &str = r#"
SELECT
	b.genre,
	COUNT(*) AS fine_count,
	TOTAL(f.amount) AS total_fines
FROM fines f
JOIN loans l ON l.loan_id = f.loan_id
JOIN copies c ON c.copy_id = l.copy_id
JOIN books b ON b.book_id = c.book_id
GROUP BY b.genre
ORDER BY total_fines DESC, b.genre ASC"#;

pub(crate) const MEMBER_HISTORY: &str = r#"
SELECT
	loan_id,
	copy_id,
	loan_date,
	due_date,
	status
FROM loans
WHERE member_id = ?
ORDER BY loan_date DESC, loan_id DESC
LIMIT ?"#;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TopBook {
	pub book_id: Bid,
	pub title: String,
	pub loan_count: i64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OverdueMember {
	pub member_id: Mid,
	pub name: String,
	pub email: String,
	pub overdue_loans: i64,
	pub earliest_due: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UnpaidFines {
	pub member_id: Mid,
	pub name: String,
	pub email: String,
	pub total_unpaid: f64,
	pub unpaid_count: i64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Utilization {
	pub book_id: Bid,
	pub title: String,
	pub total_copies: i64,
	pub on_loan: i64,
	/// Percentage of copies on loan, 0.0 for a book without copies.
	pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GenreFines {
	pub genre: Option<String>,
	pub fine_count: i64,
	pub total_fines: f64,
}

impl GenreFines {
	pub const UNKNOWN: &'static str = "UNKNOWN";

	/// Genre for display; books without one are grouped as `UNKNOWN`.
	pub fn label(&self) -> &str {
		self.genre.as_deref().unwrap_or(Self::UNKNOWN)
	}
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct HistoryEntry {
	pub loan_id: Lid,
	pub copy_id: Cid,
	pub loan_date: NaiveDateTime,
	pub due_date: NaiveDateTime,
	pub status: LoanStatus,
}

impl Library {
	/// Most loaned books, ties broken by title.
	pub async fn top_books(&self, limit: i64) -> Result<Vec<TopBook>> {
		let rows = sqlx::query_as::<_, TopBook>(TOP_BOOKS)
			.bind(limit)
			.fetch_all(self.pool())
			.await?;
		Ok(rows)
	}

	/// Members holding loans that are active, unreturned and past due.
	pub async fn overdue_members(&self) -> Result<Vec<OverdueMember>> {
		self.overdue_members_at(now()).await
	}

	/// `overdue_members` evaluated against a fixed clock.
	pub async fn overdue_members_at(&self, at: NaiveDateTime) -> Result<Vec<OverdueMember>> {
		let rows = sqlx::query_as::<_, OverdueMember>(OVERDUE_MEMBERS)
			.bind(at)
			.fetch_all(self.pool())
			.await?;
		Ok(rows)
	}

	/// Unpaid totals per member. A positive `min_total` drops members below it.
	pub async fn unpaid_fines_members(&self, min_total: f64) -> Result<Vec<UnpaidFines>> {
		let rows = sqlx::query_as::<_, UnpaidFines>(UNPAID_FINES)
			.bind(min_total)
			.bind(min_total)
			.fetch_all(self.pool())
			.await?;
		Ok(rows)
	}

	pub async fn copies_on_loan(&self, limit: i64) -> Result<Vec<Utilization>> {
		let rows = sqlx::query_as::<_, Utilization>(COPIES_ON_LOAN)
			.bind(limit)
			.fetch_all(self.pool())
			.await?;
		Ok(rows)
	}

	pub async fn genre_fine_stats(&self) -> Result<Vec<GenreFines>> {
		let rows = sqlx::query_as::<_, GenreFines>(GENRE_FINES)
			.fetch_all(self.pool())
			.await?;
		Ok(rows)
	}

	/// A member's loans, newest first, capped at [`HISTORY_LIMIT`].
	pub async fn member_history(&self, member_id: Mid) -> Result<Vec<HistoryEntry>> {
		self.member_history_limit(member_id, HISTORY_LIMIT).await
	}

	pub async fn member_history_limit(&self, member_id: Mid, limit: i64) -> Result<Vec<HistoryEntry>> {
		let rows = sqlx::query_as::<_, HistoryEntry>(MEMBER_HISTORY)
			.bind(member_id)
			.bind(limit)
			.fetch_all(self.pool())
			.await?;
		Ok(rows)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_genre_is_labelled_unknown() {
		let row = GenreFines {
			genre: None,
			fine_count: 1,
			total_fines: 2.5,
		};
		assert_eq!(row.label(), "UNKNOWN");
		let row = GenreFines {
			genre: Some("Poetry".into()),
			..row
		};
		assert_eq!(row.label(), "Poetry");
	}
}
