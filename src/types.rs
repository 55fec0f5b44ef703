use chrono::{Duration, NaiveDateTime};

pub type Aid = i64;
pub type Bid = i64;
pub type Mid = i64;
pub type Cid = i64;
pub type Lid = i64;
pub type Fid = i64;

/// Loan period handed out by `request_loan`.
pub const LOAN_PERIOD_DAYS: i64 = 14;

pub fn loan_period() -> Duration {
	Duration::days(LOAN_PERIOD_DAYS)
}

/// Current time in UTC, the clock every mutator stamps rows with.
pub fn now() -> NaiveDateTime {
	chrono::Utc::now().naive_utc()
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Author {
	pub author_id: Aid,
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Book {
	pub book_id: Bid,
	pub title: String,
	pub isbn: Option<String>,
	pub published_year: Option<i32>,
	pub genre: Option<String>,
}

impl Book {
	/// A book with only the required fields set.
	pub fn titled(book_id: Bid, title: impl Into<String>) -> Self {
		Book {
			book_id,
			title: title.into(),
			isbn: None,
			published_year: None,
			genre: None,
		}
	}

	pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
		self.genre = Some(genre.into());
		self
	}

	pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
		self.isbn = Some(isbn.into());
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct BookAuthor {
	pub book_id: Bid,
	pub author_id: Aid,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Member {
	pub member_id: Mid,
	pub name: String,
	pub email: String,
	pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum CopyStatus {
	Available,
	OnLoan,
	Lost,
}

impl std::fmt::Display for CopyStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str(match self {
			CopyStatus::Available => "available",
			CopyStatus::OnLoan => "on_loan",
			CopyStatus::Lost => "lost",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct BookCopy {
	pub copy_id: Cid,
	pub book_id: Bid,
	pub status: CopyStatus,
}

/// Loan standing.
///
/// Only `Active` and `Returned` are ever stored. `Overdue` is what
/// [`Loan::standing`] reports for an active loan past its due date; the
/// loans table rejects it as a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum LoanStatus {
	Active,
	Returned,
	Overdue,
}

impl std::fmt::Display for LoanStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str(match self {
			LoanStatus::Active => "active",
			LoanStatus::Returned => "returned",
			LoanStatus::Overdue => "overdue",
		})
	}
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Loan {
	pub loan_id: Lid,
	pub copy_id: Cid,
	pub member_id: Mid,
	pub loan_date: NaiveDateTime,
	pub due_date: NaiveDateTime,
	pub return_date: Option<NaiveDateTime>,
	pub status: LoanStatus,
}

impl Loan {
	pub fn is_open(&self) -> bool {
		self.status == LoanStatus::Active && self.return_date.is_none()
	}

	/// Stored status, with open loans past `due_date` reported as `Overdue`.
	pub fn standing(&self, at: NaiveDateTime) -> LoanStatus {
		if self.is_open() && self.due_date < at {
			LoanStatus::Overdue
		} else {
			self.status
		}
	}
}

/// Loan as handed to `create_loan`; the store picks the id when `loan_id` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
	pub loan_id: Option<Lid>,
	pub copy_id: Cid,
	pub member_id: Mid,
	pub loan_date: NaiveDateTime,
	pub due_date: NaiveDateTime,
	pub return_date: Option<NaiveDateTime>,
	pub status: LoanStatus,
}

impl NewLoan {
	/// An open loan starting at `loan_date` for the standard loan period.
	pub fn active(copy_id: Cid, member_id: Mid, loan_date: NaiveDateTime) -> Self {
		NewLoan {
			loan_id: None,
			copy_id,
			member_id,
			loan_date,
			due_date: loan_date + loan_period(),
			return_date: None,
			status: LoanStatus::Active,
		}
	}

	pub fn with_id(mut self, loan_id: Lid) -> Self {
		self.loan_id = Some(loan_id);
		self
	}

	pub fn due(mut self, due_date: NaiveDateTime) -> Self {
		self.due_date = due_date;
		self
	}

	pub fn returned(mut self, return_date: NaiveDateTime) -> Self {
		self.return_date = Some(return_date);
		self.status = LoanStatus::Returned;
		self
	}
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Fine {
	pub fine_id: Fid,
	pub member_id: Mid,
	pub loan_id: Option<Lid>,
	pub amount: f64,
	pub assessed_at: NaiveDateTime,
	pub paid: bool,
	pub paid_at: Option<NaiveDateTime>,
}

impl Fine {
	pub fn unpaid(fine_id: Fid, member_id: Mid, loan_id: Option<Lid>, amount: f64, assessed_at: NaiveDateTime) -> Self {
		Fine {
			fine_id,
			member_id,
			loan_id,
			amount,
			assessed_at,
			paid: false,
			paid_at: None,
		}
	}

	pub fn paid_on(mut self, paid_at: NaiveDateTime) -> Self {
		self.paid = true;
		self.paid_at = Some(paid_at);
		self
	}
}
