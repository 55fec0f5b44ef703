//! The three state transitions that need at-most-one-winner semantics.
//!
//! Each one opens a transaction whose first statement is a conditional
//! `UPDATE … WHERE <status is the expected one>` on the row being moved.
//! That statement takes sqlite's write lock, which is held until commit or
//! rollback, so concurrent callers either wait and then see the new status
//! (zero rows claimed), or give up with BUSY. Both count as losing.
//! The lock covers the whole database, so BUSY can also come from an
//! unrelated writer holding it past the busy timeout; the transition then
//! reports failure although nobody claimed the row, and a retry may win.
//! Dropping a `Transaction` without committing rolls it back, so every early
//! return below leaves the store untouched.

use sqlx::{Sqlite, Transaction};
use tracing::{error, info, warn};

use crate::error::{tolerate, Result};
use crate::sql::Library;
use crate::types::*;

impl Library {
	/// Loans `copy_id` to `member_id` for [`LOAN_PERIOD_DAYS`].
	///
	/// Returns `None` when the copy is missing or not available, when the
	/// member does not exist, or when another caller won the copy first.
	pub async fn request_loan(&self, copy_id: Cid, member_id: Mid) -> Result<Option<Loan>> {
		let mut tx = self.pool().begin().await?;

		let claimed = sqlx::query("UPDATE copies SET status = ? WHERE copy_id = ? AND status = ?")
			.bind(CopyStatus::OnLoan)
			.bind(copy_id)
			.bind(CopyStatus::Available)
			.execute(&mut *tx)
			.await;
		match tolerate(claimed)? {
			Ok(done) if done.rows_affected() == 1 => {},
			Ok(_) => {
				let status = copy_status(&mut tx, copy_id).await?;
				warn!(copy_id, member_id, ?status, "loan refused: copy not available");
				return Ok(None);
			},
			Err(why) => {
				warn!(copy_id, member_id, "loan refused: {why}");
				return Ok(None);
			},
		}

		let loaned = now();
		let loan = NewLoan::active(copy_id, member_id, loaned);
		let inserted = sqlx::query_as::<_, Loan>(
			r#"
INSERT INTO loans
	(copy_id, member_id, loan_date, due_date, return_date, status)
VALUES
	(?, ?, ?, ?, NULL, ?)
RETURNING *"#,
		)
		.bind(loan.copy_id)
		.bind(loan.member_id)
		.bind(loan.loan_date)
		.bind(loan.due_date)
		.bind(loan.status)
		.fetch_one(&mut *tx)
		.await;
		let loan = match tolerate(inserted)? {
			Ok(loan) => loan,
			Err(why) => {
				warn!(copy_id, member_id, "loan refused: {why}");
				return Ok(None);
			},
		};

		if let Err(why) = tolerate(tx.commit().await)? {
			warn!(copy_id, member_id, "loan refused at commit: {why}");
			return Ok(None);
		}
		info!(loan_id = loan.loan_id, copy_id, member_id, due = %loan.due_date, "loan started");
		Ok(Some(loan))
	}

	/// Returns the copy behind an active loan. `false` if the loan is missing,
	/// already returned, or its copy has vanished.
	pub async fn end_loan(&self, loan_id: Lid) -> Result<bool> {
		let mut tx = self.pool().begin().await?;

		let claimed = sqlx::query_scalar::<_, Cid>(
			"UPDATE loans SET status = ?, return_date = ? WHERE loan_id = ? AND status = ? RETURNING copy_id",
		)
		.bind(LoanStatus::Returned)
		.bind(now())
		.bind(loan_id)
		.bind(LoanStatus::Active)
		.fetch_optional(&mut *tx)
		.await;
		let copy_id = match tolerate(claimed)? {
			Ok(Some(copy_id)) => copy_id,
			Ok(None) => {
				let status = loan_status(&mut tx, loan_id).await?;
				warn!(loan_id, ?status, "return refused: loan not active");
				return Ok(false);
			},
			Err(why) => {
				warn!(loan_id, "return refused: {why}");
				return Ok(false);
			},
		};

		let released = sqlx::query("UPDATE copies SET status = ? WHERE copy_id = ?")
			.bind(CopyStatus::Available)
			.bind(copy_id)
			.execute(&mut *tx)
			.await;
		match tolerate(released)? {
			Ok(done) if done.rows_affected() == 1 => {},
			Ok(_) => {
				error!(loan_id, copy_id, "data integrity error: loan references a copy that does not exist");
				return Ok(false);
			},
			Err(why) => {
				warn!(loan_id, copy_id, "return refused: {why}");
				return Ok(false);
			},
		}

		if let Err(why) = tolerate(tx.commit().await)? {
			warn!(loan_id, "return refused at commit: {why}");
			return Ok(false);
		}
		info!(loan_id, copy_id, "loan ended");
		Ok(true)
	}

	/// Marks an unpaid fine as paid. `false` if it is missing or already paid.
	pub async fn pay_fine(&self, fine_id: Fid) -> Result<bool> {
		let mut tx = self.pool().begin().await?;

		let claimed = sqlx::query("UPDATE fines SET paid = TRUE, paid_at = ? WHERE fine_id = ? AND paid = FALSE")
			.bind(now())
			.bind(fine_id)
			.execute(&mut *tx)
			.await;
		match tolerate(claimed)? {
			Ok(done) if done.rows_affected() == 1 => {},
			Ok(_) => {
				let paid = sqlx::query_scalar::<_, bool>("SELECT paid FROM fines WHERE fine_id = ?")
					.bind(fine_id)
					.fetch_optional(&mut *tx)
					.await?;
				match paid {
					Some(_) => warn!(fine_id, "payment refused: fine already paid"),
					None => warn!(fine_id, "payment refused: no such fine"),
				}
				return Ok(false);
			},
			Err(why) => {
				warn!(fine_id, "payment refused: {why}");
				return Ok(false);
			},
		}

		if let Err(why) = tolerate(tx.commit().await)? {
			warn!(fine_id, "payment refused at commit: {why}");
			return Ok(false);
		}
		info!(fine_id, "fine paid");
		Ok(true)
	}

	pub async fn copy(&self, copy_id: Cid) -> Result<Option<BookCopy>> {
		let copy = sqlx::query_as::<_, BookCopy>("SELECT * FROM copies WHERE copy_id = ?")
			.bind(copy_id)
			.fetch_optional(self.pool())
			.await?;
		Ok(copy)
	}

	pub async fn loan(&self, loan_id: Lid) -> Result<Option<Loan>> {
		let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE loan_id = ?")
			.bind(loan_id)
			.fetch_optional(self.pool())
			.await?;
		Ok(loan)
	}

	pub async fn fine(&self, fine_id: Fid) -> Result<Option<Fine>> {
		let fine = sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE fine_id = ?")
			.bind(fine_id)
			.fetch_optional(self.pool())
			.await?;
		Ok(fine)
	}

	/// Active loans recorded against `copy_id`; at most one by construction.
	pub async fn open_loans_for_copy(&self, copy_id: Cid) -> Result<Vec<Loan>> {
		let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE copy_id = ? AND status = ?")
			.bind(copy_id)
			.bind(LoanStatus::Active)
			.fetch_all(self.pool())
			.await?;
		Ok(loans)
	}
}

async fn copy_status(tx: &mut Transaction<'_, Sqlite>, copy_id: Cid) -> Result<Option<CopyStatus>> {
	let status = sqlx::query_scalar("SELECT status FROM copies WHERE copy_id = ?")
		.bind(copy_id)
		.fetch_optional(&mut **tx)
		.await?;
	Ok(status)
}

async fn loan_status(tx: &mut Transaction<'_, Sqlite>, loan_id: Lid) -> Result<Option<LoanStatus>> {
	let status = sqlx::query_scalar("SELECT status FROM loans WHERE loan_id = ?")
		.bind(loan_id)
		.fetch_optional(&mut **tx)
		.await?;
	Ok(status)
}
