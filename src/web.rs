//! HTML front end: report tables and the three loan/fine actions.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
	Form, Router,
};
use maud::{html, Markup, DOCTYPE};
use serde::Deserialize;
use tracing::error;

use crate::error::Error;
use crate::report::*;
use crate::sql::Library;
use crate::types::*;

pub fn router(lib: Library) -> Router {
	Router::new()
		.route("/", get(display_index))
		.route("/reports/top-books", get(display_top_books))
		.route("/reports/overdue", get(display_overdue))
		.route("/reports/unpaid-fines", get(display_unpaid))
		.route("/reports/utilization", get(display_utilization))
		.route("/reports/genre-fines", get(display_genre_fines))
		.route("/members/:id/history", get(display_history))
		.route("/loans", post(perform_request_loan))
		.route("/loans/:id/return", post(perform_end_loan))
		.route("/fines/:id/pay", post(perform_pay_fine))
		.with_state(lib)
}

/// Maps library errors onto a 500 page; the details only go to the log.
pub struct WebError(Error);

impl From<Error> for WebError {
	fn from(err: Error) -> Self {
		WebError(err)
	}
}

impl IntoResponse for WebError {
	fn into_response(self) -> Response {
		error!(error = %self.0, "request failed");
		let body = page("Error", html! { p { "Something went wrong while talking to the database." } });
		(StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
	}
}

type Page = Result<Markup, WebError>;

#[derive(Debug, Deserialize)]
pub struct LimitParam {
	pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MinTotalParam {
	pub min_total: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LoanForm {
	pub copy_id: Cid,
	pub member_id: Mid,
}

const DEFAULT_LIMIT: i64 = 10;

fn page(title: &str, body: Markup) -> Markup {
	html! {
		(DOCTYPE)
		html {
			head { title { "lsys · " (title) } }
			body {
				h1 { (title) }
				(body)
				p { a href="/" { "back" } }
			}
		}
	}
}

fn date(at: &chrono::NaiveDateTime) -> String {
	at.format("%Y-%m-%d").to_string()
}

async fn display_index() -> Markup {
	page("Reports", html! { ul {
		li { a href="/reports/top-books" { "Top books" } }
		li { a href="/reports/overdue" { "Overdue members" } }
		li { a href="/reports/unpaid-fines" { "Unpaid fines" } }
		li { a href="/reports/utilization" { "Copy utilization" } }
		li { a href="/reports/genre-fines" { "Fines by genre" } }
	} })
}

pub fn render_top_books(rows: &[TopBook]) -> Markup {
	html! { table {
		thead { tr {
			th { "Book" }
			th { "Title" }
			th { "Loans" }
		} }
		tbody {
			@for row in rows {
				tr {
					td { (row.book_id) }
					td { (row.title) }
					td { (row.loan_count) }
				}
			}
		}
	} }
}

pub fn render_overdue(rows: &[OverdueMember]) -> Markup {
	html! { table {
		thead { tr {
			th { "Member" }
			th { "Name" }
			th { "Email" }
			th { "Overdue loans" }
			th { "Earliest due" }
		} }
		tbody {
			@for row in rows {
				tr {
					td { a href={ "/members/" (row.member_id) "/history" } { (row.member_id) } }
					td { (row.name) }
					td { (row.email) }
					td { (row.overdue_loans) }
					td { (date(&row.earliest_due)) }
				}
			}
		}
	} }
}

pub fn render_unpaid(rows: &[UnpaidFines]) -> Markup {
	html! { table {
		thead { tr {
			th { "Member" }
			th { "Name" }
			th { "Email" }
			th { "Unpaid" }
			th { "Fines" }
		} }
		tbody {
			@for row in rows {
				tr {
					td { (row.member_id) }
					td { (row.name) }
					td { (row.email) }
					td { (format!("{:.2}", row.total_unpaid)) }
					td { (row.unpaid_count) }
				}
			}
		}
	} }
}

pub fn render_utilization(rows: &[Utilization]) -> Markup {
	html! { table {
		thead { tr {
			th { "Book" }
			th { "Title" }
			th { "Copies" }
			th { "On loan" }
			th { "Utilization" }
		} }
		tbody {
			@for row in rows {
				tr {
					td { (row.book_id) }
					td { (row.title) }
					td { (row.total_copies) }
					td { (row.on_loan) }
					td { (format!("{:.1}%", row.utilization)) }
				}
			}
		}
	} }
}

pub fn render_genre_fines(rows: &[GenreFines]) -> Markup {
	html! { table {
		thead { tr {
			th { "Genre" }
			th { "Fines" }
			th { "Total" }
		} }
		tbody {
			@for row in rows {
				tr {
					td { (row.label()) }
					td { (row.fine_count) }
					td { (format!("{:.2}", row.total_fines)) }
				}
			}
		}
	} }
}

pub fn render_history(rows: &[HistoryEntry]) -> Markup {
	html! { table {
		thead { tr {
			th { "Loan" }
			th { "Copy" }
			th { "Loaned" }
			th { "Due" }
			th { "Status" }
		} }
		tbody {
			@for row in rows {
				tr {
					td { (row.loan_id) }
					td { (row.copy_id) }
					td { (date(&row.loan_date)) }
					td { (date(&row.due_date)) }
					td { (row.status) }
				}
			}
		}
	} }
}

async fn display_top_books(State(lib): State<Library>, Query(q): Query<LimitParam>) -> Page {
	let rows = lib.top_books(q.limit.unwrap_or(DEFAULT_LIMIT)).await?;
	Ok(page("Top books", render_top_books(&rows)))
}

async fn display_overdue(State(lib): State<Library>) -> Page {
	let rows = lib.overdue_members().await?;
	Ok(page("Overdue members", render_overdue(&rows)))
}

async fn display_unpaid(State(lib): State<Library>, Query(q): Query<MinTotalParam>) -> Page {
	let rows = lib.unpaid_fines_members(q.min_total.unwrap_or(0.0)).await?;
	Ok(page("Unpaid fines", render_unpaid(&rows)))
}

async fn display_utilization(State(lib): State<Library>, Query(q): Query<LimitParam>) -> Page {
	let rows = lib.copies_on_loan(q.limit.unwrap_or(DEFAULT_LIMIT)).await?;
	Ok(page("Copy utilization", render_utilization(&rows)))
}

async fn display_genre_fines(State(lib): State<Library>) -> Page {
	let rows = lib.genre_fine_stats().await?;
	Ok(page("Fines by genre", render_genre_fines(&rows)))
}

async fn display_history(State(lib): State<Library>, Path(member_id): Path<Mid>) -> Page {
	let rows = lib.member_history(member_id).await?;
	Ok(page(&format!("History of member {member_id}"), render_history(&rows)))
}

/// 200 with a confirmation, or 409 when the library turned the action down.
fn outcome(done: bool, ok: String, refused: String) -> Response {
	if done {
		(StatusCode::OK, page("Done", html! { p { (ok) } })).into_response()
	} else {
		(StatusCode::CONFLICT, page("Refused", html! { p { (refused) } })).into_response()
	}
}

async fn perform_request_loan(State(lib): State<Library>, Form(form): Form<LoanForm>) -> Result<Response, WebError> {
	let loan = lib.request_loan(form.copy_id, form.member_id).await?;
	Ok(match loan {
		Some(loan) => outcome(
			true,
			format!("Loan {} started, due {}.", loan.loan_id, date(&loan.due_date)),
			String::new(),
		),
		None => outcome(false, String::new(), format!("Copy {} can't be loaned right now.", form.copy_id)),
	})
}

async fn perform_end_loan(State(lib): State<Library>, Path(loan_id): Path<Lid>) -> Result<Response, WebError> {
	let done = lib.end_loan(loan_id).await?;
	Ok(outcome(
		done,
		format!("Loan {loan_id} returned."),
		format!("Loan {loan_id} is not active."),
	))
}

async fn perform_pay_fine(State(lib): State<Library>, Path(fine_id): Path<Fid>) -> Result<Response, WebError> {
	let done = lib.pay_fine(fine_id).await?;
	Ok(outcome(
		done,
		format!("Fine {fine_id} paid."),
		format!("Fine {fine_id} is missing or already paid."),
	))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn genre_table_shows_unknown_for_missing_genre() {
		let rows = vec![
			GenreFines { genre: Some("Fiction".into()), fine_count: 2, total_fines: 25.0 },
			GenreFines { genre: None, fine_count: 1, total_fines: 5.0 },
		];
		let html = render_genre_fines(&rows).into_string();
		assert!(html.contains("<td>Fiction</td><td>2</td><td>25.00</td>"));
		assert!(html.contains("<td>UNKNOWN</td><td>1</td><td>5.00</td>"));
	}

	#[test]
	fn top_books_rows_keep_report_order() {
		let rows = vec![
			TopBook { book_id: 2, title: "Book Two".into(), loan_count: 2 },
			TopBook { book_id: 1, title: "Book One".into(), loan_count: 1 },
		];
		let html = render_top_books(&rows).into_string();
		let two = html.find("Book Two").unwrap();
		let one = html.find("Book One").unwrap();
		assert!(two < one);
	}

	#[test]
	fn titles_are_escaped() {
		let rows = vec![TopBook { book_id: 1, title: "<script>".into(), loan_count: 1 }];
		let html = render_top_books(&rows).into_string();
		assert!(html.contains("&lt;script&gt;"));
		assert!(!html.contains("<script>"));
	}

	#[test]
	fn utilization_is_shown_as_percentage() {
		let rows = vec![Utilization { book_id: 1, title: "Loaned Book".into(), total_copies: 4, on_loan: 2, utilization: 50.0 }];
		let html = render_utilization(&rows).into_string();
		assert!(html.contains("<td>50.0%</td>"));
	}
}
