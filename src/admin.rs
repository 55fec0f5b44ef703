//! Index management and query-plan inspection for the report queries.
//!
//! These sit beside the core: they run raw DDL and `EXPLAIN QUERY PLAN`
//! against the same pool and carry none of the loan/fine invariants.

use std::str::FromStr;

use tracing::info;

use crate::error::{Error, Result};
use crate::report;
use crate::sql::Library;
use crate::types::{now, Mid};

/// Index name and the statement that creates it.
pub const INDEXES: &[(&str, &str)] = &[
	// top books: books -> copies -> loans
	("idx_copies_book_id", "CREATE INDEX IF NOT EXISTS idx_copies_book_id ON copies (book_id)"),
	("idx_loans_copy_id", "CREATE INDEX IF NOT EXISTS idx_loans_copy_id ON loans (copy_id)"),
	// overdue members
	(
		"idx_loans_status_due_date",
		"CREATE INDEX IF NOT EXISTS idx_loans_status_due_date ON loans (status, due_date)",
	),
	("idx_loans_member_id", "CREATE INDEX IF NOT EXISTS idx_loans_member_id ON loans (member_id)"),
	// unpaid fines
	("idx_fines_member_id", "CREATE INDEX IF NOT EXISTS idx_fines_member_id ON fines (member_id)"),
	(
		"idx_fines_unpaid_member",
		"CREATE INDEX IF NOT EXISTS idx_fines_unpaid_member ON fines (member_id) WHERE paid = FALSE",
	),
];

pub async fn create_indexes(lib: &Library) -> Result<()> {
	info!("creating indexes");
	let mut tx = lib.pool().begin().await?;
	for (_, stmt) in INDEXES {
		info!("running: {stmt}");
		sqlx::query(stmt).execute(&mut *tx).await?;
	}
	tx.commit().await?;
	info!("index creation complete");
	Ok(())
}

pub async fn drop_indexes(lib: &Library) -> Result<()> {
	info!("dropping indexes");
	let mut tx = lib.pool().begin().await?;
	for (name, _) in INDEXES {
		let stmt = format!("DROP INDEX IF EXISTS {name}");
		info!("running: {stmt}");
		sqlx::query(&stmt).execute(&mut *tx).await?;
	}
	tx.commit().await?;
	info!("index drop complete");
	Ok(())
}

/// Names of the [`INDEXES`] currently present in the database.
pub async fn existing_indexes(lib: &Library) -> Result<Vec<String>> {
	let names = sqlx::query_scalar::<_, String>("SELECT name FROM sqlite_master WHERE type = 'index' ORDER BY name")
		.fetch_all(lib.pool())
		.await?;
	Ok(names
		.into_iter()
		.filter(|name| INDEXES.iter().any(|(known, _)| known == name))
		.collect())
}

/// Report queries whose plan can be inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainQuery {
	TopBooks,
	OverdueMembers,
	UnpaidFines,
	MemberHistory,
	CopiesOnLoan,
	GenreFines,
}

impl ExplainQuery {
	pub const ALL: [ExplainQuery; 6] = [
		ExplainQuery::TopBooks,
		ExplainQuery::OverdueMembers,
		ExplainQuery::UnpaidFines,
		ExplainQuery::MemberHistory,
		ExplainQuery::CopiesOnLoan,
		ExplainQuery::GenreFines,
	];

	pub fn name(self) -> &'static str {
		match self {
			ExplainQuery::TopBooks => "top-books",
			ExplainQuery::OverdueMembers => "overdue-members",
			ExplainQuery::UnpaidFines => "unpaid-fines",
			ExplainQuery::MemberHistory => "member-history",
			ExplainQuery::CopiesOnLoan => "copies-on-loan",
			ExplainQuery::GenreFines => "genre-fines",
		}
	}

	fn sql(self) -> &'static str {
		match self {
			ExplainQuery::TopBooks => report::TOP_BOOKS,
			ExplainQuery::OverdueMembers => report::OVERDUE_MEMBERS,
			ExplainQuery::UnpaidFines => report::UNPAID_FINES,
			ExplainQuery::MemberHistory => report::MEMBER_HISTORY,
			ExplainQuery::CopiesOnLoan => report::COPIES_ON_LOAN,
			ExplainQuery::GenreFines => report::GENRE_FINES,
		}
	}
}

impl std::fmt::Display for ExplainQuery {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for ExplainQuery {
	type Err = Error;
	fn from_str(s: &str) -> Result<Self> {
		ExplainQuery::ALL
			.into_iter()
			.find(|q| q.name() == s)
			.ok_or_else(|| Error::UnknownQuery(s.to_string()))
	}
}

/// Values bound into the explained query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplainParams {
	pub limit: i64,
	pub member_id: Mid,
	pub min_total: f64,
}

impl Default for ExplainParams {
	fn default() -> Self {
		ExplainParams {
			limit: 10,
			member_id: 1,
			min_total: 20.0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PlanStep {
	pub id: i64,
	pub parent: i64,
	pub detail: String,
}

/// Runs `EXPLAIN QUERY PLAN` over the report's own SQL and logs the plan.
pub async fn explain(lib: &Library, query: ExplainQuery, params: ExplainParams) -> Result<Vec<PlanStep>> {
	info!("running EXPLAIN QUERY PLAN for: {query}");
	let sql = format!("EXPLAIN QUERY PLAN {}", query.sql());
	let stmt = sqlx::query_as::<_, PlanStep>(&sql);
	let stmt = match query {
		ExplainQuery::TopBooks | ExplainQuery::CopiesOnLoan => stmt.bind(params.limit),
		ExplainQuery::OverdueMembers => stmt.bind(now()),
		ExplainQuery::UnpaidFines => stmt.bind(params.min_total).bind(params.min_total),
		ExplainQuery::MemberHistory => stmt.bind(params.member_id).bind(crate::report::HISTORY_LIMIT),
		ExplainQuery::GenreFines => stmt,
	};
	let plan = stmt.fetch_all(lib.pool()).await?;
	info!("{}", render_plan(&plan));
	Ok(plan)
}

pub fn render_plan(plan: &[PlanStep]) -> String {
	let mut out = String::from("\n======== EXPLAIN QUERY PLAN ========\n");
	for step in plan {
		// children are indented under their parent step
		let depth = plan_depth(plan, step);
		out.push_str(&"  ".repeat(depth));
		out.push_str(&step.detail);
		out.push('\n');
	}
	out.push_str("====================================");
	out
}

fn plan_depth(plan: &[PlanStep], step: &PlanStep) -> usize {
	let mut depth = 0;
	let mut parent = step.parent;
	while parent != 0 && depth < plan.len() {
		match plan.iter().find(|s| s.id == parent) {
			Some(up) => {
				depth += 1;
				parent = up.parent;
			},
			None => break,
		}
	}
	depth
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_names_round_trip() {
		for q in ExplainQuery::ALL {
			assert_eq!(q.name().parse::<ExplainQuery>().unwrap(), q);
		}
	}

	#[test]
	fn unknown_query_name_is_rejected() {
		let err = "most-fined-cats".parse::<ExplainQuery>().unwrap_err();
		assert!(matches!(err, Error::UnknownQuery(name) if name == "most-fined-cats"));
	}

	#[test]
	fn plan_rendering_nests_children() {
		let plan = vec![
			PlanStep { id: 2, parent: 0, detail: "SCAN b".into() },
			PlanStep { id: 5, parent: 2, detail: "SEARCH c USING INDEX".into() },
		];
		let out = render_plan(&plan);
		assert!(out.contains("\nSCAN b\n"));
		assert!(out.contains("\n  SEARCH c USING INDEX\n"));
	}
}
