//! Synthetic library data, generated through the regular create calls.
//!
//! Every insert goes through [`Library::create`], so a collision (an isbn or
//! email drawn twice) just skips that row and generation carries on.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::error::Result;
use crate::sql::Library;
use crate::types::*;

const FIRST_NAMES: &[&str] = &[
	"Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "Hedy", "John",
	"Ken", "Leslie", "Margaret", "Niklaus", "Radia", "Tim",
];

const LAST_NAMES: &[&str] = &[
	"Allen", "Backus", "Dijkstra", "Hamilton", "Hopper", "Kay", "Knuth", "Lamarr", "Lamport",
	"Liskov", "Lovelace", "Perlman", "Ritchie", "Shannon", "Thompson", "Wirth",
];

const GENRES: &[&str] = &[
	"Fiction", "Non-Fiction", "Mystery", "Science Fiction", "Fantasy", "Biography", "History",
	"Poetry", "Romance", "Education",
];

const TITLE_PARTS: &[&[&str]] = &[
	&["The", "A", "Another", "Our"],
	&["Silent", "Hidden", "Last", "Broken", "Golden", "Endless"],
	&["River", "Garden", "Compiler", "Kingdom", "Letter", "Machine"],
	&["of Dreams", "at Dawn", "in Winter", "Reborn", "Revisited", ""],
];

/// Copy statuses drawn with a 3:1:1 available / on loan / lost weighting.
const COPY_STATUSES: &[CopyStatus] = &[
	CopyStatus::Available,
	CopyStatus::Available,
	CopyStatus::Available,
	CopyStatus::OnLoan,
	CopyStatus::Lost,
];

const FINE_PER_DAY: f64 = 0.50;

#[derive(Debug, Clone, PartialEq)]
pub struct PopulateOptions {
	pub num_authors: i64,
	pub num_books: i64,
	pub num_members: i64,
	/// Average copies per book; each book gets 1 to twice this many.
	pub copies_per_book: i64,
	pub num_loans: i64,
	/// Chance that a late loan is fined, 0.0 to 1.0.
	pub fine_probability: f64,
}

impl Default for PopulateOptions {
	fn default() -> Self {
		PopulateOptions {
			num_authors: 1000,
			num_books: 1000,
			num_members: 1000,
			copies_per_book: 3,
			num_loans: 1000,
			fine_probability: 0.2,
		}
	}
}

/// Rows actually created by [`populate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateSummary {
	pub authors: usize,
	pub books: usize,
	pub book_authors: usize,
	pub members: usize,
	pub copies: usize,
	pub loans: usize,
	pub fines: usize,
}

fn pick<'a, R: Rng>(rng: &mut R, from: &[&'a str]) -> &'a str {
	from.choose(rng).copied().unwrap_or_default()
}

fn person<R: Rng>(rng: &mut R) -> String {
	format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

fn title<R: Rng>(rng: &mut R) -> String {
	TITLE_PARTS
		.iter()
		.map(|part| pick(rng, part))
		.filter(|word| !word.is_empty())
		.collect::<Vec<_>>()
		.join(" ")
}

fn isbn<R: Rng>(rng: &mut R) -> String {
	format!(
		"{}-{}-{}-{}-{}",
		rng.gen_range(100..=999),
		rng.gen_range(1..=9),
		rng.gen_range(10..=99),
		rng.gen_range(100_000..=999_999),
		rng.gen_range(0..=9),
	)
}

fn epoch() -> NaiveDateTime {
	NaiveDate::from_ymd_opt(2020, 1, 1)
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.unwrap_or_default()
}

/// Fills `lib` with random authors, books, members, copies, loans and fines.
///
/// Open loans only go to copies generated as on loan (each used once), so a
/// copy's status always agrees with its loans. Ensures the schema first.
pub async fn populate<R: Rng + Send>(lib: &Library, opts: &PopulateOptions, rng: &mut R) -> Result<PopulateSummary> {
	lib.ensure_schema().await?;
	let mut summary = PopulateSummary::default();

	info!("creating authors...");
	let mut author_ids = Vec::new();
	for id in 1..=opts.num_authors {
		let name = person(rng);
		if lib.create_author(id, name).await?.is_some() {
			author_ids.push(id);
		}
	}
	summary.authors = author_ids.len();
	info!("created {} authors", summary.authors);

	info!("creating books...");
	let mut book_ids = Vec::new();
	for id in 1..=opts.num_books {
		let book = Book {
			book_id: id,
			title: title(rng),
			isbn: Some(isbn(rng)),
			published_year: Some(rng.gen_range(1950..=2024)),
			genre: Some(pick(rng, GENRES).to_string()),
		};
		if lib.create_book(&book).await?.is_none() {
			continue;
		}
		book_ids.push(id);

		let wanted = rng.gen_range(1..=3).min(author_ids.len());
		let chosen: Vec<Aid> = author_ids.choose_multiple(rng, wanted).copied().collect();
		for author_id in chosen {
			if lib.create_book_author(id, author_id).await?.is_some() {
				summary.book_authors += 1;
			}
		}
	}
	summary.books = book_ids.len();
	info!("created {} books with {} author links", summary.books, summary.book_authors);

	info!("creating members...");
	let mut member_ids = Vec::new();
	for id in 1..=opts.num_members {
		let name = person(rng);
		// colliding emails are expected and simply skipped
		let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
		let joined_at = epoch() + Duration::days(rng.gen_range(0..=1800));
		if lib.create_member(id, name, email, joined_at).await?.is_some() {
			member_ids.push(id);
		}
	}
	summary.members = member_ids.len();
	info!("created {} members", summary.members);

	info!("creating book copies...");
	let mut copy_ids = Vec::new();
	let mut on_loan = Vec::new();
	let mut copy_id: Cid = 1;
	for &book_id in &book_ids {
		let count = rng.gen_range(1..=(opts.copies_per_book * 2).max(1));
		for _ in 0..count {
			let status = COPY_STATUSES.choose(rng).copied().unwrap_or(CopyStatus::Available);
			if lib.create_copy(copy_id, book_id, status).await?.is_some() {
				copy_ids.push(copy_id);
				if status == CopyStatus::OnLoan {
					on_loan.push(copy_id);
				}
			}
			copy_id += 1;
		}
	}
	summary.copies = copy_ids.len();
	info!("created {} book copies", summary.copies);

	info!("creating loans...");
	on_loan.shuffle(rng);
	let current = now();
	let mut fine_id: Fid = 1;
	for _ in 0..opts.num_loans {
		let Some(&member_id) = member_ids.choose(rng) else { break };
		let loan_date = current - Duration::days(rng.gen_range(1..=365));
		let returned = rng.gen_bool(0.7);

		let loan = if returned {
			let Some(&copy_id) = copy_ids.choose(rng) else { break };
			let back = loan_date + Duration::days(rng.gen_range(1..=30));
			NewLoan::active(copy_id, member_id, loan_date).returned(back)
		} else {
			// no on-loan copy left to hang an open loan on
			let Some(copy_id) = on_loan.pop() else { continue };
			NewLoan::active(copy_id, member_id, loan_date)
		};

		let Some(loan) = lib.create_loan(&loan).await? else { continue };
		summary.loans += 1;

		let settled = loan.return_date.unwrap_or(current);
		let days_late = (settled - loan.due_date).num_days();
		if days_late > 0 && rng.gen_bool(opts.fine_probability.clamp(0.0, 1.0)) {
			let amount = days_late as f64 * FINE_PER_DAY;
			let mut fine = Fine::unpaid(fine_id, member_id, Some(loan.loan_id), amount, settled);
			if rng.gen_bool(0.3) {
				fine = fine.paid_on(settled + Duration::days(rng.gen_range(0..=10)));
			}
			if lib.create_fine(&fine).await?.is_some() {
				summary.fines += 1;
			}
			fine_id += 1;
		}
	}
	info!("created {} loans and {} fines", summary.loans, summary.fines);

	Ok(summary)
}
