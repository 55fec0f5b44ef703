// library system

use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lsys::admin::{self, ExplainParams, ExplainQuery};
use lsys::populate::{populate, PopulateOptions};
use lsys::{Cid, Config, Fid, Library, Lid, Mid};

#[derive(Parser)]
#[command(name = "lsys")]
#[command(about = "Library system: loans, fines and reports over SQLite")]
#[command(version)]
struct Cli {
	/// Database url; takes priority over the DATABASE_URL environment variable
	#[arg(long, env = "DATABASE_URL")]
	database_url: String,

	/// Logging verbosity
	#[arg(long, value_enum, default_value_t = LogLevel::Info)]
	log_level: LogLevel,

	/// Pooled connections kept open
	#[arg(long, env = "LSYS_POOL_SIZE")]
	pool_size: Option<u32>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
	Critical,
	Error,
	Warning,
	Info,
	Debug,
}

impl LogLevel {
	fn directive(self) -> &'static str {
		match self {
			LogLevel::Critical | LogLevel::Error => "error",
			LogLevel::Warning => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
		}
	}
}

#[derive(Subcommand)]
enum Command {
	/// Create the tables if they don't exist
	Init,
	/// Fill the database with synthetic data
	Populate {
		#[arg(long, default_value_t = 1000)]
		authors: i64,
		#[arg(long, default_value_t = 1000)]
		books: i64,
		#[arg(long, default_value_t = 1000)]
		members: i64,
		#[arg(long, default_value_t = 3)]
		copies_per_book: i64,
		#[arg(long, default_value_t = 1000)]
		loans: i64,
		#[arg(long, default_value_t = 0.2)]
		fine_probability: f64,
		/// Seed for reproducible data
		#[arg(long)]
		seed: Option<u64>,
	},
	/// Serve the HTML reports
	Serve {
		#[arg(long, default_value = "0.0.0.0:8080")]
		bind: SocketAddr,
	},
	/// Print a report as a table
	Report {
		#[command(subcommand)]
		report: Report,
	},
	/// Loan transitions
	Loan {
		#[command(subcommand)]
		action: LoanAction,
	},
	/// Fine transitions
	Fine {
		#[command(subcommand)]
		action: FineAction,
	},
	/// Manage the report indexes
	Index {
		#[command(subcommand)]
		action: IndexAction,
	},
	/// Show the query plan of a report query
	Explain {
		/// top-books, overdue-members, unpaid-fines, member-history, copies-on-loan or genre-fines
		query: ExplainQuery,
		#[arg(long, default_value_t = 1)]
		member_id: Mid,
	},
}

#[derive(Subcommand)]
enum Report {
	TopBooks {
		#[arg(long, default_value_t = 10)]
		limit: i64,
	},
	Overdue,
	UnpaidFines {
		#[arg(long, default_value_t = 0.0)]
		min_total: f64,
	},
	Utilization {
		#[arg(long, default_value_t = 10)]
		limit: i64,
	},
	GenreFines,
	History {
		member_id: Mid,
	},
}

#[derive(Subcommand)]
enum LoanAction {
	Request {
		#[arg(long)]
		copy: Cid,
		#[arg(long)]
		member: Mid,
	},
	End {
		#[arg(long)]
		loan: Lid,
	},
}

#[derive(Subcommand)]
enum FineAction {
	Pay {
		#[arg(long)]
		fine: Fid,
	},
}

#[derive(Subcommand)]
enum IndexAction {
	Create,
	Drop,
}

fn init_logging(level: LogLevel) {
	// RUST_LOG wins over --log-level when set
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
	tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let _ = dotenvy::dotenv();
	let cli = Cli::parse();
	init_logging(cli.log_level);
	info!("utilizing log level '{}'", cli.log_level.directive());

	let url = cli.database_url.clone();
	let mut cfg = Config::from_lookup(|key| match key {
		"DATABASE_URL" => Some(url.clone()),
		_ => std::env::var(key).ok(),
	})?;
	if let Some(size) = cli.pool_size {
		cfg.pool_size = size;
	}

	let lib = Library::connect(&cfg).await.context("can't connect to database")?;
	lib.ensure_schema().await.context("can't create tables")?;

	let code = run(&lib, cli.command).await?;
	lib.close().await;
	Ok(code)
}

async fn run(lib: &Library, command: Command) -> anyhow::Result<ExitCode> {
	match command {
		Command::Init => println!("schema ready"),
		Command::Populate {
			authors,
			books,
			members,
			copies_per_book,
			loans,
			fine_probability,
			seed,
		} => {
			let opts = PopulateOptions {
				num_authors: authors,
				num_books: books,
				num_members: members,
				copies_per_book,
				num_loans: loans,
				fine_probability,
			};
			let mut rng = match seed {
				Some(seed) => StdRng::seed_from_u64(seed),
				None => StdRng::from_entropy(),
			};
			let summary = populate(lib, &opts, &mut rng).await?;
			println!("{summary:#?}");
		},
		Command::Serve { bind } => {
			let listener = tokio::net::TcpListener::bind(bind).await.with_context(|| format!("can't bind {bind}"))?;
			info!(%bind, "serving");
			axum::serve(listener, lsys::web::router(lib.clone())).await?;
		},
		Command::Report { report } => print_report(lib, report).await?,
		Command::Loan { action: LoanAction::Request { copy, member } } => {
			let Some(loan) = lib.request_loan(copy, member).await? else {
				eprintln!("copy {copy} could not be loaned to member {member}");
				return Ok(ExitCode::FAILURE);
			};
			println!("loan {} started, due {}", loan.loan_id, loan.due_date);
		},
		Command::Loan { action: LoanAction::End { loan } } => {
			if !lib.end_loan(loan).await? {
				eprintln!("loan {loan} could not be ended");
				return Ok(ExitCode::FAILURE);
			}
			println!("loan {loan} returned");
		},
		Command::Fine { action: FineAction::Pay { fine } } => {
			if !lib.pay_fine(fine).await? {
				eprintln!("fine {fine} could not be paid");
				return Ok(ExitCode::FAILURE);
			}
			println!("fine {fine} paid");
		},
		Command::Index { action: IndexAction::Create } => admin::create_indexes(lib).await?,
		Command::Index { action: IndexAction::Drop } => admin::drop_indexes(lib).await?,
		Command::Explain { query, member_id } => {
			let params = ExplainParams { member_id, ..ExplainParams::default() };
			let plan = admin::explain(lib, query, params).await?;
			println!("{}", admin::render_plan(&plan));
		},
	}
	Ok(ExitCode::SUCCESS)
}

async fn print_report(lib: &Library, report: Report) -> anyhow::Result<()> {
	match report {
		Report::TopBooks { limit } => {
			println!("{:>8}  {:<40}  {:>6}", "book", "title", "loans");
			for row in lib.top_books(limit).await? {
				println!("{:>8}  {:<40}  {:>6}", row.book_id, row.title, row.loan_count);
			}
		},
		Report::Overdue => {
			println!("{:>8}  {:<24}  {:<32}  {:>7}  {}", "member", "name", "email", "overdue", "earliest due");
			for row in lib.overdue_members().await? {
				println!(
					"{:>8}  {:<24}  {:<32}  {:>7}  {}",
					row.member_id, row.name, row.email, row.overdue_loans, row.earliest_due
				);
			}
		},
		Report::UnpaidFines { min_total } => {
			println!("{:>8}  {:<24}  {:<32}  {:>10}  {:>5}", "member", "name", "email", "unpaid", "fines");
			for row in lib.unpaid_fines_members(min_total).await? {
				println!(
					"{:>8}  {:<24}  {:<32}  {:>10.2}  {:>5}",
					row.member_id, row.name, row.email, row.total_unpaid, row.unpaid_count
				);
			}
		},
		Report::Utilization { limit } => {
			println!("{:>8}  {:<40}  {:>6}  {:>7}  {:>6}", "book", "title", "copies", "on loan", "util%");
			for row in lib.copies_on_loan(limit).await? {
				println!(
					"{:>8}  {:<40}  {:>6}  {:>7}  {:>6.1}",
					row.book_id, row.title, row.total_copies, row.on_loan, row.utilization
				);
			}
		},
		Report::GenreFines => {
			println!("{:<20}  {:>6}  {:>10}", "genre", "fines", "total");
			for row in lib.genre_fine_stats().await? {
				println!("{:<20}  {:>6}  {:>10.2}", row.label(), row.fine_count, row.total_fines);
			}
		},
		Report::History { member_id } => {
			println!("{:>8}  {:>8}  {:<26}  {:<26}  {}", "loan", "copy", "loaned", "due", "status");
			for row in lib.member_history(member_id).await? {
				println!(
					"{:>8}  {:>8}  {:<26}  {:<26}  {}",
					row.loan_id,
					row.copy_id,
					row.loan_date.to_string(),
					row.due_date.to_string(),
					row.status
				);
			}
		},
	}
	Ok(())
}
