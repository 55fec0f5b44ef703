// library system

//! Books, copies, loans and fines over a SQLite pool.
//!
//! [`Library`] owns the pool. It creates entities, moves copies, loans and
//! fines through their states with at-most-one-winner transactions, and runs
//! the aggregate reports.
//!
//! ```no_run
//! # async fn demo() -> lsys::Result<()> {
//! use lsys::{Config, CopyStatus, Library, Book};
//!
//! let lib = Library::connect(&Config::new("sqlite://library.db")).await?;
//! lib.ensure_schema().await?;
//! lib.create_book(&Book::titled(1, "A Study in Scarlet")).await?;
//! lib.create_copy(1, 1, CopyStatus::Available).await?;
//! if let Some(loan) = lib.request_loan(1, 7).await? {
//! 	lib.end_loan(loan.loan_id).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod create;
pub mod error;
pub mod populate;
pub mod report;
pub mod sql;
pub mod transition;
pub mod types;
pub mod web;

pub use config::Config;
pub use create::Record;
pub use error::{Error, Result};
pub use report::{GenreFines, HistoryEntry, OverdueMember, TopBook, UnpaidFines, Utilization};
pub use sql::Library;
pub use types::*;
