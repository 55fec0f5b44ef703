use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("database error: {0}")]
	Sql(#[from] sqlx::Error),

	#[error("configuration error: {0}")]
	Config(String),

	#[error("unknown query name '{0}'")]
	UnknownQuery(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Expected ways for a write to be turned down by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
	/// unique, foreign key, not null or check constraint
	Constraint,
	/// another transaction holds the write lock (SQLITE_BUSY / SQLITE_LOCKED)
	Contention,
}

impl std::fmt::Display for Rejection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Rejection::Constraint => write!(f, "constraint violation"),
			Rejection::Contention => write!(f, "lock contention"),
		}
	}
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CONSTRAINT: i32 = 19;

/// Sorts a sqlx error into a [`Rejection`], or `None` when it is a real failure.
pub(crate) fn rejection(err: &sqlx::Error) -> Option<Rejection> {
	let db_err = err.as_database_error()?;
	match db_err.kind() {
		ErrorKind::UniqueViolation
		| ErrorKind::ForeignKeyViolation
		| ErrorKind::NotNullViolation
		| ErrorKind::CheckViolation => return Some(Rejection::Constraint),
		_ => {},
	}
	// extended result codes keep the primary code in the low byte
	let code = db_err.code()?.parse::<i32>().ok()?;
	match code & 0xff {
		SQLITE_BUSY | SQLITE_LOCKED => Some(Rejection::Contention),
		SQLITE_CONSTRAINT => Some(Rejection::Constraint),
		_ => None,
	}
}

/// Folds expected rejections into `Ok(Err(_))` and keeps everything else as an error.
pub(crate) fn tolerate<T>(res: std::result::Result<T, sqlx::Error>) -> Result<std::result::Result<T, Rejection>> {
	match res {
		Ok(v) => Ok(Ok(v)),
		Err(err) => match rejection(&err) {
			Some(why) => {
				tracing::debug!(error = %err, "write rejected: {why}");
				Ok(Err(why))
			},
			None => Err(err.into()),
		},
	}
}
