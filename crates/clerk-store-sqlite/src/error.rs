//! Error types for `clerk-store-sqlite`.

use clerk_core::store::StoreFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] clerk_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("amount parse error: {0}")]
  DecimalParse(String),

  #[error("unknown category kind: {0:?}")]
  UnknownCategoryKind(String),
}

/// Core errors raised inside a connection closure travel as
/// `tokio_rusqlite::Error::Other` and are unwrapped back into [`Error::Core`].
impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<clerk_core::Error>() {
        Ok(core) => Self::Core(*core),
        Err(other) => Self::Database(tokio_rusqlite::Error::Other(other)),
      },
      other => Self::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self { Self::Database(err.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of one statement inside an open transaction.
#[derive(Debug, Error)]
pub enum TxError {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("decode error: {0}")]
  Decode(#[from] Error),
}

impl StoreFailure for TxError {
  fn is_unique_violation(&self) -> bool {
    matches!(
      self,
      Self::Sqlite(rusqlite::Error::SqliteFailure(e, _))
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
  }
}

/// Carry a core error out of a connection closure.
pub(crate) fn raise(err: clerk_core::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err))
}
