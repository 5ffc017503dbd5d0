//! SQLite backend for the Clerk ledger store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write is one `BEGIN IMMEDIATE`
//! transaction driven by the synchronous routines in `clerk-core`.

mod encode;
mod schema;
mod store;
mod tx;

pub mod error;

pub use error::{Error, Result, TxError};
pub use store::{SqliteStore, StoreOptions};
