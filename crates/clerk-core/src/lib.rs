//! Core types and trait definitions for the Clerk bookkeeping engine.
//!
//! This crate is free of HTTP and database dependencies. It owns the domain
//! model, the store contracts, and the transactional routines that record a
//! ledger entry: natural-key resolution of its contact, category and labels,
//! and maintenance of the legacy label association table.

// Native `async fn` in traits; the returned futures are bounded explicitly
// where a `Send` future is required.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod category;
pub mod collab;
pub mod config;
pub mod contact;
pub mod error;
pub mod ids;
pub mod label;
pub mod ledger;
pub mod legacy;
pub mod resolver;
pub mod service;
pub mod store;
pub mod writer;

pub use error::{EntityKind, Error, Result};

#[cfg(test)]
mod testing;
