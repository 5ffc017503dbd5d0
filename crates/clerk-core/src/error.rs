//! Error types for `clerk-core`.

use std::fmt;

use thiserror::Error;

use crate::ids::{AccountId, LabelId};

/// The entity tables a reference can point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
  Contact,
  Category,
  Label,
  Ledger,
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Contact => "contact",
      Self::Category => "category",
      Self::Label => "label",
      Self::Ledger => "ledger",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Input rejected before any store access.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("{entity} {id} belongs to account {found}, not account {expected}")]
  CrossAccountReference {
    entity:   EntityKind,
    id:       i64,
    expected: AccountId,
    found:    AccountId,
  },

  #[error("{entity} {id} does not exist")]
  ReferenceNotFound { entity: EntityKind, id: i64 },

  #[error("label {0} is a system label and cannot be deleted")]
  ProtectedLabel(LabelId),

  #[error("transaction deadline exceeded")]
  DeadlineExceeded,

  /// Connectivity, constraint, or I/O failure reported by the entity store.
  #[error("storage failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A pre-transaction collaborator call (e.g. a payment charge) failed.
  #[error("collaborator failure: {0}")]
  Collaborator(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
