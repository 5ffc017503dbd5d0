//! Label: a free-form tag scoped to one account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, LabelId, LedgerId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
  pub id:         LabelId,
  pub account_id: AccountId,
  pub name:       String,
  /// System labels are created by integrations and cannot be deleted by users.
  pub system:     bool,
}

impl Label {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  pub fn existing(id: LabelId) -> Self { Self { id, ..Default::default() } }
}

/// One row of the legacy label ⇄ ledger association table.
///
/// Derived data: the ledger's own label list is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssociation {
  pub ledger_id:  LedgerId,
  pub label_id:   LabelId,
  pub account_id: AccountId,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
