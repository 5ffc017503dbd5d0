//! Category: a classification for ledger entries, scoped to one account.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, CategoryId};

/// Whether entries filed under a category are money out or money in.
///
/// Older clients send the numeric codes `"1"` and `"2"`; both spellings are
/// accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
  #[serde(alias = "Expense", alias = "1")]
  Expense,
  #[serde(alias = "Income", alias = "2")]
  Income,
}

impl fmt::Display for CategoryKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Expense => "expense",
      Self::Income => "income",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
  pub id:         CategoryId,
  pub account_id: AccountId,
  pub name:       String,
  /// Required on a category that is resolved by name.
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind:       Option<CategoryKind>,
  /// Tax-treatment tag carried through to reports.
  pub tax_tag:    String,
  pub visible:    bool,
}

impl Default for Category {
  fn default() -> Self {
    Self {
      id:         CategoryId::UNSET,
      account_id: AccountId::UNSET,
      name:       String::new(),
      kind:       None,
      tax_tag:    String::new(),
      visible:    true,
    }
  }
}

/// Natural key: `(name, kind)` within an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryKey {
  pub name: String,
  pub kind: CategoryKind,
}

impl Category {
  pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
    Self { name: name.into(), kind: Some(kind), ..Default::default() }
  }

  pub fn existing(id: CategoryId) -> Self { Self { id, ..Default::default() } }

  /// `None` until both the name and the kind are known.
  pub fn key(&self) -> Option<CategoryKey> {
    let kind = self.kind?;
    if self.name.is_empty() {
      return None;
    }
    Some(CategoryKey { name: self.name.clone(), kind })
  }
}
