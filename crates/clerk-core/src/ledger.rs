//! Ledger: one recorded financial transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
  category::Category,
  contact::Contact,
  ids::{AccountId, CategoryId, ContactId, LedgerId, UserId},
  label::Label,
};

/// Number of decimal places amounts are stored with.
pub const AMOUNT_SCALE: u32 = 2;

/// Round an amount to the stored fixed-point scale. Midpoints round away from
/// zero; the result always carries exactly two decimal places.
pub fn round_amount(amount: Decimal) -> Decimal {
  let mut rounded =
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
  rounded.rescale(AMOUNT_SCALE);
  rounded
}

/// Identifiers assigned by other systems, carried opaquely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalIds {
  pub processor_charge_id: Option<String>,
  pub shoeboxed_id:        Option<String>,
  pub freshbooks_id:       Option<String>,
  pub airbnb_hash:         Option<String>,
}

/// A ledger entry as submitted by a caller.
///
/// The embedded contact, category and labels may be unresolved (zero `id`);
/// the writer resolves them by natural key before the entry is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLedger {
  pub account_id: AccountId,
  pub date:       NaiveDate,
  pub amount:     Decimal,
  #[serde(default)]
  pub note:       String,
  pub added_by:   UserId,
  pub contact:    Contact,
  pub category:   Category,
  #[serde(default)]
  pub labels:     Vec<Label>,
  #[serde(default)]
  pub external:   ExternalIds,
}

impl NewLedger {
  pub fn new(
    account_id: AccountId,
    date: NaiveDate,
    amount: Decimal,
    contact: Contact,
    category: Category,
  ) -> Self {
    Self {
      account_id,
      date,
      amount,
      note: String::new(),
      added_by: UserId::UNSET,
      contact,
      category,
      labels: Vec::new(),
      external: ExternalIds::default(),
    }
  }

  pub fn with_labels(mut self, labels: impl IntoIterator<Item = Label>) -> Self {
    self.labels = labels.into_iter().collect();
    self
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.note = note.into();
    self
  }
}

/// The flat row written to the `ledger` table once every reference resolved.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
  pub account_id:  AccountId,
  pub date:        NaiveDate,
  pub amount:      Decimal,
  pub note:        String,
  pub contact_id:  ContactId,
  pub category_id: CategoryId,
  pub added_by:    UserId,
  pub external:    ExternalIds,
  pub created_at:  DateTime<Utc>,
}

/// A committed ledger entry with its references resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
  pub id:         LedgerId,
  pub account_id: AccountId,
  pub date:       NaiveDate,
  pub amount:     Decimal,
  pub note:       String,
  pub added_by:   UserId,
  pub contact:    Contact,
  pub category:   Category,
  /// In the order the caller supplied them.
  pub labels:     Vec<Label>,
  pub external:   ExternalIds,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn rounds_to_cents_away_from_zero() {
    let d = |s: &str| Decimal::from_str(s).unwrap();
    assert_eq!(round_amount(d("42.5")).to_string(), "42.50");
    assert_eq!(round_amount(d("1.005")), d("1.01"));
    assert_eq!(round_amount(d("-1.005")), d("-1.01"));
    assert_eq!(round_amount(d("9.994")), d("9.99"));
  }

  #[test]
  fn new_ledger_deserialises_with_unresolved_references() {
    let json = r#"{
      "account_id": 7,
      "date": "2024-01-15",
      "amount": "42.50",
      "added_by": 3,
      "contact": { "name": "Acme Co" },
      "category": { "name": "Office Supplies", "type": "Expense" },
      "labels": [{ "name": "Q1" }]
    }"#;
    let entry: NewLedger = serde_json::from_str(json).unwrap();
    assert_eq!(entry.account_id, AccountId(7));
    assert!(!entry.contact.id.is_set());
    assert_eq!(entry.category.kind, Some(crate::category::CategoryKind::Expense));
    assert!(entry.category.visible);
    assert_eq!(entry.labels.len(), 1);
    assert_eq!(entry.labels[0].name, "Q1");
  }

  #[test]
  fn legacy_numeric_category_codes_are_accepted() {
    let cat: Category =
      serde_json::from_str(r#"{ "name": "Rental Income", "type": "2" }"#).unwrap();
    assert_eq!(cat.kind, Some(crate::category::CategoryKind::Income));
  }
}
