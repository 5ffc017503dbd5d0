//! Contact: a payer or payee scoped to one account.

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, ContactId};

/// A counterparty. Doubles as the resolution candidate embedded in a
/// [`NewLedger`](crate::ledger::NewLedger): a zero `id` means "find or create
/// by natural key".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
  pub id:                    ContactId,
  pub account_id:            AccountId,
  /// Company name. When empty the contact is keyed by first and last name.
  pub name:                  String,
  pub first_name:            String,
  pub last_name:             String,
  pub email:                 String,
  pub phone:                 String,
  pub website:               String,
  pub address:               String,
  pub city:                  String,
  pub state:                 String,
  pub zip:                   String,
  pub country:               String,
  pub account_number:        String,
  pub processor_customer_id: Option<String>,
}

/// The natural key a contact is deduplicated on within its account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactKey {
  Name(String),
  Person { first_name: String, last_name: String },
}

impl Contact {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  pub fn person(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
    Self {
      first_name: first_name.into(),
      last_name: last_name.into(),
      ..Default::default()
    }
  }

  pub fn existing(id: ContactId) -> Self { Self { id, ..Default::default() } }

  /// `name` alone when present, otherwise the `(first_name, last_name)` pair.
  /// `None` when neither form is complete.
  pub fn key(&self) -> Option<ContactKey> {
    if !self.name.is_empty() {
      return Some(ContactKey::Name(self.name.clone()));
    }
    if self.first_name.is_empty() || self.last_name.is_empty() {
      return None;
    }
    Some(ContactKey::Person {
      first_name: self.first_name.clone(),
      last_name:  self.last_name.clone(),
    })
  }
}
