//! In-memory [`EntityTx`] used by the unit tests of this crate.
//!
//! Enforces the same natural-key uniqueness a real store does, and can inject
//! a concurrent twin insert or a plain insert failure.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
  category::{Category, CategoryKey},
  contact::{Contact, ContactKey},
  ids::{AccountId, CategoryId, ContactId, LabelId, LedgerId},
  label::{Label, LabelAssociation},
  ledger::LedgerRecord,
  store::{EntityTx, StoreFailure},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("unique constraint violated")]
  Unique,
  #[error("injected failure: {0}")]
  Injected(String),
}

impl StoreFailure for MemoryError {
  fn is_unique_violation(&self) -> bool { matches!(self, Self::Unique) }
}

#[derive(Debug, Default)]
pub struct MemoryTx {
  pub contacts:         Vec<Contact>,
  pub categories:       Vec<Category>,
  pub labels:           Vec<Label>,
  pub ledgers:          Vec<(LedgerId, LedgerRecord)>,
  pub ledger_labels:    Vec<(LedgerId, Vec<LabelId>)>,
  pub associations:     Vec<LabelAssociation>,
  /// The next contact/category/label insert behaves as if another writer
  /// committed the same natural key first.
  pub race_next_insert: bool,
  /// Inserting a label with this name fails with a non-constraint error.
  pub fail_label_named: Option<String>,
  next_id:              i64,
}

fn same(a: &str, b: &str) -> bool { a.trim().eq_ignore_ascii_case(b.trim()) }

fn contact_matches(c: &Contact, account: AccountId, key: &ContactKey) -> bool {
  c.account_id == account
    && match key {
      ContactKey::Name(name) => !c.name.is_empty() && same(&c.name, name),
      ContactKey::Person { first_name, last_name } => {
        c.name.is_empty() && same(&c.first_name, first_name) && same(&c.last_name, last_name)
      }
    }
}

fn category_matches(c: &Category, account: AccountId, key: &CategoryKey) -> bool {
  c.account_id == account && c.kind == Some(key.kind) && same(&c.name, &key.name)
}

fn label_matches(l: &Label, account: AccountId, name: &str) -> bool {
  l.account_id == account && same(&l.name, name)
}

impl MemoryTx {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  /// Consume the race flag; when set, `twin` is stored first and the caller
  /// must report a unique violation.
  fn take_race(&mut self) -> bool { std::mem::take(&mut self.race_next_insert) }

  pub fn association_pairs(&self) -> Vec<(LedgerId, LabelId)> {
    let mut pairs: Vec<_> = self
      .associations
      .iter()
      .map(|a| (a.ledger_id, a.label_id))
      .collect();
    pairs.sort();
    pairs
  }

  pub fn seed_association(
    &mut self,
    ledger: LedgerId,
    label: LabelId,
    account: AccountId,
    at: DateTime<Utc>,
  ) {
    self.associations.push(LabelAssociation {
      ledger_id: ledger,
      label_id: label,
      account_id: account,
      created_at: at,
      updated_at: at,
    });
  }
}

impl EntityTx for MemoryTx {
  type Error = MemoryError;

  fn get_contact(&mut self, id: ContactId) -> Result<Option<Contact>, MemoryError> {
    Ok(self.contacts.iter().find(|c| c.id == id).cloned())
  }

  fn find_contact_by_natural_key(
    &mut self,
    account: AccountId,
    key: &ContactKey,
  ) -> Result<Option<Contact>, MemoryError> {
    Ok(
      self
        .contacts
        .iter()
        .find(|c| contact_matches(c, account, key))
        .cloned(),
    )
  }

  fn insert_contact(&mut self, contact: &Contact) -> Result<Contact, MemoryError> {
    let key = contact.key().ok_or(MemoryError::Injected("no key".into()))?;
    if self.take_race() {
      let twin = Contact { id: ContactId(self.next_id()), ..contact.clone() };
      self.contacts.push(twin);
    }
    if self
      .contacts
      .iter()
      .any(|c| contact_matches(c, contact.account_id, &key))
    {
      return Err(MemoryError::Unique);
    }
    let row = Contact { id: ContactId(self.next_id()), ..contact.clone() };
    self.contacts.push(row.clone());
    Ok(row)
  }

  fn get_category(&mut self, id: CategoryId) -> Result<Option<Category>, MemoryError> {
    Ok(self.categories.iter().find(|c| c.id == id).cloned())
  }

  fn find_category_by_natural_key(
    &mut self,
    account: AccountId,
    key: &CategoryKey,
  ) -> Result<Option<Category>, MemoryError> {
    Ok(
      self
        .categories
        .iter()
        .find(|c| category_matches(c, account, key))
        .cloned(),
    )
  }

  fn insert_category(&mut self, category: &Category) -> Result<Category, MemoryError> {
    let key = category.key().ok_or(MemoryError::Injected("no key".into()))?;
    if self.take_race() {
      let twin = Category { id: CategoryId(self.next_id()), ..category.clone() };
      self.categories.push(twin);
    }
    if self
      .categories
      .iter()
      .any(|c| category_matches(c, category.account_id, &key))
    {
      return Err(MemoryError::Unique);
    }
    let row = Category { id: CategoryId(self.next_id()), ..category.clone() };
    self.categories.push(row.clone());
    Ok(row)
  }

  fn get_label(&mut self, id: LabelId) -> Result<Option<Label>, MemoryError> {
    Ok(self.labels.iter().find(|l| l.id == id).cloned())
  }

  fn find_label_by_natural_key(
    &mut self,
    account: AccountId,
    name: &str,
  ) -> Result<Option<Label>, MemoryError> {
    Ok(
      self
        .labels
        .iter()
        .find(|l| label_matches(l, account, name))
        .cloned(),
    )
  }

  fn insert_label(&mut self, label: &Label) -> Result<Label, MemoryError> {
    if self.fail_label_named.as_deref() == Some(label.name.as_str()) {
      return Err(MemoryError::Injected(format!("cannot store label {:?}", label.name)));
    }
    if self.take_race() {
      let twin = Label { id: LabelId(self.next_id()), ..label.clone() };
      self.labels.push(twin);
    }
    if self
      .labels
      .iter()
      .any(|l| label_matches(l, label.account_id, &label.name))
    {
      return Err(MemoryError::Unique);
    }
    let row = Label { id: LabelId(self.next_id()), ..label.clone() };
    self.labels.push(row.clone());
    Ok(row)
  }

  fn insert_ledger(&mut self, record: &LedgerRecord) -> Result<LedgerId, MemoryError> {
    let id = LedgerId(self.next_id());
    self.ledgers.push((id, record.clone()));
    Ok(id)
  }

  fn insert_ledger_labels(
    &mut self,
    ledger: LedgerId,
    labels: &[LabelId],
  ) -> Result<(), MemoryError> {
    self.ledger_labels.push((ledger, labels.to_vec()));
    Ok(())
  }

  fn label_associations(
    &mut self,
    ledger: LedgerId,
  ) -> Result<Vec<LabelAssociation>, MemoryError> {
    Ok(
      self
        .associations
        .iter()
        .filter(|a| a.ledger_id == ledger)
        .cloned()
        .collect(),
    )
  }

  fn upsert_label_association(&mut self, row: &LabelAssociation) -> Result<(), MemoryError> {
    match self
      .associations
      .iter_mut()
      .find(|a| a.ledger_id == row.ledger_id && a.label_id == row.label_id)
    {
      Some(existing) => {
        existing.account_id = row.account_id;
        existing.updated_at = row.updated_at;
      }
      None => self.associations.push(row.clone()),
    }
    Ok(())
  }

  fn delete_label_association(
    &mut self,
    ledger: LedgerId,
    label: LabelId,
  ) -> Result<(), MemoryError> {
    self
      .associations
      .retain(|a| !(a.ledger_id == ledger && a.label_id == label));
    Ok(())
  }
}
