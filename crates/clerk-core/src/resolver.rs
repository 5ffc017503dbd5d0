//! Natural-key resolver: find-or-create for contacts, categories and labels.
//!
//! One generic routine, [`resolve`], serves all three entity types. Each type
//! plugs in through [`Resolvable`], which names its natural key and the three
//! store hooks (fetch by id, find by natural key, insert).
//!
//! Concurrent writers may both miss on the same new natural key and both
//! insert. The store's unique constraint rejects the second insert; the
//! resolver treats that rejection as "created concurrently" and re-reads the
//! winner's row instead of failing.

use tracing::debug;

use crate::{
  EntityKind, Error, Result,
  category::{Category, CategoryKey},
  contact::{Contact, ContactKey},
  ids::AccountId,
  label::Label,
  store::{EntityTx, StoreFailure as _},
};

/// How a candidate was turned into a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
  /// The caller supplied an identifier; the row was read back by it.
  Supplied,
  /// A row with the same natural key already existed.
  Existing,
  /// No match; a new row was inserted.
  Created,
  /// The insert lost a race with a concurrent writer and the winner's row was
  /// re-read.
  RaceResolved,
}

#[derive(Debug, Clone)]
pub struct Resolved<R> {
  pub row:        R,
  pub resolution: Resolution,
}

/// An entity that can be deduplicated by natural key within an account.
pub trait Resolvable: Sized {
  type Key: std::fmt::Debug;

  const KIND: EntityKind;

  fn raw_id(&self) -> i64;

  fn account_id(&self) -> AccountId;

  /// Scope the candidate to `account` and trim its natural-key fields.
  fn prepare(&mut self, account: AccountId);

  /// The candidate's natural key, or a validation error when the fields that
  /// make it up are missing.
  fn natural_key(&self) -> Result<Self::Key>;

  fn fetch<T: EntityTx>(&self, tx: &mut T) -> Result<Option<Self>, T::Error>;

  fn find<T: EntityTx>(
    tx: &mut T,
    account: AccountId,
    key: &Self::Key,
  ) -> Result<Option<Self>, T::Error>;

  fn insert<T: EntityTx>(&self, tx: &mut T) -> Result<Self, T::Error>;
}

/// Validate a candidate without touching the store. Candidates carrying an
/// identifier are not checked here; they are verified on resolution.
pub fn validate<R: Resolvable>(candidate: &mut R, account: AccountId) -> Result<()> {
  if candidate.raw_id() != 0 {
    return Ok(());
  }
  candidate.prepare(account);
  candidate.natural_key().map(|_| ())
}

/// Fail with [`Error::CrossAccountReference`] unless `row` belongs to
/// `account`.
pub fn ensure_scope<R: Resolvable>(row: &R, account: AccountId) -> Result<()> {
  if row.account_id() != account {
    return Err(Error::CrossAccountReference {
      entity:   R::KIND,
      id:       row.raw_id(),
      expected: account,
      found:    row.account_id(),
    });
  }
  Ok(())
}

/// Return the stored row for `candidate` within `account`, creating it if no
/// row shares its natural key.
pub fn resolve<R, T>(tx: &mut T, account: AccountId, mut candidate: R) -> Result<Resolved<R>>
where
  R: Resolvable,
  T: EntityTx,
{
  if candidate.raw_id() != 0 {
    let id = candidate.raw_id();
    let row = candidate
      .fetch(tx)
      .map_err(Error::storage)?
      .ok_or(Error::ReferenceNotFound { entity: R::KIND, id })?;
    ensure_scope(&row, account)?;
    return Ok(Resolved { row, resolution: Resolution::Supplied });
  }

  candidate.prepare(account);
  let key = candidate.natural_key()?;

  if let Some(row) = R::find(tx, account, &key).map_err(Error::storage)? {
    debug!(entity = %R::KIND, id = row.raw_id(), ?key, "natural key matched");
    return Ok(Resolved { row, resolution: Resolution::Existing });
  }

  match candidate.insert(tx) {
    Ok(row) => {
      debug!(entity = %R::KIND, id = row.raw_id(), ?key, "created");
      Ok(Resolved { row, resolution: Resolution::Created })
    }
    Err(err) if err.is_unique_violation() => {
      match R::find(tx, account, &key).map_err(Error::storage)? {
        Some(row) => {
          debug!(
            entity = %R::KIND, id = row.raw_id(), ?key,
            "duplicate insert raced a concurrent writer; reusing its row"
          );
          Ok(Resolved { row, resolution: Resolution::RaceResolved })
        }
        None => Err(Error::storage(err)),
      }
    }
    Err(err) => Err(Error::storage(err)),
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

impl Resolvable for Contact {
  type Key = ContactKey;

  const KIND: EntityKind = EntityKind::Contact;

  fn raw_id(&self) -> i64 { self.id.0 }

  fn account_id(&self) -> AccountId { self.account_id }

  fn prepare(&mut self, account: AccountId) {
    self.account_id = account;
    trim_in_place(&mut self.name);
    trim_in_place(&mut self.first_name);
    trim_in_place(&mut self.last_name);
  }

  fn natural_key(&self) -> Result<ContactKey> {
    self.key().ok_or_else(|| {
      Error::Validation(
        "a company name or contact first and last name is required".into(),
      )
    })
  }

  fn fetch<T: EntityTx>(&self, tx: &mut T) -> Result<Option<Self>, T::Error> {
    tx.get_contact(self.id)
  }

  fn find<T: EntityTx>(
    tx: &mut T,
    account: AccountId,
    key: &ContactKey,
  ) -> Result<Option<Self>, T::Error> {
    tx.find_contact_by_natural_key(account, key)
  }

  fn insert<T: EntityTx>(&self, tx: &mut T) -> Result<Self, T::Error> {
    tx.insert_contact(self)
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

impl Resolvable for Category {
  type Key = CategoryKey;

  const KIND: EntityKind = EntityKind::Category;

  fn raw_id(&self) -> i64 { self.id.0 }

  fn account_id(&self) -> AccountId { self.account_id }

  fn prepare(&mut self, account: AccountId) {
    self.account_id = account;
    trim_in_place(&mut self.name);
  }

  fn natural_key(&self) -> Result<CategoryKey> {
    if self.name.is_empty() {
      return Err(Error::Validation("category name is required".into()));
    }
    let Some(kind) = self.kind else {
      return Err(Error::Validation("category type is required".into()));
    };
    Ok(CategoryKey { name: self.name.clone(), kind })
  }

  fn fetch<T: EntityTx>(&self, tx: &mut T) -> Result<Option<Self>, T::Error> {
    tx.get_category(self.id)
  }

  fn find<T: EntityTx>(
    tx: &mut T,
    account: AccountId,
    key: &CategoryKey,
  ) -> Result<Option<Self>, T::Error> {
    tx.find_category_by_natural_key(account, key)
  }

  fn insert<T: EntityTx>(&self, tx: &mut T) -> Result<Self, T::Error> {
    tx.insert_category(self)
  }
}

// ─── Label ───────────────────────────────────────────────────────────────────

impl Resolvable for Label {
  type Key = String;

  const KIND: EntityKind = EntityKind::Label;

  fn raw_id(&self) -> i64 { self.id.0 }

  fn account_id(&self) -> AccountId { self.account_id }

  fn prepare(&mut self, account: AccountId) {
    self.account_id = account;
    trim_in_place(&mut self.name);
  }

  fn natural_key(&self) -> Result<String> {
    if self.name.is_empty() {
      return Err(Error::Validation("label name is required".into()));
    }
    Ok(self.name.clone())
  }

  fn fetch<T: EntityTx>(&self, tx: &mut T) -> Result<Option<Self>, T::Error> {
    tx.get_label(self.id)
  }

  fn find<T: EntityTx>(
    tx: &mut T,
    account: AccountId,
    key: &String,
  ) -> Result<Option<Self>, T::Error> {
    tx.find_label_by_natural_key(account, key)
  }

  fn insert<T: EntityTx>(&self, tx: &mut T) -> Result<Self, T::Error> {
    tx.insert_label(self)
  }
}

fn trim_in_place(s: &mut String) {
  let trimmed = s.trim();
  if trimmed.len() != s.len() {
    *s = trimmed.to_owned();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    category::CategoryKind,
    ids::{AccountId, ContactId, LabelId},
    testing::MemoryTx,
  };

  const ACCT: AccountId = AccountId(7);

  #[test]
  fn resolving_twice_returns_the_same_row() {
    let mut tx = MemoryTx::default();

    let first = resolve(&mut tx, ACCT, Contact::named("Acme Co")).unwrap();
    let second = resolve(&mut tx, ACCT, Contact::named("Acme Co")).unwrap();

    assert_eq!(first.resolution, Resolution::Created);
    assert_eq!(second.resolution, Resolution::Existing);
    assert_eq!(first.row.id, second.row.id);
    assert_eq!(tx.contacts.len(), 1);
  }

  #[test]
  fn natural_key_match_ignores_case_and_padding() {
    let mut tx = MemoryTx::default();

    let first = resolve(&mut tx, ACCT, Label::named("Q1")).unwrap();
    let second = resolve(&mut tx, ACCT, Label::named("  q1 ")).unwrap();

    assert_eq!(first.row.id, second.row.id);
    assert_eq!(second.row.name, "Q1");
  }

  #[test]
  fn same_key_in_another_account_is_a_different_row() {
    let mut tx = MemoryTx::default();

    let ours = resolve(&mut tx, ACCT, Label::named("Q1")).unwrap();
    let theirs = resolve(&mut tx, AccountId(8), Label::named("Q1")).unwrap();

    assert_ne!(ours.row.id, theirs.row.id);
    assert_eq!(theirs.row.account_id, AccountId(8));
  }

  #[test]
  fn contact_without_company_name_is_keyed_by_person() {
    let mut tx = MemoryTx::default();

    let first = resolve(&mut tx, ACCT, Contact::person("Jane", "Doe")).unwrap();
    let second = resolve(&mut tx, ACCT, Contact::person("jane", "doe")).unwrap();
    let other = resolve(&mut tx, ACCT, Contact::person("Jane", "Roe")).unwrap();

    assert_eq!(first.row.id, second.row.id);
    assert_ne!(first.row.id, other.row.id);
  }

  #[test]
  fn category_kind_is_part_of_the_key() {
    let mut tx = MemoryTx::default();

    let expense =
      resolve(&mut tx, ACCT, Category::new("Consulting", CategoryKind::Expense)).unwrap();
    let income =
      resolve(&mut tx, ACCT, Category::new("Consulting", CategoryKind::Income)).unwrap();

    assert_ne!(expense.row.id, income.row.id);
  }

  #[test]
  fn candidate_account_is_overwritten_by_scope() {
    let mut tx = MemoryTx::default();
    let mut candidate = Contact::named("Acme Co");
    candidate.account_id = AccountId(99);

    let resolved = resolve(&mut tx, ACCT, candidate).unwrap();
    assert_eq!(resolved.row.account_id, ACCT);
  }

  #[test]
  fn unique_violation_is_resolved_by_rereading() {
    let mut tx = MemoryTx::default();
    tx.race_next_insert = true;

    let resolved = resolve(&mut tx, ACCT, Contact::named("Acme Co")).unwrap();

    assert_eq!(resolved.resolution, Resolution::RaceResolved);
    assert_eq!(tx.contacts.len(), 1);
    assert_eq!(resolved.row.id, tx.contacts[0].id);
  }

  #[test]
  fn other_insert_failures_surface_as_storage() {
    let mut tx = MemoryTx::default();
    tx.fail_label_named = Some("broken".into());

    let err = resolve(&mut tx, ACCT, Label::named("broken")).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
  }

  #[test]
  fn missing_natural_key_is_a_validation_error() {
    let mut tx = MemoryTx::default();

    let err = resolve(&mut tx, ACCT, Contact::person("Jane", "  ")).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(tx.contacts.is_empty());
  }

  #[test]
  fn supplied_id_is_read_back() {
    let mut tx = MemoryTx::default();
    let created = resolve(&mut tx, ACCT, Contact::named("Acme Co")).unwrap();

    let resolved = resolve(&mut tx, ACCT, Contact::existing(created.row.id)).unwrap();
    assert_eq!(resolved.resolution, Resolution::Supplied);
    assert_eq!(resolved.row.name, "Acme Co");
  }

  #[test]
  fn supplied_id_from_another_account_is_rejected() {
    let mut tx = MemoryTx::default();
    let foreign = resolve(&mut tx, AccountId(8), Label::named("Q1")).unwrap();

    let err = resolve(&mut tx, ACCT, Label::existing(foreign.row.id)).unwrap_err();
    assert!(matches!(
      err,
      Error::CrossAccountReference { entity: EntityKind::Label, expected, found, .. }
        if expected == ACCT && found == AccountId(8)
    ));
  }

  #[test]
  fn unknown_supplied_id_is_rejected() {
    let mut tx = MemoryTx::default();

    let err = resolve(&mut tx, ACCT, Contact::existing(ContactId(404))).unwrap_err();
    assert!(matches!(err, Error::ReferenceNotFound { entity: EntityKind::Contact, id: 404 }));

    let err = resolve(&mut tx, ACCT, Label::existing(LabelId(5))).unwrap_err();
    assert!(matches!(err, Error::ReferenceNotFound { entity: EntityKind::Label, id: 5 }));
  }
}
