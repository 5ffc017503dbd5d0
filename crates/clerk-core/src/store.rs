//! Store contracts.
//!
//! [`EntityTx`] is the synchronous, transaction-scoped contract the writer and
//! resolver run against: every call on one value participates in the same
//! open transaction. [`LedgerStore`] is the asynchronous surface callers use;
//! each of its writes opens, drives and commits one such transaction.

use std::{
  future::Future,
  time::{Duration, Instant},
};

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  account::{Account, NewAccount},
  category::{Category, CategoryKey},
  contact::{Contact, ContactKey},
  ids::{AccountId, CategoryId, ContactId, LabelId, LedgerId},
  label::{Label, LabelAssociation},
  ledger::{Ledger, LedgerRecord, NewLedger},
  legacy::SyncReport,
};

// ─── Deadline ────────────────────────────────────────────────────────────────

/// A caller-supplied bound on how long a transaction may run before it must
/// roll back instead of committing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
  pub const NONE: Self = Self(None);

  pub fn at(instant: Instant) -> Self { Self(Some(instant)) }

  pub fn after(timeout: Duration) -> Self { Self(Instant::now().checked_add(timeout)) }

  pub fn from_timeout(timeout: Option<Duration>) -> Self {
    timeout.map_or(Self::NONE, Self::after)
  }

  pub fn is_expired(&self) -> bool {
    self.0.is_some_and(|at| Instant::now() >= at)
  }

  /// Time left before the deadline; `None` when unbounded.
  pub fn remaining(&self) -> Option<Duration> {
    self.0.map(|at| at.saturating_duration_since(Instant::now()))
  }

  /// `wait`, shortened so it never runs past the deadline.
  pub fn cap(&self, wait: Duration) -> Duration {
    self.remaining().map_or(wait, |left| left.min(wait))
  }

  /// `Err(DeadlineExceeded)` once the deadline has passed.
  pub fn check(&self) -> Result<()> {
    if self.is_expired() {
      return Err(Error::DeadlineExceeded);
    }
    Ok(())
  }
}

// ─── Transaction-scoped contract ─────────────────────────────────────────────

/// A storage error that can tell a unique-constraint violation apart from
/// every other failure.
pub trait StoreFailure: std::error::Error + Send + Sync + 'static {
  fn is_unique_violation(&self) -> bool;
}

/// Entity operations inside one open transaction.
///
/// Natural-key lookups compare trimmed values case-insensitively and are always
/// scoped to an account. Inserts must fail with a unique violation when the
/// natural key is already taken within the account.
pub trait EntityTx {
  type Error: StoreFailure;

  // ── Contacts ──────────────────────────────────────────────────────────

  fn get_contact(&mut self, id: ContactId) -> Result<Option<Contact>, Self::Error>;

  fn find_contact_by_natural_key(
    &mut self,
    account: AccountId,
    key: &ContactKey,
  ) -> Result<Option<Contact>, Self::Error>;

  /// Insert `contact` (ignoring its `id`) and return the stored row.
  fn insert_contact(&mut self, contact: &Contact) -> Result<Contact, Self::Error>;

  // ── Categories ────────────────────────────────────────────────────────

  fn get_category(&mut self, id: CategoryId) -> Result<Option<Category>, Self::Error>;

  fn find_category_by_natural_key(
    &mut self,
    account: AccountId,
    key: &CategoryKey,
  ) -> Result<Option<Category>, Self::Error>;

  fn insert_category(&mut self, category: &Category) -> Result<Category, Self::Error>;

  // ── Labels ────────────────────────────────────────────────────────────

  fn get_label(&mut self, id: LabelId) -> Result<Option<Label>, Self::Error>;

  fn find_label_by_natural_key(
    &mut self,
    account: AccountId,
    name: &str,
  ) -> Result<Option<Label>, Self::Error>;

  fn insert_label(&mut self, label: &Label) -> Result<Label, Self::Error>;

  // ── Ledger ────────────────────────────────────────────────────────────

  fn insert_ledger(&mut self, record: &LedgerRecord) -> Result<LedgerId, Self::Error>;

  /// Record the ordered label list of a freshly inserted ledger entry.
  fn insert_ledger_labels(
    &mut self,
    ledger: LedgerId,
    labels: &[LabelId],
  ) -> Result<(), Self::Error>;

  // ── Legacy association table ──────────────────────────────────────────

  fn label_associations(
    &mut self,
    ledger: LedgerId,
  ) -> Result<Vec<LabelAssociation>, Self::Error>;

  /// Insert the row, or update `account_id`/`updated_at` of the existing
  /// `(ledger_id, label_id)` row.
  fn upsert_label_association(&mut self, row: &LabelAssociation) -> Result<(), Self::Error>;

  fn delete_label_association(
    &mut self,
    ledger: LedgerId,
    label: LabelId,
  ) -> Result<(), Self::Error>;
}

// ─── Async contract ──────────────────────────────────────────────────────────

/// Abstraction over a Clerk entity store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + From<Error>;

  // ── Accounts ──────────────────────────────────────────────────────────

  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    id: AccountId,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// Resolve the entry's contact, category and labels, insert it, and sync
  /// the legacy association rows, all in one transaction. Nothing is
  /// committed if any step fails or `deadline` passes first.
  fn record_ledger_entry(
    &self,
    entry: NewLedger,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Ledger, Self::Error>> + Send + '_;

  /// Returns `None` when the entry does not exist within `account`.
  fn get_ledger(
    &self,
    account: AccountId,
    id: LedgerId,
  ) -> impl Future<Output = Result<Option<Ledger>, Self::Error>> + Send + '_;

  /// Delete an entry with its label relation and legacy rows. The referenced
  /// contact and category are left in place. Returns `false` when nothing
  /// matched.
  fn delete_ledger(
    &self,
    account: AccountId,
    id: LedgerId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Labels ────────────────────────────────────────────────────────────

  /// Delete a user label everywhere it is referenced. System labels are
  /// refused with [`Error::ProtectedLabel`].
  fn delete_label(
    &self,
    account: AccountId,
    id: LabelId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Legacy association table ──────────────────────────────────────────

  fn sync_label_associations(
    &self,
    ledger: LedgerId,
    account: AccountId,
    labels: Vec<LabelId>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<SyncReport, Self::Error>> + Send + '_;

  /// Re-derive every legacy row of `account` from the ledgers' own label
  /// lists.
  fn resync_legacy_associations(
    &self,
    account: AccountId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<SyncReport, Self::Error>> + Send + '_;

  fn label_associations(
    &self,
    ledger: LedgerId,
  ) -> impl Future<Output = Result<Vec<LabelAssociation>, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn no_deadline_never_expires() {
    assert!(Deadline::NONE.check().is_ok());
    assert!(Deadline::from_timeout(None).check().is_ok());
  }

  #[test]
  fn elapsed_deadline_is_expired() {
    let deadline = Deadline::at(Instant::now());
    assert!(deadline.is_expired());
    assert!(matches!(deadline.check(), Err(Error::DeadlineExceeded)));
  }

  #[test]
  fn generous_deadline_is_not_expired() {
    assert!(!Deadline::after(Duration::from_secs(60)).is_expired());
  }

  #[test]
  fn cap_never_waits_past_the_deadline() {
    let wait = Duration::from_secs(5);
    assert_eq!(Deadline::NONE.cap(wait), wait);
    assert_eq!(Deadline::at(Instant::now()).cap(wait), Duration::ZERO);
    assert!(Deadline::after(Duration::from_millis(50)).cap(wait) <= Duration::from_millis(50));
    assert_eq!(Deadline::after(Duration::from_secs(60)).cap(wait), wait);
  }
}
