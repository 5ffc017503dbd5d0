//! Ledger writer: records one ledger entry inside an open transaction.
//!
//! Order of work:
//!
//! 1. normalise and validate the whole entry (no store access);
//! 2. resolve the contact, then the category, then each label in list order;
//! 3. check every resolved reference belongs to the entry's account;
//! 4. insert the ledger row and its ordered label list;
//! 5. converge the legacy association rows for the new ledger id.
//!
//! The caller owns the transaction and commits it only when this returns `Ok`.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  Error, Result,
  ids::LabelId,
  ledger::{Ledger, LedgerRecord, NewLedger, round_amount},
  legacy,
  resolver::{ensure_scope, resolve, validate},
  store::{Deadline, EntityTx},
};

/// Normalise `entry` and reject it if any required field is missing.
///
/// Scopes the embedded contact, category and labels to the entry's account,
/// trims names and the note, and rounds the amount to cents.
pub fn prepare(mut entry: NewLedger) -> Result<NewLedger> {
  let account = entry.account_id;
  if !account.is_set() {
    return Err(Error::Validation("account id is required".into()));
  }

  entry.amount = round_amount(entry.amount);
  if entry.amount.is_zero() {
    return Err(Error::Validation("amount must be non-zero".into()));
  }

  let note = entry.note.trim();
  if note.len() != entry.note.len() {
    entry.note = note.to_owned();
  }

  validate(&mut entry.contact, account)?;
  validate(&mut entry.category, account)?;
  for label in &mut entry.labels {
    validate(label, account)?;
  }

  Ok(entry)
}

/// Resolve, insert and sync one ledger entry through `tx`.
pub fn record_ledger_entry<T: EntityTx>(
  tx: &mut T,
  entry: NewLedger,
  deadline: Deadline,
  now: DateTime<Utc>,
) -> Result<Ledger> {
  let entry = prepare(entry)?;
  let account = entry.account_id;

  deadline.check()?;
  let contact = resolve(tx, account, entry.contact)?.row;

  deadline.check()?;
  let category = resolve(tx, account, entry.category)?.row;

  let mut labels = Vec::with_capacity(entry.labels.len());
  for candidate in entry.labels {
    deadline.check()?;
    labels.push(resolve(tx, account, candidate)?.row);
  }

  ensure_scope(&contact, account)?;
  ensure_scope(&category, account)?;
  for label in &labels {
    ensure_scope(label, account)?;
  }

  deadline.check()?;
  let record = LedgerRecord {
    account_id:  account,
    date:        entry.date,
    amount:      entry.amount,
    note:        entry.note,
    contact_id:  contact.id,
    category_id: category.id,
    added_by:    entry.added_by,
    external:    entry.external,
    created_at:  now,
  };
  let id = tx.insert_ledger(&record).map_err(Error::storage)?;

  let label_ids: Vec<LabelId> = labels.iter().map(|l| l.id).collect();
  tx.insert_ledger_labels(id, &label_ids).map_err(Error::storage)?;

  let report = legacy::sync_label_associations(tx, id, account, &label_ids, now)?;
  debug!(ledger = %id, ?report, "legacy associations synced");

  Ok(Ledger {
    id,
    account_id: account,
    date: record.date,
    amount: record.amount,
    note: record.note,
    added_by: record.added_by,
    contact,
    category,
    labels,
    external: record.external,
    created_at: now,
    updated_at: now,
  })
}
