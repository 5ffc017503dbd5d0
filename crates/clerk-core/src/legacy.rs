//! Legacy label association table.
//!
//! A retiring external system reads label ⇄ ledger relationships from a flat
//! join table tagged with the owning account. The table is a materialised
//! view of each ledger's label list: [`plan`] computes, as a pure function,
//! what must change to make the stored rows match the desired label set, and
//! [`apply`] executes that plan inside the caller's transaction.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  EntityKind, Error, Result,
  ids::{AccountId, LabelId, LedgerId},
  label::LabelAssociation,
  resolver::ensure_scope,
  store::EntityTx,
};

/// Row-level changes needed to converge one ledger's association rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
  pub inserts:   Vec<LabelAssociation>,
  /// Existing rows whose stored account id is stale.
  pub updates:   Vec<LabelAssociation>,
  /// Label ids whose rows no longer belong to the ledger.
  pub deletes:   Vec<LabelId>,
  pub unchanged: usize,
}

/// Counts of what a sync changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
  pub inserted:  usize,
  pub updated:   usize,
  pub deleted:   usize,
  pub unchanged: usize,
}

impl SyncReport {
  pub fn merge(&mut self, other: SyncReport) {
    self.inserted += other.inserted;
    self.updated += other.updated;
    self.deleted += other.deleted;
    self.unchanged += other.unchanged;
  }

  pub fn is_noop(&self) -> bool {
    self.inserted == 0 && self.updated == 0 && self.deleted == 0
  }
}

/// Compute the changes that turn `current` into exactly one row per distinct
/// id in `desired`, each tagged with `account`.
///
/// Desired ids keep their first-occurrence order; duplicates collapse.
pub fn plan(
  ledger: LedgerId,
  account: AccountId,
  desired: &[LabelId],
  current: &[LabelAssociation],
  at: DateTime<Utc>,
) -> SyncPlan {
  let mut seen = HashSet::new();
  let wanted: Vec<LabelId> = desired.iter().copied().filter(|id| seen.insert(*id)).collect();

  let mut out = SyncPlan::default();

  for label in &wanted {
    match current.iter().find(|row| row.label_id == *label) {
      Some(row) if row.account_id == account => out.unchanged += 1,
      Some(row) => out.updates.push(LabelAssociation {
        account_id: account,
        updated_at: at,
        ..row.clone()
      }),
      None => out.inserts.push(LabelAssociation {
        ledger_id:  ledger,
        label_id:   *label,
        account_id: account,
        created_at: at,
        updated_at: at,
      }),
    }
  }

  let mut dropped = HashSet::new();
  for row in current {
    if !seen.contains(&row.label_id) && dropped.insert(row.label_id) {
      out.deletes.push(row.label_id);
    }
  }

  out
}

/// Execute `plan` for `ledger` through `tx`.
pub fn apply<T: EntityTx>(tx: &mut T, ledger: LedgerId, plan: &SyncPlan) -> Result<SyncReport> {
  let mut report = SyncReport { unchanged: plan.unchanged, ..Default::default() };

  for row in &plan.inserts {
    tx.upsert_label_association(row).map_err(Error::storage)?;
    report.inserted += 1;
  }

  for row in &plan.updates {
    tx.upsert_label_association(row).map_err(Error::storage)?;
    report.updated += 1;
  }

  for label in &plan.deletes {
    tx.delete_label_association(ledger, *label).map_err(Error::storage)?;
    report.deleted += 1;
  }

  Ok(report)
}

/// Converge the association rows of `ledger` onto `labels`. Idempotent:
/// running it again with the same inputs changes nothing.
///
/// Every label must exist and belong to `account`; nothing is written
/// otherwise. The caller is responsible for checking that `account` owns
/// `ledger`.
pub fn sync_label_associations<T: EntityTx>(
  tx: &mut T,
  ledger: LedgerId,
  account: AccountId,
  labels: &[LabelId],
  at: DateTime<Utc>,
) -> Result<SyncReport> {
  let mut checked = HashSet::new();
  for id in labels.iter().copied().filter(|id| checked.insert(*id)) {
    let label = tx
      .get_label(id)
      .map_err(Error::storage)?
      .ok_or(Error::ReferenceNotFound { entity: EntityKind::Label, id: id.0 })?;
    ensure_scope(&label, account)?;
  }

  let current = tx.label_associations(ledger).map_err(Error::storage)?;
  let plan = plan(ledger, account, labels, &current, at);
  apply(tx, ledger, &plan)
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone as _};

  use super::*;
  use crate::{label::Label, testing::MemoryTx};

  const LEDGER: LedgerId = LedgerId(1);
  const ACCT: AccountId = AccountId(7);

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap() }

  fn with_labels(account: AccountId, ids: &[i64]) -> MemoryTx {
    let mut tx = MemoryTx::default();
    for id in ids {
      tx.labels.push(Label {
        id: LabelId(*id),
        account_id: account,
        name: format!("label-{id}"),
        system: false,
      });
    }
    tx
  }

  fn row(label: i64, account: AccountId) -> LabelAssociation {
    LabelAssociation {
      ledger_id:  LEDGER,
      label_id:   LabelId(label),
      account_id: account,
      created_at: t0(),
      updated_at: t0(),
    }
  }

  #[test]
  fn plan_inserts_missing_rows() {
    let p = plan(LEDGER, ACCT, &[LabelId(1), LabelId(2)], &[], t0());
    assert_eq!(p.inserts.len(), 2);
    assert!(p.updates.is_empty());
    assert!(p.deletes.is_empty());
    assert_eq!(p.unchanged, 0);
  }

  #[test]
  fn plan_collapses_duplicate_labels() {
    let p = plan(LEDGER, ACCT, &[LabelId(3), LabelId(3), LabelId(1)], &[], t0());
    let ids: Vec<_> = p.inserts.iter().map(|r| r.label_id).collect();
    assert_eq!(ids, vec![LabelId(3), LabelId(1)]);
  }

  #[test]
  fn plan_deletes_stale_and_keeps_matching_rows() {
    let current = [row(1, ACCT), row(2, ACCT)];
    let p = plan(LEDGER, ACCT, &[LabelId(2), LabelId(3)], &current, t0());

    assert_eq!(p.unchanged, 1);
    assert_eq!(p.deletes, vec![LabelId(1)]);
    assert_eq!(p.inserts.len(), 1);
    assert_eq!(p.inserts[0].label_id, LabelId(3));
  }

  #[test]
  fn plan_rewrites_rows_with_wrong_account() {
    let later = t0() + Duration::minutes(5);
    let p = plan(LEDGER, ACCT, &[LabelId(1)], &[row(1, AccountId(0))], later);

    assert!(p.inserts.is_empty());
    assert_eq!(p.updates.len(), 1);
    assert_eq!(p.updates[0].account_id, ACCT);
    assert_eq!(p.updates[0].created_at, t0());
    assert_eq!(p.updates[0].updated_at, later);
  }

  #[test]
  fn sync_converges_and_is_idempotent() {
    let mut tx = with_labels(ACCT, &[1, 2]);
    tx.seed_association(LEDGER, LabelId(9), ACCT, t0());

    let first =
      sync_label_associations(&mut tx, LEDGER, ACCT, &[LabelId(1), LabelId(2)], t0()).unwrap();
    assert_eq!(first, SyncReport { inserted: 2, updated: 0, deleted: 1, unchanged: 0 });

    let second =
      sync_label_associations(&mut tx, LEDGER, ACCT, &[LabelId(1), LabelId(2)], t0()).unwrap();
    assert!(second.is_noop());
    assert_eq!(second.unchanged, 2);

    assert_eq!(
      tx.association_pairs(),
      vec![(LEDGER, LabelId(1)), (LEDGER, LabelId(2))]
    );
  }

  #[test]
  fn sync_to_empty_set_removes_everything() {
    let mut tx = MemoryTx::default();
    tx.seed_association(LEDGER, LabelId(1), ACCT, t0());
    tx.seed_association(LEDGER, LabelId(2), ACCT, t0());

    let report = sync_label_associations(&mut tx, LEDGER, ACCT, &[], t0()).unwrap();
    assert_eq!(report.deleted, 2);
    assert!(tx.association_pairs().is_empty());
  }

  #[test]
  fn sync_refuses_labels_of_another_account() {
    let mut tx = with_labels(ACCT, &[1]);
    tx.labels.push(Label {
      id: LabelId(2),
      account_id: AccountId(8),
      name: "theirs".into(),
      system: false,
    });
    tx.seed_association(LEDGER, LabelId(1), ACCT, t0());

    let err = sync_label_associations(&mut tx, LEDGER, ACCT, &[LabelId(1), LabelId(2)], t0())
      .unwrap_err();
    assert!(matches!(
      err,
      Error::CrossAccountReference { entity: EntityKind::Label, id: 2, expected, found }
        if expected == ACCT && found == AccountId(8)
    ));
    assert_eq!(tx.association_pairs(), vec![(LEDGER, LabelId(1))]);
  }

  #[test]
  fn sync_refuses_unknown_labels() {
    let mut tx = with_labels(ACCT, &[1]);

    let err = sync_label_associations(&mut tx, LEDGER, ACCT, &[LabelId(1), LabelId(5)], t0())
      .unwrap_err();
    assert!(matches!(err, Error::ReferenceNotFound { entity: EntityKind::Label, id: 5 }));
    assert!(tx.association_pairs().is_empty());
  }
}
