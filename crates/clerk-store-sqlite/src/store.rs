//! [`SqliteStore`]: the SQLite implementation of [`LedgerStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use clerk_core::{
  EntityKind,
  account::{Account, NewAccount},
  ids::{AccountId, LabelId, LedgerId},
  label::LabelAssociation,
  ledger::{Ledger, NewLedger},
  legacy::{self, SyncReport},
  store::{Deadline, EntityTx as _, LedgerStore},
  writer,
};
use rusqlite::{Connection, OptionalExtension as _, Transaction, TransactionBehavior};
use tracing::info;

use crate::{
  Error, Result,
  encode::{ACCOUNT_COLUMNS, RawAccount, encode_dt},
  error::raise,
  schema::SCHEMA,
  tx::SqliteTx,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection-level settings applied when a store is opened.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  /// How long a writer waits for another connection's write lock before
  /// failing with `SQLITE_BUSY`.
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { busy_timeout: Duration::from_secs(5) } }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Clerk ledger store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  options:         StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options: StoreOptions::default() };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    let options = self.options;
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `work` inside one `BEGIN IMMEDIATE` transaction on the connection
  /// thread. The transaction commits only if `work` succeeds and `deadline`
  /// has not passed; otherwise it is rolled back on drop.
  async fn write<R, F>(&self, deadline: Deadline, work: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&mut SqliteTx<'_>) -> clerk_core::Result<R> + Send + 'static,
  {
    let busy = self.options.busy_timeout;
    let out = self
      .conn
      .call(move |conn| {
        let tx = begin(conn, busy, deadline)?;
        deadline.check().map_err(raise)?;
        let out = work(&mut SqliteTx::new(&tx)).map_err(raise)?;
        deadline.check().map_err(raise)?;
        tx.commit()?;
        Ok(out)
      })
      .await?;
    Ok(out)
  }
}

/// Take the write lock with `BEGIN IMMEDIATE`, waiting on a busy database no
/// longer than `deadline` allows. The connection's own busy timeout is put
/// back once the lock is taken or refused.
///
/// A lock still held elsewhere when the deadline cuts the wait short is
/// reported as [`clerk_core::Error::DeadlineExceeded`].
fn begin(
  conn: &Connection,
  busy: Duration,
  deadline: Deadline,
) -> tokio_rusqlite::Result<Transaction<'_>> {
  let wait = deadline.cap(busy);
  conn.busy_timeout(wait)?;
  let begun = Transaction::new_unchecked(conn, TransactionBehavior::Immediate);
  conn.busy_timeout(busy)?;
  match begun {
    Err(err)
      if wait < busy && err.sqlite_error_code() == Some(rusqlite::ErrorCode::DatabaseBusy) =>
    {
      Err(raise(clerk_core::Error::DeadlineExceeded))
    }
    other => Ok(other?),
  }
}

/// Carry any store error out of a connection closure.
fn escape(err: Error) -> tokio_rusqlite::Error {
  match err {
    Error::Core(core) => raise(core),
    Error::Database(db) => db,
    other => raise(clerk_core::Error::storage(other)),
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let now = Utc::now();
    let at_str = encode_dt(now);
    let display_name = input.display_name.trim().to_owned();
    if display_name.is_empty() {
      return Err(clerk_core::Error::Validation("account display name is required".into()).into());
    }

    let name = display_name.clone();
    let fields = input.clone();
    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts (
             display_name, plan_id, address, city, state, zip, country,
             processor_customer_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            name,
            fields.plan_id,
            fields.address,
            fields.city,
            fields.state,
            fields.zip,
            fields.country,
            fields.processor_customer_id,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    info!(account = id, "account created");
    Ok(Account {
      id: AccountId(id),
      display_name,
      plan_id: input.plan_id,
      address: input.address,
      city: input.city,
      state: input.state,
      zip: input.zip,
      country: input.country,
      processor_customer_id: input.processor_customer_id,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id.0], RawAccount::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  // ── Ledger ────────────────────────────────────────────────────────────────

  async fn record_ledger_entry(&self, entry: NewLedger, deadline: Deadline) -> Result<Ledger> {
    let ledger = self
      .write(deadline, move |tx| {
        writer::record_ledger_entry(tx, entry, deadline, Utc::now())
      })
      .await?;

    info!(
      ledger = %ledger.id,
      account = %ledger.account_id,
      amount = %ledger.amount,
      "ledger entry committed"
    );
    Ok(ledger)
  }

  async fn get_ledger(&self, account: AccountId, id: LedgerId) -> Result<Option<Ledger>> {
    let ledger = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        SqliteTx::new(&tx).read_ledger(account, id).map_err(escape)
      })
      .await?;
    Ok(ledger)
  }

  async fn delete_ledger(&self, account: AccountId, id: LedgerId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM ledger WHERE ledger_id = ?1 AND account_id = ?2",
            rusqlite::params![id.0, account.0],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(false);
        }

        tx.execute("DELETE FROM labels_to_ledger WHERE ledger_id = ?1", rusqlite::params![id.0])?;
        tx.execute("DELETE FROM ledger_labels WHERE ledger_id = ?1", rusqlite::params![id.0])?;
        tx.execute("DELETE FROM ledger WHERE ledger_id = ?1", rusqlite::params![id.0])?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if deleted {
      info!(ledger = %id, account = %account, "ledger entry deleted");
    }
    Ok(deleted)
  }

  // ── Labels ────────────────────────────────────────────────────────────────

  async fn delete_label(&self, account: AccountId, id: LabelId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let system: Option<bool> = tx
          .query_row(
            "SELECT system FROM labels WHERE label_id = ?1 AND account_id = ?2",
            rusqlite::params![id.0, account.0],
            |row| row.get(0),
          )
          .optional()?;
        match system {
          None => return Ok(false),
          Some(true) => return Err(raise(clerk_core::Error::ProtectedLabel(id))),
          Some(false) => {}
        }

        tx.execute("DELETE FROM labels_to_ledger WHERE label_id = ?1", rusqlite::params![id.0])?;
        tx.execute("DELETE FROM ledger_labels WHERE label_id = ?1", rusqlite::params![id.0])?;
        tx.execute("DELETE FROM labels WHERE label_id = ?1", rusqlite::params![id.0])?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if deleted {
      info!(label = %id, account = %account, "label deleted");
    }
    Ok(deleted)
  }

  // ── Legacy association table ──────────────────────────────────────────────

  async fn sync_label_associations(
    &self,
    ledger: LedgerId,
    account: AccountId,
    labels: Vec<LabelId>,
    at: DateTime<Utc>,
  ) -> Result<SyncReport> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let owner: Option<i64> = tx
          .query_row(
            "SELECT account_id FROM ledger WHERE ledger_id = ?1",
            rusqlite::params![ledger.0],
            |row| row.get(0),
          )
          .optional()?;
        match owner.map(AccountId) {
          None => {
            return Err(raise(clerk_core::Error::ReferenceNotFound {
              entity: EntityKind::Ledger,
              id:     ledger.0,
            }));
          }
          Some(found) if found != account => {
            return Err(raise(clerk_core::Error::CrossAccountReference {
              entity: EntityKind::Ledger,
              id: ledger.0,
              expected: account,
              found,
            }));
          }
          Some(_) => {}
        }

        let report =
          legacy::sync_label_associations(&mut SqliteTx::new(&tx), ledger, account, &labels, at)
            .map_err(raise)?;
        tx.commit()?;
        Ok(report)
      })
      .await
      .map_err(Error::from)
  }

  async fn resync_legacy_associations(
    &self,
    account: AccountId,
    at: DateTime<Utc>,
  ) -> Result<SyncReport> {
    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let ledgers = {
          let mut stmt =
            tx.prepare("SELECT ledger_id FROM ledger WHERE account_id = ?1 ORDER BY ledger_id")?;
          stmt
            .query_map(rusqlite::params![account.0], |row| row.get(0).map(LedgerId))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut etx = SqliteTx::new(&tx);
        let mut report = SyncReport::default();
        for ledger in ledgers {
          let labels = etx.ledger_label_ids(ledger)?;
          let step = legacy::sync_label_associations(&mut etx, ledger, account, &labels, at)
            .map_err(raise)?;
          report.merge(step);
        }
        tx.commit()?;
        Ok(report)
      })
      .await?;

    info!(account = %account, ?report, "legacy associations re-synced");
    Ok(report)
  }

  async fn label_associations(&self, ledger: LedgerId) -> Result<Vec<LabelAssociation>> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        SqliteTx::new(&tx)
          .label_associations(ledger)
          .map_err(|e| raise(clerk_core::Error::storage(e)))
      })
      .await
      .map_err(Error::from)
  }
}
