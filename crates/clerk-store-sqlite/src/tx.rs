//! [`SqliteTx`]: [`EntityTx`] over a connection with an open transaction.

use chrono::Utc;
use clerk_core::{
  EntityKind,
  category::{Category, CategoryKey},
  contact::{Contact, ContactKey},
  ids::{AccountId, CategoryId, ContactId, LabelId, LedgerId},
  label::{Label, LabelAssociation},
  ledger::{Ledger, LedgerRecord},
  store::EntityTx,
};
use rusqlite::OptionalExtension as _;

use crate::{
  Result, TxError,
  encode::{
    CATEGORY_COLUMNS, CONTACT_COLUMNS, LABEL_COLUMNS, LEDGER_COLUMNS, RawAssociation,
    RawCategory, RawLedger, contact_from_row, encode_amount, encode_date, encode_dt,
    encode_kind, label_from_row,
  },
};

/// Borrowed view of a connection inside `BEGIN ... COMMIT`. Committing or
/// rolling back is the owner's job.
pub struct SqliteTx<'a> {
  conn: &'a rusqlite::Connection,
}

impl<'a> SqliteTx<'a> {
  pub fn new(tx: &'a rusqlite::Transaction<'_>) -> Self { Self { conn: tx } }

  /// The ordered label ids of `ledger`.
  pub fn ledger_label_ids(&self, ledger: LedgerId) -> rusqlite::Result<Vec<LabelId>> {
    let mut stmt = self
      .conn
      .prepare("SELECT label_id FROM ledger_labels WHERE ledger_id = ?1 ORDER BY position")?;
    stmt
      .query_map(rusqlite::params![ledger.0], |row| row.get(0).map(LabelId))?
      .collect()
  }

  /// The ordered labels of `ledger`, duplicates included.
  pub fn ledger_labels(&self, ledger: LedgerId) -> rusqlite::Result<Vec<Label>> {
    let mut stmt = self.conn.prepare(
      "SELECT l.label_id, l.account_id, l.name, l.system
       FROM ledger_labels ll
       JOIN labels l ON l.label_id = ll.label_id
       WHERE ll.ledger_id = ?1
       ORDER BY ll.position",
    )?;
    stmt.query_map(rusqlite::params![ledger.0], label_from_row)?.collect()
  }

  /// Read entry `id` of `account` with its contact, category and ordered
  /// labels.
  pub fn read_ledger(&mut self, account: AccountId, id: LedgerId) -> Result<Option<Ledger>> {
    let sql =
      format!("SELECT {LEDGER_COLUMNS} FROM ledger WHERE ledger_id = ?1 AND account_id = ?2");
    let Some(raw) = self
      .conn
      .query_row(&sql, rusqlite::params![id.0, account.0], RawLedger::from_row)
      .optional()?
    else {
      return Ok(None);
    };
    let row = raw.decode()?;

    let contact = self
      .get_contact(row.contact_id)
      .map_err(clerk_core::Error::storage)?
      .ok_or(clerk_core::Error::ReferenceNotFound {
        entity: EntityKind::Contact,
        id:     row.contact_id.0,
      })?;
    let category = self
      .get_category(row.category_id)
      .map_err(clerk_core::Error::storage)?
      .ok_or(clerk_core::Error::ReferenceNotFound {
        entity: EntityKind::Category,
        id:     row.category_id.0,
      })?;
    let labels = self.ledger_labels(row.id)?;

    Ok(Some(Ledger {
      id: row.id,
      account_id: row.account_id,
      date: row.date,
      amount: row.amount,
      note: row.note,
      added_by: row.added_by,
      contact,
      category,
      labels,
      external: row.external,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }))
  }
}

impl EntityTx for SqliteTx<'_> {
  type Error = TxError;

  // ── Contacts ──────────────────────────────────────────────────────────────

  fn get_contact(&mut self, id: ContactId) -> Result<Option<Contact>, TxError> {
    let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE contact_id = ?1");
    Ok(
      self
        .conn
        .query_row(&sql, rusqlite::params![id.0], contact_from_row)
        .optional()?,
    )
  }

  fn find_contact_by_natural_key(
    &mut self,
    account: AccountId,
    key: &ContactKey,
  ) -> Result<Option<Contact>, TxError> {
    let row = match key {
      ContactKey::Name(name) => {
        let sql = format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE account_id = ?1 AND name <> '' AND name = ?2"
        );
        self
          .conn
          .query_row(&sql, rusqlite::params![account.0, name], contact_from_row)
          .optional()?
      }
      ContactKey::Person { first_name, last_name } => {
        let sql = format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE account_id = ?1 AND name = '' AND first_name = ?2 AND last_name = ?3"
        );
        self
          .conn
          .query_row(
            &sql,
            rusqlite::params![account.0, first_name, last_name],
            contact_from_row,
          )
          .optional()?
      }
    };
    Ok(row)
  }

  fn insert_contact(&mut self, contact: &Contact) -> Result<Contact, TxError> {
    let now = encode_dt(Utc::now());
    self.conn.execute(
      "INSERT INTO contacts (
         account_id, name, first_name, last_name, email, phone, website,
         address, city, state, zip, country, account_number,
         processor_customer_id, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
      rusqlite::params![
        contact.account_id.0,
        contact.name,
        contact.first_name,
        contact.last_name,
        contact.email,
        contact.phone,
        contact.website,
        contact.address,
        contact.city,
        contact.state,
        contact.zip,
        contact.country,
        contact.account_number,
        contact.processor_customer_id,
        now,
      ],
    )?;
    Ok(Contact { id: ContactId(self.conn.last_insert_rowid()), ..contact.clone() })
  }

  // ── Categories ────────────────────────────────────────────────────────────

  fn get_category(&mut self, id: CategoryId) -> Result<Option<Category>, TxError> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = ?1");
    let raw = self
      .conn
      .query_row(&sql, rusqlite::params![id.0], RawCategory::from_row)
      .optional()?;
    Ok(raw.map(RawCategory::into_category).transpose()?)
  }

  fn find_category_by_natural_key(
    &mut self,
    account: AccountId,
    key: &CategoryKey,
  ) -> Result<Option<Category>, TxError> {
    let sql = format!(
      "SELECT {CATEGORY_COLUMNS} FROM categories
       WHERE account_id = ?1 AND name = ?2 AND kind = ?3"
    );
    let raw = self
      .conn
      .query_row(
        &sql,
        rusqlite::params![account.0, key.name, encode_kind(key.kind)],
        RawCategory::from_row,
      )
      .optional()?;
    Ok(raw.map(RawCategory::into_category).transpose()?)
  }

  fn insert_category(&mut self, category: &Category) -> Result<Category, TxError> {
    let now = encode_dt(Utc::now());
    self.conn.execute(
      "INSERT INTO categories (account_id, name, kind, tax_tag, visible, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
      rusqlite::params![
        category.account_id.0,
        category.name,
        category.kind.map(encode_kind),
        category.tax_tag,
        category.visible,
        now,
      ],
    )?;
    Ok(Category { id: CategoryId(self.conn.last_insert_rowid()), ..category.clone() })
  }

  // ── Labels ────────────────────────────────────────────────────────────────

  fn get_label(&mut self, id: LabelId) -> Result<Option<Label>, TxError> {
    let sql = format!("SELECT {LABEL_COLUMNS} FROM labels WHERE label_id = ?1");
    Ok(
      self
        .conn
        .query_row(&sql, rusqlite::params![id.0], label_from_row)
        .optional()?,
    )
  }

  fn find_label_by_natural_key(
    &mut self,
    account: AccountId,
    name: &str,
  ) -> Result<Option<Label>, TxError> {
    let sql = format!("SELECT {LABEL_COLUMNS} FROM labels WHERE account_id = ?1 AND name = ?2");
    Ok(
      self
        .conn
        .query_row(&sql, rusqlite::params![account.0, name], label_from_row)
        .optional()?,
    )
  }

  fn insert_label(&mut self, label: &Label) -> Result<Label, TxError> {
    let now = encode_dt(Utc::now());
    self.conn.execute(
      "INSERT INTO labels (account_id, name, system, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?4)",
      rusqlite::params![label.account_id.0, label.name, label.system, now],
    )?;
    Ok(Label { id: LabelId(self.conn.last_insert_rowid()), ..label.clone() })
  }

  // ── Ledger ────────────────────────────────────────────────────────────────

  fn insert_ledger(&mut self, record: &LedgerRecord) -> Result<LedgerId, TxError> {
    let at = encode_dt(record.created_at);
    self.conn.execute(
      "INSERT INTO ledger (
         account_id, date, amount, note, contact_id, category_id, added_by,
         processor_charge_id, shoeboxed_id, freshbooks_id, airbnb_hash,
         created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
      rusqlite::params![
        record.account_id.0,
        encode_date(record.date),
        encode_amount(record.amount),
        record.note,
        record.contact_id.0,
        record.category_id.0,
        record.added_by.0,
        record.external.processor_charge_id,
        record.external.shoeboxed_id,
        record.external.freshbooks_id,
        record.external.airbnb_hash,
        at,
      ],
    )?;
    Ok(LedgerId(self.conn.last_insert_rowid()))
  }

  fn insert_ledger_labels(&mut self, ledger: LedgerId, labels: &[LabelId]) -> Result<(), TxError> {
    let mut stmt = self
      .conn
      .prepare("INSERT INTO ledger_labels (ledger_id, position, label_id) VALUES (?1, ?2, ?3)")?;
    for (position, label) in labels.iter().enumerate() {
      stmt.execute(rusqlite::params![ledger.0, position as i64, label.0])?;
    }
    Ok(())
  }

  // ── Legacy association table ──────────────────────────────────────────────

  fn label_associations(&mut self, ledger: LedgerId) -> Result<Vec<LabelAssociation>, TxError> {
    let mut stmt = self.conn.prepare(
      "SELECT ledger_id, label_id, account_id, created_at, updated_at
       FROM labels_to_ledger WHERE ledger_id = ?1 ORDER BY label_id",
    )?;
    let raws = stmt
      .query_map(rusqlite::params![ledger.0], RawAssociation::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(
      raws
        .into_iter()
        .map(RawAssociation::into_association)
        .collect::<Result<_>>()?,
    )
  }

  fn upsert_label_association(&mut self, row: &LabelAssociation) -> Result<(), TxError> {
    self.conn.execute(
      "INSERT INTO labels_to_ledger (ledger_id, label_id, account_id, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5)
       ON CONFLICT (ledger_id, label_id) DO UPDATE SET
         account_id = excluded.account_id,
         updated_at = excluded.updated_at",
      rusqlite::params![
        row.ledger_id.0,
        row.label_id.0,
        row.account_id.0,
        encode_dt(row.created_at),
        encode_dt(row.updated_at),
      ],
    )?;
    Ok(())
  }

  fn delete_label_association(&mut self, ledger: LedgerId, label: LabelId) -> Result<(), TxError> {
    self.conn.execute(
      "DELETE FROM labels_to_ledger WHERE ledger_id = ?1 AND label_id = ?2",
      rusqlite::params![ledger.0, label.0],
    )?;
    Ok(())
  }
}
