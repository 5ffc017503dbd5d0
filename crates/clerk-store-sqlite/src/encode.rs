//! Encoding and decoding helpers between Clerk domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates are `YYYY-MM-DD`, and amounts are
//! canonical decimal text so no floating-point conversion ever happens.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use clerk_core::{
  account::Account,
  category::{Category, CategoryKind},
  contact::Contact,
  ids::{AccountId, CategoryId, ContactId, LabelId, LedgerId, UserId},
  label::{Label, LabelAssociation},
  ledger::ExternalIds,
};
use rust_decimal::Decimal;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Amount ──────────────────────────────────────────────────────────────────

pub fn encode_amount(amount: Decimal) -> String { amount.to_string() }

pub fn decode_amount(s: &str) -> Result<Decimal> {
  Decimal::from_str(s).map_err(|e| Error::DecimalParse(format!("{s:?}: {e}")))
}

// ─── CategoryKind ────────────────────────────────────────────────────────────

pub fn encode_kind(kind: CategoryKind) -> &'static str {
  match kind {
    CategoryKind::Expense => "expense",
    CategoryKind::Income => "income",
  }
}

pub fn decode_kind(s: &str) -> Result<CategoryKind> {
  match s {
    "expense" => Ok(CategoryKind::Expense),
    "income" => Ok(CategoryKind::Income),
    other => Err(Error::UnknownCategoryKind(other.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str = "account_id, display_name, plan_id, address, city, state, zip, \
                                   country, processor_customer_id, created_at, updated_at";

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub account_id:            i64,
  pub display_name:          String,
  pub plan_id:               Option<i64>,
  pub address:               String,
  pub city:                  String,
  pub state:                 String,
  pub zip:                   String,
  pub country:               String,
  pub processor_customer_id: Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:            row.get(0)?,
      display_name:          row.get(1)?,
      plan_id:               row.get(2)?,
      address:               row.get(3)?,
      city:                  row.get(4)?,
      state:                 row.get(5)?,
      zip:                   row.get(6)?,
      country:               row.get(7)?,
      processor_customer_id: row.get(8)?,
      created_at:            row.get(9)?,
      updated_at:            row.get(10)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      id:                    AccountId(self.account_id),
      display_name:          self.display_name,
      plan_id:               self.plan_id,
      address:               self.address,
      city:                  self.city,
      state:                 self.state,
      zip:                   self.zip,
      country:               self.country,
      processor_customer_id: self.processor_customer_id,
      created_at:            decode_dt(&self.created_at)?,
      updated_at:            decode_dt(&self.updated_at)?,
    })
  }
}

pub const CONTACT_COLUMNS: &str = "contact_id, account_id, name, first_name, last_name, email, \
                                   phone, website, address, city, state, zip, country, \
                                   account_number, processor_customer_id";

/// Contacts hold no encoded columns, so rows map straight onto [`Contact`].
pub fn contact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
  Ok(Contact {
    id:                    ContactId(row.get(0)?),
    account_id:            AccountId(row.get(1)?),
    name:                  row.get(2)?,
    first_name:            row.get(3)?,
    last_name:             row.get(4)?,
    email:                 row.get(5)?,
    phone:                 row.get(6)?,
    website:               row.get(7)?,
    address:               row.get(8)?,
    city:                  row.get(9)?,
    state:                 row.get(10)?,
    zip:                   row.get(11)?,
    country:               row.get(12)?,
    account_number:        row.get(13)?,
    processor_customer_id: row.get(14)?,
  })
}

pub const CATEGORY_COLUMNS: &str = "category_id, account_id, name, kind, tax_tag, visible";

/// Raw values read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: i64,
  pub account_id:  i64,
  pub name:        String,
  pub kind:        String,
  pub tax_tag:     String,
  pub visible:     bool,
}

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(0)?,
      account_id:  row.get(1)?,
      name:        row.get(2)?,
      kind:        row.get(3)?,
      tax_tag:     row.get(4)?,
      visible:     row.get(5)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      id:         CategoryId(self.category_id),
      account_id: AccountId(self.account_id),
      name:       self.name,
      kind:       Some(decode_kind(&self.kind)?),
      tax_tag:    self.tax_tag,
      visible:    self.visible,
    })
  }
}

pub const LABEL_COLUMNS: &str = "label_id, account_id, name, system";

pub fn label_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Label> {
  Ok(Label {
    id:         LabelId(row.get(0)?),
    account_id: AccountId(row.get(1)?),
    name:       row.get(2)?,
    system:     row.get(3)?,
  })
}

/// Raw values read directly from a `labels_to_ledger` row.
pub struct RawAssociation {
  pub ledger_id:  i64,
  pub label_id:   i64,
  pub account_id: i64,
  pub created_at: String,
  pub updated_at: String,
}

impl RawAssociation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ledger_id:  row.get(0)?,
      label_id:   row.get(1)?,
      account_id: row.get(2)?,
      created_at: row.get(3)?,
      updated_at: row.get(4)?,
    })
  }

  pub fn into_association(self) -> Result<LabelAssociation> {
    Ok(LabelAssociation {
      ledger_id:  LedgerId(self.ledger_id),
      label_id:   LabelId(self.label_id),
      account_id: AccountId(self.account_id),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const LEDGER_COLUMNS: &str = "ledger_id, account_id, date, amount, note, contact_id, \
                                  category_id, added_by, processor_charge_id, shoeboxed_id, \
                                  freshbooks_id, airbnb_hash, created_at, updated_at";

/// Raw values read directly from a `ledger` row.
pub struct RawLedger {
  pub ledger_id:   i64,
  pub account_id:  i64,
  pub date:        String,
  pub amount:      String,
  pub note:        String,
  pub contact_id:  i64,
  pub category_id: i64,
  pub added_by:    i64,
  pub external:    ExternalIds,
  pub created_at:  String,
  pub updated_at:  String,
}

/// A decoded `ledger` row whose references are still bare identifiers.
pub struct LedgerRow {
  pub id:          LedgerId,
  pub account_id:  AccountId,
  pub date:        NaiveDate,
  pub amount:      Decimal,
  pub note:        String,
  pub contact_id:  ContactId,
  pub category_id: CategoryId,
  pub added_by:    UserId,
  pub external:    ExternalIds,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl RawLedger {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ledger_id:   row.get(0)?,
      account_id:  row.get(1)?,
      date:        row.get(2)?,
      amount:      row.get(3)?,
      note:        row.get(4)?,
      contact_id:  row.get(5)?,
      category_id: row.get(6)?,
      added_by:    row.get(7)?,
      external:    ExternalIds {
        processor_charge_id: row.get(8)?,
        shoeboxed_id:        row.get(9)?,
        freshbooks_id:       row.get(10)?,
        airbnb_hash:         row.get(11)?,
      },
      created_at:  row.get(12)?,
      updated_at:  row.get(13)?,
    })
  }

  pub fn decode(self) -> Result<LedgerRow> {
    Ok(LedgerRow {
      id:          LedgerId(self.ledger_id),
      account_id:  AccountId(self.account_id),
      date:        decode_date(&self.date)?,
      amount:      decode_amount(&self.amount)?,
      note:        self.note,
      contact_id:  ContactId(self.contact_id),
      category_id: CategoryId(self.category_id),
      added_by:    UserId(self.added_by),
      external:    self.external,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}
