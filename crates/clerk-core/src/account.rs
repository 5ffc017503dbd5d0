//! Account: the tenant root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// A tenant. Owns every contact, category, label and ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub id:                    AccountId,
  pub display_name:          String,
  pub plan_id:               Option<i64>,
  pub address:               String,
  pub city:                  String,
  pub state:                 String,
  pub zip:                   String,
  pub country:               String,
  /// Customer token assigned by the payment processor, if billed.
  pub processor_customer_id: Option<String>,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
}

/// Input for [`LedgerStore::create_account`](crate::store::LedgerStore::create_account).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAccount {
  pub display_name:          String,
  pub plan_id:               Option<i64>,
  pub address:               String,
  pub city:                  String,
  pub state:                 String,
  pub zip:                   String,
  pub country:               String,
  pub processor_customer_id: Option<String>,
}

impl NewAccount {
  pub fn named(display_name: impl Into<String>) -> Self {
    Self { display_name: display_name.into(), ..Default::default() }
  }
}
