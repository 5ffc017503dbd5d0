//! Integer identifier newtypes.
//!
//! Every entity is keyed by a store-assigned `i64`. The value `0` is reserved
//! for "not yet resolved": a candidate carrying a zero identifier is looked up
//! or created by its natural key.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
      Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl $name {
      pub const UNSET: Self = Self(0);

      pub fn is_set(self) -> bool { self.0 != 0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self { Self(raw) }
    }
  };
}

define_id!(
  /// Tenant identifier. Every other entity is scoped to exactly one account.
  AccountId
);
define_id!(ContactId);
define_id!(CategoryId);
define_id!(LabelId);
define_id!(LedgerId);
define_id!(
  /// The user who recorded a ledger entry. Users live outside this engine.
  UserId
);
