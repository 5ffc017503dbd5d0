//! Engine configuration.
//!
//! Built by the embedding binary and passed in at construction time; nothing in
//! this crate reads the process environment.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Upper bound on a single ledger write transaction. `None` disables the
  /// deadline.
  pub transaction_timeout: Option<Duration>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { transaction_timeout: Some(Duration::from_secs(5)) }
  }
}
