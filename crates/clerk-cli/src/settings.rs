//! Runtime settings, loaded from an optional TOML file overlaid by `CLERK_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use clerk_core::config::EngineConfig;
use clerk_store_sqlite::StoreOptions;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store_path:             PathBuf,
  pub busy_timeout_ms:        u64,
  /// `0` disables the transaction deadline.
  pub transaction_timeout_ms: u64,
  pub attachments_dir:        PathBuf,
  pub notify_from:            String,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path:             PathBuf::from("clerk.db"),
      busy_timeout_ms:        5_000,
      transaction_timeout_ms: 5_000,
      attachments_dir:        PathBuf::from("attachments"),
      notify_from:            "clerk@localhost".to_string(),
    }
  }
}

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CLERK"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut settings: Settings = raw
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    settings.attachments_dir = expand_tilde(&settings.attachments_dir);
    Ok(settings)
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions { busy_timeout: Duration::from_millis(self.busy_timeout_ms) }
  }

  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      transaction_timeout: (self.transaction_timeout_ms > 0)
        .then(|| Duration::from_millis(self.transaction_timeout_ms)),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/clerk.toml")).unwrap();
    assert_eq!(settings.busy_timeout_ms, 5_000);
    assert_eq!(
      settings.engine_config().transaction_timeout,
      Some(Duration::from_secs(5))
    );
  }

  #[test]
  fn zero_timeout_disables_the_deadline() {
    let settings = Settings { transaction_timeout_ms: 0, ..Settings::default() };
    assert_eq!(settings.engine_config().transaction_timeout, None);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/books/clerk.db")), Path::new(&home).join("books/clerk.db"));
    assert_eq!(expand_tilde(Path::new("/srv/clerk.db")), Path::new("/srv/clerk.db"));
  }
}
