//! `clerk`: command-line front end for the Clerk ledger store.
//!
//! # Usage
//!
//! ```
//! clerk account create "Acme Books"
//! clerk record --file entry.json --attach ./receipt.pdf=7/receipt.pdf
//! clerk show --account 7 42
//! clerk --config ~/.config/clerk/clerk.toml resync --account 7
//! ```
//!
//! Settings come from `clerk.toml` (or `--config`) overlaid by `CLERK_*`
//! environment variables.

mod collaborators;
mod settings;

use std::{
  io::Read as _,
  path::{Path, PathBuf},
};

use anyhow::{Context as _, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use clerk_core::{
  account::NewAccount,
  collab::Notification,
  ids::{AccountId, LabelId, LedgerId},
  ledger::NewLedger,
  service::{Attachment, FollowUps, LedgerService},
  store::LedgerStore,
};
use clerk_store_sqlite::SqliteStore;
use collaborators::{DirAttachments, LogNotifier};
use serde::Serialize;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Clerk ledger store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "clerk.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Manage accounts.
  #[command(subcommand)]
  Account(AccountCommand),

  /// Record a ledger entry read as JSON from a file (or `-` for stdin).
  Record {
    #[arg(short, long, default_value = "-")]
    file:   PathBuf,
    /// Upload a file after the entry commits, as `LOCAL=REMOTE`.
    #[arg(long, value_parser = parse_attachment)]
    attach: Vec<Attachment>,
    /// Send a receipt notification to this address.
    #[arg(long)]
    notify: Option<String>,
  },

  /// Print a ledger entry with its contact, category and labels.
  Show {
    #[arg(long)]
    account: i64,
    ledger:  i64,
  },

  /// Delete a ledger entry. Its contact and category are kept.
  Delete {
    #[arg(long)]
    account: i64,
    ledger:  i64,
  },

  /// Delete a user label from every entry that carries it.
  DeleteLabel {
    #[arg(long)]
    account: i64,
    label:   i64,
  },

  /// Rebuild the legacy label association rows of an account.
  Resync {
    #[arg(long)]
    account: i64,
  },

  /// List the legacy label association rows of a ledger entry.
  Associations { ledger: i64 },
}

#[derive(Subcommand)]
enum AccountCommand {
  Create { name: String },
  Show { id: i64 },
}

fn parse_attachment(raw: &str) -> Result<Attachment, String> {
  let (local, remote) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected LOCAL=REMOTE, got {raw:?}"))?;
  Ok(Attachment { local_path: PathBuf::from(local), remote_path: remote.to_string() })
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store = SqliteStore::open(&settings.store_path, settings.store_options())
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  match cli.command {
    Command::Account(AccountCommand::Create { name }) => {
      let account = store
        .create_account(NewAccount::named(name))
        .await
        .context("failed to create account")?;
      print_json(&account)
    }
    Command::Account(AccountCommand::Show { id }) => {
      match store.get_account(AccountId(id)).await? {
        Some(account) => print_json(&account),
        None => bail!("account {id} not found"),
      }
    }
    Command::Record { file, attach, notify } => {
      let entry = read_entry(&file)?;
      let notification = notify.map(|recipient| receipt(recipient, &entry));
      let service = LedgerService::new(
        store,
        LogNotifier::new(settings.notify_from.clone()),
        DirAttachments::new(settings.attachments_dir.clone()),
        settings.engine_config(),
      );
      let recorded = service
        .record(entry, FollowUps { attachments: attach, notification })
        .await
        .context("failed to record ledger entry")?;
      print_json(&recorded)
    }
    Command::Show { account, ledger } => {
      match store.get_ledger(AccountId(account), LedgerId(ledger)).await? {
        Some(ledger) => print_json(&ledger),
        None => bail!("ledger entry {ledger} not found in account {account}"),
      }
    }
    Command::Delete { account, ledger } => {
      if !store.delete_ledger(AccountId(account), LedgerId(ledger)).await? {
        bail!("ledger entry {ledger} not found in account {account}");
      }
      Ok(())
    }
    Command::DeleteLabel { account, label } => {
      if !store.delete_label(AccountId(account), LabelId(label)).await? {
        bail!("label {label} not found in account {account}");
      }
      Ok(())
    }
    Command::Resync { account } => {
      let report = store
        .resync_legacy_associations(AccountId(account), Utc::now())
        .await
        .context("failed to re-sync legacy associations")?;
      print_json(&report)
    }
    Command::Associations { ledger } => {
      let rows = store.label_associations(LedgerId(ledger)).await?;
      print_json(&rows)
    }
  }
}

fn read_entry(file: &Path) -> anyhow::Result<NewLedger> {
  let raw = if file.as_os_str() == "-" {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("reading entry from stdin")?;
    buf
  } else {
    std::fs::read_to_string(file)
      .with_context(|| format!("reading entry file {}", file.display()))?
  };
  serde_json::from_str(&raw).context("parsing ledger entry JSON")
}

fn receipt(recipient: String, entry: &NewLedger) -> Notification {
  Notification {
    subject: format!("New ledger entry for {}", entry.date),
    html_body: format!(
      "<p>An entry of {} dated {} was recorded.</p>",
      entry.amount, entry.date
    ),
    recipient,
    attachment_paths: Vec::new(),
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
