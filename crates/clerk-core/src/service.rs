//! [`LedgerService`]: records ledger entries and runs their post-commit
//! follow-ups.
//!
//! The ledger write commits first. Attachment uploads and notifications run
//! afterwards; their failures are returned as warnings and never undo the
//! write.

use std::{fmt, path::PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::{
  Error,
  collab::{AttachmentStore, Notification, Notifier, PaymentProcessor},
  config::EngineConfig,
  ledger::{Ledger, NewLedger},
  store::{Deadline, LedgerStore},
  writer,
};

/// An attachment to upload once the entry is committed.
#[derive(Debug, Clone)]
pub struct Attachment {
  pub local_path:  PathBuf,
  pub remote_path: String,
}

/// Work to run after the ledger transaction commits.
#[derive(Debug, Clone, Default)]
pub struct FollowUps {
  pub attachments:  Vec<Attachment>,
  pub notification: Option<Notification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
  AttachmentStore,
  Notifier,
}

impl fmt::Display for Collaborator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::AttachmentStore => "attachment store",
      Self::Notifier => "notifier",
    })
  }
}

/// A follow-up that failed after the entry was committed.
#[derive(Debug, Clone, Serialize)]
pub struct PostCommitWarning {
  pub collaborator: Collaborator,
  pub message:      String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recorded {
  pub ledger:   Ledger,
  pub warnings: Vec<PostCommitWarning>,
}

pub struct LedgerService<S, N, A> {
  store:       S,
  notifier:    N,
  attachments: A,
  config:      EngineConfig,
}

impl<S, N, A> LedgerService<S, N, A>
where
  S: LedgerStore,
  N: Notifier,
  A: AttachmentStore,
{
  pub fn new(store: S, notifier: N, attachments: A, config: EngineConfig) -> Self {
    Self { store, notifier, attachments, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn attachments(&self) -> &A { &self.attachments }

  /// Commit `entry`, then run `follow_ups`.
  pub async fn record(
    &self,
    entry: NewLedger,
    follow_ups: FollowUps,
  ) -> Result<Recorded, S::Error> {
    let deadline = Deadline::from_timeout(self.config.transaction_timeout);
    let ledger = self.store.record_ledger_entry(entry, deadline).await?;
    info!(
      ledger = %ledger.id,
      account = %ledger.account_id,
      contact = %ledger.contact.id,
      category = %ledger.category.id,
      labels = ledger.labels.len(),
      "ledger entry recorded"
    );

    let warnings = self.run_follow_ups(&ledger, follow_ups).await;
    Ok(Recorded { ledger, warnings })
  }

  /// Charge `customer_token` for the entry's amount, attach the processor's
  /// charge id, then record the entry.
  ///
  /// The entry is validated before the processor is contacted, and a failed
  /// charge aborts before anything is written. A write that fails after the
  /// charge went through is logged with the charge id so it can be refunded.
  pub async fn record_charge<P: PaymentProcessor>(
    &self,
    processor: &P,
    entry: NewLedger,
    customer_token: &str,
    follow_ups: FollowUps,
  ) -> Result<Recorded, S::Error> {
    let mut entry = writer::prepare(entry)?;

    let customer = processor
      .get_customer(customer_token)
      .await
      .map_err(|e| Error::Collaborator(Box::new(e)))?;

    let description = if entry.note.is_empty() {
      format!("ledger entry {}", entry.date)
    } else {
      entry.note.clone()
    };
    let charge_id = processor
      .charge_customer(&customer.token, entry.amount, &description)
      .await
      .map_err(|e| Error::Collaborator(Box::new(e)))?;
    info!(charge = %charge_id, amount = %entry.amount, "customer charged");

    entry.external.processor_charge_id = Some(charge_id.clone());
    self.record(entry, follow_ups).await.inspect_err(|err| {
      warn!(charge = %charge_id, error = %err, "ledger write failed after customer was charged");
    })
  }

  async fn run_follow_ups(
    &self,
    ledger: &Ledger,
    follow_ups: FollowUps,
  ) -> Vec<PostCommitWarning> {
    let mut warnings = Vec::new();

    for attachment in &follow_ups.attachments {
      if let Err(err) = self
        .attachments
        .upload_attachment(&attachment.local_path, &attachment.remote_path)
        .await
      {
        warn!(
          ledger = %ledger.id,
          remote = %attachment.remote_path,
          error = %err,
          "attachment upload failed after commit"
        );
        warnings.push(PostCommitWarning {
          collaborator: Collaborator::AttachmentStore,
          message:      format!("upload of {} failed: {err}", attachment.remote_path),
        });
      }
    }

    if let Some(notification) = &follow_ups.notification {
      if let Err(err) = self.notifier.send_notification(notification).await {
        warn!(
          ledger = %ledger.id,
          recipient = %notification.recipient,
          error = %err,
          "notification failed after commit"
        );
        warnings.push(PostCommitWarning {
          collaborator: Collaborator::Notifier,
          message:      format!("notification to {} failed: {err}", notification.recipient),
        });
      }
    }

    warnings
  }
}
