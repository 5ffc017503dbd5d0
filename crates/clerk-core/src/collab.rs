//! Interfaces of the external collaborators the engine calls outside its
//! transactions: notification delivery, attachment storage, and the payment
//! processor. Implementations live with the embedding application.

use std::{
  future::Future,
  path::{Path, PathBuf},
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A templated message ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub recipient:        String,
  pub subject:          String,
  pub html_body:        String,
  #[serde(default)]
  pub attachment_paths: Vec<PathBuf>,
}

pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send_notification<'a>(
    &'a self,
    notification: &'a Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Path-in/path-out blob storage for ledger attachments.
pub trait AttachmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn upload_attachment<'a>(
    &'a self,
    local_path: &'a Path,
    remote_path: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Fetch `remote_path` to a local file and return where it was written.
  fn download_attachment<'a>(
    &'a self,
    remote_path: &'a str,
  ) -> impl Future<Output = Result<PathBuf, Self::Error>> + Send + 'a;
}

/// A customer record as held by the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
  pub token:      String,
  pub email:      Option<String>,
  pub card_brand: Option<String>,
  pub card_last4: Option<String>,
}

/// Card processing, keyed by opaque customer tokens.
pub trait PaymentProcessor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Charge `amount` and return the processor's charge identifier.
  fn charge_customer<'a>(
    &'a self,
    customer_token: &'a str,
    amount: Decimal,
    description: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  fn get_customer<'a>(
    &'a self,
    customer_token: &'a str,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + 'a;
}
