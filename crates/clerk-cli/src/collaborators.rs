//! Local stand-ins for the external collaborators: attachments are copied
//! into a directory and notifications are written to the log.

use std::{
  convert::Infallible,
  io,
  path::{Path, PathBuf},
};

use clerk_core::collab::{AttachmentStore, Notification, Notifier};
use tracing::info;

/// Logs each notification instead of delivering it.
pub struct LogNotifier {
  from: String,
}

impl LogNotifier {
  pub fn new(from: impl Into<String>) -> Self { Self { from: from.into() } }
}

impl Notifier for LogNotifier {
  type Error = Infallible;

  async fn send_notification(&self, notification: &Notification) -> Result<(), Infallible> {
    info!(
      from = %self.from,
      to = %notification.recipient,
      subject = %notification.subject,
      attachments = notification.attachment_paths.len(),
      "notification"
    );
    Ok(())
  }
}

/// Stores attachments as files under a root directory.
pub struct DirAttachments {
  root: PathBuf,
}

impl DirAttachments {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// Map a remote path onto the root, refusing anything that would escape
  /// it.
  fn resolve(&self, remote_path: &str) -> io::Result<PathBuf> {
    let relative = Path::new(remote_path.trim_start_matches('/'));
    let escapes = relative
      .components()
      .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if escapes || remote_path.is_empty() {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid attachment path {remote_path:?}"),
      ));
    }
    Ok(self.root.join(relative))
  }
}

impl AttachmentStore for DirAttachments {
  type Error = io::Error;

  async fn upload_attachment(&self, local_path: &Path, remote_path: &str) -> io::Result<()> {
    let target = self.resolve(remote_path)?;
    if let Some(parent) = target.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(local_path, &target).await?;
    info!(local = %local_path.display(), remote = %remote_path, "attachment stored");
    Ok(())
  }

  async fn download_attachment(&self, remote_path: &str) -> io::Result<PathBuf> {
    let source = self.resolve(remote_path)?;
    if !tokio::fs::try_exists(&source).await? {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no attachment at {remote_path:?}"),
      ));
    }
    Ok(source)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn upload_then_download() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("receipt.pdf");
    tokio::fs::write(&local, b"%PDF").await.unwrap();
    let store = DirAttachments::new(dir.path().join("store"));

    store.upload_attachment(&local, "7/receipt.pdf").await.unwrap();
    let fetched = store.download_attachment("7/receipt.pdf").await.unwrap();

    assert_eq!(tokio::fs::read(fetched).await.unwrap(), b"%PDF");
  }

  #[tokio::test]
  async fn paths_outside_the_root_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirAttachments::new(dir.path());

    let err = store.download_attachment("../etc/passwd").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
  }
}
