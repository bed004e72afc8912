//! Credential storage and session hooks injected into the API client.

use color_eyre::{eyre::eyre, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Source of the bearer token attached to outgoing requests.
pub trait CredentialProvider: Send + Sync {
  /// The current token, if one is stored
  fn token(&self) -> Option<String>;

  /// Forget the stored token (called when the server rejects it)
  fn clear(&self);
}

/// Reacts to the server declaring the session invalid.
pub trait SessionHandler: Send + Sync {
  fn login_required(&self, location: &str);
}

/// Token held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
  token: RwLock<Option<String>>,
}

impl MemoryCredentials {
  pub fn new(token: Option<String>) -> Self {
    Self {
      token: RwLock::new(token),
    }
  }

  pub fn set(&self, token: impl Into<String>) {
    *self.token.write() = Some(token.into());
  }
}

impl CredentialProvider for MemoryCredentials {
  fn token(&self) -> Option<String> {
    self.token.read().clone()
  }

  fn clear(&self) {
    self.token.write().take();
  }
}

/// Token persisted in a file so it survives between runs.
#[derive(Debug, Clone)]
pub struct FileCredentials {
  path: PathBuf,
}

impl FileCredentials {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Token file at the default location
  pub fn open() -> Result<Self> {
    Ok(Self::new(Self::default_path()?))
  }

  /// Get the default token path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("roster").join("auth_token"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Save a token, replacing any previous one.
  pub fn store(&self, token: &str) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create token directory: {}", e))?;
    }

    std::fs::write(&self.path, token.trim())
      .map_err(|e| eyre!("Failed to write token to {}: {}", self.path.display(), e))?;

    Ok(())
  }
}

impl CredentialProvider for FileCredentials {
  fn token(&self) -> Option<String> {
    let contents = std::fs::read_to_string(&self.path).ok()?;
    let token = contents.trim();
    (!token.is_empty()).then(|| token.to_string())
  }

  fn clear(&self) {
    match std::fs::remove_file(&self.path) {
      Ok(()) => debug!("Removed stored token at {}", self.path.display()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => warn!("Failed to remove token {}: {}", self.path.display(), e),
    }
  }
}

/// Session handler that only reports where the user should sign in again.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSession;

impl SessionHandler for LogSession {
  fn login_required(&self, location: &str) {
    warn!("Session expired, sign in again at {}", location);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_credentials() {
    let creds = MemoryCredentials::default();
    assert_eq!(creds.token(), None);

    creds.set("T");
    assert_eq!(creds.token().as_deref(), Some("T"));

    creds.clear();
    assert_eq!(creds.token(), None);
  }

  #[test]
  fn test_file_credentials_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let creds = FileCredentials::new(dir.path().join("nested").join("auth_token"));
    assert_eq!(creds.token(), None);

    creds.store("secret\n").unwrap();
    assert_eq!(creds.token().as_deref(), Some("secret"));

    creds.clear();
    assert_eq!(creds.token(), None);
    // Clearing twice is harmless
    creds.clear();
  }
}
