//! Session context: the single holder of the bearer token.
//!
//! One [`SessionContext`] is created at startup, shared by `Arc` with the HTTP
//! client and the page controllers, and cleared on logout. Nothing reads the
//! token from ambient global state.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

/// Read-only view of whether a user is signed in.
pub trait AuthOracle: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct SessionContext {
    token: RwLock<Option<String>>,
    store: Option<SessionStore>,
}

impl SessionContext {
    /// A context with no session and no backing file.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A context holding `token` in memory only.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
            store: None,
        }
    }

    /// Loads the saved session from `store`, if any.
    pub fn load(store: SessionStore) -> Result<Self> {
        let token = store.load()?;
        Ok(Self {
            token: RwLock::new(token),
            store: Some(store),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().expect("session lock poisoned").clone()
    }

    /// Replaces the token and persists it when a store is attached.
    pub fn set_token(&self, token: &str) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(token)?;
        }
        *self.token.write().expect("session lock poisoned") = Some(token.to_string());
        Ok(())
    }

    /// Forgets the token in memory and on disk.
    pub fn logout(&self) -> Result<()> {
        *self.token.write().expect("session lock poisoned") = None;
        if let Some(store) = &self.store {
            store.clear()?;
        }
        tracing::debug!("session cleared");
        Ok(())
    }
}

impl AuthOracle for SessionContext {
    fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .expect("session lock poisoned")
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// On-disk location of the session token.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/scriptseek/session`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::at(crate::config::root_path()?.join("session")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let session = std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let session = session.trim().to_string();
        if session.is_empty() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        secure_write(&self.path, token)
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

fn secure_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_is_not_authenticated() {
        assert!(!SessionContext::anonymous().is_authenticated());
        assert!(!SessionContext::with_token("").is_authenticated());
        assert!(SessionContext::with_token("abc").is_authenticated());
    }

    #[test]
    fn load_reads_trimmed_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session"));
        store.save("  abc123\n").unwrap();

        let session = SessionContext::load(store).unwrap();
        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert!(session.is_authenticated());
    }

    #[test]
    fn missing_or_blank_file_means_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("nested").join("session"));
        assert_eq!(store.load().unwrap(), None);

        store.save("   ").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn logout_clears_memory_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session"));
        let session = SessionContext::load(store.clone()).unwrap();
        session.set_token("tok").unwrap();
        assert!(store.path().exists());

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session"));
        store.save("tok").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
