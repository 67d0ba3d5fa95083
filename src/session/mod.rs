//! Persistent session storage.
//!
//! Holds at most one bearer token and one user profile at a time, as two
//! files under the configured data directory. Presence of the token file is
//! the sole signal of "authenticated"; a missing or malformed profile never
//! propagates an error past this boundary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::models::User;

const TOKEN_FILE: &str = "token";
const USER_FILE: &str = "user.json";

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(USER_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        match fs::read_to_string(self.token_path()) {
            Ok(token) => {
                let token = token.trim().to_string();
                (!token.is_empty()).then_some(token)
            }
            Err(_) => None,
        }
    }

    pub fn set_token(&self, token: &str) -> io::Result<()> {
        fs::write(self.token_path(), token)
    }

    /// The stored user profile. A missing or malformed record reads as
    /// `None`; callers treat absence as "no session".
    pub fn user(&self) -> Option<User> {
        let raw = fs::read_to_string(self.user_path()).ok()?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "Stored user profile is malformed, ignoring it");
                None
            }
        }
    }

    pub fn set_user(&self, user: &User) -> io::Result<()> {
        let raw = serde_json::to_string(user).map_err(io::Error::other)?;
        fs::write(self.user_path(), raw)
    }

    /// Remove both the token and the user profile. Already-missing files
    /// are fine; other failures are logged and swallowed so logout always
    /// completes.
    pub fn clear(&self) {
        for path in [self.token_path(), self.user_path()] {
            if let Err(err) = fs::remove_file(&path) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %err, "Failed to remove session file");
                }
            }
        }
    }
}
