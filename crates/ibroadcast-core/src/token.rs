//! Persisted login token, so startup can skip the password round trip.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api::Login;

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_BUFFER_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub username: String,
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn new(username: &str, login: &Login, expires_in: Option<Duration>) -> Self {
        Self {
            username: username.to_string(),
            token: login.token.clone(),
            user_id: login.user_id.clone(),
            expires_at: expires_in.map(|d| Utc::now() + d),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires) => now < expires - Duration::seconds(EXPIRY_BUFFER_SECS),
        }
    }

    pub fn login(&self) -> Login {
        Login {
            token: self.token.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored token for `username`, if any. Corrupt files and tokens
    /// belonging to another user read as absent.
    pub fn load(&self, username: &str) -> Option<StoredToken> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("failed to read token file {:?}: {}", self.path, e);
                }
                return None;
            }
        };
        let stored: StoredToken = match serde_json::from_str(&content) {
            Ok(t) => t,
            Err(e) => {
                warn!("ignoring corrupt token file {:?}: {}", self.path, e);
                return None;
            }
        };
        if stored.username != username {
            debug!("stored token belongs to another user");
            return None;
        }
        Some(stored)
    }

    pub fn save(&self, token: &StoredToken) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(token)?)?;
        tmp.as_file().sync_all()?;
        restrict_permissions(tmp.path())?;
        tmp.persist(&self.path)?;
        info!("saved login token to {:?}", self.path);
        Ok(())
    }

    pub fn delete(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> Login {
        Login {
            token: "tok".into(),
            user_id: "42".into(),
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        let token = StoredToken::new("me@example.com", &login(), Some(Duration::hours(1)));
        store.save(&token).unwrap();
        assert_eq!(store.load("me@example.com"), Some(token));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&StoredToken::new("me", &login(), None))
            .unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn other_users_token_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&StoredToken::new("alice", &login(), None))
            .unwrap();
        assert!(store.load("bob").is_none());
        assert!(store.load("alice").is_some());
    }

    #[test]
    fn corrupt_or_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.load("me").is_none());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.load("me").is_none());
    }

    #[test]
    fn expiry_has_a_five_minute_buffer() {
        let now = Utc::now();
        let mut token = StoredToken::new("me", &login(), None);
        assert!(token.is_valid_at(now));

        token.expires_at = Some(now + Duration::minutes(10));
        assert!(token.is_valid_at(now));

        token.expires_at = Some(now + Duration::minutes(4));
        assert!(!token.is_valid_at(now));

        token.expires_at = Some(now - Duration::hours(1));
        assert!(!token.is_valid_at(now));
    }

    #[test]
    fn save_leaves_only_the_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&StoredToken::new("me", &login(), None)).unwrap();
        store.save(&StoredToken::new("me", &login(), None)).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("token.json")]);
    }

    #[test]
    fn failed_save_keeps_the_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = TokenStore::new(&path);
        let first = StoredToken::new("me", &login(), None);
        store.save(&first).unwrap();

        // a directory in the way makes the final rename fail
        let blocked = TokenStore::new(dir.path().join("blocked"));
        std::fs::create_dir(dir.path().join("blocked")).unwrap();
        std::fs::write(dir.path().join("blocked").join("x"), "x").unwrap();
        assert!(blocked.save(&first).is_err());

        assert_eq!(store.load("me"), Some(first));
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&StoredToken::new("me", &login(), None)).unwrap();
        store.delete().unwrap();
        store.delete().unwrap();
        assert!(store.load("me").is_none());
    }
}
