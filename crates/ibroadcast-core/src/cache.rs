//! On-disk snapshot cache.
//!
//! One JSON document per profile. The header fields come first so that
//! `has_cache` can answer without materializing any records. Reads never
//! fail: anything unreadable is treated as "no cache".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::library::{Counts, LibrarySnapshot};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentOut<'a> {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    counts: Counts,
    #[serde(flatten)]
    library: &'a LibrarySnapshot,
}

#[derive(Deserialize)]
struct DocumentIn {
    schema_version: u32,
    #[serde(flatten)]
    library: LibrarySnapshot,
}

/// Only the leading fields; the record maps are skipped by the parser.
#[derive(Deserialize)]
struct Header {
    schema_version: u32,
    #[serde(default)]
    counts: Counts,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a compatible snapshot with at least one record is on disk.
    pub fn has_cache(&self) -> bool {
        let Ok(content) = std::fs::read(&self.path) else {
            return false;
        };
        match serde_json::from_slice::<Header>(&content) {
            Ok(header) => header.schema_version == SCHEMA_VERSION && header.counts.total() > 0,
            Err(e) => {
                debug!("cache header unreadable at {:?}: {}", self.path, e);
                false
            }
        }
    }

    /// The cached snapshot, or an empty one if there is nothing usable.
    pub fn load(&self) -> LibrarySnapshot {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no cache at {:?}", self.path);
                LibrarySnapshot::default()
            }
            Err(e) => {
                warn!("ignoring unreadable cache {:?}: {}", self.path, e);
                LibrarySnapshot::default()
            }
        }
    }

    fn try_load(&self) -> Result<LibrarySnapshot, CacheError> {
        let content = std::fs::read(&self.path)?;
        let doc: DocumentIn = serde_json::from_slice(&content)?;
        if doc.schema_version != SCHEMA_VERSION {
            return Err(CacheError::Schema {
                found: doc.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(doc.library)
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    pub fn save(&self, snapshot: &LibrarySnapshot) {
        if let Err(e) = self.try_save(snapshot) {
            warn!("failed to write library cache {:?}: {}", self.path, e);
        }
    }

    /// Write to a temp file beside the target, then rename over it.
    pub fn try_save(&self, snapshot: &LibrarySnapshot) -> Result<(), CacheError> {
        let dir = self.dir();
        std::fs::create_dir_all(dir)?;

        let doc = DocumentOut {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            counts: snapshot.counts(),
            library: snapshot,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &doc)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        info!(
            "saved library cache: {} records to {:?}",
            doc.counts.total(),
            self.path
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("removed library cache {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Album, Artist, Playlist, Track};

    fn snapshot() -> LibrarySnapshot {
        let mut s = LibrarySnapshot::default();
        s.artists.insert(
            "10".into(),
            Artist {
                id: "10".into(),
                name: "Artist 1".into(),
                track_count: 1,
            },
        );
        s.albums.insert(
            "1".into(),
            Album {
                id: "1".into(),
                title: "Album 1".into(),
                artist_id: Some("10".into()),
                year: Some(2020),
                track_count: 1,
            },
        );
        s.tracks.insert(
            "100".into(),
            Track {
                id: "100".into(),
                title: "Track 1".into(),
                artist_id: Some("10".into()),
                album_id: Some("1".into()),
                duration: Some(180),
                track_number: None,
                year: None,
            },
        );
        s.playlists.insert(
            "20".into(),
            Playlist {
                id: "20".into(),
                name: "Mix".into(),
                description: String::new(),
                track_count: 1,
                track_ids: vec!["100".into()],
            },
        );
        s
    }

    #[test]
    fn missing_file_means_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("library.json"));
        assert!(!store.has_cache());
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("library.json"));
        let original = snapshot();
        store.try_save(&original).unwrap();
        assert!(store.has_cache());
        assert_eq!(store.load(), original);
    }

    #[test]
    fn empty_snapshot_is_not_a_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("library.json"));
        store.try_save(&LibrarySnapshot::default()).unwrap();
        assert!(store.path().exists());
        assert!(!store.has_cache());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = CacheStore::new(&path);
        assert!(!store.has_cache());
        assert!(store.load().is_empty());
    }

    #[test]
    fn schema_mismatch_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(
            &path,
            br#"{"schema_version":99,"counts":{"artists":1,"albums":0,"tracks":0,"playlists":0},"artists":{"1":{"id":"1","name":"A"}}}"#,
        )
        .unwrap();
        let store = CacheStore::new(&path);
        assert!(!store.has_cache());
        assert!(store.load().is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("library.json"));
        store.save(&snapshot());
        assert!(store.has_cache());
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.has_cache());
    }
}
