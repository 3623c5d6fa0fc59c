//! Canonical library model.
//!
//! Everything downstream of the normalizer works on these types only. Ids are
//! opaque strings and every collection is keyed by id, so iteration order of a
//! snapshot is ascending id order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_PLAYLIST: &str = "Unknown Playlist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub track_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub track_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub track_count: u32,
    /// Member tracks in upstream order, limited to ids present in the snapshot.
    #[serde(default)]
    pub track_ids: Vec<String>,
}

/// Immutable view of a whole library. Reloads build a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub artists: BTreeMap<String, Artist>,
    #[serde(default)]
    pub albums: BTreeMap<String, Album>,
    #[serde(default)]
    pub tracks: BTreeMap<String, Track>,
    #[serde(default)]
    pub playlists: BTreeMap<String, Playlist>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    pub playlists: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.artists + self.albums + self.tracks + self.playlists
    }
}

impl LibrarySnapshot {
    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    pub fn counts(&self) -> Counts {
        Counts {
            artists: self.artists.len(),
            albums: self.albums.len(),
            tracks: self.tracks.len(),
            playlists: self.playlists.len(),
        }
    }

    pub fn artist_name(&self, id: Option<&str>) -> &str {
        id.and_then(|id| self.artists.get(id))
            .map(|a| a.name.as_str())
            .unwrap_or(UNKNOWN_ARTIST)
    }

    pub fn album_title(&self, id: Option<&str>) -> &str {
        id.and_then(|id| self.albums.get(id))
            .map(|a| a.title.as_str())
            .unwrap_or(UNKNOWN_ALBUM)
    }

    /// Tracks of a playlist in playlist order. Unknown playlist yields nothing.
    pub fn playlist_tracks<'a>(&'a self, playlist_id: &str) -> impl Iterator<Item = &'a Track> + 'a {
        self.playlists
            .get(playlist_id)
            .into_iter()
            .flat_map(|p| p.track_ids.iter())
            .filter_map(|id| self.tracks.get(id))
    }
}
