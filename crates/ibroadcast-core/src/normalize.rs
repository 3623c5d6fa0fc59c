//! Turns the raw library payload into a canonical [`LibrarySnapshot`].
//!
//! Upstream sends each record either as a positional list or as a keyed
//! object, sometimes both in one payload. The shape is resolved once, here,
//! into [`RawRecord`]; nothing past this module ever looks at raw JSON.
//!
//! Track counts are never taken from upstream. They are recomputed from the
//! final track set after artist fallback has been applied.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::NormalizeError;
use crate::library::{
    Album, Artist, LibrarySnapshot, Playlist, Track, UNKNOWN_ALBUM, UNKNOWN_ARTIST,
    UNKNOWN_PLAYLIST, UNKNOWN_TRACK,
};

const COLLECTIONS: [&str; 4] = ["artists", "albums", "tracks", "playlists"];

/// Field-index descriptor shipped alongside records; never a record itself.
const RESERVED_KEY: &str = "map";

// ── Positional layouts ────────────────────────────────────────────────────────

const ARTIST_NAME: usize = 0;

const ALBUM_TITLE: usize = 0;
const ALBUM_ARTIST: usize = 2;

const TRACK_NUMBER: usize = 0;
const TRACK_YEAR: usize = 1;
const TRACK_TITLE: usize = 2;
const TRACK_DURATION: usize = 4;
const TRACK_ALBUM: usize = 5;
const TRACK_ARTIST: usize = 6;

const PLAYLIST_NAME: usize = 0;
const PLAYLIST_TRACKS: usize = 1;

/// Where the album year sits in a positional album record.
///
/// Two layouts have been seen in the wild. `Standard` is what the library
/// endpoint sends; `Compact` is only used when configured explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumLayout {
    #[default]
    Standard,
    Compact,
}

impl AlbumLayout {
    pub fn year_index(self) -> usize {
        match self {
            AlbumLayout::Standard => 6,
            AlbumLayout::Compact => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layouts {
    pub album: AlbumLayout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Records that were neither a list nor an object.
    pub skipped: usize,
    /// Tracks whose artist came from their album.
    pub artist_fallbacks: usize,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub snapshot: LibrarySnapshot,
    pub report: NormalizeReport,
}

// ── Record boundary ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum RawRecord<'a> {
    Positional(&'a [Value]),
    Keyed(&'a Map<String, Value>),
}

impl<'a> RawRecord<'a> {
    fn classify(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(RawRecord::Positional(items)),
            Value::Object(map) => Some(RawRecord::Keyed(map)),
            _ => None,
        }
    }

    /// Field at `index` for lists, or the first present key for objects.
    /// Out-of-range and null are both absent.
    fn field(&self, index: usize, keys: &[&str]) -> Option<&'a Value> {
        let value = match self {
            RawRecord::Positional(items) => items.get(index),
            RawRecord::Keyed(map) => keys.iter().find_map(|k| map.get(*k)),
        };
        value.filter(|v| !v.is_null())
    }

    fn text(&self, index: usize, keys: &[&str]) -> Option<String> {
        self.field(index, keys).and_then(text)
    }

    fn id(&self, index: usize, keys: &[&str]) -> Option<String> {
        self.field(index, keys).and_then(id_string)
    }

    /// Positive integer; zero means unknown.
    fn positive(&self, index: usize, keys: &[&str]) -> Option<u32> {
        self.field(index, keys).and_then(number).filter(|n| *n > 0)
    }

    fn number(&self, index: usize, keys: &[&str]) -> Option<u32> {
        self.field(index, keys).and_then(number)
    }

    fn ids(&self, index: usize, keys: &[&str]) -> Vec<String> {
        match self.field(index, keys) {
            Some(Value::Array(items)) => items.iter().filter_map(id_string).collect(),
            _ => Vec::new(),
        }
    }
}

// ── Scalar coercion ───────────────────────────────────────────────────────────

/// Stringify an id so that `101`, `101.0` and `"101"` all compare equal.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            // "101.0" from a float-minded serializer
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() && f.fract() == 0.0 && s.contains('.') => {
                    Some(format!("{}", f as i64))
                }
                _ => Some(s.to_string()),
            }
        }
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| format!("{}", f as i64))
            }
        }
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer from a JSON number or a numeric string.
fn number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u32)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u32)
            })
        }
        _ => None,
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Normalize a library payload. Pure; the same input always gives the same
/// snapshot. Individual bad records are skipped, never fatal.
pub fn normalize(raw: &Value, layouts: &Layouts) -> Result<Normalized, NormalizeError> {
    let root = match raw.get("library") {
        Some(inner) if inner.is_object() => inner,
        _ => raw,
    };
    let root = root.as_object().ok_or(NormalizeError::MissingPayload)?;
    if !COLLECTIONS.iter().any(|k| root.contains_key(*k)) {
        return Err(NormalizeError::MissingPayload);
    }

    let mut report = NormalizeReport::default();
    let mut snapshot = LibrarySnapshot::default();

    for (id, record) in entries(root, "artists", &mut report) {
        let artist = Artist {
            name: record
                .text(ARTIST_NAME, &["name"])
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            id: id.clone(),
            track_count: 0,
        };
        snapshot.artists.insert(id, artist);
    }

    for (id, record) in entries(root, "albums", &mut report) {
        let album = Album {
            title: record
                .text(ALBUM_TITLE, &["title", "name"])
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            artist_id: record.id(ALBUM_ARTIST, &["artist_id", "artist"]),
            year: record.positive(layouts.album.year_index(), &["year"]),
            id: id.clone(),
            track_count: 0,
        };
        snapshot.albums.insert(id, album);
    }

    for (id, record) in entries(root, "tracks", &mut report) {
        let album_id = record.id(TRACK_ALBUM, &["album_id", "album"]);
        let own_artist = record.id(TRACK_ARTIST, &["artist_id", "artist"]);
        let artist_id = match own_artist {
            Some(a) if snapshot.artists.contains_key(&a) => Some(a),
            unresolved => {
                let from_album = album_id
                    .as_deref()
                    .and_then(|a| snapshot.albums.get(a))
                    .and_then(|a| a.artist_id.clone());
                match from_album {
                    Some(a) => {
                        report.artist_fallbacks += 1;
                        Some(a)
                    }
                    None => unresolved,
                }
            }
        };
        let track = Track {
            title: record
                .text(TRACK_TITLE, &["title", "name"])
                .unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
            artist_id,
            album_id,
            duration: record.number(TRACK_DURATION, &["duration", "length"]),
            track_number: record.positive(TRACK_NUMBER, &["track_number", "track"]),
            year: record.positive(TRACK_YEAR, &["year"]),
            id: id.clone(),
        };
        snapshot.tracks.insert(id, track);
    }

    for (id, record) in entries(root, "playlists", &mut report) {
        let track_ids: Vec<String> = record
            .ids(PLAYLIST_TRACKS, &["tracks", "track_ids"])
            .into_iter()
            .filter(|t| snapshot.tracks.contains_key(t))
            .collect();
        let description = match record {
            RawRecord::Keyed(map) => map.get("description").and_then(text).unwrap_or_default(),
            RawRecord::Positional(_) => String::new(),
        };
        let playlist = Playlist {
            name: record
                .text(PLAYLIST_NAME, &["name", "title"])
                .unwrap_or_else(|| UNKNOWN_PLAYLIST.to_string()),
            description,
            track_count: u32::try_from(track_ids.len()).unwrap_or(u32::MAX),
            track_ids,
            id: id.clone(),
        };
        snapshot.playlists.insert(id, playlist);
    }

    recount(&mut snapshot);

    let counts = snapshot.counts();
    debug!(
        "normalized library: {} artists, {} albums, {} tracks, {} playlists (skipped {}, artist fallbacks {})",
        counts.artists,
        counts.albums,
        counts.tracks,
        counts.playlists,
        report.skipped,
        report.artist_fallbacks
    );
    Ok(Normalized { snapshot, report })
}

/// Records of one collection, keyed by stringified id. The reserved `map`
/// entry and unclassifiable values are dropped.
fn entries<'a>(
    root: &'a Map<String, Value>,
    collection: &str,
    report: &mut NormalizeReport,
) -> Vec<(String, RawRecord<'a>)> {
    let items = match root.get(collection) {
        None => return Vec::new(),
        Some(Value::Object(items)) => items,
        Some(other) => {
            if !matches!(other, Value::Array(a) if a.is_empty()) {
                warn!("library collection '{}' is not an object, ignoring", collection);
            }
            return Vec::new();
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (key, value) in items {
        if key == RESERVED_KEY {
            continue;
        }
        // keys go through the same stringification as references
        let id = id_string(&Value::String(key.clone()));
        match (id, RawRecord::classify(value)) {
            (Some(id), Some(record)) => out.push((id, record)),
            _ => {
                debug!("skipping malformed {} record '{}'", collection, key);
                report.skipped += 1;
            }
        }
    }
    out
}

fn recount(snapshot: &mut LibrarySnapshot) {
    for artist in snapshot.artists.values_mut() {
        artist.track_count = 0;
    }
    for album in snapshot.albums.values_mut() {
        album.track_count = 0;
    }
    for track in snapshot.tracks.values() {
        if let Some(artist) = track
            .artist_id
            .as_deref()
            .and_then(|id| snapshot.artists.get_mut(id))
        {
            artist.track_count = artist.track_count.saturating_add(1);
        }
        if let Some(album) = track
            .album_id
            .as_deref()
            .and_then(|id| snapshot.albums.get_mut(id))
        {
            album.track_count = album.track_count.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "albums": {
                "1": {"title": "Album 1", "artist_id": "10", "year": 2020},
                "2": ["Album 2", [], "11", 0, 0, 0, 2021]
            },
            "artists": {
                "10": {"name": "Artist 1"},
                "11": ["Artist 2", []]
            },
            "playlists": {
                "20": {"name": "Playlist 1", "description": "Test playlist", "tracks": ["100", "101"]}
            },
            "tracks": {
                "100": {"title": "Track 1", "artist_id": "10", "album_id": "1", "duration": 180},
                "101": [0, 0, "Track 2", 0, 200, "2", "11"]
            }
        })
    }

    #[test]
    fn mixed_shapes_normalize_to_the_same_model() {
        let out = normalize(&sample(), &Layouts::default()).unwrap();
        let s = &out.snapshot;
        assert_eq!(s.albums["1"].title, "Album 1");
        assert_eq!(s.albums["2"].title, "Album 2");
        assert_eq!(s.albums["2"].year, Some(2021));
        assert_eq!(s.albums["2"].artist_id.as_deref(), Some("11"));
        assert_eq!(s.artists["11"].name, "Artist 2");
        assert_eq!(s.tracks["101"].title, "Track 2");
        assert_eq!(s.tracks["101"].duration, Some(200));
        assert_eq!(s.tracks["101"].album_id.as_deref(), Some("2"));
        assert_eq!(s.tracks["100"].duration, Some(180));
        assert_eq!(s.playlists["20"].track_count, 2);
        assert_eq!(s.playlists["20"].description, "Test playlist");
        assert_eq!(out.report.skipped, 0);
    }

    #[test]
    fn counts_match_membership() {
        let s = normalize(&sample(), &Layouts::default()).unwrap().snapshot;
        for artist in s.artists.values() {
            let actual = s
                .tracks
                .values()
                .filter(|t| t.artist_id.as_deref() == Some(artist.id.as_str()))
                .count();
            assert_eq!(artist.track_count as usize, actual);
        }
        for album in s.albums.values() {
            let actual = s
                .tracks
                .values()
                .filter(|t| t.album_id.as_deref() == Some(album.id.as_str()))
                .count();
            assert_eq!(album.track_count as usize, actual);
        }
    }

    #[test]
    fn upstream_counts_are_ignored() {
        let raw = json!({
            "artists": {"1": {"name": "A", "track_count": 99}},
            "tracks": {}
        });
        let s = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        assert_eq!(s.artists["1"].track_count, 0);
    }

    #[test]
    fn float_shaped_keys_match_integer_references() {
        let raw = json!({
            "artists": {"101.0": ["Band"], " ": ["Nobody"]},
            "tracks": {"1": [0, 0, "T", 0, 1, null, 101]}
        });
        let normalized = normalize(&raw, &Layouts::default()).unwrap();
        let s = normalized.snapshot;
        assert_eq!(s.artists.keys().collect::<Vec<_>>(), vec!["101"]);
        assert_eq!(s.tracks["1"].artist_id.as_deref(), Some("101"));
        assert_eq!(s.artist_name(Some("101")), "Band");
        assert_eq!(s.artists["101"].track_count, 1);
        assert_eq!(normalized.report.skipped, 1);
    }

    #[test]
    fn is_idempotent() {
        let raw = sample();
        let a = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        let b = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        assert_eq!(a, b);
    }

    #[test]
    fn short_lists_get_placeholders() {
        let raw = json!({
            "albums": {"1": []},
            "artists": {"2": []},
            "tracks": {"3": [5]},
            "playlists": {"4": []}
        });
        let s = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        assert_eq!(s.albums["1"].title, UNKNOWN_ALBUM);
        assert_eq!(s.albums["1"].year, None);
        assert_eq!(s.artists["2"].name, UNKNOWN_ARTIST);
        assert_eq!(s.tracks["3"].title, UNKNOWN_TRACK);
        assert_eq!(s.tracks["3"].track_number, Some(5));
        assert_eq!(s.tracks["3"].duration, None);
        assert_eq!(s.playlists["4"].name, UNKNOWN_PLAYLIST);
        assert_eq!(s.playlists["4"].track_count, 0);
    }

    #[test]
    fn wrong_types_become_absent() {
        let raw = json!({
            "tracks": {"1": [true, "abc", {"x": 1}, null, -3, [], null]}
        });
        let t = &normalize(&raw, &Layouts::default()).unwrap().snapshot.tracks["1"];
        assert_eq!(t.title, UNKNOWN_TRACK);
        assert_eq!(t.track_number, None);
        assert_eq!(t.year, None);
        assert_eq!(t.duration, None);
        assert_eq!(t.album_id, None);
        assert_eq!(t.artist_id, None);
    }

    #[test]
    fn numeric_strings_and_float_ids_are_accepted() {
        let raw = json!({
            "artists": {"7": ["Seven"]},
            "tracks": {"1": ["3", "1999", "Song", 0, "245", 0, 7.0]}
        });
        let s = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        let t = &s.tracks["1"];
        assert_eq!(t.track_number, Some(3));
        assert_eq!(t.year, Some(1999));
        assert_eq!(t.duration, Some(245));
        assert_eq!(t.artist_id.as_deref(), Some("7"));
        assert_eq!(s.artists["7"].track_count, 1);
    }

    #[test]
    fn id_stringification_is_consistent() {
        assert_eq!(id_string(&json!(101)).as_deref(), Some("101"));
        assert_eq!(id_string(&json!(101.0)).as_deref(), Some("101"));
        assert_eq!(id_string(&json!("101")).as_deref(), Some("101"));
        assert_eq!(id_string(&json!("101.0")).as_deref(), Some("101"));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!(1.5)), None);
        assert_eq!(id_string(&json!(null)), None);
    }

    #[test]
    fn zero_year_and_track_number_mean_unknown() {
        let raw = json!({
            "albums": {"1": ["A", [], "9", 0, 0, 0, 0]},
            "tracks": {"2": [0, 0, "T", 0, 0, "1", "9"]}
        });
        let s = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        assert_eq!(s.albums["1"].year, None);
        assert_eq!(s.tracks["2"].year, None);
        assert_eq!(s.tracks["2"].track_number, None);
        assert_eq!(s.tracks["2"].duration, Some(0));
    }

    #[test]
    fn compact_album_layout_reads_year_from_index_three() {
        let raw = json!({"albums": {"1": ["A", [], "9", 1987, 0, 0, 2001]}});
        let standard = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        assert_eq!(standard.albums["1"].year, Some(2001));

        let compact = Layouts {
            album: AlbumLayout::Compact,
        };
        let s = normalize(&raw, &compact).unwrap().snapshot;
        assert_eq!(s.albums["1"].year, Some(1987));
    }

    #[test]
    fn track_takes_album_artist_when_own_artist_is_unknown() {
        let raw = json!({
            "artists": {"5": ["Band"]},
            "albums": {"1": ["Record", [], "5"]},
            "tracks": {
                "10": [1, 0, "Missing", 0, 100, "1"],
                "11": [2, 0, "Dangling", 0, 100, "1", "404"],
                "12": [3, 0, "Orphan", 0, 100, "nope", "404"]
            }
        });
        let out = normalize(&raw, &Layouts::default()).unwrap();
        let s = &out.snapshot;
        assert_eq!(s.tracks["10"].artist_id.as_deref(), Some("5"));
        assert_eq!(s.tracks["11"].artist_id.as_deref(), Some("5"));
        assert_eq!(s.tracks["12"].artist_id.as_deref(), Some("404"));
        assert_eq!(s.artist_name(s.tracks["12"].artist_id.as_deref()), UNKNOWN_ARTIST);
        assert_eq!(s.artists["5"].track_count, 2);
        assert_eq!(out.report.artist_fallbacks, 2);
    }

    #[test]
    fn malformed_records_and_map_key_are_skipped() {
        let raw = json!({
            "tracks": {
                "map": {"title": 2, "artist_id": 6},
                "1": [0, 0, "Good"],
                "2": "garbage",
                "3": 42
            }
        });
        let out = normalize(&raw, &Layouts::default()).unwrap();
        assert_eq!(out.snapshot.tracks.len(), 1);
        assert!(!out.snapshot.tracks.contains_key("map"));
        assert_eq!(out.report.skipped, 2);
    }

    #[test]
    fn playlist_counts_only_resolving_tracks() {
        let raw = json!({
            "tracks": {"1": [0, 0, "One"], "2": [0, 0, "Two"]},
            "playlists": {"p": ["Mix", [2, "999", 1]]}
        });
        let p = &normalize(&raw, &Layouts::default()).unwrap().snapshot.playlists["p"];
        assert_eq!(p.track_ids, vec!["2".to_string(), "1".to_string()]);
        assert_eq!(p.track_count, 2);
    }

    #[test]
    fn library_wrapper_is_unwrapped() {
        let raw = json!({"library": sample(), "result": true});
        let s = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        assert_eq!(s.tracks.len(), 2);
    }

    #[test]
    fn missing_payload_is_an_error() {
        assert!(matches!(
            normalize(&json!({"result": true}), &Layouts::default()),
            Err(NormalizeError::MissingPayload)
        ));
        assert!(matches!(
            normalize(&json!([1, 2]), &Layouts::default()),
            Err(NormalizeError::MissingPayload)
        ));
    }

    #[test]
    fn empty_list_collections_are_empty() {
        let raw = json!({"tracks": [], "albums": {}});
        let s = normalize(&raw, &Layouts::default()).unwrap().snapshot;
        assert!(s.is_empty());
    }
}
