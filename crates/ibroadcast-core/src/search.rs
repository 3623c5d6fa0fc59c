use serde::{Deserialize, Serialize};

use crate::library::LibrarySnapshot;

pub const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: Option<u32>,
}

/// Case-insensitive substring match on track titles, in snapshot order,
/// truncated to `limit`. An empty query matches every track.
pub fn search(snapshot: &LibrarySnapshot, query: &str, limit: usize) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    snapshot
        .tracks
        .values()
        .filter(|t| needle.is_empty() || t.title.to_lowercase().contains(&needle))
        .take(limit)
        .map(|t| SearchHit {
            id: t.id.clone(),
            title: t.title.clone(),
            artist: snapshot.artist_name(t.artist_id.as_deref()).to_string(),
            album: snapshot.album_title(t.album_id.as_deref()).to_string(),
            year: t.year,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, Layouts};
    use serde_json::json;

    fn library() -> LibrarySnapshot {
        let raw = json!({
            "artists": {"1": ["Band"]},
            "albums": {"9": ["Record", [], "1"]},
            "tracks": {
                "3": [0, 2004, "Third Title", 0, 10, "9", "1"],
                "1": [0, 0, "First title", 0, 10, "9", "1"],
                "2": [0, 0, "Other", 0, 10]
            }
        });
        normalize(&raw, &Layouts::default()).unwrap().snapshot
    }

    #[test]
    fn matches_case_insensitively_in_snapshot_order() {
        let hits = search(&library(), "TITLE", 10);
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(hits[1].artist, "Band");
        assert_eq!(hits[1].album, "Record");
        assert_eq!(hits[1].year, Some(2004));
    }

    #[test]
    fn limit_truncates() {
        let hits = search(&library(), "title", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
    }

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(search(&library(), "", 10).len(), 3);
        assert_eq!(search(&library(), "  ", 2).len(), 2);
    }

    #[test]
    fn no_match_and_empty_library_give_nothing() {
        assert!(search(&library(), "zzz", 10).is_empty());
        assert!(search(&LibrarySnapshot::default(), "a", 10).is_empty());
        assert!(search(&library(), "title", 0).is_empty());
    }

    #[test]
    fn unresolved_references_use_placeholders() {
        let hits = search(&library(), "other", 10);
        assert_eq!(hits[0].artist, "Unknown Artist");
        assert_eq!(hits[0].album, "Unknown Album");
    }
}
