//! Row projections of a snapshot for tabular display.
//!
//! Projection is stateless: the same kind over the same snapshot always gives
//! the same rows. Every cell is already a display string.

use crate::library::{LibrarySnapshot, Track};
use crate::search::SearchHit;

pub type Row = Vec<String>;

const UNKNOWN_YEAR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Albums,
    Artists,
    Tracks,
    Playlists,
    /// Tracks of one album, by track number.
    Album(String),
    /// Tracks of one artist.
    Artist(String),
    /// Tracks of one playlist, in playlist order.
    Playlist(String),
    /// Search results for a query.
    Search(String),
}

impl ViewKind {
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            ViewKind::Albums => &["Title", "Artist", "Year", "Tracks"],
            ViewKind::Artists => &["Artist", "Tracks"],
            ViewKind::Playlists => &["Playlist", "Tracks", "Description"],
            ViewKind::Search(_) => &["Title", "Artist", "Album", "Year"],
            ViewKind::Tracks | ViewKind::Album(_) | ViewKind::Artist(_) | ViewKind::Playlist(_) => {
                &["Title", "Artist", "Album", "Duration"]
            }
        }
    }

    /// Whether the ids of this view are track ids.
    pub fn lists_tracks(&self) -> bool {
        !matches!(
            self,
            ViewKind::Albums | ViewKind::Artists | ViewKind::Playlists
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewKind::Albums | ViewKind::Album(_) => "albums",
            ViewKind::Artists | ViewKind::Artist(_) => "artists",
            ViewKind::Tracks => "tracks",
            ViewKind::Playlists | ViewKind::Playlist(_) => "playlists",
            ViewKind::Search(_) => "search",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub kind: ViewKind,
    /// Entity id of each row, parallel to `rows`.
    pub ids: Vec<String>,
    pub rows: Vec<Row>,
}

impl View {
    pub fn empty(kind: ViewKind) -> Self {
        Self {
            kind,
            ids: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Page `index` of `size` rows; out-of-range pages are empty.
    pub fn page(&self, index: usize, size: usize) -> &[Row] {
        if size == 0 {
            return &[];
        }
        let start = index.saturating_mul(size).min(self.rows.len());
        let end = start.saturating_add(size).min(self.rows.len());
        &self.rows[start..end]
    }
}

/// `M:SS`; unknown and zero both render as `0:00`.
pub fn format_duration(seconds: Option<u32>) -> String {
    let secs = seconds.unwrap_or(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn project(kind: ViewKind, snapshot: &LibrarySnapshot) -> View {
    let entries: Vec<(String, Row)> = match &kind {
        ViewKind::Albums => {
            let mut albums: Vec<_> = snapshot.albums.values().collect();
            albums.sort_by_cached_key(|a| (a.title.to_lowercase(), a.id.clone()));
            albums
                .into_iter()
                .map(|a| {
                    let row = vec![
                        a.title.clone(),
                        snapshot.artist_name(a.artist_id.as_deref()).to_string(),
                        year_cell(a.year),
                        a.track_count.to_string(),
                    ];
                    (a.id.clone(), row)
                })
                .collect()
        }
        ViewKind::Artists => {
            let mut artists: Vec<_> = snapshot.artists.values().collect();
            artists.sort_by_cached_key(|a| (a.name.to_lowercase(), a.id.clone()));
            artists
                .into_iter()
                .map(|a| (a.id.clone(), vec![a.name.clone(), a.track_count.to_string()]))
                .collect()
        }
        ViewKind::Playlists => {
            let mut playlists: Vec<_> = snapshot.playlists.values().collect();
            playlists.sort_by_cached_key(|p| (p.name.to_lowercase(), p.id.clone()));
            playlists
                .into_iter()
                .map(|p| {
                    let row = vec![
                        p.name.clone(),
                        p.track_count.to_string(),
                        p.description.clone(),
                    ];
                    (p.id.clone(), row)
                })
                .collect()
        }
        ViewKind::Tracks => {
            let mut tracks: Vec<_> = snapshot.tracks.values().collect();
            sort_by_title(&mut tracks);
            track_rows(snapshot, tracks)
        }
        ViewKind::Album(album_id) => {
            let mut tracks: Vec<_> = snapshot
                .tracks
                .values()
                .filter(|t| t.album_id.as_deref() == Some(album_id.as_str()))
                .collect();
            tracks.sort_by_cached_key(|t| {
                (
                    t.track_number.unwrap_or(u32::MAX),
                    t.title.to_lowercase(),
                    t.id.clone(),
                )
            });
            track_rows(snapshot, tracks)
        }
        ViewKind::Artist(artist_id) => {
            let mut tracks: Vec<_> = snapshot
                .tracks
                .values()
                .filter(|t| t.artist_id.as_deref() == Some(artist_id.as_str()))
                .collect();
            sort_by_title(&mut tracks);
            track_rows(snapshot, tracks)
        }
        ViewKind::Playlist(playlist_id) => {
            track_rows(snapshot, snapshot.playlist_tracks(playlist_id).collect())
        }
        // Search views are built from hits, see `search_view`.
        ViewKind::Search(_) => Vec::new(),
    };

    let (ids, rows) = entries.into_iter().unzip();
    View { kind, ids, rows }
}

/// A view over search results, in hit order.
pub fn search_view(query: &str, hits: &[SearchHit]) -> View {
    let (ids, rows) = hits
        .iter()
        .map(|h| {
            let row = vec![
                h.title.clone(),
                h.artist.clone(),
                h.album.clone(),
                year_cell(h.year),
            ];
            (h.id.clone(), row)
        })
        .unzip();
    View {
        kind: ViewKind::Search(query.to_string()),
        ids,
        rows,
    }
}

fn year_cell(year: Option<u32>) -> String {
    year.map(|y| y.to_string())
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}

fn sort_by_title(tracks: &mut [&Track]) {
    tracks.sort_by_cached_key(|t| (t.title.to_lowercase(), t.id.clone()));
}

fn track_rows(snapshot: &LibrarySnapshot, tracks: Vec<&Track>) -> Vec<(String, Row)> {
    tracks
        .into_iter()
        .map(|t| {
            let row = vec![
                t.title.clone(),
                snapshot.artist_name(t.artist_id.as_deref()).to_string(),
                snapshot.album_title(t.album_id.as_deref()).to_string(),
                format_duration(t.duration),
            ];
            (t.id.clone(), row)
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
            "artists": {"1": ["Zed"], "2": ["alpha"], "3": ["Alpha"]},
            "albums": {
                "a": ["Second", [], "1", 0, 0, 0, 2001],
                "b": ["first", [], "2"]
            },
            "tracks": {
                "t1": [2, 0, "beta", 0, 61, "a", "1"],
                "t2": [1, 0, "Alpha", 0, 59, "a", "1"],
                "t3": [0, 0, "gamma", 0, 0, "missing", "404"]
            },
            "playlists": {"p": ["Mix", ["t3", "t1"]]}
        });
        normalize(&raw, &Layouts::default()).unwrap().snapshot
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Some(0)), "0:00");
        assert_eq!(format_duration(Some(59)), "0:59");
        assert_eq!(format_duration(Some(60)), "1:00");
        assert_eq!(format_duration(Some(200)), "3:20");
        assert_eq!(format_duration(Some(3600)), "60:00");
        assert_eq!(format_duration(None), "0:00");
    }

    #[test]
    fn albums_sort_case_insensitively() {
        let view = project(ViewKind::Albums, &library());
        assert_eq!(view.ids, vec!["b", "a"]);
        assert_eq!(view.rows[0], vec!["first", "alpha", "Unknown", "0"]);
        assert_eq!(view.rows[1], vec!["Second", "Zed", "2001", "2"]);
    }

    #[test]
    fn equal_names_tie_break_on_id() {
        let view = project(ViewKind::Artists, &library());
        assert_eq!(view.ids, vec!["2", "3", "1"]);
        assert_eq!(view.rows[2], vec!["Zed", "2"]);
    }

    #[test]
    fn unresolved_references_render_placeholders() {
        let view = project(ViewKind::Tracks, &library());
        let idx = view.ids.iter().position(|id| id == "t3").unwrap();
        assert_eq!(
            view.rows[idx],
            vec!["gamma", "Unknown Artist", "Unknown Album", "0:00"]
        );
    }

    #[test]
    fn album_drill_down_orders_by_track_number() {
        let view = project(ViewKind::Album("a".into()), &library());
        assert_eq!(view.ids, vec!["t2", "t1"]);
        assert_eq!(view.rows[1], vec!["beta", "Zed", "Second", "1:01"]);
    }

    #[test]
    fn playlist_drill_down_keeps_playlist_order() {
        let view = project(ViewKind::Playlist("p".into()), &library());
        assert_eq!(view.ids, vec!["t3", "t1"]);
        assert!(project(ViewKind::Playlist("nope".into()), &library()).is_empty());
    }

    #[test]
    fn projection_is_stable() {
        let lib = library();
        for kind in [
            ViewKind::Albums,
            ViewKind::Artists,
            ViewKind::Tracks,
            ViewKind::Playlists,
            ViewKind::Artist("1".into()),
        ] {
            assert_eq!(project(kind.clone(), &lib), project(kind, &lib));
        }
    }

    #[test]
    fn paging_clamps() {
        let view = project(ViewKind::Tracks, &library());
        assert_eq!(view.page(0, 2).len(), 2);
        assert_eq!(view.page(1, 2).len(), 1);
        assert!(view.page(5, 2).is_empty());
        assert!(view.page(0, 0).is_empty());
        assert!(view.page(usize::MAX, usize::MAX).is_empty());
    }

    #[test]
    fn headers_match_row_width() {
        let lib = library();
        for kind in [ViewKind::Albums, ViewKind::Artists, ViewKind::Playlists, ViewKind::Tracks] {
            let view = project(kind.clone(), &lib);
            assert_eq!(view.rows[0].len(), kind.headers().len());
        }
    }
}
