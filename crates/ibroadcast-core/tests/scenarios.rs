use ibroadcast_core::cache::CacheStore;
use ibroadcast_core::normalize::{normalize, Layouts};
use ibroadcast_core::search::search;
use ibroadcast_core::view::{project, ViewKind};
use serde_json::json;

fn album_payload() -> serde_json::Value {
    json!({
        "artists": {
            "10": ["Artist X", []],
            "11": ["Artist Y", []]
        },
        "albums": {
            "1": ["Album A", [100], "10", 0, 0, 0, 2020],
            "2": ["Album B", [], "11", 0, 0, 0, 2021]
        },
        "tracks": {
            "100": [1, 2020, "Opening", 0, 200, "1", "10"]
        },
        "playlists": {}
    })
}

#[test]
fn album_rows_resolve_artists_and_recount_tracks() {
    let snapshot = normalize(&album_payload(), &Layouts::default())
        .unwrap()
        .snapshot;
    let view = project(ViewKind::Albums, &snapshot);
    assert_eq!(
        view.rows,
        vec![
            vec!["Album A", "Artist X", "2020", "1"],
            vec!["Album B", "Artist Y", "2021", "0"],
        ]
    );
}

#[test]
fn mixed_shape_albums_ignore_upstream_counts() {
    let raw = json!({
        "albums": {
            "1": {"title": "Album A", "artist_id": "10", "year": 2020, "track_count": 5},
            "2": ["Album B", [101, 102], "11", 0, 0, 0, 2021]
        },
        "artists": {
            "10": {"name": "Artist X"},
            "11": ["Artist Y", []]
        },
        "tracks": {
            "100": {"title": "Only Track", "album_id": "1", "artist_id": "10"}
        },
        "playlists": {}
    });
    let snapshot = normalize(&raw, &Layouts::default()).unwrap().snapshot;
    assert_eq!(snapshot.albums["1"].track_count, 1);
    assert_eq!(snapshot.albums["2"].track_count, 0);
    let view = project(ViewKind::Albums, &snapshot);
    assert_eq!(
        view.rows,
        vec![
            vec!["Album A", "Artist X", "2020", "1"],
            vec!["Album B", "Artist Y", "2021", "0"],
        ]
    );
}

#[test]
fn track_with_trailing_fields_resolves_title() {
    let raw = json!({
        "tracks": {"7": [3, 1999, "Long Record", 0, 321, "1", "2", "extra", 99, {"x": 1}]}
    });
    let snapshot = normalize(&raw, &Layouts::default()).unwrap().snapshot;
    assert_eq!(snapshot.tracks["7"].title, "Long Record");
    assert_eq!(snapshot.tracks["7"].duration, Some(321));
}

#[test]
fn search_limit_one_returns_first_match_in_snapshot_order() {
    let raw = json!({
        "tracks": {
            "2": [0, 0, "Second title"],
            "1": [0, 0, "First Title"],
            "3": [0, 0, "Unrelated"]
        }
    });
    let snapshot = normalize(&raw, &Layouts::default()).unwrap().snapshot;
    let hits = search(&snapshot, "title", 1);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "1");
}

#[test]
fn missing_cache_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path().join("default").join("library.json"));
    assert!(!store.has_cache());
    let snapshot = store.load();
    assert!(snapshot.artists.is_empty());
    assert!(snapshot.albums.is_empty());
    assert!(snapshot.tracks.is_empty());
    assert!(snapshot.playlists.is_empty());
}

#[test]
fn normalized_library_survives_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path().join("library.json"));
    let snapshot = normalize(&album_payload(), &Layouts::default())
        .unwrap()
        .snapshot;
    store.try_save(&snapshot).unwrap();
    let loaded = store.load();
    assert_eq!(loaded, snapshot);
    assert_eq!(
        project(ViewKind::Albums, &loaded),
        project(ViewKind::Albums, &snapshot)
    );
}
