use brain_core::storage::encode_cell;
use brain_core::{
    CellId, CellStore, FtsSearchEngine, ReconcileReport, SearchEngine, SearchError, SearchMode,
    SearchResult, StoreConfig, StoreError,
};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};

fn open_store() -> (tempfile::TempDir, CellStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CellStore::open(dir.path()).unwrap();
    (dir, store)
}

fn data_of(cells: &[brain_core::Cell]) -> Vec<&str> {
    cells.iter().map(|cell| cell.data.as_str()).collect()
}

#[test]
fn first_write_lands_at_offset_zero_and_reads_back() {
    let (_dir, mut store) = open_store();

    let id = store.write("buy milk").unwrap().unwrap();
    assert_eq!(id.offset, 0);

    let cell = store.read(&id.to_string()).unwrap();
    assert_eq!(cell.offset, 0);
    assert_eq!(cell.data, "buy milk");
}

#[test]
fn identifier_length_is_the_serialized_record_length() {
    let (_dir, mut store) = open_store();

    let id = store.write_at("buy milk", 1_700_000_000).unwrap().unwrap();
    assert_eq!(
        id.length,
        encode_cell(1_700_000_000, b"buy milk").len() as u64
    );
    assert_eq!(store.log().size().unwrap(), id.length);
}

#[test]
fn written_text_round_trips_exactly() {
    let (_dir, mut store) = open_store();
    let samples = [
        "x",
        "multi\nline\n\nnote",
        "  leading and trailing whitespace  ",
        "unicode: café ☕ 日本語",
        "looks like a header: 123 456\n",
    ];

    for text in samples {
        let id = store.write(text).unwrap().unwrap();
        assert_eq!(store.read(&id.to_string()).unwrap().data, text);
    }
}

#[test]
fn consecutive_cells_are_packed_without_gaps_or_overlap() {
    let (_dir, mut store) = open_store();
    let ids = ["one", "two two", "three three three", "four"]
        .into_iter()
        .map(|text| store.write(text).unwrap().unwrap())
        .collect::<Vec<_>>();

    for pair in ids.windows(2) {
        assert_eq!(pair[1].offset, pair[0].offset + pair[0].length);
    }
    let last = ids.last().unwrap();
    assert_eq!(store.log().size().unwrap(), last.end());
}

#[test]
fn keyword_list_returns_only_the_matching_cell() {
    let (_dir, mut store) = open_store();
    let alpha = store.write("alpha").unwrap().unwrap();
    let beta = store.write("beta").unwrap().unwrap();
    assert!(alpha.end() <= beta.offset);

    let cells = store.list("alpha", SearchMode::Keyword).unwrap();
    assert_eq!(data_of(&cells), vec!["alpha"]);
    assert_eq!(cells[0].offset, alpha.offset);
}

#[test]
fn delete_hides_from_list_but_read_still_works() {
    let (_dir, mut store) = open_store();
    let id = store.write("draft").unwrap().unwrap().to_string();
    let size_before = store.log().size().unwrap();

    store.delete(&id).unwrap();

    assert!(store.list("draft", SearchMode::Keyword).unwrap().is_empty());
    assert!(store.list("dra*", SearchMode::Wildcard).unwrap().is_empty());
    assert_eq!(store.read(&id).unwrap().data, "draft");
    assert_eq!(store.log().size().unwrap(), size_before);
}

#[test]
fn empty_write_is_inert() {
    let (_dir, mut store) = open_store();
    store.write("existing").unwrap();
    let size_before = store.log().size().unwrap();

    assert_eq!(store.write("").unwrap(), None);

    assert_eq!(store.log().size().unwrap(), size_before);
    assert_eq!(store.list("existing", SearchMode::Keyword).unwrap().len(), 1);
    assert_eq!(store.reconcile().unwrap().scanned, 1);
}

#[test]
fn list_preserves_relevance_order() {
    let (_dir, mut store) = open_store();
    store
        .write("garden notes mention tomatoes once among lots of other words")
        .unwrap();
    store.write("tomatoes tomatoes tomatoes").unwrap();
    store.write("unrelated entry").unwrap();

    let cells = store.list("tomatoes", SearchMode::Keyword).unwrap();
    assert_eq!(
        data_of(&cells),
        vec![
            "tomatoes tomatoes tomatoes",
            "garden notes mention tomatoes once among lots of other words"
        ]
    );
}

#[test]
fn list_with_no_matches_is_empty() {
    let (_dir, mut store) = open_store();
    store.write("something").unwrap();
    assert!(store.list("nothing", SearchMode::Keyword).unwrap().is_empty());
}

#[test]
fn list_is_capped_at_one_hundred_cells() {
    let (_dir, mut store) = open_store();
    for n in 0..105 {
        store.write(&format!("repeated entry {n}")).unwrap();
    }

    let cells = store.list("repeated", SearchMode::Keyword).unwrap();
    assert_eq!(cells.len(), 100);
    let offsets = cells.iter().map(|cell| cell.offset).collect::<HashSet<_>>();
    assert_eq!(offsets.len(), 100);
}

#[test]
fn read_rejects_malformed_identifiers() {
    let (_dir, store) = open_store();
    for token in ["", "12", "1:2:3", "a:b", "-1:4"] {
        let err = store.read(token).unwrap_err();
        assert!(
            matches!(err, StoreError::Format(_)),
            "unexpected error for `{token}`: {err}"
        );
    }
}

#[test]
fn read_past_end_of_log_is_an_io_error() {
    let (_dir, mut store) = open_store();
    let id = store.write("short").unwrap().unwrap();

    let beyond = CellId::new(id.offset, id.length + 1).to_string();
    match store.read(&beyond).unwrap_err() {
        StoreError::Io(err) => assert_eq!(err.kind(), ErrorKind::UnexpectedEof),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn read_of_truncated_range_is_a_codec_error() {
    let (_dir, mut store) = open_store();
    let id = store.write("truncated").unwrap().unwrap();

    let short = CellId::new(id.offset, id.length - 1).to_string();
    assert!(matches!(
        store.read(&short).unwrap_err(),
        StoreError::Codec(_)
    ));
}

#[test]
fn list_fails_whole_when_a_hit_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = FtsSearchEngine::open_in_memory().unwrap();
    engine.index("999:10", "dangling reference").unwrap();
    let mut store = CellStore::with_engine(dir.path(), engine, false).unwrap();
    store.write("dangling but readable").unwrap();

    let err = store.list("dangling", SearchMode::Keyword).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}

#[test]
fn cells_survive_reopen_and_new_writes_continue_at_the_end() {
    let dir = tempfile::tempdir().unwrap();
    let first = {
        let mut store = CellStore::open(dir.path()).unwrap();
        let id = store.write("before restart").unwrap().unwrap();
        store.close();
        id
    };

    let mut store = CellStore::open(dir.path()).unwrap();
    assert_eq!(store.read_id(first).unwrap().data, "before restart");

    let second = store.write("after restart").unwrap().unwrap();
    assert_eq!(second.offset, first.end());
    assert_eq!(
        data_of(&store.list("restart", SearchMode::Keyword).unwrap()).len(),
        2
    );
}

/// Engine that accepts nothing; every call fails.
struct OfflineEngine;

impl OfflineEngine {
    fn offline<T>() -> SearchResult<T> {
        Err(SearchError::InvalidQuery {
            query: String::new(),
            message: "index offline".to_string(),
        })
    }
}

impl SearchEngine for OfflineEngine {
    fn index(&mut self, _id: &str, _text: &str) -> SearchResult<()> {
        Self::offline()
    }

    fn query(&self, _text: &str, _mode: SearchMode, _limit: u32) -> SearchResult<Vec<String>> {
        Self::offline()
    }

    fn delete(&mut self, _id: &str) -> SearchResult<()> {
        Self::offline()
    }

    fn contains(&self, _id: &str) -> SearchResult<bool> {
        Self::offline()
    }

    fn is_removed(&self, _id: &str) -> SearchResult<bool> {
        Self::offline()
    }
}

#[test]
fn write_succeeds_when_indexing_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CellStore::with_engine(dir.path(), OfflineEngine, false).unwrap();

    let id = store.write("durable anyway").unwrap().unwrap();
    assert_eq!(store.read_id(id).unwrap().data, "durable anyway");

    assert!(matches!(
        store.list("durable", SearchMode::Keyword).unwrap_err(),
        StoreError::Index(_)
    ));
    assert!(matches!(
        store.delete(&id.to_string()).unwrap_err(),
        StoreError::Index(_)
    ));
}

#[test]
fn reconcile_reindexes_missing_cells_but_not_deleted_ones() {
    let dir = tempfile::tempdir().unwrap();

    let (kept, deleted) = {
        let mut store = CellStore::with_engine(dir.path(), OfflineEngine, false).unwrap();
        let kept = store.write("orphaned thought").unwrap().unwrap();
        let deleted = store.write("orphaned and unwanted").unwrap().unwrap();
        (kept, deleted)
    };

    let mut store = CellStore::open(dir.path()).unwrap();
    assert!(store.list("orphaned", SearchMode::Keyword).unwrap().is_empty());
    store.delete(&deleted.to_string()).unwrap();

    let report = store.reconcile().unwrap();
    assert_eq!(
        report,
        ReconcileReport {
            scanned: 2,
            reindexed: 1
        }
    );

    let cells = store.list("orphaned", SearchMode::Keyword).unwrap();
    assert_eq!(data_of(&cells), vec!["orphaned thought"]);
    assert_eq!(cells[0].offset, kept.offset);

    assert_eq!(store.reconcile().unwrap().reindexed, 0);
}

#[test]
fn reconcile_on_empty_store_does_nothing() {
    let (_dir, mut store) = open_store();
    assert_eq!(store.reconcile().unwrap(), ReconcileReport::default());
}

#[test]
fn reconcile_reports_corrupt_tail_instead_of_panicking() {
    let (_dir, mut store) = open_store();
    store.write("ok").unwrap();
    let mut raw = OpenOptions::new()
        .append(true)
        .open(store.log().path())
        .unwrap();
    raw.write_all(b"1 18446744073709551615\nxx").unwrap();

    assert!(matches!(
        store.reconcile().unwrap_err(),
        StoreError::Codec(_)
    ));
}

#[test]
fn open_with_config_uses_configured_root_without_sync() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("notes");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "root = {:?}\nsync_writes = false\n",
            root.to_str().unwrap()
        ),
    )
    .unwrap();

    let config = StoreConfig::load_from(&config_path).unwrap();
    assert!(!config.sync_writes);

    let id = {
        let mut store = CellStore::open_with_config(&config).unwrap();
        assert_eq!(store.root(), root.as_path());
        let id = store.write("configured root").unwrap().unwrap();
        assert_eq!(store.read_id(id).unwrap().data, "configured root");
        store.close();
        id
    };

    let store = CellStore::open(&root).unwrap();
    assert_eq!(store.read_id(id).unwrap().data, "configured root");
    assert_eq!(
        data_of(&store.list("configured", SearchMode::Keyword).unwrap()),
        vec!["configured root"]
    );
}
