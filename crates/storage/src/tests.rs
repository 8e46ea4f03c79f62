use super::*;
use tempfile::tempdir;

#[test]
fn mem_store_roundtrip() {
    let mut store = MemPageStore::new();
    let id = store.allocate(b"hello page").unwrap();
    assert_eq!(store.load(id).unwrap(), b"hello page");
    assert_eq!(store.len(), 1);
}

#[test]
fn mem_store_ids_are_fresh_and_nonzero() {
    let mut store = MemPageStore::new();
    let a = store.allocate(b"a").unwrap();
    let b = store.allocate(b"b").unwrap();
    assert!(!a.is_null());
    assert!(!b.is_null());
    assert_ne!(a, b);
}

#[test]
fn mem_store_free_then_load_fails() {
    let mut store = MemPageStore::new();
    let id = store.allocate(b"x").unwrap();
    store.free(id).unwrap();
    assert!(store.load(id).is_err());
    assert!(store.free(id).is_err());
    assert!(store.is_empty());
}

#[test]
fn mem_store_rejects_oversized_page() {
    let mut store = MemPageStore::new();
    let page = vec![0u8; PAGE_SIZE + 1];
    assert!(store.allocate(&page).is_err());

    let page = vec![0u8; PAGE_SIZE];
    assert!(store.allocate(&page).is_ok());
}

#[test]
fn mem_store_load_null_id_fails() {
    let mut store = MemPageStore::new();
    assert!(store.load(PageId::NULL).is_err());
}

#[test]
fn file_store_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.db");

    let mut store = FilePageStore::create(&path).unwrap();
    let id = store.allocate(b"some node bytes").unwrap();
    assert!(!id.is_null());

    let loaded = store.load(id).unwrap();
    assert_eq!(loaded.len(), PAGE_SIZE);
    assert_eq!(&loaded[..15], b"some node bytes");
}

#[test]
fn file_store_rejects_dead_ids() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.db");

    let mut store = FilePageStore::create(&path).unwrap();
    let id = store.allocate(b"live").unwrap();

    assert!(store.load(PageId::NULL).is_err());
    assert!(store.load(PageId(id.0 + 1)).is_err());

    store.free(id).unwrap();
    assert!(store.load(id).is_err());
    assert!(store.free(id).is_err());
}

#[test]
fn file_store_reuses_freed_ids() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.db");

    let mut store = FilePageStore::create(&path).unwrap();
    let a = store.allocate(b"a").unwrap();
    let _b = store.allocate(b"b").unwrap();

    store.free(a).unwrap();
    let c = store.allocate(b"c").unwrap();
    assert_eq!(c, a);
    assert_eq!(&store.load(c).unwrap()[..1], b"c");
}

#[test]
fn file_store_rejects_oversized_page() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.db");

    let mut store = FilePageStore::create(&path).unwrap();
    let page = vec![0u8; PAGE_SIZE + 1];
    assert!(store.allocate(&page).is_err());
}

#[test]
fn file_store_meta_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pages.db");

    let (kept, freed) = {
        let mut store = FilePageStore::create(&path).unwrap();
        let kept = store.allocate(b"kept").unwrap();
        let freed = store.allocate(b"freed").unwrap();
        store.free(freed).unwrap();
        (kept, freed)
    };

    let mut store = FilePageStore::open(&path).unwrap();
    assert_eq!(&store.load(kept).unwrap()[..4], b"kept");
    assert!(store.load(freed).is_err());

    // The persisted free list feeds reuse after reopen.
    let reused = store.allocate(b"new").unwrap();
    assert_eq!(reused, freed);
}

#[test]
fn file_store_open_missing_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.db");
    assert!(FilePageStore::open(&path).is_err());
}

#[test]
fn with_config_creates_store_in_data_dir() {
    let dir = tempdir().unwrap();
    let config = Config::builder()
        .data_dir(dir.path().join("engine"))
        .sync_writes(false)
        .build();

    let id = {
        let mut store = FilePageStore::with_config(&config).unwrap();
        store.allocate(b"configured").unwrap()
    };

    // Reopening through the same config sees the previous allocation.
    let mut store = FilePageStore::with_config(&config).unwrap();
    assert_eq!(&store.load(id).unwrap()[..10], b"configured");
}
