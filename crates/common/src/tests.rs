use super::*;
use std::io;

#[test]
fn config_defaults_are_sane() {
    let cfg = Config::default();
    assert_eq!(cfg.data_dir, PathBuf::from("./db_data"));
    assert!(cfg.sync_writes);
}

#[test]
fn config_builder_matches_default() {
    let built = Config::builder().build();
    assert_eq!(built.data_dir, Config::default().data_dir);
    assert_eq!(built.sync_writes, Config::default().sync_writes);
}

#[test]
fn db_error_formats_cleanly() {
    let err = DbError::Storage("corruption".into());
    assert!(format!("{err}").contains("storage"));

    let err = DbError::Node("index 3 out of bounds".into());
    assert!(format!("{err}").contains("node"));
}

#[test]
fn io_error_converts() {
    let e = io::Error::other("oops");
    let db_err: DbError = e.into();
    assert!(matches!(db_err, DbError::Io(_)));
}

#[test]
fn page_id_null_sentinel() {
    assert!(PageId::NULL.is_null());
    assert!(PageId(0).is_null());
    assert!(!PageId(1).is_null());
}
