//! End-to-end scenario: a checkpoint is frozen at the moment it's taken, and never observes
//! writes made to the source database afterward.

use ember_kv::database::{Database, DatabaseOptions};

#[test]
fn checkpoint_excludes_post_checkpoint_writes() {
    let src_dir      = tempfile::tempdir().expect("tempdir should be created");
    let checkpoint_root = tempfile::tempdir().expect("tempdir should be created");
    let checkpoint_dir  = checkpoint_root.path().join("checkpoint");

    let db = Database::open(src_dir.path(), DatabaseOptions::default())
        .expect("database should open");

    for i in 0..50 {
        let key = format!("key{i}");
        let value = format!("value{i}");
        db.put(key.as_bytes(), value.as_bytes()).expect("put should succeed");
    }
    db.flush().expect("flush should succeed");

    db.checkpoint(&checkpoint_dir, 0).expect("checkpoint should succeed");

    for i in 50..100 {
        let key = format!("key{i}");
        let value = format!("value{i}");
        db.put(key.as_bytes(), value.as_bytes()).expect("put should succeed");
    }

    drop(db);

    let checkpoint_db = Database::open(
        &checkpoint_dir,
        DatabaseOptions { create_if_missing: false, ..DatabaseOptions::default() },
    ).expect("checkpoint should be an openable database");

    for i in 0..50 {
        let key = format!("key{i}");
        let value = format!("value{i}");
        let got = checkpoint_db.get(key.as_bytes()).expect("get should succeed");
        assert_eq!(got.as_deref(), Some(value.as_bytes()));
    }
    for i in 50..100 {
        let key = format!("key{i}");
        let got = checkpoint_db.get(key.as_bytes()).expect("get should succeed");
        assert_eq!(got, None, "checkpoint must not see writes made after it was taken");
    }
}
