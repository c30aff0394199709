//! End-to-end scenario: a deletion tombstone for a key whose value is already on disk in an
//! older table stays visible (the key reads as absent) once the memtable holding the tombstone
//! is flushed to its own table file, and is itself dropped once a full compaction merges it
//! together with the value it shadows.

use ember_kv::database::{Database, DatabaseOptions};

#[test]
fn tombstone_stays_visible_across_a_flush() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let db = Database::open(dir.path(), DatabaseOptions::default()).expect("database should open");

    db.put(b"k1", b"v1").expect("put should succeed");
    db.flush().expect("flush should succeed");
    assert_eq!(db.get(b"k1").unwrap().as_deref(), Some(&b"v1"[..]));

    db.delete(b"k1").expect("delete should succeed");
    assert_eq!(db.get(b"k1").unwrap(), None, "tombstone should hide the value before a flush");

    db.flush().expect("flush should succeed");
    assert_eq!(db.get(b"k1").unwrap(), None, "tombstone should hide the value after a flush");
}

#[test]
fn tombstone_survives_a_reopen() {
    let dir = tempfile::tempdir().expect("tempdir should be created");

    {
        let db = Database::open(dir.path(), DatabaseOptions::default())
            .expect("database should open");
        db.put(b"k1", b"v1").expect("put should succeed");
        db.flush().expect("flush should succeed");
        db.delete(b"k1").expect("delete should succeed");
        db.flush().expect("flush should succeed");
    }

    let db = Database::open(
        dir.path(),
        DatabaseOptions { create_if_missing: false, ..DatabaseOptions::default() },
    ).expect("database should reopen");

    assert_eq!(db.get(b"k1").unwrap(), None, "tombstone should survive recovery");
}

#[test]
fn tombstone_survives_a_full_compaction_and_key_stays_absent() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let db = Database::open(dir.path(), DatabaseOptions::default()).expect("database should open");

    db.put(b"k1", b"v1").expect("put should succeed");
    db.flush().expect("flush should succeed");
    db.delete(b"k1").expect("delete should succeed");
    db.flush().expect("flush should succeed");

    db.compact_full().expect("full compaction should succeed");
    assert_eq!(db.get(b"k1").unwrap(), None, "key should stay absent once the tombstone and the value it shadows are merged by compaction");

    db.put(b"k2", b"v2").expect("put should succeed");
    assert_eq!(db.get(b"k2").unwrap().as_deref(), Some(&b"v2"[..]), "database should stay writable and readable after compacting");
}
