//! End-to-end scenario: a snapshot taken before a write continues to see the pre-write value
//! through `get_at`, while reads against the live database see the new value.

use ember_kv::database::{Database, DatabaseOptions};

#[test]
fn snapshot_is_isolated_from_later_writes() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let db = Database::open(dir.path(), DatabaseOptions::default()).expect("database should open");

    db.put(b"k1", b"v1").expect("put should succeed");
    db.put(b"k2", b"v2").expect("put should succeed");

    let snap = db.snapshot();

    db.put(b"k1", b"v1-updated").expect("put should succeed");
    db.delete(b"k2").expect("delete should succeed");
    db.put(b"k3", b"v3").expect("put should succeed");

    assert_eq!(db.get_at(b"k1", &snap).unwrap().as_deref(), Some(&b"v1"[..]));
    assert_eq!(db.get_at(b"k2", &snap).unwrap().as_deref(), Some(&b"v2"[..]));
    assert_eq!(db.get_at(b"k3", &snap).unwrap(), None);

    assert_eq!(db.get(b"k1").unwrap().as_deref(), Some(&b"v1-updated"[..]));
    assert_eq!(db.get(b"k2").unwrap(), None);
    assert_eq!(db.get(b"k3").unwrap().as_deref(), Some(&b"v3"[..]));
}

#[test]
fn snapshot_survives_a_flush() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let db = Database::open(dir.path(), DatabaseOptions::default()).expect("database should open");

    db.put(b"k1", b"v1").expect("put should succeed");
    let snap = db.snapshot();

    db.put(b"k1", b"v1-updated").expect("put should succeed");
    db.flush().expect("flush should succeed");

    assert_eq!(db.get_at(b"k1", &snap).unwrap().as_deref(), Some(&b"v1"[..]));
    assert_eq!(db.get(b"k1").unwrap().as_deref(), Some(&b"v1-updated"[..]));
}
