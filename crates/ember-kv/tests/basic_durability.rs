//! End-to-end scenario: writes made before a close are all readable after a reopen.

use ember_kv::database::{Database, DatabaseOptions};

#[test]
fn basic_durability_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir should be created");

    {
        let db = Database::open(dir.path(), DatabaseOptions::default())
            .expect("database should open");

        for i in 0..100 {
            let key = format!("key{i:04}");
            let value = format!("value{i:04}");
            db.put(key.as_bytes(), value.as_bytes()).expect("put should succeed");
        }
    }

    let db = Database::open(dir.path(), DatabaseOptions::default())
        .expect("database should reopen");

    for i in 0..100 {
        let key = format!("key{i:04}");
        let value = format!("value{i:04}");
        let got = db.get(key.as_bytes()).expect("get should succeed");
        assert_eq!(got.as_deref(), Some(value.as_bytes()));
    }
}
