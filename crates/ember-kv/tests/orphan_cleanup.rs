//! End-to-end scenario: a table file left behind under an unused file number (e.g. copied in by
//! an aborted recovery) is removed on the next open, while live table files survive untouched.

use std::fs;

use ember_kv::database::{Database, DatabaseOptions};

#[test]
fn orphan_table_file_is_cleaned_up_on_reopen() {
    let dir = tempfile::tempdir().expect("tempdir should be created");

    {
        let db = Database::open(dir.path(), DatabaseOptions::default())
            .expect("database should open");

        for i in 0..20 {
            let key = format!("key{i:04}");
            let value = format!("value{i:04}");
            db.put(key.as_bytes(), value.as_bytes()).expect("put should succeed");
        }
        db.flush().expect("flush should succeed");
    }

    let mut table_files: Vec<_> = fs::read_dir(dir.path())
        .expect("reading the db directory should succeed")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ldb"))
        .collect();
    table_files.sort();
    let live_table = table_files.first()
        .expect("flushing a populated memtable should have produced a table file")
        .clone();

    let orphan_path = dir.path().join("999999.ldb");
    fs::copy(&live_table, &orphan_path).expect("copying the orphan table file should succeed");

    let db = Database::open(dir.path(), DatabaseOptions::default())
        .expect("database should reopen");

    assert!(!orphan_path.exists(), "an orphaned table file should be removed on open");
    assert!(live_table.exists(), "a live table file should survive open");

    for i in 0..20 {
        let key = format!("key{i:04}");
        let value = format!("value{i:04}");
        let got = db.get(key.as_bytes()).expect("get should succeed");
        assert_eq!(got.as_deref(), Some(value.as_bytes()));
    }
}
