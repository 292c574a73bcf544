//! Integration test: values written through a file-backed database are
//! still there after the database is closed and reopened.

use std::fs;

use serde::{Deserialize, Serialize};
use swarmwatch_db::{Database, KeyValueStore, load_json, save_json};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Entry {
    id: String,
    tags: Vec<String>,
}

#[test]
fn values_survive_reopen() {
    let dir = std::env::temp_dir().join(format!("swarmwatch_db_test_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("swarmwatch.db");

    let entries = vec![
        Entry { id: "a".into(), tags: vec!["x".into()] },
        Entry { id: "b".into(), tags: vec![] },
    ];

    {
        let db = Database::open(&path).unwrap();
        save_json(&db, "entries", &entries).unwrap();
        db.set("session", "user_1").unwrap();
        db.set("scratch", "1").unwrap();
        db.remove("scratch").unwrap();
    }

    // Reopening runs migrations again; they must be idempotent.
    let db = Database::open(&path).unwrap();
    let loaded: Vec<Entry> = load_json(&db, "entries").unwrap().unwrap();
    assert_eq!(loaded, entries);
    assert_eq!(db.get("session").unwrap().as_deref(), Some("user_1"));
    assert!(db.get("scratch").unwrap().is_none());

    drop(db);
    let _ = fs::remove_dir_all(&dir);
}
