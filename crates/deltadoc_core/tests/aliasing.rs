//! Wire-name aliasing through every persistence call.

use deltadoc_codec::Value;
use deltadoc_core::Database;
use deltadoc_storage::Projection;
use deltadoc_testkit::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn value(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn documents_are_stored_under_wire_names() {
    let db = TestDatabase::memory();
    let mut post = db
        .document_from::<AliasedPost>(json!({
            "title": "A",
            "tags": ["x"],
            "comments": [{"author": "ann", "body": "hi"}],
            "views": 1
        }))
        .unwrap();
    let id = post.create().unwrap();

    let mut stored = db.store.documents("aliased_posts").remove(0);
    assert_eq!(stored.get("_id"), Some(&id));
    if let Value::Map(fields) = &mut stored {
        fields.shift_remove("_id");
    }
    assert_eq!(
        stored,
        value(json!({
            "t": "A",
            "tg": ["x"],
            "c": [{"a": "ann", "b": "hi"}],
            "views": 1
        }))
    );
    assert_eq!(post.get("comments.0.body"), Some(Value::from("hi")));
}

#[test]
fn updates_use_wire_paths() {
    let db = TestDatabase::memory();
    let mut post = db
        .document_from::<AliasedPost>(json!({"title": "A", "comments": [{"author": "ann"}]}))
        .unwrap();
    post.create().unwrap();

    post.set("title", "B").unwrap();
    post.set("comments.0.body", "edited").unwrap();
    assert_eq!(
        post.next_update(),
        value(json!({"$set": {"t": "B", "c.0.b": "edited"}}))
    );
    post.push("comments", [json!({"author": "bob", "body": "late"})])
        .unwrap();
    assert_eq!(
        post.next_update(),
        value(json!({"$set": {
            "t": "B",
            "c": [{"a": "ann", "b": "edited"}, {"a": "bob", "b": "late"}]
        }}))
    );
    post.update().unwrap();

    let stored = &db.store.documents("aliased_posts")[0];
    assert_eq!(
        stored.get("c"),
        Some(&value(json!([
            {"a": "ann", "b": "edited"},
            {"a": "bob", "b": "late"}
        ])))
    );
}

#[test]
fn reads_translate_back_to_field_names() {
    let db = TestDatabase::memory();
    for title in ["A", "B"] {
        db.document_from::<AliasedPost>(json!({"title": title, "body": "text"}))
            .unwrap()
            .create()
            .unwrap();
    }

    let probe = db
        .document_from::<AliasedPost>(json!({"body": "text"}))
        .unwrap();
    let cursor = probe.find(Some(&Projection::new(["title"]))).unwrap();
    assert!(cursor.query().conditions().contains_key("b"));

    let docs: Vec<_> = cursor.collect();
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|doc| doc.partial()));
    assert_eq!(docs[1].get("title"), Some(Value::from("B")));
    assert_eq!(docs[1].get("body"), None);

    let mut lookup = db.document::<AliasedPost>().unwrap();
    lookup.set("title", "A").unwrap();
    assert!(lookup.load(None).unwrap());
    assert_eq!(lookup.get("body"), Some(Value::from("text")));
    assert!(lookup.get_all().get("t").is_none());
}

#[test]
fn undeclared_paths_are_rejected_before_aliasing() {
    let db = Database::new(Arc::new(RecordingStore::new()));
    let mut post = db.document::<AliasedPost>().unwrap();
    assert!(post.set("t", "raw wire name").is_err());
    assert!(post.changes().is_empty());
}
