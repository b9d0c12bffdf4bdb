//! End-to-end document lifecycle against the in-memory store.

use deltadoc_codec::Value;
use deltadoc_core::{CoreError, Document};
use deltadoc_storage::Projection;
use deltadoc_testkit::prelude::*;
use serde_json::json;

fn value(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn stored_post(db: &TestDatabase, data: serde_json::Value) -> Document<BlogPost> {
    let mut post = db.document_from::<BlogPost>(data).unwrap();
    let id = post.create().unwrap();
    let mut loaded = db.document::<BlogPost>().unwrap();
    loaded.set("_id", id).unwrap();
    assert!(loaded.load(None).unwrap());
    loaded
}

#[test]
fn set_and_push_build_one_update() {
    init_tracing();
    let db = TestDatabase::memory();
    let mut post = db.document::<BlogPost>().unwrap();
    post.set("title", "A").unwrap();
    post.push("tags", ["x"]).unwrap();
    post.push("tags", ["y"]).unwrap();

    assert_eq!(post.get_all(), value(json!({"title": "A", "tags": ["x", "y"]})));
    assert_eq!(
        post.next_update(),
        value(json!({"$set": {"title": "A"}, "$pushAll": {"tags": ["x", "y"]}}))
    );
}

#[test]
fn increment_then_update_and_reload() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A", "views": 4}));

    assert_eq!(post.inc("views", 5).unwrap(), Value::Int(9));
    assert_eq!(post.get("views"), Some(Value::Int(9)));
    assert_eq!(post.next_update(), value(json!({"$inc": {"views": 5}})));

    post.update().unwrap();
    assert_eq!(post.next_update(), Value::empty_map());
    assert!(post.changes().is_empty());

    let reloaded = stored_post_by_id(&db, post.id().unwrap());
    assert_eq!(reloaded.get("views"), Some(Value::Int(9)));
}

fn stored_post_by_id(db: &TestDatabase, id: Value) -> Document<BlogPost> {
    let mut post = db.document::<BlogPost>().unwrap();
    post.set("_id", id).unwrap();
    assert!(post.load(None).unwrap());
    post
}

#[test]
fn repeated_numeric_sets_keep_the_latest_delta() {
    let db = TestDatabase::memory();
    let mut post = db.document::<BlogPost>().unwrap();
    post.set("views", 4).unwrap();
    post.set("views", 8).unwrap();
    assert_eq!(post.next_update(), value(json!({"$inc": {"views": 8}})));
    assert_eq!(post.next_update_for("inc").unwrap().len(), 1);
}

#[test]
fn set_on_a_loaded_document_keeps_the_original() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A"}));
    post.set("title", "B").unwrap();
    assert_eq!(post.get("title"), Some(Value::from("B")));
    assert_eq!(post.original("title"), Some(Value::from("A")));
    assert_eq!(post.changed("title"), Some(Value::from("B")));
}

#[test]
fn unset_twice_equals_unset_once() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A", "body": "text"}));
    post.unset("body").unwrap();
    let changed = post.changed_all();
    let update = post.next_update();
    assert_eq!(update, value(json!({"$unset": {"body": 1}})));

    post.unset("body").unwrap();
    assert_eq!(post.changed_all(), changed);
    assert_eq!(post.next_update(), update);
    assert!(!post.has("body"));
}

#[test]
fn unset_of_a_missing_field_changes_nothing() {
    let db = TestDatabase::memory();
    let mut post = db.document::<BlogPost>().unwrap();
    post.unset("body").unwrap();
    assert!(post.changes().is_empty());
    assert_eq!(post.next_update(), Value::empty_map());
}

#[test]
fn popping_an_unsaved_push_retracts_it() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A", "tags": ["a"]}));
    post.push("tags", ["b"]).unwrap();
    assert_eq!(post.pop("tags").unwrap(), Some(Value::from("b")));

    assert!(post.next_update_for("pushAll").unwrap().is_empty());
    assert!(post.next_update_for("pop").unwrap().is_empty());
    assert_eq!(post.get("tags"), Some(value(json!(["a"]))));
}

#[test]
fn nested_pushes_travel_inside_the_pushed_element() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A"}));
    post.push("comments", [json!({"author": "ann", "body": "first"})])
        .unwrap();
    post.set("comments.0.votes", 3).unwrap();
    assert_eq!(
        post.next_update(),
        value(json!({"$pushAll": {"comments": [
            {"author": "ann", "body": "first", "votes": 3}
        ]}}))
    );

    post.update().unwrap();
    let reloaded = stored_post_by_id(&db, post.id().unwrap());
    assert_eq!(reloaded.get("comments.0.votes"), Some(Value::Int(3)));
}

#[test]
fn every_persistence_call_resets_the_delta() {
    let db = TestDatabase::memory();
    let mut post = db.document::<BlogPost>().unwrap();
    post.set("title", "A").unwrap();
    post.create().unwrap();
    assert!(post.changes().is_empty());

    post.set("body", "b").unwrap();
    post.save().unwrap();
    assert!(post.changes().is_empty());
    assert_eq!(post.next_update(), Value::empty_map());

    post.inc("views", 1).unwrap();
    post.update().unwrap();
    assert!(post.changes().is_empty());
    assert_eq!(post.next_update(), Value::empty_map());
    assert_eq!(post.last_update(), Some(&value(json!({"$inc": {"views": 1}}))));
}

#[test]
fn invalid_states_are_refused() {
    let db = TestDatabase::memory();

    let mut empty = db.document::<BlogPost>().unwrap();
    assert!(matches!(empty.load(None), Err(CoreError::InvalidState { .. })));

    let mut fresh = db.document::<BlogPost>().unwrap();
    fresh.set("title", "A").unwrap();
    assert!(matches!(fresh.update(), Err(CoreError::InvalidState { .. })));

    fresh.create().unwrap();
    assert!(matches!(fresh.create(), Err(CoreError::InvalidState { .. })));

    let mut first = db
        .document_from::<BlogPost>(json!({"_id": "fixed", "title": "A"}))
        .unwrap();
    first.create().unwrap();
    let mut second = db
        .document_from::<BlogPost>(json!({"_id": "fixed", "title": "B"}))
        .unwrap();
    assert!(matches!(second.create(), Err(CoreError::InvalidState { .. })));
}

#[test]
fn partial_documents_update_but_do_not_save() {
    let db = TestDatabase::memory();
    let post = stored_post(&db, json!({"title": "A", "body": "long text"}));

    let mut partial = db.document::<BlogPost>().unwrap();
    partial.set("_id", post.id().unwrap()).unwrap();
    assert!(partial.load(Some(&Projection::new(["title"]))).unwrap());
    assert!(partial.partial());
    assert!(!partial.has("body"));

    partial.set("title", "B").unwrap();
    assert!(matches!(partial.save(), Err(CoreError::InvalidState { .. })));
    partial.update().unwrap();

    let reloaded = stored_post_by_id(&db, post.id().unwrap());
    assert_eq!(reloaded.get("title"), Some(Value::from("B")));
    assert_eq!(reloaded.get("body"), Some(Value::from("long text")));
}

#[test]
fn unknown_fields_are_rejected_but_open_prefixes_accepted() {
    let db = TestDatabase::memory();
    let mut post = db.document::<BlogPost>().unwrap();
    assert!(matches!(
        post.set("author", "x"),
        Err(CoreError::UnknownField { .. })
    ));
    assert!(matches!(
        post.push("comments", [json!({"score": 1})]),
        Err(CoreError::UnknownField { .. })
    ));
    post.set("meta.source.url", "https://example.com").unwrap();
    assert!(post.changes().contains_key("meta.source.url"));
    assert!(!post.has("author"));
}

#[test]
fn filters_apply_before_writes() {
    let db = TestDatabase::memory();
    let mut post = db
        .document_from::<BlogPost>(json!({"title": "  Hello  ", "slug": "Hello World"}))
        .unwrap();
    post.create().unwrap();
    assert_eq!(post.get("title"), Some(Value::from("Hello")));
    assert_eq!(post.get("slug"), Some(Value::from("hello-world")));

    let stored = &db.store.documents("posts")[0];
    assert_eq!(stored.get("slug"), Some(&Value::from("hello-world")));
}

#[test]
fn cursors_iterate_and_rewind() {
    let db = TestDatabase::memory();
    for (title, slug) in [("A", "same"), ("B", "same"), ("C", "other")] {
        db.document_from::<BlogPost>(json!({"title": title, "slug": slug}))
            .unwrap()
            .create()
            .unwrap();
    }

    let probe = db
        .document_from::<BlogPost>(json!({"slug": "same"}))
        .unwrap();
    let mut cursor = probe.find(None).unwrap();
    assert_eq!(cursor.count_matches().unwrap(), 2);
    let titles: Vec<_> = cursor.by_ref().filter_map(|doc| doc.get("title")).collect();
    assert_eq!(titles, [Value::from("A"), Value::from("B")]);

    cursor.rewind().unwrap();
    let mut first = cursor.next().unwrap();
    assert!(first.loaded());
    first.set("body", "edited").unwrap();
    first.update().unwrap();
    assert_eq!(db.store.documents("posts")[0].get("body"), Some(&Value::from("edited")));
}

#[test]
fn delete_removes_by_id_once_loaded() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A"}));
    db.document_from::<BlogPost>(json!({"title": "A"}))
        .unwrap()
        .create()
        .unwrap();

    assert_eq!(post.delete().unwrap(), 1);
    assert_eq!(db.store.documents("posts").len(), 1);
}

#[test]
fn push_after_pop_sends_the_whole_array() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A", "tags": ["a", "b"]}));
    post.pop("tags").unwrap();
    post.push("tags", ["c"]).unwrap();
    assert_eq!(
        post.next_update(),
        value(json!({"$set": {"tags": ["a", "c"]}}))
    );

    post.update().unwrap();
    let reloaded = stored_post_by_id(&db, post.id().unwrap());
    assert_eq!(reloaded.get("tags"), Some(value(json!(["a", "c"]))));
}

#[test]
fn element_writes_and_pushes_share_one_set() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A", "tags": ["a", "b"]}));
    post.set("tags.0", "X").unwrap();
    post.push("tags", ["c"]).unwrap();
    assert_eq!(
        post.next_update(),
        value(json!({"$set": {"tags": ["X", "b", "c"]}}))
    );

    post.set("tags.1", "Y").unwrap();
    assert_eq!(
        post.next_update(),
        value(json!({"$set": {"tags": ["X", "Y", "c"]}}))
    );
    post.update().unwrap();
    let reloaded = stored_post_by_id(&db, post.id().unwrap());
    assert_eq!(reloaded.get("tags"), Some(value(json!(["X", "Y", "c"]))));
}

#[test]
fn stored_element_writes_after_a_push_send_the_whole_array() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A", "tags": ["a", "b"]}));
    post.push("tags", ["c"]).unwrap();
    post.unset("tags.0").unwrap();
    assert_eq!(
        post.next_update(),
        value(json!({"$set": {"tags": ["b", "c"]}}))
    );
}

#[test]
fn numeric_kind_changes_reach_the_store() {
    let db = TestDatabase::memory();
    let mut post = stored_post(&db, json!({"title": "A", "views": 4}));
    post.set("views", 4.0).unwrap();
    assert_eq!(post.next_update(), value(json!({"$set": {"views": 4.0}})));

    post.update().unwrap();
    let reloaded = stored_post_by_id(&db, post.id().unwrap());
    assert_eq!(reloaded.get("views"), post.get("views"));
}
