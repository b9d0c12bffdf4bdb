//! Property tests for the path codec and the change tracker.

use deltadoc_codec::{flatten, inflate, Value};
use deltadoc_core::Document;
use deltadoc_testkit::prelude::*;
use proptest::prelude::*;

fn without_id(mut document: Value) -> Value {
    if let Value::Map(fields) = &mut document {
        fields.shift_remove("_id");
    }
    document
}

fn reload(db: &TestDatabase, id: Value) -> Document<Resource> {
    let mut fresh = db.document::<Resource>().unwrap();
    fresh.set("_id", id).unwrap();
    assert!(fresh.load(None).unwrap());
    fresh
}

fn text_values(tags: &[String]) -> Vec<Value> {
    tags.iter().map(|tag| Value::from(tag.as_str())).collect()
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn inflate_reverses_flatten(doc in document_strategy()) {
        prop_assert_eq!(inflate(&flatten(&doc)), doc);
    }

    #[test]
    fn stored_documents_load_back_unchanged(doc in stored_document_strategy()) {
        let db = TestDatabase::memory();
        let mut created = db.document_from::<Resource>(doc.clone()).unwrap();
        let id = created.create().unwrap();
        prop_assert_eq!(without_id(created.get_all()), doc.clone());

        let loaded = reload(&db, id);
        prop_assert_eq!(without_id(loaded.get_all()), doc);
    }
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn update_reproduces_the_tracked_document(
        doc in stored_document_strategy(),
        writes in prop::collection::vec((field_name_strategy(), stored_scalar_strategy()), 1..6),
    ) {
        init_tracing();
        let db = TestDatabase::memory();
        let mut document = db.document_from::<Resource>(doc).unwrap();
        let id = document.create().unwrap();

        for (field, value) in writes {
            document.set(&field, value).unwrap();
        }
        document.update().unwrap();
        prop_assert!(document.changes().is_empty());

        let loaded = reload(&db, id);
        prop_assert_eq!(loaded.get_all(), document.get_all());
    }

    #[test]
    fn push_then_pop_leaves_no_update(
        initial in tags_strategy(),
        pushed in tags_strategy(),
    ) {
        let db = TestDatabase::memory();
        let mut document = db
            .document_from::<Resource>(Value::map([("tags", Value::Array(text_values(&initial)))]))
            .unwrap();
        document.create().unwrap();

        document.push("tags", text_values(&pushed)).unwrap();
        let mut popped = Vec::new();
        for _ in 0..pushed.len() {
            popped.push(document.pop("tags").unwrap().unwrap());
        }
        popped.reverse();

        prop_assert_eq!(popped, text_values(&pushed));
        prop_assert_eq!(document.next_update(), Value::empty_map());
        prop_assert_eq!(document.get("tags"), Some(Value::Array(text_values(&initial))));
    }

    #[test]
    fn popping_past_the_pushed_values_pops_the_stored_array(
        initial in tags_strategy().prop_filter("needs a stored tag", |tags| !tags.is_empty()),
        pushed in tags_strategy(),
    ) {
        let db = TestDatabase::memory();
        let mut document = db
            .document_from::<Resource>(Value::map([("tags", Value::Array(text_values(&initial)))]))
            .unwrap();
        let id = document.create().unwrap();

        document.push("tags", text_values(&pushed)).unwrap();
        for _ in 0..=pushed.len() {
            document.pop("tags").unwrap();
        }
        prop_assert_eq!(
            document.next_update(),
            Value::map([("$pop", Value::map([("tags", Value::Int(1))]))])
        );

        document.update().unwrap();
        let expected = text_values(&initial[..initial.len() - 1]);
        prop_assert_eq!(reload(&db, id).get("tags"), Some(Value::Array(expected)));
    }
}
