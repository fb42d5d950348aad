mod common;

use common::{harness, past_debounce, settle};
use formstate_model::{Feedback, ValidState};
use formstate_store::{ArraySpec, FieldBinding, FormConfig, LayoutMarker, initializer};
use serde_json::json;

async fn register(h: &common::Harness, paths: &[&str]) {
    for path in paths {
        h.store
            .register_field(path, FieldBinding::new())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_valid_field_covers_registered_fields() {
    let h = harness(FormConfig::default());
    register(&h, &["a", "b"]).await;

    h.store.set_messages(vec![
        Feedback::error("a", "Required"),
        Feedback::error("zzz", "Unknown field"),
    ]);
    let snapshot = h.store.snapshot();

    assert_eq!(snapshot.valid_field.get("a"), Some(&ValidState::Invalid));
    assert_eq!(snapshot.valid_field.get("b"), Some(&ValidState::Valid));
    assert!(!snapshot.valid_field.contains_key("zzz"));
    assert!(!snapshot.valid);
    assert!(snapshot.invalid);
    // unregistered paths surface as global messages
    assert_eq!(snapshot.messages.global.len(), 1);
    assert!(snapshot.showing_inline_errors);
    // nothing is dirty yet
    assert!(snapshot.messages.fields.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_field_errors_hidden_until_reached() {
    let h = harness(FormConfig::default());
    register(&h, &["a", "b", "c"]).await;
    h.store.mount();

    let reply = h.validator.hold();
    assert!(h.store.set_field("b", json!("x")).await.unwrap());
    assert!(h.store.snapshot().validating);
    assert!(h.store.is_staged("a"));
    assert!(h.store.is_staged("b"));

    past_debounce().await;
    reply
        .send(Ok(vec![
            Feedback::error("a", "Required"),
            Feedback::error("c", "Required"),
        ]))
        .unwrap();
    settle().await;

    let snapshot = h.store.snapshot();
    assert!(!snapshot.validating);
    assert_eq!(
        snapshot.messages.fields.keys().collect::<Vec<_>>(),
        vec!["a"]
    );
    assert!(!snapshot.valid);
    assert_eq!(h.store.field_valid("a"), Some(ValidState::Invalid));
    assert_eq!(h.store.field_valid("b"), Some(ValidState::Valid));
    assert_eq!(h.store.field_valid("c"), None);
    assert!(h.store.feedback("c").is_empty());
    assert_eq!(h.validator.calls(), vec![json!({ "b": "x" })]);
}

#[tokio::test]
async fn test_dirtying_a_field_reaches_every_earlier_field() {
    let h = harness(FormConfig::default());
    register(&h, &["a", "b", "c", "d"]).await;

    h.store.dirty_field("c");
    for path in ["a", "b", "c"] {
        assert!(h.store.is_staged(path), "{path} should be staged");
    }
    assert!(!h.store.is_staged("d"));

    h.store.promote_staged(None);
    for path in ["a", "b", "c"] {
        assert!(h.store.is_dirty(path), "{path} should be dirty");
    }
    assert!(!h.store.is_dirty("d"));
}

#[tokio::test]
async fn test_promote_can_leave_focused_field_staged() {
    let h = harness(FormConfig::default());
    register(&h, &["a", "b"]).await;

    h.store.dirty_field("b");
    h.store.promote_staged(Some("b"));
    assert!(h.store.is_dirty("a"));
    assert!(!h.store.is_dirty("b"));
    assert!(h.store.is_staged("b"));
}

#[tokio::test]
async fn test_two_field_walkthrough() {
    let h = harness(FormConfig::default());
    register(&h, &["a", "b"]).await;
    assert_eq!(h.store.field_order("a"), Some(0));
    assert_eq!(h.store.field_order("b"), Some(1));

    h.store.dirty_field("b");
    assert!(h.store.is_staged("a"));
    assert!(h.store.is_staged("b"));

    h.store.promote_staged(None);
    assert!(h.store.is_dirty("a"));
    assert!(h.store.is_dirty("b"));

    h.store.set_messages(vec![Feedback::error("a", "Required")]);
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.messages.for_field("a").len(), 1);
    assert!(!snapshot.valid);
}

#[tokio::test(start_paused = true)]
async fn test_stale_validation_is_discarded() {
    let h = harness(FormConfig::default());
    register(&h, &["a"]).await;
    h.store.mount();

    let first = h.validator.hold();
    h.store.set_field("a", json!(1)).await.unwrap();
    past_debounce().await;

    let second = h.validator.hold();
    h.store.set_field("a", json!(2)).await.unwrap();
    past_debounce().await;
    assert_eq!(h.validator.calls().len(), 2);

    second.send(Ok(Vec::new())).unwrap();
    settle().await;
    assert!(!h.store.snapshot().validating);
    assert!(h.store.snapshot().messages.all.is_empty());

    first
        .send(Ok(vec![Feedback::error("a", "Too small")]))
        .unwrap();
    settle().await;
    let snapshot = h.store.snapshot();
    assert!(snapshot.messages.all.is_empty());
    assert!(snapshot.valid);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_value_does_not_revalidate() {
    let h = harness(FormConfig::default());
    register(&h, &["a"]).await;
    h.store.mount();

    assert!(h.store.set_field("a", json!(1)).await.unwrap());
    past_debounce().await;
    assert!(!h.store.set_field("a", json!(1)).await.unwrap());
    past_debounce().await;
    assert_eq!(h.validator.calls().len(), 1);
}

#[tokio::test]
async fn test_reset_with_data_reads_back_initialized() {
    let h = harness(FormConfig::default());
    h.store
        .register_field(
            "name",
            FieldBinding::new().initialize(initializer(|v| {
                Ok(json!(v.as_str().unwrap_or_default().to_uppercase()))
            })),
        )
        .await
        .unwrap();

    h.store
        .reset(Some(json!({ "name": "ada", "age": 36 })))
        .await
        .unwrap();
    assert_eq!(h.store.snapshot().data, json!({ "name": "ADA", "age": 36 }));
    assert!(h.store.is_initialized("name"));

    h.store.reset(None).await.unwrap();
    assert_eq!(h.store.snapshot().data, json!({}));
    assert!(!h.store.is_form_dirty());
}

#[tokio::test]
async fn test_initial_value_seeds_fresh_form_only() {
    let fresh = harness(FormConfig::default());
    fresh
        .store
        .register_field("country", FieldBinding::new().initial(json!("NZ")))
        .await
        .unwrap();
    assert_eq!(fresh.store.field("country"), Some(json!("NZ")));

    let loaded = harness(FormConfig::default());
    loaded
        .store
        .preload(Some(json!({ "name": "x" })))
        .await
        .unwrap();
    loaded
        .store
        .register_field("country", FieldBinding::new().initial(json!("NZ")))
        .await
        .unwrap();
    assert_eq!(loaded.store.field("country"), None);
}

#[tokio::test]
async fn test_late_field_initializes_loaded_value() {
    let h = harness(FormConfig::default());
    h.store
        .preload(Some(json!({ "when": "2024-01-02" })))
        .await
        .unwrap();

    h.store
        .register_field(
            "when",
            FieldBinding::new().initialize(initializer(|v| Ok(json!({ "raw": v })))),
        )
        .await
        .unwrap();
    assert_eq!(
        h.store.field("when"),
        Some(json!({ "raw": "2024-01-02" }))
    );
    assert!(h.store.is_initialized("when"));
    assert!(!h.store.is_staged("when"));

    // a second registration must not initialize twice
    h.store
        .register_field(
            "when",
            FieldBinding::new().initialize(initializer(|v| Ok(json!({ "raw": v })))),
        )
        .await
        .unwrap();
    assert_eq!(
        h.store.field("when"),
        Some(json!({ "raw": "2024-01-02" }))
    );
}

#[tokio::test]
async fn test_array_group_enforces_minimum_length() {
    let h = harness(FormConfig::default());
    h.store.register_array(
        "contacts",
        ArraySpec::new(json!({ "email": null }))
            .with_min_length(1)
            .with_starting_length(2),
    );
    let len = |h: &common::Harness| {
        h.store
            .field("contacts")
            .and_then(|v| v.as_array().map(Vec::len))
            .unwrap_or_default()
    };
    assert_eq!(len(&h), 2);

    assert!(h.store.delete_from_array("contacts", 1));
    assert_eq!(len(&h), 1);
    assert!(!h.store.delete_from_array("contacts", 0));
    assert_eq!(len(&h), 1);

    assert!(h.store.push_new("contacts"));
    assert_eq!(len(&h), 2);
    assert!(!h.store.push_new("unknown"));
}

#[tokio::test]
async fn test_array_starting_length_ignored_after_preload() {
    let h = harness(FormConfig::default());
    h.store
        .preload(Some(json!({ "contacts": [] })))
        .await
        .unwrap();
    h.store.register_array(
        "contacts",
        ArraySpec::new(json!("")).with_min_length(1).with_starting_length(3),
    );
    assert_eq!(h.store.field("contacts"), Some(json!([""])));
}

#[tokio::test]
async fn test_move_up_swaps_with_previous_entry() {
    let h = harness(FormConfig::default());
    h.store.set_data(json!({ "rows": ["x", "y", "z"] })).await.unwrap();

    assert!(h.store.move_up("rows", 2));
    assert_eq!(h.store.field("rows"), Some(json!(["x", "z", "y"])));
    assert!(!h.store.move_up("rows", 0));
    assert!(!h.store.move_up("rows", 9));
    assert_eq!(h.store.field("rows"), Some(json!(["x", "z", "y"])));

    h.store.push("rows", json!("w"));
    assert_eq!(h.store.field("rows"), Some(json!(["x", "z", "y", "w"])));
}

#[tokio::test]
async fn test_set_field_refuses_index_far_past_end() {
    let h = harness(FormConfig::default());
    h.store.mount();
    h.store.set_field("list.0", json!(1)).await.unwrap();

    let changed = h
        .store
        .set_field("list.18446744073709551615", json!(2))
        .await
        .unwrap();
    assert!(!changed);
    assert!(!h.store.set_field("list.1000000000000", json!(2)).await.unwrap());
    assert_eq!(h.store.snapshot().data, json!({ "list": [1] }));
    assert!(!h.store.is_dirty("list.1000000000000"));
}

#[tokio::test]
async fn test_unregister_compacts_order() {
    let h = harness(FormConfig::default());
    register(&h, &["a", "b", "c"]).await;
    h.store.register_array("rows", ArraySpec::new(json!("")));

    h.store.unregister_field("a");
    assert_eq!(h.store.field_order("a"), None);
    assert_eq!(h.store.field_order("b"), Some(0));
    assert_eq!(h.store.field_order("c"), Some(1));
    assert_eq!(h.store.field_order("rows"), Some(2));

    h.store.unregister_array("rows");
    assert_eq!(h.store.field_order("rows"), None);
}

#[tokio::test]
async fn test_reorder_reveals_fields_before_user_position() {
    let h = harness(FormConfig::default());
    register(&h, &["a", "b", "c", "d"]).await;
    h.store.dirty_field("b");
    h.store.promote_staged(None);

    h.store.reorder([
        LayoutMarker::field("a"),
        LayoutMarker::field("c"),
        LayoutMarker::field("b"),
        LayoutMarker::field("d"),
    ]);

    assert_eq!(h.store.field_order("c"), Some(1));
    assert_eq!(h.store.field_order("b"), Some(2));
    assert!(h.store.is_dirty("c"));
    assert!(!h.store.is_dirty("d"));
    assert!(!h.store.is_staged("d"));
}

#[tokio::test(start_paused = true)]
async fn test_blur_waits_for_pending_validation() {
    let idle = harness(FormConfig::default());
    register(&idle, &["a", "b"]).await;
    idle.store.dirty_field("b");
    idle.store.update_dirty_on_blur();
    assert!(idle.store.is_dirty("a"));
    assert!(idle.store.is_dirty("b"));

    let busy = harness(FormConfig::default());
    register(&busy, &["a"]).await;
    busy.store.mount();
    busy.store.set_field("a", json!(1)).await.unwrap();
    busy.store.update_dirty_on_blur();
    assert!(busy.store.is_staged("a"));
    assert!(!busy.store.is_dirty("a"));

    past_debounce().await;
    assert!(busy.store.is_dirty("a"));
}

#[tokio::test]
async fn test_unsaved_changes_follow_baseline() {
    let h = harness(FormConfig::default());
    register(&h, &["a"]).await;
    h.store.mount();
    h.store.preload(Some(json!({ "a": 1 }))).await.unwrap();
    assert!(!h.store.snapshot().has_unsaved_changes);

    h.store.set_field("a", json!(2)).await.unwrap();
    assert!(h.store.snapshot().has_unsaved_changes);

    h.store.set_field("a", json!(1)).await.unwrap();
    assert!(!h.store.snapshot().has_unsaved_changes);
}

#[tokio::test]
async fn test_preload_marks_manual_form_dirty() {
    let h = harness(FormConfig::default());
    h.store.preload(None).await.unwrap();
    assert!(!h.store.is_form_dirty());

    h.store.preload(Some(json!({ "a": 1 }))).await.unwrap();
    assert!(h.store.is_form_dirty());
    assert!(h.store.is_dirty("anything"));
}

#[tokio::test]
async fn test_preload_stages_autosave_form_up_to_last_value() {
    let h = harness(FormConfig::autosave());
    register(&h, &["a", "b", "c"]).await;

    h.store
        .preload(Some(json!({ "a": "x", "b": "y", "c": "" })))
        .await
        .unwrap();
    assert!(!h.store.is_form_dirty());
    assert!(h.store.is_staged("a"));
    assert!(h.store.is_staged("b"));
    assert!(!h.store.is_staged("c"));
}

#[tokio::test]
async fn test_unmount_forgets_registrations() {
    let h = harness(FormConfig::default());
    register(&h, &["a"]).await;
    h.store.mount();
    h.store.set_field("a", json!("x")).await.unwrap();

    h.store.unmount();
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.data, json!({}));
    assert!(snapshot.valid_field.is_empty());
    assert!(!snapshot.validating);
    assert_eq!(h.store.field_order("a"), None);
}
