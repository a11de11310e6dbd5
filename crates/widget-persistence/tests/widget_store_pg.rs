//! Contrato del store sobre Postgres (requiere DATABASE_URL).
//! Cada test usa un widget_id nuevo, por lo que no hace falta limpiar tablas.

use uuid::Uuid;
use widget_core::{StoreError, Widget, WidgetStore};
mod test_support;
use test_support::test_store;

#[test]
fn create_then_find_round_trip() {
    let Some(store) = test_store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let id = Uuid::new_v4();
    let created = store.create(&Widget::new(id, "a")).expect("create");
    assert_eq!(created, Widget { id, version: 1, value: "a".into() });
    assert_eq!(store.find(id).expect("find"), created);
    let events = store.events(id).expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].version, 1);
    assert_eq!(events[0].value, "a");
}

#[test]
fn update_appends_and_folds() {
    let Some(store) = test_store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let id = Uuid::new_v4();
    store.create(&Widget::new(id, "a")).expect("create");
    let read = store.find(id).expect("find");
    let updated = store.update(&read.with_value("b")).expect("update");
    assert_eq!(updated, Widget { id, version: 2, value: "ab".into() });
    assert_eq!(store.find(id).unwrap().value, "ab");
    assert_eq!(store.event_values(id).unwrap(), "ab");
    let deltas: Vec<String> = store.events(id).unwrap().into_iter().map(|e| e.value).collect();
    assert_eq!(deltas, vec!["a", "b"], "el log guarda deltas crudos");
}

#[test]
fn double_create_is_conflict() {
    let Some(store) = test_store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let id = Uuid::new_v4();
    store.create(&Widget::new(id, "a")).expect("create");
    let err = store.create(&Widget::new(id, "z")).unwrap_err();
    assert_eq!(err, StoreError::Conflict { id, expected: 0 });
    assert_eq!(store.find(id).unwrap(), Widget { id, version: 1, value: "a".into() });
    assert_eq!(store.events(id).unwrap().len(), 1);
}

#[test]
fn stale_update_is_rejected_without_side_effects() {
    let Some(store) = test_store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let id = Uuid::new_v4();
    store.create(&Widget::new(id, "a")).expect("create");
    let read = store.find(id).unwrap();
    store.update(&read.with_value("c")).expect("first update");

    let err = store.update(&read.with_value("b")).unwrap_err();
    assert_eq!(err, StoreError::Conflict { id, expected: 1 });
    assert_eq!(store.find(id).unwrap(), Widget { id, version: 2, value: "ac".into() });
    assert_eq!(store.events(id).unwrap().len(), 2);
    assert!(store.verify(id).unwrap().is_consistent());
}

#[test]
fn update_of_missing_widget_is_conflict() {
    let Some(store) = test_store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let id = Uuid::new_v4();
    let err = store.update(&Widget { id, version: 1, value: "x".into() }).unwrap_err();
    assert!(err.is_conflict());
    assert!(store.events(id).unwrap().is_empty());
}

#[test]
fn missing_widget_reads_are_not_found() {
    let Some(store) = test_store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let id = Uuid::new_v4();
    assert_eq!(store.find(id), Err(StoreError::NotFound(id)));
    assert_eq!(store.event_values(id), Err(StoreError::NotFound(id)));
}

#[test]
fn many_sequential_updates_keep_view_and_log_in_sync() {
    let Some(store) = test_store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let id = Uuid::new_v4();
    store.create(&Widget::new(id, "x")).expect("create");
    let mut expected = String::from("x");
    for i in 0..20 {
        let current = store.find(id).unwrap();
        let delta = format!("{}", i % 10);
        expected.push_str(&delta);
        store.update(&current.with_value(delta)).expect("update");
    }
    let w = store.find(id).unwrap();
    assert_eq!(w.version, 21);
    assert_eq!(w.value, expected);
    assert_eq!(store.event_values(id).unwrap(), expected);
    let verification = store.verify(id).unwrap();
    assert!(verification.is_consistent(), "{verification:?}");
}
