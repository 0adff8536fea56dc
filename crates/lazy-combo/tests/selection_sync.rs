//! Integration tests for text/selection/list synchronization and navigation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_combo::prelude::*;
use parking_lot::Mutex;
use serde_json::{Value, json};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lazy_combo=trace")
        .with_test_writer()
        .try_init();
}

fn people() -> Vec<Value> {
    vec![
        json!({ "Name": "Alice", "email": "alice@example.com" }),
        json!({ "Name": "Bob", "email": "bob@example.com" }),
        json!({ "Name": "Carol", "email": "carol@example.com" }),
    ]
}

/// A people selector that counts lookups.
fn people_combo(lookups: &Arc<AtomicUsize>) -> LazyComboBox<Value> {
    let counter = lookups.clone();
    LazyComboBox::new()
        .with_text_member("Name")
        .with_items_source(people())
        .with_lookup(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
}

#[test]
fn selecting_shows_member_text_without_lookup() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);
    let text_changes = Arc::new(Mutex::new(Vec::new()));

    let changes = text_changes.clone();
    combo
        .text_changed()
        .connect(move |text| changes.lock().push(text.clone()));

    combo.set_selected_item(Some(people()[0].clone())).unwrap();

    assert_eq!(combo.display_text(), "Alice");
    assert_eq!(combo.text(), "Alice");
    assert_eq!(*text_changes.lock(), vec!["Alice"]);
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
    assert!(!combo.is_dropdown_open());
}

#[test]
fn clearing_selection_clears_texts() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);

    combo.set_selected_item(Some(people()[1].clone())).unwrap();
    combo.set_selected_item(None).unwrap();

    assert_eq!(combo.display_text(), "");
    assert_eq!(combo.text(), "");
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn user_typing_issues_lookup_and_opens() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);
    let opened = Arc::new(AtomicUsize::new(0));

    let opened_clone = opened.clone();
    combo.dropdown_opened.connect(move |_| {
        opened_clone.fetch_add(1, Ordering::SeqCst);
    });

    combo.activate_display().unwrap();
    for text in ["Al", "Ali"] {
        combo.set_text(text).unwrap();
        assert!(combo.wait_for_lookups(std::time::Duration::from_secs(5)));
    }

    assert_eq!(lookups.load(Ordering::SeqCst), 2);
    assert!(combo.is_dropdown_open());
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(combo.interaction_state(), InteractionState::Editing);
}

#[test]
fn replacing_source_keeps_present_selection() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);
    combo.set_selected_item(Some(people()[0].clone())).unwrap();

    // A fresh collection holding an equal Alice.
    let refreshed = vec![people()[2].clone(), people()[0].clone()];
    combo.set_items_source(Some(ItemsSource::from(refreshed)));

    assert_eq!(combo.selected_item(), Some(people()[0].clone()));
    assert_eq!(combo.display_text(), "Alice");
    assert_eq!(combo.text(), "Alice");
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn replacing_source_without_selection_leaves_display_text() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);
    combo.set_selected_item(Some(people()[0].clone())).unwrap();

    combo.set_items_source(Some(ItemsSource::from(vec![json!({ "Name": "Dave" })])));

    assert_eq!(combo.display_text(), "Alice");
    assert_eq!(combo.selected_item(), Some(people()[0].clone()));
    assert_eq!(combo.items_view().map(ItemsView::len), Some(1));
}

#[test]
fn replacing_source_while_editing_keeps_typed_text() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);
    combo.set_selected_item(Some(people()[0].clone())).unwrap();

    combo.activate_display().unwrap();
    combo.set_text("Ali").unwrap();
    combo.set_items_source(Some(ItemsSource::from(people())));

    assert_eq!(combo.text(), "Ali");
    assert_eq!(combo.display_text(), "Alice");
}

#[test]
fn enter_commits_current_item_and_closes() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);

    assert!(combo.handle_key(ComboKey::Down).unwrap());
    assert!(combo.handle_key(ComboKey::Down).unwrap());
    assert!(combo.is_dropdown_open());

    assert!(combo.handle_key(ComboKey::Enter).unwrap());
    assert!(!combo.is_dropdown_open());
    assert_eq!(combo.selected_item(), Some(people()[1].clone()));
    assert_eq!(combo.display_text(), "Bob");
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn enter_without_current_item_is_noop() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);
    combo.set_dropdown_open(true).unwrap();

    assert!(!combo.handle_key(ComboKey::Enter).unwrap());
    assert!(combo.is_dropdown_open());
    assert_eq!(combo.selected_item(), None);
}

#[test]
fn cursor_wraps_at_both_ends() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);

    combo.handle_key(ComboKey::End).unwrap();
    combo.handle_key(ComboKey::Down).unwrap();
    assert_eq!(combo.current_item(), Some(people()[0].clone()));

    combo.handle_key(ComboKey::Up).unwrap();
    assert_eq!(combo.current_item(), Some(people()[2].clone()));

    combo.handle_key(ComboKey::Home).unwrap();
    assert_eq!(combo.current_item(), Some(people()[0].clone()));
}

#[test]
fn cursor_stays_none_on_empty_source() {
    setup();
    let mut combo = LazyComboBox::<Value>::new().with_items_source(Vec::<Value>::new());

    assert!(combo.handle_key(ComboKey::Down).unwrap());
    assert!(combo.handle_key(ComboKey::Up).unwrap());
    assert_eq!(combo.current_item(), None);
    assert_eq!(combo.selected_item(), None);
}

#[test]
fn escape_closes_dropdown() {
    setup();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut combo = people_combo(&lookups);

    combo.handle_key(ComboKey::Down).unwrap();
    assert!(combo.handle_key(ComboKey::Escape).unwrap());
    assert!(!combo.is_dropdown_open());
    assert!(!combo.handle_key(ComboKey::Escape).unwrap());
}

#[test]
fn view_keeps_caller_order() {
    setup();
    let source = ItemsSource::from(vec![3, 1, 2]).with_default_sort(|a: &i32, b: &i32| a.cmp(b));
    let mut combo = LazyComboBox::<i32>::new().with_items_source(source);

    combo.handle_key(ComboKey::Home).unwrap();
    assert_eq!(combo.current_item(), Some(3));
    assert_eq!(combo.items_view().unwrap().items(), &[3, 1, 2]);
}

#[test]
fn manual_selection_runs_synchronous_lookup() {
    setup();
    let inputs = Arc::new(Mutex::new(Vec::new()));

    let inputs_clone = inputs.clone();
    let mut combo = LazyComboBox::<Value>::new()
        .with_text_member("name")
        .with_lookup(move |ctx| {
            inputs_clone.lock().push(ctx.input().to_string());
            ctx.post_items(people());
            Ok(())
        });

    combo.set_selected_item(Some(people()[1].clone())).unwrap();

    // Applied before returning, no process_pending needed.
    assert_eq!(*inputs.lock(), vec!["Bob"]);
    assert_eq!(combo.items_view().map(ItemsView::len), Some(3));
    assert_eq!(combo.selected_item(), Some(people()[1].clone()));
    assert_eq!(combo.display_text(), "Bob");
}

#[test]
fn manual_selection_error_propagates_without_rollback() {
    setup();
    let mut combo = LazyComboBox::<Value>::new()
        .with_text_member("Name")
        .with_lookup(|_| Err(LookupError::failed("directory offline")));

    let result = combo.set_selected_item(Some(people()[2].clone()));

    assert_eq!(result, Err(LookupError::failed("directory offline")));
    assert_eq!(combo.selected_item(), Some(people()[2].clone()));
    assert_eq!(combo.display_text(), "Carol");
    assert!(!combo.is_loading());
}

#[test]
fn opening_without_source_looks_up_synchronously() {
    setup();
    let mut combo = LazyComboBox::<String>::new().with_lookup(|ctx| {
        ctx.post_items(vec!["first".to_string(), "second".to_string()]);
        Ok(())
    });
    let opened = Arc::new(AtomicUsize::new(0));

    let opened_clone = opened.clone();
    combo.dropdown_opened.connect(move |_| {
        opened_clone.fetch_add(1, Ordering::SeqCst);
    });

    combo.set_dropdown_open(true).unwrap();

    assert!(combo.is_dropdown_open());
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(
        combo.items_view().map(|view| view.items().to_vec()),
        Some(vec!["first".to_string(), "second".to_string()])
    );
}

#[test]
fn custom_items_with_derived_members() {
    #[derive(Debug, Clone, PartialEq)]
    struct Country {
        code: &'static str,
        name: &'static str,
    }

    impl std::fmt::Display for Country {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{} ({})", self.name, self.code)
        }
    }

    lazy_combo::combo_item!(Country { code, name });

    setup();
    let austria = Country {
        code: "AT",
        name: "Austria",
    };
    let mut combo = LazyComboBox::new()
        .with_text_member("CODE")
        .with_items_source(vec![austria.clone()]);

    combo.click_list_item(0).unwrap();
    assert_eq!(combo.selected_item(), Some(austria));
    assert_eq!(combo.display_text(), "AT");
}
