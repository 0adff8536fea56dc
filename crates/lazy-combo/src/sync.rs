//! Keeps typed text, display text and the selected item consistent.
//!
//! Two kinds of text writes exist: the user's typing, which must issue a
//! lookup, and the widget's own rewrites after a selection change, which must
//! not. [`TextSelectionSync`] tells them apart with a scoped "from code" flag
//! that is raised around programmatic writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lazy_combo_core::logging::targets;

use crate::item::{ComboItem, display_text};
use crate::view::ItemsView;

/// Where a typed-text change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    /// Typed by the user or assigned from outside the widget.
    User,
    /// Written by the widget while reflecting a selection.
    Programmatic,
}

/// Text/selection synchronization rules.
#[derive(Debug, Default)]
pub struct TextSelectionSync {
    text_member: Option<String>,
    from_code: Arc<AtomicBool>,
}

impl TextSelectionSync {
    /// Create a synchronizer resolving display text through `text_member`.
    pub fn new(text_member: Option<String>) -> Self {
        Self {
            text_member,
            from_code: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configured text member.
    pub fn text_member(&self) -> Option<&str> {
        self.text_member.as_deref()
    }

    /// Change the text member.
    pub fn set_text_member(&mut self, text_member: Option<String>) {
        self.text_member = text_member;
    }

    /// The text shown for a selection; empty when nothing is selected.
    pub fn on_selection_changed<T: ComboItem>(&self, item: Option<&T>) -> String {
        let text = item
            .map(|item| display_text(item, self.text_member()))
            .unwrap_or_default();
        tracing::trace!(target: targets::SYNC, text = %text, "display text resolved");
        text
    }

    /// Raise the "from code" flag until the returned guard is dropped.
    pub fn programmatic_write(&self) -> ProgrammaticWrite {
        let previous = self.from_code.swap(true, Ordering::AcqRel);
        ProgrammaticWrite {
            flag: self.from_code.clone(),
            previous,
        }
    }

    /// Whether a programmatic write is in progress.
    pub fn is_programmatic(&self) -> bool {
        self.from_code.load(Ordering::Acquire)
    }

    /// Classify a typed-text change.
    pub fn origin(&self) -> TextOrigin {
        if self.is_programmatic() {
            TextOrigin::Programmatic
        } else {
            TextOrigin::User
        }
    }

    /// React to a typed-text change.
    ///
    /// Returns `true` when the change came from the user, meaning a lookup
    /// should be issued and the dropdown opened.
    pub fn on_text_changed(&self, text: &str) -> bool {
        let origin = self.origin();
        tracing::trace!(target: targets::SYNC, text, ?origin, "typed text changed");
        origin == TextOrigin::User
    }

    /// Find the selected item in a freshly attached collection.
    ///
    /// Returns the collection's own equal instance, or `None` when the new
    /// collection does not contain the selection.
    pub fn on_items_source_replaced<T: ComboItem>(
        &self,
        selected: &T,
        view: &ItemsView<T>,
    ) -> Option<T> {
        let found = view
            .position_of(selected)
            .and_then(|index| view.get(index))
            .cloned();
        if found.is_none() {
            tracing::trace!(target: targets::SYNC, "selection not in new items source");
        }
        found
    }
}

/// Scope of a programmatic text write. Restores the flag on drop.
#[derive(Debug)]
pub struct ProgrammaticWrite {
    flag: Arc<AtomicBool>,
    previous: bool,
}

impl Drop for ProgrammaticWrite {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ItemsSource;
    use serde_json::json;

    #[test]
    fn test_selection_text_uses_member() {
        let sync = TextSelectionSync::new(Some("Name".to_string()));
        let item = json!({ "name": "Alice" });
        assert_eq!(sync.on_selection_changed(Some(&item)), "Alice");
        assert_eq!(sync.on_selection_changed::<serde_json::Value>(None), "");
    }

    #[test]
    fn test_programmatic_scope() {
        let sync = TextSelectionSync::default();
        assert!(sync.on_text_changed("al"));
        {
            let _write = sync.programmatic_write();
            assert!(!sync.on_text_changed("Alice"));
            {
                let _nested = sync.programmatic_write();
                assert_eq!(sync.origin(), TextOrigin::Programmatic);
            }
            // Still inside the outer write.
            assert!(sync.is_programmatic());
        }
        assert!(sync.on_text_changed("Alicia"));
    }

    #[test]
    fn test_programmatic_flag_cleared_on_unwind() {
        let sync = TextSelectionSync::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _write = sync.programmatic_write();
            panic!("slot failed");
        }));
        assert!(result.is_err());
        assert!(!sync.is_programmatic());
    }

    #[test]
    fn test_adopts_equal_instance_from_new_source() {
        let sync = TextSelectionSync::default();
        let view = ItemsView::new(&ItemsSource::from(vec![
            "alice".to_string(),
            "bob".to_string(),
        ]));
        assert_eq!(
            sync.on_items_source_replaced(&"bob".to_string(), &view),
            Some("bob".to_string())
        );
        assert_eq!(sync.on_items_source_replaced(&"carol".to_string(), &view), None);
    }
}
