//! Change notifications.
//!
//! A [`Signal`] is the notifying half of an observable property and the
//! carrier for widget events such as "dropdown opened" or "lookup failed".
//! Slots run synchronously on the emitting thread in connection order. The
//! widget only emits on its UI context; results produced on lookup workers
//! are marshaled there through [`crate::dispatch::UiDispatcher`] first.
//!
//! ```
//! use lazy_combo_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//! let id = text_changed.connect(|text| println!("typed: {text}"));
//!
//! text_changed.emit("ali".to_string());
//! assert!(text_changed.disconnect(id));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle for one connected slot, used with [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of slots invoked with `&Args` on every emission.
///
/// Slots are snapshotted before they run, so a slot may connect or
/// disconnect on the signal that is calling it. A slot connected mid-emission
/// first runs on the next emission.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
        }
    }

    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Removes a slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        if slots.is_empty() {
            return;
        }
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");
        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.lock().len())
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_run_in_connection_order() {
        let failed = Signal::<String>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["status bar", "log pane"] {
            let log = log.clone();
            failed.connect(move |msg: &String| log.lock().push(format!("{name}: {msg}")));
        }
        failed.emit("directory offline".to_string());

        assert_eq!(
            *log.lock(),
            ["status bar: directory offline", "log pane: directory offline"]
        );
    }

    #[test]
    fn test_disconnected_slot_stops_receiving() {
        let opened = Signal::<()>::new();
        let count = Arc::new(Mutex::new(0));

        let sink = count.clone();
        let id = opened.connect(move |_| *sink.lock() += 1);

        opened.emit(());
        assert!(opened.disconnect(id));
        assert!(!opened.disconnect(id));
        opened.emit(());

        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_slot_may_disconnect_itself() {
        let signal = Arc::new(Signal::<()>::new());
        let calls = Arc::new(Mutex::new(0));
        let own_id: Arc<Mutex<Option<ConnectionId>>> = Arc::default();

        let weak = Arc::downgrade(&signal);
        let (id_cell, sink) = (own_id.clone(), calls.clone());
        let id = signal.connect(move |_| {
            *sink.lock() += 1;
            if let (Some(signal), Some(id)) = (weak.upgrade(), *id_cell.lock()) {
                signal.disconnect(id);
            }
        });
        *own_id.lock() = Some(id);

        signal.emit(());
        signal.emit(());

        assert_eq!(*calls.lock(), 1);
        assert_eq!(signal.connection_count(), 0);
    }
}
