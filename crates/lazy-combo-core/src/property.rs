//! Observable widget state.
//!
//! Every externally visible piece of selector state (items source, selected
//! item, typed text, loading flag and so on) lives in an
//! [`ObservableProperty`]. A write that changes the stored value emits
//! [`ObservableProperty::changed`] with the new value; a write of an equal
//! value is dropped without notification.
//!
//! ```
//! use lazy_combo_core::ObservableProperty;
//!
//! let editable = ObservableProperty::new(true);
//! editable.changed.connect(|value| println!("editable is now {value}"));
//!
//! assert!(editable.set(false));
//! assert!(!editable.set(false));
//! ```

use std::fmt;

use parking_lot::RwLock;

use crate::signal::Signal;

/// A value cell paired with a change signal.
///
/// Slots run after the write lock is released, so they may read the
/// property back or write to it again.
pub struct ObservableProperty<T> {
    value: RwLock<T>,
    /// Emitted with the new value after every effective change.
    pub changed: Signal<T>,
}

impl<T: Clone + PartialEq + 'static> ObservableProperty<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            changed: Signal::new(),
        }
    }

    /// Clones the current value out.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Borrows the current value for the duration of `f`.
    ///
    /// `f` must not write to this property.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Stores `value`, emitting `changed` when it differs from the current one.
    pub fn set(&self, value: T) -> bool {
        self.replace(value).is_some()
    }

    /// Like [`set`](Self::set), handing back the value that was replaced.
    pub fn replace(&self, value: T) -> Option<T> {
        let previous = {
            let mut slot = self.value.write();
            if *slot == value {
                return None;
            }
            std::mem::replace(&mut *slot, value.clone())
        };
        self.changed.emit(value);
        Some(previous)
    }

    /// Stores `value` without notifying anyone.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for ObservableProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObservableProperty")
            .field(&*self.value.read())
            .finish()
    }
}
