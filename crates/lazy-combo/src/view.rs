//! Items source and the cursor view over it.
//!
//! [`ItemsSource`] is the caller-owned candidate collection, shared by
//! reference. It may carry the ordering and grouping a caller's default view
//! would apply; [`ItemsView`] drops both, so the list always shows the
//! caller's data in the caller's order. [`ViewAdapter`] caches the view and
//! rebuilds it after [`reset`](ViewAdapter::reset).

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use lazy_combo_core::logging::targets;

/// Type alias for a default-view sort comparator.
pub type SortFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Type alias for a default-view grouping key.
pub type GroupFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// A caller-owned candidate collection.
///
/// Cloning is cheap and keeps the same backing storage. Two sources compare
/// equal only when they share that storage, so replacing the collection with
/// an identical copy still counts as a new source.
pub struct ItemsSource<T> {
    items: Arc<[T]>,
    sort: Option<SortFn<T>>,
    group: Option<GroupFn<T>>,
}

impl<T> ItemsSource<T> {
    /// Wrap a collection.
    pub fn new(items: impl Into<Arc<[T]>>) -> Self {
        Self {
            items: items.into(),
            sort: None,
            group: None,
        }
    }

    /// Attach a default-view ordering. The widget's view never applies it.
    pub fn with_default_sort<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Arc::new(compare));
        self
    }

    /// Attach a default-view grouping. The widget's view never applies it.
    pub fn with_default_grouping<F>(mut self, key: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.group = Some(Arc::new(key));
        self
    }

    /// The items in caller order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a default-view ordering is attached.
    pub fn has_default_sort(&self) -> bool {
        self.sort.is_some()
    }

    /// Whether a default-view grouping is attached.
    pub fn has_default_grouping(&self) -> bool {
        self.group.is_some()
    }

    /// Check whether both sources share the same backing collection.
    pub fn same_source(&self, other: &ItemsSource<T>) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T> Clone for ItemsSource<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            sort: self.sort.clone(),
            group: self.group.clone(),
        }
    }
}

impl<T> PartialEq for ItemsSource<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_source(other)
    }
}

impl<T> From<Vec<T>> for ItemsSource<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> From<Arc<[T]>> for ItemsSource<T> {
    fn from(items: Arc<[T]>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for ItemsSource<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> fmt::Debug for ItemsSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsSource")
            .field("len", &self.items.len())
            .field("default_sort", &self.sort.is_some())
            .field("default_grouping", &self.group.is_some())
            .finish()
    }
}

/// A normalized view over an [`ItemsSource`] with a current-item cursor.
///
/// The cursor is `None` (the "none" sentinel) until moved, and always `None`
/// for an empty collection. All moves wrap around the ends.
pub struct ItemsView<T> {
    items: Arc<[T]>,
    current: Option<usize>,
}

impl<T> ItemsView<T> {
    /// Build a view over `source`, ignoring its default ordering and grouping.
    pub fn new(source: &ItemsSource<T>) -> Self {
        if source.has_default_sort() || source.has_default_grouping() {
            tracing::trace!(
                target: targets::VIEW,
                sorted = source.has_default_sort(),
                grouped = source.has_default_grouping(),
                "clearing default view descriptors"
            );
        }
        Self {
            items: source.items.clone(),
            current: None,
        }
    }

    /// The items in caller order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the item at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// The cursor position.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The item under the cursor.
    pub fn current_item(&self) -> Option<&T> {
        self.current.and_then(|index| self.items.get(index))
    }

    /// Move the cursor to the first item.
    pub fn move_first(&mut self) -> Option<usize> {
        self.current = if self.is_empty() { None } else { Some(0) };
        self.current
    }

    /// Move the cursor to the last item.
    pub fn move_last(&mut self) -> Option<usize> {
        self.current = self.len().checked_sub(1);
        self.current
    }

    /// Move the cursor forward, wrapping from the last item to the first.
    pub fn move_next(&mut self) -> Option<usize> {
        self.current = match self.current {
            _ if self.is_empty() => None,
            Some(index) if index + 1 < self.len() => Some(index + 1),
            _ => Some(0),
        };
        self.current
    }

    /// Move the cursor back, wrapping from the first item to the last.
    pub fn move_previous(&mut self) -> Option<usize> {
        self.current = match self.current {
            _ if self.is_empty() => None,
            Some(index) if index > 0 => Some(index - 1),
            _ => self.len().checked_sub(1),
        };
        self.current
    }

    /// Put the cursor on `index`.
    ///
    /// Returns `false` and leaves the cursor alone if `index` is out of range.
    pub fn move_to(&mut self, index: usize) -> bool {
        if index < self.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }
}

impl<T: PartialEq> ItemsView<T> {
    /// Find the position of an item equal to `item`.
    pub fn position_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }
}

impl<T> fmt::Debug for ItemsView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsView")
            .field("len", &self.items.len())
            .field("current", &self.current)
            .finish()
    }
}

/// Lazily builds and caches the [`ItemsView`] for the current source.
pub struct ViewAdapter<T> {
    cached: Option<ItemsView<T>>,
}

impl<T> ViewAdapter<T> {
    /// Create an adapter with nothing cached.
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Get the view for `source`, building it if the cache was reset.
    ///
    /// Returns `None` when no source is attached.
    pub fn view(&mut self, source: Option<&ItemsSource<T>>) -> Option<&mut ItemsView<T>> {
        let source = source?;
        if self.cached.is_none() {
            tracing::trace!(target: targets::VIEW, len = source.len(), "building items view");
        }
        Some(self.cached.get_or_insert_with(|| ItemsView::new(source)))
    }

    /// Get the cached view without building one.
    pub fn cached(&self) -> Option<&ItemsView<T>> {
        self.cached.as_ref()
    }

    /// Drop the cached view. Call whenever the source reference changes.
    pub fn reset(&mut self) {
        if self.cached.take().is_some() {
            tracing::trace!(target: targets::VIEW, "items view reset");
        }
    }
}

impl<T> Default for ViewAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ViewAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewAdapter")
            .field("cached", &self.cached)
            .finish()
    }
}
