//! The LazyComboBox widget.
//!
//! A selector whose candidate list is not preloaded. Typing issues a lookup
//! through a caller-supplied routine; whatever the most recent lookup posts
//! becomes the list. Lookups still running when new input arrives are
//! cancelled, and only the latest one can change what the widget shows.
//!
//! # Example
//!
//! ```
//! use lazy_combo::{ComboKey, LazyComboBox};
//!
//! let mut combo = LazyComboBox::<String>::new().with_lookup(|ctx| {
//!     let names = ["alice", "alina", "bob"];
//!     let matches: Vec<String> = names
//!         .iter()
//!         .filter(|name| name.starts_with(ctx.input()))
//!         .map(|name| name.to_string())
//!         .collect();
//!     ctx.post_items(matches);
//!     Ok(())
//! });
//!
//! combo.activate_display().unwrap();
//! combo.set_text("ali").unwrap();
//! assert!(combo.wait_for_lookups(std::time::Duration::from_secs(5)));
//! combo.process_pending();
//!
//! combo.handle_key(ComboKey::Down).unwrap();
//! combo.handle_key(ComboKey::Enter).unwrap();
//! assert_eq!(combo.selected_item().as_deref(), Some("alice"));
//! assert!(!combo.is_dropdown_open());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use lazy_combo_core::logging::{span_names, targets};
use lazy_combo_core::{ObservableProperty, Signal, ThreadPool, UiContext, UiDispatcher};

use crate::config::ComboConfig;
use crate::error::{LookupError, Result};
use crate::host::{ComboHost, NullHost};
use crate::interaction::{
    ComboAction, ComboKey, CursorMove, Effect, Environment, InteractionState,
    InteractionStateMachine,
};
use crate::item::ComboItem;
use crate::lookup::{LookupContext, LookupCoordinator, LookupMode, LookupPool, LookupTag};
use crate::sync::TextSelectionSync;
use crate::view::{ItemsSource, ItemsView, ViewAdapter};

// ============================================================================
// Properties and Style
// ============================================================================

/// Identifies a widget property in [`LazyComboBox::property_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComboProperty {
    ItemsSource,
    /// The items view was invalidated and will be rebuilt on next access.
    ItemsView,
    SelectedItem,
    Text,
    DisplayText,
    Loading,
    DropDownOpen,
    Editing,
    TextMember,
    Editable,
    Style,
}

/// Named style hooks handed through to the host's renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComboStyle {
    /// Style for the dropdown toggle button.
    pub drop_down_button: Option<String>,
    /// Style for the border around the popup.
    pub popup_border: Option<String>,
    /// Style for the candidate list.
    pub list: Option<String>,
    /// Style for the text input.
    pub text_input: Option<String>,
}

// ============================================================================
// LazyComboBox Widget
// ============================================================================

/// A selector widget backed by an on-demand, cancellable lookup.
///
/// All state belongs to the thread that created the widget (the UI context).
/// Lookup results produced on worker threads are applied by
/// [`process_pending`](Self::process_pending), which the UI loop must call.
///
/// # Signals
///
/// - `property_changed(ComboProperty)`: Emitted after any property changes
/// - `dropdown_opened()`: Emitted when the dropdown opens
/// - `lookup_failed(String)`: Emitted when the latest async lookup failed
pub struct LazyComboBox<T: ComboItem> {
    /// UI-context queue lookups deliver to.
    ui: UiContext,

    /// Issues and cancels lookups.
    coordinator: LookupCoordinator<T>,

    /// Text/selection rules.
    sync: TextSelectionSync,

    /// Cached view over the items source.
    view: ViewAdapter<T>,

    /// Open/editing flags.
    machine: InteractionStateMachine,

    /// Host framework callbacks.
    host: Box<dyn ComboHost>,

    items_source: ObservableProperty<Option<ItemsSource<T>>>,
    selected_item: ObservableProperty<Option<T>>,
    text: ObservableProperty<String>,
    display_text: ObservableProperty<String>,
    dropdown_open: ObservableProperty<bool>,
    editing: ObservableProperty<bool>,
    text_member: ObservableProperty<Option<String>>,
    editable: ObservableProperty<bool>,
    style: ObservableProperty<ComboStyle>,

    // Signals
    /// Signal emitted after any property changes.
    pub property_changed: Arc<Signal<ComboProperty>>,
    /// Signal emitted when the dropdown opens.
    pub dropdown_opened: Signal<()>,
    /// Signal emitted with the error message of a failed async lookup.
    pub lookup_failed: Signal<String>,
}

impl<T: ComboItem> LazyComboBox<T> {
    /// Create a widget bound to the current thread, using the global lookup pool.
    pub fn new() -> Self {
        let ui = UiContext::new();
        let coordinator = LookupCoordinator::new(ui.dispatcher());
        let property_changed = Arc::new(Signal::new());

        let forward = Arc::downgrade(&property_changed);
        coordinator.loading().changed.connect(move |_| {
            if let Some(signal) = forward.upgrade() {
                signal.emit(ComboProperty::Loading);
            }
        });

        Self {
            ui,
            coordinator,
            sync: TextSelectionSync::new(None),
            view: ViewAdapter::new(),
            machine: InteractionStateMachine::new(),
            host: Box::new(NullHost),
            items_source: ObservableProperty::new(None),
            selected_item: ObservableProperty::new(None),
            text: ObservableProperty::new(String::new()),
            display_text: ObservableProperty::new(String::new()),
            dropdown_open: ObservableProperty::new(false),
            editing: ObservableProperty::new(false),
            text_member: ObservableProperty::new(None),
            editable: ObservableProperty::new(true),
            style: ObservableProperty::new(ComboStyle::default()),
            property_changed,
            dropdown_opened: Signal::new(),
            lookup_failed: Signal::new(),
        }
    }

    /// Create a widget from a [`ComboConfig`].
    ///
    /// Starts a dedicated lookup pool when the config asks for one.
    pub fn with_config(config: &ComboConfig) -> Result<Self> {
        let mut combo = Self::new().with_editable(config.editable);
        if let Some(member) = &config.text_member {
            combo.set_text_member(Some(member.clone()))?;
        }
        if let Some(pool_config) = config.thread_pool_config() {
            let pool = ThreadPool::new(pool_config)?;
            combo.set_lookup_pool(LookupPool::Dedicated(Arc::new(pool)));
        }
        Ok(combo)
    }

    fn debug_assert_ui_thread(&self) {
        self.ui.affinity().debug_assert_same_thread();
    }

    fn notify(&self, property: ComboProperty) {
        tracing::trace!(target: targets::SYNC, ?property, "property changed");
        self.property_changed.emit(property);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Set the lookup routine.
    ///
    /// The routine receives a [`LookupContext`] for the typed text and posts
    /// its candidates with [`LookupContext::post_items`].
    pub fn set_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(LookupContext<T>) -> std::result::Result<(), LookupError> + Send + Sync + 'static,
    {
        self.coordinator.set_callback(lookup);
    }

    /// Set the lookup routine using builder pattern.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(LookupContext<T>) -> std::result::Result<(), LookupError> + Send + Sync + 'static,
    {
        self.set_lookup(lookup);
        self
    }

    /// Remove the lookup routine. Lookups become no-ops.
    pub fn clear_lookup(&mut self) {
        self.coordinator.set_callback_fn(None);
    }

    /// Set the pool asynchronous lookups run on.
    pub fn set_lookup_pool(&mut self, pool: LookupPool) {
        self.coordinator.set_pool(pool);
    }

    /// Set the lookup pool using builder pattern.
    pub fn with_lookup_pool(mut self, pool: LookupPool) -> Self {
        self.set_lookup_pool(pool);
        self
    }

    /// Whether a lookup call is in progress.
    pub fn is_loading(&self) -> bool {
        self.coordinator.loading().get()
    }

    /// Signal emitted when the loading indicator changes.
    pub fn loading_changed(&self) -> &Signal<bool> {
        &self.coordinator.loading().changed
    }

    /// The continuation tag the next lookup will receive.
    pub fn retained_tag(&self) -> Option<LookupTag> {
        self.coordinator.retained_tag()
    }

    /// Cancel the outstanding lookup without issuing a new one.
    pub fn cancel_lookup(&mut self) {
        self.debug_assert_ui_thread();
        self.coordinator.cancel();
    }

    /// Block until every asynchronous lookup issued so far has returned.
    ///
    /// Returns `false` if `timeout` elapsed first. Results still need
    /// [`process_pending`](Self::process_pending) to be applied.
    pub fn wait_for_lookups(&mut self, timeout: Duration) -> bool {
        self.coordinator.wait_idle(timeout)
    }

    /// A handle for posting closures to this widget's UI context.
    pub fn dispatcher(&self) -> UiDispatcher {
        self.ui.dispatcher()
    }

    /// Apply everything lookups delivered since the last call.
    ///
    /// Runs queued closures, attaches the newest posted collection, and
    /// reports the newest async failure. Returns the number of items handled.
    pub fn process_pending(&mut self) -> usize {
        self.debug_assert_ui_thread();
        let span = tracing::trace_span!(target: targets::LOOKUP, span_names::PROCESS_PENDING);
        let _entered = span.enter();

        let mut handled = self.ui.process_pending();
        handled += self.apply_lookup_results();
        if let Some(failure) = self.coordinator.take_failure() {
            self.lookup_failed.emit(failure.value.to_string());
            handled += 1;
        }
        handled
    }

    fn apply_lookup_results(&mut self) -> usize {
        match self.coordinator.take_items() {
            Some(posted) => {
                tracing::debug!(
                    target: targets::LOOKUP,
                    generation = posted.generation,
                    items = posted.value.len(),
                    "applying lookup results"
                );
                self.set_items_source(Some(posted.value));
                1
            }
            None => 0,
        }
    }

    fn run_lookup(&mut self, mode: LookupMode) -> Result<()> {
        let input = self.text.get();
        let issued = self.coordinator.invoke(&input, mode)?;
        if issued.is_some() && mode == LookupMode::Sync {
            self.apply_lookup_results();
        }
        Ok(())
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// The attached candidate collection.
    pub fn items_source(&self) -> Option<ItemsSource<T>> {
        self.items_source.get()
    }

    /// Attach or detach the candidate collection.
    ///
    /// The items view is rebuilt, and a selection that also exists in the new
    /// collection is kept and its display text refreshed.
    pub fn set_items_source(&mut self, source: Option<ItemsSource<T>>) {
        self.debug_assert_ui_thread();
        if !self.items_source.set(source) {
            return;
        }
        self.notify(ComboProperty::ItemsSource);
        self.view.reset();
        self.notify(ComboProperty::ItemsView);
        self.resync_selection();
    }

    /// Set the items source using builder pattern.
    pub fn with_items_source(mut self, source: impl Into<ItemsSource<T>>) -> Self {
        self.set_items_source(Some(source.into()));
        self
    }

    /// Signal emitted when the items source changes.
    pub fn items_source_changed(&self) -> &Signal<Option<ItemsSource<T>>> {
        &self.items_source.changed
    }

    /// The view over the items source, built on first access.
    pub fn items_view(&mut self) -> Option<&ItemsView<T>> {
        let source = self.items_source.get();
        self.view.view(source.as_ref()).map(|view| &*view)
    }

    /// The item under the view cursor.
    pub fn current_item(&mut self) -> Option<T> {
        self.items_view()?.current_item().cloned()
    }

    fn resync_selection(&mut self) {
        let Some(selected) = self.selected_item.get() else {
            return;
        };
        let source = self.items_source.get();
        let Some(view) = self.view.view(source.as_ref()) else {
            return;
        };
        let Some(found) = self.sync.on_items_source_replaced(&selected, view) else {
            return;
        };

        self.selected_item.set_silent(Some(found.clone()));
        let text = self.sync.on_selection_changed(Some(&found));
        if !self.machine.is_editing() {
            let _write = self.sync.programmatic_write();
            self.write_text(text.clone());
        }
        self.set_display_text(text);
    }

    // =========================================================================
    // Selection and Text
    // =========================================================================

    /// The committed selection.
    pub fn selected_item(&self) -> Option<T> {
        self.selected_item.get()
    }

    /// Assign the selection.
    ///
    /// The typed and display text follow the selection. With no items source
    /// attached, a synchronous lookup for the new text runs afterwards; its
    /// error is returned, and the assignment stays in place.
    pub fn set_selected_item(&mut self, item: Option<T>) -> Result<()> {
        self.debug_assert_ui_thread();
        let manual = item.is_some() && self.items_source.with(Option::is_none);
        if manual {
            self.update_typed_text(item.as_ref());
        }
        self.commit_selection(item);
        if manual {
            self.run_lookup(LookupMode::Sync)?;
        }
        Ok(())
    }

    /// Set the selection using builder pattern.
    pub fn with_selected_item(mut self, item: T) -> Result<Self> {
        self.set_selected_item(Some(item))?;
        Ok(self)
    }

    /// Signal emitted when the selection changes.
    pub fn selected_item_changed(&self) -> &Signal<Option<T>> {
        &self.selected_item.changed
    }

    fn commit_selection(&mut self, item: Option<T>) {
        if self.selected_item.set(item) {
            self.notify(ComboProperty::SelectedItem);
            let selected = self.selected_item.get();
            self.update_typed_text(selected.as_ref());
        }
    }

    fn commit_current(&mut self) -> Result<()> {
        if let Some(item) = self.current_item() {
            tracing::debug!(target: targets::INTERACTION, item = %item, "committing current item");
            self.set_selected_item(Some(item))?;
        }
        Ok(())
    }

    /// The typed text.
    pub fn text(&self) -> String {
        self.text.get()
    }

    /// Change the typed text as the user would.
    ///
    /// A change issues an asynchronous lookup and opens the dropdown.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.debug_assert_ui_thread();
        if self.write_text(text.into()) {
            self.dispatch(ComboAction::TextEdited)?;
        }
        Ok(())
    }

    /// Signal emitted when the typed text changes.
    pub fn text_changed(&self) -> &Signal<String> {
        &self.text.changed
    }

    /// Write the typed text. Returns `true` if the change is user-originated.
    fn write_text(&mut self, text: String) -> bool {
        if !self.text.set(text) {
            return false;
        }
        self.notify(ComboProperty::Text);
        self.text.with(|text| self.sync.on_text_changed(text))
    }

    fn update_typed_text(&mut self, item: Option<&T>) {
        let text = self.sync.on_selection_changed(item);
        {
            let _write = self.sync.programmatic_write();
            self.write_text(text.clone());
        }
        self.set_display_text(text);
    }

    /// The text shown for the selection.
    pub fn display_text(&self) -> String {
        self.display_text.get()
    }

    /// Signal emitted when the display text changes.
    pub fn display_text_changed(&self) -> &Signal<String> {
        &self.display_text.changed
    }

    fn set_display_text(&mut self, text: String) {
        if self.display_text.set(text) {
            self.notify(ComboProperty::DisplayText);
        }
    }

    /// The item member shown as text.
    pub fn text_member(&self) -> Option<String> {
        self.text_member.get()
    }

    /// Change the item member shown as text.
    ///
    /// The display text of the current selection is recomputed. The typed
    /// text follows only when the user is not editing.
    pub fn set_text_member(&mut self, member: Option<String>) -> Result<()> {
        self.debug_assert_ui_thread();
        if !self.text_member.set(member.clone()) {
            return Ok(());
        }
        self.sync.set_text_member(member);
        self.notify(ComboProperty::TextMember);

        let Some(selected) = self.selected_item.get() else {
            return Ok(());
        };
        if self.machine.is_editing() {
            let text = self.sync.on_selection_changed(Some(&selected));
            self.set_display_text(text);
        } else {
            self.update_typed_text(Some(&selected));
        }
        Ok(())
    }

    /// Set the text member using builder pattern.
    pub fn with_text_member(mut self, member: impl Into<String>) -> Self {
        let member = member.into();
        self.sync.set_text_member(Some(member.clone()));
        self.text_member.set_silent(Some(member));
        self
    }

    // =========================================================================
    // Appearance and Flags
    // =========================================================================

    /// Whether the user may type.
    pub fn is_editable(&self) -> bool {
        self.editable.get()
    }

    /// Allow or forbid typing.
    pub fn set_editable(&mut self, editable: bool) {
        self.debug_assert_ui_thread();
        if self.editable.set(editable) {
            self.notify(ComboProperty::Editable);
        }
    }

    /// Set editability using builder pattern.
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.set_editable(editable);
        self
    }

    /// The style hooks.
    pub fn style(&self) -> ComboStyle {
        self.style.get()
    }

    /// Replace the style hooks.
    pub fn set_style(&mut self, style: ComboStyle) {
        if self.style.set(style) {
            self.notify(ComboProperty::Style);
        }
    }

    /// Set style hooks using builder pattern.
    pub fn with_style(mut self, style: ComboStyle) -> Self {
        self.set_style(style);
        self
    }

    /// Set the host framework callbacks.
    pub fn set_host(&mut self, host: Box<dyn ComboHost>) {
        self.host = host;
    }

    /// Set the host using builder pattern.
    pub fn with_host(mut self, host: impl ComboHost + 'static) -> Self {
        self.set_host(Box::new(host));
        self
    }

    /// Whether the dropdown is open.
    pub fn is_dropdown_open(&self) -> bool {
        self.dropdown_open.get()
    }

    /// Open or close the dropdown from outside.
    pub fn set_dropdown_open(&mut self, open: bool) -> Result<()> {
        self.debug_assert_ui_thread();
        self.dispatch(ComboAction::SetDropDownOpen(open))?;
        Ok(())
    }

    /// Signal emitted when the open flag changes.
    pub fn dropdown_open_changed(&self) -> &Signal<bool> {
        &self.dropdown_open.changed
    }

    /// Whether the user is editing the text.
    pub fn is_editing(&self) -> bool {
        self.editing.get()
    }

    /// Signal emitted when the editing flag changes.
    pub fn editing_changed(&self) -> &Signal<bool> {
        &self.editing.changed
    }

    /// The summarized interaction state.
    pub fn interaction_state(&self) -> InteractionState {
        self.machine.state()
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// The selected-item display area was clicked.
    pub fn activate_display(&mut self) -> Result<()> {
        self.debug_assert_ui_thread();
        self.dispatch(ComboAction::ActivateDisplay)?;
        Ok(())
    }

    /// A key was pressed in the text input. Returns whether it was handled.
    pub fn handle_key(&mut self, key: ComboKey) -> Result<bool> {
        self.debug_assert_ui_thread();
        self.dispatch(ComboAction::Key(key))
    }

    /// The list moved its current item to `index` (hover or selection).
    pub fn set_list_current(&mut self, index: usize) -> Result<()> {
        self.debug_assert_ui_thread();
        self.move_cursor_to(index)
    }

    /// An item in the list was clicked.
    pub fn click_list_item(&mut self, index: usize) -> Result<()> {
        self.debug_assert_ui_thread();
        self.move_cursor_to(index)?;
        self.dispatch(ComboAction::ListClicked)?;
        Ok(())
    }

    /// The list lost keyboard focus.
    pub fn list_focus_lost(&mut self) -> Result<()> {
        self.dispatch(ComboAction::ListFocusLost)?;
        Ok(())
    }

    /// The text input lost keyboard focus.
    pub fn text_focus_lost(&mut self) -> Result<()> {
        self.dispatch(ComboAction::TextFocusLost)?;
        Ok(())
    }

    fn environment(&mut self) -> Environment {
        let editable = self.editable.get();
        let source = self.items_source.get();
        let (has_view, has_current_item) = match self.view.view(source.as_ref()) {
            Some(view) => (true, view.current_item().is_some()),
            None => (false, false),
        };
        Environment {
            editable,
            has_view,
            has_current_item,
        }
    }

    fn dispatch(&mut self, action: ComboAction) -> Result<bool> {
        let env = self.environment();
        let transition = self.machine.handle(action, env);
        for effect in transition.effects {
            self.apply_effect(effect)?;
        }
        Ok(transition.handled)
    }

    fn apply_effect(&mut self, effect: Effect) -> Result<()> {
        match effect {
            Effect::DropDownChanged(open) => {
                if self.dropdown_open.set(open) {
                    self.notify(ComboProperty::DropDownOpen);
                }
            }
            Effect::EditingChanged(editing) => {
                if self.editing.set(editing) {
                    self.notify(ComboProperty::Editing);
                }
            }
            Effect::InvokeLookup => self.run_lookup(LookupMode::Async)?,
            Effect::SyncLookupIfNoSource => {
                if self.items_source.with(Option::is_none) {
                    self.run_lookup(LookupMode::Sync)?;
                }
            }
            Effect::RaiseDropDownOpened => self.dropdown_opened.emit(()),
            Effect::FocusWidget => self.host.focus_widget(),
            Effect::FocusTextInput => self.host.focus_text_input(),
            Effect::SelectAllText => self.host.select_all_text(),
            Effect::MoveCursor(movement) => self.move_cursor(movement)?,
            Effect::ScrollIntoView => {
                if let Some(index) = self.items_view().and_then(ItemsView::current_index) {
                    self.host.scroll_into_view(index);
                }
            }
            Effect::CommitCurrent => self.commit_current()?,
        }
        Ok(())
    }

    fn move_cursor(&mut self, movement: CursorMove) -> Result<()> {
        let source = self.items_source.get();
        let Some(view) = self.view.view(source.as_ref()) else {
            return Ok(());
        };
        let before = view.current_index();
        let after = match movement {
            CursorMove::First => view.move_first(),
            CursorMove::Last => view.move_last(),
            CursorMove::Next => view.move_next(),
            CursorMove::Previous => view.move_previous(),
        };
        tracing::trace!(target: targets::VIEW, ?movement, ?before, ?after, "cursor moved");
        if after != before {
            self.dispatch(ComboAction::ListCurrentChanged)?;
        }
        Ok(())
    }

    fn move_cursor_to(&mut self, index: usize) -> Result<()> {
        let source = self.items_source.get();
        let Some(view) = self.view.view(source.as_ref()) else {
            return Ok(());
        };
        let before = view.current_index();
        if view.move_to(index) && before != Some(index) {
            self.dispatch(ComboAction::ListCurrentChanged)?;
        }
        Ok(())
    }
}

impl<T: ComboItem> Default for LazyComboBox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ComboItem> fmt::Debug for LazyComboBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyComboBox")
            .field("text", &self.text.get())
            .field("display_text", &self.display_text.get())
            .field("state", &self.machine.state())
            .field("has_items_source", &self.items_source.with(Option::is_some))
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
