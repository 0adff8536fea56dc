//! The seam between the widget and the UI framework hosting it.

/// Operations the widget asks of its host framework.
///
/// The widget never renders or routes input itself. Hosts implement the
/// calls they can honor; every method defaults to doing nothing.
pub trait ComboHost {
    /// Move keyboard focus into the text input.
    fn focus_text_input(&mut self) {}

    /// Select all text in the text input.
    fn select_all_text(&mut self) {}

    /// Move keyboard focus to the widget itself.
    fn focus_widget(&mut self) {}

    /// Scroll the dropdown list so the item at `index` is visible.
    fn scroll_into_view(&mut self, index: usize) {
        let _ = index;
    }
}

/// A host that ignores every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl ComboHost for NullHost {}
