//! The interaction state machine.
//!
//! Pure logic over two flags, `dropdown_open` and `editing`. Each user action
//! is turned into an ordered list of [`Effect`]s that the widget carries out;
//! the machine itself never touches the view, the host or the lookup.
//!
//! # Example
//!
//! ```
//! use lazy_combo::interaction::{
//!     ComboAction, ComboKey, Effect, Environment, InteractionState, InteractionStateMachine,
//! };
//!
//! let mut machine = InteractionStateMachine::new();
//! let env = Environment { editable: true, has_view: true, has_current_item: false };
//!
//! let transition = machine.handle(ComboAction::Key(ComboKey::Down), env);
//! assert!(transition.handled);
//! assert_eq!(machine.state(), InteractionState::Open);
//! assert!(transition.effects.contains(&Effect::RaiseDropDownOpened));
//! ```

use lazy_combo_core::logging::targets;

/// Keys the widget reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComboKey {
    Home,
    End,
    Up,
    Down,
    Enter,
    Escape,
    /// Any key the widget does not handle.
    Other,
}

/// A cursor movement in the items view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    First,
    Last,
    Next,
    Previous,
}

/// A user action delivered to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboAction {
    /// The selected-item display area was activated (clicked).
    ActivateDisplay,
    /// The user changed the typed text.
    TextEdited,
    /// A key was pressed while the text input had focus.
    Key(ComboKey),
    /// The list's current item changed.
    ListCurrentChanged,
    /// An item in the list was clicked.
    ListClicked,
    /// The list lost focus.
    ListFocusLost,
    /// The text input lost focus.
    TextFocusLost,
    /// The open flag was set from outside (two-way binding).
    SetDropDownOpen(bool),
}

/// Something the widget must do in response to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The open flag changed to the given value.
    DropDownChanged(bool),
    /// The editing flag changed to the given value.
    EditingChanged(bool),
    /// Issue an asynchronous lookup for the typed text.
    InvokeLookup,
    /// Issue a synchronous lookup if no items source is attached.
    SyncLookupIfNoSource,
    /// Emit the dropdown-opened notification.
    RaiseDropDownOpened,
    /// Give keyboard focus to the widget itself.
    FocusWidget,
    /// Give keyboard focus to the text input.
    FocusTextInput,
    /// Select the whole typed text.
    SelectAllText,
    /// Move the view cursor.
    MoveCursor(CursorMove),
    /// Scroll the list so the current item is visible.
    ScrollIntoView,
    /// Make the current item the selected item.
    CommitCurrent,
}

/// Facts about the widget the machine needs but does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    /// Whether typing is allowed.
    pub editable: bool,
    /// Whether an items view exists (an items source is attached).
    pub has_view: bool,
    /// Whether the view cursor is on an item.
    pub has_current_item: bool,
}

/// Summary of the machine's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Closed,
    Open,
    /// Editing, with the dropdown open or closed.
    Editing,
}

/// The outcome of one action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transition {
    /// Effects to run, in order.
    pub effects: Vec<Effect>,
    /// Whether the action was consumed (for keys: suppress default handling).
    pub handled: bool,
}

/// State machine over the open and editing flags.
#[derive(Debug, Clone, Default)]
pub struct InteractionStateMachine {
    dropdown_open: bool,
    editing: bool,
}

impl InteractionStateMachine {
    /// Create a machine in the closed, not editing state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the dropdown is open.
    pub fn is_dropdown_open(&self) -> bool {
        self.dropdown_open
    }

    /// Whether the user is editing the text.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// The summarized state.
    pub fn state(&self) -> InteractionState {
        if self.editing {
            InteractionState::Editing
        } else if self.dropdown_open {
            InteractionState::Open
        } else {
            InteractionState::Closed
        }
    }

    /// Handle an action and return the effects to run.
    pub fn handle(&mut self, action: ComboAction, env: Environment) -> Transition {
        let mut transition = Transition::default();
        let effects = &mut transition.effects;

        transition.handled = match action {
            ComboAction::ActivateDisplay => {
                if env.editable {
                    self.set_editing(true, effects);
                    effects.push(Effect::FocusTextInput);
                    effects.push(Effect::SelectAllText);
                } else {
                    let open = !self.dropdown_open;
                    self.set_open(open, effects);
                }
                true
            }
            ComboAction::TextEdited => {
                effects.push(Effect::InvokeLookup);
                self.set_open(true, effects);
                true
            }
            ComboAction::Key(key) => self.handle_key(key, env, effects),
            ComboAction::ListCurrentChanged => {
                if env.has_current_item {
                    effects.push(Effect::CommitCurrent);
                }
                true
            }
            ComboAction::ListClicked => {
                if env.has_current_item {
                    effects.push(Effect::CommitCurrent);
                }
                self.set_open(false, effects);
                true
            }
            ComboAction::ListFocusLost => {
                self.set_open(false, effects);
                true
            }
            ComboAction::TextFocusLost => {
                self.set_editing(false, effects);
                true
            }
            ComboAction::SetDropDownOpen(open) => {
                self.set_open(open, effects);
                true
            }
        };

        tracing::trace!(
            target: targets::INTERACTION,
            ?action,
            state = ?self.state(),
            effects = transition.effects.len(),
            handled = transition.handled,
            "action handled"
        );
        transition
    }

    fn handle_key(&mut self, key: ComboKey, env: Environment, effects: &mut Vec<Effect>) -> bool {
        if !env.has_view {
            return false;
        }
        let movement = match key {
            ComboKey::Home => CursorMove::First,
            ComboKey::End => CursorMove::Last,
            ComboKey::Down => CursorMove::Next,
            ComboKey::Up => CursorMove::Previous,
            ComboKey::Enter => {
                if !env.has_current_item {
                    return false;
                }
                effects.push(Effect::CommitCurrent);
                self.set_open(false, effects);
                return true;
            }
            ComboKey::Escape => {
                if !self.dropdown_open {
                    return false;
                }
                self.set_open(false, effects);
                return true;
            }
            ComboKey::Other => return false,
        };
        self.set_open(true, effects);
        effects.push(Effect::MoveCursor(movement));
        effects.push(Effect::ScrollIntoView);
        true
    }

    fn set_open(&mut self, open: bool, effects: &mut Vec<Effect>) {
        if self.dropdown_open == open {
            return;
        }
        self.dropdown_open = open;
        effects.push(Effect::DropDownChanged(open));
        if open {
            effects.push(Effect::SyncLookupIfNoSource);
            effects.push(Effect::RaiseDropDownOpened);
            if !self.editing {
                effects.push(Effect::FocusWidget);
            }
        }
    }

    fn set_editing(&mut self, editing: bool, effects: &mut Vec<Effect>) {
        if self.editing != editing {
            self.editing = editing;
            effects.push(Effect::EditingChanged(editing));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITH_VIEW: Environment = Environment {
        editable: true,
        has_view: true,
        has_current_item: false,
    };

    const WITH_CURRENT: Environment = Environment {
        editable: true,
        has_view: true,
        has_current_item: true,
    };

    #[test]
    fn test_initial_state() {
        let machine = InteractionStateMachine::new();
        assert_eq!(machine.state(), InteractionState::Closed);
        assert!(!machine.is_dropdown_open());
        assert!(!machine.is_editing());
    }

    #[test]
    fn test_activate_editable_enters_editing() {
        let mut machine = InteractionStateMachine::new();
        let transition = machine.handle(ComboAction::ActivateDisplay, WITH_VIEW);
        assert_eq!(
            transition.effects,
            vec![
                Effect::EditingChanged(true),
                Effect::FocusTextInput,
                Effect::SelectAllText
            ]
        );
        assert_eq!(machine.state(), InteractionState::Editing);
    }

    #[test]
    fn test_activate_read_only_toggles_open() {
        let mut machine = InteractionStateMachine::new();
        let env = Environment {
            editable: false,
            ..WITH_VIEW
        };

        let opened = machine.handle(ComboAction::ActivateDisplay, env);
        assert_eq!(
            opened.effects,
            vec![
                Effect::DropDownChanged(true),
                Effect::SyncLookupIfNoSource,
                Effect::RaiseDropDownOpened,
                Effect::FocusWidget
            ]
        );

        let closed = machine.handle(ComboAction::ActivateDisplay, env);
        assert_eq!(closed.effects, vec![Effect::DropDownChanged(false)]);
        assert_eq!(machine.state(), InteractionState::Closed);
    }

    #[test]
    fn test_text_edit_looks_up_then_opens() {
        let mut machine = InteractionStateMachine::new();
        machine.handle(ComboAction::ActivateDisplay, WITH_VIEW);

        let transition = machine.handle(ComboAction::TextEdited, WITH_VIEW);
        // Editing, so focus stays in the text input.
        assert_eq!(
            transition.effects,
            vec![
                Effect::InvokeLookup,
                Effect::DropDownChanged(true),
                Effect::SyncLookupIfNoSource,
                Effect::RaiseDropDownOpened
            ]
        );

        let again = machine.handle(ComboAction::TextEdited, WITH_VIEW);
        assert_eq!(again.effects, vec![Effect::InvokeLookup]);
    }

    #[test]
    fn test_navigation_requires_view() {
        let mut machine = InteractionStateMachine::new();
        let transition = machine.handle(ComboAction::Key(ComboKey::Down), Environment::default());
        assert!(!transition.handled);
        assert!(transition.effects.is_empty());
        assert!(!machine.is_dropdown_open());
    }

    #[test]
    fn test_navigation_keys_open_and_move() {
        let mut machine = InteractionStateMachine::new();
        let down = machine.handle(ComboAction::Key(ComboKey::Down), WITH_VIEW);
        assert!(down.handled);
        assert_eq!(
            &down.effects[down.effects.len() - 2..],
            &[Effect::MoveCursor(CursorMove::Next), Effect::ScrollIntoView]
        );

        for (key, movement) in [
            (ComboKey::Home, CursorMove::First),
            (ComboKey::End, CursorMove::Last),
            (ComboKey::Up, CursorMove::Previous),
        ] {
            let transition = machine.handle(ComboAction::Key(key), WITH_VIEW);
            assert_eq!(
                transition.effects,
                vec![Effect::MoveCursor(movement), Effect::ScrollIntoView]
            );
        }
    }

    #[test]
    fn test_enter_commits_and_closes() {
        let mut machine = InteractionStateMachine::new();
        machine.handle(ComboAction::SetDropDownOpen(true), WITH_CURRENT);

        let transition = machine.handle(ComboAction::Key(ComboKey::Enter), WITH_CURRENT);
        assert!(transition.handled);
        assert_eq!(
            transition.effects,
            vec![Effect::CommitCurrent, Effect::DropDownChanged(false)]
        );
    }

    #[test]
    fn test_enter_without_current_is_noop() {
        let mut machine = InteractionStateMachine::new();
        machine.handle(ComboAction::SetDropDownOpen(true), WITH_VIEW);

        let transition = machine.handle(ComboAction::Key(ComboKey::Enter), WITH_VIEW);
        assert!(!transition.handled);
        assert!(transition.effects.is_empty());
        assert!(machine.is_dropdown_open());
    }

    #[test]
    fn test_escape_closes_only_when_open() {
        let mut machine = InteractionStateMachine::new();
        assert!(!machine.handle(ComboAction::Key(ComboKey::Escape), WITH_VIEW).handled);

        machine.handle(ComboAction::SetDropDownOpen(true), WITH_VIEW);
        let transition = machine.handle(ComboAction::Key(ComboKey::Escape), WITH_VIEW);
        assert!(transition.handled);
        assert_eq!(transition.effects, vec![Effect::DropDownChanged(false)]);
    }

    #[test]
    fn test_list_actions() {
        let mut machine = InteractionStateMachine::new();
        machine.handle(ComboAction::SetDropDownOpen(true), WITH_CURRENT);

        let changed = machine.handle(ComboAction::ListCurrentChanged, WITH_CURRENT);
        assert_eq!(changed.effects, vec![Effect::CommitCurrent]);
        assert!(machine.is_dropdown_open());

        let clicked = machine.handle(ComboAction::ListClicked, WITH_CURRENT);
        assert_eq!(
            clicked.effects,
            vec![Effect::CommitCurrent, Effect::DropDownChanged(false)]
        );

        machine.handle(ComboAction::SetDropDownOpen(true), WITH_CURRENT);
        let lost = machine.handle(ComboAction::ListFocusLost, WITH_CURRENT);
        assert_eq!(lost.effects, vec![Effect::DropDownChanged(false)]);
    }

    #[test]
    fn test_text_focus_lost_leaves_editing() {
        let mut machine = InteractionStateMachine::new();
        machine.handle(ComboAction::ActivateDisplay, WITH_VIEW);
        machine.handle(ComboAction::TextEdited, WITH_VIEW);
        assert_eq!(machine.state(), InteractionState::Editing);

        let transition = machine.handle(ComboAction::TextFocusLost, WITH_VIEW);
        assert_eq!(transition.effects, vec![Effect::EditingChanged(false)]);
        assert_eq!(machine.state(), InteractionState::Open);
    }

    #[test]
    fn test_other_keys_unhandled() {
        let mut machine = InteractionStateMachine::new();
        let transition = machine.handle(ComboAction::Key(ComboKey::Other), WITH_CURRENT);
        assert!(!transition.handled);
    }
}
