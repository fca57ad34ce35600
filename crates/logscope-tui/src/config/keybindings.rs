use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use logscope_client::ClearTarget;

use crate::app::Action;

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn shift(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::SHIFT,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Context for keybindings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    LogViewer,
    FilterInput,
    /// A yes/no question is pending
    Confirm,
}

/// Keybinding configuration
pub struct KeyBindings {
    bindings: HashMap<KeyContext, HashMap<KeyBinding, Action>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        let mut global = HashMap::new();
        global.insert(KeyBinding::new(KeyCode::Char('?')), Action::ToggleHelp);
        global.insert(KeyBinding::new(KeyCode::Esc), Action::DismissError);
        global.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        global.insert(KeyBinding::new(KeyCode::Char('q')), Action::Quit);
        bindings.insert(KeyContext::Global, global);

        // less-like navigation
        let mut log_viewer = HashMap::new();
        log_viewer.insert(KeyBinding::new(KeyCode::Char('j')), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Down), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Char('k')), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Up), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('f')), Action::PageDown);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('b')), Action::PageUp);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('d')), Action::PageDown);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::PageUp);
        log_viewer.insert(KeyBinding::new(KeyCode::PageDown), Action::PageDown);
        log_viewer.insert(KeyBinding::new(KeyCode::PageUp), Action::PageUp);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('g')), Action::ScrollToTop);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('G')), Action::ScrollToBottom);
        log_viewer.insert(KeyBinding::new(KeyCode::Home), Action::ScrollToTop);
        log_viewer.insert(KeyBinding::new(KeyCode::End), Action::ScrollToBottom);

        log_viewer.insert(KeyBinding::new(KeyCode::Tab), Action::NextView);
        log_viewer.insert(KeyBinding::shift(KeyCode::BackTab), Action::PrevView);
        log_viewer.insert(KeyBinding::new(KeyCode::BackTab), Action::PrevView);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('p')), Action::TogglePause);
        log_viewer.insert(KeyBinding::new(KeyCode::Char(' ')), Action::TogglePause);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('f')), Action::ToggleAutoScroll);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('t')), Action::ToggleTimestamps);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('s')), Action::ToggleStats);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('W')), Action::ToggleWatches);

        log_viewer.insert(KeyBinding::new(KeyCode::Char('/')), Action::OpenSearch);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('n')), Action::ClearFilter);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('i')), Action::ToggleCaseSensitive);

        log_viewer.insert(
            KeyBinding::new(KeyCode::Char('c')),
            Action::Clear(ClearTarget::Log),
        );
        log_viewer.insert(
            KeyBinding::new(KeyCode::Char('w')),
            Action::Clear(ClearTarget::Watches),
        );
        log_viewer.insert(
            KeyBinding::new(KeyCode::Char('x')),
            Action::Clear(ClearTarget::All),
        );
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('R')), Action::Reconnect);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('L')), Action::ReloadSettings);
        bindings.insert(KeyContext::LogViewer, log_viewer);

        let mut confirm = HashMap::new();
        confirm.insert(KeyBinding::new(KeyCode::Char('y')), Action::ConfirmClear);
        confirm.insert(KeyBinding::shift(KeyCode::Char('Y')), Action::ConfirmClear);
        confirm.insert(KeyBinding::new(KeyCode::Enter), Action::ConfirmClear);
        bindings.insert(KeyContext::Confirm, confirm);

        // Filter input bindings (when the quick filter bar is open)
        let mut filter_input = HashMap::new();
        filter_input.insert(KeyBinding::new(KeyCode::Enter), Action::ApplyFilter);
        filter_input.insert(KeyBinding::new(KeyCode::Esc), Action::CloseSearch);
        filter_input.insert(KeyBinding::new(KeyCode::Backspace), Action::SearchBackspace);
        filter_input.insert(KeyBinding::new(KeyCode::Tab), Action::ToggleSearchMode);
        filter_input.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::SearchClear);
        filter_input.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::CloseSearch);
        bindings.insert(KeyContext::FilterInput, filter_input);

        Self { bindings }
    }

    /// Look up action for key event in given context
    pub fn get_action(&self, context: KeyContext, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        if let Some(action) = self
            .bindings
            .get(&context)
            .and_then(|context_bindings| context_bindings.get(&binding))
        {
            return Some(action.clone());
        }

        self.bindings
            .get(&KeyContext::Global)?
            .get(&binding)
            .cloned()
    }

    /// Answer a pending question; any key other than a yes cancels it
    pub fn get_confirm_action(&self, key: &KeyEvent) -> Action {
        self.bindings
            .get(&KeyContext::Confirm)
            .and_then(|confirm| confirm.get(&KeyBinding::from_event(key)))
            .cloned()
            .unwrap_or(Action::CancelClear)
    }

    /// Handle key event in filter input mode
    ///
    /// Plain characters become `SearchInput`; global bindings do not apply.
    pub fn get_filter_input_action(&self, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        if let Some(action) = self
            .bindings
            .get(&KeyContext::FilterInput)
            .and_then(|filter_bindings| filter_bindings.get(&binding))
        {
            return Some(action.clone());
        }

        if let KeyCode::Char(c) = key.code
            && (key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT)
        {
            return Some(Action::SearchInput(c));
        }

        None
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_log_viewer_falls_back_to_global() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char('j'), KeyModifiers::NONE)),
            Some(Action::ScrollDown(1))
        );
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Action::Quit)
        );
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char('z'), KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn test_clear_and_reconnect_keys() {
        let bindings = KeyBindings::new();
        let ctx = KeyContext::LogViewer;
        assert_eq!(
            bindings.get_action(ctx, &key(KeyCode::Char('c'), KeyModifiers::NONE)),
            Some(Action::Clear(ClearTarget::Log))
        );
        assert_eq!(
            bindings.get_action(ctx, &key(KeyCode::Char('w'), KeyModifiers::NONE)),
            Some(Action::Clear(ClearTarget::Watches))
        );
        assert_eq!(
            bindings.get_action(ctx, &key(KeyCode::Char('x'), KeyModifiers::NONE)),
            Some(Action::Clear(ClearTarget::All))
        );
        assert_eq!(
            bindings.get_action(ctx, &key(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            Some(Action::Reconnect)
        );
    }

    #[test]
    fn test_confirm_answers() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.get_confirm_action(&key(KeyCode::Char('y'), KeyModifiers::NONE)),
            Action::ConfirmClear
        );
        assert_eq!(
            bindings.get_confirm_action(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Action::ConfirmClear
        );
        // A second 'c' does not confirm its own request
        assert_eq!(
            bindings.get_confirm_action(&key(KeyCode::Char('c'), KeyModifiers::NONE)),
            Action::CancelClear
        );
        assert_eq!(
            bindings.get_confirm_action(&key(KeyCode::Esc, KeyModifiers::NONE)),
            Action::CancelClear
        );
        assert_eq!(
            bindings.get_action(
                KeyContext::LogViewer,
                &key(KeyCode::Char('L'), KeyModifiers::SHIFT)
            ),
            Some(Action::ReloadSettings)
        );
    }

    #[test]
    fn test_filter_input_captures_characters() {
        let bindings = KeyBindings::new();
        // 'q' types instead of quitting while the filter bar is open
        assert_eq!(
            bindings.get_filter_input_action(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Action::SearchInput('q'))
        );
        assert_eq!(
            bindings.get_filter_input_action(&key(KeyCode::Char('E'), KeyModifiers::SHIFT)),
            Some(Action::SearchInput('E'))
        );
        assert_eq!(
            bindings.get_filter_input_action(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Action::ApplyFilter)
        );
        assert_eq!(
            bindings.get_filter_input_action(&key(KeyCode::Char('x'), KeyModifiers::ALT)),
            None
        );
    }
}
