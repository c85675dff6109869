//! Key bindings and the key dispatcher.
//!
//! Bindings are chord strings like `"ctrl+c"`, `"pgdown"` or `"G"`, parsed
//! once at startup. `KeyMap::dispatch` maps a decoded key event to the
//! `Action` bound to it, but only when that action does something in the
//! session's current view. Help text is generated from the same bindings.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

use crate::core::action::Action;
use crate::core::config::KeysConfig;
use crate::core::state::ViewState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub key: KeyCode,
    pub ctrl: bool,
    pub alt: bool,
}

/// Parse `"ctrl+alt+x"`-style chords. Modifier and key names are
/// case-insensitive; single characters keep their case (`"G"` is not `"g"`).
pub fn parse_key_chord(input: &str) -> Option<KeyChord> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    // "+" on its own, or as the final key ("ctrl++"), is the plus key.
    let (mods, key) = match trimmed.strip_suffix('+') {
        Some(rest) if rest.is_empty() || rest.ends_with('+') => {
            (rest.strip_suffix('+').unwrap_or(rest), "+")
        }
        _ => match trimmed.rsplit_once('+') {
            Some((mods, key)) => (mods, key),
            None => ("", trimmed),
        },
    };

    let mut chord = KeyChord {
        key: parse_key(key.trim())?,
        ctrl: false,
        alt: false,
    };
    for part in mods.split('+').map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_lowercase().as_str() {
            "ctrl" | "control" => chord.ctrl = true,
            "alt" | "option" | "meta" => chord.alt = true,
            _ => return None,
        }
    }
    Some(chord)
}

fn parse_key(key: &str) -> Option<KeyCode> {
    let mut chars = key.chars();
    let first = chars.next()?;
    if chars.next().is_none() {
        return Some(KeyCode::Char(first));
    }
    match key.to_lowercase().as_str() {
        "esc" | "escape" => Some(KeyCode::Esc),
        "enter" | "return" => Some(KeyCode::Enter),
        "tab" => Some(KeyCode::Tab),
        "space" | "spacebar" => Some(KeyCode::Char(' ')),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "pgup" | "pageup" => Some(KeyCode::PageUp),
        "pgdown" | "pgdn" | "pagedown" => Some(KeyCode::PageDown),
        "backspace" => Some(KeyCode::Backspace),
        _ => None,
    }
}

/// Shift is ignored: it is already folded into the character's case.
pub fn matches_chord(event: &KeyEvent, chord: &KeyChord) -> bool {
    event.code == chord.key
        && event.modifiers.contains(KeyModifiers::CONTROL) == chord.ctrl
        && event.modifiers.contains(KeyModifiers::ALT) == chord.alt
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub action: Action,
    pub chords: Vec<KeyChord>,
    /// Key label and description for the help line, e.g. ("↑/k", "move up").
    pub help: Option<(String, String)>,
}

impl Binding {
    fn new(action: Action, keys: &[&str], help: Option<(&str, &str)>) -> Self {
        Self {
            action,
            chords: keys.iter().filter_map(|k| parse_key_chord(k)).collect(),
            help: help.map(|(k, d)| (k.to_string(), d.to_string())),
        }
    }

    fn matches(&self, event: &KeyEvent) -> bool {
        self.chords.iter().any(|c| matches_chord(event, c))
    }
}

#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: Vec<Binding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            bindings: vec![
                Binding::new(Action::Up, &["up", "k"], Some(("↑/k", "move up"))),
                Binding::new(Action::Down, &["down", "j"], Some(("↓/j", "move down"))),
                Binding::new(Action::Enter, &["enter"], Some(("enter", "open"))),
                Binding::new(Action::Back, &["esc"], Some(("esc", "go back"))),
                Binding::new(Action::Top, &["g", "home"], Some(("g", "top"))),
                Binding::new(Action::Bottom, &["G", "end"], Some(("G", "bottom"))),
                Binding::new(Action::PageDown, &["pgdown", "space", "f"], Some(("pgdn", "page down"))),
                Binding::new(Action::PageUp, &["pgup", "b"], Some(("pgup", "page up"))),
                Binding::new(Action::Quit, &["q", "ctrl+c"], Some(("q", "quit"))),
            ],
        }
    }
}

impl KeyMap {
    /// Defaults with any configured chord lists applied on top.
    pub fn from_config(keys: &KeysConfig) -> Self {
        let mut keymap = Self::default();
        let overrides = [
            (Action::Up, &keys.up),
            (Action::Down, &keys.down),
            (Action::Enter, &keys.enter),
            (Action::Back, &keys.back),
            (Action::Top, &keys.top),
            (Action::Bottom, &keys.bottom),
            (Action::PageUp, &keys.page_up),
            (Action::PageDown, &keys.page_down),
            (Action::Quit, &keys.quit),
        ];
        for (action, chords) in overrides {
            if let Some(chords) = chords {
                keymap.rebind(action, chords);
            }
        }
        keymap
    }

    /// Replace the chords bound to `action`. Unparseable chords are dropped
    /// with a warning; an empty result keeps the existing binding.
    pub fn rebind(&mut self, action: Action, keys: &[String]) {
        let chords: Vec<KeyChord> = keys
            .iter()
            .filter_map(|k| {
                let chord = parse_key_chord(k);
                if chord.is_none() {
                    log::warn!("Ignoring unparseable key binding {k:?} for {action:?}");
                }
                chord
            })
            .collect();
        if chords.is_empty() {
            return;
        }
        if let Some(binding) = self.bindings.iter_mut().find(|b| b.action == action) {
            binding.help = binding
                .help
                .take()
                .map(|(_, desc)| (keys.join("/"), desc));
            binding.chords = chords;
        }
    }

    /// The action for `event`, if one is bound and active in `view`.
    pub fn dispatch(&self, view: ViewState, event: &KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .find(|b| b.action.active_in(view) && b.matches(event))
            .map(|b| b.action)
    }

    /// Translate any input event: bound keys, mouse wheel and resizes.
    pub fn action_for(&self, view: ViewState, event: &Event) -> Option<Action> {
        let action = match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                return self.dispatch(view, key);
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => Action::ScrollUp,
                MouseEventKind::ScrollDown => Action::ScrollDown,
                _ => return None,
            },
            Event::Resize(width, height) => Action::Resize {
                width: *width,
                height: *height,
            },
            _ => return None,
        };
        action.active_in(view).then_some(action)
    }

    /// `"↑/k move up • ↓/j move down • q quit"` for the bindings active in `view`.
    pub fn short_help(&self, view: ViewState) -> String {
        self.bindings
            .iter()
            .filter(|b| b.action.active_in(view))
            .filter_map(|b| b.help.as_ref())
            .map(|(key, desc)| format!("{key} {desc}"))
            .collect::<Vec<_>>()
            .join(" • ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn parse_key_chord_handles_modifiers_and_names() {
        let chord = parse_key_chord("ctrl+c").unwrap();
        assert_eq!(chord.key, KeyCode::Char('c'));
        assert!(chord.ctrl && !chord.alt);

        assert_eq!(parse_key_chord("PgDown").unwrap().key, KeyCode::PageDown);
        assert_eq!(parse_key_chord("G").unwrap().key, KeyCode::Char('G'));
        assert_eq!(parse_key_chord("alt++").unwrap().key, KeyCode::Char('+'));
        assert_eq!(parse_key_chord("+").unwrap().key, KeyCode::Char('+'));
    }

    #[test]
    fn parse_key_chord_rejects_garbage() {
        assert!(parse_key_chord("").is_none());
        assert!(parse_key_chord("hyper+x").is_none());
        assert!(parse_key_chord("ctrl+nope").is_none());
    }

    #[test]
    fn dispatch_default_bindings_in_list_view() {
        let km = KeyMap::default();
        let list = ViewState::List;
        assert_eq!(km.dispatch(list, &press(KeyCode::Char('j'), KeyModifiers::NONE)), Some(Action::Down));
        assert_eq!(km.dispatch(list, &press(KeyCode::Up, KeyModifiers::NONE)), Some(Action::Up));
        assert_eq!(km.dispatch(list, &press(KeyCode::Enter, KeyModifiers::NONE)), Some(Action::Enter));
        assert_eq!(km.dispatch(list, &press(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(Action::Quit));
        // Content-only keys are gated out.
        assert_eq!(km.dispatch(list, &press(KeyCode::Esc, KeyModifiers::NONE)), None);
    }

    #[test]
    fn dispatch_default_bindings_in_content_view() {
        let km = KeyMap::default();
        let content = ViewState::Content;
        assert_eq!(km.dispatch(content, &press(KeyCode::Esc, KeyModifiers::NONE)), Some(Action::Back));
        assert_eq!(km.dispatch(content, &press(KeyCode::Char('G'), KeyModifiers::SHIFT)), Some(Action::Bottom));
        assert_eq!(km.dispatch(content, &press(KeyCode::Char('g'), KeyModifiers::NONE)), Some(Action::Top));
        assert_eq!(km.dispatch(content, &press(KeyCode::Char(' '), KeyModifiers::NONE)), Some(Action::PageDown));
        assert_eq!(km.dispatch(content, &press(KeyCode::Char('j'), KeyModifiers::NONE)), None);
        assert_eq!(km.dispatch(content, &press(KeyCode::Char('q'), KeyModifiers::NONE)), Some(Action::Quit));
    }

    #[test]
    fn ctrl_chord_does_not_match_plain_key() {
        let km = KeyMap::default();
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('c'), KeyModifiers::NONE)), None);
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('j'), KeyModifiers::CONTROL)), None);
    }

    #[test]
    fn rebind_replaces_chords_and_help() {
        let mut km = KeyMap::default();
        km.rebind(Action::Quit, &["x".to_string(), "bogus+key".to_string()]);
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('x'), KeyModifiers::NONE)), Some(Action::Quit));
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('q'), KeyModifiers::NONE)), None);
        assert!(km.short_help(ViewState::List).contains("x/bogus+key quit"));
    }

    #[test]
    fn rebind_with_nothing_valid_keeps_binding() {
        let mut km = KeyMap::default();
        km.rebind(Action::Quit, &["bogus+key".to_string()]);
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('q'), KeyModifiers::NONE)), Some(Action::Quit));
    }

    #[test]
    fn from_config_overrides_only_configured_actions() {
        let keys = KeysConfig {
            down: Some(vec!["n".to_string()]),
            ..Default::default()
        };
        let km = KeyMap::from_config(&keys);
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('n'), KeyModifiers::NONE)), Some(Action::Down));
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('j'), KeyModifiers::NONE)), None);
        assert_eq!(km.dispatch(ViewState::List, &press(KeyCode::Char('k'), KeyModifiers::NONE)), Some(Action::Up));
    }

    #[test]
    fn action_for_maps_wheel_and_resize() {
        use crossterm::event::MouseEvent;

        let km = KeyMap::default();
        let wheel = |kind| {
            Event::Mouse(MouseEvent {
                kind,
                column: 0,
                row: 0,
                modifiers: KeyModifiers::NONE,
            })
        };
        assert_eq!(km.action_for(ViewState::Content, &wheel(MouseEventKind::ScrollDown)), Some(Action::ScrollDown));
        assert_eq!(km.action_for(ViewState::Content, &wheel(MouseEventKind::ScrollUp)), Some(Action::ScrollUp));
        assert_eq!(km.action_for(ViewState::List, &wheel(MouseEventKind::ScrollDown)), None);
        assert_eq!(
            km.action_for(ViewState::List, &Event::Resize(100, 30)),
            Some(Action::Resize { width: 100, height: 30 })
        );
        assert_eq!(
            km.action_for(ViewState::List, &Event::Key(press(KeyCode::Char('j'), KeyModifiers::NONE))),
            Some(Action::Down)
        );
        assert_eq!(km.action_for(ViewState::List, &Event::FocusGained), None);
    }

    #[test]
    fn short_help_is_view_specific() {
        let km = KeyMap::default();
        assert_eq!(
            km.short_help(ViewState::List),
            "↑/k move up • ↓/j move down • enter open • q quit"
        );
        let content = km.short_help(ViewState::Content);
        assert!(content.starts_with("esc go back"));
        assert!(content.ends_with("q quit"));
        assert!(!content.contains("move up"));
    }
}
