//! # Actions
//!
//! Everything that can happen in a session becomes an `Action`.
//! User presses `j`? That's `Action::Down`. Terminal resized? That's
//! `Action::Resize { .. }`.
//!
//! The `update()` function takes the current state and an action, mutates
//! the state, and returns an `Effect` telling the event loop what to do next.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! The only I/O `update()` performs is delegated: reading the selected
//! document and rendering it, through the collaborators in [`Deps`].

use log::debug;

use crate::core::content::{self, ContentRenderer};
use crate::core::library::DocumentSource;
use crate::core::state::{SessionState, TerminalSize, ViewState};
use crate::core::viewport::Viewport;

/// Lines moved per mouse wheel notch.
pub const WHEEL_STEP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Enter,
    Back,
    Top,
    Bottom,
    PageUp,
    PageDown,
    ScrollUp,
    ScrollDown,
    Quit,
    Resize { width: u16, height: u16 },
}

impl Action {
    /// Whether the action does anything in the given view.
    pub fn active_in(self, view: ViewState) -> bool {
        match self {
            Action::Quit | Action::Resize { .. } => true,
            Action::Up | Action::Down | Action::Enter => view == ViewState::List,
            Action::Back
            | Action::Top
            | Action::Bottom
            | Action::PageUp
            | Action::PageDown
            | Action::ScrollUp
            | Action::ScrollDown => view == ViewState::Content,
        }
    }
}

/// What the event loop should do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing visible changed.
    None,
    /// Recompose and paint a frame.
    Render,
    /// End the session.
    Quit,
}

/// Collaborators `update()` delegates to, plus the settings it needs.
pub struct Deps<'a> {
    pub source: &'a dyn DocumentSource,
    pub renderer: &'a dyn ContentRenderer,
    pub theme: &'a str,
    pub header_lines: usize,
}

pub fn update(state: &mut SessionState, action: Action, deps: &Deps<'_>) -> Effect {
    match (action, state.view) {
        (Action::Quit, _) => Effect::Quit,

        (Action::Resize { width, height }, _) => {
            state.terminal = TerminalSize::new(width, height);
            state.layout();
            if !state.ready {
                let TerminalSize { width, height } = state.terminal;
                debug!("First resize: {width}x{height}, viewport ready");
                state.ready = true;
            }
            Effect::Render
        }

        (Action::Up, ViewState::List) => {
            if state.cursor == 0 {
                return Effect::None;
            }
            state.cursor -= 1;
            Effect::Render
        }

        (Action::Down, ViewState::List) => {
            if state.cursor + 1 >= state.documents.len() {
                return Effect::None;
            }
            state.cursor += 1;
            Effect::Render
        }

        (Action::Enter, ViewState::List) => {
            // Validated on every Enter: the cursor is never trusted to index.
            let Some(document) = state.document_at_cursor().cloned() else {
                return Effect::None;
            };
            let loaded = content::load(
                deps.source,
                deps.renderer,
                &document.name,
                deps.header_lines,
                deps.theme,
            );
            state.raw_content = loaded.raw;
            state.rendered = loaded.rendered;
            state.selected = Some(document);
            state.view = ViewState::Content;
            state.layout();
            state.viewport.scroll_to_top();
            Effect::Render
        }

        (Action::Back, ViewState::Content) => {
            state.view = ViewState::List;
            state.layout();
            state.viewport.scroll_to_top();
            Effect::Render
        }

        (Action::Top, ViewState::Content) => scroll(state, |vp| vp.scroll_to_top()),
        (Action::Bottom, ViewState::Content) => scroll(state, |vp| vp.scroll_to_bottom()),
        (Action::PageUp, ViewState::Content) => scroll(state, |vp| vp.page_up()),
        (Action::PageDown, ViewState::Content) => scroll(state, |vp| vp.page_down()),
        (Action::ScrollUp, ViewState::Content) => scroll(state, |vp| vp.scroll_up(WHEEL_STEP)),
        (Action::ScrollDown, ViewState::Content) => {
            scroll(state, |vp| vp.scroll_down(WHEEL_STEP))
        }

        _ => Effect::None,
    }
}

fn scroll(state: &mut SessionState, f: impl FnOnce(&mut Viewport)) -> Effect {
    let before = state.viewport.y_offset();
    f(&mut state.viewport);
    if state.viewport.y_offset() == before {
        Effect::None
    } else {
        Effect::Render
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::READ_ERROR_PLACEHOLDER;
    use crate::core::library::Document;
    use crate::test_support::{PlainRenderer, StaticSource};

    fn deps<'a>(source: &'a StaticSource) -> Deps<'a> {
        Deps {
            source,
            renderer: &PlainRenderer,
            theme: "dark",
            header_lines: 2,
        }
    }

    fn ready_state(source: &StaticSource, width: u16, height: u16) -> SessionState {
        let mut state = SessionState::new(
            source.list_documents().unwrap(),
            TerminalSize::new(width, height),
        );
        update(&mut state, Action::Resize { width, height }, &deps(source));
        state
    }

    fn long_body(lines: usize) -> String {
        let mut body = String::from("meta\n---\n");
        for i in 0..lines {
            body.push_str(&format!("line {i}\n"));
        }
        body
    }

    #[test]
    fn navigate_enter_and_back() {
        let source = StaticSource::new(&[("a.md", "A"), ("b.md", "B")]);
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);

        assert_eq!(update(&mut state, Action::Down, &deps), Effect::Render);
        assert_eq!(state.cursor, 1);
        assert_eq!(update(&mut state, Action::Down, &deps), Effect::None);
        assert_eq!(state.cursor, 1);

        update(&mut state, Action::Enter, &deps);
        assert_eq!(state.view, ViewState::Content);
        assert_eq!(state.selected, Some(Document::new("b.md", "B")));

        update(&mut state, Action::Back, &deps);
        assert_eq!(state.view, ViewState::List);
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn up_saturates_at_zero() {
        let source = StaticSource::new(&[("a.md", "A"), ("b.md", "B")]);
        let mut state = ready_state(&source, 80, 24);
        assert_eq!(update(&mut state, Action::Up, &deps(&source)), Effect::None);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn empty_list_is_safe() {
        let source = StaticSource::new(&[]);
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);

        for action in [Action::Enter, Action::Down, Action::Up, Action::Enter] {
            assert_eq!(update(&mut state, action, &deps), Effect::None);
            assert_eq!(state.cursor, 0);
            assert_eq!(state.view, ViewState::List);
            assert!(state.selected.is_none());
        }
    }

    #[test]
    fn cursor_invariant_holds_for_any_sequence() {
        let source = StaticSource::new(&[("a.md", "A"), ("b.md", "B"), ("c.md", "C")]);
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);
        let script = [
            Action::Down, Action::Down, Action::Down, Action::Down,
            Action::Up, Action::Down, Action::Up, Action::Up, Action::Up,
        ];
        for action in script {
            update(&mut state, action, &deps);
            assert!(state.cursor < state.documents.len().max(1));
        }
    }

    #[test]
    fn enter_with_stale_cursor_is_a_noop() {
        let source = StaticSource::new(&[("a.md", "A")]);
        let mut state = ready_state(&source, 80, 24);
        state.cursor = 5;
        assert_eq!(update(&mut state, Action::Enter, &deps(&source)), Effect::None);
        assert_eq!(state.view, ViewState::List);
    }

    #[test]
    fn read_failure_still_enters_content_view() {
        let source = StaticSource::new(&[("a.md", "A")]).failing_reads();
        let mut state = ready_state(&source, 80, 24);
        update(&mut state, Action::Enter, &deps(&source));
        assert_eq!(state.view, ViewState::Content);
        assert_eq!(state.raw_content, READ_ERROR_PLACEHOLDER);
        assert_eq!(state.viewport.line_count(), 1);
    }

    #[test]
    fn enter_strips_metadata_and_scrolls_to_top() {
        let source = StaticSource::new(&[("a.md", "A")]).with_body("a.md", &long_body(50));
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);

        update(&mut state, Action::Enter, &deps);
        assert!(state.raw_content.starts_with("line 0"));
        assert_eq!(state.viewport.y_offset(), 0);

        update(&mut state, Action::PageDown, &deps);
        assert!(state.viewport.y_offset() > 0);
        update(&mut state, Action::Back, &deps);
        assert_eq!(state.viewport.y_offset(), 0);

        update(&mut state, Action::Enter, &deps);
        assert_eq!(state.viewport.y_offset(), 0);
    }

    #[test]
    fn list_keys_are_noops_in_content_view() {
        let source = StaticSource::new(&[("a.md", "A"), ("b.md", "B")]);
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);
        update(&mut state, Action::Enter, &deps);

        assert_eq!(update(&mut state, Action::Down, &deps), Effect::None);
        assert_eq!(update(&mut state, Action::Up, &deps), Effect::None);
        assert_eq!(update(&mut state, Action::Enter, &deps), Effect::None);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn content_keys_are_noops_in_list_view() {
        let source = StaticSource::new(&[("a.md", "A")]);
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);
        for action in [Action::Back, Action::Top, Action::PageDown, Action::ScrollDown] {
            assert_eq!(update(&mut state, action, &deps), Effect::None);
            assert_eq!(state.view, ViewState::List);
        }
    }

    #[test]
    fn scrolling_in_content_view() {
        let source = StaticSource::new(&[("a.md", "A")]).with_body("a.md", &long_body(100));
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);
        update(&mut state, Action::Enter, &deps);

        update(&mut state, Action::ScrollDown, &deps);
        assert_eq!(state.viewport.y_offset(), WHEEL_STEP);
        update(&mut state, Action::Bottom, &deps);
        assert!(state.viewport.at_bottom());
        assert_eq!(state.viewport.scroll_percent(), 1.0);
        update(&mut state, Action::Top, &deps);
        assert!(state.viewport.at_top());
        assert_eq!(update(&mut state, Action::Top, &deps), Effect::None);
    }

    #[test]
    fn resize_tracks_current_view_chrome() {
        let source = StaticSource::new(&[("a.md", "A")]);
        let deps = deps(&source);
        let mut state = SessionState::new(source.list_documents().unwrap(), TerminalSize::new(80, 24));
        assert!(!state.ready);

        update(&mut state, Action::Resize { width: 100, height: 40 }, &deps);
        assert!(state.ready);
        assert_eq!(state.viewport.height(), 40);

        update(&mut state, Action::Enter, &deps);
        assert_eq!(state.viewport.height(), 40 - 3);

        update(&mut state, Action::Resize { width: 60, height: 30 }, &deps);
        assert_eq!(state.viewport.height(), 30 - 3);
        assert_eq!(state.viewport.width(), 60);

        update(&mut state, Action::Back, &deps);
        assert_eq!(state.viewport.height(), 30);
    }

    #[test]
    fn quit_from_either_view() {
        let source = StaticSource::new(&[("a.md", "A")]);
        let deps = deps(&source);
        let mut state = ready_state(&source, 80, 24);
        assert_eq!(update(&mut state, Action::Quit, &deps), Effect::Quit);
        update(&mut state, Action::Enter, &deps);
        assert_eq!(update(&mut state, Action::Quit, &deps), Effect::Quit);
    }

    #[test]
    fn active_in_gates_by_view() {
        assert!(Action::Down.active_in(ViewState::List));
        assert!(!Action::Down.active_in(ViewState::Content));
        assert!(Action::Back.active_in(ViewState::Content));
        assert!(!Action::Back.active_in(ViewState::List));
        assert!(Action::Quit.active_in(ViewState::List));
        assert!(Action::Resize { width: 1, height: 1 }.active_in(ViewState::Content));
    }
}
