use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, Screen, TurnState};
use crate::scenario;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Works everywhere, including inside the question form.
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Picker => handle_picker_key(app, key),
        Screen::Chat => {
            if app.panel.is_some() {
                handle_panel_key(app, key);
            } else {
                handle_chat_key(app, key);
            }
        }
    }
}

fn handle_picker_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => {
            let len = scenario::SCENARIOS.len();
            let i = app.picker_state.selected().unwrap_or(0);
            app.picker_state.select(Some((i + 1).min(len - 1)));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let i = app.picker_state.selected().unwrap_or(0);
            app.picker_state.select(Some(i.saturating_sub(1)));
        }
        KeyCode::Enter => {
            if let Some(s) = app.picker_state.selected().and_then(|i| scenario::SCENARIOS.get(i)) {
                app.start_scenario(s, false);
            }
        }
        // Reopen the scenario's latest stored conversation.
        KeyCode::Char('r') => {
            if let Some(s) = app.picker_state.selected().and_then(|i| scenario::SCENARIOS.get(i)) {
                app.start_scenario(s, true);
            }
        }
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => leave_chat(app),

        // Transcript scrolling; the input line is single-row, so the
        // vertical arrows are free for it.
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),

        KeyCode::Enter => app.submit_input(),

        // Input editing, disabled while a relay call is in flight.
        _ if app.turn != TurnState::Idle => {}

        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// The question form's keyboard contract: vertical arrows move option
/// focus, horizontal arrows move between questions, Space toggles,
/// Enter activates or submits, Tab jumps to the next unanswered
/// question or submits. The "Other" text field captures everything
/// except Esc while it has focus.
fn handle_panel_key(app: &mut App, key: KeyEvent) {
    let Some(panel) = app.panel.as_mut() else {
        return;
    };

    if panel.editing_other {
        match key.code {
            KeyCode::Esc => panel.stop_editing_other(),
            KeyCode::Backspace => panel.backspace_other(),
            KeyCode::Char(c) => panel.input_other(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => panel.focus_up(),
        KeyCode::Down | KeyCode::Char('j') => panel.focus_down(),
        KeyCode::Left | KeyCode::Char('h') => panel.prev_question(),
        KeyCode::Right | KeyCode::Char('l') => panel.next_question(),
        KeyCode::Char(' ') => panel.activate_focused(),
        KeyCode::Enter => {
            if let Some(answers) = panel.handle_enter() {
                app.submit_answers(answers);
            }
        }
        KeyCode::Tab => {
            if let Some(answers) = panel.handle_tab() {
                app.submit_answers(answers);
            }
        }
        _ => {}
    }
}

fn leave_chat(app: &mut App) {
    // No in-conversation cancellation; leaving the chat just drops the
    // handle. The transcript up to the last persisted message survives.
    if let Some(task) = app.relay_task.take() {
        task.abort();
    }
    app.panel = None;
    app.scenario = None;
    app.conversation = None;
    app.turn = TurnState::Idle;
    app.input.clear();
    app.input_cursor = 0;
    app.status = None;
    app.screen = Screen::Picker;
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    match mouse.kind {
        MouseEventKind::ScrollDown => match app.screen {
            Screen::Picker => {
                let len = scenario::SCENARIOS.len();
                let i = app.picker_state.selected().unwrap_or(0);
                app.picker_state.select(Some((i + 1).min(len - 1)));
            }
            Screen::Chat => {
                if app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(true) {
                    app.scroll_down();
                    app.scroll_down();
                    app.scroll_down();
                }
            }
        },
        MouseEventKind::ScrollUp => match app.screen {
            Screen::Picker => {
                let i = app.picker_state.selected().unwrap_or(0);
                app.picker_state.select(Some(i.saturating_sub(1)));
            }
            Screen::Chat => {
                if app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(true) {
                    app.scroll_up();
                    app.scroll_up();
                    app.scroll_up();
                }
            }
        },
        MouseEventKind::Down(_) => handle_click(app, x, y),
        _ => {}
    }
}

fn handle_click(app: &mut App, x: u16, y: u16) {
    match app.screen {
        Screen::Picker => {
            if let Some(area) = app.picker_area {
                if point_in_rect(x, y, area) && y > area.y {
                    let index = (y - area.y - 1) as usize; // inside the block border
                    if index < scenario::SCENARIOS.len() {
                        app.picker_state.select(Some(index));
                    }
                }
            }
        }
        Screen::Chat => {
            if app.panel.is_some() {
                handle_panel_click(app, x, y);
            }
        }
    }
}

fn handle_panel_click(app: &mut App, x: u16, y: u16) {
    // Tabs: one per question, plus Submit at the end.
    let tab = app
        .panel_tab_areas
        .iter()
        .position(|r| point_in_rect(x, y, *r));
    if let Some(index) = tab {
        if let Some(panel) = app.panel.as_mut() {
            panel.goto_question(index);
        }
        return;
    }

    if let Some(submit) = app.panel_submit_area {
        if point_in_rect(x, y, submit) {
            let answers = app.panel.as_ref().and_then(|p| p.finalize());
            if let Some(answers) = answers {
                app.submit_answers(answers);
            }
            return;
        }
    }

    let option = app
        .panel_option_areas
        .iter()
        .position(|r| point_in_rect(x, y, *r));
    if let Some(index) = option {
        if let Some(panel) = app.panel.as_mut() {
            panel.focused = index;
            if index < panel.other_slot() {
                panel.select_option(index);
            } else {
                panel.toggle_other();
            }
        }
    }
}
