use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{App, InputMode};
use crate::controller;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        completion => controller::on_completion(app, completion, tx),
    }
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key, tx),
        InputMode::Editing => handle_editing_mode(app, key, tx),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Enter the input box
        KeyCode::Char('/') | KeyCode::Char('e') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }

        // Initialize the remote knowledge base (offered while not ready;
        // the controller guards against double submission either way)
        KeyCode::Char('i') => {
            if !app.is_ready() {
                controller::run_initialize(app, tx);
            }
        }

        // Re-run the status probe
        KeyCode::Char('r') => controller::run_status_probe(app, tx),

        KeyCode::Char('d') => app.toggle_dark_mode(),

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            controller::run_search(app, tx);
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_app() -> App {
        let mut app = App::new(&Config::new()).unwrap();
        app.input_mode = InputMode::Editing;
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        handle_key(app, KeyEvent::from(code), &tx);
    }

    #[test]
    fn test_typing_inserts_at_cursor() {
        let mut app = test_app();
        for c in "abd".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Char('c'));

        assert_eq!(app.input, "abcd");
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn test_backspace_is_utf8_safe() {
        let mut app = test_app();
        for c in "¿qué".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);

        assert_eq!(app.input, "¿q");
        assert_eq!(app.cursor, 2);
    }

    #[test]
    fn test_escape_returns_to_normal_mode() {
        let mut app = test_app();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_enter_with_blank_input_changes_nothing() {
        let mut app = test_app();
        app.input = "  ".to_string();
        app.cursor = 2;

        press(&mut app, KeyCode::Enter);

        assert!(!app.loading);
        assert!(app.transcript.is_empty());
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_ctrl_c_quits_in_editing_mode() {
        let mut app = test_app();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            &tx,
        );
        assert!(app.should_quit);
    }
}
