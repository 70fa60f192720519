use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode, Popup, Screen};
use crate::tui::AppEvent;
use laya_core::{Facet, Rating};

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.poll_tasks().await;
            app.tick_animation();
        }
    }
    Ok(())
}

pub async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('k') => {
                app.focus_search();
                return Ok(());
            }
            _ => {}
        }
    }

    match app.popup {
        Some(Popup::Upload) => {
            handle_upload_popup(app, key).await;
            return Ok(());
        }
        Some(Popup::NewProject) => {
            handle_project_form(app, key);
            return Ok(());
        }
        None => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Tab => {
            app.switch_to(app.screen.next());
            return;
        }
        KeyCode::Char('1') => {
            app.switch_to(Screen::Search);
            return;
        }
        KeyCode::Char('2') => {
            app.switch_to(Screen::Chat);
            return;
        }
        KeyCode::Char('3') => {
            app.switch_to(Screen::Projects);
            return;
        }
        KeyCode::Char('T') => {
            app.toggle_theme();
            return;
        }
        _ => {}
    }

    match app.screen {
        Screen::Search => handle_search_normal(app, key),
        Screen::Chat => handle_chat_normal(app, key),
        Screen::Projects => handle_projects_normal(app, key),
    }
}

fn handle_search_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('/') | KeyCode::Char('i') => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => app.search_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.search_nav_up(),
        KeyCode::Char('s') => app.cycle_filter(Facet::Source),
        KeyCode::Char('t') => app.cycle_filter(Facet::Type),
        KeyCode::Char('u') => app.open_upload(),
        KeyCode::Enter => app.start_search(),
        KeyCode::Esc => {
            app.search.clear_query();
        }
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        KeyCode::Char('C') => app.clear_chat(),
        KeyCode::Char('+') => app.send_feedback(Rating::Up),
        KeyCode::Char('-') => app.send_feedback(Rating::Down),
        KeyCode::Char('=') => app.send_feedback(Rating::Neutral),
        _ => {}
    }
}

fn handle_projects_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.project_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.project_nav_up(),
        KeyCode::Char('r') => app.refresh_projects(),
        KeyCode::Char('n') => app.open_project_form(),
        KeyCode::Char('D') => app.delete_selected_project(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Search => match key.code {
            // Esc empties a non-empty box first, then leaves editing
            KeyCode::Esc => {
                if !app.search.clear_query() {
                    app.input_mode = InputMode::Normal;
                }
            }
            KeyCode::Enter => {
                app.start_search();
                app.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                app.search.query.pop();
            }
            KeyCode::Char(c) => app.search.query.push(c),
            _ => {}
        },
        Screen::Chat => match key.code {
            KeyCode::Esc => app.input_mode = InputMode::Normal,
            KeyCode::Enter => app.send_chat(),
            KeyCode::Backspace => {
                app.chat_input.pop();
            }
            KeyCode::Char(c) => app.chat_input.push(c),
            _ => {}
        },
        Screen::Projects => app.input_mode = InputMode::Normal,
    }
}

async fn handle_upload_popup(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.popup = None;
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.start_upload().await;
            if app.upload.error().is_none() {
                app.popup = None;
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Backspace => {
            app.upload_input.pop();
        }
        KeyCode::Char(c) => app.upload_input.push(c),
        _ => {}
    }
}

fn handle_project_form(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.popup = None;
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab | KeyCode::Down => app.form_next_field(),
        KeyCode::BackTab | KeyCode::Up => app.form_prev_field(),
        KeyCode::Enter => app.submit_project_form(),
        KeyCode::Backspace => {
            let field = app.current_form_field();
            app.form.field_mut(field).pop();
        }
        KeyCode::Char(c) => {
            let field = app.current_form_field();
            app.form.field_mut(field).push(c);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laya_core::{ApiClient, Config, ProjectField};

    fn app() -> App {
        App::new(ApiClient::new("http://127.0.0.1:9"), None, &Config::new())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, press(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_ctrl_k_focuses_search_from_chat() {
        let mut app = app();
        app.switch_to(Screen::Chat);
        handle_key(&mut app, ctrl('k')).await.unwrap();
        assert_eq!(app.screen, Screen::Search);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn test_ctrl_k_closes_popup() {
        let mut app = app();
        app.open_upload();
        handle_key(&mut app, ctrl('k')).await.unwrap();
        assert!(app.popup.is_none());
        assert_eq!(app.screen, Screen::Search);
    }

    #[tokio::test]
    async fn test_escape_clears_query_before_leaving_edit() {
        let mut app = app();
        handle_key(&mut app, press(KeyCode::Char('/'))).await.unwrap();
        type_text(&mut app, "vector").await;
        assert_eq!(app.search.query, "vector");

        handle_key(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.search.query, "");
        assert_eq!(app.input_mode, InputMode::Editing);

        handle_key(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_typing_q_in_search_box_does_not_quit() {
        let mut app = app();
        app.focus_search();
        type_text(&mut app, "qdrant").await;
        assert!(!app.should_quit);
        assert_eq!(app.search.query, "qdrant");
    }

    #[tokio::test]
    async fn test_enter_on_blank_query_does_not_search() {
        let mut app = app();
        app.focus_search();
        type_text(&mut app, "   ").await;
        handle_key(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert!(!app.search.is_searching());
        assert_eq!(app.pending_searches(), 0);
    }

    #[tokio::test]
    async fn test_tab_cycles_screens() {
        let mut app = app();
        handle_key(&mut app, press(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.screen, Screen::Chat);
        handle_key(&mut app, press(KeyCode::Char('1'))).await.unwrap();
        assert_eq!(app.screen, Screen::Search);
    }

    #[tokio::test]
    async fn test_form_typing_goes_to_focused_field() {
        let mut app = app();
        app.switch_to(Screen::Projects);
        handle_key(&mut app, press(KeyCode::Char('n'))).await.unwrap();
        type_text(&mut app, "Laya").await;
        handle_key(&mut app, press(KeyCode::Tab)).await.unwrap();
        type_text(&mut app, "laya").await;

        assert_eq!(app.form.field(ProjectField::Name), "Laya");
        assert_eq!(app.form.field(ProjectField::Slug), "laya");
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_editing() {
        let mut app = app();
        app.focus_search();
        handle_key(&mut app, ctrl('c')).await.unwrap();
        assert!(app.should_quit);
    }
}
