use crate::application::{App, AppMode, PromptKind};
use crate::infrastructure::FileRepository;
use crossterm::event::{KeyCode, KeyModifiers};

pub struct InputHandler;

impl InputHandler {
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        match app.mode {
            AppMode::Normal => Self::handle_normal_mode(app, key, modifiers),
            AppMode::Editing => Self::handle_text_input(app, key),
            AppMode::Prompt(kind) => Self::handle_prompt_mode(app, kind, key),
            AppMode::FormulaPicker => Self::handle_picker_mode(app, key),
            AppMode::Chart => Self::handle_chart_mode(app, key),
            AppMode::ConfirmNew => Self::handle_confirm_mode(app, key),
            AppMode::Help => Self::handle_help_mode(app, key),
        }
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('s') => app.start_save_as(),
                KeyCode::Char('o') => app.start_load_file(),
                KeyCode::Char('e') => app.start_csv_export(),
                KeyCode::Char('n') => app.start_new_project(),
                _ => {}
            }
            return;
        }

        app.status_message = None;

        match key {
            KeyCode::Up | KeyCode::Char('k') => app.move_up(),
            KeyCode::Down | KeyCode::Char('j') => app.move_down(),
            KeyCode::Left | KeyCode::Char('h') => app.move_left(),
            KeyCode::Right | KeyCode::Char('l') => app.move_right(),
            KeyCode::Enter | KeyCode::F(2) => app.start_editing(),
            KeyCode::Backspace => app.clear_selected_cell(),
            KeyCode::Char('r') => app.add_row(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_selected_row(),
            KeyCode::Char('c') => app.start_add_column(),
            KeyCode::Char('C') => app.start_remove_column(),
            KeyCode::Char('f') => app.start_formula(),
            KeyCode::Char('F') => app.remove_formula_for_selected_column(),
            KeyCode::Char('g') => app.start_chart(),
            KeyCode::Char('u') => app.toggle_auto_update(),
            KeyCode::F(5) => app.recompute_now(),
            KeyCode::F(1) | KeyCode::Char('?') => {
                app.mode = AppMode::Help;
                app.help_scroll = 0;
            }
            // 'q' is handled by the main loop
            _ => {}
        }
    }

    fn handle_prompt_mode(app: &mut App, kind: PromptKind, key: KeyCode) {
        if key != KeyCode::Enter {
            Self::handle_text_input(app, key);
            return;
        }

        match kind {
            PromptKind::SaveAs => {
                let filename = app.prompt_value_or("project.json");
                let result = FileRepository::save_project(&app.project, &filename);
                app.set_save_result(filename, result);
            }
            PromptKind::LoadFile => {
                let filename = app.prompt_value_or("project.json");
                let result = FileRepository::load_project(&filename);
                app.set_load_result(filename, result);
            }
            PromptKind::ExportCsv => {
                let filename = app.prompt_value_or("table.csv");
                let result = FileRepository::export_csv(&app.project, &filename);
                app.set_csv_export_result(filename, result);
            }
            _ => app.submit_prompt(),
        }
    }

    /// Line editing shared by cell editing and prompts.
    fn handle_text_input(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => app.finish_editing(),
            KeyCode::Esc => app.cancel_input(),
            KeyCode::Backspace => app.delete_char_before_cursor(),
            KeyCode::Delete => app.delete_char_at_cursor(),
            KeyCode::Left => app.cursor_left(),
            KeyCode::Right => app.cursor_right(),
            KeyCode::Home => app.cursor_home(),
            KeyCode::End => app.cursor_end(),
            KeyCode::Char(c) => app.insert_char(c),
            _ => {}
        }
    }

    fn handle_picker_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => app.picker_up(),
            KeyCode::Down | KeyCode::Char('j') => app.picker_down(),
            KeyCode::PageUp => {
                for _ in 0..5 {
                    app.picker_up();
                }
            }
            KeyCode::PageDown => {
                for _ in 0..5 {
                    app.picker_down();
                }
            }
            KeyCode::Enter => app.picker_select(),
            KeyCode::Esc | KeyCode::Char('q') => app.cancel_picker(),
            _ => {}
        }
    }

    fn handle_chart_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Char('t') => app.toggle_trendline(),
            KeyCode::Char('e') => app.toggle_equation(),
            KeyCode::Char('p') => app.toggle_polar(),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('g') => {
                app.close_chart()
            }
            _ => {}
        }
    }

    fn handle_confirm_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_new_project(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_new_project(false),
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.mode = AppMode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.help_scroll = app.help_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }
}
