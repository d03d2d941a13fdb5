//! Application state management for the terminal table.
//!
//! This module contains the main application state and mode management
//! for the terminal user interface. All data changes go through the
//! [`Project`]; the state here only tracks selection, dialogs and
//! messages.

use crate::domain::{FormulaBinding, FormulaCatalog, Project};
use crate::infrastructure::{PersistenceError, ProjectFile};

/// Text prompts shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    AddColumn,
    RemoveColumn,
    FormulaSource1,
    FormulaSource2,
    FormulaTarget,
    FormulaExpression,
    ChartX,
    ChartY,
    SaveAs,
    LoadFile,
    ExportCsv,
}

impl PromptKind {
    pub fn label(self) -> &'static str {
        match self {
            PromptKind::AddColumn => "New column name",
            PromptKind::RemoveColumn => "Column to delete",
            PromptKind::FormulaSource1 => "First source column (A)",
            PromptKind::FormulaSource2 => "Second source column (B)",
            PromptKind::FormulaTarget => "Target column",
            PromptKind::FormulaExpression => "Expression using A and B",
            PromptKind::ChartX => "X column",
            PromptKind::ChartY => "Y column",
            PromptKind::SaveAs => "Save as",
            PromptKind::LoadFile => "Open project",
            PromptKind::ExportCsv => "Export CSV as",
        }
    }
}

/// Represents the current mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Navigation mode - arrow keys move the selection, shortcuts available
    Normal,
    /// The selected cell is being edited
    Editing,
    /// A text prompt is open
    Prompt(PromptKind),
    /// Choosing a catalog formula (or manual entry) for the formula wizard
    FormulaPicker,
    /// A chart of two columns is displayed
    Chart,
    /// Waiting for confirmation before discarding the project
    ConfirmNew,
    /// Help screen is displayed
    Help,
}

/// Column choices collected by the formula wizard so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaDraft {
    pub source1: String,
    pub source2: String,
    pub target: String,
}

/// Data for the chart popup.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub x_column: String,
    pub y_column: String,
    pub points: Vec<(f64, f64)>,
    /// Auto-update flag to restore when the chart closes.
    resume_auto_update: bool,
}

/// Chart display switches. They stay as set between charts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartOptions {
    /// Least-squares line through the points
    pub trendline: bool,
    /// Fitted equation in the chart title (needs the trendline)
    pub equation: bool,
    /// X read as an angle in degrees and Y as a radius
    pub polar: bool,
}

const DEFAULT_PROJECT_FILE: &str = "project.json";
const DEFAULT_CSV_FILE: &str = "table.csv";

/// Main application state containing the project and UI state.
#[derive(Debug)]
pub struct App {
    /// The table, bindings and auto-update flag
    pub project: Project,
    /// Predefined formulas offered by the formula wizard
    pub catalog: FormulaCatalog,
    /// Currently selected row (zero-based)
    pub selected_row: usize,
    /// Currently selected column (zero-based)
    pub selected_col: usize,
    /// Top row visible in the viewport
    pub scroll_row: usize,
    /// Current application mode
    pub mode: AppMode,
    /// Input buffer for cell editing and prompts
    pub input: String,
    /// Cursor position within the input buffer, in characters
    pub cursor_position: usize,
    /// Current filename (if the project has been saved/loaded)
    pub filename: Option<String>,
    /// Scroll position in help text
    pub help_scroll: usize,
    /// Temporary status message to display
    pub status_message: Option<String>,
    /// Formula wizard progress
    pub formula_draft: FormulaDraft,
    /// Highlighted entry in the formula picker; 0 is manual entry
    pub picker_index: usize,
    /// Open chart, if any
    pub chart: Option<ChartView>,
    pub chart_options: ChartOptions,
    /// X column chosen while the chart prompts are open
    pub chart_x: String,
    /// Viewport height in rows (for scrolling calculations)
    pub viewport_rows: usize,
}

impl App {
    pub fn new(project: Project, catalog: FormulaCatalog) -> Self {
        Self {
            project,
            catalog,
            selected_row: 0,
            selected_col: 0,
            scroll_row: 0,
            mode: AppMode::Normal,
            input: String::new(),
            cursor_position: 0,
            filename: None,
            help_scroll: 0,
            status_message: None,
            formula_draft: FormulaDraft::default(),
            picker_index: 0,
            chart: None,
            chart_options: ChartOptions::default(),
            chart_x: String::new(),
            viewport_rows: 20,
        }
    }

    pub fn selected_column(&self) -> Option<&str> {
        self.project
            .columns()
            .get(self.selected_col)
            .map(String::as_str)
    }

    /// Runs a recompute pass on the timer's behalf if auto-update is on.
    pub fn on_tick(&mut self) -> bool {
        if !self.project.auto_update_enabled() {
            return false;
        }
        self.project.recompute();
        true
    }

    /// Recomputes right away and reports the outcome.
    pub fn recompute_now(&mut self) {
        let report = self.project.recompute();
        self.status_message = Some(format!(
            "Recomputed {} formula(s), {} cell error(s)",
            report.bindings, report.cell_errors
        ));
    }

    pub fn toggle_auto_update(&mut self) {
        let enabled = !self.project.auto_update_enabled();
        self.project.set_auto_update(enabled);
        self.status_message = Some(format!(
            "Auto-update {}",
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    // ----- navigation -------------------------------------------------

    pub fn move_up(&mut self) {
        if self.selected_row > 0 {
            self.selected_row -= 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn move_down(&mut self) {
        if self.selected_row + 1 < self.project.rows().len() {
            self.selected_row += 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn move_left(&mut self) {
        self.selected_col = self.selected_col.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.selected_col + 1 < self.project.columns().len() {
            self.selected_col += 1;
        }
    }

    pub fn update_viewport_size(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
        self.ensure_cursor_visible();
    }

    pub fn ensure_cursor_visible(&mut self) {
        if self.selected_row < self.scroll_row {
            self.scroll_row = self.selected_row;
        } else if self.selected_row >= self.scroll_row + self.viewport_rows {
            self.scroll_row = self.selected_row + 1 - self.viewport_rows;
        }
    }

    /// Keeps the selection inside the table after structural changes.
    fn clamp_selection(&mut self) {
        let rows = self.project.rows().len();
        let cols = self.project.columns().len();
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
        self.selected_col = self.selected_col.min(cols.saturating_sub(1));
        self.scroll_row = self.scroll_row.min(self.selected_row);
        self.ensure_cursor_visible();
    }

    // ----- rows and cells ---------------------------------------------

    pub fn add_row(&mut self) {
        self.selected_row = self.project.add_row();
        self.ensure_cursor_visible();
        self.project.recompute();
    }

    pub fn delete_selected_row(&mut self) {
        match self.project.remove_row(self.selected_row) {
            Ok(_) => {
                self.clamp_selection();
                self.project.recompute();
            }
            Err(_) => self.status_message = Some("No row selected.".to_string()),
        }
    }

    /// Switches to editing mode for the selected cell.
    pub fn start_editing(&mut self) {
        let Some(column) = self.selected_column() else {
            self.status_message = Some("No column to edit.".to_string());
            return;
        };
        let current = match self.project.get_cell(self.selected_row, column) {
            Ok(value) => value.display(),
            Err(_) => {
                self.status_message = Some("No row selected.".to_string());
                return;
            }
        };
        self.open_input(AppMode::Editing, current);
    }

    /// Stores the edited text and recomputes.
    pub fn finish_editing(&mut self) {
        let value = self.input.trim().to_string();
        if let Some(column) = self.selected_column().map(str::to_string) {
            if let Err(err) = self.project.set_cell(self.selected_row, &column, value) {
                self.status_message = Some(err.to_string());
            }
            self.project.recompute();
        }
        self.close_input();
    }

    pub fn clear_selected_cell(&mut self) {
        if let Some(column) = self.selected_column().map(str::to_string) {
            if self.project.set_cell(self.selected_row, &column, "").is_ok() {
                self.project.recompute();
            }
        }
    }

    // ----- prompts ----------------------------------------------------

    pub fn start_prompt(&mut self, kind: PromptKind, initial: impl Into<String>) {
        self.open_input(AppMode::Prompt(kind), initial.into());
    }

    pub fn start_add_column(&mut self) {
        self.start_prompt(PromptKind::AddColumn, "");
    }

    pub fn start_remove_column(&mut self) {
        if self.project.columns().is_empty() {
            self.status_message = Some("No columns to delete.".to_string());
            return;
        }
        let initial = self.selected_column().unwrap_or_default().to_string();
        self.start_prompt(PromptKind::RemoveColumn, initial);
    }

    pub fn start_formula(&mut self) {
        if self.project.columns().len() < 2 {
            self.status_message =
                Some("At least two columns are needed to set a formula.".to_string());
            return;
        }
        self.formula_draft = FormulaDraft::default();
        let first = self.project.columns()[0].clone();
        self.start_prompt(PromptKind::FormulaSource1, first);
    }

    pub fn start_chart(&mut self) {
        let Some(first) = self.project.columns().first().cloned() else {
            self.status_message = Some("No columns to plot.".to_string());
            return;
        };
        self.start_prompt(PromptKind::ChartX, first);
    }

    pub fn start_save_as(&mut self) {
        let initial = self
            .filename
            .clone()
            .unwrap_or_else(|| DEFAULT_PROJECT_FILE.to_string());
        self.start_prompt(PromptKind::SaveAs, initial);
    }

    pub fn start_load_file(&mut self) {
        let initial = self
            .filename
            .clone()
            .unwrap_or_else(|| DEFAULT_PROJECT_FILE.to_string());
        self.start_prompt(PromptKind::LoadFile, initial);
    }

    pub fn start_csv_export(&mut self) {
        let initial = self
            .filename
            .as_ref()
            .map(|f| f.replace(".json", ".csv"))
            .unwrap_or_else(|| DEFAULT_CSV_FILE.to_string());
        self.start_prompt(PromptKind::ExportCsv, initial);
    }

    /// Returns the prompt's trimmed text, or the given default when empty.
    pub fn prompt_value_or(&self, default: &str) -> String {
        let value = self.input.trim();
        if value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    }

    pub fn cancel_input(&mut self) {
        if matches!(
            self.mode,
            AppMode::Prompt(PromptKind::ChartX | PromptKind::ChartY)
        ) {
            self.chart_x.clear();
        }
        self.close_input();
    }

    /// Handles Enter on a prompt that does not touch the file system.
    pub fn submit_prompt(&mut self) {
        let AppMode::Prompt(kind) = self.mode else {
            return;
        };
        let value = self.input.trim().to_string();

        match kind {
            PromptKind::AddColumn => {
                self.close_input();
                match self.project.add_column(value) {
                    Ok(()) => {
                        self.selected_col = self.project.columns().len() - 1;
                        self.project.recompute();
                    }
                    Err(err) => self.status_message = Some(err.to_string()),
                }
            }
            PromptKind::RemoveColumn => {
                self.close_input();
                match self.project.remove_column(&value) {
                    Ok(()) => {
                        self.clamp_selection();
                        self.project.recompute();
                        self.status_message = Some(format!("Deleted column {}", value));
                    }
                    Err(err) => self.status_message = Some(err.to_string()),
                }
            }
            PromptKind::FormulaSource1 => {
                if self.require_column(&value) {
                    self.formula_draft.source1 = value;
                    let second = self.project.columns().get(1).cloned().unwrap_or_default();
                    self.start_prompt(PromptKind::FormulaSource2, second);
                }
            }
            PromptKind::FormulaSource2 => {
                if self.require_column(&value) {
                    self.formula_draft.source2 = value;
                    let target = self.selected_column().unwrap_or_default().to_string();
                    self.start_prompt(PromptKind::FormulaTarget, target);
                }
            }
            PromptKind::FormulaTarget => {
                if self.require_column(&value) {
                    self.formula_draft.target = value;
                    self.close_input();
                    self.picker_index = 0;
                    self.mode = AppMode::FormulaPicker;
                }
            }
            PromptKind::FormulaExpression => {
                self.close_input();
                if value.is_empty() {
                    self.status_message = Some("Formula not changed.".to_string());
                    return;
                }
                let draft = std::mem::take(&mut self.formula_draft);
                self.apply_binding(FormulaBinding::new(
                    draft.target,
                    draft.source1,
                    draft.source2,
                    value,
                ));
            }
            PromptKind::ChartX => {
                if self.require_column(&value) {
                    let y = self
                        .project
                        .columns()
                        .get(1)
                        .cloned()
                        .unwrap_or_else(|| value.clone());
                    self.chart_x = value;
                    self.start_prompt(PromptKind::ChartY, y);
                }
            }
            PromptKind::ChartY => {
                self.close_input();
                let x = std::mem::take(&mut self.chart_x);
                self.open_chart(&x, &value);
            }
            PromptKind::SaveAs | PromptKind::LoadFile | PromptKind::ExportCsv => {
                // File prompts are completed by the input handler, which
                // performs the I/O and reports back through set_*_result.
            }
        }
    }

    fn require_column(&mut self, name: &str) -> bool {
        if self.project.table().has_column(name) {
            return true;
        }
        self.close_input();
        self.status_message = Some(format!("Column not found: {}", name));
        false
    }

    // ----- formula picker ---------------------------------------------

    /// Number of picker entries: manual entry plus every catalog formula.
    pub fn picker_len(&self) -> usize {
        self.catalog.len() + 1
    }

    pub fn picker_up(&mut self) {
        self.picker_index = self.picker_index.saturating_sub(1);
    }

    pub fn picker_down(&mut self) {
        if self.picker_index + 1 < self.picker_len() {
            self.picker_index += 1;
        }
    }

    pub fn picker_select(&mut self) {
        if self.picker_index == 0 {
            let existing = self
                .project
                .get_binding(&self.formula_draft.target)
                .map(|b| b.expression.clone())
                .unwrap_or_default();
            self.start_prompt(PromptKind::FormulaExpression, existing);
            return;
        }

        let Some(name) = self
            .catalog
            .entries()
            .get(self.picker_index - 1)
            .map(|entry| entry.name.clone())
        else {
            return;
        };
        let draft = std::mem::take(&mut self.formula_draft);
        self.mode = AppMode::Normal;

        match self.project.bind_catalog_formula(
            &draft.target,
            &draft.source1,
            &draft.source2,
            &name,
            &self.catalog,
        ) {
            Ok(()) => {
                self.project.recompute();
                self.status_message = Some(format!(
                    "{} = {} (A = {}, B = {})",
                    draft.target, name, draft.source1, draft.source2
                ));
            }
            Err(err) => self.status_message = Some(err.to_string()),
        }
    }

    pub fn cancel_picker(&mut self) {
        self.formula_draft = FormulaDraft::default();
        self.mode = AppMode::Normal;
    }

    fn apply_binding(&mut self, binding: FormulaBinding) {
        let message = format!(
            "{} = {} (A = {}, B = {})",
            binding.target, binding.expression, binding.source1, binding.source2
        );
        self.project.set_binding(binding);
        self.project.recompute();
        self.status_message = Some(message);
    }

    pub fn remove_formula_for_selected_column(&mut self) {
        let Some(column) = self.selected_column().map(str::to_string) else {
            return;
        };
        self.status_message = Some(match self.project.remove_binding(&column) {
            Some(_) => format!("Removed formula for {}", column),
            None => format!("{} has no formula", column),
        });
    }

    // ----- chart ------------------------------------------------------

    /// Opens the chart and suspends auto-update while it is shown.
    pub fn open_chart(&mut self, x: &str, y: &str) {
        let points = match self.project.numeric_series(x, y) {
            Ok(points) => points,
            Err(err) => {
                self.status_message = Some(err.to_string());
                return;
            }
        };
        if points.is_empty() {
            self.status_message = Some("Not enough numeric data to plot.".to_string());
            return;
        }

        let resume_auto_update = self.project.auto_update_enabled();
        self.project.set_auto_update(false);
        self.chart = Some(ChartView {
            x_column: x.to_string(),
            y_column: y.to_string(),
            points,
            resume_auto_update,
        });
        self.mode = AppMode::Chart;
    }

    pub fn close_chart(&mut self) {
        if let Some(chart) = self.chart.take() {
            self.project.set_auto_update(chart.resume_auto_update);
        }
        self.mode = AppMode::Normal;
    }

    pub fn toggle_trendline(&mut self) {
        self.chart_options.trendline = !self.chart_options.trendline;
    }

    pub fn toggle_equation(&mut self) {
        self.chart_options.equation = !self.chart_options.equation;
    }

    pub fn toggle_polar(&mut self) {
        self.chart_options.polar = !self.chart_options.polar;
    }

    // ----- project lifecycle ------------------------------------------

    pub fn start_new_project(&mut self) {
        self.mode = AppMode::ConfirmNew;
        self.status_message = None;
    }

    pub fn confirm_new_project(&mut self, confirmed: bool) {
        if confirmed {
            self.project.reset();
            self.filename = None;
            self.reset_view();
            self.status_message = Some("New project".to_string());
        }
        self.mode = AppMode::Normal;
    }

    pub fn set_save_result(&mut self, filename: String, result: Result<(), PersistenceError>) {
        match result {
            Ok(()) => {
                self.status_message = Some(format!("Saved to {}", filename));
                self.filename = Some(filename);
            }
            Err(error) => {
                self.status_message = Some(format!("Save failed: {}", error));
            }
        }
        self.close_input();
    }

    /// Replaces the table with a loaded file. Bindings whose target column
    /// still exists are kept and recomputed.
    pub fn set_load_result(&mut self, filename: String, result: Result<ProjectFile, PersistenceError>) {
        match result {
            Ok(file) => {
                file.apply_to(&mut self.project);
                self.project.recompute();
                self.reset_view();
                self.status_message = Some(format!("Loaded from {}", filename));
                self.filename = Some(filename);
            }
            Err(error) => {
                self.status_message = Some(format!("Load failed: {}", error));
            }
        }
        self.close_input();
    }

    pub fn set_csv_export_result(&mut self, filename: String, result: Result<(), PersistenceError>) {
        self.status_message = Some(match result {
            Ok(()) => format!("Exported to {}", filename),
            Err(error) => format!("Export failed: {}", error),
        });
        self.close_input();
    }

    fn reset_view(&mut self) {
        self.selected_row = 0;
        self.selected_col = 0;
        self.scroll_row = 0;
    }

    // ----- input buffer -----------------------------------------------

    fn open_input(&mut self, mode: AppMode, initial: String) {
        self.mode = mode;
        self.cursor_position = initial.chars().count();
        self.input = initial;
        self.status_message = None;
    }

    fn close_input(&mut self) {
        self.mode = AppMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(offset, _)| offset)
            .unwrap_or(self.input.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let offset = self.byte_offset(self.cursor_position);
        self.input.insert(offset, c);
        self.cursor_position += 1;
    }

    pub fn delete_char_before_cursor(&mut self) {
        if self.cursor_position > 0 {
            let offset = self.byte_offset(self.cursor_position - 1);
            self.input.remove(offset);
            self.cursor_position -= 1;
        }
    }

    pub fn delete_char_at_cursor(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            let offset = self.byte_offset(self.cursor_position);
            self.input.remove(offset);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            self.cursor_position += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input.chars().count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellValue;

    fn test_app() -> App {
        App::new(Project::new(), FormulaCatalog::builtin().unwrap())
    }

    fn type_text(app: &mut App, text: &str) {
        app.input.clear();
        app.cursor_position = 0;
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    fn submit(app: &mut App, text: &str) {
        type_text(app, text);
        app.submit_prompt();
    }

    #[test]
    fn test_app_default() {
        let app = test_app();
        assert_eq!(app.selected_row, 0);
        assert_eq!(app.selected_col, 0);
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.selected_column(), Some("Column1"));
    }

    #[test]
    fn test_edit_cell_triggers_recompute() {
        let mut app = test_app();
        app.add_row();
        app.project.add_column("Sum").unwrap();
        app.project
            .set_binding(FormulaBinding::new("Sum", "Column1", "Column2", "A + B"));

        app.start_editing();
        assert_eq!(app.mode, AppMode::Editing);
        type_text(&mut app, " 4 ");
        app.finish_editing();

        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.project.get_cell(0, "Column1").unwrap(), &CellValue::text("4"));
        assert_eq!(app.project.get_cell(0, "Sum").unwrap(), &CellValue::Number(4.0));
    }

    #[test]
    fn test_start_editing_without_rows() {
        let mut app = test_app();
        app.start_editing();
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_add_and_remove_column_prompts() {
        let mut app = test_app();

        app.start_add_column();
        submit(&mut app, "Mass");
        assert_eq!(app.project.columns().last().map(String::as_str), Some("Mass"));
        assert_eq!(app.selected_col, 2);

        app.start_add_column();
        submit(&mut app, "Mass");
        assert_eq!(app.status_message.as_deref(), Some("Column already exists: Mass"));

        app.start_remove_column();
        assert_eq!(app.input, "Mass");
        app.submit_prompt();
        assert_eq!(app.project.columns().len(), 2);
        assert_eq!(app.selected_col, 1);
    }

    #[test]
    fn test_delete_row_clamps_selection() {
        let mut app = test_app();
        app.add_row();
        app.add_row();
        assert_eq!(app.selected_row, 1);

        app.delete_selected_row();
        assert_eq!(app.selected_row, 0);
        app.delete_selected_row();
        assert!(app.project.rows().is_empty());

        app.delete_selected_row();
        assert_eq!(app.status_message.as_deref(), Some("No row selected."));
    }

    #[test]
    fn test_formula_wizard_with_catalog_entry() {
        let mut app = test_app();
        app.project.add_column("Out").unwrap();
        app.add_row();
        app.project.set_cell(0, "Column1", "3").unwrap();
        app.project.set_cell(0, "Column2", "4").unwrap();

        app.start_formula();
        assert_eq!(app.mode, AppMode::Prompt(PromptKind::FormulaSource1));
        submit(&mut app, "Column1");
        submit(&mut app, "Column2");
        submit(&mut app, "Out");
        assert_eq!(app.mode, AppMode::FormulaPicker);

        // Picker entry 3 is "Product"; entry 0 is manual input.
        for _ in 0..3 {
            app.picker_down();
        }
        app.picker_select();

        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.project.get_binding("Out").unwrap().expression, "A * B");
        assert_eq!(app.project.get_cell(0, "Out").unwrap(), &CellValue::Number(12.0));
    }

    #[test]
    fn test_formula_wizard_with_manual_expression() {
        let mut app = test_app();
        app.add_row();
        app.project.set_cell(0, "Column1", "9").unwrap();

        app.start_formula();
        submit(&mut app, "Column1");
        submit(&mut app, "Column1");
        submit(&mut app, "Column2");
        app.picker_select();
        assert_eq!(app.mode, AppMode::Prompt(PromptKind::FormulaExpression));
        submit(&mut app, "sqrt(A) + B");

        assert_eq!(app.project.get_cell(0, "Column2").unwrap(), &CellValue::Number(12.0));
    }

    #[test]
    fn test_formula_wizard_rejects_unknown_column() {
        let mut app = test_app();
        app.start_formula();
        submit(&mut app, "Nope");

        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.status_message.as_deref(), Some("Column not found: Nope"));
        assert!(app.project.formulas().is_empty());
    }

    #[test]
    fn test_formula_needs_two_columns() {
        let mut app = test_app();
        app.project.remove_column("Column2").unwrap();
        app.start_formula();
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_remove_formula_for_selected_column() {
        let mut app = test_app();
        app.project
            .set_binding(FormulaBinding::new("Column1", "Column2", "Column2", "A"));

        app.remove_formula_for_selected_column();

        assert!(app.project.formulas().is_empty());
        assert_eq!(app.status_message.as_deref(), Some("Removed formula for Column1"));
    }

    #[test]
    fn test_on_tick_respects_auto_update_flag() {
        let mut app = test_app();
        app.project.add_column("Out").unwrap();
        app.project.add_row();
        app.project.set_cell(0, "Column1", "1").unwrap();
        app.project
            .set_binding(FormulaBinding::new("Out", "Column1", "Column2", "A + 1"));

        app.project.set_auto_update(false);
        assert!(!app.on_tick());
        assert_eq!(app.project.get_cell(0, "Out").unwrap(), &CellValue::Empty);

        app.toggle_auto_update();
        assert!(app.on_tick());
        assert_eq!(app.project.get_cell(0, "Out").unwrap(), &CellValue::Number(2.0));
    }

    #[test]
    fn test_chart_suspends_and_restores_auto_update() {
        let mut app = test_app();
        app.add_row();
        app.project.set_cell(0, "Column1", "1").unwrap();
        app.project.set_cell(0, "Column2", "2").unwrap();

        app.start_chart();
        submit(&mut app, "Column1");
        submit(&mut app, "Column2");

        assert_eq!(app.mode, AppMode::Chart);
        assert!(!app.project.auto_update_enabled());
        assert_eq!(app.chart.as_ref().unwrap().points, vec![(1.0, 2.0)]);

        app.close_chart();
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.project.auto_update_enabled());
    }

    #[test]
    fn test_chart_options_survive_closing_the_chart() {
        let mut app = test_app();
        assert_eq!(app.chart_options, ChartOptions::default());

        app.toggle_trendline();
        app.toggle_equation();
        app.toggle_polar();
        app.toggle_polar();
        app.close_chart();

        assert_eq!(
            app.chart_options,
            ChartOptions {
                trendline: true,
                equation: true,
                polar: false,
            }
        );
    }

    #[test]
    fn test_chart_without_numeric_data() {
        let mut app = test_app();
        app.add_row();
        app.open_chart("Column1", "Column2");
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.chart.is_none());
        assert!(app.project.auto_update_enabled());
    }

    #[test]
    fn test_new_project_confirmation() {
        let mut app = test_app();
        app.add_row();
        app.filename = Some("old.json".to_string());

        app.start_new_project();
        app.confirm_new_project(false);
        assert_eq!(app.project.rows().len(), 1);

        app.start_new_project();
        app.confirm_new_project(true);
        assert!(app.project.rows().is_empty());
        assert!(app.filename.is_none());
    }

    #[test]
    fn test_save_and_load_results() {
        let mut app = test_app();
        app.start_save_as();
        assert_eq!(app.input, "project.json");

        app.set_save_result("a.json".to_string(), Ok(()));
        assert_eq!(app.filename.as_deref(), Some("a.json"));
        assert_eq!(app.mode, AppMode::Normal);

        let file = ProjectFile::from_json(r#"{"columns": ["X"], "data": [{"X": 5}]}"#).unwrap();
        app.set_load_result("b.json".to_string(), Ok(file));
        assert_eq!(app.project.columns(), &["X".to_string()]);
        assert_eq!(app.filename.as_deref(), Some("b.json"));

        let err = ProjectFile::from_json("{").unwrap_err();
        app.set_load_result("c.json".to_string(), Err(err));
        assert!(app.status_message.as_deref().unwrap().starts_with("Load failed"));
        assert_eq!(app.filename.as_deref(), Some("b.json"));
    }

    #[test]
    fn test_csv_export_default_name() {
        let mut app = test_app();
        app.start_csv_export();
        assert_eq!(app.input, "table.csv");

        app.cancel_input();
        app.filename = Some("physics.json".to_string());
        app.start_csv_export();
        assert_eq!(app.input, "physics.csv");
    }

    #[test]
    fn test_input_editing_handles_multibyte_text() {
        let mut app = test_app();
        app.start_add_column();
        type_text(&mut app, "μs");
        app.cursor_left();
        app.insert_char('x');
        assert_eq!(app.input, "μxs");
        app.delete_char_before_cursor();
        app.delete_char_before_cursor();
        assert_eq!(app.input, "s");
        app.cursor_end();
        app.delete_char_at_cursor();
        assert_eq!(app.input, "s");
        app.cursor_home();
        app.delete_char_at_cursor();
        assert_eq!(app.input, "");
    }

    #[test]
    fn test_viewport_scrolling() {
        let mut app = test_app();
        for _ in 0..30 {
            app.add_row();
        }
        app.update_viewport_size(10);
        assert_eq!(app.selected_row, 29);
        assert_eq!(app.scroll_row, 20);

        for _ in 0..25 {
            app.move_up();
        }
        assert_eq!(app.selected_row, 4);
        assert_eq!(app.scroll_row, 4);
    }
}
