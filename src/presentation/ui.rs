use crate::application::{App, AppMode, ChartOptions, ChartView, PromptKind};
use crate::presentation::chart::chart_data;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    widgets::{
        Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, List, ListItem, ListState,
        Paragraph, Row, Table,
    },
    Frame,
};

const ROW_LABEL_WIDTH: usize = 4;
const MIN_COLUMN_WIDTH: usize = 6;
const MAX_COLUMN_WIDTH: usize = 24;

/// Rows of the terminal taken by everything except table body rows:
/// title line, status bar, table borders and the header row.
pub const NON_TABLE_ROWS: u16 = 1 + 3 + 2 + 1;

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_table(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    match app.mode {
        AppMode::Help => render_help_popup(f, app.help_scroll),
        AppMode::FormulaPicker => render_formula_picker(f, app),
        AppMode::Chart => {
            if let Some(chart) = &app.chart {
                render_chart_popup(f, chart, app.chart_options);
            }
        }
        _ => {}
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let column = app.selected_column().unwrap_or("-");
    let formula = app
        .project
        .get_binding(column)
        .map(|b| format!(" | {} = {}", column, b.expression))
        .unwrap_or_default();
    let header = Paragraph::new(format!(
        "coltab | Row {} / {} | Column: {} | Auto-update: {}{}",
        if app.project.rows().is_empty() { 0 } else { app.selected_row + 1 },
        app.project.rows().len(),
        column,
        on_off(app.project.auto_update_enabled()),
        formula
    ))
    .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

fn header_label(app: &App, column: &str) -> String {
    if app.project.get_binding(column).is_some() {
        format!("{}*", column)
    } else {
        column.to_string()
    }
}

fn column_width(app: &App, column: &str) -> usize {
    app.project
        .rows()
        .iter()
        .map(|row| row.get(column).display().chars().count())
        .chain(std::iter::once(header_label(app, column).chars().count()))
        .max()
        .unwrap_or(0)
        .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

/// First column to draw so that the selected one fits in `available` cells.
fn first_visible_column(widths: &[usize], selected: usize, available: usize) -> usize {
    let mut first = selected.min(widths.len().saturating_sub(1));
    let mut used = ROW_LABEL_WIDTH + widths.get(first).copied().unwrap_or(0) + 1;
    while first > 0 && used + widths[first - 1] + 1 <= available {
        first -= 1;
        used += widths[first] + 1;
    }
    first
}

fn render_table(f: &mut Frame, app: &App, area: Rect) {
    let visible_rows = (area.height as usize).saturating_sub(3);
    let available_width = (area.width as usize).saturating_sub(2);
    let columns = app.project.columns();
    let widths: Vec<usize> = columns.iter().map(|c| column_width(app, c)).collect();

    let first_col = first_visible_column(&widths, app.selected_col, available_width);
    let mut total_width = ROW_LABEL_WIDTH;
    let mut visible_cols = 0;
    for width in &widths[first_col..] {
        if total_width + width + 1 > available_width && visible_cols > 0 {
            break;
        }
        total_width += width + 1;
        visible_cols += 1;
    }
    let shown = first_col..first_col + visible_cols;

    let mut headers = vec![Cell::from("")];
    for col in shown.clone() {
        let header_style = if col == app.selected_col {
            Style::default().bg(Color::LightBlue).fg(Color::Black)
        } else {
            Style::default().fg(Color::Yellow)
        };
        headers.push(Cell::from(header_label(app, &columns[col])).style(header_style));
    }

    let mut rows = Vec::new();
    let row_count = app.project.rows().len();
    for row in app.scroll_row..row_count.min(app.scroll_row + visible_rows) {
        let row_number_style = if row == app.selected_row {
            Style::default().bg(Color::LightBlue).fg(Color::Black)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let mut cells = vec![Cell::from(format!("{}", row + 1)).style(row_number_style)];

        for col in shown.clone() {
            let value = app.project.rows()[row].get(&columns[col]);
            let style = if row == app.selected_row && col == app.selected_col {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else if value.is_error() {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            cells.push(Cell::from(value.display()).style(style));
        }

        rows.push(Row::new(cells).height(1));
    }

    let mut constraints = vec![Constraint::Length(ROW_LABEL_WIDTH as u16)];
    constraints.extend(shown.map(|col| Constraint::Length(widths[col] as u16)));

    let title = if row_count == 0 {
        "Table (press r to add a row)".to_string()
    } else {
        "Table".to_string()
    };
    let table = Table::new(rows, constraints)
        .header(Row::new(headers).height(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let input_text = match app.mode {
        AppMode::Normal => {
            if let Some(ref status) = app.status_message {
                status.clone()
            } else {
                let filename = app.filename.as_deref().unwrap_or("unsaved");
                format!(
                    "File: {} | f: formula | r: row | c: column | g: graph | F5: recompute | u: auto-update | ?: help | q: quit",
                    filename
                )
            }
        }
        AppMode::Editing => format!("Editing: {} (Enter to save, Esc to cancel)", app.input),
        AppMode::Prompt(kind) => format!("{}: {} (Enter to confirm, Esc to cancel)", kind.label(), app.input),
        AppMode::FormulaPicker => format!(
            "{} <- A: {}, B: {} | ↑↓: choose | Enter: apply | Esc: cancel",
            app.formula_draft.target, app.formula_draft.source1, app.formula_draft.source2
        ),
        AppMode::Chart => format!(
            "t: trendline ({}) | e: equation ({}) | p: polar ({}) | Esc/q: close chart",
            on_off(app.chart_options.trendline),
            on_off(app.chart_options.equation),
            on_off(app.chart_options.polar),
        ),
        AppMode::ConfirmNew => "Discard the current table and start a new project? (y/n)".to_string(),
        AppMode::Help => "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
    };

    let input = Paragraph::new(input_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(match app.mode {
            AppMode::Normal | AppMode::Chart => Style::default(),
            AppMode::Editing => Style::default().fg(Color::Green),
            AppMode::Prompt(PromptKind::SaveAs | PromptKind::LoadFile) => Style::default().fg(Color::Yellow),
            AppMode::Prompt(PromptKind::ExportCsv) => Style::default().fg(Color::Magenta),
            AppMode::Prompt(_) | AppMode::FormulaPicker => Style::default().fg(Color::Green),
            AppMode::ConfirmNew => Style::default().fg(Color::Red),
            AppMode::Help => Style::default().fg(Color::Cyan),
        });
    f.render_widget(input, area);
}

fn popup_area(area: Rect) -> Rect {
    Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    }
}

fn render_formula_picker(f: &mut Frame, app: &App) {
    let area = popup_area(f.area());
    f.render_widget(Clear, area);

    let mut items = vec![ListItem::new("Manual expression...").style(Style::default().fg(Color::Green))];
    items.extend(
        app.catalog
            .entries()
            .iter()
            .map(|entry| ListItem::new(format!("{:<24} {}", entry.name, entry.expression))),
    );

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Formula for {}", app.formula_draft.target)),
        )
        .highlight_style(Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.picker_index));
    f.render_stateful_widget(list, area, &mut state);
}

/// Axis bounds with a little padding; a degenerate range is widened.
fn axis_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    if min == max {
        return [min - 1.0, max + 1.0];
    }
    let pad = (max - min) * 0.05;
    [min - pad, max + pad]
}

fn axis_labels(bounds: [f64; 2]) -> Vec<String> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| format!("{:.2}", v))
        .collect()
}

fn render_chart_popup(f: &mut Frame, chart: &ChartView, options: ChartOptions) {
    let area = popup_area(f.area());
    f.render_widget(Clear, area);

    let data = chart_data(chart, options);
    let x_bounds = axis_bounds(data.points.iter().map(|p| p.0));
    let y_bounds = axis_bounds(data.points.iter().map(|p| p.1));

    let mut datasets = vec![
        Dataset::default()
            .name(format!("{} points", data.points.len()))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&data.points),
    ];
    if let Some(line) = &data.trendline {
        datasets.push(
            Dataset::default()
                .name("Trendline")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Red))
                .data(line),
        );
    }

    let widget = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(data.title.clone()),
        )
        .x_axis(
            Axis::default()
                .title(data.x_label.clone())
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title(data.y_label.clone())
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        );

    f.render_widget(widget, area);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let popup_area = popup_area(f.area());
    f.render_widget(Clear, popup_area);

    let help_lines: Vec<&str> = HELP_TEXT.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let visible_text = help_lines[start_line..end_line].join("\n");

    let help_widget = Paragraph::new(visible_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("coltab Help (Line {}/{})", start_line + 1, help_lines.len()))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

const HELP_TEXT: &str = r#"COLTAB FORMULA REFERENCE

=== BASIC CONCEPTS ===
• A formula is bound to a target column and reads two source columns
• A stands for the first source column, B for the second
• Every row of the target column is recomputed from its own row
• Results are rounded to 2 decimal places
• Empty source cells count as 0
• Columns marked with * in the header hold a formula

=== OPERATORS ===
+       Addition                    A + B
-       Subtraction / negation      A - B, -A
*       Multiplication              A * B
/       Division                    A / B
**      Power (right associative)   A ** 2, 2 ** 3 ** 2 → 512

=== FUNCTIONS AND CONSTANTS ===
sin(x) cos(x) tan(x)    Trigonometry (radians)
sqrt(x)                 Square root, x must not be negative
ln(x) log10(x)          Logarithms, x must be positive
pi                      3.14159...
Names are case insensitive.

=== ERRORS SHOWN IN CELLS ===
Error: division by zero          Dividing by 0
Error: math domain error: ...    sqrt(-1), ln(0), (-8) ** 0.5
Error: invalid syntax: ...       Expression could not be parsed
Error: could not convert '...'   Source cell is not a number
Missing column: NAME             A source column was deleted

=== TABLE ===
Arrow keys / hjkl   Move selection
Enter / F2          Edit selected cell
Backspace           Clear selected cell
r                   Add row
d / Delete          Delete selected row
c                   Add column
C                   Delete column (its formula goes with it)

=== FORMULAS ===
f                   Formula wizard: pick A, B, target, then a
                    predefined formula or a manual expression
F                   Remove the formula of the selected column
F5                  Recompute now
u                   Toggle auto-update (recompute on a timer)
g                   Plot two columns (auto-update pauses meanwhile)

=== CHART ===
t                   Toggle the least-squares trendline
e                   Toggle the trendline equation in the title
p                   Toggle polar mode: X is an angle in degrees,
                    Y the radius
Esc/q/Enter/g       Close the chart

=== FILES ===
Ctrl+S              Save project (JSON: columns and data)
Ctrl+O              Open project
Ctrl+E              Export table as CSV
Ctrl+N              New project
                    Formulas are not stored in project files

=== HELP NAVIGATION ===
↑↓ or j/k       Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/?/q      Close this help window"#;
