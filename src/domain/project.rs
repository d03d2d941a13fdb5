use super::catalog::FormulaCatalog;
use super::errors::{ProjectError, TableResult};
use super::formulas::{FormulaBinding, FormulaRegistry};
use super::models::{CellValue, Row, TableStore};
use super::services::{numeric_series, RecalculationEngine, RecomputeReport};

/// Columns a fresh project starts with.
pub const DEFAULT_COLUMNS: [&str; 2] = ["Column1", "Column2"];

/// The table, its formula bindings and the auto-update flag.
///
/// This is the surface the user interface talks to. It owns both stores so
/// that column removal can cascade into the bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    table: TableStore,
    formulas: FormulaRegistry,
    auto_update: bool,
}

impl Default for Project {
    fn default() -> Self {
        let mut table = TableStore::new();
        table.replace(DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(), Vec::new());
        Self {
            table,
            formulas: FormulaRegistry::new(),
            auto_update: true,
        }
    }
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards everything and returns to the default schema. The
    /// auto-update flag is kept.
    pub fn reset(&mut self) {
        let auto_update = self.auto_update;
        *self = Self::default();
        self.auto_update = auto_update;
    }

    pub fn table(&self) -> &TableStore {
        &self.table
    }

    pub fn formulas(&self) -> &FormulaRegistry {
        &self.formulas
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn rows(&self) -> &[Row] {
        self.table.rows()
    }

    pub fn add_column(&mut self, name: impl Into<String>) -> TableResult<()> {
        self.table.add_column(name)
    }

    /// Removes a column together with the binding that targets it.
    ///
    /// Bindings that merely read from the column stay in place and report
    /// a missing column on the next recompute.
    pub fn remove_column(&mut self, name: &str) -> TableResult<()> {
        self.table.remove_column(name)?;
        if self.formulas.remove_binding(name).is_some() {
            tracing::debug!(column = name, "removed formula bound to deleted column");
        }
        Ok(())
    }

    pub fn add_row(&mut self) -> usize {
        self.table.add_row()
    }

    pub fn remove_row(&mut self, position: usize) -> TableResult<Row> {
        self.table.remove_row(position)
    }

    pub fn set_cell(
        &mut self,
        position: usize,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<()> {
        self.table.set_cell(position, column, value)
    }

    pub fn get_cell(&self, position: usize, column: &str) -> TableResult<&CellValue> {
        self.table.get_cell(position, column)
    }

    pub fn set_binding(&mut self, binding: FormulaBinding) {
        self.formulas.set_binding(binding);
    }

    /// Binds `target` to a copy of the named catalog formula.
    pub fn bind_catalog_formula(
        &mut self,
        target: &str,
        source1: &str,
        source2: &str,
        formula_name: &str,
        catalog: &FormulaCatalog,
    ) -> Result<(), ProjectError> {
        let expression = catalog
            .lookup(formula_name)
            .ok_or_else(|| ProjectError::UnknownFormula(formula_name.to_string()))?;
        self.formulas
            .set_binding(FormulaBinding::new(target, source1, source2, expression));
        Ok(())
    }

    pub fn remove_binding(&mut self, target: &str) -> Option<FormulaBinding> {
        self.formulas.remove_binding(target)
    }

    pub fn get_binding(&self, target: &str) -> Option<&FormulaBinding> {
        self.formulas.get_binding(target)
    }

    /// Runs one full recompute pass over all bindings.
    pub fn recompute(&mut self) -> RecomputeReport {
        RecalculationEngine::recompute(&mut self.table, &self.formulas)
    }

    pub fn auto_update_enabled(&self) -> bool {
        self.auto_update
    }

    /// Enables or suspends timer-driven recomputation. A pass that is
    /// already running is not affected.
    pub fn set_auto_update(&mut self, enabled: bool) {
        if self.auto_update != enabled {
            tracing::info!(enabled, "auto-update changed");
        }
        self.auto_update = enabled;
    }

    /// Numeric `(x, y)` pairs for plotting two columns.
    pub fn numeric_series(&self, x: &str, y: &str) -> TableResult<Vec<(f64, f64)>> {
        numeric_series(&self.table, x, y)
    }

    /// Replaces columns and rows wholesale.
    ///
    /// Bindings whose target column did not survive are dropped.
    pub fn replace_table(&mut self, columns: Vec<String>, rows: Vec<Row>) {
        self.table.replace(columns, rows);
        let table = &self.table;
        self.formulas.retain_targets(|target| table.has_column(target));
    }
}
