//! Formula recalculation services.
//!
//! This module drives the bound formulas over the table: it pulls the two
//! source cells of every row, evaluates the binding's expression and writes
//! the rounded result, or a diagnostic, back into the target column.

use super::errors::{CellError, EvalResult, TableError, TableResult};
use super::formulas::{FormulaBinding, FormulaRegistry};
use super::models::{CellValue, Row, TableStore};
use super::parser::{parse_expression, Expr, ExpressionEvaluator};

/// Converts a stored cell into a formula operand.
///
/// Empty and blank cells count as `0.0`; text must parse as a number.
pub fn coerce_operand(value: &CellValue) -> Result<f64, CellError> {
    match value {
        CellValue::Empty => Ok(0.0),
        CellValue::Number(n) => Ok(*n),
        CellValue::Text(text) | CellValue::Error(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(0.0)
            } else {
                trimmed
                    .parse::<f64>()
                    .map_err(|_| CellError::Coercion(text.clone()))
            }
        }
    }
}

/// Rounds a formula result to two decimal places.
pub fn round_result(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid storing -0 for tiny negative results.
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Summary of one recompute pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecomputeReport {
    /// Bindings that were applied.
    pub bindings: usize,
    /// Target cells written, successful or not.
    pub cells_written: usize,
    /// Target cells that received a diagnostic instead of a number.
    pub cell_errors: usize,
    /// Targets of bindings skipped because the column no longer exists.
    pub skipped_targets: Vec<String>,
}

/// Orders bindings so that each one runs after every binding whose target
/// it reads. Independent bindings keep insertion order; bindings caught in a
/// cycle (self references aside) run last, also in insertion order.
pub fn evaluation_order(registry: &FormulaRegistry) -> Vec<&FormulaBinding> {
    let bindings: Vec<&FormulaBinding> = registry.all_bindings().collect();
    let reads = |reader: &FormulaBinding, writer: &FormulaBinding| {
        reader.target != writer.target
            && (reader.source1 == writer.target || reader.source2 == writer.target)
    };

    let mut done = vec![false; bindings.len()];
    let mut order = Vec::with_capacity(bindings.len());

    while let Some(next) = (0..bindings.len()).find(|&i| {
        !done[i]
            && (0..bindings.len()).all(|j| done[j] || !reads(bindings[i], bindings[j]))
    }) {
        done[next] = true;
        order.push(bindings[next]);
    }

    if order.len() < bindings.len() {
        let cyclic: Vec<&str> = (0..bindings.len())
            .filter(|&i| !done[i])
            .map(|i| bindings[i].target.as_str())
            .collect();
        tracing::warn!(?cyclic, "formula bindings form a cycle, applied in insertion order");
        order.extend((0..bindings.len()).filter(|&i| !done[i]).map(|i| bindings[i]));
    }

    order
}

/// Applies every formula binding to every row.
///
/// A pass never fails as a whole: failures are confined to the cell they
/// occur in and stored there as error text.
pub struct RecalculationEngine;

impl RecalculationEngine {
    pub fn recompute(table: &mut TableStore, registry: &FormulaRegistry) -> RecomputeReport {
        let mut report = RecomputeReport::default();

        for binding in evaluation_order(registry) {
            if !table.has_column(&binding.target) {
                tracing::warn!(target_column = %binding.target, "formula target column missing, binding skipped");
                report.skipped_targets.push(binding.target.clone());
                continue;
            }

            let parsed = parse_expression(&binding.expression);
            let missing = [&binding.source1, &binding.source2]
                .into_iter()
                .find(|column| !table.has_column(column));
            report.bindings += 1;

            for position in 0..table.row_count() {
                let row = &table.rows()[position];
                let value = match Self::evaluate_row(row, binding, &parsed, missing) {
                    Ok(result) => CellValue::Number(round_result(result)),
                    Err(err) => {
                        report.cell_errors += 1;
                        CellValue::Error(err.to_string())
                    }
                };

                if let Err(err) = table.set_cell(position, &binding.target, value) {
                    tracing::warn!(%err, "could not store formula result");
                    continue;
                }
                report.cells_written += 1;
            }
        }

        tracing::debug!(
            bindings = report.bindings,
            cells = report.cells_written,
            errors = report.cell_errors,
            "recompute pass finished"
        );
        report
    }

    fn evaluate_row(
        row: &Row,
        binding: &FormulaBinding,
        parsed: &EvalResult<Expr>,
        missing_source: Option<&String>,
    ) -> Result<f64, CellError> {
        if let Some(column) = missing_source {
            return Err(CellError::MissingSourceColumn(column.clone()));
        }
        let a = coerce_operand(row.get(&binding.source1))?;
        let b = coerce_operand(row.get(&binding.source2))?;

        let expr = parsed.as_ref().map_err(|err| CellError::Eval(err.clone()))?;
        Ok(ExpressionEvaluator::new(a, b).evaluate(expr)?)
    }
}

fn plot_value(value: &CellValue) -> Option<f64> {
    if value.is_empty() || value.display().trim().is_empty() {
        return None;
    }
    coerce_operand(value).ok()
}

/// Collects `(x, y)` pairs for two columns, skipping rows where either
/// cell is blank or not numeric.
pub fn numeric_series(table: &TableStore, x: &str, y: &str) -> TableResult<Vec<(f64, f64)>> {
    for column in [x, y] {
        if !table.has_column(column) {
            return Err(TableError::UnknownColumn(column.to_string()));
        }
    }

    Ok(table
        .rows()
        .iter()
        .filter_map(|row| {
            let x_val = plot_value(row.get(x))?;
            let y_val = plot_value(row.get(y))?;
            Some((x_val, y_val))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::EvalError;

    fn table_with(rows: &[(&str, &str)]) -> TableStore {
        let mut table = TableStore::with_columns(["C1", "C2", "C3"]).unwrap();
        for (c1, c2) in rows {
            let row = table.add_row();
            table.set_cell(row, "C1", *c1).unwrap();
            table.set_cell(row, "C2", *c2).unwrap();
        }
        table
    }

    fn registry_with(expression: &str) -> FormulaRegistry {
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("C3", "C1", "C2", expression));
        registry
    }

    #[test]
    fn test_coerce_operand() {
        assert_eq!(coerce_operand(&CellValue::Empty), Ok(0.0));
        assert_eq!(coerce_operand(&CellValue::text("  ")), Ok(0.0));
        assert_eq!(coerce_operand(&CellValue::text(" 2.5 ")), Ok(2.5));
        assert_eq!(coerce_operand(&CellValue::Number(-3.0)), Ok(-3.0));
        assert_eq!(
            coerce_operand(&CellValue::text("abc")),
            Err(CellError::Coercion("abc".to_string()))
        );
    }

    #[test]
    fn test_round_result() {
        assert_eq!(round_result(1.0 / 3.0), 0.33);
        assert_eq!(round_result(2.0 / 3.0), 0.67);
        assert_eq!(round_result(5.0), 5.0);
        assert_eq!(round_result(-0.001).to_string(), "0");
    }

    #[test]
    fn test_sum_binding() {
        let mut table = table_with(&[("2", "3")]);
        let report = RecalculationEngine::recompute(&mut table, &registry_with("A + B"));

        assert_eq!(table.get_cell(0, "C3").unwrap(), &CellValue::Number(5.0));
        assert_eq!(report.cells_written, 1);
        assert_eq!(report.cell_errors, 0);
    }

    #[test]
    fn test_results_are_rounded() {
        let mut table = table_with(&[("1", "3")]);
        RecalculationEngine::recompute(&mut table, &registry_with("A / B"));
        assert_eq!(table.get_cell(0, "C3").unwrap(), &CellValue::Number(0.33));
    }

    #[test]
    fn test_divide_by_zero_is_isolated_to_its_cell() {
        let mut table = table_with(&[("4", "0"), ("4", "2")]);
        let mut registry = registry_with("A / B");
        table.add_column("C4").unwrap();
        registry.set_binding(FormulaBinding::new("C4", "C1", "C2", "A + B"));

        let report = RecalculationEngine::recompute(&mut table, &registry);

        let expected = CellError::Eval(EvalError::DivideByZero).to_string();
        assert_eq!(table.get_cell(0, "C3").unwrap(), &CellValue::Error(expected));
        assert_eq!(table.get_cell(1, "C3").unwrap(), &CellValue::Number(2.0));
        assert_eq!(table.get_cell(0, "C4").unwrap(), &CellValue::Number(4.0));
        assert_eq!(table.get_cell(1, "C4").unwrap(), &CellValue::Number(6.0));
        assert_eq!(report.cell_errors, 1);
    }

    #[test]
    fn test_domain_error_text() {
        let mut table = table_with(&[("-1", "0")]);
        RecalculationEngine::recompute(&mut table, &registry_with("A ** 0.5"));

        match table.get_cell(0, "C3").unwrap() {
            CellValue::Error(text) => assert!(text.contains("math domain error"), "{text}"),
            other => panic!("expected error text, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_sources_count_as_zero() {
        let mut table = table_with(&[("", "")]);
        RecalculationEngine::recompute(&mut table, &registry_with("A + B + 1"));
        assert_eq!(table.get_cell(0, "C3").unwrap(), &CellValue::Number(1.0));
    }

    #[test]
    fn test_non_numeric_source() {
        let mut table = table_with(&[("abc", "1"), ("1", "1")]);
        RecalculationEngine::recompute(&mut table, &registry_with("A + B"));

        assert_eq!(
            table.get_cell(0, "C3").unwrap(),
            &CellValue::Error(CellError::Coercion("abc".to_string()).to_string())
        );
        assert_eq!(table.get_cell(1, "C3").unwrap(), &CellValue::Number(2.0));
    }

    #[test]
    fn test_missing_source_column_writes_error_per_row() {
        let mut table = table_with(&[("1", "2"), ("3", "4")]);
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("C3", "C1", "Gone", "A + B"));

        RecalculationEngine::recompute(&mut table, &registry);

        for position in 0..2 {
            assert_eq!(
                table.get_cell(position, "C3").unwrap(),
                &CellValue::Error("Missing column: Gone".to_string())
            );
        }
    }

    #[test]
    fn test_syntax_error_never_executes() {
        let mut table = table_with(&[("1", "2")]);
        RecalculationEngine::recompute(&mut table, &registry_with("__import__(A)"));

        match table.get_cell(0, "C3").unwrap() {
            CellValue::Error(text) => assert!(text.starts_with("Error: invalid syntax"), "{text}"),
            other => panic!("expected syntax error text, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let mut table = table_with(&[("1", "2")]);
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("Nowhere", "C1", "C2", "A + B"));
        let before = table.clone();

        let report = RecalculationEngine::recompute(&mut table, &registry);

        assert_eq!(table, before);
        assert_eq!(report.skipped_targets, vec!["Nowhere".to_string()]);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut table = table_with(&[("2", "3"), ("x", "1"), ("4", "0"), ("", "7")]);
        let registry = registry_with("A / B");

        RecalculationEngine::recompute(&mut table, &registry);
        let first = table.clone();
        RecalculationEngine::recompute(&mut table, &registry);

        assert_eq!(table, first);
    }

    #[test]
    fn test_error_cell_is_overwritten_once_sources_change() {
        let mut table = table_with(&[("4", "0")]);
        let registry = registry_with("A / B");

        RecalculationEngine::recompute(&mut table, &registry);
        assert!(table.get_cell(0, "C3").unwrap().is_error());

        table.set_cell(0, "C2", "2").unwrap();
        RecalculationEngine::recompute(&mut table, &registry);
        assert_eq!(table.get_cell(0, "C3").unwrap(), &CellValue::Number(2.0));
    }

    #[test]
    fn test_numeric_series_skips_non_numeric_rows() {
        let table = table_with(&[("1", "10"), ("two", "20"), ("3", ""), ("4", "40")]);

        let series = numeric_series(&table, "C1", "C2").unwrap();

        assert_eq!(series, vec![(1.0, 10.0), (4.0, 40.0)]);
        assert_eq!(
            numeric_series(&table, "C1", "Nope"),
            Err(TableError::UnknownColumn("Nope".to_string()))
        );
    }

    #[test]
    fn test_chained_bindings_settle_in_one_pass() {
        let mut table = table_with(&[("2", "3")]);
        table.add_column("C4").unwrap();
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("C4", "C3", "C1", "A * 2"));
        registry.set_binding(FormulaBinding::new("C3", "C1", "C2", "A + B"));

        RecalculationEngine::recompute(&mut table, &registry);
        let first = table.clone();
        assert_eq!(table.get_cell(0, "C3").unwrap(), &CellValue::Number(5.0));
        assert_eq!(table.get_cell(0, "C4").unwrap(), &CellValue::Number(10.0));

        RecalculationEngine::recompute(&mut table, &registry);
        assert_eq!(table, first);
    }

    #[test]
    fn test_evaluation_order() {
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("D", "C", "X", "A"));
        registry.set_binding(FormulaBinding::new("Y", "X", "X", "A"));
        registry.set_binding(FormulaBinding::new("C", "B", "X", "A"));
        registry.set_binding(FormulaBinding::new("B", "X", "B", "A"));

        let targets: Vec<&str> = evaluation_order(&registry)
            .iter()
            .map(|b| b.target.as_str())
            .collect();
        // Self references do not count as dependencies.
        assert_eq!(targets, vec!["Y", "B", "C", "D"]);
    }

    #[test]
    fn test_cyclic_bindings_keep_insertion_order() {
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("P", "Q", "Q", "A"));
        registry.set_binding(FormulaBinding::new("Q", "P", "P", "A"));
        registry.set_binding(FormulaBinding::new("R", "X", "X", "A"));

        let targets: Vec<&str> = evaluation_order(&registry)
            .iter()
            .map(|b| b.target.as_str())
            .collect();
        assert_eq!(targets, vec!["R", "P", "Q"]);
    }

    #[test]
    fn test_deeply_nested_formula_is_stored_as_syntax_error() {
        let mut table = table_with(&[("1", "2")]);
        let expression = format!("{}A{}", "(".repeat(200_000), ")".repeat(200_000));

        let report = RecalculationEngine::recompute(&mut table, &registry_with(&expression));

        assert_eq!(report.cell_errors, 1);
        assert_eq!(
            table.get_cell(0, "C3").unwrap(),
            &CellValue::Error("Error: invalid syntax: expression nested too deeply".to_string())
        );
    }
}
