use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{TableError, TableResult};

/// The value stored in a single cell.
///
/// Error text is an ordinary value: it is what a recompute pass writes when
/// a formula fails for this row, and it is replaced as soon as the pass
/// succeeds again.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Error(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Builds a cell from user-entered text; blank input becomes `Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Renders the cell the way it is shown and exported.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) | CellValue::Error(text) => text.clone(),
            CellValue::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CellValue::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            other => serializer.serialize_str(&other.display()),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct CellValueVisitor;

        impl<'de> Visitor<'de> for CellValueVisitor {
            type Value = CellValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or a number")
            }

            fn visit_str<E: Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(CellValue::text(value))
            }

            fn visit_string<E: Error>(self, value: String) -> Result<Self::Value, E> {
                Ok(CellValue::text(value))
            }

            fn visit_f64<E: Error>(self, value: f64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(value))
            }

            fn visit_i64<E: Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(value as f64))
            }

            fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(value as f64))
            }

            fn visit_bool<E: Error>(self, value: bool) -> Result<Self::Value, E> {
                Ok(CellValue::Text(value.to_string()))
            }

            fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
                Ok(CellValue::Empty)
            }

            fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
                Ok(CellValue::Empty)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_any(CellValueVisitor)
            }
        }

        deserializer.deserialize_any(CellValueVisitor)
    }
}

/// One table row: column name to cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    fn blank(columns: &[String]) -> Self {
        Self {
            cells: columns
                .iter()
                .map(|col| (col.clone(), CellValue::Empty))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Makes the key set equal to `columns`: missing keys are added empty,
    /// keys outside the schema are dropped.
    fn reconcile(&mut self, columns: &[String]) {
        self.cells.retain(|key, _| columns.contains(key));
        for col in columns {
            self.cells.entry(col.clone()).or_default();
        }
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ordered columns plus ordered rows.
///
/// Every row's key set always equals the column list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableStore {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with the given schema.
    pub fn with_columns<I, S>(columns: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for col in columns {
            table.add_column(col)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == name)
    }

    /// Appends a column and backfills every row with an empty cell.
    ///
    /// Surrounding whitespace is trimmed; names compare case-sensitively.
    pub fn add_column(&mut self, name: impl Into<String>) -> TableResult<()> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(TableError::EmptyColumnName);
        }
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }

        for row in &mut self.rows {
            row.cells.insert(name.clone(), CellValue::Empty);
        }
        self.columns.push(name);
        Ok(())
    }

    /// Removes a column and its key from every row.
    ///
    /// Formula bindings are not known here; see `Project::remove_column`
    /// for the cascading variant.
    pub fn remove_column(&mut self, name: &str) -> TableResult<()> {
        let index = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;

        self.columns.remove(index);
        for row in &mut self.rows {
            row.cells.remove(name);
        }
        Ok(())
    }

    /// Appends an empty row and returns its position.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(Row::blank(&self.columns));
        self.rows.len() - 1
    }

    /// Removes the row at `position`; later rows shift down by one.
    pub fn remove_row(&mut self, position: usize) -> TableResult<Row> {
        self.check_position(position)?;
        Ok(self.rows.remove(position))
    }

    pub fn set_cell(
        &mut self,
        position: usize,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<()> {
        self.check_position(position)?;
        if !self.has_column(column) {
            return Err(TableError::UnknownColumn(column.to_string()));
        }
        self.rows[position].cells.insert(column.to_string(), value.into());
        Ok(())
    }

    /// Returns the stored value, or `Empty` if the row lacks the key.
    pub fn get_cell(&self, position: usize, column: &str) -> TableResult<&CellValue> {
        self.check_position(position)?;
        if !self.has_column(column) {
            return Err(TableError::UnknownColumn(column.to_string()));
        }
        Ok(self.rows[position].get(column))
    }

    /// Replaces the whole table. Duplicate and blank column names are
    /// dropped and every row is reconciled to the resulting schema.
    pub fn replace(&mut self, columns: Vec<String>, rows: Vec<Row>) {
        let mut schema: Vec<String> = Vec::with_capacity(columns.len());
        for col in columns {
            let col = col.trim().to_string();
            if !col.is_empty() && !schema.contains(&col) {
                schema.push(col);
            }
        }

        self.rows = rows
            .into_iter()
            .map(|mut row| {
                row.reconcile(&schema);
                row
            })
            .collect();
        self.columns = schema;
    }

    fn check_position(&self, position: usize) -> TableResult<()> {
        if position >= self.rows.len() {
            Err(TableError::IndexOutOfRange {
                index: position,
                len: self.rows.len(),
            })
        } else {
            Ok(())
        }
    }
}
