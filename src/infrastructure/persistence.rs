use std::fs;
use std::path::Path;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::domain::{Project, Row, TableStore};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid file format - {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

/// On-disk project layout: the column order and the rows.
///
/// Formula bindings are not part of the file. Missing fields load as
/// empty. Row objects are written with their keys in column order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Row>,
}

impl ProjectFile {
    pub fn from_table(table: &TableStore) -> Self {
        Self {
            columns: table.columns().to_vec(),
            data: table.rows().to_vec(),
        }
    }

    /// Replaces the project's columns and rows with the file contents.
    pub fn apply_to(self, project: &mut Project) {
        project.replace_table(self.columns, self.data);
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Serialize for ProjectFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut file = serializer.serialize_struct("ProjectFile", 2)?;
        file.serialize_field("columns", &self.columns)?;
        file.serialize_field(
            "data",
            &OrderedRows {
                columns: &self.columns,
                rows: &self.data,
            },
        )?;
        file.end()
    }
}

struct OrderedRows<'a> {
    columns: &'a [String],
    rows: &'a [Row],
}

impl Serialize for OrderedRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.iter().map(|row| OrderedRow {
            columns: self.columns,
            row,
        }))
    }
}

struct OrderedRow<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl Serialize for OrderedRow<'_> {
    /// Column keys first, then any keys the column list does not name.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for column in self.columns {
            map.serialize_entry(column, self.row.get(column))?;
        }
        for key in self.row.keys() {
            if !self.columns.iter().any(|column| column == key) {
                map.serialize_entry(key, self.row.get(key))?;
            }
        }
        map.end()
    }
}

pub struct FileRepository;

impl FileRepository {
    pub fn save_project(project: &Project, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let json = ProjectFile::from_table(project.table()).to_json()?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), rows = project.rows().len(), "project saved");
        Ok(())
    }

    pub fn load_project(path: impl AsRef<Path>) -> Result<ProjectFile, PersistenceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let file = ProjectFile::from_json(&content)?;
        tracing::info!(path = %path.display(), rows = file.data.len(), "project loaded");
        Ok(file)
    }

    /// Writes the displayed cell values as CSV, header first.
    pub fn export_csv(project: &Project, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(project.columns())?;
        for row in project.rows() {
            writer.write_record(project.columns().iter().map(|col| row.get(col).display()))?;
        }
        writer.flush()?;
        tracing::info!(path = %path.display(), "table exported as CSV");
        Ok(())
    }
}
