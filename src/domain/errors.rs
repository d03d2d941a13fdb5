use thiserror::Error;

/// Structural failures of table mutations. Returned synchronously; the
/// table is left untouched when one of these is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),
    #[error("Column not found: {0}")]
    UnknownColumn(String),
    #[error("Row {index} out of range (table has {len} rows)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Column name must not be empty")]
    EmptyColumnName,
}

/// Failures of the expression evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivideByZero,
    #[error("math domain error: {0}")]
    DomainError(String),
    #[error("invalid syntax: {0}")]
    Syntax(String),
}

/// A failure confined to a single target cell during a recompute pass.
///
/// The `Display` output is what ends up stored in the cell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error("Missing column: {0}")]
    MissingSourceColumn(String),
    #[error("Error: could not convert '{0}' to a number")]
    Coercion(String),
    #[error("Error: {0}")]
    Eval(#[from] EvalError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("Formula '{name}' does not parse: {source}")]
    InvalidTemplate { name: String, source: EvalError },
    #[error("Formula '{0}' is defined twice")]
    DuplicateName(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("Formula not found: {0}")]
    UnknownFormula(String),
}

pub type TableResult<T> = Result<T, TableError>;
pub type EvalResult<T> = Result<T, EvalError>;
