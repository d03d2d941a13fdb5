//! coltab - Terminal Table Library
//!
//! A terminal table whose columns can be bound to formulas over two other
//! columns, with a safe expression evaluator and JSON project files.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
