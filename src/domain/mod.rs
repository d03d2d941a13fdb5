pub mod catalog;
pub mod errors;
pub mod formulas;
pub mod models;
pub mod parser;
pub mod project;
pub mod services;

pub use catalog::*;
pub use errors::*;
pub use formulas::*;
pub use models::*;
pub use parser::evaluate;
pub use project::*;
pub use services::*;
