//! Predefined formulas that can be bound by name instead of typing an
//! expression.

use super::errors::CatalogError;
use super::parser::parse_expression;

/// Built-in formulas in display order. `A` and `B` are the two source
/// columns of the binding.
const BUILTIN_FORMULAS: &[(&str, &str)] = &[
    // Mathematics
    ("Sum", "A + B"),
    ("Difference", "A - B"),
    ("Product", "A * B"),
    ("Quotient", "A / B"),
    ("Square", "A ** 2"),
    ("Square root", "A ** 0.5"),
    ("Exponential", "A ** B"),
    ("Natural logarithm", "ln(A)"),
    ("Base-10 logarithm", "log10(A)"),
    ("Sine", "sin(A)"),
    ("Cosine", "cos(A)"),
    ("Tangent", "tan(A)"),
    ("Cotangent", "1 / tan(A)"),
    ("Circle area", "pi * (A ** 2)"),
    ("Circle perimeter", "2 * pi * A"),
    ("Triangle area", "0.5 * A * B"),
    ("Rectangle area", "A * B"),
    // Physics
    ("Velocity", "A / B"),
    ("Force", "A * B"),
    ("Kinetic energy", "0.5 * A * (B ** 2)"),
    ("Potential energy", "A * 9.81 * B"),
    ("Pressure", "A / B"),
    ("Density", "A / B"),
    ("Power", "A / B"),
    ("Electrical resistance", "A / B"),
    ("Voltage", "A * B"),
    ("Frequency", "1 / A"),
    ("Wavelength", "A / B"),
    // Statistics
    ("Arithmetic mean", "(A + B) / 2"),
    ("Geometric mean", "(A * B) ** 0.5"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub expression: String,
}

/// Immutable name to expression lookup, validated on construction.
#[derive(Debug, Clone)]
pub struct FormulaCatalog {
    entries: Vec<CatalogEntry>,
}

impl FormulaCatalog {
    /// Loads the built-in formulas.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_entries(BUILTIN_FORMULAS.iter().copied())
    }

    /// Builds a catalog, failing if any template does not parse or a name
    /// repeats.
    pub fn from_entries<I, N, E>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (N, E)>,
        N: Into<String>,
        E: Into<String>,
    {
        let mut catalog = Self {
            entries: Vec::new(),
        };

        for (name, expression) in entries {
            let name = name.into();
            let expression = expression.into();

            if catalog.lookup(&name).is_some() {
                return Err(CatalogError::DuplicateName(name));
            }
            if let Err(source) = parse_expression(&expression) {
                return Err(CatalogError::InvalidTemplate { name, source });
            }

            catalog.entries.push(CatalogEntry { name, expression });
        }

        Ok(catalog)
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.expression.as_str())
    }

    /// Names in declaration order.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::EvalError;
    use crate::domain::parser::evaluate;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = FormulaCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), BUILTIN_FORMULAS.len());
        assert_eq!(catalog.lookup("Sum"), Some("A + B"));
        assert_eq!(catalog.lookup("Kinetic energy"), Some("0.5 * A * (B ** 2)"));
        assert_eq!(catalog.lookup("Unknown"), None);
    }

    #[test]
    fn test_names_keep_declaration_order() {
        let catalog = FormulaCatalog::builtin().unwrap();
        let names: Vec<&str> = catalog.all_names().collect();
        assert_eq!(names.first(), Some(&"Sum"));
        assert_eq!(names.last(), Some(&"Geometric mean"));
        assert_eq!(names, FormulaCatalog::builtin().unwrap().all_names().collect::<Vec<_>>());
    }

    #[test]
    fn test_builtin_templates_evaluate() {
        let catalog = FormulaCatalog::builtin().unwrap();
        assert_eq!(evaluate(catalog.lookup("Potential energy").unwrap(), 1.0, 1.0), Ok(9.81));
        assert_eq!(
            evaluate(catalog.lookup("Quotient").unwrap(), 1.0, 0.0),
            Err(EvalError::DivideByZero)
        );
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let result = FormulaCatalog::from_entries([("Good", "A + B"), ("Bad", "A + C")]);
        assert!(matches!(
            result,
            Err(CatalogError::InvalidTemplate { ref name, .. }) if name == "Bad"
        ));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let result = FormulaCatalog::from_entries([("Sum", "A + B"), ("Sum", "A - B")]);
        assert_eq!(result.unwrap_err(), CatalogError::DuplicateName("Sum".to_string()));
    }
}
