/// A target column computed from two source columns.
///
/// Inside `expression`, `A` stands for the `source1` cell of the same row
/// and `B` for the `source2` cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaBinding {
    pub target: String,
    pub source1: String,
    pub source2: String,
    pub expression: String,
}

impl FormulaBinding {
    pub fn new(
        target: impl Into<String>,
        source1: impl Into<String>,
        source2: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            source1: source1.into(),
            source2: source2.into(),
            expression: expression.into(),
        }
    }
}

/// Active bindings, at most one per target column, kept in insertion order.
///
/// Column existence is not checked here; dangling references surface as
/// per-row errors when the bindings are recomputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaRegistry {
    bindings: Vec<FormulaBinding>,
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `binding`, replacing any binding for the same target.
    /// A replaced binding keeps its original position.
    pub fn set_binding(&mut self, binding: FormulaBinding) {
        match self.bindings.iter_mut().find(|b| b.target == binding.target) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
    }

    pub fn remove_binding(&mut self, target: &str) -> Option<FormulaBinding> {
        let index = self.bindings.iter().position(|b| b.target == target)?;
        Some(self.bindings.remove(index))
    }

    pub fn get_binding(&self, target: &str) -> Option<&FormulaBinding> {
        self.bindings.iter().find(|b| b.target == target)
    }

    pub fn all_bindings(&self) -> impl Iterator<Item = &FormulaBinding> {
        self.bindings.iter()
    }

    /// Drops every binding whose target does not satisfy `keep`.
    pub fn retain_targets(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.bindings.retain(|b| keep(&b.target));
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_binding_replaces_per_target() {
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("C3", "C1", "C2", "A + B"));
        registry.set_binding(FormulaBinding::new("C4", "C1", "C2", "A * B"));
        registry.set_binding(FormulaBinding::new("C3", "C2", "C1", "A - B"));

        assert_eq!(registry.len(), 2);
        let targets: Vec<&str> = registry.all_bindings().map(|b| b.target.as_str()).collect();
        assert_eq!(targets, vec!["C3", "C4"]);
        assert_eq!(registry.get_binding("C3").unwrap().expression, "A - B");
    }

    #[test]
    fn test_sources_are_not_validated() {
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("Out", "Ghost1", "Ghost2", "A"));
        assert!(registry.get_binding("Out").is_some());
    }

    #[test]
    fn test_remove_binding() {
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("C3", "C1", "C2", "A + B"));

        assert!(registry.remove_binding("C3").is_some());
        assert!(registry.remove_binding("C3").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_retain_targets() {
        let mut registry = FormulaRegistry::new();
        registry.set_binding(FormulaBinding::new("C3", "C1", "C2", "A + B"));
        registry.set_binding(FormulaBinding::new("C4", "C1", "C2", "A + B"));

        registry.retain_targets(|target| target != "C3");

        assert!(registry.get_binding("C3").is_none());
        assert!(registry.get_binding("C4").is_some());
    }
}
