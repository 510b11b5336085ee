use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::types::SourceReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub reference: SourceReference,
    pub message: String,
    /// Top-level declaration the entry belongs to; `None` for root errors.
    pub node: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "ERROR",
            Severity::Info => "INFO",
        };
        write!(f, "{}: {} - {}", self.reference, label, self.message)
    }
}

/// Collects parse and validation entries keyed by source reference and owning node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    #[serde(skip)]
    current_node: Option<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_node(&mut self, node: Option<String>) {
        self.current_node = node;
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    pub fn fail(&mut self, reference: SourceReference, message: impl Into<String>) {
        let node = self.current_node.clone();
        self.push(Severity::Error, reference, message.into(), node);
    }

    pub fn fail_for_node(
        &mut self,
        node: &str,
        reference: SourceReference,
        message: impl Into<String>,
    ) {
        self.push(Severity::Error, reference, message.into(), Some(node.to_string()));
    }

    pub fn fail_root(&mut self, reference: SourceReference, message: impl Into<String>) {
        self.push(Severity::Error, reference, message.into(), None);
    }

    pub fn info(&mut self, reference: SourceReference, message: impl Into<String>) {
        let node = self.current_node.clone();
        self.push(Severity::Info, reference, message.into(), node);
    }

    fn push(
        &mut self,
        severity: Severity,
        reference: SourceReference,
        message: String,
        node: Option<String>,
    ) {
        let entry = Diagnostic {
            severity,
            reference,
            message,
            node,
        };
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for entry in other.entries {
            if !self.entries.contains(&entry) {
                self.entries.push(entry);
            }
        }
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|entry| entry.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn root_errors(&self) -> Vec<&Diagnostic> {
        self.errors().filter(|entry| entry.node.is_none()).collect()
    }

    pub fn has_root_errors(&self) -> bool {
        !self.root_errors().is_empty()
    }

    pub fn node_has_errors(&self, node: &str) -> bool {
        self.errors()
            .any(|entry| entry.node.as_deref() == Some(node))
    }

    pub fn errors_for_nodes(&self, nodes: &BTreeSet<String>) -> Vec<&Diagnostic> {
        self.errors()
            .filter(|entry| {
                entry
                    .node
                    .as_ref()
                    .is_some_and(|node| nodes.contains(node))
            })
            .collect()
    }

    /// Formatted error lines sorted by source position.
    pub fn error_messages(&self) -> Vec<String> {
        format_sorted(self.errors().collect())
    }
}

pub fn format_sorted(mut entries: Vec<&Diagnostic>) -> Vec<String> {
    entries.sort_by(|left, right| left.reference.sort_index().cmp(&right.reference.sort_index()));
    entries.iter().map(|entry| entry.to_string()).collect()
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    #[test]
    fn fail_attributes_entries_to_current_node() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.set_current_node(Some("Tax".to_string()));
        diagnostics.fail(SourceReference::new("a.lexy", 4, 3), "Unknown variable name: 'X'.");
        diagnostics.set_current_node(None);
        diagnostics.fail(SourceReference::new("a.lexy", 1, 1), "Invalid keyword.");

        assert!(diagnostics.has_errors());
        assert!(diagnostics.node_has_errors("Tax"));
        assert_eq!(diagnostics.root_errors().len(), 1);
        let nodes = ["Tax".to_string()].into_iter().collect();
        assert_eq!(diagnostics.errors_for_nodes(&nodes).len(), 1);
    }

    #[test]
    fn error_messages_use_compiler_style_format_sorted_by_position() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.fail_root(SourceReference::new("a.lexy", 9, 1), "second");
        diagnostics.fail_root(SourceReference::new("a.lexy", 2, 7), "first");
        assert_eq!(
            diagnostics.error_messages(),
            vec![
                "a.lexy(2, 7): ERROR - first".to_string(),
                "a.lexy(9, 1): ERROR - second".to_string()
            ]
        );
    }

    #[test]
    fn identical_entries_are_recorded_once() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.fail_root(SourceReference::new("a.lexy", 1, 1), "same");
        diagnostics.fail_root(SourceReference::new("a.lexy", 1, 1), "same");
        assert_eq!(diagnostics.entries().len(), 1);
    }
}
