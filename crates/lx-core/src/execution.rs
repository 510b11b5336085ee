use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{SourceReference, VariablePath};
use crate::value::Value;

/// One node of the execution trace. Variable snapshots are owned copies taken
/// when the entry is logged; later changes to live values never reach them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<SourceReference>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub read_variables: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub write_variables: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<ExecutionLogEntry>,
}

impl ExecutionLogEntry {
    pub fn new(message: impl Into<String>, reference: Option<SourceReference>) -> Self {
        Self {
            message: message.into(),
            reference,
            read_variables: BTreeMap::new(),
            write_variables: BTreeMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn with_read_variables(mut self, variables: BTreeMap<String, Value>) -> Self {
        self.read_variables = variables;
        self
    }
}

/// Indented text rendering of a trace, one line per entry.
pub fn render_log(entries: &[ExecutionLogEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    render_entries(entries, 0, &mut lines);
    lines
}

fn render_entries(entries: &[ExecutionLogEntry], depth: usize, lines: &mut Vec<String>) {
    for entry in entries {
        let mut line = format!("{}{}", "  ".repeat(depth), entry.message);
        if !entry.read_variables.is_empty() {
            line.push_str(&format!(" {{read: {}}}", render_variables(&entry.read_variables)));
        }
        if !entry.write_variables.is_empty() {
            line.push_str(&format!(" {{write: {}}}", render_variables(&entry.write_variables)));
        }
        lines.push(line);
        render_entries(&entry.entries, depth + 1, lines);
    }
}

fn render_variables(variables: &BTreeMap<String, Value>) -> String {
    variables
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionResult {
    pub value: BTreeMap<String, Value>,
    pub logging: Vec<ExecutionLogEntry>,
}

impl FunctionResult {
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = VariablePath::parse(path);
        let (root, rest) = path.segments().split_first()?;
        let mut current = self.value.get(root)?;
        for segment in rest {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_number(&self, path: &str) -> Option<rust_decimal::Decimal> {
        self.get(path).and_then(Value::as_number)
    }
}

#[cfg(test)]
mod execution_tests {
    use super::*;

    #[test]
    fn get_resolves_nested_result_paths() {
        let mut inner = BTreeMap::new();
        inner.insert("First".to_string(), Value::from(777));
        let mut value = BTreeMap::new();
        value.insert("Inner".to_string(), Value::Object(inner));
        let result = FunctionResult {
            value,
            logging: Vec::new(),
        };
        assert_eq!(result.get("Inner.First"), Some(&Value::from(777)));
        assert!(result.get("Inner.Missing").is_none());
        assert!(result.get("").is_none());
    }

    #[test]
    fn render_log_indents_child_entries() {
        let mut parent = ExecutionLogEntry::new("Execute: Tax", None);
        let mut variables = BTreeMap::new();
        variables.insert("Income".to_string(), Value::from(10));
        parent
            .entries
            .push(ExecutionLogEntry::new("Result = Income", None).with_read_variables(variables));
        assert_eq!(
            render_log(&[parent]),
            vec![
                "Execute: Tax".to_string(),
                "  Result = Income {read: Income=10}".to_string()
            ]
        );
    }

    #[test]
    fn serialize_omits_empty_snapshots() {
        let entry = ExecutionLogEntry::new("line", None);
        let json = serde_json::to_string(&entry).expect("serialize");
        assert_eq!(json, r#"{"message":"line"}"#);
    }
}
