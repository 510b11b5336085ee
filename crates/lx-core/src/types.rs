use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceReference {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SourceReference {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    pub fn synthetic() -> Self {
        Self::new("runtime", 1, 1)
    }

    pub fn with_column(&self, column: usize) -> Self {
        Self {
            file: self.file.clone(),
            line: self.line,
            column,
        }
    }

    /// Total order used to stably sort diagnostics.
    pub fn sort_index(&self) -> (&str, usize, usize) {
        (self.file.as_str(), self.line, self.column)
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariablePath {
    segments: Vec<String>,
}

impl VariablePath {
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn has_child_identifiers(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn child_path(&self) -> Option<VariablePath> {
        if !self.has_child_identifiers() {
            return None;
        }
        Some(Self::from_segments(self.segments[1..].to_vec()))
    }

    pub fn append(&self, child: &VariablePath) -> VariablePath {
        let mut segments = self.segments.clone();
        segments.extend(child.segments.iter().cloned());
        Self::from_segments(segments)
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Number,
    String,
    Boolean,
    Date,
}

impl PrimitiveType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeneratedTypeSource {
    FunctionParameters,
    FunctionResults,
    TableRow,
    TableColumn,
}

/// Synthetic composite type derived from a declaration. Identity is the
/// owning node, the source and (for columns) the column name; the members are
/// resolved on demand from the declaration node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratedType {
    pub node: String,
    pub source: GeneratedTypeSource,
    pub column: Option<String>,
}

impl GeneratedType {
    pub fn function_parameters(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            source: GeneratedTypeSource::FunctionParameters,
            column: None,
        }
    }

    pub fn function_results(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            source: GeneratedTypeSource::FunctionResults,
            column: None,
        }
    }

    pub fn table_row(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            source: GeneratedTypeSource::TableRow,
            column: None,
        }
    }

    pub fn table_column(node: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            source: GeneratedTypeSource::TableColumn,
            column: Some(column.into()),
        }
    }

    pub fn name(&self) -> String {
        match self.source {
            GeneratedTypeSource::FunctionParameters => format!("{}.Parameters", self.node),
            GeneratedTypeSource::FunctionResults => format!("{}.Results", self.node),
            GeneratedTypeSource::TableRow => format!("{}.Row", self.node),
            GeneratedTypeSource::TableColumn => format!(
                "{}.{}",
                self.node,
                self.column.as_deref().unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum VariableType {
    Primitive(PrimitiveType),
    Enum(String),
    Table(String),
    Declared(String),
    Generated(GeneratedType),
}

impl VariableType {
    pub const NUMBER: VariableType = VariableType::Primitive(PrimitiveType::Number);
    pub const STRING: VariableType = VariableType::Primitive(PrimitiveType::String);
    pub const BOOLEAN: VariableType = VariableType::Primitive(PrimitiveType::Boolean);
    pub const DATE: VariableType = VariableType::Primitive(PrimitiveType::Date);

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Declared(_) | Self::Generated(_))
    }

    /// Component declaration this type was declared by, if any.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::Primitive(_) => None,
            Self::Enum(name) | Self::Table(name) | Self::Declared(name) => Some(name),
            Self::Generated(generated) => Some(&generated.node),
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => write!(f, "{}", primitive.name()),
            Self::Enum(name) | Self::Table(name) | Self::Declared(name) => write!(f, "{}", name),
            Self::Generated(generated) => write!(f, "{}", generated.name()),
        }
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn variable_path_decomposes_into_root_and_child() {
        let path = VariablePath::parse("Result.Inner.First");
        assert_eq!(path.root(), "Result");
        assert_eq!(path.last(), "First");
        let child = path.child_path().expect("child path");
        assert_eq!(child.to_string(), "Inner.First");
        assert!(VariablePath::parse("Result").child_path().is_none());
    }

    #[test]
    fn variable_path_append_builds_nested_reference() {
        let parent = VariablePath::parse("Result.Inner");
        let child = VariablePath::parse("First");
        assert_eq!(parent.append(&child).to_string(), "Result.Inner.First");
    }

    #[test]
    fn generated_types_compare_by_node_and_source() {
        let parameters = VariableType::Generated(GeneratedType::function_parameters("Tax"));
        let results = VariableType::Generated(GeneratedType::function_results("Tax"));
        assert_ne!(parameters, results);
        assert_eq!(
            parameters,
            VariableType::Generated(GeneratedType::function_parameters("Tax"))
        );
        assert_eq!(parameters.to_string(), "Tax.Parameters");
        assert_eq!(
            GeneratedType::table_column("Rates", "Income").name(),
            "Rates.Income"
        );
    }

    #[test]
    fn source_references_sort_by_file_line_and_column() {
        let mut references = vec![
            SourceReference::new("b.lexy", 1, 1),
            SourceReference::new("a.lexy", 2, 4),
            SourceReference::new("a.lexy", 2, 1),
        ];
        references.sort();
        assert_eq!(references[0].to_string(), "a.lexy(2, 1)");
        assert_eq!(references[2].file, "b.lexy");
    }
}
