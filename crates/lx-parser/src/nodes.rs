use lx_core::{Decimal, SourceReference, VariablePath};

use crate::expression::{Expression, IdentifierExpression};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Function,
    Table,
    Enum,
    Type,
    Scenario,
}

impl NodeType {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Table => "table",
            Self::Enum => "enum",
            Self::Type => "type",
            Self::Scenario => "scenario",
        }
    }
}

/// Declared type of a variable: `var` or a (possibly dotted) type name such
/// as `number`, `Color`, `Tax.Parameters`.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationType {
    Implicit,
    Named(VariablePath),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub declared_type: DeclarationType,
    pub default: Option<Expression>,
    pub reference: SourceReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementLine {
    pub reference: SourceReference,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBlock {
    pub line: StatementLine,
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseBlock {
    pub line: StatementLine,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Declaration(VariableDefinition),
    Assignment {
        target: IdentifierExpression,
        value: Expression,
    },
    Expression(Expression),
    If {
        branches: Vec<ConditionalBlock>,
        otherwise: Option<ElseBlock>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: StatementLine,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub name: String,
    pub reference: SourceReference,
    pub parameters: Vec<VariableDefinition>,
    pub results: Vec<VariableDefinition>,
    pub code: Vec<Statement>,
}

impl FunctionNode {
    pub fn new(name: impl Into<String>, reference: SourceReference) -> Self {
        Self {
            name: name.into(),
            reference,
            parameters: Vec::new(),
            results: Vec::new(),
            code: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub type_path: VariablePath,
    pub reference: SourceReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub reference: SourceReference,
    pub values: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    pub name: String,
    pub reference: SourceReference,
    pub header: Vec<ColumnDefinition>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<Decimal>,
    pub reference: SourceReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumNode {
    pub name: String,
    pub reference: SourceReference,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinitionNode {
    pub name: String,
    pub reference: SourceReference,
    pub members: Vec<VariableDefinition>,
}

/// `Path = constant`, a leaf of a scenario parameter or result set.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDefinition {
    pub path: VariablePath,
    pub value: Expression,
    pub reference: SourceReference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentNode {
    Leaf(AssignmentDefinition),
    /// `Path =` followed by indented assignments relative to `path`.
    Complex {
        path: VariablePath,
        reference: SourceReference,
        children: Vec<AssignmentNode>,
    },
}

impl AssignmentNode {
    pub fn reference(&self) -> &SourceReference {
        match self {
            Self::Leaf(leaf) => &leaf.reference,
            Self::Complex { reference, .. } => reference,
        }
    }

    /// Leaf assignments with paths made absolute.
    pub fn flatten(&self) -> Vec<AssignmentDefinition> {
        let mut leaves = Vec::new();
        self.flatten_into(None, &mut leaves);
        leaves
    }

    fn flatten_into(&self, parent: Option<&VariablePath>, leaves: &mut Vec<AssignmentDefinition>) {
        let absolute = |path: &VariablePath| match parent {
            Some(parent) => parent.append(path),
            None => path.clone(),
        };
        match self {
            Self::Leaf(leaf) => leaves.push(AssignmentDefinition {
                path: absolute(&leaf.path),
                value: leaf.value.clone(),
                reference: leaf.reference.clone(),
            }),
            Self::Complex { path, children, .. } => {
                let path = absolute(path);
                for child in children {
                    child.flatten_into(Some(&path), leaves);
                }
            }
        }
    }
}

pub fn flatten_assignments(nodes: &[AssignmentNode]) -> Vec<AssignmentDefinition> {
    nodes.iter().flat_map(AssignmentNode::flatten).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationTableNode {
    pub reference: SourceReference,
    pub header: Vec<ColumnDefinition>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedMessage {
    pub text: String,
    pub reference: SourceReference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioFunction {
    Reference {
        name: String,
        reference: SourceReference,
    },
    Inline(FunctionNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioNode {
    pub name: String,
    pub reference: SourceReference,
    pub function: Option<ScenarioFunction>,
    pub parameters: Vec<AssignmentNode>,
    pub results: Vec<AssignmentNode>,
    pub validation_table: Option<ValidationTableNode>,
    pub expect_errors: Vec<ExpectedMessage>,
    pub expect_root_errors: Vec<ExpectedMessage>,
    pub expect_execution_errors: Vec<ExpectedMessage>,
}

impl ScenarioNode {
    pub fn new(name: impl Into<String>, reference: SourceReference) -> Self {
        Self {
            name: name.into(),
            reference,
            function: None,
            parameters: Vec::new(),
            results: Vec::new(),
            validation_table: None,
            expect_errors: Vec::new(),
            expect_root_errors: Vec::new(),
            expect_execution_errors: Vec::new(),
        }
    }

    /// Name of the function the scenario executes, inline or referenced.
    pub fn function_name(&self) -> Option<&str> {
        match self.function.as_ref()? {
            ScenarioFunction::Reference { name, .. } => Some(name),
            ScenarioFunction::Inline(function) => Some(&function.name),
        }
    }

    pub fn inline_function(&self) -> Option<&FunctionNode> {
        match self.function.as_ref()? {
            ScenarioFunction::Inline(function) => Some(function),
            ScenarioFunction::Reference { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RootNode {
    Function(FunctionNode),
    Table(TableNode),
    Enum(EnumNode),
    Type(TypeDefinitionNode),
    Scenario(ScenarioNode),
}

impl RootNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Function(node) => &node.name,
            Self::Table(node) => &node.name,
            Self::Enum(node) => &node.name,
            Self::Type(node) => &node.name,
            Self::Scenario(node) => &node.name,
        }
    }

    pub fn reference(&self) -> &SourceReference {
        match self {
            Self::Function(node) => &node.reference,
            Self::Table(node) => &node.reference,
            Self::Enum(node) => &node.reference,
            Self::Type(node) => &node.reference,
            Self::Scenario(node) => &node.reference,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Function(_) => NodeType::Function,
            Self::Table(_) => NodeType::Table,
            Self::Enum(_) => NodeType::Enum,
            Self::Type(_) => NodeType::Type,
            Self::Scenario(_) => NodeType::Scenario,
        }
    }
}

#[cfg(test)]
mod nodes_tests {
    use super::*;
    use crate::expression::LiteralExpression;
    use crate::token::LiteralValue;

    fn leaf(path: &str, value: i64) -> AssignmentNode {
        AssignmentNode::Leaf(AssignmentDefinition {
            path: VariablePath::parse(path),
            value: Expression::Literal(LiteralExpression {
                value: LiteralValue::Number(Decimal::from(value)),
                reference: SourceReference::new("a.lexy", 1, 1),
            }),
            reference: SourceReference::new("a.lexy", 1, 1),
        })
    }

    #[test]
    fn complex_assignments_flatten_into_absolute_paths() {
        let node = AssignmentNode::Complex {
            path: VariablePath::parse("Result"),
            reference: SourceReference::new("a.lexy", 1, 1),
            children: vec![
                leaf("First", 1),
                AssignmentNode::Complex {
                    path: VariablePath::parse("Inner"),
                    reference: SourceReference::new("a.lexy", 2, 1),
                    children: vec![leaf("Second", 2)],
                },
            ],
        };
        let paths = node
            .flatten()
            .into_iter()
            .map(|leaf| leaf.path.to_string())
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["Result.First", "Result.Inner.Second"]);
    }

    #[test]
    fn scenario_function_name_covers_inline_and_reference() {
        let mut scenario = ScenarioNode::new("Check", SourceReference::new("a.lexy", 1, 1));
        assert!(scenario.function_name().is_none());
        scenario.function = Some(ScenarioFunction::Inline(FunctionNode::new(
            "CheckFunction",
            SourceReference::new("a.lexy", 2, 3),
        )));
        assert_eq!(scenario.function_name(), Some("CheckFunction"));
        assert!(scenario.inline_function().is_some());
    }
}
