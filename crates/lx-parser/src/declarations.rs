use lx_core::{Diagnostics, LexyError, SourceReference, VariablePath};

use crate::expression::Expression;
use crate::line_parsers::{
    parse_assignment_line, parse_code_line, parse_condition, parse_enum_member,
    parse_expected_message, parse_table_header, parse_table_row, parse_variable_definition,
    statement_line, AssignmentLine,
};
use crate::nodes::{
    AssignmentNode, ConditionalBlock, ElseBlock, EnumNode, ExpectedMessage, FunctionNode, RootNode,
    ScenarioFunction, ScenarioNode, Statement, StatementKind, StatementLine, TableNode,
    TypeDefinitionNode, ValidationTableNode, VariableDefinition,
};
use crate::token::TokenKind;
use crate::token_list::SourceLine;

#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub nodes: Vec<RootNode>,
    pub diagnostics: Diagnostics,
}

/// Parses a whole `.lexy` file. Errors are collected per line; parsing
/// continues with the next line.
pub fn parse_declarations(file: &str, source: &str) -> ParsedSource {
    let mut parser = DeclarationsParser::new(file);
    for (index, content) in source.lines().enumerate() {
        parser.process(index + 1, content);
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Parameters,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expectation {
    Errors,
    RootErrors,
    ExecutionErrors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    ElseIf,
    Else,
}

#[derive(Debug)]
struct PendingBlock {
    kind: BlockKind,
    line: StatementLine,
    condition: Option<Expression>,
    body: Vec<Statement>,
}

/// Parse target for the lines indented one level below the line that opened it.
#[derive(Debug)]
enum Frame {
    Root,
    Function(FunctionNode),
    Definitions {
        section: Section,
        items: Vec<VariableDefinition>,
    },
    Code(Vec<Statement>),
    Block(PendingBlock),
    Table(TableNode),
    Enum(EnumNode),
    Type(TypeDefinitionNode),
    Scenario(ScenarioNode),
    Assignments {
        section: Section,
        items: Vec<AssignmentNode>,
    },
    ComplexAssignment {
        path: VariablePath,
        reference: SourceReference,
        children: Vec<AssignmentNode>,
    },
    ValidationTable(ValidationTableNode),
    Expectations {
        kind: Expectation,
        items: Vec<ExpectedMessage>,
    },
}

impl Frame {
    fn node_name(&self) -> Option<&str> {
        match self {
            Self::Function(node) => Some(&node.name),
            Self::Table(node) => Some(&node.name),
            Self::Enum(node) => Some(&node.name),
            Self::Type(node) => Some(&node.name),
            Self::Scenario(node) => Some(&node.name),
            _ => None,
        }
    }

    fn statements(&mut self) -> Option<&mut Vec<Statement>> {
        match self {
            Self::Function(node) => Some(&mut node.code),
            Self::Code(statements) => Some(statements),
            Self::Block(block) => Some(&mut block.body),
            _ => None,
        }
    }
}

struct DeclarationsParser {
    file: String,
    /// Frames with the indentation their child lines are expected at.
    stack: Vec<(usize, Frame)>,
    nodes: Vec<RootNode>,
    diagnostics: Diagnostics,
}

impl DeclarationsParser {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            stack: vec![(0, Frame::Root)],
            nodes: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn process(&mut self, number: usize, content: &str) {
        if content.trim().is_empty() {
            return;
        }
        let line = match SourceLine::parse(&self.file, number, content) {
            Ok(line) => line,
            Err(error) => {
                if !content.starts_with([' ', '\t']) {
                    self.close_frames(0);
                }
                self.fail_error(error);
                return;
            }
        };
        if line.is_empty() {
            return;
        }

        self.close_frames(line.indent);
        let expected = self.stack.last().map(|(indent, _)| *indent).unwrap_or_default();
        if line.indent > expected {
            self.diagnostics
                .fail(line.reference(), "Invalid indentation. Unexpected indented line.");
            return;
        }

        match self.handle(&line) {
            Ok(Some(frame)) => self.push_frame(line.indent + 1, frame),
            Ok(None) => {}
            Err(error) => self.fail_error(error),
        }
    }

    fn fail_error(&mut self, error: LexyError) {
        let reference = error
            .reference
            .unwrap_or_else(|| SourceReference::new(self.file.clone(), 1, 1));
        self.diagnostics.fail(reference, error.message);
    }

    fn close_frames(&mut self, indent: usize) {
        while self.stack.len() > 1
            && self
                .stack
                .last()
                .is_some_and(|(child_indent, _)| *child_indent > indent)
        {
            self.pop_frame();
        }
    }

    fn push_frame(&mut self, indent: usize, frame: Frame) {
        self.stack.push((indent, frame));
        self.update_current_node();
    }

    fn update_current_node(&mut self) {
        let current = self
            .stack
            .iter()
            .rev()
            .find_map(|(_, frame)| frame.node_name())
            .map(ToString::to_string);
        self.diagnostics.set_current_node(current);
    }

    fn finish(mut self) -> ParsedSource {
        while self.stack.len() > 1 {
            self.pop_frame();
        }
        ParsedSource {
            nodes: self.nodes,
            diagnostics: self.diagnostics,
        }
    }

    fn pop_frame(&mut self) {
        let Some((_, frame)) = self.stack.pop() else {
            return;
        };
        if let Err(error) = self.attach(frame) {
            self.fail_error(error);
        }
        self.update_current_node();
    }

    /// Hands a finished frame to the frame below it.
    fn attach(&mut self, frame: Frame) -> Result<(), LexyError> {
        let Some((_, parent)) = self.stack.last_mut() else {
            return Ok(());
        };
        match (parent, frame) {
            (Frame::Root, Frame::Function(node)) => self.nodes.push(RootNode::Function(node)),
            (Frame::Root, Frame::Table(node)) => self.nodes.push(RootNode::Table(node)),
            (Frame::Root, Frame::Enum(node)) => self.nodes.push(RootNode::Enum(node)),
            (Frame::Root, Frame::Type(node)) => self.nodes.push(RootNode::Type(node)),
            (Frame::Root, Frame::Scenario(node)) => self.nodes.push(RootNode::Scenario(node)),
            (Frame::Scenario(scenario), Frame::Function(function)) => {
                scenario.function = Some(ScenarioFunction::Inline(function));
            }
            (Frame::Function(function), Frame::Definitions { section, items }) => match section {
                Section::Parameters => function.parameters.extend(items),
                Section::Results => function.results.extend(items),
            },
            (Frame::Function(function), Frame::Code(statements)) => function.code.extend(statements),
            (parent, Frame::Block(block)) => {
                let Some(statements) = parent.statements() else {
                    return Ok(());
                };
                attach_block(statements, block);
            }
            (Frame::Scenario(scenario), Frame::Assignments { section, items }) => match section {
                Section::Parameters => scenario.parameters.extend(items),
                Section::Results => scenario.results.extend(items),
            },
            (parent, Frame::ComplexAssignment { path, reference, children }) => {
                if children.is_empty() {
                    return Err(LexyError::with_reference(
                        "DECLARATION_INVALID",
                        format!("Invalid assignment '{}'. Nested assignments expected.", path),
                        reference,
                    ));
                }
                let node = AssignmentNode::Complex {
                    path,
                    reference,
                    children,
                };
                match parent {
                    Frame::Assignments { items, .. } => items.push(node),
                    Frame::ComplexAssignment { children, .. } => children.push(node),
                    _ => {}
                }
            }
            (Frame::Scenario(scenario), Frame::ValidationTable(table)) => {
                scenario.validation_table = Some(table);
            }
            (Frame::Scenario(scenario), Frame::Expectations { kind, items }) => match kind {
                Expectation::Errors => scenario.expect_errors.extend(items),
                Expectation::RootErrors => scenario.expect_root_errors.extend(items),
                Expectation::ExecutionErrors => scenario.expect_execution_errors.extend(items),
            },
            _ => {}
        }
        Ok(())
    }

    fn handle(&mut self, line: &SourceLine) -> Result<Option<Frame>, LexyError> {
        let Some((_, frame)) = self.stack.last_mut() else {
            return Ok(None);
        };
        match frame {
            Frame::Root => root_line(line),
            Frame::Function(function) => {
                let tokens = &line.tokens;
                if tokens.len() == 1 && tokens.is_keyword(0, "parameters") {
                    return Ok(Some(Frame::Definitions {
                        section: Section::Parameters,
                        items: Vec::new(),
                    }));
                }
                if tokens.len() == 1 && tokens.is_keyword(0, "results") {
                    return Ok(Some(Frame::Definitions {
                        section: Section::Results,
                        items: Vec::new(),
                    }));
                }
                if tokens.len() == 1 && tokens.is_keyword(0, "code") {
                    return Ok(Some(Frame::Code(Vec::new())));
                }
                statement(&mut function.code, line)
            }
            Frame::Code(statements) => statement(statements, line),
            Frame::Block(block) => statement(&mut block.body, line),
            Frame::Definitions { items, .. } => {
                items.push(parse_variable_definition(line, false)?);
                Ok(None)
            }
            Frame::Table(table) => {
                if table.header.is_empty() {
                    table.header = parse_table_header(line)?;
                } else {
                    table.rows.push(parse_table_row(line)?);
                }
                Ok(None)
            }
            Frame::ValidationTable(table) => {
                if table.header.is_empty() {
                    table.header = parse_table_header(line)?;
                } else {
                    table.rows.push(parse_table_row(line)?);
                }
                Ok(None)
            }
            Frame::Enum(node) => {
                node.members.push(parse_enum_member(line)?);
                Ok(None)
            }
            Frame::Type(node) => {
                node.members.push(parse_variable_definition(line, false)?);
                Ok(None)
            }
            Frame::Scenario(scenario) => scenario_line(scenario, line),
            Frame::Assignments { items, .. } => assignment(items, line),
            Frame::ComplexAssignment { children, .. } => assignment(children, line),
            Frame::Expectations { items, .. } => {
                items.push(parse_expected_message(line, 0)?);
                Ok(None)
            }
        }
    }
}

fn invalid(line: &SourceLine, message: impl Into<String>) -> LexyError {
    LexyError::with_reference("DECLARATION_INVALID", message, line.reference())
}

fn root_line(line: &SourceLine) -> Result<Option<Frame>, LexyError> {
    let tokens = &line.tokens;
    let Some(keyword) = tokens.first().filter(|token| token.kind == TokenKind::Keyword) else {
        let text = tokens.first().map(|token| token.text.clone()).unwrap_or_default();
        return Err(invalid(line, format!("Invalid token '{}'. Keyword expected.", text)));
    };
    let name = match (tokens.identifier(1), tokens.len()) {
        (Some(name), 2) => name.to_string(),
        _ => {
            return Err(invalid(
                line,
                format!("Invalid {} declaration. Expected '{} Name'.", keyword.text, keyword.text),
            ))
        }
    };
    let reference = line.reference();
    let frame = match keyword.text.as_str() {
        "function" => Frame::Function(FunctionNode::new(name, reference)),
        "table" => Frame::Table(TableNode {
            name,
            reference,
            header: Vec::new(),
            rows: Vec::new(),
        }),
        "enum" => Frame::Enum(EnumNode {
            name,
            reference,
            members: Vec::new(),
        }),
        "type" => Frame::Type(TypeDefinitionNode {
            name,
            reference,
            members: Vec::new(),
        }),
        "scenario" => Frame::Scenario(ScenarioNode::new(name, reference)),
        other => return Err(invalid(line, format!("Invalid keyword '{}'.", other))),
    };
    Ok(Some(frame))
}

fn statement(statements: &mut Vec<Statement>, line: &SourceLine) -> Result<Option<Frame>, LexyError> {
    let tokens = &line.tokens;
    let open_branch = |statements: &Vec<Statement>| {
        matches!(
            statements.last(),
            Some(Statement {
                kind: StatementKind::If { otherwise: None, .. },
                ..
            })
        )
    };
    if tokens.is_keyword(0, "if") {
        return Ok(Some(Frame::Block(PendingBlock {
            kind: BlockKind::If,
            line: statement_line(line),
            condition: Some(parse_condition(line)?),
            body: Vec::new(),
        })));
    }
    if tokens.is_keyword(0, "elseif") {
        if !open_branch(statements) {
            return Err(invalid(line, "Invalid 'elseif'. No matching 'if' found."));
        }
        return Ok(Some(Frame::Block(PendingBlock {
            kind: BlockKind::ElseIf,
            line: statement_line(line),
            condition: Some(parse_condition(line)?),
            body: Vec::new(),
        })));
    }
    if tokens.is_keyword(0, "else") {
        if !open_branch(statements) {
            return Err(invalid(line, "Invalid 'else'. No matching 'if' found."));
        }
        if tokens.len() > 1 {
            return Err(invalid(line, "Invalid 'else'. No tokens expected after 'else'."));
        }
        return Ok(Some(Frame::Block(PendingBlock {
            kind: BlockKind::Else,
            line: statement_line(line),
            condition: None,
            body: Vec::new(),
        })));
    }
    statements.push(parse_code_line(line)?);
    Ok(None)
}

fn attach_block(statements: &mut Vec<Statement>, block: PendingBlock) {
    let PendingBlock {
        kind,
        line,
        condition,
        body,
    } = block;
    match (kind, condition) {
        (BlockKind::If, Some(condition)) => statements.push(Statement {
            line: line.clone(),
            kind: StatementKind::If {
                branches: vec![ConditionalBlock {
                    line,
                    condition,
                    body,
                }],
                otherwise: None,
            },
        }),
        (BlockKind::ElseIf, Some(condition)) => {
            if let Some(Statement {
                kind: StatementKind::If { branches, .. },
                ..
            }) = statements.last_mut()
            {
                branches.push(ConditionalBlock {
                    line,
                    condition,
                    body,
                });
            }
        }
        (BlockKind::Else, _) => {
            if let Some(Statement {
                kind: StatementKind::If { otherwise, .. },
                ..
            }) = statements.last_mut()
            {
                *otherwise = Some(ElseBlock { line, body });
            }
        }
        _ => {}
    }
}

fn scenario_line(scenario: &mut ScenarioNode, line: &SourceLine) -> Result<Option<Frame>, LexyError> {
    let tokens = &line.tokens;
    let Some(first) = tokens.first() else {
        return Ok(None);
    };
    let keyword = if first.kind == TokenKind::Keyword {
        first.text.as_str()
    } else {
        ""
    };
    let single = tokens.len() == 1;
    match keyword {
        "function" if single => Ok(Some(Frame::Function(FunctionNode::new(
            format!("{}Function", scenario.name),
            line.reference(),
        )))),
        "function" => {
            let Some(name) = tokens.identifier(1).filter(|_| tokens.len() == 2) else {
                return Err(invalid(line, "Invalid function reference. Expected 'function Name'."));
            };
            scenario.function = Some(ScenarioFunction::Reference {
                name: name.to_string(),
                reference: line.token_reference(1),
            });
            Ok(None)
        }
        "parameters" if single => Ok(Some(Frame::Assignments {
            section: Section::Parameters,
            items: Vec::new(),
        })),
        "results" if single => Ok(Some(Frame::Assignments {
            section: Section::Results,
            items: Vec::new(),
        })),
        "validationTable" if single => Ok(Some(Frame::ValidationTable(ValidationTableNode {
            reference: line.reference(),
            header: Vec::new(),
            rows: Vec::new(),
        }))),
        "expectError" => {
            scenario.expect_errors.push(parse_expected_message(line, 1)?);
            Ok(None)
        }
        "expectErrors" | "expectRootErrors" | "expectExecutionErrors" => {
            let kind = match keyword {
                "expectErrors" => Expectation::Errors,
                "expectRootErrors" => Expectation::RootErrors,
                _ => Expectation::ExecutionErrors,
            };
            if single {
                return Ok(Some(Frame::Expectations {
                    kind,
                    items: Vec::new(),
                }));
            }
            let message = parse_expected_message(line, 1)?;
            match kind {
                Expectation::Errors => scenario.expect_errors.push(message),
                Expectation::RootErrors => scenario.expect_root_errors.push(message),
                Expectation::ExecutionErrors => scenario.expect_execution_errors.push(message),
            }
            Ok(None)
        }
        _ => Err(invalid(
            line,
            format!("Invalid token '{}'. Scenario keyword expected.", first.text),
        )),
    }
}

fn assignment(items: &mut Vec<AssignmentNode>, line: &SourceLine) -> Result<Option<Frame>, LexyError> {
    match parse_assignment_line(line)? {
        AssignmentLine::Leaf(leaf) => {
            items.push(AssignmentNode::Leaf(leaf));
            Ok(None)
        }
        AssignmentLine::Complex(path) => Ok(Some(Frame::ComplexAssignment {
            path,
            reference: line.reference(),
            children: Vec::new(),
        })),
    }
}
