use lx_core::{Decimal, LexyError, VariablePath};

use crate::expression::{Expression, IdentifierExpression};
use crate::expression_parser::parse_expression;
use crate::nodes::{
    AssignmentDefinition, ColumnDefinition, DeclarationType, EnumMember, ExpectedMessage,
    Statement, StatementKind, StatementLine, TableRow, VariableDefinition,
};
use crate::token::{LiteralValue, OperatorType};
use crate::token_list::{SourceLine, TokenList};

fn fail<T>(line: &SourceLine, index: usize, message: impl Into<String>) -> Result<T, LexyError> {
    Err(LexyError::with_reference(
        "DECLARATION_INVALID",
        message,
        line.token_reference(index),
    ))
}

pub fn statement_line(line: &SourceLine) -> StatementLine {
    StatementLine {
        reference: line.reference(),
        text: line.text(),
    }
}

/// `Type Name`, `Type Name = Value` or, when `allow_implicit`, `var Name = Value`.
pub fn parse_variable_definition(
    line: &SourceLine,
    allow_implicit: bool,
) -> Result<VariableDefinition, LexyError> {
    let tokens = &line.tokens;
    let (declared_type, name_index) = if tokens.is_keyword(0, "var") {
        if !allow_implicit {
            return fail(line, 0, "Invalid variable declaration. 'var' is not allowed here.");
        }
        (DeclarationType::Implicit, 1)
    } else {
        let Some((segments, next)) = tokens.identifier_path(0) else {
            return fail(line, 0, "Invalid variable declaration. Type expected.");
        };
        (DeclarationType::Named(VariablePath::from_segments(segments)), next)
    };

    let Some(name) = tokens.identifier(name_index) else {
        return fail(
            line,
            name_index,
            "Invalid variable declaration. Expected 'Type Name' or 'Type Name = Value'.",
        );
    };
    let default = match tokens.get(name_index + 1) {
        None => None,
        Some(token) if token.is_operator(OperatorType::Assignment) => {
            let value = tokens.token_from(name_index + 2);
            if value.is_empty() {
                return fail(line, name_index + 1, "Invalid variable declaration. Value expected after '='.");
            }
            Some(parse_expression(&value, line)?)
        }
        Some(token) => {
            return fail(
                line,
                name_index + 1,
                format!("Invalid token '{}'. Expected '='.", token.text),
            )
        }
    };
    if declared_type == DeclarationType::Implicit && default.is_none() {
        return fail(line, 0, "Invalid variable declaration. 'var' requires a value.");
    }
    Ok(VariableDefinition {
        name: name.to_string(),
        declared_type,
        default,
        reference: line.token_reference(name_index),
    })
}

/// Classifies one code line as declaration, assignment or call statement.
pub fn parse_code_line(line: &SourceLine) -> Result<Statement, LexyError> {
    let tokens = &line.tokens;
    let kind = if tokens.is_keyword(0, "var") {
        StatementKind::Declaration(parse_variable_definition(line, true)?)
    } else {
        match tokens.identifier_path(0) {
            Some((_, next)) if tokens.identifier(next).is_some() => {
                StatementKind::Declaration(parse_variable_definition(line, true)?)
            }
            Some((segments, next)) if tokens.is_operator(next, OperatorType::Assignment) => {
                let value = tokens.token_from(next + 1);
                if value.is_empty() {
                    return fail(line, next, "Invalid assignment. Value expected after '='.");
                }
                StatementKind::Assignment {
                    target: IdentifierExpression {
                        path: VariablePath::from_segments(segments),
                        reference: line.token_reference(0),
                    },
                    value: parse_expression(&value, line)?,
                }
            }
            _ => StatementKind::Expression(parse_expression(tokens, line)?),
        }
    };
    Ok(Statement {
        line: statement_line(line),
        kind,
    })
}

/// Condition of an `if` or `elseif` line.
pub fn parse_condition(line: &SourceLine) -> Result<Expression, LexyError> {
    let condition = line.tokens.token_from(1);
    if condition.is_empty() {
        return fail(line, 0, "Invalid condition. Expression expected.");
    }
    parse_expression(&condition, line)
}

pub enum AssignmentLine {
    Leaf(AssignmentDefinition),
    Complex(VariablePath),
}

/// `Path = Value`, or `Path =` opening a nested assignment block.
pub fn parse_assignment_line(line: &SourceLine) -> Result<AssignmentLine, LexyError> {
    let tokens = &line.tokens;
    let Some((segments, next)) = tokens.identifier_path(0) else {
        return fail(line, 0, "Invalid assignment. Variable name expected.");
    };
    if !tokens.is_operator(next, OperatorType::Assignment) {
        return fail(line, next, "Invalid assignment. Expected '='.");
    }
    let path = VariablePath::from_segments(segments);
    let value = tokens.token_from(next + 1);
    if value.is_empty() {
        return Ok(AssignmentLine::Complex(path));
    }
    Ok(AssignmentLine::Leaf(AssignmentDefinition {
        path,
        value: parse_expression(&value, line)?,
        reference: line.token_reference(0),
    }))
}

/// Token groups between `|` separators.
fn table_cells(line: &SourceLine) -> Result<Vec<(usize, TokenList)>, LexyError> {
    let tokens = &line.tokens;
    let starts = tokens.first().is_some_and(|token| token.is_table_separator());
    let ends = tokens.len() > 1 && tokens.last().is_some_and(|token| token.is_table_separator());
    if !starts || !ends {
        return fail(line, 0, "Invalid table line. Lines should start and end with '|'.");
    }
    let mut cells = Vec::new();
    let mut start = 1;
    for (index, token) in tokens.iter().enumerate().skip(1) {
        if token.is_table_separator() {
            if index == start {
                return fail(line, index, "Invalid table line. Empty cell.");
            }
            cells.push((start, tokens.slice(start, index)));
            start = index + 1;
        }
    }
    Ok(cells)
}

pub fn parse_table_header(line: &SourceLine) -> Result<Vec<ColumnDefinition>, LexyError> {
    table_cells(line)?
        .into_iter()
        .map(|(start, cell)| {
            let path = cell.identifier_path(0);
            match path {
                Some((segments, next)) if next + 1 == cell.len() => {
                    let Some(name) = cell.identifier(next) else {
                        return fail(line, start + next, "Invalid column header. Column name expected.");
                    };
                    Ok(ColumnDefinition {
                        name: name.to_string(),
                        type_path: VariablePath::from_segments(segments),
                        reference: line.token_reference(start + next),
                    })
                }
                _ => fail(
                    line,
                    start,
                    format!(
                        "Invalid column header '{}'. Expected 'Type Name'.",
                        cell.text()
                    ),
                ),
            }
        })
        .collect()
}

pub fn parse_table_row(line: &SourceLine) -> Result<TableRow, LexyError> {
    let values = table_cells(line)?
        .into_iter()
        .map(|(_, cell)| parse_expression(&cell, line))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TableRow {
        reference: line.reference(),
        values,
    })
}

/// `Member` or `Member = Number`.
pub fn parse_enum_member(line: &SourceLine) -> Result<EnumMember, LexyError> {
    let tokens = &line.tokens;
    let Some(name) = tokens.identifier(0) else {
        return fail(line, 0, "Invalid enum member. Name expected.");
    };
    let value = match tokens.len() {
        1 => None,
        _ if tokens.is_operator(1, OperatorType::Assignment) => {
            match parse_expression(&tokens.token_from(2), line)? {
                Expression::Literal(literal) => match literal.value {
                    LiteralValue::Number(value) => Some(value),
                    _ => return fail(line, 2, "Invalid enum member value. Number expected."),
                },
                _ => return fail(line, 2, "Invalid enum member value. Number expected."),
            }
        }
        _ => return fail(line, 1, "Invalid enum member. Expected 'Member' or 'Member = Number'."),
    };
    Ok(EnumMember {
        name: name.to_string(),
        value,
        reference: line.reference(),
    })
}

/// A quoted message starting at token `index`.
pub fn parse_expected_message(line: &SourceLine, index: usize) -> Result<ExpectedMessage, LexyError> {
    match line.tokens.get(index).and_then(|token| token.literal()) {
        Some(LiteralValue::String(text)) if line.tokens.len() == index + 1 => Ok(ExpectedMessage {
            text: text.clone(),
            reference: line.token_reference(index),
        }),
        _ => fail(line, index, "Invalid expected message. Quoted string expected."),
    }
}

pub fn enum_ordinal(previous: Option<Decimal>) -> Decimal {
    previous.map(|value| value + Decimal::ONE).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod line_parsers_tests {
    use super::*;

    fn line(content: &str) -> SourceLine {
        SourceLine::parse("tests.lexy", 4, content).expect("line should tokenize")
    }

    #[test]
    fn variable_definition_with_default() {
        let definition = parse_variable_definition(&line("number Input = 5"), false).expect("definition");
        assert_eq!(definition.name, "Input");
        assert_eq!(
            definition.declared_type,
            DeclarationType::Named(VariablePath::parse("number"))
        );
        assert!(definition.default.is_some());
        assert_eq!(definition.reference.to_string(), "tests.lexy(4, 8)");
    }

    #[test]
    fn generated_type_names_are_dotted_paths() {
        let definition =
            parse_variable_definition(&line("Tax.Parameters Input"), false).expect("definition");
        assert_eq!(
            definition.declared_type,
            DeclarationType::Named(VariablePath::parse("Tax.Parameters"))
        );
    }

    #[test]
    fn implicit_variables_need_a_value() {
        let error = parse_variable_definition(&line("var Total"), true).expect_err("no value");
        assert_eq!(error.message, "Invalid variable declaration. 'var' requires a value.");
        let error = parse_variable_definition(&line("var Total = 1"), false).expect_err("not allowed");
        assert_eq!(error.code, "DECLARATION_INVALID");
    }

    #[test]
    fn code_lines_are_classified() {
        assert!(matches!(
            parse_code_line(&line("number Total = 1")).expect("statement").kind,
            StatementKind::Declaration(_)
        ));
        assert!(matches!(
            parse_code_line(&line("Result.Inner.First = 777")).expect("statement").kind,
            StatementKind::Assignment { .. }
        ));
        assert!(matches!(
            parse_code_line(&line("extract(Results)")).expect("statement").kind,
            StatementKind::Expression(_)
        ));
        let statement = parse_code_line(&line("  Result = 1 // keep")).expect("statement");
        assert_eq!(statement.line.text, "Result = 1");
    }

    #[test]
    fn assignment_lines_open_complex_blocks() {
        assert!(matches!(
            parse_assignment_line(&line("Result.Value = 3")).expect("leaf"),
            AssignmentLine::Leaf(_)
        ));
        match parse_assignment_line(&line("Nested =")).expect("complex") {
            AssignmentLine::Complex(path) => assert_eq!(path.to_string(), "Nested"),
            AssignmentLine::Leaf(_) => panic!("expected complex assignment"),
        }
    }

    #[test]
    fn table_header_and_rows() {
        let header = parse_table_header(&line("| number Income | Color Kind |")).expect("header");
        assert_eq!(header.len(), 2);
        assert_eq!(header[1].name, "Kind");
        assert_eq!(header[1].type_path.to_string(), "Color");

        let row = parse_table_row(&line("| -1 | Color.Red |")).expect("row");
        assert_eq!(row.values.len(), 2);

        let error = parse_table_row(&line("| 1 | 2")).expect_err("unterminated");
        assert_eq!(
            error.message,
            "Invalid table line. Lines should start and end with '|'."
        );
    }

    #[test]
    fn enum_members_with_explicit_values() {
        let member = parse_enum_member(&line("Second = 5")).expect("member");
        assert_eq!(member.value, Some(Decimal::from(5)));
        assert!(parse_enum_member(&line("First")).expect("member").value.is_none());
        assert_eq!(enum_ordinal(Some(Decimal::from(5))), Decimal::from(6));
        assert_eq!(enum_ordinal(None), Decimal::ZERO);
    }

    #[test]
    fn expected_messages_are_quoted_strings() {
        let message = parse_expected_message(&line(r#"expectError "Unknown variable""#), 1)
            .expect("message");
        assert_eq!(message.text, "Unknown variable");
        assert!(parse_expected_message(&line("expectError Unknown"), 1).is_err());
    }
}
