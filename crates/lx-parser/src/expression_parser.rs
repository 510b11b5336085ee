use lx_core::ir::{BinaryOperator, BuiltinFunction};
use lx_core::{LexyError, SourceReference, VariablePath};

use crate::expression::{
    BinaryExpression, Expression, FunctionCall, FunctionCallExpression, IdentifierExpression,
    LiteralExpression, LookUpCall, SystemFunction,
};
use crate::token::{LiteralValue, OperatorType, Token, TokenKind};
use crate::token_list::{SourceLine, TokenList};

/// Parses a complete expression; every token must be consumed.
pub fn parse_expression(tokens: &TokenList, line: &SourceLine) -> Result<Expression, LexyError> {
    ExpressionParser::new(tokens.tokens(), line).parse_all()
}

fn binary_operator(operator: OperatorType) -> Option<BinaryOperator> {
    Some(match operator {
        OperatorType::Addition => BinaryOperator::Add,
        OperatorType::Subtraction => BinaryOperator::Subtract,
        OperatorType::Multiplication => BinaryOperator::Multiply,
        OperatorType::Division => BinaryOperator::Divide,
        OperatorType::Modulus => BinaryOperator::Modulus,
        OperatorType::Equals => BinaryOperator::Equals,
        OperatorType::NotEqual => BinaryOperator::NotEquals,
        OperatorType::LessThan => BinaryOperator::LessThan,
        OperatorType::LessThanOrEqual => BinaryOperator::LessThanOrEqual,
        OperatorType::GreaterThan => BinaryOperator::GreaterThan,
        OperatorType::GreaterThanOrEqual => BinaryOperator::GreaterThanOrEqual,
        OperatorType::And => BinaryOperator::And,
        OperatorType::Or => BinaryOperator::Or,
        _ => return None,
    })
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

struct ExpressionParser<'a> {
    tokens: &'a [Token],
    position: usize,
    line: &'a SourceLine,
}

impl<'a> ExpressionParser<'a> {
    fn new(tokens: &'a [Token], line: &'a SourceLine) -> Self {
        Self {
            tokens,
            position: 0,
            line,
        }
    }

    fn fail<T>(&self, column: usize, message: impl Into<String>) -> Result<T, LexyError> {
        Err(LexyError::with_reference(
            "EXPRESSION_INVALID",
            message,
            self.line.reference_at(column),
        ))
    }

    fn reference(&self, token: &Token) -> SourceReference {
        self.line.reference_at(token.column)
    }

    fn last_column(&self) -> usize {
        self.tokens
            .last()
            .map(|token| token.column)
            .unwrap_or_else(|| self.line.tokens.column(0))
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    fn parse_all(mut self) -> Result<Expression, LexyError> {
        if self.tokens.is_empty() {
            return self.fail(self.last_column(), "Invalid expression. No tokens.");
        }
        let expression = self.parse_binary(0)?;
        if let Some(token) = self.peek() {
            return self.fail(
                token.column,
                format!("Invalid token '{}'. Expected an operator.", token.text),
            );
        }
        Ok(expression)
    }

    fn parse_binary(&mut self, minimum: u8) -> Result<Expression, LexyError> {
        let mut left = self.parse_primary()?;
        while let Some(token) = self.peek() {
            let Some(operator) = token.operator().and_then(binary_operator) else {
                break;
            };
            if operator.precedence() < minimum {
                break;
            }
            self.position += 1;
            let right = self.parse_binary(operator.precedence() + 1)?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                reference: self.reference(token),
            });
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expression, LexyError> {
        let Some(token) = self.peek() else {
            return self.fail(
                self.last_column(),
                "Invalid expression. Unexpected end of expression.",
            );
        };
        match &token.kind {
            TokenKind::Literal(value) => {
                self.position += 1;
                Ok(Expression::Literal(LiteralExpression {
                    value: value.clone(),
                    reference: self.reference(token),
                }))
            }
            TokenKind::Operator(OperatorType::Subtraction) => self.parse_negation(token),
            TokenKind::Operator(OperatorType::OpenParentheses) => {
                let inner = self.parse_group(
                    OperatorType::OpenParentheses,
                    OperatorType::CloseParentheses,
                    "(Parenthesized) No closing parentheses found.",
                )?;
                Ok(Expression::Parenthesized(Box::new(inner), self.reference(token)))
            }
            TokenKind::Operator(OperatorType::OpenBrackets) => {
                let inner = self.parse_group(
                    OperatorType::OpenBrackets,
                    OperatorType::CloseBrackets,
                    "(Bracketed) No closing bracket found.",
                )?;
                Ok(Expression::Bracketed(Box::new(inner), self.reference(token)))
            }
            TokenKind::Identifier => self.parse_identifier(token),
            _ => self.fail(
                token.column,
                format!("Invalid expression. Unexpected token '{}'.", token.text),
            ),
        }
    }

    fn parse_negation(&mut self, operator: &'a Token) -> Result<Expression, LexyError> {
        self.position += 1;
        if let Some(next) = self.peek() {
            if let Some(LiteralValue::Number(value)) = next.literal() {
                self.position += 1;
                return Ok(Expression::Literal(LiteralExpression {
                    value: LiteralValue::Number(-*value),
                    reference: self.reference(operator),
                }));
            }
        }
        let operand = self.parse_primary()?;
        let zero = Expression::Literal(LiteralExpression {
            value: LiteralValue::Number(lx_core::Decimal::ZERO),
            reference: self.reference(operator),
        });
        Ok(Expression::Binary(BinaryExpression {
            operator: BinaryOperator::Subtract,
            left: Box::new(zero),
            right: Box::new(operand),
            reference: self.reference(operator),
        }))
    }

    /// Index of the token closing the group opened at `open_index`.
    fn find_closing(&self, open_index: usize, open: OperatorType, close: OperatorType) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open_index) {
            if token.is_operator(open) {
                depth += 1;
            } else if token.is_operator(close) {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
        }
        None
    }

    fn parse_group(
        &mut self,
        open: OperatorType,
        close: OperatorType,
        unclosed: &str,
    ) -> Result<Expression, LexyError> {
        let start = self.position;
        let column = self.tokens[start].column;
        let Some(end) = self.find_closing(start, open, close) else {
            return self.fail(column, unclosed);
        };
        let inner = &self.tokens[start + 1..end];
        if inner.is_empty() {
            return self.fail(column, "Invalid expression. No tokens between parentheses.");
        }
        let expression = ExpressionParser::new(inner, self.line).parse_all()?;
        self.position = end + 1;
        Ok(expression)
    }

    fn parse_identifier(&mut self, first: &'a Token) -> Result<Expression, LexyError> {
        let list = TokenList::new(self.tokens[self.position..].to_vec());
        let Some((segments, consumed)) = list.identifier_path(0) else {
            return self.fail(first.column, format!("Invalid identifier '{}'.", first.text));
        };
        self.position += consumed;
        if list.is_operator(consumed, OperatorType::Dot) {
            let dot = list.get(consumed).map(|token| token.column).unwrap_or(first.column);
            return self.fail(dot, "Invalid member access. Identifier expected after '.'.");
        }

        let reference = self.reference(first);
        if !self
            .peek()
            .is_some_and(|token| token.is_operator(OperatorType::OpenParentheses))
        {
            return Ok(Expression::Identifier(IdentifierExpression {
                path: VariablePath::from_segments(segments),
                reference,
            }));
        }

        let open = self.position;
        let Some(close) = self.find_closing(open, OperatorType::OpenParentheses, OperatorType::CloseParentheses)
        else {
            return self.fail(
                self.tokens[open].column,
                "(FunctionCall) No closing parentheses found.",
            );
        };
        let inner = &self.tokens[open + 1..close];
        self.position = close + 1;

        if inner.len() == 1 && inner[0].is_operator(OperatorType::Spread) {
            if segments.len() != 1 {
                return self.fail(first.column, "Invalid spread call. Function name expected.");
            }
            return Ok(Expression::FunctionCall(FunctionCallExpression {
                call: FunctionCall::Spread {
                    name: segments[0].clone(),
                },
                reference,
            }));
        }

        let arguments = self
            .split_arguments(inner, self.tokens[open].column)?
            .into_iter()
            .map(|argument| ExpressionParser::new(argument, self.line).parse_all())
            .collect::<Result<Vec<_>, _>>()?;
        let call = build_call(segments, arguments, &reference)?;
        Ok(Expression::FunctionCall(FunctionCallExpression { call, reference }))
    }

    /// Splits call arguments on top-level commas.
    fn split_arguments(
        &self,
        tokens: &'a [Token],
        open_column: usize,
    ) -> Result<Vec<&'a [Token]>, LexyError> {
        let mut arguments = Vec::new();
        if tokens.is_empty() {
            return Ok(arguments);
        }
        let mut depth = 0usize;
        let mut start = 0;
        for (index, token) in tokens.iter().enumerate() {
            match token.operator() {
                Some(OperatorType::OpenParentheses | OperatorType::OpenBrackets) => depth += 1,
                Some(OperatorType::CloseParentheses | OperatorType::CloseBrackets) => {
                    depth = depth.saturating_sub(1)
                }
                Some(OperatorType::ArgumentSeparator) if depth == 0 => {
                    if index == start {
                        return self.fail(token.column, "Invalid token ','. No tokens before comma.");
                    }
                    arguments.push(&tokens[start..index]);
                    start = index + 1;
                }
                _ => {}
            }
        }
        if start == tokens.len() {
            let column = tokens.last().map(|token| token.column).unwrap_or(open_column);
            return self.fail(column, "Invalid token ','. No tokens after comma.");
        }
        arguments.push(&tokens[start..]);
        Ok(arguments)
    }
}

fn invalid_call(reference: &SourceReference, message: String) -> LexyError {
    LexyError::with_reference("EXPRESSION_INVALID", message, reference.clone())
}

fn build_call(
    segments: Vec<String>,
    mut arguments: Vec<Expression>,
    reference: &SourceReference,
) -> Result<FunctionCall, LexyError> {
    if segments.len() == 2 && matches!(segments[1].as_str(), "LookUp" | "LookUpRow") {
        let row = segments[1] == "LookUpRow";
        return lookup_call(&segments[0], reference.clone(), row, arguments, reference);
    }
    if segments.len() > 1 {
        return Ok(FunctionCall::Member {
            path: VariablePath::from_segments(segments),
            arguments,
        });
    }

    let name = segments.into_iter().next().unwrap_or_default();
    if let Some(function) = BuiltinFunction::from_name(&name) {
        let expected = function.argument_names();
        if arguments.len() != expected.len() {
            return Err(invalid_call(
                reference,
                format!(
                    "Invalid number of arguments: {}({}). Expected {} {} but got {}.",
                    function.name(),
                    expected.join(", "),
                    expected.len(),
                    plural(expected.len()),
                    arguments.len()
                ),
            ));
        }
        return Ok(FunctionCall::Builtin {
            function,
            arguments,
        });
    }
    if let Some(function) = SystemFunction::from_name(&name) {
        if arguments.len() != 1 {
            let argument = if function == SystemFunction::Extract {
                "Value"
            } else {
                "Type"
            };
            return Err(invalid_call(
                reference,
                format!(
                    "Invalid number of arguments: {}({}). Expected 1 argument but got {}.",
                    function.name(),
                    argument,
                    arguments.len()
                ),
            ));
        }
        let argument = Box::new(arguments.remove(0));
        return Ok(FunctionCall::System { function, argument });
    }
    if name == "LookUp" || name == "LookUpRow" {
        let row = name == "LookUpRow";
        if arguments.is_empty() {
            return Err(lookup_arity_error("Table", row, 0, reference));
        }
        let table = arguments.remove(0);
        let Some(identifier) = table
            .as_identifier()
            .filter(|identifier| !identifier.is_member_access())
        else {
            return Err(invalid_call(
                table.reference(),
                format!("Invalid argument 1 of '{}'. Table name expected.", name),
            ));
        };
        return lookup_call(
            identifier.path.root(),
            identifier.reference.clone(),
            row,
            arguments,
            reference,
        );
    }
    Ok(FunctionCall::User { name, arguments })
}

fn lookup_help(table: &str, row: bool) -> String {
    if row {
        format!(
            "{t}.LookUpRow(Value), {t}.LookUpRow(Value, {t}.SearchColumn), \
             {t}.LookUpRow(Discriminator, Value) or \
             {t}.LookUpRow(Discriminator, Value, {t}.DiscriminatorColumn, {t}.SearchColumn)",
            t = table
        )
    } else {
        format!(
            "{t}.LookUp(Value, {t}.ResultColumn), {t}.LookUp(Value, {t}.SearchColumn, {t}.ResultColumn), \
             {t}.LookUp(Discriminator, Value, {t}.ResultColumn) or \
             {t}.LookUp(Discriminator, Value, {t}.DiscriminatorColumn, {t}.SearchColumn, {t}.ResultColumn)",
            t = table
        )
    }
}

fn lookup_arity_error(table: &str, row: bool, count: usize, reference: &SourceReference) -> LexyError {
    let (name, counts) = if row {
        ("LookUpRow", "1, 2 or 4")
    } else {
        ("LookUp", "2, 3 or 5")
    };
    invalid_call(
        reference,
        format!(
            "Invalid number of arguments: '{}'. Expected {} arguments but got {}. Use {}.",
            name,
            counts,
            count,
            lookup_help(table, row)
        ),
    )
}

/// Maps lookup arguments to their roles by count. With three `LookUp`
/// arguments (two for `LookUpRow`) a member access in position 1 is an
/// explicit search column, anything else makes argument 0 a discriminator.
fn lookup_call(
    table: &str,
    table_reference: SourceReference,
    row: bool,
    arguments: Vec<Expression>,
    reference: &SourceReference,
) -> Result<FunctionCall, LexyError> {
    let boxed = |expression: &Expression| Box::new(expression.clone());
    let call = |value: &Expression| LookUpCall {
        table: table.to_string(),
        table_reference: table_reference.clone(),
        row,
        value: boxed(value),
        discriminator: None,
        discriminator_column: None,
        search_column: None,
        result_column: None,
    };

    let lookup = match (row, arguments.as_slice()) {
        (false, [value, result]) => LookUpCall {
            result_column: Some(boxed(result)),
            ..call(value)
        },
        (true, [value]) => call(value),
        (false, [first, second, result]) if second.is_member_access() => LookUpCall {
            search_column: Some(boxed(second)),
            result_column: Some(boxed(result)),
            ..call(first)
        },
        (false, [first, second, result]) => LookUpCall {
            discriminator: Some(boxed(first)),
            result_column: Some(boxed(result)),
            ..call(second)
        },
        (true, [first, second]) if second.is_member_access() => LookUpCall {
            search_column: Some(boxed(second)),
            ..call(first)
        },
        (true, [first, second]) => LookUpCall {
            discriminator: Some(boxed(first)),
            ..call(second)
        },
        (false, [discriminator, value, discriminator_column, search, result]) => LookUpCall {
            discriminator: Some(boxed(discriminator)),
            discriminator_column: Some(boxed(discriminator_column)),
            search_column: Some(boxed(search)),
            result_column: Some(boxed(result)),
            ..call(value)
        },
        (true, [discriminator, value, discriminator_column, search]) => LookUpCall {
            discriminator: Some(boxed(discriminator)),
            discriminator_column: Some(boxed(discriminator_column)),
            search_column: Some(boxed(search)),
            ..call(value)
        },
        _ => return Err(lookup_arity_error(table, row, arguments.len(), reference)),
    };
    Ok(FunctionCall::LookUp(lookup))
}

#[cfg(test)]
mod expression_parser_tests {
    use super::*;

    fn parse(source: &str) -> Result<Expression, LexyError> {
        let line = SourceLine::parse("tests.lexy", 1, source).expect("line should tokenize");
        parse_expression(&line.tokens, &line)
    }

    fn parsed(source: &str) -> Expression {
        parse(source).expect("expression should parse")
    }

    fn binary(expression: &Expression) -> &BinaryExpression {
        match expression {
            Expression::Binary(binary) => binary,
            other => panic!("expected binary expression, got {:?}", other),
        }
    }

    fn call(expression: &Expression) -> &FunctionCall {
        match expression {
            Expression::FunctionCall(call) => &call.call,
            other => panic!("expected function call, got {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expression = parsed("A + B * C");
        let root = binary(&expression);
        assert_eq!(root.operator, BinaryOperator::Add);
        assert_eq!(binary(&root.right).operator, BinaryOperator::Multiply);
    }

    #[test]
    fn logical_operators_have_lowest_precedence() {
        let expression = parsed("A > 1 && B == 2 || C");
        let root = binary(&expression);
        assert_eq!(root.operator, BinaryOperator::Or);
        let left = binary(&root.left);
        assert_eq!(left.operator, BinaryOperator::And);
        assert_eq!(binary(&left.left).operator, BinaryOperator::GreaterThan);
        assert_eq!(binary(&left.right).operator, BinaryOperator::Equals);
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expression = parsed("10 - 3 - 2");
        let root = binary(&expression);
        assert_eq!(root.operator, BinaryOperator::Subtract);
        assert!(matches!(*root.left, Expression::Binary(_)));
        assert!(matches!(*root.right, Expression::Literal(_)));
    }

    #[test]
    fn groups_override_precedence() {
        let expression = parsed("(A + B) * [C - 1]");
        let root = binary(&expression);
        assert!(matches!(*root.left, Expression::Parenthesized(..)));
        assert!(matches!(*root.right, Expression::Bracketed(..)));
    }

    #[test]
    fn negative_literals_fold_into_the_literal() {
        match parsed("-5") {
            Expression::Literal(literal) => assert_eq!(
                literal.value,
                LiteralValue::Number(lx_core::Decimal::from(-5))
            ),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn member_paths_parse_as_identifiers() {
        let expression = parsed("Result.Inner.First");
        let identifier = expression.as_identifier().expect("identifier");
        assert!(identifier.is_member_access());
        assert_eq!(identifier.path.to_string(), "Result.Inner.First");
    }

    #[test]
    fn builtin_functions_validate_argument_count() {
        assert!(matches!(
            call(&parsed("POWER(2, 3)")),
            FunctionCall::Builtin {
                function: BuiltinFunction::Power,
                ..
            }
        ));
        let error = parse("POWER(2)").expect_err("wrong arity");
        assert_eq!(
            error.message,
            "Invalid number of arguments: POWER(Number, Power). Expected 2 arguments but got 1."
        );
        let error = parse("ROUND(1, 2, 3)").expect_err("wrong arity");
        assert_eq!(
            error.message,
            "Invalid number of arguments: ROUND(Number, Digits). Expected 2 arguments but got 3."
        );
        let error = parse("YEAR()").expect_err("wrong arity");
        assert_eq!(
            error.message,
            "Invalid number of arguments: YEAR(Date). Expected 1 argument but got 0."
        );
    }

    #[test]
    fn argument_list_rejects_dangling_commas() {
        let error = parse("F(, 1)").expect_err("leading comma");
        assert_eq!(error.message, "Invalid token ','. No tokens before comma.");
        let error = parse("F(1, )").expect_err("trailing comma");
        assert_eq!(error.message, "Invalid token ','. No tokens after comma.");
    }

    #[test]
    fn nested_calls_split_on_top_level_commas_only() {
        match call(&parsed("F(POWER(2, 3), (1 + 2))")) {
            FunctionCall::User { name, arguments } => {
                assert_eq!(name, "F");
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("expected user call, got {:?}", other),
        }
    }

    #[test]
    fn unclosed_groups_fail() {
        let error = parse("(A + 1").expect_err("unclosed");
        assert_eq!(error.message, "(Parenthesized) No closing parentheses found.");
        let error = parse("[A + 1").expect_err("unclosed");
        assert_eq!(error.message, "(Bracketed) No closing bracket found.");
    }

    #[test]
    fn lookup_with_member_access_second_argument_uses_search_column() {
        match call(&parsed("Rates.LookUp(Income, Rates.Income, Rates.Rate)")) {
            FunctionCall::LookUp(lookup) => {
                assert_eq!(lookup.table, "Rates");
                assert!(lookup.discriminator.is_none());
                assert!(lookup.search_column.is_some());
                assert!(lookup.result_column.is_some());
            }
            other => panic!("expected lookup, got {:?}", other),
        }
    }

    #[test]
    fn lookup_with_plain_second_argument_uses_discriminator() {
        match call(&parsed("LookUp(Rates, Kind, Income, Rates.Rate)")) {
            FunctionCall::LookUp(lookup) => {
                assert_eq!(lookup.table, "Rates");
                assert!(lookup.discriminator.is_some());
                assert!(lookup.search_column.is_none());
                assert_eq!(
                    lookup.value.as_identifier().map(|identifier| identifier.path.to_string()),
                    Some("Income".to_string())
                );
            }
            other => panic!("expected lookup, got {:?}", other),
        }
    }

    #[test]
    fn lookup_row_accepts_one_two_or_four_arguments() {
        assert!(matches!(
            call(&parsed("Rates.LookUpRow(Income)")),
            FunctionCall::LookUp(LookUpCall { row: true, .. })
        ));
        let error = parse("Rates.LookUpRow(1, 2, 3)").expect_err("wrong arity");
        assert!(error
            .message
            .starts_with("Invalid number of arguments: 'LookUpRow'. Expected 1, 2 or 4 arguments but got 3."));
    }

    #[test]
    fn spread_and_system_calls_are_recognized() {
        assert!(matches!(
            call(&parsed("Calculate(...)")),
            FunctionCall::Spread { name } if name == "Calculate"
        ));
        assert!(matches!(
            call(&parsed("new(Tax.Parameters)")),
            FunctionCall::System {
                function: SystemFunction::New,
                ..
            }
        ));
        assert!(matches!(
            call(&parsed("Math.Max(1, 2)")),
            FunctionCall::Member { .. }
        ));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let error = parse("A B").expect_err("two identifiers");
        assert_eq!(error.message, "Invalid token 'B'. Expected an operator.");
    }
}
