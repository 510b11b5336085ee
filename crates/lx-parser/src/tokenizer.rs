use std::str::FromStr;

use lx_core::{parse_date, Decimal, LexyError, SourceReference};

use crate::token::{LiteralValue, OperatorType, Token, TokenKind, KEYWORDS, OPERATORS};

const OPERATOR_CHARACTERS: &str = ".&|=!<>+-*%()[],";

/// Outcome of feeding one character to the active builder.
enum BuildStep {
    /// Keep feeding. A replacement builder takes over when one is given.
    InProgress(Option<TokenBuilder>),
    /// The token is complete. When `processed` is false the character is fed
    /// again to a fresh builder; `next` continues lexing in a new builder.
    Finished {
        processed: bool,
        token: Token,
        next: Option<TokenBuilder>,
    },
    Invalid(String),
}

#[derive(Debug, Clone)]
enum TokenBuilder {
    Word { column: usize, text: String },
    Number { column: usize, text: String },
    Quoted { column: usize, text: String, date: bool },
    Operator { column: usize, text: String },
    Slash { column: usize },
    Comment { column: usize, text: String },
}

impl TokenBuilder {
    fn start(value: char, column: usize) -> Result<Self, String> {
        if value.is_ascii_alphabetic() || value == '_' {
            return Ok(Self::Word {
                column,
                text: value.to_string(),
            });
        }
        if value.is_ascii_digit() {
            return Ok(Self::Number {
                column,
                text: value.to_string(),
            });
        }
        if value == '"' {
            return Ok(Self::Quoted {
                column,
                text: String::new(),
                date: false,
            });
        }
        if value == '/' {
            return Ok(Self::Slash { column });
        }
        if OPERATOR_CHARACTERS.contains(value) {
            return Ok(Self::Operator {
                column,
                text: value.to_string(),
            });
        }
        Err(format!("Invalid character: '{}'", value))
    }

    fn process(&mut self, value: char) -> BuildStep {
        match self {
            Self::Word { column, text } => {
                if value.is_ascii_alphanumeric() || value == '_' {
                    text.push(value);
                    return BuildStep::InProgress(None);
                }
                if value == '"' && text.as_str() == "d" {
                    return BuildStep::InProgress(Some(Self::Quoted {
                        column: *column,
                        text: String::new(),
                        date: true,
                    }));
                }
                BuildStep::Finished {
                    processed: false,
                    token: word_token(text, *column),
                    next: None,
                }
            }
            Self::Number { column, text } => {
                if value.is_ascii_digit() {
                    text.push(value);
                    return BuildStep::InProgress(None);
                }
                if value == '.' {
                    if text.contains('.') {
                        return BuildStep::Invalid(format!("Invalid number token: '{}{}'", text, value));
                    }
                    text.push(value);
                    return BuildStep::InProgress(None);
                }
                if value.is_ascii_alphabetic() || value == '_' {
                    return BuildStep::Invalid(format!("Invalid number token: '{}{}'", text, value));
                }
                match number_token(text, *column) {
                    Ok(token) => BuildStep::Finished {
                        processed: false,
                        token,
                        next: None,
                    },
                    Err(message) => BuildStep::Invalid(message),
                }
            }
            Self::Quoted { column, text, date } => {
                if value != '"' {
                    text.push(value);
                    return BuildStep::InProgress(None);
                }
                match quoted_token(text, *column, *date) {
                    Ok(token) => BuildStep::Finished {
                        processed: true,
                        token,
                        next: None,
                    },
                    Err(message) => BuildStep::Invalid(message),
                }
            }
            Self::Operator { column, text } => {
                let candidate = format!("{}{}", text, value);
                if OPERATORS
                    .iter()
                    .any(|(symbol, _)| symbol.starts_with(candidate.as_str()))
                {
                    text.push(value);
                    return BuildStep::InProgress(None);
                }
                match operator_token(text, *column) {
                    Ok(token) => BuildStep::Finished {
                        processed: false,
                        token,
                        next: None,
                    },
                    Err(message) => BuildStep::Invalid(message),
                }
            }
            Self::Slash { column } => {
                if value == '/' {
                    return BuildStep::InProgress(Some(Self::Comment {
                        column: *column,
                        text: "//".to_string(),
                    }));
                }
                BuildStep::Finished {
                    processed: false,
                    token: Token::new(TokenKind::Operator(OperatorType::Division), "/", *column),
                    next: None,
                }
            }
            Self::Comment { text, .. } => {
                text.push(value);
                BuildStep::InProgress(None)
            }
        }
    }

    fn end_of_line(self) -> Result<Token, String> {
        match self {
            Self::Word { column, text } => Ok(word_token(&text, column)),
            Self::Number { column, text } => number_token(&text, column),
            Self::Quoted { .. } => {
                Err("Invalid token at end of line. Closing quote expected.".to_string())
            }
            Self::Operator { column, text } => operator_token(&text, column),
            Self::Slash { column } => Ok(Token::new(
                TokenKind::Operator(OperatorType::Division),
                "/",
                column,
            )),
            Self::Comment { column, text } => Ok(Token::new(TokenKind::Comment, text, column)),
        }
    }

    fn column(&self) -> usize {
        match self {
            Self::Word { column, .. }
            | Self::Number { column, .. }
            | Self::Quoted { column, .. }
            | Self::Operator { column, .. }
            | Self::Slash { column }
            | Self::Comment { column, .. } => *column,
        }
    }
}

fn word_token(text: &str, column: usize) -> Token {
    let kind = match text {
        "true" => TokenKind::Literal(LiteralValue::Boolean(true)),
        "false" => TokenKind::Literal(LiteralValue::Boolean(false)),
        keyword if KEYWORDS.contains(&keyword) => TokenKind::Keyword,
        _ => TokenKind::Identifier,
    };
    Token::new(kind, text, column)
}

fn number_token(text: &str, column: usize) -> Result<Token, String> {
    if text.ends_with('.') {
        return Err(format!("Invalid number token: '{}'", text));
    }
    let value =
        Decimal::from_str(text).map_err(|_| format!("Invalid number token: '{}'", text))?;
    Ok(Token::new(
        TokenKind::Literal(LiteralValue::Number(value)),
        text,
        column,
    ))
}

fn quoted_token(text: &str, column: usize, date: bool) -> Result<Token, String> {
    if !date {
        return Ok(Token::new(
            TokenKind::Literal(LiteralValue::String(text.to_string())),
            format!("\"{}\"", text),
            column,
        ));
    }
    let value = parse_date(text).ok_or_else(|| format!("Invalid date: '{}'", text))?;
    Ok(Token::new(
        TokenKind::Literal(LiteralValue::Date(value)),
        format!("d\"{}\"", text),
        column,
    ))
}

fn operator_token(text: &str, column: usize) -> Result<Token, String> {
    let operator = OPERATORS
        .iter()
        .find(|(symbol, _)| matches_combination(symbol, text))
        .map(|(_, operator)| *operator)
        .ok_or_else(|| format!("Invalid operator: '{}'", text))?;
    let kind = if operator == OperatorType::Pipe {
        TokenKind::TableSeparator
    } else {
        TokenKind::Operator(operator)
    };
    Ok(Token::new(kind, text, column))
}

/// Compares the first, second and third characters of a combination.
fn matches_combination(symbol: &str, text: &str) -> bool {
    let mut expected = symbol.chars();
    let mut actual = text.chars();
    for _ in 0..3 {
        if expected.next() != actual.next() {
            return false;
        }
    }
    true
}

/// Splits one source line into tokens. Whitespace separates tokens and is not
/// kept; a trailing `//` comment becomes a single comment token.
pub fn tokenize(line: &str, reference: &SourceReference) -> Result<Vec<Token>, LexyError> {
    let characters = line.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut current: Option<TokenBuilder> = None;
    let mut index = 0;

    while index < characters.len() {
        let value = characters[index];
        let column = index + 1;
        let Some(mut builder) = current.take() else {
            if !value.is_whitespace() {
                let builder = TokenBuilder::start(value, column)
                    .map_err(|message| invalid(message, reference, column))?;
                current = Some(builder);
            }
            index += 1;
            continue;
        };

        match builder.process(value) {
            BuildStep::InProgress(replacement) => {
                current = Some(replacement.unwrap_or(builder));
                index += 1;
            }
            BuildStep::Finished {
                processed,
                token,
                next,
            } => {
                tokens.push(token);
                current = next;
                if processed {
                    index += 1;
                }
            }
            BuildStep::Invalid(message) => return Err(invalid(message, reference, column)),
        }
    }

    if let Some(builder) = current {
        let column = builder.column();
        let token = builder
            .end_of_line()
            .map_err(|message| invalid(message, reference, column))?;
        tokens.push(token);
    }
    Ok(tokens)
}

fn invalid(message: String, reference: &SourceReference, column: usize) -> LexyError {
    LexyError::with_reference("TOKEN_INVALID", message, reference.with_column(column))
}

#[cfg(test)]
mod tokenizer_tests {
    use super::*;

    fn reference() -> SourceReference {
        SourceReference::new("tests.lexy", 1, 1)
    }

    fn kinds(line: &str) -> Vec<TokenKind> {
        tokenize(line, &reference())
            .expect("line should tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn texts(line: &str) -> Vec<String> {
        tokenize(line, &reference())
            .expect("line should tokenize")
            .into_iter()
            .map(|token| token.text)
            .collect()
    }

    #[test]
    fn tokenizes_assignment_with_member_access() {
        assert_eq!(
            texts("Result.Value = Input * 2.5"),
            vec!["Result", ".", "Value", "=", "Input", "*", "2.5"]
        );
        let tokens = tokenize("  Result = 1", &reference()).expect("tokens");
        assert_eq!(tokens[0].column, 3);
        assert_eq!(tokens[2].column, 12);
    }

    #[test]
    fn greedy_operators_prefer_longer_combinations() {
        assert_eq!(
            kinds("a>=b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator(OperatorType::GreaterThanOrEqual),
                TokenKind::Identifier
            ]
        );
        assert_eq!(texts("x=-5"), vec!["x", "=", "-", "5"]);
        assert_eq!(texts("F(...)"), vec!["F", "(", "...", ")"]);
        assert_eq!(texts("a||b&&c"), vec!["a", "||", "b", "&&", "c"]);
    }

    #[test]
    fn slash_resolves_to_division_or_comment() {
        assert_eq!(
            kinds("a / b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator(OperatorType::Division),
                TokenKind::Identifier
            ]
        );
        let tokens = tokenize("Result = 1 // note", &reference()).expect("tokens");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[3].is_comment());
        assert_eq!(tokens[3].text, "// note");
        assert_eq!(kinds("a/"), vec![TokenKind::Identifier, TokenKind::Operator(OperatorType::Division)]);
    }

    #[test]
    fn bare_pipe_is_table_separator() {
        assert_eq!(
            kinds("| number A |"),
            vec![
                TokenKind::TableSeparator,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::TableSeparator
            ]
        );
    }

    #[test]
    fn literals_carry_typed_values() {
        let tokens =
            tokenize(r#"12.50 "text" true d"2024-01-31""#, &reference()).expect("tokens");
        assert_eq!(
            tokens[0].literal(),
            Some(&LiteralValue::Number(Decimal::from_str("12.50").expect("decimal")))
        );
        assert_eq!(tokens[1].literal(), Some(&LiteralValue::String("text".to_string())));
        assert_eq!(tokens[2].literal(), Some(&LiteralValue::Boolean(true)));
        assert!(matches!(tokens[3].literal(), Some(LiteralValue::Date(_))));
    }

    #[test]
    fn keywords_are_classified() {
        let tokens = tokenize("function Tax", &reference()).expect("tokens");
        assert!(tokens[0].is_keyword("function"));
        assert_eq!(tokens[1].identifier(), Some("Tax"));
    }

    #[test]
    fn invalid_input_reports_message_and_position() {
        let error = tokenize("a = 1 # 2", &reference()).expect_err("invalid character");
        assert_eq!(error.code, "TOKEN_INVALID");
        assert_eq!(error.message, "Invalid character: '#'");
        assert_eq!(error.reference.map(|reference| reference.column), Some(7));

        let error = tokenize("a & b", &reference()).expect_err("invalid operator");
        assert_eq!(error.message, "Invalid operator: '&'");

        let error = tokenize("1.2.3", &reference()).expect_err("invalid number");
        assert_eq!(error.message, "Invalid number token: '1.2.'");

        let error = tokenize("\"open", &reference()).expect_err("unterminated");
        assert_eq!(
            error.message,
            "Invalid token at end of line. Closing quote expected."
        );

        let error = tokenize("d\"2024-02-30\"", &reference()).expect_err("invalid date");
        assert_eq!(error.message, "Invalid date: '2024-02-30'");
    }
}
