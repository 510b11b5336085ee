use std::fmt;

use lx_core::{Decimal, NaiveDateTime, PrimitiveType, Value, DATE_FORMAT};

pub const KEYWORDS: [&str; 17] = [
    "function",
    "table",
    "enum",
    "type",
    "scenario",
    "parameters",
    "results",
    "code",
    "validationTable",
    "expectError",
    "expectErrors",
    "expectRootErrors",
    "expectExecutionErrors",
    "if",
    "elseif",
    "else",
    "var",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorType {
    Spread,
    And,
    Or,
    Equals,
    NotEqual,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Assignment,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulus,
    OpenParentheses,
    CloseParentheses,
    OpenBrackets,
    CloseBrackets,
    LessThan,
    GreaterThan,
    Dot,
    ArgumentSeparator,
    Pipe,
}

/// Operator combinations in match priority: earlier entries win.
pub const OPERATORS: [(&str, OperatorType); 22] = [
    ("...", OperatorType::Spread),
    ("&&", OperatorType::And),
    ("||", OperatorType::Or),
    ("==", OperatorType::Equals),
    ("!=", OperatorType::NotEqual),
    (">=", OperatorType::GreaterThanOrEqual),
    ("<=", OperatorType::LessThanOrEqual),
    ("=", OperatorType::Assignment),
    ("+", OperatorType::Addition),
    ("-", OperatorType::Subtraction),
    ("*", OperatorType::Multiplication),
    ("/", OperatorType::Division),
    ("%", OperatorType::Modulus),
    ("(", OperatorType::OpenParentheses),
    (")", OperatorType::CloseParentheses),
    ("[", OperatorType::OpenBrackets),
    ("]", OperatorType::CloseBrackets),
    ("<", OperatorType::LessThan),
    (">", OperatorType::GreaterThan),
    (".", OperatorType::Dot),
    (",", OperatorType::ArgumentSeparator),
    ("|", OperatorType::Pipe),
];

impl OperatorType {
    pub fn symbol(&self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, operator)| operator == self)
            .map(|(symbol, _)| *symbol)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(Decimal),
    String(String),
    Boolean(bool),
    Date(NaiveDateTime),
}

impl LiteralValue {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Number(_) => PrimitiveType::Number,
            Self::String(_) => PrimitiveType::String,
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Date(_) => PrimitiveType::Date,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(value) => Value::Number(*value),
            Self::String(value) => Value::String(value.clone()),
            Self::Boolean(value) => Value::Boolean(*value),
            Self::Date(value) => Value::Date(*value),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "\"{}\"", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Date(value) => write!(f, "d\"{}\"", value.format(DATE_FORMAT)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Operator(OperatorType),
    Literal(LiteralValue),
    Identifier,
    Keyword,
    Comment,
    TableSeparator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based character position on the line.
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            column,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Literal(_))
    }

    pub fn literal(&self) -> Option<&LiteralValue> {
        match &self.kind {
            TokenKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }

    pub fn is_operator(&self, operator: OperatorType) -> bool {
        self.kind == TokenKind::Operator(operator)
    }

    pub fn operator(&self) -> Option<OperatorType> {
        match self.kind {
            TokenKind::Operator(operator) => Some(operator),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        (self.kind == TokenKind::Identifier).then_some(self.text.as_str())
    }

    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }

    pub fn is_table_separator(&self) -> bool {
        self.kind == TokenKind::TableSeparator
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
