use lx_core::ir::{BinaryOperator, BuiltinFunction};
use lx_core::{SourceReference, VariablePath};

use crate::token::LiteralValue;

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpression {
    pub value: LiteralValue,
    pub reference: SourceReference,
}

/// A variable, enum member, table column or type reference such as
/// `Result.Inner.First`. Paths with more than one segment are member access.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierExpression {
    pub path: VariablePath,
    pub reference: SourceReference,
}

impl IdentifierExpression {
    pub fn is_member_access(&self) -> bool {
        self.path.has_child_identifiers()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub reference: SourceReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemFunction {
    New,
    Fill,
    Extract,
}

impl SystemFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "new" => Some(Self::New),
            "fill" => Some(Self::Fill),
            "extract" => Some(Self::Extract),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Fill => "fill",
            Self::Extract => "extract",
        }
    }
}

/// Argument positions of a table lookup after overload selection.
#[derive(Debug, Clone, PartialEq)]
pub struct LookUpCall {
    pub table: String,
    pub table_reference: SourceReference,
    /// `LookUpRow` returns the whole row instead of one column.
    pub row: bool,
    pub value: Box<Expression>,
    pub discriminator: Option<Box<Expression>>,
    pub discriminator_column: Option<Box<Expression>>,
    pub search_column: Option<Box<Expression>>,
    pub result_column: Option<Box<Expression>>,
}

impl LookUpCall {
    pub fn function_name(&self) -> &'static str {
        if self.row {
            "LookUpRow"
        } else {
            "LookUp"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionCall {
    Builtin {
        function: BuiltinFunction,
        arguments: Vec<Expression>,
    },
    System {
        function: SystemFunction,
        argument: Box<Expression>,
    },
    LookUp(LookUpCall),
    /// `Owner.Function(...)`; the owner resolves to a library during validation.
    Member {
        path: VariablePath,
        arguments: Vec<Expression>,
    },
    User {
        name: String,
        arguments: Vec<Expression>,
    },
    Spread {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallExpression {
    pub call: FunctionCall,
    pub reference: SourceReference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(LiteralExpression),
    Identifier(IdentifierExpression),
    Binary(BinaryExpression),
    Parenthesized(Box<Expression>, SourceReference),
    Bracketed(Box<Expression>, SourceReference),
    FunctionCall(FunctionCallExpression),
}

impl Expression {
    pub fn reference(&self) -> &SourceReference {
        match self {
            Self::Literal(literal) => &literal.reference,
            Self::Identifier(identifier) => &identifier.reference,
            Self::Binary(binary) => &binary.reference,
            Self::Parenthesized(_, reference) | Self::Bracketed(_, reference) => reference,
            Self::FunctionCall(call) => &call.reference,
        }
    }

    pub fn as_identifier(&self) -> Option<&IdentifierExpression> {
        match self {
            Self::Identifier(identifier) => Some(identifier),
            _ => None,
        }
    }

    pub fn is_member_access(&self) -> bool {
        self.as_identifier()
            .is_some_and(IdentifierExpression::is_member_access)
    }
}
