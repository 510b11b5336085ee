pub mod declarations;
pub mod expression;
pub mod expression_parser;
pub mod line_parsers;
pub mod nodes;
pub mod token;
pub mod token_list;
pub mod tokenizer;

pub use declarations::{parse_declarations, ParsedSource};
pub use expression::*;
pub use expression_parser::parse_expression;
pub use nodes::*;
pub use token::{LiteralValue, OperatorType, Token, TokenKind};
pub use token_list::{SourceLine, TokenList};
pub use tokenizer::tokenize;
