use lx_core::{LexyError, SourceReference};

use crate::token::{OperatorType, Token};
use crate::tokenizer::tokenize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn first(&self) -> Option<&Token> {
        self.tokens.first()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Tokens in `start..end`, clamped to the list.
    pub fn slice(&self, start: usize, end: usize) -> TokenList {
        let end = end.min(self.tokens.len());
        let start = start.min(end);
        Self::new(self.tokens[start..end].to_vec())
    }

    pub fn token_from(&self, start: usize) -> TokenList {
        self.slice(start, self.tokens.len())
    }

    pub fn is_keyword(&self, index: usize, keyword: &str) -> bool {
        self.get(index).is_some_and(|token| token.is_keyword(keyword))
    }

    pub fn is_operator(&self, index: usize, operator: OperatorType) -> bool {
        self.get(index)
            .is_some_and(|token| token.is_operator(operator))
    }

    pub fn identifier(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Token::identifier)
    }

    pub fn find_operator(&self, operator: OperatorType) -> Option<usize> {
        self.tokens
            .iter()
            .position(|token| token.is_operator(operator))
    }

    pub fn column(&self, index: usize) -> usize {
        self.get(index).map(|token| token.column).unwrap_or(1)
    }

    /// Dotted identifier path starting at `start`, with the index after it.
    pub fn identifier_path(&self, start: usize) -> Option<(Vec<String>, usize)> {
        let mut segments = vec![self.identifier(start)?.to_string()];
        let mut index = start + 1;
        while self.is_operator(index, OperatorType::Dot) {
            let Some(segment) = self.identifier(index + 1) else {
                break;
            };
            segments.push(segment.to_string());
            index += 2;
        }
        Some((segments, index))
    }

    pub fn without_comments(&self) -> TokenList {
        Self::new(
            self.tokens
                .iter()
                .filter(|token| !token.is_comment())
                .cloned()
                .collect(),
        )
    }

    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One physical source line with its indentation level and tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    pub file: String,
    pub number: usize,
    pub content: String,
    pub indent: usize,
    pub tokens: TokenList,
}

impl SourceLine {
    /// Tokenizes `content`. One indentation level is two spaces or one tab.
    pub fn parse(file: &str, number: usize, content: &str) -> Result<Self, LexyError> {
        let reference = SourceReference::new(file, number, 1);
        let indent = indentation(content).map_err(|message| {
            LexyError::with_reference("TOKEN_INVALID", message, reference.clone())
        })?;
        let tokens = tokenize(content, &reference)?;
        Ok(Self {
            file: file.to_string(),
            number,
            content: content.to_string(),
            indent,
            tokens: TokenList::new(tokens).without_comments(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn reference(&self) -> SourceReference {
        SourceReference::new(self.file.clone(), self.number, self.tokens.column(0))
    }

    pub fn reference_at(&self, column: usize) -> SourceReference {
        SourceReference::new(self.file.clone(), self.number, column)
    }

    pub fn token_reference(&self, index: usize) -> SourceReference {
        self.reference_at(self.tokens.column(index))
    }

    /// Trimmed statement text without its trailing comment.
    pub fn text(&self) -> String {
        let mut end = self.content.len();
        let mut search = 0;
        while let Some(offset) = self.content[search..].find("//") {
            let position = search + offset;
            if !in_quotes(&self.content[..position]) {
                end = position;
                break;
            }
            search = position + 2;
        }
        self.content[..end].trim().to_string()
    }
}

fn in_quotes(prefix: &str) -> bool {
    prefix.chars().filter(|value| *value == '"').count() % 2 == 1
}

fn indentation(content: &str) -> Result<usize, String> {
    let mut level = 0;
    let mut spaces = 0;
    for value in content.chars() {
        match value {
            '\t' => level += 1,
            ' ' => {
                spaces += 1;
                if spaces == 2 {
                    level += 1;
                    spaces = 0;
                }
            }
            _ => break,
        }
    }
    if spaces == 1 && !content.trim().is_empty() {
        return Err("Invalid indentation. Use two spaces or a tab per level.".to_string());
    }
    Ok(level)
}
