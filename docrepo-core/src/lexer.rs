//! Tokenizer for dynamic filter and order strings.

use crate::error::{DocumentStoreError, DocumentStoreResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// A word or dotted path: `borough`, `address.zipcode`, `grades.0.score`, `AND`.
    Path(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    Comma,
    /// `==` or `=`
    Eq,
    /// `!=` or `<>`
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

pub(crate) struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, chars: input.char_indices().peekable() }
    }

    pub fn tokenize(mut self) -> DocumentStoreResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn error(&self, position: usize, message: impl Into<String>) -> DocumentStoreError {
        DocumentStoreError::parse(self.input, position, message)
    }

    fn next_token(&mut self) -> DocumentStoreResult<Token> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((start, c)) = self.chars.next() else {
            return Ok(Token { kind: TokenKind::Eof, position: self.input.len() });
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '=' => {
                self.chars.next_if(|(_, c)| *c == '=');
                TokenKind::Eq
            }
            '!' => match self.chars.next_if(|(_, c)| *c == '=') {
                Some(_) => TokenKind::Ne,
                None => TokenKind::Bang,
            },
            '<' => match self.chars.next_if(|(_, c)| *c == '=' || *c == '>') {
                Some((_, '=')) => TokenKind::Lte,
                Some(_) => TokenKind::Ne,
                None => TokenKind::Lt,
            },
            '>' => match self.chars.next_if(|(_, c)| *c == '=') {
                Some(_) => TokenKind::Gte,
                None => TokenKind::Gt,
            },
            '&' => match self.chars.next_if(|(_, c)| *c == '&') {
                Some(_) => TokenKind::AndAnd,
                None => return Err(self.error(start, "expected '&&'")),
            },
            '|' => match self.chars.next_if(|(_, c)| *c == '|') {
                Some(_) => TokenKind::OrOr,
                None => return Err(self.error(start, "expected '||'")),
            },
            '"' | '\'' => self.string(start, c)?,
            '-' | '0'..='9' => self.number(start, c)?,
            c if c.is_alphabetic() || c == '_' => self.path(start, c),
            other => return Err(self.error(start, format!("unexpected character {other:?}"))),
        };

        Ok(Token { kind, position: start })
    }

    fn string(&mut self, start: usize, quote: char) -> DocumentStoreResult<TokenKind> {
        let mut value = String::new();

        loop {
            match self.chars.next() {
                None => return Err(self.error(start, "unterminated string literal")),
                Some((_, c)) if c == quote => return Ok(TokenKind::Str(value)),
                Some((at, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, c @ ('\\' | '"' | '\''))) => value.push(c),
                    Some((_, other)) => {
                        return Err(self.error(at, format!("unknown escape sequence \\{other}")));
                    }
                    None => return Err(self.error(start, "unterminated string literal")),
                },
                Some((_, c)) => value.push(c),
            }
        }
    }

    fn number(&mut self, start: usize, first: char) -> DocumentStoreResult<TokenKind> {
        let mut end = start + first.len_utf8();
        let mut is_float = false;

        while let Some((at, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit() || *c == '.') {
            if c == '.' {
                if is_float {
                    return Err(self.error(at, "malformed number"));
                }
                is_float = true;
            }
            end = at + c.len_utf8();
        }

        let text = &self.input[start..end];
        let parsed = if is_float {
            text.parse::<f64>().ok().map(TokenKind::Float)
        } else {
            text.parse::<i64>().ok().map(TokenKind::Int)
        };

        parsed.ok_or_else(|| self.error(start, format!("malformed number {text:?}")))
    }

    fn path(&mut self, start: usize, first: char) -> TokenKind {
        let mut end = start + first.len_utf8();

        while let Some((at, c)) = self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '.')
        {
            end = at + c.len_utf8();
        }

        TokenKind::Path(self.input[start..end].to_string())
    }
}
