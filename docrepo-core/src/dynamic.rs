//! Compiler for string-based filter and order expressions.
//!
//! Filter grammar (keywords and method names are case-insensitive):
//!
//! ```text
//! filter     := or
//! or         := and (("OR" | "||") and)*
//! and        := unary (("AND" | "&&") unary)*
//! unary      := ("NOT" | "!") unary | primary
//! primary    := "(" or ")" | path "." method "(" literal ")" | path op literal | path
//! method     := "Equals" | "Contains" | "StartsWith" | "EndsWith"
//! op         := "==" | "=" | "!=" | "<>" | "<" | "<=" | ">" | ">="
//! literal    := string | integer | decimal | "true" | "false" | "null"
//! ```
//!
//! A bare `path` tests a boolean field for `true`. Order strings are comma-separated
//! `path [asc|ascending|desc|descending]` keys, ascending by default.
//!
//! Field paths are resolved against the document shape as part of compilation, so an
//! unknown field fails here rather than at the store.

use bson::Bson;

use crate::{
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    field::Predicate,
    lexer::{Lexer, Token, TokenKind},
    query::{Expr, FieldOp, Sort},
    resolve::FieldResolver,
};

/// Compiles a filter string into a predicate over `D`.
pub fn compile_filter<D: Document>(input: &str) -> DocumentStoreResult<Predicate<D>> {
    let expr = parse_filter(input)?;
    Ok(Predicate::new(FieldResolver::<D>::new().resolve_expr(&expr)?))
}

/// Compiles an order string into sort keys over `D`.
pub fn compile_order<D: Document>(input: &str) -> DocumentStoreResult<Vec<Sort>> {
    let resolver = FieldResolver::<D>::new();

    parse_order(input)?
        .into_iter()
        .map(|sort| resolver.resolve_sort(&sort))
        .collect()
}

/// Parses a filter string without resolving field paths.
pub fn parse_filter(input: &str) -> DocumentStoreResult<Expr> {
    let mut parser = Parser::new(input)?;

    if parser.peek() == &TokenKind::Eof {
        return Err(DocumentStoreError::parse(input, 0, "filter expression is empty"));
    }

    let expr = parser.or()?;
    parser.expect_eof()?;
    Ok(expr)
}

/// Parses an order string without resolving field paths.
pub fn parse_order(input: &str) -> DocumentStoreResult<Vec<Sort>> {
    let mut parser = Parser::new(input)?;

    if parser.peek() == &TokenKind::Eof {
        return Err(DocumentStoreError::parse(input, 0, "order expression is empty"));
    }

    let mut keys = Vec::new();
    loop {
        let (field, _) = parser.path("a field name")?;
        let direction = match parser.peek() {
            TokenKind::Path(word) => Some(word.to_ascii_lowercase()),
            _ => None,
        };
        let descending = match direction.as_deref() {
            None => false,
            Some("asc" | "ascending") => false,
            Some("desc" | "descending") => true,
            Some(_) => return Err(parser.unexpected("a sort direction")),
        };
        if direction.is_some() {
            parser.advance();
        }
        keys.push(Sort::key(field, descending));

        match parser.peek() {
            TokenKind::Comma => parser.advance(),
            TokenKind::Eof => return Ok(keys),
            _ => return Err(parser.unexpected("',' or end of input")),
        }
    }
}

/// Deepest allowed nesting of parentheses and negations in a filter.
pub const MAX_NESTING: usize = 128;

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> DocumentStoreResult<Self> {
        Ok(Self { input, tokens: Lexer::new(input).tokenize()?, cursor: 0, depth: 0 })
    }

    fn current(&self) -> &Token {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) {
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
    }

    fn unexpected(&self, expected: &str) -> DocumentStoreError {
        let token = self.current();
        let found = match &token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Path(p) => format!("{p:?}"),
            other => format!("{other:?}"),
        };
        DocumentStoreError::parse(self.input, token.position, format!("expected {expected}, found {found}"))
    }

    fn expect_eof(&self) -> DocumentStoreResult<()> {
        match self.peek() {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("AND, OR or end of input")),
        }
    }

    fn descend(&mut self) -> DocumentStoreResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(DocumentStoreError::parse(
                self.input,
                self.current().position,
                "expression nested too deeply",
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Path(word) if word.eq_ignore_ascii_case(keyword))
    }

    fn or(&mut self) -> DocumentStoreResult<Expr> {
        let mut expr = self.and()?;

        while self.peek() == &TokenKind::OrOr || self.is_keyword("or") {
            self.advance();
            let rhs = self.and()?;
            expr = expr.or(rhs);
        }

        Ok(expr)
    }

    fn and(&mut self) -> DocumentStoreResult<Expr> {
        let mut expr = self.unary()?;

        while self.peek() == &TokenKind::AndAnd || self.is_keyword("and") {
            self.advance();
            let rhs = self.unary()?;
            expr = expr.and(rhs);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> DocumentStoreResult<Expr> {
        if self.peek() == &TokenKind::Bang || self.is_keyword("not") {
            self.descend()?;
            self.advance();
            let expr = self.unary()?.not();
            self.depth -= 1;
            return Ok(expr);
        }

        self.primary()
    }

    fn primary(&mut self) -> DocumentStoreResult<Expr> {
        if self.peek() == &TokenKind::LParen {
            self.descend()?;
            self.advance();
            let expr = self.or()?;
            if self.peek() != &TokenKind::RParen {
                return Err(self.unexpected("')'"));
            }
            self.advance();
            self.depth -= 1;
            return Ok(expr);
        }

        let (path, position) = self.path("a field name or '('")?;

        let op = match self.peek() {
            TokenKind::LParen => return self.method_call(&path, position),
            TokenKind::Eq => FieldOp::Eq,
            TokenKind::Ne => FieldOp::Ne,
            TokenKind::Lt => FieldOp::Lt,
            TokenKind::Lte => FieldOp::Lte,
            TokenKind::Gt => FieldOp::Gt,
            TokenKind::Gte => FieldOp::Gte,
            _ => return Ok(Expr::field(path, FieldOp::Eq, Bson::Boolean(true))),
        };
        self.advance();

        let value = self.literal()?;
        Ok(Expr::field(path, op, value))
    }

    fn method_call(&mut self, path: &str, position: usize) -> DocumentStoreResult<Expr> {
        let Some((field, method)) = path.rsplit_once('.') else {
            return Err(DocumentStoreError::parse(
                self.input,
                position,
                format!("{path:?} is not a method call on a field"),
            ));
        };

        let op = match method.to_ascii_lowercase().as_str() {
            "equals" => FieldOp::Eq,
            "contains" => FieldOp::Contains,
            "startswith" => FieldOp::StartsWith,
            "endswith" => FieldOp::EndsWith,
            _ => {
                return Err(DocumentStoreError::parse(
                    self.input,
                    position + field.len() + 1,
                    format!("unsupported method {method:?}"),
                ));
            }
        };

        self.advance();
        let value = self.literal()?;
        if self.peek() != &TokenKind::RParen {
            return Err(self.unexpected("')'"));
        }
        self.advance();

        if matches!(op, FieldOp::Contains | FieldOp::StartsWith | FieldOp::EndsWith)
            && !matches!(value, Bson::String(_))
        {
            return Err(DocumentStoreError::parse(
                self.input,
                position,
                format!("{method} requires a string argument"),
            ));
        }

        Ok(Expr::field(field.to_string(), op, value))
    }

    fn path(&mut self, expected: &str) -> DocumentStoreResult<(String, usize)> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Path(path)
                if !["and", "or", "not"].iter().any(|k| path.eq_ignore_ascii_case(k)) =>
            {
                self.advance();
                Ok((path, token.position))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn literal(&mut self) -> DocumentStoreResult<Bson> {
        let value = match self.peek() {
            TokenKind::Str(s) => Bson::String(s.clone()),
            TokenKind::Int(i) => match i32::try_from(*i) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(*i),
            },
            TokenKind::Float(f) => Bson::Double(*f),
            TokenKind::Path(word) => match word.to_ascii_lowercase().as_str() {
                "true" => Bson::Boolean(true),
                "false" => Bson::Boolean(false),
                "null" => Bson::Null,
                _ => return Err(self.unexpected("a literal")),
            },
            _ => return Err(self.unexpected("a literal")),
        };

        self.advance();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;

    #[test]
    fn method_calls_and_connectives() {
        let expr = parse_filter(r#"borough.Equals("Manhattan") AND name.Contains("Do")"#).unwrap();

        assert_eq!(
            expr,
            Filter::eq("borough", "Manhattan").and(Filter::contains("name", "Do"))
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_filter("a == 1 or b == 2 and c == 3").unwrap();

        assert_eq!(
            expr,
            Filter::eq("a", 1).or(Filter::eq("b", 2).and(Filter::eq("c", 3)))
        );
    }

    #[test]
    fn keywords_are_case_insensitive_and_symbolic_forms_work() {
        let words = parse_filter("a > 1 AnD NOT b <= 2.5").unwrap();
        let symbols = parse_filter("a > 1 && !b <= 2.5").unwrap();

        assert_eq!(words, symbols);
        assert_eq!(words, Filter::gt("a", 1).and(Filter::lte("b", 2.5).not()));
    }

    #[test]
    fn literals() {
        assert_eq!(parse_filter("a = null").unwrap(), Filter::eq("a", Bson::Null));
        assert_eq!(parse_filter("a != false").unwrap(), Filter::ne("a", false));
        assert_eq!(parse_filter("a <> 'x'").unwrap(), Filter::ne("a", "x"));
        assert_eq!(parse_filter("a < -5").unwrap(), Filter::lt("a", -5));
        assert_eq!(
            parse_filter("a >= 3000000000").unwrap(),
            Filter::gte("a", 3_000_000_000i64)
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |depth: usize| format!("{}a == 1{}", "(".repeat(depth), ")".repeat(depth));

        assert_eq!(parse_filter(&nested(MAX_NESTING)).unwrap(), Filter::eq("a", 1));

        let err = parse_filter(&nested(5000)).unwrap_err();
        assert!(matches!(err, DocumentStoreError::Parse { position, .. } if position == MAX_NESTING));

        let negations = format!("{}a == 1", "!".repeat(5000));
        assert!(matches!(parse_filter(&negations), Err(DocumentStoreError::Parse { .. })));
    }

    #[test]
    fn bare_paths_test_for_true() {
        assert_eq!(parse_filter("open").unwrap(), Filter::eq("open", true));
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse_filter("(a == 1 OR b == 2) AND c == 3").unwrap();

        assert_eq!(
            expr,
            Expr::And(vec![
                Expr::Or(vec![Filter::eq("a", 1), Filter::eq("b", 2)]),
                Filter::eq("c", 3),
            ])
        );
    }

    #[test]
    fn string_methods_are_case_insensitive() {
        assert_eq!(
            parse_filter(r#"address.street.startswith("Broad")"#).unwrap(),
            Filter::starts_with("address.street", "Broad")
        );
        assert_eq!(
            parse_filter(r#"name.EndsWith("Cafe")"#).unwrap(),
            Filter::ends_with("name", "Cafe")
        );
    }

    fn parse_error(input: &str) -> (usize, String) {
        match parse_filter(input) {
            Err(DocumentStoreError::Parse { position, message, .. }) => (position, message),
            other => panic!("expected parse error for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_carry_positions() {
        assert_eq!(parse_error("").0, 0);
        assert_eq!(parse_error("   ").0, 0);
        assert_eq!(parse_error("a == ").0, 5);
        assert_eq!(parse_error("a == 1 b").0, 7);
        assert_eq!(parse_error("(a == 1").0, 7);
        assert_eq!(parse_error("a == 1 AND").0, 10);
    }

    #[test]
    fn unsupported_methods_fail() {
        let (position, message) = parse_error(r#"name.Matches("x")"#);

        assert_eq!(position, 5);
        assert!(message.contains("Matches"));
        assert!(parse_error(r#"Contains("x")"#).1.contains("not a method call"));
        assert!(parse_error("name.Contains(3)").1.contains("string"));
    }

    #[test]
    fn order_strings() {
        assert_eq!(
            parse_order("borough desc, name, cuisine ASCENDING").unwrap(),
            vec![Sort::desc("borough"), Sort::asc("name"), Sort::asc("cuisine")]
        );
        assert!(parse_order("").is_err());
        assert!(parse_order("name,").is_err());
        assert!(parse_order("name sideways").is_err());
        assert!(parse_order("name desc desc").is_err());
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_input_fails_cleanly(input in "[a-zA-Z0-9_ .()\"'!=<>&|-]{0,64}") {
            match parse_filter(&input) {
                Ok(_) => {}
                Err(DocumentStoreError::Parse { position, .. }) => {
                    proptest::prop_assert!(position <= input.len());
                }
                Err(other) => proptest::prop_assert!(false, "unexpected error {other:?}"),
            }
        }

        #[test]
        fn rendered_comparisons_parse_back(field in "[a-z][a-z_]{0,8}", value in -1000i32..1000) {
            proptest::prop_assume!(!["and", "or", "not", "true", "false", "null"].contains(&field.as_str()));

            let expr = parse_filter(&format!("{field} >= {value}")).unwrap();
            proptest::prop_assert_eq!(expr, Filter::gte(field, value));
        }
    }
}
