use crate::{BinaryOperation, Expression, Term};
use smol_str::SmolStr;
use std::{collections::BTreeMap, ops::Range, str::FromStr};
use thiserror::Error;

/// Parse an [`Expression`] tree from some text.
pub fn parse(s: &str) -> Result<Expression, ParseError> {
    Parser::new(s)?.parse()
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { parse(s) }
}

impl FromStr for Term {
    type Err = ParseError;

    /// Parse a single term (e.g. `-3x^2`, `(x)(y^-1)` or `0.5`), rejecting
    /// anything which isn't entirely a term.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser::new(s)?;

        if parser.peek().is_none() {
            return Err(ParseError::UnexpectedEndOfInput);
        }

        let term = parser.literal()?;
        parser.finish()?;

        Ok(term)
    }
}

/// A backtracking recursive descent parser for converting a string into an
/// expression tree.
///
/// The grammar:
///
/// ```text
/// expression := term (OPERATOR term)*
///
/// term       := literal
///             | "(" expression ")"
///
/// literal    := "-"? NUMBER? factor*
///
/// factor     := IDENTIFIER exponent?
///             | "(" IDENTIFIER exponent? ")"
///
/// exponent   := "^" "-"? NUMBER
/// ```
///
/// Operators all have the same precedence and are applied left to right, so
/// `1 + 2 * 3` is `(1 + 2) * 3`.
#[derive(Debug, Clone)]
pub(crate) struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Result<Self, ParseError> {
        let tokens = Tokens::new(src).collect::<Result<Vec<_>, _>>()?;

        Ok(Parser {
            src,
            tokens,
            cursor: 0,
        })
    }

    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        let expr = self.expression()?;
        self.finish()?;

        Ok(expr)
    }

    /// Make sure every token has been consumed.
    fn finish(&self) -> Result<(), ParseError> {
        match self.tokens.get(self.cursor) {
            None => Ok(()),
            Some(token) => Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span.clone(),
                expected: &[
                    TokenKind::Plus,
                    TokenKind::Minus,
                    TokenKind::Times,
                    TokenKind::Divide,
                    TokenKind::Caret,
                ],
            }),
        }
    }

    fn peek(&self) -> Option<TokenKind> { self.peek_nth(0) }

    fn peek_nth(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.cursor + n).map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        let token = self
            .tokens
            .get(self.cursor)
            .cloned()
            .ok_or(ParseError::UnexpectedEndOfInput)?;
        self.cursor += 1;

        Ok(token)
    }

    /// The byte offset of the next token.
    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|tok| tok.span.start)
            .unwrap_or_else(|| self.src.len())
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.term()?;

        while let Some(op) = self.peek().and_then(TokenKind::as_binary_op) {
            // skip past the operator
            let _ = self.advance()?;
            // and parse the second bit
            let right = self.term()?;

            expr = Expression::binary(op, expr, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        match self.peek() {
            Some(TokenKind::OpenParen) => {
                // "(x)(y)" is a literal while "(x + 1)" is a sub-expression
                let checkpoint = self.cursor;

                match self.literal() {
                    Ok(term) => Ok(Expression::from(term)),
                    Err(_) => {
                        self.cursor = checkpoint;
                        self.parenthesized()
                    },
                }
            },
            Some(TokenKind::Number)
            | Some(TokenKind::Identifier)
            | Some(TokenKind::Minus) => self.literal().map(Expression::from),
            Some(_) => {
                let Token { kind, span, .. } = self.advance()?;

                Err(ParseError::UnexpectedToken {
                    found: kind,
                    span,
                    expected: &[
                        TokenKind::Number,
                        TokenKind::Identifier,
                        TokenKind::Minus,
                        TokenKind::OpenParen,
                    ],
                })
            },
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn parenthesized(&mut self) -> Result<Expression, ParseError> {
        let open_paren = self.advance()?;
        debug_assert_eq!(open_paren.kind, TokenKind::OpenParen);

        let expr = self.expression()?;

        let Token { kind, span, .. } = self.advance()?;

        if kind == TokenKind::CloseParen {
            Ok(expr)
        } else {
            Err(ParseError::UnexpectedToken {
                found: kind,
                span,
                expected: &[TokenKind::CloseParen],
            })
        }
    }

    pub(crate) fn literal(&mut self) -> Result<Term, ParseError> {
        let start = self.position();

        let negative = self.peek() == Some(TokenKind::Minus);
        if negative {
            let _ = self.advance()?;
        }

        let coefficient = if self.peek() == Some(TokenKind::Number) {
            Some(self.number()?)
        } else {
            None
        };

        let mut powers: BTreeMap<SmolStr, f64> = BTreeMap::new();

        while let Some((name, exponent)) = self.factor()? {
            *powers.entry(name).or_insert(0.0) += exponent;
        }

        let coefficient = match coefficient {
            Some(c) if c == 0.0 && powers.is_empty() => None,
            Some(c) => Some(c),
            None if powers.is_empty() => None,
            None => Some(1.0),
        };

        match coefficient {
            Some(c) if negative => Ok(Term::new(-c, powers)),
            Some(c) => Ok(Term::new(c, powers)),
            None => Err(ParseError::InvalidLiteral {
                span: start..self.position(),
            }),
        }
    }

    /// Try to parse a single `x^n` factor, leaving the cursor untouched if
    /// there isn't one.
    fn factor(&mut self) -> Result<Option<(SmolStr, f64)>, ParseError> {
        match self.peek() {
            Some(TokenKind::Identifier) => {
                let ident = self.advance()?;
                let exponent = self.exponent()?;

                Ok(Some((ident.text.into(), exponent)))
            },
            Some(TokenKind::OpenParen)
                if self.peek_nth(1) == Some(TokenKind::Identifier) =>
            {
                let checkpoint = self.cursor;
                let _ = self.advance()?;
                let ident = self.advance()?;
                let exponent = self.exponent()?;

                if self.peek() == Some(TokenKind::CloseParen) {
                    let _ = self.advance()?;
                    Ok(Some((ident.text.into(), exponent)))
                } else {
                    self.cursor = checkpoint;
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn exponent(&mut self) -> Result<f64, ParseError> {
        let is_exponent = match (self.peek(), self.peek_nth(1), self.peek_nth(2))
        {
            (Some(TokenKind::Caret), Some(TokenKind::Number), _) => true,
            (
                Some(TokenKind::Caret),
                Some(TokenKind::Minus),
                Some(TokenKind::Number),
            ) => true,
            _ => false,
        };

        if !is_exponent {
            return Ok(1.0);
        }

        let _ = self.advance()?;

        if self.peek() == Some(TokenKind::Minus) {
            let _ = self.advance()?;
            Ok(-self.number()?)
        } else {
            self.number()
        }
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let token = self.advance()?;
        debug_assert_eq!(token.kind, TokenKind::Number);

        token
            .text
            .parse()
            .map_err(|_| ParseError::InvalidLiteral { span: token.span })
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Invalid character, {character:?}, at index {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("Found a {found:?} at {span:?} but expected one of {expected:?}")]
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
    /// A term without any variables or a non-zero coefficient (e.g. `-` or
    /// `0`).
    #[error("Invalid literal at {span:?}")]
    InvalidLiteral { span: Range<usize> },
}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(&mut self, kind: TokenKind) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        self.advance()?;
        let end = self.cursor;

        Some(Ok(Token::from_text(self.src, start..end, kind)))
    }

    fn take_while<P>(&mut self, mut predicate: P) -> Range<usize>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.cursor;

        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        start..self.cursor
    }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.take_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        Token::from_text(self.src, start..self.cursor, TokenKind::Number)
    }

    fn chomp_identifier(&mut self) -> Token<'a> {
        let span = self.take_while(char::is_alphabetic);

        Token::from_text(self.src, span, TokenKind::Identifier)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen),
                ')' => self.chomp(TokenKind::CloseParen),
                '+' => self.chomp(TokenKind::Plus),
                '-' => self.chomp(TokenKind::Minus),
                '*' => self.chomp(TokenKind::Times),
                '/' => self.chomp(TokenKind::Divide),
                '^' => self.chomp(TokenKind::Caret),
                letter if letter.is_alphabetic() => {
                    Some(Ok(self.chomp_identifier()))
                },
                '0'..='9' => Some(Ok(self.chomp_number())),
                other => Some(Err(ParseError::InvalidCharacter {
                    character: other,
                    index: self.cursor,
                })),
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    kind: TokenKind,
}

impl<'a> Token<'a> {
    fn from_text(
        original_source: &'a str,
        span: Range<usize>,
        kind: TokenKind,
    ) -> Self {
        Token {
            text: &original_source[span.clone()],
            span,
            kind,
        }
    }
}

/// The kinds of token that can appear in an [`Expression`]'s text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Times,
    Divide,
    Caret,
}

impl TokenKind {
    fn as_binary_op(self) -> Option<BinaryOperation> {
        match self {
            TokenKind::Plus => Some(BinaryOperation::Add),
            TokenKind::Minus => Some(BinaryOperation::Subtract),
            TokenKind::Times => Some(BinaryOperation::Multiply),
            TokenKind::Divide => Some(BinaryOperation::Divide),
            TokenKind::Caret => Some(BinaryOperation::Power),
            _ => None,
        }
    }
}


#[cfg(test)]
mod parser_tests {
    use super::*;

    macro_rules! parser_test {
        ($name:ident, $src:expr) => {
            parser_test!($name, $src, $src);
        };
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let got = parse($src).unwrap();

                let round_tripped = got.to_string();
                assert_eq!(round_tripped, $should_be);
            }
        };
    }

    parser_test!(simple_integer, "1");
    parser_test!(simple_decimal, "0.25");
    parser_test!(negative_number, "-1");
    parser_test!(variable, "x");
    parser_test!(negative_variable, "-x");
    parser_test!(coefficient_and_power, "3x^2");
    parser_test!(negative_exponent, "x^-1");
    parser_test!(multiple_variables, "2x^2y", "2(x^2)(y)");
    parser_test!(parenthesized_factors, "-(y)(x)", "-(x)(y)");
    parser_test!(repeated_factors_are_combined, "(x)(x^2)", "x^3");
    parser_test!(one_plus_one, "1 + 1", "(1) + (1)");
    parser_test!(subtract_a_negative, "2x - -1", "(2x) - (-1)");
    parser_test!(
        operators_apply_left_to_right,
        "1 + 2 * 3",
        "((1) + (2)) * (3)"
    );
    parser_test!(grouping, "1 + (2 * 3)", "(1) + ((2) * (3))");
    parser_test!(power_of_a_number, "2^3", "(2) ^ (3)");
    parser_test!(variable_exponent, "x^y", "(x) ^ (y)");
    parser_test!(literal_in_parens, "(x)", "x");
    parser_test!(number_in_parens, "(1)", "1");
    parser_test!(explicit_zero_coefficient, "0x + 1", "(0) + (1)");
    parser_test!(
        fraction,
        "(x^2 + 1) / (2x + 2)",
        "((x^2) + (1)) / ((2x) + (2))"
    );

    #[test]
    fn parsed_expressions_evaluate_left_to_right() {
        let got = parse("1 + 2 * 3").unwrap().value_at(|_| None).unwrap();

        assert_eq!(got, 9.0);
    }

    #[test]
    fn simplified_expressions_round_trip() {
        let inputs = vec![
            "0.5x^2 + 2x + 3",
            "x^2 - 2x - 1",
            "-(x)(y) + 3",
            "4(x^2)(y) - 0.25x^-1",
            "7",
        ];

        for src in inputs {
            let expr = parse(src).unwrap().simplify();

            assert_eq!(expr.to_string(), src);
            assert_eq!(parse(&expr.to_string()).unwrap().simplify(), expr);
        }
    }

    #[test]
    fn nested_fraction_keeps_its_shape() {
        let got = parse("(-(y)(x) + 3) / (x + 1)").unwrap().simplify();

        let numerator = parse("-(x)(y) + 3").unwrap().simplify();
        let denominator = parse("x + 1").unwrap().simplify();
        assert_eq!(got, numerator.divide(denominator));
    }

    #[test]
    fn invalid_expressions() {
        let inputs = vec![
            ("", ParseError::UnexpectedEndOfInput),
            ("(", ParseError::UnexpectedEndOfInput),
            ("x +", ParseError::UnexpectedEndOfInput),
            ("(x + 1", ParseError::UnexpectedEndOfInput),
            ("-", ParseError::InvalidLiteral { span: 0..1 }),
            ("x - 0", ParseError::InvalidLiteral { span: 4..5 }),
            (
                "x)",
                ParseError::UnexpectedToken {
                    found: TokenKind::CloseParen,
                    span: 1..2,
                    expected: &[
                        TokenKind::Plus,
                        TokenKind::Minus,
                        TokenKind::Times,
                        TokenKind::Divide,
                        TokenKind::Caret,
                    ],
                },
            ),
            (
                "x $",
                ParseError::InvalidCharacter {
                    character: '$',
                    index: 2,
                },
            ),
        ];

        for (src, should_be) in inputs {
            let got = parse(src).unwrap_err();
            assert_eq!(got, should_be, "{:?}", src);
        }
    }

    #[test]
    fn parse_single_terms() {
        let inputs = vec![
            ("x", Term::variable("x")),
            ("-x", Term::new(-1.0, vec![("x", 1.0)])),
            ("2x^2y", Term::new(2.0, vec![("x", 2.0), ("y", 1.0)])),
            ("(x)(y^-1)", Term::new(1.0, vec![("x", 1.0), ("y", -1.0)])),
            ("4str^2", Term::new(4.0, vec![("str", 2.0)])),
            ("0.5", Term::constant(0.5)),
            ("0x", Term::zero()),
        ];

        for (src, should_be) in inputs {
            let got: Term = src.parse().unwrap();
            assert_eq!(got, should_be, "{:?}", src);
        }
    }

    #[test]
    fn invalid_terms() {
        let inputs = vec!["", "(", "-", "0", "x*2", "(2x^2)", "x + 1"];

        for src in inputs {
            assert!(src.parse::<Term>().is_err(), "{:?}", src);
        }
    }
}
