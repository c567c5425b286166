//! ORQL tokenizer using nom.
//!
//! Splits ORQL source text into a flat token stream terminated by
//! [`TokenKind::Eof`]. Whitespace separates tokens and is otherwise ignored.
//!
//! ```text
//! user(id = $id): {name, !password}
//!
//! Name("user") OpenParen Name("id") Eq Param("id") CloseParen Colon
//! OpenCurly Name("name") Comma Not Name("password") CloseCurly Eof
//! ```

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{map, opt, recognize, value},
    multi::many0_count,
    sequence::{delimited, pair, preceded, tuple},
};

use crate::error::{OrqlError, OrqlResult};

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Int,
    Float,
    Bool,
    String,
    Null,
    /// `$name`
    Param,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,
    Colon,
    Comma,
    /// `*`
    All,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Not,
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
    Like,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Name => "name",
            TokenKind::Int => "integer",
            TokenKind::Float => "float",
            TokenKind::Bool => "boolean",
            TokenKind::String => "string",
            TokenKind::Null => "null",
            TokenKind::Param => "parameter",
            TokenKind::OpenCurly => "'{'",
            TokenKind::CloseCurly => "'}'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::All => "'*'",
            TokenKind::And => "'&&'",
            TokenKind::Or => "'||'",
            TokenKind::Not => "'!'",
            TokenKind::Eq => "'='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Ne => "'!='",
            TokenKind::Like => "'like'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(s)
    }
}

/// A single token with its literal value and byte offset in the source.
///
/// For strings the value excludes the quotes, for parameters it excludes the
/// leading `$`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: usize,
}

impl Token {
    /// Human readable description used in syntax errors.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Name | TokenKind::Int | TokenKind::Float | TokenKind::Bool => {
                format!("{} '{}'", self.kind, self.value)
            }
            TokenKind::String => format!("string '{}'", self.value),
            TokenKind::Param => format!("parameter '${}'", self.value),
            _ => self.kind.to_string(),
        }
    }
}

/// Tokenize a complete ORQL source string.
pub fn tokenize(source: &str) -> OrqlResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = source;

    loop {
        rest = rest.trim_start();
        let position = source.len() - rest.len();
        if rest.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                value: String::new(),
                position,
            });
            return Ok(tokens);
        }

        match parse_token(rest) {
            Ok((remaining, (kind, text))) => {
                tokens.push(Token {
                    kind,
                    value: text.to_string(),
                    position,
                });
                rest = remaining;
            }
            Err(_) => return Err(unexpected(rest, position)),
        }
    }
}

fn unexpected(rest: &str, position: usize) -> OrqlError {
    match rest.chars().next() {
        Some(quote @ ('\'' | '"')) => {
            OrqlError::lex(position, format!("unterminated string literal starting with {}", quote))
        }
        Some('&') => OrqlError::lex(position, "expected '&&'"),
        Some('|') => OrqlError::lex(position, "expected '||'"),
        Some('$') => OrqlError::lex(position, "expected parameter name after '$'"),
        Some(c) => OrqlError::lex(position, format!("unexpected character '{}'", c)),
        None => OrqlError::lex(position, "unexpected end of input"),
    }
}

/// Parse one token at the start of the input.
fn parse_token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        parse_string,
        parse_number,
        parse_param,
        parse_word,
        parse_punctuation,
    ))(input)
}

/// Parse an identifier body: a letter or `_` followed by letters, digits or `_`.
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Parse a name or one of the keywords `true`, `false`, `null`, `like`.
fn parse_word(input: &str) -> IResult<&str, (TokenKind, &str)> {
    map(parse_identifier, |word| {
        let kind = match word {
            "true" | "false" => TokenKind::Bool,
            "null" => TokenKind::Null,
            "like" => TokenKind::Like,
            _ => TokenKind::Name,
        };
        (kind, word)
    })(input)
}

/// Parse a parameter reference: `$name`, `$role.id`.
fn parse_param(input: &str) -> IResult<&str, (TokenKind, &str)> {
    map(
        preceded(
            char('$'),
            recognize(pair(
                parse_identifier,
                many0_count(preceded(char('.'), parse_identifier)),
            )),
        ),
        |name| (TokenKind::Param, name),
    )(input)
}

/// Parse an integer or float, optionally negative.
fn parse_number(input: &str) -> IResult<&str, (TokenKind, &str)> {
    map(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |num: &str| {
            if num.contains('.') {
                (TokenKind::Float, num)
            } else {
                (TokenKind::Int, num)
            }
        },
    )(input)
}

/// Parse a single or double quoted string.
fn parse_string(input: &str) -> IResult<&str, (TokenKind, &str)> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s| (TokenKind::String, s),
    )(input)
}

/// Parse punctuation and operators. Two-character operators come first.
fn parse_punctuation(input: &str) -> IResult<&str, (TokenKind, &str)> {
    let (rest, kind) = alt((
        value(TokenKind::And, tag("&&")),
        value(TokenKind::Or, tag("||")),
        value(TokenKind::Ge, tag(">=")),
        value(TokenKind::Le, tag("<=")),
        value(TokenKind::Ne, tag("!=")),
        value(TokenKind::OpenCurly, char('{')),
        value(TokenKind::CloseCurly, char('}')),
        value(TokenKind::OpenParen, char('(')),
        value(TokenKind::CloseParen, char(')')),
        value(TokenKind::Colon, char(':')),
        value(TokenKind::Comma, char(',')),
        value(TokenKind::All, char('*')),
        value(TokenKind::Not, char('!')),
        value(TokenKind::Eq, char('=')),
        value(TokenKind::Gt, char('>')),
        value(TokenKind::Lt, char('<')),
    ))(input)?;
    Ok((rest, (kind, &input[..input.len() - rest.len()])))
}
