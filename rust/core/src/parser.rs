//! STEP Parser using nom
//!
//! Zero-copy tokenization of ISO 10303-21 instance records and fast
//! sequential entity scanning.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// Magic line every exchange structure starts with
const EXCHANGE_MAGIC: &str = "ISO-10303-21;";

/// STEP Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal: 'text'
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14, 0., 1.E-3
    Float(f64),
    /// Enum: .T., .F., .UNSPECIFIED.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: LENGTH_MEASURE(25.4), PARAMETER_VALUE(0.)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// One `NAME(args)` group. A simple instance has exactly one,
/// a complex instance `(A() B(1.) C(#2))` has several.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPart<'a> {
    pub type_name: &'a str,
    pub args: Vec<Token<'a>>,
}

/// Right-hand side of an instance record
#[derive(Debug, Clone, PartialEq)]
pub enum Record<'a> {
    Simple(RecordPart<'a>),
    Complex(Vec<RecordPart<'a>>),
}

/// Check for the ISO 10303-21 header line
pub fn is_step_exchange(content: &str) -> bool {
    content
        .trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with(EXCHANGE_MAGIC)
}

/// Byte offset where instance records begin (just past `DATA;`).
/// Falls back to 0 for bare record lists without a header.
pub fn data_section_start(content: &str) -> usize {
    memchr::memmem::find(content.as_bytes(), b"DATA;")
        .map(|pos| pos + 5)
        .unwrap_or(0)
}

/// Find the `;` terminating the record that starts at `start`.
/// Semicolons inside quoted strings are skipped.
/// Returns the offset one past the semicolon.
#[inline]
pub(crate) fn record_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    let mut in_string = false;

    while pos < bytes.len() {
        let offset = memchr::memchr2(b';', b'\'', &bytes[pos..])?;
        pos += offset;
        if bytes[pos] == b'\'' {
            // Doubled quotes toggle twice, which leaves the state unchanged
            in_string = !in_string;
        } else if !in_string {
            return Some(pos + 1);
        }
        pos += 1;
    }

    None
}

/// Skip whitespace and `/* ... */` comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), take_while1(|c: char| c.is_whitespace())),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Parse string literal: 'text'
/// STEP uses '' to escape a single quote within a string
fn string_literal(input: &str) -> IResult<&str, Token> {
    fn parse_string_content(input: &str, quote: char) -> IResult<&str, &str> {
        let bytes = input.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] as char == quote {
                if i + 1 < bytes.len() && bytes[i + 1] as char == quote {
                    i += 2;
                    continue;
                }
                return Ok((&input[i..], &input[..i]));
            }
            i += 1;
        }

        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    alt((
        map(
            delimited(char('\''), |i| parse_string_content(i, '\''), char('\'')),
            Token::String,
        ),
        map(
            delimited(char('"'), |i| parse_string_content(i, '"'), char('"')),
            Token::String,
        ),
    ))(input)
}

/// Parse integer: 42, -42, +7
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((opt(one_of("+-")), digit1))),
        |s: &str| s.parse::<i64>().map(Token::Integer),
    )(input)
}

fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0., 1.E-3
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            alt((
                recognize(tuple((char('.'), opt(digit1), opt(exponent)))),
                exponent,
            )),
        ))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

/// Parse enum: .T., .F., .UNSPECIFIED.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

/// Parse null: $
fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

/// Parse derived: *
fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

fn keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Parenthesised, comma separated token list (tolerates inner whitespace)
fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        pair(char('('), ws),
        separated_list0(delimited(ws, char(','), ws), token),
        pair(ws, char(')')),
    )(input)
}

/// Parse typed value: LENGTH_MEASURE(25.4), PARAMETER_VALUE(0.)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(pair(keyword, arguments), |(type_name, args)| {
        Token::TypedValue(type_name, args)
    })(input)
}

/// Parse list: (1, 2, 3) or nested lists
fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // Try float before integer (float includes '.')
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

fn record_part(input: &str) -> IResult<&str, RecordPart> {
    map(
        pair(terminated(keyword, ws), arguments),
        |(type_name, args)| RecordPart { type_name, args },
    )(input)
}

fn record(input: &str) -> IResult<&str, Record> {
    alt((
        map(
            delimited(
                pair(char('('), ws),
                many1(terminated(record_part, ws)),
                char(')'),
            ),
            Record::Complex,
        ),
        map(record_part, Record::Simple),
    ))(input)
}

/// Parse a complete instance record
/// Example: #123=CARTESIAN_POINT('',(0.,0.,1.));
pub fn parse_entity(input: &str) -> Result<(u32, Record)> {
    let result: IResult<&str, (u32, Record)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        delimited(pair(char('='), ws), record, pair(ws, char(';'))),
    ))(input);

    match result {
        Ok((_, parsed)) => Ok(parsed),
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {}", e))),
    }
}

/// Fast entity scanner - walks the data section without full parsing
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner positioned at the start of the data section
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: data_section_start(content),
        }
    }

    /// Scan for the next entity
    /// Returns (entity_id, type_name, record_start, record_end).
    /// For complex instances the type name is the first partial type.
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();

        loop {
            let start_offset = memchr::memchr(b'#', &bytes[self.position..])?;
            let line_start = self.position + start_offset;
            let line_end = record_end(bytes, line_start)?;
            self.position = line_end;

            let id_start = line_start + 1;
            let id_end = self.content[id_start..line_end]
                .find(|c: char| !c.is_ascii_digit())
                .map(|i| id_start + i)
                .unwrap_or(line_end);
            let Ok(id) = self.content[id_start..id_end].parse::<u32>() else {
                continue;
            };

            let Some(eq_pos) = self.content[id_end..line_end].find('=') else {
                continue;
            };

            // Skip whitespace and the opening paren of complex instances
            let Some(type_start) = self.content[id_end + eq_pos + 1..line_end]
                .find(|c: char| !c.is_whitespace() && c != '(')
                .map(|i| id_end + eq_pos + 1 + i)
            else {
                continue;
            };

            let type_end = self.content[type_start..line_end]
                .find(|c: char| c == '(' || c.is_whitespace())
                .map(|i| type_start + i)
                .unwrap_or(line_end);

            return Some((id, &self.content[type_start..type_end], line_start, line_end));
        }
    }
}
