//! Content stream tokenizer.
//!
//! Content streams use postfix notation: operands come before the operator.
//!
//! ```text
//! BT
//!   /F1 12 Tf
//!   100 700 Td
//!   (Hello, World!) Tj
//! ET
//! ```
//!
//! Unlike a text extractor, which can skip bytes it does not understand, the
//! tokenizer here feeds a writer that replaces the page content, so anything
//! it cannot read fails the page with [`Error::ContentParse`] instead.

use crate::content::operators::Operation;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use nom::IResult;
use nom::bytes::complete::{tag, take_till, take_while, take_while1};
use nom::error::{ErrorKind, ParseError};

type ParseResult<'a, T> = IResult<&'a [u8], T>;

/// Parse a page content stream into operations.
///
/// `page` is only used to label errors.
///
/// # Examples
///
/// ```
/// use pdf_tagger::content::parse_content_stream;
///
/// let ops = parse_content_stream(b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET", 0).unwrap();
/// assert_eq!(ops.len(), 5);
/// assert_eq!(ops[3].operator, "Tj");
/// ```
pub fn parse_content_stream(data: &[u8], page: usize) -> Result<Vec<Operation>> {
    let mut operations = Vec::new();
    let mut operands = Vec::new();
    // Offset of the current operation's first operand
    let mut op_start: Option<usize> = None;
    let mut input = data;

    loop {
        input = skip_whitespace(input);
        if input.is_empty() {
            break;
        }

        let offset = data.len() - input.len();
        let fail = |reason: String| Error::ContentParse {
            page,
            offset,
            reason,
        };

        if is_regular(input[0]) && !starts_number(input) {
            let (rest, keyword) = keyword(input).map_err(|_| fail("bad operator".to_string()))?;
            match keyword {
                b"true" | b"false" | b"null" => {
                    op_start.get_or_insert(offset);
                    operands.push(match keyword {
                        b"true" => Object::Boolean(true),
                        b"false" => Object::Boolean(false),
                        _ => Object::Null,
                    });
                },
                b"BI" => {
                    let (rest, mut op) = inline_image(rest)
                        .map_err(|_| fail("unterminated inline image".to_string()))?;
                    if !operands.is_empty() {
                        return Err(fail("operands before BI".to_string()));
                    }
                    op.raw = Some(data[offset..data.len() - rest.len()].to_vec());
                    operations.push(op);
                    input = rest;
                    continue;
                },
                _ => {
                    let start = op_start.take().unwrap_or(offset);
                    let end = data.len() - rest.len();
                    let operator = String::from_utf8_lossy(keyword).into_owned();
                    let mut op = Operation::new(operator, std::mem::take(&mut operands));
                    op.raw = Some(data[start..end].to_vec());
                    operations.push(op);
                },
            }
            input = rest;
            continue;
        }

        let (rest, operand) = operand(input).map_err(|_| {
            fail(format!("unreadable operand starting with {:?}", input[0] as char))
        })?;
        op_start.get_or_insert(offset);
        operands.push(operand);
        input = rest;
    }

    if !operands.is_empty() {
        return Err(Error::ContentParse {
            page,
            offset: data.len(),
            reason: format!("{} operands without an operator at end of stream", operands.len()),
        });
    }

    Ok(operations)
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0')
}

fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

fn starts_number(input: &[u8]) -> bool {
    matches!(input[0], b'0'..=b'9' | b'+' | b'-' | b'.')
}

/// Skip whitespace and `%` comments.
fn skip_whitespace(mut input: &[u8]) -> &[u8] {
    loop {
        let start = input.len();
        while let [b, rest @ ..] = input {
            if !is_whitespace(*b) {
                break;
            }
            input = rest;
        }
        if let [b'%', rest @ ..] = input {
            let end = rest.iter().position(|&b| b == b'\n' || b == b'\r').unwrap_or(rest.len());
            input = &rest[end..];
        }
        if input.len() == start {
            return input;
        }
    }
}

fn error<T>(input: &[u8], kind: ErrorKind) -> ParseResult<'_, T> {
    Err(nom::Err::Error(nom::error::Error::from_error_kind(input, kind)))
}

fn keyword(input: &[u8]) -> ParseResult<'_, &[u8]> {
    take_while1(is_regular)(input)
}

fn operand(input: &[u8]) -> ParseResult<'_, Object> {
    match input.first() {
        Some(b'/') => name(input),
        Some(b'(') => literal_string(input),
        Some(b'<') if input.get(1) == Some(&b'<') => dictionary(input),
        Some(b'<') => hex_string(input),
        Some(b'[') => array(input),
        Some(b) if b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.') => number(input),
        _ => error(input, ErrorKind::Alt),
    }
}

fn number(input: &[u8]) -> ParseResult<'_, Object> {
    let (rest, digits) =
        take_while1(|c: u8| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.'))(input)?;
    let text = std::str::from_utf8(digits).unwrap_or("");
    if digits.contains(&b'.') {
        // "-.5" and "4." are valid PDF reals
        let normalized = if text.ends_with('.') { format!("{}0", text) } else { text.to_string() };
        match normalized.parse::<f64>() {
            Ok(v) => Ok((rest, Object::Real(v))),
            Err(_) => error(input, ErrorKind::Float),
        }
    } else {
        match text.parse::<i64>() {
            Ok(v) => Ok((rest, Object::Integer(v))),
            Err(_) => error(input, ErrorKind::Digit),
        }
    }
}

fn name(input: &[u8]) -> ParseResult<'_, Object> {
    let (rest, _) = tag("/")(input)?;
    let (rest, raw) = take_while(is_regular)(rest)?;

    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                bytes.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }
    Ok((rest, Object::Name(String::from_utf8_lossy(&bytes).into_owned())))
}

/// `( ... )` with balanced parentheses and backslash escapes.
fn literal_string(input: &[u8]) -> ParseResult<'_, Object> {
    let (body, _) = tag("(")(input)?;
    let mut depth = 1usize;
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let decoded = decode_literal_escapes(&body[..i]);
                    return Ok((&body[i + 1..], Object::String(decoded)));
                }
            },
            _ => {},
        }
        i += 1;
    }
    error(input, ErrorKind::Eof)
}

/// Decode `\n`, `\(`, `\ddd`, line continuations and friends.
fn decode_literal_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        let c = raw[i + 1];
        i += 2;
        match c {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(8),
            b'f' => out.push(12),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut value = (c - b'0') as u32;
                let mut digits = 1;
                while digits < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            i += 1;
                            digits += 1;
                        },
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            },
            // \( \) \\ and unknown escapes keep the escaped byte
            other => out.push(other),
        }
    }
    out
}

fn hex_string(input: &[u8]) -> ParseResult<'_, Object> {
    let (rest, _) = tag("<")(input)?;
    let (rest, hex) = take_till(|c| c == b'>')(rest)?;
    let (rest, _) = tag(">")(rest)?;

    let digits: Vec<u8> = hex.iter().copied().filter(|c| !is_whitespace(*c)).collect();
    let mut bytes = Vec::with_capacity(digits.len() / 2 + 1);
    for pair in digits.chunks(2) {
        let hi = hex_value(pair[0]);
        let lo = pair.get(1).map_or(Some(0), |&c| hex_value(c));
        match (hi, lo) {
            (Some(hi), Some(lo)) => bytes.push(hi << 4 | lo),
            _ => return error(input, ErrorKind::HexDigit),
        }
    }
    Ok((rest, Object::String(bytes)))
}

fn hex_value(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

fn array(input: &[u8]) -> ParseResult<'_, Object> {
    let (mut rest, _) = tag("[")(input)?;
    let mut items = Vec::new();
    loop {
        rest = skip_whitespace(rest);
        match rest.first() {
            Some(b']') => return Ok((&rest[1..], Object::Array(items))),
            None => return error(rest, ErrorKind::Eof),
            _ => {
                let (next, item) = array_item(rest)?;
                items.push(item);
                rest = next;
            },
        }
    }
}

fn array_item(input: &[u8]) -> ParseResult<'_, Object> {
    match keyword(input) {
        Ok((rest, b"true")) => Ok((rest, Object::Boolean(true))),
        Ok((rest, b"false")) => Ok((rest, Object::Boolean(false))),
        Ok((rest, b"null")) => Ok((rest, Object::Null)),
        _ => operand(input),
    }
}

fn dictionary(input: &[u8]) -> ParseResult<'_, Object> {
    let (mut rest, _) = tag("<<")(input)?;
    let mut dict = Dictionary::new();
    loop {
        rest = skip_whitespace(rest);
        if rest.starts_with(b">>") {
            return Ok((&rest[2..], Object::Dictionary(dict)));
        }
        if rest.is_empty() {
            return error(rest, ErrorKind::Eof);
        }
        let (next, key) = name(rest)?;
        let next = skip_whitespace(next);
        let (next, value) = array_item(next)?;
        if let Object::Name(key) = key {
            dict.insert(key, value);
        }
        rest = next;
    }
}

/// `BI <key value>* ID <data> EI`, entered just after `BI`.
///
/// Exactly one whitespace byte separates `ID` from the data; `EI` must be
/// preceded by whitespace and followed by whitespace, a delimiter or the end.
fn inline_image(input: &[u8]) -> ParseResult<'_, Operation> {
    let mut rest = input;
    let mut operands = Vec::new();
    loop {
        rest = skip_whitespace(rest);
        if rest.starts_with(b"ID") && rest.get(2).is_some_and(|&c| is_whitespace(c)) {
            rest = &rest[3..];
            break;
        }
        if rest.is_empty() {
            return error(rest, ErrorKind::Eof);
        }
        let (next, key) = name(rest)?;
        let next = skip_whitespace(next);
        let (next, value) = array_item(next)?;
        operands.push(key);
        operands.push(value);
        rest = next;
    }

    let end = (0..rest.len().saturating_sub(2)).find(|&i| {
        is_whitespace(rest[i])
            && &rest[i + 1..i + 3] == b"EI"
            && rest.get(i + 3).map_or(true, |&c| is_whitespace(c) || is_delimiter(c))
    });
    match end {
        Some(i) => {
            let mut op = Operation::new("BI", operands);
            op.inline_data = Some(rest[..i].to_vec());
            Ok((&rest[i + 3..], op))
        },
        None => error(rest, ErrorKind::Tag),
    }
}
