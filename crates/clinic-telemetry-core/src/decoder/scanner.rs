//! Byte-level scanning of record text.
//!
//! Record text looks like `Name{key='quoted', key=[a, b], key=bare}`. All
//! structural characters are ASCII, so scanning works on bytes and every
//! slice boundary lands on a char boundary.

use super::DecodeIssue;

/// A decoded field value before type coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldValue {
    /// Bare `null`
    Null,
    Scalar(String),
    List(Vec<String>),
}

/// One `key=value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field<'a> {
    pub key: &'a str,
    pub value: FieldValue,
    /// The value exactly as it appeared, for nested records.
    pub text: &'a str,
}

/// A record located in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordSpan<'a> {
    /// Text between the outer braces.
    pub body: &'a str,
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_quote(b: u8) -> bool {
    b == b'\'' || b == b'"'
}

/// A quote only opens a string in value position.
fn opens_quote(bytes: &[u8], index: usize) -> bool {
    match bytes[..index].iter().rev().find(|b| !b.is_ascii_whitespace()) {
        None => true,
        Some(prev) => matches!(prev, b'=' | b'[' | b','),
    }
}

/// Index of the closing quote matching the one at `open`.
fn skip_quoted(bytes: &[u8], open: usize) -> Option<usize> {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `}` closing the `{` at `open`, ignoring quoted text.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) && opens_quote(bytes, i) {
            i = skip_quoted(bytes, i)?;
        } else if b == b'{' {
            depth += 1;
        } else if b == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Find every top-level `name{...}` record in `text`.
///
/// Records whose braces never balance are skipped and reported.
pub(crate) fn find_records<'a>(
    text: &'a str,
    name: &str,
    issues: &mut Vec<DecodeIssue>,
) -> Vec<RecordSpan<'a>> {
    let bytes = text.as_bytes();
    let token = format!("{name}{{");
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(found) = text[from..].find(&token) {
        let start = from + found;
        let open = start + token.len() - 1;

        if start > 0 && is_ident(bytes[start - 1]) {
            from = start + token.len();
            continue;
        }

        match matching_brace(bytes, open) {
            Some(close) => {
                spans.push(RecordSpan {
                    body: &text[open + 1..close],
                });
                from = close + 1;
            }
            None => {
                issues.push(DecodeIssue::UnbalancedRecord {
                    record: name.to_string(),
                    offset: start,
                });
                from = open + 1;
            }
        }
    }

    spans
}

/// Split on commas outside quotes, braces and brackets.
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) && opens_quote(bytes, i) {
            match skip_quoted(bytes, i) {
                Some(close) => i = close,
                // Unterminated: the rest is one part.
                None => break,
            }
        } else {
            match b {
                b'{' | b'[' => depth += 1,
                b'}' | b']' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    parts.push(&text[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

/// Remove surrounding quotes and backslash escapes.
///
/// Text that is not a complete quoted string is returned trimmed.
pub(crate) fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    let bytes = trimmed.as_bytes();
    if bytes.is_empty() || !is_quote(bytes[0]) {
        return trimmed.to_string();
    }

    let Some(close) = skip_quoted(bytes, 0) else {
        return trimmed.to_string();
    };

    let mut out = String::with_capacity(close);
    let mut chars = trimmed[1..close].chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_value(text: &str) -> FieldValue {
    let text = text.trim();
    if text == "null" {
        return FieldValue::Null;
    }

    let bytes = text.as_bytes();
    if bytes.first() == Some(&b'[') {
        let inner = match matching_bracket(bytes) {
            Some(close) => &text[1..close],
            None => &text[1..],
        };
        let items = split_top_level(inner)
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(unquote)
            .collect();
        return FieldValue::List(items);
    }

    FieldValue::Scalar(unquote(text))
}

fn matching_bracket(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) && opens_quote(bytes, i) {
            i = skip_quoted(bytes, i)?;
        } else if b == b'[' {
            depth += 1;
        } else if b == b']' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Parse a record body into its fields, in order.
pub(crate) fn parse_fields<'a>(
    record: &str,
    body: &'a str,
    issues: &mut Vec<DecodeIssue>,
) -> Vec<Field<'a>> {
    let mut fields = Vec::new();

    for part in split_top_level(body) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let parsed = part.split_once('=').and_then(|(key, value)| {
            let key = key.trim();
            let valid = !key.is_empty() && key.bytes().all(is_ident);
            valid.then_some((key, value.trim()))
        });

        match parsed {
            Some((key, text)) => fields.push(Field {
                key,
                value: parse_value(text),
                text,
            }),
            None => issues.push(DecodeIssue::MalformedField {
                record: record.to_string(),
                text: part.to_string(),
            }),
        }
    }

    fields
}

/// Split `Name{body}` into its name and body, if `text` is exactly one record.
pub(crate) fn as_record(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let open = text.find('{')?;
    let name = &text[..open];
    if name.is_empty() || !name.bytes().all(is_ident) {
        return None;
    }
    let close = matching_brace(text.as_bytes(), open)?;
    (close == text.len() - 1).then(|| (name, &text[open + 1..close]))
}
