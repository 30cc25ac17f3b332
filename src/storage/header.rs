use nom::{
    IResult, Parser,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, space0},
    combinator::rest,
    multi::separated_list0,
    sequence::{delimited, preceded, terminated},
};
use crate::core::error::{Error, ErrorKind, Result};

pub const HEADER_BEGIN: &str = "---";
pub const HEADER_END: &str = "...";

/// Give up looking for the end marker after this many lines.
const MAX_HEADER_LINES: usize = 1000;

/// Location of the metadata block at the top of a dictionary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderScan {
    /// Byte offset where data lines start
    pub end: usize,
    pub text: String,
}

/// Fields of the metadata block that matter to the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub import_tables: Vec<String>,
}

/// Find the metadata block.
///
/// The block ends at a `...` line. Without one, the whole scanned region is
/// metadata only if it declares `name:`; otherwise the file has no header.
pub fn scan_header(raw: &[u8]) -> Option<HeaderScan> {
    let mut size = 0;
    let mut has_name = false;

    for (lines, line) in raw.split_inclusive(|b| *b == b'\n').enumerate() {
        size += line.len();
        let trimmed = String::from_utf8_lossy(line);
        let trimmed = trimmed.trim();
        if trimmed.starts_with("name:") {
            has_name = true;
        }
        if trimmed == HEADER_END {
            return Some(HeaderScan {
                end: size,
                text: String::from_utf8_lossy(&raw[..size]).into_owned(),
            });
        }
        if lines + 1 > MAX_HEADER_LINES {
            break;
        }
    }

    has_name.then(|| HeaderScan {
        end: size,
        text: String::from_utf8_lossy(&raw[..size]).into_owned(),
    })
}

fn key(input: &str) -> IResult<&str, &str> {
    terminated(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.'),
        (space0, char(':')),
    ).parse(input)
}

fn list_item(input: &str) -> IResult<&str, &str> {
    preceded((space0, char('-'), space0), rest).parse(input)
}

fn flow_list(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        (char('['), space0),
        separated_list0((space0, char(','), space0), take_till(|c: char| c == ',' || c == ']')),
        (space0, char(']')),
    ).parse(input)
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && (i == 0 || bytes[i - 1] == b' ' || bytes[i - 1] == b'\t') {
            return &line[..i];
        }
    }
    line
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

impl Metadata {
    fn push(&mut self, key: &str, item: &str) {
        let item = unquote(item);
        if item.is_empty() {
            return;
        }
        match key {
            "columns" => self.columns.push(item.to_string()),
            "import_tables" => self.import_tables.push(item.to_string()),
            _ => {}
        }
    }
}

/// Parse the metadata block.
///
/// Only the subset dictionary headers use is understood: top-level
/// `key: value` pairs, block lists (`- item`) and flow lists (`[a, b]`).
/// Indented mappings are skipped.
pub fn parse_metadata(text: &str) -> Result<Metadata> {
    let mut meta = Metadata::default();
    // top-level key whose block list we are inside of
    let mut current: Option<String> = None;

    for (lineno, line) in text.lines().enumerate() {
        let line = strip_comment(line);
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == HEADER_BEGIN || trimmed == HEADER_END {
            continue;
        }
        let indented = line.starts_with(' ') || line.starts_with('\t');

        if let Ok((_, item)) = list_item(line) {
            if let Some(key) = &current {
                meta.push(key, item);
            }
            continue;
        }

        match key(trimmed) {
            Ok(_) if indented => current = None,
            Ok((value, name)) => {
                let value = value.trim();
                current = None;
                if value.is_empty() {
                    current = Some(name.to_string());
                } else if value.starts_with('[') {
                    let (_, items) = flow_list(value).map_err(|e| {
                        Error::new(ErrorKind::Parse, format!("line {}: bad list for {}: {}", lineno + 1, name, e))
                    })?;
                    for item in items {
                        meta.push(name, item);
                    }
                } else if name == "name" {
                    meta.name = Some(unquote(value).to_string());
                }
            }
            Err(_) if indented => {}
            Err(_) => {
                return Err(Error::new(
                    ErrorKind::Parse,
                    format!("line {}: unexpected metadata line {:?}", lineno + 1, trimmed),
                ));
            }
        }
    }

    Ok(meta)
}
