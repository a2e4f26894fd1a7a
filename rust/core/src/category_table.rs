// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model identifier to semantic category table
//!
//! The table is a CSV file whose header names an `id` and a `category`
//! column. Other columns are ignored, unquoted fields are trimmed of spaces
//! and quoted fields use `""` to escape a quote.

use std::borrow::Cow;
use std::path::Path;

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, space0},
    combinator::{cut, map},
    multi::separated_list0,
    sequence::{delimited, preceded},
    IResult,
};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Lookup table from model identifier to category
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    entries: FxHashMap<String, String>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a table from a CSV file
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text)
    }

    /// Parse a table from CSV text
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let (header_no, header) = lines.next().ok_or(Error::MissingColumn("id"))?;
        let columns = parse_record(header, header_no)?;
        let id_col = column_index(&columns, "id")?;
        let category_col = column_index(&columns, "category")?;

        let mut table = Self::new();
        for (line_no, line) in lines {
            let fields = parse_record(line, line_no)?;
            let (Some(id), Some(category)) = (fields.get(id_col), fields.get(category_col))
            else {
                return Err(Error::csv(line_no, "too few columns"));
            };
            table.insert(id.to_string(), category.to_string());
        }

        Ok(table)
    }

    /// Insert or replace a mapping; later rows win over earlier ones
    pub fn insert(&mut self, id: String, category: String) {
        self.entries.insert(id, category);
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CategoryTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn column_index(columns: &[Cow<'_, str>], name: &'static str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or(Error::MissingColumn(name))
}

fn parse_record(line: &str, line_no: usize) -> Result<Vec<Cow<'_, str>>> {
    match record(line) {
        Ok(("", fields)) => Ok(fields),
        Ok((rest, _)) => Err(Error::csv(line_no, format!("unexpected text '{rest}'"))),
        Err(_) => Err(Error::csv(line_no, "unterminated quoted field")),
    }
}

/// Parse a comma-separated record
fn record(input: &str) -> IResult<&str, Vec<Cow<'_, str>>> {
    separated_list0(char(','), field)(input)
}

/// Parse one field with optional surrounding spaces
fn field(input: &str) -> IResult<&str, Cow<'_, str>> {
    delimited(space0, alt((quoted, unquoted)), space0)(input)
}

fn unquoted(input: &str) -> IResult<&str, Cow<'_, str>> {
    map(take_while(|c: char| c != ','), |s: &str| {
        Cow::Borrowed(s.trim_end_matches(' '))
    })(input)
}

/// Quoted field: "text" with "" standing for a literal quote
fn quoted(input: &str) -> IResult<&str, Cow<'_, str>> {
    map(preceded(char('"'), cut(quoted_body)), |body: &str| {
        if body.contains("\"\"") {
            Cow::Owned(body.replace("\"\"", "\""))
        } else {
            Cow::Borrowed(body)
        }
    })(input)
}

/// Body of a quoted field up to and including the closing quote
fn quoted_body(input: &str) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'"' {
                i += 2;
                continue;
            }
            return Ok((&input[i + 1..], &input[..i]));
        }
        i += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}
