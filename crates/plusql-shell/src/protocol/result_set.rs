//! Result set reconstruction from SQL*Plus HTML output.
//!
//! The shell prints each page of a result as a `<table>` whose `<tr>` rows
//! hold either `<th>` header cells or `<td>` data cells. A data cell the shell
//! right-aligns is a number.
//!
//! Parsing never fails. Output without a header row yields no rows, and a
//! data row shorter or longer than the header is zipped positionally and
//! truncated to the shorter of the two.

use std::sync::Arc;

use plusql_core::{ColumnInfo, Row, Value};

use super::reader::{MarkupReader, Token};

/// Which kind of cells a buffered row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// `<th>` cells
    Header,
    /// `<td>` cells
    Data,
}

impl CellKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "TH" => Some(CellKind::Header),
            "TD" => Some(CellKind::Data),
            _ => None,
        }
    }
}

/// The most recently seen tag, uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LastTag {
    #[default]
    None,
    Open(String),
    Close(String),
}

/// Cells collected for one `<tr>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBuffer {
    pub kind: Option<CellKind>,
    pub cells: Vec<Value>,
}

/// Scan state carried through one parse.
#[derive(Debug, Default)]
pub struct MarkupState {
    last_tag: LastTag,
    last_attrs: Vec<(String, String)>,
    in_table: bool,
    pending: RowBuffer,
    completed: Vec<RowBuffer>,
}

impl MarkupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a markup document, accumulating completed rows.
    pub fn feed(&mut self, markup: &str) {
        for token in MarkupReader::new(markup) {
            match token {
                Token::Start {
                    name,
                    attrs,
                    self_closing,
                } => {
                    self.start_tag(&name, attrs);
                    if self_closing {
                        self.end_tag(&name);
                    }
                }
                Token::End { name } => self.end_tag(&name),
                Token::Text(text) => self.text(&text),
            }
        }
    }

    pub fn start_tag(&mut self, name: &str, attrs: Vec<(String, String)>) {
        let tag = name.to_ascii_uppercase();
        if tag == "TABLE" {
            self.in_table = true;
        }
        self.last_attrs = attrs;
        self.last_tag = LastTag::Open(tag);
    }

    pub fn end_tag(&mut self, name: &str) {
        let tag = name.to_ascii_uppercase();
        if tag == "TABLE" {
            self.in_table = false;
        }
        if tag == "TR" && self.pending.kind.is_some() {
            self.completed.push(std::mem::take(&mut self.pending));
        }
        self.last_tag = LastTag::Close(tag);
    }

    pub fn text(&mut self, text: &str) {
        if !self.in_table {
            return;
        }
        let LastTag::Open(tag) = &self.last_tag else {
            return;
        };
        let Some(kind) = CellKind::from_tag(tag) else {
            return;
        };

        let value = if self.is_right_aligned() {
            numeric_cell(text)
        } else {
            Value::Text(text.trim().to_string())
        };
        self.pending.kind = Some(kind);
        self.pending.cells.push(value);
    }

    fn is_right_aligned(&self) -> bool {
        self.last_attrs
            .iter()
            .any(|(name, value)| name == "align" && value.eq_ignore_ascii_case("right"))
    }

    pub fn in_table(&self) -> bool {
        self.in_table
    }

    pub fn last_tag(&self) -> &LastTag {
        &self.last_tag
    }

    /// The row currently being collected.
    pub fn pending(&self) -> &RowBuffer {
        &self.pending
    }

    /// Rows closed so far, header and data alike.
    pub fn completed(&self) -> &[RowBuffer] {
        &self.completed
    }

    /// Zip data rows against the first header row.
    ///
    /// A pending row never closed by `</tr>` is dropped.
    pub fn finish(self) -> Vec<Row> {
        let Some(header) = self
            .completed
            .iter()
            .find(|row| row.kind == Some(CellKind::Header))
        else {
            return Vec::new();
        };
        let names: Vec<String> = header.cells.iter().map(header_name).collect();

        let columns = ColumnInfo::new(names.iter().cloned());
        let shared = (columns.len() == names.len()).then(|| Arc::new(columns));

        self.completed
            .into_iter()
            .filter(|row| row.kind == Some(CellKind::Data))
            .map(|row| match &shared {
                Some(columns) => Row::with_columns(Arc::clone(columns), row.cells),
                None => Row::from_pairs(names.iter().cloned().zip(row.cells)),
            })
            .collect()
    }
}

/// Parse a right-aligned cell as a number.
///
/// Blank renders NULL. Text that is not a number (a NUMFORMAT with group
/// separators, for instance) is kept trimmed.
fn numeric_cell(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    trimmed
        .parse::<f64>()
        .map_or_else(|_| Value::Text(trimmed.to_string()), Value::Double)
}

fn header_name(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse SQL*Plus HTML output into rows.
pub fn parse(markup: &str) -> Vec<Row> {
    let mut state = MarkupState::new();
    state.feed(markup);
    state.finish()
}
