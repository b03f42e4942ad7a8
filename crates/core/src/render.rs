//! View models produced by page controllers.
//!
//! Pages never build markup. They fill tables and detail views that a front end (the CLI
//! here) renders. A table body is one of rows, an empty-state message or a failure, so an
//! empty result and a failed fetch can never look the same.

use crate::error::UserSignal;
use crate::record::Record;
use std::fmt;

/// Colour family of a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Danger,
    Info,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub tone: Tone,
}

impl Badge {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Badge(Badge),
    /// Text drawn with emphasis (alert quantities).
    Emphasis(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// The field's text, or `-` when it is missing.
    pub fn field(record: &Record, field: &str) -> Self {
        Cell::Text(record.display(field))
    }

    pub fn as_text(&self) -> &str {
        match self {
            Cell::Text(text) | Cell::Emphasis(text) => text,
            Cell::Badge(badge) => &badge.text,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Badge(badge) => write!(f, "[{}]", badge.text),
            Cell::Emphasis(text) => write!(f, "*{text}*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    Rows(Vec<Vec<Cell>>),
    /// The fetch succeeded with nothing to show.
    Empty(String),
    /// The fetch failed; the signal is shown in place of the rows.
    Failed(UserSignal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub body: TableBody,
}

impl TableView {
    /// Builds a table from records; no records gives the empty-state message.
    pub fn from_records<F>(columns: &[&str], records: &[Record], empty: &str, row: F) -> Self
    where
        F: Fn(&Record) -> Vec<Cell>,
    {
        let body = if records.is_empty() {
            TableBody::Empty(empty.to_owned())
        } else {
            TableBody::Rows(records.iter().map(row).collect())
        };
        Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            body,
        }
    }

    pub fn failed(columns: &[&str], signal: UserSignal) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            body: TableBody::Failed(signal),
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        match &self.body {
            TableBody::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn failure(&self) -> Option<&UserSignal> {
        match &self.body {
            TableBody::Failed(signal) => Some(signal),
            _ => None,
        }
    }
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        match &self.body {
            TableBody::Rows(rows) => {
                for row in rows {
                    let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
                    writeln!(f, "{}", cells.join(" | "))?;
                }
                Ok(())
            }
            TableBody::Empty(message) => writeln!(f, "({message})"),
            TableBody::Failed(signal) => writeln!(f, "error: {signal}"),
        }
    }
}

/// A labelled set of fields plus any related tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailView {
    pub title: String,
    pub fields: Vec<(String, String)>,
    pub tables: Vec<(String, TableView)>,
}

impl DetailView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, label: &str, value: impl Into<String>) -> Self {
        self.fields.push((label.to_owned(), value.into()));
        self
    }

    pub fn table(mut self, caption: &str, table: TableView) -> Self {
        self.tables.push((caption.to_owned(), table));
        self
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for DetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for (label, value) in &self.fields {
            writeln!(f, "  {label}: {value}")?;
        }
        for (caption, table) in &self.tables {
            writeln!(f)?;
            writeln!(f, "{caption}")?;
            write!(f, "{table}")?;
        }
        Ok(())
    }
}
