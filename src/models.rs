use crate::error::WikiRestoreError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The tables the restore consumes. Anything else is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Page,
    Revision,
    Text,
    Category,
    CategoryLinks,
    PageLinks,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Page,
        Table::Revision,
        Table::Text,
        Table::Category,
        Table::CategoryLinks,
        Table::PageLinks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Page => "page",
            Table::Revision => "revision",
            Table::Text => "text",
            Table::Category => "category",
            Table::CategoryLinks => "categorylinks",
            Table::PageLinks => "pagelinks",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = WikiRestoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| WikiRestoreError::Configuration {
                table: s.to_string(),
            })
    }
}

/// One dump row: field name to value, in column order. `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, Option<String>)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.push((name.into(), value));
    }

    /// Value of a field, or `None` when the field is missing or NULL.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Option<&'a str>)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (&'a str, Option<&'a str>)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("missing required field '{0}'")]
    Missing(&'static str),
    #[error("field '{field}' has non-numeric value '{value}'")]
    NotNumeric { field: &'static str, value: String },
}

fn required_str(row: &RawRow, field: &'static str) -> Result<String, RowError> {
    row.get(field)
        .map(str::to_string)
        .ok_or(RowError::Missing(field))
}

fn optional_id(row: &RawRow, field: &'static str) -> Result<Option<u64>, RowError> {
    match row.get(field) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RowError::NotNumeric {
                field,
                value: raw.to_string(),
            }),
    }
}

fn required_id(row: &RawRow, field: &'static str) -> Result<u64, RowError> {
    optional_id(row, field)?.ok_or(RowError::Missing(field))
}

/// A typed row of one of the consumed tables.
pub trait Entity: Sized {
    const TABLE: Table;
    /// Columns mapped onto struct fields; every other column goes to the extras side table.
    const FIELDS: &'static [&'static str];

    fn from_row(row: &RawRow) -> Result<Self, RowError>;

    /// Primary key used to address extras. Edge tables have none and fall back to row position.
    fn key(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page_id: u64,
    pub page_title: String,
    pub page_latest: Option<u64>,
}

impl Entity for Page {
    const TABLE: Table = Table::Page;
    const FIELDS: &'static [&'static str] = &["page_id", "page_title", "page_latest"];

    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            page_id: required_id(row, "page_id")?,
            page_title: required_str(row, "page_title")?,
            page_latest: optional_id(row, "page_latest")?,
        })
    }

    fn key(&self) -> Option<String> {
        Some(self.page_id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub rev_id: u64,
    pub rev_text_id: Option<u64>,
}

impl Entity for Revision {
    const TABLE: Table = Table::Revision;
    const FIELDS: &'static [&'static str] = &["rev_id", "rev_text_id"];

    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            rev_id: required_id(row, "rev_id")?,
            rev_text_id: optional_id(row, "rev_text_id")?,
        })
    }

    fn key(&self) -> Option<String> {
        Some(self.rev_id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub old_id: u64,
    pub old_text: Option<String>,
}

impl Entity for Text {
    const TABLE: Table = Table::Text;
    const FIELDS: &'static [&'static str] = &["old_id", "old_text"];

    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            old_id: required_id(row, "old_id")?,
            old_text: row.get("old_text").map(str::to_string),
        })
    }

    fn key(&self) -> Option<String> {
        Some(self.old_id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub cat_id: Option<u64>,
    pub cat_title: String,
}

impl Entity for Category {
    const TABLE: Table = Table::Category;
    const FIELDS: &'static [&'static str] = &["cat_id", "cat_title"];

    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            cat_id: optional_id(row, "cat_id")?,
            cat_title: required_str(row, "cat_title")?,
        })
    }

    fn key(&self) -> Option<String> {
        Some(self.cat_title.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLink {
    pub cl_from: u64,
    pub cl_to: String,
}

impl Entity for CategoryLink {
    const TABLE: Table = Table::CategoryLinks;
    const FIELDS: &'static [&'static str] = &["cl_from", "cl_to"];

    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            cl_from: required_id(row, "cl_from")?,
            cl_to: required_str(row, "cl_to")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub pl_from: u64,
    pub pl_title: String,
}

impl Entity for PageLink {
    const TABLE: Table = Table::PageLinks;
    const FIELDS: &'static [&'static str] = &["pl_from", "pl_title"];

    fn from_row(row: &RawRow) -> Result<Self, RowError> {
        Ok(Self {
            pl_from: required_id(row, "pl_from")?,
            pl_title: required_str(row, "pl_title")?,
        })
    }
}
