//! Streaming reader for `mysqldump --xml` exports.
//!
//! Only `<table_data>` blocks are read; `<table_structure>` and everything else is skipped.
//! Rows come out in document order, tagged with the table they belong to.

use crate::config::PROGRESS_INTERVAL;
use crate::error::{Result, WikiRestoreError};
use crate::models::RawRow;
use bzip2::read::BzDecoder;
use indicatif::ProgressBar;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug, info};

/// Parsed dump: table name to rows, tables in first-seen order.
#[derive(Debug, Default)]
pub struct Dump {
    tables: Vec<(String, Vec<RawRow>)>,
}

impl Dump {
    pub fn push(&mut self, table: &str, row: RawRow) {
        match self.tables.iter_mut().find(|(name, _)| name == table) {
            Some((_, rows)) => rows.push(row),
            None => self.tables.push((table.to_string(), vec![row])),
        }
    }

    pub fn table(&self, name: &str) -> Option<&[RawRow]> {
        self.tables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rows)| rows.as_slice())
    }

    /// Removes a table's rows from the dump, leaving nothing behind.
    pub fn take(&mut self, name: &str) -> Vec<RawRow> {
        match self.tables.iter().position(|(n, _)| n == name) {
            Some(pos) => self.tables.remove(pos).1,
            None => Vec::new(),
        }
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(n, _)| n.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows.len()).sum()
    }
}

struct OpenField {
    name: String,
    nil: bool,
    value: String,
}

pub struct DumpReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    table: Option<String>,
    row: Option<RawRow>,
    field: Option<OpenField>,
}

impl DumpReader<Box<dyn BufRead>> {
    /// Opens a dump file; paths ending in `.bz2` are decompressed while reading.
    pub fn open(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        let inner: Box<dyn BufRead> = if path.ends_with(".bz2") {
            Box::new(BufReader::new(BzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::from_reader(inner))
    }
}

impl<R: BufRead> DumpReader<R> {
    pub fn from_reader(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::new(),
            table: None,
            row: None,
            field: None,
        }
    }

    /// Next complete row and the name of its table, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<(String, RawRow)>> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"table_data" => {
                        let name = attribute(&e, b"name")?.ok_or_else(|| {
                            WikiRestoreError::Dump("table_data without a name".to_string())
                        })?;
                        debug!(table = %name, "Reading table data");
                        self.table = Some(name);
                    }
                    b"row" if self.table.is_some() => {
                        self.row = Some(RawRow::new());
                    }
                    b"field" if self.row.is_some() => {
                        self.field = Some(OpenField {
                            name: field_name(&e)?,
                            nil: is_nil(&e)?,
                            value: String::new(),
                        });
                    }
                    _ => {}
                },
                Event::Empty(e) => {
                    if e.name().as_ref() == b"field" {
                        if let Some(row) = self.row.as_mut() {
                            let value = if is_nil(&e)? { None } else { Some(String::new()) };
                            row.push(field_name(&e)?, value);
                        }
                    }
                }
                Event::Text(e) => {
                    if let Some(field) = self.field.as_mut() {
                        field.value.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(field) = self.field.as_mut() {
                        field.value.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"field" => {
                        if let (Some(field), Some(row)) = (self.field.take(), self.row.as_mut()) {
                            let value = if field.nil { None } else { Some(field.value) };
                            row.push(field.name, value);
                        }
                    }
                    b"row" => {
                        if let (Some(row), Some(table)) = (self.row.take(), self.table.as_ref()) {
                            return Ok(Some((table.clone(), row)));
                        }
                    }
                    b"table_data" => {
                        self.table = None;
                    }
                    _ => {}
                },
                Event::Eof => {
                    if self.row.is_some() {
                        return Err(WikiRestoreError::Dump(format!(
                            "input ended inside a row at byte {}",
                            self.reader.buffer_position()
                        )));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    /// Reads every remaining row into a [`Dump`].
    pub fn read_all(mut self) -> Result<Dump> {
        let mut dump = Dump::default();
        let pb = ProgressBar::new_spinner();
        let mut seen: u64 = 0;

        while let Some((table, row)) = self.next_row()? {
            dump.push(&table, row);
            seen += 1;
            if seen % PROGRESS_INTERVAL == 0 {
                pb.set_message(format!("{} rows", seen));
                pb.tick();
            }
        }

        pb.finish_and_clear();
        Ok(dump)
    }
}

pub fn read_dump(path: &str) -> Result<Dump> {
    info!("Reading dump from: {}", path);
    let dump = DumpReader::open(path)?.read_all()?;
    info!(
        tables = dump.tables.len(),
        rows = dump.row_count(),
        "Dump read successfully"
    );
    Ok(dump)
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn field_name(e: &BytesStart<'_>) -> Result<String> {
    attribute(e, b"name")?
        .ok_or_else(|| WikiRestoreError::Dump("field without a name".to_string()))
}

fn is_nil(e: &BytesStart<'_>) -> Result<bool> {
    Ok(attribute(e, b"xsi:nil")?.as_deref() == Some("true"))
}
