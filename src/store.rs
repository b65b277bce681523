use crate::error::Result;
use crate::filter::{ContentFilter, Verdict};
use crate::models::{Category, CategoryLink, Entity, Page, PageLink, RawRow, Revision, Table, Text};
use crate::parser::Dump;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Row counts from loading one table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub admitted: u64,
    pub blacklisted: u64,
    pub malformed: u64,
}

type ExtraFields = Vec<(String, Option<String>)>;

/// Filtered, typed rows for the consumed tables, in input order.
pub struct RecordStore {
    filter: ContentFilter,
    pages: Vec<Page>,
    revisions: Vec<Revision>,
    texts: Vec<Text>,
    categories: Vec<Category>,
    category_links: Vec<CategoryLink>,
    page_links: Vec<PageLink>,
    extras: FxHashMap<(Table, String), ExtraFields>,
}

/// Ties an entity type to its column in the store.
pub trait Stored: Entity + Send {
    fn rows(store: &RecordStore) -> &Vec<Self>;
    fn rows_mut(store: &mut RecordStore) -> &mut Vec<Self>;
}

macro_rules! stored {
    ($ty:ty, $field:ident) => {
        impl Stored for $ty {
            fn rows(store: &RecordStore) -> &Vec<Self> {
                &store.$field
            }
            fn rows_mut(store: &mut RecordStore) -> &mut Vec<Self> {
                &mut store.$field
            }
        }
    };
}

stored!(Page, pages);
stored!(Revision, revisions);
stored!(Text, texts);
stored!(Category, categories);
stored!(CategoryLink, category_links);
stored!(PageLink, page_links);

impl RecordStore {
    pub fn new(filter: ContentFilter) -> Self {
        Self {
            filter,
            pages: Vec::new(),
            revisions: Vec::new(),
            texts: Vec::new(),
            categories: Vec::new(),
            category_links: Vec::new(),
            page_links: Vec::new(),
            extras: FxHashMap::default(),
        }
    }

    /// Admits rows into a table. The name is validated before any row is looked at.
    pub fn load(&mut self, table_name: &str, rows: Vec<RawRow>) -> Result<LoadReport> {
        let table: Table = table_name.parse()?;
        let report = match table {
            Table::Page => self.admit::<Page>(rows),
            Table::Revision => self.admit::<Revision>(rows),
            Table::Text => self.admit::<Text>(rows),
            Table::Category => self.admit::<Category>(rows),
            Table::CategoryLinks => self.admit::<CategoryLink>(rows),
            Table::PageLinks => self.admit::<PageLink>(rows),
        };
        info!(
            table = %table,
            admitted = report.admitted,
            blacklisted = report.blacklisted,
            malformed = report.malformed,
            "Table loaded"
        );
        Ok(report)
    }

    /// Loads every consumed table out of a dump. Missing tables load empty; others are left in place.
    pub fn load_dump(&mut self, dump: &mut Dump) -> Result<BTreeMap<Table, LoadReport>> {
        let mut reports = BTreeMap::new();
        for table in Table::ALL {
            let rows = dump.take(table.name());
            let report = self.load(table.name(), rows)?;
            reports.insert(table, report);
        }
        for name in dump.table_names() {
            debug!(table = name, "Ignoring table not used for the restore");
        }
        Ok(reports)
    }

    fn admit<T: Stored>(&mut self, rows: Vec<RawRow>) -> LoadReport {
        let filter = &self.filter;
        let verdicts: Vec<Verdict> = rows
            .par_iter()
            .map(|row| filter.verdict(T::TABLE, row))
            .collect();

        let mut report = LoadReport::default();
        for (position, (row, verdict)) in rows.into_iter().zip(verdicts).enumerate() {
            if let Verdict::Blacklisted(reason) = verdict {
                debug!(table = %T::TABLE, position, %reason, "Row blacklisted");
                report.blacklisted += 1;
                continue;
            }

            let entity = match T::from_row(&row) {
                Ok(entity) => entity,
                Err(e) => {
                    warn!(table = %T::TABLE, position, error = %e, "Skipping malformed row");
                    report.malformed += 1;
                    continue;
                }
            };

            let extra: ExtraFields = row
                .fields()
                .filter(|(name, _)| !T::FIELDS.contains(name))
                .map(|(name, value)| (name.to_string(), value.map(str::to_string)))
                .collect();
            if !extra.is_empty() {
                let key = match entity.key() {
                    Some(key) => key,
                    None => T::rows(self).len().to_string(),
                };
                if let Some(previous) = self.extras.insert((T::TABLE, key.clone()), extra) {
                    warn!(
                        table = %T::TABLE,
                        key = %key,
                        replaced = previous.len(),
                        "Duplicate key; extras of the earlier row replaced"
                    );
                }
            }

            T::rows_mut(self).push(entity);
            report.admitted += 1;
        }
        report
    }

    /// Typed scan over a table's admitted rows, in input order.
    pub fn scan<'a, T: Stored + 'a>(
        &'a self,
        predicate: impl Fn(&T) -> bool + 'a,
    ) -> impl Iterator<Item = &'a T> + 'a {
        T::rows(self).iter().filter(move |row| predicate(row))
    }

    /// Columns of a row that have no typed field. Edge rows are keyed by their position in the table.
    pub fn extras(&self, table: Table, key: &str) -> Option<&[(String, Option<String>)]> {
        self.extras
            .get(&(table, key.to_string()))
            .map(|fields| fields.as_slice())
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn texts(&self) -> &[Text] {
        &self.texts
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_links(&self) -> &[CategoryLink] {
        &self.category_links
    }

    pub fn page_links(&self) -> &[PageLink] {
        &self.page_links
    }
}
