//! Foreign-key resolution over the filtered store.
//!
//! Builds hash indexes once, then runs two passes: page links first, so that the
//! category pass can follow each member page's outgoing links.

use crate::error::WikiRestoreError;
use crate::models::{Page, Revision, Text};
use crate::stats::RunStats;
use crate::store::RecordStore;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Lookup tables over the store. Page keys map to every position so ambiguity is visible.
pub struct JoinIndex<'a> {
    page_by_id: FxHashMap<u64, Vec<usize>>,
    page_by_title: FxHashMap<&'a str, Vec<usize>>,
    revision_by_id: FxHashMap<u64, &'a Revision>,
    text_by_id: FxHashMap<u64, &'a Text>,
}

impl<'a> JoinIndex<'a> {
    pub fn build(store: &'a RecordStore) -> Self {
        let mut page_by_id: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
        let mut page_by_title: FxHashMap<&'a str, Vec<usize>> = FxHashMap::default();
        page_by_id.reserve(store.pages().len());
        page_by_title.reserve(store.pages().len());

        for (pos, page) in store.pages().iter().enumerate() {
            page_by_id.entry(page.page_id).or_default().push(pos);
            page_by_title
                .entry(page.page_title.as_str())
                .or_default()
                .push(pos);
        }

        for (title, positions) in &page_by_title {
            if positions.len() > 1 {
                let ids: Vec<u64> = positions
                    .iter()
                    .map(|&p| store.pages()[p].page_id)
                    .collect();
                warn!(title = %title, ids = ?ids, "Several pages share one title; last one wins");
            }
        }

        // First row wins for revision and text ids.
        let mut revision_by_id = FxHashMap::default();
        for rev in store.revisions() {
            revision_by_id.entry(rev.rev_id).or_insert(rev);
        }
        let mut text_by_id = FxHashMap::default();
        for text in store.texts() {
            text_by_id.entry(text.old_id).or_insert(text);
        }

        info!(
            pages = store.pages().len(),
            revisions = revision_by_id.len(),
            texts = text_by_id.len(),
            "Join index built"
        );

        Self {
            page_by_id,
            page_by_title,
            revision_by_id,
            text_by_id,
        }
    }

    pub fn pages_with_id(&self, id: u64) -> &[usize] {
        self.page_by_id.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pages_titled(&self, title: &str) -> &[usize] {
        self.page_by_title
            .get(title)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Follows `page_latest -> rev_id -> rev_text_id -> old_id`. Any broken hop yields "".
    pub fn resolve_text(&self, page: &Page) -> &'a str {
        page.page_latest
            .and_then(|rev_id| self.revision_by_id.get(&rev_id).copied())
            .and_then(|rev| rev.rev_text_id)
            .and_then(|text_id| self.text_by_id.get(&text_id).copied())
            .and_then(|text| text.old_text.as_deref())
            .unwrap_or("")
    }
}

/// A page with its derived text and outgoing links (positions into the document list).
#[derive(Debug)]
pub struct Document<'a> {
    pub page: &'a Page,
    pub text: &'a str,
    pub links: Vec<usize>,
}

impl Document<'_> {
    pub fn title(&self) -> &str {
        &self.page.page_title
    }
}

/// A resolved `categorylinks` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership<'a> {
    pub category: &'a str,
    pub page: usize,
}

/// Pages eligible for output, keyed by title. Inserting an existing title replaces its page.
pub type RequiredPages<'a> = BTreeMap<&'a str, usize>;

pub struct JoinResult<'a> {
    pub documents: Vec<Document<'a>>,
    pub memberships: Vec<Membership<'a>>,
    pub required: RequiredPages<'a>,
}

pub fn resolve<'a>(store: &'a RecordStore, stats: &RunStats) -> JoinResult<'a> {
    let index = JoinIndex::build(store);
    let mut documents: Vec<Document<'a>> = store
        .pages()
        .iter()
        .map(|page| Document {
            page,
            text: index.resolve_text(page),
            links: Vec::new(),
        })
        .collect();
    let mut required = RequiredPages::new();

    resolve_page_links(store, &index, &mut documents, &mut required, stats);
    let memberships = resolve_categories(store, &index, &documents, &mut required, stats);

    info!(
        required = required.len(),
        memberships = memberships.len(),
        "Join complete"
    );

    JoinResult {
        documents,
        memberships,
        required,
    }
}

fn mark_required<'a>(required: &mut RequiredPages<'a>, documents: &[Document<'a>], pos: usize) {
    let page: &'a Page = documents[pos].page;
    required.insert(page.page_title.as_str(), pos);
}

/// Appends each unambiguous `pagelinks` edge to its source page and marks both ends required.
pub fn resolve_page_links<'a>(
    store: &'a RecordStore,
    index: &JoinIndex<'a>,
    documents: &mut [Document<'a>],
    required: &mut RequiredPages<'a>,
    stats: &RunStats,
) {
    for link in store.page_links() {
        let sources = index.pages_with_id(link.pl_from);
        let targets = index.pages_titled(&link.pl_title);

        match (sources, targets) {
            ([src], [dst]) => {
                documents[*src].links.push(*dst);
                mark_required(required, documents, *src);
                mark_required(required, documents, *dst);
                stats.inc_links_resolved();
            }
            _ => {
                let err = if sources.len() != 1 {
                    WikiRestoreError::Resolution {
                        edge: "pagelinks",
                        key: format!("pl_from={}", link.pl_from),
                        matches: sources.len(),
                    }
                } else {
                    WikiRestoreError::Resolution {
                        edge: "pagelinks",
                        key: format!("pl_title={}", link.pl_title),
                        matches: targets.len(),
                    }
                };
                debug!(error = %err, "Skipping page link");
                stats.inc_links_unresolved();
            }
        }
    }
}

/// Resolves `categorylinks` edges in input order. A member page and everything it links to
/// become required.
pub fn resolve_categories<'a>(
    store: &'a RecordStore,
    index: &JoinIndex<'a>,
    documents: &[Document<'a>],
    required: &mut RequiredPages<'a>,
    stats: &RunStats,
) -> Vec<Membership<'a>> {
    let mut memberships = Vec::with_capacity(store.category_links().len());

    for cl in store.category_links() {
        let pos = match index.pages_with_id(cl.cl_from) {
            [] => {
                let err = WikiRestoreError::Resolution {
                    edge: "categorylinks",
                    key: format!("cl_from={}", cl.cl_from),
                    matches: 0,
                };
                warn!(category = %cl.cl_to, error = %err, "Skipping category link");
                stats.inc_memberships_unresolved();
                continue;
            }
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    debug!(
                        category = %cl.cl_to,
                        page_id = cl.cl_from,
                        matches = rest.len() + 1,
                        "Several pages share this id; using the first"
                    );
                    stats.inc_memberships_ambiguous();
                }
                *first
            }
        };

        let doc = &documents[pos];
        info!(
            category = %cl.cl_to,
            page = %doc.title(),
            bytes = doc.text.len(),
            "Category member"
        );
        mark_required(required, documents, pos);

        for &linked in &doc.links {
            let target = &documents[linked];
            debug!(
                category = %cl.cl_to,
                page = %doc.title(),
                link = %target.title(),
                bytes = target.text.len(),
                "Linked page"
            );
            mark_required(required, documents, linked);
        }

        memberships.push(Membership {
            category: cl.cl_to.as_str(),
            page: pos,
        });
        stats.inc_memberships_resolved();
    }

    memberships
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::filter::ContentFilter;
    use crate::models::RawRow;

    fn row(pairs: &[(&str, Option<&str>)]) -> RawRow {
        pairs.iter().copied().collect()
    }

    fn page(id: &str, title: &str, latest: Option<&str>) -> RawRow {
        row(&[
            ("page_id", Some(id)),
            ("page_title", Some(title)),
            ("page_latest", latest),
        ])
    }

    fn rev(id: &str, text_id: &str) -> RawRow {
        row(&[("rev_id", Some(id)), ("rev_text_id", Some(text_id))])
    }

    fn text(id: &str, body: Option<&str>) -> RawRow {
        row(&[("old_id", Some(id)), ("old_text", body)])
    }

    fn plink(from: &str, title: &str) -> RawRow {
        row(&[("pl_from", Some(from)), ("pl_title", Some(title))])
    }

    fn clink(from: &str, to: &str) -> RawRow {
        row(&[("cl_from", Some(from)), ("cl_to", Some(to))])
    }

    fn store_with(tables: Vec<(&str, Vec<RawRow>)>) -> RecordStore {
        let mut store = RecordStore::new(ContentFilter::new(&FilterConfig::default()).unwrap());
        for (name, rows) in tables {
            store.load(name, rows).unwrap();
        }
        store
    }

    #[test]
    fn resolves_text_chain() {
        let store = store_with(vec![
            ("page", vec![page("1", "Dog", Some("10"))]),
            ("revision", vec![rev("10", "2000")]),
            ("text", vec![text("2000", Some("Dogs bark."))]),
        ]);
        let index = JoinIndex::build(&store);
        assert_eq!(index.resolve_text(&store.pages()[0]), "Dogs bark.");
    }

    #[test]
    fn broken_chain_resolves_to_empty() {
        let store = store_with(vec![
            (
                "page",
                vec![
                    page("1", "NoLatest", None),
                    page("2", "NoRevision", Some("99")),
                    page("3", "NoText", Some("11")),
                    page("4", "NullText", Some("12")),
                ],
            ),
            ("revision", vec![rev("11", "5000"), rev("12", "2001")]),
            ("text", vec![text("2001", None)]),
        ]);
        let index = JoinIndex::build(&store);
        for p in store.pages() {
            assert_eq!(index.resolve_text(p), "", "page {}", p.page_title);
        }
    }

    #[test]
    fn blacklisted_text_is_invisible() {
        let store = store_with(vec![
            ("page", vec![page("1", "Dog", Some("10"))]),
            ("revision", vec![rev("10", "50")]),
            ("text", vec![text("50", None)]),
        ]);
        let index = JoinIndex::build(&store);
        assert_eq!(index.resolve_text(&store.pages()[0]), "");
    }

    #[test]
    fn page_link_marks_both_ends() {
        let store = store_with(vec![
            ("page", vec![page("1", "Dog", None), page("2", "Cat", None)]),
            ("pagelinks", vec![plink("1", "Cat")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert_eq!(result.documents[0].links, vec![1]);
        assert!(result.required.contains_key("Dog"));
        assert!(result.required.contains_key("Cat"));
        assert_eq!(stats.links_resolved(), 1);
    }

    #[test]
    fn page_link_to_missing_title_is_skipped() {
        let store = store_with(vec![
            ("page", vec![page("1", "Dog", None), page("2", "Cat", None)]),
            ("pagelinks", vec![plink("1", "Bird")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert!(result.documents[0].links.is_empty());
        assert!(result.required.is_empty());
        assert_eq!(stats.links_unresolved(), 1);
    }

    #[test]
    fn page_link_from_missing_page_is_skipped() {
        let store = store_with(vec![
            ("page", vec![page("2", "Cat", None)]),
            ("pagelinks", vec![plink("1", "Cat")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert!(result.required.is_empty());
        assert_eq!(stats.links_unresolved(), 1);
    }

    #[test]
    fn ambiguous_link_target_is_skipped() {
        let store = store_with(vec![
            (
                "page",
                vec![
                    page("1", "Dog", None),
                    page("2", "Cat", None),
                    page("3", "Cat", None),
                ],
            ),
            ("pagelinks", vec![plink("1", "Cat")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert!(result.documents[0].links.is_empty());
        assert_eq!(stats.links_unresolved(), 1);
    }

    #[test]
    fn page_link_from_duplicate_source_id_is_skipped() {
        let store = store_with(vec![
            (
                "page",
                vec![
                    page("1", "Dog", None),
                    page("1", "Hound", None),
                    page("2", "Cat", None),
                ],
            ),
            ("pagelinks", vec![plink("1", "Cat")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert!(result.documents.iter().all(|d| d.links.is_empty()));
        assert!(result.required.is_empty());
        assert_eq!(stats.links_unresolved(), 1);
        assert_eq!(stats.links_resolved(), 0);
    }

    #[test]
    fn category_marks_member_and_its_links() {
        let store = store_with(vec![
            (
                "page",
                vec![
                    page("1", "Dog", None),
                    page("2", "Cat", None),
                    page("3", "Bird", None),
                ],
            ),
            ("pagelinks", vec![plink("1", "Cat")]),
            ("categorylinks", vec![clink("1", "Animals")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert_eq!(
            result.memberships,
            vec![Membership {
                category: "Animals",
                page: 0
            }]
        );
        let required: Vec<_> = result.required.keys().copied().collect();
        assert_eq!(required, vec!["Cat", "Dog"]);
        assert_eq!(stats.memberships_resolved(), 1);
    }

    #[test]
    fn category_link_to_missing_page_is_skipped() {
        let store = store_with(vec![
            ("page", vec![page("1", "Dog", None)]),
            ("categorylinks", vec![clink("9", "Animals"), clink("1", "Pets")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert_eq!(result.memberships.len(), 1);
        assert_eq!(result.memberships[0].category, "Pets");
        assert_eq!(stats.memberships_unresolved(), 1);
    }

    #[test]
    fn category_link_with_duplicate_id_uses_first_page() {
        let store = store_with(vec![
            ("page", vec![page("1", "Dog", None), page("1", "Hound", None)]),
            ("categorylinks", vec![clink("1", "Animals")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert_eq!(result.memberships[0].page, 0);
        assert!(result.required.contains_key("Dog"));
        assert!(!result.required.contains_key("Hound"));
        assert_eq!(stats.memberships_ambiguous(), 1);
    }

    #[test]
    fn duplicate_titles_are_last_write_wins() {
        let store = store_with(vec![
            ("page", vec![page("1", "Dog", None), page("2", "Dog", None)]),
            ("categorylinks", vec![clink("1", "Animals"), clink("2", "Pets")]),
        ]);
        let stats = RunStats::new();
        let result = resolve(&store, &stats);
        assert_eq!(result.required.len(), 1);
        assert_eq!(result.required["Dog"], 1);
    }

    #[test]
    fn unreferenced_pages_are_not_required() {
        let store = store_with(vec![("page", vec![page("1", "Dog", None)])]);
        let result = resolve(&store, &RunStats::new());
        assert!(result.required.is_empty());
        assert!(result.memberships.is_empty());
        assert_eq!(result.documents.len(), 1);
    }
}
