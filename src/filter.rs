use crate::config::{FilterConfig, RAW_LINK_MARKER, URL_SHORTCODE_MARKER};
use crate::error::Result;
use crate::models::{RawRow, Table};
use memchr::memmem;
use regex::RegexSet;
use rustc_hash::FxHashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlacklistReason {
    Title,
    Placeholder,
    SpamKeyword,
    RawLinks,
    UrlShortcodes,
    SpamDomain,
}

impl fmt::Display for BlacklistReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlacklistReason::Title => "blacklisted title",
            BlacklistReason::Placeholder => "placeholder text row",
            BlacklistReason::SpamKeyword => "spam keyword",
            BlacklistReason::RawLinks => "repeated raw links",
            BlacklistReason::UrlShortcodes => "repeated url shortcodes",
            BlacklistReason::SpamDomain => "spam domain",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Admit,
    Blacklisted(BlacklistReason),
}

impl Verdict {
    pub fn is_blacklisted(self) -> bool {
        matches!(self, Verdict::Blacklisted(_))
    }
}

/// Row admission policy. Pure: the verdict depends only on the row and the configuration.
pub struct ContentFilter {
    titles: FxHashSet<String>,
    keywords: Vec<String>,
    domains: RegexSet,
    placeholder_max_text_id: u64,
}

impl ContentFilter {
    /// Compiles the configured domain patterns; an invalid pattern is a configuration error.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        Ok(Self {
            titles: config.blacklisted_titles.iter().cloned().collect(),
            keywords: config
                .spam_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            domains: RegexSet::new(&config.spam_domains)?,
            placeholder_max_text_id: config.placeholder_max_text_id,
        })
    }

    /// Checks run in order and stop at the first hit: title, placeholder id, body.
    pub fn verdict(&self, table: Table, row: &RawRow) -> Verdict {
        if let Some(title) = title_field(table).and_then(|f| row.get(f)) {
            if self.titles.contains(title) {
                return Verdict::Blacklisted(BlacklistReason::Title);
            }
        }

        if table == Table::Text {
            let id = row.get("old_id").and_then(|v| v.trim().parse::<u64>().ok());
            if id.is_some_and(|id| id <= self.placeholder_max_text_id) {
                return Verdict::Blacklisted(BlacklistReason::Placeholder);
            }
        }

        match body_field(table).and_then(|f| row.get(f)) {
            Some(body) => self.body_verdict(body),
            None => Verdict::Admit,
        }
    }

    fn body_verdict(&self, body: &str) -> Verdict {
        let folded = body.to_lowercase();

        if self.keywords.iter().any(|k| folded.contains(k.as_str())) {
            return Verdict::Blacklisted(BlacklistReason::SpamKeyword);
        }
        if occurrences(&folded, RAW_LINK_MARKER) > 1 {
            return Verdict::Blacklisted(BlacklistReason::RawLinks);
        }
        if occurrences(&folded, URL_SHORTCODE_MARKER) > 1 {
            return Verdict::Blacklisted(BlacklistReason::UrlShortcodes);
        }
        if self.domains.is_match(body) {
            return Verdict::Blacklisted(BlacklistReason::SpamDomain);
        }
        Verdict::Admit
    }
}

fn title_field(table: Table) -> Option<&'static str> {
    match table {
        Table::Page => Some("page_title"),
        _ => None,
    }
}

fn body_field(table: Table) -> Option<&'static str> {
    match table {
        Table::Text => Some("old_text"),
        _ => None,
    }
}

fn occurrences(haystack: &str, needle: &str) -> usize {
    memmem::find_iter(haystack.as_bytes(), needle.as_bytes()).count()
}
