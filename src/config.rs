use crate::error::{Result, WikiRestoreError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Extension appended to every written page file
pub const DOC_EXTENSION: &str = "mediawiki";

/// Text rows with `old_id` at or below this are placeholders seeded by the wiki installer
pub const PLACEHOLDER_MAX_TEXT_ID: u64 = 1366;

/// Titles that are always dropped regardless of content
pub const DEFAULT_BLACKLISTED_TITLES: &[&str] = &["Buy_Cheap_Meds_Online"];

/// Case-folded substrings that mark a body as spam
pub const DEFAULT_SPAM_KEYWORDS: &[&str] = &["viagra", "cialis", "levitra"];

/// More than one occurrence of either marker marks a body as spam
pub const RAW_LINK_MARKER: &str = "<a href";
pub const URL_SHORTCODE_MARKER: &str = "[url=";

/// Longest file name most filesystems accept, in bytes
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Progress update interval (tick every N rows)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Runtime filter configuration, loaded from TOML. Missing keys fall back to the defaults above.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub blacklisted_titles: Vec<String>,
    pub spam_keywords: Vec<String>,
    /// Regular expressions matched against raw text bodies
    pub spam_domains: Vec<String>,
    pub placeholder_max_text_id: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blacklisted_titles: DEFAULT_BLACKLISTED_TITLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            spam_keywords: DEFAULT_SPAM_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            spam_domains: Vec::new(),
            placeholder_max_text_id: PLACEHOLDER_MAX_TEXT_ID,
        }
    }
}

impl FilterConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            WikiRestoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }
}
