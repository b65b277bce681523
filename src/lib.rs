//! Wikirestore: rebuild a per-page file tree from a normalized MediaWiki database dump
//!
//! The dump is a `mysqldump --xml` export of the wiki's tables. Pages, revisions and
//! text blobs live in separate tables, linked by foreign keys; categories and links
//! are edge tables. The pipeline joins them back together in memory and writes one
//! file per page:
//!
//! 1. **Read** -- Stream the XML (optionally bz2) into rows per table
//! 2. **Load** -- Filter each row for spam and placeholders, then type it
//! 3. **Join** -- Resolve `page_latest -> revision -> text`, page links and category links
//! 4. **Plan** -- Decide one path per category membership, plus root files for pages
//!    only reachable through links
//! 5. **Write** -- Create files that do not exist yet; existing files are never touched
//!
//! # Output layout
//!
//! ```text
//! out/
//!   Animals/Dog.mediawiki     # Dog is in category Animals
//!   Cat.mediawiki             # Cat is only linked from Dog
//! ```
//!
//! # Key Modules
//!
//! - [`parser`] -- Streaming `mysqldump --xml` reader
//! - [`filter`] -- Row admission policy (blocklisted titles, placeholders, spam bodies)
//! - [`store`] -- Typed rows per table with scans and an extras side table
//! - [`join`] -- Hash-indexed foreign key resolution and the required-page set
//! - [`plan`] -- Path sanitizing and per-file placement
//! - [`sink`] -- Create-new file writes with per-page outcome reporting
//! - [`pipeline`] -- The stages wired together
//! - [`stats`] -- Atomic counters for the run summary
//! - [`config`] -- Constants and the TOML filter configuration
//!
//! # Example Usage
//!
//! ```bash
//! wikirestore wiki-dump.xml.bz2 out/ --config spam.toml -v
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod join;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod plan;
pub mod sink;
pub mod stats;
pub mod store;
