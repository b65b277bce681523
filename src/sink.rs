use crate::error::WikiRestoreError;
use crate::plan::{OutputPlan, PlannedWrite};
use crate::stats::RunStats;
use rayon::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Exists,
    NoText,
    Unsavable(String),
}

/// Writes `text` into a file this run just created. A partial file is removed so a later
/// run does not mistake it for a finished one.
fn fill<W: Write>(mut out: W, path: &Path, text: &str) -> WriteOutcome {
    let result = out.write_all(text.as_bytes()).and_then(|()| out.flush());
    drop(out);
    match result {
        Ok(()) => WriteOutcome::Written,
        Err(e) => {
            if let Err(rm) = fs::remove_file(path) {
                warn!(path = ?path, error = %rm, "Failed to remove partial file");
            }
            WriteOutcome::Unsavable(e.to_string())
        }
    }
}

/// Writes page files under an output root. Never overwrites and never fails the run.
pub struct FileSink {
    root: PathBuf,
    dry_run: bool,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// In dry-run mode outcomes are computed against the current tree but nothing is created.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn write(&self, relative: &Path, text: &str) -> WriteOutcome {
        if text.is_empty() {
            return WriteOutcome::NoText;
        }

        let path = self.root.join(relative);
        if self.dry_run {
            return if path.exists() {
                WriteOutcome::Exists
            } else {
                WriteOutcome::Written
            };
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return WriteOutcome::Unsavable(format!(
                    "cannot create directory {}: {}",
                    parent.display(),
                    e
                ));
            }
        }

        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return WriteOutcome::Exists,
            Err(e) => return WriteOutcome::Unsavable(e.to_string()),
        };
        fill(file, &path, text)
    }

    /// Writes one planned file and reports its outcome.
    pub fn apply(&self, planned: &PlannedWrite<'_>, stats: &RunStats) -> WriteOutcome {
        let outcome = match &planned.target {
            _ if planned.text.is_empty() => WriteOutcome::NoText,
            Ok(relative) => self.write(relative, planned.text),
            Err(rejection) => WriteOutcome::Unsavable(rejection.to_string()),
        };

        match &outcome {
            WriteOutcome::Written => {
                debug!(title = planned.title, path = ?planned.target, "Saved");
                stats.inc_written();
            }
            WriteOutcome::Exists => {
                stats.inc_existing();
            }
            WriteOutcome::NoText => {
                warn!(title = planned.title, "No text");
                stats.inc_without_text();
            }
            WriteOutcome::Unsavable(reason) => {
                let err = WikiRestoreError::Path {
                    title: planned.title.to_string(),
                    reason: reason.clone(),
                };
                warn!(error = %err, "Could not be saved");
                stats.inc_unsavable();
            }
        }
        outcome
    }

    /// Runs a whole plan. Planned paths are distinct, so files are written in parallel.
    pub fn execute(&self, plan: &OutputPlan<'_>, stats: &RunStats) {
        plan.writes.par_iter().for_each(|planned| {
            self.apply(planned, stats);
        });
        info!(
            written = stats.written(),
            existing = stats.existing(),
            without_text = stats.without_text(),
            unsavable = stats.unsavable(),
            dry_run = self.dry_run,
            "Output written"
        );
    }
}
