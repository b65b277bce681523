use crate::store::LoadReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics collected during a restore run
#[derive(Default)]
pub struct RunStats {
    pub rows_admitted: AtomicU64,
    pub rows_blacklisted: AtomicU64,
    pub rows_malformed: AtomicU64,
    pub links_resolved: AtomicU64,
    pub links_unresolved: AtomicU64,
    pub memberships_resolved: AtomicU64,
    pub memberships_unresolved: AtomicU64,
    pub memberships_ambiguous: AtomicU64,
    pub files_written: AtomicU64,
    pub files_existing: AtomicU64,
    pub pages_without_text: AtomicU64,
    pub pages_unsavable: AtomicU64,
}

/// Plain snapshot of [`RunStats`], written by `--report`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub rows_admitted: u64,
    pub rows_blacklisted: u64,
    pub rows_malformed: u64,
    pub links_resolved: u64,
    pub links_unresolved: u64,
    pub memberships_resolved: u64,
    pub memberships_unresolved: u64,
    pub memberships_ambiguous: u64,
    pub files_written: u64,
    pub files_existing: u64,
    pub pages_without_text: u64,
    pub pages_unsavable: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_load(&self, report: &LoadReport) {
        self.rows_admitted
            .fetch_add(report.admitted, Ordering::Relaxed);
        self.rows_blacklisted
            .fetch_add(report.blacklisted, Ordering::Relaxed);
        self.rows_malformed
            .fetch_add(report.malformed, Ordering::Relaxed);
    }

    pub fn inc_links_resolved(&self) {
        self.links_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_links_unresolved(&self) {
        self.links_unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_memberships_resolved(&self) {
        self.memberships_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_memberships_unresolved(&self) {
        self.memberships_unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_memberships_ambiguous(&self) {
        self.memberships_ambiguous.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_written(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_existing(&self) {
        self.files_existing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_without_text(&self) {
        self.pages_without_text.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unsavable(&self) {
        self.pages_unsavable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn written(&self) -> u64 {
        self.files_written.load(Ordering::Relaxed)
    }

    pub fn existing(&self) -> u64 {
        self.files_existing.load(Ordering::Relaxed)
    }

    pub fn without_text(&self) -> u64 {
        self.pages_without_text.load(Ordering::Relaxed)
    }

    pub fn unsavable(&self) -> u64 {
        self.pages_unsavable.load(Ordering::Relaxed)
    }

    pub fn links_resolved(&self) -> u64 {
        self.links_resolved.load(Ordering::Relaxed)
    }

    pub fn links_unresolved(&self) -> u64 {
        self.links_unresolved.load(Ordering::Relaxed)
    }

    pub fn memberships_resolved(&self) -> u64 {
        self.memberships_resolved.load(Ordering::Relaxed)
    }

    pub fn memberships_unresolved(&self) -> u64 {
        self.memberships_unresolved.load(Ordering::Relaxed)
    }

    pub fn memberships_ambiguous(&self) -> u64 {
        self.memberships_ambiguous.load(Ordering::Relaxed)
    }

    /// Convert to a plain report for serialization
    pub fn to_report(&self) -> StatsReport {
        StatsReport {
            rows_admitted: self.rows_admitted.load(Ordering::Relaxed),
            rows_blacklisted: self.rows_blacklisted.load(Ordering::Relaxed),
            rows_malformed: self.rows_malformed.load(Ordering::Relaxed),
            links_resolved: self.links_resolved(),
            links_unresolved: self.links_unresolved(),
            memberships_resolved: self.memberships_resolved(),
            memberships_unresolved: self.memberships_unresolved(),
            memberships_ambiguous: self.memberships_ambiguous(),
            files_written: self.written(),
            files_existing: self.existing(),
            pages_without_text: self.without_text(),
            pages_unsavable: self.unsavable(),
        }
    }
}
