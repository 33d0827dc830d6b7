//! Store-side policy for incoming captions.
//!
//! The crawler stays oblivious to the archive; everything about known keys,
//! de-duplication, and persistence lives here. Raw captions come in, get
//! boilerplate-cleaned, and either fold into the store or bounce off a key
//! that already existed before the run started.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};
use wodarc_core::{clean_boilerplate, extract_date, fold_entry, RecordStore};
use wodarc_scrape::{EntrySink, Flow, RawEntry};

/// Persist a checkpoint after this many new entries.
const CHECKPOINT_EVERY: usize = 10;

pub struct ArchiveSink {
    store: RecordStore,
    /// Keys present before the run; same-run duplicates are handled by
    /// suffixing, only pre-existing keys count as "already archived".
    known: HashSet<String>,
    path: PathBuf,
    promo: Vec<String>,
    stop_on_existing: bool,
    new_entries: usize,
    skipped_existing: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SinkSummary {
    pub new_entries: usize,
    pub skipped_existing: usize,
    pub total: usize,
}

impl ArchiveSink {
    pub fn new(
        path: PathBuf,
        store: RecordStore,
        promo: Vec<String>,
        stop_on_existing: bool,
    ) -> Self {
        let known = store.keys().cloned().collect();
        Self {
            store,
            known,
            path,
            promo,
            stop_on_existing,
            new_entries: 0,
            skipped_existing: 0,
        }
    }

    /// Flush any pending entries and report what the run added.
    pub fn finish(self) -> Result<SinkSummary> {
        if self.new_entries > 0 {
            wodarc_store::save(&self.path, &self.store)?;
        }
        Ok(SinkSummary {
            new_entries: self.new_entries,
            skipped_existing: self.skipped_existing,
            total: self.store.len(),
        })
    }
}

impl EntrySink for ArchiveSink {
    fn accept(&mut self, entry: RawEntry) -> Result<Flow> {
        let cleaned = clean_boilerplate(&entry.text, &self.promo);
        let wanted = extract_date(&cleaned).unwrap_or_else(|| {
            warn!(fallback = %entry.original_key, "sink.no_content_date");
            entry.original_key.clone()
        });

        if self.known.contains(&wanted) {
            self.skipped_existing += 1;
            if self.stop_on_existing {
                info!(key = %wanted, "sink.existing.stop");
                return Ok(Flow::Stop);
            }
            info!(key = %wanted, "sink.existing.skip");
            return Ok(Flow::Continue);
        }

        let stored_as = fold_entry(&mut self.store, &entry.original_key, &cleaned);
        self.new_entries += 1;
        info!(key = %stored_as, "sink.saved");

        if self.new_entries % CHECKPOINT_EVERY == 0 {
            wodarc_store::save(&self.path, &self.store)?;
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(key: &str, text: &str) -> RawEntry {
        RawEntry {
            original_key: key.to_string(),
            text: text.to_string(),
        }
    }

    fn sink_at(dir: &tempfile::TempDir, store: RecordStore, stop: bool) -> ArchiveSink {
        ArchiveSink::new(dir.path().join("wods.json"), store, Vec::new(), stop)
    }

    #[test]
    fn new_entry_is_cleaned_and_stored_under_content_date() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink_at(&dir, RecordStore::new(), false);
        let entry = raw(
            "2026-02-07",
            "45 likes, 2 comments - gym on February 6, 2026: \"20260206 W.O.D!!\n\nFor time\".",
        );
        assert_eq!(sink.accept(entry).unwrap(), Flow::Continue);
        let summary = sink.finish().unwrap();
        assert_eq!(summary.new_entries, 1);

        let reloaded = wodarc_store::load(&dir.path().join("wods.json"));
        assert_eq!(reloaded.get("2026-02-06").map(String::as_str), Some("For time"));
    }

    #[test]
    fn pre_existing_key_skips_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut existing = RecordStore::new();
        existing.insert("2026-02-06".into(), "original".into());
        let mut sink = sink_at(&dir, existing, false);

        let flow = sink.accept(raw("2026-02-07", "20260206 W.O.D!! rewrite")).unwrap();
        assert_eq!(flow, Flow::Continue);
        let summary = sink.finish().unwrap();
        assert_eq!(summary.new_entries, 0);
        assert_eq!(summary.skipped_existing, 1);
    }

    #[test]
    fn stop_on_existing_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let mut existing = RecordStore::new();
        existing.insert("2026-02-06".into(), "original".into());
        let mut sink = sink_at(&dir, existing, true);

        let flow = sink.accept(raw("2026-02-07", "20260206 W.O.D!! rewrite")).unwrap();
        assert_eq!(flow, Flow::Stop);
    }

    #[test]
    fn same_run_duplicates_get_suffixed_not_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink_at(&dir, RecordStore::new(), true);

        sink.accept(raw("2026-02-07", "20260206 W.O.D!! part one")).unwrap();
        let flow = sink.accept(raw("2026-02-07", "20260206 W.O.D!! part two")).unwrap();
        assert_eq!(flow, Flow::Continue);

        let summary = sink.finish().unwrap();
        assert_eq!(summary.new_entries, 2);
        let reloaded = wodarc_store::load(&dir.path().join("wods.json"));
        assert!(reloaded.contains_key("2026-02-06"));
        assert!(reloaded.contains_key("2026-02-06-2"));
    }

    #[test]
    fn undatable_entry_falls_back_to_ingestion_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink_at(&dir, RecordStore::new(), false);
        sink.accept(raw("2026-02-07", "Rest day, gym closed")).unwrap();
        let summary = sink.finish().unwrap();
        assert_eq!(summary.new_entries, 1);
        let reloaded = wodarc_store::load(&dir.path().join("wods.json"));
        assert_eq!(
            reloaded.get("2026-02-07").map(String::as_str),
            Some("Rest day, gym closed")
        );
    }
}
