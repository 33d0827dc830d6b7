//! Pure text-normalization and record-merging logic for the WOD archive.
//!
//! Everything in this crate is deterministic and side-effect free: the
//! normalizer turns one raw caption into `(date, content)`, and the merger
//! folds a sequence of raw entries into a date-keyed [`RecordStore`]. No I/O
//! happens here; crawling and persistence live in `wodarc-scrape` and
//! `wodarc-store`.
pub mod merge;
pub mod normalize;

pub use merge::{RecordStore, fold_entry, merge, rekey};
pub use normalize::{clean_boilerplate, extract_date, process_entry, strip_date_prefix};
