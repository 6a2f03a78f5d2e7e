//! Inspection reporting.

use crate::RejectReason;
use crate::Verdict;

/// Counters collected during one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionStats {
    /// Entries whose names were checked against the policy, at any depth.
    pub entries_inspected: usize,

    /// Entries whose bodies could not be buffered and were not recursed into.
    pub entries_skipped: usize,

    /// Streams recognised by a walker, including nested ones.
    pub archives_walked: usize,

    /// Total bytes buffered for recursion.
    pub bytes_buffered: u64,

    /// Deepest nesting level that was evaluated.
    pub max_depth_reached: usize,
}

/// Result of an inspection with the context behind the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionReport {
    /// The terminal verdict.
    pub verdict: Verdict,

    /// Format of the walker that recognised the top-level stream.
    ///
    /// `None` means no walker recognised it and the stream was admitted
    /// on the unrecognised path.
    pub format: Option<&'static str>,

    /// Why the stream was rejected, if it was.
    pub reason: Option<RejectReason>,

    /// Entry names leading to the rejection, outermost first.
    pub entry_path: Vec<String>,

    /// Counters collected during the walk.
    pub stats: InspectionStats,
}

impl InspectionReport {
    /// Returns `true` if the stream was admitted.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        self.verdict.is_admit()
    }

    /// Returns `true` if a registered walker recognised the top-level stream.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        self.format.is_some()
    }

    /// Renders the entry path as `outer.zip > inner.tar > payload.js`.
    #[must_use]
    pub fn location(&self) -> String {
        self.entry_path.join(" > ")
    }
}
