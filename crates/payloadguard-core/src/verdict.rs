//! Inspection verdicts.

use thiserror::Error;

use crate::error::QuotaResource;

/// Terminal classification of a stream.
///
/// A top-level evaluation produces exactly one verdict. Walkers return the
/// same type; the dispatcher decides how a walker's verdict propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// No visited entry violates the policy.
    Admit,
    /// An entry's extension is disallowed, or a resource cap tripped.
    RejectBlacklisted,
    /// The stream is not in the walker's format.
    Unrecognised,
    /// The stream matched a format header but could not be fully parsed.
    Malformed,
}

impl Verdict {
    /// Returns `true` for [`Verdict::Admit`].
    #[must_use]
    pub const fn is_admit(self) -> bool {
        matches!(self, Self::Admit)
    }

    /// Returns `true` for [`Verdict::RejectBlacklisted`].
    #[must_use]
    pub const fn is_reject(self) -> bool {
        matches!(self, Self::RejectBlacklisted)
    }

    /// Returns a stable lowercase name, suitable for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::RejectBlacklisted => "reject_blacklisted",
            Self::Unrecognised => "unrecognised",
            Self::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stream was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// An entry name carries an extension the policy disallows.
    #[error("entry {entry:?} has disallowed extension {extension:?}")]
    BlacklistedExtension {
        /// Full entry name as stored in the archive.
        entry: String,
        /// Lowercased extension that was passed to the policy.
        extension: String,
    },

    /// Archives are nested deeper than the configured limit.
    #[error("nesting depth {depth} exceeds limit {max}")]
    DepthExceeded {
        /// Depth of the stream that was refused.
        depth: usize,
        /// Configured maximum depth.
        max: usize,
    },

    /// The aggregate byte budget for the evaluation was exhausted.
    #[error("{resource}")]
    BudgetExceeded {
        /// The exhausted resource.
        resource: QuotaResource,
    },
}
