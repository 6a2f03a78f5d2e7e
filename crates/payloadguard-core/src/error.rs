//! Error types for archive inspection.
//!
//! These errors never cross the public [`evaluate`](crate::evaluate)
//! boundary: walkers translate them into a [`Verdict`](crate::Verdict) or
//! into a skipped entry. They are public so that custom walkers can reuse
//! the same taxonomy.

use thiserror::Error;

/// Result type alias using `InspectionError`.
pub type Result<T> = std::result::Result<T, InspectionError>;

/// Represents a specific budget that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaResource {
    /// A single entry body is larger than the per-entry cap.
    EntrySize {
        /// Entry size in bytes (declared or observed).
        size: u64,
        /// Maximum allowed entry size in bytes.
        max: u64,
    },
    /// The aggregate of buffered bytes in one evaluation exceeded its cap.
    TotalBytes {
        /// Bytes buffered so far, including the entry that tripped the cap.
        current: u64,
        /// Maximum allowed bytes.
        max: u64,
    },
    /// Integer overflow detected in byte accounting.
    IntegerOverflow,
}

impl std::fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntrySize { size, max } => {
                write!(f, "quota exceeded: entry size ({size} > {max})")
            }
            Self::TotalBytes { current, max } => {
                write!(f, "quota exceeded: total buffered bytes ({current} > {max})")
            }
            Self::IntegerOverflow => {
                write!(f, "quota exceeded: integer overflow in byte accounting")
            }
        }
    }
}

/// Errors that can occur while parsing an archive or buffering an entry.
#[derive(Error, Debug)]
pub enum InspectionError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream is not in the format the parser understands.
    #[error("unsupported archive format")]
    UnsupportedFormat,

    /// The stream matched a format header but is corrupted or truncated.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The archive or entry requires a password.
    #[error("encrypted content requires a password")]
    Encrypted,

    /// The entry uses a compression method this parser cannot decode.
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(String),

    /// The entry body failed to decode or verify, or is stored elsewhere.
    #[error("unreadable entry: {0}")]
    UnreadableEntry(String),

    /// A byte budget was exceeded.
    #[error("{resource}")]
    QuotaExceeded {
        /// Description of the exceeded resource.
        resource: QuotaResource,
    },
}

impl InspectionError {
    /// Returns `true` if this error only affects a single entry.
    ///
    /// Entry-local errors are absorbed by [`Inspection::skip_entry`]: the
    /// entry is skipped and the walk continues with the next one. Any other
    /// error means the container itself is broken.
    ///
    /// [`Inspection::skip_entry`]: crate::Inspection::skip_entry
    ///
    /// # Examples
    ///
    /// ```
    /// use payloadguard_core::InspectionError;
    ///
    /// assert!(InspectionError::Encrypted.is_entry_local());
    /// assert!(!InspectionError::UnsupportedFormat.is_entry_local());
    /// ```
    #[must_use]
    pub const fn is_entry_local(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Encrypted
                | Self::UnsupportedCompression(_)
                | Self::UnreadableEntry(_)
                | Self::QuotaExceeded {
                    resource: QuotaResource::EntrySize { .. }
                }
        )
    }

    /// Returns the quota resource that was exceeded, if applicable.
    #[must_use]
    pub const fn quota_resource(&self) -> Option<&QuotaResource> {
        match self {
            Self::QuotaExceeded { resource } => Some(resource),
            _ => None,
        }
    }
}
