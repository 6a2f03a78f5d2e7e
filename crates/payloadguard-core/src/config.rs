//! Resource limits for archive inspection.

/// Default maximum nesting depth of entry bodies.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Default maximum size of a single buffered entry body (64 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Resource limits applied to a single evaluation.
///
/// Depth counts nested entry bodies: the stream passed to
/// [`evaluate`](crate::evaluate) is at depth 0, the bodies of its entries
/// at depth 1, and so on. A stream at a depth greater than `max_depth` is
/// rejected without being probed.
///
/// # Examples
///
/// ```
/// use payloadguard_core::InspectionLimits;
///
/// // Use the defaults
/// let limits = InspectionLimits::default();
/// assert_eq!(limits.max_depth, 8);
///
/// // Customize for specific needs
/// let custom = InspectionLimits {
///     max_entry_bytes: 16 * 1024 * 1024,
///     max_total_bytes: Some(256 * 1024 * 1024),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectionLimits {
    /// Maximum nesting depth; deeper streams are rejected.
    pub max_depth: usize,

    /// Maximum size of a buffered entry body in bytes. Larger entries are
    /// skipped, not recursed into. The top-level stream is not capped.
    pub max_entry_bytes: u64,

    /// Optional cap on the sum of all bytes buffered during one evaluation.
    /// Exceeding it rejects the stream.
    pub max_total_bytes: Option<u64>,
}

impl Default for InspectionLimits {
    /// Default values:
    /// - `max_depth`: 8
    /// - `max_entry_bytes`: 64 MiB
    /// - `max_total_bytes`: none
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            max_total_bytes: None,
        }
    }
}

impl InspectionLimits {
    /// Tighter limits for pipelines that must bound memory per message.
    ///
    /// - `max_depth`: 4
    /// - `max_entry_bytes`: 16 MiB
    /// - `max_total_bytes`: 256 MiB
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_depth: 4,
            max_entry_bytes: 16 * 1024 * 1024,
            max_total_bytes: Some(256 * 1024 * 1024),
        }
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the per-entry buffer cap.
    #[must_use]
    pub fn with_max_entry_bytes(mut self, max_entry_bytes: u64) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// Sets the aggregate byte cap for one evaluation.
    #[must_use]
    pub fn with_max_total_bytes(mut self, max_total_bytes: Option<u64>) -> Self {
        self.max_total_bytes = max_total_bytes;
        self
    }
}
