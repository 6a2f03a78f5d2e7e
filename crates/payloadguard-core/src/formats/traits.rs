//! Common trait for archive format walkers.

use crate::Verdict;
use crate::inspection::Inspection;
use crate::io::ReadSeek;

/// Trait for archive format walkers.
///
/// A walker reads the stream from its current position (the dispatcher
/// rewinds it to offset 0 first) and drives the [`Inspection`] for each
/// entry it finds:
///
/// - return [`Verdict::Unrecognised`] if the header is not in this format;
/// - call [`Inspection::check_name`] for every entry before reading its body,
///   then [`Inspection::descend`] or [`Inspection::skip_entry`];
/// - return [`Verdict::Malformed`] on a structural error after the header;
/// - return [`Verdict::Admit`] at a clean end of archive.
///
/// Parser errors must not escape a walker; they are expressed as verdicts.
pub trait ArchiveWalker: Send + Sync {
    /// Walks the archive entries in the stream.
    fn walk(&self, stream: &mut dyn ReadSeek, cx: &mut Inspection<'_>) -> Verdict;

    /// Returns the archive format name.
    fn format_name(&self) -> &'static str;
}
