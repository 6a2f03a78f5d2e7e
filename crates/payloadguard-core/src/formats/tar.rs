//! Tar archive walker.
//!
//! Tar is a streaming format: entries are read strictly in order and each
//! body length is known from its header, so buffering is bounded per entry
//! before any byte is read. GNU long names and PAX path records are
//! resolved by the `tar` crate.

use std::io::Seek;
use std::io::SeekFrom;
use std::ops::ControlFlow;

use tracing::debug;
use tracing::trace;

use crate::Verdict;
use crate::inspection::Inspection;
use crate::io::ReadSeek;

use super::traits::ArchiveWalker;

/// Tar archive walker.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarWalker;

impl TarWalker {
    /// Creates a new tar walker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveWalker for TarWalker {
    fn walk(&self, stream: &mut dyn ReadSeek, cx: &mut Inspection<'_>) -> Verdict {
        // A zero-length stream parses as an empty tar; do not claim it.
        match stream.seek(SeekFrom::End(0)) {
            Ok(0) => return Verdict::Unrecognised,
            Ok(_) => {}
            Err(_) => return Verdict::Malformed,
        }
        if stream.seek(SeekFrom::Start(0)).is_err() {
            return Verdict::Malformed;
        }

        let mut archive = tar::Archive::new(stream);
        let Ok(entries) = archive.entries() else {
            return Verdict::Unrecognised;
        };

        let mut recognised = false;
        for entry_result in entries {
            let mut entry = match entry_result {
                Ok(entry) => entry,
                Err(e) if !recognised => {
                    trace!(error = %e, "not a tar stream");
                    return Verdict::Unrecognised;
                }
                Err(e) => {
                    debug!(error = %e, "tar stream truncated or corrupted");
                    return Verdict::Malformed;
                }
            };

            if !recognised {
                recognised = true;
                cx.note_archive(self.format_name());
            }

            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            if let ControlFlow::Break(verdict) = cx.check_name(&name) {
                return verdict;
            }

            let size = entry.size();
            if let ControlFlow::Break(verdict) = cx.descend(&name, &mut entry, Some(size)) {
                return verdict;
            }
        }

        if !recognised {
            // End-of-archive marker with no entries: an empty tar.
            cx.note_archive(self.format_name());
        }

        Verdict::Admit
    }

    fn format_name(&self) -> &'static str {
        "tar"
    }
}
