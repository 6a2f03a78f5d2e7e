//! ZIP archive walker.
//!
//! ZIP is random-access: the central directory at the end of the stream
//! lists the entries, so the reader needs the total stream length. Entries
//! are visited in central-directory order. Names come from the directory
//! record, so an entry whose decoder cannot be opened (unsupported
//! compression, encryption) still has its name checked.

use std::ops::ControlFlow;

use tracing::trace;
use zip::result::ZipError;

use crate::Verdict;
use crate::error::InspectionError;
use crate::inspection::Inspection;
use crate::io::ReadSeek;

use super::traits::ArchiveWalker;

/// ZIP archive walker.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipWalker;

impl ZipWalker {
    /// Creates a new ZIP walker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveWalker for ZipWalker {
    fn walk(&self, stream: &mut dyn ReadSeek, cx: &mut Inspection<'_>) -> Verdict {
        let mut archive = match zip::ZipArchive::new(stream) {
            Ok(archive) => archive,
            Err(e) => {
                trace!(error = %e, "not a zip stream");
                return Verdict::Unrecognised;
            }
        };
        cx.note_archive(self.format_name());

        for index in 0..archive.len() {
            let Some(name) = archive.name_for_index(index).map(str::to_owned) else {
                return Verdict::Malformed;
            };
            if let ControlFlow::Break(verdict) = cx.check_name(&name) {
                return verdict;
            }

            let mut file = match archive.by_index(index) {
                Ok(file) => file,
                Err(e) => {
                    if let ControlFlow::Break(verdict) = cx.skip_entry(&name, &entry_error(e)) {
                        return verdict;
                    }
                    continue;
                }
            };

            let size = file.size();
            if let ControlFlow::Break(verdict) = cx.descend(&name, &mut file, Some(size)) {
                return verdict;
            }
        }

        Verdict::Admit
    }

    fn format_name(&self) -> &'static str {
        "zip"
    }
}

/// Classifies an error raised while opening an entry decoder.
///
/// The central directory has already been read at this point, so every
/// failure is confined to the one entry.
fn entry_error(err: ZipError) -> InspectionError {
    match err {
        ZipError::Io(e) => InspectionError::Io(e),
        ZipError::InvalidPassword => InspectionError::Encrypted,
        ZipError::UnsupportedArchive(msg) if msg == ZipError::PASSWORD_REQUIRED => {
            InspectionError::Encrypted
        }
        ZipError::UnsupportedArchive(_) => InspectionError::UnsupportedCompression(err.to_string()),
        other => InspectionError::UnreadableEntry(other.to_string()),
    }
}
