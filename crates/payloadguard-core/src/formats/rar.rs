//! RAR archive walker.
//!
//! Archives are decoded with the `unrar` crate, which handles every RAR
//! generation from 1.5 through 5.0, stored, compressed and solid alike.
//! The library opens archives by path, so the walker spools the stream
//! into a temporary file starting at the RAR signature. Bytes in front of
//! the signature (self-extractor stubs, junk prefixes) are skipped as long
//! as the signature starts within [`SFX_SEARCH_WINDOW`].
//!
//! Entries that need a password, continue in another volume or fail to
//! decode have their names checked and their bodies skipped. The archive is
//! reopened past a failed entry because `unrar` drops its handle on error.

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::ops::ControlFlow;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use tracing::trace;
use unrar::Archive;
use unrar::CursorBeforeHeader;
use unrar::FileHeader;
use unrar::OpenArchive;
use unrar::Process;
use unrar::error::Code;
use unrar::error::UnrarError;

use crate::Verdict;
use crate::error::InspectionError;
use crate::inspection::Inspection;
use crate::io::ReadSeek;
use crate::io::check_declared_size;

use super::traits::ArchiveWalker;

/// Leading bytes shared by the RAR 1.5 and RAR 5.0 signatures.
const SIGNATURE: &[u8] = b"Rar!\x1a\x07";

/// How far into the stream the RAR signature is searched for.
pub const SFX_SEARCH_WINDOW: u64 = 1024 * 1024;

type PendingHeader = OpenArchive<Process, CursorBeforeHeader>;

/// RAR archive walker.
#[derive(Debug, Default, Clone, Copy)]
pub struct RarWalker;

impl RarWalker {
    /// Creates a new RAR walker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn walk_spooled(&self, path: &Path, cx: &mut Inspection<'_>) -> Verdict {
        let mut archive = match Archive::new(path).open_for_processing() {
            Ok(archive) => archive,
            Err(e) => {
                trace!(error = %e, "unrar refused the stream");
                return Verdict::Unrecognised;
            }
        };

        let max = cx.limits().max_entry_bytes;
        let mut consumed = 0usize;
        let mut recognised = false;

        loop {
            let header = match archive.read_header() {
                Ok(Some(header)) => header,
                Ok(None) => break,
                Err(e) if !recognised => {
                    trace!(error = %e, "first rar header unreadable");
                    return Verdict::Unrecognised;
                }
                Err(e) if matches!(e.code, Code::EOpen) => {
                    debug!(error = %e, "rar archive continues in a missing volume");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "rar stream corrupted");
                    return Verdict::Malformed;
                }
            };
            if !recognised {
                cx.note_archive(self.format_name());
                recognised = true;
            }
            consumed += 1;

            let entry = header.entry();
            let name = entry.filename.to_string_lossy().into_owned();
            let is_dir = entry.is_directory();
            let split = entry.is_split();
            let blocked = unreadable(entry, max);

            if let ControlFlow::Break(verdict) = cx.check_name(&name) {
                return verdict;
            }

            if is_dir || blocked.is_some() {
                if let Some(error) = &blocked
                    && let ControlFlow::Break(verdict) = cx.skip_entry(&name, error)
                {
                    return verdict;
                }
                archive = match header.skip() {
                    Ok(next) => next,
                    Err(e) if split => {
                        debug!(entry = name.as_str(), error = %e, "walk ends at split entry");
                        break;
                    }
                    Err(e) => {
                        debug!(entry = name.as_str(), error = %e, "failed to skip rar entry");
                        return Verdict::Malformed;
                    }
                };
                continue;
            }

            match header.read() {
                Ok((data, next)) => {
                    archive = next;
                    let flow = match check_declared_size(data.len() as u64, max) {
                        Ok(()) => cx.descend_buffered(&name, data),
                        Err(e) => cx.skip_entry(&name, &e),
                    };
                    if let ControlFlow::Break(verdict) = flow {
                        return verdict;
                    }
                }
                Err(e) => {
                    if let ControlFlow::Break(verdict) = cx.skip_entry(&name, &entry_error(&e)) {
                        return verdict;
                    }
                    archive = match reopen_after(path, consumed) {
                        Ok(Some(next)) => next,
                        Ok(None) => break,
                        Err(e) => {
                            debug!(error = %e, "failed to resume rar walk");
                            return Verdict::Malformed;
                        }
                    };
                }
            }
        }

        if !recognised {
            cx.note_archive(self.format_name());
        }
        Verdict::Admit
    }
}

impl ArchiveWalker for RarWalker {
    fn walk(&self, stream: &mut dyn ReadSeek, cx: &mut Inspection<'_>) -> Verdict {
        let offset = match find_signature(stream) {
            Ok(Some(offset)) => offset,
            Ok(None) => return Verdict::Unrecognised,
            Err(e) => {
                trace!(error = %e, "failed to scan for rar signature");
                return Verdict::Unrecognised;
            }
        };
        if offset > 0 {
            debug!(offset, "rar signature found behind a prefix");
        }

        let spooled = match spool(stream, offset) {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "failed to spool rar stream");
                return Verdict::Malformed;
            }
        };
        self.walk_spooled(spooled.path(), cx)
    }

    fn format_name(&self) -> &'static str {
        "rar"
    }
}

/// Returns the offset of the first RAR signature within the search window.
fn find_signature(stream: &mut dyn ReadSeek) -> io::Result<Option<u64>> {
    let mut window = Vec::new();
    (&mut *stream)
        .take(SFX_SEARCH_WINDOW)
        .read_to_end(&mut window)?;
    Ok(window
        .windows(SIGNATURE.len())
        .position(|candidate| candidate == SIGNATURE)
        .map(|offset| offset as u64))
}

/// Copies the stream from `offset` to its end into a temporary file.
fn spool(stream: &mut dyn ReadSeek, offset: u64) -> io::Result<NamedTempFile> {
    stream.seek(SeekFrom::Start(offset))?;
    let mut file = NamedTempFile::new()?;
    io::copy(stream, &mut file)?;
    Ok(file)
}

/// Why an entry body will not be read, decided from its header alone.
fn unreadable(entry: &FileHeader, max: u64) -> Option<InspectionError> {
    if entry.is_encrypted() {
        return Some(InspectionError::Encrypted);
    }
    if entry.is_split() {
        return Some(InspectionError::UnreadableEntry(
            "entry data continues in another volume".into(),
        ));
    }
    check_declared_size(entry.unpacked_size, max).err()
}

/// Opens the archive again and moves past the first `consumed` entries.
///
/// Returns `None` if the archive ends before that.
fn reopen_after(path: &Path, consumed: usize) -> Result<Option<PendingHeader>, UnrarError> {
    let mut archive = Archive::new(path).open_for_processing()?;
    for _ in 0..consumed {
        match archive.read_header()? {
            Some(header) => archive = header.skip()?,
            None => return Ok(None),
        }
    }
    Ok(Some(archive))
}

/// Classifies an error raised while decoding an entry body.
fn entry_error(err: &UnrarError) -> InspectionError {
    match err.code {
        Code::MissingPassword | Code::BadPassword => InspectionError::Encrypted,
        Code::UnknownFormat => InspectionError::UnsupportedCompression(err.to_string()),
        Code::BadData | Code::EOpen => InspectionError::UnreadableEntry(err.to_string()),
        _ => InspectionError::InvalidArchive(err.to_string()),
    }
}
