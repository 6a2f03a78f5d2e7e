//! Gzip stream walker.
//!
//! A gzip member wraps a single body. The walker treats it as a one-entry
//! container: the entry name is the optional `FNAME` header field and the
//! decompressed body is evaluated as a nested stream. This is how `.tar.gz`
//! payloads get their inner tar walked.
//!
//! A member without `FNAME` has no entry name, so the policy is not asked
//! about it; only its body is inspected.
//!
//! Not part of the canonical walker set; enable it with
//! [`DispatcherBuilder::with_gzip`](crate::DispatcherBuilder::with_gzip).

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::ops::ControlFlow;

use flate2::read::GzDecoder;
use tracing::trace;

use crate::Verdict;
use crate::inspection::Inspection;
use crate::io::ReadSeek;

use super::traits::ArchiveWalker;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gzip stream walker.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipWalker;

impl GzipWalker {
    /// Creates a new gzip walker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveWalker for GzipWalker {
    fn walk(&self, stream: &mut dyn ReadSeek, cx: &mut Inspection<'_>) -> Verdict {
        let mut magic = [0u8; 2];
        if stream.read_exact(&mut magic).is_err() || magic != GZIP_MAGIC {
            return Verdict::Unrecognised;
        }
        if stream.seek(SeekFrom::Start(0)).is_err() {
            return Verdict::Malformed;
        }

        let mut decoder = GzDecoder::new(stream);
        let Some(header) = decoder.header() else {
            trace!("gzip header did not parse");
            return Verdict::Unrecognised;
        };
        let name = header
            .filename()
            .map(|raw| String::from_utf8_lossy(raw).into_owned());

        cx.note_archive(self.format_name());
        if let Some(name) = &name
            && let ControlFlow::Break(verdict) = cx.check_name(name)
        {
            return verdict;
        }
        let name = name.unwrap_or_default();
        if let ControlFlow::Break(verdict) = cx.descend(&name, &mut decoder, None) {
            return verdict;
        }

        Verdict::Admit
    }

    fn format_name(&self) -> &'static str {
        "gzip"
    }
}
