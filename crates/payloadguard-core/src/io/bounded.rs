//! Bounded buffering of entry bodies.
//!
//! Entry bodies are copied into memory before recursion because archive
//! sub-streams are not independently seekable. The copy never grows past
//! the per-entry cap: at most `max + 1` bytes are pulled from the source,
//! which is enough to tell that the entry is oversized.

use std::io::Read;

use crate::error::InspectionError;
use crate::error::QuotaResource;
use crate::error::Result;

/// Initial allocation cap; declared sizes are not trusted beyond this.
const INITIAL_CAPACITY_LIMIT: u64 = 1024 * 1024;

/// Rejects a declared entry size above `max` before any byte is read.
///
/// # Errors
///
/// Returns `QuotaExceeded` with [`QuotaResource::EntrySize`].
pub fn check_declared_size(declared: u64, max: u64) -> Result<()> {
    if declared > max {
        return Err(InspectionError::QuotaExceeded {
            resource: QuotaResource::EntrySize {
                size: declared,
                max,
            },
        });
    }
    Ok(())
}

/// Reads `reader` to the end into a buffer of at most `max` bytes.
///
/// `size_hint` (typically the size declared in the entry header) only
/// sizes the initial allocation.
///
/// # Errors
///
/// Returns `Io` if reading fails, or `QuotaExceeded` with
/// [`QuotaResource::EntrySize`] if the body is longer than `max`.
///
/// # Examples
///
/// ```
/// use payloadguard_core::io::read_bounded;
///
/// let mut body: &[u8] = b"hello";
/// assert_eq!(read_bounded(&mut body, 16, None).unwrap(), b"hello");
///
/// let mut body: &[u8] = b"hello";
/// assert!(read_bounded(&mut body, 4, None).is_err());
/// ```
pub fn read_bounded<R: Read + ?Sized>(
    reader: &mut R,
    max: u64,
    size_hint: Option<u64>,
) -> Result<Vec<u8>> {
    let capacity = size_hint
        .unwrap_or(0)
        .min(max)
        .min(INITIAL_CAPACITY_LIMIT);
    let mut buffer = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));

    let mut limited = reader.take(max.saturating_add(1));
    limited.read_to_end(&mut buffer)?;

    let len = buffer.len() as u64;
    if len > max {
        return Err(InspectionError::QuotaExceeded {
            resource: QuotaResource::EntrySize { size: len, max },
        });
    }

    Ok(buffer)
}
