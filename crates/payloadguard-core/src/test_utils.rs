//! Test utilities for building in-memory archives.
//!
//! Used by the unit tests, the integration tests and the benchmarks.
//! TAR, ZIP and gzip fixtures are written with the same crates the walkers
//! read them with; RAR fixtures are assembled block by block.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

/// Creates an in-memory TAR archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are created with mode 0o644.
///
/// # Examples
///
/// ```
/// use payloadguard_core::test_utils::create_test_tar;
///
/// let tar_data = create_test_tar(vec![("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// ```
#[must_use]
pub fn create_test_tar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut ar = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        ar.append_data(&mut header, path, data).unwrap();
    }
    ar.into_inner().unwrap()
}

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are stored uncompressed
/// with mode 0o644.
///
/// # Examples
///
/// ```
/// use payloadguard_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(vec![("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    write_zip(entries, zip::CompressionMethod::Stored)
}

/// Creates an in-memory ZIP archive with deflate-compressed entries.
#[must_use]
pub fn create_test_zip_deflated(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    write_zip(entries, zip::CompressionMethod::Deflated)
}

fn write_zip(entries: Vec<(&str, &[u8])>, method: zip::CompressionMethod) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::write::ZipWriter;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(0o644);

    for (path, data) in entries {
        zip.start_file(path, options).unwrap();
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Creates `levels` ZIP archives nested inside each other.
///
/// The innermost archive holds `leaf`; every outer level holds a single
/// entry `level{n}.zip` with the archive one level down.
///
/// # Examples
///
/// ```
/// use payloadguard_core::test_utils::create_nested_zip;
///
/// // outer zip > level1.zip > payload.txt
/// let data = create_nested_zip(2, ("payload.txt", b"hi"));
/// ```
#[must_use]
pub fn create_nested_zip(levels: usize, leaf: (&str, &[u8])) -> Vec<u8> {
    let mut data = create_test_zip(vec![leaf]);
    for level in 1..levels {
        let name = format!("level{level}.zip");
        data = create_test_zip(vec![(name.as_str(), data.as_slice())]);
    }
    data
}

/// Creates a single-member gzip stream, with `FNAME` set when `name` is given.
#[must_use]
pub fn create_test_gzip(name: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut builder = flate2::GzBuilder::new();
    if let Some(name) = name {
        builder = builder.filename(name);
    }
    let mut encoder = builder.write(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Builder for creating TAR test archives with various entry types.
///
/// # Examples
///
/// ```
/// use payloadguard_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .add_file("file.txt", b"content")
///     .add_directory("dir/")
///     .build();
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Creates a new TAR test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Adds a regular file to the archive.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Adds a directory to the archive.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a regular file whose header carries no path at all.
    #[must_use]
    pub fn add_unnamed_file(mut self, data: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Builds and returns the TAR archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    /// Builds the archive without the two zero blocks that terminate it.
    #[must_use]
    pub fn build_unterminated(self) -> Vec<u8> {
        let mut data = self.build();
        data.truncate(data.len() - 1024);
        data
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RarLayout {
    V4,
    V5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RarEntryKind {
    Stored,
    Compressed,
    Encrypted,
    Split,
    Directory,
}

struct RarFixtureEntry {
    name: String,
    data: Vec<u8>,
    kind: RarEntryKind,
    bad_crc: bool,
}

/// Builder for RAR test archives in either the 4.x or the 5.0 layout.
///
/// Stored entries carry their bodies as-is. Compressed entries are encoded
/// for real with a literal-only Huffman stream, RAR 2.9 for the 4.x layout
/// and RAR 5.0 otherwise, so any RAR decoder can unpack them. Encrypted
/// and split entries only carry the header flags and records.
///
/// # Examples
///
/// ```
/// use payloadguard_core::test_utils::RarTestBuilder;
///
/// let rar4 = RarTestBuilder::rar4().add_file("a.txt", b"hello").build();
/// let rar5 = RarTestBuilder::rar5().add_directory("docs").build();
/// assert!(rar4.starts_with(b"Rar!\x1a\x07\x00"));
/// assert!(rar5.starts_with(b"Rar!\x1a\x07\x01\x00"));
/// ```
pub struct RarTestBuilder {
    layout: RarLayout,
    entries: Vec<RarFixtureEntry>,
}

impl RarTestBuilder {
    /// Starts a RAR 4.x archive.
    #[must_use]
    pub fn rar4() -> Self {
        Self::with_layout(RarLayout::V4)
    }

    /// Starts a RAR 5.0 archive.
    #[must_use]
    pub fn rar5() -> Self {
        Self::with_layout(RarLayout::V5)
    }

    fn with_layout(layout: RarLayout) -> Self {
        Self {
            layout,
            entries: Vec::new(),
        }
    }

    fn push(mut self, name: &str, data: &[u8], kind: RarEntryKind, bad_crc: bool) -> Self {
        self.entries.push(RarFixtureEntry {
            name: name.to_owned(),
            data: data.to_vec(),
            kind,
            bad_crc,
        });
        self
    }

    /// Adds a stored file.
    #[must_use]
    pub fn add_file(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, RarEntryKind::Stored, false)
    }

    /// Adds a stored file whose recorded CRC does not match its data.
    #[must_use]
    pub fn add_file_with_bad_crc(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, RarEntryKind::Stored, true)
    }

    /// Adds a compressed file.
    #[must_use]
    pub fn add_compressed(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, RarEntryKind::Compressed, false)
    }

    /// Adds a file flagged as encrypted.
    #[must_use]
    pub fn add_encrypted(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, RarEntryKind::Encrypted, false)
    }

    /// Adds a file whose data continues in the next volume.
    #[must_use]
    pub fn add_split(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, RarEntryKind::Split, false)
    }

    /// Adds a directory.
    #[must_use]
    pub fn add_directory(self, name: &str) -> Self {
        self.push(name, &[], RarEntryKind::Directory, false)
    }

    /// Builds and returns the archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        match self.layout {
            RarLayout::V4 => self.build_v4(),
            RarLayout::V5 => self.build_v5(),
        }
    }

    fn build_v4(self) -> Vec<u8> {
        let mut out = b"Rar!\x1a\x07\x00".to_vec();
        out.extend(rar4_block(0x73, 0, &[0u8; 6]));

        for entry in &self.entries {
            let (name, unicode) = if entry.name.is_ascii() {
                (entry.name.as_bytes().to_vec(), false)
            } else {
                (encode_rar4_unicode_name(&entry.name), true)
            };

            let mut flags = 0x8000u16;
            if unicode {
                flags |= 0x0200;
            }
            flags |= match entry.kind {
                RarEntryKind::Encrypted => 0x0004,
                RarEntryKind::Split => 0x0002,
                RarEntryKind::Directory => 0x00e0,
                RarEntryKind::Stored | RarEntryKind::Compressed => 0,
            };
            let (method, packed) = if entry.kind == RarEntryKind::Compressed {
                (0x33, rar29_literals(&entry.data))
            } else {
                (0x30, entry.data.clone())
            };
            let attributes: u32 = if entry.kind == RarEntryKind::Directory {
                0x10
            } else {
                0x20
            };

            let mut body = Vec::new();
            body.extend(u32::try_from(packed.len()).unwrap().to_le_bytes());
            body.extend(u32::try_from(entry.data.len()).unwrap().to_le_bytes());
            body.push(3);
            body.extend(entry_crc(entry).to_le_bytes());
            body.extend(0u32.to_le_bytes());
            body.push(29);
            body.push(method);
            body.extend(u16::try_from(name.len()).unwrap().to_le_bytes());
            body.extend(attributes.to_le_bytes());
            body.extend(&name);

            out.extend(rar4_block(0x74, flags, &body));
            out.extend(&packed);
        }

        out.extend(rar4_block(0x7b, 0x4000, &[]));
        out
    }

    fn build_v5(self) -> Vec<u8> {
        let mut out = b"Rar!\x1a\x07\x01\x00".to_vec();
        out.extend(rar5_block(1, 0, &vint(0), &[], None));

        for entry in &self.entries {
            let is_dir = entry.kind == RarEntryKind::Directory;
            let mut file_flags = 0u64;
            if is_dir {
                file_flags |= 0x0001;
            } else {
                file_flags |= 0x0004;
            }
            let (method, packed): (u64, _) = if entry.kind == RarEntryKind::Compressed {
                (3, rar50_literals(&entry.data))
            } else {
                (0, entry.data.clone())
            };

            let mut fields = Vec::new();
            fields.extend(vint(file_flags));
            fields.extend(vint(entry.data.len() as u64));
            fields.extend(vint(if is_dir { 0o755 } else { 0o644 }));
            if !is_dir {
                fields.extend(entry_crc(entry).to_le_bytes());
            }
            fields.extend(vint(method << 7));
            fields.extend(vint(1));
            fields.extend(vint(entry.name.len() as u64));
            fields.extend(entry.name.as_bytes());

            let extra = if entry.kind == RarEntryKind::Encrypted {
                // Version, flags, KDF count, then salt and IV.
                let mut record = vint(0x01);
                record.extend(vint(0));
                record.extend(vint(0));
                record.push(15);
                record.extend([0u8; 32]);
                let mut extra = vint(record.len() as u64);
                extra.extend(record);
                extra
            } else {
                Vec::new()
            };
            let header_flags = if entry.kind == RarEntryKind::Split {
                0x0010
            } else {
                0
            };
            let data_size = (!is_dir).then_some(packed.len() as u64);

            out.extend(rar5_block(2, header_flags, &fields, &extra, data_size));
            out.extend(&packed);
        }

        out.extend(rar5_block(5, 0, &vint(0), &[], None));
        out
    }
}

/// MSB-first bit sink for the compressed fixture streams.
#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    fn put(&mut self, value: u32, width: u32) {
        for shift in (0..width).rev() {
            if self.bits % 8 == 0 {
                self.out.push(0);
            }
            if (value >> shift) & 1 == 1 {
                let last = self.out.len() - 1;
                self.out[last] |= 0x80 >> (self.bits % 8);
            }
            self.bits += 1;
        }
    }

    /// Writes the 20 four-bit code lengths of the table-length alphabet.
    fn put_bit_lengths(&mut self, lengths: &[(usize, u32)]) {
        for symbol in 0..20 {
            let length = lengths
                .iter()
                .find(|(s, _)| *s == symbol)
                .map_or(0, |&(_, length)| length);
            self.put(length, 4);
        }
    }
}

/// Encodes `data` as a single RAR 2.9 LZ block using literals only.
///
/// Bytes 0 to 254 get 8-bit codes equal to their value, byte 255 and the
/// end-of-block symbol 256 get the two 9-bit codes. All other tables are
/// empty.
fn rar29_literals(data: &[u8]) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.put(0, 1); // LZ block
    w.put(0, 1); // fresh tables
    // Codes: 8 -> 00, 9 -> 01, 17 -> 10, 18 -> 110, 19 -> 111.
    w.put_bit_lengths(&[(8, 2), (9, 2), (17, 2), (18, 3), (19, 3)]);

    w.put(0b00, 2);
    w.put(0b10, 2);
    w.put(127, 7);
    w.put(0b10, 2);
    w.put(105, 7);
    w.put(0b01, 2);
    w.put(0b01, 2);
    w.put(0b111, 3);
    w.put(127, 7);
    w.put(0b110, 3);
    w.put(6, 3);

    for &byte in data {
        if byte == 0xff {
            w.put(510, 9);
        } else {
            w.put(u32::from(byte), 8);
        }
    }
    w.put(511, 9);
    // New file follows, no new table.
    w.put(0, 2);
    w.out
}

/// Encodes `data` as a single final RAR 5.0 block using literals only.
fn rar50_literals(data: &[u8]) -> Vec<u8> {
    let mut w = BitWriter::default();
    // Codes: 8 -> 0, 17 -> 10, 19 -> 11.
    w.put_bit_lengths(&[(8, 1), (17, 2), (19, 2)]);

    w.put(0, 1);
    w.put(0b10, 2);
    w.put(127, 7);
    w.put(0b10, 2);
    w.put(106, 7);
    w.put(0b11, 2);
    w.put(127, 7);
    w.put(0b11, 2);
    w.put(25, 7);

    for &byte in data {
        w.put(u32::from(byte), 8);
    }

    let BitWriter { out: body, bits } = w;
    rar50_block_header(body.len(), bits)
        .into_iter()
        .chain(body)
        .collect()
}

fn rar50_block_header(size: usize, bits: usize) -> Vec<u8> {
    let count = match size {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        _ => 3,
    };
    let bit_size = bits - (size - 1) * 8;
    // Table present, last block, size byte count, bits used in the last byte.
    let flags = (0x80 | 0x40 | ((count - 1) << 3) | (bit_size - 1)) as u8;
    let checksum = 0x5a ^ flags ^ (size as u8) ^ ((size >> 8) as u8) ^ ((size >> 16) as u8);

    let mut out = vec![flags, checksum];
    out.extend(&(size as u32).to_le_bytes()[..count]);
    out
}

fn entry_crc(entry: &RarFixtureEntry) -> u32 {
    let crc = crc32fast::hash(&entry.data);
    if entry.bad_crc { !crc } else { crc }
}

fn rar4_block(kind: u8, flags: u16, body: &[u8]) -> Vec<u8> {
    let size = u16::try_from(7 + body.len()).unwrap();
    let mut header = vec![kind];
    header.extend(flags.to_le_bytes());
    header.extend(size.to_le_bytes());
    header.extend(body);

    let crc = (crc32fast::hash(&header) & 0xffff) as u16;
    let mut out = crc.to_le_bytes().to_vec();
    out.extend(header);
    out
}

fn rar5_block(kind: u64, flags: u64, fields: &[u8], extra: &[u8], data_size: Option<u64>) -> Vec<u8> {
    let mut header_flags = flags;
    if !extra.is_empty() {
        header_flags |= 0x0001;
    }
    if data_size.is_some() {
        header_flags |= 0x0002;
    }

    let mut header = vint(kind);
    header.extend(vint(header_flags));
    if !extra.is_empty() {
        header.extend(vint(extra.len() as u64));
    }
    if let Some(size) = data_size {
        header.extend(vint(size));
    }
    header.extend(fields);
    header.extend(extra);

    let mut sized = vint(header.len() as u64);
    sized.extend(header);
    let mut out = crc32fast::hash(&sized).to_le_bytes().to_vec();
    out.extend(sized);
    out
}

fn vint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Encodes a name the way RAR 4.x stores non-ASCII file names.
///
/// Produces an ASCII rendition, a NUL, then every UTF-16 unit stored as a
/// full 16-bit value.
#[must_use]
pub fn encode_rar4_unicode_name(name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut out: Vec<u8> = units
        .iter()
        .map(|&unit| u8::try_from(unit).ok().filter(u8::is_ascii).unwrap_or(b'_'))
        .collect();
    out.push(0);
    out.push(0);

    for chunk in units.chunks(4) {
        let flags = (0..chunk.len()).fold(0u8, |acc, i| acc | (0b10 << (6 - 2 * i)));
        out.push(flags);
        for unit in chunk {
            out.extend(unit.to_le_bytes());
        }
    }
    out
}
