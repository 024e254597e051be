//! Aligned entry archive.
//!
//! Layout (byte order per [`ArchiveKind`]):
//! - 0x00: [u8; 4] magic
//! - 0x04: [u8; 4] sub-magic
//! - 0x08: u32 zero
//! - 0x0C: u32 total file size (padding included)
//! - 0x10: u32 entry count
//! - 0x14: u32 total payload size (padding excluded)
//! - 0x18: u32 zero
//! - 0x1C: u16 alignment
//! - 0x1E: u16 unknown
//! - 0x20: entry count * 16-byte descriptors
//!     - i32 id
//!     - u32 size
//!     - u32 offset (absolute)
//!     - u32 zero
//!
//! The descriptor region and every payload are padded to `alignment`.

use std::io::Cursor;

use binrw::{BinRead, Endian};

use crate::error::{Error, Result};
use crate::io::{ByteReader, ByteWriter};
use crate::ledger::Ledger;
use crate::sniff::{verdict, Sniff};

pub const HEADER_SIZE: usize = 0x20;
pub const DESCRIPTOR_SIZE: usize = 0x10;

#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub magic: [u8; 4],
    pub sub_magic: [u8; 4],
    pub reserved0: u32,
    pub file_size: u32,
    pub entry_count: u32,
    pub payload_size: u32,
    pub reserved1: u32,
    pub alignment: u16,
    pub unknown: u16,
}

#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub id: i32,
    pub size: u32,
    pub offset: u32,
    pub reserved: u32,
}

/// The identity of one archive flavour: its magic pair and byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveKind {
    pub name: String,
    pub magic: [u8; 4],
    pub sub_magic: [u8; 4],
    pub endian: Endian,
}

impl ArchiveKind {
    pub fn new(name: impl Into<String>, magic: [u8; 4], sub_magic: [u8; 4], endian: Endian) -> Self {
        Self {
            name: name.into(),
            magic,
            sub_magic,
            endian,
        }
    }
}

impl Sniff for ArchiveKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn sniff(&self, data: &[u8]) -> bool {
        let check = check_structure(data, self.endian).and_then(|header| {
            if header.magic != self.magic || header.sub_magic != self.sub_magic {
                Err("magic mismatch")
            } else {
                Ok(header)
            }
        });
        verdict(&self.name, check)
    }
}

/// Structural sniff that accepts any magic pair.
pub fn sniff_any(data: &[u8], endian: Endian) -> bool {
    verdict("archive", check_structure(data, endian))
}

/// Single pass over the header and every descriptor.
///
/// Offsets are checked against the buffer and against each other; the sum of
/// entry sizes must equal the declared payload size exactly.
fn check_structure(data: &[u8], endian: Endian) -> std::result::Result<ArchiveHeader, &'static str> {
    if data.len() < HEADER_SIZE {
        return Err("shorter than header");
    }
    let mut cursor = Cursor::new(data);
    let header =
        ArchiveHeader::read_options(&mut cursor, endian, ()).map_err(|_| "header decode")?;
    if header.reserved0 != 0 || header.reserved1 != 0 {
        return Err("reserved header field is non-zero");
    }

    let count = header.entry_count as usize;
    let table_end = count
        .checked_mul(DESCRIPTOR_SIZE)
        .and_then(|n| n.checked_add(HEADER_SIZE))
        .ok_or("entry count overflow")?;
    if table_end > data.len() {
        return Err("descriptor table exceeds buffer");
    }

    let len = data.len() as u64;
    let mut total: u64 = 0;
    let mut prev_offset: u64 = 0;
    for _ in 0..count {
        let desc = EntryDescriptor::read_options(&mut cursor, endian, ())
            .map_err(|_| "descriptor decode")?;
        let offset = desc.offset as u64;
        let size = desc.size as u64;
        total += size;

        if offset > len {
            return Err("entry offset beyond buffer");
        }
        if offset + size > len {
            return Err("entry payload beyond buffer");
        }
        if offset < prev_offset {
            return Err("entry offsets decrease");
        }
        if size > 0 && offset < table_end as u64 {
            return Err("entry overlaps header");
        }
        if desc.reserved != 0 {
            return Err("reserved descriptor field is non-zero");
        }
        prev_offset = offset;
    }

    if total != header.payload_size as u64 {
        return Err("declared payload size mismatch");
    }
    Ok(header)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: i32,
    pub data: Vec<u8>,
    offset: Option<u32>,
}

impl Entry {
    pub fn new(id: i32, data: Vec<u8>) -> Self {
        Self {
            id,
            data,
            offset: None,
        }
    }

    /// Absolute offset the entry was read from. `None` for entries built in memory.
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub magic: [u8; 4],
    pub sub_magic: [u8; 4],
    pub endian: Endian,
    pub alignment: u16,
    /// Carried through untouched.
    pub unknown: u16,
    entries: Vec<Entry>,
}

impl Archive {
    pub fn new(kind: &ArchiveKind, alignment: u16) -> Self {
        Self {
            magic: kind.magic,
            sub_magic: kind.sub_magic,
            endian: kind.endian,
            alignment,
            unknown: 0,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    pub fn push(&mut self, id: i32, data: Vec<u8>) {
        self.entries.push(Entry::new(id, data));
    }

    /// First entry with `id`.
    pub fn get(&self, id: i32) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Remove the first entry with `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: i32) -> Option<Entry> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry sizes, padding excluded.
    pub fn payload_size(&self) -> u64 {
        self.entries.iter().map(|e| e.data.len() as u64).sum()
    }

    /// Read an archive with any magic pair.
    pub fn read(data: &[u8], endian: Endian) -> Result<Self> {
        let mut r = ByteReader::new(data, endian);
        let magic = r.read_array::<4>()?;
        let sub_magic = r.read_array::<4>()?;
        Self::read_body(r, magic, sub_magic)
    }

    /// Read an archive whose magic pair and byte order must match `kind`.
    pub fn read_kind(kind: &ArchiveKind, data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data, kind.endian);
        r.assert_bytes("header.magic", &kind.magic)?;
        r.assert_bytes("header.sub_magic", &kind.sub_magic)?;
        Self::read_body(r, kind.magic, kind.sub_magic)
    }

    fn read_body(mut r: ByteReader<'_>, magic: [u8; 4], sub_magic: [u8; 4]) -> Result<Self> {
        let data = r.view().as_slice();
        let endian = r.endian();
        r.assert_value::<u32>("header.reserved0", 0)?;
        let file_size = r.read::<u32>()?;
        let count = r.read::<u32>()? as usize;
        let payload_size = r.read::<u32>()?;
        r.assert_value::<u32>("header.reserved1", 0)?;
        let alignment = r.read::<u16>()?;
        let unknown = r.read::<u16>()?;

        if count.saturating_mul(DESCRIPTOR_SIZE) > r.remaining() {
            return Err(Error::Bounds {
                offset: r.position(),
                len: count.saturating_mul(DESCRIPTOR_SIZE),
                buffer_len: data.len(),
            });
        }
        if file_size as usize != data.len() {
            log::warn!(
                "declared file size 0x{:X} differs from buffer length 0x{:X}",
                file_size,
                data.len()
            );
        }
        if unknown != 0 {
            log::warn!("archive header unknown field = 0x{:04X}, carried through", unknown);
        }

        let view = r.view();
        let table_end = HEADER_SIZE + count * DESCRIPTOR_SIZE;
        let mut prev_offset = 0u32;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let id = r.read::<i32>()?;
            let size = r.read::<u32>()?;
            let offset_pos = r.position();
            let offset = r.read::<u32>()?;
            r.assert_value::<u32>(&format!("entry[{i}].reserved"), 0)?;

            if offset < prev_offset {
                return Err(Error::FormatViolation {
                    field: format!("entry[{i}].offset"),
                    position: offset_pos,
                    expected: format!(">= 0x{prev_offset:X}"),
                    actual: format!("0x{offset:X}"),
                });
            }
            if size > 0 && (offset as usize) < table_end {
                return Err(Error::FormatViolation {
                    field: format!("entry[{i}].offset"),
                    position: offset_pos,
                    expected: format!(">= 0x{table_end:X}"),
                    actual: format!("0x{offset:X}"),
                });
            }
            prev_offset = offset;

            let payload = view.bytes(offset as usize, size as usize)?;
            entries.push(Entry {
                id,
                data: payload.to_vec(),
                offset: Some(offset),
            });
        }

        let computed: u64 = entries.iter().map(|e| e.data.len() as u64).sum();
        if computed != payload_size as u64 {
            return Err(Error::FormatViolation {
                field: "header.payload_size".to_string(),
                position: 0x14,
                expected: computed.to_string(),
                actual: payload_size.to_string(),
            });
        }

        log::debug!(
            "read archive {:?}/{:?}: {} entries, alignment {}",
            String::from_utf8_lossy(&magic),
            String::from_utf8_lossy(&sub_magic),
            entries.len(),
            alignment
        );

        Ok(Self {
            magic,
            sub_magic,
            endian,
            alignment,
            unknown,
            entries,
        })
    }

    pub fn write(&self) -> Result<Vec<u8>> {
        let align = self.alignment as usize;
        let mut w = ByteWriter::with_capacity(
            HEADER_SIZE + self.entries.len() * DESCRIPTOR_SIZE + self.payload_size() as usize,
            self.endian,
        );
        let mut ledger = Ledger::new();

        let count = u32::try_from(self.entries.len()).map_err(|_| Error::FieldOverflow {
            field: "entry count",
            value: self.entries.len() as u64,
        })?;

        w.write_bytes(&self.magic);
        w.write_bytes(&self.sub_magic);
        w.write::<u32>(0);
        ledger.reserve(&mut w, "file_size", 4)?;
        w.write::<u32>(count);
        ledger.reserve(&mut w, "payload_size", 4)?;
        w.write::<u32>(0);
        w.write::<u16>(self.alignment);
        w.write::<u16>(self.unknown);

        for (i, entry) in self.entries.iter().enumerate() {
            let size = u32::try_from(entry.data.len()).map_err(|_| Error::FieldOverflow {
                field: "entry size",
                value: entry.data.len() as u64,
            })?;
            w.write::<i32>(entry.id);
            w.write::<u32>(size);
            ledger.reserve(&mut w, format!("entry[{i}].offset"), 4)?;
            w.write::<u32>(0);
        }
        w.pad(align);

        let mut payload_size: u64 = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            ledger.fill_position(&mut w, &format!("entry[{i}].offset"))?;
            w.write_bytes(&entry.data);
            payload_size += entry.data.len() as u64;
            w.pad(align);
        }

        ledger.fill(&mut w, "payload_size", payload_size)?;
        ledger.fill_position(&mut w, "file_size")?;
        ledger.finish()?;

        Ok(w.into_inner())
    }
}
