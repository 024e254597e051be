//! Record table sections: a count header followed by fixed-size records, each
//! carrying its own trailing name.
//!
//! Section layout (byte order per caller):
//! - u32 record count
//! - u32 version tag
//! - records, each padded to 8 bytes
//!
//! [`NamedRecord`] layout:
//! - 0x00: u64 name offset, relative to the record start
//! - 0x08: u32 value 0
//! - 0x0C: u32 value 1
//! - 0x10: u32 tag (identical for every record of a table)
//! - 0x14: i32 id
//! - 0x18: 0x68 zero bytes
//! - 0x80: NUL-terminated UTF-16 name

use binrw::Endian;

use crate::error::{Error, Result};
use crate::io::{align_up, utf16_for, ByteReader, ByteView, ByteWriter};
use crate::ledger::Ledger;
use crate::sniff::{verdict, Sniff};

pub const SECTION_HEADER_SIZE: usize = 8;
pub const RECORD_ALIGNMENT: usize = 8;

/// One fixed-size entry of a record section.
pub trait SectionRecord: Sized {
    /// Size of the fixed part, used to bound the record count before reading.
    const FIXED_SIZE: usize;

    /// Read one record. The reader sits at the record start and must be left
    /// after everything the record owns (padding excluded).
    fn read_record(reader: &mut ByteReader<'_>, index: usize) -> Result<Self>;

    /// Write one record at the writer's position. Slot names must be unique per `index`.
    fn write_record(&self, writer: &mut ByteWriter, ledger: &mut Ledger, index: usize) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable<R> {
    pub version: u32,
    records: Vec<R>,
}

impl<R: SectionRecord> RecordTable<R> {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<R> {
        &mut self.records
    }

    pub fn push(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let count = reader.read::<u32>()? as usize;
        let version = reader.read::<u32>()?;

        let min_len = count.saturating_mul(R::FIXED_SIZE);
        if min_len > reader.remaining() {
            return Err(Error::Bounds {
                offset: reader.position(),
                len: min_len,
                buffer_len: reader.view().len(),
            });
        }

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            records.push(R::read_record(reader, i)?);
            reader.pad(RECORD_ALIGNMENT)?;
        }
        log::debug!("read record table v{}: {} records", version, records.len());

        Ok(Self { version, records })
    }

    pub fn write(&self, writer: &mut ByteWriter, ledger: &mut Ledger) -> Result<()> {
        let count = u32::try_from(self.records.len()).map_err(|_| Error::FieldOverflow {
            field: "record count",
            value: self.records.len() as u64,
        })?;
        writer.write::<u32>(count);
        writer.write::<u32>(self.version);

        for (i, record) in self.records.iter().enumerate() {
            record.write_record(writer, ledger, i)?;
            writer.pad(RECORD_ALIGNMENT);
        }
        Ok(())
    }

    pub fn from_bytes(data: &[u8], endian: Endian) -> Result<Self> {
        Self::read(&mut ByteReader::new(data, endian))
    }

    /// Standalone write pass; fails if any reservation is left open.
    pub fn to_bytes(&self, endian: Endian) -> Result<Vec<u8>> {
        let mut writer = ByteWriter::new(endian);
        let mut ledger = Ledger::new();
        self.write(&mut writer, &mut ledger)?;
        ledger.finish()?;
        Ok(writer.into_inner())
    }
}

impl<R> Default for RecordTable<R> {
    fn default() -> Self {
        Self {
            version: 0,
            records: Vec::new(),
        }
    }
}

impl<'a, R> IntoIterator for &'a RecordTable<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

const NAMED_ZERO_FILL: usize = 0x68;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRecord {
    pub name: String,
    pub values: [u32; 2],
    pub tag: u32,
    pub id: i32,
}

impl NamedRecord {
    pub fn new(name: impl Into<String>, id: i32, tag: u32) -> Self {
        Self {
            name: name.into(),
            values: [0; 2],
            tag,
            id,
        }
    }
}

impl SectionRecord for NamedRecord {
    const FIXED_SIZE: usize = 0x18 + NAMED_ZERO_FILL;

    fn read_record(reader: &mut ByteReader<'_>, index: usize) -> Result<Self> {
        let start = reader.position();
        let name_offset = reader.read::<u64>()?;
        let values = [reader.read::<u32>()?, reader.read::<u32>()?];
        let tag = reader.read::<u32>()?;
        let id = reader.read::<i32>()?;

        let fill_pos = reader.position();
        let fill = reader.read_bytes(NAMED_ZERO_FILL)?;
        if let Some(i) = fill.iter().position(|&b| b != 0) {
            return Err(Error::FormatViolation {
                field: format!("record[{index}].reserved"),
                position: fill_pos + i,
                expected: "0".to_string(),
                actual: fill[i].to_string(),
            });
        }

        let view = reader.view();
        let name_offset = usize::try_from(name_offset)
            .map_err(|_| Error::bounds(start, usize::MAX, view.len()))?;
        let name_pos = start
            .checked_add(name_offset)
            .ok_or_else(|| Error::bounds(start, name_offset, view.len()))?;
        let enc = utf16_for(view.endian());
        let raw = view.cstr_bytes_at(name_pos, enc)?;
        let name = view.utf16z_at(start, name_offset)?;

        // the name normally trails the fixed part; never move backwards
        let name_end = name_pos + raw.len() + enc.unit_width();
        if name_end > reader.position() {
            reader.seek(name_end)?;
        }

        Ok(Self {
            name,
            values,
            tag,
            id,
        })
    }

    fn write_record(&self, writer: &mut ByteWriter, ledger: &mut Ledger, index: usize) -> Result<()> {
        let start = writer.position();
        let slot = format!("record[{index}].name_offset");
        ledger.reserve(writer, slot.as_str(), 8)?;
        writer.write::<u32>(self.values[0]);
        writer.write::<u32>(self.values[1]);
        writer.write::<u32>(self.tag);
        writer.write::<i32>(self.id);
        writer.write_zeros(NAMED_ZERO_FILL);

        ledger.fill_relative(writer, &slot, start)?;
        writer.write_utf16z(&self.name)
    }
}

impl RecordTable<NamedRecord> {
    pub fn find_by_id(&self, id: i32) -> Option<&NamedRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&NamedRecord> {
        self.records.iter().find(|r| r.name == name)
    }
}

/// Sniffer for a [`NamedRecord`] section with a known version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTableKind {
    pub name: String,
    pub version: u32,
    pub endian: Endian,
}

impl NamedTableKind {
    pub fn new(name: impl Into<String>, version: u32, endian: Endian) -> Self {
        Self {
            name: name.into(),
            version,
            endian,
        }
    }

    fn check(&self, data: &[u8]) -> std::result::Result<(), &'static str> {
        let view = ByteView::new(data, self.endian);
        let count = view.peek::<u32>(0).ok_or("shorter than section header")? as usize;
        let version = view.peek::<u32>(4).ok_or("shorter than section header")?;
        if version != self.version {
            return Err("version mismatch");
        }
        let min_len = count
            .checked_mul(NamedRecord::FIXED_SIZE)
            .and_then(|n| n.checked_add(SECTION_HEADER_SIZE))
            .ok_or("record count overflow")?;
        if min_len > data.len() {
            return Err("records exceed buffer");
        }

        let enc = utf16_for(self.endian);
        let mut tag = None;
        let mut pos = SECTION_HEADER_SIZE;
        for _ in 0..count {
            let fixed = view
                .bytes(pos, NamedRecord::FIXED_SIZE)
                .map_err(|_| "record exceeds buffer")?;
            let name_offset = view.peek::<u64>(pos).ok_or("record exceeds buffer")?;
            let record_tag = view.peek::<u32>(pos + 0x10).ok_or("record exceeds buffer")?;
            if *tag.get_or_insert(record_tag) != record_tag {
                return Err("record tag differs");
            }
            if fixed[0x18..].iter().any(|&b| b != 0) {
                return Err("reserved record bytes are non-zero");
            }

            let name_pos = usize::try_from(name_offset)
                .ok()
                .and_then(|off| pos.checked_add(off))
                .ok_or("name offset overflow")?;
            let name = view
                .cstr_bytes_at(name_pos, enc)
                .map_err(|_| "name outside buffer")?;
            let end = (name_pos + name.len() + enc.unit_width()).max(pos + NamedRecord::FIXED_SIZE);
            pos = align_up(end, RECORD_ALIGNMENT);
        }
        if pos > data.len() {
            return Err("trailing padding missing");
        }
        Ok(())
    }
}

impl Sniff for NamedTableKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn sniff(&self, data: &[u8]) -> bool {
        verdict(&self.name, self.check(data))
    }
}
