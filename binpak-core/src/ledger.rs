//! Reservation ledger for two-pass writing.
//!
//! A writer stakes out a named, zero-filled slot for a value it cannot know
//! yet (an offset, a running size), keeps emitting bytes, and fills the slot
//! once the value is known. Every reservation must be filled exactly once
//! before [`Ledger::finish`].
//!
//! ```
//! use binpak_core::{io::ByteWriter, ledger::Ledger, Endian};
//!
//! let mut w = ByteWriter::new(Endian::Little);
//! let mut ledger = Ledger::new();
//! ledger.reserve(&mut w, "data_offset", 4)?;
//! w.write_bytes(b"...");
//! ledger.fill_position(&mut w, "data_offset")?;
//! w.write_bytes(b"payload");
//! ledger.finish()?;
//! assert_eq!(&w.as_slice()[..4], &7u32.to_le_bytes());
//! # Ok::<(), binpak_core::Error>(())
//! ```

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::io::ByteWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub position: usize,
    pub width: usize,
}

#[derive(Debug, Default)]
pub struct Ledger {
    slots: HashMap<String, Slot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `width` zero bytes at the writer's position and remember them as `name`.
    pub fn reserve(
        &mut self,
        writer: &mut ByteWriter,
        name: impl Into<String>,
        width: usize,
    ) -> Result<Slot> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(Error::SlotWidth(width));
        }
        let name = name.into();
        if self.slots.contains_key(&name) {
            return Err(Error::DuplicateReservation(name));
        }

        let slot = Slot {
            position: writer.position(),
            width,
        };
        writer.write_zeros(width);
        log::trace!("reserve `{}` at 0x{:X} ({} bytes)", name, slot.position, width);
        self.slots.insert(name, slot);
        Ok(slot)
    }

    /// Write `value` into the slot and consume the reservation.
    ///
    /// A value that does not fit the slot width is rejected and the slot stays
    /// pending.
    pub fn fill(&mut self, writer: &mut ByteWriter, name: &str, value: u64) -> Result<()> {
        let slot = *self
            .slots
            .get(name)
            .ok_or_else(|| Error::UnknownReservation(name.to_string()))?;

        let overflow = || Error::SlotOverflow {
            name: name.to_string(),
            width: slot.width,
            value,
        };
        match slot.width {
            1 => writer.write_at(slot.position, u8::try_from(value).map_err(|_| overflow())?)?,
            2 => writer.write_at(slot.position, u16::try_from(value).map_err(|_| overflow())?)?,
            4 => writer.write_at(slot.position, u32::try_from(value).map_err(|_| overflow())?)?,
            _ => writer.write_at(slot.position, value)?,
        }

        log::trace!("fill `{}` at 0x{:X} = 0x{:X}", name, slot.position, value);
        self.slots.remove(name);
        Ok(())
    }

    /// Fill with the writer's current absolute position.
    pub fn fill_position(&mut self, writer: &mut ByteWriter, name: &str) -> Result<()> {
        let pos = writer.position() as u64;
        self.fill(writer, name, pos)
    }

    /// Fill with the distance from `base` to the writer's current position.
    pub fn fill_relative(&mut self, writer: &mut ByteWriter, name: &str, base: usize) -> Result<()> {
        let rel = writer.position().saturating_sub(base) as u64;
        self.fill(writer, name, rel)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.slots.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pending names, sorted.
    pub fn outstanding(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.keys().cloned().collect();
        names.sort();
        names
    }

    /// End of a write pass: every reservation must have been filled.
    pub fn finish(self) -> Result<()> {
        if self.slots.is_empty() {
            return Ok(());
        }
        let names = self.outstanding();
        log::error!("unfilled reservations: {:?}", names);
        Err(Error::UnfilledReservation(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::Endian;

    #[test]
    fn reserve_then_fill_out_of_order() {
        let mut w = ByteWriter::new(Endian::Little);
        let mut ledger = Ledger::new();
        ledger.reserve(&mut w, "a", 4).unwrap();
        ledger.reserve(&mut w, "b", 2).unwrap();
        w.write::<u8>(0xCC);
        assert_eq!(w.as_slice(), &[0, 0, 0, 0, 0, 0, 0xCC]);

        ledger.fill(&mut w, "b", 0x0102).unwrap();
        ledger.fill(&mut w, "a", 0x0A0B0C0D).unwrap();
        assert_eq!(w.as_slice(), &[0x0D, 0x0C, 0x0B, 0x0A, 0x02, 0x01, 0xCC]);
        assert_eq!(w.position(), 7);
        ledger.finish().unwrap();
    }

    #[test]
    fn fill_without_reserve_is_rejected() {
        let mut w = ByteWriter::new(Endian::Little);
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.fill(&mut w, "missing", 1),
            Err(Error::UnknownReservation(name)) if name == "missing"
        ));
    }

    #[test]
    fn double_reserve_is_rejected() {
        let mut w = ByteWriter::new(Endian::Little);
        let mut ledger = Ledger::new();
        ledger.reserve(&mut w, "x", 4).unwrap();
        assert!(matches!(
            ledger.reserve(&mut w, "x", 4),
            Err(Error::DuplicateReservation(_))
        ));
        // the rejected reservation wrote nothing
        assert_eq!(w.position(), 4);
    }

    #[test]
    fn name_is_reusable_after_fill() {
        let mut w = ByteWriter::new(Endian::Little);
        let mut ledger = Ledger::new();
        ledger.reserve(&mut w, "x", 1).unwrap();
        ledger.fill(&mut w, "x", 1).unwrap();
        ledger.reserve(&mut w, "x", 1).unwrap();
        ledger.fill(&mut w, "x", 2).unwrap();
        assert!(matches!(ledger.fill(&mut w, "x", 3), Err(Error::UnknownReservation(_))));
        assert_eq!(w.into_inner(), vec![1, 2]);
    }

    #[test]
    fn finish_lists_unfilled_slots() {
        let mut w = ByteWriter::new(Endian::Little);
        let mut ledger = Ledger::new();
        ledger.reserve(&mut w, "z", 4).unwrap();
        ledger.reserve(&mut w, "a", 4).unwrap();
        ledger.reserve(&mut w, "m", 4).unwrap();
        ledger.fill(&mut w, "m", 0).unwrap();
        match ledger.finish() {
            Err(Error::UnfilledReservation(names)) => assert_eq!(names, vec!["a", "z"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn overflowing_value_keeps_slot_pending() {
        let mut w = ByteWriter::new(Endian::Big);
        let mut ledger = Ledger::new();
        ledger.reserve(&mut w, "tiny", 1).unwrap();
        assert!(matches!(
            ledger.fill(&mut w, "tiny", 256),
            Err(Error::SlotOverflow { width: 1, value: 256, .. })
        ));
        assert!(ledger.is_pending("tiny"));
        ledger.fill(&mut w, "tiny", 255).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn relative_and_position_fills() {
        let mut w = ByteWriter::new(Endian::Little);
        let mut ledger = Ledger::new();
        w.write_zeros(8);
        let base = w.position();
        ledger.reserve(&mut w, "rel", 8).unwrap();
        ledger.reserve(&mut w, "abs", 4).unwrap();
        w.write_zeros(4);
        ledger.fill_relative(&mut w, "rel", base).unwrap();
        ledger.fill_position(&mut w, "abs").unwrap();
        let out = w.into_inner();
        assert_eq!(u64::from_le_bytes(out[8..16].try_into().unwrap()), 16);
        assert_eq!(u32::from_le_bytes(out[16..20].try_into().unwrap()), 24);
    }

    #[test]
    fn odd_widths_are_rejected() {
        let mut w = ByteWriter::new(Endian::Little);
        let mut ledger = Ledger::new();
        assert!(matches!(ledger.reserve(&mut w, "x", 3), Err(Error::SlotWidth(3))));
        assert!(ledger.is_empty());
    }
}
