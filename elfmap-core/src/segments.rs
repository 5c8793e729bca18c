//! Program header table cache. Segments are what the loader maps into memory;
//! sections are separate, see `sections`.
use crate::error::{ElfError, Result};
use crate::segment_type::{self, SegmentTypeDescriptor, UNKNOWN_SEGMENT_TYPE};
use crate::source::HeaderSource;
use crate::translate;
use bitflags::bitflags;
use goblin::elf::program_header::{PF_R, PF_W, PF_X};
use goblin::elf::ProgramHeader;
use std::fmt;

bitflags! {
    /// `p_flags` permission bits. Unrecognized bits are retained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u32 {
        const EXECUTE = PF_X;
        const WRITE = PF_W;
        const READ = PF_R;
    }
}

/// Renders `flags` as "R", "W", "X" in that order, packed to the left of a
/// four byte buffer with the rest zero-filled.
pub fn flags_to_string(flags: SegmentFlags) -> [u8; 4] {
    let mut buf = [0u8; 4];
    let mut len = 0;
    for (flag, ch) in [
        (SegmentFlags::READ, b'R'),
        (SegmentFlags::WRITE, b'W'),
        (SegmentFlags::EXECUTE, b'X'),
    ] {
        if flags.contains(flag) {
            buf[len] = ch;
            len += 1;
        }
    }
    buf
}

impl fmt::Display for SegmentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in flags_to_string(*self).into_iter().take_while(|&ch| ch != 0) {
            write!(f, "{}", ch as char)?;
        }
        Ok(())
    }
}

/// One program header, copied verbatim from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    /// Registry entry, or `UNKNOWN_SEGMENT_TYPE`.
    pub segment_type: &'static SegmentTypeDescriptor,

    /// Raw `p_type`, kept for types the registry doesn't know.
    pub type_code: u32,

    pub flags: SegmentFlags,

    /// Offset to the first byte of the segment in the file.
    pub file_offset: u64,

    /// Virtual address of the first byte of the segment once loaded.
    pub virtual_address: u64,

    /// Number of bytes backed by file content.
    pub file_size: u64,

    /// Number of bytes the segment occupies in memory.
    pub memory_size: u64,
}

impl SegmentRecord {
    pub fn from_header(ph: &ProgramHeader) -> Self {
        let segment_type = segment_type::lookup(ph.p_type as i64).unwrap_or(&UNKNOWN_SEGMENT_TYPE);
        SegmentRecord {
            segment_type,
            type_code: ph.p_type,
            flags: SegmentFlags::from_bits_retain(ph.p_flags),
            file_offset: ph.p_offset,
            virtual_address: ph.p_vaddr,
            file_size: ph.p_filesz,
            memory_size: ph.p_memsz,
        }
    }

    pub fn is_known_type(&self) -> bool {
        !std::ptr::eq(self.segment_type, &UNKNOWN_SEGMENT_TYPE)
    }
}

/// Segment records in program header table order. Nothing is sorted, merged
/// or de-duplicated.
#[derive(Debug, Default, Clone)]
pub struct ProgramHeaderCache {
    records: Vec<SegmentRecord>,
}

impl ProgramHeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every program header from `source`, returning how many were
    /// added. A failing read stops the load but earlier entries stay.
    pub fn load(&mut self, source: &dyn HeaderSource) -> Result<usize> {
        let count = source
            .program_header_count()
            .map_err(ElfError::HeaderCount)?;
        log::debug!("Parsing {count} program headers");

        for index in 0..count {
            if let Err(err) = self.load_index(source, index) {
                log::warn!(
                    "Program header parse stopped at {index}; keeping {} entries",
                    self.records.len()
                );
                return Err(err);
            }
        }

        log::info!("Cached {count} program headers");
        Ok(count)
    }

    /// Reads and appends the single program header at `index`. `load` is a
    /// loop over this, so callers wanting to interleave their own checks
    /// between entries can drive it themselves.
    pub fn load_index(&mut self, source: &dyn HeaderSource, index: usize) -> Result<&SegmentRecord> {
        let ph = source
            .program_header(index)
            .map_err(|source| ElfError::HeaderRead { index, source })?;
        self.records.push(SegmentRecord::from_header(&ph));
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SegmentRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentRecord> {
        self.records.iter()
    }

    /// File offset backing `vaddr`, see `translate::offset_of`.
    pub fn offset_of(&self, vaddr: u64) -> Option<u64> {
        translate::offset_of(&self.records, vaddr)
    }

    /// The record `offset_of` resolves `vaddr` through.
    pub fn segment_for(&self, vaddr: u64) -> Option<&SegmentRecord> {
        translate::segment_for(&self.records, vaddr)
    }
}

impl<'a> IntoIterator for &'a ProgramHeaderCache {
    type Item = &'a SegmentRecord;
    type IntoIter = std::slice::Iter<'a, SegmentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
