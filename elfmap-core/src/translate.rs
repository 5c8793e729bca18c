//! Virtual address to file offset translation.
use crate::segments::SegmentRecord;

/// Returns the file offset backing `vaddr`, using the first record (in table
/// order) whose range `[virtual_address, virtual_address + file_size]`
/// contains it. The upper bound is inclusive and uses `file_size`, so memory
/// past the file-backed part of a segment never resolves.
///
/// Offsets near the top of the address space wrap rather than falling
/// through to a later record.
pub fn offset_of(records: &[SegmentRecord], vaddr: u64) -> Option<u64> {
    segment_for(records, vaddr).map(|r| r.file_offset.wrapping_add(vaddr - r.virtual_address))
}

/// The record `offset_of` would use for `vaddr`.
pub fn segment_for(records: &[SegmentRecord], vaddr: u64) -> Option<&SegmentRecord> {
    records.iter().find(|r| {
        vaddr
            .checked_sub(r.virtual_address)
            .is_some_and(|delta| delta <= r.file_size)
    })
}
