//! In-memory model of an ELF file's program header and section header
//! tables, answering "which file offset backs virtual address V?" and
//! section offset/size lookups by name.
pub mod error;
pub mod segment_type;
pub mod sections;
pub mod segments;
pub mod session;
pub mod source;
pub mod translate;

pub use error::*;
pub use sections::*;
pub use segment_type::{lookup, SegmentTypeDescriptor, SEGMENT_TYPES, UNKNOWN_SEGMENT_TYPE};
pub use segments::*;
pub use session::*;
pub use source::elf::ElfSource;
pub use source::{HeaderSource, ObjectKind};
