pub mod elf;

use crate::session::BitWidth;
use goblin::elf::{ProgramHeader, SectionHeader};

pub type SourceResult<T> = std::result::Result<T, goblin::error::Error>;

/// What kind of object a header source was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A relocatable, executable or shared ELF object.
    Elf,
    /// Anything else, including ELF core files.
    Other,
}

/// Low-level header access for one parsed file. Sessions own exactly one of
/// these and never touch the file bytes directly.
pub trait HeaderSource: std::fmt::Debug + Send + Sync {
    /// One-time parser setup, run before anything else is queried. Sources
    /// with nothing to negotiate keep the default.
    fn init(&self) -> SourceResult<()> {
        Ok(())
    }

    fn kind(&self) -> ObjectKind;

    /// Address class from the identification bytes.
    fn class(&self) -> SourceResult<BitWidth>;

    /// Raw `e_ident` bytes, if the file has them.
    fn ident(&self) -> Option<&[u8]>;

    /// Number of program header entries.
    fn program_header_count(&self) -> SourceResult<usize>;

    /// Reads the program header at `index` in table order.
    fn program_header(&self, index: usize) -> SourceResult<ProgramHeader>;

    /// Number of section header entries, including the null section 0.
    fn section_count(&self) -> SourceResult<usize>;

    fn section_header(&self, index: usize) -> SourceResult<SectionHeader>;

    /// Index of the section holding section names.
    fn section_name_table(&self) -> SourceResult<usize>;

    /// Resolves a name at `offset` inside string table section `table`.
    fn string_at(&self, table: usize, offset: usize) -> SourceResult<String>;
}
