use super::{HeaderSource, ObjectKind, SourceResult};
use crate::session::BitWidth;
use goblin::container::Ctx;
use goblin::elf::header::{
    EI_CLASS, EI_DATA, EI_VERSION, ELFCLASS32, ELFCLASS64, ELFDATA2MSB, ELFMAG, ET_DYN, ET_EXEC,
    ET_REL, SIZEOF_IDENT,
};
use goblin::elf::section_header::SHT_STRTAB;
use goblin::elf::{Elf, Header, ProgramHeader, SectionHeader};
use goblin::error::Error as GoblinError;
use std::fmt;

const EV_CURRENT: u8 = 1;

/// Size of the smallest (32-bit) ELF header.
const MIN_HEADER_SIZE: usize = 52;

/// `e_phnum` escape value: the real count lives in section 0's `sh_info`.
const PN_XNUM: u16 = 0xffff;

/// `e_shstrndx` escape value: the real index lives in section 0's `sh_link`.
const SHN_XINDEX: u16 = 0xffff;

/// `HeaderSource` backed by goblin over an in-memory copy of the file.
pub struct ElfSource {
    bytes: Vec<u8>,
    /// `e_type`, present when the file starts with the ELF magic and is long
    /// enough to hold a header.
    e_type: Option<u16>,
    /// goblin's view of the header; absent when the identification bytes
    /// don't describe a layout goblin can decode.
    header: Option<Header>,
}

impl ElfSource {
    /// Object kind comes from the magic and `e_type` alone, so a file with a
    /// bad class or version byte is still ELF; it just can't be classified.
    pub fn new(bytes: Vec<u8>) -> Self {
        if !bytes.starts_with(ELFMAG) || bytes.len() < MIN_HEADER_SIZE {
            log::debug!("No ELF header present");
            return ElfSource {
                bytes,
                e_type: None,
                header: None,
            };
        }

        // e_type sits right after the identification bytes in both classes.
        let raw = [bytes[SIZEOF_IDENT], bytes[SIZEOF_IDENT + 1]];
        let e_type = if bytes[EI_DATA] == ELFDATA2MSB {
            u16::from_be_bytes(raw)
        } else {
            u16::from_le_bytes(raw)
        };

        let header = match Elf::parse_header(&bytes) {
            Ok(header) => Some(header),
            Err(err) => {
                log::warn!("ELF header can't be decoded: {err}");
                None
            }
        };
        ElfSource {
            bytes,
            e_type: Some(e_type),
            header,
        }
    }

    fn parsed(&self) -> SourceResult<(&Header, Ctx)> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| GoblinError::Malformed("no ELF header".to_string()))?;
        let ctx = Ctx::new(header.container()?, header.endianness()?);
        Ok((header, ctx))
    }

    fn read_section(&self, index: usize) -> SourceResult<SectionHeader> {
        let (header, ctx) = self.parsed()?;
        if header.e_shoff == 0 {
            return Err(GoblinError::Malformed(
                "file has no section header table".to_string(),
            ));
        }
        let offset = table_offset(header.e_shoff, header.e_shentsize, index)?;
        SectionHeader::parse(&self.bytes, offset, 1, ctx)?
            .pop()
            .ok_or_else(|| GoblinError::Malformed(format!("section header {index} is missing")))
    }
}

fn table_offset(base: u64, entry_size: u16, index: usize) -> SourceResult<usize> {
    (index as u64)
        .checked_mul(entry_size as u64)
        .and_then(|delta| base.checked_add(delta))
        .and_then(|offset| usize::try_from(offset).ok())
        .ok_or_else(|| {
            GoblinError::Malformed(format!("table entry {index} lies outside the address space"))
        })
}

impl HeaderSource for ElfSource {
    fn kind(&self) -> ObjectKind {
        match self.e_type {
            Some(ET_REL | ET_EXEC | ET_DYN) => ObjectKind::Elf,
            _ => ObjectKind::Other,
        }
    }

    fn class(&self) -> SourceResult<BitWidth> {
        let ident = self
            .ident()
            .ok_or_else(|| GoblinError::Malformed("no ELF header".to_string()))?;
        if ident[EI_VERSION] != EV_CURRENT {
            return Err(GoblinError::Malformed(format!(
                "unsupported ELF version {}",
                ident[EI_VERSION]
            )));
        }
        match ident[EI_CLASS] {
            ELFCLASS32 => Ok(BitWidth::Bits32),
            ELFCLASS64 => Ok(BitWidth::Bits64),
            class => Err(GoblinError::Malformed(format!("invalid ELF class {class}"))),
        }
    }

    fn ident(&self) -> Option<&[u8]> {
        self.e_type.map(|_| &self.bytes[..SIZEOF_IDENT])
    }

    fn program_header_count(&self) -> SourceResult<usize> {
        let (header, _) = self.parsed()?;
        if header.e_phnum == PN_XNUM {
            Ok(self.read_section(0)?.sh_info as usize)
        } else {
            Ok(header.e_phnum as usize)
        }
    }

    fn program_header(&self, index: usize) -> SourceResult<ProgramHeader> {
        let count = self.program_header_count()?;
        if index >= count {
            return Err(GoblinError::Malformed(format!(
                "program header {index} out of range ({count} entries)"
            )));
        }
        let (header, ctx) = self.parsed()?;
        let offset = table_offset(header.e_phoff, header.e_phentsize, index)?;
        ProgramHeader::parse(&self.bytes, offset, 1, ctx)?
            .pop()
            .ok_or_else(|| GoblinError::Malformed(format!("program header {index} is missing")))
    }

    fn section_count(&self) -> SourceResult<usize> {
        let (header, _) = self.parsed()?;
        if header.e_shoff == 0 {
            Ok(0)
        } else if header.e_shnum == 0 {
            Ok(self.read_section(0)?.sh_size as usize)
        } else {
            Ok(header.e_shnum as usize)
        }
    }

    fn section_header(&self, index: usize) -> SourceResult<SectionHeader> {
        let count = self.section_count()?;
        if index >= count {
            return Err(GoblinError::Malformed(format!(
                "section {index} out of range ({count} entries)"
            )));
        }
        self.read_section(index)
    }

    fn section_name_table(&self) -> SourceResult<usize> {
        let (header, _) = self.parsed()?;
        if header.e_shstrndx == SHN_XINDEX {
            Ok(self.read_section(0)?.sh_link as usize)
        } else {
            Ok(header.e_shstrndx as usize)
        }
    }

    fn string_at(&self, table: usize, offset: usize) -> SourceResult<String> {
        let sh = self.section_header(table)?;
        if sh.sh_type != SHT_STRTAB {
            return Err(GoblinError::Malformed(format!(
                "section {table} is not a string table"
            )));
        }
        // Only the one name is sliced out; other entries are never decoded.
        let start = usize::try_from(sh.sh_offset)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .filter(|_| (offset as u64) < sh.sh_size);
        let end = usize::try_from(sh.sh_offset.saturating_add(sh.sh_size))
            .map_or(self.bytes.len(), |end| end.min(self.bytes.len()));
        let name = start
            .and_then(|start| self.bytes.get(start..end))
            .and_then(|tail| tail.iter().position(|&b| b == 0).map(|nul| &tail[..nul]))
            .ok_or_else(|| {
                GoblinError::Malformed(format!("no string at offset {offset} in section {table}"))
            })?;
        Ok(String::from_utf8_lossy(name).into_owned())
    }
}

impl fmt::Debug for ElfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElfSource")
            .field("len", &self.bytes.len())
            .field("header", &self.header)
            .finish()
    }
}
