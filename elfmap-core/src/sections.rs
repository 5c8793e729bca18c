//! Section header lookups. Nothing here is cached: every query re-scans the
//! section header table.
use crate::error::{ElfError, Result};
use crate::session::ElfSession;
use crate::source::HeaderSource;

/// One section header as seen during a single scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub name: String,
    pub file_offset: u64,
    pub virtual_address: u64,
    pub size: u64,
}

/// Lazy walk over the section header table in table order, starting after
/// the null section. Yields at most one error, after which it is exhausted.
#[derive(Debug)]
pub struct Sections<'a> {
    source: &'a dyn HeaderSource,
    names: usize,
    index: usize,
    count: usize,
}

impl<'a> Sections<'a> {
    fn new(source: &'a dyn HeaderSource) -> Result<Self> {
        let names = source
            .section_name_table()
            .map_err(|source| scan_error("resolving the section name table".to_string(), source))?;
        let count = source
            .section_count()
            .map_err(|source| scan_error("reading the section count".to_string(), source))?;
        Ok(Sections {
            source,
            names,
            index: 1,
            count,
        })
    }

    fn read(&self, index: usize) -> Result<SectionDescriptor> {
        let sh = self
            .source
            .section_header(index)
            .map_err(|source| scan_error(format!("reading section {index}"), source))?;
        let name = self
            .source
            .string_at(self.names, sh.sh_name)
            .map_err(|source| scan_error(format!("resolving the name of section {index}"), source))?;
        Ok(SectionDescriptor {
            name,
            file_offset: sh.sh_offset,
            virtual_address: sh.sh_addr,
            size: sh.sh_size,
        })
    }
}

fn scan_error(step: String, source: goblin::error::Error) -> ElfError {
    ElfError::SectionScan { step, source }
}

impl Iterator for Sections<'_> {
    type Item = Result<SectionDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let result = self.read(self.index);
        self.index = if result.is_ok() {
            self.index + 1
        } else {
            self.count
        };
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count.saturating_sub(self.index)))
    }
}

impl ElfSession {
    /// Starts a fresh scan of the section header table.
    pub fn enumerate_sections(&self) -> Result<Sections<'_>> {
        Sections::new(self.source()?)
    }

    /// The first section named exactly `name`, in table order.
    pub fn find_section(&self, name: &str) -> Result<Option<SectionDescriptor>> {
        for section in self.enumerate_sections()? {
            let section = section?;
            if section.name == name {
                return Ok(Some(section));
            }
        }
        log::debug!("No section named {name}");
        Ok(None)
    }

    /// File offset of the section named `name`.
    pub fn find_offset(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.find_section(name)?.map(|s| s.file_offset))
    }

    /// Size in bytes of the section named `name`.
    pub fn find_size(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.find_section(name)?.map(|s| s.size))
    }
}
