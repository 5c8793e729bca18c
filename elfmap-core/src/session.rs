use crate::error::{ElfError, Result};
use crate::segments::ProgramHeaderCache;
use crate::source::elf::ElfSource;
use crate::source::{HeaderSource, ObjectKind};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

/// Address class of the analyzed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitWidth {
    Bits32,
    Bits64,
    Unknown,
}

impl BitWidth {
    /// Renders a virtual address at the width of the file's address class.
    /// Unknown widths fall back to 64 bits.
    pub fn format_address(self, addr: u64) -> String {
        match self {
            BitWidth::Bits32 => format!("0x{addr:08x}"),
            BitWidth::Bits64 | BitWidth::Unknown => format!("0x{addr:016x}"),
        }
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitWidth::Bits32 => write!(f, "32"),
            BitWidth::Bits64 => write!(f, "64"),
            BitWidth::Unknown => write!(f, "unknown"),
        }
    }
}

/// File offsets are 64-bit in every ELF class, so they always get 16 digits.
pub fn format_offset(offset: u64) -> String {
    format!("0x{offset:016x}")
}

#[derive(Debug)]
enum State {
    Elf(Box<dyn HeaderSource>),
    NotElf,
    Closed,
}

/// One file under analysis. Owns the header source and the program header
/// cache built from it.
#[derive(Debug)]
pub struct ElfSession {
    state: State,
    bit_width: BitWidth,
    ident: Option<Vec<u8>>,
    cache: ProgramHeaderCache,
}

impl ElfSession {
    /// Reads the whole of `file` (from offset 0) and classifies it. The
    /// caller keeps ownership of the handle.
    pub fn open<R: Read + Seek>(file: &mut R) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        log::debug!("Read {} bytes for ELF parsing", bytes.len());

        Self::from_source(Box::new(ElfSource::new(bytes)))
    }

    /// Initializes and classifies an already constructed header source.
    /// Sources that aren't ELF produce an inert session.
    pub fn from_source(source: Box<dyn HeaderSource>) -> Result<Self> {
        source.init().map_err(ElfError::ParserInit)?;

        if source.kind() != ObjectKind::Elf {
            log::info!("No ELF header present");
            return Ok(ElfSession {
                state: State::NotElf,
                bit_width: BitWidth::Unknown,
                ident: None,
                cache: ProgramHeaderCache::new(),
            });
        }

        let bit_width = match source.class() {
            Ok(width) => width,
            Err(err) => {
                let err = ElfError::Classification(err);
                log::warn!("{err}: {}", err_cause(&err));
                BitWidth::Unknown
            }
        };

        let ident = source.ident().map(<[u8]>::to_vec);
        if ident.is_none() {
            log::warn!("ELF identification bytes unavailable");
        }

        log::info!("Opened {bit_width}-bit ELF object");
        Ok(ElfSession {
            state: State::Elf(source),
            bit_width,
            ident,
            cache: ProgramHeaderCache::new(),
        })
    }

    pub fn is_elf(&self) -> bool {
        matches!(self.state, State::Elf(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    pub fn bit_width(&self) -> BitWidth {
        self.bit_width
    }

    pub fn identification_bytes(&self) -> Option<&[u8]> {
        self.ident.as_deref()
    }

    /// The header source, or a fail-fast error for inert and closed sessions.
    pub fn source(&self) -> Result<&dyn HeaderSource> {
        match &self.state {
            State::Elf(source) => Ok(source.as_ref()),
            State::NotElf => Err(ElfError::NotElf),
            State::Closed => Err(ElfError::Closed),
        }
    }

    /// Parses the program header table into this session's cache.
    ///
    /// Rebuilding replaces the previous contents. On a header read failure
    /// the entries read before the failing index stay in the cache.
    pub fn build_cache(&mut self) -> Result<&ProgramHeaderCache> {
        let source = match &self.state {
            State::Elf(source) => source.as_ref(),
            State::NotElf => return Err(ElfError::NotElf),
            State::Closed => return Err(ElfError::Closed),
        };
        if !self.cache.is_empty() {
            log::debug!("Discarding {} cached program headers", self.cache.len());
            self.cache.clear();
        }
        self.cache.load(source)?;
        Ok(&self.cache)
    }

    /// The program header cache; empty until `build_cache` runs.
    pub fn program_headers(&self) -> &ProgramHeaderCache {
        &self.cache
    }

    /// Releases the cache and the header source. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.cache.clear();
        self.ident = None;
        self.state = State::Closed;
        log::debug!("ELF session closed");
    }
}

fn err_cause(err: &ElfError) -> String {
    std::error::Error::source(err)
        .map(|cause| cause.to_string())
        .unwrap_or_default()
}
