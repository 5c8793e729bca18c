//! Error taxonomy for ELF session, program header and section queries.
//!
//! "Nothing matched" is never an error here: address translation and section
//! lookups report that as `None`.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElfError {
    /// The header parser couldn't be set up, so no session exists.
    #[error("ELF parser unavailable")]
    ParserInit(#[source] goblin::error::Error),

    /// The file handle couldn't be read into a parser context.
    #[error("couldn't open file handle for ELF parsing")]
    Open(#[from] io::Error),

    /// The address class couldn't be determined. Sessions survive this with
    /// an unknown bit width.
    #[error("couldn't read ELF address class")]
    Classification(#[source] goblin::error::Error),

    #[error("couldn't read program header count")]
    HeaderCount(#[source] goblin::error::Error),

    #[error("couldn't read program header {index}")]
    HeaderRead {
        index: usize,
        #[source]
        source: goblin::error::Error,
    },

    #[error("section scan failed while {step}")]
    SectionScan {
        step: String,
        #[source]
        source: goblin::error::Error,
    },

    #[error("file is not an ELF relocatable, executable or shared object")]
    NotElf,

    #[error("ELF session is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ElfError>;
