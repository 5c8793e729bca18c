use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use elfmap_core::{
    format_offset, BitWidth, ElfSession, ProgramHeaderCache, SectionDescriptor, SegmentRecord,
};
use serde::Serialize;
use std::process::ExitCode;
use tabled::{settings::Style, Table, Tabled};

/// Map ELF virtual addresses to file offsets
#[derive(Parser)]
#[command(
    name = "elfmap",
    about = "Inspect ELF program and section headers and translate virtual addresses",
    version,
    author
)]
struct Cli {
    /// Path to binary file
    #[arg(required = true)]
    path: std::path::PathBuf,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show ELF class and identification bytes
    Info,
    /// Show the program header table
    Pht,
    /// Show the section header table
    Sht,
    /// Translate a virtual address into a file offset
    Offset {
        /// Address, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_address)]
        vaddr: u64,
    },
    /// Show the file offset and size of a section
    Section { name: String },
}

fn parse_address(arg: &str) -> Result<u64, String> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.map_err(|err| format!("invalid address {arg:?}: {err}"))
}

#[derive(Tabled, Serialize)]
struct SegmentRow {
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "Virtual")]
    vaddr: String,
    #[tabled(rename = "Flags")]
    flags: String,
    #[tabled(rename = "Type")]
    stype: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl SegmentRow {
    fn new(record: &SegmentRecord, width: BitWidth) -> Self {
        let stype = if record.is_known_type() {
            record.segment_type.short_name.to_string()
        } else {
            format!("{} ({:#x})", record.segment_type.short_name, record.type_code)
        };
        SegmentRow {
            offset: format_offset(record.file_offset),
            vaddr: width.format_address(record.virtual_address),
            flags: record.flags.to_string(),
            stype,
            description: record.segment_type.description.to_string(),
        }
    }
}

#[derive(Tabled, Serialize)]
struct SectionRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "Virtual")]
    vaddr: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl SectionRow {
    fn new(section: &SectionDescriptor, width: BitWidth) -> Self {
        SectionRow {
            name: section.name.clone(),
            offset: format_offset(section.file_offset),
            vaddr: width.format_address(section.virtual_address),
            size: format!("{:#x}", section.size),
        }
    }
}

#[derive(Serialize)]
struct Info {
    elf: bool,
    bits: String,
    ident: Option<String>,
}

#[derive(Serialize)]
struct OffsetResult {
    vaddr: u64,
    offset: Option<u64>,
    segment: Option<&'static str>,
}

impl OffsetResult {
    fn resolve(cache: &ProgramHeaderCache, vaddr: u64) -> Self {
        OffsetResult {
            vaddr,
            offset: cache.offset_of(vaddr),
            segment: cache.segment_for(vaddr).map(|r| r.segment_type.short_name),
        }
    }
}

#[derive(Serialize)]
struct SectionResult<'a> {
    name: &'a str,
    offset: Option<u64>,
    size: Option<u64>,
}

fn print_rows<T: Tabled + Serialize>(rows: &[T], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else {
        let mut table = Table::new(rows);
        table.with(Style::psql());
        println!("{table}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run(cli: &Cli, session: &mut ElfSession) -> Result<bool> {
    match &cli.command {
        Command::Info => {
            let info = Info {
                elf: session.is_elf(),
                bits: session.bit_width().to_string(),
                ident: session.identification_bytes().map(hex_bytes),
            };
            if cli.json {
                print_json(&info)?;
            } else {
                println!("ELF:   {}", info.elf);
                println!("Bits:  {}", info.bits);
                println!("Ident: {}", info.ident.as_deref().unwrap_or("-"));
            }
        }

        Command::Pht => {
            let width = session.bit_width();
            let cache = session
                .build_cache()
                .context("couldn't parse the program header table")?;
            let rows: Vec<_> = cache.iter().map(|r| SegmentRow::new(r, width)).collect();
            if rows.is_empty() && !cli.json {
                println!("No program headers found.");
            } else {
                print_rows(&rows, cli.json)?;
            }
        }

        Command::Sht => {
            let width = session.bit_width();
            let sections = session
                .enumerate_sections()?
                .collect::<Result<Vec<_>, _>>()
                .context("couldn't scan the section header table")?;
            let rows: Vec<_> = sections.iter().map(|s| SectionRow::new(s, width)).collect();
            if rows.is_empty() && !cli.json {
                println!("No sections found (possibly stripped binary).");
            } else {
                if !cli.json {
                    println!("Found {} section header records:", rows.len());
                }
                print_rows(&rows, cli.json)?;
            }
        }

        Command::Offset { vaddr } => {
            session
                .build_cache()
                .context("couldn't parse the program header table")?;
            let result = OffsetResult::resolve(session.program_headers(), *vaddr);
            if cli.json {
                print_json(&result)?;
            }
            match result.offset {
                Some(offset) if !cli.json => println!(
                    "  offset_of({}) = {} ({})",
                    format_offset(*vaddr),
                    format_offset(offset),
                    result.segment.unwrap_or("???")
                ),
                Some(_) => {}
                None => {
                    eprintln!("{}", "could not find offset from vaddr".yellow());
                    return Ok(false);
                }
            }
        }

        Command::Section { name } => {
            let section = session.find_section(name)?;
            if cli.json {
                print_json(&SectionResult {
                    name,
                    offset: section.as_ref().map(|s| s.file_offset),
                    size: section.as_ref().map(|s| s.size),
                })?;
            }
            match section {
                Some(s) if !cli.json => {
                    println!("{name}: offset {}, size {:#x}", format_offset(s.file_offset), s.size);
                }
                Some(_) => {}
                None => {
                    eprintln!("{}", format!("no section named {name}").yellow());
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    let mut file = std::fs::File::open(&cli.path)
        .with_context(|| format!("couldn't open {}", cli.path.display()))?;
    let mut session = ElfSession::open(&mut file)
        .with_context(|| format!("couldn't parse {}", cli.path.display()))?;

    if !session.is_elf() && !matches!(cli.command, Command::Info) {
        eprintln!("{}", format!("{} is not an ELF file", cli.path.display()).red());
        return Ok(ExitCode::FAILURE);
    }

    let found = run(&cli, &mut session);
    session.close();
    log::debug!("Closed {}", cli.path.display());

    match found {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            Ok(ExitCode::FAILURE)
        }
    }
}
