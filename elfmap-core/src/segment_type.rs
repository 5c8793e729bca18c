//! Static registry of program header segment types.
use goblin::elf::program_header::{
    PT_DYNAMIC, PT_GNU_EH_FRAME, PT_GNU_RELRO, PT_GNU_STACK, PT_HIOS, PT_HIPROC, PT_INTERP,
    PT_LOAD, PT_LOOS, PT_LOPROC, PT_NOTE, PT_NULL, PT_PHDR, PT_SHLIB, PT_TLS,
};

const PT_GNU_PROPERTY: u32 = 0x6474e553;
const PT_LOSUNW: u32 = 0x6ffffffa;
const PT_SUNWBSS: u32 = 0x6ffffffa;
const PT_SUNWSTACK: u32 = 0x6ffffffb;
const PT_HISUNW: u32 = 0x6fffffff;

/// Canonical name and description for one segment type code.
#[derive(Debug, PartialEq, Eq)]
pub struct SegmentTypeDescriptor {
    /// The `p_type` value, or -1 for the unknown sentinel.
    pub code: i64,
    pub short_name: &'static str,
    pub description: &'static str,
}

const fn entry(
    code: u32,
    short_name: &'static str,
    description: &'static str,
) -> SegmentTypeDescriptor {
    SegmentTypeDescriptor {
        code: code as i64,
        short_name,
        description,
    }
}

/// Known segment types. Some codes are registered twice under different
/// names (the Sun range overlaps the OS range); lookups return the first.
pub static SEGMENT_TYPES: [SegmentTypeDescriptor; 20] = [
    entry(PT_NULL, "PT_NULL", "Unused"),
    entry(PT_LOAD, "PT_LOAD", "Loadable segment"),
    entry(PT_DYNAMIC, "PT_DYNAMIC", "Dynamic linking info"),
    entry(PT_INTERP, "PT_INTERP", "Interpreter field"),
    entry(PT_NOTE, "PT_NOTE", "Auxiliary info"),
    entry(PT_SHLIB, "PT_SHLIB", "Non-standard"),
    entry(PT_PHDR, "PT_PHDR", "PHT size"),
    entry(PT_TLS, "PT_TLS", "Thread local storage"),
    entry(PT_LOOS, "PT_LOOS", "System specific (lo/start mark)"),
    entry(PT_HIOS, "PT_HIOS", "System specific (hi/end mark)"),
    entry(PT_LOPROC, "PT_LOPROC", "CPU specific (lo/start mark)"),
    entry(PT_HIPROC, "PT_HIPROC", "CPU specific (hi/end mark)"),
    entry(PT_GNU_EH_FRAME, "PT_GNU_EH_FRAME", "GCC .eh_frame_hdr segment"),
    entry(PT_GNU_STACK, "PT_GNU_STACK", "Indicates stack executability"),
    entry(PT_GNU_RELRO, "PT_GNU_RELRO", "Read-only after relocation"),
    entry(PT_GNU_PROPERTY, "PT_GNU_PROPERTY", "GNU property notes"),
    entry(PT_LOSUNW, "PT_LOSUNW", "Sun specific (lo/start mark)"),
    entry(PT_SUNWBSS, "PT_SUNWBSS", "Sun specific segment"),
    entry(PT_SUNWSTACK, "PT_SUNWSTACK", "Sun stack segment"),
    entry(PT_HISUNW, "PT_HISUNW", "Sun specific (hi/end mark)"),
];

/// Substituted by callers when `lookup` finds nothing.
pub static UNKNOWN_SEGMENT_TYPE: SegmentTypeDescriptor = SegmentTypeDescriptor {
    code: -1,
    short_name: "???",
    description: "Unknown PHT type",
};

/// Returns the first registered descriptor for `code`. -1 never matches.
pub fn lookup(code: i64) -> Option<&'static SegmentTypeDescriptor> {
    if code == -1 {
        return None;
    }
    SEGMENT_TYPES.iter().find(|t| t.code == code)
}
