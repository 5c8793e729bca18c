//! Builds small but well-formed ELF images for integration tests.
#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

pub const ET_EXEC: u16 = 2;
pub const ET_DYN: u16 = 3;
pub const ET_CORE: u16 = 4;

pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;
pub const PT_GNU_STACK: u32 = 0x6474e551;

pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOBITS: u32 = 8;

#[derive(Clone, Copy)]
pub struct Phdr {
    pub p_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

impl Phdr {
    pub fn load(flags: u32, offset: u64, vaddr: u64, filesz: u64) -> Self {
        Phdr {
            p_type: PT_LOAD,
            flags,
            offset,
            vaddr,
            filesz,
            memsz: filesz,
        }
    }
}

#[derive(Clone)]
pub struct Shdr {
    pub name: String,
    pub sh_type: u32,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
}

impl Shdr {
    pub fn progbits(name: &str, addr: u64, offset: u64, size: u64) -> Self {
        Shdr {
            name: name.to_string(),
            sh_type: SHT_PROGBITS,
            addr,
            offset,
            size,
        }
    }
}

pub struct ElfImage {
    pub sixty_four: bool,
    pub big_endian: bool,
    pub e_type: u16,
    pub version: u8,
    pub phdrs: Vec<Phdr>,
    pub sections: Vec<Shdr>,
    /// Stores counts and the name table index in section 0.
    pub extended_numbering: bool,
    pub shstrndx_override: Option<u16>,
}

impl ElfImage {
    pub fn exec64() -> Self {
        ElfImage {
            sixty_four: true,
            big_endian: false,
            e_type: ET_EXEC,
            version: 1,
            phdrs: Vec::new(),
            sections: Vec::new(),
            extended_numbering: false,
            shstrndx_override: None,
        }
    }

    pub fn exec32_be() -> Self {
        ElfImage {
            sixty_four: false,
            big_endian: true,
            ..Self::exec64()
        }
    }

    pub fn with_phdr(mut self, phdr: Phdr) -> Self {
        self.phdrs.push(phdr);
        self
    }

    pub fn with_section(mut self, shdr: Shdr) -> Self {
        self.sections.push(shdr);
        self
    }

    fn ehsize(&self) -> u64 {
        if self.sixty_four { 64 } else { 52 }
    }

    fn phentsize(&self) -> u64 {
        if self.sixty_four { 56 } else { 32 }
    }

    fn shentsize(&self) -> u64 {
        if self.sixty_four { 64 } else { 40 }
    }

    /// Offset just past the program header table.
    pub fn phdrs_end(&self) -> u64 {
        self.ehsize() + self.phentsize() * self.phdrs.len() as u64
    }

    pub fn build(&self) -> Vec<u8> {
        if self.big_endian {
            self.build_with::<BigEndian>()
        } else {
            self.build_with::<LittleEndian>()
        }
    }

    fn build_with<B: ByteOrder>(&self) -> Vec<u8> {
        // Layout: header, program headers, section names, section headers.
        let phoff = if self.phdrs.is_empty() { 0 } else { self.ehsize() };

        let mut strtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for s in &self.sections {
            name_offsets.push(strtab.len() as u32);
            strtab.extend_from_slice(s.name.as_bytes());
            strtab.push(0);
        }
        let shstrtab_name = strtab.len() as u32;
        strtab.extend_from_slice(b".shstrtab\0");

        let strtab_offset = self.phdrs_end();
        let shoff = (strtab_offset + strtab.len() as u64 + 7) & !7;
        let shnum = self.sections.len() as u16 + 2;
        let shstrndx = shnum - 1;

        let (e_phnum, e_shnum, e_shstrndx) = if self.extended_numbering {
            (0xffff, 0, 0xffff)
        } else {
            (self.phdrs.len() as u16, shnum, shstrndx)
        };

        let mut buf = Vec::new();
        buf.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
        buf.push(if self.sixty_four { 2 } else { 1 });
        buf.push(if self.big_endian { 2 } else { 1 });
        buf.push(self.version);
        buf.resize(16, 0);
        buf.write_u16::<B>(self.e_type).unwrap();
        buf.write_u16::<B>(if self.sixty_four { 62 } else { 8 }).unwrap();
        buf.write_u32::<B>(1).unwrap();
        self.write_addr::<B>(&mut buf, 0x1000); // e_entry
        self.write_addr::<B>(&mut buf, phoff);
        self.write_addr::<B>(&mut buf, shoff);
        buf.write_u32::<B>(0).unwrap(); // e_flags
        buf.write_u16::<B>(self.ehsize() as u16).unwrap();
        buf.write_u16::<B>(self.phentsize() as u16).unwrap();
        buf.write_u16::<B>(e_phnum).unwrap();
        buf.write_u16::<B>(self.shentsize() as u16).unwrap();
        buf.write_u16::<B>(e_shnum).unwrap();
        buf.write_u16::<B>(self.shstrndx_override.unwrap_or(e_shstrndx))
            .unwrap();
        assert_eq!(buf.len() as u64, self.ehsize());

        for p in &self.phdrs {
            if self.sixty_four {
                buf.write_u32::<B>(p.p_type).unwrap();
                buf.write_u32::<B>(p.flags).unwrap();
                buf.write_u64::<B>(p.offset).unwrap();
                buf.write_u64::<B>(p.vaddr).unwrap();
                buf.write_u64::<B>(p.vaddr).unwrap(); // p_paddr
                buf.write_u64::<B>(p.filesz).unwrap();
                buf.write_u64::<B>(p.memsz).unwrap();
                buf.write_u64::<B>(0x1000).unwrap(); // p_align
            } else {
                buf.write_u32::<B>(p.p_type).unwrap();
                buf.write_u32::<B>(p.offset as u32).unwrap();
                buf.write_u32::<B>(p.vaddr as u32).unwrap();
                buf.write_u32::<B>(p.vaddr as u32).unwrap(); // p_paddr
                buf.write_u32::<B>(p.filesz as u32).unwrap();
                buf.write_u32::<B>(p.memsz as u32).unwrap();
                buf.write_u32::<B>(p.flags).unwrap();
                buf.write_u32::<B>(0x1000).unwrap(); // p_align
            }
        }

        buf.extend_from_slice(&strtab);
        buf.resize(shoff as usize, 0);

        // Null section; under extended numbering it carries the real values.
        let (null_size, null_link, null_info) = if self.extended_numbering {
            (shnum as u64, shstrndx as u32, self.phdrs.len() as u32)
        } else {
            (0, 0, 0)
        };
        self.write_shdr::<B>(&mut buf, 0, 0, 0, 0, null_size, null_link, null_info);
        for (s, name) in self.sections.iter().zip(&name_offsets) {
            self.write_shdr::<B>(&mut buf, *name, s.sh_type, s.addr, s.offset, s.size, 0, 0);
        }
        self.write_shdr::<B>(
            &mut buf,
            shstrtab_name,
            SHT_STRTAB,
            0,
            strtab_offset,
            strtab.len() as u64,
            0,
            0,
        );
        buf
    }

    fn write_addr<B: ByteOrder>(&self, buf: &mut Vec<u8>, value: u64) {
        if self.sixty_four {
            buf.write_u64::<B>(value).unwrap();
        } else {
            buf.write_u32::<B>(value as u32).unwrap();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_shdr<B: ByteOrder>(
        &self,
        buf: &mut Vec<u8>,
        name: u32,
        sh_type: u32,
        addr: u64,
        offset: u64,
        size: u64,
        link: u32,
        info: u32,
    ) {
        buf.write_u32::<B>(name).unwrap();
        buf.write_u32::<B>(sh_type).unwrap();
        self.write_addr::<B>(buf, 0); // sh_flags
        self.write_addr::<B>(buf, addr);
        self.write_addr::<B>(buf, offset);
        self.write_addr::<B>(buf, size);
        buf.write_u32::<B>(link).unwrap();
        buf.write_u32::<B>(info).unwrap();
        self.write_addr::<B>(buf, 1); // sh_addralign
        self.write_addr::<B>(buf, 0); // sh_entsize
    }
}

/// The two-segment executable used throughout the tests: text at 0x1000
/// backed by offset 0, data at 0x2000 backed by offset 0x500.
pub fn two_segment_exec() -> ElfImage {
    ElfImage::exec64()
        .with_phdr(Phdr::load(PF_R | PF_X, 0, 0x1000, 0x500))
        .with_phdr(Phdr::load(PF_R | PF_W, 0x500, 0x2000, 0x300))
        .with_section(Shdr::progbits(".text", 0x1040, 0x40, 0x4c0))
        .with_section(Shdr::progbits(".data", 0x2000, 0x500, 0x300))
        .with_section(Shdr {
            name: ".bss".to_string(),
            sh_type: SHT_NOBITS,
            addr: 0x2300,
            offset: 0x800,
            size: 0x100,
        })
}
