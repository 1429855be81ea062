//! Directories: a fixed table of (name, header sector, kind) entries
//! stored as an ordinary file. Subdirectories are the same structure
//! again, so a directory file is indistinguishable from a user file at
//! the header level.

use crate::bitmap::SectorBitmap;
use crate::config::{DIRECTORY_FILE_SIZE, DIR_ENTRY_SIZE, NAME_MAX_LEN, NUM_DIR_ENTRIES};
use crate::disk::SectorDevice;
use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::header::FileHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File = 1,
    Directory = 2,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    in_use: bool,
    kind: EntryKind,
    sector: u32,
    name: [u8; NAME_MAX_LEN + 1],
}

impl DirEntry {
    fn unused() -> Self {
        DirEntry {
            in_use: false,
            kind: EntryKind::File,
            sector: 0,
            name: [0; NAME_MAX_LEN + 1],
        }
    }

    fn new(name: &str, sector: u32, kind: EntryKind) -> Result<Self> {
        if name.is_empty() || name.len() > NAME_MAX_LEN {
            return Err(FsError::Invalid);
        }
        let mut bytes = [0; NAME_MAX_LEN + 1];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(DirEntry {
            in_use: true,
            kind,
            sector,
            name: bytes,
        })
    }

    /// Entry name up to the NUL terminator.
    pub fn name(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX_LEN);
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn sector(&self) -> u32 {
        self.sector
    }

    fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        raw[0..4].copy_from_slice(&(self.in_use as u32).to_le_bytes());
        raw[4..8].copy_from_slice(&(self.kind as u32).to_le_bytes());
        raw[8..12].copy_from_slice(&self.sector.to_le_bytes());
        raw[12..].copy_from_slice(&self.name);
        raw
    }

    fn from_bytes(raw: &[u8]) -> Result<Self> {
        let word = |at: usize| u32::from_le_bytes(raw[at..at + 4].try_into().unwrap());
        match word(0) {
            0 => Ok(DirEntry::unused()),
            1 => {
                let kind = match word(4) {
                    1 => EntryKind::File,
                    2 => EntryKind::Directory,
                    _ => return Err(FsError::Invalid),
                };
                let mut name = [0; NAME_MAX_LEN + 1];
                name.copy_from_slice(&raw[12..]);
                Ok(DirEntry {
                    in_use: true,
                    kind,
                    sector: word(8),
                    name,
                })
            }
            _ => Err(FsError::Invalid),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Directory {
    table: Vec<DirEntry>,
}

impl Directory {
    /// An empty directory table.
    pub fn new() -> Self {
        Directory {
            table: vec![DirEntry::unused(); NUM_DIR_ENTRIES],
        }
    }

    /// Loads the entry table from the directory's backing file.
    pub fn fetch_from(&mut self, device: &impl SectorDevice, file: &OpenFile) -> Result<()> {
        let mut raw = vec![0u8; DIRECTORY_FILE_SIZE];
        if file.read_at(device, &mut raw, 0)? != DIRECTORY_FILE_SIZE {
            return Err(FsError::Invalid);
        }
        for (entry, record) in self.table.iter_mut().zip(raw.chunks_exact(DIR_ENTRY_SIZE)) {
            *entry = DirEntry::from_bytes(record)?;
        }
        Ok(())
    }

    /// Writes the entry table back through the directory's file.
    pub fn write_back(&self, device: &impl SectorDevice, file: &OpenFile) -> Result<()> {
        let mut raw = Vec::with_capacity(DIRECTORY_FILE_SIZE);
        for entry in &self.table {
            raw.extend_from_slice(&entry.to_bytes());
        }
        if file.write_at(device, &raw, 0)? != DIRECTORY_FILE_SIZE {
            return Err(FsError::Invalid);
        }
        Ok(())
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        self.table
            .iter()
            .position(|entry| entry.in_use && entry.name() == name)
    }

    /// Header sector of the named entry.
    pub fn find(&self, name: &str) -> Option<u32> {
        self.find_index(name).map(|index| self.table[index].sector)
    }

    pub fn is_directory(&self, name: &str) -> bool {
        self.find_index(name)
            .is_some_and(|index| self.table[index].kind == EntryKind::Directory)
    }

    /// Adds an entry into the first free slot.
    pub fn add(&mut self, name: &str, sector: u32, kind: EntryKind) -> Result<()> {
        if self.find_index(name).is_some() {
            return Err(FsError::DuplicateName);
        }
        let slot = self
            .table
            .iter_mut()
            .find(|entry| !entry.in_use)
            .ok_or(FsError::DirectoryFull)?;
        *slot = DirEntry::new(name, sector, kind)?;
        Ok(())
    }

    /// Marks the named entry unused. The entry's header and data
    /// blocks are untouched; reclaiming them is the file system's job.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let index = self.find_index(name).ok_or(FsError::NotFound)?;
        self.table[index].in_use = false;
        Ok(())
    }

    /// Tears down everything below this directory: subdirectories are
    /// descended first, then every entry's pointer tree and header
    /// sector go back to the bitmap and the entry is marked unused.
    /// Afterwards the table is empty.
    pub fn remove_recursive(
        &mut self,
        device: &impl SectorDevice,
        bitmap: &mut SectorBitmap,
    ) -> Result<()> {
        for index in 0..self.table.len() {
            if !self.table[index].in_use {
                continue;
            }
            let sector = self.table[index].sector;
            let header = if self.table[index].kind == EntryKind::Directory {
                let child_file = OpenFile::open(device, sector)?;
                let mut child = Directory::new();
                child.fetch_from(device, &child_file)?;
                child.remove_recursive(device, bitmap)?;
                // the handle already fetched the child's own header
                child_file.into_header()
            } else {
                FileHeader::fetch_from(device, sector)?
            };
            header.deallocate(bitmap)?;
            if !bitmap.test(sector) {
                return Err(FsError::Invalid);
            }
            bitmap.clear(sector);
            self.table[index].in_use = false;
        }
        Ok(())
    }

    /// Appends one line per in-use entry: `[slot] name F|D`.
    pub fn list(&self, out: &mut String) {
        self.render(out, 0);
    }

    /// As `list`, but descends into directory entries, indenting two
    /// spaces per level.
    pub fn list_recursive(
        &self,
        device: &impl SectorDevice,
        out: &mut String,
        indent: usize,
    ) -> Result<()> {
        for (index, entry) in self.table.iter().enumerate() {
            if !entry.in_use {
                continue;
            }
            render_entry(out, indent, index, entry);
            if entry.kind == EntryKind::Directory {
                let child_file = OpenFile::open(device, entry.sector)?;
                let mut child = Directory::new();
                child.fetch_from(device, &child_file)?;
                child.list_recursive(device, out, indent + 2)?;
            }
        }
        Ok(())
    }

    fn render(&self, out: &mut String, indent: usize) {
        for (index, entry) in self.table.iter().enumerate() {
            if entry.in_use {
                render_entry(out, indent, index, entry);
            }
        }
    }

    /// Number of in-use entries.
    pub fn len(&self) -> usize {
        self.table.iter().filter(|entry| entry.in_use).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Header sector at a table slot, if the slot is in use.
    pub fn sector_at(&self, index: usize) -> Option<u32> {
        let entry = self.table.get(index)?;
        entry.in_use.then_some(entry.sector)
    }

    /// Entry name at a table slot, if the slot is in use.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        let entry = self.table.get(index)?;
        entry.in_use.then(|| entry.name())
    }

    pub fn is_directory_at(&self, index: usize) -> bool {
        self.table
            .get(index)
            .is_some_and(|entry| entry.in_use && entry.kind == EntryKind::Directory)
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

fn render_entry(out: &mut String, indent: usize, index: usize, entry: &DirEntry) {
    let tag = match entry.kind {
        EntryKind::File => 'F',
        EntryKind::Directory => 'D',
    };
    out.push_str(&format!(
        "{:indent$}[{index}] {} {tag}\n",
        "",
        entry.name()
    ));
}
