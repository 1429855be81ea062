//! The file system facade: formatting and mounting, path-based
//! create/open/remove, the open-file table, and listing.
//!
//! The free map and the root directory are themselves files with
//! headers at well-known sectors, which makes formatting a small
//! bootstrap dance: the map allocates the blocks of the very file that
//! will hold it. Every mutating operation loads the map and the
//! affected directory fresh, works on the in-memory copies, and
//! persists both together only once the whole operation has succeeded;
//! a failure just discards the copies, leaving the disk consistent.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::bitmap::SectorBitmap;
use crate::config::{
    DIRECTORY_FILE_SIZE, FREE_MAP_FILE_SIZE, FREE_MAP_SECTOR, MAX_OPEN_FILES,
    ROOT_DIRECTORY_SECTOR,
};
use crate::directory::{Directory, EntryKind};
use crate::disk::SectorDevice;
use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::header::FileHeader;
use crate::path;

/// Handle returned by `open`: the sector of the file's header. Stable
/// for as long as the file exists.
pub type OpenFileId = u32;

#[derive(Debug)]
pub struct FileSystem<D: SectorDevice> {
    device: Arc<D>,
    free_map_file: OpenFile,
    directory_file: OpenFile,
    open_files: BTreeMap<OpenFileId, OpenFile>,
}

impl<D: SectorDevice> FileSystem<D> {
    /// Formats the disk: an empty free map and root directory are laid
    /// out in memory, their headers are written to sectors 0 and 1,
    /// and both are then persisted through their own files.
    pub fn format(device: Arc<D>) -> Result<Self> {
        debug!("formatting the file system");
        let mut bitmap = SectorBitmap::new();
        let directory = Directory::new();

        bitmap.mark(FREE_MAP_SECTOR);
        bitmap.mark(ROOT_DIRECTORY_SECTOR);
        let map_header = FileHeader::allocate(&mut bitmap, FREE_MAP_FILE_SIZE as u32)?;
        let dir_header = FileHeader::allocate(&mut bitmap, DIRECTORY_FILE_SIZE as u32)?;

        // The headers must hit the disk before the files can be
        // opened; open re-reads them from their sectors.
        map_header.write_back(&*device, FREE_MAP_SECTOR)?;
        dir_header.write_back(&*device, ROOT_DIRECTORY_SECTOR)?;

        let free_map_file = OpenFile::open(&*device, FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(&*device, ROOT_DIRECTORY_SECTOR)?;

        bitmap.write_back(&*device, &free_map_file)?;
        directory.write_back(&*device, &directory_file)?;

        Ok(FileSystem {
            device,
            free_map_file,
            directory_file,
            open_files: BTreeMap::new(),
        })
    }

    /// Mounts an already-formatted disk; its contents are
    /// authoritative.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        debug!("mounting the file system");
        let free_map_file = OpenFile::open(&*device, FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(&*device, ROOT_DIRECTORY_SECTOR)?;
        Ok(FileSystem {
            device,
            free_map_file,
            directory_file,
            open_files: BTreeMap::new(),
        })
    }

    fn load_bitmap(&self) -> Result<SectorBitmap> {
        SectorBitmap::fetch_from(&*self.device, &self.free_map_file)
    }

    /// Walks `components` from the root, requiring every one to be a
    /// directory, and returns the final directory with its file.
    fn walk(&self, components: &[&str]) -> Result<(Directory, OpenFile)> {
        let mut file = OpenFile::open(&*self.device, ROOT_DIRECTORY_SECTOR)?;
        let mut directory = Directory::new();
        directory.fetch_from(&*self.device, &file)?;
        for &component in components {
            if !directory.is_directory(component) {
                return Err(FsError::PathNotFound);
            }
            let sector = directory.find(component).ok_or(FsError::PathNotFound)?;
            file = OpenFile::open(&*self.device, sector)?;
            directory.fetch_from(&*self.device, &file)?;
        }
        Ok((directory, file))
    }

    /// Splits `path` into its parent chain and leaf, then walks to the
    /// parent. Paths naming the root have no leaf and are rejected.
    fn resolve_parent<'p>(&self, path: &'p str) -> Result<(Directory, OpenFile, &'p str)> {
        let components = path::split(path)?;
        let (&leaf, parents) = components.split_last().ok_or(FsError::Invalid)?;
        let (directory, file) = self.walk(parents)?;
        Ok((directory, file, leaf))
    }

    /// Creates a file of `initial_size` bytes. Files cannot grow, so
    /// the size given here is final.
    pub fn create(&mut self, path: &str, initial_size: u32) -> Result<()> {
        self.create_entry(path, initial_size, EntryKind::File)
    }

    /// Creates an empty directory.
    pub fn create_directory(&mut self, path: &str) -> Result<()> {
        self.create_entry(path, DIRECTORY_FILE_SIZE as u32, EntryKind::Directory)
    }

    fn create_entry(&mut self, path: &str, size: u32, kind: EntryKind) -> Result<()> {
        debug!("create {:?} ({} bytes)", path, size);
        let (mut parent, parent_file, leaf) = self.resolve_parent(path)?;
        if parent.find(leaf).is_some() {
            return Err(FsError::DuplicateName);
        }

        let mut bitmap = self.load_bitmap()?;
        let header_sector = bitmap.find_and_set().ok_or(FsError::NoSpace)?;
        parent.add(leaf, header_sector, kind)?;
        let header = FileHeader::allocate(&mut bitmap, size)?;
        // Nothing has hit the disk up to this point; the early returns
        // above discard the in-memory map and table copies.

        header.write_back(&*self.device, header_sector)?;
        if kind == EntryKind::Directory {
            let child_file = OpenFile::open(&*self.device, header_sector)?;
            Directory::new().write_back(&*self.device, &child_file)?;
        }
        parent.write_back(&*self.device, &parent_file)?;
        bitmap.write_back(&*self.device, &self.free_map_file)?;
        Ok(())
    }

    /// Opens a file and registers it in the open-file table. The id is
    /// the header's sector; re-opening an open file replaces its
    /// handle.
    pub fn open(&mut self, path: &str) -> Result<OpenFileId> {
        debug!("open {:?}", path);
        let (parent, _, leaf) = self.resolve_parent(path)?;
        let sector = parent.find(leaf).ok_or(FsError::NotFound)?;
        if self.open_files.len() >= MAX_OPEN_FILES && !self.open_files.contains_key(&sector) {
            return Err(FsError::NoSpace);
        }
        let file = OpenFile::open(&*self.device, sector)?;
        self.open_files.insert(sector, file);
        Ok(sector)
    }

    /// Reads at the open file's cursor, advancing it by the bytes
    /// returned. Reads at end of file return 0.
    pub fn read(&mut self, id: OpenFileId, buf: &mut [u8]) -> Result<usize> {
        let file = self.open_files.get_mut(&id).ok_or(FsError::BadId)?;
        file.read(&*self.device, buf)
    }

    /// Writes at the open file's cursor, advancing it by the bytes
    /// returned. Writes past the fixed file length are clipped.
    pub fn write(&mut self, id: OpenFileId, buf: &[u8]) -> Result<usize> {
        let file = self.open_files.get_mut(&id).ok_or(FsError::BadId)?;
        file.write(&*self.device, buf)
    }

    /// Moves the open file's cursor.
    pub fn seek(&mut self, id: OpenFileId, position: u32) -> Result<()> {
        let file = self.open_files.get_mut(&id).ok_or(FsError::BadId)?;
        file.seek(position);
        Ok(())
    }

    /// Drops the handle; the id becomes invalid.
    pub fn close(&mut self, id: OpenFileId) -> Result<()> {
        self.open_files.remove(&id).map(drop).ok_or(FsError::BadId)
    }

    /// Removes a file or directory. Directories lose their whole
    /// subtree first. Removing the root is rejected.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        debug!("remove {:?}", path);
        let (mut parent, parent_file, leaf) = self.resolve_parent(path)?;
        let sector = parent.find(leaf).ok_or(FsError::NotFound)?;

        let mut bitmap = self.load_bitmap()?;
        let header = if parent.is_directory(leaf) {
            let dir_file = OpenFile::open(&*self.device, sector)?;
            let mut directory = Directory::new();
            directory.fetch_from(&*self.device, &dir_file)?;
            directory.remove_recursive(&*self.device, &mut bitmap)?;
            // the handle already fetched this directory's own header
            dir_file.into_header()
        } else {
            FileHeader::fetch_from(&*self.device, sector)?
        };
        header.deallocate(&mut bitmap)?;
        if !bitmap.test(sector) {
            return Err(FsError::Invalid);
        }
        bitmap.clear(sector);
        parent.remove(leaf)?;

        bitmap.write_back(&*self.device, &self.free_map_file)?;
        parent.write_back(&*self.device, &parent_file)?;
        Ok(())
    }

    /// Appends the named directory's entries to `out`, one line each.
    pub fn list(&self, path: &str, out: &mut String) -> Result<()> {
        let components = path::split(path)?;
        let (directory, _) = self.walk(&components)?;
        directory.list(out);
        Ok(())
    }

    /// As `list`, but recursing into subdirectories with increasing
    /// indentation.
    pub fn list_recursive(&self, path: &str, out: &mut String) -> Result<()> {
        let components = path::split(path)?;
        let (directory, _) = self.walk(&components)?;
        directory.list_recursive(&*self.device, out, 0)
    }

    /// Free sectors according to the persisted map.
    pub fn num_free_sectors(&self) -> Result<usize> {
        Ok(self.load_bitmap()?.num_clear())
    }

    /// Renders the free map and the full directory tree, for
    /// debugging.
    pub fn dump(&self) -> Result<String> {
        let bitmap = self.load_bitmap()?;
        let mut out = format!("free sectors: {}\n", bitmap.num_clear());
        let mut root = Directory::new();
        root.fetch_from(&*self.device, &self.directory_file)?;
        root.list_recursive(&*self.device, &mut out, 0)?;
        Ok(out)
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}
