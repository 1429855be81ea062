//! Quark is the on-disk file system core of a teaching OS simulator.
//! It keeps a tree of fixed-size files and directories on a simulated
//! sector device and serves the simulator's file system calls.
//!
//! Layout on disk: sector 0 holds the header of the free-map file,
//! sector 1 the header of the root directory file. Everything else,
//! the free map's own blocks included, is reached through one-sector
//! file headers rooting a 1..4 level pointer tree.
//!
//! Layers, bottom to top:
//! 1. Sector device: synchronous sector I/O.          | Host implemented (the simulated disk)
//! 2. Bitmap: free-sector accounting, stored as a file.
//! 3. Pointer tree / header: byte offset -> data sector.
//! 4. Open file: byte-granular positional I/O.
//! 5. Directory / path: the name tree.
//! 6. FileSystem: format, mount, create/open/remove, listing.
//! 7. Syscall surface: sentinel-returning call translation. | Consumed by the host dispatcher
//!
//! The core is single-threaded by contract: no operation suspends and
//! no two operations overlap. Hosts wanting threads wrap the whole
//! `FileSystem` in a lock.

mod bitmap;
mod config;
mod directory;
mod disk;
mod error;
mod file;
mod fs;
mod header;
mod path;
mod pointer;
mod sector;
mod syscall;

pub use bitmap::SectorBitmap;
pub use config::*;
pub use directory::{DirEntry, Directory, EntryKind};
pub use disk::SectorDevice;
pub use error::FsError as Error;
pub use error::{FsError, Result};
pub use file::OpenFile;
pub use fs::{FileSystem, OpenFileId};
pub use header::FileHeader;
pub use pointer::{level_for_size, max_file_size, PointerNode};
pub use syscall::SyscallHandler;
