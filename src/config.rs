//! Fixed geometry of the simulated disk and the on-disk structures.
//! Everything is compile-time: the disk has a known shape and the two
//! system files live at well-known sectors.

/// Bytes per disk sector, the unit of all device I/O.
pub const SECTOR_SIZE: usize = 128;
/// Total sectors on the simulated disk.
pub const NUM_SECTORS: usize = 128;
/// 32-bit slots in one sector image.
pub const INTS_PER_SECTOR: usize = SECTOR_SIZE / 4;

/// Top-level pointer slots in a file header (two slots go to the
/// length and pointer-count fields).
pub const NUM_HEADER_POINTERS: usize = INTS_PER_SECTOR - 2;
/// Child slots in an indirect pointer node (one slot goes to the count).
pub const NUM_INDIRECT_POINTERS: usize = INTS_PER_SECTOR - 1;
/// Deepest supported pointer-tree level.
pub const MAX_LEVEL: u8 = 4;

/// Sector holding the free-map file header.
pub const FREE_MAP_SECTOR: u32 = 0;
/// Sector holding the root directory file header.
pub const ROOT_DIRECTORY_SECTOR: u32 = 1;
/// Size of the free-map file body: one bit per sector.
pub const FREE_MAP_FILE_SIZE: usize = (NUM_SECTORS + 7) / 8;

/// File and directory names are at most this many bytes.
pub const NAME_MAX_LEN: usize = 9;
/// Entry slots in every directory.
pub const NUM_DIR_ENTRIES: usize = 64;
/// On-disk bytes per directory entry: in-use flag, kind, sector,
/// NUL-terminated name.
pub const DIR_ENTRY_SIZE: usize = 3 * 4 + NAME_MAX_LEN + 1;
/// Size of every directory file body.
pub const DIRECTORY_FILE_SIZE: usize = NUM_DIR_ENTRIES * DIR_ENTRY_SIZE;

/// Maximum components in an absolute path.
pub const PATH_DEPTH: usize = 25;
/// Maximum length of an absolute path in bytes.
pub const PATH_MAX_LEN: usize = PATH_DEPTH * NAME_MAX_LEN + 1;

/// Capacity of the open-file table.
pub const MAX_OPEN_FILES: usize = 20;
