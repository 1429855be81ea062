//! End-to-end scenarios over a freshly formatted disk, plus the
//! global consistency sweeps: the persisted bitmap must always equal
//! {0, 1} plus everything reachable from the root directory.

#![allow(unused)]

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::RamDisk;
use quark::*;

/// Collects every sector reachable from the system headers: the free
/// map's tree, and the whole directory tree with every file's header
/// and pointer tree.
fn reachable_sectors(disk: &RamDisk) -> BTreeSet<u32> {
    let mut used = BTreeSet::from([FREE_MAP_SECTOR, ROOT_DIRECTORY_SECTOR]);
    let map_header = FileHeader::fetch_from(disk, FREE_MAP_SECTOR).unwrap();
    used.extend(map_header.sectors());
    walk_directory(disk, ROOT_DIRECTORY_SECTOR, &mut used);
    used
}

fn walk_directory(disk: &RamDisk, sector: u32, used: &mut BTreeSet<u32>) {
    let header = FileHeader::fetch_from(disk, sector).unwrap();
    used.extend(header.sectors());
    let file = OpenFile::open(disk, sector).unwrap();
    let mut directory = Directory::new();
    directory.fetch_from(disk, &file).unwrap();
    for index in 0..NUM_DIR_ENTRIES {
        let Some(entry_sector) = directory.sector_at(index) else {
            continue;
        };
        used.insert(entry_sector);
        if directory.is_directory_at(index) {
            walk_directory(disk, entry_sector, used);
        } else {
            let header = FileHeader::fetch_from(disk, entry_sector).unwrap();
            used.extend(header.sectors());
        }
    }
}

fn marked_sectors(disk: &RamDisk) -> BTreeSet<u32> {
    let map_file = OpenFile::open(disk, FREE_MAP_SECTOR).unwrap();
    let bitmap = SectorBitmap::fetch_from(disk, &map_file).unwrap();
    (0..NUM_SECTORS as u32).filter(|&s| bitmap.test(s)).collect()
}

fn assert_consistent(disk: &RamDisk) {
    assert_eq!(marked_sectors(disk), reachable_sectors(disk));
}

#[test]
fn format_and_list_empty_root() {
    let disk = Arc::new(RamDisk::new());
    let fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    let mut out = String::new();
    fs.list("/", &mut out).unwrap();
    assert!(out.is_empty());
    assert_consistent(&disk);
}

#[test]
fn create_write_read_small_file() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    fs.create("/a", 100).unwrap();

    let id = fs.open("/a").unwrap();
    assert_eq!(fs.write(id, b"hello").unwrap(), 5);
    fs.close(id).unwrap();

    let id = fs.open("/a").unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(fs.read(id, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");
    fs.close(id).unwrap();
    assert_consistent(&disk);
}

#[test]
fn nested_directories_list_recursively() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    fs.create_directory("/d1").unwrap();
    fs.create_directory("/d1/d2").unwrap();
    fs.create("/d1/d2/f", 27).unwrap();

    let mut out = String::new();
    fs.list_recursive("/", &mut out).unwrap();
    assert_eq!(out, "[0] d1 D\n  [0] d2 D\n    [0] f F\n");

    // single-level listing of an inner directory
    let mut out = String::new();
    fs.list("/d1/d2", &mut out).unwrap();
    assert_eq!(out, "[0] f F\n");
    assert_consistent(&disk);
}

#[test]
fn recursive_remove_restores_bitmap() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    let after_format = fs.num_free_sectors().unwrap();

    fs.create_directory("/d1").unwrap();
    fs.create_directory("/d1/d2").unwrap();
    fs.create("/d1/d2/f", 27).unwrap();
    assert!(fs.num_free_sectors().unwrap() < after_format);

    fs.remove("/d1").unwrap();
    assert_eq!(fs.num_free_sectors().unwrap(), after_format);
    let mut out = String::new();
    fs.list_recursive("/", &mut out).unwrap();
    assert!(out.is_empty());
    assert_consistent(&disk);
}

#[test]
fn large_file_spans_levels() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    let size = max_file_size(1) + 1;
    fs.create("/big", size).unwrap();

    let id = fs.open("/big").unwrap();
    let header = FileHeader::fetch_from(&*disk, id).unwrap();
    assert_eq!(header.level(), 2);
    assert_eq!(header.len(), size);
    assert_eq!(level_for_size(size).unwrap(), 2);

    // data is addressable across the whole range
    let payload = vec![0xabu8; 64];
    fs.seek(id, size - 64).unwrap();
    assert_eq!(fs.write(id, &payload).unwrap(), 64);
    fs.seek(id, size - 64).unwrap();
    let mut back = vec![0u8; 64];
    assert_eq!(fs.read(id, &mut back).unwrap(), 64);
    assert_eq!(back, payload);
    fs.close(id).unwrap();
    assert_consistent(&disk);
}

#[test]
fn out_of_space_rolls_back() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();

    // 6272 bytes = 49 data sectors at level 2: one header, two
    // single-indirect nodes, 49 direct nodes, 49 data sectors. That
    // leaves exactly one free sector after format.
    fs.create("/fill", 6272).unwrap();
    assert_eq!(fs.num_free_sectors().unwrap(), 1);

    assert_eq!(
        fs.create("/x", 3 * SECTOR_SIZE as u32),
        Err(Error::NoSpace)
    );
    assert_eq!(fs.num_free_sectors().unwrap(), 1);
    let mut out = String::new();
    fs.list("/", &mut out).unwrap();
    assert_eq!(out, "[0] fill F\n");
    assert_consistent(&disk);
}

#[test]
fn create_remove_is_a_bitmap_inverse() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    fs.create_directory("/d").unwrap();
    let before = marked_sectors(&disk);

    fs.create("/d/n", 500).unwrap();
    fs.remove("/d/n").unwrap();
    assert_eq!(marked_sectors(&disk), before);
    assert_consistent(&disk);
}

#[test]
fn removing_root_is_rejected() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    assert_eq!(fs.remove("/"), Err(Error::Invalid));
    assert_eq!(fs.remove("/gone"), Err(Error::NotFound));
}

#[test]
fn consistency_across_mixed_operations() {
    let disk = Arc::new(RamDisk::new());
    let mut fs = FileSystem::format(Arc::clone(&disk)).unwrap();

    fs.create("/top", 200).unwrap();
    fs.create_directory("/dir").unwrap();
    fs.create("/dir/one", 0).unwrap();
    fs.create("/dir/two", 150).unwrap();
    assert_consistent(&disk);

    fs.remove("/dir/one").unwrap();
    assert_consistent(&disk);

    fs.create_directory("/dir/sub").unwrap();
    fs.create("/dir/sub/x", 64).unwrap();
    assert_consistent(&disk);

    fs.remove("/dir").unwrap();
    assert_consistent(&disk);

    let mut out = String::new();
    fs.list_recursive("/", &mut out).unwrap();
    assert_eq!(out, "[0] top F\n");
}

#[test]
fn syscall_surface_round_trip() {
    let disk = Arc::new(RamDisk::new());
    let fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    let mut sys = SyscallHandler::new(fs, Vec::new());

    assert_eq!(sys.sys_create(b"/note\0", 100), 1);
    assert_eq!(sys.sys_create(b"/note\0", 100), 0);

    let id = sys.sys_open(b"/note\0");
    assert!(id >= 0);
    assert_eq!(sys.sys_open(b"/missing\0"), -1);

    assert_eq!(sys.sys_write(b"hello", 5, id), 5);
    assert_eq!(sys.sys_close(id), 1);
    assert_eq!(sys.sys_close(id), 0);

    let id = sys.sys_open(b"/note\0");
    let mut buf = [0u8; 16];
    assert_eq!(sys.sys_read(&mut buf, 5, id), 5);
    assert_eq!(&buf[..5], b"hello");
    assert_eq!(sys.sys_read(&mut buf, 5, 999), -1);
    assert_eq!(sys.sys_close(id), 1);
}

#[test]
fn syscall_halt_and_print() {
    let disk = Arc::new(RamDisk::new());
    let fs = FileSystem::format(Arc::clone(&disk)).unwrap();
    let mut sys = SyscallHandler::new(fs, Vec::new());

    sys.sys_print_int(42);
    sys.sys_print_int(-7);
    assert!(!sys.is_halted());
    sys.sys_halt();
    assert!(sys.is_halted());

    let (_, console) = sys.into_parts();
    assert_eq!(console, b"42\n-7\n");
}
