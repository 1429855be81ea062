//! File headers: the one-sector root of a file's pointer tree. A
//! header records the byte length, the number of live top-level
//! pointers, and the sectors their nodes live in. Its level is never
//! stored; it is re-derived from the length with the same rule that
//! picked it at allocation time.

use crate::bitmap::SectorBitmap;
use crate::config::{INTS_PER_SECTOR, NUM_HEADER_POINTERS, SECTOR_SIZE};
use crate::disk::SectorDevice;
use crate::error::{FsError, Result};
use crate::pointer::{level_for_size, node_capacity, sectors_per_node, PointerNode};
use crate::sector::{decode_ints, encode_ints, valid_sector, UNUSED};

#[derive(Debug, Clone)]
pub struct FileHeader {
    num_bytes: u32,
    num_pointers: u32,
    pointer_sectors: [i32; NUM_HEADER_POINTERS],
    level: u8,
    table: Vec<PointerNode>,
}

impl FileHeader {
    /// Builds a fresh header for a file of `file_size` bytes, taking
    /// every sector the pointer tree needs from the bitmap. The exact
    /// total cost is checked up front, before the bitmap is touched,
    /// so a failed allocation leaves the bitmap as it was. A size of
    /// zero yields a header with no pointers.
    pub fn allocate(bitmap: &mut SectorBitmap, file_size: u32) -> Result<FileHeader> {
        let level = level_for_size(file_size)?;
        let num_sectors = file_size.div_ceil(SECTOR_SIZE as u32);
        let per_pointer = sectors_per_node(level);
        let num_pointers = num_sectors.div_ceil(per_pointer);
        debug_assert!(num_pointers as usize <= NUM_HEADER_POINTERS);

        let mut required = num_pointers;
        let mut remaining = num_sectors;
        for _ in 0..num_pointers {
            let share = remaining.min(per_pointer);
            required += PointerNode::subtree_sectors(level, share);
            remaining -= share;
        }
        if bitmap.num_clear() < required as usize {
            return Err(FsError::NoSpace);
        }

        let mut pointer_sectors = [UNUSED; NUM_HEADER_POINTERS];
        for slot in pointer_sectors.iter_mut().take(num_pointers as usize) {
            *slot = bitmap.find_and_set().ok_or(FsError::NoSpace)? as i32;
        }

        let mut table = Vec::with_capacity(num_pointers as usize);
        let mut remaining = num_sectors;
        for _ in 0..num_pointers {
            let share = remaining.min(per_pointer);
            let mut node = PointerNode::empty(level);
            node.allocate(bitmap, share)?;
            table.push(node);
            remaining -= share;
        }
        debug_assert_eq!(remaining, 0);

        Ok(FileHeader {
            num_bytes: file_size,
            num_pointers,
            pointer_sectors,
            level,
            table,
        })
    }

    /// Returns every sector of the pointer tree to the bitmap: each
    /// top-level subtree first, then the subtree's own node sector.
    /// The sector holding the header itself belongs to the caller.
    pub fn deallocate(&self, bitmap: &mut SectorBitmap) -> Result<()> {
        for (node, &sector) in self.table.iter().zip(&self.pointer_sectors) {
            node.deallocate(bitmap)?;
            let sector = valid_sector(sector)?;
            if !bitmap.test(sector) {
                return Err(FsError::Invalid);
            }
            bitmap.clear(sector);
        }
        Ok(())
    }

    /// Rehydrates a header and its whole pointer tree from disk.
    pub fn fetch_from(device: &impl SectorDevice, sector: u32) -> Result<FileHeader> {
        let mut buf = [0u8; SECTOR_SIZE];
        device.read_sector(sector, &mut buf)?;
        let ints = decode_ints(&buf);

        if ints[0] < 0 || ints[1] < 0 || ints[1] as usize > NUM_HEADER_POINTERS {
            return Err(FsError::Invalid);
        }
        let num_bytes = ints[0] as u32;
        let num_pointers = ints[1] as u32;
        let level = level_for_size(num_bytes)?;

        let mut pointer_sectors = [UNUSED; NUM_HEADER_POINTERS];
        pointer_sectors.copy_from_slice(&ints[2..2 + NUM_HEADER_POINTERS]);

        let mut table = Vec::with_capacity(num_pointers as usize);
        for index in 0..num_pointers as usize {
            let node_sector = valid_sector(pointer_sectors[index])?;
            table.push(PointerNode::fetch_from(device, level, node_sector)?);
        }

        Ok(FileHeader {
            num_bytes,
            num_pointers,
            pointer_sectors,
            level,
            table,
        })
    }

    /// Writes the pointer tree and then the header image to disk.
    pub fn write_back(&self, device: &impl SectorDevice, sector: u32) -> Result<()> {
        for (node, &node_sector) in self.table.iter().zip(&self.pointer_sectors) {
            node.write_back(device, valid_sector(node_sector)?)?;
        }
        let mut ints = [UNUSED; INTS_PER_SECTOR];
        ints[0] = self.num_bytes as i32;
        ints[1] = self.num_pointers as i32;
        ints[2..2 + NUM_HEADER_POINTERS].copy_from_slice(&self.pointer_sectors);
        device.write_sector(sector, &encode_ints(&ints))
    }

    /// Translates a byte offset within the file to its data sector.
    pub fn byte_to_sector(&self, offset: u32) -> Result<u32> {
        let capacity = node_capacity(self.level);
        let index = (offset / capacity) as usize;
        self.table
            .get(index)
            .ok_or(FsError::Invalid)?
            .byte_to_sector(offset % capacity)
    }

    /// File length in bytes.
    pub fn len(&self) -> u32 {
        self.num_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.num_bytes == 0
    }

    /// Pointer-tree level, in `1..=4`.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Every sector owned by the pointer tree (node and data sectors,
    /// not the header's own). Diagnostic surface, used by dumps and
    /// consistency checks.
    pub fn sectors(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for (node, &sector) in self.table.iter().zip(&self.pointer_sectors) {
            out.push(sector as u32);
            node.collect_sectors(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NUM_INDIRECT_POINTERS, NUM_SECTORS};
    use crate::pointer::max_file_size;

    #[test]
    fn level_rule_at_boundaries() {
        let l1 = max_file_size(1);
        let l2 = max_file_size(2);
        let l3 = max_file_size(3);
        let l4 = max_file_size(4);
        assert_eq!(l1, 30 * 128);
        assert_eq!(l2, 30 * 31 * 128);

        assert_eq!(level_for_size(0).unwrap(), 1);
        assert_eq!(level_for_size(1).unwrap(), 1);
        assert_eq!(level_for_size(l1).unwrap(), 1);
        assert_eq!(level_for_size(l1 + 1).unwrap(), 2);
        assert_eq!(level_for_size(l2).unwrap(), 2);
        assert_eq!(level_for_size(l2 + 1).unwrap(), 3);
        assert_eq!(level_for_size(l3).unwrap(), 3);
        assert_eq!(level_for_size(l3 + 1).unwrap(), 4);
        assert_eq!(level_for_size(l4).unwrap(), 4);
        assert_eq!(level_for_size(l4 + 1), Err(FsError::TooLarge));
    }

    #[test]
    fn allocate_counts_pointers() {
        let mut bitmap = SectorBitmap::new();
        let header = FileHeader::allocate(&mut bitmap, 300).unwrap();
        // 300 bytes -> 3 data sectors -> 3 direct pointers at level 1.
        assert_eq!(header.level(), 1);
        assert_eq!(header.num_pointers, 3);
        assert_eq!(header.sectors().len(), 6);
        assert_eq!(bitmap.num_clear(), NUM_SECTORS - 6);
    }

    #[test]
    fn allocate_empty_file() {
        let mut bitmap = SectorBitmap::new();
        let header = FileHeader::allocate(&mut bitmap, 0).unwrap();
        assert_eq!(header.num_pointers, 0);
        assert_eq!(bitmap.num_clear(), NUM_SECTORS);
    }

    #[test]
    fn allocate_level_two_shares() {
        let mut bitmap = SectorBitmap::new();
        let size = max_file_size(1) + 1; // 31 data sectors, level 2
        let header = FileHeader::allocate(&mut bitmap, size).unwrap();
        assert_eq!(header.level(), 2);
        assert_eq!(header.num_pointers, 1);
        // one indirect node + 31 direct nodes + 31 data sectors
        assert_eq!(header.sectors().len(), 1 + 2 * NUM_INDIRECT_POINTERS);
    }

    #[test]
    fn failed_allocate_leaves_bitmap_untouched() {
        let mut bitmap = SectorBitmap::new();
        for sector in 0..(NUM_SECTORS as u32 - 3) {
            bitmap.mark(sector);
        }
        // 2 data sectors would need 4 sectors in total.
        assert_eq!(
            FileHeader::allocate(&mut bitmap, 200).unwrap_err(),
            FsError::NoSpace
        );
        assert_eq!(bitmap.num_clear(), 3);
    }
}
