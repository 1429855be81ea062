//! Pointer-tree nodes: the block-index structure hanging off a file
//! header. A node fills exactly one sector. Direct nodes name a single
//! data sector; indirect nodes hold up to `NUM_INDIRECT_POINTERS` child
//! node sectors, one level down each.

use crate::bitmap::SectorBitmap;
use crate::config::{
    INTS_PER_SECTOR, MAX_LEVEL, NUM_HEADER_POINTERS, NUM_INDIRECT_POINTERS, SECTOR_SIZE,
};
use crate::disk::SectorDevice;
use crate::error::{FsError, Result};
use crate::sector::{decode_ints, encode_ints, valid_sector, UNUSED};

/// Data sectors addressable by one node at `level`.
pub(crate) fn sectors_per_node(level: u8) -> u32 {
    (NUM_INDIRECT_POINTERS as u32).pow(level as u32 - 1)
}

/// Bytes addressable by one node at `level`.
pub(crate) fn node_capacity(level: u8) -> u32 {
    sectors_per_node(level) * SECTOR_SIZE as u32
}

/// Largest file a header full of level-`level` pointers can address.
pub fn max_file_size(level: u8) -> u32 {
    node_capacity(level) * NUM_HEADER_POINTERS as u32
}

/// Smallest level whose header capacity covers `num_bytes`. The same
/// rule runs when allocating a fresh header and when rehydrating one
/// from disk, so the two always agree.
pub fn level_for_size(num_bytes: u32) -> Result<u8> {
    (1..=MAX_LEVEL)
        .find(|&level| num_bytes <= max_file_size(level))
        .ok_or(FsError::TooLarge)
}

/// One node of the pointer tree.
#[derive(Debug, Clone)]
pub enum PointerNode {
    Direct { data_sector: u32 },
    SingleIndirect(IndirectNode),
    DoubleIndirect(IndirectNode),
    TripleIndirect(IndirectNode),
}

/// Common body of the indirect shapes: child node sectors plus the
/// rehydrated children themselves.
#[derive(Debug, Clone)]
pub struct IndirectNode {
    count: u32,
    child_sectors: [i32; NUM_INDIRECT_POINTERS],
    children: Vec<PointerNode>,
}

impl IndirectNode {
    fn new() -> Self {
        IndirectNode {
            count: 0,
            child_sectors: [UNUSED; NUM_INDIRECT_POINTERS],
            children: Vec::new(),
        }
    }
}

impl PointerNode {
    /// Fresh, unallocated node of the shape matching `level`.
    pub(crate) fn empty(level: u8) -> Self {
        match level {
            1 => PointerNode::Direct { data_sector: 0 },
            2 => PointerNode::SingleIndirect(IndirectNode::new()),
            3 => PointerNode::DoubleIndirect(IndirectNode::new()),
            _ => PointerNode::TripleIndirect(IndirectNode::new()),
        }
    }

    pub(crate) fn level(&self) -> u8 {
        match self {
            PointerNode::Direct { .. } => 1,
            PointerNode::SingleIndirect(_) => 2,
            PointerNode::DoubleIndirect(_) => 3,
            PointerNode::TripleIndirect(_) => 4,
        }
    }

    /// Exact sector cost of a subtree at `level` addressing
    /// `num_sectors` data sectors: child node sectors at every level
    /// plus the data sectors themselves. The node's own sector belongs
    /// to its parent and is not counted.
    pub(crate) fn subtree_sectors(level: u8, num_sectors: u32) -> u32 {
        if num_sectors == 0 {
            return 0;
        }
        if level == 1 {
            return 1;
        }
        let per_child = sectors_per_node(level - 1);
        let count = num_sectors.div_ceil(per_child);
        let mut total = count;
        let mut remaining = num_sectors;
        for _ in 0..count {
            let share = remaining.min(per_child);
            total += Self::subtree_sectors(level - 1, share);
            remaining -= share;
        }
        total
    }

    /// Acquires every sector this subtree needs to address
    /// `num_sectors` data sectors. The free count is checked against
    /// the immediate reservation before the bitmap is touched; callers
    /// wanting an all-or-nothing guarantee pre-check the whole subtree
    /// cost first (see `FileHeader::allocate`).
    pub fn allocate(&mut self, bitmap: &mut SectorBitmap, num_sectors: u32) -> Result<()> {
        let child_level = self.level() - 1;
        match self {
            PointerNode::Direct { data_sector } => {
                debug_assert_eq!(num_sectors, 1);
                *data_sector = bitmap.find_and_set().ok_or(FsError::NoSpace)?;
                Ok(())
            }
            PointerNode::SingleIndirect(node)
            | PointerNode::DoubleIndirect(node)
            | PointerNode::TripleIndirect(node) => {
                let per_child = sectors_per_node(child_level);
                debug_assert!(num_sectors <= per_child * NUM_INDIRECT_POINTERS as u32);
                let count = num_sectors.div_ceil(per_child);
                if bitmap.num_clear() < count as usize {
                    return Err(FsError::NoSpace);
                }
                for slot in node.child_sectors.iter_mut().take(count as usize) {
                    *slot = bitmap.find_and_set().ok_or(FsError::NoSpace)? as i32;
                }
                node.count = count;
                let mut remaining = num_sectors;
                for _ in 0..count {
                    let share = remaining.min(per_child);
                    let mut child = PointerNode::empty(child_level);
                    child.allocate(bitmap, share)?;
                    node.children.push(child);
                    remaining -= share;
                }
                debug_assert_eq!(remaining, 0);
                Ok(())
            }
        }
    }

    /// Returns every sector this subtree owns to the bitmap. Clearing
    /// a sector that was never marked means the tree and the bitmap
    /// disagree; that is reported instead of papered over.
    pub fn deallocate(&self, bitmap: &mut SectorBitmap) -> Result<()> {
        match self {
            PointerNode::Direct { data_sector } => release(bitmap, *data_sector),
            PointerNode::SingleIndirect(node)
            | PointerNode::DoubleIndirect(node)
            | PointerNode::TripleIndirect(node) => {
                for (child, &sector) in node.children.iter().zip(&node.child_sectors) {
                    child.deallocate(bitmap)?;
                    release(bitmap, valid_sector(sector)?)?;
                }
                Ok(())
            }
        }
    }

    /// Reads the node image at `sector` and rehydrates the subtree,
    /// recursively fetching children for the indirect shapes.
    pub fn fetch_from(device: &impl SectorDevice, level: u8, sector: u32) -> Result<Self> {
        let mut buf = [0u8; SECTOR_SIZE];
        device.read_sector(sector, &mut buf)?;
        let ints = decode_ints(&buf);

        if level == 1 {
            return Ok(PointerNode::Direct {
                data_sector: valid_sector(ints[0])?,
            });
        }

        let mut node = IndirectNode::new();
        if ints[0] < 0 || ints[0] as usize > NUM_INDIRECT_POINTERS {
            return Err(FsError::Invalid);
        }
        node.count = ints[0] as u32;
        node.child_sectors
            .copy_from_slice(&ints[1..1 + NUM_INDIRECT_POINTERS]);
        for index in 0..node.count as usize {
            let child_sector = valid_sector(node.child_sectors[index])?;
            node.children
                .push(PointerNode::fetch_from(device, level - 1, child_sector)?);
        }
        Ok(match level {
            2 => PointerNode::SingleIndirect(node),
            3 => PointerNode::DoubleIndirect(node),
            _ => PointerNode::TripleIndirect(node),
        })
    }

    /// Serializes the subtree, children before the node itself.
    pub fn write_back(&self, device: &impl SectorDevice, sector: u32) -> Result<()> {
        let mut ints = [UNUSED; INTS_PER_SECTOR];
        match self {
            PointerNode::Direct { data_sector } => {
                ints[0] = *data_sector as i32;
            }
            PointerNode::SingleIndirect(node)
            | PointerNode::DoubleIndirect(node)
            | PointerNode::TripleIndirect(node) => {
                for (child, &child_sector) in node.children.iter().zip(&node.child_sectors) {
                    child.write_back(device, valid_sector(child_sector)?)?;
                }
                ints[0] = node.count as i32;
                ints[1..1 + NUM_INDIRECT_POINTERS].copy_from_slice(&node.child_sectors);
            }
        }
        device.write_sector(sector, &encode_ints(&ints))
    }

    /// Translates a byte offset within this subtree's range to the
    /// data sector holding it.
    pub fn byte_to_sector(&self, offset: u32) -> Result<u32> {
        match self {
            PointerNode::Direct { data_sector } => {
                debug_assert!(offset < SECTOR_SIZE as u32);
                Ok(*data_sector)
            }
            PointerNode::SingleIndirect(node)
            | PointerNode::DoubleIndirect(node)
            | PointerNode::TripleIndirect(node) => {
                let child_capacity = node_capacity(self.level() - 1);
                let index = (offset / child_capacity) as usize;
                node.children
                    .get(index)
                    .ok_or(FsError::Invalid)?
                    .byte_to_sector(offset % child_capacity)
            }
        }
    }

    /// Collects every sector the subtree owns, in no particular order.
    pub(crate) fn collect_sectors(&self, out: &mut Vec<u32>) {
        match self {
            PointerNode::Direct { data_sector } => out.push(*data_sector),
            PointerNode::SingleIndirect(node)
            | PointerNode::DoubleIndirect(node)
            | PointerNode::TripleIndirect(node) => {
                for (child, &sector) in node.children.iter().zip(&node.child_sectors) {
                    out.push(sector as u32);
                    child.collect_sectors(out);
                }
            }
        }
    }
}

fn release(bitmap: &mut SectorBitmap, sector: u32) -> Result<()> {
    if !bitmap.test(sector) {
        return Err(FsError::Invalid);
    }
    bitmap.clear(sector);
    Ok(())
}
