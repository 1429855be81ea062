//! Raw sector images. Headers and pointer nodes are arrays of 32-bit
//! little-endian integers filling exactly one sector, with unused slots
//! holding -1.

use crate::config::{INTS_PER_SECTOR, NUM_SECTORS, SECTOR_SIZE};
use crate::error::{FsError, Result};

pub(crate) type SectorBuf = [u8; SECTOR_SIZE];
pub(crate) type IntSector = [i32; INTS_PER_SECTOR];

/// Fill value for unused integer slots.
pub(crate) const UNUSED: i32 = -1;

pub(crate) fn decode_ints(buf: &SectorBuf) -> IntSector {
    let mut ints = [0i32; INTS_PER_SECTOR];
    for (slot, chunk) in ints.iter_mut().zip(buf.chunks_exact(4)) {
        *slot = i32::from_le_bytes(chunk.try_into().unwrap());
    }
    ints
}

pub(crate) fn encode_ints(ints: &IntSector) -> SectorBuf {
    let mut buf = [0u8; SECTOR_SIZE];
    for (chunk, slot) in buf.chunks_exact_mut(4).zip(ints.iter()) {
        chunk.copy_from_slice(&slot.to_le_bytes());
    }
    buf
}

/// Checks that an integer read off disk is a real sector index.
pub(crate) fn valid_sector(value: i32) -> Result<u32> {
    if (0..NUM_SECTORS as i32).contains(&value) {
        Ok(value as u32)
    } else {
        Err(FsError::Invalid)
    }
}
