use crate::config::SECTOR_SIZE;
use crate::error::Result;

/// Contract of the simulated disk: synchronous sector-granular I/O.
/// Sector indices run over `[0, NUM_SECTORS)`; the contents of sectors
/// never written are undefined.
pub trait SectorDevice: Send + Sync {
    /// Reads one sector into `buf`.
    fn read_sector(&self, sector: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<()>;

    /// Writes one sector from `buf`.
    fn write_sector(&self, sector: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()>;
}
