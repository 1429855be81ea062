//! Open files: a fetched header plus a cursor, giving byte-granular
//! positional I/O over sector-granular storage. Files never grow, so
//! writes are clipped to the length fixed at creation.

use crate::config::SECTOR_SIZE;
use crate::disk::SectorDevice;
use crate::error::Result;
use crate::header::FileHeader;

#[derive(Debug)]
pub struct OpenFile {
    header: FileHeader,
    sector: u32,
    position: u32,
}

impl OpenFile {
    /// Opens the file whose header lives at `sector`.
    pub fn open(device: &impl SectorDevice, sector: u32) -> Result<OpenFile> {
        Ok(OpenFile {
            header: FileHeader::fetch_from(device, sector)?,
            sector,
            position: 0,
        })
    }

    /// Sector of this file's header, which doubles as its open-file id.
    pub fn sector(&self) -> u32 {
        self.sector
    }

    /// Consumes the handle, yielding the header fetched at open time.
    pub(crate) fn into_header(self) -> FileHeader {
        self.header
    }

    /// File length in bytes.
    pub fn len(&self) -> u32 {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    pub fn seek(&mut self, position: u32) {
        self.position = position;
    }

    /// Reads into `buf` starting at `position`, clipped to the file
    /// length. Returns the bytes read; 0 at or past end of file.
    pub fn read_at(&self, device: &impl SectorDevice, buf: &mut [u8], position: u32) -> Result<usize> {
        let length = self.header.len();
        if position >= length || buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min((length - position) as usize);

        let mut cache = [0u8; SECTOR_SIZE];
        let mut done = 0;
        let mut offset = position;
        while done < len {
            let sector = self.header.byte_to_sector(offset)?;
            let in_sector = offset as usize % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - in_sector).min(len - done);
            device.read_sector(sector, &mut cache)?;
            buf[done..done + chunk].copy_from_slice(&cache[in_sector..in_sector + chunk]);
            done += chunk;
            offset += chunk as u32;
        }
        Ok(len)
    }

    /// Writes `buf` starting at `position`, clipped to the file length
    /// (files have a fixed size). Partially covered sectors are read,
    /// patched and written back; nothing is buffered beyond the sector
    /// in hand.
    pub fn write_at(&self, device: &impl SectorDevice, buf: &[u8], position: u32) -> Result<usize> {
        let length = self.header.len();
        if position >= length || buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min((length - position) as usize);

        let mut cache = [0u8; SECTOR_SIZE];
        let mut done = 0;
        let mut offset = position;
        while done < len {
            let sector = self.header.byte_to_sector(offset)?;
            let in_sector = offset as usize % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - in_sector).min(len - done);
            device.read_sector(sector, &mut cache)?;
            cache[in_sector..in_sector + chunk].copy_from_slice(&buf[done..done + chunk]);
            device.write_sector(sector, &cache)?;
            done += chunk;
            offset += chunk as u32;
        }
        Ok(len)
    }

    /// Reads at the cursor and advances it by the bytes returned.
    pub fn read(&mut self, device: &impl SectorDevice, buf: &mut [u8]) -> Result<usize> {
        let read = self.read_at(device, buf, self.position)?;
        self.position += read as u32;
        Ok(read)
    }

    /// Writes at the cursor and advances it by the bytes returned.
    pub fn write(&mut self, device: &impl SectorDevice, buf: &[u8]) -> Result<usize> {
        let written = self.write_at(device, buf, self.position)?;
        self.position += written as u32;
        Ok(written)
    }
}
