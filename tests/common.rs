//! Common utilities for tests
#![allow(unused)]

use std::sync::{Arc, Mutex};

use quark::*;

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// A disk of `NUM_SECTORS` sectors held in memory.
#[derive(Debug)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl RamDisk {
    pub fn new() -> Self {
        RamDisk {
            inner: Arc::new(Mutex::new(vec![0u8; NUM_SECTORS * SECTOR_SIZE])),
        }
    }
}

impl SectorDevice for RamDisk {
    fn read_sector(&self, sector: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        if sector as usize >= NUM_SECTORS {
            return Err(Error::Io);
        }
        let start = sector as usize * SECTOR_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + SECTOR_SIZE]);
        Ok(())
    }

    fn write_sector(&self, sector: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        if sector as usize >= NUM_SECTORS {
            return Err(Error::Io);
        }
        let start = sector as usize * SECTOR_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..start + SECTOR_SIZE].copy_from_slice(buf);
        Ok(())
    }
}
