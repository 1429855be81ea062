//! The system-call surface: a thin translation from user-program
//! requests to file system operations. Arguments arrive as raw user
//! buffers and are staged through kernel-owned copies; results go back
//! as the simulator's sentinel conventions (`1`/`0` for status calls,
//! byte counts or `-1` for I/O). No error value escapes this layer.

use std::io::Write;

use log::debug;

use crate::config::PATH_MAX_LEN;
use crate::disk::SectorDevice;
use crate::error::{FsError, Result};
use crate::fs::FileSystem;

pub struct SyscallHandler<D: SectorDevice, W: Write> {
    fs: FileSystem<D>,
    console: W,
    halted: bool,
}

impl<D: SectorDevice, W: Write> SyscallHandler<D, W> {
    pub fn new(fs: FileSystem<D>, console: W) -> Self {
        SyscallHandler {
            fs,
            console,
            halted: false,
        }
    }

    pub fn fs(&self) -> &FileSystem<D> {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut FileSystem<D> {
        &mut self.fs
    }

    /// Hands the file system and the console back to the host.
    pub fn into_parts(self) -> (FileSystem<D>, W) {
        (self.fs, self.console)
    }

    /// Whether `sys_halt` has been requested; the host loop checks
    /// this after every dispatched call.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn sys_halt(&mut self) {
        debug!("halt requested");
        self.halted = true;
    }

    pub fn sys_print_int(&mut self, value: i32) {
        let _ = writeln!(self.console, "{value}");
    }

    /// Creates a file; 1 on success, 0 on failure.
    pub fn sys_create(&mut self, name: &[u8], initial_size: i32) -> i32 {
        let Ok(path) = copy_user_string(name) else {
            return 0;
        };
        if initial_size < 0 {
            return 0;
        }
        match self.fs.create(&path, initial_size as u32) {
            Ok(()) => 1,
            Err(err) => {
                debug!("create {:?} failed: {err}", path);
                0
            }
        }
    }

    /// Opens a file; its id on success, -1 on failure.
    pub fn sys_open(&mut self, name: &[u8]) -> i32 {
        let Ok(path) = copy_user_string(name) else {
            return -1;
        };
        match self.fs.open(&path) {
            Ok(id) => id as i32,
            Err(err) => {
                debug!("open {:?} failed: {err}", path);
                -1
            }
        }
    }

    /// Reads up to `size` bytes into the user buffer; the byte count
    /// on success (0 at end of file), -1 on failure.
    pub fn sys_read(&mut self, buf: &mut [u8], size: i32, id: i32) -> i32 {
        if size < 0 || id < 0 {
            return -1;
        }
        let size = (size as usize).min(buf.len());
        let mut staging = vec![0u8; size];
        match self.fs.read(id as u32, &mut staging) {
            Ok(read) => {
                buf[..read].copy_from_slice(&staging[..read]);
                read as i32
            }
            Err(_) => -1,
        }
    }

    /// Writes up to `size` bytes from the user buffer; the byte count
    /// on success, -1 on failure.
    pub fn sys_write(&mut self, buf: &[u8], size: i32, id: i32) -> i32 {
        if size < 0 || id < 0 {
            return -1;
        }
        let size = (size as usize).min(buf.len());
        let staging = buf[..size].to_vec();
        match self.fs.write(id as u32, &staging) {
            Ok(written) => written as i32,
            Err(_) => -1,
        }
    }

    /// Closes an open file; 1 on success, 0 on an unknown id.
    pub fn sys_close(&mut self, id: i32) -> i32 {
        if id < 0 {
            return 0;
        }
        match self.fs.close(id as u32) {
            Ok(()) => 1,
            Err(_) => 0,
        }
    }
}

/// Copies a NUL-terminated name out of the user argument area.
fn copy_user_string(bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if end > PATH_MAX_LEN {
        return Err(FsError::Invalid);
    }
    core::str::from_utf8(&bytes[..end])
        .map(str::to_owned)
        .map_err(|_| FsError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_strings_stop_at_nul() {
        assert_eq!(copy_user_string(b"/a\0junk").unwrap(), "/a");
        assert_eq!(copy_user_string(b"/a").unwrap(), "/a");
        assert!(copy_user_string(&[b'/', 0xff, 0]).is_err());
    }
}
