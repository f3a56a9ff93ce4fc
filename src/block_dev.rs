//! Fixed-size block I/O against a single backing container file.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::warn;

use crate::config::BLOCK_SIZE;
use crate::error::{FsError, Result};

/// The container file treated as a dense array of BLOCK_SIZE-byte blocks.
/// Exactly one seek and one transfer per call; no caching, no interpretation
/// of block contents.
#[derive(Debug)]
pub struct BlockDevice {
    file: File,
}

impl BlockDevice {
    /// Creates the backing file exclusively. If it already exists it is
    /// truncated to zero length instead. The file is not pre-sized; writes
    /// to high block numbers extend it sparsely.
    pub fn create(path: &Path) -> Result<Self> {
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("container file already exists, truncating");
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .truncate(true)
                    .open(path)
                    .map_err(FsError::Io)?
            }
            Err(e) => return Err(FsError::Io(e)),
        };
        Ok(Self { file })
    }

    /// Opens an existing backing file read/write; `NotFound` if missing.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Reads block `block_no` into `buf`. The container is sparse: the part
    /// of a block past the file's current end reads as zeroes.
    pub fn read(&mut self, block_no: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(block_no as u64 * BLOCK_SIZE as u64))
            .map_err(FsError::Io)?;
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FsError::Io(e)),
            }
        }
        buf[filled..].fill(0);
        Ok(())
    }

    /// Writes `buf` as block `block_no`. A short write is a failure.
    pub fn write(&mut self, block_no: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(block_no as u64 * BLOCK_SIZE as u64))
            .map_err(FsError::Io)?;
        self.file.write_all(buf).map_err(FsError::Io)?;
        Ok(())
    }
}
