//! The on-disk file system core: composes the FAT, the BLT and the block
//! device into the host operation set.

use std::path::Path;

use log::{debug, info};

use crate::block_dev::BlockDevice;
use crate::blt::{BlockLink, BlockTable};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::fat::{Fat, FatEntry};
use crate::now_epoch;
use crate::ops::{name_of, Creds, FileStat, FsOps, S_IFDIR};

/// A mounted persistent volume. Owns the container file exclusively for the
/// lifetime of the mount; a second mount on the same container is undefined.
#[derive(Debug)]
pub struct DiskFs {
    device: BlockDevice,
    fat: Fat,
    blt: BlockTable,
    creds: Creds,
}

impl DiskFs {
    /// Mounts `container`, creating and formatting it when it does not
    /// exist yet. A fresh volume persists an all-empty FAT and a BLT whose
    /// FAT + BLT region is reserved and whose data region is free.
    pub fn mount(container: impl AsRef<Path>, creds: Creds) -> Result<Self> {
        let container = container.as_ref();
        match BlockDevice::open(container) {
            Ok(mut device) => {
                info!("container {} exists, reading tables", container.display());
                let fat = Fat::load(&mut device)?;
                let blt = BlockTable::load(&mut device)?;
                Ok(Self { device, fat, blt, creds })
            }
            Err(FsError::NotFound) => {
                info!("container {} does not exist, formatting", container.display());
                let mut device = BlockDevice::create(container)?;
                let fat = Fat::new();
                let blt = BlockTable::new();
                fat.persist(&mut device)?;
                blt.persist(&mut device)?;
                Ok(Self { device, fat, blt, creds })
            }
            Err(e) => Err(e),
        }
    }

    /// Unmount: flush both tables and close the container.
    pub fn unmount(mut self) -> Result<()> {
        debug!("unmount: flushing tables");
        self.fat.persist(&mut self.device)?;
        self.blt.persist(&mut self.device)?;
        Ok(())
    }

    pub fn fat(&self) -> &Fat {
        &self.fat
    }

    pub fn blt(&self) -> &BlockTable {
        &self.blt
    }

    fn lookup(&self, path: &str) -> Result<usize> {
        self.fat.lookup(name_of(path)?.as_bytes())
    }

    /// The file's block chain in lookup order; empty for chainless files.
    fn chain_of(&self, entry: &FatEntry) -> Result<Vec<u16>> {
        self.blt.chain(entry.start_block, entry.block_count as usize)
    }
}

impl FsOps for DiskFs {
    fn getattr(&mut self, path: &str) -> Result<FileStat> {
        debug!("getattr(path={:?})", path);
        if path == "/" {
            return Ok(FileStat {
                mode: S_IFDIR | 0o755,
                nlink: 2,
                ..FileStat::default()
            });
        }

        let index = self.lookup(path)?;
        let entry = self.fat.entry(index);
        let stat = FileStat {
            uid: entry.uid,
            gid: entry.gid,
            mode: entry.mode,
            nlink: 1,
            size: entry.size as u64,
            atime: entry.atime as i64,
            mtime: entry.mtime as i64,
            ctime: entry.ctime as i64,
        };

        // Reading attributes counts as an access.
        let now = now_epoch();
        let entry = self.fat.entry_mut(index);
        entry.atime = now;
        entry.ctime = now;
        self.fat.persist(&mut self.device)?;

        Ok(stat)
    }

    fn mknod(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("mknod(path={:?}, mode={:o})", path, mode);
        let name = name_of(path)?.as_bytes();
        if name.is_empty() {
            return Err(FsError::InvalidArgument);
        }
        if self.fat.lookup(name).is_ok() {
            debug!("mknod: {:?} already exists", path);
            return Err(FsError::AlreadyExists);
        }
        if name.len() > MAX_NAME_LENGTH {
            debug!("mknod: name of {} bytes is too long", name.len());
            return Err(FsError::NameTooLong);
        }
        let index = self.fat.allocate()?;

        let now = now_epoch();
        let entry = self.fat.entry_mut(index);
        *entry = FatEntry::EMPTY;
        entry.set_name(name);
        entry.uid = self.creds.uid;
        entry.gid = self.creds.gid;
        entry.mode = mode;
        entry.atime = now;
        entry.mtime = now;
        entry.ctime = now;
        self.fat.persist(&mut self.device)?;
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        debug!("unlink(path={:?})", path);
        let index = self.lookup(path)?;
        let entry = *self.fat.entry(index);

        if entry.block_count > 0 {
            debug!("unlink: freeing {} chain blocks", entry.block_count);
            let chain = self.chain_of(&entry)?;
            for &block in &chain {
                self.blt.set(block, BlockLink::Free);
            }
            // Blocks are released before the name disappears: a crash in
            // between leaks a named slot with no chain, which the next
            // mount can detect, instead of a name pointing at freed blocks.
            self.blt.persist(&mut self.device)?;
        }

        *self.fat.entry_mut(index) = FatEntry::EMPTY;
        self.fat.persist(&mut self.device)?;
        Ok(())
    }

    fn rename(&mut self, path: &str, new_path: &str) -> Result<()> {
        debug!("rename(path={:?}, new_path={:?})", path, new_path);
        let index = self.lookup(path)?;

        // An existing file under the new name is replaced.
        if self.lookup(new_path).is_ok() {
            debug!("rename: target {:?} exists, unlinking it", new_path);
            self.unlink(new_path)?;
        }

        let new_name = name_of(new_path)?.as_bytes();
        if new_name.len() > MAX_NAME_LENGTH {
            return Err(FsError::NameTooLong);
        }
        if new_name.is_empty() {
            return Err(FsError::InvalidArgument);
        }

        let now = now_epoch();
        let entry = self.fat.entry_mut(index);
        entry.set_name(new_name);
        entry.mtime = now;
        entry.ctime = now;
        self.fat.persist(&mut self.device)?;
        Ok(())
    }

    fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("chmod(path={:?}, mode={:o})", path, mode);
        let index = self.lookup(path)?;
        let now = now_epoch();
        let entry = self.fat.entry_mut(index);
        entry.mode = mode;
        entry.mtime = now;
        entry.ctime = now;
        self.fat.persist(&mut self.device)?;
        Ok(())
    }

    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()> {
        debug!("chown(path={:?}, uid={}, gid={})", path, uid, gid);
        let index = self.lookup(path)?;
        let now = now_epoch();
        let entry = self.fat.entry_mut(index);
        entry.uid = uid;
        entry.gid = gid;
        entry.mtime = now;
        entry.ctime = now;
        self.fat.persist(&mut self.device)?;
        Ok(())
    }

    fn truncate(&mut self, path: &str, new_size: u64) -> Result<()> {
        debug!("truncate(path={:?}, new_size={})", path, new_size);
        let index = self.lookup(path)?;
        let entry = *self.fat.entry(index);

        if new_size == entry.size as u64 {
            return Ok(());
        }

        let n_old = entry.block_count as usize;
        let n_new = (new_size as usize).div_ceil(BLOCK_SIZE);

        if n_new < n_old {
            let chain = self.chain_of(&entry)?;
            if n_new == 0 {
                debug!("truncate: releasing the whole {}-block chain", n_old);
                for &block in &chain {
                    self.blt.set(block, BlockLink::Free);
                }
                self.fat.entry_mut(index).start_block = 0;
            } else {
                debug!("truncate: shrinking chain {} -> {} blocks", n_old, n_new);
                self.blt.set(chain[n_new - 1], BlockLink::Eof);
                for &block in &chain[n_new..] {
                    self.blt.set(block, BlockLink::Free);
                }
            }
            self.fat.entry_mut(index).block_count = n_new as u16;
            self.blt.persist(&mut self.device)?;
        } else if n_new > n_old {
            debug!("truncate: growing chain {} -> {} blocks", n_old, n_new);
            // All blocks are reserved up front; a short volume fails here
            // with no linkage touched.
            let fresh = self.blt.find_free_blocks(n_new - n_old)?;

            let (mut tail, rest) = if n_old == 0 {
                let start = fresh[0];
                self.blt.set(start, BlockLink::Eof);
                self.fat.entry_mut(index).start_block = start;
                (start, &fresh[1..])
            } else {
                let chain = self.chain_of(&entry)?;
                (chain[n_old - 1], &fresh[..])
            };
            for &block in rest {
                self.blt.set(tail, BlockLink::Next(block));
                self.blt.set(block, BlockLink::Eof);
                tail = block;
            }
            self.fat.entry_mut(index).block_count = n_new as u16;
            self.blt.persist(&mut self.device)?;
        }
        // n_new == n_old: only the byte size changes.

        let now = now_epoch();
        let entry = self.fat.entry_mut(index);
        entry.size = new_size as u32;
        entry.mtime = now;
        entry.ctime = now;
        self.fat.persist(&mut self.device)?;
        Ok(())
    }

    fn open(&mut self, path: &str) -> Result<u64> {
        debug!("open(path={:?})", path);
        let index = self.lookup(path)?;
        let entry = self.fat.entry(index);
        // A file owned by neither the caller's user nor group stays hidden.
        if entry.uid != self.creds.uid && entry.gid != self.creds.gid {
            debug!("open: owner mismatch on {:?}", path);
            return Err(FsError::NotFound);
        }

        self.fat.entry_mut(index).atime = now_epoch();
        self.fat.persist(&mut self.device)?;
        Ok(index as u64)
    }

    fn read(&mut self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        debug!("read(path={:?}, size={}, offset={})", path, buf.len(), offset);
        let index = self.lookup(path)?;
        let entry = *self.fat.entry(index);
        let chain = self.chain_of(&entry)?;
        let file_size = entry.size as u64;

        let mut block_buf = [0u8; BLOCK_SIZE];
        let mut pos = offset;
        let mut copied = 0;
        while copied < buf.len() {
            let block_offset = (pos % BLOCK_SIZE as u64) as usize;
            let chunk = ((BLOCK_SIZE - block_offset) as u64)
                .min(file_size.saturating_sub(pos))
                .min((buf.len() - copied) as u64) as usize;
            if chunk == 0 {
                // End of file; an offset past it reads zero bytes.
                debug!("read: hit end of file after {} bytes", copied);
                break;
            }
            let block_index = (pos / BLOCK_SIZE as u64) as usize;
            self.device.read(chain[block_index] as u32, &mut block_buf)?;
            buf[copied..copied + chunk]
                .copy_from_slice(&block_buf[block_offset..block_offset + chunk]);
            pos += chunk as u64;
            copied += chunk;
        }

        self.fat.entry_mut(index).atime = now_epoch();
        self.fat.persist(&mut self.device)?;
        debug!("read -> {}", copied);
        Ok(copied)
    }

    fn write(&mut self, path: &str, buf: &[u8], offset: u64) -> Result<usize> {
        debug!("write(path={:?}, size={}, offset={})", path, buf.len(), offset);
        let index = self.lookup(path)?;

        let end = offset + buf.len() as u64;
        if end > self.fat.entry(index).size as u64 {
            debug!("write: enlarging file to {} bytes", end);
            self.truncate(path, end)?;
        }

        let entry = *self.fat.entry(index);
        let chain = self.chain_of(&entry)?;

        let mut block_buf = [0u8; BLOCK_SIZE];
        let mut pos = offset as usize;
        let mut copied = 0;
        while copied < buf.len() {
            let block_index = pos / BLOCK_SIZE;
            let block_offset = pos % BLOCK_SIZE;
            let chunk = (BLOCK_SIZE - block_offset).min(buf.len() - copied);
            // Writes need not be block-aligned, so the rest of the block
            // must survive: fetch, splice, write back.
            self.device.read(chain[block_index] as u32, &mut block_buf)?;
            block_buf[block_offset..block_offset + chunk]
                .copy_from_slice(&buf[copied..copied + chunk]);
            self.device.write(chain[block_index] as u32, &block_buf)?;
            pos += chunk;
            copied += chunk;
        }

        let now = now_epoch();
        let entry = self.fat.entry_mut(index);
        if (entry.size as u64) < end {
            entry.size = end as u32;
        }
        entry.mtime = now;
        entry.ctime = now;
        self.fat.persist(&mut self.device)?;
        debug!("write -> {}", buf.len());
        Ok(buf.len())
    }

    fn release(&mut self, path: &str, _handle: u64) -> Result<()> {
        debug!("release(path={:?})", path);
        Ok(())
    }

    fn readdir(&mut self, path: &str) -> Result<Vec<String>> {
        debug!("readdir(path={:?})", path);
        if path != "/" {
            return Err(FsError::NotDirectory);
        }
        let mut entries = vec![".".to_string(), "..".to_string()];
        for entry in self.fat.entries() {
            if !entry.is_empty() {
                entries.push(String::from_utf8_lossy(entry.name_bytes()).into_owned());
            }
        }
        debug!("readdir -> {} entries", entries.len());
        Ok(entries)
    }
}
