//! The volatile variant: the same operation surface over an ordered list of
//! in-memory files. Nothing touches a device and nothing survives a drop;
//! it doubles as a reference oracle for the persistent core.

use log::debug;

use crate::config::MAX_NAME_LENGTH;
use crate::error::{FsError, Result};
use crate::now_epoch;
use crate::ops::{name_of, Creds, FileStat, FsOps, S_IFDIR};

#[derive(Debug)]
struct MemFile {
    name: String,
    uid: u32,
    gid: u32,
    mode: u32,
    atime: i32,
    mtime: i32,
    ctime: i32,
    data: Vec<u8>,
}

#[derive(Debug)]
pub struct MemFs {
    files: Vec<MemFile>,
    creds: Creds,
}

impl MemFs {
    pub fn new(creds: Creds) -> Self {
        Self {
            files: Vec::new(),
            creds,
        }
    }

    fn find(&self, path: &str) -> Result<usize> {
        let name = name_of(path)?;
        self.files
            .iter()
            .position(|f| f.name == name)
            .ok_or(FsError::NotFound)
    }
}

impl FsOps for MemFs {
    fn getattr(&mut self, path: &str) -> Result<FileStat> {
        debug!("getattr(path={:?})", path);
        if path == "/" {
            return Ok(FileStat {
                mode: S_IFDIR | 0o755,
                nlink: 2,
                ..FileStat::default()
            });
        }
        let file = &self.files[self.find(path)?];
        Ok(FileStat {
            uid: file.uid,
            gid: file.gid,
            mode: file.mode,
            nlink: 1,
            size: file.data.len() as u64,
            atime: file.atime as i64,
            mtime: file.mtime as i64,
            ctime: file.ctime as i64,
        })
    }

    fn mknod(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("mknod(path={:?}, mode={:o})", path, mode);
        let name = name_of(path)?;
        if name.is_empty() {
            return Err(FsError::InvalidArgument);
        }
        if self.find(path).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(FsError::NameTooLong);
        }
        let now = now_epoch();
        self.files.push(MemFile {
            name: name.to_string(),
            uid: self.creds.uid,
            gid: self.creds.gid,
            mode,
            atime: now,
            mtime: now,
            ctime: now,
            data: Vec::new(),
        });
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        debug!("unlink(path={:?})", path);
        let index = self.find(path)?;
        self.files.remove(index);
        Ok(())
    }

    fn rename(&mut self, path: &str, new_path: &str) -> Result<()> {
        debug!("rename(path={:?}, new_path={:?})", path, new_path);
        self.find(path)?;
        if let Ok(existing) = self.find(new_path) {
            debug!("rename: target {:?} exists, replacing", new_path);
            self.files.remove(existing);
        }
        // Re-resolve: removing the target shifts later indices.
        let index = self.find(path)?;
        let new_name = name_of(new_path)?;
        if new_name.len() > MAX_NAME_LENGTH {
            return Err(FsError::NameTooLong);
        }
        if new_name.is_empty() {
            return Err(FsError::InvalidArgument);
        }
        let now = now_epoch();
        let file = &mut self.files[index];
        file.name = new_name.to_string();
        file.mtime = now;
        file.ctime = now;
        Ok(())
    }

    fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        debug!("chmod(path={:?}, mode={:o})", path, mode);
        let index = self.find(path)?;
        let now = now_epoch();
        let file = &mut self.files[index];
        file.mode = mode;
        file.mtime = now;
        file.ctime = now;
        Ok(())
    }

    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()> {
        debug!("chown(path={:?}, uid={}, gid={})", path, uid, gid);
        let index = self.find(path)?;
        let now = now_epoch();
        let file = &mut self.files[index];
        file.uid = uid;
        file.gid = gid;
        file.mtime = now;
        file.ctime = now;
        Ok(())
    }

    fn truncate(&mut self, path: &str, new_size: u64) -> Result<()> {
        debug!("truncate(path={:?}, new_size={})", path, new_size);
        let index = self.find(path)?;
        let now = now_epoch();
        let file = &mut self.files[index];
        file.data.resize(new_size as usize, 0);
        file.mtime = now;
        file.ctime = now;
        Ok(())
    }

    fn open(&mut self, path: &str) -> Result<u64> {
        debug!("open(path={:?})", path);
        let index = self.find(path)?;
        self.files[index].atime = now_epoch();
        Ok(index as u64)
    }

    fn read(&mut self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        debug!("read(path={:?}, size={}, offset={})", path, buf.len(), offset);
        let index = self.find(path)?;
        let file = &self.files[index];
        // Unlike the persistent core, an offset past the end is rejected.
        if offset > file.data.len() as u64 {
            return Err(FsError::InvalidArgument);
        }
        let offset = offset as usize;
        let count = (file.data.len() - offset).min(buf.len());
        buf[..count].copy_from_slice(&file.data[offset..offset + count]);
        debug!("read -> {}", count);
        Ok(count)
    }

    fn write(&mut self, path: &str, buf: &[u8], offset: u64) -> Result<usize> {
        debug!("write(path={:?}, size={}, offset={})", path, buf.len(), offset);
        // Writing to a file that was never created is a stale handle.
        let index = self.find(path).map_err(|_| FsError::BadHandle)?;
        let now = now_epoch();
        let file = &mut self.files[index];
        let end = offset as usize + buf.len();
        if end > file.data.len() {
            file.data.resize(end, 0);
        }
        file.data[offset as usize..end].copy_from_slice(buf);
        file.mtime = now;
        file.ctime = now;
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
        entries.extend(self.files.iter().map(|f| f.name.clone()));
        Ok(entries)
    }
}
