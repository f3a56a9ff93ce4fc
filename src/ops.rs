//! The host operation contract shared by the on-disk and volatile variants.
//! Every operation is synchronous and completes before returning; results
//! map to negated POSIX errnos at the host boundary via `FsError::errno`.

use crate::error::{FsError, Result};

pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;

/// Identity of the mounting caller. Injected at construction instead of read
/// from the process, so the core stays a plain value the host shim owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Creds {
    pub uid: u32,
    pub gid: u32,
}

/// File metadata as reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

/// The single-directory file system operations the host adapter dispatches
/// into. Object-safe so a shim can hold either variant as `Box<dyn FsOps>`.
pub trait FsOps {
    fn getattr(&mut self, path: &str) -> Result<FileStat>;
    fn mknod(&mut self, path: &str, mode: u32) -> Result<()>;
    fn unlink(&mut self, path: &str) -> Result<()>;
    fn rename(&mut self, path: &str, new_path: &str) -> Result<()>;
    fn chmod(&mut self, path: &str, mode: u32) -> Result<()>;
    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()>;
    fn truncate(&mut self, path: &str, new_size: u64) -> Result<()>;
    /// Handle-based truncate; funnels to the by-path implementation.
    fn ftruncate(&mut self, path: &str, new_size: u64, _handle: u64) -> Result<()> {
        self.truncate(path, new_size)
    }
    /// Returns an opaque handle for the opened file.
    fn open(&mut self, path: &str) -> Result<u64>;
    fn read(&mut self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize>;
    fn write(&mut self, path: &str, buf: &[u8], offset: u64) -> Result<usize>;
    fn release(&mut self, path: &str, handle: u64) -> Result<()>;
    fn readdir(&mut self, path: &str) -> Result<Vec<String>>;
}

/// Strips exactly one leading slash; everything after it is the stored name.
pub(crate) fn name_of(path: &str) -> Result<&str> {
    path.strip_prefix('/').ok_or(FsError::InvalidArgument)
}
