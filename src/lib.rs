//! flatfs is a single-directory, fixed-capacity file system persisted into
//! one block-addressed container file.
//!
//! Container layout (512-byte blocks):
//! - Blocks 0..8:    FAT, 64 file slots of 64 packed bytes each
//! - Blocks 8..264:  BLT, one u16 successor per block in the volume
//! - Blocks 264..:   file data, linked into per-file chains via the BLT
//!
//! Layers (from bottom to top):
//! 1. Block Device: fixed-size block I/O against the container file.
//! 2. BLT: per-block successor table encoding chains and free space.
//! 3. FAT: the fixed array of file descriptors (name, metadata, chain head).
//! 4. Core: the host operations (create, unlink, rename, read, write,
//!    truncate, stat, readdir) composed from the layers below.
//!
//! Two variants share the `FsOps` contract: `DiskFs` persists every mutation
//! before returning, `MemFs` keeps everything in memory and is gone on drop.
//! Dispatch is single-threaded by design; nothing here takes a lock.

mod block_dev;
mod blt;
mod config;
mod error;
mod fat;
mod fs;
pub mod logging;
mod memfs;
mod ops;
mod options;

pub use block_dev::BlockDevice;
pub use blt::{BlockLink, BlockTable};
pub use config::*;
pub use error::{FsError, Result};
pub use fat::{Fat, FatEntry};
pub use fs::DiskFs;
pub use memfs::MemFs;
pub use ops::{Creds, FileStat, FsOps, S_IFDIR, S_IFREG};
pub use options::MountOptions;

/// Seconds since the epoch, in the on-disk timestamp width.
pub(crate) fn now_epoch() -> i32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i32)
        .unwrap_or(0)
}

/// Slice of `bytes` up to the first NUL.
pub(crate) fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}
