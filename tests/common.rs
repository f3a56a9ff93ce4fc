//! Common utilities for tests
#![allow(unused)]

use std::path::{Path, PathBuf};

use flatfs::*;

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
}

/// A uniquely named container file under the system temp directory, removed
/// again when the test is done. The tag keeps parallel tests apart.
pub struct TempContainer {
    path: PathBuf,
}

impl TempContainer {
    pub fn new(tag: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("flatfs-{}-{}.bin", tag, std::process::id()));
        let _ = std::fs::remove_file(&path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempContainer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn creds() -> Creds {
    Creds { uid: 1000, gid: 1000 }
}

/// Asserts the on-disk invariants over a mounted volume: the reserved
/// region is intact, every live file's chain is well-formed and sized to
/// its byte count, no block sits in two chains, and every unowned data
/// block is free.
pub fn check_volume(fs: &DiskFs) {
    let fat = fs.fat();
    let blt = fs.blt();

    for block in 0..DATA_START as u16 {
        assert_eq!(
            blt.get(block),
            BlockLink::Reserved,
            "block {} left the reserved region",
            block
        );
    }

    let mut owner = vec![None::<usize>; TOTAL_BLOCKS];
    for (slot, entry) in fat.entries().iter().enumerate() {
        if entry.is_empty() {
            assert_eq!(entry.block_count, 0, "empty slot {} keeps a chain", slot);
            assert_eq!(entry.size, 0, "empty slot {} keeps a size", slot);
            continue;
        }
        assert_eq!(
            entry.block_count as usize,
            (entry.size as usize).div_ceil(BLOCK_SIZE),
            "slot {} size and block count disagree",
            slot
        );
        let chain = blt
            .chain(entry.start_block, entry.block_count as usize)
            .expect("live chain must be well-formed");
        for &block in &chain {
            assert!(
                block as usize >= DATA_START,
                "slot {} chains through reserved block {}",
                slot,
                block
            );
            assert!(
                owner[block as usize].is_none(),
                "block {} belongs to slots {:?} and {}",
                block,
                owner[block as usize],
                slot
            );
            owner[block as usize] = Some(slot);
        }
    }

    for block in DATA_START..TOTAL_BLOCKS {
        if owner[block].is_none() {
            assert_eq!(
                blt.get(block as u16),
                BlockLink::Free,
                "unowned block {} is not free",
                block
            );
        }
    }
}
