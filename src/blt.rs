//! The block linkage table: one successor value per block, encoding both the
//! per-file chains and the free-space state. Stored in blocks 8..264 as
//! little-endian u16 values, 256 per block.

use crate::block_dev::BlockDevice;
use crate::config::*;
use crate::error::{FsError, Result};

/// In-memory view of one BLT slot. On disk the variants map to the numeric
/// sentinels FREE/EOF/RESERVED; any other value is the successor block id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLink {
    Free,
    Eof,
    Reserved,
    Next(u16),
}

impl BlockLink {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            BLT_FREE => Self::Free,
            BLT_EOF => Self::Eof,
            BLT_RSV => Self::Reserved,
            next => Self::Next(next),
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            Self::Free => BLT_FREE,
            Self::Eof => BLT_EOF,
            Self::Reserved => BLT_RSV,
            Self::Next(next) => next,
        }
    }
}

#[derive(Debug)]
pub struct BlockTable {
    links: Vec<BlockLink>,
}

impl BlockTable {
    /// Freshly formatted table: the FAT + BLT region is permanently
    /// reserved, everything above it is free.
    pub fn new() -> Self {
        let mut links = vec![BlockLink::Free; TOTAL_BLOCKS];
        for link in links.iter_mut().take(DATA_START) {
            *link = BlockLink::Reserved;
        }
        Self { links }
    }

    /// Reads blocks FAT_BLOCKS..DATA_START and decodes all 65 536 links.
    pub fn load(device: &mut BlockDevice) -> Result<Self> {
        let mut links = Vec::with_capacity(TOTAL_BLOCKS);
        let mut buf = [0u8; BLOCK_SIZE];
        for block_no in 0..BLT_BLOCKS {
            device.read((FAT_BLOCKS + block_no) as u32, &mut buf)?;
            for i in 0..BLT_ENTRIES_PER_BLOCK {
                let raw = u16::from_le_bytes([buf[i * 2], buf[i * 2 + 1]]);
                links.push(BlockLink::from_raw(raw));
            }
        }
        Ok(Self { links })
    }

    /// Rewrites the whole table, like the FAT: one mutation, one flush.
    pub fn persist(&self, device: &mut BlockDevice) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        for block_no in 0..BLT_BLOCKS {
            for i in 0..BLT_ENTRIES_PER_BLOCK {
                let raw = self.links[block_no * BLT_ENTRIES_PER_BLOCK + i].to_raw();
                buf[i * 2..i * 2 + 2].copy_from_slice(&raw.to_le_bytes());
            }
            device.write((FAT_BLOCKS + block_no) as u32, &buf)?;
        }
        Ok(())
    }

    pub fn get(&self, block: u16) -> BlockLink {
        self.links[block as usize]
    }

    pub fn set(&mut self, block: u16, link: BlockLink) {
        self.links[block as usize] = link;
    }

    /// Smallest free block id. First-fit keeps allocation deterministic.
    pub fn find_free(&self) -> Result<u16> {
        self.links
            .iter()
            .position(|&l| l == BlockLink::Free)
            .map(|b| b as u16)
            .ok_or(FsError::NoSpace)
    }

    /// The `count` smallest free block ids, without marking them. Equivalent
    /// to `count` sequential first-fit allocations; a shortfall returns
    /// `NoSpace` before any link has been touched.
    pub fn find_free_blocks(&self, count: usize) -> Result<Vec<u16>> {
        let free: Vec<u16> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == BlockLink::Free)
            .map(|(b, _)| b as u16)
            .take(count)
            .collect();
        if free.len() < count {
            return Err(FsError::NoSpace);
        }
        Ok(free)
    }

    /// Follows `count` successors from `start`. The final link must be EOF
    /// and no link may pass through a free or reserved block (invariant of
    /// every well-formed chain).
    pub fn chain(&self, start: u16, count: usize) -> Result<Vec<u16>> {
        let mut blocks = Vec::with_capacity(count);
        let mut current = start;
        for i in 0..count {
            blocks.push(current);
            match self.get(current) {
                BlockLink::Next(next) if i + 1 < count => current = next,
                BlockLink::Eof if i + 1 == count => {}
                link => {
                    return Err(FsError::Corrupted(format!(
                        "chain from block {} breaks at {} ({:?})",
                        start, current, link
                    )))
                }
            }
        }
        Ok(blocks)
    }
}
