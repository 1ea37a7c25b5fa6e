//! the raw byte region every other structure is carved from
//!
//! block layout, in blocks from the region start:
//! - `SUPERBLOCK_BLOCK`: the [SuperBlock](super::SuperBlock)
//! - `INODE_BITMAP_BLOCK`, `BLOCK_BITMAP_BLOCK`: allocation bitmaps
//! - `INODE_TABLE_BLOCK..USERSPACE_OFFSET`: the Inode Table
//! - `USERSPACE_OFFSET..NUM_BLOCKS`: user space, addressed by [LogicalBlock]
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    FsError, InodeNumber, Result, BLOCK_SIZE, INODE_SIZE, INODE_TABLE_BLOCK, MAX_INODES,
    NUM_BLOCKS, PARTITION_SIZE, USERSPACE_OFFSET,
};
use crate::utils::fs_size_calculator;

/// a block number relative to the start of user space
///
/// this is the only block number handed out of the allocator
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct LogicalBlock(u32);

impl LogicalBlock {
    pub const fn new(index: u32) -> Self {
        LogicalBlock(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    /// whether the block lies inside user space
    pub const fn in_user_space(self) -> bool {
        self.0 < NUM_BLOCKS - USERSPACE_OFFSET
    }
}

impl fmt::Display for LogicalBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a block number counted from the start of the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct AbsoluteBlock(u32);

impl AbsoluteBlock {
    pub(crate) const fn new(index: u32) -> Self {
        AbsoluteBlock(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// `None` for reserved system blocks
    pub(crate) fn logical(self) -> Option<LogicalBlock> {
        self.0.checked_sub(USERSPACE_OFFSET).map(LogicalBlock)
    }
}

impl TryFrom<LogicalBlock> for AbsoluteBlock {
    type Error = FsError;

    fn try_from(block: LogicalBlock) -> Result<Self> {
        block
            .0
            .checked_add(USERSPACE_OFFSET)
            .filter(|&index| index < NUM_BLOCKS)
            .map(AbsoluteBlock)
            .ok_or_else(|| FsError::Format(format!("block {block} is outside user space")))
    }
}

/// an owned `NUM_BLOCKS * BLOCK_SIZE` byte buffer with bounds-checked views
#[derive(Clone, PartialEq, Eq)]
pub struct Region {
    bytes: Vec<u8>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl Region {
    /// a zero-filled region
    pub fn new() -> Self {
        Region {
            bytes: vec![0; PARTITION_SIZE],
        }
    }

    /// take over a buffer read back from an image
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != PARTITION_SIZE {
            return Err(FsError::Format(format!(
                "region is {} bytes, expected {PARTITION_SIZE}",
                bytes.len()
            )));
        }
        Ok(Region { bytes })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn block(&self, block: AbsoluteBlock) -> Result<&[u8]> {
        let range = Self::block_range(block)?;
        Ok(&self.bytes[range])
    }

    pub(crate) fn block_mut(&mut self, block: AbsoluteBlock) -> Result<&mut [u8]> {
        let range = Self::block_range(block)?;
        Ok(&mut self.bytes[range])
    }

    /// a user space block
    #[inline]
    pub fn data(&self, block: LogicalBlock) -> Result<&[u8]> {
        self.block(block.try_into()?)
    }

    #[inline]
    pub fn data_mut(&mut self, block: LogicalBlock) -> Result<&mut [u8]> {
        self.block_mut(block.try_into()?)
    }

    pub(crate) fn zero_block(&mut self, block: AbsoluteBlock) -> Result<()> {
        self.block_mut(block)?.fill(0);
        Ok(())
    }

    /// the `INODE_SIZE` bytes holding inode `ino`
    pub fn inode_slot(&self, ino: InodeNumber) -> Result<&[u8]> {
        let range = Self::inode_range(ino)?;
        Ok(&self.bytes[range])
    }

    pub fn inode_slot_mut(&mut self, ino: InodeNumber) -> Result<&mut [u8]> {
        let range = Self::inode_range(ino)?;
        Ok(&mut self.bytes[range])
    }

    /// all `MAX_INODES` inode slots, back to back
    pub fn inode_table(&self) -> &[u8] {
        &self.bytes[Self::inode_table_range()]
    }

    pub(crate) fn inode_table_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[Self::inode_table_range()]
    }

    fn block_range(block: AbsoluteBlock) -> Result<std::ops::Range<usize>> {
        if block.0 >= NUM_BLOCKS {
            return Err(FsError::Format(format!(
                "block {} is outside the partition",
                block.0
            )));
        }
        let start = block.index() * BLOCK_SIZE as usize;
        Ok(start..start + BLOCK_SIZE as usize)
    }

    fn inode_range(ino: InodeNumber) -> Result<std::ops::Range<usize>> {
        if ino >= MAX_INODES {
            return Err(FsError::InvalidOperation("inode number out of range"));
        }
        let start = Self::inode_table_range().start + ino as usize * INODE_SIZE as usize;
        Ok(start..start + INODE_SIZE as usize)
    }

    const fn inode_table_range() -> std::ops::Range<usize> {
        let start = INODE_TABLE_BLOCK as usize * BLOCK_SIZE as usize;
        start..start + fs_size_calculator::inode_table_size(MAX_INODES)
    }
}
