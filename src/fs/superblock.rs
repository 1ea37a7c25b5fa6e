use serde::{Deserialize, Serialize};

use crate::utils::{
    time_util::{self, TimeDurationStruct},
    traits::FixedRecord,
};

use super::{
    FsError, Result, BLOCK_SIZE, FS_MAGIC, INODE_SIZE, MAX_INODES, NUM_BLOCKS, USERSPACE_OFFSET,
};

/// The superblock of this filesystem
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperBlock {
    /// magic number
    pub magic: u32,
    /// total blocks in the region, system blocks included
    pub num_blocks: u32,
    pub num_inodes: u32,
    /// absolute number of the first user space block
    pub first_data_block: u32,
    pub block_size: u32,
    /// stride of one inode record
    pub inode_size: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub created_at: TimeDurationStruct,
}

impl FixedRecord for SuperBlock {
    const RECORD_SIZE: usize = BLOCK_SIZE as usize;
}

impl SuperBlock {
    /// a superblock for an empty partition, every user space block and inode free
    pub fn new() -> Self {
        Self {
            magic: FS_MAGIC,
            num_blocks: NUM_BLOCKS,
            num_inodes: MAX_INODES,
            first_data_block: USERSPACE_OFFSET,
            block_size: BLOCK_SIZE,
            inode_size: INODE_SIZE,
            blocks_per_group: NUM_BLOCKS,
            inodes_per_group: MAX_INODES,
            free_blocks_count: NUM_BLOCKS - USERSPACE_OFFSET,
            free_inodes_count: MAX_INODES,
            created_at: time_util::now(),
        }
    }

    /// blocks an allocator may ever hand out
    pub fn user_blocks(&self) -> u32 {
        self.num_blocks - self.first_data_block
    }

    /// reject a superblock this build can't operate on
    pub fn validate(&self) -> Result<()> {
        if self.magic != FS_MAGIC {
            return Err(FsError::Format(format!(
                "bad magic number {:#x}, expected {FS_MAGIC:#x}",
                self.magic
            )));
        }
        let geometry = (
            self.num_blocks,
            self.num_inodes,
            self.first_data_block,
            self.block_size,
            self.inode_size,
        );
        if geometry != (NUM_BLOCKS, MAX_INODES, USERSPACE_OFFSET, BLOCK_SIZE, INODE_SIZE) {
            return Err(FsError::Format(format!(
                "unsupported geometry: {} blocks of {} bytes, {} inodes",
                self.num_blocks, self.block_size, self.num_inodes
            )));
        }
        if self.free_blocks_count > self.user_blocks() || self.free_inodes_count > self.num_inodes {
            return Err(FsError::Format("free counts exceed capacity".to_string()));
        }
        Ok(())
    }
}
