//! size calculations for the on-disk layout of the partition

use crate::fs::{BLOCK_SIZE, INODE_SIZE, INODE_TABLE_BLOCK, MAX_INODES};

/// calculate needed bitmap size in bytes
/// # Arguments
/// - `element_count`: the number of blocks or inodes tracked by the bitmap
/// # Return
/// the size of the bitmap
/// # Example
/// ```
/// use simfs::utils::fs_size_calculator::bitmap_size;
/// let inode_count = 100;
/// let bitmap_size = bitmap_size(inode_count);
/// assert_eq!(bitmap_size, 13);
/// ```
pub const fn bitmap_size(element_count: u32) -> usize {
    element_count.div_ceil(8) as usize
}

/// calculate needed Inode Table size in bytes
/// # Arguments
/// - `inode_count`: the number of inodes
/// # Example
/// ```
/// use simfs::utils::fs_size_calculator::inode_table_size;
/// use simfs::INODE_SIZE;
/// let table_size = inode_table_size(100);
/// assert_eq!(table_size, 100 * INODE_SIZE as usize);
/// ```
pub const fn inode_table_size(inode_count: u32) -> usize {
    inode_count as usize * INODE_SIZE as usize
}

/// calculate how many whole blocks the Inode Table spans
/// # Example
/// ```
/// use simfs::utils::fs_size_calculator::inode_table_blocks;
/// assert_eq!(inode_table_blocks(100, 512), 25);
/// ```
pub const fn inode_table_blocks(inode_count: u32, block_size: u32) -> u32 {
    (inode_table_size(inode_count) as u32).div_ceil(block_size)
}

/// the first block of the user space region,
/// right after the Inode Table
/// # Example
/// ```
/// use simfs::utils::fs_size_calculator::user_space_offset;
/// assert_eq!(user_space_offset(), 28);
/// ```
pub const fn user_space_offset() -> u32 {
    INODE_TABLE_BLOCK + inode_table_blocks(MAX_INODES, BLOCK_SIZE)
}

/// calculate the byte size of a region holding `block_count` blocks
/// # Example
/// ```
/// use simfs::utils::fs_size_calculator::region_size;
/// assert_eq!(region_size(1024, 512), 512 * 1024);
/// ```
pub const fn region_size(block_count: u32, block_size: u32) -> usize {
    block_count as usize * block_size as usize
}
