//! our simulated filesystem
pub mod block_group;
pub mod directory;
pub mod error;
pub mod filekind;
pub mod fs_layout;
pub mod inode;
pub mod path;
pub mod permission;
pub mod region;
pub mod superblock;
pub mod user;
mod file_io;
mod fs_api_impl;
mod links;
mod persistence;
pub(crate) use block_group::*;
pub use directory::*;
pub use error::*;
pub use filekind::*;
pub use fs_api_impl::{CopyMode, DirectoryListing};
pub use fs_layout::*;
pub use inode::*;
pub use path::*;
pub use permission::*;
pub use region::*;
pub use superblock::*;
pub use user::*;

use crate::utils::fs_size_calculator;

/// index of an inode in the Inode Table
pub type InodeNumber = u32;

pub const FS_MAGIC: u32 = 0x1234_5678;
pub const ROOT_INODE: InodeNumber = 0;
pub const BLOCK_SIZE: u32 = 512;
pub const NUM_BLOCKS: u32 = 1024;
pub const MAX_INODES: u32 = 100;
/// stored name length, the last byte is always a NUL pad
pub const MAX_NAME_LENGTH: usize = 32;
/// fixed stride of a serialized [Inode] in the Inode Table
pub const INODE_SIZE: u32 = 128;
pub const DIRECT_POINTERS: usize = 12;
pub const MAX_SYMLINK_DEPTH: u32 = 10;

pub const SUPERBLOCK_BLOCK: u32 = 0;
pub const INODE_BITMAP_BLOCK: u32 = 1;
pub const BLOCK_BITMAP_BLOCK: u32 = 2;
pub const INODE_TABLE_BLOCK: u32 = 3;
pub const USERSPACE_OFFSET: u32 = fs_size_calculator::user_space_offset();
pub const PARTITION_SIZE: usize = fs_size_calculator::region_size(NUM_BLOCKS, BLOCK_SIZE);
/// file content lives in direct blocks only
pub const MAX_FILE_SIZE: usize = DIRECT_POINTERS * BLOCK_SIZE as usize;
