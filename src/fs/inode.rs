use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::utils::{
    time_util::{self, TimeDurationStruct},
    traits::FixedRecord,
};

use super::{filekind::FileKind, FsError, LogicalBlock, Result, DIRECT_POINTERS, INODE_SIZE};

pub const S_IFMT: u32 = libc::S_IFMT as u32;
pub const S_IFDIR: u32 = libc::S_IFDIR as u32;
pub const S_IFREG: u32 = libc::S_IFREG as u32;
pub const S_IFLNK: u32 = libc::S_IFLNK as u32;
/// setuid, setgid, sticky and the three rwx triplets
pub const PERMISSION_MASK: u32 = 0o7777;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Inode {
    /// type bits and permission bits
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// size in bytes
    pub size: u32,
    pub accessed_at: TimeDurationStruct,
    pub modified_at: TimeDurationStruct,
    pub changed_at: TimeDurationStruct,
    pub direct_blocks: [Option<LogicalBlock>; DIRECT_POINTERS],
    /// a block holding a flat array of further block numbers
    pub indirect_block: Option<LogicalBlock>,
    pub links_count: u32,
}

impl FixedRecord for Inode {
    const RECORD_SIZE: usize = INODE_SIZE as usize;
}

impl Inode {
    /// a fresh inode stamped with the current time, owning no blocks
    pub fn new(mode: u32, uid: u32, gid: u32) -> Self {
        let now = time_util::now();
        Inode {
            mode,
            uid,
            gid,
            accessed_at: now,
            modified_at: now,
            changed_at: now,
            ..Default::default()
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == FileKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind() == FileKind::SymbolicLink
    }

    pub fn permissions(&self) -> u32 {
        self.mode & PERMISSION_MASK
    }

    /// replace the permission bits and keep the type bits
    pub fn set_permissions(&mut self, mode: u32) {
        self.mode = (self.mode & S_IFMT) | (mode & PERMISSION_MASK);
        self.update_changed_at();
    }

    pub fn update_accessed_at(&mut self) {
        self.accessed_at = time_util::now();
    }

    pub fn update_modified_at(&mut self) {
        self.modified_at = time_util::now();
    }

    pub fn update_changed_at(&mut self) {
        self.changed_at = time_util::now();
    }

    pub fn accessed(&self) -> SystemTime {
        self.accessed_at.into()
    }

    pub fn modified(&self) -> SystemTime {
        self.modified_at.into()
    }

    pub fn changed(&self) -> SystemTime {
        self.changed_at.into()
    }
}

/// block pointers
impl Inode {
    /// the direct blocks in use, in order
    pub fn direct_blocks(&self) -> Vec<LogicalBlock> {
        self.direct_blocks.iter().flatten().copied().collect()
    }

    /// detach every direct block and empty the file
    /// # Returns
    /// the detached blocks, which the caller must release
    pub fn truncate(&mut self) -> Vec<LogicalBlock> {
        self.update_modified_at();
        self.size = 0;
        let blocks = self.direct_blocks();
        self.direct_blocks = [None; DIRECT_POINTERS];
        blocks
    }

    pub fn add_block(&mut self, block: LogicalBlock, index: usize) -> Result<()> {
        let slot = self
            .direct_blocks
            .get_mut(index)
            .ok_or(FsError::FileTooLarge)?;
        *slot = Some(block);
        Ok(())
    }
}
