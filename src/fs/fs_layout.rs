//! what does our filesystem look like in the memory

use log::{debug, warn};

use super::{
    region::AbsoluteBlock, Group, Inode, InodeNumber, LogicalBlock, Region, Result, SuperBlock,
    User, BLOCK_BITMAP_BLOCK, BLOCK_SIZE, INODE_BITMAP_BLOCK, MAX_INODES, NUM_BLOCKS, ROOT_INODE,
    S_IFDIR, SUPERBLOCK_BLOCK, USERSPACE_OFFSET,
};
use crate::{fs::FsError, utils::traits::FixedRecord};

/// entries in an indirect block
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE as usize / std::mem::size_of::<i32>();
/// an unused entry of an indirect block
const NO_BLOCK: i32 = -1;

/// one simulated partition, it has the following layout:
/// - superblock
/// - inode bitmap and block bitmap
/// - inode table
/// - user space
///
/// the superblock and the bitmaps are kept decoded in memory and
/// written back into their blocks by [Partition::sync_metadata]
#[derive(Debug, Clone)]
pub struct Partition {
    pub(crate) superblock: SuperBlock,
    pub(crate) group: Group,
    pub(crate) region: Region,
    pub(crate) current_dir: InodeNumber,
    pub(crate) current_user: User,
}

impl Partition {
    /// create an empty partition holding only the root directory,
    /// acting as root from inside "/"
    pub fn new() -> Result<Self> {
        let mut partition = Partition {
            superblock: SuperBlock::new(),
            group: Group::with_reserved(
                MAX_INODES as usize,
                NUM_BLOCKS as usize,
                USERSPACE_OFFSET as usize,
            ),
            region: Region::new(),
            current_dir: ROOT_INODE,
            current_user: User::root(),
        };
        partition.create_root()?;
        partition.sync_metadata()?;
        Ok(partition)
    }

    /// create root directory "/", whose ".." is itself
    fn create_root(&mut self) -> Result<()> {
        let index = self.allocate_inode()?;
        if index != ROOT_INODE {
            return Err(FsError::Format(format!(
                "root inode index must be {ROOT_INODE}, not {index}"
            )));
        }
        let mut inode = Inode::new(S_IFDIR | 0o755, 0, 0);
        inode.links_count = 2;
        self.save_inode(ROOT_INODE, &inode)?;
        self.add_dir_entry(ROOT_INODE, ".", ROOT_INODE)?;
        self.add_dir_entry(ROOT_INODE, "..", ROOT_INODE)
    }

    /// write the in-memory superblock and bitmaps into their blocks
    pub(crate) fn sync_metadata(&mut self) -> Result<()> {
        let superblock_block = self
            .region
            .block_mut(AbsoluteBlock::new(SUPERBLOCK_BLOCK))?;
        self.superblock.encode_into(superblock_block)?;

        let inode_bitmap = self
            .region
            .block_mut(AbsoluteBlock::new(INODE_BITMAP_BLOCK))?;
        let bytes = self.group.inode_bitmap_bytes();
        inode_bitmap.fill(0);
        inode_bitmap[..bytes.len()].copy_from_slice(bytes);

        let block_bitmap = self
            .region
            .block_mut(AbsoluteBlock::new(BLOCK_BITMAP_BLOCK))?;
        let bytes = self.group.data_bitmap_bytes();
        block_bitmap.fill(0);
        block_bitmap[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
/// get [SuperBlock]、[Group] and [Region] of this filesystem
impl Partition {
    #[inline]
    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    #[inline]
    pub fn group(&self) -> &Group {
        &self.group
    }

    #[inline]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[inline]
    pub fn current_dir(&self) -> InodeNumber {
        self.current_dir
    }
}
/// [Inode] operations
impl Partition {
    /// load a live inode
    pub fn find_inode(&self, ino: InodeNumber) -> Result<Inode> {
        if !self.group.has_inode(ino as usize) {
            return Err(FsError::NotFound);
        }
        Inode::decode_record(self.region.inode_slot(ino)?)
    }

    pub(crate) fn save_inode(&mut self, ino: InodeNumber, inode: &Inode) -> Result<()> {
        inode.encode_into(self.region.inode_slot_mut(ino)?)?;
        Ok(())
    }

    /// claim the lowest free inode and reset its record
    pub(crate) fn allocate_inode(&mut self) -> Result<InodeNumber> {
        let index = self.group.allocate_inode().ok_or(FsError::NoSpace)? as InodeNumber;
        self.superblock.free_inodes_count -= 1;
        self.save_inode(index, &Inode::new(0, 0, 0))?;
        debug!("allocated inode {index}");
        Ok(index)
    }

    /// release every block `ino` owns, then the inode itself
    pub(crate) fn free_inode(&mut self, ino: InodeNumber) -> Result<()> {
        if ino == ROOT_INODE {
            return Err(FsError::InvalidOperation("the root inode is never freed"));
        }
        let mut inode = self.find_inode(ino)?;
        self.release_content(&mut inode)?;
        if self.group.release_inode(ino as usize) {
            self.superblock.free_inodes_count += 1;
        }
        self.region.inode_slot_mut(ino)?.fill(0);
        debug!("freed inode {ino}");
        Ok(())
    }

    /// free the direct blocks, the blocks listed by the indirect block and
    /// the indirect block itself, leaving `inode` pointing at nothing
    pub(crate) fn release_content(&mut self, inode: &mut Inode) -> Result<()> {
        for block in inode.truncate() {
            self.free_block(block)?;
        }
        if let Some(table) = inode.indirect_block.take() {
            for block in self.read_indirect_block(table)?.into_iter().flatten() {
                self.free_block(block)?;
            }
            self.free_block(table)?;
        }
        Ok(())
    }

    /// every data block `inode` references through its pointers, in order:
    /// direct blocks first, then those listed by the indirect block
    pub(crate) fn content_blocks(&self, inode: &Inode) -> Result<Vec<LogicalBlock>> {
        let mut blocks = inode.direct_blocks();
        if let Some(table) = inode.indirect_block {
            blocks.extend(self.read_indirect_block(table)?.into_iter().flatten());
        }
        Ok(blocks)
    }
}

/// data block operations
impl Partition {
    /// claim the lowest free user space block, zero-filled
    pub(crate) fn allocate_block(&mut self) -> Result<LogicalBlock> {
        let index = self.group.allocate_data_block().ok_or(FsError::NoSpace)?;
        let absolute = AbsoluteBlock::new(index as u32);
        let Some(block) = absolute.logical() else {
            // reserved blocks are marked at creation, reaching one means the bitmap is corrupt
            warn!("block bitmap handed out reserved block {index}");
            return Err(FsError::NoSpace);
        };
        self.region.zero_block(absolute)?;
        self.superblock.free_blocks_count -= 1;
        debug!("allocated block {block}");
        Ok(block)
    }

    pub(crate) fn free_block(&mut self, block: LogicalBlock) -> Result<()> {
        let absolute = AbsoluteBlock::try_from(block)?;
        if !self.group.release_data_block(absolute.index()) {
            warn!("block {block} freed twice");
            return Ok(());
        }
        self.region.zero_block(absolute)?;
        self.superblock.free_blocks_count += 1;
        debug!("freed block {block}");
        Ok(())
    }

    /// read the block numbers stored in an indirect block
    pub(crate) fn read_indirect_block(
        &self,
        table: LogicalBlock,
    ) -> Result<Vec<Option<LogicalBlock>>> {
        let data = self.region.data(table)?;
        Ok(data
            .chunks_exact(std::mem::size_of::<i32>())
            .map(|raw| {
                let value = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                u32::try_from(value).ok().map(LogicalBlock::new)
            })
            .collect())
    }

    /// mark every entry of a fresh indirect block unused
    pub(crate) fn init_indirect_block(&mut self, table: LogicalBlock) -> Result<()> {
        let data = self.region.data_mut(table)?;
        for raw in data.chunks_exact_mut(std::mem::size_of::<i32>()) {
            raw.copy_from_slice(&NO_BLOCK.to_le_bytes());
        }
        Ok(())
    }

    pub(crate) fn save_indirect(
        &mut self,
        table: LogicalBlock,
        index: usize,
        block: Option<LogicalBlock>,
    ) -> Result<()> {
        if index >= POINTERS_PER_BLOCK {
            return Err(FsError::NoSpace);
        }
        let value = match block {
            Some(block) => block.index() as i32,
            None => NO_BLOCK,
        };
        let offset = index * std::mem::size_of::<i32>();
        let data = self.region.data_mut(table)?;
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// copy `data` into `block` starting at `offset`
    pub(crate) fn write_data_to_data_block(
        &mut self,
        data: &[u8],
        offset: usize,
        block: LogicalBlock,
    ) -> Result<()> {
        let target = self.region.data_mut(block)?;
        let end = offset + data.len();
        if end > target.len() {
            return Err(FsError::InvalidOperation("write past the end of a block"));
        }
        target[offset..end].copy_from_slice(data);
        Ok(())
    }
}
