//! directories are files whose blocks hold fixed 40-byte entry slots:
//! - bytes `0..4`: inode number, little endian
//! - byte `4`: `1` if the slot is in use, a zeroed slot is empty
//! - bytes `8..40`: NUL-padded name
use log::debug;

use super::{
    FsError, Inode, InodeNumber, LogicalBlock, Partition, Result, BLOCK_SIZE, DIRECT_POINTERS,
    MAX_NAME_LENGTH,
};

pub const DIR_ENTRY_SIZE: usize = 40;
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE as usize / DIR_ENTRY_SIZE;
const IN_USE: u8 = 1;
const NAME_OFFSET: usize = 8;

/// a decoded, in-use directory slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: InodeNumber,
    pub name: String,
}

impl DirEntry {
    pub fn is_dot_or_dotdot(&self) -> bool {
        self.name == "." || self.name == ".."
    }

    fn decode(slot: &[u8]) -> Option<DirEntry> {
        if slot[4] != IN_USE {
            return None;
        }
        let inode = InodeNumber::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
        let name = &slot[NAME_OFFSET..DIR_ENTRY_SIZE];
        let len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        Some(DirEntry {
            inode,
            name: String::from_utf8_lossy(&name[..len]).into_owned(),
        })
    }

    /// `name` must already have passed [validate_name]
    fn encode(inode: InodeNumber, name: &str, slot: &mut [u8]) {
        slot.fill(0);
        slot[..4].copy_from_slice(&inode.to_le_bytes());
        slot[4] = IN_USE;
        slot[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name.as_bytes());
    }
}

/// a name fits a slot if it is non-empty, has no `/` and leaves room for the NUL pad
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FsError::InvalidOperation("empty file name"));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidOperation("file name contains '/' or NUL"));
    }
    if name.len() >= MAX_NAME_LENGTH {
        return Err(FsError::InvalidOperation("file name too long"));
    }
    Ok(())
}

/// where an in-use entry lives
#[derive(Debug, Clone, Copy)]
struct SlotRef {
    block: LogicalBlock,
    index: usize,
}

impl Partition {
    /// look `name` up in directory `dir`
    pub fn find_file_in_dir(&self, dir: InodeNumber, name: &str) -> Result<InodeNumber> {
        let inode = self.find_dir_inode(dir)?;
        self.dir_slots(&inode)?
            .into_iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(_, entry)| entry.inode)
            .ok_or(FsError::NotFound)
    }

    /// every in-use entry of `dir`, `.` and `..` included, in slot order
    pub fn read_dir_entries(&self, dir: InodeNumber) -> Result<Vec<DirEntry>> {
        let inode = self.find_dir_inode(dir)?;
        Ok(self
            .dir_slots(&inode)?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    /// whether `dir` holds nothing but `.` and `..`
    pub fn is_dir_empty(&self, dir: InodeNumber) -> Result<bool> {
        Ok(self
            .read_dir_entries(dir)?
            .iter()
            .all(DirEntry::is_dot_or_dotdot))
    }

    /// write an entry `name -> target` into the first empty slot of `dir`,
    /// growing the directory by one block when every slot is taken
    pub(crate) fn add_dir_entry(
        &mut self,
        dir: InodeNumber,
        name: &str,
        target: InodeNumber,
    ) -> Result<()> {
        let mut inode = self.find_dir_inode(dir)?;
        validate_name(name)?;
        let slot = self.find_free_slot(&mut inode)?;
        DirEntry::encode(target, name, self.slot_mut(slot)?);
        inode.size += DIR_ENTRY_SIZE as u32;
        inode.update_modified_at();
        self.save_inode(dir, &inode)?;
        debug!(
            "added entry {name:?} -> {target} to directory {dir} at block {} slot {}",
            slot.block, slot.index
        );
        Ok(())
    }

    /// clear the first entry named `name` in `dir`
    /// # Returns
    /// the inode the entry pointed at
    pub(crate) fn remove_dir_entry(&mut self, dir: InodeNumber, name: &str) -> Result<InodeNumber> {
        let mut inode = self.find_dir_inode(dir)?;
        let (slot, entry) = self
            .dir_slots(&inode)?
            .into_iter()
            .find(|(_, entry)| entry.name == name)
            .ok_or(FsError::NotFound)?;
        self.slot_mut(slot)?.fill(0);
        inode.size = inode.size.saturating_sub(DIR_ENTRY_SIZE as u32);
        inode.update_modified_at();
        self.save_inode(dir, &inode)?;
        debug!("removed entry {name:?} from directory {dir}");
        Ok(entry.inode)
    }

    /// point the existing entry `name` of `dir` at `target`
    pub(crate) fn retarget_dir_entry(
        &mut self,
        dir: InodeNumber,
        name: &str,
        target: InodeNumber,
    ) -> Result<()> {
        let mut inode = self.find_dir_inode(dir)?;
        let (slot, _) = self
            .dir_slots(&inode)?
            .into_iter()
            .find(|(_, entry)| entry.name == name)
            .ok_or(FsError::NotFound)?;
        DirEntry::encode(target, name, self.slot_mut(slot)?);
        inode.update_modified_at();
        self.save_inode(dir, &inode)
    }

    fn find_dir_inode(&self, dir: InodeNumber) -> Result<Inode> {
        let inode = self.find_inode(dir)?;
        if !inode.is_dir() {
            return Err(FsError::InvalidOperation("not a directory"));
        }
        Ok(inode)
    }

    fn dir_slots(&self, inode: &Inode) -> Result<Vec<(SlotRef, DirEntry)>> {
        let mut entries = Vec::new();
        for block in self.content_blocks(inode)? {
            let data = self.region.data(block)?;
            for (index, slot) in data.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
                if let Some(entry) = DirEntry::decode(slot) {
                    entries.push((SlotRef { block, index }, entry));
                }
            }
        }
        Ok(entries)
    }

    fn slot_mut(&mut self, slot: SlotRef) -> Result<&mut [u8]> {
        let start = slot.index * DIR_ENTRY_SIZE;
        Ok(&mut self.region.data_mut(slot.block)?[start..start + DIR_ENTRY_SIZE])
    }

    fn empty_slot_in(&self, block: LogicalBlock) -> Result<Option<usize>> {
        Ok(self
            .region
            .data(block)?
            .chunks_exact(DIR_ENTRY_SIZE)
            .position(|slot| DirEntry::decode(slot).is_none()))
    }

    /// find an empty slot, allocating into the first unused direct pointer or,
    /// once all direct pointers are taken, into the indirect block's list.
    /// updates the pointers of `inode` but doesn't save it
    fn find_free_slot(&mut self, inode: &mut Inode) -> Result<SlotRef> {
        for i in 0..DIRECT_POINTERS {
            match inode.direct_blocks[i] {
                Some(block) => {
                    if let Some(index) = self.empty_slot_in(block)? {
                        return Ok(SlotRef { block, index });
                    }
                }
                None => {
                    let block = self.allocate_block()?;
                    inode.direct_blocks[i] = Some(block);
                    return Ok(SlotRef { block, index: 0 });
                }
            }
        }

        let (table, fresh_table) = match inode.indirect_block {
            Some(table) => (table, false),
            None => {
                let table = self.allocate_block()?;
                self.init_indirect_block(table)?;
                (table, true)
            }
        };
        let result = self.find_free_indirect_slot(table);
        match result {
            Ok(slot) => {
                inode.indirect_block = Some(table);
                Ok(slot)
            }
            Err(e) => {
                if fresh_table {
                    self.free_block(table)?;
                }
                Err(e)
            }
        }
    }

    fn find_free_indirect_slot(&mut self, table: LogicalBlock) -> Result<SlotRef> {
        for (i, entry) in self.read_indirect_block(table)?.into_iter().enumerate() {
            match entry {
                Some(block) => {
                    if let Some(index) = self.empty_slot_in(block)? {
                        return Ok(SlotRef { block, index });
                    }
                }
                None => {
                    let block = self.allocate_block()?;
                    self.save_indirect(table, i, Some(block))?;
                    return Ok(SlotRef { block, index: 0 });
                }
            }
        }
        Err(FsError::NoSpace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{ROOT_INODE, S_IFDIR};

    /// an empty directory inode without `.`/`..`, detached from the tree
    fn bare_dir(partition: &mut Partition) -> Result<InodeNumber> {
        let ino = partition.allocate_inode()?;
        let mut inode = Inode::new(S_IFDIR | 0o755, 0, 0);
        inode.links_count = 2;
        partition.save_inode(ino, &inode)?;
        Ok(ino)
    }

    #[test]
    fn test_root_has_dot_entries() -> Result<()> {
        let partition = Partition::new()?;
        let entries = partition.read_dir_entries(ROOT_INODE)?;
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    inode: ROOT_INODE,
                    name: ".".into()
                },
                DirEntry {
                    inode: ROOT_INODE,
                    name: "..".into()
                },
            ]
        );
        assert_eq!(
            partition.find_inode(ROOT_INODE)?.size,
            2 * DIR_ENTRY_SIZE as u32
        );
        assert!(partition.is_dir_empty(ROOT_INODE)?);
        Ok(())
    }

    // inode 0 in a slot is a real entry, only the tag marks emptiness
    #[test]
    fn test_entry_pointing_at_root_is_not_empty() -> Result<()> {
        let mut partition = Partition::new()?;
        let dir = bare_dir(&mut partition)?;
        partition.add_dir_entry(dir, "up", ROOT_INODE)?;
        assert_eq!(partition.find_file_in_dir(dir, "up")?, ROOT_INODE);
        Ok(())
    }

    #[test]
    fn test_add_find_remove() -> Result<()> {
        let mut partition = Partition::new()?;
        let dir = bare_dir(&mut partition)?;
        partition.add_dir_entry(dir, "a", 5)?;
        partition.add_dir_entry(dir, "b", 6)?;
        assert_eq!(partition.find_file_in_dir(dir, "b")?, 6);
        assert_eq!(partition.remove_dir_entry(dir, "a")?, 5);
        assert!(matches!(
            partition.find_file_in_dir(dir, "a"),
            Err(FsError::NotFound)
        ));
        assert!(matches!(
            partition.remove_dir_entry(dir, "a"),
            Err(FsError::NotFound)
        ));
        // the tombstoned slot is reused before anything is appended
        partition.add_dir_entry(dir, "c", 7)?;
        let names: Vec<_> = partition
            .read_dir_entries(dir)?
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["c", "b"]);
        assert_eq!(
            partition.find_inode(dir)?.size,
            2 * DIR_ENTRY_SIZE as u32
        );
        Ok(())
    }

    #[test]
    fn test_lookup_in_a_file_fails() -> Result<()> {
        let mut partition = Partition::new()?;
        let ino = partition.allocate_inode()?;
        partition.save_inode(ino, &Inode::new(crate::fs::S_IFREG | 0o644, 0, 0))?;
        assert!(matches!(
            partition.find_file_in_dir(ino, "x"),
            Err(FsError::InvalidOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_names_are_validated() -> Result<()> {
        let mut partition = Partition::new()?;
        let dir = bare_dir(&mut partition)?;
        assert!(partition.add_dir_entry(dir, "", 1).is_err());
        assert!(partition.add_dir_entry(dir, "a/b", 1).is_err());
        assert!(partition
            .add_dir_entry(dir, &"n".repeat(MAX_NAME_LENGTH), 1)
            .is_err());
        partition.add_dir_entry(dir, &"n".repeat(MAX_NAME_LENGTH - 1), 1)?;
        Ok(())
    }

    // fill all direct blocks so entries spill into indirect-listed blocks
    #[test]
    fn test_growth_through_indirect_block() -> Result<()> {
        let mut partition = Partition::new()?;
        let dir = bare_dir(&mut partition)?;
        let direct_capacity = DIRECT_POINTERS * ENTRIES_PER_BLOCK;
        for i in 0..direct_capacity + 3 {
            partition.add_dir_entry(dir, &format!("f{i}"), 1)?;
        }
        let inode = partition.find_inode(dir)?;
        assert_eq!(inode.direct_blocks().len(), DIRECT_POINTERS);
        assert!(inode.indirect_block.is_some());
        assert_eq!(
            partition.find_file_in_dir(dir, &format!("f{}", direct_capacity + 2))?,
            1
        );
        partition.remove_dir_entry(dir, &format!("f{}", direct_capacity + 1))?;
        assert_eq!(
            partition.read_dir_entries(dir)?.len(),
            direct_capacity + 2
        );
        Ok(())
    }

    #[test]
    fn test_failed_growth_leaks_nothing() -> Result<()> {
        let mut partition = Partition::new()?;
        let dir = bare_dir(&mut partition)?;
        let direct_capacity = DIRECT_POINTERS * ENTRIES_PER_BLOCK;
        for i in 0..direct_capacity {
            partition.add_dir_entry(dir, &format!("f{i}"), 1)?;
        }
        // leave exactly one free block: enough for the indirect table but not its first data block
        while partition.superblock().free_blocks_count > 1 {
            partition.allocate_block()?;
        }
        assert!(matches!(
            partition.add_dir_entry(dir, "overflow", 1),
            Err(FsError::NoSpace)
        ));
        assert_eq!(partition.superblock().free_blocks_count, 1);
        assert_eq!(partition.find_inode(dir)?.indirect_block, None);
        Ok(())
    }
}
