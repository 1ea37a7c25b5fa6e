//! save a partition into an image file and load it back
//!
//! an image holds, in order: superblock, block bitmap, inode bitmap,
//! inode table, the whole raw region, current directory (u32 LE) and
//! the current user record

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use log::{info, warn};

use super::{
    user::UserRecord, FsError, Group, InodeNumber, LogicalBlock, Partition, Region, Result,
    SuperBlock, BLOCK_SIZE, MAX_INODES, NUM_BLOCKS, USERSPACE_OFFSET,
};
use crate::utils::{digest::digest, fs_size_calculator, traits::FixedRecord};

impl Partition {
    /// write the whole partition to `path`, replacing any existing file
    pub fn save_partition<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        info!("save_partition() called with {:?}", path.as_ref());
        self.sync_metadata()?;
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_image(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// read a partition saved by [Partition::save_partition]
    pub fn load_partition<P: AsRef<Path>>(path: P) -> Result<Partition> {
        info!("load_partition() called with {:?}", path.as_ref());
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_image(&mut reader)
    }

    /// replace this partition with the one saved at `path`.
    /// nothing changes if loading fails
    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        match Self::load_partition(path) {
            Ok(partition) => {
                *self = partition;
                Ok(())
            }
            Err(e) => {
                warn!("reload failed, keeping the current partition: {e}");
                Err(e)
            }
        }
    }

    /// blake3 digest of the bytes [Partition::save_partition] would write
    pub fn fingerprint(&mut self) -> Result<[u8; 32]> {
        self.sync_metadata()?;
        digest(|hasher| self.write_image(hasher))
    }

    fn write_image<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.superblock.encode_record()?)?;
        writer.write_all(self.group.data_bitmap_bytes())?;
        writer.write_all(self.group.inode_bitmap_bytes())?;
        writer.write_all(self.region.inode_table())?;
        writer.write_all(self.region.as_bytes())?;
        writer.write_all(&self.current_dir.to_le_bytes())?;
        writer.write_all(&UserRecord::from(&self.current_user).encode_record()?)?;
        Ok(())
    }

    fn read_image<R: Read>(reader: &mut R) -> Result<Partition> {
        let raw = read_section(reader, SuperBlock::encoded_len()?, "superblock")?;
        let superblock = SuperBlock::decode_record(&raw)?;
        superblock.validate()?;

        let data_bitmap = read_section(
            reader,
            fs_size_calculator::bitmap_size(NUM_BLOCKS),
            "block bitmap",
        )?;
        let inode_bitmap = read_section(
            reader,
            fs_size_calculator::bitmap_size(MAX_INODES),
            "inode bitmap",
        )?;
        let group = Group::from_raw(
            &inode_bitmap,
            &data_bitmap,
            MAX_INODES as usize,
            NUM_BLOCKS as usize,
        );
        let inode_table = read_section(
            reader,
            fs_size_calculator::inode_table_size(MAX_INODES),
            "inode table",
        )?;
        let mut region = Region::from_bytes(read_section(
            reader,
            fs_size_calculator::region_size(NUM_BLOCKS, BLOCK_SIZE),
            "region",
        )?)?;
        region.inode_table_mut().copy_from_slice(&inode_table);

        let raw = read_section(reader, std::mem::size_of::<InodeNumber>(), "current directory")?;
        let current_dir = InodeNumber::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let raw = read_section(reader, UserRecord::encoded_len()?, "current user")?;
        let current_user = UserRecord::decode_record(&raw)?.into();

        if superblock.free_blocks_count as usize != group.free_data_blocks()
            || superblock.free_inodes_count as usize != group.free_inodes()
        {
            return Err(FsError::Format("free counts don't match the bitmaps".to_string()));
        }
        if !(0..USERSPACE_OFFSET as usize).all(|i| group.has_data_block(i)) {
            return Err(FsError::Format("reserved system blocks are marked free".to_string()));
        }
        let partition = Partition {
            superblock,
            group,
            region,
            current_dir,
            current_user,
        };
        if !partition.group.has_inode(current_dir as usize)
            || !partition.find_inode(current_dir)?.is_dir()
        {
            return Err(FsError::Format(format!(
                "current directory {current_dir} is not a live directory"
            )));
        }
        partition.check_block_pointers()?;
        Ok(partition)
    }

    /// every block a live inode points at, directly or through its
    /// indirect block, must lie inside user space
    fn check_block_pointers(&self) -> Result<()> {
        let out_of_range = |ino: InodeNumber, block: LogicalBlock| {
            FsError::Format(format!("inode {ino} points at block {block} outside user space"))
        };
        for ino in (0..MAX_INODES).filter(|&ino| self.group.has_inode(ino as usize)) {
            let inode = self.find_inode(ino)?;
            let stray = inode
                .direct_blocks()
                .into_iter()
                .chain(inode.indirect_block)
                .find(|block| !block.in_user_space());
            if let Some(block) = stray {
                return Err(out_of_range(ino, block));
            }
            if let Some(table) = inode.indirect_block {
                for block in self.read_indirect_block(table)?.into_iter().flatten() {
                    if !block.in_user_space() {
                        return Err(out_of_range(ino, block));
                    }
                }
            }
        }
        Ok(())
    }
}

/// read exactly `len` bytes, a short read means the image is truncated
fn read_section<R: Read>(reader: &mut R, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FsError::Format(format!("truncated image: missing {what}")),
        _ => FsError::Io(e),
    })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{CopyMode, FS_MAGIC, INODE_TABLE_BLOCK, ROOT_INODE, S_IFDIR};
    use std::path::PathBuf;

    fn image_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("simfs_{}_{name}.img", std::process::id()))
    }

    fn populated() -> Result<Partition> {
        let mut partition = Partition::new()?;
        partition.create_file("docs", S_IFDIR | 0o755)?;
        partition.write_to_file("docs/readme", b"hello image")?;
        partition.create_symlink("latest", "docs/readme")?;
        partition.copy_or_move("docs/readme", "copy", CopyMode::Copy)?;
        partition.change_directory("docs")?;
        partition.switch_user(7, 70);
        Ok(partition)
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let path = image_path("round_trip");
        let mut partition = populated()?;
        partition.save_partition(&path)?;
        let mut loaded = Partition::load_partition(&path)?;
        std::fs::remove_file(&path)?;

        assert_eq!(loaded.group().data_bitmap, partition.group().data_bitmap);
        assert_eq!(loaded.group().inode_bitmap, partition.group().inode_bitmap);
        assert_eq!(loaded.region().inode_table(), partition.region().inode_table());
        assert_eq!(loaded.region().as_bytes(), partition.region().as_bytes());
        assert_eq!(loaded.superblock(), partition.superblock());
        assert_eq!(loaded.current_dir(), partition.current_dir());
        assert_eq!(loaded.current_user(), partition.current_user());
        assert_eq!(loaded.current_path()?, "/docs");
        assert_eq!(loaded.fingerprint()?, partition.fingerprint()?);

        loaded.switch_user(0, 0);
        assert_eq!(loaded.read_from_file("/latest", 64)?, b"hello image");
        Ok(())
    }

    #[test]
    fn test_fingerprint_tracks_changes() -> Result<()> {
        let mut partition = Partition::new()?;
        let before = partition.fingerprint()?;
        assert_eq!(before, partition.fingerprint()?);
        partition.write_to_file("f", b"x")?;
        assert_ne!(before, partition.fingerprint()?);
        Ok(())
    }

    #[test]
    fn test_bad_magic_is_rejected() -> Result<()> {
        let path = image_path("bad_magic");
        let mut partition = Partition::new()?;
        partition.save_partition(&path)?;
        let mut bytes = std::fs::read(&path)?;
        assert_eq!(bytes[..4], FS_MAGIC.to_le_bytes());
        bytes[0] ^= 0xff;
        std::fs::write(&path, &bytes)?;
        let result = Partition::load_partition(&path);
        std::fs::remove_file(&path)?;
        assert!(matches!(result, Err(FsError::Format(_))));
        Ok(())
    }

    #[test]
    fn test_truncated_image_is_rejected() -> Result<()> {
        let path = image_path("truncated");
        let mut partition = Partition::new()?;
        partition.save_partition(&path)?;
        let bytes = std::fs::read(&path)?;
        for len in [0, 10, bytes.len() / 2, bytes.len() - 1] {
            std::fs::write(&path, &bytes[..len])?;
            assert!(
                matches!(Partition::load_partition(&path), Err(FsError::Format(_))),
                "length {len}"
            );
        }
        std::fs::remove_file(&path)?;
        Ok(())
    }

    fn assert_rejected(name: &str, partition: &mut Partition) -> Result<()> {
        let path = image_path(name);
        partition.save_partition(&path)?;
        let result = Partition::load_partition(&path);
        std::fs::remove_file(&path)?;
        assert!(matches!(result, Err(FsError::Format(_))), "{name}");
        Ok(())
    }

    #[test]
    fn test_direct_pointer_outside_user_space_is_rejected() -> Result<()> {
        let mut partition = Partition::new()?;
        let mut root = partition.find_inode(ROOT_INODE)?;
        root.direct_blocks[1] = Some(LogicalBlock::new(u32::MAX));
        partition.save_inode(ROOT_INODE, &root)?;
        assert_rejected("stray_direct", &mut partition)?;

        root.direct_blocks[1] = Some(LogicalBlock::new(NUM_BLOCKS - USERSPACE_OFFSET));
        partition.save_inode(ROOT_INODE, &root)?;
        assert_rejected("first_block_past_the_end", &mut partition)
    }

    #[test]
    fn test_indirect_entry_outside_user_space_is_rejected() -> Result<()> {
        let mut partition = Partition::new()?;
        let ino = partition.create_file("big", S_IFDIR | 0o755)?;
        let table = partition.allocate_block()?;
        partition.init_indirect_block(table)?;
        partition.save_indirect(table, 0, Some(LogicalBlock::new(5000)))?;
        let mut inode = partition.find_inode(ino)?;
        inode.indirect_block = Some(table);
        partition.save_inode(ino, &inode)?;
        assert_rejected("stray_indirect", &mut partition)
    }

    #[test]
    fn test_free_reserved_block_is_rejected() -> Result<()> {
        let mut partition = Partition::new()?;
        partition.group.data_bitmap.set(INODE_TABLE_BLOCK as usize, false);
        // keep the counts consistent so only the reserved bit is wrong
        partition.superblock.free_blocks_count += 1;
        assert_rejected("free_reserved", &mut partition)
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Partition::load_partition(image_path("does_not_exist"));
        assert!(matches!(result, Err(FsError::Io(_))));
    }

    #[test]
    fn test_failed_reload_keeps_state() -> Result<()> {
        let mut partition = populated()?;
        let before = partition.fingerprint()?;
        assert!(partition.reload(image_path("absent")).is_err());
        assert_eq!(partition.fingerprint()?, before);

        let path = image_path("reload");
        let mut fresh = Partition::new()?;
        fresh.save_partition(&path)?;
        partition.reload(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(partition.fingerprint()?, fresh.fingerprint()?);
        assert_eq!(partition.current_dir(), ROOT_INODE);
        Ok(())
    }
}
