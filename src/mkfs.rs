//! create a partition image
use crate::fs::{Partition, PARTITION_SIZE};
use anyhow::{anyhow, Context};
use byte_unit::Byte;
use log::info;
use std::path::Path;

/// write a freshly initialized partition to `image_file_path`
/// # Params
/// - `image_file_path`: the path of the image file
/// - `force`: replace the file if it already exists
///
/// # Return
/// an [anyhow::Result] type to indicate whether the operation is successful
pub fn mkfs<P>(image_file_path: P, force: bool) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = image_file_path.as_ref();
    if path.exists() && !force {
        return Err(anyhow!(format!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        )));
    }
    let mut partition = Partition::new().context("can't initialize the partition")?;
    partition
        .save_partition(path)
        .with_context(|| format!("can't write image {}", path.display()))?;
    info!(
        "created a {} partition in {}",
        Byte::from_bytes(PARTITION_SIZE as _).get_appropriate_unit(true),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileKind, ROOT_INODE};
    use std::path::PathBuf;

    fn tmp_image(name: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("simfs_mkfs_{}_{name}.img", std::process::id()));
        if path.exists() {
            std::fs::remove_file(&path).unwrap();
        }
        path
    }

    #[test]
    fn test_mkfs() {
        let tmp_file = tmp_image("new");
        mkfs(&tmp_file, false).unwrap();
        let partition = Partition::load_partition(&tmp_file).unwrap();

        // test if root inode "/" is created correctly
        let inode = partition.find_inode(ROOT_INODE).unwrap();
        assert_eq!(inode.mode, libc::S_IFDIR as u32 | 0o755);
        assert_eq!(inode.links_count, 2);
        assert_eq!(inode.kind(), FileKind::Directory);
        assert!(partition.group().has_inode(ROOT_INODE as _));

        let superblock = partition.superblock();
        assert_eq!(superblock.free_inodes_count, superblock.num_inodes - 1);
        assert_eq!(superblock.free_blocks_count, superblock.user_blocks() - 1);

        std::fs::remove_file(&tmp_file).unwrap()
    }

    #[test]
    fn test_mkfs_refuses_to_overwrite() {
        let tmp_file = tmp_image("existing");
        std::fs::write(&tmp_file, b"precious").unwrap();
        assert!(mkfs(&tmp_file, false).is_err());
        assert_eq!(std::fs::read(&tmp_file).unwrap(), b"precious");

        mkfs(&tmp_file, true).unwrap();
        assert!(Partition::load_partition(&tmp_file).is_ok());
        std::fs::remove_file(&tmp_file).unwrap()
    }
}
