//! describe a partition image
use crate::{
    fs::{Partition, BLOCK_SIZE},
    utils::digest::to_hex,
};
use anyhow::Context;
use byte_unit::Byte;
use std::{fmt::Write, path::Path};

/// load the image at `image_file_path` and render a report of its geometry,
/// free space, current directory, current user and fingerprint
pub fn describe<P: AsRef<Path>>(image_file_path: P) -> anyhow::Result<String> {
    let path = image_file_path.as_ref();
    let mut partition = Partition::load_partition(path)
        .with_context(|| format!("can't load image {}", path.display()))?;
    let superblock = partition.superblock().clone();
    let free_bytes = superblock.free_blocks_count as u64 * BLOCK_SIZE as u64;

    let mut report = String::new();
    writeln!(report, "image:        {}", path.display())?;
    writeln!(
        report,
        "geometry:     {} blocks of {} bytes, {} inodes of {} bytes",
        superblock.num_blocks, superblock.block_size, superblock.num_inodes, superblock.inode_size
    )?;
    writeln!(report, "data blocks:  start at block {}", superblock.first_data_block)?;
    writeln!(
        report,
        "free blocks:  {}/{} ({})",
        superblock.free_blocks_count,
        superblock.user_blocks(),
        Byte::from_bytes(free_bytes as _).get_appropriate_unit(true)
    )?;
    writeln!(
        report,
        "free inodes:  {}/{}",
        superblock.free_inodes_count, superblock.num_inodes
    )?;
    writeln!(report, "current dir:  {}", partition.current_path()?)?;
    let user = partition.current_user();
    writeln!(
        report,
        "current user: {} (uid {}, gid {})",
        user.name, user.id, user.group_id
    )?;
    write!(report, "fingerprint:  {}", to_hex(&partition.fingerprint()?))?;
    Ok(report)
}
