use log::{info, warn};

use super::{
    permission::Access, FsError, Inode, InodeNumber, LogicalBlock, Partition, Result, BLOCK_SIZE,
    MAX_FILE_SIZE, S_IFREG,
};

const BLOCK_LEN: usize = BLOCK_SIZE as usize;

impl Partition {
    /// replace the content of `path` with `data`, creating a `rw-r--r--`
    /// regular file if nothing exists there yet
    /// # Returns
    /// the number of bytes written
    pub fn write_to_file(&mut self, path: &str, data: &[u8]) -> Result<usize> {
        info!("write_to_file() called with {path:?} and {} bytes", data.len());
        if data.len() > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge);
        }
        let resolution = self.resolve_follow(path)?;
        let (ino, created) = match (resolution.inode, resolution.name) {
            (Some(ino), _) => (ino, None),
            (None, Some(name)) => {
                let ino = self.create_in(resolution.parent, &name, S_IFREG | 0o644)?;
                (ino, Some((resolution.parent, name)))
            }
            (None, None) => return Err(FsError::NotFound),
        };
        let written = self.write_existing(ino, data);
        if let (Err(_), Some((parent, name))) = (&written, created) {
            warn!("write to new file {name:?} failed, removing it");
            self.remove_dir_entry(parent, &name)?;
            self.free_inode(ino)?;
        }
        written.map(|()| data.len())
    }

    fn write_existing(&mut self, ino: InodeNumber, data: &[u8]) -> Result<()> {
        let inode = self.find_inode(ino)?;
        if inode.is_dir() {
            return Err(FsError::InvalidOperation("is a directory"));
        }
        self.require(&inode, Access::Write)?;
        self.write_content(ino, data)
    }

    /// read at most `max_size` bytes of `path`, following a symlink
    pub fn read_from_file(&mut self, path: &str, max_size: usize) -> Result<Vec<u8>> {
        info!("read_from_file() called with {path:?}, max_size: {max_size}");
        let ino = self.resolve_follow(path)?.found()?;
        let mut inode = self.find_inode(ino)?;
        if inode.is_dir() {
            return Err(FsError::InvalidOperation("is a directory"));
        }
        self.require(&inode, Access::Read)?;
        let len = (inode.size as usize).min(max_size);
        let data = self.read_content(&inode, len)?;
        inode.update_accessed_at();
        self.save_inode(ino, &inode)?;
        Ok(data)
    }

    /// drop the whole content of `path`
    pub fn truncate_file(&mut self, path: &str) -> Result<()> {
        info!("truncate_file() called with {path:?}");
        let ino = self.resolve_follow(path)?.found()?;
        let mut inode = self.find_inode(ino)?;
        if inode.is_dir() {
            return Err(FsError::InvalidOperation("is a directory"));
        }
        self.require(&inode, Access::Write)?;
        self.release_content(&mut inode)?;
        self.save_inode(ino, &inode)
    }

    /// the target stored in symlink `path`, which is not followed
    pub fn read_link(&mut self, path: &str) -> Result<String> {
        info!("read_link() called with {path:?}");
        let ino = self.resolve(path)?.found()?;
        let inode = self.find_inode(ino)?;
        if !inode.is_symlink() {
            return Err(FsError::InvalidOperation("not a symbolic link"));
        }
        self.link_target(&inode)
    }

    /// the first `len` bytes of the content of `inode`
    pub(crate) fn read_content(&self, inode: &Inode, len: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len);
        for block in self.content_blocks(inode)? {
            if data.len() >= len {
                break;
            }
            let remaining = len - data.len();
            let chunk = self.region.data(block)?;
            data.extend_from_slice(&chunk[..remaining.min(BLOCK_LEN)]);
        }
        Ok(data)
    }

    /// swap the blocks of `ino` for fresh ones holding `data`.
    /// capacity is checked up front so a `NoSpace` failure keeps the old content
    pub(crate) fn write_content(&mut self, ino: InodeNumber, data: &[u8]) -> Result<()> {
        let mut inode = self.find_inode(ino)?;
        let needed = data.len().div_ceil(BLOCK_LEN);
        let held = self.content_blocks(&inode)?.len() + inode.indirect_block.iter().count();
        if needed > self.superblock.free_blocks_count as usize + held {
            return Err(FsError::NoSpace);
        }

        self.release_content(&mut inode)?;
        let mut written: Vec<LogicalBlock> = Vec::with_capacity(needed);
        for (index, chunk) in data.chunks(BLOCK_LEN).enumerate() {
            let block = match self.allocate_block() {
                Ok(block) => block,
                // only reachable when the free count disagrees with the bitmap,
                // the file is left empty
                Err(e) => {
                    warn!("write to inode {ino} ran out of blocks despite the capacity check");
                    for block in written {
                        self.free_block(block)?;
                    }
                    self.save_inode(ino, &inode)?;
                    return Err(e);
                }
            };
            self.write_data_to_data_block(chunk, 0, block)?;
            inode.add_block(block, index)?;
            written.push(block);
        }
        inode.size = data.len() as u32;
        inode.update_modified_at();
        self.save_inode(ino, &inode)
    }
}
