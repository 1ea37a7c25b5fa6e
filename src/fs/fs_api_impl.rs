use log::{info, warn};

use super::{
    directory::validate_name, permission::Access, FsError, Inode, InodeNumber, Partition, Result,
    PERMISSION_MASK, ROOT_INODE, S_IFDIR, S_IFMT, S_IFREG,
};

/// whether [Partition::copy_or_move] keeps the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    Copy,
    Move,
}

/// one row of [Partition::list_directory_entries]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    pub name: String,
    pub inode_number: InodeNumber,
    pub inode: Inode,
    /// the stored target when the entry is a symlink
    pub link_target: Option<String>,
}

impl Partition {
    /// create a regular file or a directory at `path`.
    /// a `mode` without type bits makes a regular file
    pub fn create_file(&mut self, path: &str, mode: u32) -> Result<InodeNumber> {
        info!("create_file() called with {path:?}, mode: {mode:o}");
        let resolution = self.resolve(path)?;
        if resolution.inode.is_some() {
            return Err(FsError::AlreadyExists);
        }
        let name = resolution.name.ok_or(FsError::AlreadyExists)?;
        self.create_in(resolution.parent, &name, mode)
    }

    pub(crate) fn create_in(
        &mut self,
        parent: InodeNumber,
        name: &str,
        mode: u32,
    ) -> Result<InodeNumber> {
        let mode = match mode & S_IFMT {
            0 => S_IFREG | mode,
            S_IFREG | S_IFDIR => mode,
            _ => return Err(FsError::InvalidOperation("unsupported file type")),
        };
        validate_name(name)?;
        let parent_inode = self.require_access(parent, Access::Write)?;
        if !parent_inode.is_dir() {
            return Err(FsError::InvalidOperation("not a directory"));
        }
        match self.find_file_in_dir(parent, name) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let ino = self.allocate_inode()?;
        let mut inode = Inode::new(mode, self.current_user.id, self.current_user.group_id);
        let is_dir = inode.is_dir();
        inode.links_count = if is_dir { 2 } else { 1 };
        self.save_inode(ino, &inode)?;

        let linked = if is_dir {
            self.add_dir_entry(ino, ".", ino)
                .and_then(|()| self.add_dir_entry(ino, "..", parent))
                .and_then(|()| self.add_dir_entry(parent, name, ino))
        } else {
            self.add_dir_entry(parent, name, ino)
        };
        if let Err(e) = linked {
            warn!("can't link {name:?} into directory {parent}, rolling back inode {ino}");
            self.free_inode(ino)?;
            return Err(e);
        }
        if is_dir {
            let mut parent_inode = self.find_inode(parent)?;
            parent_inode.links_count += 1;
            self.save_inode(parent, &parent_inode)?;
        }
        Ok(ino)
    }

    /// make `path` the current directory, which is left alone on failure
    pub fn change_directory(&mut self, path: &str) -> Result<()> {
        info!("change_directory() called with {path:?}");
        let ino = self.resolve_follow(path)?.found()?;
        let mut inode = self.find_inode(ino)?;
        if !inode.is_dir() {
            return Err(FsError::InvalidOperation("not a directory"));
        }
        self.require(&inode, Access::Execute)?;
        self.current_dir = ino;
        inode.update_accessed_at();
        self.save_inode(ino, &inode)
    }

    /// every entry of directory `path`, `.` and `..` included
    pub fn list_directory_entries(&mut self, path: &str) -> Result<Vec<DirectoryListing>> {
        info!("list_directory_entries() called with {path:?}");
        let dir = self.resolve_follow(path)?.found()?;
        let mut dir_inode = self.find_inode(dir)?;
        if !dir_inode.is_dir() {
            return Err(FsError::InvalidOperation("not a directory"));
        }
        self.require(&dir_inode, Access::Read)?;

        let mut listing = Vec::new();
        for entry in self.read_dir_entries(dir)? {
            let inode = self.find_inode(entry.inode)?;
            let link_target = if inode.is_symlink() {
                self.link_target(&inode).ok()
            } else {
                None
            };
            listing.push(DirectoryListing {
                name: entry.name,
                inode_number: entry.inode,
                inode,
                link_target,
            });
        }
        dir_inode.update_accessed_at();
        self.save_inode(dir, &dir_inode)?;
        Ok(listing)
    }

    /// the inode of `path`, a final symlink is not followed
    pub fn stat(&mut self, path: &str) -> Result<Inode> {
        let ino = self.resolve(path)?.found()?;
        self.find_inode(ino)
    }

    /// copy the content of `src` to `dst`, or move the entry `src` to `dst`.
    /// a `dst` naming a directory, or ending in `/`, keeps the source name
    pub fn copy_or_move(&mut self, src: &str, dst: &str, mode: CopyMode) -> Result<InodeNumber> {
        info!("copy_or_move() called with {src:?} -> {dst:?}, mode: {mode:?}");
        match mode {
            CopyMode::Copy => self.copy(src, dst),
            CopyMode::Move => self.rename(src, dst),
        }
    }

    fn copy(&mut self, src: &str, dst: &str) -> Result<InodeNumber> {
        let source = self.resolve_follow(src)?;
        let src_ino = source.found()?;
        let src_inode = self.find_inode(src_ino)?;
        if src_inode.is_dir() {
            return Err(FsError::InvalidOperation("can't copy a directory"));
        }
        self.require(&src_inode, Access::Read)?;
        let name = source
            .name
            .ok_or(FsError::InvalidOperation("can't copy a directory"))?;
        let data = self.read_content(&src_inode, src_inode.size as usize)?;

        let (dir, name) = self.destination(&name, dst)?;
        let ino = self.create_in(dir, &name, S_IFREG | (src_inode.mode & PERMISSION_MASK))?;
        if let Err(e) = self.write_content(ino, &data) {
            warn!("copy of {src:?} failed, removing {name:?}");
            self.remove_dir_entry(dir, &name)?;
            self.free_inode(ino)?;
            return Err(e);
        }
        Ok(ino)
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<InodeNumber> {
        let source = self.resolve(src)?;
        let src_parent = source.parent;
        let src_ino = source.found()?;
        let src_name = source
            .name
            .ok_or(FsError::InvalidOperation("refusing to move '.', '..' or '/'"))?;
        let src_inode = self.require_access(src_ino, Access::Write)?;
        self.require_access(src_parent, Access::Write)?;

        let (dir, name) = self.destination(&src_name, dst)?;
        let dir_inode = self.require_access(dir, Access::Write)?;
        if !dir_inode.is_dir() {
            return Err(FsError::InvalidOperation("not a directory"));
        }
        match self.find_file_in_dir(dir, &name) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }
        if src_inode.is_dir() && self.is_within(dir, src_ino)? {
            return Err(FsError::InvalidOperation(
                "can't move a directory beneath itself",
            ));
        }

        self.add_dir_entry(dir, &name, src_ino)?;
        self.remove_dir_entry(src_parent, &src_name)?;
        if src_inode.is_dir() && dir != src_parent {
            self.retarget_dir_entry(src_ino, "..", dir)?;
            let mut old_parent = self.find_inode(src_parent)?;
            old_parent.links_count = old_parent.links_count.saturating_sub(1);
            self.save_inode(src_parent, &old_parent)?;
            let mut new_parent = self.find_inode(dir)?;
            new_parent.links_count += 1;
            self.save_inode(dir, &new_parent)?;
        }
        let mut inode = self.find_inode(src_ino)?;
        inode.update_changed_at();
        self.save_inode(src_ino, &inode)?;
        Ok(src_ino)
    }

    /// the directory and name a copied or moved `src_name` lands at
    fn destination(&mut self, src_name: &str, dst: &str) -> Result<(InodeNumber, String)> {
        let target = self.resolve_follow(dst)?;
        match target.inode {
            Some(ino) => {
                if self.find_inode(ino)?.is_dir() {
                    Ok((ino, src_name.to_string()))
                } else {
                    Err(FsError::AlreadyExists)
                }
            }
            None if dst.ends_with('/') => Err(FsError::NotFound),
            None => {
                let name = target.name.ok_or(FsError::NotFound)?;
                Ok((target.parent, name))
            }
        }
    }

    /// whether `dir` is `ancestor` or lies beneath it
    fn is_within(&self, mut dir: InodeNumber, ancestor: InodeNumber) -> Result<bool> {
        loop {
            if dir == ancestor {
                return Ok(true);
            }
            if dir == ROOT_INODE {
                return Ok(false);
            }
            dir = self.parent_of(dir)?;
        }
    }
}
