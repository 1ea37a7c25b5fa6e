use log::{info, warn};

use super::{
    directory::validate_name, permission::Access, FsError, Inode, InodeNumber, Partition, Result,
    BLOCK_SIZE, ROOT_INODE, S_IFLNK,
};

impl Partition {
    /// create symlink `link_path` storing `target`, which must resolve from
    /// the directory the link is created in
    pub fn create_symlink(&mut self, link_path: &str, target: &str) -> Result<InodeNumber> {
        info!("create_symlink() called with {link_path:?} -> {target:?}");
        if target.is_empty() {
            return Err(FsError::InvalidOperation("empty symbolic link target"));
        }
        if target.len() >= BLOCK_SIZE as usize {
            return Err(FsError::InvalidOperation("symbolic link target too long"));
        }
        let link = self.resolve(link_path)?;
        if link.inode.is_some() {
            return Err(FsError::AlreadyExists);
        }
        let name = link.name.ok_or(FsError::AlreadyExists)?;
        validate_name(&name)?;
        self.require_access(link.parent, Access::Write)?;
        let mut hops = 0;
        self.resolve_from(link.parent, target, false, &mut hops)?
            .found()?;

        let ino = self.allocate_inode()?;
        let block = match self.allocate_block() {
            Ok(block) => block,
            Err(e) => {
                warn!("no block left for symlink {name:?}, rolling back inode {ino}");
                self.free_inode(ino)?;
                return Err(e);
            }
        };
        self.write_data_to_data_block(target.as_bytes(), 0, block)?;
        let mut inode = Inode::new(
            S_IFLNK | 0o777,
            self.current_user.id,
            self.current_user.group_id,
        );
        inode.add_block(block, 0)?;
        inode.size = target.len() as u32;
        inode.links_count = 1;
        self.save_inode(ino, &inode)?;

        if let Err(e) = self.add_dir_entry(link.parent, &name, ino) {
            warn!("can't add entry for symlink {name:?}, rolling back inode {ino}");
            self.free_inode(ino)?;
            return Err(e);
        }
        Ok(ino)
    }

    /// add entry `link_path` for the inode of `target_path`
    pub fn create_hard_link(&mut self, target_path: &str, link_path: &str) -> Result<()> {
        info!("create_hard_link() called with {target_path:?} <- {link_path:?}");
        let target = self.resolve(target_path)?.found()?;
        if self.find_inode(target)?.is_dir() {
            return Err(FsError::InvalidOperation("hard link to a directory"));
        }
        let link = self.resolve(link_path)?;
        if link.inode.is_some() {
            return Err(FsError::AlreadyExists);
        }
        let name = link.name.ok_or(FsError::AlreadyExists)?;
        self.require_access(link.parent, Access::Write)?;
        self.add_dir_entry(link.parent, &name, target)?;

        let mut inode = self.find_inode(target)?;
        inode.links_count += 1;
        inode.update_changed_at();
        self.save_inode(target, &inode)
    }

    /// remove `path`; a directory must hold nothing but `.` and `..`
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        info!("delete_file() called with {path:?}");
        self.delete(path, false)
    }

    /// remove `path` and, for a directory, everything beneath it
    pub fn delete_recursive(&mut self, path: &str) -> Result<()> {
        info!("delete_recursive() called with {path:?}");
        self.delete(path, true)
    }

    fn delete(&mut self, path: &str, recursive: bool) -> Result<()> {
        let resolution = self.resolve(path)?;
        let Some(name) = resolution.name.as_deref() else {
            return Err(FsError::InvalidOperation(
                "refusing to delete '.', '..' or '/'",
            ));
        };
        let ino = resolution.found()?;
        self.unlink(resolution.parent, name, ino, recursive)?;
        if !self.group.has_inode(self.current_dir as usize) {
            warn!("current directory was deleted, moving to /");
            self.current_dir = ROOT_INODE;
        }
        Ok(())
    }

    /// drop entry `name -> ino` from `parent`, freeing `ino` once nothing links to it
    fn unlink(
        &mut self,
        parent: InodeNumber,
        name: &str,
        ino: InodeNumber,
        recursive: bool,
    ) -> Result<()> {
        self.require_access(parent, Access::Write)?;
        let mut inode = self.find_inode(ino)?;
        if inode.is_dir() {
            let children: Vec<_> = self
                .read_dir_entries(ino)?
                .into_iter()
                .filter(|entry| !entry.is_dot_or_dotdot())
                .collect();
            if !children.is_empty() {
                if !recursive {
                    return Err(FsError::InvalidOperation("directory not empty"));
                }
                for child in children {
                    self.unlink(ino, &child.name, child.inode, true)?;
                }
                inode = self.find_inode(ino)?;
            }
            // the entry in `parent` and the directory's own "."
            inode.links_count = inode.links_count.saturating_sub(2);
            // `parent` loses the ".." back-reference
            let mut parent_inode = self.find_inode(parent)?;
            parent_inode.links_count = parent_inode.links_count.saturating_sub(1);
            self.save_inode(parent, &parent_inode)?;
        } else {
            inode.links_count = inode.links_count.saturating_sub(1);
        }

        self.remove_dir_entry(parent, name)?;
        if inode.links_count == 0 {
            self.free_inode(ino)
        } else {
            inode.update_changed_at();
            self.save_inode(ino, &inode)
        }
    }
}
