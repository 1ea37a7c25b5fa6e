use log::info;

use super::{FsError, Inode, InodeNumber, Partition, Result, User};

/// the rwx bit a caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Access {
    Read = 4,
    Write = 2,
    Execute = 1,
}

/// whether `user` may perform `access` on `inode`
///
/// root passes every check, everybody else is judged by exactly one of
/// the owner, group or other triplets
pub fn check_permission(user: &User, inode: &Inode, access: Access) -> bool {
    if user.is_root() {
        return true;
    }
    let shift = if user.id == inode.uid {
        6
    } else if user.group_id == inode.gid {
        3
    } else {
        0
    };
    (inode.mode >> shift) & 0o7 & access as u32 != 0
}

impl Partition {
    pub fn check_permission(&self, inode: &Inode, access: Access) -> bool {
        check_permission(&self.current_user, inode, access)
    }

    pub(crate) fn require(&self, inode: &Inode, access: Access) -> Result<()> {
        if self.check_permission(inode, access) {
            Ok(())
        } else {
            Err(FsError::PermissionDenied)
        }
    }

    /// load inode `ino` and check `access` on it
    pub(crate) fn require_access(&self, ino: InodeNumber, access: Access) -> Result<Inode> {
        let inode = self.find_inode(ino)?;
        self.require(&inode, access)?;
        Ok(inode)
    }

    /// change the permission bits of `path`, the owner and root only
    pub fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        info!("chmod() called with {path:?}, {mode:o}");
        let ino = self.resolve(path)?.found()?;
        let mut inode = self.find_inode(ino)?;
        if !self.current_user.is_root() && self.current_user.id != inode.uid {
            return Err(FsError::PermissionDenied);
        }
        inode.set_permissions(mode);
        self.save_inode(ino, &inode)
    }

    /// hand `path` to another owner, root only
    pub fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()> {
        info!("chown() called with {path:?} {uid:?} {gid:?}");
        if !self.current_user.is_root() {
            return Err(FsError::PermissionDenied);
        }
        let ino = self.resolve(path)?.found()?;
        let mut inode = self.find_inode(ino)?;
        inode.uid = uid;
        inode.gid = gid;
        inode.update_changed_at();
        self.save_inode(ino, &inode)
    }
}
