use log::debug;
use smallvec::SmallVec;

use super::{
    permission::Access, FsError, Inode, InodeNumber, Partition, Result, MAX_INODES,
    MAX_SYMLINK_DEPTH, ROOT_INODE,
};

/// a parsed path: its components in order and whether it started at "/"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathComponents {
    pub absolute: bool,
    pub components: SmallVec<[String; 8]>,
}

/// split `path` on `/`, empty components are dropped
pub fn split_path(path: &str) -> PathComponents {
    PathComponents {
        absolute: path.starts_with('/'),
        components: path
            .split('/')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// the outcome of walking a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// the directory the final component was looked up in
    pub parent: InodeNumber,
    /// the final component, `None` when the path ends at "/", "." or ".."
    pub name: Option<String>,
    /// the terminal inode, `None` when the final name doesn't exist
    pub inode: Option<InodeNumber>,
}

impl Resolution {
    /// the terminal inode, which must exist
    pub fn found(&self) -> Result<InodeNumber> {
        self.inode.ok_or(FsError::NotFound)
    }
}

impl Partition {
    /// walk `path` from "/" or the current directory without following
    /// a symlink in the final position
    pub fn resolve(&mut self, path: &str) -> Result<Resolution> {
        let mut hops = 0;
        self.resolve_from(self.current_dir, path, false, &mut hops)
    }

    /// like [Partition::resolve], but a final symlink is followed too
    pub fn resolve_follow(&mut self, path: &str) -> Result<Resolution> {
        let mut hops = 0;
        self.resolve_from(self.current_dir, path, true, &mut hops)
    }

    /// follow symlink `ino`, stored in directory `base_dir`, to the first
    /// inode that isn't a symlink. a non-symlink `ino` is returned as is
    pub fn resolve_symlink(
        &mut self,
        ino: InodeNumber,
        base_dir: InodeNumber,
    ) -> Result<InodeNumber> {
        let mut hops = 0;
        self.follow_link(ino, base_dir, &mut hops)
    }

    /// `hops` counts symlinks followed across the whole resolution,
    /// including those met while resolving link targets
    pub(crate) fn resolve_from(
        &mut self,
        start: InodeNumber,
        path: &str,
        follow_last: bool,
        hops: &mut u32,
    ) -> Result<Resolution> {
        let parsed = split_path(path);
        let mut dir = if parsed.absolute { ROOT_INODE } else { start };

        let Some((last, intermediate)) = parsed.components.split_last() else {
            self.touch_accessed(dir)?;
            return Ok(Resolution {
                parent: dir,
                name: None,
                inode: Some(dir),
            });
        };
        for component in intermediate {
            dir = self.step(dir, component, hops)?;
        }

        let resolution = match last.as_str() {
            "." => Resolution {
                parent: dir,
                name: None,
                inode: Some(dir),
            },
            ".." => Resolution {
                parent: dir,
                name: None,
                inode: Some(self.parent_of(dir)?),
            },
            name => {
                let inode = match self.find_file_in_dir(dir, name) {
                    Ok(ino) if follow_last => Some(self.follow_link(ino, dir, hops)?),
                    Ok(ino) => Some(ino),
                    Err(FsError::NotFound) => None,
                    Err(e) => return Err(e),
                };
                Resolution {
                    parent: dir,
                    name: Some(name.to_string()),
                    inode,
                }
            }
        };
        if let Some(ino) = resolution.inode {
            self.touch_accessed(ino)?;
        }
        Ok(resolution)
    }

    /// descend from `dir` through one intermediate component
    fn step(&mut self, dir: InodeNumber, component: &str, hops: &mut u32) -> Result<InodeNumber> {
        let next = match component {
            "." => return Ok(dir),
            ".." => self.parent_of(dir)?,
            name => {
                let child = self.find_file_in_dir(dir, name)?;
                self.follow_link(child, dir, hops)?
            }
        };
        let inode = self.find_inode(next)?;
        if !inode.is_dir() {
            return Err(FsError::InvalidOperation("not a directory"));
        }
        self.require(&inode, Access::Execute)?;
        Ok(next)
    }

    fn follow_link(
        &mut self,
        mut ino: InodeNumber,
        mut base_dir: InodeNumber,
        hops: &mut u32,
    ) -> Result<InodeNumber> {
        loop {
            let inode = self.find_inode(ino)?;
            if !inode.is_symlink() {
                return Ok(ino);
            }
            *hops += 1;
            if *hops > MAX_SYMLINK_DEPTH {
                return Err(FsError::InvalidOperation(
                    "too many levels of symbolic links",
                ));
            }
            let target = self.link_target(&inode)?;
            debug!("following symlink {ino} -> {target:?}");
            let resolution = self.resolve_from(base_dir, &target, false, hops)?;
            ino = resolution.found()?;
            base_dir = resolution.parent;
        }
    }

    /// the target path stored in a symlink's data block
    pub(crate) fn link_target(&self, inode: &Inode) -> Result<String> {
        let block = inode.direct_blocks[0]
            .ok_or(FsError::InvalidOperation("corrupt symbolic link"))?;
        let data = self.region.data(block)?;
        let bytes = data
            .get(..inode.size as usize)
            .ok_or(FsError::InvalidOperation("corrupt symbolic link"))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| FsError::InvalidOperation("corrupt symbolic link"))
    }

    /// the directory holding `dir`, read from its ".." entry
    pub(crate) fn parent_of(&self, dir: InodeNumber) -> Result<InodeNumber> {
        self.find_file_in_dir(dir, "..")
    }

    fn touch_accessed(&mut self, ino: InodeNumber) -> Result<()> {
        let mut inode = self.find_inode(ino)?;
        inode.update_accessed_at();
        self.save_inode(ino, &inode)
    }

    /// names of the directories from "/" down to the current directory,
    /// empty when the current directory is "/"
    pub fn current_path_components(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = self.current_dir;
        while dir != ROOT_INODE {
            if names.len() > MAX_INODES as usize {
                return Err(FsError::InvalidOperation("directory tree has a cycle"));
            }
            let parent = self.parent_of(dir)?;
            let entry = self
                .read_dir_entries(parent)?
                .into_iter()
                .find(|entry| entry.inode == dir && !entry.is_dot_or_dotdot())
                .ok_or(FsError::NotFound)?;
            names.push(entry.name);
            dir = parent;
        }
        names.reverse();
        Ok(names)
    }

    /// the current directory as an absolute path
    pub fn current_path(&self) -> Result<String> {
        Ok(format!("/{}", self.current_path_components()?.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{S_IFDIR, S_IFREG};

    #[test]
    fn test_split_path() {
        let parsed = split_path("/a//b/./c/");
        assert!(parsed.absolute);
        assert_eq!(parsed.components.as_slice(), ["a", "b", ".", "c"]);
        let relative = split_path("x/y");
        assert!(!relative.absolute);
        assert_eq!(relative.components.len(), 2);
        assert!(split_path("").components.is_empty());
    }

    #[test]
    fn test_dot_forms_resolve_to_the_same_inode() -> Result<()> {
        let mut partition = Partition::new()?;
        let d = partition.create_file("d", S_IFDIR | 0o755)?;
        partition.change_directory("d")?;
        for path in [".", "./", "././.", "", "/d", "../d", "/d/."] {
            assert_eq!(partition.resolve(path)?.inode, Some(d), "path {path:?}");
        }
        assert_eq!(partition.resolve("..")?.inode, Some(ROOT_INODE));
        assert_eq!(partition.resolve("/")?.inode, Some(ROOT_INODE));
        Ok(())
    }

    #[test]
    fn test_missing_final_component_is_reported() -> Result<()> {
        let mut partition = Partition::new()?;
        let d = partition.create_file("d", S_IFDIR | 0o755)?;
        let resolution = partition.resolve("/d/new")?;
        assert_eq!(resolution.parent, d);
        assert_eq!(resolution.name.as_deref(), Some("new"));
        assert_eq!(resolution.inode, None);
        assert!(matches!(resolution.found(), Err(FsError::NotFound)));
        // a missing intermediate component is an error
        assert!(matches!(
            partition.resolve("/nope/new"),
            Err(FsError::NotFound)
        ));
        Ok(())
    }

    #[test]
    fn test_file_as_directory() -> Result<()> {
        let mut partition = Partition::new()?;
        partition.create_file("f", S_IFREG | 0o644)?;
        assert!(matches!(
            partition.resolve("f/x"),
            Err(FsError::InvalidOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_execute_permission_on_intermediate_directories() -> Result<()> {
        let mut partition = Partition::new()?;
        partition.create_file("locked", S_IFDIR | 0o700)?;
        partition.create_file("locked/inner", S_IFREG | 0o644)?;
        partition.switch_user(1, 1);
        assert!(matches!(
            partition.resolve("locked/inner"),
            Err(FsError::PermissionDenied)
        ));
        // the final component needs no execute permission
        assert!(partition.resolve("locked")?.inode.is_some());
        Ok(())
    }

    #[test]
    fn test_symlinks_to_the_same_target() -> Result<()> {
        let mut partition = Partition::new()?;
        let d = partition.create_file("d", S_IFDIR | 0o755)?;
        let f = partition.create_file("d/f", S_IFREG | 0o644)?;
        partition.create_symlink("l1", "d")?;
        partition.create_symlink("l2", "l1")?;
        assert_eq!(partition.resolve_follow("l1")?.inode, Some(d));
        assert_eq!(partition.resolve_follow("l2")?.inode, Some(d));
        assert_eq!(partition.resolve("l2/f")?.inode, Some(f));
        assert_eq!(partition.resolve("l1/./f")?.inode, Some(f));
        // without following, the link itself is the terminal inode
        assert_ne!(partition.resolve("l1")?.inode, Some(d));
        Ok(())
    }

    #[test]
    fn test_symlink_cycle_is_bounded() -> Result<()> {
        let mut partition = Partition::new()?;
        partition.create_file("t", S_IFREG | 0o644)?;
        // l0 -> l1 -> ... -> l10 -> t, then l10 is repointed at l0
        partition.create_symlink("l10", "t")?;
        for i in (0..10).rev() {
            partition.create_symlink(&format!("l{i}"), &format!("l{}", i + 1))?;
        }
        assert!(partition.resolve_follow("l0").is_err());
        partition.delete_file("l10")?;
        partition.create_symlink("l10", "l0")?;
        let l0 = partition.resolve("l0")?.found()?;
        assert!(matches!(
            partition.resolve_symlink(l0, ROOT_INODE),
            Err(FsError::InvalidOperation(_))
        ));
        assert!(matches!(
            partition.resolve_follow("l5"),
            Err(FsError::InvalidOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_ten_hops_are_allowed() -> Result<()> {
        let mut partition = Partition::new()?;
        let t = partition.create_file("t", S_IFREG | 0o644)?;
        partition.create_symlink("l9", "t")?;
        for i in (0..9).rev() {
            partition.create_symlink(&format!("l{i}"), &format!("l{}", i + 1))?;
        }
        assert_eq!(partition.resolve_follow("l0")?.inode, Some(t));
        Ok(())
    }

    #[test]
    fn test_current_path_components() -> Result<()> {
        let mut partition = Partition::new()?;
        assert!(partition.current_path_components()?.is_empty());
        assert_eq!(partition.current_path()?, "/");
        partition.create_file("a", S_IFDIR | 0o755)?;
        partition.create_file("a/b", S_IFDIR | 0o755)?;
        partition.change_directory("a/b")?;
        assert_eq!(partition.current_path_components()?, vec!["a", "b"]);
        assert_eq!(partition.current_path()?, "/a/b");
        Ok(())
    }
}
