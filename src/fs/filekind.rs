use serde::{Deserialize, Serialize};

use super::inode::{S_IFDIR, S_IFLNK, S_IFMT, S_IFREG};

/// an enum to describe the type of a file
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// an regular file
    RegularFile,
    /// a directory
    Directory,
    /// a symbolic link
    SymbolicLink,
    /// Unknown
    #[default]
    Unknown,
}

impl FileKind {
    /// classify the type bits of a mode
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => FileKind::RegularFile,
            S_IFDIR => FileKind::Directory,
            S_IFLNK => FileKind::SymbolicLink,
            _ => FileKind::Unknown,
        }
    }

    /// the type bits this kind is stored as
    pub fn type_bits(self) -> u32 {
        match self {
            FileKind::RegularFile => S_IFREG,
            FileKind::Directory => S_IFDIR,
            FileKind::SymbolicLink => S_IFLNK,
            FileKind::Unknown => 0,
        }
    }
}
