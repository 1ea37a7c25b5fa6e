use thiserror::Error;

pub type Result<T, E = FsError> = std::result::Result<T, E>;

/// every failure an engine operation reports to its caller
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("no space left on partition")]
    NoSpace,
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("file exists")]
    AlreadyExists,
    #[error("file too large")]
    FileTooLarge,
    #[error("invalid partition image: {0}")]
    Format(String),
    #[error("partition image I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::error::EncodeError> for FsError {
    fn from(e: bincode::error::EncodeError) -> Self {
        FsError::Format(format!("can't encode record: {e}"))
    }
}

impl From<bincode::error::DecodeError> for FsError {
    fn from(e: bincode::error::DecodeError) -> Self {
        FsError::Format(format!("can't decode record: {e}"))
    }
}

impl FsError {
    /// the errno value closest to this error
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::PermissionDenied => libc::EACCES,
            FsError::NoSpace => libc::ENOSPC,
            FsError::InvalidOperation(_) => libc::EINVAL,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::FileTooLarge => libc::EFBIG,
            FsError::Format(_) | FsError::Io(_) => libc::EIO,
        }
    }

    /// negative return code for callers speaking the `-errno` convention
    pub fn code(&self) -> i32 {
        -self.errno()
    }
}
