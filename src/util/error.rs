use std::io;

use libc::c_int;
use thiserror::Error;

/// Everything the core and the formatter can report. The bridge turns these
/// into negated errno values; the binaries print the Display form.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("image size is not a multiple of the block size")]
    UnalignedImage,
    #[error("image does not contain a valid file system")]
    InvalidSuperblock,
    #[error("image already contains a file system")]
    VolumePresent,
    #[error("inode count or image size out of range")]
    BadGeometry,
    #[error("path is not absolute")]
    InvalidPath,
    #[error("not a directory")]
    NotDirectory,
    #[error("name too long")]
    NameTooLong,
    #[error("no such file or directory")]
    NotFound,
    #[error("no free inodes or blocks left")]
    NoSpace,
    #[error("file would exceed the maximum size")]
    TooLarge,
    #[error("directory listing buffer is full")]
    OutOfMemory,
}

impl FsError {
    /// The errno the kernel bridge reports for this error.
    pub fn errno(&self) -> c_int {
        match self {
            FsError::Io(_) | FsError::UnalignedImage | FsError::InvalidSuperblock => libc::EIO,
            FsError::VolumePresent => libc::EEXIST,
            FsError::BadGeometry | FsError::InvalidPath => libc::EINVAL,
            FsError::NotDirectory => libc::ENOTDIR,
            FsError::NameTooLong => libc::ENAMETOOLONG,
            FsError::NotFound => libc::ENOENT,
            FsError::NoSpace => libc::ENOSPC,
            FsError::TooLarge => libc::EFBIG,
            FsError::OutOfMemory => libc::ENOMEM,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
