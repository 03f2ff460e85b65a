//! Error taxonomy for the storage stack.
//!
//! Every layer surfaces failures upward immediately; no layer retries.

use thiserror::Error;

/// Everything that can go wrong across the storage stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    /// The volume carries no valid superblock.
    #[error("file system not initialized")]
    NotInitialized,

    /// A block or inode index exceeds the device or table capacity.
    #[error("index out of range")]
    OutOfRange,

    /// No free inode slot remains.
    #[error("out of inodes")]
    NoSpaceInodes,

    /// No free data block remains, or a file outgrew its direct blocks.
    #[error("out of data blocks")]
    NoSpaceBlocks,

    /// A path component does not exist.
    #[error("no such file or directory")]
    NotFound,

    /// A file was named where a directory was required.
    #[error("not a directory")]
    NotADirectory,

    /// A directory was named where a regular file was required.
    #[error("not a file")]
    NotAFile,

    /// The target path already resolves to something.
    #[error("already exists")]
    AlreadyExists,

    /// A directory still holds entries besides `.` and `..`.
    #[error("directory not empty")]
    NotEmpty,

    /// A name exceeds the storable length.
    #[error("name too long")]
    NameTooLong,

    /// The underlying block device failed.
    #[error("i/o error")]
    IoError,
}

pub type Result<T> = core::result::Result<T, FsError>;
