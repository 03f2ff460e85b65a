//! A minimal Unix-style file system on a RAM block device.
//!
//! The storage stack, leaves first:
//!   + block: a fixed-size block device behind the [`BlockDevice`] trait.
//!   + bio: a small write-back buffer cache keyed by block number.
//!   + fs: superblock, free-block bitmap, inode table and directories,
//!     the path resolver, and the file and directory operations.
//!   + shell: the command layer composing absolute paths over the ops.
//!
//! ```
//! use rufs::{FileSystem, RamDisk};
//!
//! let mut fs = FileSystem::format(RamDisk::new())?;
//! fs.create_directory("/home")?;
//! fs.create_file("/home/hello.txt", b"hello")?;
//! assert_eq!(fs.read_file("/home/hello.txt")?, b"hello");
//! # Ok::<(), rufs::FsError>(())
//! ```

pub mod bio;
pub mod block;
pub mod error;
pub mod fs;
pub mod param;
pub mod shell;

pub use block::{BlockDevice, RamDisk};
pub use error::{FsError, Result};
pub use fs::{DirEntry, FileSystem, Inode, InodeType};
pub use shell::Shell;
