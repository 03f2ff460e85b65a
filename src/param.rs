//! System parameters.

/// Block size in bytes.
pub const BSIZE: usize = 512;

/// Size of the file system image (blocks).
pub const FSSIZE: u32 = 2048;

/// Size of disk block cache.
pub const NBUF: usize = 16;

/// Buffer cache hash buckets.
pub const NBUCKET: usize = 8;

/// Number of inode slots. Inode 0 is reserved, so one fewer is usable.
pub const NINODES: u32 = 64;

/// Direct block addresses per inode.
pub const NDIRECT: usize = 12;

/// Directory entry name bytes, 13 usable plus a NUL.
pub const DIRSIZ: usize = 14;

/// Maximum file size (blocks). Direct blocks only.
pub const MAXFILE: usize = NDIRECT;

/// root i-number
pub const ROOTINO: u32 = 1;

/// Maximum entries returned by one directory listing.
pub const MAXLIST: usize = 50;
