//! File system implementation. Five layers:
//!   + Blocks: allocator for raw disk blocks.
//!   + Files: inode allocator, reading, writing, metadata.
//!   + Directories: inode with special contents (list of other inodes!)
//!   + Names: paths like /home/u/x for convenient naming.
//!   + Operations: create/delete/read/write/list over whole paths.
//!
//! Everything hangs off the [`FileSystem`] aggregate, which owns the
//! block device, the buffer cache, the cached superblock and the current
//! path. Every mutation is flushed through the cache to the device before
//! the operation returns, so on-disk state always equals committed state.

pub mod inode;
pub mod path;
pub mod superblock;

mod ops;

use crate::bio::Bcache;
use crate::block::{Block, BlockDevice};
use crate::error::{FsError, Result};
use crate::param::{BSIZE, ROOTINO};

pub use inode::{Dirent, Inode, InodeType, DINODE_SIZE, DIRENT_SIZE};
pub use ops::DirEntry;
pub use path::{FileName, Path};
pub use superblock::{Superblock, FSMAGIC, SUPERBLOCK_NO};

/// The file-system aggregate: a single owning handle over the device and
/// every piece of state that was once process-wide.
pub struct FileSystem<D: BlockDevice> {
    pub(crate) dev: D,
    pub(crate) cache: Bcache,
    pub(crate) sb: Superblock,
    pub(crate) cwd: String,
}

impl<D: BlockDevice> std::fmt::Debug for FileSystem<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("cache", &self.cache)
            .field("sb", &self.sb)
            .field("cwd", &self.cwd)
            .finish()
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Mount `dev`: reuse the file system already on it if the superblock
    /// magic matches, otherwise format it first.
    pub fn mount(dev: D) -> Result<Self> {
        let mut block = [0u8; BSIZE];
        dev.read_block(SUPERBLOCK_NO, &mut block)?;
        match Superblock::from_block(&block) {
            Some(sb) => {
                log::debug!("mount: found file system, {} blocks", sb.size);
                Ok(Self::with_superblock(dev, sb))
            }
            None => Self::format(dev),
        }
    }

    /// Open an already-formatted volume, failing if the magic number does
    /// not match instead of formatting.
    pub fn open(dev: D) -> Result<Self> {
        let mut block = [0u8; BSIZE];
        dev.read_block(SUPERBLOCK_NO, &mut block)?;
        let sb = Superblock::from_block(&block).ok_or(FsError::NotInitialized)?;
        Ok(Self::with_superblock(dev, sb))
    }

    /// Unconditionally build an empty file system on `dev`: fresh
    /// superblock, cleared bitmap and inode table, and a root directory
    /// whose `.` and `..` both point at itself.
    pub fn format(dev: D) -> Result<Self> {
        let (_, blocks) = dev.info();
        let sb = Superblock::new(blocks);
        log::info!("format: {} blocks, {} inodes", sb.size, sb.ninodes);

        let mut fs = Self::with_superblock(dev, sb);
        let mut block = [0u8; BSIZE];
        fs.sb.write_to_block(&mut block);
        fs.write_block(SUPERBLOCK_NO, &block)?;

        let zero = [0u8; BSIZE];
        fs.write_block(fs.sb.bitmap_start, &zero)?;
        for bno in fs.sb.inode_start..fs.sb.data_start {
            fs.write_block(bno, &zero)?;
        }

        let inum = fs.ialloc(InodeType::Dir)?;
        debug_assert_eq!(inum, ROOTINO);
        fs.init_directory(inum, inum)?;
        Ok(fs)
    }

    fn with_superblock(dev: D, sb: Superblock) -> Self {
        FileSystem {
            dev,
            cache: Bcache::new(),
            sb,
            cwd: String::from("/"),
        }
    }

    /// The superblock describing this volume.
    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    /// Read `bno` through the buffer cache, returning a copy of its
    /// bytes.
    pub(crate) fn read_block(&mut self, bno: u32) -> Result<Block> {
        let b = self.cache.bread(&mut self.dev, bno)?;
        let data = *self.cache.data(b);
        self.cache.brelse(b);
        Ok(data)
    }

    /// Write `data` to `bno` through the buffer cache, flushed to the
    /// device before returning.
    pub(crate) fn write_block(&mut self, bno: u32, data: &Block) -> Result<()> {
        let b = self.cache.bread(&mut self.dev, bno)?;
        self.cache.data_mut(b).copy_from_slice(data);
        self.cache.bwrite(&mut self.dev, b)?;
        self.cache.brelse(b);
        Ok(())
    }
}
