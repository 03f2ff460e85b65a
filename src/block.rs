//! Block device abstraction.
//!
//! The file system sits on block-indexed storage behind the [`BlockDevice`]
//! trait and owns a single handle to it. The one implementation shipped
//! here is [`RamDisk`], a zero-filled contiguous memory region.

use crate::error::{FsError, Result};
use crate::param::{BSIZE, FSSIZE};

/// One disk block's worth of bytes.
pub type Block = [u8; BSIZE];

/// Block-indexed storage. Reads and writes are block-aligned and
/// block-sized; indices past the end fail with `OutOfRange`.
pub trait BlockDevice {
    /// Total number of blocks.
    fn block_count(&self) -> u32;

    /// Copy block `blockno` into `buf`.
    fn read_block(&self, blockno: u32, buf: &mut Block) -> Result<()>;

    /// Replace block `blockno`'s contents with `buf`.
    fn write_block(&mut self, blockno: u32, buf: &Block) -> Result<()>;

    /// Read `buf.len() / BSIZE` consecutive blocks starting at `start`.
    /// `buf` must be a whole number of blocks long.
    fn read_blocks(&self, start: u32, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len() % BSIZE, 0);
        let count = (buf.len() / BSIZE) as u32;
        if start.checked_add(count).map_or(true, |end| end > self.block_count()) {
            return Err(FsError::OutOfRange);
        }
        for (i, chunk) in buf.chunks_exact_mut(BSIZE).enumerate() {
            self.read_block(start + i as u32, chunk.try_into().expect("BSIZE chunk"))?;
        }
        Ok(())
    }

    /// Write `buf.len() / BSIZE` consecutive blocks starting at `start`.
    /// `buf` must be a whole number of blocks long.
    fn write_blocks(&mut self, start: u32, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len() % BSIZE, 0);
        let count = (buf.len() / BSIZE) as u32;
        if start.checked_add(count).map_or(true, |end| end > self.block_count()) {
            return Err(FsError::OutOfRange);
        }
        for (i, chunk) in buf.chunks_exact(BSIZE).enumerate() {
            self.write_block(start + i as u32, chunk.try_into().expect("BSIZE chunk"))?;
        }
        Ok(())
    }

    /// Device geometry as `(size_bytes, block_count)`.
    fn info(&self) -> (usize, u32) {
        (self.block_count() as usize * BSIZE, self.block_count())
    }
}

/// A fixed-size block device backed by a contiguous memory region.
/// Construction zero-fills the backing store, so a fresh disk always
/// reads as all zeroes.
#[derive(Debug)]
pub struct RamDisk {
    data: Vec<u8>,
}

impl RamDisk {
    /// A disk of the standard [`FSSIZE`] blocks (1 MiB).
    pub fn new() -> Self {
        Self::with_blocks(FSSIZE)
    }

    /// A disk of `blocks` blocks.
    pub fn with_blocks(blocks: u32) -> Self {
        RamDisk {
            data: vec![0; blocks as usize * BSIZE],
        }
    }

    fn offset(&self, blockno: u32) -> Result<usize> {
        if blockno >= self.block_count() {
            return Err(FsError::OutOfRange);
        }
        Ok(blockno as usize * BSIZE)
    }
}

impl Default for RamDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for RamDisk {
    fn block_count(&self) -> u32 {
        (self.data.len() / BSIZE) as u32
    }

    fn read_block(&self, blockno: u32, buf: &mut Block) -> Result<()> {
        let off = self.offset(blockno)?;
        buf.copy_from_slice(&self.data[off..off + BSIZE]);
        Ok(())
    }

    fn write_block(&mut self, blockno: u32, buf: &Block) -> Result<()> {
        let off = self.offset(blockno)?;
        self.data[off..off + BSIZE].copy_from_slice(buf);
        Ok(())
    }
}
