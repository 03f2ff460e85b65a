//! Inodes.
//!
//! An inode describes a single unnamed file. The inode disk structure
//! holds metadata: the file's type, its size, the number of links
//! referring to it, and the list of blocks holding the file's content.
//!
//! The inodes are laid out sequentially on disk at sb.inode_start. Each
//! inode has a number, indicating its position on the disk; numbers start
//! at 1 and number 0 is never allocated.
//!
//! An in-memory [`Inode`] is a value copy of the on-disk record. iget()
//! loads one; every modification made through bmap(), writei() or
//! dirlink() mutates the copy, and the caller must flush it back with
//! iput() or the metadata change is lost.
//!
//! Directories are ordinary files whose content is a packed array of
//! [`Dirent`] records. Every directory stores `.` and `..` as its first
//! two entries; a zero `inum` marks an unused slot.

use core::mem;

use arrayvec::ArrayVec;
use static_assertions::const_assert;
use zerocopy::{AsBytes, FromBytes};

use super::path::FileName;
use super::FileSystem;
use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::param::{BSIZE, DIRSIZ, MAXFILE, NDIRECT};

/// On-disk inode record. The type field is raw: 0 free, 1 directory,
/// 2 regular file, 3 device.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, AsBytes, FromBytes)]
pub struct Dinode {
    pub(crate) typ: u16,
    /// Major device number (device nodes only)
    pub(crate) major: u16,
    /// Minor device number (device nodes only)
    pub(crate) minor: u16,
    /// Number of links to inode in file system
    pub(crate) nlink: u16,
    /// Size of file (bytes)
    pub(crate) size: u32,
    /// Direct data block addresses; 0 = unallocated
    pub(crate) addrs: [u32; NDIRECT],
}

/// Size of the on-disk inode record.
pub const DINODE_SIZE: usize = mem::size_of::<Dinode>();

const_assert!(DINODE_SIZE == 60);

impl Dinode {
    fn read_at(bytes: &[u8]) -> Dinode {
        let mut dip = Dinode::default();
        dip.as_bytes_mut().copy_from_slice(bytes);
        dip
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum InodeType {
    Free = 0,
    Dir = 1,
    File = 2,
    Device = 3,
}

impl InodeType {
    fn from_raw(raw: u16) -> InodeType {
        match raw {
            1 => InodeType::Dir,
            2 => InodeType::File,
            3 => InodeType::Device,
            _ => InodeType::Free,
        }
    }
}

/// In-memory copy of an inode, obtained from iget() and flushed back with
/// iput().
#[derive(Debug, Clone)]
#[must_use]
pub struct Inode {
    /// Inode number
    pub inum: u32,
    pub(crate) dinode: Dinode,
}

impl Inode {
    pub fn typ(&self) -> InodeType {
        InodeType::from_raw(self.dinode.typ)
    }

    pub fn size(&self) -> u32 {
        self.dinode.size
    }

    pub fn nlink(&self) -> u16 {
        self.dinode.nlink
    }

    pub fn is_dir(&self) -> bool {
        self.typ() == InodeType::Dir
    }

    pub fn is_file(&self) -> bool {
        self.typ() == InodeType::File
    }
}

/// Directory entry: a fixed record mapping a name to an inode number.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, AsBytes, FromBytes)]
pub struct Dirent {
    /// Target inode number; 0 marks an unused slot.
    pub inum: u16,
    name: [u8; DIRSIZ],
}

/// Size of a directory entry record.
pub const DIRENT_SIZE: usize = mem::size_of::<Dirent>();

const_assert!(DIRENT_SIZE == 16);
// Entries never straddle a block boundary.
const_assert!(BSIZE % DIRENT_SIZE == 0);

impl Dirent {
    pub(crate) fn new(inum: u16, name: &FileName) -> Dirent {
        let mut de = Dirent::default();
        de.inum = inum;
        de.set_name(name);
        de
    }

    pub(crate) fn read_at(bytes: &[u8]) -> Dirent {
        let mut de = Dirent::default();
        de.as_bytes_mut().copy_from_slice(bytes);
        de
    }

    /// Fill in name, NUL-padded. `FileName` already bounds it to
    /// `DIRSIZ - 1` bytes.
    fn set_name(&mut self, name: &FileName) {
        let bytes = name.as_bytes();
        self.name = [0; DIRSIZ];
        self.name[..bytes.len()].copy_from_slice(bytes);
    }

    /// The stored name, up to the first NUL.
    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|b| *b == 0).unwrap_or(DIRSIZ);
        &self.name[..len]
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Allocate an inode of the given type: scan the table in order and
    /// claim the first free record, resetting every field on disk.
    pub fn ialloc(&mut self, typ: InodeType) -> Result<u32> {
        debug_assert_ne!(typ, InodeType::Free);
        for inum in 1..=self.sb.ninodes {
            let bno = self.sb.iblock(inum);
            let mut block = self.read_block(bno)?;
            let off = self.sb.ioffset(inum);
            let dip = Dinode::read_at(&block[off..off + DINODE_SIZE]);
            if dip.typ == InodeType::Free as u16 {
                let mut dip = Dinode::default();
                dip.typ = typ as u16;
                block[off..off + DINODE_SIZE].copy_from_slice(dip.as_bytes());
                self.write_block(bno, &block)?;
                return Ok(inum);
            }
        }
        log::warn!("ialloc: out of inodes");
        Err(FsError::NoSpaceInodes)
    }

    /// Mark inode `inum` free on disk. Data blocks are not freed here;
    /// callers do that. `addrs` is left behind as well: ialloc resets
    /// every field when the slot is reclaimed.
    pub fn ifree(&mut self, inum: u32) -> Result<()> {
        if inum == 0 || inum > self.sb.ninodes {
            return Err(FsError::OutOfRange);
        }
        let bno = self.sb.iblock(inum);
        let mut block = self.read_block(bno)?;
        let off = self.sb.ioffset(inum);
        let mut dip = Dinode::read_at(&block[off..off + DINODE_SIZE]);
        dip.typ = InodeType::Free as u16;
        block[off..off + DINODE_SIZE].copy_from_slice(dip.as_bytes());
        self.write_block(bno, &block)
    }

    /// Load the on-disk inode `inum` into a fresh handle.
    pub fn iget(&mut self, inum: u32) -> Result<Inode> {
        if inum == 0 || inum > self.sb.ninodes {
            return Err(FsError::OutOfRange);
        }
        let block = self.read_block(self.sb.iblock(inum))?;
        let off = self.sb.ioffset(inum);
        Ok(Inode {
            inum,
            dinode: Dinode::read_at(&block[off..off + DINODE_SIZE]),
        })
    }

    /// Flush the handle's record back to its slot on disk.
    pub fn iput(&mut self, ip: &Inode) -> Result<()> {
        let bno = self.sb.iblock(ip.inum);
        let mut block = self.read_block(bno)?;
        let off = self.sb.ioffset(ip.inum);
        block[off..off + DINODE_SIZE].copy_from_slice(ip.dinode.as_bytes());
        self.write_block(bno, &block)
    }

    /// Allocate a data block: set the first clear bitmap bit and return
    /// the physical block number.
    pub fn balloc(&mut self) -> Result<u32> {
        let mut bitmap = self.read_block(self.sb.bitmap_start)?;
        for bi in 0..self.sb.nblocks {
            let byte = bi as usize / 8;
            let mask = 1u8 << (bi % 8);
            if bitmap[byte] & mask == 0 {
                bitmap[byte] |= mask;
                self.write_block(self.sb.bitmap_start, &bitmap)?;
                return Ok(self.sb.data_start + bi);
            }
        }
        log::warn!("balloc: out of blocks");
        Err(FsError::NoSpaceBlocks)
    }

    /// Clear the bitmap bit for `blockno`. Out-of-range numbers are
    /// ignored; system blocks can never be freed.
    pub fn bfree(&mut self, blockno: u32) -> Result<()> {
        if blockno < self.sb.data_start {
            return Ok(());
        }
        let bi = blockno - self.sb.data_start;
        if bi >= self.sb.nblocks {
            return Ok(());
        }
        let mut bitmap = self.read_block(self.sb.bitmap_start)?;
        bitmap[bi as usize / 8] &= !(1u8 << (bi % 8));
        self.write_block(self.sb.bitmap_start, &bitmap)
    }

    /// Disk address of the `bn`th logical block in `ip`, allocating it if
    /// absent. The handle is mutated in place; the caller must iput() it
    /// later or a new address is lost.
    pub fn bmap(&mut self, ip: &mut Inode, bn: u32) -> Result<u32> {
        let bn = bn as usize;
        if bn >= NDIRECT {
            return Err(FsError::NoSpaceBlocks);
        }
        if ip.dinode.addrs[bn] == 0 {
            ip.dinode.addrs[bn] = self.balloc()?;
        }
        Ok(ip.dinode.addrs[bn])
    }

    /// Read up to `dst.len()` bytes from `ip` starting at byte `off`,
    /// returning how many were copied. Reads past the end are clamped.
    pub fn readi(&mut self, ip: &Inode, dst: &mut [u8], off: u32) -> Result<usize> {
        let size = ip.dinode.size;
        if off >= size {
            return Ok(0);
        }
        let n = u32::try_from(dst.len()).unwrap_or(u32::MAX).min(size - off);
        let mut tot: u32 = 0;
        while tot < n {
            let cur = off + tot;
            let bn = (cur / BSIZE as u32) as usize;
            let boff = cur as usize % BSIZE;
            let m = (n - tot).min((BSIZE - boff) as u32);
            if bn >= NDIRECT || ip.dinode.addrs[bn] == 0 {
                break;
            }
            let block = self.read_block(ip.dinode.addrs[bn])?;
            dst[tot as usize..(tot + m) as usize].copy_from_slice(&block[boff..boff + m as usize]);
            tot += m;
        }
        Ok(tot as usize)
    }

    /// Write `src` into `ip` at byte `off`, growing the file as needed.
    /// Mutates the handle's addrs and size; the caller must iput() to
    /// persist them. Blocks allocated by a failing call are freed again
    /// before the error is returned.
    pub fn writei(&mut self, ip: &mut Inode, src: &[u8], off: u32) -> Result<usize> {
        let n = u32::try_from(src.len()).map_err(|_| FsError::NoSpaceBlocks)?;
        if off > ip.dinode.size {
            return Err(FsError::OutOfRange);
        }
        if off.checked_add(n).map_or(true, |end| end as usize > MAXFILE * BSIZE) {
            return Err(FsError::NoSpaceBlocks);
        }

        let mut fresh: ArrayVec<u32, NDIRECT> = ArrayVec::new();
        let mut tot: u32 = 0;
        let res = loop {
            if tot >= n {
                break Ok(());
            }
            let cur = off + tot;
            let bn = cur / BSIZE as u32;
            let boff = cur as usize % BSIZE;
            let m = (n - tot).min((BSIZE - boff) as u32);
            let newly = ip.dinode.addrs[bn as usize] == 0;
            let addr = match self.bmap(ip, bn) {
                Ok(addr) => addr,
                Err(e) => break Err(e),
            };
            if newly {
                fresh.push(bn);
            }
            // A partial write must preserve the block's untouched bytes;
            // a full block is rebuilt from scratch.
            let mut block = if boff > 0 || (m as usize) < BSIZE {
                match self.read_block(addr) {
                    Ok(block) => block,
                    Err(e) => break Err(e),
                }
            } else {
                [0u8; BSIZE]
            };
            block[boff..boff + m as usize]
                .copy_from_slice(&src[tot as usize..(tot + m) as usize]);
            if let Err(e) = self.write_block(addr, &block) {
                break Err(e);
            }
            tot += m;
        };

        if let Err(e) = res {
            // Roll back this call's allocations. Bytes already written to
            // pre-existing blocks stay; the size was never raised, so they
            // sit beyond the readable end.
            for bn in fresh {
                let addr = ip.dinode.addrs[bn as usize];
                ip.dinode.addrs[bn as usize] = 0;
                let _ = self.bfree(addr);
            }
            return Err(e);
        }

        if off + n > ip.dinode.size {
            ip.dinode.size = off + n;
        }
        Ok(tot as usize)
    }

    /// Look up `name` in directory `dp`, skipping unused slots. Returns
    /// the entry's inode number.
    pub fn dirlookup(&mut self, dp: &Inode, name: &FileName) -> Result<Option<u32>> {
        Ok(self.dirent_scan(dp, name)?.map(|(inum, _)| inum))
    }

    /// Add the entry `name -> inum` to directory `dp`, reusing the first
    /// unused slot or appending at the end. The caller must iput() the
    /// directory to persist its grown size and any new block address.
    pub fn dirlink(&mut self, dp: &mut Inode, name: &FileName, inum: u32) -> Result<()> {
        if self.dirlookup(dp, name)?.is_some() {
            return Err(FsError::AlreadyExists);
        }
        let data = self.read_dir(dp)?;
        let off = data
            .chunks_exact(DIRENT_SIZE)
            .position(|chunk| Dirent::read_at(chunk).inum == 0)
            .map(|i| (i * DIRENT_SIZE) as u32)
            .unwrap_or(dp.dinode.size);
        let de = Dirent::new(inum as u16, name);
        self.writei(dp, de.as_bytes(), off)?;
        Ok(())
    }

    /// Clear the entry `name` from directory `dp` by zeroing its slot,
    /// returning the inode number it pointed to.
    pub(crate) fn dirunlink(&mut self, dp: &mut Inode, name: &FileName) -> Result<u32> {
        let (inum, off) = self.dirent_scan(dp, name)?.ok_or(FsError::NotFound)?;
        let de = Dirent::default();
        self.writei(dp, de.as_bytes(), off)?;
        Ok(inum)
    }

    /// Find `name` in `dp`, returning the entry's inode number and byte
    /// offset.
    fn dirent_scan(&mut self, dp: &Inode, name: &FileName) -> Result<Option<(u32, u32)>> {
        if !dp.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let data = self.read_dir(dp)?;
        for (i, chunk) in data.chunks_exact(DIRENT_SIZE).enumerate() {
            let de = Dirent::read_at(chunk);
            if de.inum == 0 {
                continue;
            }
            if de.name() == name.as_bytes() {
                return Ok(Some((de.inum as u32, (i * DIRENT_SIZE) as u32)));
            }
        }
        Ok(None)
    }

    /// The whole body of directory `dp` as raw dirent records.
    pub(crate) fn read_dir(&mut self, dp: &Inode) -> Result<Vec<u8>> {
        let mut data = vec![0u8; dp.dinode.size as usize];
        let n = self.readi(dp, &mut data, 0)?;
        data.truncate(n);
        Ok(data)
    }
}
