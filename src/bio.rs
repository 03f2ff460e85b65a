//! Buffer cache.
//!
//! The buffer cache is a fixed pool of slots holding cached copies of disk
//! block contents, indexed by a small hash table keyed on the block number.
//!
//! Interface:
//! * To get a buffer for a particular disk block, call bread.
//! * After changing buffer data, call bwrite to write it to disk.
//! * When done with the buffer, call brelse.
//!
//! Eviction is deliberately simple: a miss takes the first slot not yet
//! holding a block, and once every slot is busy it recycles slot 0,
//! writing its contents back first if they have diverged from the device.
//! At most one slot ever holds a given block number.

use array_macro::array;

use crate::block::{Block, BlockDevice};
use crate::error::{FsError, Result};
use crate::param::{BSIZE, NBUCKET, NBUF};

/// Handle to a cache slot, valid until the next bread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufId(usize);

#[derive(Debug)]
struct BufSlot {
    /// Does this slot hold a block?
    valid: bool,
    /// Has data diverged from the device?
    dirty: bool,
    blockno: u32,
    data: Block,
    /// Next slot in the same hash bucket.
    next: Option<usize>,
}

impl BufSlot {
    const fn new() -> Self {
        BufSlot {
            valid: false,
            dirty: false,
            blockno: 0,
            data: [0; BSIZE],
            next: None,
        }
    }
}

#[derive(Debug)]
pub struct Bcache {
    slots: [BufSlot; NBUF],
    buckets: [Option<usize>; NBUCKET],
}

fn bucket(blockno: u32) -> usize {
    blockno as usize % NBUCKET
}

impl Bcache {
    pub fn new() -> Self {
        Bcache {
            slots: array![_ => BufSlot::new(); NBUF],
            buckets: [None; NBUCKET],
        }
    }

    /// Return a slot holding the current contents of `blockno`, reading
    /// from the device on a miss. Device failures surface as `IoError`.
    pub fn bread<D: BlockDevice>(&mut self, dev: &mut D, blockno: u32) -> Result<BufId> {
        if let Some(idx) = self.lookup(blockno) {
            return Ok(BufId(idx));
        }
        self.claim(dev, blockno).map(BufId)
    }

    /// Shared view of a slot's bytes.
    pub fn data(&self, id: BufId) -> &Block {
        &self.slots[id.0].data
    }

    /// Mutable view of a slot's bytes. The slot is marked dirty; callers
    /// flush with bwrite.
    pub fn data_mut(&mut self, id: BufId) -> &mut Block {
        let slot = &mut self.slots[id.0];
        slot.dirty = true;
        &mut slot.data
    }

    /// Synchronously write the slot through to the device and clear the
    /// dirty flag.
    pub fn bwrite<D: BlockDevice>(&mut self, dev: &mut D, id: BufId) -> Result<()> {
        let slot = &mut self.slots[id.0];
        dev.write_block(slot.blockno, &slot.data)
            .map_err(|_| FsError::IoError)?;
        slot.dirty = false;
        Ok(())
    }

    /// Return the slot to the pool without writing. A no-op in this
    /// single-threaded design; the slot stays cached until evicted.
    pub fn brelse(&mut self, _id: BufId) {}

    fn lookup(&self, blockno: u32) -> Option<usize> {
        let mut cur = self.buckets[bucket(blockno)];
        while let Some(i) = cur {
            let slot = &self.slots[i];
            if slot.valid && slot.blockno == blockno {
                return Some(i);
            }
            cur = slot.next;
        }
        None
    }

    /// Pick a slot for `blockno`, fill it from the device, and link it
    /// into its bucket.
    fn claim<D: BlockDevice>(&mut self, dev: &mut D, blockno: u32) -> Result<usize> {
        let idx = match self.slots.iter().position(|s| !s.valid) {
            Some(idx) => idx,
            None => {
                // Every slot is busy: recycle slot 0 as the placeholder
                // victim, flushing it first if dirty.
                if self.slots[0].dirty {
                    let old = self.slots[0].blockno;
                    dev.write_block(old, &self.slots[0].data)
                        .map_err(|_| FsError::IoError)?;
                    self.slots[0].dirty = false;
                }
                self.unlink(0);
                self.slots[0].valid = false;
                0
            }
        };
        dev.read_block(blockno, &mut self.slots[idx].data)
            .map_err(|_| FsError::IoError)?;
        let slot = &mut self.slots[idx];
        slot.valid = true;
        slot.dirty = false;
        slot.blockno = blockno;
        slot.next = self.buckets[bucket(blockno)];
        self.buckets[bucket(blockno)] = Some(idx);
        Ok(idx)
    }

    /// Remove a slot from its hash chain.
    fn unlink(&mut self, idx: usize) {
        let b = bucket(self.slots[idx].blockno);
        if self.buckets[b] == Some(idx) {
            self.buckets[b] = self.slots[idx].next;
            self.slots[idx].next = None;
            return;
        }
        let mut cur = self.buckets[b];
        while let Some(i) = cur {
            if self.slots[i].next == Some(idx) {
                self.slots[i].next = self.slots[idx].next;
                self.slots[idx].next = None;
                return;
            }
            cur = self.slots[i].next;
        }
    }
}

impl Default for Bcache {
    fn default() -> Self {
        Self::new()
    }
}
