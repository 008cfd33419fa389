//! On-disk records and the mounted-volume context. Records are copied out
//! of the mapping for inspection and copied back in after mutation; bitmaps
//! and data blocks are borrowed views straight into the mapping.

use std::mem::size_of;

use crate::consts::{
    Blk, Ino, BLK_MIN, BLOCK_SIZE, DMAP_BLKNUM, IMAP_BLKNUM, INODES_PER_BLOCK, INODE_SIZE,
    ITBL_BLKNUM, NUM_DIRECT, SUPERBLOCK_SIZE,
};
use crate::image::Image;
use crate::util::error::{FsError, Result};

pub mod bitmap;
pub mod dentry;
pub mod inode;
pub mod superblock;

use bitmap::Bitmap;
use inode::Inode;
use superblock::Superblock;

/// The mounted volume: the mapped image plus the geometry fixed at format
/// time. Every operation reads and mutates the mapping through this handle.
pub struct FsContext {
    image: Image,
    num_inodes: u32,
    num_blocks: Blk,
}

impl FsContext {
    /// Validate the superblock and take ownership of the mapping.
    pub fn new(image: Image) -> Result<FsContext> {
        let sb = Superblock::from_bytes(&image[..SUPERBLOCK_SIZE]);
        if !sb.is_valid() {
            return Err(FsError::InvalidSuperblock);
        }
        if sb.size != image.size() || sb.num_blocks as u64 != image.num_blocks() {
            return Err(FsError::InvalidSuperblock);
        }
        if sb.num_blocks < BLK_MIN
            || sb.num_inodes == 0
            || sb.num_inodes as usize > BLOCK_SIZE * 8
            || sb.data_region <= ITBL_BLKNUM
            || sb.data_region >= sb.num_blocks
        {
            return Err(FsError::InvalidSuperblock);
        }
        Ok(FsContext {
            num_inodes: sb.num_inodes,
            num_blocks: sb.num_blocks,
            image,
        })
    }

    pub fn num_inodes(&self) -> u32 {
        self.num_inodes
    }

    pub fn num_blocks(&self) -> Blk {
        self.num_blocks
    }

    pub fn superblock(&self) -> Superblock {
        Superblock::from_bytes(&self.image[..SUPERBLOCK_SIZE])
    }

    pub fn write_superblock(&mut self, sb: &Superblock) {
        self.image[..SUPERBLOCK_SIZE].copy_from_slice(&sb.to_bytes());
    }

    pub fn block(&self, blk: Blk) -> &[u8] {
        let start = blk as usize * BLOCK_SIZE;
        &self.image[start..start + BLOCK_SIZE]
    }

    pub fn block_mut(&mut self, blk: Blk) -> &mut [u8] {
        let start = blk as usize * BLOCK_SIZE;
        &mut self.image[start..start + BLOCK_SIZE]
    }

    pub(crate) fn zero_block(&mut self, blk: Blk) {
        self.block_mut(blk).fill(0);
    }

    /// Borrow the inode bitmap. Keep the borrow short; record writes need
    /// the context back.
    pub fn inode_bitmap(&mut self) -> Bitmap<'_> {
        let nbits = self.num_inodes;
        Bitmap::new(self.block_mut(IMAP_BLKNUM), nbits)
    }

    pub fn data_bitmap(&mut self) -> Bitmap<'_> {
        let nbits = self.num_blocks;
        Bitmap::new(self.block_mut(DMAP_BLKNUM), nbits)
    }

    /// Allocation check without a mutable borrow; used by the bridge to
    /// reject stale inode numbers.
    pub fn inode_in_use(&self, ino: Ino) -> bool {
        if ino >= self.num_inodes {
            return false;
        }
        self.block(IMAP_BLKNUM)[(ino / 8) as usize] & (1 << (ino % 8)) != 0
    }

    fn itable_slot(ino: Ino) -> (Blk, usize) {
        let blk = ITBL_BLKNUM + ino / INODES_PER_BLOCK as u32;
        let offset = (ino as usize % INODES_PER_BLOCK) * INODE_SIZE;
        (blk, offset)
    }

    pub fn inode(&self, ino: Ino) -> Inode {
        debug_assert!(ino < self.num_inodes);
        let (blk, offset) = Self::itable_slot(ino);
        Inode::from_bytes(&self.block(blk)[offset..offset + INODE_SIZE])
    }

    pub fn write_inode(&mut self, ino: Ino, inode: &Inode) {
        debug_assert!(ino < self.num_inodes);
        let (blk, offset) = Self::itable_slot(ino);
        self.block_mut(blk)[offset..offset + INODE_SIZE].copy_from_slice(&inode.to_bytes());
    }

    /// Block number backing the nth data block of a file: one of the direct
    /// pointers, or an entry of the single indirect block.
    pub fn nth_block(&self, inode: &Inode, n: u32) -> Blk {
        if (n as usize) < NUM_DIRECT {
            inode.i_direct[n as usize]
        } else {
            let offset = (n as usize - NUM_DIRECT) * size_of::<Blk>();
            let block = self.block(inode.i_indirect);
            Blk::from_ne_bytes(block[offset..offset + size_of::<Blk>()].try_into().unwrap())
        }
    }

    pub(crate) fn set_nth_block(&mut self, inode: &mut Inode, n: u32, blk: Blk) {
        if (n as usize) < NUM_DIRECT {
            inode.i_direct[n as usize] = blk;
        } else {
            let offset = (n as usize - NUM_DIRECT) * size_of::<Blk>();
            self.block_mut(inode.i_indirect)[offset..offset + size_of::<Blk>()]
                .copy_from_slice(&blk.to_ne_bytes());
        }
    }

    /// Absolute byte address within the image for a byte offset of a file.
    pub fn byte_addr(&self, inode: &Inode, offset: u64) -> usize {
        let blk = self.nth_block(inode, (offset / BLOCK_SIZE as u64) as u32);
        blk as usize * BLOCK_SIZE + (offset % BLOCK_SIZE as u64) as usize
    }

    /// Mapped bytes for an in-block range of a file. The range must not
    /// cross a block boundary; callers split their transfers first.
    pub fn file_bytes(&self, inode: &Inode, offset: u64, len: usize) -> &[u8] {
        debug_assert!((offset % BLOCK_SIZE as u64) as usize + len <= BLOCK_SIZE);
        let addr = self.byte_addr(inode, offset);
        &self.image[addr..addr + len]
    }

    pub fn file_bytes_mut(&mut self, inode: &Inode, offset: u64, len: usize) -> &mut [u8] {
        debug_assert!((offset % BLOCK_SIZE as u64) as usize + len <= BLOCK_SIZE);
        let addr = self.byte_addr(inode, offset);
        &mut self.image[addr..addr + len]
    }
}
