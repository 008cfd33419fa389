//! Formatting an image into an empty volume. Works on the raw mapped bytes
//! so the same code serves the mkfs.vsfs binary and in-memory tests. The
//! superblock is written last; a failed format never produces a volume
//! that passes the magic check.

use crate::consts::{
    Blk, BLK_MAX, BLK_MIN, BLOCK_SIZE, DENTRIES_PER_BLOCK, DENTRY_SIZE, DMAP_BLKNUM, IMAP_BLKNUM,
    INODES_PER_BLOCK, INODE_SIZE, INO_MAX, ITBL_BLKNUM, NUM_DIRECT, ROOT_INO, SB_BLKNUM,
    SUPERBLOCK_SIZE, VSFS_MAGIC,
};
use crate::structure::bitmap::Bitmap;
use crate::structure::dentry::Dentry;
use crate::structure::inode::{Inode, Timespec};
use crate::structure::superblock::Superblock;
use crate::util::div_round_up;
use crate::util::error::{FsError, Result};

/// Options of the mkfs.vsfs command line.
#[derive(Debug, Clone, Copy)]
pub struct FormatOpts {
    pub num_inodes: u32,
    /// Overwrite an existing volume.
    pub force: bool,
    /// Zero the whole image before formatting.
    pub zero: bool,
}

/// A volume is present when block 0 carries the magic.
pub fn is_present(image: &[u8]) -> bool {
    image.len() >= SUPERBLOCK_SIZE && Superblock::from_bytes(image).is_valid()
}

fn block_mut(image: &mut [u8], blk: Blk) -> &mut [u8] {
    let start = blk as usize * BLOCK_SIZE;
    &mut image[start..start + BLOCK_SIZE]
}

pub fn format(image: &mut [u8], opts: &FormatOpts) -> Result<()> {
    if image.len() % BLOCK_SIZE != 0 {
        return Err(FsError::UnalignedImage);
    }
    let nblks = (image.len() / BLOCK_SIZE) as Blk;
    if !(BLK_MIN..=BLK_MAX).contains(&nblks) {
        return Err(FsError::BadGeometry);
    }
    // The inode bitmap is a single block, so the inode count is bounded by
    // its bits as well as by the sentinel value.
    if opts.num_inodes == 0
        || opts.num_inodes >= INO_MAX
        || opts.num_inodes as usize > BLOCK_SIZE * 8
    {
        return Err(FsError::BadGeometry);
    }
    let itable_blocks = div_round_up(opts.num_inodes as u64, INODES_PER_BLOCK as u64) as Blk;
    // Superblock, two bitmaps, the inode table, and one root directory
    // block must all fit.
    if ITBL_BLKNUM + itable_blocks + 1 > nblks {
        return Err(FsError::BadGeometry);
    }
    if !opts.force && is_present(image) {
        return Err(FsError::VolumePresent);
    }

    if opts.zero {
        image.fill(0);
    }

    // Inode bitmap: everything allocated, then the first num_inodes bits
    // cleared, then the root claimed.
    {
        let block = block_mut(image, IMAP_BLKNUM);
        block.fill(0xff);
        let mut imap = Bitmap::new(block, opts.num_inodes);
        imap.init();
        imap.set(ROOT_INO, true);
    }

    // Data bitmap: same pattern, with every metadata block kept allocated
    // and the first free block claimed for the root directory.
    let root_blk;
    {
        let block = block_mut(image, DMAP_BLKNUM);
        block.fill(0xff);
        let mut dmap = Bitmap::new(block, nblks);
        dmap.init();
        dmap.set(SB_BLKNUM, true);
        dmap.set(IMAP_BLKNUM, true);
        dmap.set(DMAP_BLKNUM, true);
        for i in 0..itable_blocks {
            dmap.set(ITBL_BLKNUM + i, true);
        }
        root_blk = dmap.alloc().ok_or(FsError::NoSpace)?;
    }

    // Root inode.
    let mut i_direct = [0 as Blk; NUM_DIRECT];
    i_direct[0] = root_blk;
    let root = Inode {
        i_mode: libc::S_IFDIR | 0o777,
        i_nlink: 2,
        i_size: BLOCK_SIZE as u64,
        i_blocks: 1,
        i_direct,
        i_indirect: 0,
        i_mtime: Timespec::now(),
    };
    let itable = block_mut(image, ITBL_BLKNUM);
    itable[..INODE_SIZE].copy_from_slice(&root.to_bytes());

    // Root directory block: ".", "..", and free slots with zeroed names.
    {
        let block = block_mut(image, root_blk);
        block.fill(0);
        let dot = Dentry::new(ROOT_INO, b".").unwrap();
        let dotdot = Dentry::new(ROOT_INO, b"..").unwrap();
        block[..DENTRY_SIZE].copy_from_slice(&dot.to_bytes());
        block[DENTRY_SIZE..2 * DENTRY_SIZE].copy_from_slice(&dotdot.to_bytes());
        for slot in 2..DENTRIES_PER_BLOCK {
            let offset = slot * DENTRY_SIZE;
            block[offset..offset + DENTRY_SIZE].copy_from_slice(&Dentry::FREE.to_bytes());
        }
    }

    // Superblock last, once everything else is in place.
    let sb = Superblock {
        magic: VSFS_MAGIC,
        size: image.len() as u64,
        num_inodes: opts.num_inodes,
        free_inodes: opts.num_inodes - 1,
        num_blocks: nblks,
        free_blocks: nblks - ITBL_BLKNUM - itable_blocks - 1,
        data_region: ITBL_BLKNUM + itable_blocks,
    };
    image[..SUPERBLOCK_SIZE].copy_from_slice(&sb.to_bytes());
    Ok(())
}
