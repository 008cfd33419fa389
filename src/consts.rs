use std::mem::size_of;

/// Block number within the image.
pub type Blk = u32;
/// Inode number within the inode table.
pub type Ino = u32;

/// Identifies a formatted volume; first field of block 0.
pub const VSFS_MAGIC: u64 = 0xC5C369A4C5C369A4;

pub const BLOCK_SIZE: usize = 4096;

/// Size of the name field in a directory entry, terminator included.
pub const NAME_MAX: usize = 252;
/// Longest path getattr accepts.
pub const PATH_MAX: usize = 4096;

/// Marks a free directory-entry slot. 0 is a valid inode number (the root),
/// so the all-ones value plays the "no inode" role.
pub const INO_MAX: Ino = Ino::MAX;
pub const ROOT_INO: Ino = 0;

// Fixed block numbers, in image order. The inode table starts right after
// the data bitmap and the data region right after the inode table.
pub const SB_BLKNUM: Blk = 0;
pub const IMAP_BLKNUM: Blk = 1;
pub const DMAP_BLKNUM: Blk = 2;
pub const ITBL_BLKNUM: Blk = 3;

/// Smallest admissible image, in blocks.
pub const BLK_MIN: Blk = 64;
/// Largest admissible image, in blocks. Each bitmap is a single block, so
/// neither blocks nor inodes can outnumber its bits.
pub const BLK_MAX: Blk = (BLOCK_SIZE * 8) as Blk;

pub const INODE_SIZE: usize = 128;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

/// Direct block pointers per inode; fills the 128-byte record exactly.
pub const NUM_DIRECT: usize = 22;
/// Block numbers held by the single indirect block.
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / size_of::<Blk>();
pub const MAX_FILE_BLOCKS: usize = NUM_DIRECT + PTRS_PER_BLOCK;

pub const SUPERBLOCK_SIZE: usize = 36;
pub const DENTRY_SIZE: usize = 256;
pub const DENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DENTRY_SIZE;
