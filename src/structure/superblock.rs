use crate::consts::{Blk, SUPERBLOCK_SIZE, VSFS_MAGIC};

/// Global volume parameters and running free counters, stored at the start
/// of block 0. Multi-byte fields are host-endian; images do not move
/// between architectures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub magic: u64,
    /// Image size in bytes.
    pub size: u64,
    pub num_inodes: u32,
    pub free_inodes: u32,
    pub num_blocks: Blk,
    pub free_blocks: Blk,
    /// First block after the inode table.
    pub data_region: Blk,
}

impl Superblock {
    pub fn from_bytes(buf: &[u8]) -> Superblock {
        Superblock {
            magic: u64::from_ne_bytes(buf[0..8].try_into().unwrap()),
            size: u64::from_ne_bytes(buf[8..16].try_into().unwrap()),
            num_inodes: u32::from_ne_bytes(buf[16..20].try_into().unwrap()),
            free_inodes: u32::from_ne_bytes(buf[20..24].try_into().unwrap()),
            num_blocks: Blk::from_ne_bytes(buf[24..28].try_into().unwrap()),
            free_blocks: Blk::from_ne_bytes(buf[28..32].try_into().unwrap()),
            data_region: Blk::from_ne_bytes(buf[32..36].try_into().unwrap()),
        }
    }

    pub fn to_bytes(&self) -> [u8; SUPERBLOCK_SIZE] {
        let mut buf = [0u8; SUPERBLOCK_SIZE];
        buf[0..8].copy_from_slice(&self.magic.to_ne_bytes());
        buf[8..16].copy_from_slice(&self.size.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.num_inodes.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.free_inodes.to_ne_bytes());
        buf[24..28].copy_from_slice(&self.num_blocks.to_ne_bytes());
        buf[28..32].copy_from_slice(&self.free_blocks.to_ne_bytes());
        buf[32..36].copy_from_slice(&self.data_region.to_ne_bytes());
        buf
    }

    pub fn is_valid(&self) -> bool {
        self.magic == VSFS_MAGIC
    }
}
