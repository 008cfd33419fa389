use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::consts::{Blk, INODE_SIZE, NUM_DIRECT};

/// Seconds and nanoseconds since the epoch, as stored in an inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

impl Timespec {
    pub fn now() -> Timespec {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => Timespec {
                sec: d.as_secs() as i64,
                nsec: d.subsec_nanos() as i64,
            },
            Err(_) => Timespec::default(),
        }
    }

    pub fn from_system_time(t: SystemTime) -> Timespec {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Timespec {
                sec: d.as_secs() as i64,
                nsec: d.subsec_nanos() as i64,
            },
            Err(_) => Timespec::default(),
        }
    }

    pub fn to_system_time(self) -> SystemTime {
        if self.sec < 0 {
            return UNIX_EPOCH;
        }
        UNIX_EPOCH + Duration::new(self.sec as u64, self.nsec as u32)
    }
}

/// One 128-byte record in the inode table. `i_blocks` counts data blocks
/// only; the indirect block itself is accounted in the superblock's free
/// counter but not here. `i_indirect == 0` means no indirect block (block 0
/// holds the superblock, so it can never back file data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub i_mode: u32,
    pub i_nlink: u32,
    pub i_size: u64,
    pub i_blocks: u32,
    pub i_direct: [Blk; NUM_DIRECT],
    pub i_indirect: Blk,
    pub i_mtime: Timespec,
}

impl Inode {
    pub fn zeroed() -> Inode {
        Inode {
            i_mode: 0,
            i_nlink: 0,
            i_size: 0,
            i_blocks: 0,
            i_direct: [0; NUM_DIRECT],
            i_indirect: 0,
            i_mtime: Timespec::default(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.i_mode & libc::S_IFMT == libc::S_IFDIR
    }

    pub fn from_bytes(buf: &[u8]) -> Inode {
        let mut i_direct = [0 as Blk; NUM_DIRECT];
        for (i, slot) in i_direct.iter_mut().enumerate() {
            let off = 20 + i * 4;
            *slot = Blk::from_ne_bytes(buf[off..off + 4].try_into().unwrap());
        }
        Inode {
            i_mode: u32::from_ne_bytes(buf[0..4].try_into().unwrap()),
            i_nlink: u32::from_ne_bytes(buf[4..8].try_into().unwrap()),
            i_size: u64::from_ne_bytes(buf[8..16].try_into().unwrap()),
            i_blocks: u32::from_ne_bytes(buf[16..20].try_into().unwrap()),
            i_direct,
            i_indirect: Blk::from_ne_bytes(buf[108..112].try_into().unwrap()),
            i_mtime: Timespec {
                sec: i64::from_ne_bytes(buf[112..120].try_into().unwrap()),
                nsec: i64::from_ne_bytes(buf[120..128].try_into().unwrap()),
            },
        }
    }

    pub fn to_bytes(&self) -> [u8; INODE_SIZE] {
        let mut buf = [0u8; INODE_SIZE];
        buf[0..4].copy_from_slice(&self.i_mode.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.i_nlink.to_ne_bytes());
        buf[8..16].copy_from_slice(&self.i_size.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.i_blocks.to_ne_bytes());
        for (i, slot) in self.i_direct.iter().enumerate() {
            let off = 20 + i * 4;
            buf[off..off + 4].copy_from_slice(&slot.to_ne_bytes());
        }
        buf[108..112].copy_from_slice(&self.i_indirect.to_ne_bytes());
        buf[112..120].copy_from_slice(&self.i_mtime.sec.to_ne_bytes());
        buf[120..128].copy_from_slice(&self.i_mtime.nsec.to_ne_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fills_exactly() {
        // mode + nlink + size + blocks + direct + indirect + mtime
        assert_eq!(4 + 4 + 8 + 4 + NUM_DIRECT * 4 + 4 + 16, INODE_SIZE);
    }

    #[test]
    fn round_trip() {
        let mut inode = Inode::zeroed();
        inode.i_mode = libc::S_IFREG | 0o644;
        inode.i_nlink = 1;
        inode.i_size = 5000;
        inode.i_blocks = 2;
        inode.i_direct[0] = 6;
        inode.i_direct[1] = 7;
        inode.i_indirect = 0;
        inode.i_mtime = Timespec { sec: 1_700_000_000, nsec: 123 };

        let decoded = Inode::from_bytes(&inode.to_bytes());
        assert_eq!(decoded, inode);
        assert!(!decoded.is_dir());
    }

    #[test]
    fn zeroed_record_is_all_zero_bytes() {
        assert_eq!(Inode::zeroed().to_bytes(), [0u8; INODE_SIZE]);
    }

    #[test]
    fn mode_distinguishes_directories() {
        let mut inode = Inode::zeroed();
        inode.i_mode = libc::S_IFDIR | 0o777;
        assert!(inode.is_dir());
    }

    #[test]
    fn timespec_system_time_round_trip() {
        let t = Timespec { sec: 1_700_000_000, nsec: 42 };
        assert_eq!(Timespec::from_system_time(t.to_system_time()), t);
    }
}
