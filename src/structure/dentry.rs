use crate::consts::{Ino, DENTRY_SIZE, INO_MAX, NAME_MAX};
use crate::util::error::{FsError, Result};

/// One 256-byte slot of the root directory block: a 4-byte inode number
/// followed by a NUL-terminated name. `INO_MAX` marks the slot free; free
/// slots keep the whole name field zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dentry {
    pub ino: Ino,
    pub name: [u8; NAME_MAX],
}

impl Dentry {
    pub const FREE: Dentry = Dentry {
        ino: INO_MAX,
        name: [0; NAME_MAX],
    };

    /// The terminator has to fit in the name field, so the longest
    /// storable name is NAME_MAX - 1 bytes.
    pub fn new(ino: Ino, name: &[u8]) -> Result<Dentry> {
        if name.is_empty() || name.len() >= NAME_MAX {
            return Err(FsError::NameTooLong);
        }
        let mut field = [0u8; NAME_MAX];
        field[..name.len()].copy_from_slice(name);
        Ok(Dentry { ino, name: field })
    }

    pub fn is_free(&self) -> bool {
        self.ino == INO_MAX
    }

    /// Name bytes up to the terminator.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_MAX);
        &self.name[..end]
    }

    pub fn from_bytes(buf: &[u8]) -> Dentry {
        let mut name = [0u8; NAME_MAX];
        name.copy_from_slice(&buf[4..DENTRY_SIZE]);
        Dentry {
            ino: Ino::from_ne_bytes(buf[0..4].try_into().unwrap()),
            name,
        }
    }

    pub fn to_bytes(&self) -> [u8; DENTRY_SIZE] {
        let mut buf = [0u8; DENTRY_SIZE];
        buf[0..4].copy_from_slice(&self.ino.to_ne_bytes());
        buf[4..DENTRY_SIZE].copy_from_slice(&self.name);
        buf
    }
}
