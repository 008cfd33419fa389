//! Path resolution over the flat namespace. Every file lives directly in
//! the root directory, so a path is either "/" or "/NAME".

use crate::consts::{Ino, DENTRY_SIZE, ROOT_INO};
use crate::structure::dentry::Dentry;
use crate::structure::FsContext;
use crate::util::error::{FsError, Result};

/// Translate an absolute path to an inode number. Names are compared as
/// raw bytes against the stored NUL-terminated entries.
pub fn path_lookup(ctx: &FsContext, path: &[u8]) -> Result<Ino> {
    if path.first() != Some(&b'/') {
        return Err(FsError::InvalidPath);
    }
    if path == b"/" {
        return Ok(ROOT_INO);
    }
    let name = &path[1..];
    if name.contains(&b'/') {
        // Nothing below the root directory can exist.
        return Err(FsError::NotFound);
    }

    let root = ctx.inode(ROOT_INO);
    for slot in ctx.block(root.i_direct[0]).chunks_exact(DENTRY_SIZE) {
        let entry = Dentry::from_bytes(slot);
        if !entry.is_free() && entry.name_bytes() == name {
            return Ok(entry.ino);
        }
    }
    Err(FsError::NotFound)
}

/// Final component of "/NAME" paths.
pub(crate) fn file_name(path: &[u8]) -> Result<&[u8]> {
    if path.first() != Some(&b'/') {
        return Err(FsError::InvalidPath);
    }
    let name = &path[1..];
    if name.is_empty() || name.contains(&b'/') {
        return Err(FsError::InvalidPath);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::file_name;
    use crate::util::error::FsError;

    #[test]
    fn file_name_strips_the_root_slash() {
        assert_eq!(file_name(b"/hello").unwrap(), b"hello");
    }

    #[test]
    fn file_name_rejects_non_flat_paths() {
        assert!(matches!(file_name(b"hello"), Err(FsError::InvalidPath)));
        assert!(matches!(file_name(b"/"), Err(FsError::InvalidPath)));
        assert!(matches!(file_name(b"/a/b"), Err(FsError::InvalidPath)));
    }
}
