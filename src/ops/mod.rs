//! The operations the kernel bridge invokes. Path-keyed entry points
//! resolve against the root directory and delegate to inode-keyed workers;
//! the bridge, which is handed inode numbers by the kernel, calls the
//! workers directly.

use crate::consts::{
    Blk, Ino, BLOCK_SIZE, DENTRY_SIZE, MAX_FILE_BLOCKS, NAME_MAX, NUM_DIRECT, PATH_MAX, ROOT_INO,
};
use crate::structure::dentry::Dentry;
use crate::structure::inode::{Inode, Timespec};
use crate::structure::FsContext;
use crate::util::div_round_up;
use crate::util::error::{FsError, Result};

pub mod path;

use path::{file_name, path_lookup};

/// Volume totals reported by statfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStats {
    pub block_size: u32,
    pub num_blocks: u32,
    pub free_blocks: u32,
    pub num_inodes: u32,
    pub free_inodes: u32,
    pub name_max: u32,
}

/// Per-file attributes reported by getattr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub ino: Ino,
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
    /// st_blocks convention: 512-byte units of the logical size.
    pub blocks: u64,
    pub mtime: Timespec,
}

/// Mtime update requested through utimens.
#[derive(Debug, Clone, Copy)]
pub enum SetMtime {
    Omit,
    Now,
    Time(Timespec),
}

impl FsContext {
    /// Volume statistics. Never fails.
    pub fn statfs(&self) -> VolumeStats {
        let sb = self.superblock();
        VolumeStats {
            block_size: BLOCK_SIZE as u32,
            num_blocks: sb.num_blocks,
            free_blocks: sb.free_blocks,
            num_inodes: sb.num_inodes,
            free_inodes: sb.free_inodes,
            name_max: NAME_MAX as u32,
        }
    }

    pub fn getattr(&self, path: &[u8]) -> Result<FileStat> {
        if path.len() >= PATH_MAX || path.len() >= NAME_MAX + 1 {
            return Err(FsError::NameTooLong);
        }
        let ino = path_lookup(self, path)?;
        Ok(self.stat_inode(ino))
    }

    /// Attributes of an already-resolved inode.
    pub fn stat_inode(&self, ino: Ino) -> FileStat {
        let inode = self.inode(ino);
        FileStat {
            ino,
            mode: inode.i_mode,
            nlink: inode.i_nlink,
            size: inode.i_size,
            blocks: div_round_up(inode.i_size, 512),
            mtime: inode.i_mtime,
        }
    }

    /// Walk the root directory, passing each live entry's name and inode
    /// number to `sink`. A true return from the sink means it is full. The
    /// on-disk "." and ".." bookkeeping entries are not reported; the
    /// bridge synthesizes its own.
    pub fn readdir(&self, path: &[u8], sink: &mut dyn FnMut(&[u8], Ino) -> bool) -> Result<()> {
        let ino = path_lookup(self, path)?;
        if ino != ROOT_INO {
            return Err(FsError::NotDirectory);
        }
        let root = self.inode(ROOT_INO);
        for slot in self.block(root.i_direct[0]).chunks_exact(DENTRY_SIZE) {
            let entry = Dentry::from_bytes(slot);
            if entry.is_free() {
                continue;
            }
            let name = entry.name_bytes();
            if name == b"." || name == b".." {
                continue;
            }
            if sink(name, entry.ino) {
                return Err(FsError::OutOfMemory);
            }
        }
        Ok(())
    }

    /// Create an empty regular file as the final path component. The slot
    /// in the root directory is claimed before the inode so a full
    /// directory costs nothing to undo.
    pub fn create(&mut self, path: &[u8], mode: u32) -> Result<Ino> {
        let name = file_name(path)?;
        let mut sb = self.superblock();
        if sb.free_inodes == 0 {
            return Err(FsError::NoSpace);
        }

        let dir_blk = self.inode(ROOT_INO).i_direct[0];
        let slot = self.find_free_slot(dir_blk).ok_or(FsError::NoSpace)?;
        let entry_template = Dentry::new(0, name)?;

        let ino = self.inode_bitmap().alloc().ok_or(FsError::NoSpace)?;
        sb.free_inodes -= 1;

        let inode = Inode {
            i_mode: mode,
            i_nlink: 1,
            i_mtime: Timespec::now(),
            ..Inode::zeroed()
        };
        self.write_inode(ino, &inode);

        self.write_dentry(dir_blk, slot, &Dentry { ino, ..entry_template });
        self.touch_root();
        self.write_superblock(&sb);
        Ok(ino)
    }

    /// Remove the directory entry for `path`; when the last link goes away,
    /// release the inode, its data blocks, and the indirect block.
    pub fn unlink(&mut self, path: &[u8]) -> Result<()> {
        let name = file_name(path)?;
        let ino = path_lookup(self, path)?;
        let mut inode = self.inode(ino);
        let mut sb = self.superblock();

        inode.i_nlink -= 1;
        if inode.i_nlink == 0 {
            for n in 0..inode.i_blocks {
                let blk = self.nth_block(&inode, n);
                self.data_bitmap().free(blk);
                sb.free_blocks += 1;
            }
            if inode.i_blocks as usize > NUM_DIRECT {
                self.data_bitmap().free(inode.i_indirect);
                sb.free_blocks += 1;
            }
            self.inode_bitmap().free(ino);
            sb.free_inodes += 1;
            // Leave a canonical record so the next allocation starts clean.
            self.write_inode(ino, &Inode::zeroed());
        } else {
            self.write_inode(ino, &inode);
        }

        let dir_blk = self.inode(ROOT_INO).i_direct[0];
        if let Some(slot) = self.find_slot_by_name(dir_blk, name) {
            self.write_dentry(dir_blk, slot, &Dentry::FREE);
            self.touch_root();
        }
        self.write_superblock(&sb);
        Ok(())
    }

    pub fn truncate(&mut self, path: &[u8], new_size: u64) -> Result<()> {
        let ino = path_lookup(self, path)?;
        self.truncate_inode(ino, new_size)
    }

    /// Change a file's size. Growth zeroes every newly exposed byte and is
    /// committed only after all allocations succeed; shrinking releases the
    /// tail blocks in reverse order.
    pub fn truncate_inode(&mut self, ino: Ino, new_size: u64) -> Result<()> {
        let new_blocks = div_round_up(new_size, BLOCK_SIZE as u64) as u32;
        if new_blocks as usize > MAX_FILE_BLOCKS {
            return Err(FsError::TooLarge);
        }
        let mut inode = self.inode(ino);
        if new_size == inode.i_size {
            return Ok(());
        }

        if new_blocks > inode.i_blocks {
            self.grow(&mut inode, new_blocks)?;
        } else {
            if new_size > inode.i_size {
                // Growing within the last allocated block.
                self.zero_tail(&inode);
            }
            if new_blocks < inode.i_blocks {
                self.shrink(&mut inode, new_blocks);
            }
        }

        inode.i_size = new_size;
        inode.i_blocks = new_blocks;
        inode.i_mtime = Timespec::now();
        self.write_inode(ino, &inode);
        Ok(())
    }

    pub fn read(&self, path: &[u8], buf: &mut [u8], offset: u64) -> Result<usize> {
        let ino = path_lookup(self, path)?;
        Ok(self.read_inode_at(ino, buf, offset))
    }

    /// Copy up to `buf.len()` bytes at `offset` out of the file; 0 at or
    /// past EOF. The range must lie within one block.
    pub fn read_inode_at(&self, ino: Ino, buf: &mut [u8], offset: u64) -> usize {
        let inode = self.inode(ino);
        if offset >= inode.i_size {
            return 0;
        }
        let n = buf.len().min((inode.i_size - offset) as usize);
        buf[..n].copy_from_slice(self.file_bytes(&inode, offset, n));
        n
    }

    pub fn write(&mut self, path: &[u8], buf: &[u8], offset: u64) -> Result<usize> {
        let ino = path_lookup(self, path)?;
        self.write_inode_at(ino, buf, offset)
    }

    /// Copy `buf` into the file at `offset`, extending it through the
    /// truncate path when it grows. Writes beyond EOF are rejected; the
    /// bridge pre-extends instead of punching holes. The range must lie
    /// within one block.
    pub fn write_inode_at(&mut self, ino: Ino, buf: &[u8], offset: u64) -> Result<usize> {
        let mut inode = self.inode(ino);
        if offset > inode.i_size {
            return Err(FsError::TooLarge);
        }
        if buf.is_empty() {
            // Nothing to address, but the write still counts.
            inode.i_mtime = Timespec::now();
            self.write_inode(ino, &inode);
            return Ok(0);
        }
        let end = offset + buf.len() as u64;
        if end > inode.i_size {
            self.truncate_inode(ino, end)?;
            inode = self.inode(ino);
        }
        self.file_bytes_mut(&inode, offset, buf.len()).copy_from_slice(buf);
        inode.i_mtime = Timespec::now();
        self.write_inode(ino, &inode);
        Ok(buf.len())
    }

    pub fn utimens(&mut self, path: &[u8], mtime: SetMtime) -> Result<()> {
        let ino = path_lookup(self, path)?;
        self.set_mtime_inode(ino, mtime);
        Ok(())
    }

    pub fn set_mtime_inode(&mut self, ino: Ino, mtime: SetMtime) {
        let t = match mtime {
            SetMtime::Omit => return,
            SetMtime::Now => Timespec::now(),
            SetMtime::Time(t) => t,
        };
        let mut inode = self.inode(ino);
        inode.i_mtime = t;
        self.write_inode(ino, &inode);
    }

    fn grow(&mut self, inode: &mut Inode, new_blocks: u32) -> Result<()> {
        if inode.i_blocks > 0 {
            self.zero_tail(inode);
        }

        let mut allocated: Vec<Blk> = Vec::new();
        let mut indirect: Option<Blk> = None;
        for n in inode.i_blocks..new_blocks {
            if n as usize == NUM_DIRECT {
                // First block past the direct pointers; the indirect block
                // comes into existence here.
                match self.data_bitmap().alloc() {
                    Some(blk) => {
                        self.zero_block(blk);
                        inode.i_indirect = blk;
                        indirect = Some(blk);
                    }
                    None => {
                        self.undo_alloc(inode, &allocated, indirect);
                        return Err(FsError::NoSpace);
                    }
                }
            }
            match self.data_bitmap().alloc() {
                Some(blk) => {
                    self.zero_block(blk);
                    self.set_nth_block(inode, n, blk);
                    allocated.push(blk);
                }
                None => {
                    self.undo_alloc(inode, &allocated, indirect);
                    return Err(FsError::NoSpace);
                }
            }
        }

        let mut sb = self.superblock();
        sb.free_blocks -= allocated.len() as u32 + indirect.is_some() as u32;
        self.write_superblock(&sb);
        Ok(())
    }

    /// Return every block claimed by a failed grow to the free map, newest
    /// first, so the free counters never observe the partial allocation.
    fn undo_alloc(&mut self, inode: &mut Inode, allocated: &[Blk], indirect: Option<Blk>) {
        for &blk in allocated.iter().rev() {
            self.data_bitmap().free(blk);
        }
        if let Some(blk) = indirect {
            self.data_bitmap().free(blk);
            inode.i_indirect = 0;
        }
    }

    fn shrink(&mut self, inode: &mut Inode, new_blocks: u32) {
        let mut sb = self.superblock();
        for n in (new_blocks..inode.i_blocks).rev() {
            let blk = self.nth_block(inode, n);
            self.data_bitmap().free(blk);
            self.set_nth_block(inode, n, 0);
            sb.free_blocks += 1;
        }
        if inode.i_blocks as usize > NUM_DIRECT && new_blocks as usize <= NUM_DIRECT {
            self.data_bitmap().free(inode.i_indirect);
            inode.i_indirect = 0;
            sb.free_blocks += 1;
        }
        self.write_superblock(&sb);
    }

    /// Zero the bytes of the last allocated block at or past EOF so a later
    /// extension exposes zeros.
    fn zero_tail(&mut self, inode: &Inode) {
        if inode.i_blocks == 0 {
            return;
        }
        let rem = (inode.i_size % BLOCK_SIZE as u64) as usize;
        if rem == 0 {
            return;
        }
        self.file_bytes_mut(inode, inode.i_size, BLOCK_SIZE - rem).fill(0);
    }

    fn find_free_slot(&self, dir_blk: Blk) -> Option<usize> {
        self.block(dir_blk)
            .chunks_exact(DENTRY_SIZE)
            .position(|slot| Dentry::from_bytes(slot).is_free())
    }

    fn find_slot_by_name(&self, dir_blk: Blk, name: &[u8]) -> Option<usize> {
        self.block(dir_blk).chunks_exact(DENTRY_SIZE).position(|slot| {
            let entry = Dentry::from_bytes(slot);
            !entry.is_free() && entry.name_bytes() == name
        })
    }

    fn write_dentry(&mut self, dir_blk: Blk, slot: usize, entry: &Dentry) {
        let offset = slot * DENTRY_SIZE;
        self.block_mut(dir_blk)[offset..offset + DENTRY_SIZE].copy_from_slice(&entry.to_bytes());
    }

    fn touch_root(&mut self) {
        let mut root = self.inode(ROOT_INO);
        root.i_mtime = Timespec::now();
        self.write_inode(ROOT_INO, &root);
    }
}
