//! The kernel bridge: adapts fuser's inode-numbered callbacks to the core.
//! Transfers of arbitrary ranges are split at block boundaries here, so the
//! core only ever sees single-block reads and writes.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use libc::c_int;
use log::debug;

use crate::consts::{Ino, BLOCK_SIZE, ROOT_INO};
use crate::ops::{FileStat, SetMtime};
use crate::structure::inode::Timespec;
use crate::structure::FsContext;

/// Attribute cache lifetime handed to the kernel.
const TTL: Duration = Duration::from_secs(1);

pub struct VsfsFuse {
    ctx: FsContext,
    uid: u32,
    gid: u32,
}

impl VsfsFuse {
    pub fn new(ctx: FsContext) -> VsfsFuse {
        VsfsFuse { ctx, uid: 0, gid: 0 }
    }

    /// FUSE numbers the root 1; on disk it is inode 0.
    fn fuse_ino(ino: Ino) -> u64 {
        ino as u64 + 1
    }

    fn live_ino(&self, fuse_ino: u64) -> Result<Ino, c_int> {
        if fuse_ino == 0 {
            return Err(libc::EINVAL);
        }
        let ino = (fuse_ino - 1) as Ino;
        if !self.ctx.inode_in_use(ino) {
            return Err(libc::ENOENT);
        }
        Ok(ino)
    }

    fn attr_of(&self, stat: &FileStat) -> FileAttr {
        let mtime = stat.mtime.to_system_time();
        let kind = if stat.mode & libc::S_IFMT == libc::S_IFDIR {
            FileType::Directory
        } else {
            FileType::RegularFile
        };
        FileAttr {
            ino: Self::fuse_ino(stat.ino),
            size: stat.size,
            blocks: stat.blocks,
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: mtime,
            kind,
            perm: (stat.mode & 0o7777) as u16,
            nlink: stat.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE as u32,
            flags: 0,
        }
    }

    fn path_of(name: &OsStr) -> Vec<u8> {
        let mut path = Vec::with_capacity(name.len() + 1);
        path.push(b'/');
        path.extend_from_slice(name.as_bytes());
        path
    }
}

impl Filesystem for VsfsFuse {
    fn init(&mut self, req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        self.uid = req.uid();
        self.gid = req.gid();
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("lookup({:?})", name);
        if parent != Self::fuse_ino(ROOT_INO) {
            reply.error(libc::ENOENT);
            return;
        }
        match self.ctx.getattr(&Self::path_of(name)) {
            Ok(stat) => reply.entry(&TTL, &self.attr_of(&stat), 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.live_ino(ino) {
            Ok(ino) => reply.attr(&TTL, &self.attr_of(&self.ctx.stat_inode(ino))),
            Err(errno) => reply.error(errno),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let ino = match self.live_ino(ino) {
            Ok(ino) => ino,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };
        if let Some(size) = size {
            debug!("truncate(ino {}, {} bytes)", ino, size);
            if let Err(err) = self.ctx.truncate_inode(ino, size) {
                reply.error(err.errno());
                return;
            }
        }
        let set = match mtime {
            None => SetMtime::Omit,
            Some(TimeOrNow::Now) => SetMtime::Now,
            Some(TimeOrNow::SpecificTime(t)) => SetMtime::Time(Timespec::from_system_time(t)),
        };
        self.ctx.set_mtime_inode(ino, set);
        reply.attr(&TTL, &self.attr_of(&self.ctx.stat_inode(ino)));
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if ino != Self::fuse_ino(ROOT_INO) {
            reply.error(libc::ENOTDIR);
            return;
        }
        let root = Self::fuse_ino(ROOT_INO);
        let mut entries: Vec<(u64, Vec<u8>)> =
            vec![(root, b".".to_vec()), (root, b"..".to_vec())];
        let listed = self.ctx.readdir(b"/", &mut |name, ino| {
            entries.push((Self::fuse_ino(ino), name.to_vec()));
            false
        });
        if let Err(err) = listed {
            reply.error(err.errno());
            return;
        }
        for (i, (ino, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            let kind = if i < 2 {
                FileType::Directory
            } else {
                FileType::RegularFile
            };
            if reply.add(ino, (i + 1) as i64, kind, OsStr::from_bytes(&name)) {
                break;
            }
        }
        reply.ok();
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        debug!("create({:?})", name);
        if parent != Self::fuse_ino(ROOT_INO) {
            reply.error(libc::ENOENT);
            return;
        }
        let path = Self::path_of(name);
        if self.ctx.getattr(&path).is_ok() {
            reply.error(libc::EEXIST);
            return;
        }
        let mode = libc::S_IFREG | (mode & 0o7777);
        match self.ctx.create(&path, mode) {
            Ok(ino) => {
                let attr = self.attr_of(&self.ctx.stat_inode(ino));
                reply.created(&TTL, &attr, 0, 0, 0);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("unlink({:?})", name);
        if parent != Self::fuse_ino(ROOT_INO) {
            reply.error(libc::ENOENT);
            return;
        }
        match self.ctx.unlink(&Self::path_of(name)) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let ino = match self.live_ino(ino) {
            Ok(ino) => ino,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }

        let mut buf = vec![0u8; size as usize];
        let mut done = 0usize;
        let mut pos = offset as u64;
        while done < buf.len() {
            let in_block = BLOCK_SIZE - (pos as usize % BLOCK_SIZE);
            let want = (buf.len() - done).min(in_block);
            let n = self.ctx.read_inode_at(ino, &mut buf[done..done + want], pos);
            done += n;
            pos += n as u64;
            if n < want {
                break; // EOF
            }
        }
        reply.data(&buf[..done]);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let ino = match self.live_ino(ino) {
            Ok(ino) => ino,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }

        let mut done = 0usize;
        let mut pos = offset as u64;
        while done < data.len() {
            let in_block = BLOCK_SIZE - (pos as usize % BLOCK_SIZE);
            let want = (data.len() - done).min(in_block);
            match self.ctx.write_inode_at(ino, &data[done..done + want], pos) {
                Ok(n) => {
                    done += n;
                    pos += n as u64;
                }
                Err(err) if done == 0 => {
                    reply.error(err.errno());
                    return;
                }
                Err(_) => break,
            }
        }
        reply.written(done as u32);
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let st = self.ctx.statfs();
        reply.statfs(
            st.num_blocks as u64,
            st.free_blocks as u64,
            st.free_blocks as u64,
            st.num_inodes as u64,
            st.free_inodes as u64,
            st.block_size,
            st.name_max,
            st.block_size,
        );
    }
}
