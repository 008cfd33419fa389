//! vsfs is a very simple file system: one root directory of regular files,
//! stored in a fixed-size image that the driver maps into memory.
//!
//! Image layout, in blocks:
//! 1. Superblock
//! 2. Inode bitmap
//! 3. Data bitmap
//! 4. Inode table
//! 5. Data region (the first data block belongs to the root directory)
//!
//! `structure` holds the on-disk records and the mounted-volume context,
//! `ops` the operations the kernel bridge invokes, `mkfs` the formatter,
//! and `fuse` the bridge itself.

pub mod consts;
pub mod fuse;
pub mod image;
pub mod mkfs;
pub mod ops;
pub mod structure;
pub mod util;

pub use consts::{Blk, Ino};
pub use image::Image;
pub use ops::path::path_lookup;
pub use ops::{FileStat, SetMtime, VolumeStats};
pub use structure::FsContext;
pub use util::error::{FsError, Result};
