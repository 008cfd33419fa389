//! Shared fixtures: scratch image files in the system temp directory,
//! formatted and mounted through the public API.
#![allow(unused)]

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use vsfs::consts::BLOCK_SIZE;
use vsfs::mkfs::{self, FormatOpts};
use vsfs::{FsContext, Image};

/// A pre-sized scratch image, deleted on drop.
pub struct TestImage {
    pub path: PathBuf,
}

impl TestImage {
    pub fn new(name: &str, blocks: u64) -> TestImage {
        let path = std::env::temp_dir().join(format!(
            "vsfs-test-{}-{}.img",
            std::process::id(),
            name
        ));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        file.set_len(blocks * BLOCK_SIZE as u64).unwrap();
        TestImage { path }
    }

    /// Format with zeroed contents so byte-level comparisons start clean.
    pub fn format(&self, num_inodes: u32) {
        let mut image = Image::open(&self.path).unwrap();
        mkfs::format(
            &mut image,
            &FormatOpts {
                num_inodes,
                force: true,
                zero: true,
            },
        )
        .unwrap();
    }

    pub fn mount(&self) -> FsContext {
        FsContext::new(Image::open(&self.path).unwrap()).unwrap()
    }

    pub fn bytes(&self) -> Vec<u8> {
        fs::read(&self.path).unwrap()
    }
}

impl Drop for TestImage {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Allocated bits of an on-disk bitmap block, counted straight from the
/// image file.
pub fn bitmap_popcount(path: &Path, blk: u32, nbits: u32) -> u32 {
    let bytes = fs::read(path).unwrap();
    let start = blk as usize * BLOCK_SIZE;
    (0..nbits)
        .filter(|&i| bytes[start + (i / 8) as usize] & (1 << (i % 8)) != 0)
        .count() as u32
}
