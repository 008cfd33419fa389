//! The mapped disk image. Callers supply a pre-sized image file; the mapper
//! checks that it is a whole number of blocks and exposes it as one
//! contiguous byte region. Dirty pages reach the backing file through the
//! page cache, at the latest when the mapping is dropped.

use std::fs::OpenOptions;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use memmap2::MmapMut;

use crate::consts::BLOCK_SIZE;
use crate::util::error::{FsError, Result};

pub struct Image {
    map: MmapMut,
    size: u64,
}

impl Image {
    pub fn open(path: &Path) -> Result<Image> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let size = file.metadata()?.len();
        if size == 0 || size % BLOCK_SIZE as u64 != 0 {
            return Err(FsError::UnalignedImage);
        }
        // Safety: the file is not truncated or remapped while the mapping
        // is alive; formatter and driver never run against the same image.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Image { map, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn num_blocks(&self) -> u64 {
        self.size / BLOCK_SIZE as u64
    }

    /// Push dirty pages to the backing file now instead of at unmap.
    pub fn flush(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}

impl Deref for Image {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.map
    }
}

impl DerefMut for Image {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, OpenOptions};

    use super::*;

    fn scratch_file(name: &str, len: u64) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("vsfs-image-{}-{}", std::process::id(), name));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        file.set_len(len).unwrap();
        path
    }

    #[test]
    fn open_maps_whole_blocks() {
        let path = scratch_file("whole.img", 16 * BLOCK_SIZE as u64);
        let image = Image::open(&path).unwrap();
        assert_eq!(image.num_blocks(), 16);
        assert_eq!(image.len(), 16 * BLOCK_SIZE);
        drop(image);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_rejects_partial_blocks() {
        let path = scratch_file("partial.img", BLOCK_SIZE as u64 + 7);
        assert!(matches!(Image::open(&path), Err(FsError::UnalignedImage)));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn writes_reach_the_file() {
        let path = scratch_file("rw.img", 4 * BLOCK_SIZE as u64);
        {
            let mut image = Image::open(&path).unwrap();
            image[BLOCK_SIZE] = 0x42;
            image.flush().unwrap();
        }
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes[BLOCK_SIZE], 0x42);
        fs::remove_file(&path).unwrap();
    }
}
