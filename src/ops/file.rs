use log::debug;

use crate::consts::{BLOCK_SIZE, DIRECT_BLOCKS_COUNT, MAX_FILE_SIZE};
use crate::image::Image;
use crate::util::error::{FsError, Result};

impl Image {
    /// Appends `data` to the file at `path`. Overwriting and seeking do not
    /// exist; the file only ever grows.
    ///
    /// Short writes work like [`std::io::Write::write`]: when the file hits
    /// its direct-block ceiling or the image runs out of free blocks after
    /// some bytes went in, the call returns `Ok(written)` with the durable
    /// prefix length. Only a call that cannot append a single byte fails,
    /// with `CapacityExceeded` (ceiling) or `OutOfSpace` (no free block).
    pub fn writef(&mut self, path: &str, data: &[u8]) -> Result<usize> {
        let index = self.resolve(path)?;
        if !self.node(index)?.is_file() {
            return Err(FsError::NotAFile);
        }

        let mut written = 0;

        // A partially filled tail block takes bytes first.
        let size = self.node(index)?.size as usize;
        if size % BLOCK_SIZE != 0 {
            let position = size / BLOCK_SIZE;
            let block_index = self
                .node(index)?
                .blocks()
                .ok_or(FsError::CorruptImage)?
                .get(position)
                .ok_or(FsError::CorruptImage)?;
            written += self.block_mut(block_index)?.append(data);
            self.node_mut(index)?.size += written as u32;
        }

        while written < data.len() {
            let size = self.node(index)?.size as usize;
            let position = size / BLOCK_SIZE;
            if position >= DIRECT_BLOCKS_COUNT {
                return if written > 0 { Ok(written) } else { Err(FsError::CapacityExceeded) };
            }
            if self.find_free_block().is_none() {
                return if written > 0 { Ok(written) } else { Err(FsError::OutOfSpace) };
            }

            let block_index = self.allocate_block()?;
            let taken = self.block_mut(block_index)?.append(&data[written..]);
            let inode = self.node_mut(index)?;
            inode.blocks_mut().ok_or(FsError::CorruptImage)?.set(position, block_index);
            inode.size += taken as u32;
            written += taken;
        }

        debug!("writef {}: appended {} bytes", path, written);
        Ok(written)
    }

    /// Reads the whole file at `path` into a freshly allocated buffer.
    pub fn readf(&self, path: &str) -> Result<Vec<u8>> {
        let index = self.resolve(path)?;
        let inode = self.node(index)?;
        let blocks = inode.blocks().ok_or(FsError::NotAFile)?;

        let size = inode.size as usize;
        if size > MAX_FILE_SIZE {
            // a recorded size no write could have produced
            return Err(FsError::CapacityExceeded);
        }

        let mut content = Vec::with_capacity(size);
        let mut remaining = size;
        for (_, block_index) in blocks.present() {
            if remaining == 0 {
                break;
            }
            let block = self.block(block_index)?;
            let take = remaining.min(block.content().len());
            content.extend_from_slice(&block.content()[..take]);
            remaining -= take;
        }
        if remaining > 0 {
            // size outruns the blocks actually referenced
            return Err(FsError::CorruptImage);
        }
        Ok(content)
    }
}
