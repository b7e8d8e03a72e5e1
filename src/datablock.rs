use std::mem::size_of;

use crate::consts::BLOCK_SIZE;
use crate::util::error::{FsError, Result};
use crate::util::serializable::{ByteSerializable, KnownSize};

/// One slot of the data-block array: a fixed-capacity buffer plus the
/// number of bytes currently holding file content.
#[derive(Clone)]
pub struct DataBlock {
    pub used: u32,
    pub bytes: [u8; BLOCK_SIZE],
}

impl DataBlock {
    pub fn new() -> DataBlock {
        DataBlock { used: 0, bytes: [0; BLOCK_SIZE] }
    }

    pub fn remaining(&self) -> usize {
        BLOCK_SIZE - self.used as usize
    }

    pub fn content(&self) -> &[u8] {
        &self.bytes[..self.used as usize]
    }

    /// Appends as much of `data` as fits and returns the count taken.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let take = data.len().min(self.remaining());
        let offset = self.used as usize;
        self.bytes[offset..offset + take].copy_from_slice(&data[..take]);
        self.used += take as u32;
        take
    }

    pub fn clear(&mut self) {
        self.used = 0;
        self.bytes = [0; BLOCK_SIZE];
    }
}

impl Default for DataBlock {
    fn default() -> DataBlock {
        DataBlock::new()
    }
}

impl ByteSerializable for DataBlock {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::size_on_disk());
        buffer.extend_from_slice(&self.used.to_le_bytes());
        buffer.extend_from_slice(&self.bytes);
        buffer
    }

    fn from_bytes(bytes: &[u8]) -> Result<DataBlock> {
        if bytes.len() < Self::size_on_disk() {
            return Err(FsError::CorruptImage);
        }
        let used = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if used as usize > BLOCK_SIZE {
            return Err(FsError::CorruptImage);
        }
        let mut block = DataBlock::new();
        block.used = used;
        block.bytes.copy_from_slice(&bytes[4..4 + BLOCK_SIZE]);
        Ok(block)
    }
}

impl KnownSize for DataBlock {
    fn size_on_disk() -> usize {
        size_of::<u32>() + BLOCK_SIZE
    }
}
