use std::mem::size_of;

use crate::util::error::{FsError, Result};
use crate::util::serializable::{ByteSerializable, KnownSize};

/// Fixed-size image header. `free_data_blocks` mirrors the number of `1`
/// flags in the block map at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub total_slots: u32,
    pub free_data_blocks: u32,
}

impl SuperBlock {
    pub fn new(total_slots: u32) -> SuperBlock {
        SuperBlock { total_slots, free_data_blocks: total_slots }
    }
}

impl ByteSerializable for SuperBlock {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&self.total_slots.to_le_bytes());
        buffer.extend_from_slice(&self.free_data_blocks.to_le_bytes());
        buffer
    }

    fn from_bytes(bytes: &[u8]) -> Result<SuperBlock> {
        if bytes.len() < Self::size_on_disk() {
            return Err(FsError::CorruptImage);
        }
        let total_slots = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let free_data_blocks = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if free_data_blocks > total_slots {
            return Err(FsError::CorruptImage);
        }
        Ok(SuperBlock { total_slots, free_data_blocks })
    }
}

impl KnownSize for SuperBlock {
    fn size_on_disk() -> usize {
        2 * size_of::<u32>()
    }
}
