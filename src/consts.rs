pub const BLOCK_SIZE: usize = 1024;
pub const DIRECT_BLOCKS_COUNT: usize = 12;
pub const NAME_MAX_LENGTH: usize = 32;

pub const ROOT_NAME: &str = "/";

/// Index into the inode table or the data-block array. Which one is meant
/// follows from the inode kind holding the reference.
pub type SlotIndex = u32;

/// Largest byte count a single file can hold.
pub const MAX_FILE_SIZE: usize = DIRECT_BLOCKS_COUNT * BLOCK_SIZE;
