//! jarfs is a small inode filesystem living entirely inside one host file.
//!
//! The image's linear layout, in fixed order:
//! - Superblock (capacity and free-block count)
//! - Free-block map (one byte flag per data-block slot)
//! - Inode table
//! - Data blocks
//!
//! The whole image is loaded into memory once, mutated in place through the
//! path-based operations on [`Image`], and written back wholesale with
//! [`Image::dump`]. A single configured capacity sizes every array; there
//! is no indirect addressing, so a directory holds at most
//! [`DIRECT_BLOCKS_COUNT`] children and a file at most [`MAX_FILE_SIZE`]
//! bytes. Access is single-writer by design: callers exposing an image to
//! several threads must serialize whole operations externally.

mod blockmap;
mod consts;
mod datablock;
mod image;
mod inode;
mod ops;
mod path;
mod superblock;
mod util;

pub use consts::{SlotIndex, BLOCK_SIZE, DIRECT_BLOCKS_COUNT, MAX_FILE_SIZE, NAME_MAX_LENGTH, ROOT_NAME};
pub use datablock::DataBlock;
pub use image::Image;
pub use inode::{DirectSlots, Inode, InodeKind};
pub use path::last_component;
pub use superblock::SuperBlock;
pub use util::error::{FsError, Result};
pub use util::serializable::{ByteSerializable, KnownSize};
