use std::mem::size_of;

use crate::consts::{SlotIndex, DIRECT_BLOCKS_COUNT, NAME_MAX_LENGTH};
use crate::util::error::{FsError, Result};
use crate::util::serializable::{ByteSerializable, KnownSize};

const KIND_FREE: u8 = 0;
const KIND_DIRECTORY: u8 = 1;
const KIND_FILE: u8 = 2;

/// On disk every slot reference is an `i32` with `-1` standing for "empty".
const EMPTY_SLOT: i32 = -1;

/// Fixed-size array of direct references. For a directory the entries are
/// inode indices (children), for a regular file they are data-block indices
/// (content). The enclosing [`InodeKind`] tells which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectSlots {
    entries: [Option<SlotIndex>; DIRECT_BLOCKS_COUNT],
}

impl DirectSlots {
    pub fn new() -> DirectSlots {
        DirectSlots { entries: [None; DIRECT_BLOCKS_COUNT] }
    }

    pub fn get(&self, position: usize) -> Option<SlotIndex> {
        self.entries[position]
    }

    pub fn set(&mut self, position: usize, index: SlotIndex) {
        self.entries[position] = Some(index);
    }

    pub fn clear_at(&mut self, position: usize) {
        self.entries[position] = None;
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.entries.iter().position(|entry| entry.is_none())
    }

    /// Position holding `index`, if any. Used to detach a child from its
    /// parent without scanning callers' own copies.
    pub fn position_of(&self, index: SlotIndex) -> Option<usize> {
        self.entries.iter().position(|entry| *entry == Some(index))
    }

    /// Present entries in slot order, with their positions.
    pub fn present(&self) -> impl Iterator<Item = (usize, SlotIndex)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| entry.map(|index| (position, index)))
    }

    pub fn count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    fn to_disk(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(DIRECT_BLOCKS_COUNT * size_of::<i32>());
        for entry in &self.entries {
            let raw = match entry {
                Some(index) => *index as i32,
                None => EMPTY_SLOT,
            };
            bytes.extend_from_slice(&raw.to_le_bytes());
        }
        bytes
    }

    fn from_disk(bytes: &[u8]) -> Result<DirectSlots> {
        let mut slots = DirectSlots::new();
        for position in 0..DIRECT_BLOCKS_COUNT {
            let offset = position * size_of::<i32>();
            let raw = i32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
            match raw {
                EMPTY_SLOT => {}
                index if index >= 0 => slots.set(position, index as SlotIndex),
                _ => return Err(FsError::CorruptImage),
            }
        }
        Ok(slots)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InodeKind {
    Free,
    Directory { children: DirectSlots },
    RegularFile { blocks: DirectSlots },
}

/// One inode-table record. An unallocated slot is `kind == Free` with an
/// empty name and no parent; only the root has an empty `parent` while
/// allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub name: String,
    pub size: u32,
    pub parent: Option<SlotIndex>,
    pub kind: InodeKind,
}

impl Inode {
    pub fn free() -> Inode {
        Inode { name: String::new(), size: 0, parent: None, kind: InodeKind::Free }
    }

    pub fn directory(name: &str, parent: Option<SlotIndex>) -> Inode {
        Inode {
            name: name.to_string(),
            size: 0,
            parent,
            kind: InodeKind::Directory { children: DirectSlots::new() },
        }
    }

    pub fn file(name: &str, parent: SlotIndex) -> Inode {
        Inode {
            name: name.to_string(),
            size: 0,
            parent: Some(parent),
            kind: InodeKind::RegularFile { blocks: DirectSlots::new() },
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.kind, InodeKind::Free)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, InodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, InodeKind::RegularFile { .. })
    }

    pub fn children(&self) -> Option<&DirectSlots> {
        match &self.kind {
            InodeKind::Directory { children } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut DirectSlots> {
        match &mut self.kind {
            InodeKind::Directory { children } => Some(children),
            _ => None,
        }
    }

    pub fn blocks(&self) -> Option<&DirectSlots> {
        match &self.kind {
            InodeKind::RegularFile { blocks } => Some(blocks),
            _ => None,
        }
    }

    pub fn blocks_mut(&mut self) -> Option<&mut DirectSlots> {
        match &mut self.kind {
            InodeKind::RegularFile { blocks } => Some(blocks),
            _ => None,
        }
    }

    /// Returns the slot back to the unallocated state.
    pub fn reset(&mut self) {
        *self = Inode::free();
    }

    fn slots_for_disk(&self) -> Vec<u8> {
        match &self.kind {
            InodeKind::Free => DirectSlots::new().to_disk(),
            InodeKind::Directory { children } => children.to_disk(),
            InodeKind::RegularFile { blocks } => blocks.to_disk(),
        }
    }
}

impl ByteSerializable for Inode {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::size_on_disk());
        let tag = match self.kind {
            InodeKind::Free => KIND_FREE,
            InodeKind::Directory { .. } => KIND_DIRECTORY,
            InodeKind::RegularFile { .. } => KIND_FILE,
        };
        bytes.push(tag);

        let mut name = [0u8; NAME_MAX_LENGTH];
        name[..self.name.len()].copy_from_slice(self.name.as_bytes());
        bytes.extend_from_slice(&name);

        bytes.extend_from_slice(&self.size.to_le_bytes());
        bytes.extend_from_slice(&self.slots_for_disk());

        let parent = match self.parent {
            Some(index) => index as i32,
            None => EMPTY_SLOT,
        };
        bytes.extend_from_slice(&parent.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Inode> {
        if bytes.len() < Self::size_on_disk() {
            return Err(FsError::CorruptImage);
        }

        let tag = bytes[0];
        let name_bytes = &bytes[1..1 + NAME_MAX_LENGTH];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(NAME_MAX_LENGTH);
        let name = std::str::from_utf8(&name_bytes[..name_end])
            .map_err(|_| FsError::CorruptImage)?
            .to_string();

        let mut offset = 1 + NAME_MAX_LENGTH;
        let size = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += size_of::<u32>();

        let slots = DirectSlots::from_disk(&bytes[offset..])?;
        offset += DIRECT_BLOCKS_COUNT * size_of::<i32>();

        let raw_parent = i32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        let parent = match raw_parent {
            EMPTY_SLOT => None,
            index if index >= 0 => Some(index as SlotIndex),
            _ => return Err(FsError::CorruptImage),
        };

        match tag {
            KIND_FREE => Ok(Inode::free()),
            KIND_DIRECTORY => {
                Ok(Inode { name, size, parent, kind: InodeKind::Directory { children: slots } })
            }
            KIND_FILE => {
                Ok(Inode { name, size, parent, kind: InodeKind::RegularFile { blocks: slots } })
            }
            _ => Err(FsError::CorruptImage),
        }
    }
}

impl KnownSize for Inode {
    fn size_on_disk() -> usize {
        // kind tag + padded name + size + direct slots + parent
        1 + NAME_MAX_LENGTH
            + size_of::<u32>()
            + DIRECT_BLOCKS_COUNT * size_of::<i32>()
            + size_of::<i32>()
    }
}
