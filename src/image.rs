use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};

use crate::blockmap::BlockMap;
use crate::consts::{SlotIndex, ROOT_NAME};
use crate::datablock::DataBlock;
use crate::inode::{Inode, InodeKind};
use crate::superblock::SuperBlock;
use crate::util::error::{FsError, Result};
use crate::util::serializable::{ByteSerializable, KnownSize};

/// The whole filesystem image, held in memory. The backing file stores the
/// four sections in fixed order: superblock, free-block map, inode table,
/// data blocks. Every array is sized by the one `capacity` given at
/// creation; inode slots and data-block slots share the numbering space but
/// are allocated independently.
pub struct Image {
    superblock: SuperBlock,
    blockmap: BlockMap,
    inodes: Vec<Inode>,
    blocks: Vec<DataBlock>,
    root_node: SlotIndex,
}

impl Image {
    /// Builds a fresh image with `capacity` slots, installs the root
    /// directory in inode slot 0 and writes the image to `path`.
    pub fn create<P: AsRef<Path>>(path: P, capacity: u32) -> Result<Image> {
        if capacity == 0 {
            // not even the root would fit
            return Err(FsError::CapacityExceeded);
        }

        let mut inodes = vec![Inode::free(); capacity as usize];
        inodes[0] = Inode::directory(ROOT_NAME, None);

        let image = Image {
            superblock: SuperBlock::new(capacity),
            blockmap: BlockMap::new(capacity),
            inodes,
            blocks: vec![DataBlock::new(); capacity as usize],
            root_node: 0,
        };
        image.dump(&path)?;
        info!("created image at {} with {} slots", path.as_ref().display(), capacity);
        Ok(image)
    }

    /// Reads an image back from `path` and validates it. A file we cannot
    /// read completely is an `Io` error; sections that could not have been
    /// written by [`Image::dump`] are `CorruptImage`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Image> {
        let mut reader = BufReader::new(File::open(&path)?);

        let mut superblock_bytes = vec![0u8; SuperBlock::size_on_disk()];
        reader.read_exact(&mut superblock_bytes)?;
        let superblock = SuperBlock::from_bytes(&superblock_bytes)?;
        let total = superblock.total_slots as usize;

        let mut flags = vec![0u8; total];
        reader.read_exact(&mut flags)?;
        let blockmap = BlockMap::from_flags(flags)?;

        let mut inodes = Vec::with_capacity(total);
        let mut record = vec![0u8; Inode::size_on_disk()];
        for _ in 0..total {
            reader.read_exact(&mut record)?;
            inodes.push(Inode::from_bytes(&record)?);
        }

        let mut blocks = Vec::with_capacity(total);
        let mut record = vec![0u8; DataBlock::size_on_disk()];
        for _ in 0..total {
            reader.read_exact(&mut record)?;
            blocks.push(DataBlock::from_bytes(&record)?);
        }

        let root_node = validate(&superblock, &blockmap, &inodes)?;

        info!(
            "loaded image from {}: {} slots, {} free blocks",
            path.as_ref().display(),
            superblock.total_slots,
            superblock.free_data_blocks
        );
        Ok(Image { superblock, blockmap, inodes, blocks, root_node })
    }

    /// Serializes the image to `path`, truncating whatever was there. A
    /// failure partway through leaves an inconsistent file behind; there is
    /// no recovery for that here.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&path)?);

        writer.write_all(&self.superblock.to_bytes())?;
        writer.write_all(self.blockmap.as_flags())?;
        for inode in &self.inodes {
            writer.write_all(&inode.to_bytes())?;
        }
        for block in &self.blocks {
            writer.write_all(&block.to_bytes())?;
        }
        writer.flush()?;

        debug!("dumped image to {}", path.as_ref().display());
        Ok(())
    }

    pub fn capacity(&self) -> u32 {
        self.superblock.total_slots
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn root_node(&self) -> SlotIndex {
        self.root_node
    }

    /// Read access to an inode slot, e.g. for callers inspecting what a
    /// resolved index points at.
    pub fn inode(&self, index: SlotIndex) -> Option<&Inode> {
        self.inodes.get(index as usize)
    }

    /// First unallocated inode slot, lowest index wins.
    pub fn find_free_inode(&self) -> Option<SlotIndex> {
        self.inodes
            .iter()
            .position(|inode| inode.is_free())
            .map(|index| index as SlotIndex)
    }

    /// First free data-block slot, lowest index wins.
    pub fn find_free_block(&self) -> Option<SlotIndex> {
        self.blockmap.find_free()
    }

    pub(crate) fn node(&self, index: SlotIndex) -> Result<&Inode> {
        self.inodes.get(index as usize).ok_or(FsError::CorruptImage)
    }

    pub(crate) fn node_mut(&mut self, index: SlotIndex) -> Result<&mut Inode> {
        self.inodes.get_mut(index as usize).ok_or(FsError::CorruptImage)
    }

    pub(crate) fn block(&self, index: SlotIndex) -> Result<&DataBlock> {
        self.blocks.get(index as usize).ok_or(FsError::CorruptImage)
    }

    pub(crate) fn block_mut(&mut self, index: SlotIndex) -> Result<&mut DataBlock> {
        self.blocks.get_mut(index as usize).ok_or(FsError::CorruptImage)
    }

    /// Takes the lowest free data block out of the free map. Keeps the
    /// superblock's free count in step with the map.
    pub(crate) fn allocate_block(&mut self) -> Result<SlotIndex> {
        let index = self.blockmap.find_free().ok_or(FsError::OutOfSpace)?;
        self.blockmap.mark_used(index);
        self.superblock.free_data_blocks -= 1;
        debug!("allocated data block {}", index);
        Ok(index)
    }

    /// Returns a data block to the free map, zeroing its content.
    pub(crate) fn release_block(&mut self, index: SlotIndex) -> Result<()> {
        self.block_mut(index)?.clear();
        self.blockmap.mark_free(index);
        self.superblock.free_data_blocks += 1;
        debug!("released data block {}", index);
        Ok(())
    }
}

/// Structural checks on a freshly read image. Returns the root slot.
fn validate(superblock: &SuperBlock, blockmap: &BlockMap, inodes: &[Inode]) -> Result<SlotIndex> {
    if superblock.free_data_blocks != blockmap.count_free() {
        return Err(FsError::CorruptImage);
    }

    let total = superblock.total_slots;
    let in_range = |index: SlotIndex| index < total;

    let mut root = None;
    for (index, inode) in inodes.iter().enumerate() {
        if inode.is_free() {
            continue;
        }
        if inode.name.is_empty() {
            return Err(FsError::CorruptImage);
        }
        if let Some(parent) = inode.parent {
            if !in_range(parent) {
                return Err(FsError::CorruptImage);
            }
        }
        let slots = inode.children().or_else(|| inode.blocks());
        if let Some(slots) = slots {
            if slots.present().any(|(_, reference)| !in_range(reference)) {
                return Err(FsError::CorruptImage);
            }
        }
        if matches!(inode.kind, InodeKind::Directory { .. })
            && inode.name == ROOT_NAME
            && inode.parent.is_none()
        {
            if root.replace(index as SlotIndex).is_some() {
                return Err(FsError::CorruptImage);
            }
        }
    }

    root.ok_or(FsError::CorruptImage)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Image;

    /// Creates a scratch image under `./test-images/`. Each test uses its
    /// own file name so runs do not step on each other.
    pub(crate) fn test_image(name: &str, capacity: u32) -> Image {
        std::fs::create_dir_all("./test-images").unwrap();
        Image::create(format!("./test-images/{}", name), capacity).unwrap()
    }

    pub(crate) fn test_path(name: &str) -> String {
        std::fs::create_dir_all("./test-images").unwrap();
        format!("./test-images/{}", name)
    }
}
