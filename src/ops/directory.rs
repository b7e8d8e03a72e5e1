use log::debug;

use crate::consts::SlotIndex;
use crate::image::Image;
use crate::inode::{Inode, InodeKind};
use crate::path::{last_component, validate_name};
use crate::util::error::{FsError, Result};

impl Image {
    /// Creates a new directory at `path`.
    pub fn mkdir(&mut self, path: &str) -> Result<SlotIndex> {
        let index = self.create_entry(path, true)?;
        debug!("mkdir {} -> inode {}", path, index);
        Ok(index)
    }

    /// Creates a new empty file at `path`. No data blocks are allocated
    /// until something is written.
    pub fn mkfile(&mut self, path: &str) -> Result<SlotIndex> {
        let index = self.create_entry(path, false)?;
        debug!("mkfile {} -> inode {}", path, index);
        Ok(index)
    }

    fn create_entry(&mut self, path: &str, directory: bool) -> Result<SlotIndex> {
        let parent_index = self.resolve_parent(path)?;
        let name = last_component(path)?;
        validate_name(name)?;

        if self.find_child(parent_index, name)?.is_some() {
            return Err(FsError::NameCollision);
        }

        // Pick the parent slot before touching the inode table, so a full
        // parent never leaves a half-allocated inode behind.
        let position = self
            .node(parent_index)?
            .children()
            .ok_or(FsError::CorruptImage)?
            .first_empty()
            .ok_or(FsError::CapacityExceeded)?;
        let child_index = self.find_free_inode().ok_or(FsError::CapacityExceeded)?;

        *self.node_mut(child_index)? = if directory {
            Inode::directory(name, Some(parent_index))
        } else {
            Inode::file(name, parent_index)
        };
        self.node_mut(parent_index)?
            .children_mut()
            .ok_or(FsError::CorruptImage)?
            .set(position, child_index);

        Ok(child_index)
    }

    /// Directory listing, one line per child, ordered by ascending inode
    /// slot index. Directories show as `DIR <name>`, files as `FIL <name>`.
    /// The returned buffer is owned by the caller.
    pub fn list(&self, path: &str) -> Result<String> {
        let index = self.resolve(path)?;
        let children = self
            .node(index)?
            .children()
            .ok_or(FsError::NotADirectory)?;

        let mut child_indices: Vec<SlotIndex> = children.present().map(|(_, child)| child).collect();
        child_indices.sort_unstable();

        let mut listing = String::new();
        for child_index in child_indices {
            let child = self.node(child_index)?;
            let label = match child.kind {
                InodeKind::Directory { .. } => "DIR",
                InodeKind::RegularFile { .. } => "FIL",
                InodeKind::Free => return Err(FsError::CorruptImage),
            };
            listing.push_str(label);
            listing.push(' ');
            listing.push_str(&child.name);
            listing.push('\n');
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::NAME_MAX_LENGTH;
    use crate::image::testing::test_image;

    #[test]
    fn test_mkdir_and_mkfile() {
        let mut image = test_image("dir_mk.img", 16);
        let docs = image.mkdir("/docs").unwrap();
        assert!(image.inode(docs).unwrap().is_directory());
        assert_eq!(image.inode(docs).unwrap().parent, Some(image.root_node()));

        let file = image.mkfile("/docs/a.txt").unwrap();
        let inode = image.inode(file).unwrap();
        assert!(inode.is_file());
        assert_eq!(inode.size, 0);
        assert_eq!(inode.blocks().unwrap().count(), 0);
        assert_eq!(inode.parent, Some(docs));
    }

    #[test]
    fn duplicate_names_collide() {
        let mut image = test_image("dir_collide.img", 16);
        image.mkdir("/docs").unwrap();
        assert!(matches!(image.mkdir("/docs"), Err(FsError::NameCollision)));
        assert!(matches!(image.mkfile("/docs"), Err(FsError::NameCollision)));
    }

    #[test]
    fn missing_parent_fails() {
        let mut image = test_image("dir_missing_parent.img", 16);
        assert!(matches!(image.mkdir("/a/b"), Err(FsError::PathNotFound)));
        // the root itself has no parent to create into
        assert!(matches!(image.mkdir("/"), Err(FsError::PathNotFound)));
    }

    #[test]
    fn overlong_name_is_invalid() {
        let mut image = test_image("dir_long_name.img", 16);
        let name = "x".repeat(NAME_MAX_LENGTH + 1);
        let result = image.mkdir(&format!("/{}", name));
        assert!(matches!(result, Err(FsError::InvalidPath)));
    }

    #[test]
    fn inode_table_exhaustion() {
        // root occupies one of four slots
        let mut image = test_image("dir_exhaust.img", 4);
        image.mkfile("/a").unwrap();
        image.mkfile("/b").unwrap();
        image.mkfile("/c").unwrap();
        assert!(matches!(image.mkfile("/d"), Err(FsError::CapacityExceeded)));
    }

    #[test]
    fn parent_fan_out_limit() {
        use crate::consts::DIRECT_BLOCKS_COUNT;
        let mut image = test_image("dir_fan_out.img", 32);
        for i in 0..DIRECT_BLOCKS_COUNT {
            image.mkfile(&format!("/f{}", i)).unwrap();
        }
        let result = image.mkfile("/one-too-many");
        assert!(matches!(result, Err(FsError::CapacityExceeded)));
        // the rejected create must not have eaten an inode slot
        assert_eq!(image.find_free_inode(), Some(DIRECT_BLOCKS_COUNT as u32 + 1));
    }

    #[test]
    fn list_sorts_by_slot_index() {
        let mut image = test_image("dir_list.img", 16);
        image.mkdir("/docs").unwrap();
        image.mkfile("/docs/one").unwrap(); // slot 2
        image.mkdir("/docs/two").unwrap(); // slot 3
        image.mkfile("/docs/three").unwrap(); // slot 4

        assert_eq!(image.list("/docs").unwrap(), "FIL one\nDIR two\nFIL three\n");

        // removing and recreating reuses the lowest slot, which moves the
        // new entry to the front of the listing
        image.rm("/docs/one").unwrap();
        image.mkfile("/docs/zzz").unwrap();
        assert_eq!(image.list("/docs").unwrap(), "FIL zzz\nDIR two\nFIL three\n");
    }

    #[test]
    fn list_of_file_is_not_a_directory() {
        let mut image = test_image("dir_list_file.img", 16);
        image.mkfile("/a.txt").unwrap();
        assert!(matches!(image.list("/a.txt"), Err(FsError::NotADirectory)));
        assert!(matches!(image.list("/nope"), Err(FsError::PathNotFound)));
    }

    #[test]
    fn list_of_empty_directory_is_empty() {
        let mut image = test_image("dir_list_empty.img", 16);
        image.mkdir("/empty").unwrap();
        assert_eq!(image.list("/empty").unwrap(), "");
    }
}
