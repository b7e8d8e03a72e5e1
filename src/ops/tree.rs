use log::debug;

use crate::consts::SlotIndex;
use crate::image::Image;
use crate::inode::{Inode, InodeKind};
use crate::path::{join, last_component, validate_name};
use crate::util::error::{FsError, Result};

/// Snapshot of a source inode taken before any mutation, so recursion and
/// slot installs never read through a half-updated tree.
enum Source {
    File { size: u32, blocks: Vec<(usize, SlotIndex)> },
    Directory { child_names: Vec<String> },
}

impl Image {
    /// Copies the file or subtree at `src_path` to `dst_path`; the last
    /// component of `dst_path` names the copy. A failing child copy aborts
    /// the whole operation and leaves the entries created so far in place.
    pub fn cp(&mut self, src_path: &str, dst_path: &str) -> Result<()> {
        debug!("cp {} -> {}", src_path, dst_path);
        self.copy_entry(src_path, dst_path, self.capacity() as usize)
    }

    /// Deletes the file or subtree at `path`, children before parents.
    pub fn rm(&mut self, path: &str) -> Result<()> {
        debug!("rm {}", path);
        self.remove_entry(path, self.capacity() as usize)
    }

    fn snapshot(&self, index: SlotIndex) -> Result<Source> {
        let inode = self.node(index)?;
        match &inode.kind {
            InodeKind::RegularFile { blocks } => {
                Ok(Source::File { size: inode.size, blocks: blocks.present().collect() })
            }
            InodeKind::Directory { children } => {
                let mut child_names = Vec::new();
                for (_, child_index) in children.present() {
                    child_names.push(self.node(child_index)?.name.clone());
                }
                Ok(Source::Directory { child_names })
            }
            InodeKind::Free => Err(FsError::CorruptImage),
        }
    }

    fn copy_entry(&mut self, src_path: &str, dst_path: &str, depth: usize) -> Result<()> {
        // the tree cannot be deeper than the inode table; deeper recursion
        // means the image contains a cycle
        let depth = depth.checked_sub(1).ok_or(FsError::CorruptImage)?;

        let src_index = self.resolve(src_path)?;
        let dst_parent = self.resolve_parent(dst_path)?;
        let name = last_component(dst_path)?;
        validate_name(name)?;

        if self.find_child(dst_parent, name)?.is_some() {
            return Err(FsError::NameCollision);
        }

        let source = self.snapshot(src_index)?;

        let position = self
            .node(dst_parent)?
            .children()
            .ok_or(FsError::CorruptImage)?
            .first_empty()
            .ok_or(FsError::CapacityExceeded)?;
        let new_index = self.find_free_inode().ok_or(FsError::CapacityExceeded)?;

        match source {
            Source::File { size, blocks } => {
                let mut copy = Inode::file(name, dst_parent);
                copy.size = size;
                *self.node_mut(new_index)? = copy;
                self.node_mut(dst_parent)?
                    .children_mut()
                    .ok_or(FsError::CorruptImage)?
                    .set(position, new_index);

                if (self.superblock().free_data_blocks as usize) < blocks.len() {
                    return Err(FsError::OutOfSpace);
                }
                for (block_position, src_block) in blocks {
                    let content = self.block(src_block)?.clone();
                    let new_block = self.allocate_block()?;
                    *self.block_mut(new_block)? = content;
                    self.node_mut(new_index)?
                        .blocks_mut()
                        .ok_or(FsError::CorruptImage)?
                        .set(block_position, new_block);
                }
            }
            Source::Directory { child_names } => {
                *self.node_mut(new_index)? = Inode::directory(name, Some(dst_parent));
                self.node_mut(dst_parent)?
                    .children_mut()
                    .ok_or(FsError::CorruptImage)?
                    .set(position, new_index);

                for child_name in child_names {
                    let child_src = join(src_path, &child_name);
                    let child_dst = join(dst_path, &child_name);
                    self.copy_entry(&child_src, &child_dst, depth)?;
                }
            }
        }
        Ok(())
    }

    fn remove_entry(&mut self, path: &str, depth: usize) -> Result<()> {
        let depth = depth.checked_sub(1).ok_or(FsError::CorruptImage)?;

        let parent_index = self.resolve_parent(path)?;
        let index = self.resolve(path)?;

        match self.snapshot(index)? {
            Source::File { blocks, .. } => {
                for (_, block_index) in blocks {
                    self.release_block(block_index)?;
                }
            }
            Source::Directory { child_names } => {
                for child_name in child_names {
                    let child_path = join(path, &child_name);
                    self.remove_entry(&child_path, depth)?;
                }
            }
        }

        self.node_mut(index)?.reset();

        let children = self
            .node_mut(parent_index)?
            .children_mut()
            .ok_or(FsError::CorruptImage)?;
        let position = children.position_of(index).ok_or(FsError::CorruptImage)?;
        children.clear_at(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BLOCK_SIZE, DIRECT_BLOCKS_COUNT};
    use crate::image::testing::test_image;

    #[test]
    fn cp_file_copies_content_and_accounting() {
        let mut image = test_image("tree_cp_file.img", 16);
        image.mkfile("/a").unwrap();
        let data = vec![5u8; BLOCK_SIZE + 10];
        image.writef("/a", &data).unwrap();

        let free_before = image.superblock().free_data_blocks;
        image.cp("/a", "/b").unwrap();
        assert_eq!(image.superblock().free_data_blocks, free_before - 2);
        assert_eq!(image.readf("/b").unwrap(), data);

        // the copy owns its own blocks
        image.writef("/a", b"tail").unwrap();
        assert_eq!(image.readf("/b").unwrap(), data);
    }

    #[test]
    fn cp_empty_file_costs_no_blocks() {
        let mut image = test_image("tree_cp_empty.img", 16);
        image.mkfile("/a").unwrap();
        image.cp("/a", "/b").unwrap();
        assert_eq!(image.superblock().free_data_blocks, 16);
        assert_eq!(image.readf("/b").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn cp_directory_copies_subtree() {
        let mut image = test_image("tree_cp_dir.img", 32);
        image.mkdir("/src").unwrap();
        image.mkdir("/src/sub").unwrap();
        image.mkfile("/src/sub/f").unwrap();
        image.writef("/src/sub/f", b"payload").unwrap();
        image.mkfile("/src/g").unwrap();

        image.cp("/src", "/copy").unwrap();

        assert_eq!(image.list("/copy").unwrap(), image.list("/src").unwrap());
        assert_eq!(image.readf("/copy/sub/f").unwrap(), b"payload");
        let copy = image.resolve("/copy").unwrap();
        assert!(image.inode(copy).unwrap().is_directory());
    }

    #[test]
    fn cp_into_missing_parent_or_taken_name() {
        let mut image = test_image("tree_cp_err.img", 16);
        image.mkfile("/a").unwrap();
        assert!(matches!(image.cp("/a", "/no/b"), Err(FsError::PathNotFound)));
        assert!(matches!(image.cp("/missing", "/b"), Err(FsError::PathNotFound)));
        image.mkfile("/b").unwrap();
        assert!(matches!(image.cp("/a", "/b"), Err(FsError::NameCollision)));
    }

    #[test]
    fn cp_file_without_enough_blocks_fails_up_front() {
        let mut image = test_image("tree_cp_space.img", 4);
        image.mkfile("/a").unwrap();
        image.writef("/a", &vec![1u8; 3 * BLOCK_SIZE]).unwrap();
        assert_eq!(image.superblock().free_data_blocks, 1);

        let free_before = image.superblock().free_data_blocks;
        assert!(matches!(image.cp("/a", "/b"), Err(FsError::OutOfSpace)));
        // checked before any block was copied
        assert_eq!(image.superblock().free_data_blocks, free_before);
    }

    #[test]
    fn cp_directory_into_itself_stays_finite() {
        let mut image = test_image("tree_cp_self.img", 32);
        image.mkdir("/a").unwrap();
        image.mkfile("/a/f").unwrap();
        // the child list is snapshotted before the copy is installed, so
        // the fresh entry is not copied into itself
        image.cp("/a", "/a/b").unwrap();
        assert_eq!(image.list("/a/b").unwrap(), "FIL f\n");
    }

    #[test]
    fn rm_file_releases_blocks() {
        let mut image = test_image("tree_rm_file.img", 16);
        image.mkdir("/docs").unwrap();
        image.mkfile("/docs/a").unwrap();
        image.writef("/docs/a", &vec![3u8; 2 * BLOCK_SIZE]).unwrap();
        assert_eq!(image.superblock().free_data_blocks, 14);

        image.rm("/docs/a").unwrap();
        assert_eq!(image.superblock().free_data_blocks, 16);
        assert_eq!(image.list("/docs").unwrap(), "");
        assert!(matches!(image.resolve("/docs/a"), Err(FsError::PathNotFound)));

        // the inode slot is reusable again
        let reused = image.mkfile("/docs/b").unwrap();
        assert_eq!(reused, 2);
    }

    #[test]
    fn rm_directory_removes_descendants_first() {
        let mut image = test_image("tree_rm_dir.img", 32);
        image.mkdir("/top").unwrap();
        image.mkdir("/top/mid").unwrap();
        image.mkfile("/top/mid/leaf").unwrap();
        image.writef("/top/mid/leaf", b"data").unwrap();

        image.rm("/top").unwrap();
        assert!(matches!(image.resolve("/top"), Err(FsError::PathNotFound)));
        assert_eq!(image.superblock().free_data_blocks, 32);
        // all three inode slots are free again
        assert_eq!(image.find_free_inode(), Some(1));
        assert_eq!(image.list("/").unwrap(), "");
    }

    #[test]
    fn rm_root_or_missing_path_fails() {
        let mut image = test_image("tree_rm_err.img", 16);
        assert!(matches!(image.rm("/"), Err(FsError::PathNotFound)));
        assert!(matches!(image.rm("/ghost"), Err(FsError::PathNotFound)));
    }

    #[test]
    fn deep_tree_within_capacity_copies_fine() {
        let mut image = test_image("tree_deep.img", 64);
        let mut path = String::new();
        for i in 0..DIRECT_BLOCKS_COUNT {
            path.push_str(&format!("/d{}", i));
            image.mkdir(&path).unwrap();
        }
        image.cp("/d0", "/copy").unwrap();
        image.rm("/copy").unwrap();
        image.rm("/d0").unwrap();
        assert_eq!(image.list("/").unwrap(), "");
    }
}
