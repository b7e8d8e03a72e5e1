//! Path handling. Paths are absolute, `/`-separated and case-sensitive;
//! empty segments are discarded, so `/a//b` resolves like `/a/b`.

use crate::consts::{SlotIndex, NAME_MAX_LENGTH};
use crate::image::Image;
use crate::util::error::{FsError, Result};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Final non-empty segment of `path`. A path without segments (e.g. `"/"`)
/// has no component to name.
pub fn last_component(path: &str) -> Result<&str> {
    segments(path).last().ok_or(FsError::InvalidPath)
}

/// A single name as it may appear inside a directory.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > NAME_MAX_LENGTH {
        return Err(FsError::InvalidPath);
    }
    Ok(())
}

/// `base` plus one more component. A doubled separator is harmless since
/// resolution drops empty segments.
pub(crate) fn join(base: &str, name: &str) -> String {
    format!("{}/{}", base, name)
}

impl Image {
    /// Child of directory `dir` whose name matches exactly. `Ok(None)` when
    /// there is no match or `dir` is not a directory.
    pub(crate) fn find_child(&self, dir: SlotIndex, name: &str) -> Result<Option<SlotIndex>> {
        let children = match self.node(dir)?.children() {
            Some(children) => children,
            None => return Ok(None),
        };
        for (_, child_index) in children.present() {
            if self.node(child_index)?.name == name {
                return Ok(Some(child_index));
            }
        }
        Ok(None)
    }

    /// Walks `path` from the root down to its target inode.
    pub fn resolve(&self, path: &str) -> Result<SlotIndex> {
        if !path.starts_with('/') {
            return Err(FsError::InvalidPath);
        }
        let mut current = self.root_node();
        for segment in segments(path) {
            current = self
                .find_child(current, segment)?
                .ok_or(FsError::PathNotFound)?;
        }
        Ok(current)
    }

    /// Resolves everything but the last segment, yielding the directory
    /// that holds (or would hold) the final component. The root has no
    /// parent, so `resolve_parent("/")` fails.
    pub fn resolve_parent(&self, path: &str) -> Result<SlotIndex> {
        if !path.starts_with('/') {
            return Err(FsError::InvalidPath);
        }
        let all: Vec<&str> = segments(path).collect();
        let (_, leading) = all.split_last().ok_or(FsError::PathNotFound)?;

        let mut current = self.root_node();
        for segment in leading {
            current = self
                .find_child(current, segment)?
                .ok_or(FsError::PathNotFound)?;
        }
        if !self.node(current)?.is_directory() {
            return Err(FsError::PathNotFound);
        }
        Ok(current)
    }
}
