//! Depth-limited nested view of the media root for folder browsing.

use super::{extension_of, has_allowed_extension, relative_display, LibraryError};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_TREE_DEPTH: usize = 3;
pub const MAX_TREE_DEPTH: usize = 8;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Directory {
        name: String,
        path: String,
        children: Vec<TreeNode>,
    },
    File {
        name: String,
        path: String,
        extension: String,
    },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Directory { name, .. } | TreeNode::File { name, .. } => name,
        }
    }
}

/// Build the tree under `root`, descending at most `max_depth` levels.
///
/// Unreadable directories appear with no children. Symlinks are not listed.
pub fn directory_tree(
    root: &Path,
    allowed_extensions: &[String],
    max_depth: usize,
) -> Result<TreeNode, LibraryError> {
    if !root.is_dir() {
        return Err(LibraryError::NotFound("music directory".to_string()));
    }
    let max_depth = max_depth.min(MAX_TREE_DEPTH);
    Ok(build_node(root, root, allowed_extensions, max_depth))
}

fn build_node(root: &Path, dir: &Path, allowed_extensions: &[String], depth: usize) -> TreeNode {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut children = Vec::new();

    if depth > 0 {
        match fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let Ok(file_type) = entry.file_type() else {
                        continue;
                    };
                    if file_type.is_dir() {
                        children.push(build_node(root, &path, allowed_extensions, depth - 1));
                    } else if file_type.is_file() && has_allowed_extension(&path, allowed_extensions) {
                        children.push(TreeNode::File {
                            name: entry.file_name().to_string_lossy().to_string(),
                            path: relative_display(root, &path),
                            extension: extension_of(&path).unwrap_or_default(),
                        });
                    }
                }
            }
            Err(e) => warn!("Error reading directory structure {:?}: {}", dir, e),
        }
    }

    children.sort_by(|a, b| a.name().cmp(b.name()));

    TreeNode::Directory {
        name,
        path: relative_display(root, dir),
        children,
    }
}
