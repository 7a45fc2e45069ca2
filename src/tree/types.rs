use std::path::{Path, PathBuf};

use serde::Serialize;

/// One distinct source file in the include graph.
#[derive(Debug, Clone, Serialize)]
pub struct FileNode {
    /// Unique index, assigned in first-discovery order. 0 is the root.
    pub index: usize,
    /// Canonical absolute path of the originating file.
    pub real_file: PathBuf,
    /// Pawn-safe identifier used as the generated fragment's on-disk name.
    pub symbol: String,
    /// The file's text with include directives rewritten to child references.
    pub code: String,
    /// Arena indices of included files, in order of appearance. A file
    /// included from two places is the same index referenced twice.
    pub children: Vec<usize>,
}

/// Arena of every file discovered in one build pass; position = index.
#[derive(Debug, Serialize)]
pub struct IncludeTree {
    files: Vec<FileNode>,
}

impl IncludeTree {
    pub(crate) fn new(files: Vec<FileNode>) -> Self {
        Self { files }
    }

    pub fn root(&self) -> &FileNode {
        &self.files[0]
    }

    pub fn get(&self, index: usize) -> Option<&FileNode> {
        self.files.get(index)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileNode> {
        self.files.iter()
    }

    /// Real path of the node with the given index, if any.
    pub fn real_file(&self, index: usize) -> Option<&Path> {
        self.files.get(index).map(|f| f.real_file.as_path())
    }
}
