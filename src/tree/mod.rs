mod builder;
mod resolve;
mod symbol;
mod types;

pub use builder::{build_tree, MAX_INCLUDE_DEPTH};
pub use resolve::{normalize_path, resolve_include, Resolved, PAWN_DIRSEP};
pub use symbol::file_symbol;
pub use types::{FileNode, IncludeTree};
