use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::markers::{end_marker, start_marker};
use crate::remap::IndexMap;
use crate::transform::{in_priority_order, Transform};
use crate::tree::IncludeTree;

/// Write every node of the tree to `target_dir` as a marker-delimited
/// fragment: one subdirectory per index, one `<symbol>.inc` file each.
///
/// Transforms run before the markers go in, so marker positions stay
/// meaningful no matter how much text they add or remove. Returns the root
/// fragment's path (what the external preprocessor is handed) and the
/// first-generation index map.
pub fn flatten(
    tree: &IncludeTree,
    target_dir: &Path,
    transforms: &[Box<dyn Transform>],
) -> Result<(PathBuf, IndexMap)> {
    let ordered = in_priority_order(transforms);
    // #endinput hard-stops the preprocessor, which would truncate output
    // before the trailing end marker is reached.
    let endinput_re = Regex::new(r"(?m)^\s*?#endinput")?;

    for node in tree.iter() {
        let node_dir = target_dir.join(node.index.to_string());
        fs::create_dir_all(&node_dir)?;

        let mut code = node.code.clone();
        for t in &ordered {
            code = t.apply(code);
        }

        let index = node.index;
        let mut wrapped = format!(
            "{start}\n#line 0\n{code}\n{end}\n",
            start = start_marker(index),
            end = end_marker(index),
        );
        wrapped = endinput_re
            .replace_all(&wrapped, format!("{}\n#endinput", end_marker(index)))
            .into_owned();

        fs::write(node_dir.join(format!("{}.inc", node.symbol)), wrapped)?;
    }

    debug!(files = tree.len(), dir = %target_dir.display(), "flattened include tree");

    let entry = target_dir
        .join(tree.root().index.to_string())
        .join(format!("{}.inc", tree.root().symbol));

    Ok((entry, IndexMap::first_generation(tree)))
}
