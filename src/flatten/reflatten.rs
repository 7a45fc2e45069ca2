use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::markers::{Fragment, FragmentNode};
use crate::remap::IndexMap;

/// Flatten a reconstructed fragment tree into a second-generation file set:
/// flat `<new_index>.inc` files with nested fragments rewritten as includes
/// of the new index.
///
/// No markers and no transforms this time - the second external pass needs
/// plain consumable files. The returned map records new index -> original
/// first-generation index; composing it with the first generation's map
/// recovers real file identity.
pub fn reflatten(root: &FragmentNode, target_dir: &Path) -> Result<(PathBuf, IndexMap)> {
    let mut state = SaveState {
        count: 0,
        forwards: Vec::new(),
    };

    save_fragment(root, target_dir, &mut state)?;

    debug!(files = state.count, dir = %target_dir.display(), "reflattened fragment tree");

    Ok((target_dir.join("0.inc"), IndexMap::second_generation(state.forwards)))
}

struct SaveState {
    count: usize,
    forwards: Vec<usize>,
}

fn save_fragment(node: &FragmentNode, dir: &Path, state: &mut SaveState) -> Result<usize> {
    // Index claimed before descending: traversal order = index order.
    let new_index = state.count;
    state.count += 1;
    state.forwards.push(node.index);

    let mut code = String::new();
    for fragment in &node.fragments {
        match fragment {
            Fragment::Text(text) => code.push_str(text),
            Fragment::File(child) => {
                let child_index = save_fragment(child, dir, state)?;
                code.push_str(&format!("\n#include \"{child_index}\"\n"));
            }
        }
    }

    fs::write(dir.join(format!("{new_index}.inc")), code)?;

    Ok(new_index)
}
