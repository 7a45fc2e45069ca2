//! Reconstructing tree structure from the preprocessor's merged output.
//!
//! The external preprocessor inlines every include in place; the sentinel
//! lines injected at flatten time are the only remaining record of where one
//! fragment ends and another begins.

use regex::Regex;

use crate::error::{Error, Result};
use crate::tree::MAX_INCLUDE_DEPTH;

const MARKER_PATTERN: &str = r"(?m)^(START|END)_OF_@(\d+)\(\);$";

/// Start-of-fragment sentinel line for the given index.
pub fn start_marker(index: usize) -> String {
    format!("START_OF_@{index}();")
}

/// End-of-fragment sentinel line for the given index.
pub fn end_marker(index: usize) -> String {
    format!("END_OF_@{index}();")
}

/// A piece of a reconstructed fragment: literal text, or a nested fragment
/// that was inlined by the preprocessor.
#[derive(Debug)]
pub enum Fragment {
    Text(String),
    File(FragmentNode),
}

/// A reconstructed fragment subtree, tagged with its originating first
/// generation index.
#[derive(Debug)]
pub struct FragmentNode {
    pub index: usize,
    pub fragments: Vec<Fragment>,
}

impl FragmentNode {
    /// Indices of directly nested fragments, in order.
    pub fn child_indices(&self) -> Vec<usize> {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::File(node) => Some(node.index),
                Fragment::Text(_) => None,
            })
            .collect()
    }

    /// Concatenated literal text of this node, nested fragments excluded.
    pub fn own_text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Text(t) => Some(t.as_str()),
                Fragment::File(_) => None,
            })
            .collect()
    }
}

/// Rebuild the fragment tree for `root_index` from merged preprocessor
/// output, scanning forward from `start_offset` (just past the root's start
/// marker).
pub fn parse_markers(merged: &str, root_index: usize, start_offset: usize) -> Result<FragmentNode> {
    let re = Regex::new(MARKER_PATTERN)?;
    let (node, _end) = parse_at(&re, merged, root_index, start_offset, 0)?;
    Ok(node)
}

fn parse_at(
    re: &Regex,
    merged: &str,
    index: usize,
    offset: usize,
    depth: usize,
) -> Result<(FragmentNode, usize)> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::DepthExceeded {
            limit: MAX_INCLUDE_DEPTH,
            file: format!("fragment {index}"),
        });
    }

    let mut fragments = Vec::new();
    let mut prev = offset;
    let mut pos = offset;

    while let Some(caps) = re.captures_at(merged, pos) {
        let Some(whole) = caps.get(0) else { break };
        let started = caps.get(1).map_or("", |m| m.as_str()) == "START";
        let found: usize = caps.get(2).map_or("", |m| m.as_str()).parse()?;

        if started {
            // A start marker before our end belongs to a deeper fragment.
            fragments.push(Fragment::Text(merged[prev..whole.start()].to_string()));

            let (child, child_end) = parse_at(re, merged, found, whole.end(), depth + 1)?;
            fragments.push(Fragment::File(child));

            prev = child_end;
            pos = child_end;
        } else {
            if found != index {
                return Err(Error::WrongEndMarker {
                    expected: index,
                    found,
                });
            }

            fragments.push(Fragment::Text(merged[prev..whole.start()].to_string()));

            return Ok((FragmentNode { index, fragments }, whole.end()));
        }
    }

    Err(Error::MissingEndMarker { index, offset })
}

/// Remove `#file` and `#endinput` bookkeeping lines the preprocessor leaves
/// in its merged output; they carry no structure the markers don't.
pub fn strip_control_directives(merged: &str) -> Result<String> {
    let re = Regex::new(r"(?m)^#(file|endinput).*?$")?;
    Ok(re.replace_all(merged, "").into_owned())
}

/// Offset just past the root fragment's start marker in merged output.
pub fn root_start_offset(merged: &str, root_index: usize) -> Result<usize> {
    let needle = start_marker(root_index);
    merged
        .find(&needle)
        .map(|pos| pos + needle.len())
        .ok_or(Error::MissingRootMarker)
}
