use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::compiler::Diagnostic;
use crate::error::Result;
use crate::tree::IncludeTree;

/// Where one generated file index leads: straight to a real source file
/// (first generation) or forward to the previous generation's index (second
/// generation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexTarget {
    File(PathBuf),
    Forward(usize),
}

/// Per-flattening-generation table from generated file index to identity.
/// Produced by every flattening pass, consumed by the remap stage that
/// follows the matching external invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMap {
    entries: Vec<IndexTarget>,
}

impl IndexMap {
    pub fn new(entries: Vec<IndexTarget>) -> Self {
        Self { entries }
    }

    pub fn first_generation(tree: &IncludeTree) -> Self {
        Self {
            entries: tree
                .iter()
                .map(|node| IndexTarget::File(node.real_file.clone()))
                .collect(),
        }
    }

    pub fn second_generation(forwards: Vec<usize>) -> Self {
        Self {
            entries: forwards.into_iter().map(IndexTarget::Forward).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&IndexTarget> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rewrite diagnostic file references from generated filenames back to real
/// source paths, following the map chain innermost generation first.
///
/// A diagnostic whose index cannot be resolved is left untouched rather than
/// dropped - diagnostics never silently disappear. With `relative_to` set,
/// resolved paths under that base are rewritten relative to it.
pub fn remap_diagnostics(
    diagnostics: &mut [Diagnostic],
    maps: &[&IndexMap],
    relative_to: Option<&Path>,
) -> Result<()> {
    // Generation-1 layout: <index>/<symbol>.inc. Generation-2: <index>.inc.
    let nested_re = Regex::new(r"\b(\d+)[/\\][^/\\]+\.inc$")?;
    let flat_re = Regex::new(r"(\d+)\.inc")?;

    for diagnostic in diagnostics {
        let Some(index) = extract_index(&diagnostic.file, &nested_re, &flat_re) else {
            continue;
        };
        let Some(real) = resolve_chain(index, maps) else {
            trace!(index, file = %diagnostic.file, "no map entry, diagnostic left as-is");
            continue;
        };

        let path = match relative_to {
            Some(base) => real.strip_prefix(base).unwrap_or(&real).to_path_buf(),
            None => real,
        };
        diagnostic.file = path.display().to_string();
    }

    Ok(())
}

fn extract_index(file: &str, nested_re: &Regex, flat_re: &Regex) -> Option<usize> {
    let caps = nested_re.captures(file).or_else(|| flat_re.captures(file))?;
    caps.get(1)?.as_str().parse().ok()
}

fn resolve_chain(mut index: usize, maps: &[&IndexMap]) -> Option<PathBuf> {
    for map in maps {
        match map.get(index)? {
            IndexTarget::Forward(previous) => index = *previous,
            IndexTarget::File(path) => return Some(path.clone()),
        }
    }
    None
}
