use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::resolve::{normalize_path, resolve_include, PAWN_DIRSEP};
use super::symbol::file_symbol;
use super::types::{FileNode, IncludeTree};

/// Hard ceiling on include nesting. The dedup map collapses ordinary cycles,
/// but chains it cannot key (self-referential generated names and the like)
/// must fail fast instead of blowing the stack.
pub const MAX_INCLUDE_DEPTH: usize = 100;

// Recognizes #include / #tryinclude with quoted, angle-bracket, or bare
// tokens, plus an optional trailing comment. Groups: 1 = directive with
// leading whitespace, 2 = "try", 3 = token with quotes/brackets, 4 = opening
// quote char, 5 = inner token.
const INCLUDE_PATTERN: &str =
    r#"(?m)^(\s*#(try)?include)\s*(([<"])?\s*(\s*[^<"\s].+?[^>"\s]\s*|[^\s"<>]+)\s*[>"]|[^\s"<>]+)\s*?(/[/*].*?)?$"#;

struct TreeBuilder {
    directive_re: Regex,
    include_dir: String,
    files: Vec<FileNode>,
    visited: HashMap<PathBuf, usize>,
}

/// Recursively discover every file included from `input_file`, rewriting
/// include directives to reference the assigned indices. The returned arena
/// holds each distinct file exactly once, in first-discovery order.
pub fn build_tree(input_file: &Path, include_dir: &Path) -> Result<IncludeTree> {
    let root_file = normalize_path(&input_file.to_string_lossy());
    let include_dir = normalize_path(&include_dir.to_string_lossy());

    let mut builder = TreeBuilder {
        directive_re: Regex::new(INCLUDE_PATTERN)?,
        include_dir: include_dir.to_string_lossy().into_owned(),
        files: Vec::new(),
        visited: HashMap::new(),
    };

    // Splice a Pawn separator in front of the basename so symbol derivation
    // always has one to split on.
    let parent = root_file
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let basename = root_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let raw_root = format!("{parent}{PAWN_DIRSEP}{basename}");

    builder.files.push(FileNode {
        index: 0,
        real_file: root_file.clone(),
        symbol: file_symbol(&raw_root)?,
        code: String::new(),
        children: Vec::new(),
    });
    builder.visited.insert(root_file.clone(), 0);

    let (code, children) = builder.traverse(&raw_root, &root_file, 0)?;
    builder.files[0].code = code;
    builder.files[0].children = children;

    debug!(files = builder.files.len(), "include tree built");

    Ok(IncludeTree::new(builder.files))
}

impl TreeBuilder {
    /// Scan one file for include directives, depth-first pre-order. Produces
    /// a fresh rewritten text buffer; nothing shared is mutated, so already
    /// visited nodes can be reused without re-running any of this.
    fn traverse(&mut self, raw_file: &str, real_file: &Path, depth: usize) -> Result<(String, Vec<usize>)> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(Error::DepthExceeded {
                limit: MAX_INCLUDE_DEPTH,
                file: raw_file.to_string(),
            });
        }

        let code = fs::read_to_string(real_file)?;

        // The parent directory is found by backslashes only, as per the Pawn
        // compiler.
        let sep = raw_file.rfind(PAWN_DIRSEP).ok_or_else(|| Error::MissingDirSeparator {
            path: raw_file.to_string(),
        })?;
        let file_dir = raw_file[..sep].to_string();

        let mut children = Vec::new();
        let mut out = String::with_capacity(code.len());
        let mut last = 0;

        let re = self.directive_re.clone();
        for caps in re.captures_iter(&code) {
            let Some(whole) = caps.get(0) else { continue };

            out.push_str(&code[last..whole.start()]);

            let directive = caps.get(1).map_or("", |m| m.as_str());
            let soft = caps.get(2).is_some();
            let quote_context = caps.get(4).map(|m| m.as_str()) == Some("\"");
            let bracketed = caps.get(3).map_or("", |m| m.as_str());
            let token = caps.get(5).map_or(bracketed, |m| m.as_str());

            match resolve_include(token, quote_context, &file_dir, &self.include_dir) {
                None => {
                    // Unresolved includes never reach the external tool as
                    // directives: the soft form degrades to a comment, the
                    // hard form is deferred into the compiler's own
                    // diagnostic stream.
                    trace!(token, soft, "include not found");
                    if soft {
                        out.push_str(&format!("// Not found: #tryinclude {bracketed}"));
                    } else {
                        out.push_str(&format!("#error Not found: #include {bracketed}"));
                    }
                }
                Some(resolved) => {
                    let index = self.visit(&resolved.raw_file, &resolved.real_file, depth)?;
                    children.push(index);
                    out.push_str(&format!(
                        "{directive} \"{index}{PAWN_DIRSEP}{symbol}\"",
                        symbol = self.files[index].symbol
                    ));
                }
            }

            last = whole.end();
        }
        out.push_str(&code[last..]);

        Ok((out, children))
    }

    /// Return the node index for a resolved file, traversing into it first
    /// if this pass has not seen it yet.
    fn visit(&mut self, raw_file: &str, real_file: &Path, depth: usize) -> Result<usize> {
        if let Some(&index) = self.visited.get(real_file) {
            trace!(index, file = %real_file.display(), "reusing visited file");
            return Ok(index);
        }

        let index = self.files.len();
        self.files.push(FileNode {
            index,
            real_file: real_file.to_path_buf(),
            symbol: file_symbol(raw_file)?,
            code: String::new(),
            children: Vec::new(),
        });
        // Registered before descending so cyclic includes resolve to this
        // node instead of recursing forever.
        self.visited.insert(real_file.to_path_buf(), index);

        trace!(index, file = %real_file.display(), "discovered include");

        let (code, children) = self.traverse(raw_file, real_file, depth + 1)?;
        self.files[index].code = code;
        self.files[index].children = children;

        Ok(index)
    }
}
