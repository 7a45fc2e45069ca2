use crate::error::{Error, Result};

use super::resolve::PAWN_DIRSEP;

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '@'
}

/// Derive a valid Pawn symbol from a path.
///
/// Only the Pawn directory separator `\` counts as a divider here; forward
/// slashes are ordinary characters, exactly as the Pawn compiler detects
/// directories. The path must contain at least one `\` - callers splice one
/// in before the basename when needed.
///
/// One trailing extension is stripped, then the first disallowed character is
/// replaced with `_`. Only the first: the single substitution matches the
/// generated filenames the compiler will echo back in diagnostics, so it is
/// kept as-is rather than extended to a global replace.
pub fn file_symbol(path: &str) -> Result<String> {
    let idx = path.rfind(PAWN_DIRSEP).ok_or_else(|| Error::MissingDirSeparator {
        path: path.to_string(),
    })?;

    let mut name = path[idx + 1..].to_string();

    // Strip a trailing extension (no dots or slashes inside it)
    if let Some(dot) = name.rfind('.') {
        let tail = &name[dot + 1..];
        if !tail.is_empty() && !tail.contains(['/', '\\']) {
            name.truncate(dot);
        }
    }

    if let Some((pos, c)) = name.char_indices().find(|(_, c)| !is_symbol_char(*c)) {
        name.replace_range(pos..pos + c.len_utf8(), "_");
    }

    Ok(name)
}
