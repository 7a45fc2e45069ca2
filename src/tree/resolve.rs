use std::fs;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// The Pawn compiler only treats backslashes as directory separators.
pub const PAWN_DIRSEP: char = '\\';

const PAWN_EXTENSIONS: [&str; 3] = ["inc", "p", "pwn"];

/// A resolved include: the file to read plus the raw Pawn-separator path the
/// symbol is derived from. The raw path keeps backslashes and slashes as
/// written because the compiler treats them differently.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub real_file: PathBuf,
    pub raw_file: String,
}

/// Resolve an include token to an existing file.
///
/// Quote-context includes search the including file's directory first, then
/// the configured include directory; angle-bracket and bare includes skip
/// straight to the include directory. Returns `None` when nothing matches -
/// whether that is fatal is the caller's call.
pub fn resolve_include(
    token: &str,
    quote_context: bool,
    file_dir: &str,
    include_dir: &str,
) -> Option<Resolved> {
    if quote_context {
        let raw = format!("{file_dir}{PAWN_DIRSEP}{token}");
        if let Some(real) = try_include_extensions(&normalize_path(&raw)) {
            return Some(with_found_extension(raw, real));
        }
    }

    let raw = format!("{include_dir}{PAWN_DIRSEP}{token}");
    let real = try_include_extensions(&normalize_path(&raw))?;
    Some(with_found_extension(raw, real))
}

// The raw path gets the found file's extension appended so the derived
// symbol reflects what was actually opened.
fn with_found_extension(mut raw: String, real: PathBuf) -> Resolved {
    if let Some(ext) = real.extension() {
        raw.push('.');
        raw.push_str(&ext.to_string_lossy());
    }
    Resolved {
        real_file: real,
        raw_file: raw,
    }
}

/// Probe the usual Pawn extensions for an existing file.
///
/// A path that already carries an extension wins as-is if it exists.
/// Otherwise a trailing `.pwn`/`.inc`/`.p` is dropped and `.inc`, `.p`,
/// `.pwn` are tried in that order.
pub fn try_include_extensions(path: &Path) -> Option<PathBuf> {
    if path.extension().is_some() && is_file(path) {
        return Some(path.to_path_buf());
    }

    let s = path.to_string_lossy();
    let base = PAWN_EXTENSIONS
        .iter()
        .find_map(|ext| s.strip_suffix(&format!(".{ext}")))
        .unwrap_or(s.as_ref());

    for ext in PAWN_EXTENSIONS {
        let candidate = PathBuf::from(format!("{base}.{ext}"));
        if is_file(&candidate) {
            return Some(candidate);
        }
    }

    None
}

fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Normalize separators, `.`, `..`, and make the path absolute.
///
/// Purely lexical: symlinks are not chased, so the result is stable enough to
/// key the dedup map with.
pub fn normalize_path(path: &str) -> PathBuf {
    let unified: String = path
        .chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect();
    let trimmed = unified.trim_end_matches(MAIN_SEPARATOR);
    let path = Path::new(trimmed);

    let mut out = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().unwrap_or_default()
    };

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}
