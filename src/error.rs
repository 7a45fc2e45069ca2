use std::io;
use std::num::ParseIntError;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a pipeline run.
///
/// Resolution failures (an include token that matches no file) are absent on
/// purpose: they are rewritten into the source text and surface through the
/// external compiler's own diagnostic channel. Remap misses are likewise not
/// errors; the diagnostic is passed through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid scan pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid marker index: {0}")]
    MarkerIndex(#[from] ParseIntError),

    #[error("unable to determine directory of \"{path}\"")]
    MissingDirSeparator { path: String },

    #[error("include depth exceeded {limit} levels at \"{file}\"")]
    DepthExceeded { limit: usize, file: String },

    #[error("found the wrong end for {expected} ({found})")]
    WrongEndMarker { expected: usize, found: usize },

    #[error("unable to find the end of {index} ({offset})")]
    MissingEndMarker { index: usize, offset: usize },

    #[error("no start marker found for the root fragment")]
    MissingRootMarker,

    #[error("the compiler failed with {errors} error(s)")]
    CompilerFailed { errors: usize },

    #[error("the compiler failed without errors")]
    CompilerSilentFailure,
}
