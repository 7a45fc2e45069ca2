//! Interface boundary of the external Pawn compiler.
//!
//! Invoking and supervising the actual process (flag encoding, Wine
//! plumbing, output parsing) lives outside this crate; the pipeline only
//! depends on this trait and these result types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Warning,
    Error,
}

/// One compiler message. `file` carries the generated filename
/// (`<index>/<symbol>.inc` or `<index>.inc`) until the remap stage rewrites
/// it to the real source path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub kind: DiagnosticKind,
    pub fatal: bool,
    pub code: u32,
    pub message: String,
}

impl Diagnostic {
    /// Anything except a plain warning halts the run.
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if self.start_line == self.end_line {
            write!(f, "({}) : ", self.start_line)?;
        } else {
            write!(f, "({} -- {}) : ", self.start_line, self.end_line)?;
        }
        if self.fatal {
            write!(f, "fatal ")?;
        }
        let kind = match self.kind {
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Error => "error",
        };
        write!(f, "{kind} {}: {}", self.code, self.message)
    }
}

/// Options handed through to the external invocation. How these become
/// command-line flags is the invoker's concern.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub include_directory: Option<PathBuf>,
    pub working_directory: Option<PathBuf>,
    pub debug_level: Option<u8>,
    /// Stop after preprocessing and emit the merged `.lst` file.
    pub output_lst: bool,
    pub require_semicolons: bool,
    pub require_parentheses: bool,
    /// Pre-defined constants (`SYMBOL=value`).
    pub defines: Vec<(String, String)>,
    /// Forcibly terminate the external process past this; a timeout is a
    /// fatal error, not a diagnostic.
    pub max_time: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct InvokeResult {
    /// Expected, recoverable-by-caller output - not a pipeline failure.
    pub diagnostics: Vec<Diagnostic>,
    pub output_file: Option<PathBuf>,
}

/// The excluded collaborator: runs the compiler once, blocking until it
/// exits or the configured timeout fires.
pub trait Compiler {
    fn invoke(&mut self, source: &Path, options: &CompilerOptions) -> io::Result<InvokeResult>;
}
