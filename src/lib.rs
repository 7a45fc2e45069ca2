pub mod compiler;
pub mod error;
pub mod flatten;
pub mod markers;
pub mod pipeline;
pub mod remap;
pub mod transform;
pub mod tree;

pub use compiler::{Compiler, CompilerOptions, Diagnostic, DiagnosticKind, InvokeResult};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineConfig};
