//! Sequencing of the two external passes around the include-tree stages.
//!
//! Strictly sequential: build -> flatten -> preprocess -> parse markers ->
//! reflatten -> compile -> remap. Each external invocation is a blocking
//! boundary. Temp directories are owned per run and removed best-effort on
//! every exit path; a failed removal never masks the original error.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::compiler::{Compiler, CompilerOptions, Diagnostic, InvokeResult};
use crate::error::{Error, Result};
use crate::flatten::{flatten, reflatten};
use crate::markers::{parse_markers, root_start_offset, strip_control_directives};
use crate::remap::{remap_diagnostics, IndexMap};
use crate::transform::Transform;
use crate::tree::{build_tree, IncludeTree};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub include_path: PathBuf,
    /// When set, remapped diagnostic paths under this base are rewritten
    /// relative to it.
    pub error_paths_relative_to: Option<PathBuf>,
    /// Per-invocation ceiling handed to the external compiler boundary.
    pub max_time: Option<Duration>,
}

impl PipelineConfig {
    pub fn new(include_path: impl Into<PathBuf>) -> Self {
        Self {
            include_path: include_path.into(),
            error_paths_relative_to: None,
            max_time: None,
        }
    }
}

/// One full compilation run over one root file. Owns the accumulated
/// diagnostic list, which stays available whether the run succeeds or
/// aborts.
pub struct Pipeline<C: Compiler> {
    compiler: C,
    config: PipelineConfig,
    transforms: Vec<Box<dyn Transform>>,
    diagnostics: Vec<Diagnostic>,
}

impl<C: Compiler> Pipeline<C> {
    pub fn new(compiler: C, config: PipelineConfig) -> Self {
        Self {
            compiler,
            config,
            transforms: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn add_transform(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Every diagnostic collected so far, already remapped to real paths
    /// where possible.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Run the whole pipeline for `input_file`, returning the final output
    /// path (`<input stem>.amx` next to the input).
    pub fn run(&mut self, input_file: &Path) -> Result<PathBuf> {
        self.diagnostics.clear();

        let tree = build_tree(input_file, &self.config.include_path)?;
        let (merged, gen1) = self.preprocess(&tree)?;
        let output = self.compile(input_file, &merged, &gen1)?;

        info!(output = %output.display(), "compiled successfully");
        Ok(output)
    }

    fn base_options(&self) -> CompilerOptions {
        CompilerOptions {
            include_directory: Some(self.config.include_path.clone()),
            debug_level: Some(2),
            require_semicolons: true,
            require_parentheses: true,
            defines: vec![("PAWN_PREPROC".to_string(), "1".to_string())],
            max_time: self.config.max_time,
            ..CompilerOptions::default()
        }
    }

    /// First external pass: flatten the tree and have the compiler merge it
    /// back into a single `.lst` stream.
    fn preprocess(&mut self, tree: &IncludeTree) -> Result<(String, IndexMap)> {
        let dir = TempDir::with_prefix("pawn-preproc")?;

        let (entry, map) = flatten(tree, dir.path(), &self.transforms)?;

        let mut options = self.base_options();
        options.working_directory = Some(dir.path().to_path_buf());
        options.output_lst = true;

        debug!(entry = %entry.display(), "invoking preprocessor pass");
        let result = self.compiler.invoke(&entry, &options)?;
        let output = self.collect(result, &[&map])?;

        let merged = fs::read_to_string(&output)?;
        let _ = fs::remove_file(&output);

        Ok((merged, map))
    }

    /// Second external pass: rebuild the tree from markers, reflatten it,
    /// and compile for real.
    fn compile(&mut self, input_file: &Path, merged: &str, gen1: &IndexMap) -> Result<PathBuf> {
        let dir = TempDir::with_prefix("pawn-preproc")?;

        let stripped = strip_control_directives(merged)?;
        let offset = root_start_offset(&stripped, 0)?;
        let fragment_tree = parse_markers(&stripped, 0, offset)?;
        let (entry, gen2) = reflatten(&fragment_tree, dir.path())?;

        let mut options = self.base_options();
        options.working_directory = Some(dir.path().to_path_buf());

        debug!(entry = %entry.display(), "invoking compile pass");
        let result = self.compiler.invoke(&entry, &options)?;
        let output = self.collect(result, &[&gen2, gen1])?;

        // Persist the result before the temp dir goes away.
        let dest = input_file.with_extension("amx");
        if fs::rename(&output, &dest).is_err() {
            fs::copy(&output, &dest)?;
            let _ = fs::remove_file(&output);
        }

        Ok(dest)
    }

    /// Shared post-invocation handling: remap and accumulate diagnostics,
    /// then halt on anything except warnings.
    fn collect(&mut self, result: InvokeResult, maps: &[&IndexMap]) -> Result<PathBuf> {
        let InvokeResult {
            mut diagnostics,
            output_file,
        } = result;

        let errors = diagnostics.iter().filter(|d| d.is_error()).count();

        remap_diagnostics(
            &mut diagnostics,
            maps,
            self.config.error_paths_relative_to.as_deref(),
        )?;
        self.diagnostics.append(&mut diagnostics);

        if errors > 0 {
            if let Some(output) = &output_file {
                let _ = fs::remove_file(output);
            }
            return Err(Error::CompilerFailed { errors });
        }

        match output_file {
            Some(output) if output.exists() => Ok(output),
            _ => Err(Error::CompilerSilentFailure),
        }
    }
}
