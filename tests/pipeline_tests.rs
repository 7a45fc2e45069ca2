use std::cell::Cell;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pawn_preproc::{
    Compiler, CompilerOptions, Diagnostic, DiagnosticKind, Error, InvokeResult, Pipeline,
    PipelineConfig,
};

// Helper to create a source file inside a test project directory
fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&path, content).expect("Failed to write source file");
    path
}

// Stand-in for the external Pawn compiler: the preprocessing pass inlines
// the flattened fragments into a merged .lst (including each file once, like
// the real thing), the compile pass just emits an output file. Diagnostics
// are injected per pass by the test.
struct MockCompiler {
    // Shared with the test so the count stays readable after the pipeline
    // takes ownership of the mock.
    invocations: Rc<Cell<usize>>,
    preprocess_diagnostics: Vec<Diagnostic>,
    compile_diagnostics: Vec<Diagnostic>,
}

impl MockCompiler {
    fn new() -> Self {
        Self {
            invocations: Rc::new(Cell::new(0)),
            preprocess_diagnostics: Vec::new(),
            compile_diagnostics: Vec::new(),
        }
    }

    fn invocation_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.invocations)
    }
}

fn inline_once(flat_dir: &Path, index: usize, symbol: &str, seen: &mut HashSet<usize>) -> String {
    let code = fs::read_to_string(flat_dir.join(index.to_string()).join(format!("{symbol}.inc")))
        .expect("Flattened fragment should exist");

    let mut merged = String::new();
    for line in code.lines() {
        let trimmed = line.trim();
        let reference = trimmed
            .strip_prefix("#include \"")
            .or_else(|| trimmed.strip_prefix("#tryinclude \""))
            .and_then(|rest| rest.strip_suffix('"'))
            .and_then(|inner| inner.split_once('\\'));

        match reference {
            Some((child_index, child_symbol)) => {
                let child_index: usize = child_index.parse().expect("Index should be numeric");
                if seen.insert(child_index) {
                    merged.push_str(&inline_once(flat_dir, child_index, child_symbol, seen));
                    merged.push('\n');
                }
            }
            None => {
                merged.push_str(line);
                merged.push('\n');
            }
        }
    }
    merged
}

impl Compiler for MockCompiler {
    fn invoke(&mut self, source: &Path, options: &CompilerOptions) -> io::Result<InvokeResult> {
        self.invocations.set(self.invocations.get() + 1);
        let work_dir = options
            .working_directory
            .clone()
            .expect("Pipeline should set a working directory");

        if options.output_lst {
            let symbol = source
                .file_stem()
                .expect("Entry has a stem")
                .to_string_lossy()
                .into_owned();
            let mut seen = HashSet::new();
            seen.insert(0);
            let merged = inline_once(&work_dir, 0, &symbol, &mut seen);

            let output = work_dir.join("merged.lst");
            fs::write(&output, merged)?;

            Ok(InvokeResult {
                diagnostics: self.preprocess_diagnostics.clone(),
                output_file: Some(output),
            })
        } else {
            let output = work_dir.join("0.amx");
            fs::write(&output, b"AMX")?;

            Ok(InvokeResult {
                diagnostics: self.compile_diagnostics.clone(),
                output_file: Some(output),
            })
        }
    }
}

fn warning(file: &str, line: u32) -> Diagnostic {
    Diagnostic {
        file: file.to_string(),
        start_line: line,
        end_line: line,
        kind: DiagnosticKind::Warning,
        fatal: false,
        code: 203,
        message: "symbol is never used".to_string(),
    }
}

fn error(file: &str, line: u32) -> Diagnostic {
    Diagnostic {
        file: file.to_string(),
        start_line: line,
        end_line: line,
        kind: DiagnosticKind::Error,
        fatal: false,
        code: 17,
        message: "undefined symbol".to_string(),
    }
}

fn sample_project(project: &Path) -> PathBuf {
    let root = write_source(
        project,
        "game.pwn",
        "#include \"helper\"\nmain() { return 0; }\n",
    );
    write_source(project, "helper.inc", "new helper_var;\n");
    root
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[test]
    fn test_full_run_produces_output_next_to_input() {
        let project = tempfile::tempdir().expect("Failed to create temp dir");
        let root = sample_project(project.path());

        let config = PipelineConfig::new(project.path().join("includes"));
        let mut pipeline = Pipeline::new(MockCompiler::new(), config);

        let output = pipeline.run(&root).expect("Pipeline should succeed");
        assert_eq!(output, root.with_extension("amx"));
        assert!(output.exists(), "Output should be persisted out of the temp dir");
        assert!(pipeline.diagnostics().is_empty());
    }

    #[test]
    fn test_warnings_are_remapped_and_do_not_halt() {
        let project = tempfile::tempdir().expect("Failed to create temp dir");
        let root = sample_project(project.path());

        let mut compiler = MockCompiler::new();
        // Generation 1 filename from the preprocessing pass, generation 2
        // flat filename from the compile pass; index 1 is helper both times
        // (reflatten numbers fragments in the same traversal order).
        compiler.preprocess_diagnostics = vec![warning("1/helper.inc", 3)];
        compiler.compile_diagnostics = vec![warning("1.inc", 4)];

        let config = PipelineConfig::new(project.path().join("includes"));
        let mut pipeline = Pipeline::new(compiler, config);

        pipeline.run(&root).expect("Warnings alone should not halt the run");

        let diags = pipeline.diagnostics();
        assert_eq!(diags.len(), 2, "All diagnostics surface to the caller");
        for diag in diags {
            assert!(
                diag.file.ends_with("helper.inc") && !diag.file.contains("1/"),
                "Diagnostic should point at the real file, got: {}",
                diag.file
            );
            assert!(Path::new(&diag.file).is_absolute());
        }
    }

    #[test]
    fn test_errors_halt_but_diagnostics_survive() {
        let project = tempfile::tempdir().expect("Failed to create temp dir");
        let root = sample_project(project.path());

        let mut compiler = MockCompiler::new();
        compiler.preprocess_diagnostics = vec![error("1/helper.inc", 2), warning("0/game.inc", 1)];

        let config = PipelineConfig::new(project.path().join("includes"));
        let mut pipeline = Pipeline::new(compiler, config);

        let err = pipeline.run(&root).expect_err("Errors must abort the run");
        assert!(
            matches!(err, Error::CompilerFailed { errors: 1 }),
            "Expected CompilerFailed, got: {err:?}"
        );

        let diags = pipeline.diagnostics();
        assert_eq!(diags.len(), 2, "Diagnostics survive an aborted run");
        assert!(
            diags[0].file.ends_with("helper.inc"),
            "Remap still applies on the failure path, got: {}",
            diags[0].file
        );
        assert!(
            !root.with_extension("amx").exists(),
            "No output on a failed run"
        );
    }

    #[test]
    fn test_relative_error_paths() {
        let project = tempfile::tempdir().expect("Failed to create temp dir");
        let root = sample_project(project.path());

        let mut compiler = MockCompiler::new();
        compiler.preprocess_diagnostics = vec![warning("1/helper.inc", 3)];

        let mut config = PipelineConfig::new(project.path().join("includes"));
        config.error_paths_relative_to = Some(project.path().to_path_buf());
        let mut pipeline = Pipeline::new(compiler, config);

        pipeline.run(&root).expect("Pipeline should succeed");
        assert_eq!(
            pipeline.diagnostics()[0].file,
            "helper.inc",
            "Paths under the base directory are rewritten relative to it"
        );
    }

    #[test]
    fn test_both_passes_invoked() {
        let project = tempfile::tempdir().expect("Failed to create temp dir");
        let root = sample_project(project.path());

        let compiler = MockCompiler::new();
        let invocations = compiler.invocation_counter();

        let config = PipelineConfig::new(project.path().join("includes"));
        let mut pipeline = Pipeline::new(compiler, config);
        pipeline.run(&root).expect("Pipeline should succeed");
        assert_eq!(
            invocations.get(),
            2,
            "One preprocessing pass plus one compile pass"
        );

        pipeline.run(&root).expect("Pipeline runs are independent");
        assert_eq!(invocations.get(), 4, "A second run repeats both passes");
        assert!(pipeline.diagnostics().is_empty());
    }
}
