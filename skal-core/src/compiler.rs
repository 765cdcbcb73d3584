use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::builder::build;
use crate::codegen_lua::{emit_file, link};
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::imports;
use crate::job::{CompilationJob, SourceFile};
use crate::lexer::lex;
use crate::parser::parse;
use crate::span::SourceMap;
use crate::validate::Validator;

#[derive(Debug)]
pub struct CompilationArtifact {
    /// The complete Lua program.
    pub lua: String,
    pub output: Option<PathBuf>,
    /// Every file that went into the program, in emission order.
    pub files: Vec<PathBuf>,
    /// Validation findings. Lua is still produced when they contain errors.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilationArtifact {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Drives the pipeline for compilation jobs and owns their source text,
/// so diagnostics can be rendered after compilation.
#[derive(Debug, Default)]
pub struct Compiler {
    sources: SourceMap,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            sources: SourceMap::new(),
        }
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Read `input` and resolve its imports.
    pub fn load_job(
        &mut self,
        input: &Path,
        output: Option<PathBuf>,
    ) -> Result<CompilationJob, CoreError> {
        let content = fs::read_to_string(input).map_err(|source| CoreError::SourceIo {
            path: input.to_path_buf(),
            source,
        })?;
        let entry = SourceFile {
            id: self.sources.add(input.display().to_string(), content.clone()),
            path: input.to_path_buf(),
            content,
            is_import: false,
        };
        let imports = imports::resolve(&entry, &mut self.sources)?;
        Ok(CompilationJob {
            entry,
            output,
            imports,
        })
    }

    pub fn compile_job(&mut self, job: CompilationJob) -> Result<CompilationArtifact, CoreError> {
        let output = job.output.clone();
        let mut validator = Validator::new();
        let mut emitted = Vec::new();
        let mut files = Vec::new();

        for file in job.into_files() {
            let tokens = lex(file.id, &file.content)?;
            debug!(file = %file.path.display(), tokens = tokens.len(), "lexed");
            let ast = parse(tokens)?;
            debug!(file = %file.path.display(), nodes = ast.len(), "parsed");
            let members = build(&ast)?;
            validator.validate_file(file.id, &members);
            emitted.push(emit_file(&members, &file.stem(), file.is_import));
            files.push(file.path);
        }

        let diagnostics = validator.into_diagnostics();
        info!(
            files = files.len(),
            diagnostics = diagnostics.len(),
            "compiled job"
        );
        Ok(CompilationArtifact {
            lua: link(&emitted),
            output,
            files,
            diagnostics,
        })
    }

    pub fn compile_path(
        &mut self,
        input: &Path,
        output: Option<PathBuf>,
    ) -> Result<CompilationArtifact, CoreError> {
        let job = self.load_job(input, output)?;
        self.compile_job(job)
    }

    /// Compile a single in-memory file. `import` lines are not resolved.
    pub fn compile_source(
        &mut self,
        name: &str,
        source: &str,
    ) -> Result<CompilationArtifact, CoreError> {
        let entry = SourceFile {
            id: self.sources.add(name, source),
            path: PathBuf::from(name),
            content: source.to_string(),
            is_import: false,
        };
        self.compile_job(CompilationJob {
            entry,
            output: None,
            imports: Vec::new(),
        })
    }
}

/// Compile one source string, turning validation findings into an error.
pub fn compile_to_lua(source: &str) -> Result<String, CoreError> {
    let artifact = Compiler::new().compile_source("main.sk", source)?;
    if artifact.has_errors() {
        return Err(CoreError::ValidationError(artifact.diagnostics));
    }
    Ok(artifact.lua)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen_lua::{EPILOGUE, PROLOGUE};
    use tempfile::TempDir;

    #[test]
    fn wraps_output_in_environment() {
        let lua = compile_to_lua("print('hi')").expect("compile");
        assert_eq!(lua, format!("{PROLOGUE}\n  print('hi'){EPILOGUE}"));
    }

    #[test]
    fn empty_source_is_just_the_environment() {
        let lua = compile_to_lua("").expect("compile");
        assert_eq!(lua, format!("{PROLOGUE}{EPILOGUE}"));
    }

    #[test]
    fn emission_is_deterministic() {
        let source = "struct P { x }\nfn f(p) { defer print(p.x) return p }\nf(P(1))";
        assert_eq!(
            compile_to_lua(source).expect("first"),
            compile_to_lua(source).expect("second")
        );
    }

    #[test]
    fn lex_and_parse_errors_are_fatal() {
        assert!(matches!(
            compile_to_lua("let s = 'open"),
            Err(CoreError::LexError(_))
        ));
        assert!(matches!(
            compile_to_lua("defer f()"),
            Err(CoreError::ParseError(_))
        ));
    }

    #[test]
    fn validation_findings_keep_the_lua() {
        let mut compiler = Compiler::new();
        let artifact = compiler
            .compile_source("main.sk", "missing()")
            .expect("compile");
        assert!(artifact.has_errors());
        assert!(artifact.lua.contains("missing()"));

        let rendered = artifact.diagnostics[0].render(compiler.sources());
        assert!(rendered.contains("undefined reference `missing`"));
        assert!(rendered.contains("main.sk"));
    }

    #[test]
    fn compiles_imports_before_the_entry() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("util.sk"), "pub fn greet(name) { print(name) }\nlet hidden = 1\n")
            .expect("write util");
        let main = dir.path().join("main.sk");
        fs::write(&main, "import 'util'\ngreet('skal')\n").expect("write main");

        let artifact = Compiler::new()
            .compile_path(&main, Some(dir.path().join("main.lua")))
            .expect("compile");
        assert!(artifact.diagnostics.is_empty(), "{:?}", artifact.diagnostics);
        assert_eq!(artifact.files.len(), 2);
        assert_eq!(artifact.output, Some(dir.path().join("main.lua")));

        let expected = format!(
            "{PROLOGUE}\n  do -- FILE: util\n    function greet(name)\n      print(name)\n    end\n    local hidden = 1\n  end\n  greet('skal'){EPILOGUE}"
        );
        assert_eq!(artifact.lua, expected);
    }

    #[test]
    fn private_import_members_are_not_visible() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("util.sk"), "fn helper() {}\n").expect("write util");
        let main = dir.path().join("main.sk");
        fs::write(&main, "import 'util'\nhelper()\n").expect("write main");

        let artifact = Compiler::new().compile_path(&main, None).expect("compile");
        assert_eq!(artifact.diagnostics.len(), 1);
        assert_eq!(artifact.diagnostics[0].code, Some("E0301"));
    }

    #[test]
    fn missing_entry_is_an_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = Compiler::new()
            .compile_path(&dir.path().join("nope.sk"), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::SourceIo { .. }));
    }
}
