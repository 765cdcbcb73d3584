use std::fs;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use skal_core::{CompilationArtifact, Compiler, Diagnostic};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod watch;

use watch::Watcher;

/// Compiles Skal sources to Lua.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile an entry file and its imports into one Lua file
    #[command(visible_alias = "c")]
    Compile {
        input: PathBuf,

        /// Defaults to the input path with a `.lua` extension
        output: Option<PathBuf>,

        #[arg(long, help = "Recompile whenever a .sk file next to the input changes")]
        watch: bool,
    },
    /// Compile in memory and pipe the program to a Lua runtime
    #[command(visible_alias = "e")]
    Exec {
        input: PathBuf,

        #[arg(
            long,
            env = "SKAL_RUNTIME",
            default_value = "luajit",
            help = "Interpreter that reads the program from stdin"
        )]
        runtime: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compile {
            input,
            output,
            watch,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("lua"));
            if watch {
                info!(input = %input.display(), "watching for changes");
                Watcher::new(&input).run(|| {
                    if let Err(err) = compile_to_file(&input, &output) {
                        error!("{err:#}");
                    }
                    Ok(())
                })
            } else {
                compile_to_file(&input, &output)
            }
        }
        Command::Exec { input, runtime } => exec(&input, &runtime),
    }
}

fn compile_to_file(input: &Path, output: &Path) -> Result<()> {
    let artifact = compile(input, Some(output.to_path_buf()))?;
    write_output(output, artifact.lua.as_bytes())?;
    info!(output = %output.display(), "wrote lua");
    Ok(())
}

/// Compile `input`, printing any diagnostics. Fails when one is an error.
fn compile(input: &Path, output: Option<PathBuf>) -> Result<CompilationArtifact> {
    let started = Instant::now();
    let mut compiler = Compiler::new();
    let artifact = match compiler.compile_path(input, output) {
        Ok(artifact) => artifact,
        Err(err) if !err.diagnostics().is_empty() => {
            report(&compiler, err.diagnostics())?;
            bail!("failed to compile {}", input.display());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to compile {}", input.display()));
        }
    };

    report(&compiler, &artifact.diagnostics)?;
    if artifact.has_errors() {
        bail!(
            "failed to compile {}: {} error(s)",
            input.display(),
            artifact.diagnostics.iter().filter(|d| d.is_error()).count()
        );
    }
    info!(
        input = %input.display(),
        files = artifact.files.len(),
        elapsed = ?started.elapsed(),
        "compile time"
    );
    Ok(artifact)
}

fn report(compiler: &Compiler, diagnostics: &[Diagnostic]) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    let choice = if std::io::stderr().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);
    for diagnostic in diagnostics {
        diagnostic
            .emit(compiler.sources(), &mut stderr)
            .context("failed to print diagnostics")?;
    }
    Ok(())
}

fn exec(input: &Path, runtime: &str) -> Result<()> {
    let artifact = compile(input, None)?;

    let started = Instant::now();
    let mut child = Process::new(runtime)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start runtime `{runtime}`"))?;
    {
        let mut stdin = child
            .stdin
            .take()
            .with_context(|| format!("runtime `{runtime}` has no stdin"))?;
        stdin
            .write_all(artifact.lua.as_bytes())
            .with_context(|| format!("failed to send the program to runtime `{runtime}`"))?;
    }
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for runtime `{runtime}`"))?;
    info!(elapsed = ?started.elapsed(), "runtime");

    if !status.success() {
        bail!("runtime `{runtime}` exited with {status}");
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
