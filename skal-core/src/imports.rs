//! Import discovery and resolution.
//!
//! Imports live in the leading lines of a file, before any other code.
//! Paths are quoted, `/`-separated and relative to the directory of the
//! entry file, whichever file the import appears in. `a/b` names either
//! `a/b.sk` or the module file `a/b/Mod.sk`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::job::SourceFile;
use crate::span::{FileId, SourceMap, Span};

const MODULE_FILE: &str = "Mod.sk";

/// An `import` line found at the top of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// The quoted path, as written.
    pub path: String,
    /// The whole import line.
    pub span: Span,
}

/// Collect the imports of one file.
///
/// Blank lines and `#` comments are skipped. The first other line that
/// does not start with `import` ends the scan.
pub fn scan(file: FileId, content: &str) -> Result<Vec<ImportRequest>, CoreError> {
    let mut requests = Vec::new();
    let mut offset = 0;
    for raw in content.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();

        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !is_import_line(line) {
            break;
        }

        let lead = raw.len() - raw.trim_start().len();
        let start = line_start + lead;
        let span = Span::new(file, start as u32, (start + line.len()) as u32);
        let path = quoted(line, '"')
            .or_else(|| quoted(line, '\''))
            .ok_or_else(|| {
                CoreError::ImportError(
                    Diagnostic::error("an import needs a quoted module path", span)
                        .with_code("E0203"),
                )
            })?;
        requests.push(ImportRequest {
            path: path.to_string(),
            span,
        });
    }
    trace!(file = file.0, imports = requests.len(), "scanned imports");
    Ok(requests)
}

/// `import` as a whole word: alone, or followed by a space or a quote.
fn is_import_line(line: &str) -> bool {
    match line.strip_prefix("import") {
        Some(rest) => rest
            .chars()
            .next()
            .is_none_or(|next| next.is_whitespace() || next == '"' || next == '\''),
        None => false,
    }
}

/// First non-empty run of text between two `quote` characters.
fn quoted(line: &str, quote: char) -> Option<&str> {
    let open = line.find(quote)?;
    let rest = &line[open + quote.len_utf8()..];
    let first = rest.chars().next()?;
    let close = rest[first.len_utf8()..].find(quote)? + first.len_utf8();
    Some(&rest[..close])
}

/// Candidate files for an import path, in lookup order.
pub fn candidates(root: &Path, import: &str) -> [PathBuf; 2] {
    let mut dir = root.to_path_buf();
    for part in import.split('/').filter(|part| !part.is_empty()) {
        dir.push(part);
    }
    let mut file = dir.clone().into_os_string();
    file.push(".sk");
    [PathBuf::from(file), dir.join(MODULE_FILE)]
}

/// Resolve every import reachable from `entry`, dependencies first.
///
/// Each resolved file is registered in `sources`. A file imported more
/// than once is loaded once; a cycle is an error.
pub fn resolve(entry: &SourceFile, sources: &mut SourceMap) -> Result<Vec<SourceFile>, CoreError> {
    let root = entry
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let entry_key = canonical(&entry.path)?;

    let mut resolver = Resolver {
        root,
        sources,
        seen: HashSet::new(),
        stack: vec![entry_key],
        imports: Vec::new(),
    };
    resolver.visit(entry.id, &entry.content)?;
    debug!(
        entry = %entry.path.display(),
        imports = resolver.imports.len(),
        "resolved imports"
    );
    Ok(resolver.imports)
}

fn canonical(path: &Path) -> Result<PathBuf, CoreError> {
    fs::canonicalize(path).map_err(|source| CoreError::SourceIo {
        path: path.to_path_buf(),
        source,
    })
}

struct Resolver<'s> {
    root: PathBuf,
    sources: &'s mut SourceMap,
    /// Canonical paths of files already loaded.
    seen: HashSet<PathBuf>,
    /// Canonical paths of the files currently being resolved.
    stack: Vec<PathBuf>,
    imports: Vec<SourceFile>,
}

impl Resolver<'_> {
    fn visit(&mut self, file: FileId, content: &str) -> Result<(), CoreError> {
        for request in scan(file, content)? {
            let path = self.locate(&request)?;
            let key = canonical(&path)?;

            if let Some(pos) = self.stack.iter().position(|open| *open == key) {
                let chain = self.stack[pos..]
                    .iter()
                    .chain(std::iter::once(&key))
                    .map(|p| display_name(p))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(CoreError::ImportError(
                    Diagnostic::error(format!("import cycle: {chain}"), request.span)
                        .with_code("E0202"),
                ));
            }
            if !self.seen.insert(key.clone()) {
                trace!(import = %path.display(), "skipping duplicate import");
                continue;
            }

            let content = fs::read_to_string(&path).map_err(|source| CoreError::SourceIo {
                path: path.clone(),
                source,
            })?;
            let id = self.sources.add(path.display().to_string(), content.clone());

            self.stack.push(key);
            self.visit(id, &content)?;
            self.stack.pop();

            self.imports.push(SourceFile {
                id,
                path,
                content,
                is_import: true,
            });
        }
        Ok(())
    }

    fn locate(&self, request: &ImportRequest) -> Result<PathBuf, CoreError> {
        let [file, module] = candidates(&self.root, &request.path);
        if file.is_file() {
            return Ok(file);
        }
        if module.is_file() {
            return Ok(module);
        }
        Err(CoreError::ImportError(
            Diagnostic::error(
                format!("cannot find import `{}`", request.path),
                request.span,
            )
            .with_code("E0201")
            .with_note(format!("looked for {}", file.display()))
            .with_note(format!("looked for {}", module.display())),
        ))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(&path, content).expect("write file");
        path
    }

    fn entry(sources: &mut SourceMap, path: PathBuf) -> SourceFile {
        let content = fs::read_to_string(&path).expect("read entry");
        SourceFile {
            id: sources.add(path.display().to_string(), content.clone()),
            path,
            content,
            is_import: false,
        }
    }

    fn stems(files: &[SourceFile]) -> Vec<String> {
        files.iter().map(SourceFile::stem).collect()
    }

    #[test]
    fn scans_leading_import_lines() {
        let source = "# header\n\nimport 'util'\n  import \"lib/net\"\nlet x = 1\nimport 'late'\n";
        let requests = scan(FileId(0), source).expect("scan");
        let paths: Vec<_> = requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["util", "lib/net"]);
        assert_eq!(&source[requests[1].span.range()], "import \"lib/net\"");
    }

    #[test]
    fn identifiers_starting_with_import_end_the_scan() {
        assert!(scan(FileId(0), "importer()\n").expect("scan").is_empty());
        assert!(scan(FileId(0), "imports = 1\nimport 'late'\n").expect("scan").is_empty());
        let requests = scan(FileId(0), "import'tight'\nimport_all()\n").expect("scan");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "tight");
    }

    #[test]
    fn double_quotes_win() {
        let requests = scan(FileId(0), "import 'a' \"b\"").expect("scan");
        assert_eq!(requests[0].path, "b");
    }

    #[test]
    fn import_without_path_is_an_error() {
        let err = scan(FileId(0), "import util").unwrap_err();
        assert_eq!(err.diagnostics()[0].code, Some("E0203"));
        let err = scan(FileId(0), "import\nprint(1)").unwrap_err();
        assert_eq!(err.diagnostics()[0].code, Some("E0203"));
    }

    #[test]
    fn resolves_files_and_module_directories() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "util.sk", "pub fn u() {}\n");
        write(dir.path(), "net/Mod.sk", "import 'util'\npub fn n() {}\n");
        let main = write(dir.path(), "main.sk", "import 'net'\nimport 'util'\nn()\n");

        let mut sources = SourceMap::new();
        let entry = entry(&mut sources, main);
        let imports = resolve(&entry, &mut sources).expect("resolve");
        assert_eq!(stems(&imports), ["util", "Mod"]);
        assert!(imports.iter().all(|f| f.is_import));
        assert_eq!(sources.source(imports[1].id), Some("import 'util'\npub fn n() {}\n"));
    }

    #[test]
    fn paths_are_relative_to_the_entry_directory() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "shared.sk", "pub let s = 1\n");
        write(dir.path(), "lib/a.sk", "import 'shared'\n");
        let main = write(dir.path(), "main.sk", "import 'lib/a'\n");

        let mut sources = SourceMap::new();
        let entry = entry(&mut sources, main);
        let imports = resolve(&entry, &mut sources).expect("resolve");
        assert_eq!(stems(&imports), ["shared", "a"]);
    }

    #[test]
    fn missing_import_reports_candidates() {
        let dir = TempDir::new().expect("tempdir");
        let main = write(dir.path(), "main.sk", "import 'nope'\n");

        let mut sources = SourceMap::new();
        let entry = entry(&mut sources, main);
        let err = resolve(&entry, &mut sources).unwrap_err();
        let diag = &err.diagnostics()[0];
        assert_eq!(diag.code, Some("E0201"));
        assert_eq!(diag.message, "cannot find import `nope`");
        assert_eq!(diag.notes.len(), 2);
        assert_eq!(diag.span.map(|s| s.file), Some(entry.id));
    }

    #[test]
    fn cycles_are_rejected() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "a.sk", "import 'b'\n");
        write(dir.path(), "b.sk", "import 'a'\n");
        let main = write(dir.path(), "main.sk", "import 'a'\n");

        let mut sources = SourceMap::new();
        let entry = entry(&mut sources, main);
        let err = resolve(&entry, &mut sources).unwrap_err();
        let diag = &err.diagnostics()[0];
        assert_eq!(diag.code, Some("E0202"));
        assert_eq!(diag.message, "import cycle: a.sk -> b.sk -> a.sk");
    }
}
