//! A compilation job: one entry file plus the imports it pulls in.

use std::path::{Path, PathBuf};

use crate::span::FileId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub content: String,
    pub is_import: bool,
}

impl SourceFile {
    /// File name without the `.sk` extension, as used in `do -- FILE:` markers.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone)]
pub struct CompilationJob {
    pub entry: SourceFile,
    pub output: Option<PathBuf>,
    /// Dependencies first, in the order they must be emitted.
    pub imports: Vec<SourceFile>,
}

impl CompilationJob {
    /// Every file of the job in emission order: imports, then the entry.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.imports.iter().chain(std::iter::once(&self.entry))
    }

    pub fn into_files(self) -> impl Iterator<Item = SourceFile> {
        self.imports.into_iter().chain(std::iter::once(self.entry))
    }
}
