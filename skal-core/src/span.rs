//! Source locations and the source map used for diagnostics.

use std::ops::Range;

use codespan_reporting::files::{Files, SimpleFiles};

/// Identifier of a file registered in a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

/// A point in a source file.
///
/// `offset` is a byte offset; `line` and `column` are 1-based, with the
/// column counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Half-open byte range inside one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Span { file, start, end }
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// Spans from different files are not merged; `self` is returned.
    pub fn to(self, other: Span) -> Span {
        if self.file != other.file {
            return self;
        }
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// All source files known to one compiler session.
pub struct SourceMap {
    files: SimpleFiles<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap {
            files: SimpleFiles::new(),
        }
    }

    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> FileId {
        FileId(self.files.add(name.into(), source.into()))
    }

    pub fn name(&self, id: FileId) -> Option<&str> {
        self.files.get(id.0).ok().map(|file| file.name().as_str())
    }

    pub fn source(&self, id: FileId) -> Option<&str> {
        self.files.get(id.0).ok().map(|file| file.source().as_str())
    }

    /// Text of the given 1-based line, without its line terminator.
    pub fn line_text(&self, id: FileId, line: u32) -> Option<&str> {
        let index = (line as usize).checked_sub(1)?;
        let range = self.files.line_range(id.0, index).ok()?;
        let source = self.source(id)?;
        source
            .get(range)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    /// 1-based line and column of the start of `span`.
    pub fn location(&self, span: Span) -> Option<(usize, usize)> {
        self.files
            .location(span.file.0, span.start as usize)
            .ok()
            .map(|loc| (loc.line_number, loc.column_number))
    }

    pub(crate) fn files(&self) -> &SimpleFiles<String, String> {
        &self.files
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        SourceMap::new()
    }
}

impl std::fmt::Debug for SourceMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceMap").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_line_text_and_location() {
        let mut map = SourceMap::new();
        let id = map.add("main.sk", "let a = 1\nprint(a)\n");

        assert_eq!(map.name(id), Some("main.sk"));
        assert_eq!(map.line_text(id, 2), Some("print(a)"));
        assert_eq!(map.location(Span::new(id, 16, 17)), Some((2, 7)));
        assert_eq!(map.line_text(id, 0), None);
    }

    #[test]
    fn merges_spans_in_same_file() {
        let a = Span::new(FileId(0), 4, 6);
        let b = Span::new(FileId(0), 1, 3);
        assert_eq!(a.to(b), Span::new(FileId(0), 1, 6));

        let other = Span::new(FileId(1), 0, 10);
        assert_eq!(a.to(other), a);
    }
}
