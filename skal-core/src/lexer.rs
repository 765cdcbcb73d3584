//! Lexer for Skal source files.
//!
//! A single forward scan with one character of lookahead. The lexer
//! produces every token of a file up front; the token stream in
//! `token_stream` then gives the parser a cursor over that list.

use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::span::{FileId, Position, SourceMap, Span};

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Identifier,
    IntLiteral,
    StringLiteral,

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Semi,     // ;
    Colon,    // :
    Dot,      // .
    Assign,   // =
    Bang,     // !

    // Operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Less,      // <
    Greater,   // >
    LessEq,    // <=
    GreaterEq, // >=
    EqEq,      // ==
    NotEq,     // !=
    AndAnd,    // &&
    OrOr,      // ||
    Concat,    // ..

    // Compound punctuation
    Arrow,     // ->
    Ellipsis,  // ...
    EmptyList, // []

    // Keywords
    New,
    Pub,
    Let,
    In,
    For,
    If,
    Elif,
    Else,
    Return,
    This,
    Fn,
    Enum,
    Struct,
    True,
    False,
    Import,
    Defer,
    Extern,
    As,
    Nil,
    Int,
    Bool,
    Str,
}

impl TokenKind {
    /// Binary operators allowed between two values.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Less
                | TokenKind::Greater
                | TokenKind::LessEq
                | TokenKind::GreaterEq
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::Concat
        )
    }

    fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of file",
            TokenKind::Identifier => "identifier",
            TokenKind::IntLiteral => "number",
            TokenKind::StringLiteral => "string",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::Assign => "`=`",
            TokenKind::Bang => "`!`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Less => "`<`",
            TokenKind::Greater => "`>`",
            TokenKind::LessEq => "`<=`",
            TokenKind::GreaterEq => "`>=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::Concat => "`..`",
            TokenKind::Arrow => "`->`",
            TokenKind::Ellipsis => "`...`",
            TokenKind::EmptyList => "`[]`",
            TokenKind::New => "`new`",
            TokenKind::Pub => "`pub`",
            TokenKind::Let => "`let`",
            TokenKind::In => "`in`",
            TokenKind::For => "`for`",
            TokenKind::If => "`if`",
            TokenKind::Elif => "`elif`",
            TokenKind::Else => "`else`",
            TokenKind::Return => "`return`",
            TokenKind::This => "`this`",
            TokenKind::Fn => "`fn`",
            TokenKind::Enum => "`enum`",
            TokenKind::Struct => "`struct`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Import => "`import`",
            TokenKind::Defer => "`defer`",
            TokenKind::Extern => "`extern`",
            TokenKind::As => "`as`",
            TokenKind::Nil => "`nil`",
            TokenKind::Int => "`int`",
            TokenKind::Bool => "`bool`",
            TokenKind::Str => "`str`",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single token.
///
/// For string literals `text` holds the contents between the quotes,
/// escapes left as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub file: FileId,
    pub start: Position,
    pub end: Position,
}

impl Token {
    pub fn span(&self) -> Span {
        Span::new(self.file, self.start.offset as u32, self.end.offset as u32)
    }

    /// The full source line the token starts on.
    pub fn source_line<'a>(&self, sources: &'a SourceMap) -> Option<&'a str> {
        sources.line_text(self.file, self.start.line)
    }
}

/// Lex a source string into tokens, ending with an `Eof` token.
pub fn lex(file: FileId, source: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer {
        file,
        source,
        chars: source.as_bytes(),
        index: 0,
        line: 1,
        column: 1,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'src> {
    file: FileId,
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<(), CoreError> {
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }

            let start = self.position();
            match ch {
                b'#' => self.skip_line(),
                b'(' => self.single(TokenKind::LParen, start),
                b')' => self.single(TokenKind::RParen, start),
                b'{' => self.single(TokenKind::LBrace, start),
                b'}' => self.single(TokenKind::RBrace, start),
                b']' => self.single(TokenKind::RBracket, start),
                b',' => self.single(TokenKind::Comma, start),
                b';' => self.single(TokenKind::Semi, start),
                b':' => self.single(TokenKind::Colon, start),
                b'+' => self.single(TokenKind::Plus, start),
                b'*' => self.single(TokenKind::Star, start),
                b'/' => self.single(TokenKind::Slash, start),
                b'[' => {
                    if self.peek_next() == Some(b']') {
                        self.double(TokenKind::EmptyList, start)
                    } else {
                        self.single(TokenKind::LBracket, start)
                    }
                }
                b'-' => {
                    if self.peek_next() == Some(b'>') {
                        self.double(TokenKind::Arrow, start)
                    } else {
                        self.single(TokenKind::Minus, start)
                    }
                }
                b'.' => {
                    if self.peek_next() == Some(b'.') {
                        self.consume_char();
                        self.consume_char();
                        if self.peek_char() == Some(b'.') {
                            self.consume_char();
                            self.push(TokenKind::Ellipsis, start);
                        } else {
                            self.push(TokenKind::Concat, start);
                        }
                    } else {
                        self.single(TokenKind::Dot, start)
                    }
                }
                b'=' => self.with_eq(TokenKind::Assign, TokenKind::EqEq, start),
                b'!' => self.with_eq(TokenKind::Bang, TokenKind::NotEq, start),
                b'<' => self.with_eq(TokenKind::Less, TokenKind::LessEq, start),
                b'>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEq, start),
                b'&' | b'|' => {
                    if self.peek_next() == Some(ch) {
                        let kind = if ch == b'&' {
                            TokenKind::AndAnd
                        } else {
                            TokenKind::OrOr
                        };
                        self.double(kind, start)
                    } else {
                        self.consume_char();
                        return Err(self.unknown_symbol(start));
                    }
                }
                b'"' | b'\'' => self.lex_string(ch, start)?,
                b'0'..=b'9' => self.lex_number(start),
                _ => {
                    if is_ident_start(ch) {
                        self.lex_word(start);
                    } else {
                        self.consume_char();
                        while self.peek_char().is_some_and(is_utf8_continuation) {
                            self.consume_char();
                        }
                        return Err(self.unknown_symbol(start));
                    }
                }
            }
        }

        let end = self.position();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            file: self.file,
            start: end,
            end,
        });
        Ok(())
    }

    fn single(&mut self, kind: TokenKind, start: Position) {
        self.consume_char();
        self.push(kind, start);
    }

    fn double(&mut self, kind: TokenKind, start: Position) {
        self.consume_char();
        self.consume_char();
        self.push(kind, start);
    }

    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind, start: Position) {
        if self.peek_next() == Some(b'=') {
            self.double(with_eq, start);
        } else {
            self.single(plain, start);
        }
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let text = self.source[start.offset..self.index].to_string();
        self.push_text(kind, text, start);
    }

    fn push_text(&mut self, kind: TokenKind, text: String, start: Position) {
        let end = self.position();
        self.tokens.push(Token {
            kind,
            text,
            file: self.file,
            start,
            end,
        });
    }

    fn unknown_symbol(&self, start: Position) -> CoreError {
        let text = &self.source[start.offset..self.index];
        let span = Span::new(self.file, start.offset as u32, self.index as u32);
        CoreError::LexError(
            Diagnostic::error(format!("unknown symbol `{text}`"), span).with_code("E0001"),
        )
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn lex_string(&mut self, quote: u8, start: Position) -> Result<(), CoreError> {
        // opening quote
        self.consume_char();

        let content_start = self.index;
        while let Some(ch) = self.peek_char() {
            if ch == quote {
                let text = self.source[content_start..self.index].to_string();
                self.consume_char();
                self.push_text(TokenKind::StringLiteral, text, start);
                return Ok(());
            }
            if ch == b'\\' {
                self.consume_char();
                if self.peek_char().is_some() {
                    self.consume_char();
                }
                continue;
            }
            self.consume_char();
        }

        let span = Span::new(self.file, start.offset as u32, self.index as u32);
        Err(CoreError::LexError(
            Diagnostic::error("unterminated string literal", span).with_code("E0002"),
        ))
    }

    fn lex_number(&mut self, start: Position) {
        self.consume_digits();

        // `1..2` is a concatenation, not a decimal.
        if self.peek_char() == Some(b'.') && self.peek_next() != Some(b'.') {
            self.consume_char();
            self.consume_digits();
        }

        self.push(TokenKind::IntLiteral, start);
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.consume_char();
        }
    }

    fn lex_word(&mut self, start: Position) {
        while self.peek_char().is_some_and(is_ident_continue) {
            self.consume_char();
        }

        let text = &self.source[start.offset..self.index];
        let kind = match text {
            "new" => TokenKind::New,
            "pub" => TokenKind::Pub,
            "let" => TokenKind::Let,
            "in" => TokenKind::In,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "return" => TokenKind::Return,
            "this" => TokenKind::This,
            "fn" => TokenKind::Fn,
            "enum" => TokenKind::Enum,
            "struct" => TokenKind::Struct,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "import" => TokenKind::Import,
            "defer" => TokenKind::Defer,
            "extern" => TokenKind::Extern,
            "as" => TokenKind::As,
            "nil" => TokenKind::Nil,
            "int" => TokenKind::Int,
            "bool" => TokenKind::Bool,
            "str" => TokenKind::Str,
            _ => TokenKind::Identifier,
        };

        // Leading imports are handled by the import resolver. One that
        // shows up after code is kept so the parser can reject it.
        if kind == TokenKind::Import && self.tokens.is_empty() {
            self.skip_line();
            return;
        }

        self.push(kind, start);
    }

    fn position(&self) -> Position {
        Position {
            offset: self.index,
            line: self.line,
            column: self.column,
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        let Some(ch) = self.peek_char() else {
            return;
        };
        self.index += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if !is_utf8_continuation(ch) {
            self.column += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

fn is_utf8_continuation(ch: u8) -> bool {
    ch & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(FileId(0), source)
            .expect("lex")
            .into_iter()
            .map(|tok| tok.kind)
            .collect()
    }

    #[test]
    fn lexes_bind_statement() {
        let tokens = lex(FileId(0), "let x = 'hi'").expect("lex");
        let pairs: Vec<_> = tokens
            .iter()
            .map(|tok| (tok.kind, tok.text.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::Let, "let"),
                (TokenKind::Identifier, "x"),
                (TokenKind::Assign, "="),
                (TokenKind::StringLiteral, "hi"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn prefers_longest_symbols() {
        assert_eq!(
            kinds("-> ... .. . [] [ >= > <= < != ! == = && ||"),
            vec![
                TokenKind::Arrow,
                TokenKind::Ellipsis,
                TokenKind::Concat,
                TokenKind::Dot,
                TokenKind::EmptyList,
                TokenKind::LBracket,
                TokenKind::GreaterEq,
                TokenKind::Greater,
                TokenKind::LessEq,
                TokenKind::Less,
                TokenKind::NotEq,
                TokenKind::Bang,
                TokenKind::EqEq,
                TokenKind::Assign,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn number_followed_by_concat_keeps_operator() {
        let tokens = lex(FileId(0), "1..x 2.5").expect("lex");
        let texts: Vec<_> = tokens.iter().map(|tok| tok.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "..", "x", "2.5", ""]);
    }

    #[test]
    fn skips_comments_and_leading_imports() {
        assert_eq!(
            kinds("import 'std/http'\n# a comment\nprint(1) # trailing\n"),
            vec![
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::IntLiteral,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keeps_import_after_code() {
        let kinds = kinds("print(1)\nimport 'late'\n");
        assert!(kinds.contains(&TokenKind::Import));
    }

    #[test]
    fn tracks_lines_and_columns() {
        let tokens = lex(FileId(0), "let a\n  fn").expect("lex");
        let fn_token = &tokens[2];
        assert_eq!(fn_token.kind, TokenKind::Fn);
        assert_eq!(fn_token.start.line, 2);
        assert_eq!(fn_token.start.column, 3);
        assert_eq!(fn_token.start.offset, 8);
    }

    #[test]
    fn keeps_escapes_verbatim() {
        let tokens = lex(FileId(0), r#""say \"hi\"" 'it\'s'"#).expect("lex");
        assert_eq!(tokens[0].text, r#"say \"hi\""#);
        assert_eq!(tokens[1].text, r"it\'s");
    }

    #[test]
    fn reports_unterminated_string() {
        let err = lex(FileId(0), "let s = 'oops").unwrap_err();
        match err {
            CoreError::LexError(diag) => {
                assert_eq!(diag.code, Some("E0002"));
                assert_eq!(diag.span, Some(Span::new(FileId(0), 8, 13)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_symbols() {
        for source in ["a & b", "a | b", "let x = $"] {
            let err = lex(FileId(0), source).unwrap_err();
            assert!(
                matches!(&err, CoreError::LexError(diag) if diag.code == Some("E0001")),
                "{source}: {err:?}"
            );
        }
    }

    #[test]
    fn relexing_is_stable() {
        let source = "struct P { x; y }\nfn P.len() { return this.x + this.y }\n";
        let first = lex(FileId(0), source).expect("lex");
        let second = lex(FileId(0), source).expect("lex");
        assert_eq!(first, second);
    }
}
