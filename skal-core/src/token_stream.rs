//! Cursor over a lexed token list.

use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind};
use crate::span::{FileId, Position};

#[derive(Debug)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    /// Wraps `tokens`, appending an `Eof` token if the list lacks one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|tok| tok.kind) != Some(TokenKind::Eof) {
            let (file, end) = tokens
                .last()
                .map(|tok| (tok.file, tok.end))
                .unwrap_or((FileId(0), Position::start()));
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                file,
                start: end,
                end,
            });
        }
        TokenStream { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    /// Token `n` positions ahead of the cursor, clamped to `Eof`.
    pub fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    pub fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.peek_kind())
    }

    pub fn is_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    /// The most recently consumed token.
    pub fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).map(|idx| &self.tokens[idx])
    }

    /// Consumes the current token. The cursor never moves past `Eof`.
    pub fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    pub fn bump_if(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, CoreError> {
        self.expect_one_of(&[kind])
    }

    pub fn expect_one_of(&mut self, kinds: &[TokenKind]) -> Result<Token, CoreError> {
        if self.at_any(kinds) {
            return Ok(self.bump());
        }
        let expected = kinds
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(self.error(format!("expected {expected}, found {}", self.found())))
    }

    /// Whether a token of `kind` appears between the cursor and the end
    /// of the current token's line.
    pub fn line_ahead_contains(&self, kind: TokenKind) -> bool {
        let line = self.peek().start.line;
        self.tokens[self.pos..]
            .iter()
            .take_while(|tok| tok.kind != TokenKind::Eof && tok.start.line == line)
            .any(|tok| tok.kind == kind)
    }

    /// Kind of the token following the parenthesised group at the cursor.
    pub fn look_past_group(&self) -> TokenKind {
        let mut depth = 0usize;
        for (offset, tok) in self.tokens[self.pos..].iter().enumerate() {
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.peek_nth(offset + 1).kind;
                    }
                }
                TokenKind::Eof => return TokenKind::Eof,
                _ => {}
            }
            if depth == 0 {
                return self.peek_kind();
            }
        }
        TokenKind::Eof
    }

    /// Kind of the token following the reference expression at the cursor.
    ///
    /// A reference is `ident` or `this`, optional `[...]` index groups and
    /// further `.`-separated segments. Nothing is consumed.
    pub fn look_past_ref(&self) -> TokenKind {
        let mut n = 0;
        loop {
            if !matches!(
                self.peek_nth(n).kind,
                TokenKind::Identifier | TokenKind::This | TokenKind::New
            ) {
                return self.peek_nth(n).kind;
            }
            n += 1;
            while self.peek_nth(n).kind == TokenKind::LBracket {
                while !matches!(self.peek_nth(n).kind, TokenKind::RBracket | TokenKind::Eof) {
                    n += 1;
                }
                n += 1;
            }
            if self.peek_nth(n).kind != TokenKind::Dot {
                return self.peek_nth(n).kind;
            }
            n += 1;
        }
    }

    /// A parse error at the current token.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::ParseError(Diagnostic::error(message, self.peek().span()).with_code("E0100"))
    }

    fn found(&self) -> String {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Identifier | TokenKind::IntLiteral => format!("`{}`", tok.text),
            TokenKind::StringLiteral => format!("string '{}'", tok.text),
            kind => kind.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn stream(source: &str) -> TokenStream {
        TokenStream::new(lex(FileId(0), source).expect("lex"))
    }

    #[test]
    fn bump_stops_at_eof() {
        let mut ts = stream("a");
        assert_eq!(ts.bump().kind, TokenKind::Identifier);
        assert_eq!(ts.bump().kind, TokenKind::Eof);
        assert_eq!(ts.bump().kind, TokenKind::Eof);
        assert!(ts.is_eof());
    }

    #[test]
    fn bump_if_only_consumes_matching() {
        let mut ts = stream("let x");
        assert!(ts.bump_if(TokenKind::Fn).is_none());
        assert_eq!(ts.bump_if(TokenKind::Let).map(|t| t.kind), Some(TokenKind::Let));
        assert_eq!(ts.peek().text, "x");
    }

    #[test]
    fn expect_reports_found_token() {
        let mut ts = stream("fn 1");
        ts.bump();
        let err = ts.expect(TokenKind::Identifier).unwrap_err();
        assert!(err.to_string().contains("expected identifier, found `1`"), "{err}");
    }

    #[test]
    fn looks_past_references() {
        assert_eq!(stream("a.b[0].c(1)").look_past_ref(), TokenKind::LParen);
        assert_eq!(stream("this.x = 1").look_past_ref(), TokenKind::Assign);
        assert_eq!(stream("a, b = 1, 2").look_past_ref(), TokenKind::Comma);
        assert_eq!(stream("a").look_past_ref(), TokenKind::Eof);
    }

    #[test]
    fn looks_past_parenthesised_groups() {
        assert_eq!(stream("(a, (b)) -> a").look_past_group(), TokenKind::Arrow);
        assert_eq!(stream("(a + b) * 2").look_past_group(), TokenKind::Star);
    }

    #[test]
    fn line_lookahead_stops_at_newline() {
        let ts = stream("(x) -> x\n(y)");
        assert!(ts.line_ahead_contains(TokenKind::Arrow));
        let ts = stream("(y)\n-> x");
        assert!(!ts.line_ahead_contains(TokenKind::Arrow));
    }
}
