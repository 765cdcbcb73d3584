//! Recursive-descent parser from tokens to the arena [`Ast`].
//!
//! One token of lookahead is enough for almost every decision. The two
//! exceptions use a non-consuming scan: statements starting with a
//! reference look past it to tell a call from an assignment, and a `(`
//! in value position looks past its group for an `->`.

use crate::ast::{Ast, NodeId, SyntaxKind};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind};
use crate::token_stream::TokenStream;

/// Parse a complete file.
pub fn parse(tokens: Vec<Token>) -> Result<Ast, CoreError> {
    let mut parser = Parser {
        ts: TokenStream::new(tokens),
        ast: Ast::new(),
    };
    let root = parser.parse_file()?;
    parser.ast.set_root(root);
    Ok(parser.ast)
}

struct Parser {
    ts: TokenStream,
    ast: Ast,
}

const TYPE_HINTS: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::Str,
    TokenKind::Int,
    TokenKind::Bool,
    TokenKind::Fn,
];

impl Parser {
    fn parse_file(&mut self) -> Result<NodeId, CoreError> {
        let mut items = Vec::new();
        loop {
            if self.ts.bump_if(TokenKind::Semi).is_some() {
                continue;
            }
            if self.ts.is_eof() {
                break;
            }
            items.push(self.parse_item()?);
        }
        Ok(self.ast.push(SyntaxKind::File, "", None, items))
    }

    fn parse_item(&mut self) -> Result<NodeId, CoreError> {
        let public = self.parse_pub();
        match self.ts.peek_kind() {
            TokenKind::Enum => self.parse_enum(public),
            TokenKind::Struct => self.parse_struct(public),
            TokenKind::Fn => self.parse_fn(public),
            TokenKind::Let => self.parse_bind(public),
            TokenKind::Extern => {
                self.reject_pub(public)?;
                self.parse_extern()
            }
            TokenKind::If => {
                self.reject_pub(public)?;
                self.parse_if()
            }
            TokenKind::For => {
                self.reject_pub(public)?;
                self.parse_for()
            }
            TokenKind::Identifier | TokenKind::This => {
                self.reject_pub(public)?;
                self.parse_call_or_rebind()
            }
            TokenKind::Defer => Err(self.ts.error("top level deferrals are not allowed")),
            TokenKind::Import => Err(self
                .ts
                .error("import statements must appear before any other code")),
            TokenKind::Return => Err(self.ts.error("`return` is only allowed inside a function body")),
            other => Err(self
                .ts
                .error(format!("expected a declaration or statement, found {other}"))),
        }
    }

    fn parse_pub(&mut self) -> Option<Token> {
        let mut marker = None;
        while let Some(tok) = self.ts.bump_if(TokenKind::Pub) {
            marker = Some(tok);
        }
        marker
    }

    fn reject_pub(&self, public: Option<Token>) -> Result<(), CoreError> {
        match public {
            Some(_) => Err(self.ts.error("`pub` can only mark declarations")),
            None => Ok(()),
        }
    }

    fn pub_marker(&mut self, public: Option<Token>, children: &mut Vec<NodeId>) {
        if let Some(tok) = public {
            let marker = self.ast.leaf(SyntaxKind::Pub, tok);
            children.push(marker);
        }
    }

    // -----------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------

    fn parse_struct(&mut self, public: Option<Token>) -> Result<NodeId, CoreError> {
        self.ts.expect(TokenKind::Struct)?;
        let name = self.ts.expect(TokenKind::Identifier)?;
        self.ts.expect(TokenKind::LBrace)?;

        let mut children = Vec::new();
        self.pub_marker(public, &mut children);
        loop {
            self.skip_separators();
            if self.ts.at(TokenKind::RBrace) {
                break;
            }
            let calls = self.ts.peek_nth(1).kind == TokenKind::LParen;
            match self.ts.peek_kind() {
                TokenKind::Identifier | TokenKind::New if calls => {
                    let tok = self.ts.bump();
                    let ident = self.ast.leaf(SyntaxKind::Ident, tok.clone());
                    let path = self.ast.push(SyntaxKind::Reference, "", None, vec![ident]);
                    children.push(self.parse_fn_rest(SyntaxKind::Method, tok, path, None)?);
                }
                TokenKind::Identifier => {
                    let tok = self.ts.bump();
                    children.push(self.ast.leaf(SyntaxKind::Field, tok));
                }
                other => {
                    return Err(self
                        .ts
                        .error(format!("expected a field or method, found {other}")));
                }
            }
        }
        self.ts.expect(TokenKind::RBrace)?;

        let text = name.text.clone();
        Ok(self.ast.push(SyntaxKind::Struct, text, Some(name), children))
    }

    fn parse_enum(&mut self, public: Option<Token>) -> Result<NodeId, CoreError> {
        self.ts.expect(TokenKind::Enum)?;
        let name = self.ts.expect(TokenKind::Identifier)?;
        self.ts.expect(TokenKind::LBrace)?;

        let mut children = Vec::new();
        self.pub_marker(public, &mut children);
        loop {
            self.skip_separators();
            if self.ts.at(TokenKind::RBrace) {
                break;
            }
            let member = self.ts.expect(TokenKind::Identifier)?;
            self.ts.expect(TokenKind::Assign)?;
            let value = self.ts.expect_one_of(&[
                TokenKind::IntLiteral,
                TokenKind::StringLiteral,
                TokenKind::True,
                TokenKind::False,
            ])?;
            let value = self.literal(value);
            let text = member.text.clone();
            children.push(
                self.ast
                    .push(SyntaxKind::EnumMember, text, Some(member), vec![value]),
            );
        }
        self.ts.expect(TokenKind::RBrace)?;

        let text = name.text.clone();
        Ok(self.ast.push(SyntaxKind::Enum, text, Some(name), children))
    }

    fn parse_fn(&mut self, public: Option<Token>) -> Result<NodeId, CoreError> {
        let keyword = self.ts.expect(TokenKind::Fn)?;
        let mut segments = Vec::new();
        loop {
            let tok = self.ts.expect(TokenKind::Identifier)?;
            segments.push(self.ast.leaf(SyntaxKind::Ident, tok));
            if self.ts.bump_if(TokenKind::Dot).is_none() {
                break;
            }
        }
        let path = self.ast.push(SyntaxKind::Reference, "", None, segments);
        self.parse_fn_rest(SyntaxKind::Fn, keyword, path, public)
    }

    /// Arguments, optional return hint and body of a named function.
    fn parse_fn_rest(
        &mut self,
        kind: SyntaxKind,
        token: Token,
        path: NodeId,
        public: Option<Token>,
    ) -> Result<NodeId, CoreError> {
        let mut children = Vec::new();
        self.pub_marker(public, &mut children);
        children.push(path);

        self.ts.expect(TokenKind::LParen)?;
        children.push(self.parse_fn_args()?);
        self.ts.expect(TokenKind::RParen)?;

        if self.ts.at_any(TYPE_HINTS) {
            let hint = self.ts.bump();
            children.push(self.ast.leaf(SyntaxKind::TypeHint, hint));
        }

        children.push(self.parse_block()?);
        let text = token.text.clone();
        Ok(self.ast.push(kind, text, Some(token), children))
    }

    fn parse_fn_args(&mut self) -> Result<NodeId, CoreError> {
        let mut args = Vec::new();
        while !self.ts.at(TokenKind::RParen) {
            let vararg = self.ts.bump_if(TokenKind::Ellipsis).is_some();
            let name = self.ts.expect(TokenKind::Identifier)?;

            let mut hint = Vec::new();
            if self.ts.bump_if(TokenKind::Colon).is_some() {
                let tok = self.ts.expect_one_of(TYPE_HINTS)?;
                hint.push(self.ast.leaf(SyntaxKind::TypeHint, tok));
            }

            let kind = if vararg {
                SyntaxKind::VarArg
            } else {
                SyntaxKind::FnArg
            };
            let text = name.text.clone();
            args.push(self.ast.push(kind, text, Some(name), hint));

            if self.ts.bump_if(TokenKind::Comma).is_none() {
                break;
            }
            if vararg {
                return Err(self.ts.error("a variadic argument must be the last argument"));
            }
        }
        Ok(self.ast.push(SyntaxKind::FnArgs, "", None, args))
    }

    fn parse_extern(&mut self) -> Result<NodeId, CoreError> {
        let keyword = self.ts.expect(TokenKind::Extern)?;
        self.ts.expect(TokenKind::LBrace)?;

        let mut externals = Vec::new();
        loop {
            self.skip_separators();
            if self.ts.at(TokenKind::RBrace) {
                break;
            }
            let mut segments = Vec::new();
            loop {
                let tok = self.ts.expect(TokenKind::Identifier)?;
                segments.push(self.ast.leaf(SyntaxKind::Ident, tok));
                if self.ts.bump_if(TokenKind::Dot).is_none() {
                    break;
                }
            }
            let path = self.ast.push(SyntaxKind::Reference, "", None, segments);
            self.ts.expect(TokenKind::As)?;
            let alias = self.ts.expect(TokenKind::Identifier)?;
            let text = alias.text.clone();
            externals.push(
                self.ast
                    .push(SyntaxKind::External, text, Some(alias), vec![path]),
            );
        }
        self.ts.expect(TokenKind::RBrace)?;

        Ok(self.ast.push(SyntaxKind::Extern, "", Some(keyword), externals))
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_block(&mut self) -> Result<NodeId, CoreError> {
        let open = self.ts.expect(TokenKind::LBrace)?;
        let mut statements = Vec::new();
        loop {
            if self.ts.bump_if(TokenKind::Semi).is_some() {
                continue;
            }
            if self.ts.at_any(&[TokenKind::RBrace, TokenKind::Eof]) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        self.ts.expect(TokenKind::RBrace)?;
        Ok(self.ast.push(SyntaxKind::Block, "", Some(open), statements))
    }

    fn parse_statement(&mut self) -> Result<NodeId, CoreError> {
        let public = self.parse_pub();
        match self.ts.peek_kind() {
            TokenKind::Let => self.parse_bind(public),
            TokenKind::Fn => self.parse_fn(public),
            kind => {
                self.reject_pub(public)?;
                match kind {
                    TokenKind::If => self.parse_if(),
                    TokenKind::For => self.parse_for(),
                    TokenKind::Return => self.parse_return(),
                    TokenKind::Defer => self.parse_defer(),
                    TokenKind::Identifier | TokenKind::This => self.parse_call_or_rebind(),
                    TokenKind::Struct | TokenKind::Enum | TokenKind::Extern => Err(self
                        .ts
                        .error(format!("{kind} declarations are only allowed at the top level"))),
                    TokenKind::Import => Err(self
                        .ts
                        .error("import statements must appear before any other code")),
                    other => Err(self.ts.error(format!("expected a statement, found {other}"))),
                }
            }
        }
    }

    fn parse_bind(&mut self, public: Option<Token>) -> Result<NodeId, CoreError> {
        let keyword = self.ts.expect(TokenKind::Let)?;
        let mut children = Vec::new();
        self.pub_marker(public, &mut children);
        children.push(self.parse_targets()?);
        if self.ts.bump_if(TokenKind::Assign).is_some() {
            children.push(self.parse_value_list()?);
        }
        Ok(self.ast.push(SyntaxKind::Bind, "", Some(keyword), children))
    }

    fn parse_targets(&mut self) -> Result<NodeId, CoreError> {
        let mut targets = vec![self.parse_ref()?];
        while self.ts.bump_if(TokenKind::Comma).is_some() {
            targets.push(self.parse_ref()?);
        }
        Ok(self.ast.push(SyntaxKind::BindTargets, "", None, targets))
    }

    fn parse_call_or_rebind(&mut self) -> Result<NodeId, CoreError> {
        match self.ts.look_past_ref() {
            TokenKind::LParen => self.parse_call(),
            TokenKind::Assign | TokenKind::Comma => {
                let targets = self.parse_targets()?;
                let assign = self.ts.expect(TokenKind::Assign)?;
                let values = self.parse_value_list()?;
                Ok(self
                    .ast
                    .push(SyntaxKind::Rebind, "", Some(assign), vec![targets, values]))
            }
            _ => {
                // Report at the token that follows the reference.
                self.parse_ref()?;
                Err(self.ts.error(format!(
                    "expected a call or an assignment, found {}",
                    self.ts.peek_kind()
                )))
            }
        }
    }

    fn parse_if(&mut self) -> Result<NodeId, CoreError> {
        let keyword = self.ts.expect(TokenKind::If)?;
        let mut children = vec![self.parse_values()?, self.parse_block()?];

        while let Some(elif) = self.ts.bump_if(TokenKind::Elif) {
            let condition = self.parse_values()?;
            let block = self.parse_block()?;
            children.push(
                self.ast
                    .push(SyntaxKind::Elif, "", Some(elif), vec![condition, block]),
            );
        }

        if let Some(otherwise) = self.ts.bump_if(TokenKind::Else) {
            let block = self.parse_block()?;
            children.push(self.ast.push(SyntaxKind::Else, "", Some(otherwise), vec![block]));
        }

        Ok(self.ast.push(SyntaxKind::If, "", Some(keyword), children))
    }

    fn parse_for(&mut self) -> Result<NodeId, CoreError> {
        let keyword = self.ts.expect(TokenKind::For)?;

        let mut iterators = vec![self.parse_ref()?];
        while self.ts.bump_if(TokenKind::Comma).is_some() {
            iterators.push(self.parse_ref()?);
        }
        let iterator_count = iterators.len();
        let iterators = self.ast.push(SyntaxKind::Iterators, "", None, iterators);

        let mode = self.ts.expect_one_of(&[TokenKind::Assign, TokenKind::In])?;
        let mut iterables = vec![self.parse_values()?];
        while self.ts.bump_if(TokenKind::Comma).is_some() {
            iterables.push(self.parse_values()?);
        }

        if mode.kind == TokenKind::In && iterables.len() != 1 {
            return Err(self.ts.error("a `for ... in` loop takes exactly one iterable"));
        }
        if mode.kind == TokenKind::Assign {
            if iterator_count != 1 {
                return Err(self.ts.error("a range loop takes exactly one iterator"));
            }
            if !(2..=3).contains(&iterables.len()) {
                return Err(self.ts.error("a range loop takes a start, an end and an optional step"));
            }
        }
        let iterables = self.ast.push(SyntaxKind::Iterables, "", None, iterables);
        let block = self.parse_block()?;

        let text = mode.text;
        Ok(self
            .ast
            .push(SyntaxKind::For, text, Some(keyword), vec![iterators, iterables, block]))
    }

    fn parse_return(&mut self) -> Result<NodeId, CoreError> {
        let keyword = self.ts.expect(TokenKind::Return)?;
        let mut children = Vec::new();
        if !self
            .ts
            .at_any(&[TokenKind::RBrace, TokenKind::Semi, TokenKind::Eof])
        {
            children.push(self.parse_value_list()?);
        }
        Ok(self.ast.push(SyntaxKind::Return, "", Some(keyword), children))
    }

    fn parse_defer(&mut self) -> Result<NodeId, CoreError> {
        let keyword = self.ts.expect(TokenKind::Defer)?;
        match self.ts.peek_kind() {
            TokenKind::Defer => Err(self.ts.error("`defer` cannot be nested")),
            TokenKind::Return => Err(self.ts.error("a `return` cannot be deferred")),
            _ => {
                let inner = self.parse_statement()?;
                Ok(self.ast.push(SyntaxKind::Defer, "", Some(keyword), vec![inner]))
            }
        }
    }

    // -----------------------------------------------------------------
    // References, calls and values
    // -----------------------------------------------------------------

    fn parse_ref(&mut self) -> Result<NodeId, CoreError> {
        let mut segments = Vec::new();
        loop {
            let tok = self
                .ts
                .expect_one_of(&[TokenKind::Identifier, TokenKind::This])?;
            let kind = if tok.kind == TokenKind::This {
                SyntaxKind::This
            } else {
                SyntaxKind::Ident
            };
            segments.push(self.ast.leaf(kind, tok));
            while self.ts.at(TokenKind::LBracket) {
                segments.push(self.parse_index()?);
            }
            if self.ts.bump_if(TokenKind::Dot).is_none() {
                break;
            }
        }
        Ok(self.ast.push(SyntaxKind::Reference, "", None, segments))
    }

    fn parse_index(&mut self) -> Result<NodeId, CoreError> {
        let open = self.ts.expect(TokenKind::LBracket)?;
        let mut parts = Vec::new();
        while self.ts.bump_if(TokenKind::RBracket).is_none() {
            let tok = self.ts.expect_one_of(&[
                TokenKind::This,
                TokenKind::IntLiteral,
                TokenKind::StringLiteral,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Identifier,
                TokenKind::Dot,
            ])?;
            let kind = match tok.kind {
                TokenKind::Dot => continue,
                TokenKind::This => SyntaxKind::This,
                TokenKind::Identifier => SyntaxKind::Ident,
                _ => {
                    parts.push(self.literal(tok));
                    continue;
                }
            };
            parts.push(self.ast.leaf(kind, tok));
        }
        if parts.is_empty() {
            return Err(self.ts.error("an index needs a key"));
        }
        Ok(self.ast.push(SyntaxKind::Index, "", Some(open), parts))
    }

    fn parse_call(&mut self) -> Result<NodeId, CoreError> {
        let callee = self.parse_ref()?;
        let open = self.ts.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        while !self.ts.at(TokenKind::RParen) {
            let mut children = vec![self.parse_values()?];
            if let Some(spread) = self.ts.bump_if(TokenKind::Ellipsis) {
                children.push(self.ast.leaf(SyntaxKind::Spread, spread));
            }
            args.push(self.ast.push(SyntaxKind::CallArg, "", None, children));
            if self.ts.bump_if(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.ts.expect(TokenKind::RParen)?;

        let args = self.ast.push(SyntaxKind::CallArgs, "", Some(open), args);
        Ok(self.ast.push(SyntaxKind::Call, "", None, vec![callee, args]))
    }

    fn parse_value_list(&mut self) -> Result<NodeId, CoreError> {
        let mut values = vec![self.parse_values()?];
        while self.ts.bump_if(TokenKind::Comma).is_some() {
            values.push(self.parse_values()?);
        }
        Ok(self.ast.push(SyntaxKind::ValueList, "", None, values))
    }

    /// A flat `value (op value)*` sequence.
    fn parse_values(&mut self) -> Result<NodeId, CoreError> {
        let mut items = self.parse_value()?;
        while self.ts.peek_kind().is_operator() {
            let op = self.ts.bump();
            items.push(self.ast.leaf(SyntaxKind::Operator, op));
            items.extend(self.parse_value()?);
        }
        Ok(self.ast.push(SyntaxKind::Expr, "", None, items))
    }

    fn parse_value(&mut self) -> Result<Vec<NodeId>, CoreError> {
        match self.ts.peek_kind() {
            TokenKind::Bang | TokenKind::Minus => {
                let tok = self.ts.bump();
                let mut items = vec![self.ast.leaf(SyntaxKind::Unary, tok)];
                items.extend(self.parse_value()?);
                Ok(items)
            }
            TokenKind::LParen => {
                if self.ts.line_ahead_contains(TokenKind::Arrow)
                    && self.ts.look_past_group() == TokenKind::Arrow
                {
                    return Ok(vec![self.parse_anon_fn()?]);
                }
                let open = self.ts.bump();
                let inner = self.parse_values()?;
                self.ts.expect(TokenKind::RParen)?;
                Ok(vec![self.ast.push(SyntaxKind::Group, "", Some(open), vec![inner])])
            }
            TokenKind::Identifier | TokenKind::This => {
                if self.ts.look_past_ref() == TokenKind::LParen {
                    Ok(vec![self.parse_call()?])
                } else {
                    Ok(vec![self.parse_ref()?])
                }
            }
            TokenKind::StringLiteral
            | TokenKind::IntLiteral
            | TokenKind::True
            | TokenKind::False => {
                let tok = self.ts.bump();
                Ok(vec![self.literal(tok)])
            }
            TokenKind::Nil => {
                let tok = self.ts.bump();
                Ok(vec![self.ast.leaf(SyntaxKind::Nil, tok)])
            }
            TokenKind::EmptyList => {
                let tok = self.ts.bump();
                Ok(vec![self.ast.leaf(SyntaxKind::EmptyList, tok)])
            }
            TokenKind::LBracket => {
                let open = self.ts.bump();
                let mut elements = Vec::new();
                while !self.ts.at(TokenKind::RBracket) {
                    elements.push(self.parse_values()?);
                    if self.ts.bump_if(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                self.ts.expect(TokenKind::RBracket)?;
                Ok(vec![self.ast.push(SyntaxKind::List, "", Some(open), elements)])
            }
            other => Err(self.ts.error(format!("expected a value, found {other}"))),
        }
    }

    fn parse_anon_fn(&mut self) -> Result<NodeId, CoreError> {
        let open = self.ts.expect(TokenKind::LParen)?;
        let args = self.parse_fn_args()?;
        self.ts.expect(TokenKind::RParen)?;
        self.ts.expect(TokenKind::Arrow)?;
        let body = self.parse_values()?;
        Ok(self.ast.push(SyntaxKind::AnonFn, "", Some(open), vec![args, body]))
    }

    fn literal(&mut self, tok: Token) -> NodeId {
        let kind = match tok.kind {
            TokenKind::StringLiteral => SyntaxKind::StrLit,
            TokenKind::True | TokenKind::False => SyntaxKind::BoolLit,
            _ => SyntaxKind::IntLit,
        };
        self.ast.leaf(kind, tok)
    }

    fn skip_separators(&mut self) {
        while self.ts.bump_if(TokenKind::Semi).is_some() || self.ts.bump_if(TokenKind::Comma).is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::span::FileId;

    fn parse_source(source: &str) -> Result<Ast, CoreError> {
        parse(lex(FileId(0), source)?)
    }

    fn items(ast: &Ast) -> Vec<SyntaxKind> {
        let root = ast.root().expect("root");
        ast.children(root).iter().map(|id| ast.kind(*id)).collect()
    }

    fn parse_error(source: &str) -> String {
        match parse_source(source) {
            Err(CoreError::ParseError(diag)) => diag.message,
            other => panic!("expected parse error for {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_top_level_items() {
        let ast = parse_source(
            "struct P { x; y }\nenum E { A = 1, B = 2 }\nfn f() {}\nlet a = 1\nf()\na = 2\nextern { string.format as fmt }\n",
        )
        .expect("parse");
        assert_eq!(
            items(&ast),
            vec![
                SyntaxKind::Struct,
                SyntaxKind::Enum,
                SyntaxKind::Fn,
                SyntaxKind::Bind,
                SyntaxKind::Call,
                SyntaxKind::Rebind,
                SyntaxKind::Extern,
            ]
        );
    }

    #[test]
    fn keeps_operators_in_textual_order() {
        let ast = parse_source("let a = 1 + b * -2").expect("parse");
        let root = ast.root().expect("root");
        let bind = ast.children(root)[0];
        let values = ast.child(bind, SyntaxKind::ValueList).expect("values");
        let expr = ast.children(values)[0];
        let kinds: Vec<_> = ast.children(expr).iter().map(|id| ast.kind(*id)).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::IntLit,
                SyntaxKind::Operator,
                SyntaxKind::Reference,
                SyntaxKind::Operator,
                SyntaxKind::Unary,
                SyntaxKind::IntLit,
            ]
        );
    }

    #[test]
    fn detects_anonymous_functions() {
        let ast = parse_source("map(items, (x) -> x * 2)").expect("parse");
        let root = ast.root().expect("root");
        let call = ast.children(root)[0];
        let args = ast.child(call, SyntaxKind::CallArgs).expect("args");
        let second = ast.children(args)[1];
        let expr = ast.children(second)[0];
        assert_eq!(ast.kind(ast.children(expr)[0]), SyntaxKind::AnonFn);

        let ast = parse_source("print((a + b), c)").expect("parse");
        let root = ast.root().expect("root");
        let args = ast.child(ast.children(root)[0], SyntaxKind::CallArgs).expect("args");
        let expr = ast.children(ast.children(args)[0])[0];
        assert_eq!(ast.kind(ast.children(expr)[0]), SyntaxKind::Group);
    }

    #[test]
    fn struct_body_splits_fields_and_methods() {
        let ast = parse_source("pub struct P { x, y; new(a) { this.x = a } len() int { return 1 } }")
            .expect("parse");
        let root = ast.root().expect("root");
        let st = ast.children(root)[0];
        assert!(ast.is_public(st));
        assert_eq!(ast.children_of_kind(st, SyntaxKind::Field).count(), 2);
        let methods: Vec<_> = ast
            .children_of_kind(st, SyntaxKind::Method)
            .map(|id| ast.text(id).to_string())
            .collect();
        assert_eq!(methods, vec!["new", "len"]);
    }

    #[test]
    fn empty_call_has_no_arguments() {
        let ast = parse_source("f()").expect("parse");
        let root = ast.root().expect("root");
        let args = ast.child(ast.children(root)[0], SyntaxKind::CallArgs).expect("args");
        assert!(ast.children(args).is_empty());
    }

    #[test]
    fn rejects_top_level_defer() {
        assert_eq!(parse_error("defer print(1)"), "top level deferrals are not allowed");
    }

    #[test]
    fn rejects_late_imports() {
        assert_eq!(
            parse_error("print(1)\nimport 'x'"),
            "import statements must appear before any other code"
        );
    }

    #[test]
    fn rejects_bare_reference_statement() {
        assert!(parse_error("fn f() { a.b }").starts_with("expected a call or an assignment"));
    }

    #[test]
    fn rejects_empty_or_dangling_values() {
        assert!(parse_error("let a =").starts_with("expected a value"));
        assert!(parse_error("let a = 1 +").starts_with("expected a value"));
    }

    #[test]
    fn for_in_takes_one_iterable() {
        assert_eq!(
            parse_error("for k, v in a, b {}"),
            "a `for ... in` loop takes exactly one iterable"
        );
        assert!(parse_source("for i = 1, 10 {}").is_ok());
        assert!(parse_source("for k, v in items {}").is_ok());
    }

    #[test]
    fn parses_index_segments() {
        let ast = parse_source("a[this.key].b = t['k']").expect("parse");
        let root = ast.root().expect("root");
        let rebind = ast.children(root)[0];
        let targets = ast.child(rebind, SyntaxKind::BindTargets).expect("targets");
        let reference = ast.children(targets)[0];
        let kinds: Vec<_> = ast.children(reference).iter().map(|id| ast.kind(*id)).collect();
        assert_eq!(kinds, vec![SyntaxKind::Ident, SyntaxKind::Index, SyntaxKind::Ident]);
    }

    #[test]
    fn records_parent_links() {
        let ast = parse_source("fn f() { g() }").expect("parse");
        let root = ast.root().expect("root");
        let func = ast.children(root)[0];
        let block = ast.child(func, SyntaxKind::Block).expect("block");
        assert_eq!(ast.parent(block), Some(func));
        assert_eq!(ast.parent(func), Some(root));
    }
}
