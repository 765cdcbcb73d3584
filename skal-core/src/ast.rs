//! Arena-allocated syntax tree produced by the parser.
//!
//! Nodes are stored in one `Vec` and addressed by [`NodeId`]. Children are
//! always allocated before their parent, so a parent link can be filled in
//! as soon as the parent is pushed.

use crate::lexer::Token;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    File,
    /// Marker child of a declaration prefixed with `pub`.
    Pub,

    // Declarations
    Struct,
    Field,
    Method,
    Enum,
    EnumMember,
    Fn,
    FnArgs,
    FnArg,
    VarArg,
    TypeHint,
    Extern,
    External,

    // Statements
    Block,
    Bind,
    Rebind,
    BindTargets,
    Call,
    CallArgs,
    CallArg,
    Spread,
    If,
    Elif,
    Else,
    For,
    Iterators,
    Iterables,
    Return,
    Defer,

    // References
    Reference,
    Ident,
    This,
    Index,

    // Values
    ValueList,
    Expr,
    StrLit,
    IntLit,
    BoolLit,
    Nil,
    List,
    EmptyList,
    Group,
    AnonFn,
    Operator,
    /// `!` or unary `-`, kept in value position.
    Unary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: SyntaxKind,
    pub text: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub token: Option<Token>,
}

#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    /// Allocates a node owning `children` and links them back to it.
    pub fn push(
        &mut self,
        kind: SyntaxKind,
        text: impl Into<String>,
        token: Option<Token>,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in &children {
            self.nodes[child.0 as usize].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            text: text.into(),
            children,
            parent: None,
            token,
        });
        id
    }

    pub fn leaf(&mut self, kind: SyntaxKind, token: Token) -> NodeId {
        let text = token.text.clone();
        self.push(kind, text, Some(token), Vec::new())
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> SyntaxKind {
        self.node(id).kind
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// First child of the given kind.
    pub fn child(&self, id: NodeId, kind: SyntaxKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == kind)
    }

    pub fn children_of_kind(&self, id: NodeId, kind: SyntaxKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.kind(*child) == kind)
    }

    pub fn is_public(&self, id: NodeId) -> bool {
        self.child(id, SyntaxKind::Pub).is_some()
    }

    /// Span of the node's own token, or of its first descendant with one.
    pub fn span(&self, id: NodeId) -> Option<Span> {
        let node = self.node(id);
        if let Some(token) = &node.token {
            return Some(token.span());
        }
        node.children.iter().find_map(|child| self.span(*child))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::span::FileId;

    #[test]
    fn links_children_to_parent() {
        let tokens = lex(FileId(0), "a").expect("lex");
        let mut ast = Ast::new();
        let ident = ast.leaf(SyntaxKind::Ident, tokens[0].clone());
        let reference = ast.push(SyntaxKind::Reference, "", None, vec![ident]);

        assert_eq!(ast.parent(ident), Some(reference));
        assert_eq!(ast.child(reference, SyntaxKind::Ident), Some(ident));
        assert_eq!(ast.text(ident), "a");
        assert_eq!(ast.span(reference), Some(tokens[0].span()));
    }
}
