//! Semantic builder: turns the syntax tree into [`Member`] entities.
//!
//! The parser guarantees the node shapes this module reads. A shape it
//! does not expect is an internal error, never a user error.

use tracing::trace;

use crate::ast::{Ast, NodeId, SyntaxKind};
use crate::entity::{
    Base, Bind, Call, CallArg, Elif, Enum, EnumMember, Expr, External, Field, Fn, FnArg, FnBody,
    For, ForMode, If, IndexPart, Literal, LiteralKind, Member, Operator, OperatorClass, Parent,
    ParentKind, PathSegment, RefPath, Reference, Return, Statement, Struct, Value,
};
use crate::error::CoreError;
use crate::types::TypeName;

/// Build the member list of one parsed file.
pub fn build(ast: &Ast) -> Result<Vec<Member>, CoreError> {
    let root = ast
        .root()
        .ok_or_else(|| CoreError::CompilerError("syntax tree has no root".into()))?;
    let mut builder = Builder { ast, parent: None };
    let members = ast
        .children(root)
        .iter()
        .map(|id| builder.member(*id))
        .collect::<Result<Vec<_>, _>>()?;
    trace!(members = members.len(), "built semantic members");
    Ok(members)
}

struct Builder<'a> {
    ast: &'a Ast,
    /// Innermost enclosing declaration while building nested entities.
    parent: Option<Parent>,
}

impl<'a> Builder<'a> {
    fn member(&mut self, id: NodeId) -> Result<Member, CoreError> {
        match self.ast.kind(id) {
            SyntaxKind::Struct => Ok(Member::Struct(self.build_struct(id)?)),
            SyntaxKind::Enum => Ok(Member::Enum(self.build_enum(id)?)),
            SyntaxKind::Fn => Ok(Member::Fn(self.build_fn(id, false)?)),
            SyntaxKind::Bind | SyntaxKind::Rebind => Ok(Member::Bind(self.build_bind(id)?)),
            SyntaxKind::Call => Ok(Member::Call(self.build_call(id)?)),
            SyntaxKind::For => Ok(Member::For(self.build_for(id)?)),
            SyntaxKind::If => Ok(Member::If(self.build_if(id)?)),
            SyntaxKind::Extern => Ok(Member::Extern(self.build_extern(id)?)),
            other => Err(self.unexpected("top-level member", other)),
        }
    }

    fn base(&self, id: NodeId, path: RefPath) -> Base {
        Base {
            path,
            public: self.ast.is_public(id),
            parent: self.parent.clone(),
            span: self.ast.span(id),
        }
    }

    fn with_parent<T>(
        &mut self,
        parent: Parent,
        f: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let saved = self.parent.replace(parent);
        let result = f(self);
        self.parent = saved;
        result
    }

    // -----------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------

    fn build_struct(&mut self, id: NodeId) -> Result<Struct, CoreError> {
        let name = self.ast.text(id).to_string();
        let base = self.base(id, RefPath::ident(name.clone()));
        let parent = Parent {
            kind: ParentKind::Struct,
            name,
        };

        let (fields, methods) = self.with_parent(parent, |this| {
            let mut fields = Vec::new();
            let mut methods = Vec::new();
            for child in this.children(id) {
                match this.ast.kind(*child) {
                    SyntaxKind::Pub => {}
                    SyntaxKind::Field => fields.push(Field {
                        base: this.base(*child, RefPath::ident(this.ast.text(*child))),
                    }),
                    SyntaxKind::Method => {
                        let is_constructor = this.ast.text(*child) == "new";
                        methods.push(this.build_fn(*child, is_constructor)?);
                    }
                    other => return Err(this.unexpected("struct body", other)),
                }
            }
            Ok((fields, methods))
        })?;

        let has_custom_constructor = methods.iter().any(|m| m.is_constructor);
        Ok(Struct {
            base,
            fields,
            methods,
            has_custom_constructor,
        })
    }

    fn build_enum(&mut self, id: NodeId) -> Result<Enum, CoreError> {
        let name = self.ast.text(id).to_string();
        let base = self.base(id, RefPath::ident(name.clone()));
        let parent = Parent {
            kind: ParentKind::Enum,
            name,
        };

        let members = self.with_parent(parent, |this| {
            this.nodes_of_kind(id, SyntaxKind::EnumMember)
                .into_iter()
                .map(|member| {
                    let value = this.required_child(member, 0)?;
                    Ok(EnumMember {
                        base: this.base(member, RefPath::ident(this.ast.text(member))),
                        value: this.literal(value)?,
                    })
                })
                .collect::<Result<Vec<_>, CoreError>>()
        })?;

        Ok(Enum { base, members })
    }

    fn build_fn(&mut self, id: NodeId, is_constructor: bool) -> Result<Fn, CoreError> {
        let path_node = self.required(id, SyntaxKind::Reference)?;
        let path = self.reference_path(path_node)?;
        let base = self.base(id, path);
        let args = self.fn_args(self.required(id, SyntaxKind::FnArgs)?);
        let return_hint = self
            .ast
            .child(id, SyntaxKind::TypeHint)
            .map(|hint| TypeName::from_hint(self.ast.text(hint)));

        let parent = Parent {
            kind: ParentKind::Fn,
            name: base.path.to_string(),
        };
        let block_node = self.required(id, SyntaxKind::Block)?;
        let block = self.with_parent(parent, |this| this.block(block_node))?;

        Ok(Fn {
            base,
            args,
            return_hint,
            body: FnBody::Block(block),
            is_constructor,
        })
    }

    fn fn_args(&self, id: NodeId) -> Vec<FnArg> {
        self.children(id)
            .iter()
            .map(|arg| FnArg {
                base: self.base(*arg, RefPath::ident(self.ast.text(*arg))),
                hint: self
                    .ast
                    .child(*arg, SyntaxKind::TypeHint)
                    .map(|hint| TypeName::from_hint(self.ast.text(hint))),
                vararg: self.ast.kind(*arg) == SyntaxKind::VarArg,
            })
            .collect()
    }

    fn build_extern(&mut self, id: NodeId) -> Result<Vec<External>, CoreError> {
        self.children(id)
            .iter()
            .map(|external| {
                let alias = self.ast.text(*external).to_string();
                let target = self.reference_path(self.required(*external, SyntaxKind::Reference)?)?;
                Ok(External {
                    base: self.base(*external, RefPath::ident(alias.clone())),
                    alias,
                    target,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn block(&mut self, id: NodeId) -> Result<Vec<Statement>, CoreError> {
        self.children(id)
            .iter()
            .map(|stmt| self.statement(*stmt))
            .collect()
    }

    fn statement(&mut self, id: NodeId) -> Result<Statement, CoreError> {
        match self.ast.kind(id) {
            SyntaxKind::Return => {
                let values = match self.ast.child(id, SyntaxKind::ValueList) {
                    Some(list) => self.value_list(list)?,
                    None => Vec::new(),
                };
                Ok(Statement::Return(Return {
                    values,
                    span: self.ast.span(id),
                }))
            }
            SyntaxKind::For => Ok(Statement::For(self.build_for(id)?)),
            SyntaxKind::Call => Ok(Statement::Call(self.build_call(id)?)),
            SyntaxKind::If => Ok(Statement::If(self.build_if(id)?)),
            SyntaxKind::Bind | SyntaxKind::Rebind => Ok(Statement::Bind(self.build_bind(id)?)),
            SyntaxKind::Fn => Ok(Statement::Fn(self.build_fn(id, false)?)),
            SyntaxKind::Defer => {
                let inner = self.required_child(id, 0)?;
                Ok(Statement::Defer(Box::new(self.statement(inner)?)))
            }
            other => Err(self.unexpected("statement", other)),
        }
    }

    fn build_bind(&mut self, id: NodeId) -> Result<Bind, CoreError> {
        let targets = self.children(self.required(id, SyntaxKind::BindTargets)?)
            .iter()
            .map(|target| self.reference_path(*target))
            .collect::<Result<Vec<_>, _>>()?;
        let values = match self.ast.child(id, SyntaxKind::ValueList) {
            Some(list) => self.value_list(list)?,
            None => Vec::new(),
        };
        let path = targets.first().cloned().unwrap_or_default();
        Ok(Bind {
            base: self.base(id, path),
            targets,
            values,
            rebind: self.ast.kind(id) == SyntaxKind::Rebind,
        })
    }

    fn build_call(&mut self, id: NodeId) -> Result<Call, CoreError> {
        let callee = self.reference_path(self.required(id, SyntaxKind::Reference)?)?;
        let args_node = self.required(id, SyntaxKind::CallArgs)?;
        let args = self.children(args_node)
            .iter()
            .map(|arg| {
                let value = self.expr(self.required(*arg, SyntaxKind::Expr)?)?;
                Ok(CallArg {
                    value,
                    spread: self.ast.child(*arg, SyntaxKind::Spread).is_some(),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;
        Ok(Call {
            base: self.base(id, callee),
            args,
        })
    }

    fn build_for(&mut self, id: NodeId) -> Result<For, CoreError> {
        let mode = match self.ast.text(id) {
            "in" => ForMode::Each,
            _ => ForMode::Range,
        };
        let iterators = self.children(self.required(id, SyntaxKind::Iterators)?)
            .iter()
            .map(|it| self.reference_path(*it))
            .collect::<Result<Vec<_>, _>>()?;
        let iterables = self.children(self.required(id, SyntaxKind::Iterables)?)
            .iter()
            .map(|it| self.expr(*it))
            .collect::<Result<Vec<_>, _>>()?;
        let block = self.block(self.required(id, SyntaxKind::Block)?)?;
        let path = iterators.first().cloned().unwrap_or_default();
        Ok(For {
            base: self.base(id, path),
            mode,
            iterators,
            iterables,
            block,
        })
    }

    fn build_if(&mut self, id: NodeId) -> Result<If, CoreError> {
        let condition = self.expr(self.required(id, SyntaxKind::Expr)?)?;
        let block = self.block(self.required(id, SyntaxKind::Block)?)?;

        let mut elifs = Vec::new();
        for elif in self.nodes_of_kind(id, SyntaxKind::Elif) {
            elifs.push(Elif {
                condition: self.expr(self.required(elif, SyntaxKind::Expr)?)?,
                block: self.block(self.required(elif, SyntaxKind::Block)?)?,
            });
        }

        let otherwise = match self.ast.child(id, SyntaxKind::Else) {
            Some(node) => Some(self.block(self.required(node, SyntaxKind::Block)?)?),
            None => None,
        };

        Ok(If {
            base: self.base(id, RefPath::default()),
            condition,
            block,
            elifs,
            otherwise,
        })
    }

    // -----------------------------------------------------------------
    // References and values
    // -----------------------------------------------------------------

    fn reference_path(&self, id: NodeId) -> Result<RefPath, CoreError> {
        let segments = self.children(id)
            .iter()
            .map(|segment| match self.ast.kind(*segment) {
                SyntaxKind::Ident => Ok(PathSegment::Ident(self.ast.text(*segment).to_string())),
                SyntaxKind::This => Ok(PathSegment::SelfRef),
                SyntaxKind::Index => self.children(*segment)
                    .iter()
                    .map(|part| match self.ast.kind(*part) {
                        SyntaxKind::Ident => Ok(IndexPart::Ident(self.ast.text(*part).to_string())),
                        SyntaxKind::This => Ok(IndexPart::SelfRef),
                        _ => Ok(IndexPart::Literal(self.literal(*part)?)),
                    })
                    .collect::<Result<Vec<_>, CoreError>>()
                    .map(PathSegment::Index),
                other => Err(self.unexpected("reference segment", other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RefPath::new(segments))
    }

    fn value_list(&mut self, id: NodeId) -> Result<Vec<Expr>, CoreError> {
        self.children(id)
            .iter()
            .map(|expr| self.expr(*expr))
            .collect()
    }

    fn expr(&mut self, id: NodeId) -> Result<Expr, CoreError> {
        let values = self.children(id)
            .iter()
            .map(|value| self.value(*value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expr { values })
    }

    fn value(&mut self, id: NodeId) -> Result<Value, CoreError> {
        match self.ast.kind(id) {
            SyntaxKind::StrLit | SyntaxKind::IntLit | SyntaxKind::BoolLit | SyntaxKind::Nil => {
                Ok(Value::Literal(self.literal(id)?))
            }
            SyntaxKind::Reference => Ok(Value::Reference(Reference {
                path: self.reference_path(id)?,
                span: self.ast.span(id),
            })),
            SyntaxKind::Call => Ok(Value::Call(self.build_call(id)?)),
            SyntaxKind::AnonFn => {
                let args = self.fn_args(self.required(id, SyntaxKind::FnArgs)?);
                let body = self.expr(self.required(id, SyntaxKind::Expr)?)?;
                Ok(Value::AnonFn(Box::new(Fn {
                    base: self.base(id, RefPath::default()),
                    args,
                    return_hint: None,
                    body: FnBody::Expr(body),
                    is_constructor: false,
                })))
            }
            SyntaxKind::List => Ok(Value::List(
                self.children(id)
                    .iter()
                    .map(|element| self.expr(*element))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            SyntaxKind::EmptyList => Ok(Value::EmptyList),
            SyntaxKind::Group => Ok(Value::Group(self.expr(self.required_child(id, 0)?)?)),
            SyntaxKind::Operator => Ok(Value::Operator(Operator::binary(self.ast.text(id)))),
            SyntaxKind::Unary => Ok(Value::Operator(Operator {
                class: OperatorClass::Unary,
                text: self.ast.text(id).to_string(),
            })),
            other => Err(self.unexpected("value", other)),
        }
    }

    fn literal(&self, id: NodeId) -> Result<Literal, CoreError> {
        let kind = match self.ast.kind(id) {
            SyntaxKind::StrLit => LiteralKind::Str,
            SyntaxKind::IntLit => LiteralKind::Int,
            SyntaxKind::BoolLit => LiteralKind::Bool,
            SyntaxKind::Nil => LiteralKind::Nil,
            other => return Err(self.unexpected("literal", other)),
        };
        Ok(Literal {
            kind,
            text: self.ast.text(id).to_string(),
        })
    }

    // -----------------------------------------------------------------
    // Shape helpers
    // -----------------------------------------------------------------

    fn children(&self, id: NodeId) -> &'a [NodeId] {
        self.ast.children(id)
    }

    fn nodes_of_kind(&self, id: NodeId, kind: SyntaxKind) -> Vec<NodeId> {
        self.ast.children_of_kind(id, kind).collect()
    }

    fn required(&self, id: NodeId, kind: SyntaxKind) -> Result<NodeId, CoreError> {
        self.ast.child(id, kind).ok_or_else(|| {
            CoreError::CompilerError(format!(
                "{:?} node is missing its {kind:?} child",
                self.ast.kind(id)
            ))
        })
    }

    fn required_child(&self, id: NodeId, index: usize) -> Result<NodeId, CoreError> {
        self.children(id).get(index).copied().ok_or_else(|| {
            CoreError::CompilerError(format!(
                "{:?} node has no child at position {index}",
                self.ast.kind(id)
            ))
        })
    }

    fn unexpected(&self, context: &str, kind: SyntaxKind) -> CoreError {
        CoreError::CompilerError(format!("unexpected {kind:?} node in {context}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::span::FileId;

    fn build_source(source: &str) -> Vec<Member> {
        let ast = parse(lex(FileId(0), source).expect("lex")).expect("parse");
        build(&ast).expect("build")
    }

    #[test]
    fn builds_struct_with_constructor_override() {
        let members = build_source("struct P { x; y; new(a) { this.x = a } area() { return 0 } }");
        let Member::Struct(st) = &members[0] else {
            panic!("expected struct, got {:?}", members[0]);
        };
        assert_eq!(st.base.name(), "P");
        assert_eq!(st.fields.len(), 2);
        assert!(st.has_custom_constructor);
        let ctor = st.constructor().expect("constructor");
        assert_eq!(ctor.args.len(), 1);
        assert_eq!(
            ctor.base.parent,
            Some(Parent {
                kind: ParentKind::Struct,
                name: "P".into()
            })
        );
        assert!(!st.methods[1].is_constructor);
    }

    #[test]
    fn normalises_this_in_paths() {
        let members = build_source("this.a[this.k] = 1");
        let Member::Bind(bind) = &members[0] else {
            panic!("expected bind");
        };
        assert!(bind.rebind);
        assert_eq!(
            bind.targets[0].segments,
            vec![
                PathSegment::SelfRef,
                PathSegment::Ident("a".into()),
                PathSegment::Index(vec![IndexPart::SelfRef, IndexPart::Ident("k".into())]),
            ]
        );
    }

    #[test]
    fn keeps_deferred_statements_in_block() {
        let members = build_source("fn f() { defer print(1)\n defer print(2)\n return }");
        let Member::Fn(func) = &members[0] else {
            panic!("expected fn");
        };
        let FnBody::Block(block) = &func.body else {
            panic!("expected block body");
        };
        let deferred = block
            .iter()
            .filter(|stmt| matches!(stmt, Statement::Defer(_)))
            .count();
        assert_eq!(deferred, 2);
        assert!(matches!(block.last(), Some(Statement::Return(_))));
    }

    #[test]
    fn marks_public_members_and_varargs() {
        let members = build_source("pub fn log(level: str, ...parts) {}\nlet x;");
        let Member::Fn(func) = &members[0] else {
            panic!("expected fn");
        };
        assert!(func.base.public);
        assert_eq!(func.args[0].hint, Some(TypeName::Str));
        assert!(func.args[1].vararg);
        assert_eq!(func.vararg().map(|a| a.base.name()), Some("parts"));

        let Member::Bind(bind) = &members[1] else {
            panic!("expected bind");
        };
        assert!(bind.is_declaration());
        assert!(!bind.base.public);
    }

    #[test]
    fn builds_anonymous_fn_values() {
        let members = build_source("let add = (a, b) -> a + b");
        let Member::Bind(bind) = &members[0] else {
            panic!("expected bind");
        };
        let Value::AnonFn(func) = &bind.values[0].values[0] else {
            panic!("expected anonymous fn");
        };
        assert_eq!(func.args.len(), 2);
        assert!(matches!(&func.body, FnBody::Expr(expr) if expr.values.len() == 3));
    }
}
