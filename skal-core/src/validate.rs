//! Symbol validation over the semantic members of a compilation job.
//!
//! Declarations are recorded in an append-only [`FactTable`]; references
//! and calls are then checked against the facts visible from their scope.
//! Every problem becomes a diagnostic. Validation never stops early.

use tracing::debug;

use crate::builtins;
use crate::diagnostic::Diagnostic;
use crate::entity::{
    Bind, Call, Enum, Expr, Fn, FnBody, For, If, Member, PathSegment, RefPath, Statement, Struct,
    Value,
};
use crate::error::CoreError;
use crate::span::{FileId, Span};
use crate::types::{self, TypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Struct,
    Field,
    Method,
    Enum,
    EnumMember,
    Fn,
    FnArg,
    Bind,
    Iterator,
    Extern,
}

/// What a declared name can be used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Struct and enum names.
    Type,
    /// Functions, methods and extern aliases.
    Callable,
    /// Bindings, arguments, iterators, fields and enum members.
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub hint: Option<TypeName>,
    pub vararg: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
}

impl Signature {
    fn of(name: impl Into<String>, func: &Fn) -> Self {
        Signature {
            name: name.into(),
            params: func
                .args
                .iter()
                .map(|arg| Param {
                    name: arg.base.name().to_string(),
                    hint: arg.hint.clone(),
                    vararg: arg.vararg,
                })
                .collect(),
        }
    }

    fn fixed_arity(&self) -> usize {
        self.params.iter().filter(|p| !p.vararg).count()
    }

    fn is_variadic(&self) -> bool {
        self.params.iter().any(|p| p.vararg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructInfo {
    pub name: String,
    pub fields: Vec<String>,
    pub methods: Vec<Signature>,
    /// The `new` override, or the field-wise constructor.
    pub constructor: Signature,
}

impl StructInfo {
    fn of(st: &Struct) -> Self {
        let name = st.base.name().to_string();
        let constructor = match st.constructor() {
            Some(ctor) => Signature::of(name.clone(), ctor),
            None => Signature {
                name: name.clone(),
                params: st
                    .fields
                    .iter()
                    .map(|field| Param {
                        name: field.base.name().to_string(),
                        hint: None,
                        vararg: false,
                    })
                    .collect(),
            },
        };
        StructInfo {
            fields: st.fields.iter().map(|f| f.base.name().to_string()).collect(),
            methods: st
                .methods
                .iter()
                .filter(|m| !m.is_constructor)
                .map(|m| Signature::of(m.base.name(), m))
                .collect(),
            constructor,
            name,
        }
    }

    fn method(&self, name: &str) -> Option<&Signature> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// What the validator needs to know about a declared entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Fn(Signature),
    Struct(StructInfo),
    /// Member names of an enum.
    Enum(Vec<String>),
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub id: String,
    pub kind: DeclKind,
    pub role: Role,
    pub scope: String,
    pub entity: EntityRef,
    pub span: Option<Span>,
}

/// Conjunctive filter over facts. Unset criteria match everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FactFilter<'q> {
    id: Option<&'q str>,
    kind: Option<DeclKind>,
    roles: Option<&'q [Role]>,
    scopes: Option<&'q [String]>,
}

impl<'q> FactFilter<'q> {
    pub fn new() -> Self {
        FactFilter::default()
    }

    pub fn id(mut self, id: &'q str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn kind(mut self, kind: DeclKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn roles(mut self, roles: &'q [Role]) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn scopes(mut self, scopes: &'q [String]) -> Self {
        self.scopes = Some(scopes);
        self
    }

    fn matches(&self, fact: &Fact) -> bool {
        self.id.is_none_or(|id| fact.id == id)
            && self.kind.is_none_or(|kind| fact.kind == kind)
            && self.roles.is_none_or(|roles| roles.contains(&fact.role))
            && self.scopes.is_none_or(|scopes| scopes.contains(&fact.scope))
    }
}

/// Append-only list of declarations, searched linearly.
#[derive(Debug, Default)]
pub struct FactTable {
    facts: Vec<Fact>,
}

impl FactTable {
    pub fn new() -> Self {
        FactTable { facts: Vec::new() }
    }

    pub fn register(&mut self, fact: Fact) {
        self.facts.push(fact);
    }

    pub fn find<'t>(&'t self, filter: FactFilter<'t>) -> impl Iterator<Item = &'t Fact> + 't {
        self.facts.iter().filter(move |fact| filter.matches(fact))
    }

    /// Most recent matching fact, so inner declarations shadow outer ones.
    pub fn latest<'t>(&'t self, filter: FactFilter<'t>) -> Option<&'t Fact> {
        self.facts.iter().rev().find(|fact| filter.matches(fact))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

const GLOBAL_SCOPE: &str = "";

/// Scope suffix for struct members. Method bodies never see it, so fields
/// and methods are only reachable through `this`.
const MEMBER_SCOPE: &str = ".this";

/// Validates every file of one compilation job against a shared fact table.
#[derive(Debug, Default)]
pub struct Validator {
    facts: FactTable,
    diagnostics: Vec<Diagnostic>,
    scopes: Vec<String>,
    current_struct: Option<StructInfo>,
    blocks: usize,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Registers the declarations of one file, then checks its members.
    pub fn validate_file(&mut self, file: FileId, members: &[Member]) {
        let before = self.diagnostics.len();
        self.scopes.push(format!("#{}", file.0));

        for member in members {
            self.register_member(member);
        }
        for member in members {
            self.check_member(member);
        }

        self.scopes.pop();
        debug!(
            file = file.0,
            facts = self.facts.len(),
            diagnostics = self.diagnostics.len() - before,
            "validated file"
        );
    }

    // -----------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------

    fn scope(&self) -> String {
        self.scopes.join("::")
    }

    /// The current scope and all of its ancestors, global scope included.
    fn visible_scopes(&self) -> Vec<String> {
        let mut visible = vec![GLOBAL_SCOPE.to_string()];
        for depth in 1..=self.scopes.len() {
            visible.push(self.scopes[..depth].join("::"));
        }
        visible
    }

    fn in_scope<T>(&mut self, name: String, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(name);
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn block_scope_name(&mut self, kind: &str) -> String {
        self.blocks += 1;
        format!("{kind}{}", self.blocks)
    }

    // -----------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------

    fn declare(
        &mut self,
        id: impl Into<String>,
        kind: DeclKind,
        role: Role,
        public: bool,
        entity: EntityRef,
        span: Option<Span>,
    ) {
        let scope = if public {
            GLOBAL_SCOPE.to_string()
        } else {
            self.scope()
        };
        self.facts.register(Fact {
            id: id.into(),
            kind,
            role,
            scope,
            entity,
            span,
        });
    }

    fn register_member(&mut self, member: &Member) {
        match member {
            Member::Struct(st) => self.register_struct(st),
            Member::Enum(en) => self.register_enum(en),
            Member::Fn(func) => self.register_fn(func),
            Member::Bind(bind) => self.register_bind(bind),
            Member::Extern(externals) => {
                for ext in externals {
                    self.declare(
                        ext.alias.clone(),
                        DeclKind::Extern,
                        Role::Callable,
                        ext.base.public,
                        EntityRef::Opaque,
                        ext.base.span,
                    );
                }
            }
            Member::Call(_) | Member::For(_) | Member::If(_) => {}
        }
    }

    fn register_struct(&mut self, st: &Struct) {
        let info = StructInfo::of(st);
        let name = info.name.clone();
        self.declare(
            name.clone(),
            DeclKind::Struct,
            Role::Type,
            st.base.public,
            EntityRef::Struct(info),
            st.base.span,
        );
        self.in_scope(format!("{name}{MEMBER_SCOPE}"), |v| {
            for field in &st.fields {
                v.declare(
                    field.base.name(),
                    DeclKind::Field,
                    Role::Value,
                    false,
                    EntityRef::Opaque,
                    field.base.span,
                );
            }
            for method in &st.methods {
                v.declare(
                    method.base.name(),
                    DeclKind::Method,
                    Role::Callable,
                    false,
                    EntityRef::Fn(Signature::of(method.base.name(), method)),
                    method.base.span,
                );
            }
        });
    }

    fn register_enum(&mut self, en: &Enum) {
        let name = en.base.name().to_string();
        self.declare(
            name.clone(),
            DeclKind::Enum,
            Role::Type,
            en.base.public,
            EntityRef::Enum(en.members.iter().map(|m| m.base.name().to_string()).collect()),
            en.base.span,
        );
        self.in_scope(name, |v| {
            for member in &en.members {
                v.declare(
                    member.base.name(),
                    DeclKind::EnumMember,
                    Role::Value,
                    false,
                    EntityRef::Opaque,
                    member.base.span,
                );
            }
        });
    }

    fn register_fn(&mut self, func: &Fn) {
        let id = func.base.path.to_string();
        let signature = Signature::of(id.clone(), func);
        self.declare(
            id,
            DeclKind::Fn,
            Role::Callable,
            func.base.public,
            EntityRef::Fn(signature),
            func.base.span,
        );
    }

    fn register_bind(&mut self, bind: &Bind) {
        if bind.rebind {
            return;
        }
        for target in &bind.targets {
            if let Some(name) = target.as_single_ident() {
                self.declare(
                    name,
                    DeclKind::Bind,
                    Role::Value,
                    bind.base.public,
                    EntityRef::Opaque,
                    bind.base.span,
                );
            }
        }
    }

    // -----------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------

    #[track_caller]
    fn report(&mut self, code: &'static str, message: String, span: Option<Span>) {
        let diag = match span {
            Some(span) => Diagnostic::error(message, span),
            None => Diagnostic::unspanned(message),
        };
        self.diagnostics.push(diag.with_code(code));
    }

    fn check_member(&mut self, member: &Member) {
        match member {
            Member::Struct(st) => self.check_struct(st),
            Member::Enum(en) => self.check_enum(en),
            Member::Fn(func) => self.check_fn(func),
            Member::Bind(bind) => self.check_bind(bind),
            Member::Call(call) => self.check_call(call),
            Member::For(nfor) => self.check_for(nfor),
            Member::If(nif) => self.check_if(nif),
            Member::Extern(_) => {}
        }
    }

    fn check_struct(&mut self, st: &Struct) {
        if let Some(extra) = st.methods.iter().filter(|m| m.is_constructor).nth(1) {
            self.report(
                "E0306",
                format!(
                    "struct `{}` declares more than one `new` constructor",
                    st.base.name()
                ),
                extra.base.span,
            );
        }

        let saved = self.current_struct.replace(StructInfo::of(st));
        let name = st.base.name().to_string();
        self.in_scope(name, |v| {
            for method in &st.methods {
                v.check_fn(method);
            }
        });
        self.current_struct = saved;
    }

    fn check_enum(&mut self, en: &Enum) {
        let Some(first) = en.members.first() else {
            return;
        };
        let expected = first.value.type_name();
        for member in &en.members[1..] {
            let actual = member.value.type_name();
            if actual != expected {
                self.report(
                    "E0307",
                    format!(
                        "enum member values must all have the same type: `{}` is {actual}, but `{}` started with {expected}",
                        member.base.name(),
                        en.base.name()
                    ),
                    member.base.span,
                );
            }
        }
    }

    fn check_fn(&mut self, func: &Fn) {
        let name = match func.base.path.to_string() {
            name if name.is_empty() => self.block_scope_name("fn"),
            name => name,
        };
        self.in_scope(name, |v| {
            for arg in &func.args {
                v.declare(
                    arg.base.name(),
                    DeclKind::FnArg,
                    Role::Value,
                    false,
                    EntityRef::Opaque,
                    arg.base.span,
                );
            }
            match &func.body {
                FnBody::Block(block) => v.check_block(block),
                FnBody::Expr(expr) => v.check_expr(expr),
            }
        });
    }

    fn check_block(&mut self, block: &[Statement]) {
        for stmt in block {
            match stmt {
                Statement::Bind(bind) => self.register_bind(bind),
                Statement::Fn(func) => self.register_fn(func),
                _ => {}
            }
        }
        for stmt in block {
            self.check_statement(stmt);
        }
    }

    fn nested_block(&mut self, kind: &str, block: &[Statement]) {
        let name = self.block_scope_name(kind);
        self.in_scope(name, |v| v.check_block(block));
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Return(ret) => {
                for expr in &ret.values {
                    self.check_expr(expr);
                }
            }
            Statement::For(nfor) => self.check_for(nfor),
            Statement::Call(call) => self.check_call(call),
            Statement::If(nif) => self.check_if(nif),
            Statement::Bind(bind) => self.check_bind(bind),
            Statement::Fn(func) => self.check_fn(func),
            Statement::Defer(inner) => self.check_statement(inner),
        }
    }

    fn check_bind(&mut self, bind: &Bind) {
        for expr in &bind.values {
            self.check_expr(expr);
        }
        if bind.rebind {
            for target in &bind.targets {
                self.check_reference(target, bind.base.span, false);
            }
        }
    }

    fn check_for(&mut self, nfor: &For) {
        for expr in &nfor.iterables {
            self.check_expr(expr);
        }
        let name = self.block_scope_name("for");
        self.in_scope(name, |v| {
            for iterator in &nfor.iterators {
                if let Some(id) = iterator.as_single_ident() {
                    v.declare(
                        id,
                        DeclKind::Iterator,
                        Role::Value,
                        false,
                        EntityRef::Opaque,
                        nfor.base.span,
                    );
                }
            }
            v.check_block(&nfor.block);
        });
    }

    fn check_if(&mut self, nif: &If) {
        self.check_expr(&nif.condition);
        self.nested_block("if", &nif.block);
        for elif in &nif.elifs {
            self.check_expr(&elif.condition);
            self.nested_block("elif", &elif.block);
        }
        if let Some(block) = &nif.otherwise {
            self.nested_block("else", block);
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        for value in &expr.values {
            match value {
                Value::Reference(reference) => {
                    self.check_reference(&reference.path, reference.span, false);
                }
                Value::Call(call) => self.check_call(call),
                Value::AnonFn(func) => self.check_fn(func),
                Value::List(items) => {
                    for item in items {
                        self.check_expr(item);
                    }
                }
                Value::Group(inner) => self.check_expr(inner),
                Value::Literal(_) | Value::EmptyList | Value::Operator(_) => {}
            }
        }
    }

    fn check_call(&mut self, call: &Call) {
        let callee = &call.base.path;
        if !self.check_reference(callee, call.base.span, true) {
            return;
        }
        for arg in &call.args {
            self.check_expr(&arg.value);
        }
        if call.args.iter().any(|arg| arg.spread) {
            return;
        }
        if let Some(signature) = self.resolve_signature(callee) {
            self.check_arguments(&signature, call);
        }
    }

    /// Signature of a single-identifier callee or of a `this.method` call.
    fn resolve_signature(&self, callee: &RefPath) -> Option<Signature> {
        if let Some(name) = callee.as_single_ident() {
            let visible = self.visible_scopes();
            let roles = [Role::Callable, Role::Type];
            let filter = FactFilter::new().id(name).scopes(&visible).roles(&roles);
            return match &self.facts.latest(filter)?.entity {
                EntityRef::Fn(signature) => Some(signature.clone()),
                EntityRef::Struct(info) => Some(info.constructor.clone()),
                EntityRef::Enum(_) | EntityRef::Opaque => None,
            };
        }
        if callee.len() == 2 {
            let method = callee.self_member()?;
            return self.current_struct.as_ref()?.method(method).cloned();
        }
        None
    }

    fn check_arguments(&mut self, signature: &Signature, call: &Call) {
        let fixed = signature.fixed_arity();
        let found = call.args.len();
        let arity_ok = if signature.is_variadic() {
            found >= fixed
        } else {
            found == fixed
        };
        if !arity_ok {
            let qualifier = if signature.is_variadic() { "at least " } else { "" };
            self.report(
                "E0302",
                format!(
                    "expected {qualifier}{fixed} argument{} in call to `{}`, found {found}",
                    if fixed == 1 { "" } else { "s" },
                    signature.name
                ),
                call.base.span,
            );
            return;
        }

        for (arg, param) in call.args.iter().zip(&signature.params) {
            if param.vararg {
                break;
            }
            let (Some(lit), Some(hint)) = (arg.value.as_literal(), &param.hint) else {
                continue;
            };
            let actual = lit.type_name();
            if !types::check(&actual, hint).is_ok() {
                self.report(
                    "E0303",
                    format!(
                        "cannot use value of type `{actual}` for `{hint}` argument `{}` in call to `{}`",
                        param.name, signature.name
                    ),
                    call.base.span,
                );
            }
        }
    }

    /// Returns whether the reference resolved.
    fn check_reference(&mut self, path: &RefPath, span: Option<Span>, call_position: bool) -> bool {
        if path.starts_with_self() {
            return self.check_self_reference(path, span, call_position);
        }
        let Some(first) = path.first_ident() else {
            return true;
        };
        if builtins::is_builtin(first) {
            return true;
        }
        let visible = self.visible_scopes();
        let Some(fact) = self
            .facts
            .latest(FactFilter::new().id(first).scopes(&visible))
        else {
            self.report("E0301", format!("undefined reference `{first}`"), span);
            return false;
        };

        // Enum members are known statically; other values are opaque tables.
        let missing = match (&fact.entity, path.segments.get(1)) {
            (EntityRef::Enum(members), Some(PathSegment::Ident(member)))
                if !members.contains(member) =>
            {
                Some(member.clone())
            }
            _ => None,
        };
        if let Some(member) = missing {
            let message = format!("no member `{member}` on enum `{first}`");
            self.report("E0305", message, span);
            return false;
        }
        true
    }

    fn check_self_reference(&mut self, path: &RefPath, span: Option<Span>, call_position: bool) -> bool {
        let Some(info) = &self.current_struct else {
            self.report(
                "E0304",
                "`this` can only be used inside struct methods".to_string(),
                span,
            );
            return false;
        };
        let Some(member) = path.self_member() else {
            return true;
        };
        let is_field = info.fields.iter().any(|f| f == member);
        let is_method = call_position && path.len() == 2 && info.method(member).is_some();
        if is_field || is_method {
            return true;
        }
        let message = format!("no field or method `{member}` on struct `{}`", info.name);
        self.report("E0305", message, span);
        false
    }
}

/// Validate a single file on its own.
pub fn validate(file: FileId, members: &[Member]) -> Result<(), CoreError> {
    let mut validator = Validator::new();
    validator.validate_file(file, members);
    let diagnostics = validator.into_diagnostics();
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(CoreError::ValidationError(diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn members(file: FileId, source: &str) -> Vec<Member> {
        let ast = parse(lex(file, source).expect("lex")).expect("parse");
        build(&ast).expect("build")
    }

    fn diagnostics(source: &str) -> Vec<Diagnostic> {
        match validate(FileId(0), &members(FileId(0), source)) {
            Ok(()) => Vec::new(),
            Err(CoreError::ValidationError(diags)) => diags,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    fn codes(source: &str) -> Vec<&'static str> {
        diagnostics(source)
            .iter()
            .filter_map(|d| d.code)
            .collect()
    }

    #[test]
    fn accepts_valid_program() {
        let source = r#"
extern { string.format as format }
struct Point {
    x; y
    len() int { return this.x + this.y }
    scaled(k: int) { return Point(this.x * k, this.y * k) }
}
enum Color { Red = 1, Green = 2 }
fn describe(p, ...rest) {
    let total = p.len()
    for i = 1, 10 { total = total + i }
    for k, v in rest { print(k, v) }
    if total > 3 { print(format('%d', total)) } else { print(Color.Red) }
    return total
}
describe(Point(1, 2))
describe(Point(1, 2), 3, 4)
"#;
        assert!(diagnostics(source).is_empty(), "{:?}", diagnostics(source));
    }

    #[test]
    fn reports_undefined_reference() {
        let diags = diagnostics("fn f() { print(missing) }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some("E0301"));
        assert_eq!(diags[0].message, "undefined reference `missing`");
        assert!(diags[0].span.is_some());
    }

    #[test]
    fn reports_unknown_callee_once() {
        assert_eq!(codes("nope(1, 2)"), vec!["E0301"]);
    }

    #[test]
    fn checks_arity_against_signature() {
        assert_eq!(codes("fn f(a, b) {}\nf(1)"), vec!["E0302"]);
        assert!(codes("fn f(a, ...rest) {}\nf(1, 2, 3)").is_empty());
        assert_eq!(codes("fn f(a, ...rest) {}\nf()"), vec!["E0302"]);
    }

    #[test]
    fn checks_constructor_arity() {
        assert_eq!(codes("struct P { x; y }\nlet p = P(1)"), vec!["E0302"]);
        assert!(codes("struct P { x; y; new(a) { this.x = a } }\nlet p = P(1)").is_empty());
    }

    #[test]
    fn checks_literal_argument_types() {
        let diags = diagnostics("fn f(n: int) {}\nf('x')\nf(nil)\nf(3)");
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "cannot use value of type `str` for `int` argument `n` in call to `f`"
        );
    }

    #[test]
    fn this_requires_struct_member() {
        assert_eq!(codes("fn f() { return this.x }"), vec!["E0304"]);
        assert_eq!(
            codes("struct P { x; get() { return this.y } }"),
            vec!["E0305"]
        );
        assert!(codes("struct P { x; a() { return this.b() } b() { return this.x } }").is_empty());
        assert_eq!(codes("struct P { x; a() { return this.b } b() {} }"), vec!["E0305"]);
    }

    #[test]
    fn struct_members_need_this() {
        assert_eq!(codes("struct P {\n x\n get() { return x }\n}"), vec!["E0301"]);
        assert_eq!(
            codes("struct P { x; get() { return this.x } other() { return get() } }"),
            vec!["E0301"]
        );
        assert!(codes("struct P { x; get() { return this.x } other() { return this.get() } }").is_empty());
    }

    #[test]
    fn checks_enum_member_segments() {
        let diags = diagnostics("enum Color { Red = 1, Green = 2 }\nprint(Color.Red)\nprint(Color.Blue)");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some("E0305"));
        assert_eq!(diags[0].message, "no member `Blue` on enum `Color`");
        assert!(codes("let t = 1\nprint(t.anything.at_all)").is_empty());
    }

    #[test]
    fn checks_enum_member_kinds() {
        assert_eq!(codes("enum E { A = 1, B = 'two' }"), vec!["E0307"]);
        assert!(codes("enum E { A = true, B = false }").is_empty());
    }

    #[test]
    fn rejects_duplicate_constructors() {
        assert_eq!(
            codes("struct P { x; new(a) { this.x = a } new(b) { this.x = b } }"),
            vec!["E0306"]
        );
    }

    #[test]
    fn block_locals_do_not_leak() {
        assert_eq!(
            codes("fn f() { if true { let inner = 1 } print(inner) }"),
            vec!["E0301"]
        );
        assert_eq!(codes("fn f(a) {}\nprint(a)"), vec!["E0301"]);
    }

    #[test]
    fn public_declarations_are_visible_across_files() {
        let mut validator = Validator::new();
        validator.validate_file(FileId(0), &members(FileId(0), "pub fn shared() {}\nfn hidden() {}"));
        validator.validate_file(FileId(1), &members(FileId(1), "shared()\nhidden()"));
        let diags = validator.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "undefined reference `hidden`");
    }

    #[test]
    fn fact_filters_are_conjunctive() {
        let mut validator = Validator::new();
        validator.validate_file(FileId(0), &members(FileId(0), "struct P { x }\nlet p = 1"));
        let facts = validator.facts();
        assert_eq!(facts.find(FactFilter::new().id("P").kind(DeclKind::Struct)).count(), 1);
        assert_eq!(facts.find(FactFilter::new().id("P").kind(DeclKind::Bind)).count(), 0);
        assert_eq!(facts.find(FactFilter::new().roles(&[Role::Value])).count(), 2);
    }
}
