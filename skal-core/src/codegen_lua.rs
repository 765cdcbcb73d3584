//! Lua code generation.
//!
//! Every file of a job is emitted on its own. The entry file's members
//! sit directly in the application function; an import is wrapped in a
//! `do` block so its locals stay private to it. [`link`] wraps the
//! emitted files in the environment prologue and epilogue.

use tracing::debug;

use crate::builtins::translate;
use crate::entity::{
    Bind, Call, Enum, Expr, External, Fn, FnBody, For, ForMode, If, IndexPart, Literal,
    LiteralKind, Member, OperatorClass, PathSegment, RefPath, Return, Statement, Struct, Value,
};
use crate::scope::{ScopeStack, indent, reindent};

pub const PROLOGUE: &str = "-- Create the app environment.
local __ENV__ = { __index = _G }
-- Set the metatable.
setmetatable(__ENV__, __ENV__)
-- DEBUG: Export the app environment table.
_G._ENV_ = __ENV__
-- Open the app function.
local function __LOAD__()";

pub const EPILOGUE: &str = "
end
-- Set the app function's environment to the app environment table.
setfenv(__LOAD__, __ENV__)
-- Launch the application.
__LOAD__()";

const SELF_NAME: &str = "self";
const INSTANCE_NAME: &str = "_instance_";
const INSTANCE_PRELUDE: &str = "local _instance_ = setmetatable({}, self)";

/// Emit the members of one file. `stem` labels an import's `do` block.
pub fn emit_file(members: &[Member], stem: &str, is_import: bool) -> String {
    if is_import && members.is_empty() {
        return String::new();
    }

    let mut emitter = Emitter::new();
    let mut out = String::new();
    if is_import {
        out.push_str(&format!("\n{}do -- FILE: {stem}", indent(1)));
        emitter.scopes.push(false);
    }
    for member in members {
        let text = emitter.member(member);
        if !text.is_empty() {
            out.push('\n');
            out.push_str(&text);
        }
    }
    if is_import {
        emitter.scopes.pop();
        out.push_str(&format!("\n{}end", indent(1)));
    }

    debug!(file = stem, is_import, bytes = out.len(), "emitted lua");
    out
}

/// Join emitted files, imports first, into one Lua program.
pub fn link<I, S>(files: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from(PROLOGUE);
    for file in files {
        out.push_str(file.as_ref());
    }
    out.push_str(EPILOGUE);
    out
}

struct Emitter {
    scopes: ScopeStack,
    /// Lua name of `this`; `_instance_` inside a `new` override.
    self_name: &'static str,
}

impl Emitter {
    fn new() -> Self {
        Emitter {
            scopes: ScopeStack::new(),
            self_name: SELF_NAME,
        }
    }

    fn line(&self, text: impl AsRef<str>) -> String {
        format!("{}{}", self.scopes.indent(), text.as_ref())
    }

    fn member(&mut self, member: &Member) -> String {
        match member {
            Member::Struct(st) => self.emit_struct(st),
            Member::Enum(en) => self.emit_enum(en),
            Member::Fn(func) => self.emit_fn(func),
            Member::Bind(bind) => self.emit_bind(bind),
            Member::Call(call) => {
                let text = self.call(call);
                self.line(text)
            }
            Member::For(nfor) => self.emit_for(nfor),
            Member::If(nif) => self.emit_if(nif),
            Member::Extern(externals) => self.emit_extern(externals),
        }
    }

    // -----------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------

    fn emit_struct(&mut self, st: &Struct) -> String {
        let name = st.base.name();
        let local = if st.base.public { "" } else { "local " };
        let mut lines = vec![
            self.line(format!("{local}{name} = {{}}")),
            self.line(format!("setmetatable({name}, {name})")),
            self.line(format!("{name}.__index = {name}")),
        ];
        if !st.has_custom_constructor {
            lines.push(self.default_constructor(st));
        }
        for method in &st.methods {
            lines.push(self.method(name, method));
        }
        lines.join("\n")
    }

    fn default_constructor(&self, st: &Struct) -> String {
        let depth = self.scopes.depth();
        let name = st.base.name();
        let fields: Vec<&str> = st.fields.iter().map(|f| f.base.name()).collect();

        let mut lines = vec![format!(
            "{}function {name}:__call({})",
            indent(depth),
            fields.join(", ")
        )];
        if fields.is_empty() {
            lines.push(format!("{}return setmetatable({{}}, self)", indent(depth + 1)));
        } else {
            lines.push(format!("{}return setmetatable({{", indent(depth + 1)));
            let last = fields.len() - 1;
            for (i, field) in fields.iter().enumerate() {
                let comma = if i < last { "," } else { "" };
                lines.push(format!("{}{field} = {field}{comma}", indent(depth + 2)));
            }
            lines.push(format!("{}}}, self)", indent(depth + 1)));
        }
        lines.push(format!("{}end", indent(depth)));
        lines.join("\n")
    }

    fn method(&mut self, struct_name: &str, method: &Fn) -> String {
        let id = if method.is_constructor {
            "__call"
        } else {
            method.base.name()
        };
        let header = self.line(format!(
            "function {struct_name}:{id}({})",
            params(method)
        ));
        let body = self.fn_body(method);
        format!("{header}{body}\n{}", self.line("end"))
    }

    fn emit_enum(&mut self, en: &Enum) -> String {
        let local = if en.base.public { "" } else { "local " };
        let member_indent = indent(self.scopes.depth() + 1);
        let last = en.members.len().saturating_sub(1);

        let mut out = self.line(format!("{local}{} = {{", en.base.name()));
        for (i, member) in en.members.iter().enumerate() {
            let comma = if i < last { "," } else { "" };
            out.push_str(&format!(
                "\n{member_indent}{} = {}{comma}",
                member.base.name(),
                literal(&member.value)
            ));
        }
        out.push('\n');
        out.push_str(&self.line("}"));
        out
    }

    fn emit_fn(&mut self, func: &Fn) -> String {
        let path = &func.base.path;
        let local = if !func.base.public && path.len() <= 1 && !func.is_constructor {
            "local "
        } else {
            ""
        };
        let name = if path.len() > 1 {
            self.method_path(path)
        } else {
            self.path(path)
        };
        let header = self.line(format!("{local}function {name}({})", params(func)));
        let body = self.fn_body(func);
        format!("{header}{body}\n{}", self.line("end"))
    }

    /// Body lines of a named function or method, each prefixed by `\n`.
    fn fn_body(&mut self, func: &Fn) -> String {
        let mut prelude = Vec::new();
        if func.is_constructor {
            prelude.push(INSTANCE_PRELUDE.to_string());
        }
        if let Some(vararg) = func.vararg() {
            prelude.push(format!("local {} = {{ ... }}", vararg.base.name()));
        }

        let saved = self.self_name;
        if func.is_constructor {
            self.self_name = INSTANCE_NAME;
        }
        let body = match &func.body {
            FnBody::Block(block) => self.block(block, true, &prelude),
            FnBody::Expr(expr) => {
                self.scopes.push(true);
                let value = self.expr(expr);
                let text = format!("\n{}", self.line(format!("return {value}")));
                self.scopes.pop();
                text
            }
        };
        self.self_name = saved;
        body
    }

    fn emit_extern(&self, externals: &[External]) -> String {
        let width = externals
            .iter()
            .map(|ext| ext.alias.chars().count())
            .max()
            .unwrap_or(0);
        externals
            .iter()
            .map(|ext| {
                self.line(format!(
                    "{:<width$} = {}",
                    ext.alias,
                    self.path(&ext.target)
                ))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // -----------------------------------------------------------------
    // Blocks and statements
    // -----------------------------------------------------------------

    /// Opens a scope, emits `prelude` and `block` inside it, then flushes
    /// the scope's deferred statements unless the block ends in `return`.
    fn block(&mut self, block: &[Statement], function: bool, prelude: &[String]) -> String {
        self.scopes.push(function);
        let mut out = String::new();
        for text in prelude {
            out.push('\n');
            out.push_str(&self.line(text));
        }
        for stmt in block {
            if let Some(text) = self.statement(stmt) {
                out.push('\n');
                out.push_str(&text);
            }
        }

        let depth = self.scopes.depth();
        let deferred = self.scopes.pop();
        if !matches!(block.last(), Some(Statement::Return(_))) {
            for d in deferred {
                out.push('\n');
                out.push_str(&reindent(&d.text, d.depth, depth));
            }
        }
        out
    }

    /// `None` for statements that emit nothing in place.
    fn statement(&mut self, stmt: &Statement) -> Option<String> {
        match stmt {
            Statement::Return(ret) => Some(self.emit_return(ret)),
            Statement::For(nfor) => Some(self.emit_for(nfor)),
            Statement::Call(call) => {
                let text = self.call(call);
                Some(self.line(text))
            }
            Statement::If(nif) => Some(self.emit_if(nif)),
            Statement::Bind(bind) => Some(self.emit_bind(bind)),
            Statement::Fn(func) => Some(self.emit_fn(func)),
            Statement::Defer(inner) => {
                if let Some(text) = self.statement(inner) {
                    self.scopes.defer(text);
                }
                None
            }
        }
    }

    fn emit_return(&mut self, ret: &Return) -> String {
        let depth = self.scopes.depth();
        let mut lines: Vec<String> = self
            .scopes
            .unwind()
            .into_iter()
            .map(|d| reindent(&d.text, d.depth, depth))
            .collect();
        let values = self.value_list(&ret.values);
        if values.is_empty() {
            lines.push(self.line("return"));
        } else {
            lines.push(self.line(format!("return {values}")));
        }
        lines.join("\n")
    }

    fn emit_bind(&mut self, bind: &Bind) -> String {
        let local = if bind.base.public || bind.rebind {
            ""
        } else {
            "local "
        };
        let targets = bind
            .targets
            .iter()
            .map(|target| self.path(target))
            .collect::<Vec<_>>()
            .join(", ");
        if bind.is_declaration() {
            return self.line(format!("{local}{targets}"));
        }
        let values = self.value_list(&bind.values);
        self.line(format!("{local}{targets} = {values}"))
    }

    fn emit_for(&mut self, nfor: &For) -> String {
        let iterators = nfor
            .iterators
            .iter()
            .map(|it| self.path(it))
            .collect::<Vec<_>>()
            .join(", ");
        let iterables = self.value_list(&nfor.iterables);
        let header = match nfor.mode {
            ForMode::Each => format!("for {iterators} in pairs({iterables}) do"),
            ForMode::Range => format!("for {iterators} = {iterables} do"),
        };
        let header = self.line(header);
        let body = self.block(&nfor.block, false, &[]);
        format!("{header}{body}\n{}", self.line("end"))
    }

    fn emit_if(&mut self, nif: &If) -> String {
        let condition = self.expr(&nif.condition);
        let mut out = self.line(format!("if {condition} then"));
        out.push_str(&self.block(&nif.block, false, &[]));
        for elif in &nif.elifs {
            let condition = self.expr(&elif.condition);
            out.push('\n');
            out.push_str(&self.line(format!("elseif {condition} then")));
            out.push_str(&self.block(&elif.block, false, &[]));
        }
        if let Some(block) = &nif.otherwise {
            out.push('\n');
            out.push_str(&self.line("else"));
            out.push_str(&self.block(block, false, &[]));
        }
        out.push('\n');
        out.push_str(&self.line("end"));
        out
    }

    // -----------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------

    fn call(&mut self, call: &Call) -> String {
        let callee = &call.base.path;
        let callee = if callee.len() > 1 && callee.last_ident().is_some() {
            self.method_path(callee)
        } else if let Some(name) = callee.as_single_ident() {
            translate(name).to_string()
        } else {
            self.path(callee)
        };
        let args = call
            .args
            .iter()
            .map(|arg| {
                if arg.spread {
                    "...".to_string()
                } else {
                    self.expr(&arg.value)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{callee}({args})")
    }

    fn value_list(&mut self, values: &[Expr]) -> String {
        values
            .iter()
            .map(|expr| self.expr(expr))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn expr(&mut self, expr: &Expr) -> String {
        let mut out = String::new();
        for value in &expr.values {
            let text = self.value(value);
            // `--` opens a Lua comment.
            if out.ends_with('-') && text.starts_with('-') {
                out.push(' ');
            }
            out.push_str(&text);
        }
        out
    }

    fn value(&mut self, value: &Value) -> String {
        match value {
            Value::Literal(lit) => literal(lit),
            Value::Reference(reference) => match reference.path.as_single_ident() {
                Some(name) => translate(name).to_string(),
                None => self.path(&reference.path),
            },
            Value::Call(call) => self.call(call),
            Value::AnonFn(func) => self.anon_fn(func),
            Value::List(items) => self.list(items),
            Value::EmptyList => "{}".to_string(),
            Value::Group(inner) => format!("({})", self.expr(inner)),
            Value::Operator(op) => match (op.class, op.text.as_str()) {
                (OperatorClass::Unary, "!") => "not ".to_string(),
                (OperatorClass::Unary, text) => text.to_string(),
                (_, text) => format!(" {} ", translate(text)),
            },
        }
    }

    fn anon_fn(&mut self, func: &Fn) -> String {
        match &func.body {
            FnBody::Expr(expr) => {
                format!("function({}) return {} end", params(func), self.expr(expr))
            }
            FnBody::Block(_) => {
                let body = self.fn_body(func);
                format!("function({}){body}\n{}", params(func), self.line("end"))
            }
        }
    }

    fn list(&mut self, items: &[Expr]) -> String {
        let mut out = String::from("{");
        self.scopes.push(false);
        let last = items.len().saturating_sub(1);
        for (i, item) in items.iter().enumerate() {
            let text = self.expr(item);
            out.push('\n');
            out.push_str(&self.line(text));
            if i < last {
                out.push(',');
            }
        }
        self.scopes.pop();
        out.push('\n');
        out.push_str(&self.line("}"));
        out
    }

    // -----------------------------------------------------------------
    // References
    // -----------------------------------------------------------------

    fn path(&self, path: &RefPath) -> String {
        let mut out = String::new();
        for (i, segment) in path.segments.iter().enumerate() {
            match segment {
                PathSegment::Ident(name) => {
                    if i > 0 {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::SelfRef => {
                    if i > 0 {
                        out.push('.');
                    }
                    out.push_str(self.self_name);
                }
                PathSegment::Index(parts) => {
                    let key = parts
                        .iter()
                        .map(|part| match part {
                            IndexPart::Ident(name) => name.clone(),
                            IndexPart::SelfRef => self.self_name.to_string(),
                            IndexPart::Literal(lit) => literal(lit),
                        })
                        .collect::<Vec<_>>()
                        .join(".");
                    out.push_str(&format!("[{key}]"));
                }
            }
        }
        out
    }

    /// `a.b.c` as `a.b:c`.
    fn method_path(&self, path: &RefPath) -> String {
        match path.segments.split_last() {
            Some((PathSegment::Ident(last), receiver)) if !receiver.is_empty() => {
                let receiver = RefPath::new(receiver.to_vec());
                format!("{}:{last}", self.path(&receiver))
            }
            _ => self.path(path),
        }
    }
}

fn params(func: &Fn) -> String {
    func.args
        .iter()
        .map(|arg| {
            if arg.vararg {
                "..."
            } else {
                arg.base.name()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strings keep their escapes; an unescaped `'` needs double quotes.
fn literal(lit: &Literal) -> String {
    match lit.kind {
        LiteralKind::Str if has_unescaped_quote(&lit.text) => format!("\"{}\"", lit.text),
        LiteralKind::Str => format!("'{}'", lit.text),
        LiteralKind::Int | LiteralKind::Bool | LiteralKind::Nil => lit.text.clone(),
    }
}

fn has_unescaped_quote(text: &str) -> bool {
    let mut escaped = false;
    for ch in text.chars() {
        match ch {
            '\\' if !escaped => escaped = true,
            '\'' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::span::FileId;

    fn members(source: &str) -> Vec<Member> {
        let ast = parse(lex(FileId(0), source).expect("lex")).expect("parse");
        build(&ast).expect("build")
    }

    fn lua(source: &str) -> String {
        emit_file(&members(source), "main", false)
    }

    #[test]
    fn binds_are_local_unless_public_or_rebound() {
        assert_eq!(
            lua("let x = 1\npub let y = 2\nx = 3\nlet a, b = f()\nlet z"),
            "\n  local x = 1\n  y = 2\n  x = 3\n  local a, b = f()\n  local z"
        );
    }

    #[test]
    fn struct_gets_synthesized_constructor() {
        assert_eq!(
            lua("struct P { x; y }"),
            "\n  local P = {}\n  setmetatable(P, P)\n  P.__index = P\n  function P:__call(x, y)\n    return setmetatable({\n      x = x,\n      y = y\n    }, self)\n  end"
        );
        assert_eq!(
            lua("pub struct E {}"),
            "\n  E = {}\n  setmetatable(E, E)\n  E.__index = E\n  function E:__call()\n    return setmetatable({}, self)\n  end"
        );
    }

    #[test]
    fn custom_constructor_builds_instance() {
        let out = lua("struct P { x; new(a) { this.x = a; return this } get() { return this.x } }");
        assert_eq!(
            out,
            "\n  local P = {}\n  setmetatable(P, P)\n  P.__index = P\n  function P:__call(a)\n    local _instance_ = setmetatable({}, self)\n    _instance_.x = a\n    return _instance_\n  end\n  function P:get()\n    return self.x\n  end"
        );
    }

    #[test]
    fn enum_members_are_comma_separated() {
        assert_eq!(
            lua("pub enum E { A = 1, B = 'b' }"),
            "\n  E = {\n    A = 1,\n    B = 'b'\n  }"
        );
    }

    #[test]
    fn functions_capture_varargs() {
        assert_eq!(
            lua("fn f(a, ...rest) { g.h(a, rest...) }"),
            "\n  local function f(a, ...)\n    local rest = { ... }\n    g:h(a, ...)\n  end"
        );
        assert_eq!(
            lua("fn util.join(a) {}\npub fn run() {}"),
            "\n  function util:join(a)\n  end\n  function run()\n  end"
        );
    }

    #[test]
    fn deferred_calls_run_in_reverse_at_block_end() {
        assert_eq!(
            lua("fn f() {\n  defer print('a')\n  defer print('b')\n  g()\n}"),
            "\n  local function f()\n    g()\n    print('b')\n    print('a')\n  end"
        );
    }

    #[test]
    fn return_unwinds_to_function_scope() {
        let source = "fn f(x) {
  defer close()
  for i = 1, 3 {
    defer tick()
    if x { return 1 }
  }
  return 2
}";
        assert_eq!(
            lua(source),
            "\n  local function f(x)\n    for i = 1, 3 do\n      if x then\n        tick()\n        close()\n        return 1\n      end\n      tick()\n    end\n    close()\n    return 2\n  end"
        );
    }

    #[test]
    fn return_runs_every_deferral_newest_first() {
        let source = "fn f() {
  defer print('a')
  defer print('b')
  defer print('c')
  return 1
}";
        assert_eq!(
            lua(source),
            "\n  local function f()\n    print('c')\n    print('b')\n    print('a')\n    return 1\n  end"
        );
    }

    #[test]
    fn bare_return_has_no_trailing_space() {
        assert_eq!(lua("fn f() { return }"), "\n  local function f()\n    return\n  end");
    }

    #[test]
    fn translates_operators_and_builtins() {
        assert_eq!(
            lua("let ok = a != b && !c || d\ninsert(l, random(1, 2))"),
            "\n  local ok = a ~= b and not c or d\n  table.insert(l, math.random(1, 2))"
        );
    }

    #[test]
    fn separates_consecutive_minus_signs() {
        assert_eq!(
            lua("let y = 1\nlet x = - -y\nlet z = y - -1"),
            "\n  local y = 1\n  local x = - -y\n  local z = y - -1"
        );
    }

    #[test]
    fn quotes_strings_by_content() {
        assert_eq!(
            lua("let s = \"it's\"\nlet t = \"plain\""),
            "\n  local s = \"it's\"\n  local t = 'plain'"
        );
    }

    #[test]
    fn lists_span_lines() {
        assert_eq!(lua("let l = [1, 2]\nlet e = []"), "\n  local l = {\n    1,\n    2\n  }\n  local e = {}");
    }

    #[test]
    fn loops_and_conditionals() {
        assert_eq!(
            lua("for k, v in items { print(k) }\nif a { f() } else { g() }"),
            "\n  for k, v in pairs(items) do\n    print(k)\n  end\n  if a then\n    f()\n  else\n    g()\n  end"
        );
    }

    #[test]
    fn anonymous_functions_inline() {
        assert_eq!(
            lua("let double = (x) -> x * 2"),
            "\n  local double = function(x) return x * 2 end"
        );
    }

    #[test]
    fn externs_are_aligned() {
        assert_eq!(
            lua("extern { string.format as fmt, os.time as clock }"),
            "\n  fmt   = string.format\n  clock = os.time"
        );
    }

    #[test]
    fn imports_are_wrapped_in_do_blocks() {
        assert_eq!(
            emit_file(&members("pub fn f() {}"), "util", true),
            "\n  do -- FILE: util\n    function f()\n    end\n  end"
        );
        assert_eq!(emit_file(&[], "empty", true), "");
    }

    #[test]
    fn link_wraps_files_in_environment() {
        let out = link(["\n  print(1)"]);
        assert!(out.starts_with("-- Create the app environment.\n"));
        assert!(out.contains("local function __LOAD__()\n  print(1)\nend\n"));
        assert!(out.ends_with("__LOAD__()"));
    }
}
