//! Names provided by Lua or by the Skal runtime.
//!
//! The validator treats these as always defined, and the emitter uses
//! the `lua_name` column to translate Skal spellings into Lua ones.

/// Where a builtin comes from at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// A global Lua function.
    LuaFunction,
    /// A Lua standard library table (`math`, `string`, ...).
    LuaModule,
    /// A global installed by the Skal runtime before the program runs.
    RuntimeFunction,
    /// A module table installed by the Skal runtime.
    RuntimeModule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name as written in Skal source.
    pub name: &'static str,
    /// Lua spelling, when it differs from `name`.
    pub lua_name: Option<&'static str>,
    pub kind: BuiltinKind,
}

const fn builtin(name: &'static str, kind: BuiltinKind) -> BuiltinDescriptor {
    BuiltinDescriptor {
        name,
        lua_name: None,
        kind,
    }
}

const fn renamed(name: &'static str, lua_name: &'static str) -> BuiltinDescriptor {
    BuiltinDescriptor {
        name,
        lua_name: Some(lua_name),
        kind: BuiltinKind::LuaFunction,
    }
}

/// Every builtin known to the core.
pub const BUILTINS: &[BuiltinDescriptor] = &[
    builtin("print", BuiltinKind::LuaFunction),
    renamed("insert", "table.insert"),
    renamed("random", "math.random"),
    builtin("strmatch", BuiltinKind::RuntimeFunction),
    builtin("tonumber", BuiltinKind::LuaFunction),
    builtin("tostring", BuiltinKind::LuaFunction),
    builtin("date", BuiltinKind::RuntimeFunction),
    builtin("pairs", BuiltinKind::LuaFunction),
    builtin("ipairs", BuiltinKind::LuaFunction),
    builtin("type", BuiltinKind::LuaFunction),
    builtin("error", BuiltinKind::LuaFunction),
    builtin("pcall", BuiltinKind::LuaFunction),
    builtin("select", BuiltinKind::LuaFunction),
    builtin("unpack", BuiltinKind::LuaFunction),
    builtin("setmetatable", BuiltinKind::LuaFunction),
    builtin("getmetatable", BuiltinKind::LuaFunction),
    builtin("require", BuiltinKind::LuaFunction),
    builtin("math", BuiltinKind::LuaModule),
    builtin("string", BuiltinKind::LuaModule),
    builtin("table", BuiltinKind::LuaModule),
    builtin("os", BuiltinKind::LuaModule),
    builtin("io", BuiltinKind::LuaModule),
    builtin("http", BuiltinKind::RuntimeModule),
    builtin("conv", BuiltinKind::RuntimeModule),
    builtin("time", BuiltinKind::RuntimeModule),
    builtin("printfln", BuiltinKind::RuntimeFunction),
    builtin("sprintf", BuiltinKind::RuntimeFunction),
];

/// Look up a builtin by its Skal name.
///
/// The search is linear over `BUILTINS` because the table is small.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn is_builtin(name: &str) -> bool {
    find_builtin(name).is_some()
}

/// Lua spelling of a Skal term: keywords, renamed builtins and operators.
/// Terms without a translation come back unchanged.
pub fn translate(term: &str) -> &str {
    match term {
        "this" => "self",
        "!" => "not",
        "!=" => "~=",
        "&&" => "and",
        "||" => "or",
        _ => find_builtin(term)
            .and_then(|b| b.lua_name)
            .unwrap_or(term),
    }
}
