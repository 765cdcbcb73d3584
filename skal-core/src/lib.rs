//! Core compiler pipeline for the Skal language.
//!
//! The pipeline is roughly:
//!
//!   source .sk
//!     -> imports    (dependency files, imports first)
//!     -> lexer      (tokens)
//!     -> parser     (arena syntax tree)
//!     -> builder    (semantic members)
//!     -> validate   (fact table + diagnostics)
//!     -> codegen_lua (Lua source in the app environment)
//!
//! Higher-level tools (the CLI and its watch mode) should depend on this
//! crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod token_stream;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: entities, types, validation
// ---------------------------------------------------------------------

pub mod entity;
pub mod builder;
pub mod types;
pub mod validate;

// ---------------------------------------------------------------------
// Builtins
// ---------------------------------------------------------------------

pub mod builtins;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod scope;
pub mod codegen_lua;
pub mod imports;
pub mod job;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, Compiler, compile_to_lua};
pub use diagnostic::{Diagnostic, Severity};
pub use error::CoreError;
pub use span::{FileId, SourceMap, Span};
