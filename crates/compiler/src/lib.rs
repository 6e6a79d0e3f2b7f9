//! Compiler core for the ScrollScript language pair: the imperative script
//! dialect and the record-oriented config dialect share a lexer, diverge at
//! the parser, and meet again in the driver, which batches files through
//! symbol declaration, semantic checking, id generation and code generation.

#![deny(clippy::all)]

pub mod ast;
pub mod binding;
pub mod catalog;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod idmap;
pub mod lexer;
pub mod optimiser;
pub mod parser;
pub mod reporting;
pub mod semantic;
pub mod symbol;
pub mod tokens;
pub mod types;
pub mod writer;

pub use binding::{Binding, ConfigRule, PropertyBinding, PropertyDescriptor};
pub use catalog::{
    bindings_from_toml_str, commands_from_toml_str, InstructionMap, TriggerCatalog, TriggerInfo,
};
pub use driver::{
    Artifact, CompiledFile, CompiledUnit, Compiler, CompilerOptions, Input, Output, SourceFile,
};
pub use error::CompilerError;
pub use idmap::{IdProvider, MemoryIdProvider};
pub use reporting::{Diagnostic, DiagnosticCache, DiagnosticKind, Diagnostics};
pub use symbol::{CommandInfo, ConstantInfo, ConstantValue, ScriptInfo, SymbolTable};
pub use types::{PrimitiveType, StackType, Type};

pub use scroll_bytecode::CoreOpcode;
