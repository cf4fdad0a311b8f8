//! Component-scoped CSS preprocessing.
//!
//! Style sheets declare a namespace, import symbols from each other with
//! `:import`, and mark classes with `-sb-root`, `-sb-type` and `-sb-states`.
//! [`Generator`] rewrites every selector into namespaced, plain CSS and emits
//! the rules of a whole import graph in dependency order.

pub mod ast;
pub mod config;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod loader;
pub mod module;
pub mod parser;
pub mod resolver;
pub mod selector;
pub mod stylesheet;

pub use config::Config;
pub use error::{Diagnostic, DiagnosticKind, Error, Span};
pub use generator::{generate, Generation, Generator, GeneratorOptions};
pub use loader::FsResolver;
pub use module::{compile_to_module, module_exports, process, ModuleExports};
pub use resolver::{EmptyResolver, MapResolver, Resolver};
pub use stylesheet::{ClassSymbol, ImportRef, StyleSheet, Symbol, SymbolTable};
