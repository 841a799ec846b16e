// File: src/lib.rs

pub mod compiler;
pub mod config;
pub mod core;
pub mod error;
#[cfg(feature = "libvarnam")]
pub mod ffi;
pub mod learning;
pub mod logging;
pub mod persistence;

pub use crate::compiler::SchemeCompiler;
pub use crate::config::{CompilerConfig, EngineOption};
pub use crate::core::context::{CompilationReport, CompilationSession};
pub use crate::core::engine::{EngineBackend, SchemeEngine};
pub use crate::core::memory::MemoryEngine;
pub use crate::core::types::{
    MatchType, SchemeDetails, Token, TokenDeclaration, TokenType, Word,
};
pub use crate::error::{EngineError, ValidationError};
