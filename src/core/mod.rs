// File: src/core/mod.rs

pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod memory;
pub mod types;
