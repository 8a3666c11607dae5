//! Minimal whole-module IR model and host plugin contracts.
//!
//! This crate is the seam between the obfuscation pipeline and its host: a
//! [`ir::Module`] carries the functions, globals and data layout the passes
//! rewrite, and [`plugin`] defines the two invocation protocols the host
//! drives the pipeline through.

pub mod ir;
pub mod plugin;

pub use ir::{BasicBlock, DataLayout, Function, GlobalVariable, Initializer, Inst, Module};
