//! Obfuscation passes and the contract the pipeline drives them through.
//!
//! Every pass is constructed through the same shape,
//! `new(pointer_size, enabled, options)`, so the pipeline builder can treat
//! them uniformly. A pass constructed with `enabled = false` still takes part
//! in the pipeline (and is finalized with everyone else) but its run hooks
//! leave the module untouched.

pub mod flattening;
pub mod indirect_branch;
pub mod indirect_call;
pub mod indirect_global_variable;
pub mod options;
pub mod string_encryption;

use irobf_core::ir::Module;
use irobf_utils::errors::PassError;

/// Dispatch granularity of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Invoked once per function defined in the module.
    PerFunction,
    /// Invoked once against the whole module.
    WholeModule,
}

/// Contract every obfuscation pass implements.
///
/// The executor calls exactly one of the run hooks per pass, chosen by
/// [`kind`](Self::kind), then [`finalize`](Self::finalize) exactly once after
/// the whole pipeline has run.
pub trait ObfPass: Send {
    fn name(&self) -> &'static str;

    fn kind(&self) -> PassKind;

    /// Disabled passes still run through the executor; their hooks no-op.
    fn enabled(&self) -> bool;

    /// Per-function hook; `index` addresses `module.functions`.
    fn run_on_function(&mut self, module: &mut Module, index: usize) -> Result<bool, PassError> {
        let _ = (module, index);
        Ok(false)
    }

    /// Whole-module hook.
    fn run_on_module(&mut self, module: &mut Module) -> Result<bool, PassError> {
        let _ = module;
        Ok(false)
    }

    /// Cleanup hook, called exactly once after every pass in the pipeline ran.
    fn finalize(&mut self, module: &mut Module) -> Result<bool, PassError> {
        let _ = module;
        Ok(false)
    }
}

/// Symbols the passes themselves emit. They are never obfuscated again.
pub fn is_internal_symbol(name: &str) -> bool {
    name.starts_with("__irobf_")
}
