//! Host plugin contracts.
//!
//! Two independent protocols drive the pipeline. The legacy protocol invokes
//! a registered module pass eagerly on every module, then finalizes it. The
//! declarative protocol hands pass managers a parsed pipeline element; a
//! manager either claims the element by name or declines so another handler
//! can try.

use crate::ir::Module;
use irobf_utils::errors::PipelineError;

/// Legacy eager module-pass contract.
///
/// The host calls [`run_on_module`](Self::run_on_module) once per module,
/// then [`finalize`](Self::finalize) once, in that order.
pub trait LegacyModulePass {
    fn name(&self) -> &'static str;

    /// Transforms the module; returns whether it changed.
    fn run_on_module(&mut self, module: &mut Module) -> Result<bool, PipelineError>;

    /// One-shot cleanup after the run; returns whether cleanup changed the module.
    fn finalize(&mut self, module: &mut Module) -> Result<bool, PipelineError> {
        let _ = module;
        Ok(false)
    }
}

/// Which of the host's cached analyses survive a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreservedAnalyses {
    /// The pass did not touch the module; every analysis stays valid.
    All,
    /// The module changed; the host must recompute everything.
    None,
}

/// Stand-in for the host's module analysis cache.
///
/// Carries only the invalidation bit the pipeline reports through; real
/// analysis storage belongs to the host.
#[derive(Debug, Default)]
pub struct ModuleAnalysisManager {
    invalidated: bool,
}

impl ModuleAnalysisManager {
    pub fn invalidate_all(&mut self) {
        self.invalidated = true;
    }

    pub const fn is_invalidated(&self) -> bool {
        self.invalidated
    }
}

/// One element of the host's textual pass pipeline, e.g. `irobf(irobf-cff)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineElement {
    pub name: String,
    pub inner: Vec<PipelineElement>,
}

impl PipelineElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Vec::new(),
        }
    }

    pub fn with_inner(name: impl Into<String>, inner: Vec<PipelineElement>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}
