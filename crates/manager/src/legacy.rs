//! Eager invocation adapter for the legacy plugin protocol.
//!
//! The host registers this pass manager unconditionally and calls it once
//! per module; the manager re-checks the umbrella itself and is fully
//! transparent when obfuscation is off.

use crate::pipeline::Pipeline;
use crate::policy::{EffectivePolicy, ObfFlags};
use irobf_core::ir::Module;
use irobf_core::plugin::LegacyModulePass;
use irobf_transform::options::ObfuscationOptions;
use irobf_utils::errors::PipelineError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// The legacy eager module pass: merge, build, run, finalize.
pub struct ObfuscationPassManager {
    flags: ObfFlags,
    config_path: Option<PathBuf>,
    /// Pipeline kept between `run_on_module` and `finalize`.
    pipeline: Option<Pipeline>,
}

impl std::fmt::Debug for ObfuscationPassManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObfuscationPassManager")
            .field("flags", &self.flags)
            .field("config_path", &self.config_path)
            .field("pending_finalize", &self.pipeline.is_some())
            .finish()
    }
}

impl ObfuscationPassManager {
    pub fn new(flags: ObfFlags, config_path: Option<PathBuf>) -> Self {
        Self {
            flags,
            config_path,
            pipeline: None,
        }
    }

    /// The full eager sequence inline: run on the module, then finalize,
    /// returning whether execution changed the module.
    pub fn obfuscate(&mut self, module: &mut Module) -> Result<bool, PipelineError> {
        let ran = self.run_on_module(module);
        let finalized = self.finalize(module);
        let changed = ran?;
        finalized?;
        Ok(changed)
    }
}

impl LegacyModulePass for ObfuscationPassManager {
    fn name(&self) -> &'static str {
        "obfuscation-pass-manager"
    }

    fn run_on_module(&mut self, module: &mut Module) -> Result<bool, PipelineError> {
        let options = Arc::new(ObfuscationOptions::resolve(self.config_path.as_deref()));
        let policy = EffectivePolicy::merge(self.flags, &options);
        if !policy.active() {
            // Umbrella off: zero observable effect, zero diagnostics.
            return Ok(false);
        }

        let pointer_size = module.pointer_size();
        debug!(module = %module.name, pointer_size, ?policy, "building obfuscation pipeline");
        let mut pipeline = Pipeline::build(&policy, pointer_size, options);
        let ran = pipeline.run(module);
        // Stash the pipeline first so a failed run is still finalized.
        self.pipeline = Some(pipeline);
        ran
    }

    fn finalize(&mut self, module: &mut Module) -> Result<bool, PipelineError> {
        match self.pipeline.take() {
            Some(mut pipeline) => pipeline.finalize(module),
            None => Ok(false),
        }
    }
}
