//! Pipeline construction and execution.
//!
//! The builder always constructs the four control-flow passes and enables
//! them individually from the effective policy; a disabled pass no-ops
//! internally. Only string encryption is skipped outright when off, since it
//! has no meaningful disabled role. This keeps the executor's dispatch loop
//! uniform: pipeline shape never depends on policy beyond that one pass.
//!
//! Pass order is fixed and significant: string encryption first so the
//! control-flow passes see the rewritten string-handling code, then
//! flattening, then the three indirection passes.

use crate::policy::EffectivePolicy;
use irobf_core::ir::Module;
use irobf_transform::flattening::Flattening;
use irobf_transform::indirect_branch::IndirectBranch;
use irobf_transform::indirect_call::IndirectCall;
use irobf_transform::indirect_global_variable::IndirectGlobalVariable;
use irobf_transform::options::ObfuscationOptions;
use irobf_transform::string_encryption::StringEncryption;
use irobf_transform::{ObfPass, PassKind};
use irobf_utils::errors::PipelineError;
use std::sync::Arc;
use tracing::debug;

/// Execution state; passes run once and finalize once, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotStarted,
    Running,
    Finalizing,
    Done,
}

impl State {
    const fn name(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        }
    }
}

/// An ordered list of constructed passes plus the state machine driving them.
pub struct Pipeline {
    passes: Vec<Box<dyn ObfPass>>,
    state: State,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("passes", &self.passes.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("state", &self.state)
            .finish()
    }
}

impl Pipeline {
    /// Constructs the ordered pass list for one module run.
    ///
    /// `pointer_size` comes from the module's data layout, computed once and
    /// shared by every pass in this pipeline.
    pub fn build(
        policy: &EffectivePolicy,
        pointer_size: u32,
        options: Arc<ObfuscationOptions>,
    ) -> Self {
        let mut passes: Vec<Box<dyn ObfPass>> = Vec::new();
        if policy.string_encryption {
            passes.push(Box::new(StringEncryption::new(
                pointer_size,
                true,
                options.clone(),
            )));
        }
        passes.push(Box::new(Flattening::new(
            pointer_size,
            policy.flattening,
            options.clone(),
        )));
        passes.push(Box::new(IndirectBranch::new(
            pointer_size,
            policy.indirect_branch,
            options.clone(),
        )));
        passes.push(Box::new(IndirectCall::new(
            pointer_size,
            policy.indirect_call,
            options.clone(),
        )));
        passes.push(Box::new(IndirectGlobalVariable::new(
            pointer_size,
            policy.indirect_global_variable,
            options,
        )));
        Self::from_passes(passes)
    }

    /// Wraps an explicit pass list; the seam the tests drive recording
    /// passes through.
    pub fn from_passes(passes: Vec<Box<dyn ObfPass>>) -> Self {
        Self {
            passes,
            state: State::NotStarted,
        }
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Pass names in construction order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs every pass in order, dispatching on its kind, and ORs the
    /// contributions. On a pass failure the run stops, but the pipeline
    /// stays finalizable so cleanup still reaches every constructed pass.
    pub fn run(&mut self, module: &mut Module) -> Result<bool, PipelineError> {
        if self.state != State::NotStarted {
            return Err(PipelineError::State {
                state: self.state.name(),
                action: "run",
            });
        }
        self.state = State::Running;

        let mut changed = false;
        for pass in &mut self.passes {
            let name = pass.name();
            let contribution = match pass.kind() {
                PassKind::PerFunction => {
                    let mut c = false;
                    // Re-evaluate the length each step: functions appended by
                    // an earlier pass (or this one) must be visited too.
                    let mut index = 0;
                    while index < module.functions.len() {
                        c |= pass
                            .run_on_function(module, index)
                            .map_err(|source| PipelineError::Pass { pass: name, source })?;
                        index += 1;
                    }
                    c
                }
                PassKind::WholeModule => pass
                    .run_on_module(module)
                    .map_err(|source| PipelineError::Pass { pass: name, source })?,
            };
            debug!(pass = name, enabled = pass.enabled(), changed = contribution, "pass ran");
            changed |= contribution;
        }
        Ok(changed)
    }

    /// Finalizes every pass exactly once, in construction order.
    ///
    /// Runs through all passes even if one of them fails; the first failure
    /// is surfaced after the rest have been cleaned up.
    pub fn finalize(&mut self, module: &mut Module) -> Result<bool, PipelineError> {
        if self.state != State::Running {
            return Err(PipelineError::State {
                state: self.state.name(),
                action: "finalize",
            });
        }
        self.state = State::Finalizing;

        let mut changed = false;
        let mut first_err = None;
        for pass in &mut self.passes {
            match pass.finalize(module) {
                Ok(c) => changed |= c,
                Err(source) => {
                    if first_err.is_none() {
                        first_err = Some(PipelineError::Pass {
                            pass: pass.name(),
                            source,
                        });
                    }
                }
            }
        }
        self.state = State::Done;

        match first_err {
            Some(err) => Err(err),
            None => Ok(changed),
        }
    }

    /// Runs and then unconditionally finalizes the pipeline, returning
    /// whether any pass execution changed the module.
    ///
    /// Finalization happens even when the run fails; the run error wins over
    /// a finalization error.
    pub fn execute(mut self, module: &mut Module) -> Result<bool, PipelineError> {
        let ran = self.run(module);
        let finalized = self.finalize(module);
        let changed = ran?;
        finalized?;
        Ok(changed)
    }
}
