//! Control-flow flattening.
//!
//! Rewrites every function with enough blocks to route control through a
//! single dispatch block: the entry branches to the dispatcher, which
//! switches on a state variable to reach the (shuffled) original blocks.

use crate::options::ObfuscationOptions;
use crate::{is_internal_symbol, ObfPass, PassKind};
use irobf_core::ir::{BasicBlock, Inst, Module};
use irobf_utils::errors::PassError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::debug;

/// Label of the dispatch block inserted into flattened functions.
pub const DISPATCH_LABEL: &str = "__irobf_dispatch";

/// Whole-module control-flow flattening pass.
#[derive(Debug)]
pub struct Flattening {
    pointer_size: u32,
    enabled: bool,
    rng: StdRng,
}

impl Flattening {
    pub fn new(pointer_size: u32, enabled: bool, options: Arc<ObfuscationOptions>) -> Self {
        Self {
            pointer_size,
            enabled,
            rng: StdRng::seed_from_u64(options.seed),
        }
    }
}

impl ObfPass for Flattening {
    fn name(&self) -> &'static str {
        "flattening"
    }

    fn kind(&self) -> PassKind {
        PassKind::WholeModule
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn run_on_module(&mut self, module: &mut Module) -> Result<bool, PassError> {
        if !self.enabled {
            return Ok(false);
        }

        // State variable is pointer-wide on the target.
        let state = format!("__irobf_state.i{}", self.pointer_size * 8);
        let mut changed = false;
        for function in &mut module.functions {
            if is_internal_symbol(&function.name) || function.blocks.len() < 3 {
                continue;
            }
            if function.block(DISPATCH_LABEL).is_some() {
                // Already flattened.
                continue;
            }

            let mut rest = function.blocks.split_off(1);
            let cases: Vec<(i64, String)> = rest
                .iter()
                .enumerate()
                .map(|(i, block)| (i as i64, block.label.clone()))
                .collect();
            let default = cases[0].1.clone();
            rest.shuffle(&mut self.rng);

            let dispatch = BasicBlock::new(
                DISPATCH_LABEL,
                vec![Inst::Switch {
                    value: state.clone(),
                    default,
                    cases,
                }],
            );

            // Route the entry block through the dispatcher.
            let entry = &mut function.blocks[0];
            let reroute = Inst::Br {
                dest: DISPATCH_LABEL.to_string(),
            };
            match entry.insts.last_mut() {
                Some(last @ (Inst::Br { .. } | Inst::CondBr { .. })) => *last = reroute,
                _ => entry.insts.push(reroute),
            }

            function.blocks.push(dispatch);
            function.blocks.extend(rest);
            debug!(function = %function.name, "flattened control flow");
            changed = true;
        }
        Ok(changed)
    }
}
