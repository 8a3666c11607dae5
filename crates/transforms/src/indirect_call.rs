//! Indirect call obfuscation.
//!
//! Rewrites direct calls to go through a module-level callee table. The
//! table is shared across functions and grows as new callees are seen;
//! existing slots are stable, so earlier rewrites stay valid. External
//! callees are allowed — a symbol does not have to be defined in the module
//! to be routed through the table.

use crate::options::ObfuscationOptions;
use crate::{is_internal_symbol, ObfPass, PassKind};
use irobf_core::ir::{Inst, Module};
use irobf_utils::errors::PassError;
use std::sync::Arc;
use tracing::debug;

/// Name of the shared callee table global.
pub const CALLEE_TABLE: &str = "__irobf_icall";

/// Per-function indirect-call pass.
#[derive(Debug)]
pub struct IndirectCall {
    enabled: bool,
}

impl IndirectCall {
    pub fn new(_pointer_size: u32, enabled: bool, _options: Arc<ObfuscationOptions>) -> Self {
        Self { enabled }
    }
}

impl ObfPass for IndirectCall {
    fn name(&self) -> &'static str {
        "indirect-call"
    }

    fn kind(&self) -> PassKind {
        PassKind::PerFunction
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn run_on_function(&mut self, module: &mut Module, index: usize) -> Result<bool, PassError> {
        if !self.enabled {
            return Ok(false);
        }
        if index >= module.functions.len() {
            return Err(PassError::FunctionIndex(index));
        }
        if is_internal_symbol(&module.functions[index].name) {
            return Ok(false);
        }

        let mut entries: Vec<String> = module
            .address_table(CALLEE_TABLE)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let mut changed = false;

        let function = &mut module.functions[index];
        for block in &mut function.blocks {
            for inst in &mut block.insts {
                if let Inst::Call { callee, args } = inst {
                    if is_internal_symbol(callee) {
                        continue;
                    }
                    let slot = match entries.iter().position(|e| e == callee) {
                        Some(slot) => slot,
                        None => {
                            entries.push(callee.clone());
                            entries.len() - 1
                        }
                    };
                    *inst = Inst::IndirectCall {
                        table: CALLEE_TABLE.to_string(),
                        slot,
                        args: std::mem::take(args),
                    };
                    changed = true;
                }
            }
        }

        if changed {
            debug!(function = %module.functions[index].name, entries = entries.len(),
                   "rewrote direct calls");
            module.upsert_address_table(CALLEE_TABLE, entries);
        }
        Ok(changed)
    }
}
