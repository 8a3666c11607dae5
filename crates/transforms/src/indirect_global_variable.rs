//! Indirect global variable obfuscation.
//!
//! Rewrites direct global loads and stores to go through a module-level
//! alias table, the same shared-table scheme the indirect-call pass uses.
//! Tables and keys the other passes emit are internal symbols and stay
//! directly addressed.

use crate::options::ObfuscationOptions;
use crate::{is_internal_symbol, ObfPass, PassKind};
use irobf_core::ir::{Inst, Module};
use irobf_utils::errors::PassError;
use std::sync::Arc;
use tracing::debug;

/// Name of the shared global-alias table.
pub const GLOBAL_TABLE: &str = "__irobf_indgv";

/// Per-function indirect-global-variable pass.
#[derive(Debug)]
pub struct IndirectGlobalVariable {
    enabled: bool,
}

impl IndirectGlobalVariable {
    pub fn new(_pointer_size: u32, enabled: bool, _options: Arc<ObfuscationOptions>) -> Self {
        Self { enabled }
    }
}

impl ObfPass for IndirectGlobalVariable {
    fn name(&self) -> &'static str {
        "indirect-global-variable"
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
            .address_table(GLOBAL_TABLE)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let slot_of = |entries: &mut Vec<String>, global: &str| -> usize {
            match entries.iter().position(|e| e == global) {
                Some(slot) => slot,
                None => {
                    entries.push(global.to_string());
                    entries.len() - 1
                }
            }
        };
        let mut changed = false;

        let function = &mut module.functions[index];
        for block in &mut function.blocks {
            for inst in &mut block.insts {
                match inst {
                    Inst::LoadGlobal { dest, global } if !is_internal_symbol(global) => {
                        let slot = slot_of(&mut entries, global);
                        *inst = Inst::IndirectLoadGlobal {
                            dest: std::mem::take(dest),
                            table: GLOBAL_TABLE.to_string(),
                            slot,
                        };
                        changed = true;
                    }
                    Inst::StoreGlobal { global, value } if !is_internal_symbol(global) => {
                        let slot = slot_of(&mut entries, global);
                        *inst = Inst::IndirectStoreGlobal {
                            table: GLOBAL_TABLE.to_string(),
                            slot,
                            value: std::mem::take(value),
                        };
                        changed = true;
                    }
                    _ => {}
                }
            }
        }

        if changed {
            debug!(function = %module.functions[index].name, entries = entries.len(),
                   "rewrote global accesses");
            module.upsert_address_table(GLOBAL_TABLE, entries);
        }
        Ok(changed)
    }
}
