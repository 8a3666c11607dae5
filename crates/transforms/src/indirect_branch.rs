//! Indirect branch obfuscation.
//!
//! Per function, collects every direct branch target into an address table
//! global and rewrites the branches to go through table slots instead of
//! labels. Branch targets are function-local, so a target that names no
//! block in the function is a hard pass error.

use crate::options::ObfuscationOptions;
use crate::{is_internal_symbol, ObfPass, PassKind};
use irobf_core::ir::{Inst, Module};
use irobf_utils::errors::PassError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-function indirect-branch pass.
#[derive(Debug)]
pub struct IndirectBranch {
    enabled: bool,
}

impl IndirectBranch {
    pub fn new(_pointer_size: u32, enabled: bool, _options: Arc<ObfuscationOptions>) -> Self {
        Self { enabled }
    }
}

/// Name of the branch-target table emitted for `function`.
pub fn branch_table_name(function: &str) -> String {
    format!("__irobf_indbr_{function}")
}

impl ObfPass for IndirectBranch {
    fn name(&self) -> &'static str {
        "indirect-branch"
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
        let function = module
            .functions
            .get(index)
            .ok_or(PassError::FunctionIndex(index))?;
        if is_internal_symbol(&function.name) {
            return Ok(false);
        }

        // First pass: collect targets in first-seen order, validating labels.
        let mut targets: Vec<String> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for block in &function.blocks {
            for inst in &block.insts {
                let mut dests: Vec<&str> = Vec::new();
                match inst {
                    Inst::Br { dest } => dests.push(dest),
                    Inst::CondBr {
                        then_dest,
                        else_dest,
                        ..
                    } => {
                        dests.push(then_dest);
                        dests.push(else_dest);
                    }
                    _ => {}
                }
                for dest in dests {
                    if function.block(dest).is_none() {
                        return Err(PassError::UnknownSymbol(dest.to_string()));
                    }
                    if !slots.contains_key(dest) {
                        slots.insert(dest.to_string(), targets.len());
                        targets.push(dest.to_string());
                    }
                }
            }
        }
        if targets.is_empty() {
            return Ok(false);
        }

        let table = branch_table_name(&function.name);
        let function = &mut module.functions[index];
        for block in &mut function.blocks {
            for inst in &mut block.insts {
                match inst {
                    Inst::Br { dest } => {
                        *inst = Inst::IndirectBr {
                            table: table.clone(),
                            slot: slots[dest.as_str()],
                        };
                    }
                    Inst::CondBr {
                        cond,
                        then_dest,
                        else_dest,
                    } => {
                        *inst = Inst::IndirectCondBr {
                            cond: cond.clone(),
                            table: table.clone(),
                            then_slot: slots[then_dest.as_str()],
                            else_slot: slots[else_dest.as_str()],
                        };
                    }
                    _ => {}
                }
            }
        }
        debug!(function = %function.name, table = %table, entries = targets.len(),
               "rewrote direct branches");
        module.upsert_address_table(&table, targets);
        Ok(true)
    }
}
