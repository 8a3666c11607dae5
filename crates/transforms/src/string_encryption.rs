//! Constant string encryption.
//!
//! XOR-encrypts every plain byte-string global with a pointer-width key
//! derived from the global's name and the run seed, records the key in a
//! companion global, and installs a runtime decryption stub. Runs before the
//! control-flow passes so they see the rewritten string-handling code.

use crate::options::ObfuscationOptions;
use crate::{is_internal_symbol, ObfPass, PassKind};
use irobf_core::ir::{BasicBlock, Function, GlobalVariable, Initializer, Inst, Module};
use irobf_utils::errors::PassError;
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use tracing::debug;

/// Name of the runtime decryption helper installed alongside encrypted globals.
pub const DECRYPT_STUB: &str = "__irobf_decrypt_stub";

/// Whole-module string-encryption pass.
#[derive(Debug)]
pub struct StringEncryption {
    pointer_size: u32,
    enabled: bool,
    options: Arc<ObfuscationOptions>,
}

impl StringEncryption {
    pub fn new(pointer_size: u32, enabled: bool, options: Arc<ObfuscationOptions>) -> Self {
        Self {
            pointer_size,
            enabled,
            options,
        }
    }
}

/// Pointer-width XOR key for one global, derived from its name and the seed.
fn key_for(name: &str, seed: u64, pointer_size: u32) -> Vec<u8> {
    let mut hasher = Keccak256::new();
    hasher.update(name.as_bytes());
    hasher.update(seed.to_le_bytes());
    let digest = hasher.finalize();
    let len = pointer_size.clamp(1, 32) as usize;
    digest[..len].to_vec()
}

impl ObfPass for StringEncryption {
    fn name(&self) -> &'static str {
        "string-encryption"
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

        let mut key_globals = Vec::new();
        let mut changed = false;
        for global in &mut module.globals {
            if global.encrypted || is_internal_symbol(&global.name) {
                continue;
            }
            if let Initializer::Bytes(bytes) = &mut global.init {
                let key = key_for(&global.name, self.options.seed, self.pointer_size);
                if bytes.is_empty() {
                    continue;
                }
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte ^= key[i % key.len()];
                }
                global.encrypted = true;
                debug!(
                    global = %global.name,
                    key = %hex::encode(&key),
                    "encrypted string global"
                );
                key_globals.push(GlobalVariable {
                    name: format!("__irobf_key_{}", global.name),
                    init: Initializer::Bytes(key),
                    encrypted: false,
                });
                changed = true;
            }
        }

        if changed {
            module.globals.extend(key_globals);
            if module.function(DECRYPT_STUB).is_none() {
                module.functions.push(decrypt_stub());
            }
        }
        Ok(changed)
    }
}

/// Runtime helper that XORs an encrypted global back in place.
fn decrypt_stub() -> Function {
    let mut f = Function::new(DECRYPT_STUB);
    f.blocks.push(BasicBlock::new(
        "entry",
        vec![
            Inst::Other {
                text: "xor.loop %ptr, %key, %len".into(),
            },
            Inst::Ret {
                value: Some("%ptr".into()),
            },
        ],
    ));
    f
}
