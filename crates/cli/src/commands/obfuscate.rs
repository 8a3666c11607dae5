/// Module for the `obfuscate` subcommand, which drives the eager pass
/// manager over a JSON-serialized module.
///
/// Switch names follow the host convention: an `--irobf` umbrella plus one
/// switch per transform. Setting any transform switch implies the umbrella.
use async_trait::async_trait;
use clap::Args;
use irobf_manager::{ObfFlags, ObfuscationPassManager};
use std::error::Error;
use std::path::PathBuf;

/// Arguments for the `obfuscate` subcommand.
#[derive(Args)]
pub struct ObfuscateArgs {
    /// Input module as JSON.
    pub input: PathBuf,
    /// Where to write the transformed module (default: stdout).
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Enable IR obfuscation (umbrella switch).
    #[arg(long = "irobf")]
    enable: bool,
    /// Enable indirect branch obfuscation.
    #[arg(long = "irobf-indbr")]
    indirect_branch: bool,
    /// Enable indirect call obfuscation.
    #[arg(long = "irobf-icall")]
    indirect_call: bool,
    /// Enable indirect global variable obfuscation.
    #[arg(long = "irobf-indgv")]
    indirect_global_variable: bool,
    /// Enable control flow flattening.
    #[arg(long = "irobf-cff")]
    flattening: bool,
    /// Enable constant string encryption.
    #[arg(long = "irobf-cse")]
    string_encryption: bool,
    /// Configuration file path (default: ~/irobf.yaml if present).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ObfuscateArgs {
    fn flags(&self) -> ObfFlags {
        ObfFlags {
            enable: self.enable,
            indirect_branch: self.indirect_branch,
            indirect_call: self.indirect_call,
            indirect_global_variable: self.indirect_global_variable,
            flattening: self.flattening,
            string_encryption: self.string_encryption,
        }
    }
}

/// Executes the `obfuscate` subcommand.
#[async_trait]
impl super::Command for ObfuscateArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let mut module = super::read_module(&self.input)?;

        let mut manager = ObfuscationPassManager::new(self.flags(), self.config.clone());
        let changed = manager.obfuscate(&mut module)?;

        if changed {
            eprintln!("✅ Obfuscation complete: module '{}' changed", module.name);
        } else {
            eprintln!("Module '{}' unchanged", module.name);
        }

        super::write_module(&module, self.output.as_deref())
    }
}
