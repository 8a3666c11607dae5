/// Module for the `pipeline` subcommand, which mimics a declarative host:
/// it parses pipeline description text, offers each top-level element to the
/// obfuscation adapter, and runs whatever the adapter claims. Elements the
/// adapter declines are reported and skipped, as a real host would hand them
/// to other pass plugins.
use async_trait::async_trait;
use clap::Args;
use irobf_core::plugin::{ModuleAnalysisManager, PreservedAnalyses};
use irobf_manager::{claim_pipeline_element, parse_pipeline_text, ObfFlags};
use std::error::Error;
use std::path::PathBuf;

/// Arguments for the `pipeline` subcommand.
#[derive(Args)]
pub struct PipelineArgs {
    /// Input module as JSON.
    pub input: PathBuf,
    /// Where to write the transformed module (default: stdout).
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Pipeline description, e.g. "irobf(irobf-cff,irobf-cse)".
    #[arg(long)]
    passes: String,
    /// Configuration file path (default: ~/irobf.yaml if present).
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Executes the `pipeline` subcommand.
#[async_trait]
impl super::Command for PipelineArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let mut module = super::read_module(&self.input)?;
        let elements = parse_pipeline_text(&self.passes)?;

        for element in &elements {
            match claim_pipeline_element(element, ObfFlags::default(), self.config.clone())? {
                Some(mut pass) => {
                    let mut analysis_manager = ModuleAnalysisManager::default();
                    let preserved = pass.run(&mut module, &mut analysis_manager);
                    match preserved {
                        PreservedAnalyses::None => {
                            eprintln!("'{}' changed the module, analyses invalidated", element.name);
                        }
                        PreservedAnalyses::All => {
                            eprintln!("'{}' left the module unchanged", element.name);
                        }
                    }
                }
                None => eprintln!("'{}' is not ours, skipping", element.name),
            }
        }

        super::write_module(&module, self.output.as_deref())
    }
}
