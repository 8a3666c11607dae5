use async_trait::async_trait;
use clap::Subcommand;
use irobf_core::ir::Module;
use std::error::Error;
use std::fs;
use std::path::Path;

pub mod obfuscate;
pub mod pipeline;

#[derive(Subcommand)]
pub enum Cmd {
    /// Obfuscate a module, eager protocol driven by CLI switches
    Obfuscate(obfuscate::ObfuscateArgs),

    /// Run a textual pass pipeline the declarative-host way
    Pipeline(pipeline::PipelineArgs),
}

#[async_trait]
pub trait Command {
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Self::Obfuscate(args) => args.execute().await,
            Self::Pipeline(args) => args.execute().await,
        }
    }
}

/// Reads a JSON-serialized module.
pub(crate) fn read_module(path: &Path) -> Result<Module, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes the module as pretty JSON to `output`, or stdout when absent.
pub(crate) fn write_module(module: &Module, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(module)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
