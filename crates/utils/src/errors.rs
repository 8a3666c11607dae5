use thiserror::Error;

/// Error type for configuration loading and parsing.
///
/// Callers treat every variant as recoverable: a broken configuration file
/// falls back to default options with a warning, it never aborts the host.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("could not read configuration file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file content is not valid YAML for the schema.
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_yaml::Error),
}

/// Error type for individual obfuscation passes.
#[derive(Debug, Error)]
pub enum PassError {
    /// A rewrite referenced a symbol that is not defined in the module.
    #[error("unknown symbol '{0}' referenced during rewrite")]
    UnknownSymbol(String),
    /// A per-function pass was handed an index past the end of the function list.
    #[error("function index {0} out of bounds")]
    FunctionIndex(usize),
    /// An address table global exists but does not hold an address table.
    #[error("global '{0}' is not an address table")]
    NotAnAddressTable(String),
    /// Catch-all for pass-internal failures.
    #[error("pass failed: {0}")]
    Failed(String),
}

/// Error type for pipeline construction and execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline was driven out of order (e.g. finalized before run).
    #[error("pipeline is {state}, cannot {action}")]
    State {
        state: &'static str,
        action: &'static str,
    },
    /// A pass failed while running or finalizing.
    #[error("pass '{pass}' failed: {source}")]
    Pass {
        pass: &'static str,
        #[source]
        source: PassError,
    },
    /// An inner pipeline element named something no transform answers to.
    #[error("unknown pipeline element '{0}'")]
    UnknownElement(String),
    /// The pipeline description text itself could not be parsed.
    #[error("malformed pipeline text: {0}")]
    MalformedPipeline(String),
    /// Configuration loading failed in a non-recoverable way.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
