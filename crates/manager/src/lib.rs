//! Pass orchestration: policy merging, pipeline construction and execution,
//! and the two host invocation adapters.
//!
//! The flow is always the same regardless of which adapter the host comes in
//! through: resolve the configuration file, merge it with the CLI-level
//! switches into an [`policy::EffectivePolicy`], build a [`pipeline::Pipeline`]
//! of passes in dependency order, run it, and finalize every constructed pass
//! exactly once.

pub mod legacy;
pub mod parsing;
pub mod pipeline;
pub mod policy;

pub use legacy::ObfuscationPassManager;
pub use parsing::{claim_pipeline_element, parse_pipeline_text, ObfuscationModulePass};
pub use pipeline::Pipeline;
pub use policy::{EffectivePolicy, ObfFlags};
