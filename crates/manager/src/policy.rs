//! CLI-level switches and the effective-policy merge.

use irobf_transform::options::ObfuscationOptions;

/// The boolean switches the host's command line exposes.
///
/// One umbrella switch plus one switch per transform, all defaulting to off.
/// These are plain values handed to the adapters at construction; nothing in
/// the pipeline reads ambient process-wide state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObfFlags {
    /// Umbrella switch gating the whole pipeline.
    pub enable: bool,
    pub indirect_branch: bool,
    pub indirect_call: bool,
    pub indirect_global_variable: bool,
    pub flattening: bool,
    pub string_encryption: bool,
}

impl ObfFlags {
    /// Whether any transform-specific switch is set.
    pub const fn any_specific(&self) -> bool {
        self.indirect_branch
            || self.indirect_call
            || self.indirect_global_variable
            || self.flattening
            || self.string_encryption
    }
}

/// The final enablement decision per transform, after merging every source.
///
/// Computed fresh per module invocation and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectivePolicy {
    pub enable: bool,
    pub indirect_branch: bool,
    pub indirect_call: bool,
    pub indirect_global_variable: bool,
    pub flattening: bool,
    pub string_encryption: bool,
}

impl EffectivePolicy {
    /// Merges CLI switches with the resolved configuration: per transform the
    /// effective flag is the OR of both sources, and the umbrella activates
    /// whenever either source set it or any effective transform flag is set.
    pub fn merge(cli: ObfFlags, options: &ObfuscationOptions) -> Self {
        let indirect_branch = cli.indirect_branch || options.indirect_branch;
        let indirect_call = cli.indirect_call || options.indirect_call;
        let indirect_global_variable =
            cli.indirect_global_variable || options.indirect_global_variable;
        let flattening = cli.flattening || options.flattening;
        let string_encryption = cli.string_encryption || options.string_encryption;
        let enable = cli.enable
            || options.enable
            || indirect_branch
            || indirect_call
            || indirect_global_variable
            || flattening
            || string_encryption;
        Self {
            enable,
            indirect_branch,
            indirect_call,
            indirect_global_variable,
            flattening,
            string_encryption,
        }
    }

    /// Whether the pipeline should run at all.
    pub const fn active(&self) -> bool {
        self.enable
    }
}
