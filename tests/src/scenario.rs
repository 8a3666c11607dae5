//! End-to-end scenario: only the flattening switch is set, the configuration
//! file is absent. The umbrella self-activates, the pipeline constructs the
//! four control-flow passes (flattening enabled, the rest disabled), skips
//! string encryption entirely, and the changed flag is flattening's own.

use crate::harness::rich_module;
use irobf_manager::{EffectivePolicy, ObfFlags, ObfuscationPassManager, Pipeline};
use irobf_transform::options::ObfuscationOptions;
use std::path::PathBuf;
use std::sync::Arc;

#[test]
fn flattening_only_scenario() {
    let flags = ObfFlags {
        flattening: true,
        ..Default::default()
    };
    let options = ObfuscationOptions::resolve(Some(&PathBuf::from("/nonexistent/irobf.yaml")));
    let policy = EffectivePolicy::merge(flags, &options);

    assert!(policy.active());
    assert!(policy.flattening);
    assert!(!policy.string_encryption);
    assert!(!policy.indirect_branch && !policy.indirect_call);
    assert!(!policy.indirect_global_variable);

    let pipeline = Pipeline::build(&policy, 8, Arc::new(options));
    assert_eq!(
        pipeline.pass_names(),
        [
            "flattening",
            "indirect-branch",
            "indirect-call",
            "indirect-global-variable",
        ]
    );

    let mut module = rich_module();
    let changed = pipeline.execute(&mut module).unwrap();
    assert!(changed, "flattening must report the module as changed");

    let main = module.function("main").unwrap();
    assert!(main.block("__irobf_dispatch").is_some());

    // The disabled passes left no trace.
    assert!(!module.global("greeting").unwrap().encrypted);
    assert!(module.address_table("__irobf_icall").is_none());
    assert!(module.address_table("__irobf_indgv").is_none());
    assert!(module.address_table("__irobf_indbr_main").is_none());
}

#[test]
fn full_policy_touches_everything() {
    let flags = ObfFlags {
        enable: true,
        indirect_branch: true,
        indirect_call: true,
        indirect_global_variable: true,
        flattening: true,
        string_encryption: true,
    };
    let mut module = rich_module();
    let mut manager = ObfuscationPassManager::new(
        flags,
        Some(PathBuf::from("/nonexistent/irobf.yaml")),
    );
    let changed = manager.obfuscate(&mut module).unwrap();
    assert!(changed);

    assert!(module.global("greeting").unwrap().encrypted);
    assert!(module.function("__irobf_decrypt_stub").is_some());
    assert!(module.function("main").unwrap().block("__irobf_dispatch").is_some());
    assert!(module.address_table("__irobf_indbr_main").is_some());
    assert!(module.address_table("__irobf_icall").is_some());
    assert!(module.address_table("__irobf_indgv").is_some());
}
