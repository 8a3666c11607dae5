//! Property tests over the orchestration layer.

use crate::harness::{events, new_log, rich_module, RecordingPass};
use irobf_core::ir::{BasicBlock, Function, Inst, Module};
use irobf_manager::{EffectivePolicy, ObfFlags, ObfuscationPassManager, Pipeline};
use irobf_core::plugin::LegacyModulePass;
use irobf_transform::options::ObfuscationOptions;
use irobf_transform::{ObfPass, PassKind};
use irobf_utils::errors::PassError;
use std::path::PathBuf;
use std::sync::Arc;

fn no_config() -> Option<PathBuf> {
    // A path that never exists, so a developer's ~/irobf.yaml cannot leak in.
    Some(PathBuf::from("/nonexistent/irobf-test.yaml"))
}

// Everything off: the pipeline never runs and the module is untouched.
#[test]
fn umbrella_short_circuit() {
    let policy = EffectivePolicy::merge(ObfFlags::default(), &ObfuscationOptions::default());
    assert!(!policy.active());

    let mut module = rich_module();
    let before = serde_json::to_string(&module).unwrap();
    let mut manager = ObfuscationPassManager::new(ObfFlags::default(), no_config());
    let changed = manager.obfuscate(&mut module).unwrap();
    assert!(!changed);
    assert_eq!(serde_json::to_string(&module).unwrap(), before);
}

// Any single specific flag promotes the umbrella, from either source.
#[test]
fn umbrella_auto_activation() {
    let setters: [fn(&mut ObfFlags); 5] = [
        |f| f.indirect_branch = true,
        |f| f.indirect_call = true,
        |f| f.indirect_global_variable = true,
        |f| f.flattening = true,
        |f| f.string_encryption = true,
    ];
    for set in setters {
        let mut flags = ObfFlags::default();
        set(&mut flags);
        assert!(!flags.enable);
        let policy = EffectivePolicy::merge(flags, &ObfuscationOptions::default());
        assert!(policy.active());
    }

    // Config-file-only activation, with every CLI flag false.
    let options = ObfuscationOptions {
        flattening: true,
        ..Default::default()
    };
    let policy = EffectivePolicy::merge(ObfFlags::default(), &options);
    assert!(policy.active());
    assert!(policy.flattening);
}

// CLI and config merge by logical OR, observed through a real config file.
#[test]
fn cli_and_config_or_merge_end_to_end() {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "indirect_call: true").unwrap();

    let cli = ObfFlags {
        flattening: true,
        ..Default::default()
    };
    let options = ObfuscationOptions::resolve(Some(file.path()));
    let policy = EffectivePolicy::merge(cli, &options);
    assert!(policy.active());
    assert!(policy.flattening);
    assert!(policy.indirect_call);
    assert!(!policy.indirect_branch);
    assert!(!policy.string_encryption);
}

// Finalize count equals construct count and preserves construction order,
// enabled or not.
#[test]
fn construction_finalization_pairing() {
    let log = new_log();
    let passes: Vec<Box<dyn ObfPass>> = vec![
        Box::new(RecordingPass::new(
            "first",
            PassKind::WholeModule,
            true,
            log.clone(),
        )),
        Box::new(RecordingPass::new(
            "second",
            PassKind::WholeModule,
            false,
            log.clone(),
        )),
        Box::new(RecordingPass::new(
            "third",
            PassKind::WholeModule,
            true,
            log.clone(),
        )),
    ];
    let pipeline = Pipeline::from_passes(passes);
    let mut module = Module::new("m", "e-p:64:64");
    pipeline.execute(&mut module).unwrap();

    assert_eq!(
        events(&log),
        [
            "construct first",
            "construct second",
            "construct third",
            "run first",
            "run second",
            "run third",
            "finalize first",
            "finalize second",
            "finalize third",
        ]
    );
}

// Umbrella on with no specific flags: exactly the four control-flow passes
// are constructed, all disabled, and the module is untouched.
#[test]
fn unconditional_construction_conditional_effect() {
    let flags = ObfFlags {
        enable: true,
        ..Default::default()
    };
    let options = Arc::new(ObfuscationOptions::default());
    let policy = EffectivePolicy::merge(flags, &options);
    let pipeline = Pipeline::build(&policy, 8, options);

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
    let before = serde_json::to_string(&module).unwrap();
    let changed = pipeline.execute(&mut module).unwrap();
    assert!(!changed);
    assert_eq!(serde_json::to_string(&module).unwrap(), before);
}

// Full policy: fixed dependency order with string encryption first.
#[test]
fn pass_ordering() {
    let flags = ObfFlags {
        enable: true,
        indirect_branch: true,
        indirect_call: true,
        indirect_global_variable: true,
        flattening: true,
        string_encryption: true,
    };
    let options = Arc::new(ObfuscationOptions::default());
    let policy = EffectivePolicy::merge(flags, &options);
    let pipeline = Pipeline::build(&policy, 8, options);
    assert_eq!(
        pipeline.pass_names(),
        [
            "string-encryption",
            "flattening",
            "indirect-branch",
            "indirect-call",
            "indirect-global-variable",
        ]
    );
}

// Disabled units are byte-level no-ops on any module.
#[test]
fn disabled_units_are_idempotent() {
    let options = Arc::new(ObfuscationOptions::default());
    let mut module = rich_module();
    let before = serde_json::to_string(&module).unwrap();

    let disabled: Vec<Box<dyn ObfPass>> = vec![
        Box::new(irobf_transform::string_encryption::StringEncryption::new(
            8,
            false,
            options.clone(),
        )),
        Box::new(irobf_transform::flattening::Flattening::new(
            8,
            false,
            options.clone(),
        )),
        Box::new(irobf_transform::indirect_branch::IndirectBranch::new(
            8,
            false,
            options.clone(),
        )),
        Box::new(irobf_transform::indirect_call::IndirectCall::new(
            8,
            false,
            options.clone(),
        )),
        Box::new(
            irobf_transform::indirect_global_variable::IndirectGlobalVariable::new(
                8, false, options,
            ),
        ),
    ];
    let changed = Pipeline::from_passes(disabled).execute(&mut module).unwrap();
    assert!(!changed);
    assert_eq!(serde_json::to_string(&module).unwrap(), before);
}

// A per-function pass that appends a function mid-run: the executor
// re-evaluates the function list, so the new function is visited too.
struct AppendingPass {
    appended: bool,
    visited: crate::harness::EventLog,
}

impl ObfPass for AppendingPass {
    fn name(&self) -> &'static str {
        "appending"
    }
    fn kind(&self) -> PassKind {
        PassKind::PerFunction
    }
    fn enabled(&self) -> bool {
        true
    }
    fn run_on_function(&mut self, module: &mut Module, index: usize) -> Result<bool, PassError> {
        self.visited
            .lock()
            .unwrap()
            .push(module.functions[index].name.clone());
        if !self.appended {
            self.appended = true;
            let mut f = Function::new("late");
            f.blocks
                .push(BasicBlock::new("entry", vec![Inst::Ret { value: None }]));
            module.functions.push(f);
            return Ok(true);
        }
        Ok(false)
    }
}

#[test]
fn per_function_walk_sees_appended_functions() {
    let mut module = rich_module();
    let visited = new_log();
    let pipeline = Pipeline::from_passes(vec![Box::new(AppendingPass {
        appended: false,
        visited: visited.clone(),
    })]);
    let changed = pipeline.execute(&mut module).unwrap();
    assert!(changed);
    assert!(module.function("late").is_some());
    // Every function was visited exactly once, including the appended one.
    assert_eq!(events(&visited), ["main", "helper", "late"]);
}

// Run errors still reach the caller through the eager adapter, after
// finalization.
struct ExplodingPass;

impl ObfPass for ExplodingPass {
    fn name(&self) -> &'static str {
        "exploding"
    }
    fn kind(&self) -> PassKind {
        PassKind::WholeModule
    }
    fn enabled(&self) -> bool {
        true
    }
    fn run_on_module(&mut self, _module: &mut Module) -> Result<bool, PassError> {
        Err(PassError::Failed("synthetic".into()))
    }
}

#[test]
fn pass_failure_surfaces_after_cleanup() {
    let log = new_log();
    let passes: Vec<Box<dyn ObfPass>> = vec![
        Box::new(RecordingPass::new(
            "witness",
            PassKind::WholeModule,
            true,
            log.clone(),
        )),
        Box::new(ExplodingPass),
    ];
    let mut module = Module::new("m", "e-p:64:64");
    let err = Pipeline::from_passes(passes)
        .execute(&mut module)
        .unwrap_err();
    assert!(matches!(
        err,
        irobf_utils::errors::PipelineError::Pass {
            pass: "exploding",
            ..
        }
    ));
    // The witness pass was still finalized.
    assert!(events(&log).contains(&"finalize witness".to_string()));
}

// The split legacy protocol drives the same pipeline as the inline helper.
#[test]
fn legacy_protocol_run_then_finalize() {
    let flags = ObfFlags {
        string_encryption: true,
        ..Default::default()
    };
    let mut module = rich_module();
    let mut manager = ObfuscationPassManager::new(flags, no_config());
    assert!(manager.run_on_module(&mut module).unwrap());
    assert!(!manager.finalize(&mut module).unwrap());
    assert!(module.global("greeting").unwrap().encrypted);
}
