//! Shared fixtures: an event-logging pass for observing executor behavior,
//! and a module rich enough to be touched by every transform.

use irobf_core::ir::{BasicBlock, Function, GlobalVariable, Inst, Module};
use irobf_transform::{ObfPass, PassKind};
use irobf_utils::errors::PassError;
use std::sync::{Arc, Mutex};

/// Ordered log of construct/run/finalize events.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A pass that records every lifecycle event it receives.
pub struct RecordingPass {
    name: &'static str,
    kind: PassKind,
    enabled: bool,
    log: EventLog,
}

impl RecordingPass {
    pub fn new(name: &'static str, kind: PassKind, enabled: bool, log: EventLog) -> Self {
        log.lock().unwrap().push(format!("construct {name}"));
        Self {
            name,
            kind,
            enabled,
            log,
        }
    }
}

impl ObfPass for RecordingPass {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> PassKind {
        self.kind
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn run_on_function(&mut self, _module: &mut Module, index: usize) -> Result<bool, PassError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("run {} on fn {index}", self.name));
        Ok(false)
    }

    fn run_on_module(&mut self, _module: &mut Module) -> Result<bool, PassError> {
        self.log.lock().unwrap().push(format!("run {}", self.name));
        Ok(false)
    }

    fn finalize(&mut self, _module: &mut Module) -> Result<bool, PassError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("finalize {}", self.name));
        Ok(false)
    }
}

/// A module with string globals, branches, calls and global accesses, so
/// every transform has something to rewrite.
pub fn rich_module() -> Module {
    let mut module = Module::new("rich", "e-m:e-p:64:64-i64:64");
    module
        .globals
        .push(GlobalVariable::string("greeting", *b"hello world"));
    module.globals.push(GlobalVariable::int("counter", 0));

    let mut main = Function::new("main");
    main.blocks.push(BasicBlock::new(
        "entry",
        vec![
            Inst::LoadGlobal {
                dest: "%c".into(),
                global: "counter".into(),
            },
            Inst::CondBr {
                cond: "%c".into(),
                then_dest: "work".into(),
                else_dest: "exit".into(),
            },
        ],
    ));
    main.blocks.push(BasicBlock::new(
        "work",
        vec![
            Inst::Call {
                callee: "helper".into(),
                args: vec!["%c".into()],
            },
            Inst::StoreGlobal {
                global: "counter".into(),
                value: "%c".into(),
            },
            Inst::Br {
                dest: "exit".into(),
            },
        ],
    ));
    main.blocks
        .push(BasicBlock::new("exit", vec![Inst::Ret { value: None }]));
    module.functions.push(main);

    let mut helper = Function::new("helper");
    helper.blocks.push(BasicBlock::new(
        "entry",
        vec![Inst::Ret {
            value: Some("%x".into()),
        }],
    ));
    module.functions.push(helper);

    module
}
