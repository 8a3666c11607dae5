//! The module-level intermediate representation the obfuscation passes rewrite.
//!
//! The model is deliberately small: named functions made of labeled blocks,
//! an instruction set that distinguishes the control-flow and symbol-access
//! shapes the passes care about, and globals that double as storage for the
//! address tables the indirection passes emit. Everything is serde-friendly
//! so modules round-trip through JSON for the CLI and tests.

use serde::{Deserialize, Serialize};

/// Target data layout string, e.g. `"e-m:e-p:64:64-i64:64"`.
///
/// Only the pointer field is interpreted; the rest is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataLayout {
    raw: String,
}

impl DataLayout {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Pointer allocation size in bytes, from the `p:<bits>` layout field.
    ///
    /// Layouts without a pointer field default to 8 bytes.
    pub fn pointer_size(&self) -> u32 {
        for field in self.raw.split('-') {
            if let Some(rest) = field.strip_prefix("p:") {
                let bits = rest.split(':').next().unwrap_or("");
                if let Ok(bits) = bits.parse::<u32>() {
                    return bits.div_ceil(8);
                }
            }
        }
        8
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A whole compilation unit: the unit of work for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub data_layout: DataLayout,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVariable>,
}

impl Module {
    pub fn new(name: impl Into<String>, data_layout: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_layout: DataLayout::new(data_layout),
            functions: Vec::new(),
            globals: Vec::new(),
        }
    }

    /// Pointer size in bytes for this module's target.
    pub fn pointer_size(&self) -> u32 {
        self.data_layout.pointer_size()
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn global_mut(&mut self, name: &str) -> Option<&mut GlobalVariable> {
        self.globals.iter_mut().find(|g| g.name == name)
    }

    /// Returns the symbols of the address table global `name`, if present.
    pub fn address_table(&self, name: &str) -> Option<&[String]> {
        match self.global(name) {
            Some(GlobalVariable {
                init: Initializer::AddressTable(entries),
                ..
            }) => Some(entries),
            _ => None,
        }
    }

    /// Replaces the address table global `name`, creating it if missing.
    pub fn upsert_address_table(&mut self, name: &str, entries: Vec<String>) {
        match self.global_mut(name) {
            Some(global) => global.init = Initializer::AddressTable(entries),
            None => self.globals.push(GlobalVariable {
                name: name.to_string(),
                init: Initializer::AddressTable(entries),
                encrypted: false,
            }),
        }
    }
}

/// A named function: an ordered list of labeled basic blocks.
///
/// The first block is the entry block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }
}

/// A labeled straight-line instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub label: String,
    pub insts: Vec<Inst>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>, insts: Vec<Inst>) -> Self {
        Self {
            label: label.into(),
            insts,
        }
    }
}

/// The instruction shapes the obfuscation passes pattern-match on.
///
/// `Other` carries everything the pipeline treats as opaque straight-line
/// code; passes must preserve it byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inst {
    /// Unconditional branch to a labeled block.
    Br { dest: String },
    /// Two-way conditional branch.
    CondBr {
        cond: String,
        then_dest: String,
        else_dest: String,
    },
    /// Branch through a slot of an address table global.
    IndirectBr { table: String, slot: usize },
    /// Conditional branch where both targets go through an address table.
    IndirectCondBr {
        cond: String,
        table: String,
        then_slot: usize,
        else_slot: usize,
    },
    /// Direct call to a named function.
    Call { callee: String, args: Vec<String> },
    /// Call through a slot of an address table global.
    IndirectCall {
        table: String,
        slot: usize,
        args: Vec<String>,
    },
    /// Read a named global into a virtual register.
    LoadGlobal { dest: String, global: String },
    /// Read a global through a slot of an address table.
    IndirectLoadGlobal {
        dest: String,
        table: String,
        slot: usize,
    },
    /// Write a value to a named global.
    StoreGlobal { global: String, value: String },
    /// Write a global through a slot of an address table.
    IndirectStoreGlobal {
        table: String,
        slot: usize,
        value: String,
    },
    /// Multi-way dispatch on an integer value.
    Switch {
        value: String,
        default: String,
        cases: Vec<(i64, String)>,
    },
    /// Function return.
    Ret { value: Option<String> },
    /// Opaque non-control instruction, preserved verbatim.
    Other { text: String },
}

/// A module-level global with its initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    pub init: Initializer,
    /// Set once the string-encryption pass has rewritten the initializer.
    #[serde(default)]
    pub encrypted: bool,
}

impl GlobalVariable {
    /// A byte-string constant, the input shape for string encryption.
    pub fn string(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            init: Initializer::Bytes(bytes.into()),
            encrypted: false,
        }
    }

    pub fn int(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            init: Initializer::Int(value),
            encrypted: false,
        }
    }

    /// Whether this global is a plain byte-string constant.
    pub fn is_string(&self) -> bool {
        matches!(self.init, Initializer::Bytes(_))
    }
}

/// Global initializer payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initializer {
    /// Raw bytes, typically a string constant.
    Bytes(Vec<u8>),
    Int(i64),
    /// Ordered symbol table emitted by the indirection passes.
    AddressTable(Vec<String>),
    Zero,
}
