//! Declarative invocation adapter: pipeline-text parsing.
//!
//! The host describes its pass pipeline as text like
//! `irobf(irobf-cff,irobf-cse)`. A pass manager claims the `irobf` element,
//! folds the inner element names into a fresh flag snapshot, and hands back
//! a pass object the host schedules into its module pipeline. Elements with
//! any other top-level name are declined so another handler can try them.

use crate::legacy::ObfuscationPassManager;
use crate::policy::ObfFlags;
use irobf_core::ir::Module;
use irobf_core::plugin::{ModuleAnalysisManager, PipelineElement, PreservedAnalyses};
use irobf_utils::errors::PipelineError;
use std::path::PathBuf;
use tracing::error;

/// Top-level element name this adapter answers to.
pub const PIPELINE_NAME: &str = "irobf";

/// Inner element names, one per transform.
pub const ELEMENT_INDIRECT_BRANCH: &str = "irobf-indbr";
pub const ELEMENT_INDIRECT_CALL: &str = "irobf-icall";
pub const ELEMENT_INDIRECT_GV: &str = "irobf-indgv";
pub const ELEMENT_FLATTENING: &str = "irobf-cff";
pub const ELEMENT_STRING_ENCRYPTION: &str = "irobf-cse";

/// Claims an `irobf` pipeline element, or returns `Ok(None)` for elements
/// belonging to someone else.
///
/// The returned pass carries its own flag snapshot built from `base` plus
/// the inner elements; nothing process-wide is mutated. Inner names that
/// match no transform are an error, a claimed element must be fully
/// understood.
pub fn claim_pipeline_element(
    element: &PipelineElement,
    base: ObfFlags,
    config_path: Option<PathBuf>,
) -> Result<Option<ObfuscationModulePass>, PipelineError> {
    if element.name != PIPELINE_NAME {
        return Ok(None);
    }

    let mut flags = base;
    flags.enable = true;
    for inner in &element.inner {
        match inner.name.as_str() {
            PIPELINE_NAME => flags.enable = true,
            ELEMENT_INDIRECT_BRANCH => flags.indirect_branch = true,
            ELEMENT_INDIRECT_CALL => flags.indirect_call = true,
            ELEMENT_INDIRECT_GV => flags.indirect_global_variable = true,
            ELEMENT_FLATTENING => flags.flattening = true,
            ELEMENT_STRING_ENCRYPTION => flags.string_encryption = true,
            other => return Err(PipelineError::UnknownElement(other.to_string())),
        }
    }
    Ok(Some(ObfuscationModulePass::new(flags, config_path)))
}

/// The pass object the declarative host schedules after a successful claim.
///
/// Execution is deferred to the host's own invocation of [`run`](Self::run).
#[derive(Debug)]
pub struct ObfuscationModulePass {
    flags: ObfFlags,
    config_path: Option<PathBuf>,
}

impl ObfuscationModulePass {
    pub fn new(flags: ObfFlags, config_path: Option<PathBuf>) -> Self {
        Self { flags, config_path }
    }

    pub const fn flags(&self) -> ObfFlags {
        self.flags
    }

    /// Runs the full merge/build/execute/finalize sequence and reports which
    /// analyses survive: none if the module changed, all if it did not.
    ///
    /// Pass failures go to the error log; the module may have been partially
    /// rewritten by then, so analyses are conservatively invalidated.
    pub fn run(
        &mut self,
        module: &mut Module,
        analysis_manager: &mut ModuleAnalysisManager,
    ) -> PreservedAnalyses {
        let mut manager = ObfuscationPassManager::new(self.flags, self.config_path.clone());
        match manager.obfuscate(module) {
            Ok(true) => {
                analysis_manager.invalidate_all();
                PreservedAnalyses::None
            }
            Ok(false) => PreservedAnalyses::All,
            Err(err) => {
                error!(module = %module.name, "obfuscation failed: {err}");
                analysis_manager.invalidate_all();
                PreservedAnalyses::None
            }
        }
    }
}

/// Parses pipeline description text into elements.
///
/// Grammar: comma-separated names, each optionally followed by a
/// parenthesized inner list, nested arbitrarily, e.g.
/// `verify,irobf(irobf-cff,irobf-indbr),codegen`.
pub fn parse_pipeline_text(text: &str) -> Result<Vec<PipelineElement>, PipelineError> {
    let mut parser = Parser { text, pos: 0 };
    let elements = parser.element_list()?;
    if parser.pos != parser.text.len() {
        return Err(PipelineError::MalformedPipeline(format!(
            "unexpected '{}' at offset {}",
            &parser.text[parser.pos..],
            parser.pos
        )));
    }
    Ok(elements)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn element_list(&mut self) -> Result<Vec<PipelineElement>, PipelineError> {
        let mut elements = Vec::new();
        loop {
            elements.push(self.element()?);
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                return Ok(elements);
            }
        }
    }

    fn element(&mut self) -> Result<PipelineElement, PipelineError> {
        let name = self.name()?;
        let mut inner = Vec::new();
        if self.peek() == Some('(') {
            self.pos += 1;
            inner = self.element_list()?;
            if self.peek() != Some(')') {
                return Err(PipelineError::MalformedPipeline(format!(
                    "unclosed '(' in element '{name}'"
                )));
            }
            self.pos += 1;
        }
        Ok(PipelineElement::with_inner(name, inner))
    }

    fn name(&mut self) -> Result<String, PipelineError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(PipelineError::MalformedPipeline(format!(
                "expected element name at offset {start}"
            )));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }
}
