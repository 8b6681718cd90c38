use crate::debugger::error::Error;
use crate::debugger::vm::{BytecodeLocation, FileId, MethodId, Vm};
use std::collections::HashMap;
use std::rc::Rc;

/// Line of bytecode without source counterpart.
pub const SPECIAL_LINE_MARK: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTableEntry {
    pub offset: u32,
    pub line: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub register: u32,
}

/// Query contract of a source <-> bytecode mapping built for one loaded bytecode file.
pub trait DebugInfoExtractor {
    fn source_code(&self, method: MethodId) -> String;
    /// Url of the source the method was compiled from.
    fn source_file(&self, method: MethodId) -> String;
    fn line_for_offset(&self, method: MethodId, offset: u32) -> Option<i32>;
    fn column_for_offset(&self, method: MethodId, offset: u32) -> Option<i32>;
    /// Line table sorted by offset.
    fn line_table(&self, method: MethodId) -> Vec<LineTableEntry>;
    fn local_variable_table(&self, method: MethodId) -> Vec<LocalVariable>;
    /// All bytecode locations compiled from source position.
    fn locations_at(&self, line: i32, column: i32, url: &str) -> Vec<BytecodeLocation>;
}

/// Extractors of parsed scripts, indexed by source url.
#[derive(Default)]
pub struct DebugInfoBridge {
    by_url: HashMap<String, Rc<dyn DebugInfoExtractor>>,
}

impl DebugInfoBridge {
    pub fn register(&mut self, url: impl Into<String>, extractor: Rc<dyn DebugInfoExtractor>) {
        self.by_url.insert(url.into(), extractor);
    }

    /// Extractor used for breakpoint matching. A hot reload patch for the url wins
    /// over the originally loaded file.
    pub fn for_url<V: Vm>(&self, vm: &V, url: &str) -> Option<Rc<dyn DebugInfoExtractor>> {
        vm.patch_extractor(url)
            .or_else(|| self.by_url.get(url).cloned())
    }

    pub fn for_file<V: Vm>(&self, vm: &V, file: FileId) -> Option<Rc<dyn DebugInfoExtractor>> {
        vm.extractor(file)
    }

    /// Map bytecode offset to source `(line, column)`.
    pub fn source_position(
        extractor: &dyn DebugInfoExtractor,
        method: MethodId,
        offset: u32,
    ) -> Result<(i32, i32), Error> {
        let unmapped = || Error::UnmappedOffset {
            method: method.0,
            offset,
        };
        let line = extractor
            .line_for_offset(method, offset)
            .ok_or_else(unmapped)?;
        let column = extractor
            .column_for_offset(method, offset)
            .ok_or_else(unmapped)?;
        Ok((line, column))
    }

    /// First line of a method and the line next to its last one.
    pub fn line_table_bounds(
        extractor: &dyn DebugInfoExtractor,
        method: MethodId,
    ) -> Option<(i32, i32)> {
        let table = extractor.line_table(method);
        let first = table.first()?;
        let last = table.last()?;
        Some((first.line, last.line + 1))
    }
}
