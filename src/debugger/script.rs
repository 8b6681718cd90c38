use crate::debugger::error::Error;
use crate::debugger::vm::Vm;
use crate::debugger::Debugger;
use crate::protocol::events::{Notification, ScriptParsed};
use crate::protocol::types::ScriptId;
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, error, warn};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Parsed script, immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub id: ScriptId,
    /// Bytecode file the script was loaded from.
    pub file_name: String,
    pub url: String,
    pub source: String,
    pub hash: String,
    pub end_line: i32,
}

fn source_hash(source: &str) -> String {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl Script {
    pub fn new(
        id: ScriptId,
        file_name: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            id,
            file_name: file_name.into(),
            url: url.into(),
            hash: source_hash(&source),
            end_line: source.matches('\n').count() as i32,
            source,
        }
    }

    pub fn parsed_event(&self) -> ScriptParsed {
        ScriptParsed {
            script_id: self.id,
            url: self.url.clone(),
            start_line: 0,
            start_column: 0,
            end_line: self.end_line,
            end_column: 0,
            execution_context_id: 0,
            hash: self.hash.clone(),
        }
    }
}

/// Scripts of the session in registration order. Scripts are never removed.
#[derive(Default)]
pub struct ScriptRegistry {
    scripts: IndexMap<ScriptId, Script>,
}

impl ScriptRegistry {
    /// Id for the next registered script, above every id in use.
    pub fn next_id(&self) -> ScriptId {
        let next = self.scripts.keys().map(|id| id.0 + 1).max().unwrap_or(0);
        ScriptId(next)
    }

    /// Register a script. Returns false and keeps the registered one if the id is taken.
    pub fn insert(&mut self, script: Script) -> bool {
        match self.scripts.entry(script.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(script);
                true
            }
        }
    }

    pub fn get(&self, id: ScriptId) -> Option<&Script> {
        self.scripts.get(&id)
    }

    pub fn find_by_url(&self, url: &str) -> Option<&Script> {
        self.scripts.values().find(|s| s.url == url)
    }

    pub fn find_by_file_name(&self, file_name: &str) -> Option<&Script> {
        self.scripts.values().find(|s| s.file_name == file_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Script> {
        self.scripts.values()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl<V: Vm> Debugger<V> {
    /// Register a script loaded from bytecode file `file_name`.
    /// Returns false if the file is filtered out, has no usable debug information
    /// or a script with the same id or url is already registered.
    pub fn notify_script_parsed(
        &mut self,
        vm: &V,
        script_id: ScriptId,
        file_name: &str,
        entry_point: &str,
    ) -> bool {
        if !self.config.is_allowed_file(file_name) {
            debug!(target: "debugger", "notify script parsed: unsupported file {file_name}");
            return false;
        }

        let Some(file) = vm.find_file(file_name) else {
            error!(target: "debugger", "notify script parsed: unknown file {file_name}");
            return false;
        };
        let Some(extractor) = self.debug_info.for_file(vm, file) else {
            error!(target: "debugger", "notify script parsed: no debug info for {file_name}");
            return false;
        };
        let Some(main_method) = vm.main_method(file, entry_point) else {
            error!(target: "debugger", "notify script parsed: no entry point {entry_point} in {file_name}");
            return false;
        };

        let source = extractor.source_code(main_method);
        let url = extractor.source_file(main_method);
        // too short sources are VM placeholders for missing source code
        if source.len() < self.config.min_source_length {
            error!(target: "debugger", "notify script parsed: invalid file {file_name}");
            return false;
        }
        self.debug_info.register(url.clone(), extractor);

        if self.scripts.find_by_url(&url).is_some() {
            warn!(target: "debugger", "notify script parsed: already loaded {url}");
            return false;
        }

        let script = Script::new(script_id, file_name, url, source);
        let event = script.parsed_event();
        if !self.scripts.insert(script) {
            warn!(target: "debugger", "notify script parsed: script id {script_id} is taken");
            return false;
        }
        self.notify(Notification::ScriptParsed(event));
        true
    }

    pub fn get_script_source(&self, script_id: ScriptId) -> Result<String, Error> {
        self.scripts
            .get(script_id)
            .map(|s| s.source.clone())
            .ok_or(Error::UnknownScriptId(script_id))
    }
}
