use crate::debugger::error::Error;
use crate::debugger::evaluate::decode_compiled_payload;
use crate::debugger::vm::Vm;
use crate::debugger::Debugger;
use crate::protocol::events::{BreakpointResolved, Notification};
use crate::protocol::types::{BreakLocation, Location};
use crate::protocol::{GetPossibleBreakpointsParams, SetBreakpointByUrlParams, SetBreakpointByUrlReturns};
use log::{error, info};
use std::fmt;
use std::str::FromStr;

/// Source coordinates of a breakpoint, encoded into the breakpoint id.
///
/// Ids are derived from source positions, not from VM handles, so they stay valid
/// when a hot reload moves bytecode offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSpec {
    pub line: i32,
    pub column: i32,
    pub url: String,
}

impl BreakpointSpec {
    const PREFIX: &'static str = "id:";

    pub fn new(line: i32, column: i32, url: impl Into<String>) -> Self {
        Self {
            line,
            column,
            url: url.into(),
        }
    }
}

impl fmt::Display for BreakpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}:{}", Self::PREFIX, self.line, self.column, self.url)
    }
}

impl FromStr for BreakpointSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(Self::PREFIX).ok_or(Error::BreakpointIdParse)?;
        // url goes last and may contain ':'
        let mut parts = rest.splitn(3, ':');
        let mut next_num = || -> Result<i32, Error> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or(Error::BreakpointIdParse)
        };
        let line = next_num()?;
        let column = next_num()?;
        let url = parts.next().ok_or(Error::BreakpointIdParse)?;
        Ok(Self::new(line, column, url))
    }
}

impl<V: Vm> Debugger<V> {
    /// Install breakpoints at every bytecode location compiled from source position.
    pub fn set_breakpoint_by_url(
        &mut self,
        vm: &mut V,
        params: SetBreakpointByUrlParams,
    ) -> Result<SetBreakpointByUrlReturns, Error> {
        if !self.session.enabled {
            return Err(Error::NotEnabled("SetBreakpointByUrl"));
        }
        let url = params.url.as_str();
        let line = params.line_number;
        let column = params.column_number.unwrap_or(0);

        let Some(extractor) = self.debug_info.for_url(vm, url) else {
            error!(target: "debugger", "set breakpoint: no debug info for {url}");
            return Err(Error::UnknownFile);
        };
        let Some(script_id) = self.scripts.find_by_url(url).map(|s| s.id) else {
            error!(target: "debugger", "set breakpoint: unknown url {url}");
            return Err(Error::UnknownFile);
        };

        let matches = extractor.locations_at(line, column, url);
        if matches.is_empty() {
            error!(target: "debugger", "set breakpoint: no location at {line}:{column}");
            return Err(Error::BreakpointNotFound);
        }

        let condition = match params.condition.as_deref() {
            Some(encoded) if !encoded.is_empty() => {
                let payload = decode_compiled_payload(V::BYTECODE_MAGIC, encoded)
                    .ok_or(Error::ConditionDecode)?;
                Some(vm.compile_function(&payload).ok_or(Error::ConditionCompile)?)
            }
            _ => None,
        };

        let mut locations = vec![];
        for location in matches {
            info!(target: "debugger", "set breakpoint location: {location:?}");
            if !vm.set_breakpoint(&location, condition.clone()) {
                continue;
            }
            let resolved_line = extractor
                .line_for_offset(location.method, location.offset)
                .unwrap_or(line);
            let resolved_column = extractor
                .column_for_offset(location.method, location.offset)
                .unwrap_or(0);
            locations.push(Location::new(script_id, resolved_line, resolved_column));
        }
        if locations.is_empty() {
            error!(target: "debugger", "set breakpoint: VM refused every location at {line}:{column}");
            return Err(Error::BreakpointNotFound);
        }

        let breakpoint_id = BreakpointSpec::new(line, 0, url).to_string();
        for location in &locations {
            self.notify(Notification::BreakpointResolved(BreakpointResolved {
                breakpoint_id: breakpoint_id.clone(),
                location: location.clone(),
            }));
        }

        Ok(SetBreakpointByUrlReturns {
            breakpoint_id,
            locations,
        })
    }

    /// Remove every VM breakpoint installed for a breakpoint id.
    pub fn remove_breakpoint(&mut self, vm: &mut V, breakpoint_id: &str) -> Result<(), Error> {
        info!(target: "debugger", "remove breakpoint: {breakpoint_id}");
        let spec: BreakpointSpec = breakpoint_id.parse()?;

        let Some(extractor) = self.debug_info.for_url(vm, &spec.url) else {
            error!(target: "debugger", "remove breakpoint: no debug info for {}", spec.url);
            return Err(Error::UnknownFile);
        };
        if self.scripts.find_by_url(&spec.url).is_none() {
            error!(target: "debugger", "remove breakpoint: unknown url {}", spec.url);
            return Err(Error::UnknownFile);
        }

        let removed = extractor
            .locations_at(spec.line, spec.column, &spec.url)
            .iter()
            .filter(|location| vm.remove_breakpoint(location))
            .count();
        if removed == 0 {
            error!(target: "debugger", "remove breakpoint: nothing installed at {}:{}", spec.line, spec.column);
            return Err(Error::BreakpointNotFound);
        }
        Ok(())
    }

    /// Positions where the VM is able to break, without installing anything.
    pub fn get_possible_breakpoints(
        &self,
        vm: &V,
        params: &GetPossibleBreakpointsParams,
    ) -> Result<Vec<BreakLocation>, Error> {
        let start = &params.start;
        let script = self.scripts.get(start.script_id).ok_or(Error::UnknownFile)?;
        let Some(extractor) = self.debug_info.for_url(vm, &script.url) else {
            error!(target: "debugger", "possible breakpoints: no debug info for {}", script.url);
            return Err(Error::UnknownFile);
        };

        let start_column = start.column_number.unwrap_or(0);
        let candidates: Vec<(i32, i32)> = match &params.end {
            None => vec![(start.line_number, start_column)],
            // no bytecode maps past the last line of the script
            Some(end) => (start.line_number..end.line_number.min(script.end_line + 1))
                .map(|line| {
                    let column = if line == start.line_number {
                        start_column
                    } else {
                        0
                    };
                    (line, column)
                })
                .collect(),
        };

        Ok(candidates
            .into_iter()
            .filter(|&(line, column)| !extractor.locations_at(line, column, &script.url).is_empty())
            .map(|(line, column)| BreakLocation {
                script_id: script.id,
                line_number: line,
                column_number: column,
            })
            .collect())
    }
}
