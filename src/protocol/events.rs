use crate::protocol::types::{CallFrame, Location, PauseReason, RemoteObject, ScriptId};
use serde::Serialize;

/// Events pushed to the frontend without a preceding request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum Notification {
    #[serde(rename = "Debugger.scriptParsed")]
    ScriptParsed(ScriptParsed),
    #[serde(rename = "Debugger.scriptFailedToParse")]
    ScriptFailedToParse,
    #[serde(rename = "Debugger.paused")]
    Paused(Paused),
    #[serde(rename = "Debugger.resumed")]
    Resumed,
    #[serde(rename = "Debugger.breakpointResolved")]
    BreakpointResolved(BreakpointResolved),
    #[serde(rename = "Debugger.nativeCalling")]
    NativeCalling(NativeCalling),
}

impl Notification {
    pub fn method(&self) -> &'static str {
        match self {
            Notification::ScriptParsed(_) => "Debugger.scriptParsed",
            Notification::ScriptFailedToParse => "Debugger.scriptFailedToParse",
            Notification::Paused(_) => "Debugger.paused",
            Notification::Resumed => "Debugger.resumed",
            Notification::BreakpointResolved(_) => "Debugger.breakpointResolved",
            Notification::NativeCalling(_) => "Debugger.nativeCalling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsed {
    pub script_id: ScriptId,
    pub url: String,
    pub start_line: i32,
    pub start_column: i32,
    pub end_line: i32,
    pub end_column: i32,
    pub execution_context_id: i32,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paused {
    pub call_frames: Vec<CallFrame>,
    pub reason: PauseReason,
    pub hit_breakpoints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RemoteObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointResolved {
    pub breakpoint_id: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCalling {
    pub native_address: u64,
}
