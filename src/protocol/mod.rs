//! Wire level protocol: requests decoded once at the transport boundary into a closed
//! set of typed variants, responses and notifications.

pub mod channel;
pub mod events;
pub mod types;

use crate::debugger::error::Error;
use crate::protocol::types::{
    BreakLocation, CallFrameId, Location, PauseOnExceptionsState, PropertyDescriptor,
    RemoteObject, RemoteObjectId, ScriptId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Every method the agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, IntoStaticStr)]
pub enum Method {
    #[strum(serialize = "Debugger.enable")]
    Enable,
    #[strum(serialize = "Debugger.disable")]
    Disable,
    #[strum(serialize = "Debugger.evaluateOnCallFrame")]
    EvaluateOnCallFrame,
    #[strum(serialize = "Debugger.getPossibleBreakpoints")]
    GetPossibleBreakpoints,
    #[strum(serialize = "Debugger.getScriptSource")]
    GetScriptSource,
    #[strum(serialize = "Debugger.pause")]
    Pause,
    #[strum(serialize = "Debugger.removeBreakpoint")]
    RemoveBreakpoint,
    #[strum(serialize = "Debugger.resume")]
    Resume,
    #[strum(serialize = "Debugger.setAsyncCallStackDepth")]
    SetAsyncCallStackDepth,
    #[strum(serialize = "Debugger.setBreakpointByUrl")]
    SetBreakpointByUrl,
    #[strum(serialize = "Debugger.setPauseOnExceptions")]
    SetPauseOnExceptions,
    #[strum(serialize = "Debugger.stepInto")]
    StepInto,
    #[strum(serialize = "Debugger.stepOut")]
    StepOut,
    #[strum(serialize = "Debugger.stepOver")]
    StepOver,
    #[strum(serialize = "Debugger.setMixedDebugEnabled")]
    SetMixedDebugEnabled,
    #[strum(serialize = "Debugger.replyNativeCalling")]
    ReplyNativeCalling,
    #[strum(serialize = "Debugger.setBlackboxPatterns")]
    SetBlackboxPatterns,
    #[strum(serialize = "Runtime.enable")]
    RuntimeEnable,
    #[strum(serialize = "Runtime.disable")]
    RuntimeDisable,
    #[strum(serialize = "Runtime.runIfWaitingForDebugger")]
    RunIfWaitingForDebugger,
    #[strum(serialize = "Runtime.getProperties")]
    GetProperties,
    #[strum(serialize = "Runtime.callFunctionOn")]
    CallFunctionOn,
    #[strum(serialize = "Runtime.getHeapUsage")]
    GetHeapUsage,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {
    pub max_scripts_cache_size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOnCallFrameParams {
    pub call_frame_id: CallFrameId,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPossibleBreakpointsParams {
    pub start: Location,
    #[serde(default)]
    pub end: Option<Location>,
    #[serde(default)]
    pub restrict_to_function: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceParams {
    pub script_id: ScriptId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBreakpointParams {
    pub breakpoint_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeParams {
    pub terminate_on_resume: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlParams {
    pub line_number: i32,
    pub url: String,
    #[serde(default)]
    pub column_number: Option<i32>,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPauseOnExceptionsParams {
    pub state: PauseOnExceptionsState,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepIntoParams {
    pub break_on_async_call: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMixedDebugParams {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyNativeCallingParams {
    pub user_code: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPropertiesParams {
    pub object_id: RemoteObjectId,
    #[serde(default)]
    pub own_properties: bool,
    #[serde(default)]
    pub accessor_properties_only: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOnParams {
    pub function_declaration: String,
    #[serde(default)]
    pub object_id: Option<RemoteObjectId>,
}

/// Decoded request, one variant per method.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Enable(EnableParams),
    Disable,
    EvaluateOnCallFrame(EvaluateOnCallFrameParams),
    GetPossibleBreakpoints(GetPossibleBreakpointsParams),
    GetScriptSource(GetScriptSourceParams),
    Pause,
    RemoveBreakpoint(RemoveBreakpointParams),
    Resume(ResumeParams),
    SetAsyncCallStackDepth,
    SetBreakpointByUrl(SetBreakpointByUrlParams),
    SetPauseOnExceptions(SetPauseOnExceptionsParams),
    StepInto(StepIntoParams),
    StepOut,
    StepOver,
    SetMixedDebugEnabled(SetMixedDebugParams),
    ReplyNativeCalling(ReplyNativeCallingParams),
    SetBlackboxPatterns,
    RuntimeEnable,
    RuntimeDisable,
    RunIfWaitingForDebugger,
    GetProperties(GetPropertiesParams),
    CallFunctionOn(CallFunctionOnParams),
    GetHeapUsage,
}

fn params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, Error> {
    // absent params are treated as an empty object so all-optional structs decode
    let params = match params {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        params => params,
    };
    serde_json::from_value(params).map_err(Error::WrongParams)
}

impl Request {
    pub fn decode(method: Method, raw: serde_json::Value) -> Result<Self, Error> {
        Ok(match method {
            Method::Enable => Request::Enable(params(raw)?),
            Method::Disable => Request::Disable,
            Method::EvaluateOnCallFrame => Request::EvaluateOnCallFrame(params(raw)?),
            Method::GetPossibleBreakpoints => Request::GetPossibleBreakpoints(params(raw)?),
            Method::GetScriptSource => Request::GetScriptSource(params(raw)?),
            Method::Pause => Request::Pause,
            Method::RemoveBreakpoint => Request::RemoveBreakpoint(params(raw)?),
            Method::Resume => Request::Resume(params(raw)?),
            Method::SetAsyncCallStackDepth => Request::SetAsyncCallStackDepth,
            Method::SetBreakpointByUrl => Request::SetBreakpointByUrl(params(raw)?),
            Method::SetPauseOnExceptions => Request::SetPauseOnExceptions(params(raw)?),
            Method::StepInto => Request::StepInto(params(raw)?),
            Method::StepOut => Request::StepOut,
            Method::StepOver => Request::StepOver,
            Method::SetMixedDebugEnabled => Request::SetMixedDebugEnabled(params(raw)?),
            Method::ReplyNativeCalling => Request::ReplyNativeCalling(params(raw)?),
            Method::SetBlackboxPatterns => Request::SetBlackboxPatterns,
            Method::RuntimeEnable => Request::RuntimeEnable,
            Method::RuntimeDisable => Request::RuntimeDisable,
            Method::RunIfWaitingForDebugger => Request::RunIfWaitingForDebugger,
            Method::GetProperties => Request::GetProperties(params(raw)?),
            Method::CallFunctionOn => Request::CallFunctionOn(params(raw)?),
            Method::GetHeapUsage => Request::GetHeapUsage,
        })
    }
}

/// A request as delivered by the transport: its id plus the decoding outcome.
/// Malformed requests still travel to the agent so that they get a failure response.
#[derive(Debug)]
pub struct DispatchRequest {
    pub id: i64,
    pub method: String,
    pub request: Result<Request, Error>,
}

impl DispatchRequest {
    pub fn new(id: i64, method: &str, raw: serde_json::Value) -> Self {
        let request = Method::from_str(method)
            .map_err(|_| Error::UnknownMethod(method.to_string()))
            .and_then(|m| Request::decode(m, raw));
        Self {
            id,
            method: method.to_string(),
            request,
        }
    }

    /// Decode a json message of form `{"id": .., "method": .., "params": ..}`.
    pub fn from_json(message: &str) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            id: i64,
            method: String,
            #[serde(default)]
            params: serde_json::Value,
        }

        let envelope: Envelope = serde_json::from_str(message)?;
        Ok(Self::new(envelope.id, &envelope.method, envelope.params))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EmptyReturns {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableReturns {
    pub debugger_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlReturns {
    pub breakpoint_id: String,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetPossibleBreakpointsReturns {
    pub locations: Vec<BreakLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceReturns {
    pub script_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluateReturns {
    pub result: RemoteObject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetPropertiesReturns {
    pub result: Vec<PropertyDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHeapUsageReturns {
    pub used_size: f64,
    pub total_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Returns {
    Empty(EmptyReturns),
    Enable(EnableReturns),
    SetBreakpointByUrl(SetBreakpointByUrlReturns),
    GetPossibleBreakpoints(GetPossibleBreakpointsReturns),
    GetScriptSource(GetScriptSourceReturns),
    Evaluate(EvaluateReturns),
    GetProperties(GetPropertiesReturns),
    GetHeapUsage(GetHeapUsageReturns),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
}

impl ResponseError {
    pub const SERVER_ERROR: i32 = -32000;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

impl From<&Error> for ResponseError {
    fn from(err: &Error) -> Self {
        let code = match err {
            Error::UnknownMethod(_) => Self::METHOD_NOT_FOUND,
            Error::WrongParams(_) => Self::INVALID_PARAMS,
            _ => Self::SERVER_ERROR,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

/// Answer to a [`DispatchRequest`]. A failed evaluation carries both a result and an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Returns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn ok(id: i64, returns: Returns) -> Self {
        Self {
            id,
            result: Some(returns),
            error: None,
        }
    }

    pub fn empty(id: i64) -> Self {
        Self::ok(id, Returns::Empty(EmptyReturns {}))
    }

    pub fn fail(id: i64, err: &Error) -> Self {
        let result = match err {
            Error::Evaluation { exception, .. } => Some(Returns::Evaluate(EvaluateReturns {
                result: exception.as_ref().clone(),
            })),
            _ => None,
        };
        Self {
            id,
            result,
            error: Some(err.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}
