use crate::protocol::types::{RemoteObject, RemoteObjectId, ScriptId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- request parameter errors ---------------------------------
    #[error("wrong params")]
    WrongParams(#[source] serde_json::Error),
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    // --------------------------------- debugger entity not found --------------------------------
    #[error("Unknown file name.")]
    UnknownFile,
    #[error("unknown script id: {0}")]
    UnknownScriptId(ScriptId),
    #[error("Breakpoint not found.")]
    BreakpointNotFound,
    #[error("Parse breakpoint id failed")]
    BreakpointIdParse,
    #[error("Invalid callFrameId.")]
    InvalidCallFrameId,
    #[error("Unknown object id")]
    UnknownObjectId(RemoteObjectId),
    #[error("Not a object")]
    NotAnObject,
    #[error("scope object not found")]
    ScopeNotFound,
    #[error("variable {0} not found")]
    VariableNotFound(String),

    // --------------------------------- unsupported operations -----------------------------------
    #[error("{0} not support now")]
    Unsupported(&'static str),

    // --------------------------------- session state errors -------------------------------------
    #[error("{0}: debugger agent is not enabled")]
    NotEnabled(&'static str),
    #[error("Can only perform operation while paused")]
    NotPaused,
    #[error("Failed to {0}")]
    StepperUnavailable(&'static str),

    // --------------------------------- evaluation errors ----------------------------------------
    #[error("Unsupported expression.")]
    UnsupportedExpression,
    #[error("{message}")]
    Evaluation {
        message: String,
        exception: Box<RemoteObject>,
    },
    #[error("base64 decode of breakpoint condition failed")]
    ConditionDecode,
    #[error("breakpoint condition compilation failed")]
    ConditionCompile,

    // --------------------------------- internal errors ------------------------------------------
    #[error("no debug information extractor for {0}")]
    NoExtractor(String),
    #[error("no source mapping for offset {offset} in method {method}")]
    UnmappedOffset { method: u32, offset: u32 },

    // --------------------------------- configuration errors -------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("config parsing error: {0}")]
    ConfigParsing(#[from] toml::de::Error),
}

impl Error {
    /// Return a hint for logging - internal errors signal broken debug information or
    /// VM inconsistency, all other errors are plain request failures.
    pub fn is_internal(&self) -> bool {
        match self {
            Error::WrongParams(_) => false,
            Error::UnknownMethod(_) => false,
            Error::UnknownFile => false,
            Error::UnknownScriptId(_) => false,
            Error::BreakpointNotFound => false,
            Error::BreakpointIdParse => false,
            Error::InvalidCallFrameId => false,
            Error::UnknownObjectId(_) => false,
            Error::NotAnObject => false,
            Error::ScopeNotFound => false,
            Error::VariableNotFound(_) => false,
            Error::Unsupported(_) => false,
            Error::NotEnabled(_) => false,
            Error::NotPaused => false,
            Error::UnsupportedExpression => false,
            Error::Evaluation { .. } => false,
            Error::ConditionDecode => false,
            Error::ConditionCompile => false,
            Error::IO(_) => false,
            Error::ConfigParsing(_) => false,

            Error::StepperUnavailable(_) => true,
            Error::NoExtractor(_) => true,
            Error::UnmappedOffset { .. } => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
