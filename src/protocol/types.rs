//! Protocol level data types shared by requests, responses and notifications.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Declare an integer identifier that travels over the wire as a decimal string.
macro_rules! wire_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(WireIdVisitor).map($name)
            }
        }
    };
}

struct WireIdVisitor;

impl Visitor<'_> for WireIdVisitor {
    type Value = u32;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
        u32::try_from(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
        u32::try_from(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
        u32::from_str(v.trim()).map_err(E::custom)
    }
}

wire_id!(
    /// Identifier of a parsed script, unique for the session.
    ScriptId
);
wire_id!(
    /// Identifier of a remote object, valid for one pause cycle.
    RemoteObjectId
);
wire_id!(
    /// Index of a call frame in the current pause, 0 is the innermost frame.
    CallFrameId
);

/// Source position of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: ScriptId,
    pub line_number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i32>,
}

impl Location {
    pub fn new(script_id: ScriptId, line_number: i32, column_number: i32) -> Self {
        Self {
            script_id,
            line_number,
            column_number: Some(column_number),
        }
    }
}

/// Position where the VM is able to break.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakLocation {
    pub script_id: ScriptId,
    pub line_number: i32,
    pub column_number: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PauseOnExceptionsState {
    #[default]
    None,
    Uncaught,
    All,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum PauseReason {
    #[serde(rename = "ambiguous")]
    #[strum(serialize = "ambiguous")]
    Ambiguous,
    #[serde(rename = "assert")]
    #[strum(serialize = "assert")]
    Assert,
    #[serde(rename = "debugCommand")]
    #[strum(serialize = "debugCommand")]
    DebugCommand,
    #[serde(rename = "DOM")]
    #[strum(serialize = "DOM")]
    Dom,
    #[serde(rename = "EventListener")]
    #[strum(serialize = "EventListener")]
    EventListener,
    #[serde(rename = "exception")]
    #[strum(serialize = "exception")]
    Exception,
    #[serde(rename = "instrumentation")]
    #[strum(serialize = "instrumentation")]
    Instrumentation,
    #[serde(rename = "OOM")]
    #[strum(serialize = "OOM")]
    Oom,
    #[serde(rename = "other")]
    #[strum(serialize = "other")]
    Other,
    #[serde(rename = "promiseRejection")]
    #[strum(serialize = "promiseRejection")]
    PromiseRejection,
    #[serde(rename = "XHR")]
    #[strum(serialize = "XHR")]
    Xhr,
    #[serde(rename = "step")]
    #[strum(serialize = "step")]
    Step,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ObjectType {
    Object,
    Function,
    Undefined,
    String,
    Number,
    Boolean,
    Symbol,
    Bigint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ObjectSubType {
    Array,
    Null,
    Regexp,
    Date,
    Map,
    Set,
    Weakmap,
    Weakset,
    Iterator,
    Generator,
    Error,
    Proxy,
    Promise,
    Typedarray,
    Arraybuffer,
    Dataview,
}

/// Mirror of a VM value as seen by the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub r#type: ObjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<ObjectSubType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}

impl RemoteObject {
    pub const OBJECT_CLASS: &'static str = "Object";
    pub const OBJECT_DESCRIPTION: &'static str = "Object";
    pub const GLOBAL_CLASS: &'static str = "Global";
    pub const GLOBAL_DESCRIPTION: &'static str = "Global";

    pub fn new(r#type: ObjectType) -> Self {
        Self {
            r#type,
            subtype: None,
            class_name: None,
            value: None,
            unserializable_value: None,
            description: None,
            object_id: None,
        }
    }

    pub fn undefined() -> Self {
        Self::new(ObjectType::Undefined)
    }

    /// Plain object with a class name and description, used for scope objects.
    pub fn object(class_name: &str, description: &str, object_id: RemoteObjectId) -> Self {
        Self {
            class_name: Some(class_name.to_string()),
            description: Some(description.to_string()),
            object_id: Some(object_id),
            ..Self::new(ObjectType::Object)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScopeType {
    Local,
    Closure,
    Module,
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(rename = "type")]
    pub r#type: ScopeType,
    pub object: RemoteObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub call_frame_id: CallFrameId,
    pub function_name: String,
    pub location: Location,
    pub url: String,
    pub scope_chain: Vec<Scope>,
    pub this: RemoteObject,
}

/// Object property as reported by `Runtime.getProperties`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RemoteObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<RemoteObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<RemoteObject>,
    pub configurable: bool,
    pub enumerable: bool,
    pub is_own: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<RemoteObject>,
}
