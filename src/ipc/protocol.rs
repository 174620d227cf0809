//! Wire format for the sysupdate1 bus protocol.
//!
//! Messages are JSON objects tagged by `type`, carried in length-prefixed
//! frames (see `framing`). The message set mirrors a D-Bus connection:
//! method calls, their returns or errors, and signals for subscribers.
//!
//! # Security
//! - Message size limits are enforced before parsing

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::sysupdate::{ObjectPath, Signal};

/// Standard D-Bus error names returned in `error` replies.
pub mod error_name {
    pub const INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";
    pub const PROPERTY_READ_ONLY: &str = "org.freedesktop.DBus.Error.PropertyReadOnly";
    pub const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
    pub const UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";
    pub const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
    pub const FAILED: &str = "org.freedesktop.DBus.Error.Failed";
    pub const NO_SERVER: &str = "org.freedesktop.DBus.Error.NoServer";
}

/// Hard ceiling for a single message, independent of the server frame limit.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16 MB

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub serial: u32,
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl MethodCall {
    pub fn new(
        serial: u32,
        path: ObjectPath,
        interface: impl Into<String>,
        member: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            serial,
            path,
            interface: interface.into(),
            member: member.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodReturn {
    pub reply_serial: u32,
    #[serde(default)]
    pub body: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Absent when the offending frame could not be parsed.
    #[serde(default)]
    pub reply_serial: Option<u32>,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    #[serde(default)]
    pub body: Vec<Value>,
}

impl From<&Signal> for SignalMessage {
    fn from(signal: &Signal) -> Self {
        let body = match signal {
            Signal::PropertiesChanged {
                interface,
                changed,
                invalidated,
                ..
            } => vec![json!(interface), json!(changed), json!(invalidated)],
            Signal::JobRemoved { id, path, status } => vec![json!(id), json!(path), json!(status)],
        };
        Self {
            path: signal.path(),
            interface: signal.interface().to_string(),
            member: signal.member().to_string(),
            body,
        }
    }
}

/// All possible IPC message types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcMessage {
    #[serde(rename = "method_call")]
    MethodCall(MethodCall),

    #[serde(rename = "method_return")]
    MethodReturn(MethodReturn),

    #[serde(rename = "error")]
    Error(ErrorReply),

    /// Ask for signals to be delivered on this connection.
    #[serde(rename = "subscribe")]
    Subscribe,

    #[serde(rename = "subscribed")]
    Subscribed,

    #[serde(rename = "signal")]
    Signal(SignalMessage),
}

impl IpcMessage {
    pub fn method_return(reply_serial: u32, body: Vec<Value>) -> Self {
        Self::MethodReturn(MethodReturn { reply_serial, body })
    }

    pub fn error(reply_serial: Option<u32>, name: &str, message: impl Into<String>) -> Self {
        Self::Error(ErrorReply {
            reply_serial,
            name: name.to_string(),
            message: message.into(),
        })
    }
}

/// Encode message to JSON bytes with size limit enforcement.
pub fn encode_message(message: &IpcMessage) -> Result<Vec<u8>, ProtocolError> {
    let bytes = serde_json::to_vec(message)?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

/// Decode message from JSON bytes with size limit enforcement.
///
/// Size check happens BEFORE parsing to prevent allocation attacks.
pub fn decode_message(bytes: &[u8]) -> Result<IpcMessage, ProtocolError> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_call_wire_shape() {
        let msg = IpcMessage::MethodCall(MethodCall::new(
            7,
            ObjectPath::target("os"),
            "org.freedesktop.sysupdate1.Target",
            "Update",
            vec![json!("2.0.0"), json!(1)],
        ));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "method_call");
        assert_eq!(value["serial"], 7);
        assert_eq!(value["path"], "/org/freedesktop/sysupdate1/target/os");
        assert_eq!(value["member"], "Update");
        assert_eq!(value["args"], json!(["2.0.0", 1]));
    }

    #[test]
    fn test_args_default_to_empty() {
        let raw = br#"{"type":"method_call","serial":1,"path":"/org/freedesktop/sysupdate1","interface":"org.freedesktop.DBus.Peer","member":"Ping"}"#;
        match decode_message(raw).unwrap() {
            IpcMessage::MethodCall(call) => assert!(call.args.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unit_messages_decode() {
        assert_eq!(decode_message(br#"{"type":"subscribe"}"#).unwrap(), IpcMessage::Subscribe);
        assert_eq!(decode_message(br#"{"type":"subscribed"}"#).unwrap(), IpcMessage::Subscribed);
    }

    #[test]
    fn test_decode_message_too_large() {
        let large_data = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let result = decode_message(&large_data);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode_message(b"not json"), Err(ProtocolError::Serialization(_))));
        assert!(decode_message(br#"{"type":"nonsense"}"#).is_err());
    }

    #[test]
    fn test_job_removed_signal_body() {
        let signal = Signal::JobRemoved {
            id: 42,
            path: ObjectPath::job(42),
            status: 0,
        };
        let msg = SignalMessage::from(&signal);
        assert_eq!(msg.path, ObjectPath::manager());
        assert_eq!(msg.interface, "org.freedesktop.sysupdate1.Manager");
        assert_eq!(msg.member, "JobRemoved");
        assert_eq!(
            msg.body,
            vec![json!(42), json!("/org/freedesktop/sysupdate1/job/42"), json!(0)]
        );
    }

    #[test]
    fn test_progress_signal_body() {
        let msg = SignalMessage::from(&Signal::progress_changed(ObjectPath::job(1), 35));
        assert_eq!(msg.member, "PropertiesChanged");
        assert_eq!(msg.body[0], "org.freedesktop.sysupdate1.Job");
        assert_eq!(msg.body[1]["Progress"], json!({"type": "u32", "value": 35}));
        assert_eq!(msg.body[2], json!([]));
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MessageTooLarge { size: 100, max: 50 };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }
}
