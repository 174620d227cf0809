//! Tests for the IPC wire protocol.

use serde_json::json;
use sysupdate_mock::ipc::{
    decode_message, encode_message, error_name, IpcMessage, MethodCall, ProtocolError,
    SignalMessage, MAX_MESSAGE_SIZE,
};
use sysupdate_mock::sysupdate::{ObjectPath, Signal, Variant, TARGET_INTERFACE};

#[test]
fn method_call_roundtrip() {
    let message = IpcMessage::MethodCall(MethodCall::new(
        11,
        ObjectPath::target("os"),
        TARGET_INTERFACE,
        "Describe",
        vec![json!("2.0.0"), json!(false)],
    ));

    let encoded = encode_message(&message).unwrap();
    let decoded = decode_message(&encoded).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn error_reply_wire_shape() {
    let message = IpcMessage::error(Some(4), error_name::UNKNOWN_OBJECT, "No such job 9");
    let bytes = encode_message(&message).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["type"], "error");
    assert_eq!(value["reply_serial"], 4);
    assert_eq!(value["name"], "org.freedesktop.DBus.Error.UnknownObject");
    assert_eq!(value["message"], "No such job 9");
}

#[test]
fn error_reply_without_serial_decodes() {
    let raw = br#"{"type":"error","name":"org.freedesktop.DBus.Error.Failed","message":"x"}"#;
    match decode_message(raw).unwrap() {
        IpcMessage::Error(err) => {
            assert_eq!(err.reply_serial, None);
            assert_eq!(err.name, error_name::FAILED);
        }
        other => panic!("Expected error, got {:?}", other),
    }
}

#[test]
fn method_return_body_defaults_to_empty() {
    let raw = br#"{"type":"method_return","reply_serial":8}"#;
    assert_eq!(
        decode_message(raw).unwrap(),
        IpcMessage::method_return(8, vec![])
    );
}

#[test]
fn signal_message_roundtrip() {
    let signal = SignalMessage::from(&Signal::progress_changed(ObjectPath::job(77), 60));
    let message = IpcMessage::Signal(signal);

    let decoded = decode_message(&encode_message(&message).unwrap()).unwrap();
    match decoded {
        IpcMessage::Signal(signal) => {
            assert_eq!(signal.path, ObjectPath::job(77));
            assert_eq!(signal.interface, "org.freedesktop.DBus.Properties");
            let progress: Variant =
                serde_json::from_value(signal.body[1]["Progress"].clone()).unwrap();
            assert_eq!(progress, Variant::U32(60));
        }
        other => panic!("Expected signal, got {:?}", other),
    }
}

#[test]
fn variant_tags() {
    let cases = [
        (Variant::Bool(true), json!({"type": "bool", "value": true})),
        (Variant::U64(5), json!({"type": "u64", "value": 5})),
        (Variant::I32(-1), json!({"type": "i32", "value": -1})),
        (Variant::String("os".into()), json!({"type": "string", "value": "os"})),
    ];
    for (variant, expected) in cases {
        assert_eq!(serde_json::to_value(&variant).unwrap(), expected);
    }
}

#[test]
fn missing_required_field_rejected() {
    // No member.
    let raw = br#"{"type":"method_call","serial":1,"path":"/org/freedesktop/sysupdate1","interface":"x"}"#;
    assert!(matches!(
        decode_message(raw),
        Err(ProtocolError::Serialization(_))
    ));
}

#[test]
fn oversized_message_rejected_before_parsing() {
    let data = vec![b' '; MAX_MESSAGE_SIZE + 1];
    match decode_message(&data) {
        Err(ProtocolError::MessageTooLarge { size, max }) => {
            assert_eq!(size, MAX_MESSAGE_SIZE + 1);
            assert_eq!(max, MAX_MESSAGE_SIZE);
        }
        other => panic!("Expected MessageTooLarge, got {:?}", other),
    }
}
