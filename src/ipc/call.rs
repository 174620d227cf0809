//! Typed decoding of method calls.
//!
//! Each interface has a closed set of members. Decoding turns a raw
//! `(interface, member, args)` triple into one of the enums below, or a
//! `CallError` naming what was wrong.

use serde_json::Value;
use thiserror::Error;

use super::protocol::error_name;
use crate::sysupdate::{
    PropertyError, Variant, INTROSPECTABLE_INTERFACE, JOB_INTERFACE, MANAGER_INTERFACE,
    PEER_INTERFACE, PROPERTIES_INTERFACE, TARGET_INTERFACE,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Unknown object {0}")]
    UnknownObject(String),

    #[error("Unknown interface {0}")]
    UnknownInterface(String),

    #[error("Unknown method {member} on interface {interface}")]
    UnknownMethod { interface: String, member: String },

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("Call failed: {0}")]
    Failed(String),

    #[error("Service is shutting down")]
    ShuttingDown,
}

impl CallError {
    /// D-Bus error name reported to the caller.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnknownObject(_) => error_name::UNKNOWN_OBJECT,
            Self::UnknownInterface(_) => error_name::UNKNOWN_INTERFACE,
            Self::UnknownMethod { .. } => error_name::UNKNOWN_METHOD,
            Self::InvalidArgs(_) => error_name::INVALID_ARGS,
            Self::Property(PropertyError::Unknown { .. }) => error_name::INVALID_ARGS,
            Self::Property(PropertyError::ReadOnly(_)) => error_name::PROPERTY_READ_ONLY,
            Self::Failed(_) => error_name::FAILED,
            Self::ShuttingDown => error_name::NO_SERVER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    Manager,
    Target,
    Job,
    Properties,
    Introspectable,
    Peer,
}

impl Interface {
    pub fn parse(name: &str) -> Result<Self, CallError> {
        match name {
            MANAGER_INTERFACE => Ok(Self::Manager),
            TARGET_INTERFACE => Ok(Self::Target),
            JOB_INTERFACE => Ok(Self::Job),
            PROPERTIES_INTERFACE => Ok(Self::Properties),
            INTROSPECTABLE_INTERFACE => Ok(Self::Introspectable),
            PEER_INTERFACE => Ok(Self::Peer),
            other => Err(CallError::UnknownInterface(other.to_string())),
        }
    }
}

/// Positional argument reader.
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// Require exactly `count` arguments.
    pub fn exact(&self, count: usize) -> Result<&Self, CallError> {
        if self.values.len() != count {
            return Err(CallError::InvalidArgs(format!(
                "expected {} argument(s), got {}",
                count,
                self.values.len()
            )));
        }
        Ok(self)
    }

    fn at(&self, index: usize) -> Result<&'a Value, CallError> {
        self.values
            .get(index)
            .ok_or_else(|| CallError::InvalidArgs(format!("missing argument {}", index)))
    }

    pub fn string(&self, index: usize) -> Result<String, CallError> {
        self.at(index)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CallError::InvalidArgs(format!("argument {} must be a string", index)))
    }

    pub fn boolean(&self, index: usize) -> Result<bool, CallError> {
        self.at(index)?
            .as_bool()
            .ok_or_else(|| CallError::InvalidArgs(format!("argument {} must be a boolean", index)))
    }

    pub fn uint64(&self, index: usize) -> Result<u64, CallError> {
        self.at(index)?
            .as_u64()
            .ok_or_else(|| CallError::InvalidArgs(format!("argument {} must be a uint64", index)))
    }

    pub fn variant(&self, index: usize) -> Result<Variant, CallError> {
        serde_json::from_value(self.at(index)?.clone())
            .map_err(|e| {
                CallError::InvalidArgs(format!("argument {} must be a variant: {}", index, e))
            })
    }
}

fn unknown_method(interface: &str, member: &str) -> CallError {
    CallError::UnknownMethod {
        interface: interface.to_string(),
        member: member.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesMethod {
    Get { interface: String, property: String },
    GetAll { interface: String },
    Set { interface: String, property: String, value: Variant },
}

impl PropertiesMethod {
    pub fn decode(member: &str, args: &[Value]) -> Result<Self, CallError> {
        let args = Args::new(args);
        match member {
            "Get" => {
                args.exact(2)?;
                Ok(Self::Get {
                    interface: args.string(0)?,
                    property: args.string(1)?,
                })
            }
            "GetAll" => {
                args.exact(1)?;
                Ok(Self::GetAll { interface: args.string(0)? })
            }
            "Set" => {
                args.exact(3)?;
                Ok(Self::Set {
                    interface: args.string(0)?,
                    property: args.string(1)?,
                    value: args.variant(2)?,
                })
            }
            other => Err(unknown_method(PROPERTIES_INTERFACE, other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerMethod {
    ListTargets,
    ListJobs,
    ListAppStream,
}

impl ManagerMethod {
    pub fn decode(member: &str, args: &[Value]) -> Result<Self, CallError> {
        let method = match member {
            "ListTargets" => Self::ListTargets,
            "ListJobs" => Self::ListJobs,
            "ListAppStream" => Self::ListAppStream,
            other => return Err(unknown_method(MANAGER_INTERFACE, other)),
        };
        Args::new(args).exact(0)?;
        Ok(method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerMethod {
    Ping,
    GetMachineId,
}

impl PeerMethod {
    pub fn decode(member: &str, args: &[Value]) -> Result<Self, CallError> {
        let method = match member {
            "Ping" => Self::Ping,
            "GetMachineId" => Self::GetMachineId,
            other => return Err(unknown_method(PEER_INTERFACE, other)),
        };
        Args::new(args).exact(0)?;
        Ok(method)
    }
}

pub fn decode_introspect(member: &str, args: &[Value]) -> Result<(), CallError> {
    if member != "Introspect" {
        return Err(unknown_method(INTROSPECTABLE_INTERFACE, member));
    }
    Args::new(args).exact(0)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMethod {
    List { offline: bool },
    Describe { version: String, offline: bool },
    CheckNew,
    Update { version: String, flags: u64 },
    Vacuum,
    GetAppStream,
    GetVersion,
}

impl TargetMethod {
    pub fn decode(member: &str, args: &[Value]) -> Result<Self, CallError> {
        let args = Args::new(args);
        let method = match member {
            "List" => {
                args.exact(1)?;
                Self::List { offline: args.boolean(0)? }
            }
            "Describe" => {
                args.exact(2)?;
                Self::Describe {
                    version: args.string(0)?,
                    offline: args.boolean(1)?,
                }
            }
            "Update" => {
                args.exact(2)?;
                Self::Update {
                    version: args.string(0)?,
                    flags: args.uint64(1)?,
                }
            }
            "CheckNew" => {
                args.exact(0)?;
                Self::CheckNew
            }
            "Vacuum" => {
                args.exact(0)?;
                Self::Vacuum
            }
            "GetAppStream" => {
                args.exact(0)?;
                Self::GetAppStream
            }
            "GetVersion" => {
                args.exact(0)?;
                Self::GetVersion
            }
            other => return Err(unknown_method(TARGET_INTERFACE, other)),
        };
        Ok(method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMethod {
    Cancel,
}

impl JobMethod {
    pub fn decode(member: &str, args: &[Value]) -> Result<Self, CallError> {
        match member {
            "Cancel" => {
                Args::new(args).exact(0)?;
                Ok(Self::Cancel)
            }
            other => Err(unknown_method(JOB_INTERFACE, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_update_decodes_typed_args() {
        let method = TargetMethod::decode("Update", &[json!("2.0.0"), json!(1)]).unwrap();
        assert_eq!(
            method,
            TargetMethod::Update {
                version: "2.0.0".into(),
                flags: 1
            }
        );
    }

    #[test]
    fn test_wrong_arg_types_rejected() {
        let err = TargetMethod::decode("Update", &[json!(2), json!(1)]).unwrap_err();
        assert!(matches!(err, CallError::InvalidArgs(_)));
        assert_eq!(err.name(), error_name::INVALID_ARGS);

        let err = TargetMethod::decode("List", &[json!("yes")]).unwrap_err();
        assert!(matches!(err, CallError::InvalidArgs(_)));

        let err = TargetMethod::decode("Update", &[json!("2.0.0"), json!(-1)]).unwrap_err();
        assert!(matches!(err, CallError::InvalidArgs(_)));
    }

    #[test]
    fn test_arity_checked() {
        assert!(ManagerMethod::decode("ListJobs", &[json!(1)]).is_err());
        assert!(TargetMethod::decode("Describe", &[json!("1.0.0")]).is_err());
        assert!(JobMethod::decode("Cancel", &[json!(true)]).is_err());
    }

    #[test]
    fn test_unknown_members() {
        let err = JobMethod::decode("Pause", &[]).unwrap_err();
        assert_eq!(err.name(), error_name::UNKNOWN_METHOD);
        assert!(err.to_string().contains("Pause"));
        assert!(decode_introspect("Describe", &[]).is_err());
    }

    #[test]
    fn test_interface_parse() {
        assert_eq!(Interface::parse(JOB_INTERFACE), Ok(Interface::Job));
        assert_eq!(
            Interface::parse("org.example.Nope"),
            Err(CallError::UnknownInterface("org.example.Nope".into()))
        );
    }

    #[test]
    fn test_properties_set_decodes_variant() {
        let method = PropertiesMethod::decode(
            "Set",
            &[json!(TARGET_INTERFACE), json!("Name"), json!({"type": "string", "value": "x"})],
        )
        .unwrap();
        assert!(matches!(
            method,
            PropertiesMethod::Set { value: Variant::String(ref s), .. } if s == "x"
        ));
    }

    #[test]
    fn test_property_error_names() {
        let read_only: CallError = PropertyError::ReadOnly("Name".into()).into();
        assert_eq!(read_only.name(), error_name::PROPERTY_READ_ONLY);
        let unknown: CallError = PropertyError::Unknown {
            interface: JOB_INTERFACE.into(),
            property: "Size".into(),
        }
        .into();
        assert_eq!(unknown.name(), error_name::INVALID_ARGS);
    }
}
