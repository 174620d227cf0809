//! Typed property access shared by all object roles.
//!
//! Every role exposes an enumerated property set through [`Properties`].
//! Reads of names outside that set and reads against a foreign interface
//! are rejected as unknown; every write is rejected as read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::path::ObjectPath;

/// A typed property value (the `v` of D-Bus signatures).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    Bool(bool),
    U32(u32),
    U64(u64),
    I32(i32),
    String(String),
    ObjectPath(ObjectPath),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Property {property} not found in interface {interface}")]
    Unknown { interface: String, property: String },

    #[error("Property {0} is read-only")]
    ReadOnly(String),
}

/// Closed set of property names for one role.
pub trait PropertyName: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == name)
    }
}

/// Property access for an object role.
pub trait Properties {
    type Property: PropertyName;

    /// Interface the properties belong to.
    const INTERFACE: &'static str;

    /// Point-in-time read of a single property.
    fn read(&self, property: Self::Property) -> Variant;

    fn get(&self, interface: &str, name: &str) -> Result<Variant, PropertyError> {
        if interface == Self::INTERFACE {
            if let Some(property) = Self::Property::parse(name) {
                return Ok(self.read(property));
            }
        }
        Err(PropertyError::Unknown {
            interface: interface.to_string(),
            property: name.to_string(),
        })
    }

    /// All properties of `interface`, or an empty map for any other interface.
    fn get_all(&self, interface: &str) -> BTreeMap<String, Variant> {
        if interface != Self::INTERFACE {
            return BTreeMap::new();
        }
        Self::Property::ALL
            .iter()
            .map(|p| (p.as_str().to_string(), self.read(*p)))
            .collect()
    }

    fn set(&self, _interface: &str, name: &str, _value: Variant) -> Result<(), PropertyError> {
        Err(PropertyError::ReadOnly(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_wire_shape() {
        let json = serde_json::to_value(Variant::U32(45)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "u32", "value": 45}));

        let json = serde_json::to_value(Variant::ObjectPath(ObjectPath::target("os"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "object_path",
                "value": "/org/freedesktop/sysupdate1/target/os"
            })
        );
    }

    #[test]
    fn test_property_error_display() {
        let err = PropertyError::Unknown {
            interface: "a.b".into(),
            property: "Size".into(),
        };
        assert_eq!(err.to_string(), "Property Size not found in interface a.b");
        assert_eq!(
            PropertyError::ReadOnly("Name".into()).to_string(),
            "Property Name is read-only"
        );
    }
}
