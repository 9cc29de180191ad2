//! Incident location: an optional name paired with an optional address.
//!
//! The address is a tagged union: free text, or a concentric-street
//! coordinate (street id + radial hour/minute + description), matching the
//! `"text"` / `"garett"` wire discriminator. On the wire (spec §6) the
//! discriminator and every address field sit directly on the `location`
//! object alongside `name` — there is no nested `"address"` key — so
//! `Location` serializes and deserializes through the flat [`LocationWire`]
//! shape rather than deriving straight off this struct.

use ims_core::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(into = "LocationWire", from = "LocationWire")]
pub struct Location {
    pub name: Option<String>,
    pub address: Option<LocationAddress>,
}

impl Location {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(address) = &self.address {
            address.validate()?;
        }
        Ok(())
    }
}

impl ims_core::ValueObject for Location {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationAddress {
    Text {
        description: Option<String>,
    },
    Concentric {
        concentric: Option<String>,
        radial_hour: Option<u8>,
        radial_minute: Option<u8>,
        description: Option<String>,
    },
}

impl LocationAddress {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let LocationAddress::Concentric {
            radial_hour,
            radial_minute,
            ..
        } = self
        {
            if let Some(hour) = radial_hour {
                if !(1..=12).contains(hour) {
                    return Err(DomainError::validation(format!(
                        "radial hour must be 1..12, got {hour}"
                    )));
                }
            }
            if let Some(minute) = radial_minute {
                if *minute > 59 {
                    return Err(DomainError::validation(format!(
                        "radial minute must be 0..59, got {minute}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ims_core::ValueObject for LocationAddress {}

/// The `type` discriminator as it appears on the wire, separate from
/// [`LocationAddress`] so the latter can stay a plain enum while this one
/// carries the `#[serde(rename = "garett")]` wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum AddressKind {
    Text,
    #[serde(rename = "garett")]
    Concentric,
}

/// Flat wire shape for [`Location`]: `name` plus the address fields inlined
/// at the top level with a `type` discriminator, matching spec §6 and
/// `examples/original_source/src/ims/data/json.py`'s location schema.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LocationWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<AddressKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concentric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    radial_hour: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    radial_minute: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<Location> for LocationWire {
    fn from(location: Location) -> Self {
        match location.address {
            None => LocationWire {
                name: location.name,
                ..Default::default()
            },
            Some(LocationAddress::Text { description }) => LocationWire {
                name: location.name,
                kind: Some(AddressKind::Text),
                description,
                ..Default::default()
            },
            Some(LocationAddress::Concentric {
                concentric,
                radial_hour,
                radial_minute,
                description,
            }) => LocationWire {
                name: location.name,
                kind: Some(AddressKind::Concentric),
                concentric,
                radial_hour,
                radial_minute,
                description,
            },
        }
    }
}

impl From<LocationWire> for Location {
    fn from(wire: LocationWire) -> Self {
        let address = match wire.kind {
            None => None,
            Some(AddressKind::Text) => Some(LocationAddress::Text {
                description: wire.description,
            }),
            Some(AddressKind::Concentric) => Some(LocationAddress::Concentric {
                concentric: wire.concentric,
                radial_hour: wire.radial_hour,
                radial_minute: wire.radial_minute,
                description: wire.description,
            }),
        };
        Location {
            name: wire.name,
            address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_address_needs_no_coordinates() {
        let addr = LocationAddress::Text {
            description: Some("by the big tent".into()),
        };
        assert!(addr.validate().is_ok());
    }

    #[test]
    fn concentric_rejects_out_of_range_hour() {
        let addr = LocationAddress::Concentric {
            concentric: Some("E".into()),
            radial_hour: Some(13),
            radial_minute: Some(0),
            description: None,
        };
        assert!(addr.validate().is_err());
    }

    #[test]
    fn concentric_rejects_out_of_range_minute() {
        let addr = LocationAddress::Concentric {
            concentric: Some("E".into()),
            radial_hour: Some(6),
            radial_minute: Some(60),
            description: None,
        };
        assert!(addr.validate().is_err());
    }

    #[test]
    fn concentric_all_fields_optional() {
        let addr = LocationAddress::Concentric {
            concentric: None,
            radial_hour: None,
            radial_minute: None,
            description: None,
        };
        assert!(addr.validate().is_ok());
    }

    #[test]
    fn wire_shape_is_flat_not_nested_under_address() {
        let location = Location {
            name: Some("Ranger Outpost".into()),
            address: Some(LocationAddress::Concentric {
                concentric: Some("E".into()),
                radial_hour: Some(6),
                radial_minute: Some(30),
                description: Some("by the gate".into()),
            }),
        };
        let value = serde_json::to_value(&location).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "Ranger Outpost",
                "type": "garett",
                "concentric": "E",
                "radial_hour": 6,
                "radial_minute": 30,
                "description": "by the gate",
            })
        );
    }

    #[test]
    fn flat_wire_object_round_trips_through_deserialize() {
        let value = serde_json::json!({
            "name": "Ranger Outpost",
            "type": "text",
            "description": "by the gate",
        });
        let location: Location = serde_json::from_value(value).unwrap();
        assert_eq!(location.name.as_deref(), Some("Ranger Outpost"));
        assert_eq!(
            location.address,
            Some(LocationAddress::Text {
                description: Some("by the gate".into())
            })
        );
    }
}
