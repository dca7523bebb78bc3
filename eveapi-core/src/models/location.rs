//! Location types.
//!
//! Stations and structures are both "locations" that sit inside a solar
//! system. ESI reports clone and asset locations as a (id, kind) pair that
//! has to be resolved to the containing system.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Solar system id a location resolves to.
pub type SystemId = i64;

// ============================================================================
// Location Reference
// ============================================================================

/// The kinds of location a clone or asset can sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// NPC station, public data.
    Station,
    /// Player-owned structure, may require a credential with docking access.
    Structure,
}

impl LocationKind {
    /// Returns the lowercase ESI name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Station => "station",
            Self::Structure => "structure",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "station" => Ok(Self::Station),
            "structure" => Ok(Self::Structure),
            other => Err(CoreError::UnknownLocationKind(other.to_string())),
        }
    }
}

/// A station or structure id together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationReference {
    /// Station or structure id.
    pub id: i64,
    /// Which endpoint resolves it.
    pub kind: LocationKind,
}

impl LocationReference {
    /// Creates a station reference.
    pub fn station(id: i64) -> Self {
        Self {
            id,
            kind: LocationKind::Station,
        }
    }

    /// Creates a structure reference.
    pub fn structure(id: i64) -> Self {
        Self {
            id,
            kind: LocationKind::Structure,
        }
    }
}

// ============================================================================
// ESI universe records
// ============================================================================

/// ESI `universe/stations/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Station id.
    pub station_id: i64,
    /// Station name.
    #[serde(default)]
    pub name: String,
    /// Solar system containing the station.
    pub system_id: SystemId,
}

/// ESI `universe/structures/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// Structure name.
    #[serde(default)]
    pub name: String,
    /// Owning corporation.
    #[serde(default)]
    pub owner_id: i64,
    /// Solar system containing the structure.
    pub solar_system_id: SystemId,
    /// Structure type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<i64>,
}

// ============================================================================
// Character locations
// ============================================================================

/// ESI `characters/{id}/location/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterLocation {
    /// Current solar system.
    pub solar_system_id: SystemId,
    /// Docked station, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_id: Option<i64>,
    /// Docked structure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_id: Option<i64>,
}

/// ESI `characters/{id}/clones/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneLocations {
    /// Home station or structure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_location: Option<HomeLocation>,
    /// Jump clones.
    #[serde(default)]
    pub jump_clones: Vec<JumpClone>,
}

/// Home location of a character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeLocation {
    /// Station or structure id.
    pub location_id: i64,
    /// Kind of location.
    pub location_type: LocationKind,
}

impl HomeLocation {
    /// Returns the location as a resolvable reference.
    pub fn reference(&self) -> LocationReference {
        LocationReference {
            id: self.location_id,
            kind: self.location_type,
        }
    }
}

/// A jump clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpClone {
    /// Installed implants.
    #[serde(default)]
    pub implants: Vec<i64>,
    /// Clone id.
    pub jump_clone_id: i64,
    /// Station or structure id.
    pub location_id: i64,
    /// Kind of location.
    pub location_type: LocationKind,
    /// Player-assigned name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl JumpClone {
    /// Returns the location as a resolvable reference.
    pub fn reference(&self) -> LocationReference {
        LocationReference {
            id: self.location_id,
            kind: self.location_type,
        }
    }
}
