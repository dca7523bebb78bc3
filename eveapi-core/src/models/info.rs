//! Public ESI records for characters, corporations, alliances and systems.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ESI `characters/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterInfo {
    /// Character name.
    pub name: String,
    /// Current corporation.
    pub corporation_id: i64,
    /// Current alliance, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alliance_id: Option<i64>,
    /// Birthday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<DateTime<Utc>>,
    /// Security status.
    #[serde(default)]
    pub security_status: f64,
}

/// ESI `corporations/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporationInfo {
    /// Corporation name.
    pub name: String,
    /// Ticker.
    pub ticker: String,
    /// Alliance, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alliance_id: Option<i64>,
    /// CEO character id.
    #[serde(default)]
    pub ceo_id: i64,
    /// Member count.
    #[serde(default)]
    pub member_count: i64,
}

/// ESI `alliances/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllianceInfo {
    /// Alliance name.
    pub name: String,
    /// Ticker.
    pub ticker: String,
    /// Executor corporation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_corporation_id: Option<i64>,
    /// Founding date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_founded: Option<DateTime<Utc>>,
}

/// ESI `characters/{id}/portrait/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterPortrait {
    /// 64x64 image URL.
    #[serde(default)]
    pub px64x64: String,
    /// 128x128 image URL.
    #[serde(default)]
    pub px128x128: String,
    /// 256x256 image URL.
    #[serde(default)]
    pub px256x256: String,
    /// 512x512 image URL.
    #[serde(default)]
    pub px512x512: String,
}

/// ESI `universe/systems/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarSystem {
    /// System id.
    pub system_id: i64,
    /// System name.
    pub name: String,
    /// Constellation containing the system.
    #[serde(default)]
    pub constellation_id: i64,
    /// Security status.
    #[serde(default)]
    pub security_status: f64,
}

/// EVE SSO `oauth/verify` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedUser {
    /// Character id the token belongs to.
    #[serde(rename = "CharacterID")]
    pub character_id: i64,
    /// Character name.
    #[serde(rename = "CharacterName")]
    pub character_name: String,
    /// Token expiry as reported by SSO.
    #[serde(rename = "ExpiresOn", default)]
    pub expires_on: String,
    /// Space-separated granted scopes.
    #[serde(rename = "Scopes", default)]
    pub scopes: String,
    /// Token type, normally `Character`.
    #[serde(rename = "TokenType", default)]
    pub token_type: String,
    /// Owner hash, changes when the character is transferred.
    #[serde(rename = "CharacterOwnerHash", default)]
    pub character_owner_hash: String,
}

impl VerifiedUser {
    /// Iterates the granted scopes.
    pub fn scope_list(&self) -> impl Iterator<Item = &str> {
        self.scopes.split_whitespace()
    }
}
