//! Domain models for `eveapi`.
//!
//! ## Submodules
//!
//! - [`entity`] - Entity kinds, feed directions and page requests
//! - [`killmail`] - zKillboard summaries, ESI killmails and the merged record
//! - [`location`] - Stations, structures and character locations
//! - [`asset`] - Asset lists and cyno stash detection
//! - [`info`] - Public character/corporation/alliance information
//! - [`credential`] - OAuth credentials

mod asset;
mod credential;
mod entity;
mod info;
mod killmail;
mod location;

// Re-export everything at the models level
pub use asset::{Asset, Item, LocationInventory, cyno_inventories, cyno_items};
pub use credential::Credential;
pub use entity::{Direction, EntityGroups, EntityKind, EntityReference, PageRequest};
pub use info::{
    AllianceInfo, CharacterInfo, CharacterPortrait, CorporationInfo, SolarSystem, VerifiedUser,
};
pub use killmail::{
    Attacker, DetailRecord, MergedRecord, Position, SummaryRecord, Victim, VictimItem, Zkb,
    ZkillKillmail, merge,
};
pub use location::{
    CharacterLocation, CloneLocations, HomeLocation, JumpClone, LocationKind, LocationReference,
    Station, Structure, SystemId,
};
